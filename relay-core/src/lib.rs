//! Relay Core
//!
//! This crate provides small publish/subscribe and shared-state primitives
//! for synchronizing a single authoritative value across many independent
//! consumers without a central store. It implements:
//!
//! - Broadcast channels with per-subscriber fault isolation
//!   ([`observe::Observer`]), last-value replay ([`observe::MemoryObserver`]),
//!   and acknowledged delivery with a deadline ([`observe::TimedNotifier`])
//! - Shared state cells ([`state::GlobalState`]), a sender-aware variant that
//!   suppresses redundant self-notification ([`state::SenderState`]), and a
//!   navigable history built on top ([`state::HistoryStore`])
//!
//! # Architecture
//!
//! The crate is organized into two modules, leaves first:
//!
//! - `observe`: the broadcast channels everything else is built on
//! - `state`: shared cells and their mounted consumer handles
//!
//! # Example
//!
//! ```rust,ignore
//! use relay_core::state::GlobalState;
//!
//! let counter = GlobalState::new(0);
//! let handle = counter.mount();
//!
//! counter.update(|n| n + 1);
//! counter.update(|n| n + 1);
//! counter.update(|n| n + 1);
//!
//! assert_eq!(counter.get(), 3);
//! assert_eq!(handle.value(), 3);
//! ```

pub mod error;
pub mod observe;
pub mod state;

pub use error::Error;
