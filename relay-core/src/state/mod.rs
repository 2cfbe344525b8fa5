//! Shared State Cells
//!
//! This module layers shared mutable state on top of the broadcast
//! primitives in [`crate::observe`].
//!
//! # Concepts
//!
//! ## GlobalState
//!
//! A [`GlobalState`] owns a single authoritative value and broadcasts every
//! commit. Consumers mount [`StateHandle`]s that track the cell; imperative
//! collaborators use `get`/`set`/`update` directly, outside any mounted
//! context.
//!
//! ## SenderState
//!
//! A [`SenderState`] tags each commit with the identity of the consumer
//! that produced it, so that consumer is not redundantly re-notified of its
//! own update while everyone else still is.
//!
//! ## HistoryStore
//!
//! A [`HistoryStore`] keeps a navigable timeline (push, replace, pending,
//! go-to) inside a `GlobalState` cell, with fail-fast errors for invalid
//! navigation.

mod global;
mod history;
mod sender;

pub use global::{GlobalState, StateHandle};
pub use history::{HistoryHandle, HistoryState, HistoryStore};
pub use sender::{SenderHandle, SenderId, SenderState};
