//! Broadcast Primitives
//!
//! This module implements the publish/subscribe channels the rest of the
//! crate is built on.
//!
//! # Concepts
//!
//! ## Observer
//!
//! An [`Observer`] is a synchronous broadcast point from one or more
//! producers to zero or more subscribers. Delivery follows subscription
//! order and each subscriber is individually fault-isolated, so one
//! panicking consumer cannot break the broadcast for the others.
//!
//! ## MemoryObserver
//!
//! A [`MemoryObserver`] additionally remembers the last notified value and
//! replays it to late subscribers, so a consumer that joins after the fact
//! still observes the current state.
//!
//! ## TimedNotifier
//!
//! A [`TimedNotifier`] is the only asynchronous channel: its `notify` waits
//! until every subscriber has acknowledged or a deadline elapses, whichever
//! comes first. A misbehaving consumer can never block the producer
//! indefinitely.

mod memory;
mod observer;
mod subscription;
mod timed;

pub use memory::MemoryObserver;
pub use observer::Observer;
pub use subscription::{SubscriberId, Subscription};
pub use timed::{Acknowledger, NotifyOutcome, TimedNotifier, DEFAULT_MAX_TIMEOUT};
