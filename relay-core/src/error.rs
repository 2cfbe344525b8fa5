//! Error types for the relay primitives.
//!
//! Only boundary validation and explicit navigation failures surface as
//! errors. Subscriber panics are contained by the broadcast channels (see
//! [`crate::observe`]) and deadline expiry is modeled as an outcome, not an
//! error.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A `TimedNotifier` was constructed with a deadline that would settle
    /// the acknowledgment race before any subscriber could respond.
    #[error("max timeout is not a valid deadline")]
    InvalidTimeout,

    /// A history navigation targeted an item that is not in the history.
    #[error("history item not found")]
    HistoryItemNotFound,
}
