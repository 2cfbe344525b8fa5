//! Acknowledged Broadcast with Deadline
//!
//! A TimedNotifier delivers a value to every subscriber together with an
//! [`Acknowledger`], then waits for all subscribers to acknowledge or for a
//! deadline to elapse, whichever comes first.
//!
//! # How It Works
//!
//! 1. `notify` invokes every subscriber synchronously, handing each one an
//!    `Acknowledger` backed by a oneshot channel.
//!
//! 2. A subscriber acknowledges by calling `resolve` or `reject`, either
//!    inline or later from a spawned task. Dropping the acknowledger without
//!    calling either counts as a rejection, as does a panic during delivery.
//!
//! 3. `notify` races the combined acknowledgments against a deadline sleep.
//!    A slow subscriber cannot block the producer past the deadline; its
//!    eventual acknowledgment after the race settles simply has no effect.
//!
//! The deadline is not an error: the caller inspects the returned
//! [`NotifyOutcome`] if it needs to distinguish full acknowledgment from a
//! timeout.

use std::fmt::Debug;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures_util::future::try_join_all;
use parking_lot::RwLock;
use smallvec::SmallVec;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::Error;

use super::subscription::{SubscriberId, Subscription};

/// Deadline used by [`TimedNotifier::default`].
pub const DEFAULT_MAX_TIMEOUT: Duration = Duration::from_secs(5);

/// How a call to [`TimedNotifier::notify`] settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// Every subscriber resolved before the deadline.
    Acknowledged,

    /// A subscriber rejected (or dropped its acknowledger, or panicked)
    /// before the deadline. Carries the first rejection reason.
    Rejected(String),

    /// The deadline elapsed before every subscriber acknowledged.
    TimedOut,
}

/// One-shot acknowledgment token handed to each subscriber.
///
/// Consumed by [`resolve`](Acknowledger::resolve) or
/// [`reject`](Acknowledger::reject). Dropping the token without calling
/// either is reported as a rejection, so an acknowledgment can never be
/// silently lost.
pub struct Acknowledger {
    tx: Option<oneshot::Sender<Result<(), String>>>,
}

impl Acknowledger {
    /// Signal successful completion.
    pub fn resolve(mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Ok(()));
        }
    }

    /// Signal failure with a reason.
    pub fn reject(mut self, reason: impl Into<String>) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Err(reason.into()));
        }
    }
}

impl Drop for Acknowledger {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Err("dropped without acknowledgement".to_string()));
        }
    }
}

impl Debug for Acknowledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Acknowledger")
            .field("pending", &self.tx.is_some())
            .finish()
    }
}

/// A subscriber callback receiving the payload and its acknowledgment token.
type TimedCallback<T> = Arc<dyn Fn(T, Acknowledger) + Send + Sync>;

type SubscriberList<T> = SmallVec<[(SubscriberId, TimedCallback<T>); 4]>;

struct Shared<T> {
    subscribers: RwLock<SubscriberList<T>>,
}

/// An acknowledged broadcast channel with a per-notify deadline.
pub struct TimedNotifier<T>
where
    T: Clone + Send + Sync + 'static,
{
    shared: Arc<Shared<T>>,
    max_timeout: Duration,
}

impl<T> TimedNotifier<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new notifier with the given deadline.
    ///
    /// Fails fast with [`Error::InvalidTimeout`] on a zero duration: a zero
    /// deadline would settle the race before any subscriber could
    /// acknowledge.
    pub fn new(max_timeout: Duration) -> Result<Self, Error> {
        if max_timeout.is_zero() {
            return Err(Error::InvalidTimeout);
        }

        Ok(Self {
            shared: Arc::new(Shared {
                subscribers: RwLock::new(SmallVec::new()),
            }),
            max_timeout,
        })
    }

    /// Get the configured deadline.
    pub fn max_timeout(&self) -> Duration {
        self.max_timeout
    }

    /// Register a callback and return its [`Subscription`] handle.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(T, Acknowledger) + Send + Sync + 'static,
    {
        let id = SubscriberId::new();
        self.shared
            .subscribers
            .write()
            .push((id, Arc::new(callback)));

        let weak: Weak<Shared<T>> = Arc::downgrade(&self.shared);
        Subscription::new(
            id,
            Box::new(move |id| {
                if let Some(shared) = weak.upgrade() {
                    shared
                        .subscribers
                        .write()
                        .retain(|(sub_id, _)| *sub_id != id);
                }
            }),
        )
    }

    /// Get the number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.read().len()
    }

    /// Broadcast a value and wait for acknowledgment or the deadline.
    ///
    /// Subscribers are invoked synchronously before the first await point;
    /// only the waiting suspends. With no subscribers the call settles as
    /// `Acknowledged` immediately.
    pub async fn notify(&self, data: T) -> NotifyOutcome {
        let snapshot: SubscriberList<T> = self.shared.subscribers.read().clone();

        let mut pending = Vec::with_capacity(snapshot.len());
        for (id, callback) in snapshot.iter() {
            let (tx, rx) = oneshot::channel();
            let acknowledger = Acknowledger { tx: Some(tx) };

            let data = data.clone();
            let result = catch_unwind(AssertUnwindSafe(|| callback(data, acknowledger)));
            if result.is_err() {
                // The acknowledger was dropped during the unwind, which
                // already recorded a rejection on its channel.
                warn!(subscriber = ?id, "subscriber panicked during acknowledged delivery");
            }

            pending.push(async move {
                match rx.await {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(reason)) => Err(reason),
                    Err(_) => Err("acknowledgement channel closed".to_string()),
                }
            });
        }

        let outcome = tokio::select! {
            result = try_join_all(pending) => match result {
                Ok(_) => NotifyOutcome::Acknowledged,
                Err(reason) => NotifyOutcome::Rejected(reason),
            },
            _ = tokio::time::sleep(self.max_timeout) => NotifyOutcome::TimedOut,
        };

        debug!(?outcome, "acknowledged broadcast settled");
        outcome
    }
}

impl<T> Default for TimedNotifier<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self {
            shared: Arc::new(Shared {
                subscribers: RwLock::new(SmallVec::new()),
            }),
            max_timeout: DEFAULT_MAX_TIMEOUT,
        }
    }
}

impl<T> Clone for TimedNotifier<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            max_timeout: self.max_timeout,
        }
    }
}

impl<T> Debug for TimedNotifier<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimedNotifier")
            .field("subscriber_count", &self.subscriber_count())
            .field("max_timeout", &self.max_timeout)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
