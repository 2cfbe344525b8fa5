//! Last-Value-Cache Observer
//!
//! A MemoryObserver broadcasts like [`Observer`] but remembers the most
//! recently notified value. A subscriber that joins after a value has been
//! produced is immediately replayed that value, so late consumers observe
//! the current state without waiting for the next broadcast.
//!
//! `forget` clears the memory; subsequent subscribers get no replay until
//! the next `notify`.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;

use super::observer::Observer;
use super::subscription::{SubscriberId, Subscription};

/// A broadcast channel that replays the last value to late subscribers.
pub struct MemoryObserver<T>
where
    T: Clone + Send + Sync + 'static,
{
    observer: Observer<T>,
    memory: Arc<RwLock<Option<T>>>,
}

impl<T> MemoryObserver<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new channel with no subscribers and no memory.
    pub fn new() -> Self {
        Self {
            observer: Observer::new(),
            memory: Arc::new(RwLock::new(None)),
        }
    }

    /// Register a callback, replaying the remembered value first if any.
    ///
    /// The replay happens synchronously, before this call returns, and runs
    /// under the same fault-isolation boundary as a broadcast delivery.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let id = SubscriberId::new();
        let callback: Arc<dyn Fn(T) + Send + Sync> = Arc::new(callback);

        let replay = self.memory.read().clone();
        if let Some(value) = replay {
            self.observer.deliver(id, &callback, value);
        }

        self.observer.subscribe_arc(id, callback)
    }

    /// Record the value into memory, then broadcast it.
    pub fn notify(&self, data: T) {
        *self.memory.write() = Some(data.clone());
        self.observer.notify(data);
    }

    /// Clear the remembered value.
    pub fn forget(&self) {
        *self.memory.write() = None;
    }

    /// Check whether a value has been remembered since the last `forget`.
    pub fn has_memory(&self) -> bool {
        self.memory.read().is_some()
    }

    /// Get the remembered value, if any.
    pub fn last(&self) -> Option<T> {
        self.memory.read().clone()
    }

    /// Install a diagnostic callback invoked when a subscriber panics.
    pub fn on_subscriber_panic<F>(&self, hook: F)
    where
        F: Fn(SubscriberId, &str) + Send + Sync + 'static,
    {
        self.observer.on_subscriber_panic(hook);
    }

    /// Get the number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.observer.subscriber_count()
    }
}

impl<T> Default for MemoryObserver<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for MemoryObserver<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            observer: self.observer.clone(),
            memory: Arc::clone(&self.memory),
        }
    }
}

impl<T> Debug for MemoryObserver<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryObserver")
            .field("subscriber_count", &self.subscriber_count())
            .field("has_memory", &self.has_memory())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
