//! Global State Cell
//!
//! A GlobalState owns a single authoritative value (the shared cell) and a
//! broadcast channel for its changes. Any number of consumers can mount a
//! [`StateHandle`] that tracks the cell, and any actor, mounted or not, can
//! read and write the cell imperatively.
//!
//! # How Updates Flow
//!
//! 1. A setter is called with a value or a reducer-style update function.
//!
//! 2. The new value is computed against the current cell and committed under
//!    the cell lock.
//!
//! 3. The lock is released, then the committed value is broadcast. Handles
//!    apply it to their local copy through their subscription. No lock is
//!    held while subscribers run, so a subscriber may re-enter the cell.
//!
//! `get` always returns the most recently committed value, independent of
//! any handle. No de-duplication is performed: two setters committing the
//! same value produce one broadcast each.
//!
//! # Initialization Timing
//!
//! The initializer passed to [`GlobalState::new_with`] runs exactly once, at
//! construction. Mounting never re-derives the initial value; a consumer
//! that wants a different value goes through the setter like everyone else.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::observe::{Observer, Subscription};

struct Shared<S>
where
    S: Clone + Send + Sync + 'static,
{
    cell: RwLock<S>,
    observer: Observer<S>,
}

impl<S> Shared<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn new(initial: S) -> Self {
        Self {
            cell: RwLock::new(initial),
            observer: Observer::new(),
        }
    }

    fn get(&self) -> S {
        self.cell.read().clone()
    }

    /// Commit a change to the cell, then broadcast the committed value.
    ///
    /// The cell lock is released before the broadcast so subscribers may
    /// read or write the cell re-entrantly.
    fn apply<F>(&self, change: F) -> S
    where
        F: FnOnce(&S) -> S,
    {
        let committed = {
            let mut cell = self.cell.write();
            let next = change(&*cell);
            *cell = next.clone();
            next
        };

        self.observer.notify(committed.clone());
        committed
    }
}

/// A shared mutable cell with change broadcast.
///
/// Cloning shares the cell: all clones read and write the same value.
///
/// # Example
///
/// ```rust,ignore
/// let counter = GlobalState::new(0);
///
/// let handle = counter.mount();
/// counter.update(|n| n + 1);
///
/// assert_eq!(counter.get(), 1);
/// assert_eq!(handle.value(), 1);
/// ```
pub struct GlobalState<S>
where
    S: Clone + Send + Sync + 'static,
{
    shared: Arc<Shared<S>>,
}

impl<S> GlobalState<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Create a cell holding the given initial value.
    pub fn new(initial: S) -> Self {
        Self {
            shared: Arc::new(Shared::new(initial)),
        }
    }

    /// Create a cell from an initializer, invoked exactly once, now.
    pub fn new_with<F>(init: F) -> Self
    where
        F: FnOnce() -> S,
    {
        Self::new(init())
    }

    /// Get the most recently committed value.
    pub fn get(&self) -> S {
        self.shared.get()
    }

    /// Commit a new value and broadcast it.
    pub fn set(&self, value: S) {
        self.shared.apply(move |_| value);
    }

    /// Compute a new value from the current one, commit, and broadcast.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&S) -> S,
    {
        self.shared.apply(f);
    }

    /// Subscribe to committed values without mounting a handle.
    ///
    /// For imperative collaborators that only need the change stream.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(S) + Send + Sync + 'static,
    {
        self.shared.observer.subscribe(callback)
    }

    /// Mount a consumer onto the cell.
    ///
    /// The handle starts from the current cell value, subscribes to changes,
    /// and then reconciles once more against the cell: if the cell moved
    /// between the initial read and the subscription being wired, the handle
    /// picks up the newer value rather than rendering a stale one.
    pub fn mount(&self) -> StateHandle<S> {
        self.mount_with(|_| {})
    }

    /// Mount a consumer with a change listener.
    ///
    /// The listener runs after the handle's local copy has been updated,
    /// once per broadcast the handle applies -- including broadcasts the
    /// handle's own setters produced (see [`SenderState`] for the variant
    /// that suppresses those).
    ///
    /// [`SenderState`]: crate::state::SenderState
    pub fn mount_with<F>(&self, on_change: F) -> StateHandle<S>
    where
        F: Fn(S) + Send + Sync + 'static,
    {
        let local = Arc::new(RwLock::new(self.shared.get()));

        let local_clone = local.clone();
        let subscription = self.shared.observer.subscribe(move |value: S| {
            *local_clone.write() = value.clone();
            on_change(value);
        });

        *local.write() = self.shared.get();
        trace!(subscriber = ?subscription.id(), "state handle mounted");

        StateHandle {
            shared: Arc::clone(&self.shared),
            local,
            subscription,
        }
    }

    /// Get the number of mounted handles and raw subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.shared.observer.subscriber_count()
    }
}

impl<S> Clone for GlobalState<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S> Debug for GlobalState<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalState")
            .field("value", &self.get())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// A mounted consumer of a [`GlobalState`] cell.
///
/// Holds a local copy of the value, kept in sync through its subscription.
/// Setters go through the shared update path, so the handle observes its own
/// writes the same way every other consumer does. Dropping the handle
/// unsubscribes it; the cell and channel persist independently.
pub struct StateHandle<S>
where
    S: Clone + Send + Sync + 'static,
{
    shared: Arc<Shared<S>>,
    local: Arc<RwLock<S>>,
    subscription: Subscription,
}

impl<S> StateHandle<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Get this consumer's current view of the value.
    pub fn value(&self) -> S {
        self.local.read().clone()
    }

    /// Commit a new value to the shared cell and broadcast it.
    pub fn set(&self, value: S) {
        self.shared.apply(move |_| value);
    }

    /// Compute a new value from the current cell value, commit, broadcast.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&S) -> S,
    {
        self.shared.apply(f);
    }

    /// Check whether the handle is still subscribed.
    pub fn is_mounted(&self) -> bool {
        self.subscription.is_active()
    }
}

impl<S> Debug for StateHandle<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateHandle")
            .field("value", &self.value())
            .field("mounted", &self.is_mounted())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
