//! Sender-Aware State Cell
//!
//! A SenderState is a [`GlobalState`]-style cell whose broadcasts carry the
//! identity of the originating consumer. A mounted handle ignores
//! notifications tagged with its own identity, so a consumer that just
//! committed a value is not redundantly re-notified of it (avoiding
//! feedback loops in consumers that react to every incoming update).
//!
//! # Tagging Rules
//!
//! - A handle's setter writes its local copy directly, then commits and
//!   broadcasts the value tagged with the handle's [`SenderId`].
//! - The factory-level setters broadcast untagged; every handle applies
//!   untagged updates.
//! - A handle applies any update whose tag differs from its own.
//!
//! The sender ID is an opaque per-mount token used only for this filtering.
//! It is not an identity key and carries no meaning across cells.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::observe::{Observer, Subscription};

/// Opaque identity of a mounted sender-aware consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SenderId(u64);

impl SenderId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// A committed value together with its originating consumer, if any.
struct Tagged<S> {
    state: S,
    sender: Option<SenderId>,
}

impl<S: Clone> Clone for Tagged<S> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            sender: self.sender,
        }
    }
}

struct Shared<S>
where
    S: Clone + Send + Sync + 'static,
{
    cell: RwLock<Tagged<S>>,
    observer: Observer<Tagged<S>>,
}

impl<S> Shared<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn get(&self) -> S {
        self.cell.read().state.clone()
    }

    /// Commit a change under the given tag, then broadcast it.
    ///
    /// Same commit-then-broadcast discipline as the plain cell: the lock is
    /// released before subscribers run.
    fn apply<F>(&self, change: F, sender: Option<SenderId>) -> S
    where
        F: FnOnce(&S) -> S,
    {
        let committed = {
            let mut cell = self.cell.write();
            let next = change(&cell.state);
            *cell = Tagged {
                state: next.clone(),
                sender,
            };
            next
        };

        self.observer.notify(Tagged {
            state: committed.clone(),
            sender,
        });
        committed
    }
}

/// A shared cell whose broadcasts are tagged with their originator.
pub struct SenderState<S>
where
    S: Clone + Send + Sync + 'static,
{
    shared: Arc<Shared<S>>,
}

impl<S> SenderState<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Create a cell holding the given initial value.
    pub fn new(initial: S) -> Self {
        Self {
            shared: Arc::new(Shared {
                cell: RwLock::new(Tagged {
                    state: initial,
                    sender: None,
                }),
                observer: Observer::new(),
            }),
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

    /// Commit a new value, broadcast untagged (applied by every handle).
    pub fn set(&self, value: S) {
        self.shared.apply(move |_| value, None);
    }

    /// Compute, commit, and broadcast untagged.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&S) -> S,
    {
        self.shared.apply(f, None);
    }

    /// Subscribe to every committed value, regardless of originator.
    ///
    /// External collaborators have no sender identity, so no notification
    /// is filtered for them.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(S) + Send + Sync + 'static,
    {
        self.shared
            .observer
            .subscribe(move |tagged: Tagged<S>| callback(tagged.state))
    }

    /// Mount a sender-aware consumer onto the cell.
    ///
    /// The handle is allocated a fresh [`SenderId`]; its subscription drops
    /// notifications carrying that ID and applies everything else. The same
    /// mount-time reconciliation as the plain cell closes the read/subscribe
    /// race.
    pub fn mount(&self) -> SenderHandle<S> {
        self.mount_with(|_| {})
    }

    /// Mount a sender-aware consumer with a change listener.
    ///
    /// The listener runs once per update the handle applies. Updates tagged
    /// with the handle's own [`SenderId`] are suppressed entirely: the local
    /// copy was already written by the setter, and the listener does not
    /// fire, so a consumer never reacts redundantly to its own commit.
    pub fn mount_with<F>(&self, on_change: F) -> SenderHandle<S>
    where
        F: Fn(S) + Send + Sync + 'static,
    {
        let id = SenderId::next();
        let local = Arc::new(RwLock::new(self.shared.get()));

        let local_clone = local.clone();
        let subscription = self.shared.observer.subscribe(move |tagged: Tagged<S>| {
            if tagged.sender == Some(id) {
                trace!(sender = ?id, "self-originated update suppressed");
                return;
            }
            *local_clone.write() = tagged.state.clone();
            on_change(tagged.state);
        });

        *local.write() = self.shared.get();

        SenderHandle {
            shared: Arc::clone(&self.shared),
            id,
            local,
            subscription,
        }
    }

    /// Get the number of mounted handles and raw subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.shared.observer.subscriber_count()
    }
}

impl<S> Clone for SenderState<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S> Debug for SenderState<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SenderState")
            .field("value", &self.get())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// A mounted sender-aware consumer.
///
/// Setters update the local copy directly and broadcast tagged with this
/// handle's identity, so the handle itself is never re-notified of its own
/// commits while every other consumer is. Dropping the handle unsubscribes
/// it.
pub struct SenderHandle<S>
where
    S: Clone + Send + Sync + 'static,
{
    shared: Arc<Shared<S>>,
    id: SenderId,
    local: Arc<RwLock<S>>,
    subscription: Subscription,
}

impl<S> SenderHandle<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Get this consumer's identity token.
    pub fn id(&self) -> SenderId {
        self.id
    }

    /// Get this consumer's current view of the value.
    pub fn value(&self) -> S {
        self.local.read().clone()
    }

    /// Commit a new value tagged with this handle's identity.
    pub fn set(&self, value: S) {
        let committed = self.shared.apply(move |_| value, Some(self.id));
        *self.local.write() = committed;
    }

    /// Compute against the cell, commit tagged with this handle's identity.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&S) -> S,
    {
        let committed = self.shared.apply(f, Some(self.id));
        *self.local.write() = committed;
    }

    /// Check whether the handle is still subscribed.
    pub fn is_mounted(&self) -> bool {
        self.subscription.is_active()
    }
}

impl<S> Debug for SenderHandle<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SenderHandle")
            .field("id", &self.id)
            .field("value", &self.value())
            .field("mounted", &self.is_mounted())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
