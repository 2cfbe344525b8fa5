//! Observer Implementation
//!
//! An Observer is the fundamental broadcast primitive. It holds an ordered
//! list of subscriber callbacks and delivers values to all of them
//! synchronously.
//!
//! # How Observers Work
//!
//! 1. A consumer registers a callback with `subscribe` and receives a
//!    [`Subscription`] handle.
//!
//! 2. A producer calls `notify` with a value. Every subscriber registered at
//!    that moment receives a clone of the value, in subscription order, on
//!    the calling thread.
//!
//! 3. Each delivery is individually fault-isolated: a panicking subscriber
//!    never prevents delivery to the remaining subscribers and never
//!    propagates to the caller of `notify`.
//!
//! # Snapshot Policy
//!
//! `notify` iterates a snapshot of the subscriber list taken when the call
//! starts. A subscriber added during an in-flight `notify` is not called for
//! that value; a subscriber removed mid-broadcast by another subscriber may
//! still receive the in-flight value. Taking a snapshot also means no lock
//! is held while callbacks run, so a subscriber may freely subscribe,
//! unsubscribe, or notify re-entrantly.
//!
//! # Thread Safety
//!
//! Observers are thread-safe. The subscriber list is protected by a RwLock,
//! and payloads must be Clone + Send + Sync.

use std::fmt::Debug;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use smallvec::SmallVec;
use tracing::warn;

use super::subscription::{SubscriberId, Subscription};

/// A registered subscriber callback.
pub(super) type Callback<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Diagnostic callback invoked when a subscriber panics during delivery.
type PanicHook = Arc<dyn Fn(SubscriberId, &str) + Send + Sync>;

/// Most channels have a handful of subscribers; keep them inline.
type SubscriberList<T> = SmallVec<[(SubscriberId, Callback<T>); 4]>;

pub(super) struct Shared<T> {
    subscribers: RwLock<SubscriberList<T>>,
    panic_hook: RwLock<Option<PanicHook>>,
}

/// A synchronous broadcast channel with per-subscriber fault isolation.
///
/// # Type Parameters
///
/// - `T`: The payload type. Must be Clone + Send + Sync.
///
/// # Example
///
/// ```rust,ignore
/// let channel = Observer::new();
///
/// let subscription = channel.subscribe(|value: i32| {
///     println!("received {value}");
/// });
///
/// channel.notify(5); // Prints: "received 5"
/// subscription.unsubscribe();
/// ```
pub struct Observer<T>
where
    T: Clone + Send + Sync + 'static,
{
    shared: Arc<Shared<T>>,
}

impl<T> Observer<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new channel with no subscribers.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                subscribers: RwLock::new(SmallVec::new()),
                panic_hook: RwLock::new(None),
            }),
        }
    }

    /// Register a callback and return its [`Subscription`] handle.
    ///
    /// Registering the same closure twice yields two independent deliveries
    /// per `notify`. The callback stays registered until the handle is
    /// unsubscribed or dropped.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.subscribe_arc(SubscriberId::new(), Arc::new(callback))
    }

    /// Register an already-allocated callback under a pre-generated ID.
    ///
    /// Used by wrapping channels that need the ID before registration
    /// (e.g. to attribute a replay delivery).
    pub(super) fn subscribe_arc(&self, id: SubscriberId, callback: Callback<T>) -> Subscription {
        self.shared.subscribers.write().push((id, callback));

        let weak = Arc::downgrade(&self.shared);
        Subscription::new(
            id,
            Box::new(move |id| {
                Self::remove(&weak, id);
            }),
        )
    }

    fn remove(shared: &Weak<Shared<T>>, id: SubscriberId) {
        if let Some(shared) = shared.upgrade() {
            shared
                .subscribers
                .write()
                .retain(|(sub_id, _)| *sub_id != id);
        }
    }

    /// Deliver a value to every currently registered subscriber.
    ///
    /// Delivery is synchronous and follows subscription order. Subscriber
    /// panics are contained per the module-level policy; `notify` itself
    /// never panics because of a subscriber.
    pub fn notify(&self, data: T) {
        let snapshot: SubscriberList<T> = self.shared.subscribers.read().clone();

        for (id, callback) in snapshot.iter() {
            self.deliver(*id, callback, data.clone());
        }
    }

    /// Invoke a single callback under the fault-isolation boundary.
    pub(super) fn deliver(&self, id: SubscriberId, callback: &Callback<T>, data: T) {
        let result = catch_unwind(AssertUnwindSafe(|| callback(data)));

        if let Err(payload) = result {
            let message = panic_message(payload.as_ref());
            warn!(subscriber = ?id, %message, "subscriber panicked during delivery");

            let hook = self.shared.panic_hook.read().clone();
            if let Some(hook) = hook {
                // The diagnostic hook is held to the same isolation boundary.
                let _ = catch_unwind(AssertUnwindSafe(|| hook(id, &message)));
            }
        }
    }

    /// Install a diagnostic callback invoked when a subscriber panics.
    ///
    /// Fault isolation swallows subscriber panics by design; this hook lets
    /// a collaborator observe them without weakening that boundary. Without
    /// a hook, panics are only reported through `tracing`.
    pub fn on_subscriber_panic<F>(&self, hook: F)
    where
        F: Fn(SubscriberId, &str) + Send + Sync + 'static,
    {
        *self.shared.panic_hook.write() = Some(Arc::new(hook));
    }

    /// Get the number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.read().len()
    }
}

/// Best-effort extraction of a panic payload message.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

impl<T> Default for Observer<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Observer<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Debug for Observer<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observer")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
