//! Subscription handles for broadcast channels.
//!
//! Every registration on a channel is identified by a [`SubscriberId`] and
//! owned through a [`Subscription`] handle. The handle removes the
//! registration when explicitly unsubscribed or when dropped, so a consumer
//! that forgets to unsubscribe cannot leave a dangling callback behind.

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Unique identifier for a channel subscriber.
///
/// Each registered callback gets a unique ID when created. The ID is an
/// opaque token: it is used to remove the registration and to attribute
/// subscriber panics, never as an application-level identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a registered subscriber.
///
/// Calling [`unsubscribe`](Subscription::unsubscribe) removes exactly the
/// registration this handle was returned for; calling it again is a no-op.
/// Dropping the handle unsubscribes as well, so a `Subscription` can simply
/// be kept alive for as long as the consumer wants to receive notifications.
pub struct Subscription {
    id: SubscriberId,
    active: AtomicBool,

    /// Removal callback supplied by the channel that created this handle.
    /// Boxed so the handle does not carry the channel's payload type.
    remove: Box<dyn Fn(SubscriberId) + Send + Sync>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriberId, remove: Box<dyn Fn(SubscriberId) + Send + Sync>) -> Self {
        Self {
            id,
            active: AtomicBool::new(true),
            remove,
        }
    }

    /// Get the subscriber ID this handle was created for.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Check whether the registration is still active.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Remove the registration from its channel.
    ///
    /// Idempotent: only the first call removes anything.
    pub fn unsubscribe(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            (self.remove)(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
