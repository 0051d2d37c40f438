//! Change notification for long-lived viewer connections.
//!
//! Each viewer holds a [`Subscription`]. [`ChangeNotifier::notify_all`] marks
//! every live subscription as pending and wakes it; the subscription then
//! pushes one full snapshot, however many notifications arrived meanwhile.
//!
//! The notifier only keeps weak references. A viewer that goes away simply
//! drops its subscription and is pruned on the next notification, so no
//! disconnect detection is needed on the broadcasting side.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{debug, trace};

/// Identifier of a subscription.
pub type SubscriptionId = u64;

#[derive(Debug, Default)]
struct Slot {
    pending: AtomicBool,
    wake: Notify,
}

/// Outcome of [`Subscription::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// The snapshot changed since the last wake; push it.
    Changed,
    /// The idle timeout elapsed with nothing to send.
    Idle,
}

/// Registry of viewer subscriptions.
#[derive(Debug, Default)]
pub struct ChangeNotifier {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<SubscriptionId, Weak<Slot>>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscription.
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let slot = Arc::new(Slot::default());
        self.subscribers().insert(id, Arc::downgrade(&slot));
        debug!(subscription = id, "Viewer subscribed");
        Subscription { id, slot }
    }

    /// Remove a subscription explicitly.
    ///
    /// Dropping the [`Subscription`] has the same effect, lazily.
    pub fn unsubscribe(&self, subscription: &Subscription) {
        if self.subscribers().remove(&subscription.id).is_some() {
            debug!(subscription = subscription.id, "Viewer unsubscribed");
        }
    }

    /// Wake every live subscription, pruning the ones that were dropped.
    ///
    /// Returns the number of subscriptions woken.
    pub fn notify_all(&self) -> usize {
        let mut subscribers = self.subscribers();
        subscribers.retain(|id, slot| match slot.upgrade() {
            Some(slot) => {
                slot.pending.store(true, Ordering::Release);
                slot.wake.notify_one();
                true
            }
            None => {
                trace!(subscription = *id, "Pruning closed viewer");
                false
            }
        });
        subscribers.len()
    }

    /// Number of registered subscriptions, including any not yet pruned.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers().len()
    }

    fn subscribers(&self) -> MutexGuard<'_, HashMap<SubscriptionId, Weak<Slot>>> {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A viewer's handle on the change feed.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    slot: Arc<Slot>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Suspend until notified or until `idle` elapses.
    ///
    /// A notification that arrives while nobody is waiting is not lost: the
    /// next call returns [`Wake::Changed`] immediately.
    pub async fn wait(&self, idle: Duration) -> Wake {
        let _ = tokio::time::timeout(idle, self.slot.wake.notified()).await;
        if self.slot.pending.swap(false, Ordering::AcqRel) {
            Wake::Changed
        } else {
            Wake::Idle
        }
    }
}
