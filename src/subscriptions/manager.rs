//! Subscription manager for broadcasting store changes.

use crate::types::{OperationKind, Version};
use crate::value::StateValue;
use crossbeam_channel::{bounded, Sender};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::types::{
    DropReason, StoreEvent, SubscriptionConfig, SubscriptionHandle, SubscriptionId,
};

/// Internal subscription state.
struct Subscription {
    config: SubscriptionConfig,
    /// Holds `buffer_size + 1` events; the extra slot is kept for the drop notice.
    sender: Sender<StoreEvent>,
}

impl Subscription {
    /// Try to send an event. Returns false once `buffer_size` events are
    /// queued (subscriber will be dropped).
    fn try_send(&self, event: StoreEvent) -> bool {
        if self.sender.len() >= self.config.buffer_size.max(1) {
            return false;
        }
        self.sender.try_send(event).is_ok()
    }

    /// Notify the subscriber that it was dropped. Uses the reserved slot.
    fn notify_dropped(&self, reason: DropReason) {
        // The receiver may already be gone.
        let _ = self.sender.try_send(StoreEvent::Dropped { reason });
    }
}

/// Manages subscriptions and broadcasts events.
pub struct SubscriptionManager {
    /// Active subscriptions by ID.
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
}

impl SubscriptionManager {
    /// Create a new subscription manager.
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a new subscription.
    ///
    /// Replaying current state is the caller's job, see [`Self::send_to`].
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(config.buffer_size.max(1) + 1);

        self.subscriptions
            .write()
            .insert(id, Subscription { config, sender });

        SubscriptionHandle { id, receiver }
    }

    /// Unsubscribe and clean up.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut subs = self.subscriptions.write();
        if let Some(sub) = subs.remove(&id) {
            sub.notify_dropped(DropReason::Unsubscribed);
        }
    }

    /// Get subscription count.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Send an event directly to one subscription.
    ///
    /// Returns false if the subscription is gone or its buffer is full; a
    /// full subscriber is dropped with [`DropReason::BufferOverflow`].
    pub fn send_to(&self, id: SubscriptionId, event: StoreEvent) -> bool {
        let delivered = match self.subscriptions.read().get(&id) {
            Some(sub) => sub.try_send(event),
            None => return false,
        };
        if !delivered {
            self.drop_overflowed(vec![id]);
        }
        delivered
    }

    /// Broadcast a new store state to matching subscriptions.
    pub fn broadcast_change(
        &self,
        key: &str,
        version: Version,
        operation: OperationKind,
        state: &StateValue,
    ) {
        let event = StoreEvent::StateChanged {
            key: key.to_string(),
            version,
            operation,
            state: state.clone(),
        };

        self.broadcast(|sub| sub.config.filter.matches(key), event);
    }

    /// Internal broadcast helper. Drops subscribers that fail to receive.
    fn broadcast<F>(&self, filter: F, event: StoreEvent)
    where
        F: Fn(&Subscription) -> bool,
    {
        let mut to_remove = Vec::new();

        {
            let subs = self.subscriptions.read();
            for (id, sub) in subs.iter() {
                if filter(sub) && !sub.try_send(event.clone()) {
                    to_remove.push(*id);
                }
            }
        }

        if !to_remove.is_empty() {
            self.drop_overflowed(to_remove);
        }
    }

    fn drop_overflowed(&self, ids: Vec<SubscriptionId>) {
        let mut subs = self.subscriptions.write();
        for id in ids {
            if let Some(sub) = subs.remove(&id) {
                tracing::debug!(subscription = id.0, "dropping slow subscriber");
                sub.notify_dropped(DropReason::BufferOverflow);
            }
        }
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}
