//! In-process event bus.
//!
//! Aggregates publish a [`StorefrontEvent`] after every durable write so
//! that views (badges, counters, the CLI) can react without polling the
//! storage backend. Handlers run synchronously on the publishing thread.

use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::models::ProductId;

/// Something that changed in the storefront state.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StorefrontEvent {
    /// The cart lines were written.
    CartChanged,
    /// A product was added to the wishlist.
    WishlistItemAdded(ProductId),
    /// A product was removed from the wishlist.
    WishlistItemRemoved(ProductId),
    /// The address book or the checkout selection was written.
    AddressesChanged,
    /// The seller's coupon list was written.
    CouponsChanged,
    /// The home banner was changed.
    HomeContentChanged,
    /// Another session wrote `key` and local state was reloaded from it.
    StorageChanged {
        /// Storage key that changed.
        key: String,
    },
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Boxed event handler.
type Handler = Arc<dyn Fn(&StorefrontEvent) + Send + Sync>;

/// Subscribe/unsubscribe/publish hub shared by all aggregates of a session.
#[derive(Default)]
pub struct EventBus {
    /// Source of subscription ids.
    next_id: AtomicU64,
    /// Registered handlers in subscription order.
    handlers: Mutex<Vec<(SubscriptionId, Handler)>>,
}

impl core::fmt::Debug for EventBus {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Creates a bus with no subscribers.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler invoked for every published event.
    #[inline]
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&StorefrontEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(handler)));
        id
    }

    /// Removes a handler. Returns `false` if it was not registered.
    #[inline]
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        let before = handlers.len();
        handlers.retain(|entry| entry.0 != id);
        handlers.len() != before
    }

    /// Delivers `event` to every current subscriber.
    ///
    /// The handler list is snapshotted first, so handlers may subscribe or
    /// unsubscribe without deadlocking.
    #[inline]
    pub fn publish(&self, event: &StorefrontEvent) {
        let snapshot: Vec<Handler> = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|entry| Arc::clone(&entry.1))
            .collect();
        tracing::trace!(?event, subscribers = snapshot.len(), "publishing event");
        for handler in snapshot {
            handler(event);
        }
    }

    /// Returns the number of registered handlers.
    #[inline]
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Subscribes a handler that records every event, for assertions in tests.
#[cfg(test)]
pub(crate) fn record(bus: &EventBus) -> Arc<Mutex<Vec<StorefrontEvent>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _id = bus.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
    seen
}
