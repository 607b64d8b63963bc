//! Event bus: broker event fan-out to independent subscribers.
//!
//! Every subscriber gets its own bounded queue. `publish` never awaits: a
//! subscriber whose queue is full or whose receiver is gone is evicted on the
//! spot, which ends its stream without affecting anyone else.

use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use futures::Stream;
use gatehouse_core::BrokerEvent;
use gatehouse_core::ids::new_subscriber_id;
use gatehouse_core::metric_names::BUS_EVICTIONS_TOTAL;
use indexmap::IndexMap;
use metrics::counter;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Default per-subscriber queue capacity.
pub const DEFAULT_CAPACITY: usize = 256;

struct BusInner {
    subscribers: Mutex<IndexMap<String, mpsc::Sender<BrokerEvent>>>,
    /// Tracks subscriber count without taking the lock.
    active_count: AtomicUsize,
    capacity: usize,
}

impl BusInner {
    fn remove(&self, id: &str) -> bool {
        let removed = self.subscribers.lock().shift_remove(id).is_some();
        if removed {
            let _ = self.active_count.fetch_sub(1, Ordering::Relaxed);
        }
        removed
    }
}

/// Publish/subscribe hub for [`BrokerEvent`]s.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Create a bus with the default queue capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a bus with a custom per-subscriber queue capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(BusInner {
                subscribers: Mutex::new(IndexMap::new()),
                active_count: AtomicUsize::new(0),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Register a new subscriber. It receives every event published from now
    /// on, in publish order, until it is dropped or evicted.
    pub fn subscribe(&self) -> Subscription {
        let id = new_subscriber_id();
        let (tx, rx) = mpsc::channel(self.inner.capacity);
        let _ = self.inner.subscribers.lock().insert(id.clone(), tx);
        let _ = self.inner.active_count.fetch_add(1, Ordering::Relaxed);
        debug!(subscriber_id = %id, "bus subscriber added");
        Subscription {
            id,
            rx,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Remove a subscriber by ID. Returns `true` if it was registered.
    pub fn unsubscribe(&self, subscriber_id: &str) -> bool {
        self.inner.remove(subscriber_id)
    }

    /// Deliver `event` to every subscriber. Returns the number reached.
    pub fn publish(&self, event: &BrokerEvent) -> usize {
        let mut subscribers = self.inner.subscribers.lock();
        let mut evicted = Vec::new();
        let mut delivered = 0usize;
        for (id, tx) in subscribers.iter() {
            match tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(subscriber_id = %id, event_type = event.event_type(), "subscriber queue full, evicting");
                    evicted.push(id.clone());
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(subscriber_id = %id, "subscriber gone, removing");
                    evicted.push(id.clone());
                }
            }
        }
        for id in &evicted {
            if subscribers.shift_remove(id).is_some() {
                let _ = self.inner.active_count.fetch_sub(1, Ordering::Relaxed);
                counter!(BUS_EVICTIONS_TOTAL).increment(1);
            }
        }
        debug!(
            event_type = event.event_type(),
            request_id = event.request_id(),
            delivered,
            "published event"
        );
        delivered
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.active_count.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving end of a bus subscription. Unsubscribes on drop.
pub struct Subscription {
    id: String,
    rx: mpsc::Receiver<BrokerEvent>,
    bus: Weak<BusInner>,
}

impl Subscription {
    /// Subscriber ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the next event. `None` once evicted (after draining) or
    /// when the bus is gone.
    pub async fn recv(&mut self) -> Option<BrokerEvent> {
        self.rx.recv().await
    }

    /// Take the next queued event without waiting.
    pub fn try_recv(&mut self) -> Option<BrokerEvent> {
        self.rx.try_recv().ok()
    }
}

impl Stream for Subscription {
    type Item = BrokerEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            if bus.remove(&self.id) {
                debug!(subscriber_id = %self.id, "bus subscriber dropped");
            }
        }
    }
}
