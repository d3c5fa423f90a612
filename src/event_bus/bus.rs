//! Publish/subscribe registry for telemetry events
//!
//! Delivery is synchronous: `publish` invokes every matching callback before
//! it returns. The bounded queue kept alongside is accounting only (what was
//! published recently, what got dropped), never a delivery buffer.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::types::{EventKind, TelemetryEvent};

/// Default number of tracked records before the oldest is dropped
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 1000;

/// Error a subscriber may return; it is logged and does not stop delivery
pub type SubscriberError = Box<dyn std::error::Error + Send + Sync>;

/// Result returned by subscriber callbacks
pub type SubscriberResult = Result<(), SubscriberError>;

/// Subscriber callback
pub type Subscriber = Arc<dyn Fn(&TelemetryEvent) -> SubscriberResult + Send + Sync>;

/// What a subscription listens to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Kind(EventKind),
    /// Every event kind
    Wildcard,
}

impl Topic {
    pub fn matches(&self, kind: EventKind) -> bool {
        match self {
            Topic::Kind(k) => *k == kind,
            Topic::Wildcard => true,
        }
    }
}

impl From<EventKind> for Topic {
    fn from(kind: EventKind) -> Self {
        Topic::Kind(kind)
    }
}

/// Handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct SubscriberEntry {
    id: SubscriptionId,
    topic: Topic,
    callback: Subscriber,
}

/// Accounting record of one published event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedEvent {
    pub kind: EventKind,
    pub module_id: String,
    pub operation_id: String,
    pub timestamp: i64,
}

/// Observability of the bus itself
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusStats {
    pub queue_size: usize,
    pub max_queue_size: usize,
    pub subscriber_count: usize,
    pub published: u64,
    pub delivered: u64,
    pub failed_deliveries: u64,
    /// Records dropped from the tracking queue
    pub dropped: u64,
}

#[derive(Debug)]
struct BusQueue {
    records: VecDeque<QueuedEvent>,
    max_size: usize,
    published: u64,
    delivered: u64,
    failed: u64,
    dropped: u64,
}

impl BusQueue {
    fn new(max_size: usize) -> Self {
        Self {
            records: VecDeque::new(),
            max_size: max_size.max(1),
            published: 0,
            delivered: 0,
            failed: 0,
            dropped: 0,
        }
    }

    fn track(&mut self, event: &TelemetryEvent) {
        self.published += 1;
        if self.records.len() >= self.max_size {
            self.records.pop_front();
            self.dropped += 1;
        }
        self.records.push_back(QueuedEvent {
            kind: event.kind,
            module_id: event.module_id.clone(),
            operation_id: event.operation_id.clone(),
            timestamp: event.timestamp,
        });
    }

    fn reset(&mut self) {
        *self = Self::new(self.max_size);
    }
}

/// In-process telemetry event bus
pub struct EventBus {
    subscribers: RwLock<Vec<SubscriberEntry>>,
    queue: Mutex<BusQueue>,
    next_id: AtomicU64,
}

impl EventBus {
    /// Create a bus tracking at most `max_queue_size` recent events
    pub fn new(max_queue_size: usize) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            queue: Mutex::new(BusQueue::new(max_queue_size)),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register a callback for one event kind or for all of them
    ///
    /// Callbacks run in subscription order.
    pub fn subscribe<T, F>(&self, topic: T, callback: F) -> SubscriptionId
    where
        T: Into<Topic>,
        F: Fn(&TelemetryEvent) -> SubscriberResult + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.subscribers.write().push(SubscriberEntry {
            id,
            topic: topic.into(),
            callback: Arc::new(callback),
        });
        id
    }

    /// Remove a subscription, returning whether it existed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }

    /// Deliver `event` to every matching subscriber
    ///
    /// A callback that errors or panics is logged and skipped; the remaining
    /// callbacks still run. Returns the number of successful deliveries.
    pub fn publish(&self, event: TelemetryEvent) -> usize {
        // Snapshot outside the lock so callbacks may subscribe or publish
        let targets: Vec<(SubscriptionId, Subscriber)> = self
            .subscribers
            .read()
            .iter()
            .filter(|s| s.topic.matches(event.kind))
            .map(|s| (s.id, Arc::clone(&s.callback)))
            .collect();

        self.queue.lock().track(&event);

        let mut delivered = 0usize;
        let mut failed = 0u64;
        for (id, callback) in targets {
            match panic::catch_unwind(AssertUnwindSafe(|| callback(&event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    failed += 1;
                    tracing::warn!(
                        subscription = ?id,
                        kind = %event.kind,
                        module_id = %event.module_id,
                        error = %e,
                        "event subscriber failed"
                    );
                }
                Err(_) => {
                    failed += 1;
                    tracing::warn!(
                        subscription = ?id,
                        kind = %event.kind,
                        module_id = %event.module_id,
                        "event subscriber panicked"
                    );
                }
            }
        }

        let mut queue = self.queue.lock();
        queue.delivered += delivered as u64;
        queue.failed += failed;
        delivered
    }

    pub fn stats(&self) -> BusStats {
        let subscriber_count = self.subscribers.read().len();
        let queue = self.queue.lock();
        BusStats {
            queue_size: queue.records.len(),
            max_queue_size: queue.max_size,
            subscriber_count,
            published: queue.published,
            delivered: queue.delivered,
            failed_deliveries: queue.failed,
            dropped: queue.dropped,
        }
    }

    /// Recently published events, oldest first
    pub fn recent_events(&self) -> Vec<QueuedEvent> {
        self.queue.lock().records.iter().cloned().collect()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Remove all subscribers and reset accounting
    pub fn clear(&self) {
        self.subscribers.write().clear();
        self.queue.lock().reset();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_QUEUE_SIZE)
    }
}
