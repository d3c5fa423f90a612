//! Telemetry event bus
//!
//! Provides a process-wide publish/subscribe registry that components use to
//! fan out live telemetry events to observers (session aggregators,
//! dashboards, tests).
//!
//! # Design
//!
//! The shared instance is reached through [`event_bus`] rather than a bare
//! global, and [`reset_event_bus`] clears it between test runs. Components
//! can also be handed an independent [`EventBus`] for isolation.

mod bus;

use std::sync::{Arc, OnceLock};

pub use bus::{
    BusStats, EventBus, QueuedEvent, Subscriber, SubscriberError, SubscriberResult,
    SubscriptionId, Topic, DEFAULT_MAX_QUEUE_SIZE,
};

/// Process-wide bus instance (created on first access)
static EVENT_BUS: OnceLock<Arc<EventBus>> = OnceLock::new();

/// Get the process-wide event bus
pub fn event_bus() -> Arc<EventBus> {
    Arc::clone(EVENT_BUS.get_or_init(|| Arc::new(EventBus::default())))
}

/// Remove every subscriber from the process-wide bus and reset its accounting
pub fn reset_event_bus() {
    if let Some(bus) = EVENT_BUS.get() {
        bus.clear();
    }
}
