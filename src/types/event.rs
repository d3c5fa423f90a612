//! Telemetry events published on the event bus
//!
//! Events are the live counterpart of persisted I/O entries: a component
//! publishes one when an operation starts, ends or fails, and observers
//! (session aggregators, dashboards) build cross-component traces from them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::time::current_timestamp_millis;

/// Kinds of telemetry events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// An I/O operation started
    Start,
    /// An I/O operation completed successfully
    End,
    /// An I/O operation failed
    Error,
    /// Component-defined event
    Custom,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Start => write!(f, "start"),
            EventKind::End => write!(f, "end"),
            EventKind::Error => write!(f, "error"),
            EventKind::Custom => write!(f, "custom"),
        }
    }
}

/// A component's self-declared role in a multi-component trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PipelinePosition {
    Start,
    #[default]
    Middle,
    End,
}

/// The unit published on the event bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(rename = "sessionId", default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(rename = "moduleId")]
    pub module_id: String,
    #[serde(rename = "operationId")]
    pub operation_id: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub position: PipelinePosition,
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
}

impl TelemetryEvent {
    /// Create an event stamped with the current time
    pub fn new(
        kind: EventKind,
        module_id: impl Into<String>,
        operation_id: impl Into<String>,
        data: Value,
    ) -> Self {
        Self {
            kind,
            session_id: None,
            module_id: module_id.into(),
            operation_id: operation_id.into(),
            data,
            position: PipelinePosition::default(),
            timestamp: current_timestamp_millis(),
        }
    }

    pub fn with_session(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn with_position(mut self, position: PipelinePosition) -> Self {
        self.position = position;
        self
    }
}
