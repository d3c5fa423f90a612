//! Interface to the cross-pipeline session aggregator
//!
//! The aggregator lives outside this crate: it subscribes to telemetry
//! events and indexes them by pipeline. Components only need to open and
//! close sessions through it, so this module defines the boundary and
//! nothing more.

use serde::{Deserialize, Serialize};

use crate::event_bus::{SubscriberResult, SubscriptionId, Topic};
use crate::types::TelemetryEvent;

/// Selection of aggregated entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineEntryFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,
}

impl PipelineEntryFilter {
    pub fn for_session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            ..Default::default()
        }
    }

    /// Whether `event` passes the session and module criteria
    ///
    /// Pipeline membership is known only to the aggregator, so
    /// `pipeline_id` is not checked here.
    pub fn matches(&self, event: &TelemetryEvent) -> bool {
        let session_ok = match &self.session_id {
            Some(id) => event.session_id.as_deref() == Some(id.as_str()),
            None => true,
        };
        let module_ok = match &self.module_id {
            Some(id) => event.module_id == *id,
            None => true,
        };
        session_ok && module_ok
    }
}

/// External collaborator that correlates events across components
pub trait SessionAggregator: Send + Sync {
    /// Open a session for a pipeline run, returning its id
    fn start_pipeline_session(&self, pipeline_id: &str, name: &str) -> String;

    fn end_pipeline_session(&self, session_id: &str, success: bool);

    fn subscribe(
        &self,
        topic: Topic,
        callback: Box<dyn Fn(&TelemetryEvent) -> SubscriberResult + Send + Sync>,
    ) -> SubscriptionId;

    fn pipeline_entries(&self, filter: &PipelineEntryFilter) -> Vec<TelemetryEvent>;

    fn active_sessions(&self) -> Vec<String>;

    fn clear(&self);
}
