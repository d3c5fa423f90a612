//! I/O operation traces

use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One recorded input/output operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IoEntry {
    #[serde(rename = "moduleId")]
    pub module_id: String,
    #[serde(rename = "operationId")]
    pub operation_id: String,
    pub input: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Elapsed milliseconds between start and end, for paired operations.
    /// Fractional, so sub-millisecond operations still read as non-zero.
    #[serde(rename = "durationMs", default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    /// Unix timestamp in milliseconds; 0 when stripped from a persisted record
    #[serde(default)]
    pub timestamp: i64,
}

/// An operation that has been started but not yet ended
#[derive(Debug, Clone)]
pub struct PendingOperation {
    pub module_id: String,
    pub operation_id: String,
    pub input: Value,
    pub method: Option<String>,
    /// Wall-clock start, Unix milliseconds
    pub started_at: i64,
    pub start_time: Instant,
}

impl PendingOperation {
    /// Milliseconds elapsed since the operation started
    pub fn elapsed_ms(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64() * 1000.0
    }
}
