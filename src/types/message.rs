//! Inter-module messages

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::time::current_timestamp_millis;

/// A message delivered to a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub payload: Value,
    pub timestamp: i64,
}

impl Message {
    /// Create a message with a generated id and the current timestamp
    pub fn new(
        message_type: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            id: format!("msg_{}", uuid::Uuid::new_v4().simple()),
            message_type: message_type.into(),
            source: source.into(),
            target: target.into(),
            payload,
            timestamp: current_timestamp_millis(),
        }
    }
}

/// Reply to a [`Message`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MessageResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Failure reply for a message type nobody handles
    pub fn unsupported(message_type: &str) -> Self {
        Self::failure(format!("Unsupported message type: {}", message_type))
    }
}
