//! Connections between pipeline components

use serde::{Deserialize, Serialize};

/// Which side of a component a connection attaches to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionDirection {
    Input,
    Output,
}

impl std::fmt::Display for ConnectionDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionDirection::Input => write!(f, "input"),
            ConnectionDirection::Output => write!(f, "output"),
        }
    }
}

/// A directed link between two components
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: String,
    #[serde(rename = "type")]
    pub direction: ConnectionDirection,
    #[serde(rename = "sourceModuleId")]
    pub source_module_id: String,
    #[serde(rename = "targetModuleId")]
    pub target_module_id: String,
}

impl Connection {
    /// Create a connection with a generated id
    pub fn new(
        direction: ConnectionDirection,
        source_module_id: impl Into<String>,
        target_module_id: impl Into<String>,
    ) -> Self {
        Self {
            id: format!("conn_{}", uuid::Uuid::new_v4().simple()),
            direction,
            source_module_id: source_module_id.into(),
            target_module_id: target_module_id.into(),
        }
    }

    /// Create an input connection: data flows from `source` into `target`
    pub fn input(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(ConnectionDirection::Input, source, target)
    }

    /// Create an output connection: data flows from `source` out to `target`
    pub fn output(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(ConnectionDirection::Output, source, target)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}
