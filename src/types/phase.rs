//! File-destination phase of a telemetry engine

use serde::{Deserialize, Serialize};

/// Where persisted telemetry lands: before or after the host binds a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    SystemStart,
    Port(u16),
}

impl Phase {
    /// Directory name of this phase under the base directory
    pub fn dir_name(&self) -> String {
        match self {
            Phase::SystemStart => "systemstart".to_string(),
            Phase::Port(port) => format!("port-{}", port),
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}
