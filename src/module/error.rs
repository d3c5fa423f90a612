//! Module core errors

use thiserror::Error;

use crate::telemetry::TelemetryError;
use crate::types::ConnectionDirection;

/// Result type for module operations
pub type ModuleResult<T> = Result<T, ModuleError>;

/// Errors raised by the module contract
///
/// Validation failures and unsupported messages are not errors; they come
/// back as `ValidationResult` and `MessageResponse` values.
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("module {module_id} is initialized; its configuration can no longer change")]
    ConfigurationLocked { module_id: String },

    #[error("module {module_id} has been destroyed")]
    Destroyed { module_id: String },

    #[error("connection {connection_id} has direction {actual}, expected {expected}")]
    ConnectionDirection {
        connection_id: String,
        expected: ConnectionDirection,
        actual: ConnectionDirection,
    },

    #[error("handler failed: {0}")]
    Handler(String),

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
}
