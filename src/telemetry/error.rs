//! Telemetry engine errors

use std::path::PathBuf;

use thiserror::Error;

use crate::types::Phase;

/// Result type for telemetry operations
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Errors that can occur in telemetry operations
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed record in {path}: {source}")]
    MalformedRecord {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("engine already bound to {current}, cannot switch to {requested}")]
    PhaseAlreadyBound { current: Phase, requested: Phase },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl TelemetryError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TelemetryError::Io {
            path: path.into(),
            source,
        }
    }
}
