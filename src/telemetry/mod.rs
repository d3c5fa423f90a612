//! Telemetry engine module
//!
//! This module provides log and I/O operation recording:
//! - `TelemetryEngine`: buffers entries, pairs start/end calls, persists files
//! - `DebugConfiguration`: what gets recorded and where
//! - `LogRotation` / `SessionRotation`: file rotation per phase directory
//! - `FileSystem`: the capability persistence goes through
//! - `TelemetryStats`: counters for observability of the engine itself
//!
//! # Architecture
//!
//! ```text
//! Write Path:
//! ┌───────────┐    ┌──────────────┐    ┌──────────────────┐    ┌───────────────────┐
//! │ component │───►│ ring buffer  │───►│ active phase dir │───►│ rotate past limit │
//! │ log / I/O │    │ (FIFO evict) │    │ systemstart|port │    │ size or line cap  │
//! └───────────┘    └──────────────┘    └──────────────────┘    └───────────────────┘
//!
//! Read Path:
//! ┌──────────────────┐    ┌────────────────────────┐
//! │ list_*_files()   │───►│ read_*_file() in order │
//! └──────────────────┘    └────────────────────────┘
//! ```

mod config;
mod engine;
mod error;
mod fs;
mod layout;
mod pending;
mod reader;
mod ring;
mod rotation;
mod stats;

pub use config::{DebugConfiguration, FileFormat, IoTrackingConfiguration};
pub use engine::{TelemetryEngine, ENGINE_MODULE_ID};
pub use error::{TelemetryError, TelemetryResult};
pub use fs::{FileSystem, StdFileSystem};
pub use layout::{sanitize_component, TelemetryLayout};
pub use pending::PendingOperations;
pub use ring::RingBuffer;
pub use rotation::{LogRotation, SessionRotation};
pub use stats::TelemetryStats;
