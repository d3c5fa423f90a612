//! Data types for the pipeline debug core
//!
//! This module contains the records shared by the telemetry engine, the
//! event bus and the module core.

mod connection;
mod descriptor;
mod event;
mod io_entry;
mod log_entry;
mod message;
mod phase;

pub use connection::{Connection, ConnectionDirection};
pub use descriptor::ModuleDescriptor;
pub use event::{EventKind, PipelinePosition, TelemetryEvent};
pub use io_entry::{IoEntry, PendingOperation};
pub use log_entry::{LogEntry, LogLevel};
pub use message::{Message, MessageResponse};
pub use phase::Phase;

