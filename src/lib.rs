//! Pipeline Debug
//!
//! Debug and telemetry core for modular, pipeline-style components.
//!
//! # Features
//!
//! - **Structured logs**: per-component entries in a bounded ring, optional
//!   console echo and rotating JSONL log files
//! - **I/O tracing**: start/end pairing with durations, one-shot records,
//!   individual and session files
//! - **Phase-aware layout**: `systemstart/` until a port is bound, then
//!   `port-<n>/`
//! - **Event bus**: synchronous publish/subscribe with per-subscriber
//!   failure isolation
//! - **Component contract**: lifecycle, connections, messages and input
//!   validation wired to telemetry
//!
//! # Modules
//!
//! - `telemetry`: Engine, configuration, persistence layout and rotation
//! - `event_bus`: Process-wide and standalone telemetry event buses
//! - `module`: Component lifecycle, connections, messaging and handlers
//! - `validation`: Typed rules evaluated against JSON payloads
//! - `session`: Boundary to the external session aggregator
//! - `types`: Records shared by the modules above
//! - `logging`: Console subscriber for hosts
//! - `utils`: Utility functions (timestamps)
//!
//! # Example
//!
//! ```no_run
//! use pipeline_debug::{Component, DebugConfiguration, ModuleCore, ModuleDescriptor};
//! use serde_json::json;
//!
//! fn main() -> Result<(), pipeline_debug::ModuleError> {
//!     let descriptor = ModuleDescriptor::new("parser", "Parser", "1.0.0");
//!     let config = DebugConfiguration::default().with_file_logging(true);
//!     let mut component = Component::base(ModuleCore::with_debug_config(descriptor, config)?);
//!
//!     component.initialize()?;
//!     let core = component.core();
//!     core.start_io_tracking("parse-1", json!({"text": "a,b"}), Some("parse"));
//!     core.end_io_tracking("parse-1", json!(["a", "b"]), true, None);
//!     core.engine().switch_to_port_mode(8080)?;
//!     Ok(())
//! }
//! ```

pub mod event_bus;
pub mod logging;
pub mod module;
pub mod session;
pub mod telemetry;
pub mod types;
pub mod utils;
pub mod validation;

// Re-export commonly used items at crate root
pub use event_bus::{event_bus, reset_event_bus, EventBus, SubscriptionId, Topic};
pub use module::{Component, ModuleCore, ModuleError, ModuleHandler, ModuleResult};
pub use session::SessionAggregator;
pub use telemetry::{
    DebugConfiguration, FileFormat, IoTrackingConfiguration, TelemetryEngine, TelemetryError,
    TelemetryResult,
};
pub use types::{
    Connection, ConnectionDirection, EventKind, IoEntry, LogEntry, LogLevel, Message,
    MessageResponse, ModuleDescriptor, Phase, PipelinePosition, TelemetryEvent,
};
pub use validation::{ValidationResult, ValidationRule};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
