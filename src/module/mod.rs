//! Pipeline component contract
//!
//! A component is a [`ModuleCore`] (lifecycle, connections, validation and
//! a telemetry client bound to the component id) composed with a
//! [`ModuleHandler`] that supplies the component-specific behavior.
//!
//! ```text
//! Component<H>
//!   ├── ModuleCore
//!   │     ├── Lifecycle          Created → Configured → Initialized → Destroyed
//!   │     ├── ConnectionRegistry inputs / outputs
//!   │     ├── ValidationRule[]
//!   │     └── TelemetryClient ──► TelemetryEngine (record)
//!   │                         └─► EventBus        (publish)
//!   └── H: ModuleHandler         on_initialize / receive_data / handle_message
//! ```

mod component;
mod connections;
mod error;
mod lifecycle;
mod module_core;
mod telemetry;

pub use component::{BaseHandler, Component, ModuleHandler};
pub use connections::ConnectionRegistry;
pub use error::{ModuleError, ModuleResult};
pub use lifecycle::{Lifecycle, LifecycleState};
pub use module_core::{ModuleCore, PING_MESSAGE};
pub use telemetry::TelemetryClient;
