//! Per-component telemetry client
//!
//! Binds a component id to an engine and a bus, injects the id into every
//! call, and stamps published events with the current session and pipeline
//! position. The component's own configuration gates everything here
//! independently of the engine's.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::event_bus::EventBus;
use crate::telemetry::{DebugConfiguration, TelemetryEngine, TelemetryResult};
use crate::types::{EventKind, IoEntry, LogLevel, PipelinePosition, TelemetryEvent};

pub struct TelemetryClient {
    module_id: String,
    engine: Arc<TelemetryEngine>,
    bus: Arc<EventBus>,
    config: DebugConfiguration,
    owns_engine: bool,
    session_id: Option<String>,
    position: PipelinePosition,
}

impl TelemetryClient {
    pub fn new(
        module_id: impl Into<String>,
        engine: Arc<TelemetryEngine>,
        bus: Arc<EventBus>,
        config: DebugConfiguration,
        owns_engine: bool,
    ) -> Self {
        Self {
            module_id: module_id.into(),
            engine,
            bus,
            config,
            owns_engine,
            session_id: None,
            position: PipelinePosition::default(),
        }
    }

    pub fn engine(&self) -> &Arc<TelemetryEngine> {
        &self.engine
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn config(&self) -> &DebugConfiguration {
        &self.config
    }

    pub fn owns_engine(&self) -> bool {
        self.owns_engine
    }

    /// Attach a shared engine; its configuration belongs to whoever created it
    pub fn set_engine(&mut self, engine: Arc<TelemetryEngine>) {
        self.engine = engine;
        self.owns_engine = false;
    }

    pub fn set_bus(&mut self, bus: Arc<EventBus>) {
        self.bus = bus;
    }

    /// Replace the component configuration, pushing it to an owned engine
    ///
    /// The configuration is validated even when the engine is shared and
    /// keeps its own.
    pub fn set_config(&mut self, config: DebugConfiguration) -> TelemetryResult<()> {
        config.validate()?;
        if self.owns_engine {
            self.engine.configure(config.clone())?;
        }
        self.config = config;
        Ok(())
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn set_session_id(&mut self, session_id: Option<String>) {
        self.session_id = session_id;
    }

    pub fn position(&self) -> PipelinePosition {
        self.position
    }

    pub fn set_position(&mut self, position: PipelinePosition) {
        self.position = position;
    }

    fn enabled(&self) -> bool {
        self.config.enabled
    }

    fn io_enabled(&self) -> bool {
        self.config.enabled && self.config.io_tracking.enabled
    }

    pub fn log(&self, level: LogLevel, message: &str, data: Option<Value>, method: Option<&str>) {
        if !self.enabled() || level < self.config.level {
            return;
        }
        self.engine.log(&self.module_id, level, message, data, method);
    }

    /// Debug-level log emitted only when data-flow tracking is on
    pub fn trace_data_flow(&self, message: &str, data: Value) {
        if self.config.track_data_flow {
            self.log(LogLevel::Debug, message, Some(data), None);
        }
    }

    pub fn start_io(&self, operation_id: &str, input: Value, method: Option<&str>) -> bool {
        if !self.io_enabled() {
            return false;
        }
        let event_data = json!({ "input": input, "method": method });
        let started = self
            .engine
            .start_operation(&self.module_id, operation_id, input, method);
        if started {
            self.publish(EventKind::Start, operation_id, event_data);
        }
        started
    }

    pub fn end_io(
        &self,
        operation_id: &str,
        output: Value,
        success: bool,
        error: Option<String>,
    ) -> Option<IoEntry> {
        if !self.io_enabled() {
            return None;
        }
        let entry = self
            .engine
            .end_operation(&self.module_id, operation_id, output, success, error)?;

        let kind = if entry.success {
            EventKind::End
        } else {
            EventKind::Error
        };
        let data = json!({
            "output": entry.output,
            "success": entry.success,
            "error": entry.error,
            "durationMs": entry.duration_ms,
        });
        self.publish(kind, operation_id, data);
        Some(entry)
    }

    pub fn record_io(
        &self,
        operation_id: &str,
        input: Value,
        output: Value,
        method: Option<&str>,
    ) -> Option<IoEntry> {
        if !self.io_enabled() {
            return None;
        }
        let entry = self
            .engine
            .record_operation(&self.module_id, operation_id, input, output, method)?;

        let data = json!({
            "input": entry.input,
            "output": entry.output,
            "method": entry.method,
            "success": true,
        });
        self.publish(EventKind::End, operation_id, data);
        Some(entry)
    }

    /// Publish a custom event; returns the number of callbacks that succeeded
    ///
    /// Custom events only need debugging enabled, not I/O tracking.
    pub fn emit(&self, operation_id: &str, data: Value) -> usize {
        if !self.enabled() {
            return 0;
        }
        self.publish(EventKind::Custom, operation_id, data)
    }

    fn publish(&self, kind: EventKind, operation_id: &str, data: Value) -> usize {
        let event = TelemetryEvent::new(kind, self.module_id.clone(), operation_id, data)
            .with_session(self.session_id.clone())
            .with_position(self.position);
        self.bus.publish(event)
    }
}
