//! Shared state and behavior of every pipeline component

use std::sync::Arc;

use serde_json::{json, Value};

use super::connections::ConnectionRegistry;
use super::error::ModuleResult;
use super::lifecycle::{Lifecycle, LifecycleState};
use super::telemetry::TelemetryClient;
use crate::event_bus::{event_bus, EventBus};
use crate::session::SessionAggregator;
use crate::telemetry::{DebugConfiguration, TelemetryEngine};
use crate::types::{
    Connection, IoEntry, LogEntry, LogLevel, Message, MessageResponse, ModuleDescriptor,
    PipelinePosition,
};
use crate::validation::{validate, ValidationResult, ValidationRule};

/// Message type answered by every component
pub const PING_MESSAGE: &str = "ping";

/// Lifecycle, connections, validation and telemetry for one component
///
/// Component-specific behavior lives in a [`ModuleHandler`](super::ModuleHandler)
/// composed with this core by [`Component`](super::Component).
pub struct ModuleCore {
    descriptor: ModuleDescriptor,
    lifecycle: Lifecycle,
    options: Value,
    connections: ConnectionRegistry,
    rules: Vec<ValidationRule>,
    telemetry: TelemetryClient,
    aggregator: Option<Arc<dyn SessionAggregator>>,
}

impl ModuleCore {
    /// Create a core with its own engine on default settings and the global bus
    pub fn new(descriptor: ModuleDescriptor) -> ModuleResult<Self> {
        Self::with_debug_config(descriptor, DebugConfiguration::default())
    }

    /// Create a core with its own engine built from `config`
    pub fn with_debug_config(
        descriptor: ModuleDescriptor,
        config: DebugConfiguration,
    ) -> ModuleResult<Self> {
        let engine = Arc::new(TelemetryEngine::new(config.clone())?);
        let telemetry = TelemetryClient::new(descriptor.id.clone(), engine, event_bus(), config, true);

        Ok(Self {
            descriptor,
            lifecycle: Lifecycle::new(),
            options: Value::Null,
            connections: ConnectionRegistry::new(),
            rules: Vec::new(),
            telemetry,
            aggregator: None,
        })
    }

    /// Record into a shared engine instead of the owned one
    ///
    /// The component keeps its own configuration as a gate; the engine's
    /// configuration is left to its owner.
    pub fn with_engine(mut self, engine: Arc<TelemetryEngine>) -> Self {
        self.telemetry.set_engine(engine);
        self
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.telemetry.set_bus(bus);
        self
    }

    pub fn with_session_aggregator(mut self, aggregator: Arc<dyn SessionAggregator>) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    pub fn with_validation_rules(mut self, rules: Vec<ValidationRule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    pub fn is_initialized(&self) -> bool {
        self.lifecycle.state() == LifecycleState::Initialized
    }

    pub fn is_destroyed(&self) -> bool {
        self.lifecycle.state() == LifecycleState::Destroyed
    }

    /// Options passed to the last successful `configure`
    pub fn options(&self) -> &Value {
        &self.options
    }

    pub fn engine(&self) -> &Arc<TelemetryEngine> {
        self.telemetry.engine()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        self.telemetry.bus()
    }

    pub fn debug_config(&self) -> &DebugConfiguration {
        self.telemetry.config()
    }

    // Lifecycle

    /// Store component options; allowed any number of times before initialize
    pub fn configure(&mut self, options: Value) -> ModuleResult<()> {
        self.lifecycle.ensure_configurable(self.id())?;
        self.options = options;
        self.lifecycle.mark_configured();
        self.telemetry
            .log(LogLevel::Debug, "Module configured", Some(self.options.clone()), Some("configure"));
        Ok(())
    }

    /// Replace the debug configuration; same lifecycle rule as `configure`
    pub fn set_debug_config(&mut self, config: DebugConfiguration) -> ModuleResult<()> {
        self.lifecycle.ensure_configurable(self.id())?;
        self.telemetry.set_config(config)?;
        Ok(())
    }

    /// Fail if the component has been destroyed
    pub fn ensure_active(&self) -> ModuleResult<()> {
        self.lifecycle.ensure_not_destroyed(self.id())
    }

    /// Mark the component initialized; returns false if it already was
    pub fn initialize(&mut self) -> ModuleResult<bool> {
        let id = self.descriptor.id.clone();
        let transitioned = self.lifecycle.mark_initialized(&id)?;
        if transitioned {
            self.telemetry
                .log(LogLevel::Info, "Module initialized", None, Some("initialize"));
        }
        Ok(transitioned)
    }

    /// Release connections, buffered logs and pending operations
    ///
    /// Returns false if the component was already destroyed.
    pub fn destroy(&mut self) -> bool {
        if !self.lifecycle.mark_destroyed() {
            return false;
        }

        let engine = Arc::clone(self.telemetry.engine());
        for leaked in engine.discard_pending(&self.descriptor.id) {
            tracing::warn!(
                module_id = %leaked.module_id,
                operation_id = %leaked.operation_id,
                "Discarding operation that was started but never ended"
            );
        }

        self.connections.clear();
        let cleared = engine.clear_module_logs(&self.descriptor.id);
        self.telemetry.set_session_id(None);

        tracing::debug!(module_id = %self.descriptor.id, cleared_logs = cleared, "Module destroyed");
        true
    }

    // Connections

    pub fn add_input_connection(&mut self, connection: Connection) -> ModuleResult<()> {
        let data = json!({ "connectionId": connection.id, "source": connection.source_module_id });
        self.connections.add_input(connection)?;
        self.telemetry.trace_data_flow("Added input connection", data);
        Ok(())
    }

    pub fn add_output_connection(&mut self, connection: Connection) -> ModuleResult<()> {
        let data = json!({ "connectionId": connection.id, "target": connection.target_module_id });
        self.connections.add_output(connection)?;
        self.telemetry.trace_data_flow("Added output connection", data);
        Ok(())
    }

    pub fn remove_input_connection(&mut self, connection_id: &str) -> Option<Connection> {
        let removed = self.connections.remove_input(connection_id);
        if removed.is_some() {
            self.telemetry
                .trace_data_flow("Removed input connection", json!({ "connectionId": connection_id }));
        }
        removed
    }

    pub fn remove_output_connection(&mut self, connection_id: &str) -> Option<Connection> {
        let removed = self.connections.remove_output(connection_id);
        if removed.is_some() {
            self.telemetry
                .trace_data_flow("Removed output connection", json!({ "connectionId": connection_id }));
        }
        removed
    }

    pub fn input_connections(&self) -> Vec<&Connection> {
        self.connections.inputs()
    }

    pub fn output_connections(&self) -> Vec<&Connection> {
        self.connections.outputs()
    }

    pub fn input_connection_count(&self) -> usize {
        self.connections.input_count()
    }

    pub fn output_connection_count(&self) -> usize {
        self.connections.output_count()
    }

    // Messaging and validation

    /// Answer messages every component understands
    ///
    /// Returns `None` for types the component handler must decide on.
    pub fn handle_builtin_message(&self, message: &Message) -> Option<MessageResponse> {
        if message.message_type == PING_MESSAGE {
            return Some(MessageResponse::ok(json!({
                "pong": true,
                "moduleId": self.descriptor.id,
            })));
        }
        None
    }

    pub fn set_validation_rules(&mut self, rules: Vec<ValidationRule>) {
        self.rules = rules;
    }

    pub fn add_validation_rule(&mut self, rule: ValidationRule) {
        self.rules.push(rule);
    }

    pub fn validation_rules(&self) -> &[ValidationRule] {
        &self.rules
    }

    pub fn validate_input(&self, data: &Value) -> ValidationResult {
        validate(&self.rules, data)
    }

    // Logging

    pub fn log(&self, level: LogLevel, message: &str, data: Option<Value>, method: Option<&str>) {
        self.telemetry.log(level, message, data, method);
    }

    pub fn trace(&self, message: &str, data: Option<Value>) {
        self.log(LogLevel::Trace, message, data, None);
    }

    pub fn debug(&self, message: &str, data: Option<Value>) {
        self.log(LogLevel::Debug, message, data, None);
    }

    pub fn info(&self, message: &str, data: Option<Value>) {
        self.log(LogLevel::Info, message, data, None);
    }

    pub fn warn(&self, message: &str, data: Option<Value>) {
        self.log(LogLevel::Warn, message, data, None);
    }

    pub fn error(&self, message: &str, data: Option<Value>) {
        self.log(LogLevel::Error, message, data, None);
    }

    /// Buffered log entries of this component
    pub fn logs(&self) -> Vec<LogEntry> {
        self.engine().logs_for_module(&self.descriptor.id)
    }

    /// Buffered I/O entries of this component
    pub fn io_entries(&self) -> Vec<IoEntry> {
        self.engine().io_entries_for_module(&self.descriptor.id)
    }

    pub(crate) fn trace_data_flow(&self, message: &str, data: Value) {
        self.telemetry.trace_data_flow(message, data);
    }

    // I/O tracking

    /// Open an operation and publish a `start` event
    pub fn start_io_tracking(&self, operation_id: &str, input: Value, method: Option<&str>) -> bool {
        self.telemetry.start_io(operation_id, input, method)
    }

    /// Close an operation and publish `end`, or `error` when it failed
    pub fn end_io_tracking(
        &self,
        operation_id: &str,
        output: Value,
        success: bool,
        error: Option<String>,
    ) -> Option<IoEntry> {
        self.telemetry.end_io(operation_id, output, success, error)
    }

    /// Record a completed operation and publish an `end` event
    pub fn record_io_operation(
        &self,
        operation_id: &str,
        input: Value,
        output: Value,
        method: Option<&str>,
    ) -> Option<IoEntry> {
        self.telemetry.record_io(operation_id, input, output, method)
    }

    /// Publish a `custom` event
    pub fn emit_event(&self, operation_id: &str, data: Value) -> usize {
        self.telemetry.emit(operation_id, data)
    }

    // Sessions

    pub fn current_session(&self) -> Option<&str> {
        self.telemetry.session_id()
    }

    pub fn set_current_session(&mut self, session_id: Option<String>) {
        self.telemetry.set_session_id(session_id);
    }

    pub fn pipeline_position(&self) -> PipelinePosition {
        self.telemetry.position()
    }

    pub fn set_pipeline_position(&mut self, position: PipelinePosition) {
        self.telemetry.set_position(position);
    }

    /// Open a pipeline session and make it current
    ///
    /// The id comes from the session aggregator when one is attached and
    /// is generated locally otherwise.
    pub fn start_pipeline_session(&mut self, pipeline_id: &str, name: &str) -> String {
        let session_id = match &self.aggregator {
            Some(aggregator) => aggregator.start_pipeline_session(pipeline_id, name),
            None => format!("session_{}", uuid::Uuid::new_v4().simple()),
        };

        self.telemetry.set_session_id(Some(session_id.clone()));
        self.telemetry.log(
            LogLevel::Info,
            "Pipeline session started",
            Some(json!({
                "sessionId": session_id,
                "pipelineId": pipeline_id,
                "name": name,
            })),
            Some("startPipelineSession"),
        );
        session_id
    }

    /// Close the current session, returning its id
    pub fn end_pipeline_session(&mut self, success: bool) -> Option<String> {
        let session_id = self.telemetry.session_id()?.to_string();
        if let Some(aggregator) = &self.aggregator {
            aggregator.end_pipeline_session(&session_id, success);
        }

        self.telemetry.log(
            LogLevel::Info,
            "Pipeline session ended",
            Some(json!({ "sessionId": session_id, "success": success })),
            Some("endPipelineSession"),
        );
        self.telemetry.set_session_id(None);
        Some(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::{SubscriberResult, SubscriptionId, Topic};
    use crate::module::ModuleError;
    use crate::session::PipelineEntryFilter;
    use crate::telemetry::{IoTrackingConfiguration, TelemetryError};
    use crate::types::{EventKind, TelemetryEvent};
    use crate::validation::ValidationRule;
    use parking_lot::Mutex;
    use tempfile::TempDir;

    fn core_in(temp_dir: &TempDir, bus: Arc<EventBus>) -> ModuleCore {
        let config = DebugConfiguration::default()
            .with_base_directory(temp_dir.path())
            .with_level(LogLevel::Trace);
        ModuleCore::with_debug_config(ModuleDescriptor::new("parser", "Parser", "1.0.0"), config)
            .unwrap()
            .with_event_bus(bus)
    }

    fn collect(bus: &EventBus) -> Arc<Mutex<Vec<TelemetryEvent>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.subscribe(Topic::Wildcard, move |event: &TelemetryEvent| {
            sink.lock().push(event.clone());
            Ok(())
        });
        seen
    }

    #[test]
    fn test_configure_locked_after_initialize() {
        let temp_dir = TempDir::new().unwrap();
        let mut core = core_in(&temp_dir, Arc::new(EventBus::default()));

        core.configure(json!({"a": 1})).unwrap();
        core.configure(json!({"a": 2})).unwrap();
        assert_eq!(core.state(), LifecycleState::Configured);
        assert_eq!(core.options()["a"], 2);

        assert!(core.initialize().unwrap());
        assert!(!core.initialize().unwrap());

        let err = core.configure(json!({"a": 3})).unwrap_err();
        assert!(matches!(err, ModuleError::ConfigurationLocked { .. }));
        assert!(core
            .set_debug_config(DebugConfiguration::disabled())
            .is_err());
        assert_eq!(core.options()["a"], 2);
    }

    #[test]
    fn test_ping_is_builtin() {
        let temp_dir = TempDir::new().unwrap();
        let core = core_in(&temp_dir, Arc::new(EventBus::default()));

        let ping = Message::new("ping", "tester", "parser", Value::Null);
        let response = core.handle_builtin_message(&ping).unwrap();
        assert!(response.success);
        assert_eq!(response.data.unwrap(), json!({"pong": true, "moduleId": "parser"}));

        let other = Message::new("transform", "tester", "parser", Value::Null);
        assert!(core.handle_builtin_message(&other).is_none());
    }

    #[test]
    fn test_io_tracking_publishes_stamped_events() {
        let temp_dir = TempDir::new().unwrap();
        let bus = Arc::new(EventBus::default());
        let seen = collect(&bus);
        let mut core = core_in(&temp_dir, Arc::clone(&bus));
        core.set_current_session(Some("sess-1".to_string()));
        core.set_pipeline_position(PipelinePosition::Start);

        assert!(core.start_io_tracking("op-1", json!({"x": 1}), Some("parse")));
        let entry = core
            .end_io_tracking("op-1", json!({"y": 2}), false, Some("boom".to_string()))
            .unwrap();
        assert!(!entry.success);

        core.record_io_operation("op-2", json!(1), json!(2), None)
            .unwrap();
        core.emit_event("progress", json!({"done": 1}));

        let events = seen.lock();
        let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![EventKind::Start, EventKind::Error, EventKind::End, EventKind::Custom]
        );
        for event in events.iter() {
            assert_eq!(event.module_id, "parser");
            assert_eq!(event.session_id.as_deref(), Some("sess-1"));
            assert_eq!(event.position, PipelinePosition::Start);
        }
        assert_eq!(events[1].data["error"], "boom");
    }

    #[test]
    fn test_disabled_component_is_silent() {
        let temp_dir = TempDir::new().unwrap();
        let bus = Arc::new(EventBus::default());
        let seen = collect(&bus);
        let shared = Arc::new(
            TelemetryEngine::new(DebugConfiguration::default().with_base_directory(temp_dir.path()))
                .unwrap(),
        );

        let mut core = ModuleCore::new(ModuleDescriptor::new("quiet", "Quiet", "1.0.0"))
            .unwrap()
            .with_engine(Arc::clone(&shared))
            .with_event_bus(Arc::clone(&bus));
        core.set_debug_config(DebugConfiguration::disabled()).unwrap();

        core.error("ignored", None);
        assert!(!core.start_io_tracking("op", Value::Null, None));
        assert!(core.end_io_tracking("op", Value::Null, true, None).is_none());
        assert!(core.record_io_operation("op", Value::Null, Value::Null, None).is_none());
        assert_eq!(core.emit_event("op", Value::Null), 0);

        assert!(shared.logs().is_empty());
        assert!(shared.io_entries().is_empty());
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_io_disabled_still_logs() {
        let temp_dir = TempDir::new().unwrap();
        let mut core = core_in(&temp_dir, Arc::new(EventBus::default()));
        let config = DebugConfiguration::default()
            .with_base_directory(temp_dir.path())
            .with_io_tracking(IoTrackingConfiguration::disabled());
        core.set_debug_config(config).unwrap();

        core.info("still here", None);
        assert!(core.record_io_operation("op", json!(1), json!(2), None).is_none());
        assert_eq!(core.logs().len(), 1);
        assert!(core.io_entries().is_empty());
    }

    #[test]
    fn test_io_disabled_still_emits_custom_events() {
        let temp_dir = TempDir::new().unwrap();
        let bus = Arc::new(EventBus::default());
        let seen = collect(&bus);
        let mut core = core_in(&temp_dir, Arc::clone(&bus));
        let config = DebugConfiguration::default()
            .with_base_directory(temp_dir.path())
            .with_io_tracking(IoTrackingConfiguration::disabled());
        core.set_debug_config(config).unwrap();

        assert!(!core.start_io_tracking("op", json!(1), None));
        assert_eq!(core.emit_event("progress", json!({"done": 3})), 1);

        let events = seen.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Custom);
        assert_eq!(events[0].data["done"], 3);
    }

    #[test]
    fn test_shared_engine_rejects_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let shared = Arc::new(
            TelemetryEngine::new(DebugConfiguration::default().with_base_directory(temp_dir.path()))
                .unwrap(),
        );
        let mut core = core_in(&temp_dir, Arc::new(EventBus::default()))
            .with_engine(Arc::clone(&shared));
        assert!(!core.telemetry.owns_engine());

        let invalid = DebugConfiguration::default()
            .with_base_directory(temp_dir.path())
            .with_max_log_entries(0);
        let err = core.set_debug_config(invalid).unwrap_err();
        assert!(matches!(
            err,
            ModuleError::Telemetry(TelemetryError::InvalidConfiguration(_))
        ));
        assert_eq!(core.debug_config().max_log_entries, DebugConfiguration::default().max_log_entries);
        assert_eq!(shared.configuration().max_log_entries, DebugConfiguration::default().max_log_entries);
    }

    #[test]
    fn test_destroy_releases_everything() {
        let temp_dir = TempDir::new().unwrap();
        let mut core = core_in(&temp_dir, Arc::new(EventBus::default()));
        core.initialize().unwrap();
        core.add_input_connection(Connection::input("a", "parser")).unwrap();
        core.add_output_connection(Connection::output("parser", "b")).unwrap();
        core.start_io_tracking("leaked", json!(1), None);
        core.info("hello", None);

        assert!(core.destroy());
        assert!(!core.destroy());

        assert_eq!(core.input_connection_count(), 0);
        assert_eq!(core.output_connection_count(), 0);
        assert!(core.logs().is_empty());
        assert!(!core.engine().is_pending("parser", "leaked"));
        assert!(matches!(core.initialize(), Err(ModuleError::Destroyed { .. })));
    }

    #[test]
    fn test_connection_direction_checked() {
        let temp_dir = TempDir::new().unwrap();
        let mut core = core_in(&temp_dir, Arc::new(EventBus::default()));

        let err = core
            .add_input_connection(Connection::output("parser", "b"))
            .unwrap_err();
        assert!(matches!(err, ModuleError::ConnectionDirection { .. }));
        assert!(core.remove_output_connection("missing").is_none());
    }

    #[test]
    fn test_data_flow_logging() {
        let temp_dir = TempDir::new().unwrap();
        let mut core = core_in(&temp_dir, Arc::new(EventBus::default()));
        let mut config = core.debug_config().clone();
        config.track_data_flow = true;
        core.set_debug_config(config).unwrap();

        core.add_input_connection(Connection::input("a", "parser").with_id("in-1"))
            .unwrap();
        core.remove_input_connection("in-1");

        let messages: Vec<_> = core.logs().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["Added input connection", "Removed input connection"]);
    }

    #[test]
    fn test_validation_in_rule_order() {
        let temp_dir = TempDir::new().unwrap();
        let mut core = core_in(&temp_dir, Arc::new(EventBus::default()));
        core.add_validation_rule(ValidationRule::required("name", "name is required"));
        core.add_validation_rule(ValidationRule::number("age", "age must be a number"));

        let result = core.validate_input(&json!({"age": "x"}));
        assert!(!result.is_valid);
        assert_eq!(result.errors, vec!["name is required", "age must be a number"]);
        assert!(core.validate_input(&json!({"name": "n", "age": 3})).is_valid);
    }

    #[derive(Default)]
    struct RecordingAggregator {
        calls: Mutex<Vec<String>>,
        bus: EventBus,
    }

    impl SessionAggregator for RecordingAggregator {
        fn start_pipeline_session(&self, pipeline_id: &str, name: &str) -> String {
            self.calls.lock().push(format!("start:{}:{}", pipeline_id, name));
            "agg-session".to_string()
        }

        fn end_pipeline_session(&self, session_id: &str, success: bool) {
            self.calls.lock().push(format!("end:{}:{}", session_id, success));
        }

        fn subscribe(
            &self,
            topic: Topic,
            callback: Box<dyn Fn(&TelemetryEvent) -> SubscriberResult + Send + Sync>,
        ) -> SubscriptionId {
            self.bus.subscribe(topic, callback)
        }

        fn pipeline_entries(&self, _filter: &PipelineEntryFilter) -> Vec<TelemetryEvent> {
            Vec::new()
        }

        fn active_sessions(&self) -> Vec<String> {
            Vec::new()
        }

        fn clear(&self) {}
    }

    #[test]
    fn test_pipeline_session_delegates_to_aggregator() {
        let temp_dir = TempDir::new().unwrap();
        let aggregator = Arc::new(RecordingAggregator::default());
        let mut core = core_in(&temp_dir, Arc::new(EventBus::default()))
            .with_session_aggregator(aggregator.clone());

        let id = core.start_pipeline_session("pipe-1", "nightly");
        assert_eq!(id, "agg-session");
        assert_eq!(core.current_session(), Some("agg-session"));
        assert_eq!(core.end_pipeline_session(true).as_deref(), Some("agg-session"));
        assert!(core.current_session().is_none());
        assert!(core.end_pipeline_session(true).is_none());

        assert_eq!(
            *aggregator.calls.lock(),
            vec!["start:pipe-1:nightly", "end:agg-session:true"]
        );
        assert_eq!(core.logs().len(), 2);
    }

    #[test]
    fn test_local_session_without_aggregator() {
        let temp_dir = TempDir::new().unwrap();
        let mut core = core_in(&temp_dir, Arc::new(EventBus::default()));

        let id = core.start_pipeline_session("pipe-1", "adhoc");
        assert!(id.starts_with("session_"));
        assert_eq!(core.current_session(), Some(id.as_str()));
    }
}
