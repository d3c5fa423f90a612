//! Telemetry engine - log and I/O operation recording
//!
//! The engine owns the phase state, the bounded in-memory buffers and file
//! persistence. Every call runs to completion under one lock, so file writes
//! for a given target keep call order and a rotation always finishes the
//! current file before the next one is used.
//!
//! Persistence failures never reach the caller: they become an internal
//! warning entry (module id [`ENGINE_MODULE_ID`]) and a `tracing` warning.
//! Only directory creation at construction, phase switch or base directory
//! change is fatal.

use std::backtrace::Backtrace;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use super::config::DebugConfiguration;
use super::error::{TelemetryError, TelemetryResult};
use super::fs::{FileSystem, StdFileSystem};
use super::layout::TelemetryLayout;
use super::pending::PendingOperations;
use super::reader;
use super::ring::RingBuffer;
use super::rotation::{LogRotation, SessionRotation};
use super::stats::TelemetryStats;
use crate::types::{IoEntry, LogEntry, LogLevel, PendingOperation, Phase};
use crate::utils::time::{current_timestamp_millis, format_timestamp_millis};

/// Module id stamped on the engine's own warnings
pub const ENGINE_MODULE_ID: &str = "telemetry-engine";

#[derive(Debug, Default)]
struct WriteCounters {
    log_lines: u64,
    individual_files: u64,
    session_lines: u64,
    failures: u64,
}

struct EngineState {
    config: DebugConfiguration,
    phase: Phase,
    layout: TelemetryLayout,
    logs: RingBuffer<LogEntry>,
    io_entries: RingBuffer<IoEntry>,
    pending: PendingOperations,
    log_rotation: LogRotation,
    session_rotation: SessionRotation,
    counters: WriteCounters,
}

impl EngineState {
    fn new(config: DebugConfiguration) -> Self {
        let layout = TelemetryLayout::new(&config.base_directory, &config.io_tracking.io_directory);
        Self {
            logs: RingBuffer::new(config.max_log_entries),
            io_entries: RingBuffer::new(config.io_tracking.max_session_operations),
            phase: Phase::SystemStart,
            layout,
            pending: PendingOperations::new(),
            log_rotation: LogRotation::new(),
            session_rotation: SessionRotation::new(),
            counters: WriteCounters::default(),
            config,
        }
    }

    fn io_enabled(&self) -> bool {
        self.config.enabled && self.config.io_tracking.enabled
    }

    fn reset_rotation(&mut self) {
        self.log_rotation.reset();
        self.session_rotation.reset();
    }

    /// Record a warning from the engine itself; never persisted
    fn internal_warning(&mut self, message: String) {
        tracing::warn!(target: "pipeline_debug::telemetry", "{}", message);

        if self.config.enabled && LogLevel::Warn >= self.config.level {
            self.logs.push(LogEntry {
                timestamp: current_timestamp_millis(),
                level: LogLevel::Warn,
                message,
                data: None,
                method: None,
                module_id: ENGINE_MODULE_ID.to_string(),
                stack: None,
            });
        }
    }

    fn persistence_failed(&mut self, what: &str, error: TelemetryError) {
        self.counters.failures += 1;
        self.internal_warning(format!("Failed to write {}: {}", what, error));
    }

    fn write_log_line(&mut self, fs: &dyn FileSystem, entry: &LogEntry) -> TelemetryResult<()> {
        let path = self.log_rotation.active_path(
            fs,
            &self.layout,
            self.phase,
            self.config.max_file_size,
            self.config.max_log_files,
        )?;
        let line = entry.to_json_line()?;
        fs.append_line(&path, &line)
            .map_err(|e| TelemetryError::io(&path, e))
    }

    /// Serialized form of an entry as it goes to disk
    fn persisted_record(&self, entry: &IoEntry) -> TelemetryResult<Value> {
        let mut record = serde_json::to_value(entry)?;
        if let Value::Object(map) = &mut record {
            if !self.config.io_tracking.include_timestamp {
                map.remove("timestamp");
            }
            if !self.config.io_tracking.include_duration {
                map.remove("durationMs");
            }
        }
        Ok(record)
    }

    fn write_individual_file(
        &mut self,
        fs: &dyn FileSystem,
        entry: &IoEntry,
        record: &Value,
    ) -> TelemetryResult<PathBuf> {
        let format = self.config.io_tracking.individual_file_format;
        let mut path = self.layout.individual_file_path(
            self.phase,
            &entry.module_id,
            &entry.operation_id,
            None,
            format,
        );

        // Same operation id recorded twice: disambiguate by timestamp, then by counter
        let mut attempt = 0u32;
        while fs.exists(&path) {
            let suffix = if attempt == 0 {
                entry.timestamp.to_string()
            } else {
                format!("{}-{}", entry.timestamp, attempt)
            };
            path = self.layout.individual_file_path(
                self.phase,
                &entry.module_id,
                &entry.operation_id,
                Some(&suffix),
                format,
            );
            attempt += 1;
        }

        let content = format.render(record)?;
        fs.write_atomic(&path, &content)
            .map_err(|e| TelemetryError::io(&path, e))?;
        Ok(path)
    }

    fn write_session_line(
        &mut self,
        fs: &dyn FileSystem,
        entry: &IoEntry,
        record: &Value,
    ) -> TelemetryResult<PathBuf> {
        let io = &self.config.io_tracking;
        let path = self.session_rotation.active_path(
            fs,
            &self.layout,
            self.phase,
            &entry.module_id,
            io.session_file_format,
            io.max_entries_per_file,
        )?;
        let line = serde_json::to_string(record)?;
        fs.append_line(&path, &line)
            .map_err(|e| TelemetryError::io(&path, e))?;
        self.session_rotation.record_write(&entry.module_id);
        Ok(path)
    }

    fn persist_io_entry(&mut self, fs: &dyn FileSystem, entry: &IoEntry) {
        let io = &self.config.io_tracking;
        let (individual, session) = (io.save_individual_files, io.save_session_files);
        if !individual && !session {
            return;
        }

        let record = match self.persisted_record(entry) {
            Ok(record) => record,
            Err(e) => {
                self.persistence_failed("I/O record", e);
                return;
            }
        };

        if individual {
            match self.write_individual_file(fs, entry, &record) {
                Ok(_) => self.counters.individual_files += 1,
                Err(e) => self.persistence_failed("individual I/O file", e),
            }
        }
        if session {
            match self.write_session_line(fs, entry, &record) {
                Ok(_) => self.counters.session_lines += 1,
                Err(e) => self.persistence_failed("session I/O file", e),
            }
        }
    }

    fn complete(&mut self, fs: &dyn FileSystem, entry: IoEntry) -> IoEntry {
        self.persist_io_entry(fs, &entry);
        self.io_entries.push(entry.clone());
        entry
    }
}

/// Records logs and I/O operations for one or more components
pub struct TelemetryEngine {
    fs: Arc<dyn FileSystem>,
    state: Mutex<EngineState>,
}

impl TelemetryEngine {
    /// Create an engine persisting through `std::fs`
    pub fn new(config: DebugConfiguration) -> TelemetryResult<Self> {
        Self::with_file_system(config, Arc::new(StdFileSystem))
    }

    /// Create an engine with a custom filesystem capability
    ///
    /// Fails if the configuration is invalid or the `systemstart`
    /// directories cannot be created.
    pub fn with_file_system(
        config: DebugConfiguration,
        fs: Arc<dyn FileSystem>,
    ) -> TelemetryResult<Self> {
        config.validate()?;
        let state = EngineState::new(config);
        ensure_directories(fs.as_ref(), &state.config, &state.layout, state.phase)?;

        Ok(Self {
            fs,
            state: Mutex::new(state),
        })
    }

    /// Replace the active configuration
    pub fn configure(&self, config: DebugConfiguration) -> TelemetryResult<()> {
        config.validate()?;
        let mut state = self.state.lock();

        let layout = TelemetryLayout::new(&config.base_directory, &config.io_tracking.io_directory);
        ensure_directories(self.fs.as_ref(), &config, &layout, state.phase)?;

        state.logs.set_capacity(config.max_log_entries);
        state
            .io_entries
            .set_capacity(config.io_tracking.max_session_operations);
        state.layout = layout;
        state.config = config;
        state.reset_rotation();
        Ok(())
    }

    pub fn configuration(&self) -> DebugConfiguration {
        self.state.lock().config.clone()
    }

    /// Record a log entry for `module_id`
    ///
    /// No-op when disabled or when `level` is below the configured minimum.
    pub fn log(
        &self,
        module_id: &str,
        level: LogLevel,
        message: &str,
        data: Option<Value>,
        method: Option<&str>,
    ) {
        let mut state = self.state.lock();
        if !state.config.enabled || level < state.config.level {
            return;
        }

        let stack = if state.config.record_stack && level >= LogLevel::Warn {
            Some(Backtrace::force_capture().to_string())
        } else {
            None
        };

        let entry = LogEntry {
            timestamp: current_timestamp_millis(),
            level,
            message: message.to_string(),
            data,
            method: method.map(str::to_string),
            module_id: module_id.to_string(),
            stack,
        };

        if state.config.console_output {
            echo_to_console(&entry);
        }

        if state.config.enable_file_logging {
            match state.write_log_line(self.fs.as_ref(), &entry) {
                Ok(()) => state.counters.log_lines += 1,
                Err(e) => state.persistence_failed("log file", e),
            }
        }

        state.logs.push(entry);
    }

    /// Record a completed operation in one call; success is implied
    ///
    /// Returns the recorded entry, or `None` when I/O tracking is disabled.
    pub fn record_operation(
        &self,
        module_id: &str,
        operation_id: &str,
        input: Value,
        output: Value,
        method: Option<&str>,
    ) -> Option<IoEntry> {
        let mut state = self.state.lock();
        if !state.io_enabled() {
            return None;
        }

        let entry = IoEntry {
            module_id: module_id.to_string(),
            operation_id: operation_id.to_string(),
            input,
            output: Some(output),
            method: method.map(str::to_string),
            success: true,
            error: None,
            duration_ms: None,
            timestamp: current_timestamp_millis(),
        };
        Some(state.complete(self.fs.as_ref(), entry))
    }

    /// Open a pending operation keyed by `(module_id, operation_id)`
    ///
    /// A second start under a live key replaces the first and records a
    /// warning. Returns false when I/O tracking is disabled.
    pub fn start_operation(
        &self,
        module_id: &str,
        operation_id: &str,
        input: Value,
        method: Option<&str>,
    ) -> bool {
        let mut state = self.state.lock();
        if !state.io_enabled() {
            return false;
        }

        let replaced = state.pending.insert(PendingOperation {
            module_id: module_id.to_string(),
            operation_id: operation_id.to_string(),
            input,
            method: method.map(str::to_string),
            started_at: current_timestamp_millis(),
            start_time: std::time::Instant::now(),
        });

        if replaced.is_some() {
            state.internal_warning(format!(
                "Operation {} of module {} started again before it ended; restarting",
                operation_id, module_id
            ));
        }
        true
    }

    /// Close a pending operation and record it with its elapsed duration
    ///
    /// Ending an operation that was never started records a zero-duration
    /// entry with a `null` input and a warning. Returns `None` when I/O
    /// tracking is disabled.
    pub fn end_operation(
        &self,
        module_id: &str,
        operation_id: &str,
        output: Value,
        success: bool,
        error: Option<String>,
    ) -> Option<IoEntry> {
        let mut state = self.state.lock();
        if !state.io_enabled() {
            return None;
        }

        let (input, method, duration_ms) = match state.pending.take(module_id, operation_id) {
            Some(pending) => {
                let elapsed = pending.elapsed_ms();
                (pending.input, pending.method, elapsed)
            }
            None => {
                state.internal_warning(format!(
                    "Operation {} of module {} ended without a matching start",
                    operation_id, module_id
                ));
                (Value::Null, None, 0.0)
            }
        };

        let entry = IoEntry {
            module_id: module_id.to_string(),
            operation_id: operation_id.to_string(),
            input,
            output: Some(output),
            method,
            success,
            error,
            duration_ms: Some(duration_ms),
            timestamp: current_timestamp_millis(),
        };
        Some(state.complete(self.fs.as_ref(), entry))
    }

    /// Move persistence from `systemstart` to `port-<port>`
    ///
    /// Switching to the already-bound port is a no-op; switching to another
    /// port fails. Files written under `systemstart` are left in place.
    pub fn switch_to_port_mode(&self, port: u16) -> TelemetryResult<()> {
        let mut state = self.state.lock();
        let requested = Phase::Port(port);

        match state.phase {
            Phase::Port(current) if current == port => return Ok(()),
            Phase::Port(_) => {
                return Err(TelemetryError::PhaseAlreadyBound {
                    current: state.phase,
                    requested,
                })
            }
            Phase::SystemStart => {}
        }

        ensure_directories(self.fs.as_ref(), &state.config, &state.layout, requested)?;
        state.phase = requested;
        state.reset_rotation();

        tracing::info!(
            directory = %state.layout.phase_dir(requested).display(),
            "telemetry switched to port mode"
        );
        Ok(())
    }

    /// Relocate the root of the phase directories
    pub fn update_base_directory<P: AsRef<Path>>(&self, base_directory: P) -> TelemetryResult<()> {
        let mut state = self.state.lock();
        let mut config = state.config.clone();
        config.base_directory = base_directory.as_ref().to_path_buf();

        let layout = TelemetryLayout::new(&config.base_directory, &config.io_tracking.io_directory);
        ensure_directories(self.fs.as_ref(), &config, &layout, state.phase)?;

        state.layout = layout;
        state.config = config;
        state.reset_rotation();
        Ok(())
    }

    pub fn phase(&self) -> Phase {
        self.state.lock().phase
    }

    pub fn base_directory(&self) -> PathBuf {
        self.state.lock().layout.base_directory().to_path_buf()
    }

    /// Directory of the active phase
    pub fn active_directory(&self) -> PathBuf {
        let state = self.state.lock();
        state.layout.phase_dir(state.phase)
    }

    /// Directory of any phase under the current base directory
    pub fn phase_directory(&self, phase: Phase) -> PathBuf {
        self.state.lock().layout.phase_dir(phase)
    }

    /// I/O directory of the active phase
    pub fn io_directory(&self) -> PathBuf {
        let state = self.state.lock();
        state.layout.io_dir(state.phase)
    }

    /// Buffered log entries, oldest first
    pub fn logs(&self) -> Vec<LogEntry> {
        self.state.lock().logs.to_vec()
    }

    pub fn logs_for_module(&self, module_id: &str) -> Vec<LogEntry> {
        self.state
            .lock()
            .logs
            .iter()
            .filter(|e| e.module_id == module_id)
            .cloned()
            .collect()
    }

    /// Buffered I/O entries, oldest first
    pub fn io_entries(&self) -> Vec<IoEntry> {
        self.state.lock().io_entries.to_vec()
    }

    pub fn io_entries_for_module(&self, module_id: &str) -> Vec<IoEntry> {
        self.state
            .lock()
            .io_entries
            .iter()
            .filter(|e| e.module_id == module_id)
            .cloned()
            .collect()
    }

    /// Pending operations, oldest first
    pub fn pending_operations(&self) -> Vec<PendingOperation> {
        self.state.lock().pending.snapshot()
    }

    pub fn is_pending(&self, module_id: &str, operation_id: &str) -> bool {
        self.state.lock().pending.contains(module_id, operation_id)
    }

    /// Remove a module's pending operations, returning them oldest first
    pub fn discard_pending(&self, module_id: &str) -> Vec<PendingOperation> {
        self.state.lock().pending.drain_module(module_id)
    }

    pub fn clear_logs(&self) {
        self.state.lock().logs.clear();
    }

    /// Drop one module's buffered log entries, returning how many were removed
    pub fn clear_module_logs(&self, module_id: &str) -> usize {
        let mut state = self.state.lock();
        let before = state.logs.len();
        state.logs.retain(|e| e.module_id != module_id);
        before - state.logs.len()
    }

    pub fn clear_io_entries(&self) {
        self.state.lock().io_entries.clear();
    }

    pub fn stats(&self) -> TelemetryStats {
        let state = self.state.lock();
        TelemetryStats {
            log_entries: state.logs.len(),
            io_entries: state.io_entries.len(),
            pending_operations: state.pending.len(),
            evicted_log_entries: state.logs.evicted(),
            evicted_io_entries: state.io_entries.evicted(),
            log_lines_written: state.counters.log_lines,
            individual_files_written: state.counters.individual_files,
            session_lines_written: state.counters.session_lines,
            write_failures: state.counters.failures,
            phase: state.phase,
        }
    }

    /// Log files of the active phase, oldest first
    pub fn list_log_files(&self) -> TelemetryResult<Vec<PathBuf>> {
        reader::list_log_files(self.fs.as_ref(), &self.active_directory())
    }

    /// Individual I/O files of the active phase
    pub fn list_individual_io_files(&self) -> TelemetryResult<Vec<PathBuf>> {
        reader::list_individual_io_files(self.fs.as_ref(), &self.io_directory())
    }

    /// Session I/O files of the active phase, in rotation order per module
    pub fn list_session_io_files(&self) -> TelemetryResult<Vec<PathBuf>> {
        reader::list_session_io_files(self.fs.as_ref(), &self.io_directory())
    }

    pub fn read_log_file(&self, path: &Path) -> TelemetryResult<Vec<LogEntry>> {
        reader::read_log_file(self.fs.as_ref(), path)
    }

    pub fn read_individual_io_file(&self, path: &Path) -> TelemetryResult<IoEntry> {
        reader::read_individual_io_file(self.fs.as_ref(), path)
    }

    pub fn read_session_io_file(&self, path: &Path) -> TelemetryResult<Vec<IoEntry>> {
        reader::read_session_io_file(self.fs.as_ref(), path)
    }
}

/// Create the phase (and I/O) directory when anything will be persisted
fn ensure_directories(
    fs: &dyn FileSystem,
    config: &DebugConfiguration,
    layout: &TelemetryLayout,
    phase: Phase,
) -> TelemetryResult<()> {
    if !config.persists_to_disk() {
        return Ok(());
    }

    let mut dirs = vec![layout.phase_dir(phase)];
    if config.io_tracking.persists() {
        dirs.push(layout.io_dir(phase));
    }

    for dir in dirs {
        fs.create_dir_all(&dir)
            .map_err(|source| TelemetryError::DirectoryCreation {
                path: dir.clone(),
                source,
            })?;
    }
    Ok(())
}

fn echo_to_console(entry: &LogEntry) {
    let at = format_timestamp_millis(entry.timestamp);
    let method = entry.method.as_deref().unwrap_or("");
    match entry.level {
        LogLevel::Trace => {
            tracing::trace!(module_id = %entry.module_id, method, at = %at, "{}", entry.message)
        }
        LogLevel::Debug => {
            tracing::debug!(module_id = %entry.module_id, method, at = %at, "{}", entry.message)
        }
        LogLevel::Info => {
            tracing::info!(module_id = %entry.module_id, method, at = %at, "{}", entry.message)
        }
        LogLevel::Warn => {
            tracing::warn!(module_id = %entry.module_id, method, at = %at, "{}", entry.message)
        }
        LogLevel::Error => {
            tracing::error!(module_id = %entry.module_id, method, at = %at, "{}", entry.message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::config::{FileFormat, IoTrackingConfiguration};
    use serde_json::json;
    use std::io;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    fn persisting_config(dir: &Path) -> DebugConfiguration {
        DebugConfiguration::default()
            .with_base_directory(dir)
            .with_file_logging(true)
            .with_io_tracking(
                IoTrackingConfiguration::default()
                    .with_individual_files(true)
                    .with_session_files(true),
            )
    }

    /// Filesystem whose writes always fail
    struct ReadOnlyFileSystem;

    impl FileSystem for ReadOnlyFileSystem {
        fn create_dir_all(&self, _path: &Path) -> io::Result<()> {
            Ok(())
        }
        fn append_line(&self, _path: &Path, _line: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
        }
        fn write_atomic(&self, _path: &Path, _content: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
        }
        fn read_to_string(&self, path: &Path) -> io::Result<String> {
            Err(io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
        }
        fn list_files(&self, _dir: &Path) -> io::Result<Vec<PathBuf>> {
            Ok(Vec::new())
        }
        fn file_size(&self, _path: &Path) -> io::Result<u64> {
            Ok(0)
        }
        fn remove_file(&self, _path: &Path) -> io::Result<()> {
            Ok(())
        }
        fn exists(&self, _path: &Path) -> bool {
            false
        }
    }

    /// Filesystem that cannot create directories
    struct NoDirFileSystem;

    impl FileSystem for NoDirFileSystem {
        fn create_dir_all(&self, _path: &Path) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "no dirs"))
        }
        fn append_line(&self, _path: &Path, _line: &str) -> io::Result<()> {
            Ok(())
        }
        fn write_atomic(&self, _path: &Path, _content: &str) -> io::Result<()> {
            Ok(())
        }
        fn read_to_string(&self, _path: &Path) -> io::Result<String> {
            Ok(String::new())
        }
        fn list_files(&self, _dir: &Path) -> io::Result<Vec<PathBuf>> {
            Ok(Vec::new())
        }
        fn file_size(&self, _path: &Path) -> io::Result<u64> {
            Ok(0)
        }
        fn remove_file(&self, _path: &Path) -> io::Result<()> {
            Ok(())
        }
        fn exists(&self, _path: &Path) -> bool {
            false
        }
    }

    #[test]
    fn test_log_ring_keeps_most_recent() {
        let engine =
            TelemetryEngine::new(DebugConfiguration::default().with_max_log_entries(5)).unwrap();

        for i in 0..12 {
            engine.log("m", LogLevel::Info, &format!("entry {}", i), None, None);
        }

        let logs = engine.logs();
        assert_eq!(logs.len(), 5);
        let messages: Vec<_> = logs.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["entry 7", "entry 8", "entry 9", "entry 10", "entry 11"]
        );
        assert_eq!(engine.stats().evicted_log_entries, 7);
    }

    #[test]
    fn test_log_respects_minimum_level() {
        let engine =
            TelemetryEngine::new(DebugConfiguration::default().with_level(LogLevel::Warn)).unwrap();

        engine.log("m", LogLevel::Trace, "t", None, None);
        engine.log("m", LogLevel::Debug, "d", None, None);
        engine.log("m", LogLevel::Info, "i", None, None);
        engine.log("m", LogLevel::Warn, "w", None, None);
        engine.log("m", LogLevel::Error, "e", None, None);

        let levels: Vec<_> = engine.logs().iter().map(|e| e.level).collect();
        assert_eq!(levels, vec![LogLevel::Warn, LogLevel::Error]);
    }

    #[test]
    fn test_disabled_engine_records_nothing() {
        let engine = TelemetryEngine::new(DebugConfiguration::disabled()).unwrap();

        engine.log("m", LogLevel::Error, "ignored", None, None);
        assert!(engine.record_operation("m", "op", json!(1), json!(2), None).is_none());
        assert!(!engine.start_operation("m", "op2", json!(1), None));

        assert!(engine.logs().is_empty());
        assert!(engine.io_entries().is_empty());
        assert!(engine.pending_operations().is_empty());
    }

    #[test]
    fn test_record_stack_on_warnings() {
        let mut config = DebugConfiguration::default();
        config.record_stack = true;
        let engine = TelemetryEngine::new(config).unwrap();

        engine.log("m", LogLevel::Info, "plain", None, None);
        engine.log("m", LogLevel::Error, "failed", None, Some("process"));

        let logs = engine.logs();
        assert!(logs[0].stack.is_none());
        assert!(logs[1].stack.is_some());
        assert_eq!(logs[1].method.as_deref(), Some("process"));
    }

    #[test]
    fn test_io_ring_eviction() {
        let config = DebugConfiguration::default().with_io_tracking(
            IoTrackingConfiguration::default().with_max_session_operations(3),
        );
        let engine = TelemetryEngine::new(config).unwrap();

        for i in 0..5 {
            engine.record_operation("m", &format!("op-{}", i), json!(i), json!(i * 2), None);
        }

        let ids: Vec<_> = engine
            .io_entries()
            .into_iter()
            .map(|e| e.operation_id)
            .collect();
        assert_eq!(ids, vec!["op-2", "op-3", "op-4"]);
    }

    #[test]
    fn test_start_end_measures_duration() {
        let engine = TelemetryEngine::new(DebugConfiguration::default()).unwrap();

        assert!(engine.start_operation("m", "op", json!({"q": 1}), Some("query")));
        assert!(engine.is_pending("m", "op"));
        thread::sleep(Duration::from_millis(20));
        let entry = engine
            .end_operation("m", "op", json!({"rows": 3}), true, None)
            .unwrap();

        assert!(entry.duration_ms.unwrap() >= 20.0);
        assert_eq!(entry.input, json!({"q": 1}));
        assert_eq!(entry.method.as_deref(), Some("query"));
        assert!(entry.success);
        assert!(!engine.is_pending("m", "op"));
    }

    #[test]
    fn test_immediate_end_has_positive_duration() {
        let engine = TelemetryEngine::new(DebugConfiguration::default()).unwrap();

        engine.start_operation("m", "fast", json!(1), None);
        let entry = engine.end_operation("m", "fast", json!(2), true, None).unwrap();

        assert!(entry.duration_ms.unwrap() > 0.0);
    }

    #[test]
    fn test_interleaved_operations_pair_by_module_and_id() {
        let engine = TelemetryEngine::new(DebugConfiguration::default()).unwrap();

        engine.start_operation("a", "op", json!("a-in"), None);
        engine.start_operation("b", "op", json!("b-in"), None);
        engine.start_operation("a", "op-2", json!("a2-in"), None);

        let b = engine.end_operation("b", "op", json!("b-out"), true, None).unwrap();
        let a = engine.end_operation("a", "op", json!("a-out"), false, Some("boom".to_string())).unwrap();

        assert_eq!(b.input, json!("b-in"));
        assert_eq!(a.input, json!("a-in"));
        assert_eq!(a.error.as_deref(), Some("boom"));
        assert!(engine.is_pending("a", "op-2"));
    }

    #[test]
    fn test_duplicate_start_replaces_and_warns() {
        let engine = TelemetryEngine::new(DebugConfiguration::default()).unwrap();

        engine.start_operation("m", "op", json!("first"), None);
        engine.start_operation("m", "op", json!("second"), None);
        assert_eq!(engine.pending_operations().len(), 1);

        let entry = engine.end_operation("m", "op", json!(null), true, None).unwrap();
        assert_eq!(entry.input, json!("second"));

        let warnings = engine.logs_for_module(ENGINE_MODULE_ID);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("started again"));
    }

    #[test]
    fn test_end_without_start_records_zero_duration() {
        let engine = TelemetryEngine::new(DebugConfiguration::default()).unwrap();

        let entry = engine
            .end_operation("m", "ghost", json!("out"), true, None)
            .unwrap();

        assert_eq!(entry.duration_ms, Some(0.0));
        assert_eq!(entry.input, Value::Null);
        assert_eq!(engine.io_entries().len(), 1);
        assert_eq!(engine.logs_for_module(ENGINE_MODULE_ID).len(), 1);
    }

    #[test]
    fn test_persists_log_and_io_files() {
        let temp_dir = TempDir::new().unwrap();
        let engine = TelemetryEngine::new(persisting_config(temp_dir.path())).unwrap();

        engine.log("m", LogLevel::Info, "first", None, None);
        engine.log("m", LogLevel::Info, "second", Some(json!({"k": "v"})), None);
        engine.record_operation("m", "op-1", json!(1), json!(2), Some("run"));

        let log_files = engine.list_log_files().unwrap();
        assert_eq!(log_files.len(), 1);
        let entries = engine.read_log_file(&log_files[0]).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].data, Some(json!({"k": "v"})));

        let individual = engine.list_individual_io_files().unwrap();
        assert_eq!(individual.len(), 1);
        assert!(individual[0].ends_with("m_op-1.json"));
        let entry = engine.read_individual_io_file(&individual[0]).unwrap();
        assert_eq!(entry.output, Some(json!(2)));

        let sessions = engine.list_session_io_files().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(engine.read_session_io_file(&sessions[0]).unwrap().len(), 1);

        let stats = engine.stats();
        assert_eq!(stats.log_lines_written, 2);
        assert_eq!(stats.individual_files_written, 1);
        assert_eq!(stats.session_lines_written, 1);
    }

    #[test]
    fn test_individual_file_collision_is_disambiguated() {
        let temp_dir = TempDir::new().unwrap();
        let engine = TelemetryEngine::new(persisting_config(temp_dir.path())).unwrap();

        engine.record_operation("m", "op", json!(1), json!(1), None);
        engine.record_operation("m", "op", json!(2), json!(2), None);
        engine.record_operation("m", "op", json!(3), json!(3), None);

        let files = engine.list_individual_io_files().unwrap();
        assert_eq!(files.len(), 3);
        assert!(files.iter().any(|p| p.ends_with("m_op.json")));
    }

    #[test]
    fn test_session_named_operation_stays_individual() {
        for format in [FileFormat::Json, FileFormat::Jsonl] {
            let temp_dir = TempDir::new().unwrap();
            let mut config = persisting_config(temp_dir.path());
            config.io_tracking.individual_file_format = format;
            let engine = TelemetryEngine::new(config).unwrap();

            engine.record_operation("m", "session", json!(1), json!("a"), None);
            engine.record_operation("m", "session_1", json!(2), json!("b"), None);
            engine.record_operation("m", "op", json!(3), json!("c"), None);

            let individual = engine.list_individual_io_files().unwrap();
            assert_eq!(individual.len(), 3, "{:?}", format);
            let mut ids: Vec<String> = individual
                .iter()
                .map(|p| engine.read_individual_io_file(p).unwrap().operation_id)
                .collect();
            ids.sort();
            assert_eq!(ids, vec!["op", "session", "session_1"]);

            let sessions = engine.list_session_io_files().unwrap();
            assert_eq!(sessions.len(), 1, "{:?}", format);
            assert!(sessions[0].ends_with("m_session.jsonl"));
            let ids: Vec<String> = engine
                .read_session_io_file(&sessions[0])
                .unwrap()
                .into_iter()
                .map(|e| e.operation_id)
                .collect();
            assert_eq!(ids, vec!["session", "session_1", "op"]);
        }
    }

    #[test]
    fn test_session_file_rotation() {
        let temp_dir = TempDir::new().unwrap();
        let config = DebugConfiguration::default()
            .with_base_directory(temp_dir.path())
            .with_io_tracking(
                IoTrackingConfiguration::default()
                    .with_session_files(true)
                    .with_max_entries_per_file(2),
            );
        let engine = TelemetryEngine::new(config).unwrap();

        for i in 0..5 {
            engine.record_operation("m", &format!("op-{}", i), json!(i), json!(i), None);
        }

        let files = engine.list_session_io_files().unwrap();
        assert_eq!(files.len(), 3);
        assert!(files[0].ends_with("m_session.jsonl"));
        assert!(files[1].ends_with("m_session_1.jsonl"));
        assert!(files[2].ends_with("m_session_2.jsonl"));

        let ids: Vec<String> = files
            .iter()
            .flat_map(|f| engine.read_session_io_file(f).unwrap())
            .map(|e| e.operation_id)
            .collect();
        assert_eq!(ids, vec!["op-0", "op-1", "op-2", "op-3", "op-4"]);
    }

    #[test]
    fn test_persisted_record_can_omit_timestamp_and_duration() {
        let temp_dir = TempDir::new().unwrap();
        let mut io = IoTrackingConfiguration::default().with_individual_files(true);
        io.include_timestamp = false;
        io.include_duration = false;
        let config = DebugConfiguration::default()
            .with_base_directory(temp_dir.path())
            .with_io_tracking(io);
        let engine = TelemetryEngine::new(config).unwrap();

        engine.start_operation("m", "op", json!(1), None);
        let in_memory = engine.end_operation("m", "op", json!(2), true, None).unwrap();
        assert!(in_memory.duration_ms.is_some());

        let files = engine.list_individual_io_files().unwrap();
        let raw = std::fs::read_to_string(&files[0]).unwrap();
        assert!(!raw.contains("durationMs"));
        assert!(!raw.contains("timestamp"));
        let persisted = engine.read_individual_io_file(&files[0]).unwrap();
        assert_eq!(persisted.timestamp, 0);
        assert_eq!(persisted.duration_ms, None);
    }

    #[test]
    fn test_write_failure_becomes_internal_warning() {
        let config = persisting_config(Path::new("unused"));
        let engine =
            TelemetryEngine::with_file_system(config, Arc::new(ReadOnlyFileSystem)).unwrap();

        engine.log("m", LogLevel::Info, "still buffered", None, None);
        let entry = engine.record_operation("m", "op", json!(1), json!(2), None);

        assert!(entry.is_some());
        assert_eq!(engine.io_entries().len(), 1);
        assert_eq!(engine.logs_for_module("m").len(), 1);
        // one log line + individual file + session line
        assert_eq!(engine.stats().write_failures, 3);
        assert_eq!(engine.logs_for_module(ENGINE_MODULE_ID).len(), 3);
    }

    #[test]
    fn test_directory_creation_failure_is_fatal() {
        let config = persisting_config(Path::new("unused"));
        let result = TelemetryEngine::with_file_system(config, Arc::new(NoDirFileSystem));
        assert!(matches!(
            result,
            Err(TelemetryError::DirectoryCreation { .. })
        ));
    }

    #[test]
    fn test_switch_to_port_mode() {
        let temp_dir = TempDir::new().unwrap();
        let engine = TelemetryEngine::new(persisting_config(temp_dir.path())).unwrap();

        engine.log("m", LogLevel::Info, "before", None, None);
        let before_files = engine.list_log_files().unwrap();

        engine.switch_to_port_mode(3000).unwrap();
        assert_eq!(engine.phase(), Phase::Port(3000));
        assert!(temp_dir.path().join("port-3000").is_dir());

        engine.log("m", LogLevel::Info, "after", None, None);
        let after_files = engine.list_log_files().unwrap();
        assert_eq!(after_files.len(), 1);
        assert!(after_files[0].starts_with(temp_dir.path().join("port-3000")));

        let old = engine.read_log_file(&before_files[0]).unwrap();
        assert_eq!(old.len(), 1);
        assert_eq!(old[0].message, "before");

        // same port again is fine, another port is not
        assert!(engine.switch_to_port_mode(3000).is_ok());
        assert!(matches!(
            engine.switch_to_port_mode(4000),
            Err(TelemetryError::PhaseAlreadyBound { .. })
        ));
    }

    #[test]
    fn test_update_base_directory() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        let engine = TelemetryEngine::new(persisting_config(first.path())).unwrap();

        engine.update_base_directory(second.path()).unwrap();
        engine.log("m", LogLevel::Info, "moved", None, None);

        assert_eq!(engine.base_directory(), second.path());
        assert!(second.path().join("systemstart").join("debug.jsonl").exists());
        assert!(!first.path().join("systemstart").join("debug.jsonl").exists());
    }

    #[test]
    fn test_configure_shrinks_buffers() {
        let engine = TelemetryEngine::new(DebugConfiguration::default()).unwrap();
        for i in 0..10 {
            engine.log("m", LogLevel::Info, &i.to_string(), None, None);
        }

        engine
            .configure(DebugConfiguration::default().with_max_log_entries(4))
            .unwrap();

        let logs = engine.logs();
        assert_eq!(logs.len(), 4);
        assert_eq!(logs[0].message, "6");
        assert!(engine
            .configure(DebugConfiguration::default().with_max_log_entries(0))
            .is_err());
    }

    #[test]
    fn test_clear_module_logs_and_discard_pending() {
        let engine = TelemetryEngine::new(DebugConfiguration::default()).unwrap();
        engine.log("a", LogLevel::Info, "a1", None, None);
        engine.log("b", LogLevel::Info, "b1", None, None);
        engine.log("a", LogLevel::Info, "a2", None, None);
        engine.start_operation("a", "op", json!(null), None);
        engine.start_operation("b", "op", json!(null), None);

        assert_eq!(engine.clear_module_logs("a"), 2);
        assert_eq!(engine.logs().len(), 1);

        let leaked = engine.discard_pending("a");
        assert_eq!(leaked.len(), 1);
        assert!(engine.is_pending("b", "op"));
    }
}
