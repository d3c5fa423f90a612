//! Debug and I/O tracking configuration
//!
//! Both structs deserialize from camelCase keys with every field optional,
//! so a host can load them from any serde format and override only what it
//! needs.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::{TelemetryError, TelemetryResult};
use crate::types::LogLevel;

/// Serialization shape of persisted I/O files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// Pretty-printed JSON, `.json`
    #[default]
    Json,
    /// Compact single-line JSON, `.jsonl`
    Jsonl,
}

impl FileFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Json => "json",
            FileFormat::Jsonl => "jsonl",
        }
    }

    /// Render a whole record in this format
    pub fn render(&self, value: &serde_json::Value) -> Result<String, serde_json::Error> {
        match self {
            FileFormat::Json => serde_json::to_string_pretty(value),
            FileFormat::Jsonl => serde_json::to_string(value),
        }
    }
}

/// I/O operation tracking options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IoTrackingConfiguration {
    pub enabled: bool,
    /// Wrap `receive_data` in start/end tracking automatically
    pub auto_record: bool,
    pub save_individual_files: bool,
    pub save_session_files: bool,
    pub individual_file_format: FileFormat,
    /// Only selects the extension; session files always hold one record per line
    pub session_file_format: FileFormat,
    /// Lines per session file before rotating to the next index
    pub max_entries_per_file: usize,
    /// Subdirectory of the phase directory that holds I/O files
    pub io_directory: PathBuf,
    pub include_timestamp: bool,
    pub include_duration: bool,
    /// Capacity of the in-memory I/O ring
    pub max_session_operations: usize,
}

impl Default for IoTrackingConfiguration {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_record: false,
            save_individual_files: false,
            save_session_files: false,
            individual_file_format: FileFormat::Json,
            session_file_format: FileFormat::Jsonl,
            max_entries_per_file: 1000,
            io_directory: PathBuf::from("io"),
            include_timestamp: true,
            include_duration: true,
            max_session_operations: 1000,
        }
    }
}

impl IoTrackingConfiguration {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn with_auto_record(mut self, auto_record: bool) -> Self {
        self.auto_record = auto_record;
        self
    }

    pub fn with_individual_files(mut self, save: bool) -> Self {
        self.save_individual_files = save;
        self
    }

    pub fn with_session_files(mut self, save: bool) -> Self {
        self.save_session_files = save;
        self
    }

    pub fn with_max_entries_per_file(mut self, max: usize) -> Self {
        self.max_entries_per_file = max;
        self
    }

    pub fn with_max_session_operations(mut self, max: usize) -> Self {
        self.max_session_operations = max;
        self
    }

    /// Whether any I/O file is written
    pub fn persists(&self) -> bool {
        self.enabled && (self.save_individual_files || self.save_session_files)
    }
}

/// Debug configuration of a component or engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DebugConfiguration {
    pub enabled: bool,
    /// Minimum severity that gets recorded
    pub level: LogLevel,
    /// Capture a backtrace on warn and error entries
    pub record_stack: bool,
    pub max_log_entries: usize,
    pub console_output: bool,
    /// Log connection changes and received data at debug level
    pub track_data_flow: bool,
    /// Root of the phase directories
    pub base_directory: PathBuf,
    pub enable_file_logging: bool,
    /// Bytes per log file before a new one is started
    pub max_file_size: u64,
    /// Log files kept per phase directory
    pub max_log_files: usize,
    pub io_tracking: IoTrackingConfiguration,
}

impl Default for DebugConfiguration {
    fn default() -> Self {
        Self {
            enabled: true,
            level: LogLevel::Debug,
            record_stack: false,
            max_log_entries: 1000,
            console_output: false,
            track_data_flow: false,
            base_directory: PathBuf::from("debug-logs"),
            enable_file_logging: false,
            max_file_size: 10 * 1024 * 1024,
            max_log_files: 5,
            io_tracking: IoTrackingConfiguration::default(),
        }
    }
}

impl DebugConfiguration {
    /// Configuration that records nothing
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn with_base_directory<P: AsRef<Path>>(mut self, base_directory: P) -> Self {
        self.base_directory = base_directory.as_ref().to_path_buf();
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_max_log_entries(mut self, max: usize) -> Self {
        self.max_log_entries = max;
        self
    }

    pub fn with_file_logging(mut self, enabled: bool) -> Self {
        self.enable_file_logging = enabled;
        self
    }

    pub fn with_io_tracking(mut self, io_tracking: IoTrackingConfiguration) -> Self {
        self.io_tracking = io_tracking;
        self
    }

    /// Whether anything may be written below `base_directory`
    pub fn persists_to_disk(&self) -> bool {
        self.enabled && (self.enable_file_logging || self.io_tracking.persists())
    }

    /// Reject configurations the engine cannot honor
    pub fn validate(&self) -> TelemetryResult<()> {
        if self.max_log_entries == 0 {
            return Err(TelemetryError::InvalidConfiguration(
                "maxLogEntries must be greater than zero".to_string(),
            ));
        }
        if self.enable_file_logging && (self.max_file_size == 0 || self.max_log_files == 0) {
            return Err(TelemetryError::InvalidConfiguration(
                "maxFileSize and maxLogFiles must be greater than zero".to_string(),
            ));
        }
        let io = &self.io_tracking;
        if io.max_session_operations == 0 || io.max_entries_per_file == 0 {
            return Err(TelemetryError::InvalidConfiguration(
                "maxSessionOperations and maxEntriesPerFile must be greater than zero".to_string(),
            ));
        }
        if io.persists() && io.io_directory.as_os_str().is_empty() {
            return Err(TelemetryError::InvalidConfiguration(
                "ioDirectory must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
