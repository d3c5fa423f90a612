//! Telemetry engine statistics

use serde::Serialize;

use crate::types::Phase;

/// Point-in-time counters of a telemetry engine
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryStats {
    /// Log entries currently buffered
    pub log_entries: usize,
    /// I/O entries currently buffered
    pub io_entries: usize,
    /// Started operations awaiting their end call
    pub pending_operations: usize,
    /// Log entries evicted from the ring
    pub evicted_log_entries: u64,
    /// I/O entries evicted from the ring
    pub evicted_io_entries: u64,
    /// Log lines written to disk
    pub log_lines_written: u64,
    /// Individual I/O files written
    pub individual_files_written: u64,
    /// Session lines written
    pub session_lines_written: u64,
    /// Persistence failures swallowed as internal warnings
    pub write_failures: u64,
    pub phase: Phase,
}
