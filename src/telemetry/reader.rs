//! Read-back of persisted log and I/O files

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use super::error::{TelemetryError, TelemetryResult};
use super::fs::FileSystem;
use super::layout::{is_io_file, is_session_file, log_file_index, session_file_parts};
use crate::types::{IoEntry, LogEntry};

/// Log files in `dir`, oldest first
pub fn list_log_files(fs: &dyn FileSystem, dir: &Path) -> TelemetryResult<Vec<PathBuf>> {
    let files = fs.list_files(dir).map_err(|e| TelemetryError::io(dir, e))?;
    let mut logs: Vec<(usize, PathBuf)> = files
        .into_iter()
        .filter_map(|p| log_file_index(&p).map(|index| (index, p)))
        .collect();
    logs.sort_by_key(|(index, _)| *index);
    Ok(logs.into_iter().map(|(_, p)| p).collect())
}

/// Individual I/O files in `io_dir`, sorted by name
pub fn list_individual_io_files(
    fs: &dyn FileSystem,
    io_dir: &Path,
) -> TelemetryResult<Vec<PathBuf>> {
    let files = fs
        .list_files(io_dir)
        .map_err(|e| TelemetryError::io(io_dir, e))?;
    Ok(files
        .into_iter()
        .filter(|p| is_io_file(p) && !is_session_file(p))
        .collect())
}

/// Session I/O files in `io_dir`, grouped by module and in rotation order
pub fn list_session_io_files(
    fs: &dyn FileSystem,
    io_dir: &Path,
) -> TelemetryResult<Vec<PathBuf>> {
    let files = fs
        .list_files(io_dir)
        .map_err(|e| TelemetryError::io(io_dir, e))?;
    let mut sessions: Vec<((String, usize), PathBuf)> = files
        .into_iter()
        .filter(|p| is_io_file(p))
        .filter_map(|p| session_file_parts(&p).map(|parts| (parts, p)))
        .collect();
    sessions.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(sessions.into_iter().map(|(_, p)| p).collect())
}

/// Entries of a log file in write order
pub fn read_log_file(fs: &dyn FileSystem, path: &Path) -> TelemetryResult<Vec<LogEntry>> {
    read_json_lines(fs, path)
}

/// The single entry of an individual I/O file
pub fn read_individual_io_file(fs: &dyn FileSystem, path: &Path) -> TelemetryResult<IoEntry> {
    let content = fs
        .read_to_string(path)
        .map_err(|e| TelemetryError::io(path, e))?;
    serde_json::from_str(&content).map_err(|source| TelemetryError::MalformedRecord {
        path: path.to_path_buf(),
        source,
    })
}

/// Entries of a session I/O file in write order
pub fn read_session_io_file(fs: &dyn FileSystem, path: &Path) -> TelemetryResult<Vec<IoEntry>> {
    read_json_lines(fs, path)
}

/// Parse one record per line, skipping blank and unparseable lines
fn read_json_lines<T: DeserializeOwned>(
    fs: &dyn FileSystem,
    path: &Path,
) -> TelemetryResult<Vec<T>> {
    let content = fs
        .read_to_string(path)
        .map_err(|e| TelemetryError::io(path, e))?;

    let mut records = Vec::new();
    for (line_num, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    line = line_num + 1,
                    error = %e,
                    "skipping unparseable telemetry record"
                );
            }
        }
    }
    Ok(records)
}
