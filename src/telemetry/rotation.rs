//! Log and session file rotation
//!
//! Provides functionality for:
//! - Choosing the active log file and starting a new one past `maxFileSize`
//! - Deleting the oldest log files beyond `maxLogFiles`
//! - Tracking per-module session files and rotating past `maxEntriesPerFile`
//!
//! Cursors are resolved lazily from what is already on disk, so an engine
//! restarted over an existing directory continues the sequence instead of
//! overfilling the last file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::config::FileFormat;
use super::error::{TelemetryError, TelemetryResult};
use super::fs::FileSystem;
use super::layout::{log_file_index, sanitize_component, session_file_parts, TelemetryLayout};
use crate::types::Phase;

/// Active log file of one phase directory
#[derive(Debug, Default)]
pub struct LogRotation {
    current_index: Option<usize>,
}

impl LogRotation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the cursor; the next call rescans the directory
    pub fn reset(&mut self) {
        self.current_index = None;
    }

    /// Path the next log line should be appended to
    ///
    /// Starts a new file once the current one holds `max_file_size` bytes
    /// and removes the oldest files so at most `max_log_files` remain.
    pub fn active_path(
        &mut self,
        fs: &dyn FileSystem,
        layout: &TelemetryLayout,
        phase: Phase,
        max_file_size: u64,
        max_log_files: usize,
    ) -> TelemetryResult<PathBuf> {
        let index = match self.current_index {
            Some(index) => index,
            None => {
                let existing = list_log_indices(fs, &layout.phase_dir(phase))?;
                existing.last().copied().unwrap_or(0)
            }
        };

        let path = layout.log_file_path(phase, index);
        let size = if fs.exists(&path) {
            fs.file_size(&path)
                .map_err(|e| TelemetryError::io(&path, e))?
        } else {
            0
        };

        if size >= max_file_size {
            let next = index + 1;
            self.current_index = Some(next);
            self.cleanup(fs, layout, phase, max_log_files.saturating_sub(1))?;
            Ok(layout.log_file_path(phase, next))
        } else {
            self.current_index = Some(index);
            Ok(path)
        }
    }

    /// Keep only the newest `keep_count` log files, returning how many were deleted
    fn cleanup(
        &self,
        fs: &dyn FileSystem,
        layout: &TelemetryLayout,
        phase: Phase,
        keep_count: usize,
    ) -> TelemetryResult<usize> {
        let indices = list_log_indices(fs, &layout.phase_dir(phase))?;
        if indices.len() <= keep_count {
            return Ok(0);
        }

        let delete_count = indices.len() - keep_count;
        for index in &indices[..delete_count] {
            let path = layout.log_file_path(phase, *index);
            fs.remove_file(&path)
                .map_err(|e| TelemetryError::io(&path, e))?;
            tracing::debug!(path = %path.display(), "deleted old log file");
        }
        Ok(delete_count)
    }
}

/// Sorted indices of the log files in `dir`
fn list_log_indices(fs: &dyn FileSystem, dir: &Path) -> TelemetryResult<Vec<usize>> {
    let files = fs.list_files(dir).map_err(|e| TelemetryError::io(dir, e))?;
    let mut indices: Vec<usize> = files.iter().filter_map(|p| log_file_index(p)).collect();
    indices.sort_unstable();
    Ok(indices)
}

#[derive(Debug, Clone, Copy)]
struct SessionCursor {
    index: usize,
    lines: usize,
}

/// Per-module session file cursors of one phase
#[derive(Debug, Default)]
pub struct SessionRotation {
    cursors: HashMap<String, SessionCursor>,
}

impl SessionRotation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.cursors.clear();
    }

    /// Path the module's next session line goes to
    ///
    /// Call [`SessionRotation::record_write`] after the line was written.
    pub fn active_path(
        &mut self,
        fs: &dyn FileSystem,
        layout: &TelemetryLayout,
        phase: Phase,
        module_id: &str,
        format: FileFormat,
        max_entries_per_file: usize,
    ) -> TelemetryResult<PathBuf> {
        let cursor = match self.cursors.get(module_id) {
            Some(cursor) => *cursor,
            None => self.resume(fs, layout, phase, module_id, format)?,
        };

        let cursor = if cursor.lines >= max_entries_per_file {
            SessionCursor {
                index: cursor.index + 1,
                lines: 0,
            }
        } else {
            cursor
        };
        self.cursors.insert(module_id.to_string(), cursor);

        Ok(layout.session_file_path(phase, module_id, cursor.index, format))
    }

    pub fn record_write(&mut self, module_id: &str) {
        if let Some(cursor) = self.cursors.get_mut(module_id) {
            cursor.lines += 1;
        }
    }

    /// Rebuild a cursor from the highest-indexed session file on disk
    fn resume(
        &self,
        fs: &dyn FileSystem,
        layout: &TelemetryLayout,
        phase: Phase,
        module_id: &str,
        format: FileFormat,
    ) -> TelemetryResult<SessionCursor> {
        let dir = layout.io_dir(phase);
        let module = sanitize_component(module_id);
        let files = fs.list_files(&dir).map_err(|e| TelemetryError::io(&dir, e))?;

        let index = files
            .iter()
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(format.extension()))
            .filter_map(|p| session_file_parts(p))
            .filter(|(m, _)| *m == module)
            .map(|(_, index)| index)
            .max();

        let Some(index) = index else {
            return Ok(SessionCursor { index: 0, lines: 0 });
        };

        let path = layout.session_file_path(phase, module_id, index, format);
        let content = fs
            .read_to_string(&path)
            .map_err(|e| TelemetryError::io(&path, e))?;
        let lines = content.lines().filter(|l| !l.trim().is_empty()).count();

        Ok(SessionCursor { index, lines })
    }
}
