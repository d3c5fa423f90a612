//! On-disk layout of persisted telemetry
//!
//! ```text
//! <base>/
//! ├── systemstart/            active before a port is bound
//! │   ├── debug.jsonl         log entries, then debug_1.jsonl, debug_2.jsonl, ...
//! │   └── io/
//! │       ├── <module>_<operation>[_<ts>][-op].json
//! │       └── <module>_session[_<n>].jsonl
//! └── port-<port>/            same shape, active after switch_to_port_mode
//! ```

use std::path::{Path, PathBuf};

use super::config::FileFormat;
use crate::types::Phase;

const LOG_FILE_STEM: &str = "debug";
const LOG_FILE_EXTENSION: &str = "jsonl";
const SESSION_MARKER: &str = "session";
/// Appended to individual stems that would otherwise parse as session files
const INDIVIDUAL_ESCAPE: &str = "-op";

/// Path helpers for one base directory
#[derive(Debug, Clone)]
pub struct TelemetryLayout {
    base_directory: PathBuf,
    io_directory: PathBuf,
}

impl TelemetryLayout {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(base_directory: P, io_directory: Q) -> Self {
        Self {
            base_directory: base_directory.as_ref().to_path_buf(),
            io_directory: io_directory.as_ref().to_path_buf(),
        }
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    pub fn phase_dir(&self, phase: Phase) -> PathBuf {
        self.base_directory.join(phase.dir_name())
    }

    pub fn io_dir(&self, phase: Phase) -> PathBuf {
        self.phase_dir(phase).join(&self.io_directory)
    }

    /// `debug.jsonl` for index 0, `debug_<index>.jsonl` after
    pub fn log_file_path(&self, phase: Phase, index: usize) -> PathBuf {
        let name = if index == 0 {
            format!("{}.{}", LOG_FILE_STEM, LOG_FILE_EXTENSION)
        } else {
            format!("{}_{}.{}", LOG_FILE_STEM, index, LOG_FILE_EXTENSION)
        };
        self.phase_dir(phase).join(name)
    }

    /// `<module>_session.<ext>` for index 0, `<module>_session_<index>.<ext>` after
    pub fn session_file_path(
        &self,
        phase: Phase,
        module_id: &str,
        index: usize,
        format: FileFormat,
    ) -> PathBuf {
        let module = sanitize_component(module_id);
        let name = if index == 0 {
            format!("{}_{}.{}", module, SESSION_MARKER, format.extension())
        } else {
            format!("{}_{}_{}.{}", module, SESSION_MARKER, index, format.extension())
        };
        self.io_dir(phase).join(name)
    }

    /// `<module>_<operation>[_<disambiguator>].<ext>`
    ///
    /// A stem shaped like `<x>_session` or `<x>_session_<n>` gets `-op`
    /// appended, so an individual file never shares a path or a name
    /// pattern with a session file.
    pub fn individual_file_path(
        &self,
        phase: Phase,
        module_id: &str,
        operation_id: &str,
        disambiguator: Option<&str>,
        format: FileFormat,
    ) -> PathBuf {
        let mut name = format!(
            "{}_{}",
            sanitize_component(module_id),
            sanitize_component(operation_id)
        );
        if let Some(suffix) = disambiguator {
            name.push('_');
            name.push_str(&sanitize_component(suffix));
        }
        if session_stem_parts(&name).is_some() {
            name.push_str(INDIVIDUAL_ESCAPE);
        }
        name.push('.');
        name.push_str(format.extension());
        self.io_dir(phase).join(name)
    }
}

/// Replace every character outside `[A-Za-z0-9._-]` with `_`
pub fn sanitize_component(value: &str) -> String {
    let sanitized: String = value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.is_empty() {
        "_".to_string()
    } else {
        sanitized
    }
}

fn file_stem(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|s| s.to_str())
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|s| s.to_str())
}

/// Index of a log file, `None` if the path is not one
pub fn log_file_index(path: &Path) -> Option<usize> {
    if extension(path) != Some(LOG_FILE_EXTENSION) {
        return None;
    }
    let stem = file_stem(path)?;
    if stem == LOG_FILE_STEM {
        return Some(0);
    }
    stem.strip_prefix(LOG_FILE_STEM)?
        .strip_prefix('_')?
        .parse()
        .ok()
}

/// Split a session file name into its sanitized module id and index
pub fn session_file_parts(path: &Path) -> Option<(String, usize)> {
    session_stem_parts(file_stem(path)?)
}

fn session_stem_parts(stem: &str) -> Option<(String, usize)> {
    let marker = format!("_{}", SESSION_MARKER);

    if let Some(module) = stem.strip_suffix(marker.as_str()) {
        if !module.is_empty() {
            return Some((module.to_string(), 0));
        }
    }

    let (head, index) = stem.rsplit_once('_')?;
    let index: usize = index.parse().ok()?;
    let module = head.strip_suffix(marker.as_str())?;
    if module.is_empty() {
        return None;
    }
    Some((module.to_string(), index))
}

pub fn is_session_file(path: &Path) -> bool {
    session_file_parts(path).is_some()
}

/// Whether `path` has one of the I/O file extensions
pub fn is_io_file(path: &Path) -> bool {
    matches!(extension(path), Some("json") | Some("jsonl"))
}
