//! Diagnostic page log
//!
//! A fire-and-forget sink for human-readable trace lines about archive
//! operations. Nothing in the archive depends on what a sink does with them.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Sink for diagnostic text
pub trait PageLog: Send + Sync {
    fn append(&self, text: &str);
}

/// Discards every line
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPageLog;

impl PageLog for NoopPageLog {
    fn append(&self, _text: &str) {}
}

/// Forwards lines to `tracing` at debug level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPageLog;

impl PageLog for TracingPageLog {
    fn append(&self, text: &str) {
        tracing::debug!(target: "insight_archive::page", "{}", text);
    }
}

/// Appends lines to a plain text file
pub struct FilePageLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl FilePageLog {
    /// Create (or truncate) the log file at `path`
    pub fn create(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PageLog for FilePageLog {
    fn append(&self, text: &str) {
        let mut file = match self.file.lock() {
            Ok(file) => file,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writeln!(file, "{}", text) {
            tracing::warn!("Failed to write page log {}: {}", self.path.display(), e);
        }
    }
}
