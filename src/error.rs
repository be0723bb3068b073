//! Insight archive error types

use std::path::PathBuf;
use thiserror::Error;

/// Insight archive error type
#[derive(Error, Debug)]
pub enum Error {
    /// A caller supplied missing or malformed arguments
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A snapshot exists on disk but cannot be deserialized
    #[error("Storage corrupt at {}: {reason}", path.display())]
    StorageCorrupt {
        /// Location of the unreadable snapshot
        path: PathBuf,
        /// Deserializer message
        reason: String,
    },

    /// The similarity index rejected a write or query
    #[error("Index error: {0}")]
    Index(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::StorageCorrupt {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for insight archive operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_corrupt_display_names_path() {
        let err = Error::corrupt("/tmp/run1/insights.json", "expected value at line 1");
        let msg = err.to_string();
        assert!(msg.contains("/tmp/run1/insights.json"));
        assert!(msg.contains("expected value"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
