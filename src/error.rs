//! Error types for snapshot history and change tracking.

use crate::snapshots::SnapshotResult;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for history operations.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Invalid field path {path:?}: {reason}")]
    InvalidFieldPath { path: String, reason: String },

    #[error("Entity is missing id field '{field}'")]
    MissingId { field: String },

    #[error("Entity id at '{field}' must be a scalar, got {found}")]
    InvalidId { field: String, found: String },

    #[error("New and old entities must both be arrays or both be single values")]
    ShapeMismatch,

    #[error("No changelog path configured")]
    MissingChangelogPath,

    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error in {path}: {message}")]
    Deserialization { path: PathBuf, message: String },

    #[error("Queued task panicked")]
    TaskPanicked,

    #[error("Task queue closed before the task completed")]
    QueueClosed,

    #[error("Task queue used outside a Tokio runtime")]
    NoRuntime,

    #[error("Snapshot for '{identifier}' was written but change tracking failed: {source}")]
    ChangeTrackingFailed {
        identifier: String,
        snapshot: Box<SnapshotResult>,
        #[source]
        source: Box<HistoryError>,
    },
}

impl HistoryError {
    /// Classify an I/O failure on `path`.
    ///
    /// Permission failures get their own variant; everything else keeps the
    /// original error and the offending path.
    pub fn from_io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => HistoryError::PermissionDenied { path },
            _ => HistoryError::Io { path, source: err },
        }
    }

    /// True for validation failures that retrying cannot fix.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            HistoryError::InvalidFieldPath { .. }
                | HistoryError::MissingId { .. }
                | HistoryError::InvalidId { .. }
                | HistoryError::ShapeMismatch
                | HistoryError::MissingChangelogPath
                | HistoryError::InvalidIdentifier(_)
                | HistoryError::InvalidConfig(_)
        )
    }
}

impl From<serde_json::Error> for HistoryError {
    fn from(e: serde_json::Error) -> Self {
        HistoryError::Serialization(e.to_string())
    }
}

/// Result type for history operations.
pub type Result<T> = std::result::Result<T, HistoryError>;
