//! Snapshot store types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// A dated snapshot file discovered on disk.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SnapshotFile {
    // `date` first so the derived ordering sorts oldest to newest.
    pub date: NaiveDate,
    pub path: PathBuf,
}

/// Outcome of a snapshot write request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotKind {
    /// First snapshot for this entity.
    Created,
    /// A new dated file was written next to earlier ones.
    Updated,
    /// Today's snapshot already exists and the write was not forced.
    Skipped,
}

/// Options for `SnapshotStore::update_snapshots`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SnapshotOptions {
    /// Write even if today's snapshot already exists.
    pub force: bool,
    /// Keep at most this many dated files. 0 keeps everything.
    pub retain_count: usize,
}

impl SnapshotOptions {
    pub fn retain(retain_count: usize) -> Self {
        Self {
            retain_count,
            ..Default::default()
        }
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }
}

/// The snapshot that was latest before a write.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreviousSnapshot {
    pub path: PathBuf,
    pub date: NaiveDate,
    pub data: Value,
}

/// A rotation deletion that failed and left its file behind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationError {
    pub path: PathBuf,
    pub message: String,
}

/// Result of `SnapshotStore::update_snapshots`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotResult {
    #[serde(rename = "type")]
    pub kind: SnapshotKind,

    /// Written file, or the existing latest file when skipped.
    pub path: PathBuf,

    pub date: NaiveDate,

    /// Content passed in by the caller. When skipped this was not written
    /// and may differ from what is on disk.
    pub data: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<PreviousSnapshot>,

    /// Files deleted by rotation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<SnapshotFile>,

    /// Rotation deletions that failed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rotation_errors: Vec<RotationError>,
}

impl SnapshotResult {
    pub fn was_written(&self) -> bool {
        self.kind != SnapshotKind::Skipped
    }
}
