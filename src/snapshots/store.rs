//! Dated snapshot storage with retention.

use super::types::{
    PreviousSnapshot, RotationError, SnapshotFile, SnapshotKind, SnapshotOptions, SnapshotResult,
};
use crate::clock::{Clock, SystemClock};
use crate::error::{HistoryError, Result};
use crate::logging::{default_logger, HistoryLogger};
use crate::storage::StorageBackend;
use chrono::NaiveDate;
use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

static SNAPSHOT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}\.json$").expect("snapshot name pattern is valid"));

/// Date format used in snapshot file names.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Keeps one full-state JSON file per calendar day in an entity directory.
///
/// Snapshot writes are not serialized. Callers must not write the same
/// directory from two tasks at once.
pub struct SnapshotStore {
    backend: Arc<dyn StorageBackend>,
    clock: Arc<dyn Clock>,
    logger: Arc<dyn HistoryLogger>,
}

impl SnapshotStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            clock: Arc::new(SystemClock),
            logger: default_logger(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn HistoryLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Path of the snapshot for `date` in `dir`.
    pub fn snapshot_path(dir: &Path, date: NaiveDate) -> PathBuf {
        dir.join(format!("{}.json", date.format(DATE_FORMAT)))
    }

    /// Date encoded in a snapshot file name, if the name is one.
    pub fn parse_snapshot_name(name: &str) -> Option<NaiveDate> {
        if !SNAPSHOT_NAME.is_match(name) {
            return None;
        }
        NaiveDate::parse_from_str(name.trim_end_matches(".json"), DATE_FORMAT).ok()
    }

    /// All snapshots in `dir`, oldest first. Other files are ignored.
    pub async fn list_snapshots(&self, dir: &Path) -> Result<Vec<SnapshotFile>> {
        let mut files: Vec<SnapshotFile> = self
            .backend
            .list(dir)
            .await?
            .iter()
            .filter_map(|name| {
                Self::parse_snapshot_name(name).map(|date| SnapshotFile {
                    date,
                    path: dir.join(name),
                })
            })
            .collect();
        files.sort();
        Ok(files)
    }

    pub async fn latest_snapshot(&self, dir: &Path) -> Result<Option<SnapshotFile>> {
        Ok(self.list_snapshots(dir).await?.pop())
    }

    /// Read and parse one snapshot. `None` if the file has disappeared.
    pub async fn read_snapshot(&self, file: &SnapshotFile) -> Result<Option<Value>> {
        match self.backend.get(&file.path).await? {
            Some(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|e| {
                HistoryError::Deserialization {
                    path: file.path.clone(),
                    message: e.to_string(),
                }
            }),
            None => Ok(None),
        }
    }

    /// Content of the newest snapshot, if any.
    pub async fn latest_content(&self, dir: &Path) -> Result<Option<Value>> {
        match self.latest_snapshot(dir).await? {
            Some(file) => self.read_snapshot(&file).await,
            None => Ok(None),
        }
    }

    /// True if there is no snapshot yet or the newest one is not from today.
    pub async fn should_refresh(&self, dir: &Path) -> Result<bool> {
        let today = self.clock.today();
        Ok(self
            .latest_snapshot(dir)
            .await?
            .map_or(true, |latest| latest.date != today))
    }

    /// Write today's snapshot of `content` and apply retention.
    ///
    /// Skips the write when today's file already exists, unless forced.
    /// Retention deletes the oldest files concurrently; a failed deletion is
    /// reported in `rotation_errors` and never rolls anything back.
    pub async fn update_snapshots(
        &self,
        dir: &Path,
        content: &Value,
        options: SnapshotOptions,
    ) -> Result<SnapshotResult> {
        let today = self.clock.today();
        let latest = self.latest_snapshot(dir).await?;

        if let Some(latest) = &latest {
            if latest.date == today && !options.force {
                self.logger.info(&format!(
                    "snapshot for {} already taken on {}, skipping",
                    dir.display(),
                    today
                ));
                return Ok(SnapshotResult {
                    kind: SnapshotKind::Skipped,
                    path: latest.path.clone(),
                    date: latest.date,
                    data: content.clone(),
                    previous: None,
                    removed: Vec::new(),
                    rotation_errors: Vec::new(),
                });
            }
        }

        let previous = match &latest {
            Some(file) => self
                .read_snapshot(file)
                .await?
                .map(|data| PreviousSnapshot {
                    path: file.path.clone(),
                    date: file.date,
                    data,
                }),
            None => None,
        };

        let path = Self::snapshot_path(dir, today);
        let bytes = serde_json::to_vec_pretty(content)?;
        self.backend.put(&path, bytes).await?;

        let (removed, rotation_errors) = if options.retain_count > 0 {
            self.rotate(dir, options.retain_count).await?
        } else {
            (Vec::new(), Vec::new())
        };

        let kind = if latest.is_none() {
            SnapshotKind::Created
        } else {
            SnapshotKind::Updated
        };

        self.logger.info(&format!(
            "wrote snapshot {} ({:?}, {} rotated out)",
            path.display(),
            kind,
            removed.len()
        ));

        Ok(SnapshotResult {
            kind,
            path,
            date: today,
            data: content.clone(),
            previous,
            removed,
            rotation_errors,
        })
    }

    /// Delete the oldest snapshots beyond `retain_count`.
    async fn rotate(
        &self,
        dir: &Path,
        retain_count: usize,
    ) -> Result<(Vec<SnapshotFile>, Vec<RotationError>)> {
        let files = self.list_snapshots(dir).await?;
        if files.len() <= retain_count {
            return Ok((Vec::new(), Vec::new()));
        }

        let excess = &files[..files.len() - retain_count];
        let outcomes = join_all(excess.iter().map(|file| self.backend.delete(&file.path))).await;

        let mut removed = Vec::new();
        let mut errors = Vec::new();
        for (file, outcome) in excess.iter().zip(outcomes) {
            match outcome {
                Ok(_) => removed.push(file.clone()),
                Err(e) => {
                    self.logger.warn(&format!(
                        "failed to rotate out snapshot {}: {}",
                        file.path.display(),
                        e
                    ));
                    errors.push(RotationError {
                        path: file.path.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        Ok((removed, errors))
    }
}
