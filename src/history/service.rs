//! Per-entity snapshot and change log coordination.

use super::config::HistoryConfig;
use crate::changelog::{ChangeLogStore, ChangeQuery, CHANGELOG_FILE};
use crate::classify::ChangeClassifier;
use crate::clock::{Clock, SystemClock};
use crate::error::{HistoryError, Result};
use crate::logging::{default_logger, HistoryLogger};
use crate::snapshots::{SnapshotFile, SnapshotOptions, SnapshotResult, SnapshotStore};
use crate::storage::{FsBackend, StorageBackend};
use crate::tracker::ChangeTracker;
use crate::types::ChangeRecord;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Outcome of one history update.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResult {
    pub identifier: String,
    pub snapshot: SnapshotResult,
    /// Appended records, `None` when nothing changed.
    pub changes: Option<Vec<ChangeRecord>>,
}

/// Snapshot history and change tracking for one entity type.
///
/// Each entity lives in its own directory under `base_path`, holding dated
/// snapshots and a `changelog.json`. An update writes today's snapshot
/// first and then appends the classified changes. The two steps are not
/// transactional; see [`HistoryError::ChangeTrackingFailed`].
///
/// Only one process should update a given base path.
pub struct HistoryService {
    config: HistoryConfig,
    snapshots: SnapshotStore,
    tracker: ChangeTracker,
    logger: Arc<dyn HistoryLogger>,
}

impl HistoryService {
    /// Create a service with the system clock and the default logger.
    pub fn new(config: HistoryConfig, backend: Arc<dyn StorageBackend>) -> Result<Self> {
        Self::with_parts(config, backend, Arc::new(SystemClock), default_logger())
    }

    /// Create a service on the local filesystem.
    pub fn open(config: HistoryConfig) -> Result<Self> {
        Self::new(config, Arc::new(FsBackend::new()))
    }

    /// Create a service with an explicit clock and logger.
    pub fn with_parts(
        config: HistoryConfig,
        backend: Arc<dyn StorageBackend>,
        clock: Arc<dyn Clock>,
        logger: Arc<dyn HistoryLogger>,
    ) -> Result<Self> {
        let compiled = config.validate()?;

        let snapshots = SnapshotStore::new(Arc::clone(&backend))
            .with_clock(Arc::clone(&clock))
            .with_logger(Arc::clone(&logger));
        let log = Arc::new(ChangeLogStore::new(backend).with_logger(Arc::clone(&logger)));
        let classifier =
            ChangeClassifier::from_compiled(compiled, config.entity_type.clone()).with_clock(clock);

        Ok(Self {
            config,
            snapshots,
            tracker: ChangeTracker::new(classifier, log),
            logger,
        })
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Directory holding the snapshots and change log of `identifier`.
    pub fn entity_dir(&self, identifier: &str) -> Result<PathBuf> {
        validate_identifier(identifier)?;

        let mut dir = self.config.base_path.clone();
        if self.config.use_entity_folder {
            if let Some(first) = identifier.chars().next() {
                dir.push(first.to_string());
            }
        }
        dir.push(identifier);
        Ok(dir)
    }

    pub fn changelog_path(&self, identifier: &str) -> Result<PathBuf> {
        Ok(self.entity_dir(identifier)?.join(CHANGELOG_FILE))
    }

    /// Record `new` using the latest snapshot as the previous state.
    pub async fn process_changes(&self, identifier: &str, new: &Value) -> Result<HistoryResult> {
        self.track_changes(identifier, new, None).await
    }

    /// Serialize `entity` and record it like [`process_changes`](Self::process_changes).
    pub async fn process_serialized<T: Serialize>(
        &self,
        identifier: &str,
        entity: &T,
    ) -> Result<HistoryResult> {
        let value = serde_json::to_value(entity)?;
        self.process_changes(identifier, &value).await
    }

    /// Write today's snapshot of `new`, then classify it against `old` and
    /// append the changes.
    ///
    /// When `old` is `None` the latest snapshot is loaded before anything is
    /// written. If the snapshot step fails nothing is appended. If change
    /// tracking fails afterwards the snapshot stays on disk and the error
    /// carries its result.
    pub async fn track_changes(
        &self,
        identifier: &str,
        new: &Value,
        old: Option<&Value>,
    ) -> Result<HistoryResult> {
        let dir = self.entity_dir(identifier)?;

        let loaded;
        let old = match old {
            Some(old) => Some(old),
            None => {
                loaded = self.snapshots.latest_content(&dir).await?;
                loaded.as_ref()
            }
        };

        let snapshot = self
            .snapshots
            .update_snapshots(
                &dir,
                new,
                SnapshotOptions::retain(self.config.snapshot_retention),
            )
            .await?;

        let changelog = dir.join(CHANGELOG_FILE);
        let changes = match self.tracker.track_changes(new, old, Some(&changelog)).await {
            Ok(changes) => changes,
            Err(e) => {
                self.logger.error(&format!(
                    "snapshot for {} written to {} but change tracking failed: {}",
                    identifier,
                    snapshot.path.display(),
                    e
                ));
                return Err(HistoryError::ChangeTrackingFailed {
                    identifier: identifier.to_string(),
                    snapshot: Box::new(snapshot),
                    source: Box::new(e),
                });
            }
        };

        Ok(HistoryResult {
            identifier: identifier.to_string(),
            snapshot,
            changes: if changes.is_empty() { None } else { Some(changes) },
        })
    }

    /// Process `items` one after another.
    ///
    /// A failing item does not stop the batch; each result is returned next
    /// to its identifier in input order.
    pub async fn process_batch<I, S>(&self, items: I) -> Vec<(String, Result<HistoryResult>)>
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let items: Vec<(String, Value)> =
            items.into_iter().map(|(id, value)| (id.into(), value)).collect();
        let total = items.len();
        let mut results = Vec::with_capacity(total);

        for (i, (identifier, value)) in items.into_iter().enumerate() {
            let result = self.process_changes(&identifier, &value).await;
            if let Err(ref e) = result {
                self.logger
                    .warn(&format!("failed to process {}: {}", identifier, e));
            }
            self.logger
                .progress(i + 1, total, &self.config.entity_type);
            results.push((identifier, result));
        }
        results
    }

    /// Whether `identifier` has no snapshot for today yet.
    pub async fn refresh_needed(&self, identifier: &str) -> Result<bool> {
        let dir = self.entity_dir(identifier)?;
        self.snapshots.should_refresh(&dir).await
    }

    pub async fn query_changes(
        &self,
        identifier: &str,
        query: &ChangeQuery,
    ) -> Result<Vec<ChangeRecord>> {
        let path = self.changelog_path(identifier)?;
        self.tracker.log().query(query, &path).await
    }

    /// Content of the newest snapshot of `identifier`.
    pub async fn latest_snapshot(&self, identifier: &str) -> Result<Option<Value>> {
        let dir = self.entity_dir(identifier)?;
        self.snapshots.latest_content(&dir).await
    }

    pub async fn list_snapshots(&self, identifier: &str) -> Result<Vec<SnapshotFile>> {
        let dir = self.entity_dir(identifier)?;
        self.snapshots.list_snapshots(&dir).await
    }
}

fn validate_identifier(identifier: &str) -> Result<()> {
    let invalid = identifier.is_empty()
        || identifier == "."
        || identifier == ".."
        || identifier.contains(['/', '\\'])
        || Path::new(identifier).is_absolute();
    if invalid {
        return Err(HistoryError::InvalidIdentifier(identifier.to_string()));
    }
    Ok(())
}
