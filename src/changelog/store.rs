//! Append-only change log file per entity.

use super::query::ChangeQuery;
use crate::error::{HistoryError, Result};
use crate::logging::{default_logger, HistoryLogger};
use crate::queue::{TaskHandle, TaskQueue};
use crate::storage::StorageBackend;
use crate::types::ChangeRecord;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File name of the change log inside an entity directory.
pub const CHANGELOG_FILE: &str = "changelog.json";

/// Stores change records as one JSON array per file.
///
/// Appends are read-modify-write cycles serialized through this instance's
/// `TaskQueue`, so concurrent appends from one process never lose records.
/// Nothing coordinates two instances or two processes writing the same file;
/// the last full write wins. Run a single writer per change log.
pub struct ChangeLogStore {
    backend: Arc<dyn StorageBackend>,
    queue: TaskQueue,
    logger: Arc<dyn HistoryLogger>,
}

impl ChangeLogStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            queue: TaskQueue::new(),
            logger: default_logger(),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn HistoryLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Queue an append of `changes` to the log at `path`.
    ///
    /// The append is submitted immediately; the handle resolves to the total
    /// number of records in the log afterwards.
    pub fn append(&self, changes: Vec<ChangeRecord>, path: impl Into<PathBuf>) -> TaskHandle<usize> {
        let path = path.into();
        let backend = Arc::clone(&self.backend);
        let logger = Arc::clone(&self.logger);

        self.queue.add(async move {
            let mut records = read_records(backend.as_ref(), &path).await?;
            if changes.is_empty() {
                return Ok(records.len());
            }

            let added = changes.len();
            records.extend(changes);
            let bytes = serde_json::to_vec_pretty(&records)?;
            backend.put(&path, bytes).await?;

            logger.info(&format!(
                "appended {} change(s) to {} ({} total)",
                added,
                path.display(),
                records.len()
            ));
            Ok(records.len())
        })
    }

    /// Every record in the log at `path`, oldest first.
    pub async fn read_all(&self, path: &Path) -> Result<Vec<ChangeRecord>> {
        read_records(self.backend.as_ref(), path).await
    }

    /// Records matching `query`. A missing log is an empty result.
    pub async fn query(&self, query: &ChangeQuery, path: &Path) -> Result<Vec<ChangeRecord>> {
        Ok(query.apply(self.read_all(path).await?))
    }

    /// Appends queued or in flight.
    pub fn pending_writes(&self) -> usize {
        self.queue.pending()
    }
}

async fn read_records(backend: &dyn StorageBackend, path: &Path) -> Result<Vec<ChangeRecord>> {
    match backend.get(path).await? {
        Some(bytes) => {
            serde_json::from_slice(&bytes).map_err(|e| HistoryError::Deserialization {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        }
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;
    use crate::types::ChangeType;
    use chrono::Utc;
    use serde_json::json;

    fn change(id: &str) -> ChangeRecord {
        ChangeRecord::new(id, Utc::now(), ChangeType::Add, "repo", json!({"id": id}))
    }

    #[tokio::test]
    async fn test_append_creates_and_extends() {
        let store = ChangeLogStore::new(Arc::new(MemoryBackend::new()));
        let path = Path::new("/h/repo/changelog.json");

        assert_eq!(store.append(vec![change("a")], path).await.unwrap(), 1);
        assert_eq!(store.append(vec![change("b"), change("c")], path).await.unwrap(), 3);

        let ids: Vec<String> = store.read_all(path).await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_concurrent_appends_keep_submission_order() {
        let store = ChangeLogStore::new(Arc::new(MemoryBackend::new()));
        let path = Path::new("/h/repo/changelog.json");

        let first = store.append(vec![change("a")], path);
        let second = store.append(vec![change("b")], path);
        let (first, second) = tokio::join!(first, second);
        first.unwrap();
        second.unwrap();

        let ids: Vec<String> = store.read_all(path).await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(store.pending_writes(), 0);
    }

    #[tokio::test]
    async fn test_missing_log_queries_empty() {
        let store = ChangeLogStore::new(Arc::new(MemoryBackend::new()));
        let result = store.query(&ChangeQuery::new(), Path::new("/none/changelog.json")).await;
        assert!(result.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_log_fails_append() {
        let backend = Arc::new(MemoryBackend::new());
        let path = Path::new("/h/repo/changelog.json");
        backend.put(path, b"{\"not\": \"an array\"}".to_vec()).await.unwrap();

        let store = ChangeLogStore::new(backend.clone());
        let err = store.append(vec![change("a")], path).await.unwrap_err();
        assert!(matches!(err, HistoryError::Deserialization { .. }));

        // The bad file is left as it was.
        assert_eq!(
            backend.get(path).await.unwrap().unwrap(),
            b"{\"not\": \"an array\"}".to_vec()
        );
    }
}
