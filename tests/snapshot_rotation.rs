//! Snapshot store tests on the local filesystem.

use async_trait::async_trait;
use chrono::NaiveDate;
use entity_history::{
    FsBackend, HistoryError, ManualClock, MemoryBackend, SnapshotKind, SnapshotOptions,
    SnapshotStore, StorageBackend,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

fn store(clock: Arc<ManualClock>) -> SnapshotStore {
    SnapshotStore::new(Arc::new(FsBackend::new())).with_clock(clock)
}

fn file_names(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_created_then_updated() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("tokio");
    let clock = Arc::new(ManualClock::at_date(day(1)));
    let s = store(clock.clone());

    let first = s
        .update_snapshots(&dir, &json!({"v": 1}), SnapshotOptions::default())
        .await
        .unwrap();
    assert_eq!(first.kind, SnapshotKind::Created);
    assert!(first.previous.is_none());
    assert_eq!(first.path, dir.join("2024-01-01.json"));

    clock.advance_days(1);
    let second = s
        .update_snapshots(&dir, &json!({"v": 2}), SnapshotOptions::default())
        .await
        .unwrap();
    assert_eq!(second.kind, SnapshotKind::Updated);
    let previous = second.previous.unwrap();
    assert_eq!(previous.date, day(1));
    assert_eq!(previous.data, json!({"v": 1}));

    // pretty-printed on disk
    let text = std::fs::read_to_string(dir.join("2024-01-02.json")).unwrap();
    assert!(text.contains('\n'));
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&text).unwrap(),
        json!({"v": 2})
    );
}

#[tokio::test]
async fn test_same_day_skip_and_force() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("serde");
    let s = store(Arc::new(ManualClock::at_date(day(5))));

    s.update_snapshots(&dir, &json!({"v": 1}), SnapshotOptions::default())
        .await
        .unwrap();

    let skipped = s
        .update_snapshots(&dir, &json!({"v": 2}), SnapshotOptions::default())
        .await
        .unwrap();
    assert_eq!(skipped.kind, SnapshotKind::Skipped);
    assert!(!skipped.was_written());
    assert_eq!(skipped.path, dir.join("2024-01-05.json"));
    // the unwritten candidate is reported, the file keeps the first write
    assert_eq!(skipped.data, json!({"v": 2}));
    assert_eq!(s.latest_content(&dir).await.unwrap(), Some(json!({"v": 1})));
    assert_eq!(file_names(&dir), vec!["2024-01-05.json"]);

    let forced = s
        .update_snapshots(&dir, &json!({"v": 3}), SnapshotOptions::default().forced())
        .await
        .unwrap();
    assert_eq!(forced.kind, SnapshotKind::Updated);
    assert_eq!(s.latest_content(&dir).await.unwrap(), Some(json!({"v": 3})));
    assert_eq!(file_names(&dir), vec!["2024-01-05.json"]);
}

#[tokio::test]
async fn test_retention_keeps_newest() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("hyper");
    let clock = Arc::new(ManualClock::at_date(day(1)));
    let s = store(clock.clone());

    let mut removed = Vec::new();
    for i in 0..5 {
        let result = s
            .update_snapshots(&dir, &json!({"day": i}), SnapshotOptions::retain(2))
            .await
            .unwrap();
        assert!(result.rotation_errors.is_empty());
        removed.extend(result.removed);
        clock.advance_days(1);
    }

    assert_eq!(file_names(&dir), vec!["2024-01-04.json", "2024-01-05.json"]);
    let removed_dates: Vec<NaiveDate> = removed.iter().map(|f| f.date).collect();
    assert_eq!(removed_dates, vec![day(1), day(2), day(3)]);
}

#[tokio::test]
async fn test_listing_ignores_other_files() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("mixed");
    std::fs::create_dir_all(&dir).unwrap();
    for name in [
        "2024-01-03.json",
        "2024-01-01.json",
        "2024-02-30.json",
        "changelog.json",
        "2024-1-2.json",
        "notes.txt",
    ] {
        std::fs::write(dir.join(name), "{}").unwrap();
    }

    let s = store(Arc::new(ManualClock::at_date(day(3))));
    let dates: Vec<NaiveDate> = s
        .list_snapshots(&dir)
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.date)
        .collect();
    assert_eq!(dates, vec![day(1), day(3)]);

    assert!(!s.should_refresh(&dir).await.unwrap());
}

#[tokio::test]
async fn test_missing_directory_is_empty() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("never-written");
    let s = store(Arc::new(ManualClock::at_date(day(1))));

    assert!(s.list_snapshots(&dir).await.unwrap().is_empty());
    assert!(s.latest_content(&dir).await.unwrap().is_none());
    assert!(s.should_refresh(&dir).await.unwrap());
}

/// In-memory backend whose deletes fail for one path.
struct StuckFile {
    inner: MemoryBackend,
    stuck: PathBuf,
}

#[async_trait]
impl StorageBackend for StuckFile {
    async fn get(&self, path: &Path) -> entity_history::Result<Option<Vec<u8>>> {
        self.inner.get(path).await
    }

    async fn put(&self, path: &Path, contents: Vec<u8>) -> entity_history::Result<()> {
        self.inner.put(path, contents).await
    }

    async fn list(&self, dir: &Path) -> entity_history::Result<Vec<String>> {
        self.inner.list(dir).await
    }

    async fn delete(&self, path: &Path) -> entity_history::Result<bool> {
        if path == self.stuck {
            return Err(HistoryError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        self.inner.delete(path).await
    }
}

#[tokio::test]
async fn test_failed_rotation_is_reported_not_fatal() {
    let dir = Path::new("/history/tokio");
    let stuck = dir.join("2024-01-01.json");
    let backend = Arc::new(StuckFile {
        inner: MemoryBackend::new(),
        stuck: stuck.clone(),
    });
    let clock = Arc::new(ManualClock::at_date(day(1)));
    let s = SnapshotStore::new(backend.clone()).with_clock(clock.clone());

    for i in 0..2 {
        s.update_snapshots(dir, &json!({"day": i}), SnapshotOptions::retain(1))
            .await
            .unwrap();
        clock.advance_days(1);
    }

    // day 3: day 1 cannot be deleted, day 2 can
    let result = s
        .update_snapshots(dir, &json!({"day": 2}), SnapshotOptions::retain(1))
        .await
        .unwrap();

    assert_eq!(result.kind, SnapshotKind::Updated);
    assert_eq!(result.path, dir.join("2024-01-03.json"));
    let removed: Vec<NaiveDate> = result.removed.iter().map(|f| f.date).collect();
    assert_eq!(removed, vec![day(2)]);
    assert_eq!(result.rotation_errors.len(), 1);
    assert_eq!(result.rotation_errors[0].path, stuck);
    assert!(result.rotation_errors[0].message.contains("2024-01-01.json"));

    let left: Vec<NaiveDate> = s
        .list_snapshots(dir)
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.date)
        .collect();
    assert_eq!(left, vec![day(1), day(3)]);
    assert!(backend.inner.get(&stuck).await.unwrap().is_some());
}
