//! Local filesystem backend.

use super::backend::StorageBackend;
use crate::error::{HistoryError, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Stores objects as plain files under their path.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsBackend;

impl FsBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StorageBackend for FsBackend {
    async fn get(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(HistoryError::from_io(path, e)),
        }
    }

    /// Writes to a `.tmp` sibling, syncs, then renames over the target so
    /// readers see either the old or the new content. The temp file is
    /// removed again if any step fails.
    async fn put(&self, path: &Path, contents: Vec<u8>) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| HistoryError::from_io(parent, e))?;
        }

        let temp_path = path.with_extension("tmp");
        if let Err(e) = write_synced(&temp_path, &contents).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(HistoryError::from_io(&temp_path, e));
        }

        if let Err(e) = fs::rename(&temp_path, path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(HistoryError::from_io(path, e));
        }
        Ok(())
    }

    async fn list(&self, dir: &Path) -> Result<Vec<String>> {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(HistoryError::from_io(dir, e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| HistoryError::from_io(dir, e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| HistoryError::from_io(entry.path(), e))?;
            if file_type.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        names.sort();
        Ok(names)
    }

    async fn delete(&self, path: &Path) -> Result<bool> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(HistoryError::from_io(path, e)),
        }
    }
}

async fn write_synced(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(contents).await?;
    file.sync_all().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_creates_parents_and_overwrites() {
        let dir = TempDir::new().unwrap();
        let backend = FsBackend::new();
        let path = dir.path().join("a").join("b").join("x.json");

        backend.put(&path, b"1".to_vec()).await.unwrap();
        backend.put(&path, b"2".to_vec()).await.unwrap();

        assert_eq!(backend.get(&path).await.unwrap(), Some(b"2".to_vec()));
    }

    #[tokio::test]
    async fn test_missing_things_are_empty() {
        let dir = TempDir::new().unwrap();
        let backend = FsBackend::new();
        let missing = dir.path().join("nope");

        assert_eq!(backend.get(&missing.join("f")).await.unwrap(), None);
        assert!(backend.list(&missing).await.unwrap().is_empty());
        assert!(!backend.delete(&missing.join("f")).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_skips_directories() {
        let dir = TempDir::new().unwrap();
        let backend = FsBackend::new();

        backend.put(&dir.path().join("b.json"), vec![]).await.unwrap();
        backend.put(&dir.path().join("a.json"), vec![]).await.unwrap();
        backend.put(&dir.path().join("sub").join("c.json"), vec![]).await.unwrap();

        assert_eq!(backend.list(dir.path()).await.unwrap(), vec!["a.json", "b.json"]);
    }

    #[tokio::test]
    async fn test_other_errors_carry_path() {
        let dir = TempDir::new().unwrap();
        let backend = FsBackend::new();
        let file = dir.path().join("plain");
        backend.put(&file, b"x".to_vec()).await.unwrap();

        // Listing a regular file as a directory is neither missing nor a
        // permission problem.
        let err = backend.list(&file).await.unwrap_err();
        match err {
            HistoryError::Io { path, .. } => assert_eq!(path, file),
            other => panic!("expected Io error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_put_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let backend = FsBackend::new();
        // A directory where the snapshot should go makes the rename fail.
        let target = dir.path().join("2024-01-01.json");
        std::fs::create_dir(&target).unwrap();

        let err = backend.put(&target, b"{}".to_vec()).await.unwrap_err();
        assert!(matches!(err, HistoryError::Io { ref path, .. } if path == &target));
        assert!(!dir.path().join("2024-01-01.tmp").exists());
        assert!(backend.list(dir.path()).await.unwrap().is_empty());
    }
}
