//! In-memory backend for tests and embedded use.

use super::backend::StorageBackend;
use crate::error::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Keeps every object in a map keyed by path.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    objects: RwLock<BTreeMap<PathBuf, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored paths, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.objects.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        Ok(self.objects.read().get(path).cloned())
    }

    async fn put(&self, path: &Path, contents: Vec<u8>) -> Result<()> {
        self.objects.write().insert(path.to_path_buf(), contents);
        Ok(())
    }

    async fn list(&self, dir: &Path) -> Result<Vec<String>> {
        // BTreeMap order keeps the names sorted.
        Ok(self
            .objects
            .read()
            .keys()
            .filter(|path| path.parent() == Some(dir))
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect())
    }

    async fn delete(&self, path: &Path) -> Result<bool> {
        Ok(self.objects.write().remove(path).is_some())
    }
}
