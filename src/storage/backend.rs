//! Storage backend trait.

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Whole-object storage addressed by path.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Read an object. Returns `None` if it does not exist.
    async fn get(&self, path: &Path) -> Result<Option<Vec<u8>>>;

    /// Write an object, creating missing parents and replacing any existing
    /// content.
    async fn put(&self, path: &Path, contents: Vec<u8>) -> Result<()>;

    /// Names of the objects directly inside `dir`, sorted. A missing
    /// directory lists as empty.
    async fn list(&self, dir: &Path) -> Result<Vec<String>>;

    /// Delete an object. Returns `false` if there was nothing to delete.
    async fn delete(&self, path: &Path) -> Result<bool>;
}
