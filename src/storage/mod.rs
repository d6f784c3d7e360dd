//! Pluggable storage for snapshots and change logs.
//!
//! Both stores talk to a `StorageBackend` keyed by path, so the same
//! snapshot and change-log logic runs against the local filesystem or an
//! in-memory map.
//!
//! Backends follow one error contract:
//! - a missing object or directory is empty state (`None`, `false`, `[]`)
//! - permission failures are `HistoryError::PermissionDenied`
//! - anything else is `HistoryError::Io` carrying the path

mod backend;
mod fs;
mod memory;

pub use backend::StorageBackend;
pub use fs::FsBackend;
pub use memory::MemoryBackend;
