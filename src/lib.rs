//! # Entity History
//!
//! Dated snapshots and classified change logs for JSON entities fetched
//! from an upstream source.
//!
//! ## Core Concepts
//!
//! - **Snapshots**: One full JSON copy of an entity per calendar day, with retention
//! - **Change records**: Add, full, soft and removal events between two states
//! - **Change log**: Append-only JSON array per entity, written through a task queue
//! - **History service**: Resolves entity directories and drives both stores
//!
//! ## Example
//!
//! ```ignore
//! use entity_history::{ChangeConfig, ChangeQuery, HistoryConfig, HistoryService};
//!
//! let service = HistoryService::open(HistoryConfig::new(
//!     "./history/repos",
//!     "repository",
//!     ChangeConfig::new("full_name")
//!         .tracked(["default_branch", "archived"])
//!         .soft(["stargazers_count"]),
//! ))?;
//!
//! // Snapshot today's state and log what changed since the last snapshot
//! let result = service.process_changes("tokio", &json!({
//!     "full_name": "tokio-rs/tokio",
//!     "default_branch": "master",
//!     "archived": false,
//!     "stargazers_count": 25000
//! })).await?;
//!
//! // Read the log back
//! let changes = service.query_changes("tokio", &ChangeQuery::new().limit(10)).await?;
//! ```

pub mod changelog;
pub mod classify;
pub mod clock;
pub mod error;
pub mod history;
pub mod logging;
pub mod queue;
pub mod snapshots;
pub mod storage;
pub mod tracker;
pub mod types;

// Re-exports
pub use changelog::{ChangeLogStore, ChangeQuery, CHANGELOG_FILE};
pub use classify::{values_equal, ChangeClassifier, ChangeConfig, ClassifierConfig, FieldPath};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{HistoryError, Result};
pub use history::{HistoryConfig, HistoryResult, HistoryService};
pub use logging::{default_logger, HistoryLogger, TracingLogger};
pub use queue::{TaskHandle, TaskQueue};
pub use snapshots::{
    PreviousSnapshot, RotationError, SnapshotFile, SnapshotKind, SnapshotOptions, SnapshotResult,
    SnapshotStore,
};
pub use storage::{FsBackend, MemoryBackend, StorageBackend};
pub use tracker::ChangeTracker;
pub use types::*;
