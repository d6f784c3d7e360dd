//! Dated full-state snapshots.
//!
//! Each entity directory holds at most one `YYYY-MM-DD.json` per calendar
//! day. Files are found by name, so anything else in the directory (such as
//! `changelog.json`) is left alone. Retention trims the oldest files after a
//! write.

mod store;
mod types;

pub use store::SnapshotStore;
pub use types::{
    PreviousSnapshot, RotationError, SnapshotFile, SnapshotKind, SnapshotOptions, SnapshotResult,
};
