//! Append-only change logs.
//!
//! Each entity directory has one `changelog.json` holding a JSON array of
//! change records in the order they were appended.

mod query;
mod store;

pub use query::ChangeQuery;
pub use store::{ChangeLogStore, CHANGELOG_FILE};
