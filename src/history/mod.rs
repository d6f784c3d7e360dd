//! The entry point used by callers.
//!
//! A [`HistoryService`] maps entity identifiers to directories and drives
//! the snapshot store and change tracker for each update.

mod config;
mod service;

pub use config::HistoryConfig;
pub use service::{HistoryResult, HistoryService};
