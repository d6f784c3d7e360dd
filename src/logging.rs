//! Injectable logging capability.
//!
//! Stores and the history service take an `Arc<dyn HistoryLogger>` at
//! construction. The default forwards to `tracing`; tests can swap in their
//! own implementation to assert on what was reported.

use once_cell::sync::Lazy;
use std::sync::Arc;

/// Logging sink used throughout the crate.
pub trait HistoryLogger: Send + Sync {
    fn info(&self, message: &str);

    fn warn(&self, message: &str);

    fn error(&self, message: &str);

    /// Report progress through a batch of `total` items.
    fn progress(&self, current: usize, total: usize, label: &str);
}

/// Forwards everything to the `tracing` macros under the `entity_history` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl HistoryLogger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!(target: "entity_history", "{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "entity_history", "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "entity_history", "{}", message);
    }

    fn progress(&self, current: usize, total: usize, label: &str) {
        tracing::info!(target: "entity_history", current, total, label, "progress");
    }
}

static DEFAULT_LOGGER: Lazy<Arc<dyn HistoryLogger>> = Lazy::new(|| Arc::new(TracingLogger));

/// The process-wide logger used when a constructor is not given one.
pub fn default_logger() -> Arc<dyn HistoryLogger> {
    Arc::clone(&DEFAULT_LOGGER)
}
