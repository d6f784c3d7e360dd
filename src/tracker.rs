//! Classify-then-append for a single update.

use crate::changelog::ChangeLogStore;
use crate::classify::ChangeClassifier;
use crate::error::{HistoryError, Result};
use crate::types::ChangeRecord;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Runs the classifier and records whatever it finds.
pub struct ChangeTracker {
    classifier: ChangeClassifier,
    log: Arc<ChangeLogStore>,
    changelog_path: Option<PathBuf>,
}

impl ChangeTracker {
    pub fn new(classifier: ChangeClassifier, log: Arc<ChangeLogStore>) -> Self {
        Self {
            classifier,
            log,
            changelog_path: None,
        }
    }

    /// Default log path used when `track_changes` gets no override.
    pub fn with_changelog_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.changelog_path = Some(path.into());
        self
    }

    pub fn classifier(&self) -> &ChangeClassifier {
        &self.classifier
    }

    pub fn log(&self) -> &Arc<ChangeLogStore> {
        &self.log
    }

    /// Classify `new` against `old` and append any records.
    ///
    /// The log is only touched when at least one record was produced.
    /// Returns the records, empty when nothing changed.
    pub async fn track_changes(
        &self,
        new: &Value,
        old: Option<&Value>,
        path_override: Option<&Path>,
    ) -> Result<Vec<ChangeRecord>> {
        let path = path_override
            .map(Path::to_path_buf)
            .or_else(|| self.changelog_path.clone())
            .ok_or(HistoryError::MissingChangelogPath)?;

        let changes = self.classifier.detect(new, old)?;
        if changes.is_empty() {
            return Ok(changes);
        }

        self.log.append(changes.clone(), path).await?;
        Ok(changes)
    }
}
