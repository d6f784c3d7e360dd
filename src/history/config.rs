//! History service configuration.

use crate::classify::{ChangeConfig, ClassifierConfig};
use crate::error::{HistoryError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where and how one kind of entity is tracked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryConfig {
    /// Root directory holding one folder per entity.
    pub base_path: PathBuf,

    /// Stamped on every change record, e.g. "repository".
    pub entity_type: String,

    #[serde(default)]
    pub change_config: ChangeConfig,

    /// Shard entity folders by the identifier's first character.
    #[serde(default)]
    pub use_entity_folder: bool,

    /// Dated snapshots kept per entity. 0 keeps all of them.
    #[serde(default)]
    pub snapshot_retention: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("./history"),
            entity_type: String::new(),
            change_config: ChangeConfig::default(),
            use_entity_folder: false,
            snapshot_retention: 0,
        }
    }
}

impl HistoryConfig {
    pub fn new(
        base_path: impl Into<PathBuf>,
        entity_type: impl Into<String>,
        change_config: ChangeConfig,
    ) -> Self {
        Self {
            base_path: base_path.into(),
            entity_type: entity_type.into(),
            change_config,
            ..Default::default()
        }
    }

    pub fn with_entity_folder(mut self, enabled: bool) -> Self {
        self.use_entity_folder = enabled;
        self
    }

    pub fn with_retention(mut self, snapshot_retention: usize) -> Self {
        self.snapshot_retention = snapshot_retention;
        self
    }

    /// Parse a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| HistoryError::InvalidConfig(e.to_string()))
    }

    /// Check the configuration and compile its field paths.
    pub fn validate(&self) -> Result<ClassifierConfig> {
        if self.entity_type.trim().is_empty() {
            return Err(HistoryError::InvalidConfig(
                "entityType must not be empty".to_string(),
            ));
        }
        self.change_config.compile()
    }
}
