//! Classifier configuration.

use super::path::FieldPath;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Field paths that drive classification, as authored by callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChangeConfig {
    /// Path to the entity's identity value.
    pub id_field: String,

    /// A difference here is a full update.
    pub tracked_fields: Vec<String>,

    /// Validated but not used by comparison.
    pub update_fields: Vec<String>,

    /// A difference here (and nowhere tracked) is a soft update.
    pub soft_update_fields: Vec<String>,
}

impl Default for ChangeConfig {
    fn default() -> Self {
        Self {
            id_field: "id".to_string(),
            tracked_fields: Vec::new(),
            update_fields: Vec::new(),
            soft_update_fields: Vec::new(),
        }
    }
}

impl ChangeConfig {
    pub fn new(id_field: impl Into<String>) -> Self {
        Self {
            id_field: id_field.into(),
            ..Default::default()
        }
    }

    pub fn tracked<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tracked_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn update<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.update_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn soft<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.soft_update_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Validate every path, failing on the first bad one.
    pub fn compile(&self) -> Result<ClassifierConfig> {
        let parse_all = |fields: &[String]| -> Result<Vec<FieldPath>> {
            fields.iter().map(|f| FieldPath::parse(f)).collect()
        };

        Ok(ClassifierConfig {
            id_field: FieldPath::parse(&self.id_field)?,
            tracked_fields: parse_all(&self.tracked_fields)?,
            update_fields: parse_all(&self.update_fields)?,
            soft_update_fields: parse_all(&self.soft_update_fields)?,
        })
    }
}

/// `ChangeConfig` with every path validated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassifierConfig {
    pub id_field: FieldPath,
    pub tracked_fields: Vec<FieldPath>,
    // TODO: decide whether update fields should yield their own change type
    // or be dropped from the configuration.
    pub update_fields: Vec<FieldPath>,
    pub soft_update_fields: Vec<FieldPath>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HistoryError;

    #[test]
    fn test_compile_validates_every_list() {
        let ok = ChangeConfig::new("id")
            .tracked(["status", "owner.login"])
            .update(["updated_at"])
            .soft(["stars"]);
        let compiled = ok.compile().unwrap();
        assert_eq!(compiled.tracked_fields.len(), 2);
        assert_eq!(compiled.update_fields[0].as_str(), "updated_at");

        let bad_update = ChangeConfig::new("id").update(["updated..at"]);
        assert!(matches!(
            bad_update.compile(),
            Err(HistoryError::InvalidFieldPath { .. })
        ));

        let bad_id = ChangeConfig::new("");
        assert!(bad_id.compile().is_err());
    }

    #[test]
    fn test_deserialize_camel_case() {
        let config: ChangeConfig = serde_json::from_str(
            r#"{"idField": "full_name", "trackedFields": ["description"], "softUpdateFields": ["stargazers_count"]}"#,
        )
        .unwrap();

        assert_eq!(config.id_field, "full_name");
        assert_eq!(config.tracked_fields, vec!["description"]);
        assert!(config.update_fields.is_empty());
        assert_eq!(config.soft_update_fields, vec!["stargazers_count"]);
    }
}
