//! Core types shared by the classifier and the change log.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Significance of a detected change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// Entity seen for the first time.
    Add,
    /// A tracked field changed.
    Full,
    /// Only soft-update fields changed.
    Soft,
    /// Entity disappeared from a collection.
    Removal,
}

impl ChangeType {
    pub const ALL: [ChangeType; 4] = [
        ChangeType::Add,
        ChangeType::Full,
        ChangeType::Soft,
        ChangeType::Removal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Add => "add",
            ChangeType::Full => "full",
            ChangeType::Soft => "soft",
            ChangeType::Removal => "removal",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(ChangeType::Add),
            "full" => Ok(ChangeType::Full),
            "soft" => Ok(ChangeType::Soft),
            "removal" => Ok(ChangeType::Removal),
            other => Err(format!("unknown change type: {}", other)),
        }
    }
}

/// One classified change, as stored in `changelog.json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    /// Value of the entity's id field.
    pub id: String,

    /// Detection time. Every record from one pass shares it.
    pub timestamp: DateTime<Utc>,

    #[serde(rename = "type")]
    pub change_type: ChangeType,

    pub entity_type: String,

    /// New state for add/full/soft, last known state for removal.
    pub data: Value,
}

impl ChangeRecord {
    pub fn new(
        id: impl Into<String>,
        timestamp: DateTime<Utc>,
        change_type: ChangeType,
        entity_type: impl Into<String>,
        data: Value,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp,
            change_type,
            entity_type: entity_type.into(),
            data,
        }
    }

    /// Decode the payload into a caller type.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_record_wire_format() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let record = ChangeRecord::new("42", ts, ChangeType::Soft, "repository", json!({"id": 42}));

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["type"], "soft");
        assert_eq!(value["entityType"], "repository");
        assert_eq!(value["timestamp"], "2024-03-01T12:00:00Z");

        let back: ChangeRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_change_type_parse() {
        for t in ChangeType::ALL {
            assert_eq!(t.as_str().parse::<ChangeType>().unwrap(), t);
        }
        assert!("modified".parse::<ChangeType>().is_err());
    }

    #[test]
    fn test_data_as() {
        #[derive(Deserialize)]
        struct Repo {
            name: String,
        }

        let record = ChangeRecord::new("1", Utc::now(), ChangeType::Add, "repo", json!({"name": "tokio"}));
        let repo: Repo = record.data_as().unwrap();
        assert_eq!(repo.name, "tokio");
    }
}
