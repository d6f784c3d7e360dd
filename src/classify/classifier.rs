//! Change classification between two entity states.

use super::config::{ChangeConfig, ClassifierConfig};
use super::path::FieldPath;
use crate::clock::{Clock, SystemClock};
use crate::error::{HistoryError, Result};
use crate::types::{ChangeRecord, ChangeType};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Compares new entity states against old ones and classifies the result.
///
/// Pure apart from reading the clock for the pass timestamp.
#[derive(Clone)]
pub struct ChangeClassifier {
    config: ClassifierConfig,
    entity_type: String,
    clock: Arc<dyn Clock>,
}

impl ChangeClassifier {
    /// Build a classifier, validating every configured path up front.
    pub fn new(config: &ChangeConfig, entity_type: impl Into<String>) -> Result<Self> {
        Ok(Self::from_compiled(config.compile()?, entity_type))
    }

    pub fn from_compiled(config: ClassifierConfig, entity_type: impl Into<String>) -> Self {
        Self {
            config,
            entity_type: entity_type.into(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Classify `new` against `old`, stamping records with the clock's now.
    pub fn detect(&self, new: &Value, old: Option<&Value>) -> Result<Vec<ChangeRecord>> {
        self.detect_at(new, old, self.clock.now())
    }

    /// Classify with an explicit pass timestamp.
    ///
    /// Arrays are compared as collections keyed by id; anything else is a
    /// single entity. Mixing the two is rejected.
    pub fn detect_at(
        &self,
        new: &Value,
        old: Option<&Value>,
        timestamp: DateTime<Utc>,
    ) -> Result<Vec<ChangeRecord>> {
        if let Some(old) = old {
            if new.is_array() != old.is_array() {
                return Err(HistoryError::ShapeMismatch);
            }
        }

        match new {
            Value::Array(items) => {
                let old_items = match old {
                    Some(Value::Array(old_items)) => old_items.as_slice(),
                    _ => &[],
                };
                self.detect_collection(items, old_items, timestamp)
            }
            single => {
                let id = self.entity_id(single)?;
                Ok(self
                    .classify(single, old)
                    .map(|change_type| self.record(id, change_type, single, timestamp))
                    .into_iter()
                    .collect())
            }
        }
    }

    /// Resolve an entity's id as a string.
    ///
    /// Strings are used as-is and other scalars by their JSON text. A
    /// missing or null id is an error, as is an object or array.
    ///
    /// The id type is not part of the result: `1` and `"1"` both resolve to
    /// `1`, so in a collection they are the same entity.
    pub fn entity_id(&self, entity: &Value) -> Result<String> {
        let field = &self.config.id_field;
        match field.get(entity) {
            None | Some(Value::Null) => Err(HistoryError::MissingId {
                field: field.to_string(),
            }),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(v @ (Value::Number(_) | Value::Bool(_))) => Ok(v.to_string()),
            Some(other) => Err(HistoryError::InvalidId {
                field: field.to_string(),
                found: json_kind(other).to_string(),
            }),
        }
    }

    fn detect_collection(
        &self,
        new_items: &[Value],
        old_items: &[Value],
        timestamp: DateTime<Utc>,
    ) -> Result<Vec<ChangeRecord>> {
        let new_index = self.index_by_id(new_items)?;
        let old_index = self.index_by_id(old_items)?;

        let old_map: HashMap<&str, &Value> = old_index.iter().map(|(id, v)| (id.as_str(), *v)).collect();
        let new_ids: HashSet<&str> = new_index.iter().map(|(id, _)| id.as_str()).collect();

        let mut records = Vec::new();

        for (id, entity) in &new_index {
            let previous = old_map.get(id.as_str()).copied();
            if let Some(change_type) = self.classify(entity, previous) {
                records.push(self.record(id.clone(), change_type, entity, timestamp));
            }
        }

        for (id, entity) in &old_index {
            if !new_ids.contains(id.as_str()) {
                records.push(self.record(id.clone(), ChangeType::Removal, entity, timestamp));
            }
        }

        Ok(records)
    }

    /// Ids in first-seen order. A repeated id keeps its first entity.
    fn index_by_id<'a>(&self, items: &'a [Value]) -> Result<Vec<(String, &'a Value)>> {
        let mut seen = HashSet::new();
        let mut index = Vec::with_capacity(items.len());
        for item in items {
            let id = self.entity_id(item)?;
            if seen.insert(id.clone()) {
                index.push((id, item));
            }
        }
        Ok(index)
    }

    /// Add when there is no old state, then tracked fields, then soft fields.
    fn classify(&self, new: &Value, old: Option<&Value>) -> Option<ChangeType> {
        let old = match old {
            None => return Some(ChangeType::Add),
            Some(old) => old,
        };

        if any_field_differs(&self.config.tracked_fields, new, old) {
            Some(ChangeType::Full)
        } else if any_field_differs(&self.config.soft_update_fields, new, old) {
            Some(ChangeType::Soft)
        } else {
            None
        }
    }

    fn record(
        &self,
        id: String,
        change_type: ChangeType,
        data: &Value,
        timestamp: DateTime<Utc>,
    ) -> ChangeRecord {
        ChangeRecord::new(id, timestamp, change_type, self.entity_type.clone(), data.clone())
    }
}

fn any_field_differs(fields: &[FieldPath], new: &Value, old: &Value) -> bool {
    fields
        .iter()
        .any(|field| !values_equal(field.get(new), field.get(old)))
}

/// Deep equality by canonical serialization.
///
/// An absent value is not equal to `null`. Object keys serialize sorted, so
/// key order never matters; array order does.
pub fn values_equal(a: Option<&Value>, b: Option<&Value>) -> bool {
    a.map(Value::to_string) == b.map(Value::to_string)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
