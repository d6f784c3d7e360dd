//! Change log query filters.

use crate::types::{ChangeRecord, ChangeType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Filters applied by `ChangeLogStore::query`.
///
/// Unset fields do not filter. Timestamp bounds are inclusive. `limit`
/// truncates after filtering, keeping log order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChangeQuery {
    pub entity_type: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    /// Allowed change types. An empty list allows nothing.
    pub types: Option<Vec<ChangeType>>,
    pub limit: Option<usize>,
}

impl ChangeQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn types(mut self, types: impl IntoIterator<Item = ChangeType>) -> Self {
        self.types = Some(types.into_iter().collect());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, record: &ChangeRecord) -> bool {
        if let Some(ref entity_type) = self.entity_type {
            if &record.entity_type != entity_type {
                return false;
            }
        }
        if let Some(since) = self.since {
            if record.timestamp < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if record.timestamp > until {
                return false;
            }
        }
        if let Some(ref types) = self.types {
            if !types.contains(&record.change_type) {
                return false;
            }
        }
        true
    }

    /// Filter then truncate.
    pub fn apply(&self, records: Vec<ChangeRecord>) -> Vec<ChangeRecord> {
        let matching = records.into_iter().filter(|r| self.matches(r));
        match self.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        }
    }
}
