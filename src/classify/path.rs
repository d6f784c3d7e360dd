//! Validated dotted field paths.

use crate::error::{HistoryError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

static PATH_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_.]+$").expect("field path pattern is valid"));

/// A dotted path such as `owner.login` or `topics.0`, checked once on parse.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldPath {
    raw: String,
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse and validate a path.
    ///
    /// Rejects empty paths, empty segments (leading, trailing or doubled
    /// dots) and anything outside `[a-zA-Z0-9_.]`.
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| HistoryError::InvalidFieldPath {
            path: raw.to_string(),
            reason: reason.to_string(),
        };

        if raw.is_empty() {
            return Err(invalid("path is empty"));
        }
        if !PATH_PATTERN.is_match(raw) {
            return Err(invalid("only letters, digits, '_' and '.' are allowed"));
        }

        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(invalid("path contains an empty segment"));
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Locate the value at this path.
    ///
    /// Objects are walked by key, arrays by numeric index. Returns `None`
    /// as soon as a segment cannot be followed.
    pub fn get<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(value, |current, segment| match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })
    }
}

impl FromStr for FieldPath {
    type Err = HistoryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
