//! Filter value types
//!
//! Filters arrive as loosely typed query parameters or JSON. They are
//! validated into a closed set of value kinds before anything hashes them.

use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single filter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Boolean flag (e.g., `archived=true`)
    Bool(bool),
    /// Exact integer, kept out of `f64` so large ids do not round
    Integer(i64),
    /// Finite number; integral values compare equal regardless of formatting
    Number(f64),
    /// Free text, compared verbatim
    Text(String),
}

impl FilterValue {
    /// Create a number value, rejecting NaN and infinities.
    /// Integral values that `f64` holds exactly become [`FilterValue::Integer`].
    pub fn number(value: f64) -> Result<Self> {
        if value.is_finite() {
            Ok(integral(value).map_or(Self::Number(value), Self::Integer))
        } else {
            Err(Error::invalid_filter(
                "number",
                format!("{value} is not finite"),
            ))
        }
    }

    /// Build from a JSON scalar. `null` yields `None`.
    pub fn from_json(name: &str, value: &JsonValue) -> Result<Option<Self>> {
        match value {
            JsonValue::Null => Ok(None),
            JsonValue::Bool(b) => Ok(Some(Self::Bool(*b))),
            JsonValue::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Ok(Some(Self::Integer(i))),
                (None, Some(f)) => Self::number(f).map(Some),
                (None, None) => Err(Error::invalid_filter(
                    name,
                    format!("unrepresentable number {n}"),
                )),
            },
            JsonValue::String(s) => Ok(Some(Self::Text(s.clone()))),
            JsonValue::Array(_) | JsonValue::Object(_) => Err(Error::invalid_filter(
                name,
                "only strings, numbers and booleans are allowed",
            )),
        }
    }

    /// Convert to a JSON value (integral numbers become JSON integers)
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Integer(i) => JsonValue::from(*i),
            Self::Number(n) => match integral(*n) {
                Some(i) => JsonValue::from(i),
                None => serde_json::Number::from_f64(*n).map_or(JsonValue::Null, JsonValue::Number),
            },
            Self::Text(s) => JsonValue::String(s.clone()),
        }
    }

    /// Canonical text form used for hashing.
    ///
    /// Strings are JSON-quoted so `"true"` and `true` never collide.
    pub fn canonical(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Number(n) => match integral(*n) {
                Some(i) => i.to_string(),
                None => n.to_string(),
            },
            Self::Text(s) => JsonValue::String(s.clone()).to_string(),
        }
    }

    /// Whether a row attribute equals this filter value
    pub fn matches(&self, value: &JsonValue) -> bool {
        match (self, value) {
            (Self::Bool(expected), JsonValue::Bool(actual)) => expected == actual,
            (Self::Integer(expected), JsonValue::Number(actual)) => match actual.as_i64() {
                Some(a) => a == *expected,
                None => actual.as_f64().is_some_and(|a| a == *expected as f64),
            },
            (Self::Number(expected), JsonValue::Number(actual)) => {
                actual.as_f64().is_some_and(|a| a == *expected)
            }
            (Self::Text(expected), JsonValue::String(actual)) => expected == actual,
            _ => false,
        }
    }
}

/// Integral value of `n` if it has no fractional part and fits exactly in i64.
/// Maps `-0.0` to `0`.
fn integral(n: f64) -> Option<i64> {
    const EXACT: f64 = 9_007_199_254_740_992.0; // 2^53
    if n.fract() == 0.0 && n.abs() <= EXACT {
        Some(n as i64)
    } else {
        None
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            other => f.write_str(&other.canonical()),
        }
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Declared kind of a filter parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// Text compared verbatim
    #[default]
    String,
    /// Finite number
    Number,
    /// `true`/`false` (also `1`/`0`)
    Boolean,
}

impl FilterKind {
    /// Parse a raw query-string value into this kind.
    ///
    /// Empty input is treated as an absent filter.
    pub fn parse(self, name: &str, raw: &str) -> Result<Option<FilterValue>> {
        if raw.is_empty() {
            return Ok(None);
        }
        match self {
            Self::String => Ok(Some(FilterValue::Text(raw.to_string()))),
            Self::Number => {
                let raw = raw.trim();
                if let Ok(i) = raw.parse::<i64>() {
                    return Ok(Some(FilterValue::Integer(i)));
                }
                let n: f64 = raw
                    .parse()
                    .map_err(|_| Error::invalid_filter(name, format!("'{raw}' is not a number")))?;
                if !n.is_finite() {
                    return Err(Error::invalid_filter(name, "number must be finite"));
                }
                FilterValue::number(n).map(Some)
            }
            Self::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(Some(FilterValue::Bool(true))),
                "false" | "0" => Ok(Some(FilterValue::Bool(false))),
                _ => Err(Error::invalid_filter(
                    name,
                    format!("'{raw}' is not a boolean"),
                )),
            },
        }
    }
}

/// An order-independent set of filters with absent entries already dropped
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSet {
    entries: BTreeMap<String, FilterValue>,
}

impl FilterSet {
    /// Create an empty filter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter, builder style
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a filter
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FilterValue>) {
        self.entries.insert(name.into(), value.into());
    }

    /// Insert a possibly absent filter. `None` removes any existing entry.
    pub fn insert_optional(&mut self, name: impl Into<String>, value: Option<FilterValue>) {
        let name = name.into();
        match value {
            Some(value) => {
                self.entries.insert(name, value);
            }
            None => {
                self.entries.remove(&name);
            }
        }
    }

    /// Build from a JSON object, dropping `null` members
    pub fn from_json(object: &JsonObject) -> Result<Self> {
        let mut set = Self::new();
        for (name, value) in object {
            set.insert_optional(name.clone(), FilterValue::from_json(name, value)?);
        }
        Ok(set)
    }

    /// Parse a JSON document that must be an object
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: JsonValue = serde_json::from_str(json)?;
        match value {
            JsonValue::Object(object) => Self::from_json(&object),
            JsonValue::Null => Ok(Self::new()),
            _ => Err(Error::invalid_filter("<root>", "filters must be a JSON object")),
        }
    }

    /// Get a filter by name
    pub fn get(&self, name: &str) -> Option<&FilterValue> {
        self.entries.get(name)
    }

    /// Iterate filters in lexicographic key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of filters
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no filters are set
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a JSON row satisfies every filter (missing attributes never match)
    pub fn matches(&self, row: &JsonValue) -> bool {
        self.iter().all(|(name, expected)| {
            row.get(name)
                .is_some_and(|actual| expected.matches(actual))
        })
    }
}

impl<K: Into<String>> FromIterator<(K, Option<FilterValue>)> for FilterSet {
    fn from_iter<I: IntoIterator<Item = (K, Option<FilterValue>)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (name, value) in iter {
            set.insert_optional(name, value);
        }
        set
    }
}
