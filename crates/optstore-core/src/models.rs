//! Data models for optstore
//!
//! Defines the persisted option row, the tagged value held in memory, and the
//! key rules shared by the adapter and the `Options` façade.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::storage::{StorageError, StorageResult};

/// Raw key → value mapping as it comes out of storage
pub type Snapshot = BTreeMap<String, String>;

/// A single persisted option
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OptionRecord {
    /// Unique, dot-segmented key
    pub key: String,
    /// Stored text
    pub value: String,
    /// Whether the option belongs to the auto-load set
    pub auto_load: bool,
    /// Owning extension, if any
    pub extension: Option<String>,
}

/// An option value held in memory before type resolution
///
/// `Text` is what storage hands back. `Typed` is what a caller handed in
/// already structured, so it never has to round-trip through a string to be
/// memoized.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    Text(String),
    Typed(Value),
}

impl StoredValue {
    /// Check if the value is encoded as JSON on write
    pub fn is_composite(&self) -> bool {
        matches!(self, StoredValue::Typed(Value::Array(_) | Value::Object(_)))
    }

    /// Encode the value into the text form stored in the `value` column
    pub fn to_storage_text(&self) -> StorageResult<String> {
        let text = match self {
            StoredValue::Text(text) => text.clone(),
            StoredValue::Typed(Value::String(text)) => text.clone(),
            StoredValue::Typed(Value::Null) => String::new(),
            StoredValue::Typed(Value::Bool(flag)) => flag.to_string(),
            StoredValue::Typed(Value::Number(number)) => number.to_string(),
            StoredValue::Typed(composite) => serde_json::to_string(composite)?,
        };
        Ok(text)
    }
}

impl From<&str> for StoredValue {
    fn from(value: &str) -> Self {
        StoredValue::Text(value.to_string())
    }
}

impl From<String> for StoredValue {
    fn from(value: String) -> Self {
        StoredValue::Text(value)
    }
}

impl From<Value> for StoredValue {
    fn from(value: Value) -> Self {
        StoredValue::Typed(value)
    }
}

impl From<bool> for StoredValue {
    fn from(value: bool) -> Self {
        StoredValue::Typed(Value::Bool(value))
    }
}

impl From<i64> for StoredValue {
    fn from(value: i64) -> Self {
        StoredValue::Typed(Value::from(value))
    }
}

impl From<f64> for StoredValue {
    fn from(value: f64) -> Self {
        StoredValue::Typed(Value::from(value))
    }
}

impl<T: Into<Value>> From<Vec<T>> for StoredValue {
    fn from(value: Vec<T>) -> Self {
        StoredValue::Typed(Value::from(value))
    }
}

/// Normalize an option key
///
/// Trims surrounding whitespace and maps `_` to `.`, so `site_name` and
/// `site.name` address the same option. Blank keys are rejected.
pub fn normalize_key(key: &str) -> StorageResult<String> {
    let key = key.trim();
    if key.is_empty() {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(key.replace('_', "."))
}

/// Expand dot-segmented keys into a nested object
///
/// `{"a.b.c": v}` becomes `{"a": {"b": {"c": v}}}`. When a key is both a leaf
/// and a parent (`a` and `a.b`), the later key in sort order wins, which
/// means the nested object replaces the scalar.
pub fn expand_keys(flat: &Snapshot) -> Value {
    let mut root = Map::new();

    for (key, value) in flat {
        let mut segments: Vec<&str> = key.split('.').collect();
        let leaf = segments.pop().unwrap_or_default();

        let mut node = &mut root;
        for segment in segments {
            let child = node
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            node = match child {
                Value::Object(map) => map,
                _ => unreachable!("child was just made an object"),
            };
        }
        node.insert(leaf.to_string(), Value::String(value.clone()));
    }

    Value::Object(root)
}
