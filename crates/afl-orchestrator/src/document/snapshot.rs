//! The remote configuration snapshot document
//!
//! A JSON object mapping timestamp keys to configuration snapshots. Saving
//! only ever adds a key.

use serde_json::{Map, Value};

use afl_core::time::parse_snapshot_timestamp;
use afl_core::DocumentError;

/// Parsed snapshot document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteConfigDocument {
    entries: Map<String, Value>,
}

impl RemoteConfigDocument {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse document text. Blank text is an empty document.
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        if text.trim().is_empty() {
            return Ok(Self::new());
        }

        match serde_json::from_str::<Value>(text)? {
            Value::Object(entries) => Ok(Self { entries }),
            _ => Err(DocumentError::NotAnObject),
        }
    }

    /// Add a snapshot under `key`. An existing key is left alone and `false`
    /// is returned.
    pub fn insert_snapshot(&mut self, key: String, snapshot: Value) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, snapshot);
        true
    }

    /// The entry whose key is the most recent timestamp. Keys that are not
    /// timestamps are never considered.
    pub fn latest(&self) -> Option<(&str, &Value)> {
        self.entries
            .iter()
            .filter_map(|(key, value)| {
                parse_snapshot_timestamp(key).map(|instant| (instant, key.as_str(), value))
            })
            .max_by_key(|(instant, _, _)| *instant)
            .map(|(_, key, value)| (key, value))
    }

    /// Look up an entry by key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Serialize for writing back
    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the document has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
