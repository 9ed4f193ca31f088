//! In-memory implementation of [`KeyValueStore`].
//!
//! [`MemoryStore`] is an ordered map, so key enumeration is deterministic
//! and a saved graph prints the same way every time. It serializes as a
//! plain JSON object, which is how callers persist it without SQLite.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::traits::KeyValueStore;

/// Ordered in-memory key/value store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up a full key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Writes a full key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn to_json_pretty(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl FromIterator<(String, String)> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        MemoryStore {
            entries: iter.into_iter().collect(),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn find(&self, prefix: &str, key: &str) -> Result<Option<String>, StoreError> {
        let full = format!("{}{}", prefix, key);
        Ok(self.entries.get(&full).cloned())
    }

    fn keys_matching(&self, pattern: &Regex) -> Result<Vec<String>, StoreError> {
        Ok(self
            .entries
            .keys()
            .filter(|key| pattern.is_match(key))
            .cloned()
            .collect())
    }

    fn add(&mut self, prefix: &str, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .insert(format!("{}{}", prefix, key), value.to_string());
        Ok(())
    }
}
