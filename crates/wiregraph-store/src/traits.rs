//! The [`KeyValueStore`] trait: the flat string store a graph is persisted to.
//!
//! Keys are dotted paths such as `object2.input_connection0`. The serializer
//! only ever needs three things from a backend: look up one key, enumerate
//! the keys matching a pattern, and write one key. All backends
//! ([`MemoryStore`](crate::memory::MemoryStore),
//! [`SqliteStore`](crate::sqlite::SqliteStore)) implement this trait and are
//! interchangeable.

use regex::Regex;

use crate::error::StoreError;

/// A flat key → string store.
pub trait KeyValueStore {
    /// Looks up `prefix + key`.
    fn find(&self, prefix: &str, key: &str) -> Result<Option<String>, StoreError>;

    /// Every key matching `pattern`, in ascending key order.
    fn keys_matching(&self, pattern: &Regex) -> Result<Vec<String>, StoreError>;

    /// Writes `prefix + key`, replacing any existing value.
    fn add(&mut self, prefix: &str, key: &str, value: &str) -> Result<(), StoreError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &mut S {
    fn find(&self, prefix: &str, key: &str) -> Result<Option<String>, StoreError> {
        (**self).find(prefix, key)
    }

    fn keys_matching(&self, pattern: &Regex) -> Result<Vec<String>, StoreError> {
        (**self).keys_matching(pattern)
    }

    fn add(&mut self, prefix: &str, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).add(prefix, key, value)
    }
}
