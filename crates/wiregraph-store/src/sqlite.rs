//! SQLite implementation of [`KeyValueStore`].
//!
//! [`SqliteStore`] keeps entries in a single `entries(key, value)` table with
//! automatic schema migrations. Single-key writes go straight to the table;
//! [`SqliteStore::replace_all`] swaps a whole saved graph in one transaction.

use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StoreError;
use crate::memory::MemoryStore;
use crate::traits::KeyValueStore;

/// SQLite-backed implementation of [`KeyValueStore`].
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) a SQLite database at `path`.
    pub fn new(path: &str) -> Result<Self, StoreError> {
        let conn = crate::schema::open_database(path)?;
        Ok(SqliteStore { conn })
    }

    /// Opens an in-memory SQLite database (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = crate::schema::open_in_memory()?;
        Ok(SqliteStore { conn })
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Replaces every entry with the contents of `snapshot`, atomically.
    pub fn replace_all(&mut self, snapshot: &MemoryStore) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM entries", [])?;
        {
            let mut stmt = tx.prepare("INSERT INTO entries (key, value) VALUES (?1, ?2)")?;
            for (key, value) in snapshot.iter() {
                stmt.execute(params![key, value])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Reads every entry into memory.
    pub fn snapshot(&self) -> Result<MemoryStore, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM entries ORDER BY key")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries.into_iter().collect())
    }
}

impl KeyValueStore for SqliteStore {
    fn find(&self, prefix: &str, key: &str) -> Result<Option<String>, StoreError> {
        let full = format!("{}{}", prefix, key);
        let value = self
            .conn
            .query_row(
                "SELECT value FROM entries WHERE key = ?1",
                params![full],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn keys_matching(&self, pattern: &Regex) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT key FROM entries ORDER BY key")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut keys = Vec::new();
        for key in rows {
            let key = key?;
            if pattern.is_match(&key) {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    fn add(&mut self, prefix: &str, key: &str, value: &str) -> Result<(), StoreError> {
        let full = format!("{}{}", prefix, key);
        self.conn.execute(
            "INSERT INTO entries (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![full, value],
        )?;
        Ok(())
    }
}
