//! The SQLite layout of a stored graph.
//!
//! A stored graph is one table, `entries(key TEXT PRIMARY KEY, value TEXT)`,
//! holding exactly the flat keys a [`MemoryStore`](crate::MemoryStore) would.
//! Nothing about objects or links is modelled in SQL: grouping keys into
//! records happens in [`crate::record`]. The table is created by the
//! embedded migrations below; `user_version` records how far they ran.

use rusqlite::Connection;
use rusqlite_migration::{Migrations, M};

use crate::error::StoreError;

/// Migration list. Version 1 creates `entries`.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(include_str!(
        "migrations/001_initial_schema.sql"
    ))])
}

/// Opens (or creates) the database at `path`, bringing `entries` up to date.
pub fn open_database(path: &str) -> Result<Connection, StoreError> {
    let mut conn = Connection::open(path)?;
    prepare(&mut conn)?;
    Ok(conn)
}

/// A private in-memory database with `entries` created.
pub fn open_in_memory() -> Result<Connection, StoreError> {
    let mut conn = Connection::open_in_memory()?;
    prepare(&mut conn)?;
    Ok(conn)
}

/// The `user_version` of `conn`: the number of migrations applied.
pub fn schema_version(conn: &Connection) -> Result<i64, StoreError> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

fn prepare(conn: &mut Connection) -> Result<(), StoreError> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    migrations()
        .to_latest(conn)
        .map_err(|e| StoreError::Migration(e.to_string()))
}
