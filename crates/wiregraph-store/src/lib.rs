//! Persistence for wiregraph containers.
//!
//! A container and everything inside it is written to a flat string
//! key/value store and rebuilt from it later, links included.
//!
//! # Architecture
//!
//! - **Backends** implement [`KeyValueStore`]: [`MemoryStore`] (an ordered
//!   map that serializes to JSON) and [`SqliteStore`] (one SQLite table with
//!   embedded migrations).
//! - **Serializer**: [`save`] writes a container tree, [`load`] rebuilds it
//!   in two passes (instantiate, then wire) through a [`NodeFactory`].
//!
//! # Modules
//!
//! - [`error`]: StoreError, LoadError and SaveError
//! - [`traits`]: the KeyValueStore trait
//! - [`keys`]: key names of the persisted layout
//! - [`record`]: grouping stored keys into per-object records
//! - [`factory`]: NodeFactory, the KindRegistry table and LayoutFactory
//! - [`state`]: saving and restoring a single node
//! - [`serializer`]: save, load and the wiring pass
//! - [`memory`]: MemoryStore implementation
//! - [`schema`]: SQLite migrations
//! - [`sqlite`]: SqliteStore implementation

pub mod error;
pub mod factory;
pub mod keys;
pub mod memory;
pub mod record;
pub mod schema;
pub mod serializer;
pub mod sqlite;
pub mod state;
pub mod traits;

// Re-export key types for ergonomic use.
pub use error::{LoadError, SaveError, StoreError};
pub use factory::{KindRegistry, LayoutFactory, NodeFactory};
pub use memory::MemoryStore;
pub use record::{parse_records, ObjectRecord};
pub use serializer::{
    load, save, wire_pending, LoadReport, PendingEdges, RefusedConnection, SkippedObject,
    UnresolvedInput,
};
pub use sqlite::SqliteStore;
pub use state::{load_node_state, save_node_state};
pub use traits::KeyValueStore;
