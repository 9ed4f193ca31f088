//! Error types for wiregraph-store.
//!
//! [`StoreError`] covers the key/value backends themselves. [`LoadError`] and
//! [`SaveError`] cover the serializer on top of them. Problems the loader can
//! step over (an unknown type name, an input reference that resolves to
//! nothing) are not errors; they are recorded in the
//! [`LoadReport`](crate::serializer::LoadReport).

use thiserror::Error;
use wiregraph_core::{CoreError, NodeId};

/// Errors produced by a key/value backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A SQLite call failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Applying schema migrations failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// JSON serialization or deserialization of a whole store failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors that abort a load.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A pending entry names an object that is not in the container being
    /// loaded.
    #[error("unresolved object: NodeId({id})", id = id.0)]
    UnresolvedObject { id: NodeId },

    /// A reserved key holds a value of the wrong shape.
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    /// A `property.<name>` value is not a valid encoded property.
    #[error("invalid property {name}: {source}")]
    Property {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// The load target is not a container.
    #[error("load target is not a container: NodeId({id})", id = id.0)]
    NotAContainer { id: NodeId },

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Errors that abort a save.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("node not found: NodeId({id})", id = id.0)]
    NodeNotFound { id: NodeId },

    /// The save root is not a container.
    #[error("save root is not a container: NodeId({id})", id = id.0)]
    NotAContainer { id: NodeId },

    /// A property value could not be encoded.
    #[error("cannot encode property {name}: {source}")]
    Property {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}
