//! Core error types for wiregraph-core.
//!
//! Ordinary structural refusals (a capability check saying no, a fixed slot
//! out of range, removing a child that is not there) are reported through
//! `bool`/`Option` returns, not through [`CoreError`]. This enum covers the
//! remaining operations that can be asked to do something impossible.

use crate::id::NodeId;
use crate::node::PortDirection;
use thiserror::Error;

/// Errors produced by the wiregraph-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A node id was not found in the graph.
    #[error("node not found: NodeId({id})", id = id.0)]
    NodeNotFound { id: NodeId },

    /// A container operation was applied to a node that is not a container.
    #[error("node is not a container: NodeId({id})", id = id.0)]
    NotAContainer { id: NodeId },

    /// A resize was requested on a fixed port list while strict resizing is on.
    #[error("{direction} port list of NodeId({id}) is fixed", id = id.0)]
    FixedPortList { id: NodeId, direction: PortDirection },

    /// Renaming would give two live nodes the same identifier.
    #[error("identifier already in use: NodeId({id})", id = id.0)]
    DuplicateId { id: NodeId },

    /// The reserved invalid identifier cannot name a node.
    #[error("invalid identifier: {id}")]
    InvalidId { id: NodeId },

    /// The registry has no identifiers left to issue.
    #[error("node identifier space exhausted")]
    IdSpaceExhausted,
}
