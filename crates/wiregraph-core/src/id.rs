//! Stable ID newtypes for graph entities.
//!
//! [`NodeId`] names a node independently of where it sits in any container.
//! [`ListenerId`] is the handle returned when a listener subscribes to a node,
//! used later to unsubscribe it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Process-unique node identifier.
///
/// Values are issued by [`crate::registry`]. The reserved value
/// [`NodeId::INVALID`] never names a live node and is what the persisted
/// layout writes for an empty port slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub i64);

impl NodeId {
    /// Sentinel meaning "no node". Persisted as `-1`.
    pub const INVALID: NodeId = NodeId(-1);

    /// Returns `true` unless this is the [`NodeId::INVALID`] sentinel.
    ///
    /// Other negative values are valid identifiers; the registry just never
    /// issues them.
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

/// Handle for a listener subscription on a single node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(NodeId)
    }
}
