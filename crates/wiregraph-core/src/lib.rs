pub mod config;
pub mod container;
pub mod error;
pub mod event;
pub mod graph;
pub mod id;
pub mod kind;
pub mod node;
pub mod registry;
pub mod topology;
pub mod walk;

#[cfg(test)]
mod proptests;

// Re-export commonly used types
pub use config::GraphConfig;
pub use error::CoreError;
pub use event::{ConnectionEvent, EventKind, GraphEvent, NodeListener};
pub use graph::{Graph, LinkOptions, Reciprocity};
pub use id::{ListenerId, NodeId};
pub use kind::{Attributes, ContainerKind, GenericKind, NodeKind, PortLayout, CONTAINER_TYPE};
pub use node::{Node, PortDirection, PortList, PropertyValue};
pub use topology::Topology;
