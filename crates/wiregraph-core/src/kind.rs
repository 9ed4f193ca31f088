//! Node kinds: the per-type behavior plugged into a [`Node`].
//!
//! The graph machinery is the same for every node. What varies by type is
//! the initial port layout, whether the node may accept a given peer in a
//! given slot, and any extra state the type persists. [`NodeKind`] carries
//! exactly those hooks.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::node::Node;

/// Flat string attributes a kind reads and writes when persisted.
pub type Attributes = BTreeMap<String, String>;

/// Type name of the built-in container kind.
pub const CONTAINER_TYPE: &str = "Container";

/// Initial shape of a node's port lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortLayout {
    pub inputs: usize,
    pub fixed_inputs: bool,
    pub outputs: usize,
    pub fixed_outputs: bool,
}

impl PortLayout {
    /// Both lists dynamic and initially empty.
    pub const fn dynamic() -> Self {
        PortLayout {
            inputs: 0,
            fixed_inputs: false,
            outputs: 0,
            fixed_outputs: false,
        }
    }

    /// Both lists fixed with the given slot counts.
    pub const fn fixed(inputs: usize, outputs: usize) -> Self {
        PortLayout {
            inputs,
            fixed_inputs: true,
            outputs,
            fixed_outputs: true,
        }
    }

    /// Fixed inputs, dynamic outputs: the usual shape of a processing stage.
    pub const fn fixed_inputs(inputs: usize) -> Self {
        PortLayout {
            inputs,
            fixed_inputs: true,
            outputs: 0,
            fixed_outputs: false,
        }
    }
}

impl Default for PortLayout {
    fn default() -> Self {
        PortLayout::dynamic()
    }
}

/// Per-type behavior of a node.
///
/// Capability checks are consulted before any mutation. They see the node
/// being connected, the slot index in question, and the candidate peer, all
/// as they stand before the connect.
pub trait NodeKind: fmt::Debug + Send {
    /// Name written to persisted state and used by the loader to rebuild
    /// the node through a factory.
    fn type_name(&self) -> &str;

    fn port_layout(&self) -> PortLayout {
        PortLayout::dynamic()
    }

    /// Containers get a child set and recursive save/load.
    fn is_container(&self) -> bool {
        false
    }

    /// May `candidate` occupy input slot `index` of `node`?
    fn can_connect_input(&self, node: &Node, index: usize, candidate: &Node) -> bool {
        let _ = (node, index, candidate);
        true
    }

    /// May `candidate` occupy output slot `index` of `node`?
    fn can_connect_output(&self, node: &Node, index: usize, candidate: &Node) -> bool {
        let _ = (node, index, candidate);
        true
    }

    /// Writes kind-specific state. Keys must not collide with the reserved
    /// node keys (`type`, `id`, `description`, port counts and links).
    fn save_state(&self, attributes: &mut Attributes) {
        let _ = attributes;
    }

    /// Reads back what [`save_state`](NodeKind::save_state) wrote. Missing
    /// keys keep their current value.
    fn load_state(&mut self, attributes: &Attributes) {
        let _ = attributes;
    }
}

/// The built-in container kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContainerKind;

impl NodeKind for ContainerKind {
    fn type_name(&self) -> &str {
        CONTAINER_TYPE
    }

    fn is_container(&self) -> bool {
        true
    }
}

/// A kind defined only by its type name and port layout.
///
/// Capability checks accept any peer, but a fixed input slot only accepts a
/// peer that can offer an output: a peer whose output list is fixed at zero
/// slots is refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericKind {
    type_name: String,
    layout: PortLayout,
}

impl GenericKind {
    pub fn new(type_name: impl Into<String>, layout: PortLayout) -> Self {
        GenericKind {
            type_name: type_name.into(),
            layout,
        }
    }

    pub fn layout(&self) -> PortLayout {
        self.layout
    }
}

impl NodeKind for GenericKind {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn port_layout(&self) -> PortLayout {
        self.layout
    }

    fn can_connect_input(&self, _node: &Node, _index: usize, candidate: &Node) -> bool {
        let outputs = candidate.outputs();
        !(outputs.is_fixed() && outputs.is_empty())
    }

    fn can_connect_output(&self, _node: &Node, _index: usize, candidate: &Node) -> bool {
        let inputs = candidate.inputs();
        !(inputs.is_fixed() && inputs.is_empty())
    }
}
