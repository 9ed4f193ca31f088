//! Export of a container's wiring as a petgraph graph.
//!
//! The arena is the source of truth; this is a read-only snapshot for
//! analysis. Node weights are type names and edge weights are the input
//! slot on the receiving node, so two snapshots compare equal under
//! [`petgraph::algo::is_isomorphic_matching`] exactly when they have the
//! same kinds wired the same way, whatever the identifiers.

use std::collections::HashMap;

use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::graph::Graph;
use crate::id::NodeId;

/// Snapshot of the connections among a container's descendants.
#[derive(Debug, Clone)]
pub struct Topology {
    pub graph: DiGraph<String, usize>,
    pub index: HashMap<NodeId, NodeIndex>,
}

impl Topology {
    pub fn node_index(&self, id: NodeId) -> Option<NodeIndex> {
        self.index.get(&id).copied()
    }
}

impl Graph {
    /// Builds the wiring snapshot of every descendant of `container`.
    ///
    /// Only connections between descendants are included; links leaving
    /// the container are dropped.
    pub fn topology(&self, container: NodeId) -> Topology {
        let members = self.find_all_of_type(container, |_| true, true);
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();
        for id in &members {
            if let Some(node) = self.node(*id) {
                index.insert(*id, graph.add_node(node.type_name().to_string()));
            }
        }
        for id in &members {
            let Some(node) = self.node(*id) else {
                continue;
            };
            let Some(&to) = index.get(id) else {
                continue;
            };
            for (slot, input) in node.inputs().slots().iter().enumerate() {
                if let Some(&from) = input.and_then(|input| index.get(&input)) {
                    graph.add_edge(from, to, slot);
                }
            }
        }
        Topology { graph, index }
    }

    /// Does the wiring among `container`'s descendants contain a cycle?
    ///
    /// Cycles are legal; this is advisory.
    pub fn has_cycle(&self, container: NodeId) -> bool {
        is_cyclic_directed(&self.topology(container).graph)
    }
}
