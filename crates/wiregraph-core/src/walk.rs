//! Searches that follow connections rather than containment.
//!
//! These walk from a node through its input or output slots. Containers met
//! along the way can be searched too, through the container search in
//! [`crate::container`]. Every walk carries a visited set, so cyclic wiring
//! terminates.

use std::collections::HashSet;

use indexmap::IndexSet;

use crate::graph::Graph;
use crate::id::NodeId;
use crate::node::{Node, PortDirection};

impl Graph {
    /// `id` if it is one of `node`'s direct inputs or outputs.
    pub fn find_connected(&self, node: NodeId, id: NodeId) -> Option<NodeId> {
        let node = self.nodes.get(&node)?;
        (node.inputs().contains(id) || node.outputs().contains(id)).then_some(id)
    }

    /// First node matching `predicate` along `direction`.
    ///
    /// Direct neighbours are checked first, then each neighbour is walked in
    /// slot order. With `recurse`, `node` itself and each neighbour that is a
    /// container are also searched inside before that neighbour is walked.
    pub fn find_object_of_type(
        &self,
        node: NodeId,
        direction: PortDirection,
        predicate: impl Fn(&Node) -> bool,
        recurse: bool,
    ) -> Option<NodeId> {
        let mut visited = HashSet::new();
        if recurse && self.is_container(node) {
            if let Some(found) = self.find_first_of_type(node, &predicate, true) {
                return Some(found);
            }
        }
        self.find_along(node, direction, &predicate, recurse, &mut visited)
    }

    fn find_along(
        &self,
        node: NodeId,
        direction: PortDirection,
        predicate: &dyn Fn(&Node) -> bool,
        recurse: bool,
        visited: &mut HashSet<NodeId>,
    ) -> Option<NodeId> {
        if !visited.insert(node) {
            return None;
        }
        let neighbours: Vec<NodeId> = self.nodes.get(&node)?.ports(direction).connected().collect();
        if let Some(found) = neighbours
            .iter()
            .copied()
            .find(|id| self.nodes.get(id).is_some_and(predicate))
        {
            return Some(found);
        }
        for neighbour in neighbours {
            if recurse && self.is_container(neighbour) {
                if let Some(found) = self.find_first_of_type(neighbour, predicate, true) {
                    return Some(found);
                }
            }
            if let Some(found) = self.find_along(neighbour, direction, predicate, recurse, visited) {
                return Some(found);
            }
        }
        None
    }

    /// Walks up a chain of single-input nodes looking for a match.
    ///
    /// `node` itself is checked first, then (for a container) its direct
    /// children from last to first. The walk continues into the input only
    /// while the current node has exactly one fixed input slot.
    pub fn find_input_of_type(
        &self,
        node: NodeId,
        predicate: impl Fn(&Node) -> bool,
    ) -> Option<NodeId> {
        let mut visited = HashSet::new();
        self.find_up_chain(node, &predicate, &mut visited)
    }

    fn find_up_chain(
        &self,
        node: NodeId,
        predicate: &dyn Fn(&Node) -> bool,
        visited: &mut HashSet<NodeId>,
    ) -> Option<NodeId> {
        if !visited.insert(node) {
            return None;
        }
        let current = self.nodes.get(&node)?;
        if predicate(current) {
            return Some(node);
        }
        let children: Vec<NodeId> = current.children().collect();
        if let Some(found) = children
            .into_iter()
            .rev()
            .find(|child| self.nodes.get(child).is_some_and(predicate))
        {
            return Some(found);
        }
        let inputs = current.inputs();
        if inputs.is_fixed() && inputs.len() == 1 {
            return self.find_up_chain(inputs.get(0)?, predicate, visited);
        }
        None
    }

    pub fn find_input_of_type_name(&self, node: NodeId, type_name: &str) -> Option<NodeId> {
        self.find_input_of_type(node, |n| n.type_name() == type_name)
    }

    /// Every node matching `predicate` among `node`'s inputs.
    ///
    /// Containers among the inputs are always searched inside. With
    /// `propagate` the walk continues through each input's own inputs; with
    /// `recurse_children` a container's own children are searched when the
    /// walk reaches it. Each match is listed once, in discovery order.
    pub fn find_all_inputs_of_type(
        &self,
        node: NodeId,
        predicate: impl Fn(&Node) -> bool,
        propagate: bool,
        recurse_children: bool,
    ) -> Vec<NodeId> {
        self.find_all_along(node, PortDirection::Input, &predicate, propagate, recurse_children)
    }

    /// Output counterpart of [`Graph::find_all_inputs_of_type`].
    pub fn find_all_outputs_of_type(
        &self,
        node: NodeId,
        predicate: impl Fn(&Node) -> bool,
        propagate: bool,
        recurse_children: bool,
    ) -> Vec<NodeId> {
        self.find_all_along(node, PortDirection::Output, &predicate, propagate, recurse_children)
    }

    fn find_all_along(
        &self,
        node: NodeId,
        direction: PortDirection,
        predicate: &dyn Fn(&Node) -> bool,
        propagate: bool,
        recurse_children: bool,
    ) -> Vec<NodeId> {
        let mut visited = HashSet::new();
        let mut found = IndexSet::new();
        let mut pending = vec![node];
        // Depth-first in slot order: neighbours are pushed in reverse.
        while let Some(current) = pending.pop() {
            if !visited.insert(current) {
                continue;
            }
            if recurse_children && self.is_container(current) {
                found.extend(self.find_all_of_type(current, predicate, true));
            }
            let Some(holder) = self.nodes.get(&current) else {
                continue;
            };
            let neighbours: Vec<NodeId> = holder.ports(direction).connected().collect();
            for neighbour in &neighbours {
                if self.nodes.get(neighbour).is_some_and(predicate) {
                    found.insert(*neighbour);
                }
                if self.is_container(*neighbour) {
                    found.extend(self.find_all_of_type(*neighbour, predicate, true));
                }
            }
            if propagate {
                pending.extend(neighbours.into_iter().rev());
            }
        }
        found.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::Graph;
    use crate::id::NodeId;
    use crate::kind::{ContainerKind, GenericKind, PortLayout};
    use crate::node::{Node, PortDirection};

    fn node(graph: &mut Graph, name: &str, layout: PortLayout) -> NodeId {
        graph.add_node(GenericKind::new(name, layout))
    }

    /// reader → blur → sharpen → writer, all single fixed inputs after the reader.
    fn chain(graph: &mut Graph) -> [NodeId; 4] {
        let reader = node(graph, "Reader", PortLayout::dynamic());
        let blur = node(graph, "Blur", PortLayout::fixed_inputs(1));
        let sharpen = node(graph, "Sharpen", PortLayout::fixed_inputs(1));
        let writer = node(graph, "Writer", PortLayout::fixed_inputs(1));
        assert!(graph.connect_input_at(blur, 0, Some(reader)));
        assert!(graph.connect_input_at(sharpen, 0, Some(blur)));
        assert!(graph.connect_input_at(writer, 0, Some(sharpen)));
        [reader, blur, sharpen, writer]
    }

    #[test]
    fn find_connected_is_one_hop() {
        let mut graph = Graph::new();
        let [reader, blur, sharpen, _] = chain(&mut graph);
        assert_eq!(graph.find_connected(blur, reader), Some(reader));
        assert_eq!(graph.find_connected(blur, sharpen), Some(sharpen));
        assert_eq!(graph.find_connected(sharpen, reader), None);
    }

    #[test]
    fn find_object_of_type_walks_the_chain() {
        let mut graph = Graph::new();
        let [reader, blur, _, writer] = chain(&mut graph);
        let is = |name: &'static str| move |n: &Node| n.type_name() == name;

        assert_eq!(
            graph.find_object_of_type(writer, PortDirection::Input, is("Reader"), false),
            Some(reader)
        );
        assert_eq!(
            graph.find_object_of_type(reader, PortDirection::Output, is("Writer"), false),
            Some(writer)
        );
        assert_eq!(
            graph.find_object_of_type(blur, PortDirection::Output, is("Reader"), false),
            None
        );
    }

    #[test]
    fn find_object_of_type_looks_inside_containers_when_recursing() {
        let mut graph = Graph::new();
        let group = graph.add_node(ContainerKind);
        let inner = node(&mut graph, "Histogram", PortLayout::dynamic());
        graph.add_child(group, inner);
        let writer = node(&mut graph, "Writer", PortLayout::fixed_inputs(1));
        assert!(graph.connect_input_at(writer, 0, Some(group)));

        let histogram = |n: &Node| n.type_name() == "Histogram";
        assert_eq!(
            graph.find_object_of_type(writer, PortDirection::Input, histogram, false),
            None
        );
        assert_eq!(
            graph.find_object_of_type(writer, PortDirection::Input, histogram, true),
            Some(inner)
        );
    }

    #[test]
    fn find_input_of_type_stops_at_multi_input_nodes() {
        let mut graph = Graph::new();
        let [reader, _, sharpen, writer] = chain(&mut graph);
        assert_eq!(graph.find_input_of_type_name(writer, "Reader"), Some(reader));
        assert_eq!(graph.find_input_of_type_name(writer, "Writer"), Some(writer));

        let mix = node(&mut graph, "Mix", PortLayout::fixed_inputs(2));
        assert!(graph.connect_input_at(mix, 0, Some(sharpen)));
        assert_eq!(graph.find_input_of_type_name(mix, "Reader"), None);
    }

    #[test]
    fn find_all_inputs_follows_every_branch_once() {
        let mut graph = Graph::new();
        let a = node(&mut graph, "Reader", PortLayout::dynamic());
        let b = node(&mut graph, "Reader", PortLayout::dynamic());
        let mix = node(&mut graph, "Mix", PortLayout::dynamic());
        let out = node(&mut graph, "Writer", PortLayout::dynamic());
        graph.connect_input(mix, a);
        graph.connect_input(mix, b);
        graph.connect_input(out, mix);
        // Cycle back into the mix.
        graph.connect_input(a, out);

        let readers = |n: &Node| n.type_name() == "Reader";
        assert!(graph.find_all_inputs_of_type(out, readers, false, false).is_empty());
        assert_eq!(graph.find_all_inputs_of_type(out, readers, true, false), vec![a, b]);
        assert_eq!(
            graph.find_all_outputs_of_type(a, |n| n.type_name() == "Writer", true, false),
            vec![out]
        );
    }

    #[test]
    fn find_all_inputs_searches_containers() {
        let mut graph = Graph::new();
        let group = graph.add_node(ContainerKind);
        let inside = node(&mut graph, "Reader", PortLayout::dynamic());
        graph.add_child(group, inside);
        let out = node(&mut graph, "Writer", PortLayout::dynamic());
        graph.connect_input(out, group);

        let readers = |n: &Node| n.type_name() == "Reader";
        assert_eq!(graph.find_all_inputs_of_type(out, readers, false, false), vec![inside]);
        assert_eq!(graph.find_all_inputs_of_type(group, readers, false, true), vec![inside]);
        assert!(graph.find_all_inputs_of_type(group, readers, false, false).is_empty());
    }
}
