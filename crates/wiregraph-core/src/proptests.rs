//! Property tests for the connection and ownership invariants.

use proptest::prelude::*;

use crate::graph::Graph;
use crate::id::NodeId;
use crate::kind::{ContainerKind, GenericKind, PortLayout};

#[derive(Debug, Clone)]
enum PortOp {
    ConnectAt { node: usize, index: usize, other: usize },
    Connect { node: usize, other: usize },
    ClearSlot { node: usize, index: usize },
    DisconnectInput { node: usize, index: usize },
    DisconnectOutput { node: usize, index: usize },
    DisconnectAll { node: usize },
    DisconnectFrom { node: usize, other: usize },
    Resize { node: usize, count: usize },
    Destroy { node: usize },
}

fn port_op() -> impl Strategy<Value = PortOp> {
    let node = 0usize..6;
    let index = 0usize..4;
    prop_oneof![
        (node.clone(), index.clone(), node.clone())
            .prop_map(|(node, index, other)| PortOp::ConnectAt { node, index, other }),
        (node.clone(), node.clone()).prop_map(|(node, other)| PortOp::Connect { node, other }),
        (node.clone(), index.clone()).prop_map(|(node, index)| PortOp::ClearSlot { node, index }),
        (node.clone(), index.clone())
            .prop_map(|(node, index)| PortOp::DisconnectInput { node, index }),
        (node.clone(), index.clone())
            .prop_map(|(node, index)| PortOp::DisconnectOutput { node, index }),
        node.clone().prop_map(|node| PortOp::DisconnectAll { node }),
        (node.clone(), node.clone())
            .prop_map(|(node, other)| PortOp::DisconnectFrom { node, other }),
        (node.clone(), index).prop_map(|(node, count)| PortOp::Resize { node, count }),
        node.prop_map(|node| PortOp::Destroy { node }),
    ]
}

fn mixed_nodes(graph: &mut Graph) -> Vec<NodeId> {
    vec![
        graph.add_node(GenericKind::new("Reader", PortLayout::fixed(0, 1))),
        graph.add_node(GenericKind::new("Filter", PortLayout::fixed_inputs(1))),
        graph.add_node(GenericKind::new("Blend", PortLayout::fixed_inputs(2))),
        graph.add_node(GenericKind::new("Mosaic", PortLayout::dynamic())),
        graph.add_node(GenericKind::new("Writer", PortLayout::fixed(1, 0))),
        graph.add_node(ContainerKind),
    ]
}

fn symmetry_holds(graph: &Graph) -> Result<(), String> {
    for id in graph.node_ids() {
        let node = graph.node(id).ok_or("missing node")?;
        for input in node.inputs().connected() {
            let peer = graph
                .node(input)
                .ok_or_else(|| format!("{} has dangling input {}", id, input))?;
            if !peer.outputs().contains(id) {
                return Err(format!("{} reads {} but {} does not feed it", id, input, input));
            }
        }
        for output in node.outputs().connected() {
            let peer = graph
                .node(output)
                .ok_or_else(|| format!("{} has dangling output {}", id, output))?;
            if !peer.inputs().contains(id) {
                return Err(format!("{} feeds {} but {} does not read it", id, output, output));
            }
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
enum OwnershipOp {
    Add { container: usize, node: usize },
    Remove { container: usize, node: usize },
    Destroy { node: usize },
    DeleteAll { container: usize },
}

fn ownership_op() -> impl Strategy<Value = OwnershipOp> {
    let container = 0usize..3;
    let node = 0usize..8;
    prop_oneof![
        (container.clone(), node.clone())
            .prop_map(|(container, node)| OwnershipOp::Add { container, node }),
        (container.clone(), node.clone())
            .prop_map(|(container, node)| OwnershipOp::Remove { container, node }),
        node.prop_map(|node| OwnershipOp::Destroy { node }),
        container.prop_map(|container| OwnershipOp::DeleteAll { container }),
    ]
}

fn ownership_holds(graph: &Graph) -> Result<(), String> {
    for id in graph.node_ids() {
        for child in graph.children(id) {
            if graph.owner(child) != Some(id) {
                return Err(format!("{} lists {} but it is owned by {:?}", id, child, graph.owner(child)));
            }
        }
        if let Some(owner) = graph.owner(id) {
            if graph.find_object(owner, id, false).is_none() {
                return Err(format!("{} claims owner {} which does not list it", id, owner));
            }
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn connections_stay_symmetric(ops in prop::collection::vec(port_op(), 1..60)) {
        let mut graph = Graph::new();
        let nodes = mixed_nodes(&mut graph);

        for op in ops {
            match op {
                PortOp::ConnectAt { node, index, other } => {
                    graph.connect_input_at(nodes[node], index, Some(nodes[other]));
                }
                PortOp::Connect { node, other } => {
                    graph.connect_input(nodes[node], nodes[other]);
                }
                PortOp::ClearSlot { node, index } => {
                    graph.connect_input_at(nodes[node], index, None);
                }
                PortOp::DisconnectInput { node, index } => {
                    graph.disconnect_input(nodes[node], index);
                }
                PortOp::DisconnectOutput { node, index } => {
                    graph.disconnect_output(nodes[node], index);
                }
                PortOp::DisconnectAll { node } => graph.disconnect_all(nodes[node]),
                PortOp::DisconnectFrom { node, other } => {
                    graph.disconnect_from(nodes[node], nodes[other]);
                }
                PortOp::Resize { node, count } => {
                    let _ = graph.set_number_of_inputs(nodes[node], count);
                }
                PortOp::Destroy { node } => {
                    graph.destroy(nodes[node]);
                }
            }
            symmetry_holds(&graph).map_err(TestCaseError::fail)?;
        }
    }

    #[test]
    fn ownership_stays_consistent(ops in prop::collection::vec(ownership_op(), 1..60)) {
        let mut graph = Graph::new();
        let outer = graph.add_node(ContainerKind);
        let inner = graph.add_node(ContainerKind);
        let spare = graph.add_node(ContainerKind);
        graph.add_child(outer, inner);
        let containers = [outer, inner, spare];
        let nodes: Vec<NodeId> = (0..8)
            .map(|i| graph.add_node(GenericKind::new(format!("Leaf{}", i), PortLayout::dynamic())))
            .collect();

        for op in ops {
            match op {
                OwnershipOp::Add { container, node } => {
                    graph.add_child(containers[container], nodes[node]);
                }
                OwnershipOp::Remove { container, node } => {
                    graph.remove_child(containers[container], nodes[node]);
                }
                OwnershipOp::Destroy { node } => {
                    graph.destroy(nodes[node]);
                }
                OwnershipOp::DeleteAll { container } => {
                    graph.delete_all_children(containers[container]);
                }
            }
            ownership_holds(&graph).map_err(TestCaseError::fail)?;
        }
    }
}
