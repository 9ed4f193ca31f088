//! Persisting a container and its descendants to a [`KeyValueStore`].
//!
//! # Layout
//!
//! The container's own keys sit directly under the prefix. Its children are
//! written under `<prefix>object<N>.` with `N` counting from 1 in child
//! order, nested containers repeating the pattern under their own prefix.
//!
//! # Loading
//!
//! Loading runs in two passes so that links may point forward or across
//! containers:
//!
//! 1. **Instantiate.** Every record is built through the [`NodeFactory`],
//!    given its saved id when that id is free (a fresh one otherwise),
//!    restored, and added to its container. Its stored input references
//!    are kept as [`PendingEdges`].
//! 2. **Wire.** Once every object exists, each pending input is resolved
//!    through the saved → live id table, then by a recursive search of the
//!    target container, and connected symmetrically.
//!
//! Unknown types and dangling references are skipped and reported in the
//! returned [`LoadReport`]. A pending entry naming an object that is not in
//! the target container aborts the load.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, error, info, warn};
use wiregraph_core::{Graph, NodeId};

use crate::error::{LoadError, SaveError};
use crate::factory::NodeFactory;
use crate::keys;
use crate::record::{parse_own_attributes, parse_records};
use crate::state::{load_descriptive_state, load_node_state, save_node_state};
use crate::traits::KeyValueStore;

/// Stored input references of one loaded node, waiting for the wiring pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEdges {
    /// The live node.
    pub node: NodeId,
    /// Saved input references in slot order; `None` is an empty slot.
    pub inputs: Vec<Option<NodeId>>,
}

/// A record the loader could not instantiate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedObject {
    pub prefix: String,
    /// `None` when the record has no `type` key.
    pub type_name: Option<String>,
}

/// An input reference that matched no loaded or existing object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnresolvedInput {
    pub node: NodeId,
    pub slot: usize,
    /// The saved identifier that could not be found.
    pub id: NodeId,
}

/// A resolved link the graph refused to make.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefusedConnection {
    pub node: NodeId,
    pub slot: usize,
    pub input: NodeId,
}

/// What a load did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Every node created, in creation order.
    pub created: Vec<NodeId>,
    /// Saved id → live id, for every record that carried an id.
    pub ids: BTreeMap<NodeId, NodeId>,
    pub skipped: Vec<SkippedObject>,
    pub unresolved_inputs: Vec<UnresolvedInput>,
    pub refused_connections: Vec<RefusedConnection>,
}

impl LoadReport {
    /// The live node a saved id was loaded as.
    pub fn live_id(&self, saved: NodeId) -> Option<NodeId> {
        self.ids.get(&saved).copied()
    }

    /// True when nothing was skipped, left dangling or refused.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
            && self.unresolved_inputs.is_empty()
            && self.refused_connections.is_empty()
    }
}

/// Saves `container` and all of its descendants under `prefix`.
///
/// Existing keys are overwritten but never removed; save into an empty
/// store (or [`SqliteStore::replace_all`](crate::SqliteStore::replace_all))
/// to drop stale objects.
pub fn save(
    graph: &Graph,
    container: NodeId,
    store: &mut dyn KeyValueStore,
    prefix: &str,
) -> Result<(), SaveError> {
    let root = graph
        .node(container)
        .ok_or(SaveError::NodeNotFound { id: container })?;
    if !root.is_container() {
        return Err(SaveError::NotAContainer { id: container });
    }
    let mut visited = HashSet::new();
    save_container(graph, container, store, prefix, &mut visited)?;
    info!(container = %container, objects = visited.len() - 1, "graph saved");
    Ok(())
}

fn save_container(
    graph: &Graph,
    container: NodeId,
    store: &mut dyn KeyValueStore,
    prefix: &str,
    visited: &mut HashSet<NodeId>,
) -> Result<(), SaveError> {
    if !visited.insert(container) {
        return Ok(());
    }
    for (position, child) in graph.children(container).into_iter().enumerate() {
        let child_prefix = keys::object_prefix(prefix, position + 1);
        if graph.is_container(child) {
            save_container(graph, child, store, &child_prefix, visited)?;
        } else if visited.insert(child) {
            save_node_state(graph, child, store, &child_prefix)?;
        }
    }
    save_node_state(graph, container, store, prefix)?;
    debug!(container = %container, prefix, "container saved");
    Ok(())
}

/// Loads the objects stored under `prefix` into `container`.
///
/// The container's own description, properties and kind state are restored
/// too; its id and ports are left as they are.
pub fn load(
    graph: &mut Graph,
    container: NodeId,
    store: &dyn KeyValueStore,
    prefix: &str,
    factory: &dyn NodeFactory,
) -> Result<LoadReport, LoadError> {
    if !graph.is_container(container) {
        return Err(LoadError::NotAContainer { id: container });
    }

    let mut report = LoadReport::default();
    let mut pending = Vec::new();
    instantiate(graph, container, store, prefix, factory, &mut report, &mut pending)?;

    let own = parse_own_attributes(store, prefix)?;
    load_descriptive_state(graph, container, &own)?;

    wire_pending(graph, container, &pending, &mut report)?;

    info!(
        container = %container,
        created = report.created.len(),
        skipped = report.skipped.len(),
        unresolved = report.unresolved_inputs.len(),
        "graph loaded"
    );
    Ok(report)
}

fn instantiate(
    graph: &mut Graph,
    container: NodeId,
    store: &dyn KeyValueStore,
    prefix: &str,
    factory: &dyn NodeFactory,
    report: &mut LoadReport,
    pending: &mut Vec<PendingEdges>,
) -> Result<(), LoadError> {
    for record in parse_records(store, prefix)? {
        let Some(type_name) = record.type_name() else {
            warn!(prefix = %record.prefix, "stored object has no type; skipped");
            report.skipped.push(SkippedObject {
                prefix: record.prefix.clone(),
                type_name: None,
            });
            continue;
        };
        let Some(kind) = factory.create(type_name, &record.attributes) else {
            warn!(prefix = %record.prefix, type_name, "unknown object type; skipped");
            report.skipped.push(SkippedObject {
                prefix: record.prefix.clone(),
                type_name: Some(type_name.to_string()),
            });
            continue;
        };

        let saved = record.saved_id()?.filter(|id| id.is_valid());
        let live = match saved {
            Some(id) if !graph.contains(id) => graph.add_boxed_with_id(id, kind)?,
            _ => graph.try_add_boxed(kind)?,
        };
        if let Some(saved) = saved {
            if let Some(previous) = report.ids.insert(saved, live) {
                warn!(id = %saved, previous = %previous, "saved id appears twice; later object wins");
            }
            if saved != live {
                debug!(saved = %saved, live = %live, "saved id taken; object renumbered");
            }
        }
        report.created.push(live);

        load_node_state(graph, live, &record.attributes)?;
        let inputs = record.inputs()?;

        if !graph.add_child(container, live) {
            warn!(container = %container, node = %live, "container refused loaded object");
        }

        if graph.is_container(live) {
            instantiate(graph, live, store, &record.prefix, factory, report, pending)?;
        }

        pending.push(PendingEdges { node: live, inputs });
    }
    Ok(())
}

/// Connects the stored inputs of every pending entry.
///
/// Each entry's node must be an object of `container`, at any depth.
/// References resolve through `report.ids` first, then by searching
/// `container` for an object with that id.
pub fn wire_pending(
    graph: &mut Graph,
    container: NodeId,
    pending: &[PendingEdges],
    report: &mut LoadReport,
) -> Result<(), LoadError> {
    for entry in pending {
        if graph.find_object(container, entry.node, true) != Some(entry.node) {
            error!(container = %container, node = %entry.node, "pending object is not in the container");
            return Err(LoadError::UnresolvedObject { id: entry.node });
        }

        for (slot, saved) in entry.inputs.iter().enumerate() {
            let Some(saved) = *saved else {
                continue;
            };
            let resolved = report
                .live_id(saved)
                .filter(|live| graph.contains(*live))
                .or_else(|| graph.find_object(container, saved, true));

            let Some(input) = resolved else {
                warn!(node = %entry.node, slot, id = %saved, "input reference matches no object; left empty");
                report.unresolved_inputs.push(UnresolvedInput {
                    node: entry.node,
                    slot,
                    id: saved,
                });
                continue;
            };

            if !graph.connect_input_at(entry.node, slot, Some(input)) {
                warn!(node = %entry.node, slot, input = %input, "stored connection refused");
                report.refused_connections.push(RefusedConnection {
                    node: entry.node,
                    slot,
                    input,
                });
            }
        }
    }
    Ok(())
}
