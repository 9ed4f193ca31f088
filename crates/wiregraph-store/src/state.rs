//! Saving and restoring the state of a single node.
//!
//! A node's state is its type name, identifier, description, properties,
//! port shape and port links, plus whatever its kind chooses to persist.
//! Loading is split in two: the descriptive part (description, properties,
//! kind state) and the port shape. The identifier is never restored here;
//! the serializer decides which id a loaded node gets.

use tracing::warn;
use wiregraph_core::{Attributes, Graph, NodeId, PortDirection, PortList, PropertyValue};

use crate::error::{LoadError, SaveError};
use crate::keys;
use crate::record::connection_slots;
use crate::traits::KeyValueStore;

/// Writes every key describing `node` under `prefix`.
pub fn save_node_state(
    graph: &Graph,
    node: NodeId,
    store: &mut dyn KeyValueStore,
    prefix: &str,
) -> Result<(), SaveError> {
    let target = graph
        .node(node)
        .ok_or(SaveError::NodeNotFound { id: node })?;

    store.add(prefix, keys::TYPE, target.type_name())?;
    store.add(prefix, keys::ID, &target.id().to_string())?;
    store.add(prefix, keys::DESCRIPTION, target.description())?;

    save_ports(
        store,
        prefix,
        target.inputs(),
        keys::INPUT_LIST_FIXED,
        keys::NUMBER_INPUTS,
        keys::input_connection,
    )?;
    save_ports(
        store,
        prefix,
        target.outputs(),
        keys::OUTPUT_LIST_FIXED,
        keys::NUMBER_OUTPUTS,
        keys::output_connection,
    )?;

    for (name, value) in target.properties() {
        let encoded = serde_json::to_string(value).map_err(|source| SaveError::Property {
            name: name.to_string(),
            source,
        })?;
        store.add(prefix, &keys::property(name), &encoded)?;
    }

    let mut extra = Attributes::new();
    target.kind().save_state(&mut extra);
    for (key, value) in extra {
        if keys::is_reserved(&key) {
            warn!(node = %node, kind = target.type_name(), key = %key, "kind state uses a reserved key; skipped");
            continue;
        }
        store.add(prefix, &key, &value)?;
    }
    Ok(())
}

fn save_ports(
    store: &mut dyn KeyValueStore,
    prefix: &str,
    ports: &PortList,
    fixed_key: &str,
    count_key: &str,
    slot_key: fn(usize) -> String,
) -> Result<(), SaveError> {
    store.add(prefix, fixed_key, if ports.is_fixed() { "1" } else { "0" })?;
    store.add(prefix, count_key, &ports.len().to_string())?;
    for (slot, peer) in ports.slots().iter().enumerate() {
        let value = match peer {
            Some(id) => id.to_string(),
            None => keys::EMPTY_SLOT.to_string(),
        };
        store.add(prefix, &slot_key(slot), &value)?;
    }
    Ok(())
}

/// Restores description, properties and kind state from `attributes`.
///
/// Missing keys leave the current value alone.
pub fn load_descriptive_state(
    graph: &mut Graph,
    node: NodeId,
    attributes: &Attributes,
) -> Result<(), LoadError> {
    if !graph.contains(node) {
        return Err(wiregraph_core::CoreError::NodeNotFound { id: node }.into());
    }

    if let Some(description) = attributes.get(keys::DESCRIPTION) {
        graph.set_description(node, description.as_str());
    }

    for (key, value) in attributes {
        let Some(name) = key.strip_prefix(keys::PROPERTY_PREFIX) else {
            continue;
        };
        let decoded: PropertyValue =
            serde_json::from_str(value).map_err(|source| LoadError::Property {
                name: name.to_string(),
                source,
            })?;
        graph.set_property(node, name, decoded);
    }

    let extra: Attributes = attributes
        .iter()
        .filter(|(key, _)| !keys::is_reserved(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    if let Some(target) = graph.node_mut(node) {
        target.kind_mut().load_state(&extra);
    }
    Ok(())
}

/// Restores the fixed flags and slot counts of both port lists.
///
/// A missing input count falls back to the number of stored input links,
/// then to the current count. Dynamic output lists start empty: their slots
/// come back as the inputs that point at this node are wired. Counts above
/// [`GraphConfig::max_port_count`](wiregraph_core::GraphConfig) are
/// rejected as invalid values.
pub fn load_port_shape(
    graph: &mut Graph,
    node: NodeId,
    attributes: &Attributes,
) -> Result<(), LoadError> {
    let (current_inputs, input_fixed, current_outputs, output_fixed) = match graph.node(node) {
        Some(target) => (
            target.number_of_inputs(),
            target.inputs().is_fixed(),
            target.number_of_outputs(),
            target.outputs().is_fixed(),
        ),
        None => return Err(wiregraph_core::CoreError::NodeNotFound { id: node }.into()),
    };

    let limit = graph.config().max_port_count;
    let input_fixed = read_bool(attributes, keys::INPUT_LIST_FIXED)?.unwrap_or(input_fixed);
    let stored_links = connection_slots(attributes, keys::INPUT_CONNECTION)?.len();
    let inputs = match read_count(attributes, keys::NUMBER_INPUTS, limit)? {
        Some(count) => count,
        None if stored_links > 0 => stored_links,
        None => current_inputs,
    };
    graph.configure_ports(node, PortDirection::Input, input_fixed, inputs);

    let output_fixed = read_bool(attributes, keys::OUTPUT_LIST_FIXED)?.unwrap_or(output_fixed);
    let outputs = if output_fixed {
        read_count(attributes, keys::NUMBER_OUTPUTS, limit)?.unwrap_or(current_outputs)
    } else {
        0
    };
    graph.configure_ports(node, PortDirection::Output, output_fixed, outputs);
    Ok(())
}

/// Descriptive state followed by port shape.
pub fn load_node_state(
    graph: &mut Graph,
    node: NodeId,
    attributes: &Attributes,
) -> Result<(), LoadError> {
    load_descriptive_state(graph, node, attributes)?;
    load_port_shape(graph, node, attributes)
}

fn read_bool(attributes: &Attributes, key: &str) -> Result<Option<bool>, LoadError> {
    attributes
        .get(key)
        .map(|value| {
            keys::parse_bool(value).ok_or_else(|| LoadError::InvalidValue {
                key: key.to_string(),
                value: value.clone(),
            })
        })
        .transpose()
}

fn read_count(
    attributes: &Attributes,
    key: &str,
    limit: usize,
) -> Result<Option<usize>, LoadError> {
    attributes
        .get(key)
        .map(|value| {
            value
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|count| *count <= limit)
                .ok_or_else(|| LoadError::InvalidValue {
                    key: key.to_string(),
                    value: value.clone(),
                })
        })
        .transpose()
}
