//! Nodes, their port lists and their property tables.
//!
//! A [`Node`] is read-only from the outside: every mutation that could break
//! the symmetry or ownership invariants goes through [`crate::graph::Graph`],
//! which owns all nodes. Port slots and owner links are plain [`NodeId`]s
//! resolved through that arena.

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::id::NodeId;
use crate::kind::NodeKind;

/// Built-in read/write property mapped onto the node description.
pub const DESCRIPTION_PROPERTY: &str = "Description";

/// Built-in read-only property exposing the kind's type name.
pub const CLASS_NAME_PROPERTY: &str = "class_name";

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Which side of a node a port list sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    Input,
    Output,
}

impl PortDirection {
    /// The other side.
    pub fn opposite(self) -> Self {
        match self {
            PortDirection::Input => PortDirection::Output,
            PortDirection::Output => PortDirection::Input,
        }
    }
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortDirection::Input => write!(f, "input"),
            PortDirection::Output => write!(f, "output"),
        }
    }
}

/// An ordered list of port slots.
///
/// A *fixed* list keeps its slot count when connections come and go: a
/// disconnect empties the slot. A *dynamic* list grows by appending and a
/// disconnect erases the slot, shifting later slots down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortList {
    slots: SmallVec<[Option<NodeId>; 2]>,
    fixed: bool,
}

impl PortList {
    /// A fixed list with `count` empty slots.
    pub fn fixed(count: usize) -> Self {
        PortList {
            slots: SmallVec::from_elem(None, count),
            fixed: true,
        }
    }

    /// A dynamic list with `count` empty slots.
    pub fn dynamic(count: usize) -> Self {
        PortList {
            slots: SmallVec::from_elem(None, count),
            fixed: false,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// The node in slot `index`, or `None` if the slot is empty or out of range.
    pub fn get(&self, index: usize) -> Option<NodeId> {
        self.slots.get(index).copied().flatten()
    }

    /// All slots in order, empty ones included.
    pub fn slots(&self) -> &[Option<NodeId>] {
        &self.slots
    }

    /// Connected nodes in slot order.
    pub fn connected(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.slots.iter().filter_map(|slot| *slot)
    }

    /// Index of the first slot holding `id`.
    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.slots.iter().position(|slot| *slot == Some(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.position(id).is_some()
    }

    /// Returns `true` when every slot is filled.
    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    pub(crate) fn set(&mut self, index: usize, id: Option<NodeId>) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = id;
        }
    }

    pub(crate) fn push(&mut self, id: Option<NodeId>) -> usize {
        self.slots.push(id);
        self.slots.len() - 1
    }

    /// Empties (fixed) or erases (dynamic) slot `index` and returns what it held.
    pub(crate) fn take(&mut self, index: usize) -> Option<NodeId> {
        if index >= self.slots.len() {
            return None;
        }
        if self.fixed {
            self.slots[index].take()
        } else {
            self.slots.remove(index)
        }
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.slots.truncate(len);
    }

    pub(crate) fn grow(&mut self, len: usize) {
        while self.slots.len() < len {
            self.slots.push(None);
        }
    }

    pub(crate) fn set_fixed(&mut self, fixed: bool) {
        self.fixed = fixed;
    }

    pub(crate) fn swap(&mut self, a: usize, b: usize) {
        self.slots.swap(a, b);
    }

    pub(crate) fn rotate_to(&mut self, from: usize, to: usize) {
        let item = self.slots.remove(from);
        self.slots.insert(to, item);
    }

    pub(crate) fn replace_id(&mut self, old: NodeId, new: NodeId) {
        for slot in self.slots.iter_mut() {
            if *slot == Some(old) {
                *slot = Some(new);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

/// A typed property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Text(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl PropertyValue {
    /// Returns the text if this is a `Text` value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Text(text) => write!(f, "{}", text),
            PropertyValue::Bool(value) => write!(f, "{}", value),
            PropertyValue::Int(value) => write!(f, "{}", value),
            PropertyValue::Float(value) => write!(f, "{}", value),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(text: &str) -> Self {
        PropertyValue::Text(text.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(text: String) -> Self {
        PropertyValue::Text(text)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// The unit of composition.
///
/// Container nodes (those whose kind reports
/// [`is_container`](NodeKind::is_container)) additionally carry an
/// insertion-ordered child set; iteration order over it is the positional
/// order used when saving.
#[derive(Debug)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) description: String,
    pub(crate) owner: Option<NodeId>,
    pub(crate) inputs: PortList,
    pub(crate) outputs: PortList,
    pub(crate) properties: IndexMap<String, PropertyValue>,
    pub(crate) children: Option<IndexSet<NodeId>>,
    pub(crate) kind: Box<dyn NodeKind>,
}

impl Node {
    /// Builds a detached node with the port layout its kind asks for.
    pub(crate) fn new(id: NodeId, kind: Box<dyn NodeKind>) -> Self {
        let layout = kind.port_layout();
        let inputs = if layout.fixed_inputs {
            PortList::fixed(layout.inputs)
        } else {
            PortList::dynamic(layout.inputs)
        };
        let outputs = if layout.fixed_outputs {
            PortList::fixed(layout.outputs)
        } else {
            PortList::dynamic(layout.outputs)
        };
        let children = kind.is_container().then(IndexSet::new);

        Node {
            id,
            description: String::new(),
            owner: None,
            inputs,
            outputs,
            properties: IndexMap::new(),
            children,
            kind,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// The owning container, `None` when unparented.
    pub fn owner(&self) -> Option<NodeId> {
        self.owner
    }

    pub fn kind(&self) -> &dyn NodeKind {
        self.kind.as_ref()
    }

    /// Mutable access to the kind for kind-specific configuration.
    pub fn kind_mut(&mut self) -> &mut dyn NodeKind {
        self.kind.as_mut()
    }

    pub fn type_name(&self) -> &str {
        self.kind.type_name()
    }

    pub fn is_container(&self) -> bool {
        self.children.is_some()
    }

    pub fn inputs(&self) -> &PortList {
        &self.inputs
    }

    pub fn outputs(&self) -> &PortList {
        &self.outputs
    }

    pub fn ports(&self, direction: PortDirection) -> &PortList {
        match direction {
            PortDirection::Input => &self.inputs,
            PortDirection::Output => &self.outputs,
        }
    }

    pub(crate) fn ports_mut(&mut self, direction: PortDirection) -> &mut PortList {
        match direction {
            PortDirection::Input => &mut self.inputs,
            PortDirection::Output => &mut self.outputs,
        }
    }

    pub fn number_of_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn number_of_outputs(&self) -> usize {
        self.outputs.len()
    }

    /// Bounds-checked; out of range and empty slots both give `None`.
    pub fn input(&self, index: usize) -> Option<NodeId> {
        self.inputs.get(index)
    }

    /// Bounds-checked; out of range and empty slots both give `None`.
    pub fn output(&self, index: usize) -> Option<NodeId> {
        self.outputs.get(index)
    }

    pub fn find_input_index(&self, id: NodeId) -> Option<usize> {
        self.inputs.position(id)
    }

    pub fn find_output_index(&self, id: NodeId) -> Option<usize> {
        self.outputs.position(id)
    }

    /// Child ids in positional order. Empty for non-containers.
    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.iter().flat_map(|set| set.iter().copied())
    }

    pub fn child_count(&self) -> usize {
        self.children.as_ref().map_or(0, IndexSet::len)
    }

    /// The child at `index` in positional order.
    pub fn child_at(&self, index: usize) -> Option<NodeId> {
        self.children
            .as_ref()
            .and_then(|set| set.get_index(index).copied())
    }

    pub fn has_child(&self, id: NodeId) -> bool {
        self.children.as_ref().is_some_and(|set| set.contains(&id))
    }

    /// Looks up a property, including the built-in `Description` and
    /// `class_name` properties.
    pub fn property(&self, name: &str) -> Option<PropertyValue> {
        match name {
            DESCRIPTION_PROPERTY => Some(PropertyValue::Text(self.description.clone())),
            CLASS_NAME_PROPERTY => Some(PropertyValue::Text(self.type_name().to_string())),
            _ => self.properties.get(name).cloned(),
        }
    }

    /// Built-in property names followed by user properties in insertion order.
    pub fn property_names(&self) -> Vec<String> {
        let mut names = vec![
            CLASS_NAME_PROPERTY.to_string(),
            DESCRIPTION_PROPERTY.to_string(),
        ];
        names.extend(self.properties.keys().cloned());
        names
    }

    /// User properties only, in insertion order.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.properties.iter().map(|(name, value)| (name.as_str(), value))
    }
}
