//! Graph: the arena owning every node, and the port, property and listener
//! operations on them.
//!
//! [`Graph`] is the single entry point for building and mutating connection
//! graphs. Nodes refer to each other only by [`NodeId`]: port slots, owner
//! links and child sets all resolve through the arena, so a node can never
//! outlive the references to it.
//!
//! # Connections
//!
//! A connection from `A` to `B` is recorded twice: `B.inputs[i] == A` and
//! `A.outputs[j] == B`. Every symmetric operation keeps both sides in step,
//! checking feasibility on both ends before touching either. One-sided links
//! exist only through [`Reciprocity::OneSided`].
//!
//! # Events
//!
//! Events are delivered synchronously while the operation runs. Container
//! watchers queue their reactions; the queue is drained before each public
//! method returns, so callers always observe a settled graph.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, trace};

use crate::config::GraphConfig;
use crate::error::CoreError;
use crate::event::{ConnectionEvent, Deferred, GraphEvent, ListenerTable, NodeListener};
use crate::id::{ListenerId, NodeId};
use crate::kind::NodeKind;
use crate::node::{
    Node, PortDirection, PropertyValue, CLASS_NAME_PROPERTY, DESCRIPTION_PROPERTY,
};
use crate::registry;

/// Whether a link operation touches the peer's port list too.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Reciprocity {
    /// Both sides are updated.
    #[default]
    Symmetric,
    /// Only the named node's port list is updated.
    OneSided,
}

/// Flags for the `_with` forms of connect and disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkOptions {
    pub reciprocity: Reciprocity,
    /// Fire connection events.
    pub notify: bool,
}

impl Default for LinkOptions {
    fn default() -> Self {
        LinkOptions {
            reciprocity: Reciprocity::Symmetric,
            notify: true,
        }
    }
}

impl LinkOptions {
    pub const fn one_sided() -> Self {
        LinkOptions {
            reciprocity: Reciprocity::OneSided,
            notify: true,
        }
    }

    pub const fn silent() -> Self {
        LinkOptions {
            reciprocity: Reciprocity::Symmetric,
            notify: false,
        }
    }

    fn symmetric(self) -> bool {
        self.reciprocity == Reciprocity::Symmetric
    }
}

/// Where a node would hold a given peer in one of its port lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotChoice {
    /// Already there.
    Existing(usize),
    /// An empty slot the capability check accepts.
    Empty(usize),
    /// Past the end of a dynamic list.
    Append,
}

/// Picks the slot `holder` would use for `peer` on its `direction` side.
fn choose_slot(holder: &Node, direction: PortDirection, peer: &Node) -> Option<SlotChoice> {
    let ports = holder.ports(direction);
    if let Some(index) = ports.position(peer.id()) {
        return Some(SlotChoice::Existing(index));
    }
    let accepts = |index: usize| match direction {
        PortDirection::Input => holder.kind().can_connect_input(holder, index, peer),
        PortDirection::Output => holder.kind().can_connect_output(holder, index, peer),
    };
    if let Some(index) = (0..ports.len()).find(|&i| ports.get(i).is_none() && accepts(i)) {
        return Some(SlotChoice::Empty(index));
    }
    if !ports.is_fixed() && accepts(ports.len()) {
        return Some(SlotChoice::Append);
    }
    None
}

/// The node arena.
#[derive(Debug, Default)]
pub struct Graph {
    pub(crate) nodes: HashMap<NodeId, Node>,
    pub(crate) listeners: ListenerTable,
    pub(crate) deferred: VecDeque<Deferred>,
    config: GraphConfig,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: GraphConfig) -> Self {
        Graph {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: GraphConfig) {
        self.config = config;
    }

    // -----------------------------------------------------------------------
    // Node lifecycle
    // -----------------------------------------------------------------------

    /// Creates a detached node with a freshly issued identifier.
    pub fn add_node(&mut self, kind: impl NodeKind + 'static) -> NodeId {
        self.add_boxed(Box::new(kind))
    }

    /// # Panics
    ///
    /// When the identifier space is exhausted. See [`Graph::try_add_boxed`].
    pub fn add_boxed(&mut self, kind: Box<dyn NodeKind>) -> NodeId {
        let Some(id) = self.fresh_id() else {
            panic!("node identifier space exhausted");
        };
        self.insert_node(id, kind)
    }

    /// Like [`Graph::add_boxed`], failing with
    /// [`CoreError::IdSpaceExhausted`] instead of panicking.
    pub fn try_add_boxed(&mut self, kind: Box<dyn NodeKind>) -> Result<NodeId, CoreError> {
        let id = self.fresh_id().ok_or(CoreError::IdSpaceExhausted)?;
        Ok(self.insert_node(id, kind))
    }

    /// Next registry identifier not already live here. Ids can repeat after
    /// [`registry::reset`].
    pub(crate) fn fresh_id(&self) -> Option<NodeId> {
        loop {
            let id = registry::try_new_id()?;
            if !self.nodes.contains_key(&id) {
                return Some(id);
            }
            trace!(node = %id, "issued id already live; skipped");
        }
    }

    fn insert_node(&mut self, id: NodeId, kind: Box<dyn NodeKind>) -> NodeId {
        trace!(node = %id, kind = kind.type_name(), "node created");
        self.nodes.insert(id, Node::new(id, kind));
        id
    }

    /// Creates a detached node under a caller-chosen identifier.
    ///
    /// The registry is advanced past `id` so it is never issued again.
    pub fn add_boxed_with_id(
        &mut self,
        id: NodeId,
        kind: Box<dyn NodeKind>,
    ) -> Result<NodeId, CoreError> {
        if !id.is_valid() {
            return Err(CoreError::InvalidId { id });
        }
        if self.nodes.contains_key(&id) {
            return Err(CoreError::DuplicateId { id });
        }
        registry::observe(id);
        Ok(self.insert_node(id, kind))
    }

    /// Destroys a node.
    ///
    /// Order: the destructing event fires first (so the owning container
    /// drops its entry), a container then destroys its children, every port
    /// is disconnected with events, slots of other nodes still naming it
    /// through one-sided links are cleared, and finally every remaining
    /// subscription is dropped. Destruction never follows connections.
    pub fn destroy(&mut self, id: NodeId) -> bool {
        let destroyed = self.destroy_node(id);
        self.settle();
        destroyed
    }

    pub(crate) fn destroy_node(&mut self, id: NodeId) -> bool {
        if !self.nodes.contains_key(&id) {
            return false;
        }
        self.fire(id, GraphEvent::Destructing { node: id });
        self.settle();

        if self.is_container(id) {
            self.clear_children(id);
        }
        self.unlink_all(id, LinkOptions::default());
        // One-sided links from peers are not in this node's own lists.
        for holder in self.holders_of(id) {
            self.release_inputs(holder, id, true);
            while let Some(index) = self.find_output_index(holder, id) {
                self.unlink_output(holder, index, LinkOptions::one_sided());
            }
        }
        let dropped = self.listeners.remove_all(id);
        self.nodes.remove(&id);
        debug!(node = %id, subscriptions = dropped, "node destroyed");
        true
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Mutable access for kind-specific configuration.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Every live identifier, sorted.
    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn is_container(&self, id: NodeId) -> bool {
        self.nodes.get(&id).is_some_and(Node::is_container)
    }

    /// Nodes other than `id` holding `id` in any port slot, sorted.
    fn holders_of(&self, id: NodeId) -> Vec<NodeId> {
        let mut holders: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(holder, node)| {
                **holder != id && (node.inputs.contains(id) || node.outputs.contains(id))
            })
            .map(|(holder, _)| *holder)
            .collect();
        holders.sort();
        holders
    }

    pub fn owner(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(Node::owner)
    }

    pub fn find_input_index(&self, node: NodeId, id: NodeId) -> Option<usize> {
        self.nodes.get(&node)?.find_input_index(id)
    }

    pub fn find_output_index(&self, node: NodeId, id: NodeId) -> Option<usize> {
        self.nodes.get(&node)?.find_output_index(id)
    }

    /// Are all slots on the `direction` side filled?
    ///
    /// A dynamic input list with no slots counts as unconnected: the node
    /// has nothing feeding it. An empty output list counts as connected.
    pub fn is_connected(&self, node: NodeId, direction: PortDirection) -> bool {
        let Some(node) = self.nodes.get(&node) else {
            return false;
        };
        let ports = node.ports(direction);
        if direction == PortDirection::Input && ports.is_empty() {
            return ports.is_fixed();
        }
        ports.is_full()
    }

    // -----------------------------------------------------------------------
    // Identity and ownership
    // -----------------------------------------------------------------------

    /// Renames a node, rewriting every reference to it: peer port slots, the
    /// owner's child set (position kept), the children's owner field, and
    /// the subscription table.
    pub fn set_id(&mut self, old: NodeId, new: NodeId) -> Result<(), CoreError> {
        if old == new {
            return if self.nodes.contains_key(&old) {
                Ok(())
            } else {
                Err(CoreError::NodeNotFound { id: old })
            };
        }
        if !new.is_valid() {
            return Err(CoreError::InvalidId { id: new });
        }
        if self.nodes.contains_key(&new) {
            return Err(CoreError::DuplicateId { id: new });
        }
        let mut node = self
            .nodes
            .remove(&old)
            .ok_or(CoreError::NodeNotFound { id: old })?;
        node.id = new;
        node.inputs.replace_id(old, new);
        node.outputs.replace_id(old, new);

        for holder in self.holders_of(old) {
            if let Some(peer) = self.nodes.get_mut(&holder) {
                peer.inputs.replace_id(old, new);
                peer.outputs.replace_id(old, new);
            }
        }

        if let Some(owner) = node.owner {
            if let Some(children) = self.nodes.get_mut(&owner).and_then(|c| c.children.as_mut()) {
                if let Some(position) = children.get_index_of(&old) {
                    children.shift_remove_index(position);
                    children.shift_insert(position, new);
                }
            }
        }
        let children: Vec<NodeId> = node.children().collect();
        for child in children {
            if let Some(child_node) = self.nodes.get_mut(&child) {
                child_node.owner = Some(new);
            }
            self.listeners.retarget_watch(child, old, new);
        }

        self.listeners.rekey(old, new);
        registry::observe(new);
        self.nodes.insert(new, node);
        debug!(old = %old, new = %new, "node renamed");
        Ok(())
    }

    /// Sets the owner field only. Child sets and port lists are untouched.
    pub fn change_owner(&mut self, node: NodeId, owner: Option<NodeId>) -> bool {
        match self.nodes.get_mut(&node) {
            Some(node) => {
                node.owner = owner;
                true
            }
            None => false,
        }
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    /// Sets a property and fires a property-changed event.
    ///
    /// `Description` writes the description. `class_name` is read-only and
    /// the call returns `false`.
    pub fn set_property(
        &mut self,
        node: NodeId,
        name: &str,
        value: impl Into<PropertyValue>,
    ) -> bool {
        let value = value.into();
        let Some(target) = self.nodes.get_mut(&node) else {
            return false;
        };
        match name {
            CLASS_NAME_PROPERTY => return false,
            DESCRIPTION_PROPERTY => target.description = value.to_string(),
            _ => {
                target.properties.insert(name.to_string(), value);
            }
        }
        self.fire(
            node,
            GraphEvent::PropertyChanged {
                node,
                name: Some(name.to_string()),
            },
        );
        self.settle();
        true
    }

    pub fn property(&self, node: NodeId, name: &str) -> Option<PropertyValue> {
        self.nodes.get(&node)?.property(name)
    }

    pub fn property_names(&self, node: NodeId) -> Vec<String> {
        self.nodes
            .get(&node)
            .map(Node::property_names)
            .unwrap_or_default()
    }

    /// Sets the description without firing an event.
    pub fn set_description(&mut self, node: NodeId, description: impl Into<String>) -> bool {
        match self.nodes.get_mut(&node) {
            Some(node) => {
                node.description = description.into();
                true
            }
            None => false,
        }
    }

    // -----------------------------------------------------------------------
    // Listeners
    // -----------------------------------------------------------------------

    /// Subscribes `listener` to events fired on `node`.
    pub fn add_listener(
        &mut self,
        node: NodeId,
        listener: impl NodeListener + 'static,
    ) -> Option<ListenerId> {
        if !self.nodes.contains_key(&node) {
            return None;
        }
        Some(self.listeners.add_listener(node, Box::new(listener)))
    }

    /// Unsubscribes. Removing an absent listener is a no-op returning `false`.
    pub fn remove_listener(&mut self, node: NodeId, id: ListenerId) -> bool {
        self.listeners.remove_listener(node, id)
    }

    /// Application listeners on `node`.
    pub fn listener_count(&self, node: NodeId) -> usize {
        self.listeners.listener_count(node)
    }

    /// Every subscription in the graph, container watchers included.
    pub fn subscription_count(&self) -> usize {
        self.listeners.total()
    }

    /// Fires `event` on `node`'s own listeners.
    pub fn fire_event(&mut self, node: NodeId, event: GraphEvent) {
        self.fire(node, event);
        self.settle();
    }

    /// Delivers `event` to the listeners of each node `node` feeds. One hop.
    pub fn propagate_to_outputs(&mut self, node: NodeId, event: &GraphEvent) -> usize {
        let reached = self.broadcast(node, PortDirection::Output, event);
        self.settle();
        reached
    }

    /// Delivers `event` to the listeners of each node feeding `node`. One hop.
    pub fn propagate_to_inputs(&mut self, node: NodeId, event: &GraphEvent) -> usize {
        let reached = self.broadcast(node, PortDirection::Input, event);
        self.settle();
        reached
    }

    pub(crate) fn fire(&mut self, node: NodeId, event: GraphEvent) {
        self.listeners.deliver(node, &event, &mut self.deferred);
    }

    fn broadcast(&mut self, node: NodeId, direction: PortDirection, event: &GraphEvent) -> usize {
        let Some(source) = self.nodes.get(&node) else {
            return 0;
        };
        let mut seen = HashSet::new();
        let targets: Vec<NodeId> = source
            .ports(direction)
            .connected()
            .filter(|id| seen.insert(*id))
            .collect();
        for target in &targets {
            self.listeners.deliver(*target, event, &mut self.deferred);
        }
        targets.len()
    }

    /// Applies queued watcher reactions until none remain.
    pub(crate) fn settle(&mut self) {
        while let Some(action) = self.deferred.pop_front() {
            match action {
                Deferred::DetachChild { container, child } => {
                    self.detach_child(container, child);
                }
                Deferred::Rebroadcast { container, child } => {
                    let event = GraphEvent::PropertyChanged {
                        node: child,
                        name: None,
                    };
                    self.broadcast(container, PortDirection::Output, &event);
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Connecting
    // -----------------------------------------------------------------------

    /// Connects `other` into input slot `index` of `node`, two-sided.
    ///
    /// Returns `false`, leaving the graph unchanged, when either node is
    /// missing, `index` is past the end of a fixed list, the capability
    /// check refuses, or `other` cannot offer an output slot. An occupied
    /// slot is disconnected first. On a dynamic list an index past the end
    /// appends. `None` disconnects the slot and returns `false`.
    pub fn connect_input_at(&mut self, node: NodeId, index: usize, other: Option<NodeId>) -> bool {
        self.connect_input_with(node, index, other, LinkOptions::default())
    }

    /// Records `other` in input slot `index` of `node` without touching
    /// `other`'s outputs.
    pub fn connect_input_one_sided(&mut self, node: NodeId, index: usize, other: NodeId) -> bool {
        self.connect_input_with(node, index, Some(other), LinkOptions::one_sided())
    }

    pub fn connect_input_with(
        &mut self,
        node: NodeId,
        index: usize,
        other: Option<NodeId>,
        options: LinkOptions,
    ) -> bool {
        let connected = match other {
            Some(other) => self.link_input(node, index, other, options).is_some(),
            None => {
                self.unlink_input(node, index, options);
                false
            }
        };
        self.settle();
        connected
    }

    /// Connects `other` into the first input slot of `node` that will take it.
    ///
    /// Returns the slot, or the existing slot if already connected.
    pub fn connect_input(&mut self, node: NodeId, other: NodeId) -> Option<usize> {
        let target = self.nodes.get(&node)?;
        let candidate = self.nodes.get(&other)?;
        let slot = match choose_slot(target, PortDirection::Input, candidate)? {
            SlotChoice::Existing(index) => return Some(index),
            SlotChoice::Empty(index) => index,
            SlotChoice::Append => target.inputs.len(),
        };
        let connected = self.link_input(node, slot, other, LinkOptions::default());
        self.settle();
        connected
    }

    /// Connects `node`'s output to the first input slot of `other` that will
    /// take it. Returns the output slot on `node`.
    pub fn connect_output(&mut self, node: NodeId, other: NodeId) -> Option<usize> {
        let source = self.nodes.get(&node)?;
        if let Some(index) = source.find_output_index(other) {
            return Some(index);
        }
        let target = self.nodes.get(&other)?;
        let slot = match choose_slot(target, PortDirection::Input, source)? {
            SlotChoice::Existing(index) | SlotChoice::Empty(index) => index,
            SlotChoice::Append => target.inputs.len(),
        };
        self.link_input(other, slot, node, LinkOptions::default());
        self.settle();
        self.find_output_index(node, other)
    }

    /// Replaces every input of `node` with `inputs`, slot for slot.
    ///
    /// A dynamic list is resized to `inputs.len()`; a fixed list keeps its
    /// length and empties the slots past the end of `inputs`. `None` entries
    /// leave their slot empty. Every entry is checked first: when a peer is
    /// missing, refused by the capability check or has no output slot to
    /// offer, or `inputs` is longer than a fixed list, the call returns
    /// `false` and nothing changes.
    pub fn connect_input_list(&mut self, node: NodeId, inputs: &[Option<NodeId>]) -> bool {
        let Some(target) = self.nodes.get(&node) else {
            return false;
        };
        if target.inputs.is_fixed() && inputs.len() > target.inputs.len() {
            trace!(node = %node, len = target.inputs.len(), wanted = inputs.len(), "input list refused: too long");
            return false;
        }
        for (index, peer) in inputs.iter().enumerate() {
            let Some(peer) = peer else {
                continue;
            };
            let accepted = self.nodes.get(peer).is_some_and(|candidate| {
                target.kind().can_connect_input(target, index, candidate)
                    && (candidate.outputs.contains(node)
                        || choose_slot(candidate, PortDirection::Output, target).is_some())
            });
            if !accepted {
                trace!(node = %node, peer = %peer, index, "input list refused");
                return false;
            }
        }

        let len = target.inputs.len();
        for index in (0..len).rev() {
            self.unlink_input(node, index, LinkOptions::default());
        }
        if let Some(target) = self.nodes.get_mut(&node) {
            if !target.inputs.is_fixed() {
                target.inputs.truncate(0);
                target.inputs.grow(inputs.len());
            }
        }
        let mut connected = true;
        for (index, peer) in inputs.iter().enumerate() {
            if let Some(peer) = peer {
                connected &= self.link_input(node, index, *peer, LinkOptions::default()).is_some();
            }
        }
        debug!(node = %node, inputs = inputs.len(), connected, "input list replaced");
        self.settle();
        connected
    }

    /// Replaces every output of `node` with links to `outputs`, in order.
    ///
    /// Each peer takes `node` into its first input slot that will accept it.
    /// Refused up front, with nothing changed, when a peer is missing or has
    /// no such slot, or when `outputs` holds more distinct peers than a
    /// fixed output list has slots.
    pub fn connect_output_list(&mut self, node: NodeId, outputs: &[NodeId]) -> bool {
        let Some(source) = self.nodes.get(&node) else {
            return false;
        };
        let mut distinct: Vec<NodeId> = Vec::with_capacity(outputs.len());
        for peer in outputs {
            if !distinct.contains(peer) {
                distinct.push(*peer);
            }
        }
        if source.outputs.is_fixed() && distinct.len() > source.outputs.len() {
            trace!(node = %node, len = source.outputs.len(), wanted = distinct.len(), "output list refused: too long");
            return false;
        }
        for peer in &distinct {
            let accepted = self.nodes.get(peer).is_some_and(|target| {
                target.inputs.contains(node)
                    || choose_slot(target, PortDirection::Input, source).is_some()
            });
            if !accepted {
                trace!(node = %node, peer = %peer, "output list refused");
                return false;
            }
        }

        let len = source.outputs.len();
        for index in (0..len).rev() {
            self.unlink_output(node, index, LinkOptions::default());
        }
        let mut connected = true;
        for peer in distinct {
            let slot = self.nodes.get(&peer).zip(self.nodes.get(&node)).and_then(|(target, source)| {
                match choose_slot(target, PortDirection::Input, source)? {
                    SlotChoice::Existing(index) | SlotChoice::Empty(index) => Some(index),
                    SlotChoice::Append => Some(target.inputs.len()),
                }
            });
            connected &= slot
                .and_then(|slot| self.link_input(peer, slot, node, LinkOptions::default()))
                .is_some();
        }
        debug!(node = %node, outputs = outputs.len(), connected, "output list replaced");
        self.settle();
        connected
    }

    fn link_input(
        &mut self,
        node: NodeId,
        index: usize,
        other: NodeId,
        options: LinkOptions,
    ) -> Option<usize> {
        let (Some(target), Some(candidate)) = (self.nodes.get(&node), self.nodes.get(&other))
        else {
            trace!(node = %node, other = %other, "connect refused: unknown node");
            return None;
        };
        let inputs = target.inputs();
        if index >= inputs.len() && inputs.is_fixed() {
            trace!(node = %node, index, len = inputs.len(), "connect refused: fixed slot out of range");
            return None;
        }
        let slot = index.min(inputs.len());
        if inputs.get(slot) == Some(other)
            && (!options.symmetric() || candidate.outputs().contains(node))
        {
            return Some(slot);
        }
        if !target.kind().can_connect_input(target, slot, candidate) {
            trace!(node = %node, other = %other, slot, "connect refused by input capability");
            return None;
        }
        let reciprocal = if options.symmetric() {
            match choose_slot(candidate, PortDirection::Output, target) {
                Some(choice) => Some(choice),
                None => {
                    trace!(node = %node, other = %other, "connect refused: no output slot on peer");
                    return None;
                }
            }
        } else {
            None
        };

        let displaced = inputs.get(slot);
        if let Some(old) = displaced {
            if let Some(target) = self.nodes.get_mut(&node) {
                target.inputs.set(slot, None);
            }
            if options.notify {
                self.fire(
                    node,
                    GraphEvent::Disconnected(ConnectionEvent {
                        node,
                        direction: PortDirection::Input,
                        index: Some(slot),
                        old: Some(old),
                        new: None,
                    }),
                );
            }
            if options.symmetric() && old != other {
                self.release_output(old, node, options.notify);
            }
        }

        let target = self.nodes.get_mut(&node)?;
        if slot == target.inputs.len() {
            target.inputs.push(Some(other));
        } else {
            target.inputs.set(slot, Some(other));
        }
        let output_slot = match reciprocal {
            Some(SlotChoice::Empty(j)) => {
                let peer = self.nodes.get_mut(&other)?;
                peer.outputs.set(j, Some(node));
                Some(j)
            }
            Some(SlotChoice::Append) => {
                let peer = self.nodes.get_mut(&other)?;
                Some(peer.outputs.push(Some(node)))
            }
            Some(SlotChoice::Existing(_)) | None => None,
        };
        debug!(node = %node, other = %other, slot, ?output_slot, "input connected");

        if options.notify {
            self.fire(
                node,
                GraphEvent::Connected(ConnectionEvent {
                    node,
                    direction: PortDirection::Input,
                    index: Some(slot),
                    old: displaced,
                    new: Some(other),
                }),
            );
            if let Some(j) = output_slot {
                self.fire(
                    other,
                    GraphEvent::Connected(ConnectionEvent {
                        node: other,
                        direction: PortDirection::Output,
                        index: Some(j),
                        old: None,
                        new: Some(node),
                    }),
                );
            }
        }
        Some(slot)
    }

    // -----------------------------------------------------------------------
    // Disconnecting
    // -----------------------------------------------------------------------

    /// Empties (fixed) or erases (dynamic) input slot `index` and unlinks
    /// the peer's output. Returns the node that was there.
    pub fn disconnect_input(&mut self, node: NodeId, index: usize) -> Option<NodeId> {
        self.disconnect_input_with(node, index, LinkOptions::default())
    }

    pub fn disconnect_input_with(
        &mut self,
        node: NodeId,
        index: usize,
        options: LinkOptions,
    ) -> Option<NodeId> {
        let removed = self.unlink_input(node, index, options);
        self.settle();
        removed
    }

    /// Empties (fixed) or erases (dynamic) output slot `index` and unlinks
    /// the peer's input. Returns the node that was there.
    pub fn disconnect_output(&mut self, node: NodeId, index: usize) -> Option<NodeId> {
        self.disconnect_output_with(node, index, LinkOptions::default())
    }

    pub fn disconnect_output_with(
        &mut self,
        node: NodeId,
        index: usize,
        options: LinkOptions,
    ) -> Option<NodeId> {
        let removed = self.unlink_output(node, index, options);
        self.settle();
        removed
    }

    /// Disconnects every input and output of `node`.
    pub fn disconnect_all(&mut self, node: NodeId) {
        self.unlink_all(node, LinkOptions::default());
        self.settle();
    }

    /// Removes every link between `node` and `other`, in both directions.
    pub fn disconnect_from(&mut self, node: NodeId, other: NodeId) -> bool {
        let mut removed = false;
        while let Some(index) = self.find_input_index(node, other) {
            self.unlink_input(node, index, LinkOptions::default());
            removed = true;
        }
        while let Some(index) = self.find_output_index(node, other) {
            self.unlink_output(node, index, LinkOptions::default());
            removed = true;
        }
        self.settle();
        removed
    }

    /// Disconnects every input slot of `node` holding one of `peers`.
    /// Returns the peers that were connected, in `peers` order.
    pub fn disconnect_inputs(&mut self, node: NodeId, peers: &[NodeId]) -> Vec<NodeId> {
        let mut removed = Vec::new();
        for peer in peers {
            let mut found = false;
            while let Some(index) = self.find_input_index(node, *peer) {
                self.unlink_input(node, index, LinkOptions::default());
                found = true;
            }
            if found {
                removed.push(*peer);
            }
        }
        self.settle();
        removed
    }

    /// Output counterpart of [`Graph::disconnect_inputs`].
    pub fn disconnect_outputs(&mut self, node: NodeId, peers: &[NodeId]) -> Vec<NodeId> {
        let mut removed = Vec::new();
        for peer in peers {
            let mut found = false;
            while let Some(index) = self.find_output_index(node, *peer) {
                self.unlink_output(node, index, LinkOptions::default());
                found = true;
            }
            if found {
                removed.push(*peer);
            }
        }
        self.settle();
        removed
    }

    pub(crate) fn unlink_all(&mut self, node: NodeId, options: LinkOptions) {
        let Some(target) = self.nodes.get(&node) else {
            return;
        };
        let (inputs, outputs) = (target.inputs.len(), target.outputs.len());
        for index in (0..inputs).rev() {
            self.unlink_input(node, index, options);
        }
        for index in (0..outputs).rev() {
            self.unlink_output(node, index, options);
        }
    }

    fn unlink_input(&mut self, node: NodeId, index: usize, options: LinkOptions) -> Option<NodeId> {
        let removed = self.nodes.get_mut(&node)?.inputs.take(index)?;
        trace!(node = %node, index, peer = %removed, "input disconnected");
        if options.notify {
            self.fire(
                node,
                GraphEvent::Disconnected(ConnectionEvent {
                    node,
                    direction: PortDirection::Input,
                    index: Some(index),
                    old: Some(removed),
                    new: None,
                }),
            );
        }
        if options.symmetric() {
            self.release_output(removed, node, options.notify);
        }
        Some(removed)
    }

    fn unlink_output(&mut self, node: NodeId, index: usize, options: LinkOptions) -> Option<NodeId> {
        let removed = self.nodes.get_mut(&node)?.outputs.take(index)?;
        trace!(node = %node, index, peer = %removed, "output disconnected");
        if options.notify {
            self.fire(
                node,
                GraphEvent::Disconnected(ConnectionEvent {
                    node,
                    direction: PortDirection::Output,
                    index: Some(index),
                    old: Some(removed),
                    new: None,
                }),
            );
        }
        if options.symmetric() {
            self.release_inputs(removed, node, options.notify);
        }
        Some(removed)
    }

    /// Drops `peer` from `holder`'s outputs once no input of `peer` refers
    /// to `holder` any more.
    fn release_output(&mut self, holder: NodeId, peer: NodeId, notify: bool) {
        if self.find_input_index(peer, holder).is_some() {
            return;
        }
        let Some(index) = self.find_output_index(holder, peer) else {
            return;
        };
        self.unlink_output(holder, index, LinkOptions { reciprocity: Reciprocity::OneSided, notify });
    }

    /// Drops every input slot of `holder` referring to `peer`.
    fn release_inputs(&mut self, holder: NodeId, peer: NodeId, notify: bool) {
        let options = LinkOptions {
            reciprocity: Reciprocity::OneSided,
            notify,
        };
        while let Some(index) = self.find_input_index(holder, peer) {
            self.unlink_input(holder, index, options);
        }
    }

    // -----------------------------------------------------------------------
    // Port list shape
    // -----------------------------------------------------------------------

    /// Resizes a dynamic input list. Entries past `count` are disconnected
    /// first. A fixed list is left alone, or rejected when
    /// [`GraphConfig::strict_port_resize`] is set.
    pub fn set_number_of_inputs(&mut self, node: NodeId, count: usize) -> Result<(), CoreError> {
        self.set_number_of_ports(node, PortDirection::Input, count)
    }

    /// Output counterpart of [`Graph::set_number_of_inputs`].
    pub fn set_number_of_outputs(&mut self, node: NodeId, count: usize) -> Result<(), CoreError> {
        self.set_number_of_ports(node, PortDirection::Output, count)
    }

    fn set_number_of_ports(
        &mut self,
        node: NodeId,
        direction: PortDirection,
        count: usize,
    ) -> Result<(), CoreError> {
        let target = self
            .nodes
            .get(&node)
            .ok_or(CoreError::NodeNotFound { id: node })?;
        if target.ports(direction).is_fixed() {
            if self.config.strict_port_resize {
                return Err(CoreError::FixedPortList { id: node, direction });
            }
            trace!(node = %node, %direction, "resize ignored on fixed port list");
            return Ok(());
        }
        self.resize_ports(node, direction, count);
        self.settle();
        Ok(())
    }

    /// Sets the fixed flag and slot count of one side, bypassing the fixed
    /// guard. Used when restoring persisted state.
    pub fn configure_ports(
        &mut self,
        node: NodeId,
        direction: PortDirection,
        fixed: bool,
        count: usize,
    ) -> bool {
        let Some(target) = self.nodes.get_mut(&node) else {
            return false;
        };
        target.ports_mut(direction).set_fixed(fixed);
        self.resize_ports(node, direction, count);
        self.settle();
        true
    }

    fn resize_ports(&mut self, node: NodeId, direction: PortDirection, count: usize) {
        let Some(len) = self.nodes.get(&node).map(|n| n.ports(direction).len()) else {
            return;
        };
        for index in (count..len).rev() {
            match direction {
                PortDirection::Input => self.unlink_input(node, index, LinkOptions::default()),
                PortDirection::Output => self.unlink_output(node, index, LinkOptions::default()),
            };
        }
        if let Some(target) = self.nodes.get_mut(&node) {
            let ports = target.ports_mut(direction);
            ports.truncate(count);
            ports.grow(count);
        }
    }

    // -----------------------------------------------------------------------
    // Input reordering (dynamic lists only)
    // -----------------------------------------------------------------------

    /// Swaps `input` with its predecessor.
    pub fn move_input_up(&mut self, node: NodeId, input: NodeId) -> bool {
        self.reorder_input(node, input, |index, _| index.checked_sub(1))
    }

    /// Swaps `input` with its successor.
    pub fn move_input_down(&mut self, node: NodeId, input: NodeId) -> bool {
        self.reorder_input(node, input, |index, len| (index + 1 < len).then_some(index + 1))
    }

    pub fn move_input_to_top(&mut self, node: NodeId, input: NodeId) -> bool {
        self.reorder_input(node, input, |index, _| (index > 0).then_some(0))
    }

    pub fn move_input_to_bottom(&mut self, node: NodeId, input: NodeId) -> bool {
        self.reorder_input(node, input, |index, len| (index + 1 < len).then_some(len - 1))
    }

    fn reorder_input(
        &mut self,
        node: NodeId,
        input: NodeId,
        destination: impl FnOnce(usize, usize) -> Option<usize>,
    ) -> bool {
        let Some(target) = self.nodes.get_mut(&node) else {
            return false;
        };
        if target.inputs.is_fixed() {
            return false;
        }
        let Some(from) = target.inputs.position(input) else {
            return false;
        };
        let Some(to) = destination(from, target.inputs.len()) else {
            return false;
        };
        let displaced = target.inputs.get(to);
        if from.abs_diff(to) == 1 {
            target.inputs.swap(from, to);
        } else {
            target.inputs.rotate_to(from, to);
        }
        trace!(node = %node, input = %input, from, to, "input moved");
        self.fire(
            node,
            GraphEvent::Connected(ConnectionEvent {
                node,
                direction: PortDirection::Input,
                index: Some(to),
                old: displaced,
                new: Some(input),
            }),
        );
        self.settle();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::{GenericKind, PortLayout};
    use std::sync::{Arc, Mutex};

    fn filter(graph: &mut Graph) -> NodeId {
        graph.add_node(GenericKind::new("Filter", PortLayout::fixed_inputs(1)))
    }

    fn dynamic(graph: &mut Graph) -> NodeId {
        graph.add_node(GenericKind::new("Combiner", PortLayout::dynamic()))
    }

    fn recorder(graph: &mut Graph, node: NodeId) -> Arc<Mutex<Vec<GraphEvent>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        graph
            .add_listener(node, move |event: &GraphEvent| {
                sink.lock().unwrap().push(event.clone())
            })
            .unwrap();
        log
    }

    fn assert_symmetric(graph: &Graph) {
        for id in graph.node_ids() {
            let node = graph.node(id).unwrap();
            for input in node.inputs().connected() {
                assert!(graph.node(input).unwrap().outputs().contains(id));
            }
            for output in node.outputs().connected() {
                assert!(graph.node(output).unwrap().inputs().contains(id));
            }
        }
    }

    #[test]
    fn connect_is_two_sided() {
        let mut graph = Graph::new();
        let a = dynamic(&mut graph);
        let b = filter(&mut graph);

        assert!(graph.connect_input_at(b, 0, Some(a)));
        assert_eq!(graph.node(b).unwrap().input(0), Some(a));
        assert_eq!(graph.find_output_index(a, b), Some(0));
        assert_symmetric(&graph);
    }

    #[test]
    fn fixed_index_out_of_range_fails_unchanged() {
        let mut graph = Graph::new();
        let a = dynamic(&mut graph);
        let b = filter(&mut graph);

        assert!(!graph.connect_input_at(b, 3, Some(a)));
        assert_eq!(graph.node(b).unwrap().number_of_inputs(), 1);
        assert!(graph.node(a).unwrap().outputs().is_empty());
    }

    #[test]
    fn dynamic_index_past_end_appends() {
        let mut graph = Graph::new();
        let a = dynamic(&mut graph);
        let b = dynamic(&mut graph);

        assert!(graph.connect_input_at(b, 10, Some(a)));
        assert_eq!(graph.node(b).unwrap().number_of_inputs(), 1);
        assert_eq!(graph.node(b).unwrap().input(0), Some(a));
    }

    #[test]
    fn occupied_slot_is_replaced_with_events() {
        let mut graph = Graph::new();
        let a = dynamic(&mut graph);
        let c = dynamic(&mut graph);
        let b = filter(&mut graph);
        graph.connect_input_at(b, 0, Some(a));
        let log = recorder(&mut graph, b);
        let a_log = recorder(&mut graph, a);

        assert!(graph.connect_input_at(b, 0, Some(c)));
        assert_eq!(graph.node(b).unwrap().input(0), Some(c));
        assert!(graph.node(a).unwrap().outputs().is_empty());
        assert_symmetric(&graph);

        let events = log.lock().unwrap();
        assert!(matches!(&events[0], GraphEvent::Disconnected(e) if e.old == Some(a)));
        assert!(matches!(&events[1], GraphEvent::Connected(e) if e.old == Some(a) && e.new == Some(c)));
        assert!(matches!(&a_log.lock().unwrap()[0], GraphEvent::Disconnected(e) if e.direction == PortDirection::Output));
    }

    #[test_log::test]
    fn capability_refusal_leaves_graph_unchanged() {
        let mut graph = Graph::new();
        let sink = graph.add_node(GenericKind::new("Sink", PortLayout::fixed(1, 0)));
        let b = filter(&mut graph);

        // The sink has no outputs, so it cannot feed anything.
        assert!(!graph.connect_input_at(b, 0, Some(sink)));
        assert_eq!(graph.node(b).unwrap().input(0), None);
    }

    #[test_log::test]
    fn reciprocal_infeasibility_fails_the_connect() {
        let mut graph = Graph::new();
        let source = graph.add_node(GenericKind::new("Reader", PortLayout::fixed(0, 1)));
        let b1 = filter(&mut graph);
        let b2 = filter(&mut graph);

        assert!(graph.connect_input_at(b1, 0, Some(source)));
        // The reader's only output slot is taken.
        assert!(!graph.connect_input_at(b2, 0, Some(source)));
        assert_eq!(graph.node(b2).unwrap().input(0), None);
        assert_symmetric(&graph);
    }

    #[test]
    fn none_disconnects_and_returns_false() {
        let mut graph = Graph::new();
        let a = dynamic(&mut graph);
        let b = filter(&mut graph);
        graph.connect_input_at(b, 0, Some(a));

        assert!(!graph.connect_input_at(b, 0, None));
        assert_eq!(graph.node(b).unwrap().input(0), None);
        assert_eq!(graph.node(b).unwrap().number_of_inputs(), 1);
        assert!(graph.node(a).unwrap().outputs().is_empty());
    }

    #[test]
    fn connect_input_returns_existing_slot() {
        let mut graph = Graph::new();
        let a = dynamic(&mut graph);
        let b = dynamic(&mut graph);

        assert_eq!(graph.connect_input(b, a), Some(0));
        assert_eq!(graph.connect_input(b, a), Some(0));
        assert_eq!(graph.node(b).unwrap().number_of_inputs(), 1);
    }

    #[test]
    fn connect_output_uses_peer_input() {
        let mut graph = Graph::new();
        let a = dynamic(&mut graph);
        let b = filter(&mut graph);

        assert_eq!(graph.connect_output(a, b), Some(0));
        assert_eq!(graph.node(b).unwrap().input(0), Some(a));
        assert_symmetric(&graph);
    }

    #[test]
    fn one_sided_link_leaves_peer_untouched() {
        let mut graph = Graph::new();
        let a = dynamic(&mut graph);
        let b = filter(&mut graph);

        assert!(graph.connect_input_one_sided(b, 0, a));
        assert_eq!(graph.node(b).unwrap().input(0), Some(a));
        assert!(graph.node(a).unwrap().outputs().is_empty());

        assert_eq!(
            graph.disconnect_input_with(b, 0, LinkOptions::one_sided()),
            Some(a)
        );
    }

    #[test]
    fn dynamic_disconnect_erases_slot() {
        let mut graph = Graph::new();
        let a = dynamic(&mut graph);
        let c = dynamic(&mut graph);
        let b = dynamic(&mut graph);
        graph.connect_input(b, a);
        graph.connect_input(b, c);

        assert_eq!(graph.disconnect_input(b, 0), Some(a));
        assert_eq!(graph.node(b).unwrap().inputs().slots(), &[Some(c)]);
        assert_symmetric(&graph);
    }

    #[test]
    fn disconnect_output_unlinks_peer_input() {
        let mut graph = Graph::new();
        let a = dynamic(&mut graph);
        let b = filter(&mut graph);
        graph.connect_input_at(b, 0, Some(a));

        assert_eq!(graph.disconnect_output(a, 0), Some(b));
        assert_eq!(graph.node(b).unwrap().input(0), None);
    }

    #[test]
    fn disconnect_all_clears_both_sides() {
        let mut graph = Graph::new();
        let a = dynamic(&mut graph);
        let b = dynamic(&mut graph);
        let c = dynamic(&mut graph);
        graph.connect_input(b, a);
        graph.connect_input(c, b);

        graph.disconnect_all(b);
        assert!(graph.node(b).unwrap().inputs().is_empty());
        assert!(graph.node(b).unwrap().outputs().is_empty());
        assert!(graph.node(a).unwrap().outputs().is_empty());
        assert!(graph.node(c).unwrap().inputs().is_empty());
    }

    #[test]
    fn disconnect_from_removes_every_link() {
        let mut graph = Graph::new();
        let a = dynamic(&mut graph);
        let b = dynamic(&mut graph);
        graph.connect_input(b, a);
        graph.connect_input(a, b);

        assert!(graph.disconnect_from(a, b));
        assert!(!graph.disconnect_from(a, b));
        assert_symmetric(&graph);
        assert!(graph.node(a).unwrap().inputs().is_empty());
    }

    #[test]
    fn shrinking_inputs_disconnects_tail_first() {
        let mut graph = Graph::new();
        let b = dynamic(&mut graph);
        let peers: Vec<NodeId> = (0..3).map(|_| dynamic(&mut graph)).collect();
        for peer in &peers {
            graph.connect_input(b, *peer);
        }
        let log = recorder(&mut graph, b);

        graph.set_number_of_inputs(b, 1).unwrap();
        assert_eq!(graph.node(b).unwrap().inputs().slots(), &[Some(peers[0])]);
        assert!(graph.node(peers[2]).unwrap().outputs().is_empty());
        assert_eq!(log.lock().unwrap().len(), 2);

        graph.set_number_of_inputs(b, 3).unwrap();
        assert_eq!(graph.node(b).unwrap().number_of_inputs(), 3);
    }

    #[test]
    fn fixed_resize_is_noop_or_error() {
        let mut graph = Graph::new();
        let b = filter(&mut graph);
        graph.set_number_of_inputs(b, 4).unwrap();
        assert_eq!(graph.node(b).unwrap().number_of_inputs(), 1);

        graph.set_config(GraphConfig {
            strict_port_resize: true,
            ..GraphConfig::default()
        });
        assert!(matches!(
            graph.set_number_of_inputs(b, 4),
            Err(CoreError::FixedPortList { direction: PortDirection::Input, .. })
        ));
    }

    #[test]
    fn is_connected_rules() {
        let mut graph = Graph::new();
        let a = dynamic(&mut graph);
        let b = filter(&mut graph);
        let reader = graph.add_node(GenericKind::new("Reader", PortLayout::fixed(0, 1)));

        assert!(!graph.is_connected(a, PortDirection::Input));
        assert!(graph.is_connected(reader, PortDirection::Input));
        assert!(!graph.is_connected(b, PortDirection::Input));
        graph.connect_input_at(b, 0, Some(a));
        assert!(graph.is_connected(b, PortDirection::Input));
        assert!(graph.is_connected(a, PortDirection::Output));
    }

    #[test]
    fn input_reordering() {
        let mut graph = Graph::new();
        let b = dynamic(&mut graph);
        let peers: Vec<NodeId> = (0..3).map(|_| dynamic(&mut graph)).collect();
        for peer in &peers {
            graph.connect_input(b, *peer);
        }
        let slots = |graph: &Graph| graph.node(b).unwrap().inputs().slots().to_vec();

        assert!(graph.move_input_up(b, peers[1]));
        assert_eq!(slots(&graph), vec![Some(peers[1]), Some(peers[0]), Some(peers[2])]);
        assert!(!graph.move_input_up(b, peers[1]));
        assert!(graph.move_input_to_bottom(b, peers[1]));
        assert_eq!(slots(&graph), vec![Some(peers[0]), Some(peers[2]), Some(peers[1])]);
        assert!(graph.move_input_to_top(b, peers[1]));
        assert!(graph.move_input_down(b, peers[1]));
        assert_eq!(slots(&graph), vec![Some(peers[0]), Some(peers[1]), Some(peers[2])]);
        assert_symmetric(&graph);

        let fixed = filter(&mut graph);
        graph.connect_input_at(fixed, 0, Some(peers[0]));
        assert!(!graph.move_input_down(fixed, peers[0]));
    }

    #[test]
    fn properties_fire_events() {
        let mut graph = Graph::new();
        let a = dynamic(&mut graph);
        let log = recorder(&mut graph, a);

        assert!(graph.set_property(a, "gain", 2.5));
        assert!(graph.set_property(a, DESCRIPTION_PROPERTY, "main mix"));
        assert!(!graph.set_property(a, CLASS_NAME_PROPERTY, "Other"));

        assert_eq!(graph.property(a, "gain"), Some(PropertyValue::Float(2.5)));
        assert_eq!(graph.node(a).unwrap().description(), "main mix");
        assert_eq!(
            graph.property(a, CLASS_NAME_PROPERTY),
            Some(PropertyValue::Text("Combiner".into()))
        );
        assert_eq!(graph.property_names(a), vec!["class_name", "Description", "gain"]);
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn listeners_are_removed_idempotently() {
        let mut graph = Graph::new();
        let a = dynamic(&mut graph);
        let id = graph.add_listener(a, |_: &GraphEvent| {}).unwrap();
        assert_eq!(graph.listener_count(a), 1);
        assert!(graph.remove_listener(a, id));
        assert!(!graph.remove_listener(a, id));
        assert!(graph.add_listener(NodeId::INVALID, |_: &GraphEvent| {}).is_none());
    }

    #[test]
    fn propagation_is_one_hop() {
        let mut graph = Graph::new();
        let a = dynamic(&mut graph);
        let b = dynamic(&mut graph);
        let c = dynamic(&mut graph);
        graph.connect_input(b, a);
        graph.connect_input(c, b);
        let b_log = recorder(&mut graph, b);
        let c_log = recorder(&mut graph, c);

        let event = GraphEvent::PropertyChanged { node: a, name: None };
        assert_eq!(graph.propagate_to_outputs(a, &event), 1);
        assert_eq!(b_log.lock().unwrap().len(), 1);
        assert!(c_log.lock().unwrap().is_empty());

        assert_eq!(graph.propagate_to_inputs(c, &event), 1);
        assert_eq!(b_log.lock().unwrap().len(), 2);
    }

    #[test]
    fn set_id_rewrites_peers_and_listeners() {
        let mut graph = Graph::new();
        let a = dynamic(&mut graph);
        let b = filter(&mut graph);
        graph.connect_input_at(b, 0, Some(a));
        graph.add_listener(a, |_: &GraphEvent| {});

        let renamed = registry::new_id();
        graph.set_id(a, renamed).unwrap();
        assert!(!graph.contains(a));
        assert_eq!(graph.node(b).unwrap().input(0), Some(renamed));
        assert_eq!(graph.find_output_index(renamed, b), Some(0));
        assert_eq!(graph.listener_count(renamed), 1);

        assert!(matches!(graph.set_id(renamed, b), Err(CoreError::DuplicateId { .. })));
        assert!(matches!(
            graph.set_id(renamed, NodeId::INVALID),
            Err(CoreError::InvalidId { .. })
        ));
        assert!(matches!(graph.set_id(a, NodeId(i64::MAX)), Err(CoreError::NodeNotFound { .. })));
    }

    #[test]
    fn destroy_disconnects_and_drops_subscriptions() {
        let mut graph = Graph::new();
        let a = dynamic(&mut graph);
        let b = filter(&mut graph);
        graph.connect_input_at(b, 0, Some(a));
        let log = recorder(&mut graph, a);

        assert!(graph.destroy(a));
        assert!(!graph.destroy(a));
        assert_eq!(graph.node(b).unwrap().input(0), None);
        assert_eq!(graph.listener_count(a), 0);
        assert_eq!(graph.subscription_count(), 0);
        assert_eq!(
            log.lock().unwrap().first(),
            Some(&GraphEvent::Destructing { node: a })
        );
    }

    #[test]
    fn destroy_clears_one_sided_references() {
        let mut graph = Graph::new();
        let a = dynamic(&mut graph);
        let b = filter(&mut graph);
        let c = dynamic(&mut graph);
        assert!(graph.connect_input_one_sided(b, 0, a));
        assert!(graph.connect_input_with(c, 0, Some(a), LinkOptions::one_sided()));
        let log = recorder(&mut graph, b);

        assert!(graph.destroy(a));
        assert!(!graph.contains(a));
        assert_eq!(graph.node(b).unwrap().input(0), None);
        assert_eq!(graph.node(b).unwrap().number_of_inputs(), 1);
        assert!(graph.node(c).unwrap().inputs().is_empty());
        assert!(matches!(
            &log.lock().unwrap()[0],
            GraphEvent::Disconnected(e) if e.old == Some(a)
        ));
        for id in graph.node_ids() {
            let node = graph.node(id).unwrap();
            assert!(node.inputs().connected().all(|peer| graph.contains(peer)));
            assert!(node.outputs().connected().all(|peer| graph.contains(peer)));
        }
    }

    #[test]
    fn set_id_rewrites_one_sided_references() {
        let mut graph = Graph::new();
        let a = dynamic(&mut graph);
        let b = filter(&mut graph);
        graph.connect_input_one_sided(b, 0, a);

        let renamed = registry::new_id();
        graph.set_id(a, renamed).unwrap();
        assert_eq!(graph.node(b).unwrap().input(0), Some(renamed));
    }

    #[test]
    fn fresh_ids_never_reuse_a_restored_top_id() {
        let mut graph = Graph::new();
        let kind = Box::new(GenericKind::new("Reader", PortLayout::dynamic()));
        let top = graph.add_boxed_with_id(NodeId(i64::MAX), kind).unwrap();
        let fresh = dynamic(&mut graph);

        assert_ne!(fresh, top);
        assert_eq!(graph.node(top).unwrap().type_name(), "Reader");
        assert_eq!(graph.node(fresh).unwrap().type_name(), "Combiner");
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn negative_ids_other_than_the_sentinel_can_be_restored() {
        let mut graph = Graph::new();
        let kind = Box::new(GenericKind::new("Reader", PortLayout::dynamic()));
        assert_eq!(graph.add_boxed_with_id(NodeId(-5), kind).unwrap(), NodeId(-5));
        let kind = Box::new(GenericKind::new("Reader", PortLayout::dynamic()));
        assert!(matches!(
            graph.add_boxed_with_id(NodeId::INVALID, kind),
            Err(CoreError::InvalidId { .. })
        ));
    }

    #[test]
    fn connect_input_list_replaces_every_slot() {
        let mut graph = Graph::new();
        let old = dynamic(&mut graph);
        let a = dynamic(&mut graph);
        let b = dynamic(&mut graph);
        let mix = dynamic(&mut graph);
        graph.connect_input(mix, old);

        assert!(graph.connect_input_list(mix, &[Some(a), None, Some(b)]));
        assert_eq!(graph.node(mix).unwrap().inputs().slots(), &[Some(a), None, Some(b)]);
        assert!(graph.node(old).unwrap().outputs().is_empty());
        assert_symmetric(&graph);

        let blend = graph.add_node(GenericKind::new("Blend", PortLayout::fixed(2, 1)));
        assert!(graph.connect_input_list(blend, &[Some(b)]));
        assert_eq!(graph.node(blend).unwrap().inputs().slots(), &[Some(b), None]);
    }

    #[test]
    fn refused_input_list_changes_nothing() {
        let mut graph = Graph::new();
        let a = dynamic(&mut graph);
        let sink = graph.add_node(GenericKind::new("Sink", PortLayout::fixed(1, 0)));
        let b = graph.add_node(GenericKind::new("Blend", PortLayout::fixed(2, 1)));
        graph.connect_input_at(b, 0, Some(a));

        assert!(!graph.connect_input_list(b, &[Some(a), Some(sink)]));
        assert!(!graph.connect_input_list(b, &[Some(a), Some(a), Some(a)]));
        assert!(!graph.connect_input_list(b, &[Some(NodeId(-7))]));
        assert_eq!(graph.node(b).unwrap().inputs().slots(), &[Some(a), None]);
        assert_symmetric(&graph);
    }

    #[test]
    fn connect_output_list_rewires_downstream() {
        let mut graph = Graph::new();
        let source = dynamic(&mut graph);
        let old = filter(&mut graph);
        let x = filter(&mut graph);
        let y = dynamic(&mut graph);
        graph.connect_input_at(old, 0, Some(source));

        assert!(graph.connect_output_list(source, &[x, y, x]));
        assert_eq!(graph.node(source).unwrap().outputs().slots(), &[Some(x), Some(y)]);
        assert_eq!(graph.node(old).unwrap().input(0), None);
        assert_eq!(graph.node(x).unwrap().input(0), Some(source));
        assert_symmetric(&graph);

        let sink = graph.add_node(GenericKind::new("Sink", PortLayout::fixed(0, 0)));
        assert!(!graph.connect_output_list(source, &[sink]));
        assert_eq!(graph.node(source).unwrap().outputs().len(), 2);
    }

    #[test]
    fn list_disconnects_report_what_was_linked() {
        let mut graph = Graph::new();
        let a = dynamic(&mut graph);
        let b = dynamic(&mut graph);
        let c = dynamic(&mut graph);
        let mix = dynamic(&mut graph);
        graph.connect_input(mix, a);
        graph.connect_input(mix, b);

        assert_eq!(graph.disconnect_inputs(mix, &[b, c]), vec![b]);
        assert_eq!(graph.node(mix).unwrap().inputs().slots(), &[Some(a)]);
        assert_eq!(graph.disconnect_outputs(a, &[mix]), vec![mix]);
        assert!(graph.node(mix).unwrap().inputs().is_empty());
        assert_symmetric(&graph);
    }

    #[test]
    fn restored_id_collision_is_an_error() {
        let mut graph = Graph::new();
        let a = dynamic(&mut graph);
        let kind = Box::new(GenericKind::new("Filter", PortLayout::dynamic()));
        assert!(matches!(
            graph.add_boxed_with_id(a, kind),
            Err(CoreError::DuplicateId { .. })
        ));
    }
}
