//! Container operations on [`Graph`].
//!
//! A container is any node whose kind reports
//! [`is_container`](crate::kind::NodeKind::is_container). It owns an
//! insertion-ordered set of children and keeps a watcher subscription on
//! each of them. Every recursive walk here carries a visited set, so a
//! malformed ownership cycle terminates instead of looping.

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::error::CoreError;
use crate::graph::Graph;
use crate::id::NodeId;
use crate::node::Node;

impl Graph {
    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    /// Makes `node` a child of `container`.
    ///
    /// Already being a child is a successful no-op. Refuses when `node` is
    /// owned by another container, is `container` itself, or (with
    /// [`GraphConfig::ancestry_check`](crate::config::GraphConfig)) is one of
    /// `container`'s ancestors.
    pub fn add_child(&mut self, container: NodeId, node: NodeId) -> bool {
        if container == node {
            trace!(container = %container, "add_child refused: node is the container");
            return false;
        }
        let Some(parent) = self.nodes.get(&container) else {
            return false;
        };
        if !parent.is_container() {
            trace!(container = %container, "add_child refused: not a container");
            return false;
        }
        if parent.has_child(node) {
            return true;
        }
        let Some(child) = self.nodes.get(&node) else {
            return false;
        };
        if let Some(owner) = child.owner() {
            if owner != container {
                trace!(node = %node, owner = %owner, "add_child refused: owned elsewhere");
                return false;
            }
        }
        if self.config().ancestry_check && self.is_ancestor(node, container) {
            trace!(node = %node, container = %container, "add_child refused: would create ownership cycle");
            return false;
        }

        if let Some(child) = self.nodes.get_mut(&node) {
            child.owner = Some(container);
        }
        if let Some(children) = self.nodes.get_mut(&container).and_then(|c| c.children.as_mut()) {
            children.insert(node);
        }
        self.listeners.add_watch(node, container);
        debug!(container = %container, node = %node, "child added");
        true
    }

    /// Removes `node` from `container`'s child set without destroying or
    /// disconnecting it. Returns `false` if it was not a child.
    pub fn remove_child(&mut self, container: NodeId, node: NodeId) -> bool {
        let removed = self.detach_child(container, node);
        self.settle();
        removed
    }

    pub(crate) fn detach_child(&mut self, container: NodeId, node: NodeId) -> bool {
        let Some(children) = self.nodes.get_mut(&container).and_then(|c| c.children.as_mut())
        else {
            return false;
        };
        if !children.shift_remove(&node) {
            return false;
        }
        if let Some(child) = self.nodes.get_mut(&node) {
            if child.owner == Some(container) {
                child.owner = None;
                self.listeners.remove_watch(node, container);
            }
        }
        debug!(container = %container, node = %node, "child removed");
        true
    }

    /// Moves every child of `source` into `destination`, in order.
    ///
    /// A child `destination` refuses stays in `source`. Returns how many
    /// children moved.
    pub fn fill_container(&mut self, destination: NodeId, source: NodeId) -> usize {
        let mut moved = 0;
        for child in self.children(source) {
            if !self.detach_child(source, child) {
                continue;
            }
            if self.add_child(destination, child) {
                moved += 1;
            } else {
                self.add_child(source, child);
            }
        }
        self.settle();
        moved
    }

    /// Destroys every child of `container` and clears its child set.
    ///
    /// Watchers are detached first, so no child's destruction reaches back
    /// into the set being cleared. Returns how many children were destroyed.
    pub fn delete_all_children(&mut self, container: NodeId) -> usize {
        let destroyed = self.clear_children(container);
        self.settle();
        destroyed
    }

    pub(crate) fn clear_children(&mut self, container: NodeId) -> usize {
        let children = self.children(container);
        for child in &children {
            self.listeners.remove_watch(*child, container);
        }
        for child in &children {
            self.destroy_node(*child);
        }
        if let Some(set) = self.nodes.get_mut(&container).and_then(|c| c.children.as_mut()) {
            set.clear();
        }
        children.len()
    }

    fn is_ancestor(&self, candidate: NodeId, node: NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut current = self.owner(node);
        while let Some(owner) = current {
            if owner == candidate {
                return true;
            }
            if !visited.insert(owner) {
                return false;
            }
            current = self.owner(owner);
        }
        false
    }

    // -----------------------------------------------------------------------
    // Positional access
    // -----------------------------------------------------------------------

    /// Child ids in insertion order. Empty if `container` is not a container.
    pub fn children(&self, container: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&container)
            .map(|c| c.children().collect())
            .unwrap_or_default()
    }

    pub fn child(&self, container: NodeId, index: usize) -> Option<NodeId> {
        self.nodes.get(&container)?.child_at(index)
    }

    /// Number of children, or of all descendants when `recurse` is set.
    pub fn count(&self, container: NodeId, recurse: bool) -> usize {
        let mut visited = HashSet::new();
        self.count_in(container, recurse, &mut visited)
    }

    fn count_in(&self, container: NodeId, recurse: bool, visited: &mut HashSet<NodeId>) -> usize {
        if !visited.insert(container) {
            return 0;
        }
        let children = self.children(container);
        let mut total = children.len();
        if recurse {
            for child in children {
                if self.is_container(child) {
                    total += self.count_in(child, recurse, visited);
                }
            }
        }
        total
    }

    // -----------------------------------------------------------------------
    // Search
    // -----------------------------------------------------------------------

    /// Looks for `id` among `container`'s children, then depth-first through
    /// child containers when `recurse` is set.
    pub fn find_object(&self, container: NodeId, id: NodeId, recurse: bool) -> Option<NodeId> {
        let mut visited = HashSet::new();
        self.find_object_in(container, id, recurse, &mut visited)
    }

    fn find_object_in(
        &self,
        container: NodeId,
        id: NodeId,
        recurse: bool,
        visited: &mut HashSet<NodeId>,
    ) -> Option<NodeId> {
        if !visited.insert(container) {
            return None;
        }
        let parent = self.nodes.get(&container)?;
        if parent.has_child(id) {
            return Some(id);
        }
        if !recurse {
            return None;
        }
        for child in self.children(container) {
            if self.is_container(child) {
                if let Some(found) = self.find_object_in(child, id, recurse, visited) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// First child matching `predicate`. All local children are checked
    /// before descending.
    pub fn find_first_of_type(
        &self,
        container: NodeId,
        predicate: impl Fn(&Node) -> bool,
        recurse: bool,
    ) -> Option<NodeId> {
        let mut visited = HashSet::new();
        self.find_first_in(container, &predicate, recurse, &mut visited)
    }

    fn find_first_in(
        &self,
        container: NodeId,
        predicate: &dyn Fn(&Node) -> bool,
        recurse: bool,
        visited: &mut HashSet<NodeId>,
    ) -> Option<NodeId> {
        if !visited.insert(container) {
            return None;
        }
        let children = self.children(container);
        let local = children
            .iter()
            .copied()
            .find(|child| self.nodes.get(child).is_some_and(predicate));
        if local.is_some() || !recurse {
            return local;
        }
        for child in children {
            if self.is_container(child) {
                if let Some(found) = self.find_first_in(child, predicate, recurse, visited) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Every child matching `predicate`: local matches first, then matches
    /// from each child container in order.
    pub fn find_all_of_type(
        &self,
        container: NodeId,
        predicate: impl Fn(&Node) -> bool,
        recurse: bool,
    ) -> Vec<NodeId> {
        let mut visited = HashSet::new();
        let mut found = Vec::new();
        self.find_all_in(container, &predicate, recurse, &mut visited, &mut found);
        found
    }

    fn find_all_in(
        &self,
        container: NodeId,
        predicate: &dyn Fn(&Node) -> bool,
        recurse: bool,
        visited: &mut HashSet<NodeId>,
        found: &mut Vec<NodeId>,
    ) {
        if !visited.insert(container) {
            return;
        }
        let children = self.children(container);
        found.extend(
            children
                .iter()
                .copied()
                .filter(|child| self.nodes.get(child).is_some_and(predicate)),
        );
        if recurse {
            for child in children {
                if self.is_container(child) {
                    self.find_all_in(child, predicate, recurse, visited, found);
                }
            }
        }
    }

    pub fn find_first_of_type_name(
        &self,
        container: NodeId,
        type_name: &str,
        recurse: bool,
    ) -> Option<NodeId> {
        self.find_first_of_type(container, |node| node.type_name() == type_name, recurse)
    }

    pub fn find_all_of_type_name(
        &self,
        container: NodeId,
        type_name: &str,
        recurse: bool,
    ) -> Vec<NodeId> {
        self.find_all_of_type(container, |node| node.type_name() == type_name, recurse)
    }

    // -----------------------------------------------------------------------
    // Bulk identity
    // -----------------------------------------------------------------------

    /// Issues a fresh identifier to every descendant of `container`.
    ///
    /// Child containers are handled first, each recursively before being
    /// renamed itself; then the remaining children. Positions are kept.
    /// `container` keeps its own identifier.
    pub fn reassign_ids_recursively(&mut self, container: NodeId) -> Result<(), CoreError> {
        if !self.contains(container) {
            return Err(CoreError::NodeNotFound { id: container });
        }
        if !self.is_container(container) {
            return Err(CoreError::NotAContainer { id: container });
        }
        let mut visited = HashSet::new();
        self.reassign_in(container, &mut visited)?;
        self.settle();
        Ok(())
    }

    fn reassign_in(&mut self, container: NodeId, visited: &mut HashSet<NodeId>) -> Result<(), CoreError> {
        if !visited.insert(container) {
            return Ok(());
        }
        let (containers, leaves): (Vec<NodeId>, Vec<NodeId>) = self
            .children(container)
            .into_iter()
            .partition(|child| self.is_container(*child));

        for child in containers {
            self.reassign_in(child, visited)?;
            let fresh = self.fresh_id().ok_or(CoreError::IdSpaceExhausted)?;
            self.set_id(child, fresh)?;
            visited.insert(fresh);
        }
        for child in leaves {
            let fresh = self.fresh_id().ok_or(CoreError::IdSpaceExhausted)?;
            self.set_id(child, fresh)?;
        }
        Ok(())
    }
}
