//! Graph events and the per-node subscriber table.
//!
//! Listeners are delivered events synchronously, in subscription order, and
//! never see the graph itself: they can record what happened but cannot
//! mutate the graph from inside delivery. The one subscriber that does need
//! to mutate, a container watching its child, does so by queueing a
//! [`Deferred`] action that the graph drains once the triggering operation
//! has finished with its own bookkeeping.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use crate::id::{ListenerId, NodeId};
use crate::node::PortDirection;

/// Payload of a connect or disconnect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionEvent {
    /// The node whose port list changed.
    pub node: NodeId,
    pub direction: PortDirection,
    /// Slot index on `node`, when a single slot is involved.
    pub index: Option<usize>,
    /// What the slot held before.
    pub old: Option<NodeId>,
    /// What the slot holds now.
    pub new: Option<NodeId>,
}

/// Something that happened to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphEvent {
    /// The node is about to be destroyed. Fired before any teardown.
    Destructing { node: NodeId },
    Connected(ConnectionEvent),
    Disconnected(ConnectionEvent),
    /// A property changed, or a container is rebroadcasting a change in
    /// one of its children.
    PropertyChanged { node: NodeId, name: Option<String> },
}

impl GraphEvent {
    /// The node the event is about.
    pub fn source(&self) -> NodeId {
        match self {
            GraphEvent::Destructing { node } | GraphEvent::PropertyChanged { node, .. } => *node,
            GraphEvent::Connected(event) | GraphEvent::Disconnected(event) => event.node,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            GraphEvent::Destructing { .. } => EventKind::Destructing,
            GraphEvent::Connected(_) => EventKind::Connected,
            GraphEvent::Disconnected(_) => EventKind::Disconnected,
            GraphEvent::PropertyChanged { .. } => EventKind::PropertyChanged,
        }
    }

    fn is_input_connection(&self) -> bool {
        match self {
            GraphEvent::Connected(event) | GraphEvent::Disconnected(event) => {
                event.direction == PortDirection::Input
            }
            _ => false,
        }
    }
}

/// Discriminant of [`GraphEvent`], handy for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Destructing,
    Connected,
    Disconnected,
    PropertyChanged,
}

/// Receives events fired on the node it is subscribed to.
///
/// Any `FnMut(&GraphEvent) + Send` closure is a listener.
pub trait NodeListener: Send {
    fn on_event(&mut self, event: &GraphEvent);
}

impl<F> NodeListener for F
where
    F: FnMut(&GraphEvent) + Send,
{
    fn on_event(&mut self, event: &GraphEvent) {
        self(event)
    }
}

/// Graph mutation requested during delivery, applied after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Deferred {
    /// Drop `child` from `container`'s child set.
    DetachChild { container: NodeId, child: NodeId },
    /// Tell the container's outputs that `child` changed.
    Rebroadcast { container: NodeId, child: NodeId },
}

enum Subscriber {
    Listener(Box<dyn NodeListener>),
    ChildWatch { container: NodeId },
}

struct Subscription {
    id: ListenerId,
    subscriber: Subscriber,
}

/// Ordered subscribers per node.
#[derive(Default)]
pub(crate) struct ListenerTable {
    entries: HashMap<NodeId, Vec<Subscription>>,
    next_id: u64,
}

impl fmt::Debug for ListenerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerTable")
            .field("nodes", &self.entries.len())
            .field("subscriptions", &self.total())
            .finish()
    }
}

impl ListenerTable {
    fn next_listener_id(&mut self) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn add_listener(
        &mut self,
        node: NodeId,
        listener: Box<dyn NodeListener>,
    ) -> ListenerId {
        let id = self.next_listener_id();
        self.entries.entry(node).or_default().push(Subscription {
            id,
            subscriber: Subscriber::Listener(listener),
        });
        id
    }

    /// Installs the watcher `container` keeps on `child`. At most one per pair.
    pub(crate) fn add_watch(&mut self, child: NodeId, container: NodeId) {
        if self.has_watch(child, container) {
            return;
        }
        let id = self.next_listener_id();
        self.entries.entry(child).or_default().push(Subscription {
            id,
            subscriber: Subscriber::ChildWatch { container },
        });
    }

    pub(crate) fn has_watch(&self, child: NodeId, container: NodeId) -> bool {
        self.entries.get(&child).is_some_and(|subs| {
            subs.iter().any(|sub| {
                matches!(sub.subscriber, Subscriber::ChildWatch { container: c } if c == container)
            })
        })
    }

    pub(crate) fn remove_listener(&mut self, node: NodeId, id: ListenerId) -> bool {
        let Some(subs) = self.entries.get_mut(&node) else {
            return false;
        };
        let before = subs.len();
        subs.retain(|sub| {
            sub.id != id || !matches!(sub.subscriber, Subscriber::Listener(_))
        });
        let removed = subs.len() != before;
        if subs.is_empty() {
            self.entries.remove(&node);
        }
        removed
    }

    pub(crate) fn remove_watch(&mut self, child: NodeId, container: NodeId) -> bool {
        let Some(subs) = self.entries.get_mut(&child) else {
            return false;
        };
        let before = subs.len();
        subs.retain(|sub| {
            !matches!(sub.subscriber, Subscriber::ChildWatch { container: c } if c == container)
        });
        let removed = subs.len() != before;
        if subs.is_empty() {
            self.entries.remove(&child);
        }
        removed
    }

    /// Drops every subscription on `node`. Returns how many there were.
    pub(crate) fn remove_all(&mut self, node: NodeId) -> usize {
        self.entries.remove(&node).map_or(0, |subs| subs.len())
    }

    /// Moves `old`'s subscriptions to `new`.
    pub(crate) fn rekey(&mut self, old: NodeId, new: NodeId) {
        if let Some(subs) = self.entries.remove(&old) {
            self.entries.entry(new).or_default().extend(subs);
        }
    }

    /// Points `child`'s watcher for container `old` at container `new`.
    pub(crate) fn retarget_watch(&mut self, child: NodeId, old: NodeId, new: NodeId) {
        if let Some(subs) = self.entries.get_mut(&child) {
            for sub in subs.iter_mut() {
                if let Subscriber::ChildWatch { container } = &mut sub.subscriber {
                    if *container == old {
                        *container = new;
                    }
                }
            }
        }
    }

    /// Application listeners on `node`, watchers excluded.
    pub(crate) fn listener_count(&self, node: NodeId) -> usize {
        self.entries.get(&node).map_or(0, |subs| {
            subs.iter()
                .filter(|sub| matches!(sub.subscriber, Subscriber::Listener(_)))
                .count()
        })
    }

    /// Every subscription on every node, watchers included.
    pub(crate) fn total(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Delivers `event` to `node`'s subscribers in order.
    pub(crate) fn deliver(
        &mut self,
        node: NodeId,
        event: &GraphEvent,
        deferred: &mut VecDeque<Deferred>,
    ) {
        let Some(subs) = self.entries.get_mut(&node) else {
            return;
        };
        for sub in subs.iter_mut() {
            match &mut sub.subscriber {
                Subscriber::Listener(listener) => listener.on_event(event),
                Subscriber::ChildWatch { container } => {
                    watch_reaction(*container, node, event, deferred);
                }
            }
        }
    }
}

/// What a container does when its child `child` reports `event`.
///
/// Events that merely pass through the child (another node's identity as
/// source) are ignored. Property changes are never rebroadcast, which keeps
/// nested containers from echoing each other's rebroadcasts forever.
fn watch_reaction(
    container: NodeId,
    child: NodeId,
    event: &GraphEvent,
    deferred: &mut VecDeque<Deferred>,
) {
    if event.source() != child {
        return;
    }
    match event {
        GraphEvent::Destructing { .. } => {
            deferred.push_back(Deferred::DetachChild { container, child });
            deferred.push_back(Deferred::Rebroadcast { container, child });
        }
        _ if event.is_input_connection() => {
            deferred.push_back(Deferred::Rebroadcast { container, child });
        }
        _ => {}
    }
}
