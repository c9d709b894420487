//! Live view model of the routing graph.
//!
//! `GraphModel` holds the latest accepted snapshot as `ViewNode`s and
//! `ViewEdge`s. A node's position lives inside its `ViewNode`, so removing
//! the node removes the position with it; nothing is cached past the
//! node's lifetime.

use std::collections::BTreeMap;

use egui::Pos2;
use thiserror::Error;

use crate::types::{Link, LinkId, Node, NodeId, PortDirection, PortId};

/// Stable identity of a drawn element. Assigned once when the view
/// element is created and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderKey(pub u64);

/// A node plus its locally held graph-space position.
#[derive(Debug, Clone)]
pub struct ViewNode {
    pub node: Node,
    /// `None` until the layout engine places the node.
    pub position: Option<Pos2>,
    key: RenderKey,
}

impl ViewNode {
    pub fn id(&self) -> NodeId {
        self.node.id
    }

    pub fn key(&self) -> RenderKey {
        self.key
    }

    /// Position, or the origin for a node the layout has not reached yet.
    pub fn position_or_origin(&self) -> Pos2 {
        self.position.unwrap_or(Pos2::ZERO)
    }
}

/// A resolved link.
#[derive(Debug, Clone)]
pub struct ViewEdge {
    pub link: Link,
    key: RenderKey,
}

impl ViewEdge {
    pub fn id(&self) -> LinkId {
        self.link.id
    }

    pub fn key(&self) -> RenderKey {
        self.key
    }
}

/// Why a link cannot be shown against the current node/port set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("node {node} has no port {port}")]
    UnknownPort { node: NodeId, port: PortId },

    #[error("port {port} on node {node} is not an {expected:?} port")]
    WrongDirection {
        node: NodeId,
        port: PortId,
        expected: PortDirection,
    },

    #[error("link connects node {0} to itself")]
    SelfLink(NodeId),
}

/// Canonical in-memory graph plus per-node view state.
#[derive(Debug, Default)]
pub struct GraphModel {
    nodes: BTreeMap<NodeId, ViewNode>,
    edges: BTreeMap<LinkId, ViewEdge>,
    next_key: u64,
    revision: u64,
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bumped on every mutation; the renderer rebuilds its scene when it
    /// sees a new value.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&ViewNode> {
        self.nodes.get(&id)
    }

    pub fn edge(&self, id: LinkId) -> Option<&ViewEdge> {
        self.edges.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ViewNode> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &ViewEdge> {
        self.edges.values()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn edge_ids(&self) -> impl Iterator<Item = LinkId> + '_ {
        self.edges.keys().copied()
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn contains_edge(&self, id: LinkId) -> bool {
        self.edges.contains_key(&id)
    }

    pub fn position(&self, id: NodeId) -> Option<Pos2> {
        self.nodes.get(&id).and_then(|n| n.position)
    }

    /// Number of nodes that already have a position entry.
    pub fn positioned_count(&self) -> usize {
        self.nodes.values().filter(|n| n.position.is_some()).count()
    }

    /// Move a node. Returns `false` if the node no longer exists.
    pub fn set_position(&mut self, id: NodeId, position: Pos2) -> bool {
        match self.nodes.get_mut(&id) {
            Some(view) => {
                if view.position != Some(position) {
                    view.position = Some(position);
                    self.revision += 1;
                }
                true
            }
            None => false,
        }
    }

    /// Insert a node without a position. An existing entry is left alone.
    pub(crate) fn insert_node(&mut self, node: Node) -> RenderKey {
        if let Some(existing) = self.nodes.get(&node.id) {
            return existing.key;
        }
        let key = self.alloc_key();
        self.nodes.insert(
            node.id,
            ViewNode {
                node,
                position: None,
                key,
            },
        );
        self.revision += 1;
        key
    }

    /// Replace a node's data in place, keeping its position and key.
    pub(crate) fn replace_node_data(&mut self, node: Node) -> bool {
        match self.nodes.get_mut(&node.id) {
            Some(view) => {
                view.node = node;
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    /// Remove a node together with its position entry.
    pub(crate) fn remove_node(&mut self, id: NodeId) -> Option<ViewNode> {
        let removed = self.nodes.remove(&id);
        if removed.is_some() {
            self.revision += 1;
        }
        removed
    }

    /// Insert an already resolved edge.
    pub(crate) fn insert_edge(&mut self, link: Link) -> RenderKey {
        if let Some(existing) = self.edges.get(&link.id) {
            return existing.key;
        }
        let key = self.alloc_key();
        self.edges.insert(link.id, ViewEdge { link, key });
        self.revision += 1;
        key
    }

    /// Replace an edge's endpoints in place, keeping its key.
    pub(crate) fn replace_edge_data(&mut self, link: Link) -> bool {
        match self.edges.get_mut(&link.id) {
            Some(edge) => {
                edge.link = link;
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    pub(crate) fn remove_edge(&mut self, id: LinkId) -> Option<ViewEdge> {
        let removed = self.edges.remove(&id);
        if removed.is_some() {
            self.revision += 1;
        }
        removed
    }

    /// Check that both ends of `link` exist with the right directions
    /// on two different nodes.
    pub fn resolve_link(&self, link: &Link) -> Result<(), ResolveError> {
        check_endpoints(
            link,
            |id| self.nodes.get(&id).map(|v| &v.node),
        )
    }

    fn alloc_key(&mut self) -> RenderKey {
        self.next_key += 1;
        RenderKey(self.next_key)
    }
}

/// Endpoint validation shared by the model and the in-memory server.
pub fn check_endpoints<'a>(
    link: &Link,
    lookup: impl Fn(NodeId) -> Option<&'a Node>,
) -> Result<(), ResolveError> {
    if link.output_node == link.input_node {
        return Err(ResolveError::SelfLink(link.output_node));
    }
    check_port(&lookup, link.output_node, link.output_port, PortDirection::Output)?;
    check_port(&lookup, link.input_node, link.input_port, PortDirection::Input)
}

fn check_port<'a>(
    lookup: &impl Fn(NodeId) -> Option<&'a Node>,
    node_id: NodeId,
    port_id: PortId,
    expected: PortDirection,
) -> Result<(), ResolveError> {
    let node = lookup(node_id).ok_or(ResolveError::UnknownNode(node_id))?;
    let port = node.port(port_id).ok_or(ResolveError::UnknownPort {
        node: node_id,
        port: port_id,
    })?;
    if port.direction != expected {
        return Err(ResolveError::WrongDirection {
            node: node_id,
            port: port_id,
            expected,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NodeRole, Port};

    fn source() -> Node {
        Node::new(1, "Mic", NodeRole::Device).with_port(Port::new(10, "out", PortDirection::Output))
    }

    fn sink() -> Node {
        Node::new(2, "Speakers", NodeRole::Device).with_port(Port::new(20, "in", PortDirection::Input))
    }

    #[test]
    fn test_remove_node_drops_position() {
        let mut model = GraphModel::new();
        model.insert_node(source());
        assert!(model.set_position(NodeId(1), Pos2::new(5.0, 5.0)));
        assert!(model.remove_node(NodeId(1)).is_some());

        assert_eq!(model.position(NodeId(1)), None);
        assert!(!model.set_position(NodeId(1), Pos2::ZERO));
        assert_eq!(model.positioned_count(), 0);
    }

    #[test]
    fn test_replace_keeps_key_and_position() {
        let mut model = GraphModel::new();
        let key = model.insert_node(source());
        model.set_position(NodeId(1), Pos2::new(3.0, 4.0));

        let updated = source().with_port(Port::new(11, "out2", PortDirection::Output));
        assert!(model.replace_node_data(updated));

        let view = model.node(NodeId(1)).unwrap();
        assert_eq!(view.key(), key);
        assert_eq!(view.position, Some(Pos2::new(3.0, 4.0)));
        assert_eq!(view.node.ports.len(), 2);
    }

    #[test]
    fn test_keys_are_never_reused() {
        let mut model = GraphModel::new();
        let first = model.insert_node(source());
        model.remove_node(NodeId(1));
        let second = model.insert_node(source());
        assert_ne!(first, second);
    }

    #[test]
    fn test_resolve_link() {
        let mut model = GraphModel::new();
        model.insert_node(source());
        model.insert_node(sink());

        assert_eq!(model.resolve_link(&Link::new(1, (1, 10), (2, 20))), Ok(()));
        assert_eq!(
            model.resolve_link(&Link::new(2, (1, 10), (3, 20))),
            Err(ResolveError::UnknownNode(NodeId(3)))
        );
        assert_eq!(
            model.resolve_link(&Link::new(3, (1, 99), (2, 20))),
            Err(ResolveError::UnknownPort {
                node: NodeId(1),
                port: PortId(99)
            })
        );
        assert!(matches!(
            model.resolve_link(&Link::new(4, (2, 20), (1, 10))),
            Err(ResolveError::WrongDirection { .. })
        ));
        assert_eq!(
            model.resolve_link(&Link::new(5, (1, 10), (1, 10))),
            Err(ResolveError::SelfLink(NodeId(1)))
        );
    }

    #[test]
    fn test_revision_bumps_only_on_change() {
        let mut model = GraphModel::new();
        model.insert_node(source());
        model.set_position(NodeId(1), Pos2::new(1.0, 1.0));
        let rev = model.revision();
        model.set_position(NodeId(1), Pos2::new(1.0, 1.0));
        assert_eq!(model.revision(), rev);
        model.insert_node(source());
        assert_eq!(model.revision(), rev);
    }
}
