//! Snapshot reconciliation.
//!
//! Merges a full authoritative snapshot into the live [`GraphModel`] with the
//! smallest possible mutation:
//!
//! 1. nodes gone from the snapshot are removed (with their positions)
//! 2. nodes new to the snapshot are added unplaced, then laid out in one batch
//! 3. links gone from the snapshot are removed
//! 4. links new to the snapshot are resolved against the current node/port
//!    set and added, or dropped if they do not resolve
//!
//! Ids present on both sides keep their position, render key and any gesture
//! state. If their content changed (a node gained a port, say) the data is
//! swapped in place and links touching them are re-validated.
//!
//! Snapshots are fed through a [`SnapshotQueue`]: only the newest pending
//! snapshot is ever applied, older ones are coalesced away.

use std::collections::{HashMap, HashSet};

use crate::editor::layout::{unpositioned, LayoutEngine};
use crate::editor::model::GraphModel;
use crate::types::{Link, LinkId, Node, NodeId, Snapshot};

/// What a reconciliation pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub nodes_added: usize,
    pub nodes_removed: usize,
    pub nodes_updated: usize,
    pub nodes_placed: usize,
    pub links_added: usize,
    pub links_removed: usize,
    pub links_updated: usize,
    /// Links in the snapshot that could not be resolved
    pub links_dropped: usize,
}

impl ReconcileReport {
    /// True when the pass left the model untouched.
    pub fn is_noop(&self) -> bool {
        self.nodes_added == 0
            && self.nodes_removed == 0
            && self.nodes_updated == 0
            && self.nodes_placed == 0
            && self.links_added == 0
            && self.links_removed == 0
            && self.links_updated == 0
    }
}

/// Apply `snapshot` to `model`.
///
/// `pinned` holds nodes under active pointer manipulation; the layout
/// engine never repositions them during this pass.
pub fn reconcile(
    model: &mut GraphModel,
    layout: &mut LayoutEngine,
    snapshot: Snapshot,
    pinned: &HashSet<NodeId>,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    let Snapshot { nodes, links } = snapshot;

    // Node ids are unique per snapshot; keep the first occurrence if the
    // server ever breaks that.
    let mut incoming: HashMap<NodeId, Node> = HashMap::with_capacity(nodes.len());
    let mut incoming_order: Vec<NodeId> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if incoming.contains_key(&node.id) {
            tracing::warn!("Snapshot repeats node {}, ignoring duplicate", node.id);
            continue;
        }
        incoming_order.push(node.id);
        incoming.insert(node.id, node);
    }

    // 1. removed nodes
    let removed_nodes: Vec<NodeId> = model
        .node_ids()
        .filter(|id| !incoming.contains_key(id))
        .collect();
    for id in &removed_nodes {
        model.remove_node(*id);
        report.nodes_removed += 1;
    }

    // Same id, different content: swap data in place.
    let mut changed_nodes: HashSet<NodeId> = removed_nodes.into_iter().collect();
    for id in &incoming_order {
        let Some(view) = model.node(*id) else {
            continue;
        };
        let node = &incoming[id];
        if view.node != *node {
            model.replace_node_data(node.clone());
            changed_nodes.insert(*id);
            report.nodes_updated += 1;
        }
    }

    // 2. added nodes, then one layout batch
    let mut added_nodes = Vec::new();
    for id in incoming_order {
        if model.contains_node(id) {
            continue;
        }
        if let Some(node) = incoming.remove(&id) {
            model.insert_node(node);
            added_nodes.push(id);
            report.nodes_added += 1;
        }
    }
    // Nodes a gesture kept from being placed earlier go after the new ones.
    let deferred: Vec<NodeId> = unpositioned(model)
        .into_iter()
        .filter(|id| !added_nodes.contains(id))
        .collect();
    let mut to_place = added_nodes;
    to_place.extend(deferred);
    if !to_place.is_empty() {
        report.nodes_placed = layout.place(model, &to_place, pinned);
    }

    // 3. removed links
    let mut incoming_links: HashMap<LinkId, Link> = HashMap::with_capacity(links.len());
    let mut link_order: Vec<LinkId> = Vec::with_capacity(links.len());
    for link in links {
        if incoming_links.contains_key(&link.id) {
            tracing::warn!("Snapshot repeats link {}, ignoring duplicate", link.id);
            continue;
        }
        link_order.push(link.id);
        incoming_links.insert(link.id, link);
    }

    let removed_links: Vec<LinkId> = model
        .edge_ids()
        .filter(|id| !incoming_links.contains_key(id))
        .collect();
    for id in removed_links {
        model.remove_edge(id);
        report.links_removed += 1;
    }

    // Retained links: re-resolve only if they changed or touch a changed node.
    let retained: Vec<LinkId> = model.edge_ids().collect();
    for id in retained {
        let Some(edge) = model.edge(id) else {
            continue;
        };
        let incoming = &incoming_links[&id];
        let content_changed = edge.link != *incoming;
        let endpoint_changed = changed_nodes.contains(&incoming.output_node)
            || changed_nodes.contains(&incoming.input_node)
            || changed_nodes.contains(&edge.link.output_node)
            || changed_nodes.contains(&edge.link.input_node);
        if !content_changed && !endpoint_changed {
            continue;
        }

        match model.resolve_link(incoming) {
            Ok(()) if content_changed => {
                model.replace_edge_data(incoming.clone());
                report.links_updated += 1;
            }
            Ok(()) => {}
            Err(err) => {
                tracing::debug!("Dropping link {}: {}", id, err);
                model.remove_edge(id);
                report.links_removed += 1;
                report.links_dropped += 1;
            }
        }
    }

    // 4. added links
    for id in link_order {
        if model.contains_edge(id) {
            continue;
        }
        let Some(link) = incoming_links.remove(&id) else {
            continue;
        };
        match model.resolve_link(&link) {
            Ok(()) => {
                model.insert_edge(link);
                report.links_added += 1;
            }
            Err(err) => {
                tracing::debug!("Dropping link {}: {}", id, err);
                report.links_dropped += 1;
            }
        }
    }

    if !report.is_noop() {
        tracing::debug!(?report, "Reconciled snapshot");
    }
    report
}

/// Latest-wins holding slot for snapshots awaiting reconciliation.
///
/// Delivery may outpace application; offering a snapshot while another is
/// pending replaces it. Applying drains the slot, so a pass never sees a
/// snapshot older than one it already applied.
#[derive(Debug, Default)]
pub struct SnapshotQueue {
    pending: Option<Snapshot>,
    applying: bool,
    coalesced: u64,
}

impl SnapshotQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a snapshot, discarding any older pending one.
    pub fn offer(&mut self, snapshot: Snapshot) {
        if self.pending.replace(snapshot).is_some() {
            self.coalesced += 1;
            tracing::trace!("Coalesced stale snapshot ({} total)", self.coalesced);
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Number of snapshots dropped in favour of newer ones.
    pub fn coalesced(&self) -> u64 {
        self.coalesced
    }

    /// Apply pending snapshots until none remain. Returns the report of the
    /// last pass, or `None` if nothing was pending or a pass is already
    /// running further up the stack.
    pub fn apply_pending(
        &mut self,
        model: &mut GraphModel,
        layout: &mut LayoutEngine,
        pinned: &HashSet<NodeId>,
    ) -> Option<ReconcileReport> {
        if self.applying {
            return None;
        }
        self.applying = true;
        let mut last = None;
        while let Some(snapshot) = self.pending.take() {
            last = Some(reconcile(model, layout, snapshot, pinned));
        }
        self.applying = false;
        last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NodeRole, Port, PortDirection};
    use egui::Pos2;
    use proptest::prelude::*;

    fn out_node(id: u32, port: u32) -> Node {
        Node::new(id, format!("src{id}"), NodeRole::Device)
            .with_port(Port::new(port, "out", PortDirection::Output))
    }

    fn in_node(id: u32, port: u32) -> Node {
        Node::new(id, format!("sink{id}"), NodeRole::Device)
            .with_port(Port::new(port, "in", PortDirection::Input))
    }

    fn apply(model: &mut GraphModel, layout: &mut LayoutEngine, snapshot: &Snapshot) -> ReconcileReport {
        reconcile(model, layout, snapshot.clone(), &HashSet::new())
    }

    fn two_node_snapshot() -> Snapshot {
        Snapshot {
            nodes: vec![out_node(1, 10), in_node(2, 20)],
            links: vec![Link::new(100, (1, 10), (2, 20))],
        }
    }

    #[test]
    fn test_first_pass_adds_everything() {
        let mut model = GraphModel::new();
        let mut layout = LayoutEngine::default();
        let report = apply(&mut model, &mut layout, &two_node_snapshot());

        assert_eq!(report.nodes_added, 2);
        assert_eq!(report.nodes_placed, 2);
        assert_eq!(report.links_added, 1);
        assert_eq!(model.node_count(), 2);
        assert_eq!(model.edge_count(), 1);
    }

    #[test]
    fn test_identical_snapshot_is_noop() {
        let mut model = GraphModel::new();
        let mut layout = LayoutEngine::default();
        let snapshot = two_node_snapshot();
        apply(&mut model, &mut layout, &snapshot);
        let revision = model.revision();

        let report = apply(&mut model, &mut layout, &snapshot);
        assert!(report.is_noop());
        assert_eq!(model.revision(), revision);
    }

    #[test]
    fn test_removed_node_loses_position_entry() {
        let mut model = GraphModel::new();
        let mut layout = LayoutEngine::default();
        apply(&mut model, &mut layout, &two_node_snapshot());

        let report = apply(
            &mut model,
            &mut layout,
            &Snapshot {
                nodes: vec![out_node(1, 10)],
                links: vec![],
            },
        );
        assert_eq!(report.nodes_removed, 1);
        assert_eq!(report.links_removed, 1);
        assert_eq!(model.position(NodeId(2)), None);
        assert!(!model.contains_node(NodeId(2)));
    }

    #[test]
    fn test_dangling_link_dropped_without_mutation() {
        let mut model = GraphModel::new();
        let mut layout = LayoutEngine::default();
        apply(&mut model, &mut layout, &two_node_snapshot());
        let revision = model.revision();

        let mut snapshot = two_node_snapshot();
        snapshot.links.push(Link::new(101, (1, 10), (9, 90)));
        snapshot.links.push(Link::new(102, (1, 77), (2, 20)));
        let report = apply(&mut model, &mut layout, &snapshot);

        assert_eq!(report.links_dropped, 2);
        assert!(report.is_noop());
        assert_eq!(model.revision(), revision);
        assert!(!model.contains_edge(LinkId(101)));
    }

    #[test]
    fn test_port_added_updates_node_in_place() {
        let mut model = GraphModel::new();
        let mut layout = LayoutEngine::default();
        apply(&mut model, &mut layout, &two_node_snapshot());
        model.set_position(NodeId(2), Pos2::new(400.0, 400.0));
        let key = model.node(NodeId(2)).unwrap().key();

        let mut snapshot = two_node_snapshot();
        snapshot.nodes[1] = in_node(2, 20).with_port(Port::new(21, "in2", PortDirection::Input));
        let report = apply(&mut model, &mut layout, &snapshot);

        assert_eq!(report.nodes_updated, 1);
        assert_eq!(report.nodes_placed, 0);
        let view = model.node(NodeId(2)).unwrap();
        assert_eq!(view.key(), key);
        assert_eq!(view.position, Some(Pos2::new(400.0, 400.0)));
        assert_eq!(view.node.ports.len(), 2);
        assert!(model.contains_edge(LinkId(100)));
    }

    #[test]
    fn test_port_removed_invalidates_retained_link() {
        let mut model = GraphModel::new();
        let mut layout = LayoutEngine::default();
        apply(&mut model, &mut layout, &two_node_snapshot());

        let mut snapshot = two_node_snapshot();
        snapshot.nodes[1] = Node::new(2, "sink2", NodeRole::Device);
        let report = apply(&mut model, &mut layout, &snapshot);

        assert_eq!(report.links_dropped, 1);
        assert!(!model.contains_edge(LinkId(100)));
    }

    #[test]
    fn test_pinned_new_node_is_placed_on_next_pass() {
        let mut model = GraphModel::new();
        let mut layout = LayoutEngine::default();
        let pinned: HashSet<_> = [NodeId(2)].into_iter().collect();
        let report = reconcile(&mut model, &mut layout, two_node_snapshot(), &pinned);

        assert_eq!(report.nodes_placed, 1);
        assert_eq!(model.position(NodeId(2)), None);

        // Gesture over: the same snapshot places the waiting node.
        let report = apply(&mut model, &mut layout, &two_node_snapshot());
        assert_eq!(report.nodes_placed, 1);
        assert_eq!(model.position(NodeId(2)), Some(Pos2::new(650.0, 50.0)));
        assert!(apply(&mut model, &mut layout, &two_node_snapshot()).is_noop());
    }

    #[test]
    fn test_queue_coalesces_to_latest() {
        let mut model = GraphModel::new();
        let mut layout = LayoutEngine::default();
        let mut queue = SnapshotQueue::new();

        queue.offer(two_node_snapshot());
        queue.offer(Snapshot {
            nodes: vec![out_node(5, 50)],
            links: vec![],
        });
        assert_eq!(queue.coalesced(), 1);

        let report = queue
            .apply_pending(&mut model, &mut layout, &HashSet::new())
            .unwrap();
        assert_eq!(report.nodes_added, 1);
        assert!(model.contains_node(NodeId(5)));
        assert!(!model.contains_node(NodeId(1)));
        assert!(!queue.has_pending());
        assert!(queue.apply_pending(&mut model, &mut layout, &HashSet::new()).is_none());
    }

    fn arb_snapshot() -> impl Strategy<Value = Snapshot> {
        (
            prop::collection::btree_set(1u32..30, 0..12),
            prop::collection::vec((1u32..30, 1u32..30, 0u32..3), 0..20),
        )
            .prop_map(|(ids, links)| {
                let nodes: Vec<Node> = ids
                    .iter()
                    .map(|&id| {
                        Node::new(id, format!("n{id}"), NodeRole::Device)
                            .with_port(Port::new(id * 10, "out", PortDirection::Output))
                            .with_port(Port::new(id * 10 + 1, "in", PortDirection::Input))
                    })
                    .collect();
                let links = links
                    .into_iter()
                    .enumerate()
                    .map(|(i, (a, b, skew))| {
                        Link::new(i as u32 + 1, (a, a * 10 + skew), (b, b * 10 + 1))
                    })
                    .collect();
                Snapshot { nodes, links }
            })
    }

    proptest! {
        #[test]
        fn test_reapplying_snapshot_is_idempotent(snapshot in arb_snapshot()) {
            let mut model = GraphModel::new();
            let mut layout = LayoutEngine::default();
            apply(&mut model, &mut layout, &snapshot);
            let revision = model.revision();
            let keys: Vec<_> = model.nodes().map(|n| (n.id(), n.key(), n.position)).collect();

            let report = apply(&mut model, &mut layout, &snapshot);
            prop_assert!(report.is_noop());
            prop_assert_eq!(model.revision(), revision);
            let after: Vec<_> = model.nodes().map(|n| (n.id(), n.key(), n.position)).collect();
            prop_assert_eq!(keys, after);
        }

        #[test]
        fn test_reordering_preserves_positions(snapshot in arb_snapshot(), seed in any::<u64>()) {
            let mut model = GraphModel::new();
            let mut layout = LayoutEngine::default();
            apply(&mut model, &mut layout, &snapshot);
            let before: Vec<_> = model.nodes().map(|n| (n.id(), n.position)).collect();

            let mut shuffled = snapshot.clone();
            let len = shuffled.nodes.len();
            if len > 1 {
                shuffled.nodes.rotate_left((seed as usize) % len);
                shuffled.nodes.reverse();
            }
            apply(&mut model, &mut layout, &shuffled);
            let after: Vec<_> = model.nodes().map(|n| (n.id(), n.position)).collect();
            prop_assert_eq!(before, after);
        }

        #[test]
        fn test_only_resolvable_links_are_shown(snapshot in arb_snapshot()) {
            let mut model = GraphModel::new();
            let mut layout = LayoutEngine::default();
            let report = apply(&mut model, &mut layout, &snapshot);

            prop_assert_eq!(report.links_added + report.links_dropped, snapshot.links.len());
            for edge in model.edges() {
                prop_assert!(model.resolve_link(&edge.link).is_ok());
            }
            prop_assert_eq!(model.positioned_count(), model.node_count());
        }
    }
}
