//! Initial placement of newly appeared nodes.
//!
//! Nodes are sorted into three columns: sources (output-only devices) on
//! the left, sinks (input-only devices) on the right and everything else in
//! the middle. A node that already has a position is never touched again.

use std::collections::HashSet;

use egui::Pos2;

use crate::editor::model::GraphModel;
use crate::types::{Node, NodeId, PortDirection};

/// Horizontal distance between columns
pub const COLUMN_SPACING: f32 = 300.0;
/// Vertical distance between rows within a column
pub const ROW_SPACING: f32 = 120.0;
/// Offset of the first column/row from the graph origin
pub const LAYOUT_MARGIN: f32 = 50.0;

/// Layout column a node is placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Source,
    Middle,
    Sink,
}

impl Column {
    pub fn of(node: &Node) -> Self {
        if !node.role.is_device() {
            return Column::Middle;
        }
        let has_in = node.has_direction(PortDirection::Input);
        let has_out = node.has_direction(PortDirection::Output);
        match (has_in, has_out) {
            (false, true) => Column::Source,
            (true, false) => Column::Sink,
            _ => Column::Middle,
        }
    }

    fn index(self) -> usize {
        match self {
            Column::Source => 0,
            Column::Middle => 1,
            Column::Sink => 2,
        }
    }
}

/// Assigns a first position to nodes that have none.
#[derive(Debug, Clone)]
pub struct LayoutEngine {
    persist_rows: bool,
    next_row: [usize; 3],
}

impl LayoutEngine {
    /// `persist_rows` keeps each column's row counter across invocations.
    /// Without it every invocation restarts at row zero and can stack new
    /// nodes on top of nodes placed by an earlier pass.
    pub fn new(persist_rows: bool) -> Self {
        Self {
            persist_rows,
            next_row: [0; 3],
        }
    }

    /// Place every node in `ids` that exists in `model`, has no position
    /// yet and is not `pinned`. Returns the number of nodes placed.
    pub fn place(
        &mut self,
        model: &mut GraphModel,
        ids: &[NodeId],
        pinned: &HashSet<NodeId>,
    ) -> usize {
        if !self.persist_rows || model.positioned_count() == 0 {
            self.next_row = [0; 3];
        }

        let mut placed = 0;
        for &id in ids {
            if pinned.contains(&id) {
                continue;
            }
            let Some(view) = model.node(id) else {
                continue;
            };
            if view.position.is_some() {
                continue;
            }

            let column = Column::of(&view.node);
            let row = &mut self.next_row[column.index()];
            let position = slot_position(column, *row);
            *row += 1;

            model.set_position(id, position);
            placed += 1;
        }

        if placed > 0 {
            tracing::trace!("Layout placed {} node(s), rows now {:?}", placed, self.next_row);
        }
        placed
    }
}

impl LayoutEngine {
    /// Place every node still waiting for a first position, such as one
    /// that was pinned by a gesture when it appeared.
    pub fn place_deferred(&mut self, model: &mut GraphModel, pinned: &HashSet<NodeId>) -> usize {
        let waiting = unpositioned(model);
        if waiting.is_empty() {
            return 0;
        }
        self.place(model, &waiting, pinned)
    }
}

/// Ids of nodes without a position, in model order.
pub fn unpositioned(model: &GraphModel) -> Vec<NodeId> {
    model
        .nodes()
        .filter(|n| n.position.is_none())
        .map(|n| n.id())
        .collect()
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new(true)
    }
}

fn slot_position(column: Column, row: usize) -> Pos2 {
    Pos2::new(
        LAYOUT_MARGIN + column.index() as f32 * COLUMN_SPACING,
        LAYOUT_MARGIN + row as f32 * ROW_SPACING,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NodeRole, Port};

    fn device(id: u32, dirs: &[PortDirection]) -> Node {
        dirs.iter()
            .enumerate()
            .fold(Node::new(id, "dev", NodeRole::Device), |node, (i, &dir)| {
                node.with_port(Port::new(id * 100 + i as u32, "p", dir))
            })
    }

    #[test]
    fn test_column_classification() {
        use PortDirection::*;
        assert_eq!(Column::of(&device(1, &[Output, Output])), Column::Source);
        assert_eq!(Column::of(&device(2, &[Input])), Column::Sink);
        assert_eq!(Column::of(&device(3, &[Input, Output])), Column::Middle);
        assert_eq!(Column::of(&device(4, &[])), Column::Middle);

        let app = Node::new(5, "app", NodeRole::Application)
            .with_port(Port::new(1, "out", Output));
        assert_eq!(Column::of(&app), Column::Middle);
    }

    #[test]
    fn test_places_by_column() {
        let mut model = GraphModel::new();
        model.insert_node(device(1, &[PortDirection::Output]));
        model.insert_node(device(2, &[PortDirection::Input]));
        model.insert_node(device(3, &[PortDirection::Output]));

        let mut layout = LayoutEngine::new(true);
        let placed = layout.place(&mut model, &[NodeId(1), NodeId(2), NodeId(3)], &HashSet::new());

        assert_eq!(placed, 3);
        assert_eq!(model.position(NodeId(1)), Some(Pos2::new(50.0, 50.0)));
        assert_eq!(model.position(NodeId(3)), Some(Pos2::new(50.0, 170.0)));
        assert_eq!(model.position(NodeId(2)), Some(Pos2::new(650.0, 50.0)));
    }

    #[test]
    fn test_never_moves_positioned_node() {
        let mut model = GraphModel::new();
        model.insert_node(device(1, &[PortDirection::Output]));
        model.set_position(NodeId(1), Pos2::new(-20.0, 999.0));

        let mut layout = LayoutEngine::new(true);
        assert_eq!(layout.place(&mut model, &[NodeId(1)], &HashSet::new()), 0);
        assert_eq!(model.position(NodeId(1)), Some(Pos2::new(-20.0, 999.0)));
    }

    #[test]
    fn test_pinned_nodes_are_skipped() {
        let mut model = GraphModel::new();
        model.insert_node(device(1, &[PortDirection::Output]));
        let pinned: HashSet<_> = [NodeId(1)].into_iter().collect();

        let mut layout = LayoutEngine::new(true);
        assert_eq!(layout.place(&mut model, &[NodeId(1)], &pinned), 0);
        assert_eq!(model.position(NodeId(1)), None);
    }

    #[test]
    fn test_persisted_rows_avoid_overlap() {
        let mut model = GraphModel::new();
        let mut layout = LayoutEngine::new(true);

        model.insert_node(device(1, &[PortDirection::Output]));
        layout.place(&mut model, &[NodeId(1)], &HashSet::new());
        model.insert_node(device(2, &[PortDirection::Output]));
        layout.place(&mut model, &[NodeId(2)], &HashSet::new());

        assert_ne!(model.position(NodeId(1)), model.position(NodeId(2)));
    }

    #[test]
    fn test_per_invocation_rows_restart() {
        let mut model = GraphModel::new();
        let mut layout = LayoutEngine::new(false);

        model.insert_node(device(1, &[PortDirection::Output]));
        layout.place(&mut model, &[NodeId(1)], &HashSet::new());
        model.insert_node(device(2, &[PortDirection::Output]));
        layout.place(&mut model, &[NodeId(2)], &HashSet::new());

        assert_eq!(model.position(NodeId(1)), model.position(NodeId(2)));
    }

    #[test]
    fn test_rows_reset_once_view_is_empty() {
        let mut model = GraphModel::new();
        let mut layout = LayoutEngine::new(true);

        model.insert_node(device(1, &[PortDirection::Output]));
        layout.place(&mut model, &[NodeId(1)], &HashSet::new());
        model.remove_node(NodeId(1));

        model.insert_node(device(2, &[PortDirection::Output]));
        layout.place(&mut model, &[NodeId(2)], &HashSet::new());
        assert_eq!(model.position(NodeId(2)), Some(Pos2::new(50.0, 50.0)));
    }

    #[test]
    fn test_deferred_node_placed_once_unpinned() {
        let mut model = GraphModel::new();
        let mut layout = LayoutEngine::new(true);
        model.insert_node(device(1, &[PortDirection::Output]));
        let pinned: HashSet<_> = [NodeId(1)].into_iter().collect();

        assert_eq!(layout.place(&mut model, &[NodeId(1)], &pinned), 0);
        assert_eq!(layout.place_deferred(&mut model, &pinned), 0);
        assert_eq!(unpositioned(&model), vec![NodeId(1)]);

        assert_eq!(layout.place_deferred(&mut model, &HashSet::new()), 1);
        assert_eq!(model.position(NodeId(1)), Some(Pos2::new(50.0, 50.0)));
        assert_eq!(layout.place_deferred(&mut model, &HashSet::new()), 0);
    }
}
