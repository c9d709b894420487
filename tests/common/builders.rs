//! Test data builders for creating snapshots

use patchbay_rs::types::{Link, Node, NodeRole, Port, PortDirection, Snapshot};

/// Builder for creating test snapshots
#[derive(Default)]
pub struct SnapshotBuilder {
    nodes: Vec<Node>,
    links: Vec<Link>,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a device node with the given `(port id, direction)` list.
    pub fn device(self, id: u32, name: &str, ports: &[(u32, PortDirection)]) -> Self {
        self.node(id, name, NodeRole::Device, ports)
    }

    pub fn node(mut self, id: u32, name: &str, role: NodeRole, ports: &[(u32, PortDirection)]) -> Self {
        let node = ports.iter().fold(Node::new(id, name, role), |node, &(port, direction)| {
            node.with_port(Port::new(port, format!("port_{port}"), direction))
        });
        self.nodes.push(node);
        self
    }

    /// Add a link `output (node, port) -> input (node, port)`.
    pub fn link(mut self, id: u32, output: (u32, u32), input: (u32, u32)) -> Self {
        self.links.push(Link::new(id, output, input));
        self
    }

    pub fn build(self) -> Snapshot {
        Snapshot {
            nodes: self.nodes,
            links: self.links,
        }
    }
}

/// Device `A` with output port 1 and device `B` with input port 2.
pub fn two_devices() -> SnapshotBuilder {
    SnapshotBuilder::new()
        .device(1, "A", &[(1, PortDirection::Output)])
        .device(2, "B", &[(2, PortDirection::Input)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_builder() {
        let snapshot = two_devices().link(9, (1, 1), (2, 2)).build();

        assert_eq!(snapshot.nodes.len(), 2);
        assert_eq!(snapshot.nodes[0].ports[0].direction, PortDirection::Output);
        assert_eq!(snapshot.links[0].id.0, 9);
    }
}
