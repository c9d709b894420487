//! Core data types for the patchbay
//!
//! These mirror the JSON served by the patchbay server (`/api/graph`, `/ws`)
//! and are shared by the transport worker and the editor.
//!
//! # Main Types
//!
//! - [`Snapshot`] - Full authoritative graph state
//! - [`Node`] / [`Port`] / [`Link`] - Graph entities
//! - [`LinkRequest`] - Edit request submitted to the server
//! - [`GraphTopic`] - Coarse change notification from the event feed

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! wire_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

wire_id!(
    /// Server-assigned node id. Unique within a snapshot.
    NodeId
);
wire_id!(
    /// Server-assigned port id. Unique at least within the owning node.
    PortId
);
wire_id!(
    /// Server-assigned link id.
    LinkId
);

/// Kind of node in the routing graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum NodeRole {
    /// Hardware-like endpoint (sound card, microphone)
    #[default]
    Device,
    /// Client application stream
    Application,
    /// Processing node sitting between other nodes
    Filter,
}

impl NodeRole {
    pub fn is_device(self) -> bool {
        matches!(self, NodeRole::Device)
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRole::Device => write!(f, "Device"),
            NodeRole::Application => write!(f, "Application"),
            NodeRole::Filter => write!(f, "Filter"),
        }
    }
}

/// Whether a port consumes or produces audio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    Input,
    Output,
}

impl PortDirection {
    /// The direction a port must have to be linked with this one
    pub fn opposite(self) -> Self {
        match self {
            PortDirection::Input => PortDirection::Output,
            PortDirection::Output => PortDirection::Input,
        }
    }
}

/// A port owned by a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub id: PortId,
    /// Owning node as reported by the server (informational only)
    #[serde(default)]
    pub node_id: Option<NodeId>,
    #[serde(default)]
    pub name: String,
    pub direction: PortDirection,
}

impl Port {
    pub fn new(id: u32, name: impl Into<String>, direction: PortDirection) -> Self {
        Self {
            id: PortId(id),
            node_id: None,
            name: name.into(),
            direction,
        }
    }
}

/// A node with its ordered port list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "node_type", default)]
    pub role: NodeRole,
    #[serde(default)]
    pub ports: Vec<Port>,
}

impl Node {
    pub fn new(id: u32, name: impl Into<String>, role: NodeRole) -> Self {
        Self {
            id: NodeId(id),
            name: name.into(),
            role,
            ports: Vec::new(),
        }
    }

    /// Builder-style port append
    pub fn with_port(mut self, port: Port) -> Self {
        self.ports.push(port);
        self
    }

    pub fn port(&self, id: PortId) -> Option<&Port> {
        self.ports.iter().find(|p| p.id == id)
    }

    /// Index of a port within the ordered port list
    pub fn port_index(&self, id: PortId) -> Option<usize> {
        self.ports.iter().position(|p| p.id == id)
    }

    pub fn has_direction(&self, direction: PortDirection) -> bool {
        self.ports.iter().any(|p| p.direction == direction)
    }
}

/// A directed connection from an output port to an input port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub output_node: NodeId,
    pub output_port: PortId,
    pub input_node: NodeId,
    pub input_port: PortId,
}

impl Link {
    pub fn new(id: u32, output: (u32, u32), input: (u32, u32)) -> Self {
        Self {
            id: LinkId(id),
            output_node: NodeId(output.0),
            output_port: PortId(output.1),
            input_node: NodeId(input.0),
            input_port: PortId(input.1),
        }
    }

    pub fn touches(&self, node: NodeId) -> bool {
        self.output_node == node || self.input_node == node
    }
}

/// Full authoritative graph state. Replaces any prior snapshot wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl Snapshot {
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// Request to create a link, always normalised to output → input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkRequest {
    pub output_node: NodeId,
    pub output_port: PortId,
    pub input_node: NodeId,
    pub input_port: PortId,
}

/// Body of `POST /api/link/delete`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDeleteRequest {
    #[serde(rename = "linkId")]
    pub link_id: LinkId,
}

/// Coarse graph change notification pushed by the server.
///
/// Every topic triggers the same debounced full re-fetch; the payload is
/// never inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GraphTopic {
    #[serde(alias = "DeviceAdded")]
    NodeAdded,
    #[serde(alias = "DeviceRemoved")]
    NodeRemoved,
    PortAdded,
    PortRemoved,
    LinkAdded,
    LinkRemoved,
}

impl GraphTopic {
    /// Parse the `type` tag of an event-feed frame. Non-graph events
    /// (volume changes, log lines) yield `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        serde_json::from_value(serde_json::Value::String(tag.to_string())).ok()
    }
}

/// State of the server connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// Not connected to the server
    #[default]
    Disconnected,
    /// Connection attempt in progress
    Connecting,
    /// Event feed up and snapshots flowing
    Connected,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "Disconnected"),
            ConnectionStatus::Connecting => write!(f, "Connecting..."),
            ConnectionStatus::Connected => write!(f, "Connected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_parses_server_json() {
        let json = r#"{
            "nodes": [
                {"id": 30, "name": "Mic", "node_type": "Device",
                 "ports": [{"id": 5, "node_id": 30, "name": "capture_FL", "direction": "Output"}]},
                {"id": 41, "name": "Firefox", "node_type": "Application", "ports": []}
            ],
            "links": [
                {"id": 77, "output_node": 30, "output_port": 5, "input_node": 41, "input_port": 9}
            ]
        }"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.nodes.len(), 2);
        assert_eq!(snapshot.nodes[0].role, NodeRole::Device);
        assert_eq!(snapshot.nodes[0].ports[0].node_id, Some(NodeId(30)));
        assert_eq!(snapshot.nodes[1].role, NodeRole::Application);
        assert_eq!(snapshot.links[0].id, LinkId(77));
    }

    #[test]
    fn test_link_delete_request_uses_camel_case_key() {
        let body = serde_json::to_string(&LinkDeleteRequest { link_id: LinkId(12) }).unwrap();
        assert_eq!(body, r#"{"linkId":12}"#);
    }

    #[test]
    fn test_link_request_field_names() {
        let req = LinkRequest {
            output_node: NodeId(1),
            output_port: PortId(2),
            input_node: NodeId(3),
            input_port: PortId(4),
        };
        let value = serde_json::to_value(req).unwrap();
        assert_eq!(value["output_node"], 1);
        assert_eq!(value["input_port"], 4);
    }

    #[test]
    fn test_topic_tags() {
        assert_eq!(GraphTopic::from_tag("DeviceAdded"), Some(GraphTopic::NodeAdded));
        assert_eq!(GraphTopic::from_tag("NodeRemoved"), Some(GraphTopic::NodeRemoved));
        assert_eq!(GraphTopic::from_tag("LinkAdded"), Some(GraphTopic::LinkAdded));
        assert_eq!(GraphTopic::from_tag("VolumeChanged"), None);
        assert_eq!(GraphTopic::from_tag("Log"), None);
    }

    #[test]
    fn test_direction_opposite() {
        assert_eq!(PortDirection::Input.opposite(), PortDirection::Output);
        assert_eq!(PortDirection::Output.opposite(), PortDirection::Input);
    }
}
