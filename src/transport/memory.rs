//! In-process patchbay server
//!
//! [`MemoryGraph`] holds an authoritative graph and behaves like the real
//! server: it validates link requests, assigns link ids and queues a topic
//! for every change. [`MemoryTransport`] exposes it through the
//! [`Transport`] trait; the graph handle can be shared so a test (or the
//! demo) can mutate the "server side" while the worker is running.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::editor::model::{check_endpoints, ResolveError};
use crate::error::{PatchbayError, Result};
use crate::transport::Transport;
use crate::types::{
    GraphTopic, Link, LinkId, LinkRequest, Node, NodeId, NodeRole, Port, PortDirection, Snapshot,
};

/// Longest sleep inside a single `poll_event` call.
const POLL_GRANULARITY: Duration = Duration::from_millis(10);

/// Authoritative graph state of the in-process server.
#[derive(Debug)]
pub struct MemoryGraph {
    snapshot: Snapshot,
    next_link_id: u32,
    topics: VecDeque<GraphTopic>,
    online: bool,
}

impl Default for MemoryGraph {
    fn default() -> Self {
        Self::new(Snapshot::default())
    }
}

impl MemoryGraph {
    pub fn new(snapshot: Snapshot) -> Self {
        let next_link_id = snapshot.links.iter().map(|l| l.id.0).max().unwrap_or(0) + 1;
        Self {
            snapshot,
            next_link_id,
            topics: VecDeque::new(),
            online: true,
        }
    }

    /// A small sound setup: microphone, speakers, a browser and an
    /// equaliser, with the browser playing through the speakers.
    pub fn demo() -> Self {
        let snapshot = Snapshot {
            nodes: vec![
                Node::new(30, "Built-in Microphone", NodeRole::Device)
                    .with_port(Port::new(31, "capture_FL", PortDirection::Output))
                    .with_port(Port::new(32, "capture_FR", PortDirection::Output)),
                Node::new(40, "Speakers", NodeRole::Device)
                    .with_port(Port::new(41, "playback_FL", PortDirection::Input))
                    .with_port(Port::new(42, "playback_FR", PortDirection::Input)),
                Node::new(50, "Firefox", NodeRole::Application)
                    .with_port(Port::new(51, "output_FL", PortDirection::Output))
                    .with_port(Port::new(52, "output_FR", PortDirection::Output)),
                Node::new(60, "Equalizer", NodeRole::Filter)
                    .with_port(Port::new(61, "input_FL", PortDirection::Input))
                    .with_port(Port::new(62, "input_FR", PortDirection::Input))
                    .with_port(Port::new(63, "output_FL", PortDirection::Output))
                    .with_port(Port::new(64, "output_FR", PortDirection::Output)),
            ],
            links: vec![
                Link::new(100, (50, 51), (40, 41)),
                Link::new(101, (50, 52), (40, 42)),
            ],
        };
        Self::new(snapshot)
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    /// Take the server's event feed down or bring it back.
    pub fn set_online(&mut self, online: bool) {
        self.online = online;
    }

    /// Add a node, or replace the node with the same id.
    pub fn upsert_node(&mut self, node: Node) {
        match self.snapshot.nodes.iter_mut().find(|n| n.id == node.id) {
            Some(existing) => *existing = node,
            None => self.snapshot.nodes.push(node),
        }
        self.topics.push_back(GraphTopic::NodeAdded);
    }

    /// Remove a node and every link touching it.
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        let before = self.snapshot.nodes.len();
        self.snapshot.nodes.retain(|n| n.id != id);
        if self.snapshot.nodes.len() == before {
            return false;
        }
        let links_before = self.snapshot.links.len();
        self.snapshot.links.retain(|l| !l.touches(id));
        if self.snapshot.links.len() != links_before {
            self.topics.push_back(GraphTopic::LinkRemoved);
        }
        self.topics.push_back(GraphTopic::NodeRemoved);
        true
    }

    pub fn add_port(&mut self, node: NodeId, port: Port) -> bool {
        match self.snapshot.nodes.iter_mut().find(|n| n.id == node) {
            Some(existing) => {
                existing.ports.push(port);
                self.topics.push_back(GraphTopic::PortAdded);
                true
            }
            None => false,
        }
    }

    /// Validate and apply a link request. An identical existing link is
    /// returned instead of duplicated.
    pub fn create_link(&mut self, request: &LinkRequest) -> std::result::Result<LinkId, ResolveError> {
        let candidate = Link {
            id: LinkId(self.next_link_id),
            output_node: request.output_node,
            output_port: request.output_port,
            input_node: request.input_node,
            input_port: request.input_port,
        };
        check_endpoints(&candidate, |id| self.snapshot.node(id))?;

        if let Some(existing) = self.snapshot.links.iter().find(|l| {
            l.output_node == candidate.output_node
                && l.output_port == candidate.output_port
                && l.input_node == candidate.input_node
                && l.input_port == candidate.input_port
        }) {
            return Ok(existing.id);
        }

        let id = candidate.id;
        self.next_link_id += 1;
        self.snapshot.links.push(candidate);
        self.topics.push_back(GraphTopic::LinkAdded);
        Ok(id)
    }

    pub fn delete_link(&mut self, id: LinkId) -> bool {
        let before = self.snapshot.links.len();
        self.snapshot.links.retain(|l| l.id != id);
        let removed = self.snapshot.links.len() != before;
        if removed {
            self.topics.push_back(GraphTopic::LinkRemoved);
        }
        removed
    }

    fn next_topic(&mut self) -> Option<GraphTopic> {
        self.topics.pop_front()
    }
}

/// [`Transport`] over a shared [`MemoryGraph`].
pub struct MemoryTransport {
    graph: Arc<Mutex<MemoryGraph>>,
    connected: bool,
}

impl MemoryTransport {
    pub fn new(graph: MemoryGraph) -> Self {
        Self::with_handle(Arc::new(Mutex::new(graph)))
    }

    pub fn with_handle(graph: Arc<Mutex<MemoryGraph>>) -> Self {
        Self {
            graph,
            connected: false,
        }
    }

    pub fn demo() -> Self {
        Self::new(MemoryGraph::demo())
    }

    /// Shared handle to the server-side graph.
    pub fn handle(&self) -> Arc<Mutex<MemoryGraph>> {
        Arc::clone(&self.graph)
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryGraph>> {
        self.graph
            .lock()
            .map_err(|_| PatchbayError::Channel("memory graph lock poisoned".to_string()))
    }
}

impl Transport for MemoryTransport {
    fn fetch_snapshot(&mut self) -> Result<Snapshot> {
        let graph = self.lock()?;
        if !graph.is_online() {
            return Err(PatchbayError::Disconnected);
        }
        Ok(graph.snapshot().clone())
    }

    fn create_link(&mut self, request: &LinkRequest) -> Result<()> {
        let mut graph = self.lock()?;
        graph
            .create_link(request)
            .map(|id| tracing::debug!("Memory server created link {}", id))
            .map_err(|e| PatchbayError::Rejected {
                status: 400,
                message: e.to_string(),
            })
    }

    fn delete_link(&mut self, link: LinkId) -> Result<()> {
        let mut graph = self.lock()?;
        if graph.delete_link(link) {
            Ok(())
        } else {
            Err(PatchbayError::Rejected {
                status: 404,
                message: format!("no link {}", link),
            })
        }
    }

    fn connect_events(&mut self) -> Result<()> {
        let online = self.lock()?.is_online();
        self.connected = online;
        if online {
            Ok(())
        } else {
            Err(PatchbayError::Disconnected)
        }
    }

    fn poll_event(&mut self, timeout: Duration) -> Result<Option<GraphTopic>> {
        if !self.connected {
            return Err(PatchbayError::Disconnected);
        }
        let (online, topic) = {
            let mut graph = self.lock()?;
            (graph.is_online(), graph.next_topic())
        };
        if !online {
            self.connected = false;
            return Err(PatchbayError::Disconnected);
        }
        if topic.is_none() {
            std::thread::sleep(timeout.min(POLL_GRANULARITY));
        }
        Ok(topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PortId;

    fn request(output: (u32, u32), input: (u32, u32)) -> LinkRequest {
        LinkRequest {
            output_node: NodeId(output.0),
            output_port: PortId(output.1),
            input_node: NodeId(input.0),
            input_port: PortId(input.1),
        }
    }

    #[test]
    fn test_create_link_assigns_fresh_id_and_queues_topic() {
        let mut graph = MemoryGraph::demo();
        let id = graph.create_link(&request((30, 31), (60, 61))).unwrap();
        assert_eq!(id, LinkId(102));
        assert_eq!(graph.next_topic(), Some(GraphTopic::LinkAdded));

        // Same endpoints again: no duplicate.
        assert_eq!(graph.create_link(&request((30, 31), (60, 61))), Ok(id));
        assert_eq!(graph.next_topic(), None);
    }

    #[test]
    fn test_create_link_validates_like_server() {
        let mut graph = MemoryGraph::demo();
        assert!(matches!(
            graph.create_link(&request((40, 41), (30, 31))),
            Err(ResolveError::WrongDirection { .. })
        ));
        assert!(matches!(
            graph.create_link(&request((60, 63), (60, 61))),
            Err(ResolveError::SelfLink(_))
        ));
        assert!(matches!(
            graph.create_link(&request((99, 1), (40, 41))),
            Err(ResolveError::UnknownNode(_))
        ));
    }

    #[test]
    fn test_remove_node_drops_its_links() {
        let mut graph = MemoryGraph::demo();
        assert!(graph.remove_node(NodeId(50)));
        assert!(graph.snapshot().links.is_empty());
        assert!(!graph.remove_node(NodeId(50)));
    }

    #[test]
    fn test_transport_reports_rejection() {
        let mut transport = MemoryTransport::demo();
        let err = transport.delete_link(LinkId(999)).unwrap_err();
        assert!(matches!(err, PatchbayError::Rejected { status: 404, .. }));

        let err = transport.create_link(&request((40, 41), (30, 31))).unwrap_err();
        assert!(matches!(err, PatchbayError::Rejected { status: 400, .. }));
    }

    #[test]
    fn test_feed_follows_online_flag() {
        let mut transport = MemoryTransport::demo();
        let handle = transport.handle();

        transport.connect_events().unwrap();
        handle.lock().unwrap().delete_link(LinkId(100));
        assert_eq!(
            transport.poll_event(Duration::from_millis(1)).unwrap(),
            Some(GraphTopic::LinkRemoved)
        );
        assert_eq!(transport.poll_event(Duration::from_millis(1)).unwrap(), None);

        handle.lock().unwrap().set_online(false);
        assert!(transport.poll_event(Duration::from_millis(1)).is_err());
        assert!(transport.connect_events().is_err());
        assert!(transport.fetch_snapshot().is_err());

        handle.lock().unwrap().set_online(true);
        transport.connect_events().unwrap();
        assert_eq!(transport.fetch_snapshot().unwrap().links.len(), 1);
    }
}
