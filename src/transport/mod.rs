//! Transport collaborator
//!
//! Everything that talks to the patchbay server lives here and runs on a
//! dedicated worker thread:
//!
//! - [`Transport`] - Pull snapshots, submit edits, read the event feed
//! - [`TransportWorker`] - Debounced re-fetch + reconnect loop
//! - [`TransportBridge`] - UI-side handle (crossbeam channels)
//! - [`HttpTransport`] - REST + WebSocket client for a real server
//! - [`MemoryTransport`] - In-process server for demo mode and tests
//!
//! The UI never blocks on the network: edit requests are fire-and-forget
//! commands, and results arrive as [`TransportMessage`]s drained once per
//! frame.

pub mod http;
pub mod memory;
pub mod worker;

pub use http::HttpTransport;
pub use memory::{MemoryGraph, MemoryTransport};
pub use worker::TransportWorker;

use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::error::Result;
use crate::types::{ConnectionStatus, GraphTopic, LinkId, LinkRequest, Snapshot};

/// Connection to an authoritative graph server.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send {
    /// Pull the full current graph.
    fn fetch_snapshot(&mut self) -> Result<Snapshot>;

    /// Ask the server to create a link. Success means accepted, not applied.
    fn create_link(&mut self, request: &LinkRequest) -> Result<()>;

    /// Ask the server to delete a link.
    fn delete_link(&mut self, link: LinkId) -> Result<()>;

    /// (Re)open the change-notification feed.
    fn connect_events(&mut self) -> Result<()>;

    /// Wait up to `timeout` for the next graph topic. `Ok(None)` on timeout
    /// or on a non-graph event; `Err` once the feed is lost.
    fn poll_event(&mut self, timeout: Duration) -> Result<Option<GraphTopic>>;
}

/// Commands sent from the UI thread to the transport worker.
#[derive(Debug, Clone)]
pub enum TransportCommand {
    CreateLink(LinkRequest),
    DeleteLink(LinkId),
    /// Re-fetch the snapshot right away.
    Refresh,
    Shutdown,
}

/// Messages sent from the transport worker to the UI thread.
#[derive(Debug, Clone)]
pub enum TransportMessage {
    /// A freshly fetched authoritative snapshot.
    Snapshot(Snapshot),

    /// Event feed status changed.
    ConnectionStatus(ConnectionStatus),

    /// An edit request was refused or could not be delivered.
    SubmitFailed { action: String, error: String },

    /// Snapshot fetch failed; the last good view stays in place.
    FetchFailed(String),

    /// Worker is shutting down.
    Shutdown,
}

/// Channel capacity for commands (UI → worker).
const CMD_CHANNEL_CAPACITY: usize = 256;
/// Channel capacity for messages (worker → UI).
const MSG_CHANNEL_CAPACITY: usize = 1024;

/// UI-side handle for communicating with the transport worker.
pub struct TransportBridge {
    pub cmd_tx: Sender<TransportCommand>,
    pub msg_rx: Receiver<TransportMessage>,
}

impl TransportBridge {
    /// Create a new bridge pair: `(bridge_for_ui, cmd_rx, msg_tx)`.
    ///
    /// The worker thread owns `cmd_rx` and `msg_tx`.
    pub fn new() -> (Self, Receiver<TransportCommand>, Sender<TransportMessage>) {
        let (cmd_tx, cmd_rx) = bounded(CMD_CHANNEL_CAPACITY);
        let (msg_tx, msg_rx) = bounded(MSG_CHANNEL_CAPACITY);
        (Self { cmd_tx, msg_rx }, cmd_rx, msg_tx)
    }

    /// Drain all pending messages.
    pub fn drain(&self) -> Vec<TransportMessage> {
        let mut msgs = Vec::new();
        while let Ok(msg) = self.msg_rx.try_recv() {
            msgs.push(msg);
        }
        msgs
    }

    /// Try to receive a single message without blocking.
    pub fn try_recv(&self) -> Option<TransportMessage> {
        self.msg_rx.try_recv().ok()
    }

    pub fn send_command(&self, cmd: TransportCommand) -> bool {
        self.cmd_tx.try_send(cmd).is_ok()
    }

    pub fn create_link(&self, request: LinkRequest) {
        if !self.send_command(TransportCommand::CreateLink(request)) {
            tracing::warn!("Dropped link create request, worker unavailable");
        }
    }

    pub fn delete_link(&self, link: LinkId) {
        if !self.send_command(TransportCommand::DeleteLink(link)) {
            tracing::warn!("Dropped link delete request, worker unavailable");
        }
    }

    pub fn refresh(&self) {
        let _ = self.send_command(TransportCommand::Refresh);
    }

    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(TransportCommand::Shutdown);
    }
}
