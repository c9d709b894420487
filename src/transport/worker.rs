//! Transport worker thread
//!
//! Owns the [`Transport`] and runs on its own thread. It communicates with
//! the UI thread only through crossbeam channels.
//!
//! # Responsibilities
//!
//! - **Feed management**: opens the event feed, retries after a fixed delay
//!   when it is lost
//! - **Refresh**: fetches a full snapshot on every (re)connect and after
//!   each burst of graph topics has been quiet for the debounce window
//! - **Edit submission**: submits link create/delete requests exactly once;
//!   failures are reported, never retried
//!
//! A failed fetch leaves the UI on its last good snapshot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::config::ServerConfig;
use crate::transport::{Transport, TransportCommand, TransportMessage};
use crate::types::ConnectionStatus;

/// Longest single wait inside the loop, so commands are picked up promptly.
const MAX_TICK: Duration = Duration::from_millis(50);

/// Trailing-edge debounce timer.
#[derive(Debug, Clone)]
pub struct Debounce {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// (Re)arm: the timer fires `delay` after the latest call.
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Time left until the timer fires.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }

    /// Returns `true` exactly once per armed period, when it has expired.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

/// Worker that drives a [`Transport`]
pub struct TransportWorker {
    transport: Box<dyn Transport>,
    command_rx: Receiver<TransportCommand>,
    message_tx: Sender<TransportMessage>,
    running: Arc<AtomicBool>,
    status: ConnectionStatus,
    debounce: Debounce,
    reconnect_delay: Duration,
    /// Earliest time of the next connect attempt while disconnected
    next_connect: Instant,
}

impl TransportWorker {
    pub fn new(
        transport: Box<dyn Transport>,
        server: &ServerConfig,
        command_rx: Receiver<TransportCommand>,
        message_tx: Sender<TransportMessage>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            transport,
            command_rx,
            message_tx,
            running,
            status: ConnectionStatus::Disconnected,
            debounce: Debounce::new(server.refresh_debounce()),
            reconnect_delay: server.reconnect_delay(),
            next_connect: Instant::now(),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Run the main worker loop
    pub fn run(&mut self) {
        tracing::info!("Transport worker started");

        while self.running.load(Ordering::SeqCst) {
            self.step();
        }

        let _ = self.message_tx.send(TransportMessage::Shutdown);
        tracing::info!("Transport worker stopped");
    }

    /// One loop iteration: commands, feed, debounce.
    pub fn step(&mut self) {
        self.process_commands();
        if !self.running.load(Ordering::SeqCst) {
            return;
        }

        let now = Instant::now();
        if self.status != ConnectionStatus::Connected {
            if now >= self.next_connect {
                self.try_connect();
            } else {
                let wait = (self.next_connect - now).min(MAX_TICK);
                self.wait_for_command(wait);
            }
        } else {
            let wait = self
                .debounce
                .remaining(now)
                .map_or(MAX_TICK, |r| r.min(MAX_TICK));
            self.poll_feed(wait);
        }

        if self.debounce.fire(Instant::now()) {
            self.fetch();
        }
    }

    /// Process pending commands from the UI
    pub fn process_commands(&mut self) {
        loop {
            match self.command_rx.try_recv() {
                Ok(cmd) => self.handle_command(cmd),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.running.store(false, Ordering::SeqCst);
                    break;
                }
            }
        }
    }

    fn wait_for_command(&mut self, timeout: Duration) {
        match self.command_rx.recv_timeout(timeout) {
            Ok(cmd) => self.handle_command(cmd),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => self.running.store(false, Ordering::SeqCst),
        }
    }

    fn handle_command(&mut self, cmd: TransportCommand) {
        match cmd {
            TransportCommand::CreateLink(request) => {
                if let Err(e) = self.transport.create_link(&request) {
                    tracing::warn!(?request, "Link create failed: {}", e);
                    self.send(TransportMessage::SubmitFailed {
                        action: format!(
                            "create link {}:{} -> {}:{}",
                            request.output_node,
                            request.output_port,
                            request.input_node,
                            request.input_port
                        ),
                        error: e.to_string(),
                    });
                }
            }
            TransportCommand::DeleteLink(link) => {
                if let Err(e) = self.transport.delete_link(link) {
                    tracing::warn!("Link {} delete failed: {}", link, e);
                    self.send(TransportMessage::SubmitFailed {
                        action: format!("delete link {}", link),
                        error: e.to_string(),
                    });
                }
            }
            TransportCommand::Refresh => {
                self.debounce.cancel();
                self.fetch();
            }
            TransportCommand::Shutdown => {
                self.running.store(false, Ordering::SeqCst);
            }
        }
    }

    fn try_connect(&mut self) {
        self.set_status(ConnectionStatus::Connecting);
        match self.transport.connect_events() {
            Ok(()) => {
                tracing::info!("Event feed connected");
                self.set_status(ConnectionStatus::Connected);
                self.debounce.cancel();
                self.fetch();
            }
            Err(e) => {
                tracing::warn!(
                    "Event feed connect failed, retrying in {:?}: {}",
                    self.reconnect_delay,
                    e
                );
                self.schedule_reconnect();
            }
        }
    }

    fn poll_feed(&mut self, timeout: Duration) {
        match self.transport.poll_event(timeout) {
            Ok(Some(topic)) => {
                tracing::trace!(?topic, "Graph topic");
                self.debounce.arm(Instant::now());
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Event feed lost, reconnecting in {:?}: {}", self.reconnect_delay, e);
                self.schedule_reconnect();
            }
        }
    }

    fn schedule_reconnect(&mut self) {
        self.set_status(ConnectionStatus::Disconnected);
        self.next_connect = Instant::now() + self.reconnect_delay;
    }

    /// Pull a snapshot and forward it. On failure the UI keeps its view.
    pub fn fetch(&mut self) {
        match self.transport.fetch_snapshot() {
            Ok(snapshot) => {
                tracing::debug!(
                    "Fetched snapshot: {} nodes, {} links",
                    snapshot.nodes.len(),
                    snapshot.links.len()
                );
                self.send(TransportMessage::Snapshot(snapshot));
            }
            Err(e) => {
                tracing::warn!("Snapshot fetch failed: {}", e);
                self.send(TransportMessage::FetchFailed(e.to_string()));
            }
        }
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        if self.status != status {
            self.status = status;
            self.send(TransportMessage::ConnectionStatus(status));
        }
    }

    fn send(&self, msg: TransportMessage) {
        if self.message_tx.try_send(msg).is_err() {
            tracing::debug!("UI not draining transport messages, dropping one");
        }
    }
}
