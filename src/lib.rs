//! # patchbay-rs: Live Routing Graph Editor
//!
//! An interactive editor for the audio routing graph of a remote patchbay
//! server. Nodes (devices, applications, filters) are drawn as boxes with
//! input and output ports; links are drawn as curves between them. The user
//! pans, zooms, drags nodes, connects ports by dragging, and deletes links
//! by clicking them.
//!
//! ## Architecture
//!
//! - **Editor**: camera, view model, snapshot reconciliation and the pointer
//!   gesture state machine. Pure state, fully testable without a window
//! - **Transport**: a worker thread that fetches snapshots, follows the
//!   server's change feed and submits edits
//! - **Frontend**: renders the editor scene using eframe/egui
//! - **Communication**: Crossbeam channels between the UI and the worker
//!
//! The server is the only source of truth. Edits are requests; the view
//! changes only when a later snapshot says so.
//!
//! ## Configuration
//!
//! Settings are read from `config.toml` in the platform config directory
//! under `dev.patchbay-rs`; see [`config`].
//!
//! ## Example
//!
//! ```ignore
//! use patchbay_rs::{
//!     config::AppConfig,
//!     frontend::PatchbayApp,
//!     transport::{MemoryTransport, TransportBridge, TransportWorker},
//! };
//! use std::sync::{atomic::AtomicBool, Arc};
//!
//! fn main() -> eframe::Result<()> {
//!     let config = AppConfig::load_or_default();
//!     let (bridge, cmd_rx, msg_tx) = TransportBridge::new();
//!     let running = Arc::new(AtomicBool::new(true));
//!
//!     let mut worker = TransportWorker::new(
//!         Box::new(MemoryTransport::demo()),
//!         &config.server,
//!         cmd_rx,
//!         msg_tx,
//!         running,
//!     );
//!     std::thread::spawn(move || worker.run());
//!
//!     eframe::run_native(
//!         "Patchbay",
//!         eframe::NativeOptions::default(),
//!         Box::new(|cc| Ok(Box::new(PatchbayApp::new(cc, bridge, config)))),
//!     )
//! }
//! ```

pub mod config;
pub mod editor;
pub mod error;
pub mod frontend;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use config::AppConfig;
pub use editor::{EditorEvent, GraphEditor, ReconcileReport};
pub use error::{PatchbayError, Result};
pub use frontend::PatchbayApp;
pub use transport::{Transport, TransportBridge, TransportWorker};
pub use types::{Link, LinkId, LinkRequest, Node, NodeId, Port, PortId, Snapshot};
