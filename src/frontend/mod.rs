//! Frontend module for egui UI
//!
//! The window is a single patchbay canvas with a status bar underneath.
//! Graph snapshots and connection updates arrive from the transport worker
//! through crossbeam channels and are drained once per frame; edits made on
//! the canvas go back the same way as fire-and-forget commands.
//!
//! # Main Types
//!
//! - [`PatchbayApp`] - Main application state implementing [`eframe::App`]
//! - [`Topics`] - Data published by the worker and read by the panels
//!
//! # Submodules
//!
//! - [`patchbay`] - Canvas painting and pointer normalisation
//! - [`status_bar`] - Connection, graph size and error display
//! - [`topics`] - Shared worker state

pub mod patchbay;
pub mod status_bar;
pub mod topics;

pub use topics::Topics;

use std::time::Duration;

use crate::config::AppConfig;
use crate::editor::{EditorEvent, GraphEditor};
use crate::transport::{TransportBridge, TransportMessage};
use crate::types::ConnectionStatus;
use patchbay::CanvasInput;
use status_bar::{render_status_bar, StatusBarAction, StatusBarContext};

/// Idle repaint interval, so worker messages are picked up without input.
const IDLE_REPAINT: Duration = Duration::from_millis(100);

/// Main application state
pub struct PatchbayApp {
    bridge: TransportBridge,
    config: AppConfig,
    editor: GraphEditor,
    topics: Topics,
    input: CanvasInput,
    server_label: String,
}

impl PatchbayApp {
    /// Create a new application instance
    pub fn new(cc: &eframe::CreationContext<'_>, bridge: TransportBridge, config: AppConfig) -> Self {
        if config.ui.dark_mode {
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
        } else {
            cc.egui_ctx.set_visuals(egui::Visuals::light());
        }
        Self::with_bridge(bridge, config)
    }

    /// Build the app state without an egui context.
    pub fn with_bridge(bridge: TransportBridge, config: AppConfig) -> Self {
        let server_label = match config.transport {
            crate::config::TransportMode::Http => {
                format!("{}:{}", config.server.host, config.server.port)
            }
            crate::config::TransportMode::Demo => "demo graph".to_string(),
        };

        Self {
            bridge,
            editor: GraphEditor::new(config.editor.clone()),
            config,
            topics: Topics::default(),
            input: CanvasInput::default(),
            server_label,
        }
    }

    pub fn editor(&self) -> &GraphEditor {
        &self.editor
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Drain worker messages and apply the newest snapshot. Returns `true`
    /// when anything arrived.
    pub fn process_transport_messages(&mut self) -> bool {
        let messages = self.bridge.drain();
        let had_messages = !messages.is_empty();

        for msg in messages {
            match msg {
                TransportMessage::Snapshot(snapshot) => {
                    self.topics.record_snapshot();
                    self.editor.offer_snapshot(snapshot);
                }
                TransportMessage::ConnectionStatus(status) => {
                    self.topics.connection_status = status;
                    if status == ConnectionStatus::Connected {
                        self.topics.last_error = None;
                    }
                }
                TransportMessage::SubmitFailed { action, error } => {
                    self.topics.last_error = Some(format!("Failed to {}: {}", action, error));
                }
                TransportMessage::FetchFailed(error) => {
                    self.topics.last_error = Some(format!("Refresh failed: {}", error));
                }
                TransportMessage::Shutdown => {
                    tracing::info!("Transport worker shutdown received");
                }
            }
        }

        if let Some(report) = self.editor.apply_pending() {
            if !report.is_noop() {
                tracing::debug!(?report, "Applied snapshot");
            }
            self.topics.record_report(report);
        }

        had_messages
    }

    /// Forward canvas edits to the worker.
    pub fn submit(&self, events: Vec<EditorEvent>) {
        for event in events {
            match event {
                EditorEvent::LinkCreate(request) => {
                    tracing::info!(?request, "Requesting link");
                    self.bridge.create_link(request);
                }
                EditorEvent::LinkDelete(link) => {
                    tracing::info!("Requesting removal of link {}", link);
                    self.bridge.delete_link(link);
                }
            }
        }
    }

    fn handle_status_action(&mut self, action: StatusBarAction) {
        match action {
            StatusBarAction::Refresh => self.bridge.refresh(),
            StatusBarAction::ResetView => self.editor.reset_view(),
        }
    }
}

impl eframe::App for PatchbayApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.process_transport_messages() {
            ctx.request_repaint();
        } else {
            ctx.request_repaint_after(IDLE_REPAINT);
        }

        let action = egui::TopBottomPanel::bottom("status_bar")
            .show(ctx, |ui| {
                let status_ctx = StatusBarContext {
                    topics: &self.topics,
                    server: &self.server_label,
                    node_count: self.editor.model().node_count(),
                    link_count: self.editor.model().edge_count(),
                    scale: self.editor.camera().scale(),
                };
                render_status_bar(ui, &status_ctx)
            })
            .inner;
        if let Some(action) = action {
            self.handle_status_action(action);
        }

        let events = egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| patchbay::show(ui, &mut self.editor, &mut self.input))
            .inner;
        self.submit(events);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.bridge.shutdown();
    }
}
