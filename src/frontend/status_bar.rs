//! Status bar panel: bottom bar showing connection, graph size and errors.

use egui::{Color32, RichText, Ui};

use crate::frontend::topics::Topics;
use crate::types::ConnectionStatus;

/// Context needed to render the status bar.
pub struct StatusBarContext<'a> {
    pub topics: &'a Topics,
    pub server: &'a str,
    pub node_count: usize,
    pub link_count: usize,
    pub scale: f32,
}

/// Buttons pressed in the status bar this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusBarAction {
    Refresh,
    ResetView,
}

/// Render the status bar.
pub fn render_status_bar(ui: &mut Ui, ctx: &StatusBarContext<'_>) -> Option<StatusBarAction> {
    let mut action = None;

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        // === Connection status dot + server ===
        let status_color = match ctx.topics.connection_status {
            ConnectionStatus::Connected => Color32::GREEN,
            ConnectionStatus::Connecting => Color32::YELLOW,
            ConnectionStatus::Disconnected => Color32::GRAY,
        };
        ui.colored_label(status_color, "●");
        ui.label(RichText::new(format!("{}: {}", ctx.topics.connection_status, ctx.server)).small());

        ui.separator();

        ui.label(RichText::new(format!("Nodes: {}", ctx.node_count)).small());
        ui.label(RichText::new(format!("Links: {}", ctx.link_count)).small());

        ui.separator();

        ui.label(RichText::new(ctx.topics.freshness()).small());

        ui.separator();

        ui.label(RichText::new(format!("Zoom: {:.0}%", ctx.scale * 100.0)).small());

        if ui.small_button("Reset view").clicked() {
            action = Some(StatusBarAction::ResetView);
        }
        if ui.small_button("Refresh").clicked() {
            action = Some(StatusBarAction::Refresh);
        }

        // === Error message (right-aligned) ===
        if let Some(error) = &ctx.topics.last_error {
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.colored_label(Color32::LIGHT_RED, RichText::new(error).small());
            });
        }
    });

    action
}
