//! Interactive graph editor
//!
//! The editor keeps a locally mutable view of the routing graph in sync with
//! snapshots pushed by the server, while the user pans, zooms, drags nodes
//! and connects ports.
//!
//! # Components
//!
//! - [`camera`] - Screen/graph coordinate transform
//! - [`model`] - Live view model (nodes with positions, resolved links)
//! - [`layout`] - First placement of new nodes
//! - [`reconcile`] - Minimal-mutation snapshot merge + coalescing queue
//! - [`pointer`] - Gesture state machine over normalised pointer events
//! - [`render`] - Owned scene + hit testing
//!
//! Everything here runs on the UI thread. Snapshot application and pointer
//! handling are discrete calls that never interleave; gestures survive
//! snapshots because reconciliation leaves unchanged ids alone.

pub mod camera;
pub mod layout;
pub mod model;
pub mod pointer;
pub mod reconcile;
pub mod render;

pub use camera::Camera;
pub use layout::LayoutEngine;
pub use model::{GraphModel, ResolveError, ViewEdge, ViewNode};
pub use pointer::{EditorEvent, Gesture, PointerEvent, PointerPhase};
pub use reconcile::{ReconcileReport, SnapshotQueue};
pub use render::{Hit, Scene};

use egui::Pos2;

use crate::config::EditorSettings;
use crate::types::Snapshot;
use pointer::{PointerContext, PointerStateMachine};
use render::Renderer;

/// Facade owning the camera, model and gesture state.
pub struct GraphEditor {
    camera: Camera,
    model: GraphModel,
    layout: LayoutEngine,
    queue: SnapshotQueue,
    pointer: PointerStateMachine,
    renderer: Renderer,
    settings: EditorSettings,
    hovered: Hit,
}

impl GraphEditor {
    pub fn new(settings: EditorSettings) -> Self {
        Self {
            camera: Camera::default(),
            model: GraphModel::new(),
            layout: LayoutEngine::new(settings.persist_layout_columns),
            queue: SnapshotQueue::new(),
            pointer: PointerStateMachine::new(),
            renderer: Renderer::new(),
            settings,
            hovered: Hit::Background,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn model(&self) -> &GraphModel {
        &self.model
    }

    pub fn gesture(&self) -> &Gesture {
        self.pointer.gesture()
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    /// Element under the pointer as of the last hover update.
    pub fn hovered(&self) -> Hit {
        self.hovered
    }

    /// Queue a snapshot; replaces any older one not yet applied.
    pub fn offer_snapshot(&mut self, snapshot: Snapshot) {
        self.queue.offer(snapshot);
    }

    pub fn has_pending_snapshot(&self) -> bool {
        self.queue.has_pending()
    }

    /// Reconcile the newest pending snapshot, if any.
    pub fn apply_pending(&mut self) -> Option<ReconcileReport> {
        let pinned = self.pointer.active_nodes();
        let report = self
            .queue
            .apply_pending(&mut self.model, &mut self.layout, &pinned)?;
        self.renderer.update(&self.model);
        Some(report)
    }

    /// Offer and immediately apply a snapshot.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) -> ReconcileReport {
        self.offer_snapshot(snapshot);
        self.apply_pending().unwrap_or_default()
    }

    /// Feed one pointer event through the gesture state machine.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> Option<EditorEvent> {
        self.renderer.update(&self.model);
        let mut ctx = PointerContext {
            camera: &mut self.camera,
            model: &mut self.model,
            renderer: &self.renderer,
            hit_tolerance_px: self.settings.hit_tolerance_px,
            click_slop_px: self.settings.click_slop_px,
        };
        let emitted = self.pointer.handle(&mut ctx, event);
        if self.model.positioned_count() < self.model.node_count() {
            let pinned = self.pointer.active_nodes();
            self.layout.place_deferred(&mut self.model, &pinned);
        }
        self.renderer.update(&self.model);
        emitted
    }

    /// Wheel zoom: positive `notches` zoom in, negative zoom out.
    pub fn handle_wheel(&mut self, notches: i32) {
        if notches == 0 {
            return;
        }
        let step = if notches > 0 {
            self.settings.zoom_step
        } else {
            1.0 / self.settings.zoom_step
        };
        for _ in 0..notches.unsigned_abs() {
            self.camera.zoom(step);
        }
    }

    /// Track the element under a canvas-relative screen point.
    pub fn hover(&mut self, screen: Option<Pos2>) {
        self.hovered = match screen {
            Some(screen) => {
                self.renderer.update(&self.model);
                let tolerance = self.settings.hit_tolerance_px / self.camera.scale();
                self.renderer.hit_test(self.camera.to_graph(screen), tolerance)
            }
            None => Hit::Background,
        };
    }

    /// Owned scene for painting, including any link-drag preview.
    pub fn scene(&mut self) -> Scene {
        self.renderer.update(&self.model);
        self.renderer.render(self.pointer.preview())
    }

    /// Back to scale 1 and no translation.
    pub fn reset_view(&mut self) {
        self.camera.reset();
    }
}

impl Default for GraphEditor {
    fn default() -> Self {
        Self::new(EditorSettings::default())
    }
}
