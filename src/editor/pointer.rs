//! Pointer gesture state machine.
//!
//! Mouse and touch input is normalised into [`PointerEvent`]s at the input
//! boundary. Each gesture runs from pointer-down to pointer-up (or cancel)
//! and is exactly one of pan, node drag, link drag or pinch. Only link drags
//! and link clicks produce [`EditorEvent`]s; pans, drags and pinches mutate
//! view-local state directly.

use std::collections::{BTreeMap, HashSet};

use egui::{Pos2, Vec2};

use crate::editor::camera::Camera;
use crate::editor::model::GraphModel;
use crate::editor::render::{preview_curve, CubicCurve, Hit, Renderer};
use crate::types::{LinkId, LinkRequest, NodeId, PortDirection, PortId};

/// Pinch start distances below this are treated as this (pixels).
const MIN_PINCH_DISTANCE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Cancel,
}

/// A single normalised pointer sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// Stable per contact: 0 for the mouse, one id per touch
    pub id: u64,
    /// Canvas-relative screen position
    pub position: Pos2,
    /// Contacts pressed once this event is applied
    pub active_touch_count: usize,
    pub phase: PointerPhase,
}

impl PointerEvent {
    pub fn new(id: u64, position: Pos2, active_touch_count: usize, phase: PointerPhase) -> Self {
        Self {
            id,
            position,
            active_touch_count,
            phase,
        }
    }

    /// Single mouse pointer event.
    pub fn mouse(position: Pos2, phase: PointerPhase) -> Self {
        let count = match phase {
            PointerPhase::Down | PointerPhase::Move => 1,
            PointerPhase::Up | PointerPhase::Cancel => 0,
        };
        Self::new(0, position, count, phase)
    }
}

/// Edit requests emitted by the editor. Neither is applied locally; the
/// result only shows up through a later snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorEvent {
    LinkCreate(LinkRequest),
    LinkDelete(LinkId),
}

/// One end of an in-progress link drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortRef {
    pub node: NodeId,
    pub port: PortId,
    pub direction: PortDirection,
    /// Port center in graph space at grab time
    pub anchor: Pos2,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    Panning {
        pointer: u64,
        start_screen: Pos2,
        start_translation: Vec2,
        /// Link under the pointer at press time; a release without
        /// movement deletes it
        pressed_link: Option<LinkId>,
        /// Furthest the pointer has been from `start_screen`
        max_travel: f32,
    },
    DraggingNode {
        pointer: u64,
        node: NodeId,
        /// Grab point minus node origin, in graph space
        offset: Vec2,
    },
    DraggingLink {
        pointer: u64,
        source: PortRef,
        /// Pointer in graph space
        current: Pos2,
    },
    Pinching {
        start_distance: f32,
        start_scale: f32,
    },
}

/// Everything a pointer event may read or mutate.
pub struct PointerContext<'a> {
    pub camera: &'a mut Camera,
    pub model: &'a mut GraphModel,
    pub renderer: &'a Renderer,
    /// Hit slack around ports and link curves, in pixels
    pub hit_tolerance_px: f32,
    /// Maximum travel for a press-release to count as a click, in pixels
    pub click_slop_px: f32,
}

#[derive(Debug, Default)]
pub struct PointerStateMachine {
    gesture: Gesture,
    /// Pressed contacts and their latest screen position
    pressed: BTreeMap<u64, Pos2>,
}

impl PointerStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.gesture, Gesture::Idle)
    }

    /// Nodes the current gesture holds on to. Layout never moves these.
    pub fn active_nodes(&self) -> HashSet<NodeId> {
        match self.gesture {
            Gesture::DraggingNode { node, .. } => [node].into_iter().collect(),
            Gesture::DraggingLink { source, .. } => [source.node].into_iter().collect(),
            _ => HashSet::new(),
        }
    }

    /// Transient curve for an in-progress link drag.
    pub fn preview(&self) -> Option<CubicCurve> {
        match self.gesture {
            Gesture::DraggingLink { source, current, .. } => {
                Some(preview_curve(source.anchor, source.direction, current))
            }
            _ => None,
        }
    }

    pub fn handle(&mut self, ctx: &mut PointerContext<'_>, event: PointerEvent) -> Option<EditorEvent> {
        match event.phase {
            PointerPhase::Down => {
                self.pressed.insert(event.id, event.position);
                self.on_down(ctx, event);
                None
            }
            PointerPhase::Move => {
                if !self.pressed.contains_key(&event.id) {
                    return None;
                }
                self.pressed.insert(event.id, event.position);
                self.on_move(ctx, event);
                None
            }
            PointerPhase::Up => {
                if self.pressed.remove(&event.id).is_none() {
                    return None;
                }
                self.on_up(ctx, event)
            }
            PointerPhase::Cancel => {
                self.pressed.remove(&event.id);
                if !self.is_idle() {
                    tracing::trace!("Gesture cancelled: {:?}", self.gesture);
                }
                self.gesture = Gesture::Idle;
                None
            }
        }
    }

    fn on_down(&mut self, ctx: &mut PointerContext<'_>, event: PointerEvent) {
        if event.active_touch_count >= 2 {
            if let Some(distance) = self.touch_distance() {
                if !self.is_idle() && !matches!(self.gesture, Gesture::Pinching { .. }) {
                    tracing::trace!("Second touch discards {:?}", self.gesture);
                }
                self.gesture = Gesture::Pinching {
                    start_distance: distance.max(MIN_PINCH_DISTANCE),
                    start_scale: ctx.camera.scale(),
                };
                return;
            }
        }

        if !self.is_idle() {
            return;
        }

        let graph = ctx.camera.to_graph(event.position);
        let tolerance = ctx.hit_tolerance_px / ctx.camera.scale();
        self.gesture = match ctx.renderer.hit_test(graph, tolerance) {
            Hit::Port {
                node,
                port,
                direction,
                center,
            } => Gesture::DraggingLink {
                pointer: event.id,
                source: PortRef {
                    node,
                    port,
                    direction,
                    anchor: center,
                },
                current: graph,
            },
            Hit::Node(node) => match ctx.model.position(node) {
                Some(origin) => Gesture::DraggingNode {
                    pointer: event.id,
                    node,
                    offset: graph - origin,
                },
                None => pan_from(ctx, event, None),
            },
            Hit::Link(link) => pan_from(ctx, event, Some(link)),
            Hit::Background => pan_from(ctx, event, None),
        };
    }

    fn on_move(&mut self, ctx: &mut PointerContext<'_>, event: PointerEvent) {
        let touch_distance = self.touch_distance();
        match &mut self.gesture {
            Gesture::Idle => {}
            Gesture::Panning {
                pointer,
                start_screen,
                start_translation,
                max_travel,
                ..
            } => {
                if *pointer == event.id {
                    let delta = event.position - *start_screen;
                    *max_travel = max_travel.max(delta.length());
                    ctx.camera.pan(*start_translation, delta);
                }
            }
            Gesture::DraggingNode {
                pointer,
                node,
                offset,
            } => {
                if *pointer == event.id {
                    let graph = ctx.camera.to_graph(event.position);
                    let node = *node;
                    if !ctx.model.set_position(node, graph - *offset) {
                        tracing::trace!("Dragged node {} vanished", node);
                        self.gesture = Gesture::Idle;
                    }
                }
            }
            Gesture::DraggingLink { pointer, current, .. } => {
                if *pointer == event.id {
                    *current = ctx.camera.to_graph(event.position);
                }
            }
            Gesture::Pinching {
                start_distance,
                start_scale,
            } => {
                if let Some(distance) = touch_distance {
                    ctx.camera.set_scale(*start_scale * distance / *start_distance);
                }
            }
        }
    }

    fn on_up(&mut self, ctx: &mut PointerContext<'_>, event: PointerEvent) -> Option<EditorEvent> {
        match self.gesture {
            Gesture::Idle => None,
            Gesture::Pinching { .. } => {
                match self.touch_distance() {
                    Some(distance) if event.active_touch_count >= 2 => {
                        // Another pair now drives the pinch.
                        self.gesture = Gesture::Pinching {
                            start_distance: distance.max(MIN_PINCH_DISTANCE),
                            start_scale: ctx.camera.scale(),
                        };
                    }
                    _ => self.gesture = Gesture::Idle,
                }
                None
            }
            Gesture::Panning {
                pointer,
                start_screen,
                pressed_link,
                max_travel,
                ..
            } => {
                if pointer != event.id {
                    return None;
                }
                self.gesture = Gesture::Idle;
                let link = pressed_link?;
                let travel = max_travel.max((event.position - start_screen).length());
                if travel <= ctx.click_slop_px {
                    tracing::debug!("Link {} clicked, requesting delete", link);
                    Some(EditorEvent::LinkDelete(link))
                } else {
                    None
                }
            }
            Gesture::DraggingNode { pointer, .. } => {
                if pointer == event.id {
                    self.gesture = Gesture::Idle;
                }
                None
            }
            Gesture::DraggingLink { pointer, source, .. } => {
                if pointer != event.id {
                    return None;
                }
                self.gesture = Gesture::Idle;
                let graph = ctx.camera.to_graph(event.position);
                let tolerance = ctx.hit_tolerance_px / ctx.camera.scale();
                match ctx.renderer.hit_test(graph, tolerance) {
                    Hit::Port {
                        node,
                        port,
                        direction,
                        ..
                    } if direction == source.direction.opposite() && node != source.node => {
                        let request = normalize(source, node, port);
                        tracing::debug!(?request, "Link drag completed");
                        Some(EditorEvent::LinkCreate(request))
                    }
                    _ => None,
                }
            }
        }
    }

    fn touch_distance(&self) -> Option<f32> {
        let mut points = self.pressed.values();
        let a = points.next()?;
        let b = points.next()?;
        Some(a.distance(*b))
    }
}

fn pan_from(ctx: &PointerContext<'_>, event: PointerEvent, pressed_link: Option<LinkId>) -> Gesture {
    Gesture::Panning {
        pointer: event.id,
        start_screen: event.position,
        start_translation: ctx.camera.translation(),
        pressed_link,
        max_travel: 0.0,
    }
}

/// Order the two ends output → input regardless of drag direction.
fn normalize(source: PortRef, node: NodeId, port: PortId) -> LinkRequest {
    match source.direction {
        PortDirection::Output => LinkRequest {
            output_node: source.node,
            output_port: source.port,
            input_node: node,
            input_port: port,
        },
        PortDirection::Input => LinkRequest {
            output_node: node,
            output_port: port,
            input_node: source.node,
            input_port: source.port,
        },
    }
}
