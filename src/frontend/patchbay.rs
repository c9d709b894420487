//! Patchbay canvas: paints the editor scene and feeds it pointer input.
//!
//! Mouse and touch events are normalised into [`PointerEvent`]s here and
//! nowhere else. While any touch is down the mouse events egui synthesises
//! from it are ignored, so a finger never counts twice.

use std::collections::BTreeSet;

use egui::{Color32, Event, PointerButton, Pos2, Rect, Sense, Shape, Stroke, TouchPhase, Ui, Vec2};

use crate::editor::render::PORT_RADIUS;
use crate::editor::{EditorEvent, GraphEditor, Hit, PointerEvent, PointerPhase};
use crate::types::{NodeRole, PortDirection};

/// Input bookkeeping carried across frames.
#[derive(Debug, Default)]
pub struct CanvasInput {
    touches: BTreeSet<u64>,
    mouse_down: bool,
    /// Scroll not yet turned into a zoom notch.
    scroll_residual: f32,
}

/// Scroll distance, in points, that makes one zoom notch. eframe reports a
/// mouse-wheel line as 50 points.
pub const WHEEL_NOTCH_POINTS: f32 = 50.0;

impl CanvasInput {
    /// Translate raw egui events into canvas-relative pointer events.
    pub fn normalize(&mut self, events: &[Event], canvas: Rect) -> Vec<PointerEvent> {
        let origin = canvas.min.to_vec2();
        let mut out = Vec::new();

        for event in events {
            match event {
                Event::Touch { id, phase, pos, .. } => {
                    // Pointer id 0 belongs to the mouse.
                    let pointer = id.0 + 1;
                    let phase = match phase {
                        TouchPhase::Start if canvas.contains(*pos) => {
                            self.touches.insert(pointer);
                            PointerPhase::Down
                        }
                        TouchPhase::Move if self.touches.contains(&pointer) => PointerPhase::Move,
                        TouchPhase::End if self.touches.remove(&pointer) => PointerPhase::Up,
                        TouchPhase::Cancel if self.touches.remove(&pointer) => PointerPhase::Cancel,
                        _ => continue,
                    };
                    out.push(PointerEvent::new(pointer, *pos - origin, self.touches.len(), phase));
                }
                _ if !self.touches.is_empty() => {}
                Event::PointerButton {
                    pos,
                    button: PointerButton::Primary,
                    pressed,
                    ..
                } => {
                    let phase = match (*pressed, self.mouse_down) {
                        (true, false) if canvas.contains(*pos) => PointerPhase::Down,
                        (false, true) => PointerPhase::Up,
                        _ => continue,
                    };
                    self.mouse_down = *pressed;
                    out.push(PointerEvent::mouse(*pos - origin, phase));
                }
                Event::PointerMoved(pos) if self.mouse_down => {
                    out.push(PointerEvent::mouse(*pos - origin, PointerPhase::Move));
                }
                Event::PointerGone if self.mouse_down => {
                    self.mouse_down = false;
                    out.push(PointerEvent::mouse(Pos2::ZERO, PointerPhase::Cancel));
                }
                _ => {}
            }
        }
        out
    }

    /// Turn a frame's vertical scroll into whole zoom notches. Partial
    /// notches carry over, so slow trackpad scrolling still zooms.
    pub fn wheel_notches(&mut self, delta: f32) -> i32 {
        if !delta.is_finite() {
            return 0;
        }
        // Direction reversal drops what was left over the other way.
        if self.scroll_residual * delta < 0.0 {
            self.scroll_residual = 0.0;
        }
        self.scroll_residual += delta;
        let notches = (self.scroll_residual / WHEEL_NOTCH_POINTS).trunc();
        self.scroll_residual -= notches * WHEEL_NOTCH_POINTS;
        notches as i32
    }
}

fn role_color(role: NodeRole) -> Color32 {
    match role {
        NodeRole::Device => Color32::from_rgb(52, 90, 140),
        NodeRole::Application => Color32::from_rgb(50, 120, 70),
        NodeRole::Filter => Color32::from_rgb(110, 70, 140),
    }
}

fn port_color(direction: PortDirection, hovered: bool) -> Color32 {
    match (direction, hovered) {
        (_, true) => Color32::YELLOW,
        (PortDirection::Input, false) => Color32::LIGHT_GREEN,
        (PortDirection::Output, false) => Color32::LIGHT_BLUE,
    }
}

/// Render the canvas and return the edit requests produced this frame.
pub fn show(ui: &mut Ui, editor: &mut GraphEditor, input: &mut CanvasInput) -> Vec<EditorEvent> {
    let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
    let canvas = response.rect;
    let origin = canvas.min.to_vec2();

    // === Input ===
    let events = ui.input(|i| i.events.clone());
    let mut emitted = Vec::new();
    for event in input.normalize(&events, canvas) {
        if let Some(edit) = editor.handle_pointer(event) {
            emitted.push(edit);
        }
    }

    if response.hovered() {
        let delta = ui.input(|i| i.raw_scroll_delta.y);
        editor.handle_wheel(input.wheel_notches(delta));
    }
    if response.hovered() && ui.input(|i| i.key_pressed(egui::Key::Home)) {
        editor.reset_view();
    }
    editor.hover(response.hover_pos().map(|p| p - origin));

    // === Paint ===
    let camera = *editor.camera();
    let scale = camera.scale();
    let to_screen = |p: Pos2| camera.to_screen(p) + origin;
    let hovered = editor.hovered();
    let scene = editor.scene();

    painter.rect_filled(canvas, 0.0, Color32::from_gray(30));

    for link in &scene.links {
        let color = if hovered == Hit::Link(link.id) {
            Color32::from_rgb(255, 120, 120)
        } else {
            Color32::from_gray(170)
        };
        let points: Vec<Pos2> = link.polyline.iter().map(|&p| to_screen(p)).collect();
        painter.add(Shape::line(points, Stroke::new(2.0 * scale, color)));
    }

    if let Some(preview) = &scene.preview {
        let points: Vec<Pos2> = preview.iter().map(|&p| to_screen(p)).collect();
        painter.extend(Shape::dashed_line(
            &points,
            Stroke::new(2.0 * scale, Color32::YELLOW),
            8.0 * scale,
            4.0 * scale,
        ));
    }

    for node in &scene.nodes {
        let rect = Rect::from_min_max(to_screen(node.rect.min), to_screen(node.rect.max));
        let outline = if hovered == Hit::Node(node.id) {
            Color32::WHITE
        } else {
            Color32::from_gray(80)
        };
        painter.rect_filled(rect, 6.0 * scale, role_color(node.role));
        painter.rect_stroke(
            rect,
            6.0 * scale,
            Stroke::new(1.0 * scale, outline),
            egui::StrokeKind::Outside,
        );
        painter.text(
            rect.center_top() + Vec2::new(0.0, 14.0 * scale),
            egui::Align2::CENTER_CENTER,
            &node.title,
            egui::FontId::proportional(13.0 * scale),
            Color32::WHITE,
        );

        for port in &node.ports {
            let center = to_screen(port.center);
            let is_hovered = matches!(hovered, Hit::Port { node: n, port: p, .. } if n == node.id && p == port.id);
            painter.circle_filled(center, PORT_RADIUS * scale, port_color(port.direction, is_hovered));

            let (anchor, offset) = match port.direction {
                PortDirection::Input => (egui::Align2::LEFT_CENTER, Vec2::new(10.0 * scale, 0.0)),
                PortDirection::Output => (egui::Align2::RIGHT_CENTER, Vec2::new(-10.0 * scale, 0.0)),
            };
            painter.text(
                center + offset,
                anchor,
                &port.name,
                egui::FontId::proportional(10.0 * scale),
                Color32::from_gray(220),
            );
        }
    }

    if scene.nodes.is_empty() {
        painter.text(
            canvas.center(),
            egui::Align2::CENTER_CENTER,
            "Waiting for graph...",
            egui::FontId::proportional(14.0),
            Color32::GRAY,
        );
    }

    emitted
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::{Modifiers, TouchDeviceId, TouchId};

    fn canvas() -> Rect {
        Rect::from_min_size(Pos2::new(100.0, 50.0), Vec2::new(800.0, 600.0))
    }

    fn button(x: f32, y: f32, pressed: bool) -> Event {
        Event::PointerButton {
            pos: Pos2::new(x, y),
            button: PointerButton::Primary,
            pressed,
            modifiers: Modifiers::default(),
        }
    }

    fn touch(id: u64, phase: TouchPhase, x: f32, y: f32) -> Event {
        Event::Touch {
            device_id: TouchDeviceId(1),
            id: TouchId(id),
            phase,
            pos: Pos2::new(x, y),
            force: None,
        }
    }

    #[test]
    fn test_mouse_is_canvas_relative() {
        let mut input = CanvasInput::default();
        let events = input.normalize(
            &[
                button(150.0, 70.0, true),
                Event::PointerMoved(Pos2::new(160.0, 80.0)),
                button(160.0, 80.0, false),
            ],
            canvas(),
        );
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].position, Pos2::new(50.0, 20.0));
        assert_eq!(events[0].phase, PointerPhase::Down);
        assert_eq!(events[0].active_touch_count, 1);
        assert_eq!(events[2].phase, PointerPhase::Up);
        assert_eq!(events[2].active_touch_count, 0);
    }

    #[test]
    fn test_press_outside_canvas_is_ignored() {
        let mut input = CanvasInput::default();
        let events = input.normalize(
            &[button(10.0, 10.0, true), Event::PointerMoved(Pos2::new(200.0, 200.0))],
            canvas(),
        );
        assert!(events.is_empty());
    }

    #[test]
    fn test_touch_suppresses_synthesised_mouse() {
        let mut input = CanvasInput::default();
        let events = input.normalize(
            &[
                touch(7, TouchPhase::Start, 200.0, 200.0),
                button(200.0, 200.0, true),
                touch(9, TouchPhase::Start, 300.0, 200.0),
                Event::PointerMoved(Pos2::new(210.0, 200.0)),
                touch(9, TouchPhase::Move, 320.0, 200.0),
                touch(9, TouchPhase::End, 320.0, 200.0),
                touch(7, TouchPhase::End, 200.0, 200.0),
                button(200.0, 200.0, false),
            ],
            canvas(),
        );

        let summary: Vec<_> = events.iter().map(|e| (e.id, e.phase, e.active_touch_count)).collect();
        assert_eq!(
            summary,
            vec![
                (8, PointerPhase::Down, 1),
                (10, PointerPhase::Down, 2),
                (10, PointerPhase::Move, 2),
                (10, PointerPhase::Up, 1),
                (8, PointerPhase::Up, 0),
            ]
        );
    }

    #[test]
    fn test_large_scroll_is_several_notches() {
        let mut input = CanvasInput::default();
        assert_eq!(input.wheel_notches(3.0 * WHEEL_NOTCH_POINTS), 3);
        assert_eq!(input.wheel_notches(-2.0 * WHEEL_NOTCH_POINTS), -2);
        assert_eq!(input.wheel_notches(0.0), 0);
    }

    #[test]
    fn test_small_scrolls_accumulate() {
        let mut input = CanvasInput::default();
        assert_eq!(input.wheel_notches(20.0), 0);
        assert_eq!(input.wheel_notches(20.0), 0);
        assert_eq!(input.wheel_notches(20.0), 1);

        // Reversing discards the leftover.
        assert_eq!(input.wheel_notches(-40.0), 0);
        assert_eq!(input.wheel_notches(-10.0), -1);
    }
}
