//! Scene building and hit testing.
//!
//! [`Renderer::update`] turns the model into an owned [`Scene`] in graph
//! space. The frontend paints the scene through the camera; the pointer
//! state machine hit-tests against the very same primitives, so what is
//! clickable is exactly what is drawn.

use egui::{Pos2, Rect, Vec2};

use crate::editor::model::{GraphModel, RenderKey};
use crate::types::{LinkId, NodeId, NodeRole, PortDirection, PortId};

/// Node rectangle width
pub const NODE_WIDTH: f32 = 180.0;
/// Node height before any port rows
pub const BASE_HEIGHT: f32 = 40.0;
/// Height added per port
pub const PORT_ROW_PITCH: f32 = 20.0;
/// Vertical offset of the first port marker within the node
pub const FIRST_PORT_Y: f32 = 50.0;
/// Port marker radius
pub const PORT_RADIUS: f32 = 6.0;
/// Horizontal distance of a link's control points from its endpoints
pub const LINK_CONTROL_OFFSET: f32 = 100.0;
/// Segments used to flatten a link curve
pub const CURVE_SEGMENTS: usize = 32;

/// A cubic Bézier curve in graph space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicCurve {
    pub points: [Pos2; 4],
}

impl CubicCurve {
    /// Curve leaving `from` rightwards and entering `to` from the left.
    pub fn between(from: Pos2, to: Pos2) -> Self {
        let offset = Vec2::new(LINK_CONTROL_OFFSET, 0.0);
        Self {
            points: [from, from + offset, to - offset, to],
        }
    }

    /// Flatten into `segments + 1` points.
    pub fn sample(&self, segments: usize) -> Vec<Pos2> {
        let [p0, p1, p2, p3] = self.points;
        let segments = segments.max(1);
        (0..=segments)
            .map(|i| {
                let t = i as f32 / segments as f32;
                let u = 1.0 - t;
                let tt = t * t;
                let uu = u * u;
                let uuu = uu * u;
                let ttt = tt * t;
                Pos2::new(
                    uuu * p0.x + 3.0 * uu * t * p1.x + 3.0 * u * tt * p2.x + ttt * p3.x,
                    uuu * p0.y + 3.0 * uu * t * p1.y + 3.0 * u * tt * p2.y + ttt * p3.y,
                )
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortMarker {
    pub id: PortId,
    pub name: String,
    pub direction: PortDirection,
    pub center: Pos2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeShape {
    pub id: NodeId,
    pub key: RenderKey,
    pub title: String,
    pub role: NodeRole,
    pub rect: Rect,
    pub ports: Vec<PortMarker>,
}

impl NodeShape {
    pub fn port(&self, id: PortId) -> Option<&PortMarker> {
        self.ports.iter().find(|p| p.id == id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkShape {
    pub id: LinkId,
    pub key: RenderKey,
    pub curve: CubicCurve,
    /// Flattened curve, shared by painting and hit testing
    pub polyline: Vec<Pos2>,
}

/// Owned drawable scene in graph coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    /// Back to front
    pub nodes: Vec<NodeShape>,
    pub links: Vec<LinkShape>,
    /// Transient curve of an in-progress link drag
    pub preview: Option<Vec<Pos2>>,
}

impl Scene {
    pub fn node(&self, id: NodeId) -> Option<&NodeShape> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn link(&self, id: LinkId) -> Option<&LinkShape> {
        self.links.iter().find(|l| l.id == id)
    }

    pub fn port_center(&self, node: NodeId, port: PortId) -> Option<Pos2> {
        self.node(node)?.port(port).map(|p| p.center)
    }
}

/// What lies under a graph-space point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Hit {
    Port {
        node: NodeId,
        port: PortId,
        direction: PortDirection,
        center: Pos2,
    },
    Node(NodeId),
    Link(LinkId),
    Background,
}

/// Rebuilds the scene whenever the model revision moves.
#[derive(Debug, Default)]
pub struct Renderer {
    scene: Scene,
    revision: Option<u64>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sync the scene with `model`. Returns `true` if it was rebuilt.
    pub fn update(&mut self, model: &GraphModel) -> bool {
        if self.revision == Some(model.revision()) {
            return false;
        }
        self.scene = build_scene(model);
        self.revision = Some(model.revision());
        true
    }

    /// The current scene plus an optional link-drag preview curve.
    pub fn render(&self, preview: Option<CubicCurve>) -> Scene {
        let mut scene = self.scene.clone();
        scene.preview = preview.map(|curve| curve.sample(CURVE_SEGMENTS));
        scene
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Hit-test a graph-space point with priority port > node > link.
    /// `tolerance` is in graph units.
    pub fn hit_test(&self, point: Pos2, tolerance: f32) -> Hit {
        // Topmost node first.
        for shape in self.scene.nodes.iter().rev() {
            for port in &shape.ports {
                if port.center.distance(point) <= PORT_RADIUS + tolerance {
                    return Hit::Port {
                        node: shape.id,
                        port: port.id,
                        direction: port.direction,
                        center: port.center,
                    };
                }
            }
        }

        if let Some(shape) = self.scene.nodes.iter().rev().find(|n| n.rect.contains(point)) {
            return Hit::Node(shape.id);
        }

        self.scene
            .links
            .iter()
            .rev()
            .find(|link| polyline_distance(&link.polyline, point) <= tolerance)
            .map_or(Hit::Background, |link| Hit::Link(link.id))
    }
}

/// Height of a node with `port_count` ports.
pub fn node_height(port_count: usize) -> f32 {
    BASE_HEIGHT + port_count as f32 * PORT_ROW_PITCH
}

/// Port marker center relative to the node origin.
pub fn port_offset(index: usize, direction: PortDirection) -> Vec2 {
    let x = match direction {
        PortDirection::Input => 0.0,
        PortDirection::Output => NODE_WIDTH,
    };
    Vec2::new(x, FIRST_PORT_Y + index as f32 * PORT_ROW_PITCH)
}

/// Curve from a drag anchor to the pointer, bending away from the node
/// on the anchor's side.
pub fn preview_curve(anchor: Pos2, direction: PortDirection, pointer: Pos2) -> CubicCurve {
    match direction {
        PortDirection::Output => CubicCurve::between(anchor, pointer),
        PortDirection::Input => CubicCurve::between(pointer, anchor),
    }
}

fn build_scene(model: &GraphModel) -> Scene {
    let nodes: Vec<NodeShape> = model
        .nodes()
        .map(|view| {
            let origin = view.position_or_origin();
            let ports = view
                .node
                .ports
                .iter()
                .enumerate()
                .map(|(index, port)| PortMarker {
                    id: port.id,
                    name: port.name.clone(),
                    direction: port.direction,
                    center: origin + port_offset(index, port.direction),
                })
                .collect();
            NodeShape {
                id: view.id(),
                key: view.key(),
                title: view.node.name.clone(),
                role: view.node.role,
                rect: Rect::from_min_size(
                    origin,
                    Vec2::new(NODE_WIDTH, node_height(view.node.ports.len())),
                ),
                ports,
            }
        })
        .collect();

    let mut scene = Scene {
        nodes,
        ..Default::default()
    };

    let links = model
        .edges()
        .filter_map(|edge| {
            let link = &edge.link;
            let from = scene.port_center(link.output_node, link.output_port)?;
            let to = scene.port_center(link.input_node, link.input_port)?;
            let curve = CubicCurve::between(from, to);
            Some(LinkShape {
                id: link.id,
                key: edge.key(),
                curve,
                polyline: curve.sample(CURVE_SEGMENTS),
            })
        })
        .collect();
    scene.links = links;
    scene
}

fn polyline_distance(points: &[Pos2], p: Pos2) -> f32 {
    points
        .windows(2)
        .map(|w| segment_distance(w[0], w[1], p))
        .fold(f32::INFINITY, f32::min)
}

fn segment_distance(a: Pos2, b: Pos2, p: Pos2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_sq();
    if len_sq <= f32::EPSILON {
        return a.distance(p);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    (a + ab * t).distance(p)
}
