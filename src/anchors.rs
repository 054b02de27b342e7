//! Per-node placement of connection points along the node boundary.
//!
//! Every named port and every slotted edge end incident to a node gets one
//! side and an offset along that side. Offsets are relative to the side's
//! center and measured in cells, so the same anchors stay valid when the
//! node is later drawn at a different position.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::warn;

use crate::geometry::{FPoint, Point, Region, Side, box_crossing, closest_side};
use crate::ir::{Direction, Edge};
use crate::properties::{EdgeProperties, Magnet, NodeProperties};

/// Identifies one connection on a node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ConnectionId {
    /// A named port declared on the node.
    Port(String),
    /// Slotted edges to the given neighbor. Parallel edges share the slot.
    Slot(String),
    /// One end of a self loop.
    Loop { edge: String, at_start: bool },
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionId::Port(name) => write!(f, "port:{name}"),
            ConnectionId::Slot(neighbor) => write!(f, "slot:{neighbor}"),
            ConnectionId::Loop { edge, at_start } => {
                write!(f, "loop:{edge}:{}", if *at_start { "start" } else { "end" })
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Anchor {
    pub side: Side,
    /// Offset along the side from its center, in cells.
    pub along: f32,
    /// Unit vector pointing away from the node.
    pub direction: Point,
}

impl Anchor {
    pub fn new(side: Side, along: f32) -> Self {
        Self {
            side,
            along,
            direction: side.outward(),
        }
    }

    /// The boundary cell of `region` this anchor attaches to. Corners are
    /// avoided whenever the side is long enough.
    pub fn point_on(&self, region: Region) -> Point {
        let center = region.center();
        let clamp_axis = |value: f32, start: i32, len: i32| {
            let (lo, hi) = if len >= 3 {
                (start + 1, start + len - 2)
            } else {
                (start, start + (len - 1).max(0))
            };
            (value.round() as i32).clamp(lo, hi)
        };
        match self.side {
            Side::Top => Point::new(clamp_axis(center.x + self.along, region.x, region.width), region.y),
            Side::Bottom => Point::new(
                clamp_axis(center.x + self.along, region.x, region.width),
                region.bottom() - 1,
            ),
            Side::Left => Point::new(region.x, clamp_axis(center.y + self.along, region.y, region.height)),
            Side::Right => Point::new(
                region.right() - 1,
                clamp_axis(center.y + self.along, region.y, region.height),
            ),
        }
    }
}

/// Node placement in graph space, as anchor assignment sees it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NodeBounds {
    pub center: FPoint,
    pub width: f32,
    pub height: f32,
}

impl NodeBounds {
    pub fn half_width(&self) -> f32 {
        self.width / 2.0
    }

    pub fn half_height(&self) -> f32 {
        self.height / 2.0
    }

    fn overlaps_vertically(&self, other: &NodeBounds) -> bool {
        (self.center.y - other.center.y).abs() < self.half_height() + other.half_height()
    }

    fn overlaps_horizontally(&self, other: &NodeBounds) -> bool {
        (self.center.x - other.center.x).abs() < self.half_width() + other.half_width()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeAnchors {
    anchors: BTreeMap<ConnectionId, Anchor>,
}

impl NodeAnchors {
    pub fn get(&self, id: &ConnectionId) -> Option<&Anchor> {
        self.anchors.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ConnectionId, &Anchor)> {
        self.anchors.iter()
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn on_side(&self, side: Side) -> impl Iterator<Item = (&ConnectionId, &Anchor)> {
        self.anchors.iter().filter(move |(_, anchor)| anchor.side == side)
    }
}

/// The connection an edge end uses at `node_id`, or `None` when the end
/// attaches through the direct boundary crossing instead (center magnet or
/// a port the node does not declare).
pub fn connection_for(
    edge: &Edge,
    props: &EdgeProperties,
    node: &NodeProperties,
    at_start: bool,
) -> Option<ConnectionId> {
    if let Some(port) = props.port(at_start) {
        if node.ports.contains_key(port) {
            return Some(ConnectionId::Port(port.to_string()));
        }
        return None;
    }
    if props.magnet(at_start) == Magnet::Center {
        return None;
    }
    if edge.from == edge.to {
        return Some(ConnectionId::Loop {
            edge: edge.id.clone(),
            at_start,
        });
    }
    let neighbor = if at_start { &edge.to } else { &edge.from };
    Some(ConnectionId::Slot(neighbor.clone()))
}

/// An incident edge as seen from the node being anchored.
pub struct IncidentEdge<'a> {
    pub edge: &'a Edge,
    pub props: &'a EdgeProperties,
}

struct Request {
    id: ConnectionId,
    side: Side,
    explicit_offset: Option<f32>,
    priority: i32,
    sort_key: f32,
}

/// Assigns a side and offset to every port of `node_id` and every slotted
/// edge end incident to it.
///
/// `edges` must be the node's incident edges in edge id order; `bounds`
/// must hold every node referenced by them.
pub fn assign_anchors(
    node_id: &str,
    node: &NodeProperties,
    edges: &[IncidentEdge<'_>],
    bounds: &BTreeMap<String, NodeBounds>,
    direction: Option<Direction>,
) -> NodeAnchors {
    let Some(own) = bounds.get(node_id) else {
        return NodeAnchors::default();
    };

    let mut requests: Vec<Request> = Vec::new();
    let mut seen: BTreeSet<ConnectionId> = BTreeSet::new();

    for (name, port) in &node.ports {
        let id = ConnectionId::Port(name.clone());
        let side = port.magnet.unwrap_or_else(|| {
            first_port_neighbor(node_id, name, edges)
                .and_then(|other| bounds.get(other))
                .map(|other| closest_side(own.center, own.half_width(), own.half_height(), other.center))
                .unwrap_or(Side::Left)
        });
        seen.insert(id.clone());
        requests.push(Request {
            id,
            side,
            explicit_offset: port.offset,
            priority: port.priority,
            sort_key: 0.0,
        });
    }

    for incident in edges {
        for at_start in [true, false] {
            let edge = incident.edge;
            let end_node = if at_start { &edge.from } else { &edge.to };
            if end_node != node_id {
                continue;
            }
            if let Some(port) = incident.props.port(at_start)
                && !node.ports.contains_key(port)
            {
                warn!(node = node_id, edge = %edge.id, port, "port not declared, using boundary magnet");
            }
            let Some(id) = connection_for(edge, incident.props, node, at_start) else {
                continue;
            };
            if seen.contains(&id) {
                continue;
            }
            let other_id = edge.other(node_id);
            let Some(other) = bounds.get(other_id) else {
                continue;
            };
            let side = match incident.props.magnet(at_start) {
                Magnet::Side(side) => side,
                _ if edge.from == edge.to => {
                    if at_start {
                        Side::Right
                    } else {
                        Side::Top
                    }
                }
                _ => slot_side(own, other, direction),
            };
            let sort_key = if side.is_vertical() { other.center.y } else { other.center.x };
            seen.insert(id.clone());
            requests.push(Request {
                id,
                side,
                explicit_offset: None,
                priority: 0,
                sort_key,
            });
        }
    }

    let mut anchors = BTreeMap::new();
    for side in Side::ALL {
        let mut ports: Vec<&Request> = Vec::new();
        let mut slots: Vec<&Request> = Vec::new();
        for request in requests.iter().filter(|r| r.side == side) {
            if let Some(offset) = request.explicit_offset {
                anchors.entry(request.id.clone()).or_insert(Anchor::new(side, offset));
            } else if matches!(request.id, ConnectionId::Port(_)) {
                ports.push(request);
            } else {
                slots.push(request);
            }
        }
        ports.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        slots.sort_by(|a, b| a.sort_key.total_cmp(&b.sort_key).then_with(|| a.id.cmp(&b.id)));

        let ordered: Vec<&Request> = ports.into_iter().chain(slots).collect();
        let extent = if side.is_vertical() { own.height } else { own.width };
        let offsets = distribute(ordered.len(), extent);
        for (request, along) in ordered.into_iter().zip(offsets) {
            anchors.entry(request.id.clone()).or_insert(Anchor::new(side, along));
        }
    }

    NodeAnchors { anchors }
}

/// Offsets for `n` items spread over a side of `extent` cells. The usable
/// length excludes both corners and the border cells; it grows to `n - 1`
/// when the side is too short, so offsets never coincide. The upper half
/// mirrors the lower half so the spread stays symmetric.
pub fn distribute(n: usize, extent: f32) -> Vec<f32> {
    match n {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => {
            let usable = (extent - 3.0).max(0.0).floor().max((n - 1) as f32);
            let mut offsets = vec![0.0f32; n];
            for i in 0..n {
                let mirror = n - 1 - i;
                offsets[i] = if mirror < i {
                    -offsets[mirror]
                } else {
                    (i as f32 / (n - 1) as f32 * usable).floor() - usable / 2.0
                };
            }
            offsets
        }
    }
}

fn first_port_neighbor<'a>(node_id: &str, port: &str, edges: &[IncidentEdge<'a>]) -> Option<&'a str> {
    edges.iter().find_map(|incident| {
        let edge = incident.edge;
        if edge.from == node_id && incident.props.start_port.as_deref() == Some(port) {
            return Some(edge.to.as_str());
        }
        if edge.to == node_id && incident.props.end_port.as_deref() == Some(port) {
            return Some(edge.from.as_str());
        }
        None
    })
}

fn slot_side(own: &NodeBounds, other: &NodeBounds, direction: Option<Direction>) -> Side {
    let dx = other.center.x - own.center.x;
    let dy = other.center.y - own.center.y;
    match direction {
        Some(Direction::TopDown) if dx.abs() > f32::EPSILON || dy.abs() > f32::EPSILON => {
            if own.overlaps_vertically(other) && dx.abs() > f32::EPSILON {
                if dx > 0.0 { Side::Right } else { Side::Left }
            } else if dy < 0.0 {
                Side::Top
            } else {
                Side::Bottom
            }
        }
        Some(Direction::LeftRight) if dx.abs() > f32::EPSILON || dy.abs() > f32::EPSILON => {
            if own.overlaps_horizontally(other) && dy.abs() > f32::EPSILON {
                if dy > 0.0 { Side::Bottom } else { Side::Top }
            } else if dx < 0.0 {
                Side::Left
            } else {
                Side::Right
            }
        }
        _ => closest_side(own.center, own.half_width(), own.half_height(), other.center),
    }
}

/// Boundary point of `region` on the straight line towards `target`, for
/// edge ends without an anchor.
pub fn crossing_point(region: Region, target: FPoint) -> (Point, Side) {
    let center = region.center();
    let half_w = (region.width - 1).max(0) as f32 / 2.0;
    let half_h = (region.height - 1).max(0) as f32 / 2.0;
    let side = closest_side(center, half_w, half_h, target);
    let crossing = box_crossing(center, half_w, half_h, target).round();
    let x = crossing.x.clamp(region.x, region.right() - 1);
    let y = crossing.y.clamp(region.y, region.bottom() - 1);
    let point = match side {
        Side::Top => Point::new(x, region.y),
        Side::Bottom => Point::new(x, region.bottom() - 1),
        Side::Left => Point::new(region.x, y),
        Side::Right => Point::new(region.right() - 1, y),
    };
    (point, side)
}
