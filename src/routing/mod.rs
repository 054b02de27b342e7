//! Point-to-point edge routers.
//!
//! Routers work in output cell coordinates. They may cross obstacles; the
//! pipeline clips every path against its two endpoint nodes afterwards.

mod grid;
mod orthogonal;

pub use grid::GridRouter;
pub use orthogonal::OrthogonalRouter;

use serde::Serialize;

use crate::config::{RouterKind, RoutingConfig};
use crate::geometry::{Heading, Point, Region};

#[derive(Debug, Clone, Copy)]
pub struct RouteRequest<'a> {
    pub start: Point,
    pub end: Point,
    /// Direction of travel when leaving `start`.
    pub start_heading: Heading,
    /// Outward direction at `end`; the path arrives travelling the opposite way.
    pub end_heading: Heading,
    pub obstacles: &'a [Region],
    pub routed: &'a [Vec<Point>],
}

/// A path vertex with the direction of travel into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoutePoint {
    pub point: Point,
    pub heading: Heading,
}

pub trait Router {
    /// The first returned point must equal `start` and the last `end`.
    fn route(&self, request: &RouteRequest<'_>) -> anyhow::Result<Vec<RoutePoint>>;
}

impl<T: Router + ?Sized> Router for Box<T> {
    fn route(&self, request: &RouteRequest<'_>) -> anyhow::Result<Vec<RoutePoint>> {
        (**self).route(request)
    }
}

pub fn router_for(config: &RoutingConfig) -> Box<dyn Router> {
    match config.router {
        RouterKind::Orthogonal => Box::new(OrthogonalRouter),
        RouterKind::Grid => Box::new(GridRouter::from_config(config)),
    }
}

/// Drops repeated points and interior points on a straight run, then tags
/// every vertex with the direction of travel into it.
pub(crate) fn compress_path(points: &[Point], start_heading: Heading) -> Vec<RoutePoint> {
    let mut kept: Vec<Point> = Vec::with_capacity(points.len());
    for &point in points {
        if kept.last() == Some(&point) {
            continue;
        }
        if kept.len() >= 2 {
            let a = kept[kept.len() - 2];
            let b = kept[kept.len() - 1];
            let collinear = (a.x == b.x && b.x == point.x) || (a.y == b.y && b.y == point.y);
            if collinear {
                kept.pop();
            }
        }
        kept.push(point);
    }
    let mut out = Vec::with_capacity(kept.len());
    for (idx, &point) in kept.iter().enumerate() {
        let heading = if idx == 0 {
            start_heading
        } else {
            let prev = kept[idx - 1];
            Heading::from_delta(point.x - prev.x, point.y - prev.y)
        };
        out.push(RoutePoint { point, heading });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compress_keeps_only_corners() {
        let points = [
            Point::new(0, 0),
            Point::new(0, 1),
            Point::new(0, 2),
            Point::new(0, 2),
            Point::new(1, 2),
            Point::new(2, 2),
        ];
        let path = compress_path(&points, Heading::Down);
        let corners: Vec<Point> = path.iter().map(|p| p.point).collect();
        assert_eq!(corners, vec![Point::new(0, 0), Point::new(0, 2), Point::new(2, 2)]);
        assert_eq!(path[1].heading, Heading::Down);
        assert_eq!(path[2].heading, Heading::Right);
    }
}
