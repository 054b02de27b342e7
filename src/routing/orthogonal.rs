use super::{RoutePoint, RouteRequest, Router, compress_path};
use crate::geometry::{Heading, Point};

/// Straight, one-bend or two-bend axis aligned paths that leave and enter
/// along the requested headings. Obstacles are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrthogonalRouter;

impl Router for OrthogonalRouter {
    fn route(&self, request: &RouteRequest<'_>) -> anyhow::Result<Vec<RoutePoint>> {
        Ok(orthogonal_path(request))
    }
}

pub(super) fn orthogonal_path(request: &RouteRequest<'_>) -> Vec<RoutePoint> {
    let start = request.start;
    let end = request.end;
    let dx = end.x - start.x;
    let dy = end.y - start.y;

    let leave = match request.start_heading {
        Heading::None => Heading::from_delta(dx, dy),
        heading => heading,
    };
    let arrive = match request.end_heading {
        Heading::None => Heading::from_delta(dx, dy),
        heading => heading.opposite(),
    };

    let along = |delta: i32, heading: Heading| {
        let step = heading.delta();
        delta * (step.x + step.y) > 0
    };
    let points = if dx == 0 || dy == 0 {
        vec![start, end]
    } else if leave.is_vertical() && arrive.is_vertical() && along(dy, leave) && along(dy, arrive) {
        let mid_y = start.y + dy / 2;
        vec![start, Point::new(start.x, mid_y), Point::new(end.x, mid_y), end]
    } else if leave.is_horizontal() && arrive.is_horizontal() && along(dx, leave) && along(dx, arrive) {
        let mid_x = start.x + dx / 2;
        vec![start, Point::new(mid_x, start.y), Point::new(mid_x, end.y), end]
    } else if leave.is_vertical() && arrive.is_horizontal() && along(dy, leave) && along(dx, arrive) {
        vec![start, Point::new(start.x, end.y), end]
    } else if leave.is_horizontal() && arrive.is_vertical() && along(dx, leave) && along(dy, arrive) {
        vec![start, Point::new(end.x, start.y), end]
    } else {
        detour(start, end, leave, arrive)
    };
    compress_path(&points, request.start_heading)
}

/// Steps one cell out along `leave`, turns towards the cell in front of
/// `end` and enters along `arrive`. Used when a direct bend would run
/// backwards, as self loops do.
fn detour(start: Point, end: Point, leave: Heading, arrive: Heading) -> Vec<Point> {
    let out = start + leave.delta();
    let before = end - arrive.delta();
    let corner = if leave.is_horizontal() {
        Point::new(out.x, before.y)
    } else {
        Point::new(before.x, out.y)
    };
    vec![start, out, corner, before, end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(start: Point, end: Point, start_heading: Heading, end_heading: Heading) -> RouteRequest<'static> {
        RouteRequest {
            start,
            end,
            start_heading,
            end_heading,
            obstacles: &[],
            routed: &[],
        }
    }

    fn corners(path: &[RoutePoint]) -> Vec<Point> {
        path.iter().map(|p| p.point).collect()
    }

    #[test]
    fn straight_when_aligned() {
        let path = OrthogonalRouter
            .route(&request(Point::new(3, 2), Point::new(3, 9), Heading::Down, Heading::Up))
            .unwrap();
        assert_eq!(corners(&path), vec![Point::new(3, 2), Point::new(3, 9)]);
    }

    #[test]
    fn two_bends_between_vertical_ports() {
        let path = OrthogonalRouter
            .route(&request(Point::new(0, 0), Point::new(6, 8), Heading::Down, Heading::Up))
            .unwrap();
        assert_eq!(
            corners(&path),
            vec![Point::new(0, 0), Point::new(0, 4), Point::new(6, 4), Point::new(6, 8)]
        );
        assert_eq!(path.last().unwrap().heading, Heading::Down);
    }

    #[test]
    fn one_bend_between_mixed_ports() {
        let path = OrthogonalRouter
            .route(&request(Point::new(0, 0), Point::new(6, 8), Heading::Right, Heading::Up))
            .unwrap();
        assert_eq!(corners(&path), vec![Point::new(0, 0), Point::new(6, 0), Point::new(6, 8)]);
    }

    #[test]
    fn backwards_bend_detours_around_the_start() {
        // Leaves a node to the right and comes back in through its top.
        let path = OrthogonalRouter
            .route(&request(Point::new(5, 1), Point::new(2, -1), Heading::Right, Heading::Up))
            .unwrap();
        assert_eq!(
            corners(&path),
            vec![
                Point::new(5, 1),
                Point::new(6, 1),
                Point::new(6, -2),
                Point::new(2, -2),
                Point::new(2, -1)
            ]
        );
    }

    #[test]
    fn degenerate_route_is_a_single_point() {
        let path = OrthogonalRouter
            .route(&request(Point::new(1, 1), Point::new(1, 1), Heading::Up, Heading::Up))
            .unwrap();
        assert_eq!(corners(&path), vec![Point::new(1, 1)]);
    }
}
