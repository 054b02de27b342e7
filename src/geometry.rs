use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// A cell coordinate. `x` grows to the right, `y` grows downwards.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn manhattan_distance(self, other: Point) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    pub fn distance(self, other: Point) -> f32 {
        self.to_f().distance(other.to_f())
    }

    pub fn to_f(self) -> FPoint {
        FPoint::new(self.x as f32, self.y as f32)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// A continuous coordinate in graph space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FPoint {
    pub x: f32,
    pub y: f32,
}

impl FPoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: FPoint) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn lerp(self, other: FPoint, t: f32) -> FPoint {
        FPoint::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    pub fn round(self) -> Point {
        Point::new(self.x.round() as i32, self.y.round() as i32)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for FPoint {
    type Output = FPoint;

    fn add(self, rhs: FPoint) -> FPoint {
        FPoint::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for FPoint {
    type Output = FPoint;

    fn sub(self, rhs: FPoint) -> FPoint {
        FPoint::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Axis-aligned rectangle of cells. `right()` and `bottom()` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest region containing both corner points (inclusive).
    pub fn from_corners(a: Point, b: Point) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self::new(x, y, a.x.max(b.x) - x + 1, a.y.max(b.y) - y + 1)
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn center(&self) -> FPoint {
        FPoint::new(
            self.x as f32 + (self.width - 1) as f32 / 2.0,
            self.y as f32 + (self.height - 1) as f32 / 2.0,
        )
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    pub fn intersects(&self, other: &Region) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn union(&self, other: &Region) -> Region {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Region::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Region {
        Region::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    pub fn inflate(&self, amount: i32) -> Region {
        Region::new(
            self.x - amount,
            self.y - amount,
            self.width + amount * 2,
            self.height + amount * 2,
        )
    }
}

/// One side of a node's bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::Top, Side::Right, Side::Bottom, Side::Left];

    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "top" | "up" | "n" => Some(Side::Top),
            "right" | "e" => Some(Side::Right),
            "bottom" | "down" | "s" => Some(Side::Bottom),
            "left" | "w" => Some(Side::Left),
            _ => None,
        }
    }

    /// Unit vector pointing away from the node.
    pub fn outward(self) -> Point {
        self.heading().delta()
    }

    pub fn heading(self) -> Heading {
        match self {
            Side::Top => Heading::Up,
            Side::Right => Heading::Right,
            Side::Bottom => Heading::Down,
            Side::Left => Heading::Left,
        }
    }

    /// Left and right sides distribute their anchors along the y axis.
    pub fn is_vertical(self) -> bool {
        matches!(self, Side::Left | Side::Right)
    }
}

/// Direction of travel along a routed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Heading {
    Up,
    Down,
    Left,
    Right,
    #[default]
    None,
}

impl Heading {
    pub fn delta(self) -> Point {
        match self {
            Heading::Up => Point::new(0, -1),
            Heading::Down => Point::new(0, 1),
            Heading::Left => Point::new(-1, 0),
            Heading::Right => Point::new(1, 0),
            Heading::None => Point::new(0, 0),
        }
    }

    pub fn opposite(self) -> Heading {
        match self {
            Heading::Up => Heading::Down,
            Heading::Down => Heading::Up,
            Heading::Left => Heading::Right,
            Heading::Right => Heading::Left,
            Heading::None => Heading::None,
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Heading::Up | Heading::Down)
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Heading::Left | Heading::Right)
    }

    /// Dominant axis of a displacement; vertical wins ties.
    pub fn from_delta(dx: i32, dy: i32) -> Heading {
        if dx == 0 && dy == 0 {
            Heading::None
        } else if dy.abs() >= dx.abs() {
            if dy > 0 { Heading::Down } else { Heading::Up }
        } else if dx > 0 {
            Heading::Right
        } else {
            Heading::Left
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

impl Segment {
    pub const fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f32 {
        self.start.distance(self.end)
    }

    pub fn is_horizontal(&self) -> bool {
        self.start.y == self.end.y
    }

    pub fn is_vertical(&self) -> bool {
        self.start.x == self.end.x
    }

    /// Every cell on the segment, both ends included (Bresenham).
    pub fn cells(&self) -> Vec<Point> {
        let mut out = Vec::new();
        let (mut x, mut y) = (self.start.x, self.start.y);
        let dx = (self.end.x - x).abs();
        let dy = -(self.end.y - y).abs();
        let sx = if x < self.end.x { 1 } else { -1 };
        let sy = if y < self.end.y { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            out.push(Point::new(x, y));
            if x == self.end.x && y == self.end.y {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
        out
    }
}

/// Point where the ray from `center` towards `target` leaves a box of the
/// given half extents. Returns `center` when both points coincide.
pub fn box_crossing(center: FPoint, half_width: f32, half_height: f32, target: FPoint) -> FPoint {
    let dx = target.x - center.x;
    let dy = target.y - center.y;
    if dx.abs() < f32::EPSILON && dy.abs() < f32::EPSILON {
        return center;
    }
    let tx = if dx.abs() > f32::EPSILON {
        half_width / dx.abs()
    } else {
        f32::INFINITY
    };
    let ty = if dy.abs() > f32::EPSILON {
        half_height / dy.abs()
    } else {
        f32::INFINITY
    };
    let t = tx.min(ty);
    FPoint::new(center.x + dx * t, center.y + dy * t)
}

/// Side whose midpoint lies closest to where the line from `center` to
/// `target` crosses the box. Ties resolve clockwise from the top; coincident
/// points resolve to the left side.
pub fn closest_side(center: FPoint, half_width: f32, half_height: f32, target: FPoint) -> Side {
    if center.distance(target) < f32::EPSILON {
        return Side::Left;
    }
    let crossing = box_crossing(center, half_width, half_height, target);
    let mut best = Side::Top;
    let mut best_dist = f32::MAX;
    for side in Side::ALL {
        let mid = side_midpoint(center, half_width, half_height, side);
        let dist = mid.distance(crossing);
        if dist < best_dist - 1e-4 {
            best = side;
            best_dist = dist;
        }
    }
    best
}

pub fn side_midpoint(center: FPoint, half_width: f32, half_height: f32, side: Side) -> FPoint {
    match side {
        Side::Top => FPoint::new(center.x, center.y - half_height),
        Side::Right => FPoint::new(center.x + half_width, center.y),
        Side::Bottom => FPoint::new(center.x, center.y + half_height),
        Side::Left => FPoint::new(center.x - half_width, center.y),
    }
}
