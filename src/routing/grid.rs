use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use tracing::trace;

use super::orthogonal::orthogonal_path;
use super::{RoutePoint, RouteRequest, Router, compress_path};
use crate::config::RoutingConfig;
use crate::geometry::{Heading, Point, Region};

const DIRS: [(i32, i32); 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];
const STEP_COST: u32 = 10;
/// Upper bound on grid cells, so cell and state indices fit in `i32`.
const MAX_GRID_CELLS: usize = (i32::MAX / 4) as usize;

fn dir_index(heading: Heading) -> Option<u8> {
    match heading {
        Heading::Up => Some(0),
        Heading::Down => Some(1),
        Heading::Left => Some(2),
        Heading::Right => Some(3),
        Heading::None => None,
    }
}

/// A* over output cells with a turn penalty, node obstacles and a cost for
/// cells already used by routed edges. Falls back to an orthogonal path
/// when the search area is too large or no path exists.
#[derive(Debug, Clone)]
pub struct GridRouter {
    pub turn_penalty: f32,
    pub occupancy_weight: f32,
    pub margin: i32,
    pub max_cells: usize,
}

impl GridRouter {
    pub fn from_config(config: &RoutingConfig) -> Self {
        Self {
            turn_penalty: config.turn_penalty,
            occupancy_weight: config.occupancy_weight,
            margin: config.grid_margin,
            max_cells: config.max_cells,
        }
    }
}

impl Default for GridRouter {
    fn default() -> Self {
        Self::from_config(&RoutingConfig::default())
    }
}

impl Router for GridRouter {
    fn route(&self, request: &RouteRequest<'_>) -> anyhow::Result<Vec<RoutePoint>> {
        if request.start == request.end {
            return Ok(compress_path(&[request.start], request.start_heading));
        }
        match self.search(request) {
            Some(cells) => Ok(compress_path(&cells, request.start_heading)),
            None => {
                trace!(start = ?request.start, end = ?request.end, "grid search failed, using orthogonal path");
                Ok(orthogonal_path(request))
            }
        }
    }
}

struct RoutingGrid {
    min_x: i32,
    min_y: i32,
    cols: i32,
    rows: i32,
    blocked: Vec<bool>,
    occupancy: HashMap<Point, u32>,
}

impl RoutingGrid {
    fn new(request: &RouteRequest<'_>, margin: i32, max_cells: usize) -> Option<Self> {
        let mut bounds = Region::from_corners(request.start, request.end);
        for obstacle in request.obstacles {
            bounds = bounds.union(obstacle);
        }
        let bounds = bounds.inflate(margin.max(1));
        let total = (bounds.width.max(0) as usize).saturating_mul(bounds.height.max(0) as usize);
        if total == 0 || total > max_cells.min(MAX_GRID_CELLS) {
            return None;
        }
        let mut blocked = vec![false; total];
        for obstacle in request.obstacles {
            for y in obstacle.y.max(bounds.y)..obstacle.bottom().min(bounds.bottom()) {
                for x in obstacle.x.max(bounds.x)..obstacle.right().min(bounds.right()) {
                    blocked[((y - bounds.y) * bounds.width + (x - bounds.x)) as usize] = true;
                }
            }
        }
        let mut occupancy = HashMap::new();
        for path in request.routed {
            for window in path.windows(2) {
                for cell in crate::geometry::Segment::new(window[0], window[1]).cells() {
                    *occupancy.entry(cell).or_insert(0) += 1;
                }
            }
        }
        Some(Self {
            min_x: bounds.x,
            min_y: bounds.y,
            cols: bounds.width,
            rows: bounds.height,
            blocked,
            occupancy,
        })
    }

    fn cell_for_point(&self, point: Point) -> Option<(i32, i32)> {
        let ix = point.x - self.min_x;
        let iy = point.y - self.min_y;
        if ix < 0 || iy < 0 || ix >= self.cols || iy >= self.rows {
            return None;
        }
        Some((ix, iy))
    }

    fn point(&self, ix: i32, iy: i32) -> Point {
        Point::new(self.min_x + ix, self.min_y + iy)
    }

    fn is_blocked(&self, ix: i32, iy: i32) -> bool {
        self.blocked[(iy * self.cols + ix) as usize]
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct GridState {
    x: i32,
    y: i32,
    dir: u8,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct GridEntry {
    est: u32,
    cost: u32,
    state: GridState,
}

impl Ord for GridEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .est
            .cmp(&self.est)
            .then_with(|| other.cost.cmp(&self.cost))
            .then_with(|| self.state.y.cmp(&other.state.y))
            .then_with(|| self.state.x.cmp(&other.state.x))
            .then_with(|| self.state.dir.cmp(&other.state.dir))
    }
}

impl PartialOrd for GridEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl GridRouter {
    fn search(&self, request: &RouteRequest<'_>) -> Option<Vec<Point>> {
        let grid = RoutingGrid::new(request, self.margin, self.max_cells)?;
        let (start_ix, start_iy) = grid.cell_for_point(request.start)?;
        let (end_ix, end_iy) = grid.cell_for_point(request.end)?;

        let turn_penalty = (self.turn_penalty.max(0.0) * STEP_COST as f32).round() as u32;
        let occupancy_weight = (self.occupancy_weight.max(0.0) * STEP_COST as f32).round() as u32;
        let arrive_dir = dir_index(request.end_heading.opposite());

        let cols = grid.cols;
        let rows = grid.rows;
        let states = cols as usize * rows as usize * 4;
        let mut best_cost = vec![u32::MAX; states];
        let mut prev: Vec<Option<GridState>> = vec![None; states];
        let mut heap = BinaryHeap::new();

        let seeds: Vec<u8> = match dir_index(request.start_heading) {
            Some(dir) => vec![dir],
            None => (0..4).collect(),
        };
        for dir in seeds {
            let idx = ((start_iy * cols + start_ix) as usize) * 4 + dir as usize;
            best_cost[idx] = 0;
            heap.push(GridEntry {
                est: 0,
                cost: 0,
                state: GridState {
                    x: start_ix,
                    y: start_iy,
                    dir,
                },
            });
        }

        let mut end_state: Option<GridState> = None;
        while let Some(entry) = heap.pop() {
            let GridEntry { cost, state, .. } = entry;
            let state_idx = ((state.y * cols + state.x) as usize) * 4 + state.dir as usize;
            if cost != best_cost[state_idx] {
                continue;
            }
            if state.x == end_ix && state.y == end_iy {
                end_state = Some(state);
                break;
            }
            for (dir_idx, (dx, dy)) in DIRS.iter().enumerate() {
                let nx = state.x + dx;
                let ny = state.y + dy;
                if nx < 0 || ny < 0 || nx >= cols || ny >= rows {
                    continue;
                }
                let is_end = nx == end_ix && ny == end_iy;
                if !is_end && grid.is_blocked(nx, ny) {
                    continue;
                }
                let mut next_cost = cost.saturating_add(STEP_COST);
                if state.dir != dir_idx as u8 {
                    next_cost = next_cost.saturating_add(turn_penalty);
                }
                if is_end && let Some(arrive) = arrive_dir
                    && arrive != dir_idx as u8
                {
                    next_cost = next_cost.saturating_add(turn_penalty.saturating_mul(2));
                }
                if let Some(weight) = grid.occupancy.get(&grid.point(nx, ny)) {
                    next_cost = next_cost.saturating_add(weight.saturating_mul(occupancy_weight));
                }
                let next_idx = ((ny * cols + nx) as usize) * 4 + dir_idx;
                if next_cost >= best_cost[next_idx] {
                    continue;
                }
                best_cost[next_idx] = next_cost;
                prev[next_idx] = Some(state);
                let manhattan = (nx - end_ix).unsigned_abs() + (ny - end_iy).unsigned_abs();
                let est = next_cost.saturating_add(manhattan.saturating_mul(STEP_COST));
                heap.push(GridEntry {
                    est,
                    cost: next_cost,
                    state: GridState {
                        x: nx,
                        y: ny,
                        dir: dir_idx as u8,
                    },
                });
            }
        }

        let mut cur = end_state?;
        let mut cells: Vec<Point> = Vec::new();
        loop {
            cells.push(grid.point(cur.x, cur.y));
            let cur_idx = ((cur.y * cols + cur.x) as usize) * 4 + cur.dir as usize;
            match prev[cur_idx] {
                Some(prev_state) => cur = prev_state,
                None => break,
            }
        }
        cells.reverse();
        Some(cells)
    }
}
