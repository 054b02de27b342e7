//! Merges z-ordered fragments into rows of exactly the requested width.
//!
//! Rows are composed independently. Each opaque span of a fragment row is
//! an entry keyed by its start column; entries are swept left to right and
//! a span is cut wherever a higher z entry starts inside it, so the higher
//! entry is drawn in full and the cut remainder resumes behind it.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::fragment::{Run, Strip, Visual, ZOrder, validate_visual};
use crate::geometry::Region;

struct Entry {
    x: i32,
    z: ZOrder,
    order: usize,
    seq: usize,
    runs: Vec<Run>,
}

impl Entry {
    // Ascending start column, then higher z, then insertion order.
    fn key(&self) -> (i32, Reverse<ZOrder>, usize, usize) {
        (self.x, Reverse(self.z), self.order, self.seq)
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Entry {}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; the smallest key must pop first.
        other.key().cmp(&self.key())
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Composes `fragments` onto a `width` x `height` canvas anchored at the
/// origin.
pub fn compose<'a, I, V>(fragments: I, width: usize, height: usize) -> Vec<Strip>
where
    I: IntoIterator<Item = &'a V>,
    V: Visual + ?Sized + 'a,
{
    compose_region(fragments, Region::new(0, 0, width as i32, height as i32))
}

/// Composes the part of the canvas covered by `viewport`. The result has
/// one strip per viewport row, each exactly `viewport.width` cells wide.
///
/// Panics when a fragment breaks its row-coverage invariant.
pub fn compose_region<'a, I, V>(fragments: I, viewport: Region) -> Vec<Strip>
where
    I: IntoIterator<Item = &'a V>,
    V: Visual + ?Sized + 'a,
{
    let fragments: Vec<&V> = fragments.into_iter().collect();
    for fragment in &fragments {
        validate_visual(*fragment);
    }

    let width = viewport.width.max(0);
    let height = viewport.height.max(0);
    let mut rows = Vec::with_capacity(height as usize);
    for row in 0..height {
        let y = viewport.y + row;
        let strip = compose_row(&fragments, y, viewport.x, width);
        assert!(
            strip.width() == width as usize,
            "composed row {y} is {} cells wide, expected {width}",
            strip.width()
        );
        rows.push(strip);
    }
    rows
}

fn compose_row<V: Visual + ?Sized>(fragments: &[&V], y: i32, left: i32, width: i32) -> Strip {
    let mut pending = BinaryHeap::new();
    let mut seq = 0usize;
    for (order, fragment) in fragments.iter().enumerate() {
        let region = fragment.region();
        if y < region.y || y >= region.bottom() {
            continue;
        }
        let strip = &fragment.rows()[(y - region.y) as usize];
        for (offset, runs) in strip.opaque_spans() {
            pending.push(Entry {
                x: region.x + offset as i32 - left,
                z: fragment.z_order(),
                order,
                seq,
                runs,
            });
            seq += 1;
        }
    }

    let mut out = Strip::default();
    let mut cursor = 0i32;
    while let Some(entry) = pending.pop() {
        if entry.x >= width {
            break;
        }
        if entry.x < cursor {
            // Requeue at the cursor so a higher z entry starting there goes first.
            let runs = trim_front(entry.runs, (cursor - entry.x) as usize);
            if !runs.is_empty() {
                pending.push(Entry {
                    x: cursor,
                    z: entry.z,
                    order: entry.order,
                    seq,
                    runs,
                });
                seq += 1;
            }
            continue;
        }
        let (x, runs) = (entry.x, entry.runs);
        if runs.is_empty() {
            continue;
        }
        if x > cursor {
            out.push_text(&" ".repeat((x - cursor) as usize), Default::default());
            cursor = x;
        }

        let mut iter = runs.into_iter();
        while let Some(run) = iter.next() {
            let run_end = cursor + run.width() as i32;
            let cut = pending
                .iter()
                .filter(|other| other.z > entry.z && other.x >= cursor && other.x < run_end)
                .map(|other| other.x)
                .min();
            if let Some(cut) = cut {
                let (head, tail) = run.split_at((cut - cursor) as usize);
                emit(&mut out, head, &mut cursor, width);
                let mut rest = vec![tail];
                rest.extend(iter);
                pending.push(Entry {
                    x: cut,
                    z: entry.z,
                    order: entry.order,
                    seq,
                    runs: rest,
                });
                seq += 1;
                break;
            }
            emit(&mut out, run, &mut cursor, width);
            if cursor >= width {
                break;
            }
        }
    }

    if cursor < width {
        out.push_text(&" ".repeat((width - cursor) as usize), Default::default());
    }
    out
}

fn emit(out: &mut Strip, run: Run, cursor: &mut i32, width: i32) {
    let room = (width - *cursor).max(0) as usize;
    let run = if run.width() > room { run.split_at(room).0 } else { run };
    let cells = run.width();
    if cells == 0 {
        return;
    }
    out.push_run(run);
    *cursor += cells as i32;
}

fn trim_front(runs: Vec<Run>, mut cells: usize) -> Vec<Run> {
    let mut out = Vec::with_capacity(runs.len());
    for run in runs {
        if cells == 0 {
            out.push(run);
            continue;
        }
        let width = run.width();
        if width <= cells {
            cells -= width;
            continue;
        }
        let (_, tail) = run.split_at(cells);
        cells = 0;
        out.push(tail);
    }
    out
}
