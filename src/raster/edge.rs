use crate::fragment::{CellStyle, cell_width};
use crate::geometry::{Heading, Point, Segment};
use crate::routing::RoutePoint;
use crate::theme::LineGlyphs;

pub type Cell = (Point, char, CellStyle);

/// Cells covered by a routed path, in path order, with line and corner glyphs.
pub fn path_cells(path: &[RoutePoint], glyphs: &LineGlyphs, style: CellStyle) -> Vec<Cell> {
    let mut cells: Vec<Cell> = Vec::new();
    match path {
        [] => return cells,
        [only] => {
            let ch = if only.heading.is_horizontal() {
                glyphs.horizontal
            } else {
                glyphs.vertical
            };
            cells.push((only.point, ch, style));
            return cells;
        }
        _ => {}
    }

    for (idx, window) in path.windows(2).enumerate() {
        let segment = Segment::new(window[0].point, window[1].point);
        let ch = segment_glyph(&segment, glyphs);
        let skip = usize::from(idx > 0);
        for cell in segment.cells().into_iter().skip(skip) {
            cells.push((cell, ch, style));
        }
    }

    for idx in 1..path.len() - 1 {
        let point = path[idx].point;
        let Some(ch) = corner_glyph(path[idx].heading, path[idx + 1].heading, glyphs) else {
            continue;
        };
        for cell in cells.iter_mut().filter(|cell| cell.0 == point) {
            cell.1 = ch;
        }
    }
    cells
}

fn segment_glyph(segment: &Segment, glyphs: &LineGlyphs) -> char {
    let dx = segment.end.x - segment.start.x;
    let dy = segment.end.y - segment.start.y;
    if dy == 0 {
        glyphs.horizontal
    } else if dx == 0 {
        glyphs.vertical
    } else if (dx > 0) == (dy > 0) {
        glyphs.falling
    } else {
        glyphs.rising
    }
}

/// Corner joining a path arriving with `incoming` and leaving with
/// `outgoing`. `None` unless the two headings are perpendicular.
pub fn corner_glyph(incoming: Heading, outgoing: Heading, glyphs: &LineGlyphs) -> Option<char> {
    let from = incoming.opposite();
    let arms = |a: Heading, b: Heading| (from == a && outgoing == b) || (from == b && outgoing == a);
    if arms(Heading::Down, Heading::Right) {
        Some(glyphs.top_left)
    } else if arms(Heading::Down, Heading::Left) {
        Some(glyphs.top_right)
    } else if arms(Heading::Up, Heading::Right) {
        Some(glyphs.bottom_left)
    } else if arms(Heading::Up, Heading::Left) {
        Some(glyphs.bottom_right)
    } else {
        None
    }
}

pub fn arrow_glyph(heading: Heading, glyphs: &LineGlyphs) -> Option<char> {
    match heading {
        Heading::Up => Some(glyphs.arrow_up),
        Heading::Down => Some(glyphs.arrow_down),
        Heading::Left => Some(glyphs.arrow_left),
        Heading::Right => Some(glyphs.arrow_right),
        Heading::None => None,
    }
}

/// Top-left cell of a one-row label centered on the middle cell of `cells`.
pub fn label_origin(cells: &[Cell], label: &str) -> Option<Point> {
    let mid = cells.get(cells.len() / 2)?.0;
    let width = cell_width(label) as i32;
    Some(Point::new(mid.x - width / 2, mid.y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::Charset;

    fn rp(x: i32, y: i32, heading: Heading) -> RoutePoint {
        RoutePoint {
            point: Point::new(x, y),
            heading,
        }
    }

    fn glyph_at(cells: &[Cell], x: i32, y: i32) -> Option<char> {
        cells
            .iter()
            .rev()
            .find(|cell| cell.0 == Point::new(x, y))
            .map(|cell| cell.1)
    }

    #[test]
    fn z_path_gets_corner_glyphs() {
        let glyphs = Charset::Thin.glyphs();
        let path = [
            rp(0, 0, Heading::Down),
            rp(0, 2, Heading::Down),
            rp(4, 2, Heading::Right),
            rp(4, 4, Heading::Down),
        ];
        let cells = path_cells(&path, &glyphs, CellStyle::default());
        assert_eq!(cells.len(), 3 + 4 + 2);
        assert_eq!(glyph_at(&cells, 0, 1), Some('│'));
        assert_eq!(glyph_at(&cells, 0, 2), Some('└'));
        assert_eq!(glyph_at(&cells, 2, 2), Some('─'));
        assert_eq!(glyph_at(&cells, 4, 2), Some('┐'));
        assert_eq!(glyph_at(&cells, 4, 4), Some('│'));
    }

    #[test]
    fn arrows_and_labels() {
        let glyphs = Charset::Ascii.glyphs();
        assert_eq!(arrow_glyph(Heading::Down, &glyphs), Some('v'));
        assert_eq!(arrow_glyph(Heading::None, &glyphs), None);
        let cells: Vec<Cell> = (0..5)
            .map(|y| (Point::new(3, y), '|', CellStyle::default()))
            .collect();
        assert_eq!(label_origin(&cells, "go"), Some(Point::new(2, 2)));
        assert_eq!(label_origin(&[], "go"), None);
    }
}
