//! Visual fragments: z-ordered rectangles of styled terminal cells.
//!
//! Every drawable element (node body, edge line, arrow tip, label, port)
//! becomes a [`Fragment`]. A fragment owns one [`Strip`] per covered row;
//! strips are built from [`Run`]s, where a spacer run is transparent and lets
//! whatever lies underneath show through.

use crossterm::style::Color;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use unicode_width::UnicodeWidthChar;

use crate::geometry::{Point, Region};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CellStyle {
    pub fg: Option<Color>,
    pub bg: Option<Color>,
    pub bold: bool,
    pub dim: bool,
    pub italic: bool,
    pub underline: bool,
}

impl CellStyle {
    pub fn is_plain(&self) -> bool {
        *self == CellStyle::default()
    }
}

/// A horizontal span inside a strip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Run {
    /// One cell per char. Text is sanitized to single-width chars on creation.
    Text { text: String, style: CellStyle },
    /// Transparent gap of the given number of cells.
    Spacer(usize),
}

impl Run {
    pub fn text(text: &str, style: CellStyle) -> Self {
        Run::Text {
            text: sanitize_cells(text),
            style,
        }
    }

    pub fn blank(width: usize) -> Self {
        Run::Text {
            text: " ".repeat(width),
            style: CellStyle::default(),
        }
    }

    pub fn width(&self) -> usize {
        match self {
            Run::Text { text, .. } => text.chars().count(),
            Run::Spacer(width) => *width,
        }
    }

    pub fn is_spacer(&self) -> bool {
        matches!(self, Run::Spacer(_))
    }

    /// Splits after `cells` cells. The left part may be empty.
    pub fn split_at(&self, cells: usize) -> (Run, Run) {
        match self {
            Run::Text { text, style } => {
                let cut = text
                    .char_indices()
                    .nth(cells)
                    .map(|(idx, _)| idx)
                    .unwrap_or(text.len());
                (
                    Run::Text {
                        text: text[..cut].to_string(),
                        style: *style,
                    },
                    Run::Text {
                        text: text[cut..].to_string(),
                        style: *style,
                    },
                )
            }
            Run::Spacer(width) => {
                let left = cells.min(*width);
                (Run::Spacer(left), Run::Spacer(width - left))
            }
        }
    }
}

/// Replaces chars that do not occupy exactly one terminal cell.
pub fn sanitize_cells(text: &str) -> String {
    text.chars()
        .filter_map(|ch| match ch.width() {
            Some(1) => Some(ch),
            Some(0) | None => None,
            Some(_) => Some('?'),
        })
        .collect()
}

/// Width of `text` in cells after sanitizing.
pub fn cell_width(text: &str) -> usize {
    sanitize_cells(text).chars().count()
}

/// The runs of one row, starting at the left edge of their fragment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Strip {
    pub runs: Vec<Run>,
}

impl Strip {
    pub fn new(runs: Vec<Run>) -> Self {
        Self { runs }
    }

    pub fn blank(width: usize) -> Self {
        Self {
            runs: vec![Run::blank(width)],
        }
    }

    pub fn width(&self) -> usize {
        self.runs.iter().map(Run::width).sum()
    }

    pub fn push_text(&mut self, text: &str, style: CellStyle) {
        if text.is_empty() {
            return;
        }
        if let Some(Run::Text {
            text: last,
            style: last_style,
        }) = self.runs.last_mut()
            && *last_style == style
        {
            last.push_str(&sanitize_cells(text));
            return;
        }
        self.runs.push(Run::text(text, style));
    }

    pub fn push_spacer(&mut self, width: usize) {
        if width == 0 {
            return;
        }
        if let Some(Run::Spacer(last)) = self.runs.last_mut() {
            *last += width;
            return;
        }
        self.runs.push(Run::Spacer(width));
    }

    pub fn push_run(&mut self, run: Run) {
        match run {
            Run::Text { text, style } => self.push_text(&text, style),
            Run::Spacer(width) => self.push_spacer(width),
        }
    }

    /// Contiguous opaque groups with their start column.
    pub fn opaque_spans(&self) -> Vec<(usize, Vec<Run>)> {
        let mut spans = Vec::new();
        let mut x = 0usize;
        let mut current: Option<(usize, Vec<Run>)> = None;
        for run in &self.runs {
            let width = run.width();
            if run.is_spacer() {
                if let Some(span) = current.take() {
                    spans.push(span);
                }
            } else if width > 0 {
                current
                    .get_or_insert_with(|| (x, Vec::new()))
                    .1
                    .push(run.clone());
            }
            x += width;
        }
        if let Some(span) = current {
            spans.push(span);
        }
        spans
    }

    /// The row as plain text, spacers rendered as blanks.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for run in &self.runs {
            match run {
                Run::Text { text, .. } => out.push_str(text),
                Run::Spacer(width) => out.extend(std::iter::repeat_n(' ', *width)),
            }
        }
        out
    }
}

/// Coarse z layers, back to front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Layer {
    Node,
    Edge,
    EdgeDecoration,
    Label,
    Port,
    PortLabel,
}

/// Paint order key: the layer first, then the index within the layer.
/// Greater keys are drawn in front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ZOrder {
    pub layer: Layer,
    pub index: i32,
}

impl ZOrder {
    pub const fn new(layer: Layer, index: i32) -> Self {
        Self { layer, index }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum FragmentKind {
    Node(String),
    Edge(String),
    EdgeDecoration(String),
    EdgeLabel(String),
    Port { node: String, port: String },
    PortLabel { node: String, port: String },
}

/// Anything the compositor can draw.
pub trait Visual {
    fn region(&self) -> Region;
    fn z_order(&self) -> ZOrder;
    /// One strip per row of `region()`, top to bottom.
    fn rows(&self) -> &[Strip];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fragment {
    pub kind: FragmentKind,
    pub region: Region,
    pub z: ZOrder,
    pub strips: Vec<Strip>,
}

impl Fragment {
    /// Builds a fragment whose region is sized to fit its strips.
    pub fn new(kind: FragmentKind, origin: Point, z: ZOrder, strips: Vec<Strip>) -> Self {
        let width = strips.iter().map(Strip::width).max().unwrap_or(0) as i32;
        let height = strips.len() as i32;
        Self {
            kind,
            region: Region::new(origin.x, origin.y, width, height),
            z,
            strips,
        }
    }

    /// Builds a fragment from scattered cells. Returns `None` when there are
    /// no cells. Later cells at the same position replace earlier ones.
    pub fn from_cells(
        kind: FragmentKind,
        z: ZOrder,
        cells: &[(Point, char, CellStyle)],
    ) -> Option<Self> {
        if cells.is_empty() {
            return None;
        }
        let mut grid: BTreeMap<(i32, i32), (char, CellStyle)> = BTreeMap::new();
        for (point, ch, style) in cells {
            grid.insert((point.y, point.x), (*ch, *style));
        }
        let min_x = cells.iter().map(|(p, _, _)| p.x).min()?;
        let min_y = cells.iter().map(|(p, _, _)| p.y).min()?;
        let max_y = cells.iter().map(|(p, _, _)| p.y).max()?;

        let mut strips = Vec::with_capacity((max_y - min_y + 1) as usize);
        for y in min_y..=max_y {
            let mut strip = Strip::default();
            let mut cursor = min_x;
            for (&(_, x), (ch, style)) in grid.range((y, i32::MIN)..=(y, i32::MAX)) {
                strip.push_spacer((x - cursor) as usize);
                let mut buf = [0u8; 4];
                strip.push_text(ch.encode_utf8(&mut buf), *style);
                cursor = x + 1;
            }
            strips.push(strip);
        }
        Some(Fragment::new(kind, Point::new(min_x, min_y), z, strips))
    }

    pub fn translate(&mut self, dx: i32, dy: i32) {
        self.region = self.region.translate(dx, dy);
    }

    /// Panics when the fragment breaks the row-coverage or width invariant.
    pub fn validate(&self) {
        validate_visual(self);
    }
}

impl Visual for Fragment {
    fn region(&self) -> Region {
        self.region
    }

    fn z_order(&self) -> ZOrder {
        self.z
    }

    fn rows(&self) -> &[Strip] {
        &self.strips
    }
}

/// Asserts that `visual` supplies exactly one strip per row of its region
/// and that no strip runs past the region's right edge.
pub fn validate_visual<V: Visual + ?Sized>(visual: &V) {
    let region = visual.region();
    let rows = visual.rows();
    assert!(
        rows.len() as i32 == region.height.max(0),
        "fragment at {:?} supplies {} rows for height {}",
        region.top_left(),
        rows.len(),
        region.height
    );
    for (offset, strip) in rows.iter().enumerate() {
        let width = strip.width() as i32;
        assert!(
            width <= region.width,
            "row {offset} of fragment at {:?} is {width} cells wide, region allows {}",
            region.top_left(),
            region.width
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_wide_and_drops_zero_width() {
        assert_eq!(sanitize_cells("ab"), "ab");
        assert_eq!(sanitize_cells("a\u{4e2d}b"), "a?b");
        assert_eq!(sanitize_cells("a\u{200b}b"), "ab");
        assert_eq!(cell_width("\u{2500}\u{2502}"), 2);
    }

    #[test]
    fn run_split_keeps_style() {
        let style = CellStyle {
            bold: true,
            ..Default::default()
        };
        let (left, right) = Run::text("hello", style).split_at(2);
        assert_eq!(left, Run::text("he", style));
        assert_eq!(right, Run::text("llo", style));
        let (left, right) = Run::Spacer(3).split_at(5);
        assert_eq!(left, Run::Spacer(3));
        assert_eq!(right, Run::Spacer(0));
    }

    #[test]
    fn opaque_spans_split_at_spacers() {
        let mut strip = Strip::default();
        strip.push_text("ab", CellStyle::default());
        strip.push_spacer(3);
        strip.push_text("c", CellStyle::default());
        let spans = strip.opaque_spans();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].0, 0);
        assert_eq!(spans[1].0, 5);
        assert_eq!(strip.plain_text(), "ab   c");
    }

    #[test]
    fn from_cells_covers_every_row() {
        let style = CellStyle::default();
        let cells = vec![
            (Point::new(2, 0), '|', style),
            (Point::new(5, 3), '-', style),
            (Point::new(4, 3), '-', style),
        ];
        let fragment = Fragment::from_cells(
            FragmentKind::Edge("e".into()),
            ZOrder::new(Layer::Edge, 0),
            &cells,
        )
        .unwrap();
        assert_eq!(fragment.region, Region::new(2, 0, 4, 4));
        assert_eq!(fragment.strips.len(), 4);
        assert_eq!(fragment.strips[1].width(), 0);
        assert_eq!(fragment.strips[3].plain_text(), "  --");
        fragment.validate();
    }

    #[test]
    #[should_panic(expected = "supplies")]
    fn validate_rejects_missing_rows() {
        let mut fragment = Fragment::new(
            FragmentKind::Node("n".into()),
            Point::new(0, 0),
            ZOrder::new(Layer::Node, 0),
            vec![Strip::blank(2), Strip::blank(2)],
        );
        fragment.strips.pop();
        fragment.validate();
    }

    #[test]
    fn z_order_sorts_layers_before_index() {
        let edge = ZOrder::new(Layer::Edge, -5);
        let node = ZOrder::new(Layer::Node, 100);
        assert!(edge > node);
        assert!(ZOrder::new(Layer::PortLabel, 0) > ZOrder::new(Layer::Port, 9));
    }
}
