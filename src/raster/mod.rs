//! Turning node content and edge paths into rows of styled cells.

pub mod edge;
pub mod text;

use crate::fragment::{CellStyle, Run, Strip, cell_width};
use crate::properties::{Padding, ShapeKind};

#[derive(Debug, Clone, Copy)]
pub struct RasterContent<'a> {
    pub label: &'a str,
    /// Wrap width for the label, in cells.
    pub max_width: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RasterStyle {
    pub text: CellStyle,
    pub border: CellStyle,
}

/// A rectangle of cells with its declared size.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub width: usize,
    pub height: usize,
    pub rows: Vec<Strip>,
}

pub trait ShapeRasterizer {
    /// Must return at least one row; every row must fit in `width`.
    fn render(
        &self,
        content: &RasterContent<'_>,
        style: &RasterStyle,
        padding: Padding,
        shape: ShapeKind,
    ) -> anyhow::Result<Raster>;
}

impl<T: ShapeRasterizer + ?Sized> ShapeRasterizer for Box<T> {
    fn render(
        &self,
        content: &RasterContent<'_>,
        style: &RasterStyle,
        padding: Padding,
        shape: ShapeKind,
    ) -> anyhow::Result<Raster> {
        (**self).render(content, style, padding, shape)
    }
}

struct Border {
    top_left: char,
    top_right: char,
    bottom_left: char,
    bottom_right: char,
    horizontal: char,
    vertical: char,
}

fn border_for(shape: ShapeKind) -> Option<Border> {
    let (top_left, top_right, bottom_left, bottom_right, horizontal, vertical) = match shape {
        ShapeKind::Box => ('┌', '┐', '└', '┘', '─', '│'),
        ShapeKind::Rounded => ('╭', '╮', '╰', '╯', '─', '│'),
        ShapeKind::Double => ('╔', '╗', '╚', '╝', '═', '║'),
        ShapeKind::Heavy => ('┏', '┓', '┗', '┛', '━', '┃'),
        ShapeKind::Ascii => ('+', '+', '+', '+', '-', '|'),
        ShapeKind::None => return None,
    };
    Some(Border {
        top_left,
        top_right,
        bottom_left,
        bottom_right,
        horizontal,
        vertical,
    })
}

/// Draws bordered boxes around wrapped, centered label text.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoxRasterizer;

impl ShapeRasterizer for BoxRasterizer {
    fn render(
        &self,
        content: &RasterContent<'_>,
        style: &RasterStyle,
        padding: Padding,
        shape: ShapeKind,
    ) -> anyhow::Result<Raster> {
        let lines = text::layout_label(content.label, content.max_width);
        let text_width = lines.iter().map(|line| cell_width(line)).max().unwrap_or(0);
        let pad_h = padding.horizontal as usize;
        let pad_v = padding.vertical as usize;
        let inner_width = (text_width + pad_h * 2).max(1);
        let inner_height = lines.len() + pad_v * 2;

        let mut body: Vec<Strip> = Vec::with_capacity(inner_height);
        for _ in 0..pad_v {
            body.push(Strip::new(vec![Run::text(&" ".repeat(inner_width), style.text)]));
        }
        for line in &lines {
            let width = cell_width(line);
            let left = (inner_width - width) / 2;
            let right = inner_width - width - left;
            let mut strip = Strip::default();
            strip.push_text(&" ".repeat(left), style.text);
            strip.push_text(line, style.text);
            strip.push_text(&" ".repeat(right), style.text);
            body.push(strip);
        }
        for _ in 0..pad_v {
            body.push(Strip::new(vec![Run::text(&" ".repeat(inner_width), style.text)]));
        }

        let Some(border) = border_for(shape) else {
            return Ok(Raster {
                width: inner_width,
                height: body.len(),
                rows: body,
            });
        };

        let edge_row = |left: char, right: char| {
            let mut strip = Strip::default();
            let mut text = String::with_capacity(inner_width + 2);
            text.push(left);
            text.extend(std::iter::repeat_n(border.horizontal, inner_width));
            text.push(right);
            strip.push_text(&text, style.border);
            strip
        };
        let vertical = border.vertical.to_string();

        let mut rows = Vec::with_capacity(inner_height + 2);
        rows.push(edge_row(border.top_left, border.top_right));
        for inner in body {
            let mut strip = Strip::default();
            strip.push_text(&vertical, style.border);
            for run in inner.runs {
                strip.push_run(run);
            }
            strip.push_text(&vertical, style.border);
            rows.push(strip);
        }
        rows.push(edge_row(border.bottom_left, border.bottom_right));

        Ok(Raster {
            width: inner_width + 2,
            height: rows.len(),
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(label: &str, shape: ShapeKind, padding: Padding) -> Raster {
        BoxRasterizer
            .render(
                &RasterContent {
                    label,
                    max_width: 20,
                },
                &RasterStyle::default(),
                padding,
                shape,
            )
            .unwrap()
    }

    fn text(raster: &Raster) -> Vec<String> {
        raster.rows.iter().map(Strip::plain_text).collect()
    }

    #[test]
    fn box_around_label() {
        let raster = render("Hello", ShapeKind::Box, Padding::default());
        assert_eq!(raster.width, 9);
        assert_eq!(raster.height, 3);
        assert_eq!(text(&raster), vec!["┌───────┐", "│ Hello │", "└───────┘"]);
    }

    #[test]
    fn multi_line_labels_are_centered() {
        let raster = render(
            "ab\nabcd",
            ShapeKind::Ascii,
            Padding {
                vertical: 1,
                horizontal: 0,
            },
        );
        assert_eq!(
            text(&raster),
            vec!["+----+", "|    |", "| ab |", "|abcd|", "|    |", "+----+"]
        );
    }

    #[test]
    fn borderless_shape_is_just_text() {
        let raster = render("hi", ShapeKind::None, Padding::default());
        assert_eq!(text(&raster), vec![" hi "]);
        assert!(raster.rows.iter().all(|row| row.width() == raster.width));
    }
}
