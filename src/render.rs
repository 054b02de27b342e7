use crate::fragment::{CellStyle, Run, Strip};
use anyhow::Result;
use crossterm::queue;
use crossterm::style::{Attribute, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor};
use std::io::{self, Write};
use std::path::Path;

/// Rows as plain text, one line per row. Rows keep their full width.
pub fn render_plain(rows: &[Strip]) -> String {
    let mut out = String::new();
    for row in rows {
        out.push_str(&row.plain_text());
        out.push('\n');
    }
    out
}

/// Writes rows to a terminal-like sink with ANSI styling.
pub struct AnsiSink<W: Write> {
    out: W,
}

impl<W: Write> AnsiSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn write_rows(&mut self, rows: &[Strip]) -> io::Result<()> {
        for row in rows {
            self.write_row(row)?;
            queue!(self.out, Print("\n"))?;
        }
        self.out.flush()
    }

    fn write_row(&mut self, row: &Strip) -> io::Result<()> {
        for run in &row.runs {
            match run {
                Run::Spacer(width) => queue!(self.out, Print(" ".repeat(*width)))?,
                Run::Text { text, style } if style.is_plain() => queue!(self.out, Print(text))?,
                Run::Text { text, style } => {
                    self.apply(style)?;
                    queue!(self.out, Print(text), SetAttribute(Attribute::Reset), ResetColor)?;
                }
            }
        }
        Ok(())
    }

    fn apply(&mut self, style: &CellStyle) -> io::Result<()> {
        if let Some(fg) = style.fg {
            queue!(self.out, SetForegroundColor(fg))?;
        }
        if let Some(bg) = style.bg {
            queue!(self.out, SetBackgroundColor(bg))?;
        }
        let attributes = [
            (style.bold, Attribute::Bold),
            (style.dim, Attribute::Dim),
            (style.italic, Attribute::Italic),
            (style.underline, Attribute::Underlined),
        ];
        for (enabled, attribute) in attributes {
            if enabled {
                queue!(self.out, SetAttribute(attribute))?;
            }
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Rows as text with ANSI escape sequences.
pub fn render_ansi(rows: &[Strip]) -> Result<String> {
    let mut sink = AnsiSink::new(Vec::new());
    sink.write_rows(rows)?;
    Ok(String::from_utf8(sink.into_inner())?)
}

pub fn write_output(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text)?;
        }
        None => {
            print!("{}", text);
        }
    }
    Ok(())
}
