use crossterm::style::Color;
use serde::{Deserialize, Serialize};

use crate::fragment::CellStyle;

/// Glyph family used for edge lines and node borders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Charset {
    Ascii,
    #[default]
    Thin,
    Thick,
    Double,
}

impl Charset {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "ascii" => Some(Charset::Ascii),
            "thin" | "box" | "light" => Some(Charset::Thin),
            "thick" | "heavy" => Some(Charset::Thick),
            "double" => Some(Charset::Double),
            _ => None,
        }
    }

    pub fn glyphs(self) -> LineGlyphs {
        match self {
            Charset::Ascii => LineGlyphs {
                horizontal: '-',
                vertical: '|',
                rising: '/',
                falling: '\\',
                top_left: '+',
                top_right: '+',
                bottom_left: '+',
                bottom_right: '+',
                arrow_up: '^',
                arrow_down: 'v',
                arrow_left: '<',
                arrow_right: '>',
            },
            Charset::Thin => LineGlyphs {
                horizontal: '─',
                vertical: '│',
                rising: '╱',
                falling: '╲',
                top_left: '┌',
                top_right: '┐',
                bottom_left: '└',
                bottom_right: '┘',
                arrow_up: '▲',
                arrow_down: '▼',
                arrow_left: '◀',
                arrow_right: '▶',
            },
            Charset::Thick => LineGlyphs {
                horizontal: '━',
                vertical: '┃',
                rising: '╱',
                falling: '╲',
                top_left: '┏',
                top_right: '┓',
                bottom_left: '┗',
                bottom_right: '┛',
                arrow_up: '▲',
                arrow_down: '▼',
                arrow_left: '◀',
                arrow_right: '▶',
            },
            Charset::Double => LineGlyphs {
                horizontal: '═',
                vertical: '║',
                rising: '╱',
                falling: '╲',
                top_left: '╔',
                top_right: '╗',
                bottom_left: '╚',
                bottom_right: '╝',
                arrow_up: '▲',
                arrow_down: '▼',
                arrow_left: '◀',
                arrow_right: '▶',
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineGlyphs {
    pub horizontal: char,
    pub vertical: char,
    pub rising: char,
    pub falling: char,
    pub top_left: char,
    pub top_right: char,
    pub bottom_left: char,
    pub bottom_right: char,
    pub arrow_up: char,
    pub arrow_down: char,
    pub arrow_left: char,
    pub arrow_right: char,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub node_text: CellStyle,
    pub node_border: CellStyle,
    pub edge_line: CellStyle,
    pub edge_label: CellStyle,
    pub arrow_tip: CellStyle,
    pub port: CellStyle,
    pub port_label: CellStyle,
    pub charset: Charset,
    pub port_symbol: char,
    pub port_symbol_connected: char,
}

impl Theme {
    /// No colors; safe for logs and snapshot tests.
    pub fn plain() -> Self {
        Self {
            node_text: CellStyle::default(),
            node_border: CellStyle::default(),
            edge_line: CellStyle::default(),
            edge_label: CellStyle::default(),
            arrow_tip: CellStyle::default(),
            port: CellStyle::default(),
            port_label: CellStyle::default(),
            charset: Charset::Thin,
            port_symbol: '○',
            port_symbol_connected: '●',
        }
    }

    pub fn colorful() -> Self {
        Self {
            node_text: CellStyle {
                bold: true,
                ..Default::default()
            },
            node_border: CellStyle {
                fg: Some(Color::Blue),
                ..Default::default()
            },
            edge_line: CellStyle {
                fg: Some(Color::Grey),
                ..Default::default()
            },
            edge_label: CellStyle {
                fg: Some(Color::Yellow),
                ..Default::default()
            },
            arrow_tip: CellStyle {
                fg: Some(Color::White),
                bold: true,
                ..Default::default()
            },
            port: CellStyle {
                fg: Some(Color::Magenta),
                ..Default::default()
            },
            port_label: CellStyle {
                fg: Some(Color::DarkMagenta),
                italic: true,
                ..Default::default()
            },
            charset: Charset::Thin,
            port_symbol: '○',
            port_symbol_connected: '●',
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "plain" | "default" => Some(Self::plain()),
            "colorful" | "color" => Some(Self::colorful()),
            _ => None,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::plain()
    }
}

/// Parses a style string such as `"bold red on #202020"`.
///
/// Tokens apply on top of `base`, so an empty string yields `base`.
pub fn parse_style(input: &str, base: CellStyle) -> Result<CellStyle, String> {
    let mut style = base;
    let mut tokens = input.split_whitespace();
    while let Some(token) = tokens.next() {
        match token.to_ascii_lowercase().as_str() {
            "bold" => style.bold = true,
            "dim" => style.dim = true,
            "italic" => style.italic = true,
            "underline" => style.underline = true,
            "plain" | "none" => style = CellStyle::default(),
            "on" => {
                let color = tokens
                    .next()
                    .ok_or_else(|| "missing color after `on`".to_string())?;
                style.bg = Some(parse_color(color)?);
            }
            other => style.fg = Some(parse_color(other)?),
        }
    }
    Ok(style)
}

pub fn parse_color(token: &str) -> Result<Color, String> {
    let lower = token.trim().to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix('#') {
        return parse_hex_color(hex).ok_or_else(|| format!("invalid hex color `{token}`"));
    }
    let color = match lower.replace(['-', ' '], "_").as_str() {
        "black" => Color::Black,
        "dark_grey" | "dark_gray" => Color::DarkGrey,
        "red" => Color::Red,
        "dark_red" => Color::DarkRed,
        "green" => Color::Green,
        "dark_green" => Color::DarkGreen,
        "yellow" => Color::Yellow,
        "dark_yellow" => Color::DarkYellow,
        "blue" => Color::Blue,
        "dark_blue" => Color::DarkBlue,
        "magenta" => Color::Magenta,
        "dark_magenta" => Color::DarkMagenta,
        "cyan" => Color::Cyan,
        "dark_cyan" => Color::DarkCyan,
        "white" => Color::White,
        "grey" | "gray" => Color::Grey,
        "reset" | "default" => Color::Reset,
        _ => return Err(format!("unknown color `{token}`")),
    };
    Ok(color)
}

fn parse_hex_color(hex: &str) -> Option<Color> {
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|ch| [ch, ch]).collect(),
        6 => hex.to_string(),
        _ => return None,
    };
    let r = u8::from_str_radix(&expanded[0..2], 16).ok()?;
    let g = u8::from_str_radix(&expanded[2..4], 16).ok()?;
    let b = u8::from_str_radix(&expanded[4..6], 16).ok()?;
    Some(Color::Rgb { r, g, b })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_style_tokens() {
        let style = parse_style("bold red on #102030", CellStyle::default()).unwrap();
        assert!(style.bold);
        assert_eq!(style.fg, Some(Color::Red));
        assert_eq!(
            style.bg,
            Some(Color::Rgb {
                r: 0x10,
                g: 0x20,
                b: 0x30
            })
        );
    }

    #[test]
    fn style_tokens_layer_on_base() {
        let base = CellStyle {
            fg: Some(Color::Blue),
            ..Default::default()
        };
        let style = parse_style("italic", base).unwrap();
        assert_eq!(style.fg, Some(Color::Blue));
        assert!(style.italic);
        assert_eq!(parse_style("", base).unwrap(), base);
    }

    #[test]
    fn rejects_unknown_colors() {
        assert!(parse_style("blurple", CellStyle::default()).is_err());
        assert!(parse_style("on", CellStyle::default()).is_err());
        assert!(parse_color("#12").is_err());
        assert_eq!(
            parse_color("#fff").unwrap(),
            Color::Rgb {
                r: 255,
                g: 255,
                b: 255
            }
        );
    }

    #[test]
    fn charset_tokens() {
        assert_eq!(Charset::from_token("heavy"), Some(Charset::Thick));
        assert_eq!(Charset::Ascii.glyphs().arrow_down, 'v');
    }
}
