//! Strongly typed snapshots resolved from node and edge attribute maps.
//!
//! Resolution is a pure function of the attribute map and the active
//! [`Theme`]; a snapshot is rebuilt whenever its attributes change.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{RenderError, Result};
use crate::fragment::CellStyle;
use crate::geometry::{FPoint, Side};
use crate::ir::{AttrValue, Attributes};
use crate::theme::{Charset, Theme, parse_style};

/// Maps a continuous zoom factor to a discrete level of detail.
///
/// Level 1 is full detail. Every threshold greater than the zoom factor adds
/// one level, so `[0.5, 0.25]` yields level 2 below 0.5 and level 3 below 0.25.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LodSelector {
    thresholds: Vec<f32>,
}

impl LodSelector {
    pub fn new(mut thresholds: Vec<f32>) -> Self {
        thresholds.retain(|value| value.is_finite());
        thresholds.sort_by(|a, b| b.total_cmp(a));
        Self { thresholds }
    }

    pub fn level(&self, zoom: f32) -> u8 {
        let coarser = self.thresholds.iter().filter(|&&t| zoom < t).count();
        (1 + coarser).min(u8::MAX as usize) as u8
    }
}

/// A base snapshot plus per-level replacements.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leveled<T> {
    pub base: T,
    pub levels: BTreeMap<u8, T>,
    pub lod: LodSelector,
}

impl<T> Leveled<T> {
    pub fn at(&self, level: u8) -> &T {
        self.levels.get(&level).unwrap_or(&self.base)
    }

    pub fn for_zoom(&self, zoom: f32) -> (u8, &T) {
        let level = self.lod.level(zoom);
        (level, self.at(level))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum ShapeKind {
    #[default]
    Box,
    Rounded,
    Double,
    Heavy,
    Ascii,
    /// Bare text without a border.
    None,
}

impl ShapeKind {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "box" | "rect" | "square" => Some(ShapeKind::Box),
            "rounded" | "round" => Some(ShapeKind::Rounded),
            "double" => Some(ShapeKind::Double),
            "heavy" | "thick" => Some(ShapeKind::Heavy),
            "ascii" => Some(ShapeKind::Ascii),
            "none" | "text" | "plain" => Some(ShapeKind::None),
            _ => None,
        }
    }

    pub fn has_border(self) -> bool {
        self != ShapeKind::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Padding {
    pub vertical: u16,
    pub horizontal: u16,
}

impl Default for Padding {
    fn default() -> Self {
        Self {
            vertical: 0,
            horizontal: 1,
        }
    }
}

/// A named connection point declared on a node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortDecl {
    pub name: String,
    pub magnet: Option<Side>,
    /// Explicit offset along the side, relative to its center.
    pub offset: Option<f32>,
    pub priority: i32,
    pub label: Option<String>,
    pub symbol: char,
    pub symbol_connected: char,
    pub style: CellStyle,
    pub label_style: CellStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeProperties {
    pub label: String,
    pub shape: ShapeKind,
    pub padding: Padding,
    pub text_style: CellStyle,
    pub border_style: CellStyle,
    /// Pinned graph coordinates, read by the static layout.
    pub position: Option<FPoint>,
    pub margin: Option<u16>,
    pub ports: BTreeMap<String, PortDecl>,
    pub z: i32,
}

/// Where an edge end attaches when no named port is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum Magnet {
    #[default]
    Auto,
    Side(Side),
    /// Straight towards the node center, clipped at the boundary.
    Center,
}

impl Magnet {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "auto" | "" => Some(Magnet::Auto),
            "center" | "centre" => Some(Magnet::Center),
            other => Side::from_token(other).map(Magnet::Side),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeProperties {
    pub label: Option<String>,
    pub start_port: Option<String>,
    pub end_port: Option<String>,
    pub start_magnet: Magnet,
    pub end_magnet: Magnet,
    pub start_arrow: bool,
    pub end_arrow: bool,
    pub line: Charset,
    pub style: CellStyle,
    pub label_style: CellStyle,
    pub arrow_style: CellStyle,
    pub z: i32,
}

impl EdgeProperties {
    pub fn port(&self, at_start: bool) -> Option<&str> {
        if at_start {
            self.start_port.as_deref()
        } else {
            self.end_port.as_deref()
        }
    }

    pub fn magnet(&self, at_start: bool) -> Magnet {
        if at_start {
            self.start_magnet
        } else {
            self.end_magnet
        }
    }
}

pub fn resolve_node(id: &str, attributes: &Attributes, theme: &Theme) -> Result<Leveled<NodeProperties>> {
    resolve_leveled(attributes, |attrs| node_properties(id, attrs, theme))
}

pub fn resolve_edge(attributes: &Attributes, theme: &Theme) -> Result<Leveled<EdgeProperties>> {
    resolve_leveled(attributes, |attrs| edge_properties(attrs, theme))
}

fn resolve_leveled<T>(
    attributes: &Attributes,
    resolve: impl Fn(&Attributes) -> Result<T>,
) -> Result<Leveled<T>> {
    let base = resolve(attributes)?;
    let lod = match attributes.get("lod_map") {
        None => LodSelector::default(),
        Some(value) => {
            let items = value
                .as_list()
                .ok_or_else(|| RenderError::invalid_attribute("lod_map", "expected a list of numbers"))?;
            let thresholds = items
                .iter()
                .map(|item| {
                    item.as_f64().map(|v| v as f32).ok_or_else(|| {
                        RenderError::invalid_attribute("lod_map", "expected a list of numbers")
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            LodSelector::new(thresholds)
        }
    };

    let mut levels = BTreeMap::new();
    if let Some(value) = attributes.get("lod_overrides") {
        let table = value
            .as_map()
            .ok_or_else(|| RenderError::invalid_attribute("lod_overrides", "expected a map"))?;
        for (key, overrides) in table {
            let level: u8 = key.trim().parse().ok().filter(|level| *level >= 1).ok_or_else(|| {
                RenderError::invalid_attribute("lod_overrides", format!("invalid level `{key}`"))
            })?;
            let overrides = overrides.as_map().ok_or_else(|| {
                RenderError::invalid_attribute("lod_overrides", format!("level {level} is not a map"))
            })?;
            let mut merged = attributes.clone();
            merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
            levels.insert(level, resolve(&merged)?);
        }
    }

    Ok(Leveled { base, levels, lod })
}

fn node_properties(id: &str, attrs: &Attributes, theme: &Theme) -> Result<NodeProperties> {
    let label = text(attrs, "label")?.unwrap_or_else(|| id.to_string());
    let shape = match text(attrs, "shape")? {
        Some(token) => ShapeKind::from_token(&token)
            .ok_or_else(|| RenderError::invalid_attribute("shape", format!("unknown shape `{token}`")))?,
        None => ShapeKind::Box,
    };
    let padding = match attrs.get("padding") {
        None => Padding::default(),
        Some(value) => parse_padding(value)?,
    };
    let x = number(attrs, "x")?;
    let y = number(attrs, "y")?;
    let position = (x.is_some() || y.is_some()).then(|| FPoint::new(x.unwrap_or(0.0), y.unwrap_or(0.0)));
    let margin = match integer(attrs, "margin")? {
        Some(value) => Some(
            u16::try_from(value)
                .map_err(|_| RenderError::invalid_attribute("margin", "must be non-negative"))?,
        ),
        None => None,
    };

    let mut ports = BTreeMap::new();
    if let Some(value) = attrs.get("ports") {
        let table = value
            .as_map()
            .ok_or_else(|| RenderError::invalid_attribute("ports", "expected a map of port names"))?;
        for (name, decl) in table {
            ports.insert(name.clone(), port_decl(name, decl, theme)?);
        }
    }

    Ok(NodeProperties {
        label,
        shape,
        padding,
        text_style: style(attrs, "style", theme.node_text)?,
        border_style: style(attrs, "border_style", theme.node_border)?,
        position,
        margin,
        ports,
        z: small_integer(attrs, "z")?.unwrap_or(0),
    })
}

fn port_decl(name: &str, value: &AttrValue, theme: &Theme) -> Result<PortDecl> {
    let key = format!("ports.{name}");
    let empty = Attributes::new();
    let attrs = match value {
        AttrValue::Map(map) => map,
        // `ports: { a: "left" }` is shorthand for a magnet.
        AttrValue::Str(_) => &empty,
        _ => return Err(RenderError::invalid_attribute(&key, "expected a map or a side")),
    };
    let magnet_token = match value {
        AttrValue::Str(token) => Some(token.clone()),
        _ => text(attrs, "magnet")?,
    };
    let magnet = match magnet_token {
        None => None,
        Some(token) if token.eq_ignore_ascii_case("auto") => None,
        Some(token) => Some(
            Side::from_token(&token)
                .ok_or_else(|| RenderError::invalid_attribute(&key, format!("unknown magnet `{token}`")))?,
        ),
    };
    Ok(PortDecl {
        name: name.to_string(),
        magnet,
        offset: number(attrs, "offset")?,
        priority: small_integer(attrs, "priority")?.unwrap_or(0),
        label: text(attrs, "label")?,
        symbol: symbol(attrs, "symbol")?.unwrap_or(theme.port_symbol),
        symbol_connected: symbol(attrs, "symbol_connected")?.unwrap_or(theme.port_symbol_connected),
        style: style(attrs, "style", theme.port)?,
        label_style: style(attrs, "label_style", theme.port_label)?,
    })
}

fn edge_properties(attrs: &Attributes, theme: &Theme) -> Result<EdgeProperties> {
    let line = match text(attrs, "line")? {
        Some(token) => Charset::from_token(&token)
            .ok_or_else(|| RenderError::invalid_attribute("line", format!("unknown line `{token}`")))?,
        None => theme.charset,
    };
    Ok(EdgeProperties {
        label: text(attrs, "label")?.filter(|label| !label.is_empty()),
        start_port: text(attrs, "start_port")?,
        end_port: text(attrs, "end_port")?,
        start_magnet: magnet(attrs, "start_magnet")?,
        end_magnet: magnet(attrs, "end_magnet")?,
        start_arrow: flag(attrs, "start_arrow")?.unwrap_or(false),
        end_arrow: flag(attrs, "end_arrow")?.unwrap_or(true),
        line,
        style: style(attrs, "style", theme.edge_line)?,
        label_style: style(attrs, "label_style", theme.edge_label)?,
        arrow_style: style(attrs, "arrow_style", theme.arrow_tip)?,
        z: small_integer(attrs, "z")?.unwrap_or(0),
    })
}

fn parse_padding(value: &AttrValue) -> Result<Padding> {
    let invalid = || RenderError::invalid_attribute("padding", "expected an integer or [vertical, horizontal]");
    let cells = |value: &AttrValue| {
        value
            .as_i64()
            .and_then(|v| u16::try_from(v).ok())
            .ok_or_else(invalid)
    };
    match value {
        AttrValue::List(items) if items.len() == 2 => Ok(Padding {
            vertical: cells(&items[0])?,
            horizontal: cells(&items[1])?,
        }),
        AttrValue::List(_) => Err(invalid()),
        other => {
            let all = cells(other)?;
            Ok(Padding {
                vertical: all,
                horizontal: all,
            })
        }
    }
}

fn text(attrs: &Attributes, key: &str) -> Result<Option<String>> {
    match attrs.get(key) {
        None => Ok(None),
        Some(value) => value
            .to_text()
            .map(Some)
            .ok_or_else(|| RenderError::invalid_attribute(key, "expected text")),
    }
}

fn number(attrs: &Attributes, key: &str) -> Result<Option<f32>> {
    match attrs.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_f64()
            .map(|v| Some(v as f32))
            .ok_or_else(|| RenderError::invalid_attribute(key, "expected a number")),
    }
}

fn integer(attrs: &Attributes, key: &str) -> Result<Option<i64>> {
    match attrs.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| RenderError::invalid_attribute(key, "expected an integer")),
    }
}

fn small_integer(attrs: &Attributes, key: &str) -> Result<Option<i32>> {
    match integer(attrs, key)? {
        None => Ok(None),
        Some(value) => i32::try_from(value)
            .map(Some)
            .map_err(|_| RenderError::invalid_attribute(key, format!("{value} is out of range"))),
    }
}

fn flag(attrs: &Attributes, key: &str) -> Result<Option<bool>> {
    match attrs.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_bool()
            .map(Some)
            .ok_or_else(|| RenderError::invalid_attribute(key, "expected a boolean")),
    }
}

fn symbol(attrs: &Attributes, key: &str) -> Result<Option<char>> {
    let Some(value) = text(attrs, key)? else {
        return Ok(None);
    };
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => Ok(Some(ch)),
        _ => Err(RenderError::invalid_attribute(key, "expected a single character")),
    }
}

fn magnet(attrs: &Attributes, key: &str) -> Result<Magnet> {
    match text(attrs, key)? {
        None => Ok(Magnet::Auto),
        Some(token) => Magnet::from_token(&token)
            .ok_or_else(|| RenderError::invalid_attribute(key, format!("unknown magnet `{token}`"))),
    }
}

fn style(attrs: &Attributes, key: &str, base: CellStyle) -> Result<CellStyle> {
    match text(attrs, key)? {
        None => Ok(base),
        Some(value) => parse_style(&value, base).map_err(|reason| RenderError::invalid_attribute(key, reason)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::attrs;

    #[test]
    fn lod_levels_count_thresholds_above_zoom() {
        let lod = LodSelector::new(vec![0.25, 0.5]);
        assert_eq!(lod.level(1.0), 1);
        assert_eq!(lod.level(0.5), 1);
        assert_eq!(lod.level(0.4), 2);
        assert_eq!(lod.level(0.1), 3);
        assert_eq!(LodSelector::default().level(0.01), 1);
    }

    #[test]
    fn node_defaults_fall_back_to_theme() {
        let theme = Theme::colorful();
        let props = resolve_node("A", &Attributes::new(), &theme).unwrap();
        assert_eq!(props.base.label, "A");
        assert_eq!(props.base.shape, ShapeKind::Box);
        assert_eq!(props.base.border_style, theme.node_border);
        assert_eq!(props.base.position, None);
        assert!(props.levels.is_empty());
    }

    #[test]
    fn level_overrides_merge_over_attributes() {
        let mut overrides = Attributes::new();
        overrides.insert("label".into(), "H".into());
        overrides.insert("shape".into(), "none".into());
        let mut table = Attributes::new();
        table.insert("2".into(), AttrValue::Map(overrides));
        let mut node = attrs([
            ("label", "Hello".into()),
            ("x", 3i64.into()),
            ("lod_map", AttrValue::List(vec![0.5.into()])),
        ]);
        node.insert("lod_overrides".into(), AttrValue::Map(table));

        let props = resolve_node("n", &node, &Theme::plain()).unwrap();
        let (level, coarse) = props.for_zoom(0.3);
        assert_eq!(level, 2);
        assert_eq!(coarse.label, "H");
        assert_eq!(coarse.shape, ShapeKind::None);
        assert_eq!(coarse.position, Some(FPoint::new(3.0, 0.0)));
        assert_eq!(props.for_zoom(1.0).1.label, "Hello");
    }

    #[test]
    fn ports_accept_maps_and_side_shorthand() {
        let mut ports = Attributes::new();
        ports.insert("in".into(), "left".into());
        ports.insert(
            "out".into(),
            AttrValue::Map(attrs([
                ("magnet", "right".into()),
                ("priority", 2i64.into()),
                ("symbol", "*".into()),
            ])),
        );
        let mut node = Attributes::new();
        node.insert("ports".into(), AttrValue::Map(ports));
        let props = resolve_node("n", &node, &Theme::plain()).unwrap().base;
        assert_eq!(props.ports["in"].magnet, Some(Side::Left));
        assert_eq!(props.ports["out"].magnet, Some(Side::Right));
        assert_eq!(props.ports["out"].priority, 2);
        assert_eq!(props.ports["out"].symbol, '*');
        assert_eq!(props.ports["in"].symbol, '○');
    }

    #[test]
    fn padding_forms() {
        let props = resolve_node(
            "n",
            &attrs([("padding", AttrValue::List(vec![1i64.into(), 3i64.into()]))]),
            &Theme::plain(),
        )
        .unwrap();
        assert_eq!(
            props.base.padding,
            Padding {
                vertical: 1,
                horizontal: 3
            }
        );
        assert!(resolve_node("n", &attrs([("padding", (-1i64).into())]), &Theme::plain()).is_err());
    }

    #[test]
    fn edge_properties_parse_magnets_and_arrows() {
        let props = resolve_edge(
            &attrs([
                ("start_magnet", "center".into()),
                ("end_magnet", "top".into()),
                ("start_arrow", true.into()),
                ("line", "double".into()),
            ]),
            &Theme::plain(),
        )
        .unwrap()
        .base;
        assert_eq!(props.start_magnet, Magnet::Center);
        assert_eq!(props.end_magnet, Magnet::Side(Side::Top));
        assert!(props.start_arrow && props.end_arrow);
        assert_eq!(props.line, Charset::Double);
    }

    #[test]
    fn bad_values_name_the_attribute() {
        let err = resolve_edge(&attrs([("end_magnet", "sideways".into())]), &Theme::plain()).unwrap_err();
        assert!(matches!(err, RenderError::InvalidAttribute { key, .. } if key == "end_magnet"));
        let err = resolve_node("n", &attrs([("shape", "hexagon".into())]), &Theme::plain()).unwrap_err();
        assert!(matches!(err, RenderError::InvalidAttribute { key, .. } if key == "shape"));
    }

    #[test]
    fn out_of_range_integers_are_rejected() {
        let huge = AttrValue::Int(i64::from(i32::MAX) + 1);
        let err = resolve_node("n", &attrs([("z", huge.clone())]), &Theme::plain()).unwrap_err();
        assert!(matches!(err, RenderError::InvalidAttribute { key, .. } if key == "z"));
        let err = resolve_edge(&attrs([("z", AttrValue::Int(i64::MIN))]), &Theme::plain()).unwrap_err();
        assert!(matches!(err, RenderError::InvalidAttribute { key, .. } if key == "z"));

        let port = AttrValue::Map(attrs([("priority", huge)]));
        let ports = AttrValue::Map(attrs([("out", port)]));
        let err = resolve_node("n", &attrs([("ports", ports)]), &Theme::plain()).unwrap_err();
        assert!(matches!(err, RenderError::InvalidAttribute { key, .. } if key == "priority"));

        let node = resolve_node("n", &attrs([("z", AttrValue::Int(-7))]), &Theme::plain()).unwrap();
        assert_eq!(node.base.z, -7);
    }
}
