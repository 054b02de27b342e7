use crate::ir::Direction;
use crate::theme::{Charset, Theme, parse_style};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    #[default]
    Static,
    Layered,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RouterKind {
    #[default]
    Orthogonal,
    Grid,
}

/// How graph coordinates are scaled into output cells.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ZoomMode {
    Fixed { x: f32, y: f32 },
    Fit { preserve_aspect: bool },
}

impl ZoomMode {
    pub fn uniform(factor: f32) -> Self {
        ZoomMode::Fixed {
            x: factor,
            y: factor,
        }
    }
}

impl Default for ZoomMode {
    fn default() -> Self {
        ZoomMode::uniform(1.0)
    }
}

/// What a node content change that alters the node's layout size triggers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RelayoutPolicy {
    Always,
    #[default]
    OnSizeChange,
    Never,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub direction: Option<Direction>,
    pub engine: LayoutKind,
    pub node_spacing: f32,
    pub rank_spacing: f32,
    pub layout_margin: u16,
    pub max_label_width: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            direction: None,
            engine: LayoutKind::Static,
            node_spacing: 4.0,
            rank_spacing: 3.0,
            layout_margin: 1,
            max_label_width: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    pub router: RouterKind,
    pub turn_penalty: f32,
    pub occupancy_weight: f32,
    pub grid_margin: i32,
    pub max_cells: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            router: RouterKind::Orthogonal,
            turn_penalty: 2.0,
            occupancy_weight: 1.5,
            grid_margin: 4,
            max_cells: 250_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Known output bounds, used by fit zoom.
    pub width: u16,
    pub height: u16,
    pub zoom: ZoomMode,
    pub routing: RoutingConfig,
    pub relayout_policy: RelayoutPolicy,
    pub color: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 80,
            height: 24,
            zoom: ZoomMode::default(),
            routing: RoutingConfig::default(),
            relayout_policy: RelayoutPolicy::OnSizeChange,
            color: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    node_text: Option<String>,
    node_border: Option<String>,
    edge_line: Option<String>,
    edge_label: Option<String>,
    arrow_tip: Option<String>,
    port: Option<String>,
    port_label: Option<String>,
    charset: Option<String>,
    port_symbol: Option<char>,
    port_symbol_connected: Option<char>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    direction: Option<String>,
    engine: Option<LayoutKind>,
    node_spacing: Option<f32>,
    rank_spacing: Option<f32>,
    layout_margin: Option<u16>,
    max_label_width: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RoutingConfigFile {
    router: Option<RouterKind>,
    turn_penalty: Option<f32>,
    occupancy_weight: Option<f32>,
    grid_margin: Option<i32>,
    max_cells: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    width: Option<u16>,
    height: Option<u16>,
    zoom: Option<ZoomMode>,
    routing: Option<RoutingConfigFile>,
    relayout_policy: Option<RelayoutPolicy>,
    color: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutConfigFile>,
    render: Option<RenderConfigFile>,
}

/// Loads a JSON or JSON5 config file on top of the defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents, config)
}

pub fn parse_config(contents: &str, mut config: Config) -> anyhow::Result<Config> {
    let parsed: ConfigFile = json5::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        config.theme = Theme::from_name(theme_name)
            .ok_or_else(|| anyhow::anyhow!("unknown theme `{theme_name}`"))?;
    }

    if let Some(vars) = parsed.theme_variables {
        let theme = &mut config.theme;
        for (value, slot) in [
            (vars.node_text, &mut theme.node_text),
            (vars.node_border, &mut theme.node_border),
            (vars.edge_line, &mut theme.edge_line),
            (vars.edge_label, &mut theme.edge_label),
            (vars.arrow_tip, &mut theme.arrow_tip),
            (vars.port, &mut theme.port),
            (vars.port_label, &mut theme.port_label),
        ] {
            if let Some(value) = value {
                *slot = parse_style(&value, *slot).map_err(anyhow::Error::msg)?;
            }
        }
        if let Some(v) = vars.charset {
            theme.charset = Charset::from_token(&v)
                .ok_or_else(|| anyhow::anyhow!("unknown charset `{v}`"))?;
        }
        if let Some(v) = vars.port_symbol {
            theme.port_symbol = v;
        }
        if let Some(v) = vars.port_symbol_connected {
            theme.port_symbol_connected = v;
        }
    }

    if let Some(layout) = parsed.layout {
        if let Some(v) = layout.direction {
            config.layout.direction = match v.as_str() {
                "none" | "" => None,
                token => Some(
                    Direction::from_token(token)
                        .ok_or_else(|| anyhow::anyhow!("unknown direction `{token}`"))?,
                ),
            };
        }
        if let Some(v) = layout.engine {
            config.layout.engine = v;
        }
        if let Some(v) = layout.node_spacing {
            config.layout.node_spacing = v;
        }
        if let Some(v) = layout.rank_spacing {
            config.layout.rank_spacing = v;
        }
        if let Some(v) = layout.layout_margin {
            config.layout.layout_margin = v;
        }
        if let Some(v) = layout.max_label_width {
            config.layout.max_label_width = v;
        }
    }

    if let Some(render) = parsed.render {
        if let Some(v) = render.width {
            config.render.width = v;
        }
        if let Some(v) = render.height {
            config.render.height = v;
        }
        if let Some(v) = render.zoom {
            config.render.zoom = v;
        }
        if let Some(v) = render.relayout_policy {
            config.render.relayout_policy = v;
        }
        if let Some(v) = render.color {
            config.render.color = v;
        }
        if let Some(routing) = render.routing {
            if let Some(v) = routing.router {
                config.render.routing.router = v;
            }
            if let Some(v) = routing.turn_penalty {
                config.render.routing.turn_penalty = v;
            }
            if let Some(v) = routing.occupancy_weight {
                config.render.routing.occupancy_weight = v;
            }
            if let Some(v) = routing.grid_margin {
                config.render.routing.grid_margin = v;
            }
            if let Some(v) = routing.max_cells {
                config.render.routing.max_cells = v;
            }
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        let config = load_config(None).unwrap();
        assert_eq!(config.render.relayout_policy, RelayoutPolicy::OnSizeChange);
        assert_eq!(config.layout.engine, LayoutKind::Static);
    }

    #[test]
    fn json5_overrides_apply_on_top_of_defaults() {
        let config = parse_config(
            r#"{
                // comments are fine
                theme: "colorful",
                themeVariables: { edgeLine: "bold", charset: "ascii" },
                layout: { direction: "LR", engine: "layered", nodeSpacing: 6 },
                render: {
                    zoom: { fit: { preserve_aspect: true } },
                    routing: { router: "grid" },
                    relayoutPolicy: "always",
                },
            }"#,
            Config::default(),
        )
        .unwrap();
        assert_eq!(config.theme.charset, Charset::Ascii);
        assert!(config.theme.edge_line.bold);
        assert_eq!(config.layout.direction, Some(Direction::LeftRight));
        assert_eq!(config.layout.engine, LayoutKind::Layered);
        assert_eq!(config.layout.node_spacing, 6.0);
        assert_eq!(
            config.render.zoom,
            ZoomMode::Fit {
                preserve_aspect: true
            }
        );
        assert_eq!(config.render.routing.router, RouterKind::Grid);
        assert_eq!(config.render.relayout_policy, RelayoutPolicy::Always);
    }

    #[test]
    fn unknown_theme_is_an_error() {
        assert!(parse_config(r#"{ "theme": "neon" }"#, Config::default()).is_err());
    }
}
