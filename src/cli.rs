use crate::config::{LayoutKind, RouterKind, ZoomMode, load_config};
use crate::fragment::Strip;
use crate::layout_dump::write_layout_dump;
use crate::parser::parse_graph;
use crate::pipeline::RenderPipeline;
use crate::render::{render_ansi, render_plain, write_output};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tgr", version, about = "Render node/edge graphs as text for terminals")]
pub struct Args {
    /// Input file (.json, .json5 or edge list) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Config JSON/JSON5 file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Output width bound, in cells
    #[arg(short = 'w', long = "width")]
    pub width: Option<u16>,

    /// Output height bound, in cells
    #[arg(short = 'H', long = "height")]
    pub height: Option<u16>,

    /// Fixed zoom factor
    #[arg(long = "zoom", conflicts_with = "fit")]
    pub zoom: Option<f32>,

    /// Scale the graph to fit the output bounds
    #[arg(long = "fit")]
    pub fit: bool,

    #[arg(long = "layout", value_enum)]
    pub layout: Option<LayoutArg>,

    #[arg(long = "router", value_enum)]
    pub router: Option<RouterArg>,

    /// Disable colors and text attributes
    #[arg(long = "plain")]
    pub plain: bool,

    /// Write a JSON snapshot of the render state to this path
    #[arg(long = "dump-layout")]
    pub dump_layout: Option<PathBuf>,

    /// Verbose logging to stderr
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum LayoutArg {
    Static,
    Layered,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum RouterArg {
    Orthogonal,
    Grid,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = load_config(args.config.as_deref())?;
    if let Some(width) = args.width {
        config.render.width = width;
    }
    if let Some(height) = args.height {
        config.render.height = height;
    }
    if let Some(zoom) = args.zoom {
        config.render.zoom = ZoomMode::uniform(zoom);
    } else if args.fit {
        config.render.zoom = ZoomMode::Fit {
            preserve_aspect: true,
        };
    }
    if let Some(layout) = args.layout {
        config.layout.engine = match layout {
            LayoutArg::Static => LayoutKind::Static,
            LayoutArg::Layered => LayoutKind::Layered,
        };
    }
    if let Some(router) = args.router {
        config.render.routing.router = match router {
            RouterArg::Orthogonal => RouterKind::Orthogonal,
            RouterArg::Grid => RouterKind::Grid,
        };
    }
    let styled = config.render.color
        && !args.plain
        && (args.output.is_some() || io::stdout().is_terminal());

    let input = read_input(args.input.as_deref())?;
    let graph = parse_graph(&input)?;
    debug!(nodes = graph.node_count(), edges = graph.edge_count(), "parsed graph");

    let mut pipeline = RenderPipeline::new(graph, config)?;
    let rows = canvas_rows(&mut pipeline, args.width, args.height)?;
    let text = if styled {
        render_ansi(&rows)?
    } else {
        render_plain(&rows)
    };
    write_output(&text, args.output.as_deref())?;

    if let Some(path) = args.dump_layout.as_deref() {
        write_layout_dump(path, &mut pipeline)?;
    }
    Ok(())
}

/// The full extent, or a canvas of the requested size when either bound is
/// given. A missing bound falls back to the extent along that axis.
fn canvas_rows(
    pipeline: &mut RenderPipeline,
    width: Option<u16>,
    height: Option<u16>,
) -> Result<Vec<Strip>> {
    if width.is_none() && height.is_none() {
        return Ok(pipeline.render_rows()?);
    }
    let extent = pipeline.full_extent()?;
    let width = width.map_or(extent.width.max(0) as usize, usize::from);
    let height = height.map_or(extent.height.max(0) as usize, usize::from);
    Ok(pipeline.render_rows_sized(width, height)?)
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return Ok(std::fs::read_to_string(path)?);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}
