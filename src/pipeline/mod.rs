//! The staged, invalidation-aware render pipeline.
//!
//! A [`RenderPipeline`] owns the graph and every artifact derived from it.
//! Artifacts are produced by five transitions between the linearly ordered
//! [`RenderState`]s. Reads advance the state lazily; mutations first advance
//! it to [`RenderState::EdgesRendered`], apply their change and then roll the
//! state back to the earliest stage whose inputs the change touched.

mod mutations;
mod stages;

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, trace};

use crate::anchors::NodeAnchors;
use crate::compositor::compose_region;
use crate::config::{Config, ZoomMode};
use crate::error::{RenderError, Result};
use crate::fragment::{Fragment, Strip};
use crate::geometry::{FPoint, Point, Region};
use crate::ir::{Direction, GraphModel};
use crate::layout::{LayoutEngine, engine_for};
use crate::properties::{EdgeProperties, Leveled, NodeProperties, resolve_edge, resolve_node};
use crate::raster::{BoxRasterizer, ShapeRasterizer};
use crate::routing::{RoutePoint, Router, router_for};

/// How far the pipeline has progressed. Every later state implies that the
/// outputs of all earlier states are valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RenderState {
    Initial,
    NodeFragmentsForLayout,
    LayoutComputed,
    ZoomComputed,
    NodeFragmentsRendered,
    EdgesRendered,
}

impl RenderState {
    pub const ALL: [RenderState; 6] = [
        RenderState::Initial,
        RenderState::NodeFragmentsForLayout,
        RenderState::LayoutComputed,
        RenderState::ZoomComputed,
        RenderState::NodeFragmentsRendered,
        RenderState::EdgesRendered,
    ];

    pub fn ordinal(self) -> usize {
        self as usize
    }
}

type Transition = fn(&mut RenderPipeline) -> Result<()>;

/// `TRANSITIONS[i]` advances from `RenderState::ALL[i]` to `ALL[i + 1]`.
const TRANSITIONS: [Transition; 5] = [
    RenderPipeline::rasterize_for_layout,
    RenderPipeline::compute_layout,
    RenderPipeline::compute_zoom,
    RenderPipeline::render_nodes,
    RenderPipeline::render_edges,
];

/// Horizontal and vertical scale from graph space to output cells.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Zoom {
    pub x: f32,
    pub y: f32,
}

impl Zoom {
    /// The factor that drives level-of-detail selection.
    pub fn level_factor(&self) -> f32 {
        self.x.min(self.y)
    }
}

/// Content size of a node at level of detail 1, plus its layout margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NodeSize {
    pub width: usize,
    pub height: usize,
    pub margin: u16,
}

impl NodeSize {
    pub fn layout_width(&self) -> f32 {
        (self.width + 2 * self.margin as usize) as f32
    }

    pub fn layout_height(&self) -> f32 {
        (self.height + 2 * self.margin as usize) as f32
    }
}

pub struct RenderPipeline {
    graph: GraphModel,
    config: Config,
    layout_engine: Box<dyn LayoutEngine>,
    router: Box<dyn Router>,
    rasterizer: Box<dyn ShapeRasterizer>,
    state: RenderState,
    viewport: Option<Region>,

    node_props: BTreeMap<String, Leveled<NodeProperties>>,
    edge_props: BTreeMap<String, Leveled<EdgeProperties>>,

    // NodeFragmentsForLayout
    sizes: BTreeMap<String, NodeSize>,
    // LayoutComputed
    positions: BTreeMap<String, FPoint>,
    centering: FPoint,
    anchors: BTreeMap<String, NodeAnchors>,
    // ZoomComputed; kept across invalidations once set
    zoom: Option<Zoom>,
    // NodeFragmentsRendered
    node_regions: BTreeMap<String, Region>,
    node_levels: BTreeMap<String, u8>,
    node_fragments: BTreeMap<String, Fragment>,
    // EdgesRendered
    edge_paths: BTreeMap<String, Vec<RoutePoint>>,
    edge_fragments: BTreeMap<String, Vec<Fragment>>,
    port_fragments: BTreeMap<String, Vec<Fragment>>,
}

impl RenderPipeline {
    /// Builds a pipeline with the collaborators selected by `config`.
    pub fn new(graph: GraphModel, config: Config) -> Result<Self> {
        let layout_engine = engine_for(&config.layout);
        let router = router_for(&config.render.routing);
        Self::with_collaborators(graph, config, layout_engine, router, Box::new(BoxRasterizer))
    }

    pub fn with_collaborators(
        graph: GraphModel,
        config: Config,
        layout_engine: Box<dyn LayoutEngine>,
        router: Box<dyn Router>,
        rasterizer: Box<dyn ShapeRasterizer>,
    ) -> Result<Self> {
        let mut node_props = BTreeMap::new();
        for node in graph.nodes() {
            node_props.insert(node.id.clone(), resolve_node(&node.id, &node.attributes, &config.theme)?);
        }
        let mut edge_props = BTreeMap::new();
        for edge in graph.edges() {
            edge_props.insert(edge.id.clone(), resolve_edge(&edge.attributes, &config.theme)?);
        }
        Ok(Self {
            graph,
            config,
            layout_engine,
            router,
            rasterizer,
            state: RenderState::Initial,
            viewport: None,
            node_props,
            edge_props,
            sizes: BTreeMap::new(),
            positions: BTreeMap::new(),
            centering: FPoint::default(),
            anchors: BTreeMap::new(),
            zoom: None,
            node_regions: BTreeMap::new(),
            node_levels: BTreeMap::new(),
            node_fragments: BTreeMap::new(),
            edge_paths: BTreeMap::new(),
            edge_fragments: BTreeMap::new(),
            port_fragments: BTreeMap::new(),
        })
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    pub fn graph(&self) -> &GraphModel {
        &self.graph
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The principal direction: the graph's own, else the configured one.
    pub fn direction(&self) -> Option<Direction> {
        self.graph.direction.or(self.config.layout.direction)
    }

    /// Runs exactly the missing transitions up to `target`, in order.
    pub fn require(&mut self, target: RenderState) -> Result<()> {
        while self.state < target {
            let idx = self.state.ordinal();
            let next = RenderState::ALL[idx + 1];
            debug!(
                from = ?self.state,
                to = ?next,
                nodes = self.graph.node_count(),
                edges = self.graph.edge_count(),
                "running render stage"
            );
            TRANSITIONS[idx](self)?;
            self.state = next;
        }
        Ok(())
    }

    /// Rolls the state back to `to`. Never moves forward.
    pub(crate) fn invalidate(&mut self, to: RenderState) {
        if to < self.state {
            trace!(from = ?self.state, to = ?to, "invalidating render state");
            self.state = to;
        }
    }

    pub fn zoom_factor(&self) -> Option<Zoom> {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: ZoomMode) {
        self.config.render.zoom = zoom;
        self.invalidate(RenderState::LayoutComputed);
    }

    /// Updates the known output bounds. Only fit zoom depends on them.
    pub fn set_output_bounds(&mut self, width: u16, height: u16) {
        self.config.render.width = width;
        self.config.render.height = height;
        if matches!(self.config.render.zoom, ZoomMode::Fit { .. }) {
            self.invalidate(RenderState::LayoutComputed);
        }
    }

    pub fn set_direction(&mut self, direction: Option<Direction>) {
        if self.graph.direction != direction {
            self.graph.direction = direction;
            self.invalidate(RenderState::NodeFragmentsForLayout);
        }
    }

    pub fn viewport(&self) -> Option<Region> {
        self.viewport
    }

    /// Restricts `render_rows` to a sub-rectangle of output space.
    pub fn set_viewport(&mut self, viewport: Option<Region>) {
        self.viewport = viewport;
    }

    /// Maps a graph-space point into output space.
    pub fn graph_to_output(&self, point: FPoint) -> Result<Point> {
        let zoom = self.zoom.ok_or(RenderError::UninitializedZoom)?;
        let shifted = point + self.centering;
        Ok(FPoint::new(shifted.x * zoom.x, shifted.y * zoom.y).round())
    }

    /// Maps an output-space cell back into graph space.
    pub fn output_to_graph(&self, point: Point) -> Result<FPoint> {
        let zoom = self.zoom.ok_or(RenderError::UninitializedZoom)?;
        Ok(FPoint::new(
            point.x as f32 / zoom.x - self.centering.x,
            point.y as f32 / zoom.y - self.centering.y,
        ))
    }

    /// Every current fragment in paint-insertion order: nodes, then each
    /// edge's line, decorations and label, then ports.
    pub fn fragments(&mut self) -> Result<Vec<&Fragment>> {
        self.require(RenderState::EdgesRendered)?;
        Ok(self.collect_fragments())
    }

    fn collect_fragments(&self) -> Vec<&Fragment> {
        self.node_fragments
            .values()
            .chain(self.edge_fragments.values().flatten())
            .chain(self.port_fragments.values().flatten())
            .collect()
    }

    /// Union of every fragment region in output space.
    pub fn full_extent(&mut self) -> Result<Region> {
        self.require(RenderState::EdgesRendered)?;
        Ok(self
            .collect_fragments()
            .iter()
            .fold(Region::default(), |acc, fragment| acc.union(&fragment.region)))
    }

    /// Composes the viewport, or the full extent when none is set.
    pub fn render_rows(&mut self) -> Result<Vec<Strip>> {
        let region = match self.viewport {
            Some(viewport) => {
                self.require(RenderState::EdgesRendered)?;
                viewport
            }
            None => self.full_extent()?,
        };
        Ok(compose_region(self.collect_fragments(), region))
    }

    /// Composes `width` x `height` cells starting at the top-left corner of
    /// the full extent, blank-filling beyond it.
    pub fn render_rows_sized(&mut self, width: usize, height: usize) -> Result<Vec<Strip>> {
        let extent = self.full_extent()?;
        let region = Region::new(extent.x, extent.y, width as i32, height as i32);
        Ok(compose_region(self.collect_fragments(), region))
    }

    pub fn anchors(&self, node: &str) -> Option<&NodeAnchors> {
        self.anchors.get(node)
    }

    pub fn node_region(&self, node: &str) -> Option<Region> {
        self.node_regions.get(node).copied()
    }

    pub fn node_level(&self, node: &str) -> Option<u8> {
        self.node_levels.get(node).copied()
    }

    pub fn node_position(&self, node: &str) -> Option<FPoint> {
        self.positions.get(node).copied()
    }

    pub fn node_size(&self, node: &str) -> Option<NodeSize> {
        self.sizes.get(node).copied()
    }

    pub fn edge_path(&self, edge: &str) -> Option<&[RoutePoint]> {
        self.edge_paths.get(edge).map(Vec::as_slice)
    }

    pub fn node_properties(&self, node: &str) -> Option<&Leveled<NodeProperties>> {
        self.node_props.get(node)
    }

    pub fn edge_properties(&self, edge: &str) -> Option<&Leveled<EdgeProperties>> {
        self.edge_props.get(edge)
    }
}
