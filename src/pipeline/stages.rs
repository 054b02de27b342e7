use anyhow::anyhow;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use super::{NodeSize, RenderPipeline, Zoom};
use crate::anchors::{
    ConnectionId, IncidentEdge, NodeAnchors, NodeBounds, assign_anchors, connection_for,
    crossing_point,
};
use crate::config::ZoomMode;
use crate::error::{RenderError, Result};
use crate::fragment::{Fragment, FragmentKind, Layer, Run, Strip, ZOrder, cell_width, sanitize_cells};
use crate::geometry::{FPoint, Point, Region, Side};
use crate::ir::Edge;
use crate::layout::{LayoutEdge, LayoutNode};
use crate::properties::{EdgeProperties, Leveled, NodeProperties};
use crate::raster::edge::{Cell, arrow_glyph, label_origin, path_cells};
use crate::raster::text::split_lines;
use crate::raster::{Raster, RasterContent, RasterStyle};
use crate::routing::{RoutePoint, RouteRequest};

/// Added to recentered coordinates so that symmetric layouts do not land
/// exactly on half cells.
const CENTERING_EPSILON: f32 = 1e-3;
const MIN_FIT_ZOOM: f32 = 1e-3;

pub(super) struct RenderedNode {
    pub level: u8,
    pub region: Region,
    pub fragment: Fragment,
}

pub(super) fn bounds_map(
    positions: &BTreeMap<String, FPoint>,
    sizes: &BTreeMap<String, NodeSize>,
) -> BTreeMap<String, NodeBounds> {
    positions
        .iter()
        .filter_map(|(id, center)| {
            sizes.get(id).map(|size| {
                (
                    id.clone(),
                    NodeBounds {
                        center: *center,
                        width: size.width as f32,
                        height: size.height as f32,
                    },
                )
            })
        })
        .collect()
}

fn fit_axis(bound: f32, span: f32, largest: f32) -> f32 {
    if span <= f32::EPSILON {
        return 1.0;
    }
    ((bound - largest) / span).clamp(MIN_FIT_ZOOM, 1.0)
}

impl RenderPipeline {
    // Initial -> NodeFragmentsForLayout
    pub(super) fn rasterize_for_layout(&mut self) -> Result<()> {
        let mut sizes = BTreeMap::new();
        for (id, props) in &self.node_props {
            sizes.insert(id.clone(), self.measure(id, props)?);
        }
        debug!(nodes = sizes.len(), "measured nodes for layout");
        self.sizes = sizes;
        Ok(())
    }

    // NodeFragmentsForLayout -> LayoutComputed
    pub(super) fn compute_layout(&mut self) -> Result<()> {
        let mut nodes = Vec::with_capacity(self.graph.node_count());
        for node in self.graph.nodes() {
            let size = self
                .sizes
                .get(&node.id)
                .ok_or_else(|| RenderError::MissingNode(node.id.clone()))?;
            nodes.push(LayoutNode {
                id: &node.id,
                width: size.layout_width(),
                height: size.layout_height(),
                attributes: &node.attributes,
            });
        }
        let edges: Vec<LayoutEdge<'_>> = self
            .graph
            .edges()
            .map(|edge| LayoutEdge {
                from: &edge.from,
                to: &edge.to,
            })
            .collect();

        let raw = self
            .layout_engine
            .layout(&nodes, &edges, self.direction())
            .map_err(RenderError::Layout)?;

        let mut min = FPoint::new(f32::INFINITY, f32::INFINITY);
        let mut max = FPoint::new(f32::NEG_INFINITY, f32::NEG_INFINITY);
        for node in &nodes {
            let Some(center) = raw.get(node.id).copied() else {
                return Err(RenderError::InvalidLayout(format!(
                    "no position for node `{}`",
                    node.id
                )));
            };
            if !center.is_finite() {
                return Err(RenderError::InvalidLayout(format!(
                    "non-finite position for node `{}`",
                    node.id
                )));
            }
            min.x = min.x.min(center.x - node.width / 2.0);
            min.y = min.y.min(center.y - node.height / 2.0);
            max.x = max.x.max(center.x + node.width / 2.0);
            max.y = max.y.max(center.y + node.height / 2.0);
        }
        let centering = if nodes.is_empty() {
            FPoint::default()
        } else {
            FPoint::new(
                CENTERING_EPSILON - (min.x + max.x) / 2.0,
                CENTERING_EPSILON - (min.y + max.y) / 2.0,
            )
        };
        let positions: BTreeMap<String, FPoint> = nodes
            .iter()
            .filter_map(|node| raw.get(node.id).map(|p| (node.id.to_string(), *p + centering)))
            .collect();

        let bounds = bounds_map(&positions, &self.sizes);
        let anchors: BTreeMap<String, NodeAnchors> = self
            .graph
            .nodes()
            .map(|node| (node.id.clone(), self.node_anchors(&node.id, &bounds)))
            .collect();

        debug!(nodes = positions.len(), ?centering, "layout computed");
        self.positions = positions;
        self.centering = centering;
        self.anchors = anchors;
        Ok(())
    }

    // LayoutComputed -> ZoomComputed
    pub(super) fn compute_zoom(&mut self) -> Result<()> {
        let zoom = match self.config.render.zoom {
            ZoomMode::Fixed { x, y } => {
                for factor in [x, y] {
                    if !(factor.is_finite() && factor > 0.0) {
                        return Err(RenderError::invalid_attribute(
                            "zoom",
                            format!("zoom factor must be positive, got {factor}"),
                        ));
                    }
                }
                Zoom { x, y }
            }
            ZoomMode::Fit { preserve_aspect } => {
                let span = |axis: fn(&FPoint) -> f32| {
                    let values = self.positions.values().map(axis);
                    let lo = values.clone().fold(f32::INFINITY, f32::min);
                    let hi = values.fold(f32::NEG_INFINITY, f32::max);
                    if lo.is_finite() && hi.is_finite() { hi - lo } else { 0.0 }
                };
                let widest = self.sizes.values().map(|s| s.width).max().unwrap_or(0) as f32;
                let tallest = self.sizes.values().map(|s| s.height).max().unwrap_or(0) as f32;
                let x = fit_axis(self.config.render.width as f32, span(|p| p.x), widest);
                let y = fit_axis(self.config.render.height as f32, span(|p| p.y), tallest);
                if preserve_aspect {
                    let uniform = x.min(y);
                    Zoom { x: uniform, y: uniform }
                } else {
                    Zoom { x, y }
                }
            }
        };
        debug!(zoom.x = zoom.x, zoom.y = zoom.y, "zoom computed");
        self.zoom = Some(zoom);
        self.edge_paths.clear();
        self.edge_fragments.clear();
        self.port_fragments.clear();
        Ok(())
    }

    // ZoomComputed -> NodeFragmentsRendered
    pub(super) fn render_nodes(&mut self) -> Result<()> {
        let zoom = self.zoom.ok_or(RenderError::UninitializedZoom)?;
        let mut regions = BTreeMap::new();
        let mut levels = BTreeMap::new();
        let mut fragments = BTreeMap::new();
        for (id, props) in &self.node_props {
            let center = self
                .positions
                .get(id)
                .copied()
                .ok_or_else(|| RenderError::MissingNode(id.clone()))?;
            let rendered = self.render_node(id, props, center, zoom)?;
            regions.insert(id.clone(), rendered.region);
            levels.insert(id.clone(), rendered.level);
            fragments.insert(id.clone(), rendered.fragment);
        }
        self.node_regions = regions;
        self.node_levels = levels;
        self.node_fragments = fragments;
        Ok(())
    }

    // NodeFragmentsRendered -> EdgesRendered
    pub(super) fn render_edges(&mut self) -> Result<()> {
        let zoom = self.zoom.ok_or(RenderError::UninitializedZoom)?;
        let obstacles: Vec<Region> = self.node_regions.values().copied().collect();
        let mut routed: Vec<Vec<Point>> = Vec::new();
        let mut paths = BTreeMap::new();
        let mut fragments = BTreeMap::new();
        let mut used_ports: BTreeSet<(String, String)> = BTreeSet::new();

        for edge in self.graph.edges() {
            let leveled = self
                .edge_props
                .get(&edge.id)
                .ok_or_else(|| RenderError::MissingEdge(edge.id.clone()))?;
            let (_, props) = leveled.for_zoom(zoom.level_factor());

            let (start_cell, start_side) = self.edge_endpoint(edge, &leveled.base, true)?;
            let (end_cell, end_side) = self.edge_endpoint(edge, &leveled.base, false)?;
            for (node, at_start) in [(&edge.from, true), (&edge.to, false)] {
                if let Some(node_props) = self.node_props.get(node)
                    && let Some(ConnectionId::Port(port)) =
                        connection_for(edge, &leveled.base, &node_props.base, at_start)
                {
                    used_ports.insert((node.clone(), port));
                }
            }

            let start = start_cell + start_side.outward();
            let end = end_cell + end_side.outward();
            let request = RouteRequest {
                start,
                end,
                start_heading: start_side.heading(),
                end_heading: end_side.heading(),
                obstacles: &obstacles,
                routed: &routed,
            };
            let path = self
                .router
                .route(&request)
                .map_err(|source| RenderError::Routing {
                    edge: edge.id.clone(),
                    source,
                })?;
            let (Some(first), Some(last)) = (path.first(), path.last()) else {
                return Err(RenderError::Routing {
                    edge: edge.id.clone(),
                    source: anyhow!("router returned an empty path"),
                });
            };
            if first.point != start || last.point != end {
                return Err(RenderError::Routing {
                    edge: edge.id.clone(),
                    source: anyhow!(
                        "path runs from {:?} to {:?}, expected {start:?} to {end:?}",
                        first.point,
                        last.point
                    ),
                });
            }

            let edge_fragments = self.edge_fragments_for(edge, props, &path, (start, start_side), (end, end_side));
            routed.push(path.iter().map(|p| p.point).collect());
            paths.insert(edge.id.clone(), path);
            fragments.insert(edge.id.clone(), edge_fragments);
        }

        let mut port_fragments = BTreeMap::new();
        for id in self.node_props.keys() {
            let ports = self.port_fragments_for(id, &used_ports);
            if !ports.is_empty() {
                port_fragments.insert(id.clone(), ports);
            }
        }

        debug!(edges = paths.len(), "edges rendered");
        self.edge_paths = paths;
        self.edge_fragments = fragments;
        self.port_fragments = port_fragments;
        Ok(())
    }

    /// Content size at level of detail 1 plus the effective layout margin.
    pub(super) fn measure(&self, id: &str, props: &Leveled<NodeProperties>) -> Result<NodeSize> {
        let raster = self.rasterize(id, props.at(1))?;
        Ok(NodeSize {
            width: raster.width,
            height: raster.height,
            margin: props.base.margin.unwrap_or(self.config.layout.layout_margin),
        })
    }

    fn rasterize(&self, id: &str, props: &NodeProperties) -> Result<Raster> {
        let content = RasterContent {
            label: &props.label,
            max_width: self.config.layout.max_label_width,
        };
        let style = RasterStyle {
            text: props.text_style,
            border: props.border_style,
        };
        let raster = self
            .rasterizer
            .render(&content, &style, props.padding, props.shape)
            .map_err(|source| RenderError::Rasterize {
                node: id.to_string(),
                source,
            })?;
        if raster.rows.is_empty()
            || raster.rows.len() != raster.height
            || raster.rows.iter().any(|row| row.width() > raster.width)
        {
            return Err(RenderError::Rasterize {
                node: id.to_string(),
                source: anyhow!(
                    "{} rows do not fit a {}x{} raster",
                    raster.rows.len(),
                    raster.width,
                    raster.height
                ),
            });
        }
        Ok(raster)
    }

    pub(super) fn render_node(
        &self,
        id: &str,
        props: &Leveled<NodeProperties>,
        center: FPoint,
        zoom: Zoom,
    ) -> Result<RenderedNode> {
        let (level, props) = props.for_zoom(zoom.level_factor());
        let raster = self.rasterize(id, props)?;
        let left = (center.x * zoom.x - raster.width as f32 / 2.0).round() as i32;
        let top = (center.y * zoom.y - raster.height as f32 / 2.0).round() as i32;
        let strips: Vec<Strip> = raster
            .rows
            .into_iter()
            .map(|mut row| {
                let width = row.width();
                row.push_spacer(raster.width - width);
                row
            })
            .collect();
        let fragment = Fragment::new(
            FragmentKind::Node(id.to_string()),
            Point::new(left, top),
            ZOrder::new(Layer::Node, props.z),
            strips,
        );
        Ok(RenderedNode {
            level,
            region: fragment.region,
            fragment,
        })
    }

    pub(super) fn node_anchors(&self, id: &str, bounds: &BTreeMap<String, NodeBounds>) -> NodeAnchors {
        let Some(props) = self.node_props.get(id) else {
            return NodeAnchors::default();
        };
        let incident: Vec<IncidentEdge<'_>> = self
            .graph
            .incident_edges(id)
            .filter_map(|edge| {
                self.edge_props.get(&edge.id).map(|props| IncidentEdge {
                    edge,
                    props: &props.base,
                })
            })
            .collect();
        assign_anchors(id, &props.base, &incident, bounds, self.direction())
    }

    /// Boundary cell and side where one end of `edge` leaves its node.
    fn edge_endpoint(&self, edge: &Edge, props: &EdgeProperties, at_start: bool) -> Result<(Point, Side)> {
        let (node_id, other_id) = if at_start {
            (&edge.from, &edge.to)
        } else {
            (&edge.to, &edge.from)
        };
        let region = self
            .node_regions
            .get(node_id)
            .copied()
            .ok_or_else(|| RenderError::MissingNode(node_id.clone()))?;
        let node = self
            .node_props
            .get(node_id)
            .ok_or_else(|| RenderError::MissingNode(node_id.clone()))?;
        if let Some(connection) = connection_for(edge, props, &node.base, at_start)
            && let Some(anchor) = self.anchors.get(node_id).and_then(|a| a.get(&connection))
        {
            return Ok((anchor.point_on(region), anchor.side));
        }
        let target = self
            .node_regions
            .get(other_id)
            .map_or_else(|| region.center(), Region::center);
        Ok(crossing_point(region, target))
    }

    fn edge_fragments_for(
        &self,
        edge: &Edge,
        props: &EdgeProperties,
        path: &[RoutePoint],
        (start, start_side): (Point, Side),
        (end, end_side): (Point, Side),
    ) -> Vec<Fragment> {
        let mut out = Vec::new();
        let glyphs = props.line.glyphs();
        let mut cells = path_cells(path, &glyphs, props.style);
        let from_region = self.node_regions.get(&edge.from).copied().unwrap_or_default();
        let to_region = self.node_regions.get(&edge.to).copied().unwrap_or_default();
        cells.retain(|cell| !from_region.contains(cell.0) && !to_region.contains(cell.0));
        if cells.is_empty() {
            warn!(edge = %edge.id, "edge has no visible cells");
            return out;
        }

        if let Some(fragment) = Fragment::from_cells(
            FragmentKind::Edge(edge.id.clone()),
            ZOrder::new(Layer::Edge, props.z),
            &cells,
        ) {
            out.push(fragment);
        }

        let mut tips: Vec<Cell> = Vec::new();
        let ends = [
            (props.start_arrow, start, start_side),
            (props.end_arrow, end, end_side),
        ];
        for (enabled, point, side) in ends {
            if !enabled || !cells.iter().any(|cell| cell.0 == point) {
                continue;
            }
            if let Some(ch) = arrow_glyph(side.heading().opposite(), &glyphs) {
                tips.push((point, ch, props.arrow_style));
            }
        }
        if let Some(fragment) = Fragment::from_cells(
            FragmentKind::EdgeDecoration(edge.id.clone()),
            ZOrder::new(Layer::EdgeDecoration, props.z),
            &tips,
        ) {
            out.push(fragment);
        }

        if let Some(label) = &props.label {
            let text = sanitize_cells(&split_lines(label).join(" "));
            if !text.is_empty()
                && let Some(origin) = label_origin(&cells, &text)
            {
                out.push(Fragment::new(
                    FragmentKind::EdgeLabel(edge.id.clone()),
                    origin,
                    ZOrder::new(Layer::Label, props.z),
                    vec![Strip::new(vec![Run::text(&text, props.label_style)])],
                ));
            }
        }
        out
    }

    fn port_fragments_for(&self, node_id: &str, used: &BTreeSet<(String, String)>) -> Vec<Fragment> {
        let mut out = Vec::new();
        let (Some(region), Some(anchors), Some(leveled)) = (
            self.node_regions.get(node_id).copied(),
            self.anchors.get(node_id),
            self.node_props.get(node_id),
        ) else {
            return out;
        };
        let level = self.node_levels.get(node_id).copied().unwrap_or(1);
        let props = leveled.at(level);
        for (name, port) in &props.ports {
            let Some(anchor) = anchors.get(&ConnectionId::Port(name.clone())) else {
                continue;
            };
            let point = anchor.point_on(region);
            let connected = used.contains(&(node_id.to_string(), name.clone()));
            let symbol = if connected {
                port.symbol_connected
            } else {
                port.symbol
            };
            out.push(Fragment::new(
                FragmentKind::Port {
                    node: node_id.to_string(),
                    port: name.clone(),
                },
                point,
                ZOrder::new(Layer::Port, props.z),
                vec![Strip::new(vec![Run::text(&symbol.to_string(), port.style)])],
            ));

            let Some(label) = port.label.as_deref().map(sanitize_cells).filter(|l| !l.is_empty()) else {
                continue;
            };
            let width = cell_width(&label) as i32;
            let origin = match anchor.side {
                Side::Top => Point::new(point.x - width / 2, point.y + 1),
                Side::Bottom => Point::new(point.x - width / 2, point.y - 1),
                Side::Left => Point::new(point.x + 1, point.y),
                Side::Right => Point::new(point.x - width, point.y),
            };
            out.push(Fragment::new(
                FragmentKind::PortLabel {
                    node: node_id.to_string(),
                    port: name.clone(),
                },
                origin,
                ZOrder::new(Layer::PortLabel, props.z),
                vec![Strip::new(vec![Run::text(&label, port.label_style)])],
            ));
        }
        out
    }
}
