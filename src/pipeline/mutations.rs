use tracing::debug;

use super::stages::bounds_map;
use super::{RenderPipeline, RenderState};
use crate::config::RelayoutPolicy;
use crate::error::{RenderError, Result};
use crate::geometry::Point;
use crate::ir::{AttrValue, Attributes, UpdateMode, apply_update};
use crate::properties::{resolve_edge, resolve_node};

impl RenderPipeline {
    /// Adds a node. A `position` in output space pins it through its `x`
    /// and `y` attributes. Forces a new layout.
    pub fn add_node(&mut self, id: &str, attributes: Attributes, position: Option<Point>) -> Result<()> {
        self.require(RenderState::EdgesRendered)?;
        if self.graph.contains_node(id) {
            return Err(RenderError::DuplicateNode(id.to_string()));
        }
        let mut attributes = attributes;
        if let Some(position) = position {
            self.pin(&mut attributes, position)?;
        }
        let props = resolve_node(id, &attributes, &self.config.theme)?;
        let size = self.measure(id, &props)?;

        self.graph.add_node(id, attributes)?;
        self.node_props.insert(id.to_string(), props);
        self.sizes.insert(id.to_string(), size);
        debug!(node = id, "node added");
        self.invalidate(RenderState::NodeFragmentsForLayout);
        Ok(())
    }

    /// Removes a node together with its incident edges. Forces a new layout.
    pub fn remove_node(&mut self, id: &str) -> Result<()> {
        self.require(RenderState::EdgesRendered)?;
        let (_, removed) = self.graph.remove_node(id)?;
        self.node_props.remove(id);
        self.sizes.remove(id);
        self.positions.remove(id);
        self.anchors.remove(id);
        self.node_regions.remove(id);
        self.node_levels.remove(id);
        self.node_fragments.remove(id);
        self.port_fragments.remove(id);
        for edge in &removed {
            self.edge_props.remove(&edge.id);
            self.edge_paths.remove(&edge.id);
            self.edge_fragments.remove(&edge.id);
        }
        debug!(node = id, edges = removed.len(), "node removed");
        self.invalidate(RenderState::NodeFragmentsForLayout);
        Ok(())
    }

    /// Changes a node's attributes and/or moves it to `position` in output
    /// space. Moves always relayout; content changes relayout according to
    /// the configured [`RelayoutPolicy`], otherwise only the node and the
    /// edges are redrawn.
    pub fn update_node(
        &mut self,
        id: &str,
        position: Option<Point>,
        attributes: Option<Attributes>,
        mode: UpdateMode,
    ) -> Result<()> {
        self.require(RenderState::EdgesRendered)?;
        let node = self
            .graph
            .node(id)
            .ok_or_else(|| RenderError::MissingNode(id.to_string()))?;
        let mut next = node.attributes.clone();
        if let Some(update) = attributes {
            apply_update(&mut next, update, mode);
        }
        if let Some(position) = position {
            self.pin(&mut next, position)?;
        }
        let props = resolve_node(id, &next, &self.config.theme)?;
        let size = self.measure(id, &props)?;

        let moved = position.is_some()
            || self.node_props.get(id).map(|old| old.base.position) != Some(props.base.position);
        let resized = self.sizes.get(id) != Some(&size);
        let relayout = moved
            || match self.config.render.relayout_policy {
                RelayoutPolicy::Always => true,
                RelayoutPolicy::OnSizeChange => resized,
                RelayoutPolicy::Never => false,
            };

        if relayout {
            self.graph.update_node_attributes(id, next, UpdateMode::Replace)?;
            self.node_props.insert(id.to_string(), props);
            self.sizes.insert(id.to_string(), size);
            debug!(node = id, moved, resized, "node updated, relayout");
            self.invalidate(RenderState::NodeFragmentsForLayout);
            return Ok(());
        }

        let zoom = self.zoom.ok_or(RenderError::UninitializedZoom)?;
        let center = self
            .positions
            .get(id)
            .copied()
            .ok_or_else(|| RenderError::MissingNode(id.to_string()))?;
        let rendered = self.render_node(id, &props, center, zoom)?;

        self.graph.update_node_attributes(id, next, UpdateMode::Replace)?;
        self.node_props.insert(id.to_string(), props);
        self.sizes.insert(id.to_string(), size);
        self.node_regions.insert(id.to_string(), rendered.region);
        self.node_levels.insert(id.to_string(), rendered.level);
        self.node_fragments.insert(id.to_string(), rendered.fragment);
        let mut touched = self.graph.neighbors(id);
        touched.push(id.to_string());
        self.refresh_anchors(&touched);
        debug!(node = id, resized, "node updated in place");
        self.invalidate(RenderState::NodeFragmentsRendered);
        Ok(())
    }

    /// Adds an edge and redraws the edges.
    pub fn add_edge(&mut self, id: &str, from: &str, to: &str, attributes: Attributes) -> Result<()> {
        self.require(RenderState::EdgesRendered)?;
        for endpoint in [from, to] {
            if !self.graph.contains_node(endpoint) {
                return Err(RenderError::MissingNode(endpoint.to_string()));
            }
        }
        if self.graph.edge(id).is_some() {
            return Err(RenderError::DuplicateEdge(id.to_string()));
        }
        let props = resolve_edge(&attributes, &self.config.theme)?;

        self.graph.add_edge(id, from, to, attributes)?;
        self.edge_props.insert(id.to_string(), props);
        self.refresh_anchors(&[from.to_string(), to.to_string()]);
        debug!(edge = id, from, to, "edge added");
        self.invalidate(RenderState::NodeFragmentsRendered);
        Ok(())
    }

    /// Adds an edge under a generated id and returns the id.
    pub fn connect(&mut self, from: &str, to: &str, attributes: Attributes) -> Result<String> {
        let id = self.graph.next_edge_id(from, to);
        self.add_edge(&id, from, to, attributes)?;
        Ok(id)
    }

    pub fn remove_edge(&mut self, id: &str) -> Result<()> {
        self.require(RenderState::EdgesRendered)?;
        let edge = self.graph.remove_edge(id)?;
        self.edge_props.remove(id);
        self.edge_paths.remove(id);
        self.edge_fragments.remove(id);
        self.refresh_anchors(&[edge.from.clone(), edge.to.clone()]);
        debug!(edge = id, "edge removed");
        self.invalidate(RenderState::NodeFragmentsRendered);
        Ok(())
    }

    pub fn update_edge(&mut self, id: &str, attributes: Attributes, mode: UpdateMode) -> Result<()> {
        self.require(RenderState::EdgesRendered)?;
        let edge = self
            .graph
            .edge(id)
            .ok_or_else(|| RenderError::MissingEdge(id.to_string()))?;
        let endpoints = [edge.from.clone(), edge.to.clone()];
        let mut next = edge.attributes.clone();
        apply_update(&mut next, attributes, mode);
        let props = resolve_edge(&next, &self.config.theme)?;

        self.graph.update_edge_attributes(id, next, UpdateMode::Replace)?;
        self.edge_props.insert(id.to_string(), props);
        self.refresh_anchors(&endpoints);
        debug!(edge = id, "edge updated");
        self.invalidate(RenderState::NodeFragmentsRendered);
        Ok(())
    }

    /// Writes the graph-space equivalent of an output cell into `x`/`y`.
    fn pin(&self, attributes: &mut Attributes, position: Point) -> Result<()> {
        let point = self.output_to_graph(position)?;
        attributes.insert("x".to_string(), AttrValue::from(f64::from(point.x)));
        attributes.insert("y".to_string(), AttrValue::from(f64::from(point.y)));
        Ok(())
    }

    fn refresh_anchors(&mut self, nodes: &[String]) {
        let bounds = bounds_map(&self.positions, &self.sizes);
        for id in nodes {
            if self.graph.contains_node(id) {
                let anchors = self.node_anchors(id, &bounds);
                self.anchors.insert(id.clone(), anchors);
            }
        }
    }
}
