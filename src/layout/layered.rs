use dagre_rust::{
    GraphConfig as DagreConfig, GraphEdge as DagreEdge, GraphNode as DagreNode,
    layout as dagre_layout,
};
use graphlib_rust::{Graph as DagreGraph, GraphOption};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use super::{LayoutEdge, LayoutEngine, LayoutNode};
use crate::config::LayoutConfig;
use crate::geometry::FPoint;
use crate::ir::Direction;

/// Sugiyama-style layered layout backed by dagre.
#[derive(Debug, Clone)]
pub struct LayeredLayout {
    pub direction: Direction,
    pub node_spacing: f32,
    pub rank_spacing: f32,
}

impl LayeredLayout {
    pub fn from_config(config: &LayoutConfig) -> Self {
        Self {
            direction: config.direction.unwrap_or(Direction::TopDown),
            node_spacing: config.node_spacing,
            rank_spacing: config.rank_spacing,
        }
    }
}

impl Default for LayeredLayout {
    fn default() -> Self {
        Self::from_config(&LayoutConfig::default())
    }
}

fn dagre_rankdir(direction: Direction) -> &'static str {
    match direction {
        Direction::TopDown => "tb",
        Direction::LeftRight => "lr",
    }
}

impl LayoutEngine for LayeredLayout {
    fn layout(
        &self,
        nodes: &[LayoutNode<'_>],
        edges: &[LayoutEdge<'_>],
        direction: Option<Direction>,
    ) -> anyhow::Result<BTreeMap<String, FPoint>> {
        if nodes.is_empty() {
            return Ok(BTreeMap::new());
        }

        let mut dagre_graph: DagreGraph<DagreConfig, DagreNode, DagreEdge> =
            DagreGraph::new(Some(GraphOption {
                directed: Some(true),
                multigraph: Some(false),
                compound: Some(false),
            }));

        let mut graph_config = DagreConfig::default();
        graph_config.rankdir = Some(dagre_rankdir(direction.unwrap_or(self.direction)).to_string());
        graph_config.nodesep = Some(self.node_spacing);
        graph_config.ranksep = Some(self.rank_spacing);
        graph_config.marginx = Some(0.0);
        graph_config.marginy = Some(0.0);
        dagre_graph.set_graph(graph_config);

        for node in nodes {
            let mut dagre_node = DagreNode::default();
            dagre_node.width = node.width;
            dagre_node.height = node.height;
            dagre_graph.set_node(node.id.to_string(), Some(dagre_node));
        }

        // Parallel edges and self loops do not change the ranking.
        let mut edge_set: BTreeSet<(&str, &str)> = BTreeSet::new();
        for edge in edges {
            if edge.from == edge.to || !edge_set.insert((edge.from, edge.to)) {
                continue;
            }
            let from = edge.from.to_string();
            let to = edge.to.to_string();
            let _ = dagre_graph.set_edge(&from, &to, Some(DagreEdge::default()), None);
        }

        dagre_layout::run_layout(&mut dagre_graph);

        let mut positions = BTreeMap::new();
        for node in nodes {
            let dagre_node = dagre_graph
                .node(&node.id.to_string())
                .ok_or_else(|| anyhow::anyhow!("dagre dropped node `{}`", node.id))?;
            positions.insert(node.id.to_string(), FPoint::new(dagre_node.x, dagre_node.y));
        }
        debug!(nodes = positions.len(), edges = edge_set.len(), "layered layout finished");
        Ok(positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Attributes;

    #[test]
    fn chain_is_ranked_along_the_direction() {
        let attrs = Attributes::new();
        let nodes: Vec<LayoutNode<'_>> = ["a", "b", "c"]
            .iter()
            .map(|id| LayoutNode {
                id: *id,
                width: 7.0,
                height: 3.0,
                attributes: &attrs,
            })
            .collect();
        let edges = [
            LayoutEdge { from: "a", to: "b" },
            LayoutEdge { from: "b", to: "c" },
        ];
        let positions = LayeredLayout::default().layout(&nodes, &edges, None).unwrap();
        assert_eq!(positions.len(), 3);
        assert!(positions["a"].y < positions["b"].y);
        assert!(positions["b"].y < positions["c"].y);
        assert!(positions.values().all(|p| p.is_finite()));
    }
}
