use crate::anchors::Anchor;
use crate::error::Result;
use crate::fragment::{FragmentKind, ZOrder};
use crate::geometry::{FPoint, Region};
use crate::pipeline::{RenderPipeline, RenderState, Zoom};
use crate::routing::RoutePoint;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub state: RenderState,
    pub zoom: Option<Zoom>,
    pub extent: Region,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
    pub fragments: Vec<FragmentDump>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub position: Option<FPoint>,
    pub region: Option<Region>,
    pub level: Option<u8>,
    pub anchors: Vec<AnchorDump>,
}

#[derive(Debug, Serialize)]
pub struct AnchorDump {
    pub connection: String,
    #[serde(flatten)]
    pub anchor: Anchor,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub id: String,
    pub from: String,
    pub to: String,
    pub path: Vec<RoutePoint>,
}

#[derive(Debug, Serialize)]
pub struct FragmentDump {
    pub kind: FragmentKind,
    pub region: Region,
    pub z: ZOrder,
}

impl LayoutDump {
    /// Brings the pipeline fully up to date and snapshots its state.
    pub fn capture(pipeline: &mut RenderPipeline) -> Result<Self> {
        let extent = pipeline.full_extent()?;
        let fragments = pipeline
            .fragments()?
            .into_iter()
            .map(|fragment| FragmentDump {
                kind: fragment.kind.clone(),
                region: fragment.region,
                z: fragment.z,
            })
            .collect();

        let nodes = pipeline
            .graph()
            .nodes()
            .map(|node| NodeDump {
                id: node.id.clone(),
                position: pipeline.node_position(&node.id),
                region: pipeline.node_region(&node.id),
                level: pipeline.node_level(&node.id),
                anchors: pipeline
                    .anchors(&node.id)
                    .map(|anchors| {
                        anchors
                            .iter()
                            .map(|(id, anchor)| AnchorDump {
                                connection: id.to_string(),
                                anchor: *anchor,
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
            })
            .collect();

        let edges = pipeline
            .graph()
            .edges()
            .map(|edge| EdgeDump {
                id: edge.id.clone(),
                from: edge.from.clone(),
                to: edge.to.clone(),
                path: pipeline.edge_path(&edge.id).map(<[RoutePoint]>::to_vec).unwrap_or_default(),
            })
            .collect();

        Ok(LayoutDump {
            state: pipeline.state(),
            zoom: pipeline.zoom_factor(),
            extent,
            nodes,
            edges,
            fragments,
        })
    }
}

pub fn write_layout_dump(path: &Path, pipeline: &mut RenderPipeline) -> anyhow::Result<()> {
    let dump = LayoutDump::capture(pipeline)?;
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::ir::{Attributes, GraphModel, attrs};

    #[test]
    fn dump_serializes_positions_and_paths() {
        let mut graph = GraphModel::new();
        graph.add_node("a", attrs([("x", 0i64.into())])).unwrap();
        graph.add_node("b", attrs([("x", 20i64.into())])).unwrap();
        graph.add_edge("a->b", "a", "b", Attributes::new()).unwrap();
        let mut pipeline = RenderPipeline::new(graph, Config::default()).unwrap();

        let dump = LayoutDump::capture(&mut pipeline).unwrap();
        assert_eq!(dump.state, RenderState::EdgesRendered);
        assert_eq!(dump.nodes.len(), 2);
        assert_eq!(dump.edges[0].path.first().map(|p| p.point.y), Some(0));
        assert_eq!(dump.nodes[0].anchors[0].connection, "slot:b");

        let json = serde_json::to_value(&dump).unwrap();
        assert_eq!(json["nodes"][0]["anchors"][0]["side"], "Right");
        assert!(json["fragments"].as_array().is_some_and(|f| f.len() >= 4));
    }
}
