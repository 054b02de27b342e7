use std::path::Path;

use proptest::prelude::*;
use termgraph_renderer::config::{LayoutKind, RouterKind};
use termgraph_renderer::geometry::Segment;
use termgraph_renderer::ir::attrs;
use termgraph_renderer::parser::parse_graph;
use termgraph_renderer::render::render_plain;
use termgraph_renderer::{Attributes, Config, GraphModel, RenderPipeline, RenderState, UpdateMode};

fn fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(&path).expect("fixture read failed")
}

fn render(graph: GraphModel, config: Config) -> String {
    let mut pipeline = RenderPipeline::new(graph, config).expect("pipeline setup failed");
    let rows = pipeline.render_rows().expect("render failed");
    render_plain(&rows)
}

#[test]
fn hello_world_matches_expected_output() {
    let graph = parse_graph(&fixture("hello_world.txt")).unwrap();
    assert_eq!(render(graph, Config::default()), fixture("hello_world.expected"));
}

#[test]
fn render_all_fixtures() {
    let candidates = ["hello_world.txt", "ports.json5", "pipeline.txt", "loops.txt"];
    for name in candidates {
        for router in [RouterKind::Orthogonal, RouterKind::Grid] {
            let graph = parse_graph(&fixture(name)).unwrap();
            let mut config = Config::default();
            config.render.routing.router = router;
            if name == "pipeline.txt" {
                config.layout.engine = LayoutKind::Layered;
            }
            let mut pipeline = RenderPipeline::new(graph, config).unwrap();
            let extent = pipeline.full_extent().unwrap();
            let rows = pipeline.render_rows().unwrap();
            assert_eq!(rows.len() as i32, extent.height, "{name}: row count");
            for row in &rows {
                assert_eq!(row.width() as i32, extent.width, "{name}: row width");
            }
            assert_eq!(pipeline.state(), RenderState::EdgesRendered);
        }
    }
}

#[test]
fn ports_show_their_connection_state() {
    let graph = parse_graph(&fixture("ports.json5")).unwrap();
    let text = render(graph, Config::default());
    assert_eq!(text.matches('●').count(), 2, "{text}");
    assert_eq!(text.matches('○').count(), 1, "{text}");
    assert!(text.contains("rows"));
    assert!(text.contains('╭'));
    assert!(text.contains('╔'));
}

#[test]
fn layered_layout_separates_nodes() {
    let graph = parse_graph(&fixture("pipeline.txt")).unwrap();
    let mut config = Config::default();
    config.layout.engine = LayoutKind::Layered;
    let mut pipeline = RenderPipeline::new(graph, config).unwrap();
    pipeline.render_rows().unwrap();

    let ids = ["fetch", "parse", "check", "emit"];
    for pair in ids.windows(2) {
        let upper = pipeline.node_position(pair[0]).unwrap();
        let lower = pipeline.node_position(pair[1]).unwrap();
        assert!(upper.y < lower.y, "{} should be above {}", pair[0], pair[1]);
    }
    for (i, a) in ids.iter().enumerate() {
        for b in &ids[i + 1..] {
            let ra = pipeline.node_region(a).unwrap();
            let rb = pipeline.node_region(b).unwrap();
            assert!(!ra.intersects(&rb), "{a} overlaps {b}");
        }
    }
}

#[test]
fn grid_router_avoids_nodes_in_between() {
    let mut graph = GraphModel::new();
    graph.add_node("top", attrs([("x", 0i64.into()), ("y", 0i64.into())])).unwrap();
    graph.add_node("wall", attrs([("x", 0i64.into()), ("y", 10i64.into())])).unwrap();
    graph.add_node("bottom", attrs([("x", 0i64.into()), ("y", 20i64.into())])).unwrap();
    graph.add_edge("e", "top", "bottom", Attributes::new()).unwrap();
    let mut config = Config::default();
    config.render.routing.router = RouterKind::Grid;

    let mut pipeline = RenderPipeline::new(graph, config).unwrap();
    pipeline.render_rows().unwrap();
    let wall = pipeline.node_region("wall").unwrap();
    let path = pipeline.edge_path("e").unwrap();
    for window in path.windows(2) {
        for cell in Segment::new(window[0].point, window[1].point).cells() {
            assert!(!wall.contains(cell), "edge crosses the wall at {cell:?}");
        }
    }
}

#[test]
fn incremental_edits_match_a_fresh_render() {
    let mut pipeline = RenderPipeline::new(
        parse_graph(&fixture("loops.txt")).unwrap(),
        Config::default(),
    )
    .unwrap();
    pipeline.render_rows().unwrap();

    pipeline
        .add_node("c", attrs([("label", "Cee".into()), ("x", 12i64.into()), ("y", 12i64.into())]), None)
        .unwrap();
    let id = pipeline.connect("b", "c", attrs([("label", "on".into())])).unwrap();
    assert_eq!(id, "b->c");
    pipeline.remove_edge("a->b#1").unwrap();
    pipeline
        .update_edge("retry", attrs([("label", "loop".into())]), UpdateMode::Merge)
        .unwrap();
    pipeline
        .update_node("b", None, Some(attrs([("label", "B".into())])), UpdateMode::Merge)
        .unwrap();
    let incremental = pipeline.render_rows().unwrap();

    let mut fresh = RenderPipeline::new(pipeline.graph().clone(), Config::default()).unwrap();
    assert_eq!(fresh.render_rows().unwrap(), incremental);
}

fn scattered_graph(rows: &[u8], links: &[(usize, usize)]) -> GraphModel {
    let mut graph = GraphModel::new();
    for (idx, row) in rows.iter().enumerate() {
        graph
            .add_node(
                &format!("n{idx}"),
                attrs([("x", (idx as i64 * 16).into()), ("y", (*row as i64 * 8).into())]),
            )
            .unwrap();
    }
    for (from, to) in links {
        let (from, to) = (format!("n{}", from % rows.len()), format!("n{}", to % rows.len()));
        let id = graph.next_edge_id(&from, &to);
        graph.add_edge(&id, &from, &to, Attributes::new()).unwrap();
    }
    graph
}

proptest! {
    #[test]
    fn edge_removal_matches_a_fresh_render(
        rows in prop::collection::vec(0u8..4, 2..6),
        links in prop::collection::vec((0usize..6, 0usize..6), 1..6),
    ) {
        let graph = scattered_graph(&rows, &links);
        let mut pipeline = RenderPipeline::new(graph, Config::default()).unwrap();
        let first = pipeline.render_rows().unwrap();
        prop_assert_eq!(&pipeline.render_rows().unwrap(), &first);

        let victim = pipeline.graph().edges().next().map(|edge| edge.id.clone()).unwrap();
        pipeline.remove_edge(&victim).unwrap();
        let incremental = pipeline.render_rows().unwrap();
        let mut fresh = RenderPipeline::new(pipeline.graph().clone(), Config::default()).unwrap();
        prop_assert_eq!(fresh.render_rows().unwrap(), incremental);
    }
}
