use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use termgraph_renderer::config::{LayoutKind, RouterKind};
use termgraph_renderer::ir::attrs;
use termgraph_renderer::parser::parse_graph;
use termgraph_renderer::{Config, GraphModel, RenderPipeline, UpdateMode};

fn grid_source(side: usize, extra_edges: usize) -> String {
    let mut out = String::from("direction LR\n");
    for row in 0..side {
        for col in 0..side {
            out.push_str(&format!(
                "n{row}_{col} [label=\"Node {row}.{col}\", x={}, y={}]\n",
                col * 18,
                row * 8
            ));
        }
    }
    for row in 0..side {
        for col in 0..side {
            if col + 1 < side {
                out.push_str(&format!("n{row}_{col} -> n{row}_{}\n", col + 1));
            }
            if row + 1 < side {
                out.push_str(&format!("n{row}_{col} -> n{}_{col}\n", row + 1));
            }
        }
    }
    let mut count = 0usize;
    'outer: for row in 0..side {
        for col in 0..side {
            if count >= extra_edges {
                break 'outer;
            }
            let target = (row + 2) % side;
            out.push_str(&format!("n{row}_{col} -> n{target}_{col} [label=back]\n"));
            count += 1;
        }
    }
    out
}

fn grid_graph(side: usize, extra_edges: usize) -> GraphModel {
    parse_graph(&grid_source(side, extra_edges)).expect("parse failed")
}

fn bench_full_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_render");
    for (side, extra_edges) in [(4usize, 4usize), (8, 16), (12, 40)] {
        let name = format!("grid_{side}x{side}_{extra_edges}");
        let graph = grid_graph(side, extra_edges);
        group.bench_with_input(BenchmarkId::from_parameter(name), &graph, |b, graph| {
            b.iter(|| {
                let mut pipeline =
                    RenderPipeline::new(black_box(graph.clone()), Config::default()).expect("setup failed");
                let rows = pipeline.render_rows().expect("render failed");
                black_box(rows.len());
            });
        });
    }
    group.finish();
}

fn bench_layout_engines(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout_engines");
    let graph = grid_graph(8, 16);
    for engine in [LayoutKind::Static, LayoutKind::Layered] {
        let mut config = Config::default();
        config.layout.engine = engine;
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{engine:?}")),
            &config,
            |b, config| {
                b.iter(|| {
                    let mut pipeline =
                        RenderPipeline::new(graph.clone(), config.clone()).expect("setup failed");
                    let rows = pipeline.render_rows().expect("render failed");
                    black_box(rows.len());
                });
            },
        );
    }
    group.finish();
}

fn bench_routers(c: &mut Criterion) {
    let mut group = c.benchmark_group("edge_routing");
    for (side, extra_edges) in [(6usize, 8usize), (10, 30)] {
        let name = format!("grid_{side}x{side}_{extra_edges}");
        let graph = grid_graph(side, extra_edges);
        for router in [RouterKind::Orthogonal, RouterKind::Grid] {
            let mut config = Config::default();
            config.render.routing.router = router;
            group.bench_with_input(
                BenchmarkId::new(format!("{router:?}"), &name),
                &config,
                |b, config| {
                    b.iter(|| {
                        let mut pipeline =
                            RenderPipeline::new(graph.clone(), config.clone()).expect("setup failed");
                        let rows = pipeline.render_rows().expect("render failed");
                        black_box(rows.len());
                    });
                },
            );
        }
    }
    group.finish();
}

fn bench_incremental_updates(c: &mut Criterion) {
    let mut group = c.benchmark_group("incremental_updates");
    let graph = grid_graph(8, 16);

    let mut pipeline = RenderPipeline::new(graph.clone(), Config::default()).expect("setup failed");
    pipeline.render_rows().expect("render failed");
    let mut flip = false;
    group.bench_function("relabel_edge", |b| {
        b.iter(|| {
            flip = !flip;
            let label = if flip { "hot" } else { "cold" };
            pipeline
                .update_edge("n0_0->n0_1", attrs([("label", label.into())]), UpdateMode::Merge)
                .expect("update failed");
            black_box(pipeline.render_rows().expect("render failed").len());
        });
    });

    let mut pipeline = RenderPipeline::new(graph, Config::default()).expect("setup failed");
    pipeline.render_rows().expect("render failed");
    group.bench_function("toggle_edge", |b| {
        b.iter(|| {
            let id = pipeline
                .connect("n7_7", "n0_0", attrs([("label", "wrap".into())]))
                .expect("connect failed");
            black_box(pipeline.render_rows().expect("render failed").len());
            pipeline.remove_edge(&id).expect("remove failed");
            black_box(pipeline.render_rows().expect("render failed").len());
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_full_render,
    bench_layout_engines,
    bench_routers,
    bench_incremental_updates
);
criterion_main!(benches);
