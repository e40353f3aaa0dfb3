//! Performance benchmarks for tree exports and work unit planning.
//!
//! Run with: `cargo bench --bench topology`
//!
//! ## Performance Targets
//!
//! | Operation | Target | Notes |
//! |-----------|--------|-------|
//! | Template build | <50µs | 16 node portal tree |
//! | Parent list / matrix | Linear in nodes | Matrix is quadratic in memory |
//! | Work units | <1ms for 1k nodes | Every strategy |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use vessel_branch_kernel::{
    to_adjacency_matrix, to_polyline, BranchTree, NodeId, Position, PositionMap, StrategyKind,
    TopologySnapshot, VesselTemplate,
};

/// Tree of `n` nodes where node `i` hangs under node `(i - 1) / 3`.
fn make_tree(n: usize) -> BranchTree {
    let mut tree = BranchTree::new();
    for i in 0..n {
        let parent = (i > 0).then(|| format!("node_{}", (i - 1) / 3));
        tree.insert_after_node(format!("node_{i}"), parent.as_deref())
            .expect("synthetic tree is acyclic");
    }
    tree
}

fn make_positions(tree: &BranchTree) -> PositionMap {
    tree.node_list()
        .into_iter()
        .enumerate()
        .map(|(i, id): (usize, NodeId)| (id, Position::new(i as f64, (i % 7) as f64, (i % 11) as f64)))
        .collect()
}

fn bench_template_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("template_build");
    for template in [VesselTemplate::Portal, VesselTemplate::InferiorCava] {
        group.bench_function(template.to_string(), |b| {
            b.iter(|| black_box(template).build().expect("template builds"))
        });
    }
    group.finish();
}

fn bench_exports(c: &mut Criterion) {
    let mut group = c.benchmark_group("exports");

    for n in [16, 128, 1024] {
        let tree = make_tree(n);
        let positions = make_positions(&tree);

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("parent_list", n), &tree, |b, tree| {
            b.iter(|| black_box(tree).tree_parent_list())
        });
        group.bench_with_input(BenchmarkId::new("adjacency_matrix", n), &tree, |b, tree| {
            b.iter(|| to_adjacency_matrix(black_box(tree)))
        });
        group.bench_with_input(BenchmarkId::new("polyline", n), &tree, |b, tree| {
            b.iter(|| to_polyline(black_box(tree), &positions).expect("all nodes positioned"))
        });
        group.bench_with_input(BenchmarkId::new("snapshot", n), &tree, |b, tree| {
            b.iter(|| {
                TopologySnapshot::compute_with_positions(black_box(tree), &positions)
                    .expect("snapshot hashes")
            })
        });
    }

    group.finish();
}

fn bench_work_units(c: &mut Criterion) {
    let mut group = c.benchmark_group("work_units");

    for n in [16, 1024] {
        let tree = make_tree(n);
        let positions = make_positions(&tree);

        for kind in StrategyKind::ALL {
            let strategy = kind.strategy();
            group.bench_with_input(BenchmarkId::new(kind.to_string(), n), &tree, |b, tree| {
                b.iter(|| {
                    strategy
                        .work_units(black_box(tree), &positions)
                        .expect("all nodes positioned")
                })
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_template_build, bench_exports, bench_work_units);
criterion_main!(benches);
