//! Criterion benchmarks for net resolution hot paths.
//!
//! Every structural edit triggers a full rebuild of the net partition, so
//! rebuild cost bounds editor responsiveness on large sheets. This
//! measures an add/remove segment pair (two full rebuilds) against grids
//! of increasing size.
//!
//! Run with: cargo bench --bench net_rebuild

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use wirelab::geometry::{GridPoint, Rotation};
use wirelab::registry::NodeRegistry;
use wirelab::session::NodeRecord;
use wirelab::workbench::Workbench;

/// A sheet of `rows` horizontal polylines, each `cols` segments long with
/// a source on its left end, so pin attachment work scales with the grid.
fn build_sheet(rows: i32, cols: i32) -> Workbench {
    let mut bench = Workbench::new(Arc::new(NodeRegistry::with_builtins()), 32);
    for row in 0..rows {
        let y = row * 4;
        for col in 0..cols {
            let x = col * 2;
            bench
                .add_segment(GridPoint::new(x, y), GridPoint::new(x + 2, y))
                .expect("sheet segment");
        }
        let record = NodeRecord::new(
            "source",
            serde_json::json!({ "values": ["High"] }),
            GridPoint::new(-2, y),
            Rotation::R0,
        );
        bench.add_node(&record).expect("sheet source");
    }
    bench
}

fn net_rebuild_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("net_rebuild");

    for (name, rows, cols) in [("10x10", 10, 10), ("30x30", 30, 30), ("50x50", 50, 50)] {
        let mut bench = build_sheet(rows, cols);
        let a = GridPoint::new(0, -4);
        let b = GridPoint::new(8, -4);

        group.bench_with_input(BenchmarkId::new("edit_pair", name), &name, |bencher, _| {
            bencher.iter(|| {
                let id = bench.add_segment(a, b).expect("bench segment");
                bench.remove_segment(id).expect("bench segment removal");
            });
        });
    }

    group.finish();
}

criterion_group!(benches, net_rebuild_scaling);
criterion_main!(benches);
