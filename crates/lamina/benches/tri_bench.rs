//! Criterion benchmarks for the triangulator.

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};

use lamina::gen::{draw_polygon_radial, RadialCfg, ReplayToken};
use lamina::geom::Eps;
use lamina::tri::triangulate;

fn bench_tri(c: &mut Criterion) {
    let eps = Eps::default();
    let mut group = c.benchmark_group("tri");
    for &n in &[8usize, 64, 512, 2048] {
        group.bench_with_input(BenchmarkId::new("radial", n), &n, |bch, &n| {
            bch.iter_batched(
                || {
                    draw_polygon_radial(
                        RadialCfg {
                            vertices: n,
                            ..RadialCfg::default()
                        },
                        ReplayToken { seed: 7, index: 0 },
                    )
                },
                |mut p| triangulate(&eps, &mut p).unwrap(),
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_tri);
criterion_main!(benches);
