//! Criterion benchmarks for the 2D boolean engine.
//! Focus sizes: n in {8, 32, 128, 512} vertices per operand.

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use nalgebra::vector;

use lamina::bitmap::BoolOp;
use lamina::gen::{draw_polygon_radial, RadialCfg, ReplayToken};
use lamina::geom::Eps;
use lamina::poly::Poly2;
use lamina::sweep::op2;

fn overlapping_pair(n: usize, seed: u64) -> (Poly2, Poly2) {
    let a = draw_polygon_radial(
        RadialCfg {
            vertices: n,
            ..RadialCfg::default()
        },
        ReplayToken { seed, index: 0 },
    );
    let b = draw_polygon_radial(
        RadialCfg {
            vertices: n,
            center: vector![0.5, 0.3],
            ..RadialCfg::default()
        },
        ReplayToken { seed, index: 1 },
    );
    (a, b)
}

fn bench_sweep(c: &mut Criterion) {
    let eps = Eps::default();
    let mut group = c.benchmark_group("sweep");
    for &n in &[8usize, 32, 128, 512] {
        group.bench_with_input(BenchmarkId::new("union", n), &n, |bch, &n| {
            bch.iter_batched(
                || overlapping_pair(n, 42),
                |(a, b)| op2(&eps, &a, &b, BoolOp::Add).unwrap(),
                BatchSize::SmallInput,
            )
        });
        group.bench_with_input(BenchmarkId::new("xor", n), &n, |bch, &n| {
            bch.iter_batched(
                || overlapping_pair(n, 42),
                |(a, b)| op2(&eps, &a, &b, BoolOp::Xor).unwrap(),
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_sweep);
criterion_main!(benches);
