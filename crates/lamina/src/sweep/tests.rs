use nalgebra::vector;
use proptest::prelude::*;

use crate::bitmap::{BoolBitmap, BoolOp};
use crate::gen::{draw_polygon_radial, RadialCfg, ReplayToken};
use crate::geom::{Eps, Vec2};
use crate::poly::Poly2;
use crate::tri::triangulate;

use super::{op2, op_poly};

fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Poly2 {
    Poly2::from_rings(&[&[
        vector![x0, y0],
        vector![x1, y0],
        vector![x1, y1],
        vector![x0, y1],
    ]])
}

/// Point-set equality modulo ε: the symmetric difference sweeps to empty.
fn same_region(eps: &Eps, a: &Poly2, b: &Poly2) -> bool {
    match op2(eps, a, b, BoolOp::Xor) {
        Ok(p) => p.paths.is_empty(),
        Err(_) => false,
    }
}

fn path_coords(p: &Poly2, i: usize) -> Vec<Vec2> {
    p.paths[i]
        .point_idx
        .iter()
        .map(|&j| p.points[j as usize].coord)
        .collect()
}

#[test]
fn union_of_shifted_unit_squares() {
    let eps = Eps::default();
    let a = square(0.0, 0.0, 1.0, 1.0);
    let b = square(0.5, 0.0, 1.5, 1.0);
    let mut p = op2(&eps, &a, &b, BoolOp::Add).unwrap();
    assert_eq!(p.paths.len(), 1);
    assert!(p.path_area(&p.paths[0]) > 0.0);
    assert!((p.area() - 1.5).abs() < 1e-9);
    // collinear seam vertices are filtered: only the four corners remain
    let mut got = path_coords(&p, 0);
    got.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    let want = [
        vector![0.0, 0.0],
        vector![0.0, 1.0],
        vector![1.5, 0.0],
        vector![1.5, 1.0],
    ];
    assert_eq!(got.len(), 4);
    for (g, w) in got.iter().zip(want.iter()) {
        assert!((g - w).norm() < 1e-9);
    }
    triangulate(&eps, &mut p).unwrap();
    assert_eq!(p.tris.len(), 2);
}

#[test]
fn square_minus_interior_hole() {
    let eps = Eps::default();
    let outer = square(0.0, 0.0, 10.0, 10.0);
    let inner = square(4.0, 4.0, 6.0, 6.0);
    let mut p = op2(&eps, &outer, &inner, BoolOp::Sub).unwrap();
    assert_eq!(p.paths.len(), 2);
    let mut areas: Vec<f64> = p.paths.iter().map(|q| p.path_area(q)).collect();
    areas.sort_by(f64::total_cmp);
    assert!((areas[0] + 4.0).abs() < 1e-9); // hole, opposite orientation
    assert!((areas[1] - 100.0).abs() < 1e-9); // outer
    triangulate(&eps, &mut p).unwrap();
    assert_eq!(p.tris.len(), 8);
    let sum: f64 = p.tris.iter().map(|&t| p.tri_area(t)).sum();
    assert!((sum - 96.0).abs() < 1e-9);
}

#[test]
fn xor_of_identical_squares_is_empty() {
    let eps = Eps::default();
    let a = square(0.0, 0.0, 1.0, 1.0);
    let p = op2(&eps, &a, &a.clone(), BoolOp::Xor).unwrap();
    assert!(p.paths.is_empty());
}

#[test]
fn triangle_intersection_is_hexagon() {
    let eps = Eps::default();
    let t1 = Poly2::from_rings(&[&[vector![0.0, 0.0], vector![10.0, 0.0], vector![5.0, 10.0]]]);
    let t2 = Poly2::from_rings(&[&[vector![0.0, 5.0], vector![10.0, 5.0], vector![5.0, -5.0]]]);
    let mut p = op2(&eps, &t1, &t2, BoolOp::Cut).unwrap();
    assert_eq!(p.paths.len(), 1);
    assert_eq!(p.paths[0].len(), 6);
    assert!((p.area() - 31.25).abs() < 1e-6);
    // all six vertices are edge-edge intersection points
    let want = [
        vector![2.5, 0.0],
        vector![7.5, 0.0],
        vector![8.75, 2.5],
        vector![7.5, 5.0],
        vector![2.5, 5.0],
        vector![1.25, 2.5],
    ];
    let got = path_coords(&p, 0);
    for w in &want {
        assert!(
            got.iter().any(|g| (g - w).norm() < 1e-6),
            "missing vertex {w:?}"
        );
    }
    triangulate(&eps, &mut p).unwrap();
    assert_eq!(p.tris.len(), 4);
    let sum: f64 = p.tris.iter().map(|&t| p.tri_area(t)).sum();
    assert!((sum - 31.25).abs() < 1e-6);
}

#[test]
fn union_of_edge_adjacent_squares_is_seamless() {
    let eps = Eps::default();
    let a = square(0.0, 0.0, 1.0, 1.0);
    let b = square(1.0, 0.0, 2.0, 1.0);
    let p = op2(&eps, &a, &b, BoolOp::Add).unwrap();
    // the shared edge carries both owners and the function does not flip
    assert_eq!(p.paths.len(), 1);
    assert_eq!(p.paths[0].len(), 4);
    assert!((p.area() - 2.0).abs() < 1e-9);
}

#[test]
fn disjoint_union_keeps_orientation_per_path() {
    let eps = Eps::default();
    let a = square(0.0, 0.0, 1.0, 1.0);
    let b = square(3.0, 0.0, 4.0, 1.0);
    let p = op2(&eps, &a, &b, BoolOp::Add).unwrap();
    assert_eq!(p.paths.len(), 2);
    for path in &p.paths {
        assert!(p.path_area(path) > 0.0);
    }
}

#[test]
fn self_overlap_cancels_modulo_two() {
    let eps = Eps::default();
    // one polygon containing the same ring twice: owners XOR to zero
    let sq = square(0.0, 0.0, 1.0, 1.0);
    let mut doubled = sq.clone();
    let n = doubled.points.len() as u32;
    let ring2: Vec<u32> = sq.paths[0].point_idx.iter().map(|&i| i + n).collect();
    doubled.points.extend(sq.points.iter().copied());
    doubled.paths.push(crate::poly::Path { point_idx: ring2 });
    let p = op_poly(&eps, &[&doubled], &BoolBitmap::single(), false, false).unwrap();
    assert!(p.paths.is_empty());
}

#[test]
fn all_points_keeps_collinear_vertices() {
    let eps = Eps::default();
    // a square with an extra collinear vertex on the bottom edge
    let p5 = Poly2::from_rings(&[&[
        vector![0.0, 0.0],
        vector![0.5, 0.0],
        vector![1.0, 0.0],
        vector![1.0, 1.0],
        vector![0.0, 1.0],
    ]]);
    let filtered = op_poly(&eps, &[&p5], &BoolBitmap::single(), false, false).unwrap();
    assert_eq!(filtered.paths[0].len(), 4);
    let kept = op_poly(&eps, &[&p5], &BoolBitmap::single(), false, true).unwrap();
    assert_eq!(kept.paths[0].len(), 5);
}

#[test]
fn crossing_squares_make_a_cross() {
    let eps = Eps::default();
    // two rectangles crossing like a plus sign
    let a = square(-3.0, -1.0, 3.0, 1.0);
    let b = square(-1.0, -3.0, 1.0, 3.0);
    let mut p = op2(&eps, &a, &b, BoolOp::Add).unwrap();
    assert_eq!(p.paths.len(), 1);
    assert_eq!(p.paths[0].len(), 12);
    assert!((p.area() - 20.0).abs() < 1e-9);
    triangulate(&eps, &mut p).unwrap();
    let sum: f64 = p.tris.iter().map(|&t| p.tri_area(t)).sum();
    assert!((sum - 20.0).abs() < 1e-9);
}

fn pair(seed: u64) -> (Poly2, Poly2) {
    let a = draw_polygon_radial(RadialCfg::default(), ReplayToken { seed, index: 0 });
    let b = draw_polygon_radial(
        RadialCfg {
            center: vector![0.6, 0.25],
            ..RadialCfg::default()
        },
        ReplayToken { seed, index: 1 },
    );
    (a, b)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn union_commutes(seed in 0u64..1000) {
        let eps = Eps::default();
        let (a, b) = pair(seed);
        let ab = op2(&eps, &a, &b, BoolOp::Add).unwrap();
        let ba = op2(&eps, &b, &a, BoolOp::Add).unwrap();
        prop_assert!(same_region(&eps, &ab, &ba));
    }

    #[test]
    fn flatten_is_idempotent(seed in 0u64..1000) {
        let eps = Eps::default();
        let (a, b) = pair(seed);
        let f = op2(&eps, &a, &b, BoolOp::Add).unwrap();
        let f2 = op_poly(&eps, &[&f], &BoolBitmap::single(), false, false).unwrap();
        prop_assert!(same_region(&eps, &f, &f2));
    }

    #[test]
    fn double_difference_is_intersection(seed in 0u64..1000) {
        let eps = Eps::default();
        let (a, b) = pair(seed);
        let d1 = op2(&eps, &a, &b, BoolOp::Sub).unwrap();
        let d2 = op2(&eps, &a, &d1, BoolOp::Sub).unwrap();
        let cut = op2(&eps, &a, &b, BoolOp::Cut).unwrap();
        prop_assert!(same_region(&eps, &d2, &cut));
    }

    #[test]
    fn xor_is_involutive(seed in 0u64..1000) {
        let eps = Eps::default();
        let (a, b) = pair(seed);
        // A ⊕ A = ∅
        let aa = op2(&eps, &a, &a.clone(), BoolOp::Xor).unwrap();
        prop_assert!(aa.paths.is_empty());
        // A ⊕ B ⊕ A = B
        let ab = op2(&eps, &a, &b, BoolOp::Xor).unwrap();
        let aba = op2(&eps, &ab, &a, BoolOp::Xor).unwrap();
        prop_assert!(same_region(&eps, &aba, &b));
    }

    #[test]
    fn output_vertices_have_even_degree(seed in 0u64..1000) {
        use std::collections::HashMap;
        let eps = Eps::default();
        let (a, b) = pair(seed);
        for op in [BoolOp::Add, BoolOp::Sub, BoolOp::Cut, BoolOp::Xor] {
            let p = op2(&eps, &a, &b, op).unwrap();
            let mut deg: HashMap<(u64, u64), u32> = HashMap::new();
            for path in &p.paths {
                let n = path.len();
                for j in 0..n {
                    for v in [path.point_idx[j], path.point_idx[(j + 1) % n]] {
                        let c = p.points[v as usize].coord;
                        *deg.entry((c.x.to_bits(), c.y.to_bits())).or_insert(0) += 1;
                    }
                }
            }
            for (_, d) in deg {
                prop_assert_eq!(d % 2, 0);
            }
        }
    }

    #[test]
    fn triangulation_partitions_the_union(seed in 0u64..1000) {
        let eps = Eps::default();
        let (a, b) = pair(seed);
        let mut p = op2(&eps, &a, &b, BoolOp::Add).unwrap();
        triangulate(&eps, &mut p).unwrap();
        let sum: f64 = p.tris.iter().map(|&t| p.tri_area(t)).sum();
        prop_assert!((sum - p.area()).abs() < 1e-6 * p.area().max(1.0));
        for &t in &p.tris {
            prop_assert!(p.tri_area(t) > -1e-12);
        }
    }
}
