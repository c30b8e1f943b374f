//! 2D convex hull over polygon point sets.
//!
//! Used by `hull`-style lowerings: the hull of a set of already-sliced
//! polygons is again a polygon with a single positive-orientation path.

use crate::geom::Vec2;
use crate::poly::{Path, Poly2, Vec2Loc};

/// Andrew's monotone chain (CCW order, deduped). O(N log N).
fn convex_hull(points: &[Vec2]) -> Option<Vec<Vec2>> {
    if points.len() < 3 {
        return None;
    }
    let mut pts: Vec<Vec2> = points.to_vec();
    pts.sort_by(|a, b| {
        a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y))
    });
    pts.dedup_by(|a, b| (*a - *b).norm() < 1e-12);
    if pts.len() < 3 {
        return None;
    }
    let cross = |a: Vec2, b: Vec2, c: Vec2| -> f64 {
        let ab = b - a;
        let ac = c - a;
        ab.x * ac.y - ab.y * ac.x
    };
    let mut lower: Vec<Vec2> = Vec::with_capacity(pts.len());
    for &p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }
    let mut upper: Vec<Vec2> = Vec::with_capacity(pts.len());
    for &p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }
    lower.pop();
    upper.pop();
    let mut hull = lower;
    hull.extend(upper);
    if hull.len() < 3 {
        return None;
    }
    Some(hull)
}

/// Convex hull of all points of `polys`, as a single-path polygon.
///
/// Collinear input (all points on one line) yields `None`: an empty hull is
/// a valid result, not an error.
pub fn hull_of(polys: &[&Poly2]) -> Option<Poly2> {
    let pts: Vec<Vec2> = polys
        .iter()
        .flat_map(|p| p.points.iter().map(|q| q.coord))
        .collect();
    let hull = convex_hull(&pts)?;
    let mut r = Poly2::new();
    let mut path = Path::default();
    for (i, c) in hull.into_iter().enumerate() {
        path.point_idx.push(i as u32);
        r.points.push(Vec2Loc::new(c));
    }
    r.paths.push(path);
    Some(r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::vector;

    #[test]
    fn hull_of_two_squares() {
        let a = Poly2::from_rings(&[&[
            vector![0.0, 0.0],
            vector![1.0, 0.0],
            vector![1.0, 1.0],
            vector![0.0, 1.0],
        ]]);
        let b = Poly2::from_rings(&[&[
            vector![2.0, 0.0],
            vector![3.0, 0.0],
            vector![3.0, 1.0],
            vector![2.0, 1.0],
        ]]);
        let h = hull_of(&[&a, &b]).unwrap();
        assert_eq!(h.paths.len(), 1);
        // hull is the 3x1 bounding rectangle
        assert!((h.area() - 3.0).abs() < 1e-12);
        assert!(h.path_area(&h.paths[0]) > 0.0);
    }

    #[test]
    fn collinear_points_have_no_hull() {
        let line = Poly2::from_rings(&[&[
            vector![0.0, 0.0],
            vector![1.0, 0.0],
            vector![2.0, 0.0],
        ]]);
        assert!(hull_of(&[&line]).is_none());
    }

    #[test]
    fn interior_points_are_dropped() {
        let p = Poly2::from_rings(&[&[
            vector![0.0, 0.0],
            vector![4.0, 0.0],
            vector![2.0, 0.1],
            vector![4.0, 4.0],
            vector![0.0, 4.0],
            vector![2.0, 2.0],
        ]]);
        let h = hull_of(&[&p]).unwrap();
        assert_eq!(h.paths[0].len(), 4);
        assert!((h.area() - 16.0).abs() < 1e-12);
    }
}
