//! 2D predicates on rasterized coordinates.
//!
//! `lex_cmp` is exact (coordinates are grid-snapped before they get here);
//! `orient` normalizes the cross product by the leg lengths so that the
//! collinearity threshold is scale-independent.

use std::cmp::Ordering;

use nalgebra::{Vector2, Vector3};

use super::eps::Eps;

pub type Vec2 = Vector2<f64>;
pub type Vec3 = Vector3<f64>;

/// Lexicographic compare, x primary.
///
/// Total order: inputs are rasterized, finite coordinates.
#[inline]
pub fn lex_cmp(a: Vec2, b: Vec2) -> Ordering {
    match a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal) {
        Ordering::Equal => a.y.partial_cmp(&b.y).unwrap_or(Ordering::Equal),
        o => o,
    }
}

/// ε-sign of the cross product `(b - a) × (c - a)`.
///
/// Returns +1 if `c` lies left of the directed line `a -> b`, -1 if right,
/// 0 if collinear within tolerance. The cross is normalized by the leg
/// lengths; a degenerate leg yields 0 (div0 rule).
#[inline]
pub fn orient(eps: &Eps, a: Vec2, b: Vec2, c: Vec2) -> i32 {
    let ab = b - a;
    let ac = c - a;
    let cr = ab.x * ac.y - ab.y * ac.x;
    let scale = ab.norm() * ac.norm();
    let n = eps.div0(cr, scale);
    if eps.eq(n, 0.0) {
        0
    } else if n > 0.0 {
        1
    } else {
        -1
    }
}

/// Does `b` lie on the line through `a` and `c` (within the grid tolerance)?
///
/// Distance-from-line test against `pt`: used to drop collinear interior
/// vertices and to detect same-direction edge pairs during chain assembly.
#[inline]
pub fn in_line(eps: &Eps, a: Vec2, b: Vec2, c: Vec2) -> bool {
    let ac = c - a;
    let len = ac.norm();
    if eps.eq(len, 0.0) {
        // a == c: "line" degenerates to a point
        return eps.eq((b - a).norm(), 0.0);
    }
    let ab = b - a;
    let dist = (ac.x * ab.y - ac.y * ab.x).abs() / len;
    dist < eps.pt
}

/// Interpolation parameter of `b` between `a` and `c` (1D).
#[inline]
pub fn t01(a: f64, b: f64, c: f64) -> f64 {
    (b - a) / (c - a)
}

#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::vector;

    #[test]
    fn orient_sign_convention() {
        let e = Eps::default();
        let a = vector![0.0, 0.0];
        let b = vector![1.0, 0.0];
        assert_eq!(orient(&e, a, b, vector![0.5, 1.0]), 1);
        assert_eq!(orient(&e, a, b, vector![0.5, -1.0]), -1);
        assert_eq!(orient(&e, a, b, vector![2.0, 0.0]), 0);
    }

    #[test]
    fn in_line_tolerates_grid_noise() {
        let e = Eps::default();
        let a = vector![0.0, 0.0];
        let c = vector![10.0, 0.0];
        assert!(in_line(&e, a, vector![5.0, e.eq * 0.5], c));
        assert!(!in_line(&e, a, vector![5.0, 10.0 * e.pt], c));
    }

    #[test]
    fn lex_cmp_is_x_primary() {
        assert_eq!(
            lex_cmp(vector![0.0, 9.0], vector![1.0, 0.0]),
            Ordering::Less
        );
        assert_eq!(
            lex_cmp(vector![1.0, -1.0], vector![1.0, 0.0]),
            Ordering::Less
        );
    }
}
