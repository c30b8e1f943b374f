//! Tolerance configuration and ε-aware scalar comparisons.
//!
//! Three tolerances with distinct jobs:
//! - `pt`: the coordinate grid. All sweep points are snapped to multiples of
//!   `pt`, so point identity is exact coordinate equality after snapping.
//! - `eq`: scalar equality for coordinates and slopes (≪ `pt`²).
//! - `sqr`: bound for products and determinants (≪ `eq`²).
//!
//! The constructor clamps `sqr <= eq <= pt`, so a caller cannot configure a
//! grid finer than its own equality test.

use std::cmp::Ordering;

/// Tolerances used by every geometric predicate.
#[derive(Clone, Copy, Debug)]
pub struct Eps {
    /// Coordinate grid step (quantization unit).
    pub pt: f64,
    /// Scalar equality tolerance.
    pub eq: f64,
    /// Product/determinant tolerance.
    pub sqr: f64,
}

impl Default for Eps {
    fn default() -> Self {
        let pt = 1.0 / 512.0;
        let eq = pt * pt;
        Self {
            pt,
            eq,
            sqr: eq * eq,
        }
    }
}

impl Eps {
    /// Construct with the `sqr <= eq <= pt` clamp applied.
    pub fn new(pt: f64, eq: f64, sqr: f64) -> Self {
        let eq = eq.min(pt);
        let sqr = sqr.min(eq);
        Self { pt, eq, sqr }
    }

    /// Snap a coordinate onto the `pt` grid.
    ///
    /// Values ε-equal to zero become exactly zero so that `-0.0` and tiny
    /// residues cannot split a grid point into two dictionary keys.
    #[inline]
    pub fn rasterize(&self, v: f64) -> f64 {
        let r = self.pt * (v / self.pt).round();
        if self.eq(r, 0.0) {
            0.0
        } else {
            r
        }
    }

    /// `|a - b| < e` for an explicit tolerance.
    #[inline]
    pub fn e_eq(e: f64, a: f64, b: f64) -> bool {
        (a - b).abs() < e
    }

    #[inline]
    pub fn eq(&self, a: f64, b: f64) -> bool {
        Self::e_eq(self.eq, a, b)
    }

    #[inline]
    pub fn lt(&self, a: f64, b: f64) -> bool {
        !self.eq(a, b) && a < b
    }

    #[inline]
    pub fn le(&self, a: f64, b: f64) -> bool {
        self.eq(a, b) || a < b
    }

    #[inline]
    pub fn ge(&self, a: f64, b: f64) -> bool {
        self.le(b, a)
    }

    #[inline]
    pub fn gt(&self, a: f64, b: f64) -> bool {
        self.lt(b, a)
    }

    /// Three-way ε-compare.
    #[inline]
    pub fn cmp(&self, a: f64, b: f64) -> Ordering {
        if self.eq(a, b) {
            Ordering::Equal
        } else if a < b {
            Ordering::Less
        } else {
            Ordering::Greater
        }
    }

    /// Equality under the product tolerance (for determinants and crosses).
    #[inline]
    pub fn sqr_eq(&self, a: f64, b: f64) -> bool {
        Self::e_eq(self.sqr, a, b)
    }

    /// Division mapping a zero divisor to zero.
    ///
    /// Zero is a sound fixed point here: a singular inverse has zero
    /// determinant, a zero-length unit vector stays zero-length.
    #[inline]
    pub fn div0(&self, a: f64, b: f64) -> f64 {
        if self.eq(b, 0.0) {
            0.0
        } else {
            a / b
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_clamped_powers() {
        let e = Eps::default();
        assert!(e.sqr <= e.eq && e.eq <= e.pt);
        assert!((e.pt - 1.0 / 512.0).abs() < 1e-15);
        assert!((e.eq - e.pt * e.pt).abs() < 1e-15);
    }

    #[test]
    fn new_clamps_inverted_config() {
        let e = Eps::new(1e-3, 1.0, 1.0);
        assert!(e.eq <= e.pt);
        assert!(e.sqr <= e.eq);
    }

    #[test]
    fn rasterize_is_idempotent_and_kills_negative_zero() {
        let e = Eps::default();
        let v = e.rasterize(0.123_456);
        assert_eq!(v, e.rasterize(v));
        assert_eq!(e.rasterize(-1e-12), 0.0);
        assert!(e.rasterize(-1e-12).is_sign_positive());
    }

    #[test]
    fn div0_maps_singular_to_zero() {
        let e = Eps::default();
        assert_eq!(e.div0(3.0, 0.0), 0.0);
        assert_eq!(e.div0(3.0, 2.0), 1.5);
    }
}
