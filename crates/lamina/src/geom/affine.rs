//! Affine maps with tracked inverses.
//!
//! Sphere primitives are unit spheres under an arbitrary affine map; slicing
//! one needs the inverse map as often as the forward map, so `Aff3w` carries
//! both plus the determinant. Composition keeps the pair consistent, which
//! avoids re-inverting (and re-introducing rounding) at every use site.
//!
//! A singular map follows the div0 rule: the stored inverse is zero and the
//! determinant is zero, which downstream code treats as "degenerate, emit
//! nothing".

use nalgebra::{Matrix2, Matrix3, Vector2, Vector3};

use super::eps::Eps;
use super::vec::{Vec2, Vec3};

/// 3D affine map `x ↦ M x + t`.
#[derive(Clone, Copy, Debug)]
pub struct Aff3 {
    pub m: Matrix3<f64>,
    pub t: Vector3<f64>,
}

impl Aff3 {
    #[inline]
    pub fn identity() -> Self {
        Self {
            m: Matrix3::identity(),
            t: Vector3::zeros(),
        }
    }

    /// Composition `self ∘ other`.
    #[inline]
    pub fn compose(&self, other: &Self) -> Self {
        Self {
            m: self.m * other.m,
            t: self.m * other.t + self.t,
        }
    }

    #[inline]
    pub fn apply(&self, p: Vec3) -> Vec3 {
        self.m * p + self.t
    }
}

/// Affine map bundled with its inverse and determinant.
///
/// Invariant: `i` is the inverse of `n` and `d = det(n.m)`, or the map is
/// singular and `i` is the zero map with `d = 0`.
#[derive(Clone, Copy, Debug)]
pub struct Aff3w {
    pub n: Aff3,
    pub i: Aff3,
    pub d: f64,
}

impl Aff3w {
    pub fn identity() -> Self {
        Self {
            n: Aff3::identity(),
            i: Aff3::identity(),
            d: 1.0,
        }
    }

    /// Wrap a forward map, inverting it once.
    pub fn from_aff3(eps: &Eps, n: Aff3) -> Self {
        let d = n.m.determinant();
        if eps.sqr_eq(d, 0.0) {
            return Self {
                n,
                i: Aff3 {
                    m: Matrix3::zeros(),
                    t: Vector3::zeros(),
                },
                d: 0.0,
            };
        }
        // try_inverse only fails on (near-)singular input, handled above.
        let minv = n.m.try_inverse().unwrap_or_else(Matrix3::zeros);
        Self {
            n,
            i: Aff3 {
                m: minv,
                t: -minv * n.t,
            },
            d,
        }
    }

    pub fn scale(x: f64, y: f64, z: f64) -> Self {
        let n = Aff3 {
            m: Matrix3::from_diagonal(&Vector3::new(x, y, z)),
            t: Vector3::zeros(),
        };
        let (ix, iy, iz) = (safe_recip(x), safe_recip(y), safe_recip(z));
        Self {
            n,
            i: Aff3 {
                m: Matrix3::from_diagonal(&Vector3::new(ix, iy, iz)),
                t: Vector3::zeros(),
            },
            d: x * y * z,
        }
    }

    pub fn xlat(x: f64, y: f64, z: f64) -> Self {
        let t = Vector3::new(x, y, z);
        Self {
            n: Aff3 {
                m: Matrix3::identity(),
                t,
            },
            i: Aff3 {
                m: Matrix3::identity(),
                t: -t,
            },
            d: 1.0,
        }
    }

    /// Rotation mapping the direction `v` onto +z.
    ///
    /// Returns `None` for a (near-)zero `v`.
    pub fn rot_into_z(eps: &Eps, v: Vec3) -> Option<Self> {
        let len = v.norm();
        if eps.eq(len, 0.0) {
            return None;
        }
        let n = v / len;
        // u: any unit vector orthogonal to n, picked for stability.
        let u = if n.z.abs() < 0.9 {
            n.cross(&Vector3::z()).normalize()
        } else {
            n.cross(&Vector3::x()).normalize()
        };
        let w = n.cross(&u);
        // Rows (u, w, n): orthonormal, det +1, maps n to e_z.
        let m = Matrix3::from_rows(&[u.transpose(), w.transpose(), n.transpose()]);
        let fwd = Aff3 {
            m,
            t: Vector3::zeros(),
        };
        let inv = Aff3 {
            m: m.transpose(),
            t: Vector3::zeros(),
        };
        Some(Self {
            n: fwd,
            i: inv,
            d: 1.0,
        })
    }

    /// Composition `self ∘ other`, inverses composed in reverse.
    pub fn mul(&self, other: &Self) -> Self {
        Self {
            n: self.n.compose(&other.n),
            i: other.i.compose(&self.i),
            d: self.d * other.d,
        }
    }

    /// Swap forward and inverse maps.
    pub fn inv(&self) -> Self {
        Self {
            n: self.i,
            i: self.n,
            d: if self.d == 0.0 { 0.0 } else { 1.0 / self.d },
        }
    }
}

#[inline]
fn safe_recip(x: f64) -> f64 {
    if x == 0.0 {
        0.0
    } else {
        1.0 / x
    }
}

/// 2D affine map with determinant, reduced from a 3D map by dropping z.
#[derive(Clone, Copy, Debug)]
pub struct Aff2 {
    pub m: Matrix2<f64>,
    pub t: Vector2<f64>,
    pub d: f64,
}

impl Aff2 {
    /// Keep the xy block and xy translation; `d` is the 2D determinant.
    pub fn from_aff3w(a: &Aff3w) -> Self {
        let m = Matrix2::new(
            a.n.m[(0, 0)],
            a.n.m[(0, 1)],
            a.n.m[(1, 0)],
            a.n.m[(1, 1)],
        );
        Self {
            m,
            t: Vector2::new(a.n.t.x, a.n.t.y),
            d: m.determinant(),
        }
    }

    #[inline]
    pub fn apply(&self, p: Vec2) -> Vec2 {
        self.m * p + self.t
    }
}
