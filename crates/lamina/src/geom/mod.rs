//! Scalar and vector kernel shared by all sweep/slice/triangulation code.
//!
//! - `Eps`: centralizes the three tolerances (grid, equality, determinant)
//!   and the quantization of coordinates onto the grid.
//! - `vec`: lexicographic compares and orientation predicates on `Vec2`.
//! - `trig`: degree-based sin/cos that are exact at cardinal angles.
//! - `affine`: 3D affine maps with tracked inverse and determinant.
//!
//! Conventions
//! - All geometric predicates are ε-aware; callers never compare raw floats.
//! - Coordinates entering the sweep are rasterized (`Eps::rasterize`), so
//!   equality of sweep points is exact equality of their coordinate pairs.

pub mod affine;
pub mod eps;
pub mod trig;
pub mod vec;

pub use affine::{Aff2, Aff3, Aff3w};
pub use eps::Eps;
pub use trig::{cos_deg, sin_deg};
pub use vec::{in_line, lerp, lex_cmp, orient, t01, Vec2, Vec3};
