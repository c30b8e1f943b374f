//! Slice-based CSG preprocessing: 3D solids to triangulated 2D layers.
//!
//! The pipeline cuts a CSG model with horizontal planes first and performs
//! booleans per slice in 2D, which is simpler, more robust, and parallel
//! over layers:
//!
//! - `geom`: tolerances, quantization, predicates, affine maps
//! - `topo`: polyhedron half-edge topology
//! - `slice`: z-plane cuts of polyhedra and spheres
//! - `sweep`: the k-ary 2D boolean engine (plane sweep)
//! - `tri`: plane-sweep triangulation with holes
//! - `layer`: lazy boolean accumulation, layer stack, parallel driver
//! - `hull`, `gen`, `bitmap`, `dict`, `poly`, `err`: supporting pieces

pub mod bitmap;
pub mod dict;
pub mod err;
pub mod gen;
pub mod geom;
pub mod hull;
pub mod layer;
pub mod poly;
pub mod slice;
pub mod sweep;
pub mod topo;
pub mod tri;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common exports for quick imports in callers.
pub mod prelude {
    pub use crate::bitmap::{BoolBitmap, BoolOp, MAX_LAZY};
    pub use crate::err::{Error, Loc, Policy, Result};
    pub use crate::geom::{Eps, Vec2, Vec3};
    pub use crate::layer::{flatten, Csg3, FlattenMode, Lazy, Opt, Sphere3, Stack};
    pub use crate::poly::{Color, Path, Poly2, Vec2Loc};
    pub use crate::slice::{slice_polyhedron, slice_sphere};
    pub use crate::sweep::{op2, op_poly};
    pub use crate::topo::{Polyhedron3, Vec3Loc};
    pub use crate::tri::triangulate;
}
