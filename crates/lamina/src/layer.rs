//! Per-layer orchestration: lazy boolean accumulation, eager reduction,
//! and the layer stack.
//!
//! Walking the CSG tree for one z-plane produces a `Lazy` polygon at every
//! node: up to `MAX_LAZY` operand polygons plus a truth table saying which
//! inside-combinations are inside the result. Boolean nodes only
//! concatenate operand lists and rewrite the table; the sweep runs once
//! when the operand count would overflow (reducing the larger side first)
//! and once at the top of the layer. Delaying like this amortizes sweep
//! runs over whole subtrees.
//!
//! Layers are independent: `add_layers` fans them out with rayon, each
//! worker owning exactly one slot. After all layers exist, `diff_layer`
//! computes the side-wall helper polygons (`diff_above`, `diff_below`)
//! against the neighbouring layer.

use rayon::prelude::*;

use crate::bitmap::{BoolBitmap, BoolOp, MAX_LAZY};
use crate::err::{Error, Loc, Policy, Result};
use crate::geom::{Aff3w, Eps};
use crate::poly::{Color, Poly2};
use crate::slice::{slice_polyhedron, slice_sphere};
use crate::sweep;
use crate::topo::Polyhedron3;
use crate::tri::triangulate;

/// Driver options.
#[derive(Clone, Copy, Debug)]
pub struct Opt {
    /// Operand count that triggers eager reduction (2..=MAX_LAZY).
    /// Lower values save memory, higher values amortize more sweeps.
    pub max_lazy: usize,
    /// Resolve trivial boolean combinations with empty operands without
    /// running the sweep.
    pub skip_empty: bool,
    /// What to do when a difference has an empty first operand.
    pub empty_solid: Policy,
}

impl Default for Opt {
    fn default() -> Self {
        Self {
            max_lazy: MAX_LAZY,
            skip_empty: true,
            empty_solid: Policy::Warn,
        }
    }
}

impl Opt {
    fn check(&self) -> Result<()> {
        if self.max_lazy < 2 || self.max_lazy > MAX_LAZY {
            return Err(Error::config(format!(
                "max_lazy must be in 2..={MAX_LAZY}, got {}",
                self.max_lazy
            )));
        }
        Ok(())
    }
}

/// A sphere as a unit sphere under an affine map.
#[derive(Clone, Debug)]
pub struct Sphere3 {
    pub mat: Aff3w,
    /// Number of polygon segments for the cut ellipse.
    pub fn_: u32,
    pub loc: Loc,
    pub color: Color,
}

/// 3D CSG tree as handed over by the front end (primitives already
/// polygonalized except spheres, transforms already folded into leaves).
#[derive(Clone, Debug)]
pub enum Csg3 {
    Poly(Polyhedron3),
    Sphere(Sphere3),
    /// Union of the children.
    Add(Vec<Csg3>),
    /// Union of `add` minus union of `sub`.
    Sub {
        add: Vec<Csg3>,
        sub: Vec<Csg3>,
        loc: Loc,
    },
    /// Intersection of the children.
    Cut(Vec<Csg3>),
    /// Symmetric difference of the children.
    Xor(Vec<Csg3>),
}

/// An unresolved boolean combination of up to `MAX_LAZY` polygons.
#[derive(Clone, Debug, Default)]
pub struct Lazy {
    pub size: usize,
    pub data: [Poly2; MAX_LAZY],
    pub comb: BoolBitmap,
}

impl Lazy {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wrap one concrete polygon (empty polygons collapse to empty).
    pub fn from_poly(p: Poly2) -> Self {
        if p.paths.is_empty() {
            return Self::empty();
        }
        let mut r = Self::empty();
        r.size = 1;
        r.data[0] = p;
        r.comb = BoolBitmap::single();
        r
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Move out the reduced polygon (valid after `reduce`).
    fn take_poly(&mut self) -> Poly2 {
        debug_assert!(self.size <= 1);
        self.size = 0;
        std::mem::take(&mut self.data[0])
    }
}

/// Run the sweep on a lazy combination, leaving at most one polygon.
///
/// With `flatten` set the result is re-swept even for a single operand so
/// that rings are split into disjoint paths.
pub fn reduce(eps: &Eps, r: &mut Lazy, flatten: bool) -> Result<()> {
    if r.size == 0 || (!flatten && r.size <= 1) {
        return Ok(());
    }
    let polys: Vec<&Poly2> = r.data[..r.size].iter().collect();
    let out = sweep::op_poly(eps, &polys, &r.comb, flatten, false)?;
    *r = Lazy::from_poly(out);
    Ok(())
}

/// `r = r op b`, delaying the sweep while the operands fit.
///
/// When they do not fit, the larger side is reduced first; at most two
/// reductions are ever needed.
pub fn op_lazy(eps: &Eps, opt: &Opt, r: &mut Lazy, mut b: Lazy, op: BoolOp) -> Result<()> {
    let max_sim = opt.max_lazy.min(MAX_LAZY);
    for _loop in 0..3 {
        if opt.skip_empty {
            if b.size == 0 {
                if op == BoolOp::Cut {
                    *r = Lazy::empty();
                }
                return Ok(());
            }
            if r.size == 0 {
                if op == BoolOp::Add || op == BoolOp::Xor {
                    *r = b;
                }
                return Ok(());
            }
        }
        if r.size + b.size <= max_sim {
            break;
        }
        debug_assert!(_loop < 2);
        if r.size > b.size {
            reduce(eps, r, false)?;
        } else {
            reduce(eps, &mut b, false)?;
        }
    }
    debug_assert!(r.size + b.size <= MAX_LAZY);

    for i in 0..b.size {
        r.data[r.size + i] = std::mem::take(&mut b.data[i]);
    }
    r.comb.repeat(r.size, b.size);
    b.comb.spread(b.size, r.size);
    r.size += b.size;
    r.comb.combine(&b.comb, r.size, op);
    Ok(())
}

/// Fold a node list into one lazy value under `op`.
fn op_csg3_v(eps: &Eps, opt: &Opt, nodes: &[Csg3], z: f64, op: BoolOp) -> Result<Lazy> {
    let mut r = Lazy::empty();
    for (i, n) in nodes.iter().enumerate() {
        let o = op_csg3(eps, opt, n, z)?;
        if i == 0 {
            r = o;
        } else {
            op_lazy(eps, opt, &mut r, o, op)?;
        }
    }
    Ok(r)
}

/// Lazy polygon of one CSG node at one z-plane.
fn op_csg3(eps: &Eps, opt: &Opt, node: &Csg3, z: f64) -> Result<Lazy> {
    match node {
        Csg3::Poly(p) => Ok(match slice_polyhedron(eps, p, z)? {
            Some(poly) => Lazy::from_poly(poly),
            None => Lazy::empty(),
        }),
        Csg3::Sphere(s) => Ok(
            match slice_sphere(eps, &s.mat, s.fn_, s.loc, s.color, z) {
                Some(poly) => Lazy::from_poly(poly),
                None => Lazy::empty(),
            },
        ),
        Csg3::Add(v) => op_csg3_v(eps, opt, v, z, BoolOp::Add),
        Csg3::Sub { add, sub, loc } => {
            let mut r = op_csg3_v(eps, opt, add, z, BoolOp::Add)?;
            if r.is_empty() {
                match opt.empty_solid {
                    Policy::Ignore => {}
                    Policy::Warn => {
                        log::warn!("difference with empty first operand at z={z}")
                    }
                    Policy::Fail => {
                        return Err(Error::EmptySolid {
                            loc: *loc,
                            msg: format!("difference with empty first operand at z={z}"),
                        })
                    }
                }
            }
            let s = op_csg3_v(eps, opt, sub, z, BoolOp::Add)?;
            op_lazy(eps, opt, &mut r, s, BoolOp::Sub)?;
            Ok(r)
        }
        Csg3::Cut(v) => op_csg3_v(eps, opt, v, z, BoolOp::Cut),
        Csg3::Xor(v) => op_csg3_v(eps, opt, v, z, BoolOp::Xor),
    }
}

/// Output selection for `flatten`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlattenMode {
    /// Disjoint paths only (2D source for extrusion; rings split).
    Paths,
    /// Joined rings plus full triangulation (surface rendering).
    Triangles,
}

/// Boolean-union a set of polygons into one, or `None` when empty.
pub fn flatten(
    eps: &Eps,
    opt: &Opt,
    polys: Vec<Poly2>,
    mode: FlattenMode,
) -> Result<Option<Poly2>> {
    opt.check()?;
    let mut r = Lazy::empty();
    for p in polys {
        let o = Lazy::from_poly(p);
        op_lazy(eps, opt, &mut r, o, BoolOp::Add)?;
    }
    reduce(eps, &mut r, mode == FlattenMode::Paths)?;
    if r.is_empty() {
        return Ok(None);
    }
    let mut p = r.take_poly();
    if mode == FlattenMode::Triangles {
        triangulate(eps, &mut p)?;
    }
    Ok(Some(p))
}

/// One computed layer: the reduced, triangulated polygon plus the two
/// difference polygons against the neighbouring layers (for side walls).
#[derive(Clone, Debug, Default)]
pub struct Slot {
    pub poly: Poly2,
    pub diff_above: Poly2,
    pub diff_below: Poly2,
}

/// The layer stack: one optional slot per z-plane.
#[derive(Clone, Debug, Default)]
pub struct Stack {
    pub z: Vec<f64>,
    pub slots: Vec<Option<Slot>>,
}

impl Stack {
    pub fn new(z: Vec<f64>) -> Self {
        let n = z.len();
        Self {
            z,
            slots: (0..n).map(|_| None).collect(),
        }
    }

    fn compute_slot(eps: &Eps, opt: &Opt, tree: &Csg3, z: f64) -> Result<Option<Slot>> {
        let mut lazy = op_csg3(eps, opt, tree, z)?;
        reduce(eps, &mut lazy, false)?;
        if lazy.is_empty() {
            return Ok(None);
        }
        let mut poly = lazy.take_poly();
        triangulate(eps, &mut poly)?;
        Ok(Some(Slot {
            poly,
            diff_above: Poly2::new(),
            diff_below: Poly2::new(),
        }))
    }

    /// Slice, reduce and triangulate one layer.
    pub fn add_layer(&mut self, eps: &Eps, opt: &Opt, tree: &Csg3, zi: usize) -> Result<()> {
        opt.check()?;
        self.slots[zi] = Self::compute_slot(eps, opt, tree, self.z[zi])?;
        Ok(())
    }

    /// Compute all layers in parallel (one rayon task per slot; no shared
    /// mutable state).
    pub fn add_layers(&mut self, eps: &Eps, opt: &Opt, tree: &Csg3) -> Result<()> {
        opt.check()?;
        self.slots = self
            .z
            .par_iter()
            .map(|&z| Self::compute_slot(eps, opt, tree, z))
            .collect::<Result<Vec<_>>>()?;
        Ok(())
    }

    /// Fill `diff_above` of layer `zi` and `diff_below` of layer `zi + 1`.
    ///
    /// An empty neighbour makes the whole layer its own difference (the
    /// complete surface shows).
    pub fn diff_layer(&mut self, eps: &Eps, zi: usize) -> Result<()> {
        let a0 = self.slots[zi].as_ref().map(|s| s.poly.clone());
        let a1 = self
            .slots
            .get(zi + 1)
            .and_then(|s| s.as_ref())
            .map(|s| s.poly.clone());
        match (a0, a1) {
            (None, None) => Ok(()),
            (None, Some(p1)) => {
                if let Some(s) = self.slots[zi + 1].as_mut() {
                    s.diff_below = p1;
                }
                Ok(())
            }
            (Some(p0), None) => {
                if let Some(s) = self.slots[zi].as_mut() {
                    s.diff_above = p0;
                }
                Ok(())
            }
            (Some(p0), Some(p1)) => {
                let mut above = sweep::op2(eps, &p0, &p1, BoolOp::Sub)?;
                let mut below = sweep::op2(eps, &p1, &p0, BoolOp::Sub)?;
                triangulate(eps, &mut above)?;
                triangulate(eps, &mut below)?;
                if let Some(s) = self.slots[zi].as_mut() {
                    s.diff_above = above;
                }
                if let Some(s) = self.slots[zi + 1].as_mut() {
                    s.diff_below = below;
                }
                Ok(())
            }
        }
    }

    /// Run `diff_layer` for every adjacent pair.
    pub fn diff_layers(&mut self, eps: &Eps) -> Result<()> {
        for zi in 0..self.z.len() {
            self.diff_layer(eps, zi)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topo::cuboid;
    use nalgebra::vector;

    fn unit_cube(eps: &Eps) -> Csg3 {
        Csg3::Poly(cuboid(eps, vector![0.0, 0.0, 0.0], vector![1.0, 1.0, 1.0]).unwrap())
    }

    #[test]
    fn cube_stack_end_to_end() {
        let eps = Eps::default();
        let opt = Opt::default();
        let tree = unit_cube(&eps);
        let mut stack = Stack::new(vec![0.25, 0.5, 0.75, 2.0]);
        stack.add_layers(&eps, &opt, &tree).unwrap();
        for zi in 0..3 {
            let s = stack.slots[zi].as_ref().unwrap();
            assert!((s.poly.area() - 1.0).abs() < 1e-9);
            assert_eq!(s.poly.tris.len(), 2);
        }
        assert!(stack.slots[3].is_none());
        stack.diff_layers(&eps).unwrap();
        // identical neighbouring squares: empty diffs
        let s0 = stack.slots[0].as_ref().unwrap();
        assert!(s0.diff_above.is_empty());
        // topmost non-empty layer shows its full surface
        let s2 = stack.slots[2].as_ref().unwrap();
        assert!((s2.diff_above.area() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn sub_cut_xor_through_the_tree() {
        let eps = Eps::default();
        let opt = Opt::default();
        let a = Csg3::Poly(cuboid(&eps, vector![0.0, 0.0, 0.0], vector![2.0, 2.0, 1.0]).unwrap());
        let b = Csg3::Poly(cuboid(&eps, vector![1.0, 0.0, 0.0], vector![3.0, 2.0, 1.0]).unwrap());
        let z = 0.5;

        let sub = Csg3::Sub {
            add: vec![a.clone()],
            sub: vec![b.clone()],
            loc: Loc::NONE,
        };
        let mut lz = op_csg3(&eps, &opt, &sub, z).unwrap();
        reduce(&eps, &mut lz, false).unwrap();
        assert!((lz.data[0].area() - 2.0).abs() < 1e-9); // 2x2 minus right half

        let cut = Csg3::Cut(vec![a.clone(), b.clone()]);
        let mut lz = op_csg3(&eps, &opt, &cut, z).unwrap();
        reduce(&eps, &mut lz, false).unwrap();
        assert!((lz.data[0].area() - 2.0).abs() < 1e-9); // overlap strip

        let xor = Csg3::Xor(vec![a, b]);
        let mut lz = op_csg3(&eps, &opt, &xor, z).unwrap();
        reduce(&eps, &mut lz, false).unwrap();
        assert!((lz.data[0].area() - 4.0).abs() < 1e-9); // both minus overlap
    }

    #[test]
    fn lazy_overflow_forces_reduction() {
        let eps = Eps::default();
        let opt = Opt {
            max_lazy: 2,
            ..Opt::default()
        };
        // chain of unions longer than the operand limit
        let mut row = Vec::new();
        for i in 0..6 {
            let x = i as f64;
            row.push(Csg3::Poly(
                cuboid(&eps, vector![x, 0.0, 0.0], vector![x + 1.5, 1.0, 1.0]).unwrap(),
            ));
        }
        let tree = Csg3::Add(row);
        let mut lz = op_csg3(&eps, &opt, &tree, 0.5).unwrap();
        reduce(&eps, &mut lz, false).unwrap();
        // overlapping row unions into one rectangle 6.5 x 1
        assert!((lz.data[0].area() - 6.5).abs() < 1e-9);
        assert_eq!(lz.data[0].paths.len(), 1);
    }

    #[test]
    fn empty_solid_policy() {
        let eps = Eps::default();
        let a = unit_cube(&eps);
        let sub = Csg3::Sub {
            add: vec![],
            sub: vec![a],
            loc: Loc(7),
        };
        let warn = Opt {
            empty_solid: Policy::Warn,
            ..Opt::default()
        };
        let lz = op_csg3(&eps, &warn, &sub, 0.5).unwrap();
        assert!(lz.is_empty());
        let fail = Opt {
            empty_solid: Policy::Fail,
            ..Opt::default()
        };
        let r = op_csg3(&eps, &fail, &sub, 0.5);
        assert!(matches!(r, Err(Error::EmptySolid { loc: Loc(7), .. })));
    }

    #[test]
    fn flatten_modes() {
        let eps = Eps::default();
        let opt = Opt::default();
        let a = Poly2::from_rings(&[&[
            vector![0.0, 0.0],
            vector![1.0, 0.0],
            vector![1.0, 1.0],
            vector![0.0, 1.0],
        ]]);
        let b = Poly2::from_rings(&[&[
            vector![0.5, 0.0],
            vector![1.5, 0.0],
            vector![1.5, 1.0],
            vector![0.5, 1.0],
        ]]);
        let p = flatten(&eps, &opt, vec![a.clone(), b.clone()], FlattenMode::Triangles)
            .unwrap()
            .unwrap();
        assert!((p.area() - 1.5).abs() < 1e-9);
        assert_eq!(p.tris.len(), 2);

        let p = flatten(&eps, &opt, vec![a, b], FlattenMode::Paths)
            .unwrap()
            .unwrap();
        assert!((p.area() - 1.5).abs() < 1e-9);
        assert!(p.tris.is_empty());

        assert!(flatten(&eps, &opt, vec![], FlattenMode::Paths)
            .unwrap()
            .is_none());
    }
}
