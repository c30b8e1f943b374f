//! Slice a polyhedron (or sphere) with a horizontal plane z = c.
//!
//! The cut runs in O(edges): every edge is classified against the plane by
//! the ε-signs of its endpoint z-coordinates, and closed intersection paths
//! are walked directly on the half-edge structure: from an entering edge,
//! scan along the current face to the exiting edge, hop to the buddy face,
//! repeat until back at the start. Edges or vertices lying exactly in the
//! plane need a CW search around the in-plane vertex to find the true exit.
//!
//! Output orientation: the interior of the solid is to the left of the
//! travel direction, so outer paths have positive signed area. A plane
//! tangent to a single vertex or grazing edge emits nothing.

use log::trace;

use crate::err::{Error, Loc, Result};
use crate::geom::{cos_deg, sin_deg, Aff2, Aff3w, Eps};
use crate::geom::{lerp, t01, Vec2, Vec3};
use crate::poly::{Color, Path, Poly2, Vec2Loc};
use crate::topo::Polyhedron3;

/// Edge category against the plane.
///
/// `TwoSide`-style cases come straight from the endpoint signs; the
/// annotated cases are produced when an endpoint (or the whole edge) lies in
/// the plane and the CW search has resolved what the surrounding surface
/// does.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Cat {
    /// Both endpoints strictly below.
    Below,
    /// Both endpoints strictly above.
    Above,
    /// src below, dst above.
    UpCross,
    /// src above, dst below.
    DownCross,
    /// src below, dst in plane.
    UpTouch,
    /// src above, dst in plane.
    DownTouch,
    /// src in plane, dst above.
    TouchUp,
    /// src in plane, dst below; payload = what the face does:
    /// 0 unknown, +1 extends above the plane, -1 strictly below.
    TouchDown(i32),
    /// Edge lies in the plane; payload = fore/back relation:
    /// 0 unknown, FA (+1) output boundary forward, FB (-1) backward,
    /// FE (2) not part of the output boundary.
    InPlane(i32),
}

const FA: i32 = 1;
const FB: i32 = -1;
const FE: i32 = 2;

struct Ctx<'a> {
    eps: &'a Eps,
    poly: &'a Polyhedron3,
    z: f64,
    visited: Vec<bool>,
    points: Vec<Vec2Loc>,
    paths: Vec<Path>,
    /// Index of the path currently being emitted, if any.
    cur: Option<usize>,
}

impl<'a> Ctx<'a> {
    fn sign(&self, p: u32) -> i32 {
        match self.eps.cmp(self.poly.coord(p).z, self.z) {
            std::cmp::Ordering::Less => -1,
            std::cmp::Ordering::Equal => 0,
            std::cmp::Ordering::Greater => 1,
        }
    }

    /// Category of `e` as traversed by face `f`, from endpoint signs only.
    fn edge_cmp_z(&self, f: u32, e: u32) -> Cat {
        let ed = &self.poly.edges[e as usize];
        let s = self.sign(self.poly.edge_src(f, ed));
        let d = self.sign(self.poly.edge_dst(f, ed));
        match (s, d) {
            (-1, -1) => Cat::Below,
            (1, 1) => Cat::Above,
            (-1, 1) => Cat::UpCross,
            (1, -1) => Cat::DownCross,
            (-1, 0) => Cat::UpTouch,
            (1, 0) => Cat::DownTouch,
            (0, 1) => Cat::TouchUp,
            (0, -1) => Cat::TouchDown(0),
            (0, 0) => Cat::InPlane(0),
            _ => unreachable!(),
        }
    }

    /// First nonzero sign of a face's vertices, else 0 (face in plane).
    fn face_cmp_z(&self, f: u32) -> i32 {
        for &p in &self.poly.faces[f as usize].points {
            let c = self.sign(p);
            if c != 0 {
                return c;
            }
        }
        0
    }

    /// Resolve an in-plane edge: is it part of the output boundary, and in
    /// which direction relative to face `f`?
    fn edge_z_cat(&self, f: u32, e: u32) -> Cat {
        let ed = &self.poly.edges[e as usize];
        let fc = self.face_cmp_z(f);
        let bc = self.face_cmp_z(self.poly.buddy_face(f, ed));
        match (fc, bc) {
            (0, 0) | (1, 1) | (-1, -1) | (-1, 0) | (0, -1) => Cat::InPlane(FE),
            (1, -1) | (1, 0) => Cat::InPlane(FA),
            (-1, 1) | (0, 1) => Cat::InPlane(FB),
            _ => unreachable!(),
        }
    }

    fn mark(&mut self, e: u32) {
        debug_assert!(!self.visited[e as usize]);
        self.visited[e as usize] = true;
    }

    /// Append the plane crossing of `e` to the current path.
    fn push_point_on_edge(&mut self, e: u32) {
        let ed = &self.poly.edges[e as usize];
        let src = self.poly.coord(ed.src);
        let dst = self.poly.coord(ed.dst);
        debug_assert!(!self.eps.eq(src.z, dst.z));
        let mut t = t01(src.z, self.z, dst.z);
        if self.eps.eq(t, 0.0) {
            t = 0.0;
        }
        if self.eps.eq(t, 1.0) {
            t = 1.0;
        }
        debug_assert!((0.0..=1.0).contains(&t));
        let coord = Vec2::new(lerp(src.x, dst.x, t), lerp(src.y, dst.y, t));
        self.push_coord(coord, self.poly.points[ed.src as usize].loc);
    }

    /// Append the in-plane source vertex of `e` (in `f`'s direction).
    fn push_src_on_edge(&mut self, f: u32, e: u32) {
        let ed = &self.poly.edges[e as usize];
        let p = self.poly.edge_src(f, ed);
        let c = self.poly.coord(p);
        self.push_coord(Vec2::new(c.x, c.y), self.poly.points[p as usize].loc);
    }

    fn push_coord(&mut self, coord: Vec2, loc: Loc) {
        let path = match self.cur {
            Some(i) => i,
            None => {
                self.paths.push(Path::default());
                let i = self.paths.len() - 1;
                self.cur = Some(i);
                i
            }
        };
        self.paths[path].point_idx.push(self.points.len() as u32);
        self.points.push(Vec2Loc {
            coord,
            loc,
            color: Color::default(),
        });
    }

    /// Scan along face `f` from `e` for the next edge leaving the plane
    /// upward; everything in between must stay below.
    fn follow_path(&self, f: u32, e: &mut u32) -> Result<Cat> {
        let start = *e;
        let mut cur = *e;
        loop {
            cur = self.poly.edge_next(f, &self.poly.edges[cur as usize]);
            if cur == start {
                // walked the whole face without finding the exit
                return Err(self.unclosed(cur));
            }
            match self.edge_cmp_z(f, cur) {
                c @ (Cat::UpCross | Cat::UpTouch) => {
                    *e = cur;
                    return Ok(c);
                }
                Cat::Below => continue,
                _ => return Err(self.unclosed(cur)),
            }
        }
    }

    /// CW search around the in-plane source vertex of `e` for the exit.
    ///
    /// Steps to the previous edge of the current face and across to its
    /// buddy, repeatedly, until an edge leads strictly above (touch-down
    /// with surface above) or an in-plane boundary edge is found.
    fn cw_search(&self, f: &mut u32, e: &mut u32) -> Cat {
        let entry = *e;
        let mut cf = *f;
        let mut ce = *e;
        loop {
            let e2 = self.poly.edge_prev(cf, &self.poly.edges[ce as usize]);
            let f2 = self.poly.buddy_face(cf, &self.poly.edges[e2 as usize]);
            if e2 == entry {
                // no other edge: tangent vertex, nothing to walk
                return Cat::InPlane(FE);
            }
            let dst = self.poly.edge_dst(f2, &self.poly.edges[e2 as usize]);
            match self.sign(dst) {
                -1 => {
                    cf = f2;
                    ce = e2;
                }
                1 => {
                    // surface turns upward here: current edge is the exit
                    *f = cf;
                    *e = ce;
                    return Cat::TouchDown(1);
                }
                0 => {
                    let c = self.edge_z_cat(f2, e2);
                    if c == Cat::InPlane(FE) {
                        cf = f2;
                        ce = e2;
                        continue;
                    }
                    *f = f2;
                    *e = e2;
                    return c;
                }
                _ => unreachable!(),
            }
        }
    }

    fn unclosed(&self, e: u32) -> Error {
        let ed = &self.poly.edges[e as usize];
        Error::topology(
            self.poly.points[ed.src as usize].loc,
            "slice path does not close (inconsistent polyhedron surface)",
        )
    }

    /// Walk the slice path through `e_start`, if one runs through it.
    fn find_path(&mut self, e_start: u32) -> Result<()> {
        let mut e = e_start;
        let mut f = self.poly.edges[e as usize].fore;
        let mut c = self.edge_cmp_z(f, e);
        debug_assert!(self.cur.is_none());
        loop {
            let eo = e;
            match c {
                Cat::Below | Cat::Above | Cat::DownTouch | Cat::TouchUp | Cat::InPlane(FE) => {
                    self.mark(e);
                    debug_assert!(self.cur.is_none());
                    return Ok(());
                }
                Cat::UpCross | Cat::DownCross => {
                    if c == Cat::UpCross {
                        f = self.poly.buddy_face(f, &self.poly.edges[e as usize]);
                    }
                    self.push_point_on_edge(e);
                    self.mark(e);
                    c = self.follow_path(f, &mut e)?;
                }
                Cat::TouchDown(1) => {
                    self.push_src_on_edge(f, e);
                    self.mark(e);
                    c = self.follow_path(f, &mut e)?;
                }
                Cat::InPlane(FA) => {
                    self.push_src_on_edge(f, e);
                    f = self.poly.buddy_face(f, &self.poly.edges[e as usize]);
                    self.mark(e);
                    c = self.cw_search(&mut f, &mut e);
                }
                Cat::TouchDown(_) | Cat::InPlane(FB) => {
                    if self.cur.is_none() {
                        // wait for an edge that starts the path properly
                        return Ok(());
                    }
                    self.mark(e);
                    c = self.cw_search(&mut f, &mut e);
                }
                Cat::UpTouch => {
                    if self.cur.is_none() {
                        let nx = self.poly.edge_next(f, &self.poly.edges[e as usize]);
                        let nd = self.poly.edge_dst(f, &self.poly.edges[nx as usize]);
                        if self.eps.le(self.poly.coord(nd).z, self.z) {
                            // grazing touch; another edge will start the path
                            return Ok(());
                        }
                    }
                    f = self.poly.buddy_face(f, &self.poly.edges[e as usize]);
                    c = self.cw_search(&mut f, &mut e);
                    if e != eo {
                        // same edge may come around again; mark only once
                        self.mark(eo);
                    }
                }
                Cat::InPlane(_) => {
                    c = self.edge_z_cat(f, e);
                }
            }
            if eo != e && e == e_start {
                debug_assert!(self.cur.is_some());
                trace!("slice path closed with {} points", self.points.len());
                return Ok(());
            }
        }
    }
}

/// Cut `poly` with the plane z = `z`.
///
/// Returns `None` when the plane misses the solid (or only grazes it).
pub fn slice_polyhedron(eps: &Eps, poly: &Polyhedron3, z: f64) -> Result<Option<Poly2>> {
    let mut c = Ctx {
        eps,
        poly,
        z,
        visited: vec![false; poly.edges.len()],
        points: Vec::new(),
        paths: Vec::new(),
        cur: None,
    };
    for e in 0..poly.edges.len() as u32 {
        if !c.visited[e as usize] {
            c.cur = None;
            c.find_path(e)?;
        }
    }
    if c.points.is_empty() {
        return Ok(None);
    }
    Ok(Some(Poly2 {
        points: c.points,
        paths: c.paths,
        tris: Vec::new(),
    }))
}

/// Cut the unit sphere under the affine map `mat` with the plane z = `z`,
/// emitting an `fn_`-gon approximation of the resulting ellipse.
///
/// Returns `None` when the plane misses the sphere or the cut circle
/// degenerates to (within ε of) a point.
pub fn slice_sphere(
    eps: &Eps,
    mat: &Aff3w,
    fn_: u32,
    loc: Loc,
    color: Color,
    z: f64,
) -> Option<Poly2> {
    // Map three points of the cutting plane into unit-sphere space and
    // recover the plane normal there.
    let sa = mat.i.apply(Vec3::new(1.0, 0.0, z));
    let sb = mat.i.apply(Vec3::new(0.0, 0.0, z));
    let sc = mat.i.apply(Vec3::new(0.0, 1.0, z));
    let sn = (sb - sa).cross(&(sc - sa));
    if eps.eq(sn.norm(), 0.0) {
        // degenerate map; emit nothing
        return None;
    }

    // Rotate so the mapped plane is horizontal again.
    let mq = Aff3w::rot_into_z(eps, sn)?;
    let sq = mq.n.apply(sb);

    // Distance of the plane from the sphere center decides the cut circle.
    let dist = sq.z.abs();
    if eps.ge(dist, 1.0) {
        return None;
    }
    let rad = (1.0 - dist * dist).sqrt();

    // unit circle -> cut circle -> plane height -> sphere space -> object space
    let mut mt = Aff3w::scale(rad, rad, 1.0);
    mt = Aff3w::xlat(0.0, 0.0, sq.z).mul(&mt);
    mt = mq.inv().mul(&mt);
    mt = mat.mul(&mt);
    let mt2 = Aff2::from_aff3w(&mt);

    let n = fn_.max(3);
    let mut r = Poly2::new();
    let mut path = Path::default();
    for i in 0..n {
        let a = 360.0 * f64::from(i) / f64::from(n);
        let coord = mt2.apply(Vec2::new(cos_deg(a), sin_deg(a)));
        path.point_idx.push(i);
        r.points.push(Vec2Loc { coord, loc, color });
    }
    if mt2.d < 0.0 {
        // mirrored map: restore positive orientation
        path.point_idx.reverse();
    }
    r.paths.push(path);
    Some(r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topo::cuboid;
    use nalgebra::vector;

    fn area(p: &Poly2) -> f64 {
        p.area()
    }

    #[test]
    fn cube_slice_is_unit_square() {
        let eps = Eps::default();
        let c = cuboid(&eps, vector![0.0, 0.0, 0.0], vector![1.0, 1.0, 1.0]).unwrap();
        let p = slice_polyhedron(&eps, &c, 0.5).unwrap().unwrap();
        assert_eq!(p.paths.len(), 1);
        assert_eq!(p.paths[0].len(), 4);
        for q in &p.points {
            assert!(q.coord.x == 0.0 || q.coord.x == 1.0);
            assert!(q.coord.y == 0.0 || q.coord.y == 1.0);
        }
        assert!((area(&p) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cube_slice_misses_above_and_below() {
        let eps = Eps::default();
        let c = cuboid(&eps, vector![0.0, 0.0, 0.0], vector![1.0, 1.0, 1.0]).unwrap();
        assert!(slice_polyhedron(&eps, &c, 2.0).unwrap().is_none());
        assert!(slice_polyhedron(&eps, &c, -1.0).unwrap().is_none());
    }

    #[test]
    fn cube_slice_at_tangent_face_emits_square() {
        let eps = Eps::default();
        let c = cuboid(&eps, vector![0.0, 0.0, 0.0], vector![1.0, 1.0, 1.0]).unwrap();
        // plane through the bottom face: solid extends upward, square emitted
        let p = slice_polyhedron(&eps, &c, 0.0).unwrap().unwrap();
        assert_eq!(p.paths.len(), 1);
        assert!((area(&p) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn pyramid_apex_tangent_emits_nothing() {
        let eps = Eps::default();
        let p = |x: f64, y: f64, z: f64| crate::topo::Vec3Loc::new(vector![x, y, z]);
        let points = vec![
            p(0.0, 0.0, 0.0),
            p(1.0, 0.0, 0.0),
            p(1.0, 1.0, 0.0),
            p(0.0, 1.0, 0.0),
            p(0.5, 0.5, 1.0),
        ];
        let faces = vec![
            vec![0, 1, 4],
            vec![1, 2, 4],
            vec![2, 3, 4],
            vec![3, 0, 4],
            vec![0, 3, 2, 1],
        ];
        let py = Polyhedron3::new(&eps, points, faces, Loc::NONE).unwrap();
        // plane exactly through the apex vertex
        assert!(slice_polyhedron(&eps, &py, 1.0).unwrap().is_none());
        // generic slice through the middle: a square of half side length
        let q = slice_polyhedron(&eps, &py, 0.5).unwrap().unwrap();
        assert!((area(&q) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn sphere_slices() {
        let eps = Eps::default();
        let m = Aff3w::identity();
        // equator of the unit sphere
        let p = slice_sphere(&eps, &m, 16, Loc::NONE, Color::default(), 0.0).unwrap();
        assert_eq!(p.paths[0].len(), 16);
        let rmax = p
            .points
            .iter()
            .map(|q| q.coord.norm())
            .fold(0.0f64, f64::max);
        assert!((rmax - 1.0).abs() < 1e-12);
        assert!(p.area() > 0.0);

        // plane above the sphere
        assert!(slice_sphere(&eps, &m, 16, Loc::NONE, Color::default(), 1.5).is_none());
        // grazing plane: radius within ε of zero -> empty output, no panic
        assert!(slice_sphere(&eps, &m, 16, Loc::NONE, Color::default(), 0.999_999_999).is_none());
    }

    #[test]
    fn scaled_sphere_slice_is_ellipse() {
        let eps = Eps::default();
        let m = Aff3w::scale(2.0, 1.0, 1.0);
        let p = slice_sphere(&eps, &m, 64, Loc::NONE, Color::default(), 0.0).unwrap();
        let xmax = p
            .points
            .iter()
            .map(|q| q.coord.x.abs())
            .fold(0.0f64, f64::max);
        let ymax = p
            .points
            .iter()
            .map(|q| q.coord.y.abs())
            .fold(0.0f64, f64::max);
        assert!((xmax - 2.0).abs() < 1e-9);
        assert!((ymax - 1.0).abs() < 1e-2); // 64-gon sampling
        assert!(p.area() > 0.0);
    }
}
