//! Polyhedron half-edge topology.
//!
//! A polyhedron arrives as a point pool plus faces given as CCW point-index
//! rings (outward normals). Construction converts that into an edge table
//! where every undirected edge appears exactly once and knows both incident
//! faces: `fore` traverses the edge src→dst on its boundary, `back`
//! traverses dst→src. An input for which this pairing fails is not a
//! 2-manifold and is rejected with the offending source locations.
//!
//! Layout is struct-of-arrays with integer handles; no pointer cycles. Each
//! edge also records its position inside both faces so the slicer can walk
//! face boundaries in O(1) per step.

use crate::err::{Error, Loc, Result};
use crate::geom::{Eps, Vec3};

/// A 3D input point with its diagnostic tag.
#[derive(Clone, Copy, Debug)]
pub struct Vec3Loc {
    pub coord: Vec3,
    pub loc: Loc,
}

impl Vec3Loc {
    pub fn new(coord: Vec3) -> Self {
        Self {
            coord,
            loc: Loc::NONE,
        }
    }
}

/// A face: CCW ring of point indices, and (after construction) the edge
/// handle for each boundary segment `points[j] -> points[j+1]`.
#[derive(Clone, Debug)]
pub struct Face {
    pub points: Vec<u32>,
    pub edges: Vec<u32>,
    pub loc: Loc,
}

/// An undirected edge with both incident faces.
///
/// `src < dst` (as indices); `fore` is the face whose boundary runs
/// src→dst, `back` the one running dst→src.
#[derive(Clone, Copy, Debug)]
pub struct Edge {
    pub src: u32,
    pub dst: u32,
    pub fore: u32,
    pub back: u32,
    /// Boundary position of this edge inside `fore`.
    pub fore_idx: u32,
    /// Boundary position of this edge inside `back`.
    pub back_idx: u32,
}

/// A 2-manifold polyhedron in half-edge form.
#[derive(Clone, Debug)]
pub struct Polyhedron3 {
    pub points: Vec<Vec3Loc>,
    pub faces: Vec<Face>,
    pub edges: Vec<Edge>,
}

impl Polyhedron3 {
    /// Build from points and CCW faces, checking 2-manifoldness.
    ///
    /// O(E log E): all directed edges are materialized, sorted by their
    /// undirected key, and paired. Every pairing failure names the edge's
    /// location and, for duplicates, the conflicting sibling.
    pub fn new(eps: &Eps, points: Vec<Vec3Loc>, faces: Vec<Vec<u32>>, loc: Loc) -> Result<Self> {
        if points.len() < 4 || faces.len() < 4 {
            return Err(Error::topology(
                loc,
                "polyhedron needs at least 4 points and 4 faces",
            ));
        }
        check_unique_points(eps, &points)?;

        let mut fs: Vec<Face> = Vec::with_capacity(faces.len());
        for f in faces {
            if f.len() < 3 {
                return Err(Error::topology(loc, "face with fewer than 3 vertices"));
            }
            for &pi in &f {
                if pi as usize >= points.len() {
                    return Err(Error::topology(loc, "face references unknown point"));
                }
            }
            let n = f.len();
            fs.push(Face {
                points: f,
                edges: vec![u32::MAX; n],
                loc,
            });
        }

        // One entry per directed edge: (undirected key, is_back, face, slot).
        struct Directed {
            lo: u32,
            hi: u32,
            back: bool,
            face: u32,
            slot: u32,
        }
        let mut dir: Vec<Directed> = Vec::new();
        for (fi, f) in fs.iter().enumerate() {
            let n = f.points.len();
            for j in 0..n {
                let a = f.points[j];
                let b = f.points[(j + 1) % n];
                if a == b {
                    return Err(Error::topology(
                        points[a as usize].loc,
                        "face repeats a vertex on consecutive positions",
                    ));
                }
                dir.push(Directed {
                    lo: a.min(b),
                    hi: a.max(b),
                    back: a > b,
                    face: fi as u32,
                    slot: j as u32,
                });
            }
        }
        dir.sort_by_key(|d| (d.lo, d.hi, d.back));

        let mut edges: Vec<Edge> = Vec::with_capacity(dir.len() / 2);
        let mut i = 0;
        while i < dir.len() {
            let a = &dir[i];
            if i + 1 >= dir.len() || dir[i + 1].lo != a.lo || dir[i + 1].hi != a.hi {
                return Err(Error::topology(
                    points[a.lo as usize].loc,
                    "edge has no adjacent reverse edge in polyhedron",
                ));
            }
            let b = &dir[i + 1];
            if a.back == b.back {
                return Err(Error::topology2(
                    points[a.lo as usize].loc,
                    points[b.lo as usize].loc,
                    "identical edge occurs more than once in polyhedron",
                ));
            }
            if i + 2 < dir.len() && dir[i + 2].lo == a.lo && dir[i + 2].hi == a.hi {
                return Err(Error::topology2(
                    points[a.lo as usize].loc,
                    points[dir[i + 2].lo as usize].loc,
                    "edge occurs multiple times in polyhedron",
                ));
            }
            // a is the fore entry (sorted back=false first)
            debug_assert!(!a.back && b.back);
            let e = edges.len() as u32;
            edges.push(Edge {
                src: a.lo,
                dst: a.hi,
                fore: a.face,
                back: b.face,
                fore_idx: a.slot,
                back_idx: b.slot,
            });
            fs[a.face as usize].edges[a.slot as usize] = e;
            fs[b.face as usize].edges[b.slot as usize] = e;
            i += 2;
        }

        Ok(Self {
            points,
            faces: fs,
            edges,
        })
    }

    /// Is `f` the back face of `e`?
    #[inline]
    pub fn edge_is_back(&self, f: u32, e: &Edge) -> bool {
        e.back == f
    }

    /// The other face incident to `e`.
    #[inline]
    pub fn buddy_face(&self, f: u32, e: &Edge) -> u32 {
        if e.fore == f {
            e.back
        } else {
            e.fore
        }
    }

    /// Source point of `e` in the traversal direction of face `f`.
    #[inline]
    pub fn edge_src(&self, f: u32, e: &Edge) -> u32 {
        if self.edge_is_back(f, e) {
            e.dst
        } else {
            e.src
        }
    }

    /// Destination point of `e` in the traversal direction of face `f`.
    #[inline]
    pub fn edge_dst(&self, f: u32, e: &Edge) -> u32 {
        if self.edge_is_back(f, e) {
            e.src
        } else {
            e.dst
        }
    }

    /// Boundary position of `e` inside face `f`.
    #[inline]
    pub fn edge_idx(&self, f: u32, e: &Edge) -> usize {
        if self.edge_is_back(f, e) {
            e.back_idx as usize
        } else {
            e.fore_idx as usize
        }
    }

    /// Successor of `e` along the boundary of `f`.
    #[inline]
    pub fn edge_next(&self, f: u32, e: &Edge) -> u32 {
        let face = &self.faces[f as usize];
        let i = (self.edge_idx(f, e) + 1) % face.edges.len();
        face.edges[i]
    }

    /// Predecessor of `e` along the boundary of `f`.
    #[inline]
    pub fn edge_prev(&self, f: u32, e: &Edge) -> u32 {
        let face = &self.faces[f as usize];
        let n = face.edges.len();
        let i = (self.edge_idx(f, e) + n - 1) % n;
        face.edges[i]
    }

    #[inline]
    pub fn coord(&self, p: u32) -> Vec3 {
        self.points[p as usize].coord
    }
}

/// Reject ε-duplicate 3D input coordinates.
fn check_unique_points(eps: &Eps, points: &[Vec3Loc]) -> Result<()> {
    let mut idx: Vec<u32> = (0..points.len() as u32).collect();
    idx.sort_by(|&a, &b| {
        let (a, b) = (points[a as usize].coord, points[b as usize].coord);
        a.x.total_cmp(&b.x)
            .then(a.y.total_cmp(&b.y))
            .then(a.z.total_cmp(&b.z))
    });
    for w in idx.windows(2) {
        let a = &points[w[0] as usize];
        let b = &points[w[1] as usize];
        if eps.eq(a.coord.x, b.coord.x)
            && eps.eq(a.coord.y, b.coord.y)
            && eps.eq(a.coord.z, b.coord.z)
        {
            return Err(Error::topology2(
                b.loc,
                a.loc,
                "duplicate point coordinates in polyhedron",
            ));
        }
    }
    Ok(())
}

/// Axis-aligned cuboid `[x0,x1] × [y0,y1] × [z0,z1]` (test/demo helper).
pub fn cuboid(eps: &Eps, min: Vec3, max: Vec3) -> Result<Polyhedron3> {
    let p = |x: f64, y: f64, z: f64| Vec3Loc::new(Vec3::new(x, y, z));
    let points = vec![
        p(min.x, min.y, min.z), // 0
        p(max.x, min.y, min.z), // 1
        p(max.x, max.y, min.z), // 2
        p(min.x, max.y, min.z), // 3
        p(min.x, min.y, max.z), // 4
        p(max.x, min.y, max.z), // 5
        p(max.x, max.y, max.z), // 6
        p(min.x, max.y, max.z), // 7
    ];
    // CCW as seen from outside.
    let faces = vec![
        vec![0, 3, 2, 1], // bottom (z = min)
        vec![4, 5, 6, 7], // top (z = max)
        vec![0, 1, 5, 4], // front (y = min)
        vec![2, 3, 7, 6], // rear (y = max)
        vec![1, 2, 6, 5], // right (x = max)
        vec![3, 0, 4, 7], // left (x = min)
    ];
    Polyhedron3::new(eps, points, faces, Loc::NONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::vector;

    #[test]
    fn cube_pairs_all_edges() {
        let eps = Eps::default();
        let c = cuboid(&eps, vector![0.0, 0.0, 0.0], vector![1.0, 1.0, 1.0]).unwrap();
        assert_eq!(c.edges.len(), 12);
        for (ei, e) in c.edges.iter().enumerate() {
            assert!(e.src < e.dst);
            assert_ne!(e.fore, e.back);
            // both faces index this edge at the recorded slot
            assert_eq!(c.faces[e.fore as usize].edges[e.fore_idx as usize], ei as u32);
            assert_eq!(c.faces[e.back as usize].edges[e.back_idx as usize], ei as u32);
        }
        // next/prev are inverse along every face boundary
        for (fi, f) in c.faces.iter().enumerate() {
            for &eid in &f.edges {
                let e = &c.edges[eid as usize];
                let nx = c.edge_next(fi as u32, e);
                let back = c.edge_prev(fi as u32, &c.edges[nx as usize]);
                assert_eq!(back, eid);
            }
        }
    }

    #[test]
    fn open_box_is_rejected() {
        let eps = Eps::default();
        let p = |x: f64, y: f64, z: f64| Vec3Loc::new(vector![x, y, z]);
        let points = vec![
            p(0.0, 0.0, 0.0),
            p(1.0, 0.0, 0.0),
            p(1.0, 1.0, 0.0),
            p(0.0, 1.0, 0.0),
            p(0.5, 0.5, 1.0),
        ];
        // pyramid missing its base: edges of the rim are unpaired
        let faces = vec![vec![0, 1, 4], vec![1, 2, 4], vec![2, 3, 4], vec![3, 0, 4]];
        let r = Polyhedron3::new(&eps, points.clone(), faces, Loc::NONE);
        assert!(matches!(r, Err(Error::Topology { .. })));

        // closed pyramid passes
        let faces = vec![
            vec![0, 1, 4],
            vec![1, 2, 4],
            vec![2, 3, 4],
            vec![3, 0, 4],
            vec![0, 3, 2, 1],
        ];
        assert!(Polyhedron3::new(&eps, points, faces, Loc::NONE).is_ok());
    }

    #[test]
    fn duplicate_points_are_rejected() {
        let eps = Eps::default();
        let p = |x: f64, y: f64, z: f64| Vec3Loc::new(vector![x, y, z]);
        let points = vec![
            p(0.0, 0.0, 0.0),
            p(1.0, 0.0, 0.0),
            p(1.0, 1.0, 0.0),
            p(0.0, 0.0, 1e-9), // ε-duplicate of point 0
        ];
        let faces = vec![vec![0, 1, 2], vec![0, 2, 3], vec![0, 3, 1], vec![1, 3, 2]];
        let r = Polyhedron3::new(&eps, points, faces, Loc::NONE);
        assert!(matches!(r, Err(Error::Topology { loc2: Some(_), .. })));
    }

    #[test]
    fn doubled_face_is_rejected() {
        let eps = Eps::default();
        let c = |x: f64, y: f64, z: f64| Vec3Loc::new(vector![x, y, z]);
        let points = vec![
            c(0.0, 0.0, 0.0),
            c(1.0, 0.0, 0.0),
            c(1.0, 1.0, 0.0),
            c(0.5, 0.5, 1.0),
        ];
        // one face listed twice with the same winding
        let faces = vec![
            vec![0, 1, 2],
            vec![0, 1, 2],
            vec![0, 2, 3],
            vec![0, 3, 1],
            vec![1, 3, 2],
        ];
        let r = Polyhedron3::new(&eps, points, faces, Loc::NONE);
        assert!(matches!(r, Err(Error::Topology { .. })));
    }
}
