//! Plane-sweep triangulation of polygon sets with holes.
//!
//! Fast Triangulation in the style of Hertel & Mehlhorn (1983), O(n log n):
//! vertices are processed in lexicographic order and classified START, BEND
//! or END against their two path neighbours. The sweep status holds the
//! active edges ordered by y; between each BOT/TOP edge pair lies the
//! pending "funnel" of that region: a reflex chain of already-seen vertices
//! kept in arena-allocated doubly-linked cells. Every transition appends a
//! vertex to one or two funnels and clips off all ears that become convex.
//!
//! An improper start (a valley opening inside a region, e.g. the left
//! vertex of a hole) splits the funnel around its most recent vertex, which
//! then lives in two chains at once; that is why chains are standalone
//! cells rather than intrusive links. An improper end merges two funnels.
//!
//! Triangles are emitted with positive signed area, matching the path
//! orientation convention of the boolean engine, so no re-orientation is
//! needed downstream.
//!
//! Input paths must be non-self-intersecting with unique vertices per
//! coordinate; a duplicate point is a fatal error naming the location (the
//! boolean engine guarantees uniqueness, so hitting it means an upstream
//! bug).

use std::cmp::Ordering;

use log::trace;

use crate::dict;
use crate::err::{Error, Result};
use crate::geom::{lerp, lex_cmp, orient, t01, Eps, Vec2};
use crate::poly::Poly2;

const NONE: u32 = u32::MAX;

/// Vertex classification; variants ordered by processing order at equal
/// coordinates (regions must close before new ones open).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Case {
    End,
    Bend,
    Start,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Ty {
    Inactive,
    /// Region lies above this edge.
    Bot,
    /// Region lies below this edge.
    Top,
}

/// A path vertex. The out-edge of node `i` is edge `i` (to `next`); its
/// in-edge is edge `prev`.
struct Node {
    coord: Vec2,
    /// Index into the polygon's point pool (shared by coincident vertices
    /// of joined rings).
    pt: u32,
    prev: u32,
    next: u32,
}

#[inline]
fn coord_of(nodes: &[Node], n: u32) -> Vec2 {
    nodes[n as usize].coord
}

/// Edge endpoints ordered left/right in lex order.
fn left_right(nodes: &[Node], e: u32) -> (u32, u32) {
    let s = e;
    let d = nodes[e as usize].next;
    if lex_cmp(coord_of(nodes, s), coord_of(nodes, d)) != Ordering::Greater {
        (s, d)
    } else {
        (d, s)
    }
}

fn pt_case(nodes: &[Node], n: u32) -> Case {
    let c = coord_of(nodes, n);
    let is = lex_cmp(c, coord_of(nodes, nodes[n as usize].prev));
    let id = lex_cmp(c, coord_of(nodes, nodes[n as usize].next));
    debug_assert_ne!(is, Ordering::Equal);
    debug_assert_ne!(id, Ordering::Equal);
    if is != id {
        Case::Bend
    } else if is == Ordering::Less {
        Case::Start
    } else {
        Case::End
    }
}

/// Processing order of vertices. `Equal` only for unresolvable (duplicate)
/// vertices, which the driver rejects.
///
/// Coincident coordinates of distinct path corners are ordered so regions
/// close before new ones open: ends before bends before starts, inner ends
/// before outer ends, outer starts before inner starts.
fn cmp_nx(eps: &Eps, nodes: &[Node], a: u32, b: u32) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let c = lex_cmp(coord_of(nodes, a), coord_of(nodes, b));
    if c != Ordering::Equal {
        return c;
    }
    let ca = pt_case(nodes, a);
    let cb = pt_case(nodes, b);
    if ca != cb {
        return ca.cmp(&cb);
    }
    if ca == Case::Bend {
        // coincident bends cannot be nested wedges; broken input
        return Ordering::Equal;
    }
    // Both START or both END at one coordinate: the paths do not cross, so
    // one wedge nests inside the other or they stack vertically.
    let rnz = |x: u32, y: u32, z: u32| -> i32 {
        -orient(eps, coord_of(nodes, x), coord_of(nodes, y), coord_of(nodes, z))
    };
    let top_bottom = |n: u32| -> (u32, u32) {
        let u = nodes[n as usize].prev;
        let v = nodes[n as usize].next;
        if coord_of(nodes, u).y < coord_of(nodes, v).y {
            (v, u)
        } else {
            (u, v)
        }
    };
    let (at, ab) = top_bottom(a);
    let (bt, bb) = top_bottom(b);
    let at_x_bt = rnz(at, a, bt);
    let ab_x_bt = rnz(ab, a, bt);
    let at_x_bb = rnz(at, a, bb);
    if at_x_bt == 0 || ab_x_bt == 0 || at_x_bb == 0 {
        // collinear wedge arms: unresolvable, treat as duplicate
        return Ordering::Equal;
    }
    let ord = |v: i32| {
        if v < 0 {
            Ordering::Less
        } else {
            Ordering::Greater
        }
    };
    if at_x_bt != ab_x_bt {
        // b's wedge is inside a's
        return ord(at_x_bt);
    }
    if at_x_bt != at_x_bb {
        // a's wedge is inside b's
        return ord(at_x_bt);
    }
    // one wedge entirely above the other
    if ca == Case::End {
        ord(at_x_bt)
    } else {
        ord(-at_x_bt)
    }
}

/// Probe node `p` against active edge `e`: Less = below, Greater = above.
///
/// A probe equal to the edge's left endpoint (same pool point) is resolved
/// by the probe's in-edge direction. Equal to the right endpoint cannot
/// happen: that edge's end is processed before any start at the point.
fn cmp_ey(eps: &Eps, nodes: &[Node], p: u32, e: u32) -> Ordering {
    let (nl, nr) = left_right(nodes, e);
    let pc = coord_of(nodes, p);
    let l = coord_of(nodes, nl);
    let r = coord_of(nodes, nr);
    if nodes[p as usize].pt == nodes[nl as usize].pt {
        let z = -orient(eps, r, l, coord_of(nodes, nodes[p as usize].prev));
        return z.cmp(&0);
    }
    debug_assert_ne!(nodes[p as usize].pt, nodes[nr as usize].pt);
    debug_assert!(eps.le(l.x, pc.x) && eps.le(pc.x, r.x));
    if eps.eq(l.x, r.x) {
        // vertical edge: p lies beyond one of its ends
        return if pc.y < l.y {
            Ordering::Less
        } else {
            Ordering::Greater
        };
    }
    let mut t = t01(l.x, pc.x, r.x);
    if eps.eq(t, 0.0) {
        t = 0.0;
    }
    if eps.eq(t, 1.0) {
        t = 1.0;
    }
    let y = lerp(l.y, r.y, t);
    debug_assert!(!eps.eq(pc.y, y), "probe on edge interior");
    if pc.y < y {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

/// Sweep-time state of one edge.
struct EdgeState {
    ty: Ty,
    node_s: Option<dict::NodeId>,
    /// Funnel cell at this edge's end of its region chain.
    end_cell: u32,
    /// Most recently appended funnel cell of this edge's region (shared
    /// with the partner edge).
    rm: u32,
}

/// Doubly-linked funnel cell; `next` walks bottom to top, `NONE` ends.
struct Cell {
    prev: u32,
    next: u32,
    node: u32,
}

enum Found {
    Start { below: Option<u32>, above: Option<u32> },
    Bend { active: u32, fresh: u32 },
    End { s: u32, t: u32 },
}

struct Tri<'a> {
    eps: &'a Eps,
    nodes: Vec<Node>,
    edges: Vec<EdgeState>,
    cells: Vec<Cell>,
    ey: dict::Map,
    tris: Vec<[u32; 3]>,
}

impl<'a> Tri<'a> {
    #[inline]
    fn coord(&self, n: u32) -> Vec2 {
        coord_of(&self.nodes, n)
    }

    fn internal(&self, n: u32, msg: &str) -> Error {
        Error::topology(
            crate::err::Loc::NONE,
            format!("triangulation invariant broken at ({}, {}): {}",
                self.coord(n).x, self.coord(n).y, msg),
        )
    }

    fn cell_new(&mut self, node: u32) -> u32 {
        self.cells.push(Cell {
            prev: NONE,
            next: NONE,
            node,
        });
        (self.cells.len() - 1) as u32
    }

    fn cell_unlink(&mut self, c: u32) {
        let (p, n) = (self.cells[c as usize].prev, self.cells[c as usize].next);
        if p != NONE {
            self.cells[p as usize].next = n;
        }
        if n != NONE {
            self.cells[n as usize].prev = p;
        }
        self.cells[c as usize].prev = NONE;
        self.cells[c as usize].next = NONE;
    }

    /// Make `cell` the new top end after `end`.
    fn link_above(&mut self, end: u32, cell: u32) {
        debug_assert_eq!(self.cells[end as usize].next, NONE);
        self.cells[end as usize].next = cell;
        self.cells[cell as usize].prev = end;
    }

    /// Make `cell` the new bottom end before `end`.
    fn link_below(&mut self, end: u32, cell: u32) {
        debug_assert_eq!(self.cells[end as usize].prev, NONE);
        self.cells[end as usize].prev = cell;
        self.cells[cell as usize].next = end;
    }

    fn emit(&mut self, a: u32, b: u32, c: u32) {
        self.tris.push([
            self.nodes[a as usize].pt,
            self.nodes[b as usize].pt,
            self.nodes[c as usize].pt,
        ]);
    }

    /// Clip ears of a funnel after a vertex cell was appended at one end.
    ///
    /// Emits a fan anchored at the new vertex while the adjacent funnel
    /// vertex is convex; collapsed a-b-a spurs (same pool point two cells
    /// apart) are removed without emitting.
    fn chain_tri(&mut self, e_cell: u32, from_top: bool) {
        let step = |cells: &Vec<Cell>, c: u32| {
            if from_top {
                cells[c as usize].prev
            } else {
                cells[c as usize].next
            }
        };
        let e = e_cell;
        let mut q = step(&self.cells, e);
        if q == NONE {
            return;
        }
        let mut del = 0u32;
        loop {
            let w = step(&self.cells, q);
            if w == NONE {
                return;
            }
            let (ne, nq, nw) = (
                self.cells[e as usize].node,
                self.cells[q as usize].node,
                self.cells[w as usize].node,
            );
            if self.nodes[nw as usize].pt == self.nodes[ne as usize].pt {
                // collapsed spur: drop the next two cells silently
                del = 2;
            }
            if del > 0 {
                del -= 1;
            } else {
                let (pe, pq, pw) = (self.coord(ne), self.coord(nq), self.coord(nw));
                let d1 = pq - pe;
                let d2 = pw - pq;
                let z = d1.x * d2.y - d1.y * d2.x;
                let convex = if from_top {
                    self.eps.gt(z, 0.0)
                } else {
                    self.eps.lt(z, 0.0)
                };
                if !convex {
                    return;
                }
                if from_top {
                    self.emit(ne, nq, nw);
                } else {
                    self.emit(nq, ne, nw);
                }
            }
            self.cell_unlink(q);
            q = w;
        }
    }

    fn s_insert(&mut self, e: u32, p: u32, low_sibling: Option<u32>) {
        debug_assert!(self.edges[e as usize].node_s.is_none());
        let eps = self.eps;
        let Tri { ey, nodes, .. } = self;
        let node = ey.insert_with(e, |o| {
            if Some(o) == low_sibling {
                // second edge of a wedge sits directly above the first
                Ordering::Greater
            } else {
                cmp_ey(eps, nodes, p, o)
            }
        });
        self.edges[e as usize].node_s = Some(node);
    }

    fn s_remove(&mut self, e: u32) {
        debug_assert!(self.edges[e as usize].node_s.is_some());
        if let Some(n) = self.edges[e as usize].node_s.take() {
            self.ey.remove(n);
        }
        self.edges[e as usize].ty = Ty::Inactive;
        self.edges[e as usize].end_cell = NONE;
        self.edges[e as usize].rm = NONE;
    }

    fn s_above(&self, e: u32) -> Option<u32> {
        let n = self.edges[e as usize].node_s?;
        self.ey.next(n).map(|m| self.ey.item(m))
    }

    fn s_below(&self, e: u32) -> Option<u32> {
        let n = self.edges[e as usize].node_s?;
        self.ey.prev(n).map(|m| self.ey.item(m))
    }

    /// Locate `p` in the sweep: which of its edges are already active, or
    /// between which active edges it starts.
    fn find(&self, p: u32) -> Found {
        let ein = self.nodes[p as usize].prev;
        let eout = p;
        let (e1, e2) = if self.edges[ein as usize].node_s.is_some() {
            (ein, eout)
        } else if self.edges[eout as usize].node_s.is_some() {
            (eout, ein)
        } else {
            let eps = self.eps;
            let Tri { ey, nodes, .. } = self;
            let (below, above) = ey.find_neighbours(|o| cmp_ey(eps, nodes, p, o));
            return Found::Start {
                below: below.map(|n| ey.item(n)),
                above: above.map(|n| ey.item(n)),
            };
        };
        if self.edges[e2 as usize].node_s.is_none() {
            return Found::Bend {
                active: e1,
                fresh: e2,
            };
        }
        // both end here: the one whose left endpoint lies above is the top
        let (l1, _) = left_right(&self.nodes, e1);
        let (l2, _) = left_right(&self.nodes, e2);
        let z = -orient(self.eps, self.coord(l1), self.coord(p), self.coord(l2));
        debug_assert_ne!(z, 0, "collinear edges at an end vertex");
        if z > 0 {
            Found::End { s: e1, t: e2 }
        } else {
            Found::End { s: e2, t: e1 }
        }
    }

    /// Order the two fresh edges of a start vertex: `l` lower, `h` upper.
    fn start_lh(&self, p: u32) -> (u32, u32) {
        let h = p; // out-edge
        let l = self.nodes[p as usize].prev; // in-edge
        let z = -orient(
            self.eps,
            self.coord(self.nodes[p as usize].prev),
            self.coord(p),
            self.coord(self.nodes[p as usize].next),
        );
        debug_assert_ne!(z, 0, "degenerate wedge");
        if z < 0 {
            (h, l)
        } else {
            (l, h)
        }
    }

    /// A valley opens in free space: activate both edges with a fresh
    /// one-vertex funnel.
    fn proper_start(&mut self, p: u32) {
        trace!("proper start");
        let (l, h) = self.start_lh(p);
        self.edges[l as usize].ty = Ty::Bot;
        self.edges[h as usize].ty = Ty::Top;
        self.s_insert(l, p, None);
        self.s_insert(h, p, Some(l));
        let cell = self.cell_new(p);
        for e in [l, h] {
            self.edges[e as usize].end_cell = cell;
            self.edges[e as usize].rm = cell;
        }
    }

    /// One edge continues into another: swap it in place and extend the
    /// funnel on its side.
    fn bend(&mut self, p: u32, s: u32, t: u32) -> Result<()> {
        trace!("bend");
        let ty = self.edges[s as usize].ty;
        debug_assert_ne!(ty, Ty::Inactive);
        let Some(node) = self.edges[s as usize].node_s.take() else {
            return Err(self.internal(p, "bend on inactive edge"));
        };
        self.ey.replace_item(node, t);
        self.edges[t as usize].node_s = Some(node);
        self.edges[t as usize].ty = ty;
        let end = self.edges[s as usize].end_cell;
        self.edges[s as usize].ty = Ty::Inactive;
        self.edges[s as usize].end_cell = NONE;
        self.edges[s as usize].rm = NONE;

        let lp = self.cell_new(p);
        self.edges[t as usize].end_cell = lp;
        self.edges[t as usize].rm = lp;
        match ty {
            Ty::Top => {
                self.link_above(end, lp);
                let partner = self
                    .s_below(t)
                    .ok_or_else(|| self.internal(p, "top edge without partner"))?;
                self.edges[partner as usize].rm = lp;
                self.chain_tri(lp, true);
            }
            Ty::Bot => {
                self.link_below(end, lp);
                let partner = self
                    .s_above(t)
                    .ok_or_else(|| self.internal(p, "bottom edge without partner"))?;
                self.edges[partner as usize].rm = lp;
                self.chain_tri(lp, false);
            }
            Ty::Inactive => unreachable!(),
        }
        Ok(())
    }

    /// A region closes: fan out the remaining funnel and drop the pair.
    fn proper_end(&mut self, p: u32, s: u32, t: u32) {
        trace!("proper end");
        debug_assert_eq!(self.edges[s as usize].ty, Ty::Top);
        debug_assert_eq!(self.edges[t as usize].ty, Ty::Bot);
        let lp = self.cell_new(p);
        self.link_above(self.edges[s as usize].end_cell, lp);
        self.chain_tri(lp, true);
        self.s_remove(s);
        self.s_remove(t);
    }

    /// A valley opens inside a region: split its funnel around the most
    /// recent vertex into a lower and an upper region.
    fn improper_start(&mut self, p: u32, s: u32, t: u32) -> Result<()> {
        trace!("improper start");
        debug_assert_eq!(self.edges[s as usize].ty, Ty::Top);
        debug_assert_eq!(self.edges[t as usize].ty, Ty::Bot);
        let (l, h) = self.start_lh(p);
        // l tops the lower region, h bottoms the upper region
        self.edges[l as usize].ty = Ty::Top;
        self.edges[h as usize].ty = Ty::Bot;
        self.s_insert(l, p, None);
        self.s_insert(h, p, Some(l));

        let rm = self.edges[s as usize].rm;
        if rm == NONE || rm != self.edges[t as usize].rm {
            return Err(self.internal(p, "split without shared funnel vertex"));
        }
        let rmn = self.cells[rm as usize].node;
        let same = self.nodes[p as usize].pt == self.nodes[rmn as usize].pt;

        // split: [bottom .. rm-copy] | [rm .. top]
        let below_rm = self.cells[rm as usize].prev;
        if below_rm != NONE {
            self.cells[below_rm as usize].next = NONE;
        }
        self.cells[rm as usize].prev = NONE;
        let rml = self.cell_new(rmn);
        if below_rm != NONE {
            self.link_above(below_rm, rml);
        }
        if self.edges[t as usize].end_cell == rm {
            self.edges[t as usize].end_cell = rml;
        }

        let (upper_p, lower_p) = if same {
            (rm, rml)
        } else {
            let lph = self.cell_new(p);
            self.link_below(rm, lph);
            let lpl = self.cell_new(p);
            self.link_above(rml, lpl);
            (lph, lpl)
        };

        self.edges[h as usize].end_cell = upper_p;
        self.edges[h as usize].rm = upper_p;
        self.edges[s as usize].rm = upper_p;
        self.edges[l as usize].end_cell = lower_p;
        self.edges[l as usize].rm = lower_p;
        self.edges[t as usize].rm = lower_p;

        self.chain_tri(upper_p, false);
        self.chain_tri(lower_p, true);
        Ok(())
    }

    /// A vertex joins two regions: close both funnels against it and merge
    /// the remains into one region.
    fn improper_end(&mut self, p: u32, s: u32, t: u32) -> Result<()> {
        trace!("improper end");
        debug_assert_eq!(self.edges[s as usize].ty, Ty::Bot);
        debug_assert_eq!(self.edges[t as usize].ty, Ty::Top);
        let l = self
            .s_below(t)
            .ok_or_else(|| self.internal(p, "merge without lower region"))?;
        let h = self
            .s_above(s)
            .ok_or_else(|| self.internal(p, "merge without upper region"))?;

        let lp = self.cell_new(p);
        // close the upper funnel from its bottom end
        self.link_below(self.edges[s as usize].end_cell, lp);
        self.chain_tri(lp, false);
        let upper_bottom = self.cells[lp as usize].next;
        self.cell_unlink(lp);
        // close the lower funnel from its top end
        self.link_above(self.edges[t as usize].end_cell, lp);
        self.chain_tri(lp, true);
        // splice the remains: lower .. p .. upper
        debug_assert_ne!(upper_bottom, NONE);
        self.cells[lp as usize].next = upper_bottom;
        self.cells[upper_bottom as usize].prev = lp;

        self.edges[l as usize].rm = lp;
        self.edges[h as usize].rm = lp;
        self.s_remove(s);
        self.s_remove(t);
        Ok(())
    }

    fn transition(&mut self, p: u32) -> Result<()> {
        match self.find(p) {
            Found::Start {
                below,
                above: Some(s),
            } if self.edges[s as usize].ty == Ty::Top => {
                let t = below.ok_or_else(|| self.internal(p, "start inside without floor"))?;
                self.improper_start(p, s, t)
            }
            Found::Start { .. } => {
                self.proper_start(p);
                Ok(())
            }
            Found::Bend { active, fresh } => self.bend(p, active, fresh),
            Found::End { s, t } => {
                if self.edges[s as usize].ty == Ty::Top {
                    self.proper_end(p, s, t);
                    Ok(())
                } else {
                    self.improper_end(p, s, t)
                }
            }
        }
    }
}

/// Triangulate `poly`'s paths into `poly.tris`.
///
/// All paths must be non-self-intersecting and mutually non-crossing (the
/// boolean engine's output contract); holes are recognized by containment,
/// not by orientation.
pub fn triangulate(eps: &Eps, poly: &mut Poly2) -> Result<()> {
    poly.tris.clear();
    let mut nodes: Vec<Node> = Vec::new();
    for path in &poly.paths {
        let n = path.len();
        if n < 3 {
            continue;
        }
        let base = nodes.len() as u32;
        for j in 0..n {
            let pi = path.point_idx[j];
            nodes.push(Node {
                coord: poly.points[pi as usize].coord,
                pt: pi,
                prev: base + ((j + n - 1) % n) as u32,
                next: base + ((j + 1) % n) as u32,
            });
        }
    }
    if nodes.is_empty() {
        return Ok(());
    }

    let mut order: Vec<u32> = (0..nodes.len() as u32).collect();
    order.sort_by(|&a, &b| cmp_nx(eps, &nodes, a, b));
    for w in order.windows(2) {
        if cmp_nx(eps, &nodes, w[0], w[1]) == Ordering::Equal {
            let pi = nodes[w[0] as usize].pt;
            return Err(Error::topology(
                poly.points[pi as usize].loc,
                "duplicate point in polygon path",
            ));
        }
    }

    let n_edges = nodes.len();
    let mut t = Tri {
        eps,
        nodes,
        edges: (0..n_edges)
            .map(|_| EdgeState {
                ty: Ty::Inactive,
                node_s: None,
                end_cell: NONE,
                rm: NONE,
            })
            .collect(),
        cells: Vec::with_capacity(2 * n_edges),
        ey: dict::Map::new(),
        tris: Vec::new(),
    };
    for &p in &order {
        t.transition(p)?;
    }
    poly.tris = t.tris;
    Ok(())
}
