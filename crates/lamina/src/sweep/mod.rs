//! k-ary 2D polygon boolean engine (Bentley–Ottmann plane sweep).
//!
//! Computes any boolean combination of up to `MAX_LAZY` input polygons in a
//! single left-to-right sweep. The combination is a truth table over the
//! per-polygon inside-bits; each edge carries an `owner` mask (which inputs
//! it bounds, XOR-accumulated so self-overlap cancels) and a `below` mask
//! (which inputs are inside just below it). `above = below ^ owner`, so an
//! edge is an output edge exactly when the truth table flips across it.
//!
//! Hardening against floating point follows three rules: all coordinates
//! are rasterized onto the `Eps::pt` grid and deduplicated in a point
//! dictionary; intersections are computed from the cached original line
//! forms, not from split endpoints; and when rounding moves an intersection
//! onto an already-processed endpoint, the affected edges are pulled out of
//! the status and requeued rather than patched in place.
//!
//! Output edges are reassembled into closed, non-self-intersecting paths
//! (possibly with holes) by `chain`; see there for orientation rules.
//!
//! Runtime O((n+s) log(n+s)), space O(n+s) for n input edges and s
//! intersections.

mod chain;
mod event;
#[cfg(test)]
mod tests;

use std::collections::BTreeMap;

use log::trace;

use crate::bitmap::{BoolBitmap, MAX_LAZY};
use crate::dict;
use crate::err::{Error, Loc, Result};
use crate::geom::{Eps, Vec2};
use crate::poly::{Color, Poly2, Vec2Loc};

use event::{
    dim_between, ev4_overlap, ev_cmp, intersection_point, pt_cmp, seg_cmp, set_slope, Ev, Pt,
    NONE,
};

/// Total-order key for the point dictionary (coordinates are rasterized,
/// finite, and never negative zero, so `total_cmp` is a plain lex order).
struct PtKey(f64, f64);

impl PtKey {
    fn new(c: Vec2) -> Self {
        PtKey(c.x, c.y)
    }
}

impl PartialEq for PtKey {
    fn eq(&self, o: &Self) -> bool {
        self.cmp(o) == std::cmp::Ordering::Equal
    }
}

impl Eq for PtKey {}

impl Ord for PtKey {
    fn cmp(&self, o: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&o.0).then(self.1.total_cmp(&o.1))
    }
}

impl PartialOrd for PtKey {
    fn partial_cmp(&self, o: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(o))
    }
}

pub(crate) struct Sweep<'a> {
    eps: &'a Eps,
    pts: Vec<Pt>,
    evs: Vec<Ev>,
    by_coord: BTreeMap<PtKey, u32>,
    q: dict::Map,
    s: dict::Map,
    /// Output edge endpoints, paired and walked by `chain` after the sweep.
    end: Vec<u32>,
    comb: BoolBitmap,
    comb_size: usize,
    all_points: bool,
    flatten: bool,
}

impl<'a> Sweep<'a> {
    fn new(eps: &'a Eps, comb: BoolBitmap, size: usize, flatten: bool, all_points: bool) -> Self {
        Self {
            eps,
            pts: Vec::new(),
            evs: Vec::new(),
            by_coord: BTreeMap::new(),
            q: dict::Map::new(),
            s: dict::Map::new(),
            end: Vec::new(),
            comb,
            comb_size: 1 << size,
            all_points,
            flatten,
        }
    }

    /// Find or create the unique point for a (raw) coordinate.
    fn pt_new(&mut self, raw: Vec2, loc: Loc, color: Color) -> u32 {
        let coord = Vec2::new(self.eps.rasterize(raw.x), self.eps.rasterize(raw.y));
        let key = PtKey::new(coord);
        if let Some(&p) = self.by_coord.get(&key) {
            return p;
        }
        let p = self.pts.len() as u32;
        self.pts.push(Pt {
            coord,
            loc,
            color,
            point_idx: NONE,
            path_cnt: 0,
            face_idx: NONE,
            next: NONE,
        });
        self.by_coord.insert(key, p);
        p
    }

    fn ev_new(&mut self, loc: Loc, p: u32, left: bool, other: u32) -> u32 {
        let e = self.evs.len() as u32;
        self.evs.push(Ev {
            p,
            other,
            left,
            loc,
            owner: 0,
            below: 0,
            line: Default::default(),
            node_q: None,
            node_s: None,
            ring: NONE,
            used: false,
        });
        e
    }

    #[inline]
    fn q_contains(&self, e: u32) -> bool {
        self.evs[e as usize].node_q.is_some()
    }

    #[inline]
    fn s_contains(&self, e: u32) -> bool {
        self.evs[e as usize].node_s.is_some()
    }

    fn q_insert(&mut self, e: u32) {
        debug_assert!(!self.q_contains(e));
        {
            let ev = &self.evs[e as usize];
            let po = self.evs[ev.other as usize].p;
            debug_assert_eq!(
                pt_cmp(&self.pts, ev.p, po) == std::cmp::Ordering::Less,
                ev.left
            );
        }
        let eps = self.eps;
        let Self { q, evs, pts, .. } = self;
        let node = q.insert_with(e, |o| ev_cmp(eps, pts, evs, e, o));
        self.evs[e as usize].node_q = Some(node);
    }

    fn q_remove(&mut self, e: u32) {
        debug_assert!(self.q_contains(e));
        if let Some(node) = self.evs[e as usize].node_q.take() {
            self.q.remove(node);
        }
    }

    fn q_extract_min(&mut self) -> Option<u32> {
        let node = self.q.min()?;
        let e = self.q.item(node);
        self.q.remove(node);
        self.evs[e as usize].node_q = None;
        Some(e)
    }

    fn s_insert(&mut self, e: u32) {
        debug_assert!(!self.s_contains(e));
        debug_assert!(self.evs[e as usize].left);
        let eps = self.eps;
        let Self { s, evs, pts, .. } = self;
        // comparator: new edge vs edge already in the status
        let node = s.insert_with(e, |o| seg_cmp(eps, pts, evs, o, e).reverse());
        self.evs[e as usize].node_s = Some(node);
    }

    fn s_remove(&mut self, e: u32) {
        debug_assert!(self.s_contains(e));
        if let Some(node) = self.evs[e as usize].node_s.take() {
            self.s.remove(node);
        }
    }

    fn s_next(&self, e: u32) -> Option<u32> {
        let node = self.evs[e as usize].node_s?;
        self.s.next(node).map(|n| self.s.item(n))
    }

    fn s_prev(&self, e: u32) -> Option<u32> {
        let node = self.evs[e as usize].node_s?;
        self.s.prev(node).map(|n| self.s.item(n))
    }

    /// Queue both endpoint events of one input edge of polygon `poly_id`.
    fn q_add_orig(&mut self, v1: &Vec2Loc, v2: &Vec2Loc, poly_id: usize) {
        let p1 = self.pt_new(v1.coord, v1.loc, v1.color);
        let p2 = self.pt_new(v2.coord, v2.loc, v2.color);
        if p1 == p2 {
            // edge collapsed onto one grid point
            return;
        }
        let e1 = self.ev_new(v1.loc, p1, true, NONE);
        let e2 = self.ev_new(v2.loc, p2, false, e1);
        self.evs[e1 as usize].other = e2;
        self.evs[e1 as usize].owner = 1 << poly_id;
        self.evs[e2 as usize].owner = 1 << poly_id;
        if pt_cmp(&self.pts, p1, p2) == std::cmp::Ordering::Greater {
            self.evs[e1 as usize].left = false;
            self.evs[e2 as usize].left = true;
        }
        set_slope(self.eps, &self.pts, &mut self.evs, e1);
        self.q_insert(e1);
        self.q_insert(e2);
    }

    /// Split edge `e` (a left event) at point `p` strictly inside it.
    ///
    /// The two halves inherit owner/below from their side. If rasterization
    /// put `p` out of lex order with an endpoint, the unprocessed half is
    /// fixed by swapping its endpoint roles; the processed half must
    /// instead be pulled back into the queue for reprocessing.
    fn divide_segment(&mut self, e: u32, p: u32) {
        debug_assert!(self.evs[e as usize].left);
        debug_assert_ne!(p, self.evs[e as usize].p);
        let o = self.evs[e as usize].other;
        debug_assert_ne!(p, self.evs[o as usize].p);
        debug_assert!(!self.s_contains(o));

        //      p              p
        // e-------.       e--.l--.
        //  `-------o       `--r`--o
        let r = self.ev_new(self.pts[p as usize].loc, p, false, e);
        let l = self.ev_new(self.pts[p as usize].loc, p, true, o);
        self.evs[o as usize].other = l;
        self.evs[e as usize].other = r;
        self.evs[r as usize].owner = self.evs[e as usize].owner;
        self.evs[r as usize].below = self.evs[e as usize].below;
        self.evs[l as usize].owner = self.evs[o as usize].owner;
        self.evs[l as usize].below = self.evs[o as usize].below;

        if ev_cmp(self.eps, &self.pts, &self.evs, l, o) == std::cmp::Ordering::Greater {
            // rounding moved p past o in lex order; the l--o half is still
            // unprocessed, so swapping roles fixes it
            self.evs[o as usize].left = true;
            self.evs[l as usize].left = false;
        }
        if ev_cmp(self.eps, &self.pts, &self.evs, e, r) == std::cmp::Ordering::Greater {
            // same anomaly on the processed half: reprocess e
            self.evs[r as usize].left = true;
            self.evs[e as usize].left = false;
            if self.s_contains(e) {
                self.s_remove(e);
                self.q_insert(e);
            }
        }

        // recompute slopes; the halves are shorter and the corner cases
        // above may have changed endpoint roles
        set_slope(self.eps, &self.pts, &mut self.evs, l);
        set_slope(self.eps, &self.pts, &mut self.evs, r);

        self.q_insert(l);
        self.q_insert(r);
    }

    /// Cancel an edge: zero its owner and remove it from all structures.
    fn ev_ignore(&mut self, e: u32) {
        let o = self.evs[e as usize].other;
        self.evs[e as usize].owner = 0;
        self.evs[o as usize].owner = 0;
        if self.s_contains(e) {
            self.s_remove(e);
        }
        if self.s_contains(o) {
            self.s_remove(o);
        }
        if self.q_contains(e) {
            self.q_remove(e);
        }
        if self.q_contains(o) {
            self.q_remove(o);
        }
    }

    /// Take a run of status edges ending at `el` back into the queue,
    /// starting with `el` and continuing downward while the left point
    /// stays at `ip`.
    fn redo_q_from_s(&mut self, el: u32, ip: u32) {
        let mut cur = el;
        loop {
            let prev = self.s_prev(cur);
            self.s_remove(cur);
            self.q_insert(cur);
            match prev {
                Some(p) if self.evs[p as usize].p == ip => cur = p,
                _ => break,
            }
        }
    }

    /// Intersection point of the cached lines of `e0` and `e1`, rasterized,
    /// if it lies on both segments. `collinear` is set when the lines are
    /// identical (parallel overlapping candidates).
    fn find_intersection(&mut self, collinear: &mut bool, e0: u32, e1: u32) -> Option<u32> {
        debug_assert!(self.evs[e0 as usize].left && self.evs[e1 as usize].left);
        *collinear = false;
        let l0 = self.evs[e0 as usize].line;
        let l1 = self.evs[e1 as usize].line;
        if l0.swap == l1.swap && self.eps.eq(l0.a, l1.a) {
            *collinear = self.eps.eq(l0.b, l1.b);
            return None;
        }
        let i = intersection_point(self.eps, l0.a, l0.b, l0.swap, l1.a, l1.b, l1.swap);
        let i = Vec2::new(self.eps.rasterize(i.x), self.eps.rasterize(i.y));

        let p0 = event::coord(&self.pts, self.evs[e0 as usize].p);
        let p0b = event::coord(&self.pts, self.evs[self.evs[e0 as usize].other as usize].p);
        let p1 = event::coord(&self.pts, self.evs[e1 as usize].p);
        let p1b = event::coord(&self.pts, self.evs[self.evs[e1 as usize].other as usize].p);
        if !dim_between(self.eps, p0.x, i.x, p0b.x)
            || !dim_between(self.eps, p0.y, i.y, p0b.y)
            || !dim_between(self.eps, p1.x, i.x, p1b.x)
            || !dim_between(self.eps, p1.y, i.y, p1b.y)
        {
            return None;
        }
        let loc = self.pts[self.evs[e0 as usize].p as usize].loc;
        let color = self.pts[self.evs[e0 as usize].p as usize].color;
        Some(self.pt_new(i, loc, color))
    }

    /// Order two events of an overlapping pair for the sev scratch array:
    /// coincident points collapse to one `None` slot.
    fn add_sev(&self, sev: &mut Vec<Option<u32>>, el: u32, eh: u32) {
        if self.evs[el as usize].p == self.evs[eh as usize].p {
            sev.push(None);
        } else if ev_cmp(self.eps, &self.pts, &self.evs, el, eh) == std::cmp::Ordering::Greater {
            sev.push(Some(eh));
            sev.push(Some(el));
        } else {
            sev.push(Some(el));
            sev.push(Some(eh));
        }
    }

    /// Resolve the relationship of two adjacent status edges: nothing,
    /// a single intersection (split one or both), or collinear overlap
    /// (merge owners, split off the non-overlapping tails).
    ///
    /// `el` is the lower edge, `eh` the upper; `right` is the right event
    /// being finished when called from there (overlap collapses are
    /// suppressed in that context: they can only stem from rounding).
    fn check_intersection(&mut self, el: u32, eh: u32, right: Option<u32>) {
        let ol = self.evs[el as usize].other;
        let oh = self.evs[eh as usize].other;
        debug_assert!(self.evs[el as usize].left && self.evs[eh as usize].left);
        debug_assert!(self.s_contains(el) && self.s_contains(eh));
        debug_assert!(!self.s_contains(ol) && !self.s_contains(oh));

        // Overlap must be decided from point coordinates, not slopes, to
        // stay consistent with the endpoint compares used elsewhere.
        let mut u = ev4_overlap(self.eps, &self.pts, &self.evs, el, eh);

        let (pl, ph) = (self.evs[el as usize].p, self.evs[eh as usize].p);
        if let Some(r) = right {
            if u == 2 && ph != pl && self.evs[r as usize].p != pl {
                // coincident-point artifact at a finished right end: must
                // not round the intersection into el's left point
                u = 0;
            }
        }
        if u == 3 && right.is_some() {
            // prev/next overlap can only appear here due to rounding at
            // small scales; collapsing would invalidate processed state
            u = 0;
        }

        if u != 3 {
            let mut collinear = false;
            let ip = match u {
                1 => Some(ph),
                2 => Some(pl),
                _ => self.find_intersection(&mut collinear, el, eh),
            };
            if let Some(ip) = ip {
                if pl == ph || self.evs[ol as usize].p == self.evs[oh as usize].p {
                    trace!("intersection: shared end");
                    return;
                }
                if ip == pl {
                    // rounding says the upper edge actually passes below
                    // el's left point: reclassify by requeueing
                    self.redo_q_from_s(el, ip);
                } else if ip != self.evs[ol as usize].p {
                    self.divide_segment(el, ip);
                }
                if ip == ph {
                    self.redo_q_from_s(eh, ip);
                } else if ip != self.evs[oh as usize].p {
                    self.divide_segment(eh, ip);
                }
                trace!("intersection: split");
            }
            return;
        }

        debug_assert!(right.is_none());
        debug_assert!(pt_cmp(&self.pts, pl, self.evs[ol as usize].p).is_lt());
        debug_assert!(pt_cmp(&self.pts, ph, self.evs[oh as usize].p).is_lt());

        // Collinear overlap: order the four endpoints.
        let mut sev: Vec<Option<u32>> = Vec::with_capacity(4);
        self.add_sev(&mut sev, el, eh);
        self.add_sev(&mut sev, ol, oh);

        let owner = self.evs[eh as usize].owner ^ self.evs[el as usize].owner;
        let below = self.evs[el as usize].below;
        let above = below ^ owner;

        match sev.len() {
            2 => {
                //  eh.....oh
                //  el.....ol
                trace!("overlap: complete");
                self.evs[eh as usize].owner = owner;
                self.evs[oh as usize].owner = owner;
                self.evs[eh as usize].below = below;
                debug_assert_eq!(self.evs[el as usize].below, below);
                self.ev_ignore(el);
            }
            3 => {
                // shared endpoint, one edge longer; the shorter is wholly
                // the overlapping range
                trace!("overlap: shared end");
                let (sev1, sh, shl) = match (sev[0], sev[1], sev[2]) {
                    (Some(s0), Some(s1), None) => (s1, s0, s0),
                    (None, Some(s1), Some(s2)) => (s1, s2, self.evs[s2 as usize].other),
                    _ => unreachable!(),
                };
                let o1 = self.evs[sev1 as usize].other;
                self.evs[sev1 as usize].owner = 0;
                self.evs[o1 as usize].owner = 0;
                let sho = self.evs[sh as usize].other;
                self.evs[sho as usize].owner = owner;
                self.evs[sho as usize].below = below;
                if shl == el {
                    debug_assert!(sev1 == eh || sev1 == oh);
                    self.evs[eh as usize].below = above;
                }
                let split_at = self.evs[sev1 as usize].p;
                self.divide_segment(shl, split_at);
                self.ev_ignore(sev1);
            }
            4 => {
                let (Some(sev0), Some(sev1), Some(sev2), Some(sev3)) =
                    (sev[0], sev[1], sev[2], sev[3])
                else {
                    unreachable!()
                };
                debug_assert!(
                    (sev0 == el && sev1 == eh) || (sev0 == eh && sev1 == el)
                );
                if sev0 != self.evs[sev3 as usize].other {
                    //     eh......oh          el......ol
                    // el......ol          eh......oh
                    trace!("overlap: mutual partial");
                    self.evs[sev1 as usize].owner = 0;
                    if sev1 == eh {
                        self.evs[sev1 as usize].below = above;
                    }
                    self.evs[sev2 as usize].owner = owner;
                    self.evs[sev2 as usize].below = below;
                    let p1 = self.evs[sev1 as usize].p;
                    let p2 = self.evs[sev2 as usize].p;
                    self.divide_segment(sev0, p1);
                    self.divide_segment(sev1, p2);
                    self.ev_ignore(sev1);
                } else {
                    //     eh..oh          el..ol
                    // el..........ol  eh..........oh
                    trace!("overlap: inner");
                    debug_assert_eq!(self.evs[sev1 as usize].other, sev2);
                    self.evs[sev1 as usize].owner = 0;
                    self.evs[sev2 as usize].owner = 0;
                    if sev1 == eh {
                        self.evs[sev1 as usize].below = above;
                        self.evs[sev2 as usize].below = above;
                    }
                    let p1 = self.evs[sev1 as usize].p;
                    self.divide_segment(sev0, p1);
                    // sev3's buddy is the fresh left event of the outer tail
                    let s3o = self.evs[sev3 as usize].other;
                    self.evs[s3o as usize].owner = owner;
                    self.evs[s3o as usize].below = below;
                    let p2 = self.evs[sev2 as usize].p;
                    self.divide_segment(s3o, p2);
                    self.ev_ignore(sev1);
                }
            }
            _ => unreachable!(),
        }
    }

    /// Left endpoint: activate the edge, classify it from its lower
    /// neighbour, and resolve neighbour intersections.
    fn ev_left(&mut self, e: u32) {
        debug_assert!(!self.s_contains(e));
        self.s_insert(e);
        let prev = self.s_prev(e);
        let next = self.s_next(e);

        self.evs[e as usize].below = match prev {
            None => 0,
            Some(p) => self.evs[p as usize].below ^ self.evs[p as usize].owner,
        };

        if let Some(nx) = next {
            self.check_intersection(e, nx, None);
        }
        if let Some(pv) = prev {
            // the check above may have requeued e; then it is handled later
            if self.s_contains(e) {
                self.check_intersection(pv, e, None);
            }
        }
    }

    /// Right endpoint: deactivate the edge, emit it if the boolean function
    /// flips across it, and let the now-adjacent neighbours meet.
    fn ev_right(&mut self, e: u32) {
        debug_assert!(!self.evs[e as usize].left);
        let sli = self.evs[e as usize].other;
        let next = self.s_next(sli);
        let prev = self.s_prev(sli);
        self.s_remove(sli);

        let below = self.evs[sli as usize].below as usize;
        let above = below ^ self.evs[sli as usize].owner as usize;
        debug_assert!(below < self.comb_size && above < self.comb_size);
        let below_in = self.comb.get(below);
        let above_in = self.comb.get(above);
        if below_in != above_in {
            debug_assert!(self.evs[sli as usize].owner != 0);
            // repurpose `below` as the output inside-is-below bit
            self.evs[e as usize].below = below_in as u32;
            self.evs[sli as usize].below = below_in as u32;
            self.chain_add(e);
        }

        if let (Some(pv), Some(nx)) = (prev, next) {
            self.check_intersection(pv, nx, Some(e));
        }
    }

    /// Register an output edge (by its right event) for chain assembly.
    fn chain_add(&mut self, e: u32) {
        let o = self.evs[e as usize].other;
        debug_assert!(!self.evs[e as usize].left);
        debug_assert!(!self.s_contains(e) && !self.q_contains(e));
        debug_assert!(!self.s_contains(o) && !self.q_contains(o));
        self.evs[e as usize].ring = NONE;
        self.evs[o as usize].ring = NONE;
        self.end.push(e);
        self.end.push(o);
    }

    fn run(&mut self) -> Result<Poly2> {
        let mut cnt = 0usize;
        while let Some(e) = self.q_extract_min() {
            cnt += 1;
            if self.evs[e as usize].left {
                self.ev_left(e);
            } else {
                self.ev_right(e);
            }
        }
        trace!("sweep done: {cnt} events, {} output ends", self.end.len());
        chain::combine(self)?;
        chain::poly_make(self)
    }
}

/// Boolean combination of up to `MAX_LAZY` polygons under the truth table
/// `comb` (bit `m` = output inside when exactly the inputs in mask `m` are
/// inside).
///
/// `flatten` splits rings that revisit a point into disjoint paths (needed
/// for extrusion); leave it off for triangulation input. `all_points`
/// keeps collinear interior vertices.
///
/// Fails only on internal invariant violations (odd-degree output vertex).
pub fn op_poly(
    eps: &Eps,
    polys: &[&Poly2],
    comb: &BoolBitmap,
    flatten: bool,
    all_points: bool,
) -> Result<Poly2> {
    if polys.len() > MAX_LAZY {
        return Err(Error::config(format!(
            "boolean combination of {} polygons exceeds the {} operand limit",
            polys.len(),
            MAX_LAZY
        )));
    }
    let mut sw = Sweep::new(eps, *comb, polys.len(), flatten, all_points);
    for (m, poly) in polys.iter().enumerate() {
        for path in &poly.paths {
            let n = path.len();
            for j in 0..n {
                let v1 = poly.points[path.point_idx[j] as usize];
                let v2 = poly.points[path.point_idx[(j + 1) % n] as usize];
                sw.q_add_orig(&v1, &v2, m);
            }
        }
    }
    sw.run()
}

/// Binary convenience wrapper: `a op b`.
pub fn op2(eps: &Eps, a: &Poly2, b: &Poly2, op: crate::bitmap::BoolOp) -> Result<Poly2> {
    let mut comb = BoolBitmap::single();
    let mut cb = BoolBitmap::single();
    comb.repeat(1, 1);
    cb.spread(1, 1);
    comb.combine(&cb, 2, op);
    op_poly(eps, &[a, b], &comb, false, false)
}
