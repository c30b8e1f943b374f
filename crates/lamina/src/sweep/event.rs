//! Sweep arena: points, events, and the comparators that order them.
//!
//! Points and events live in plain `Vec` arenas addressed by `u32`; an
//! event's membership in the queue/status/chain is tracked by the handles it
//! holds. Comparators are free functions over the arenas so the borrow of
//! the tree being inserted into stays disjoint from the arena reads.
//!
//! Intersections are always computed from the cached line form (`a`, `b`,
//! `swap`) of the *original* input edge, so splitting an edge many times
//! does not accumulate rounding drift.

use std::cmp::Ordering;

use crate::dict;
use crate::err::Loc;
use crate::geom::{Eps, Vec2};
use crate::poly::Color;

pub(super) const NONE: u32 = u32::MAX;

/// A unique (rasterized) sweep point.
pub(super) struct Pt {
    pub coord: Vec2,
    pub loc: Loc,
    pub color: Color,
    /// Index in the output point vector; `NONE` until first used.
    pub point_idx: u32,
    /// How many output path vertices use this point.
    pub path_cnt: u32,
    /// Position in the path currently being extracted (ring splitting).
    pub face_idx: u32,
    /// Stack link for clearing `face_idx` when a ring is split off.
    pub next: u32,
}

/// Cached line form of an edge: `Y = a·X + b` where (X, Y) is (x, y) or
/// (y, x) depending on `swap`, chosen so `|a| <= 1`.
#[derive(Clone, Copy, Default)]
pub(super) struct Line {
    pub a: f64,
    pub b: f64,
    pub swap: bool,
    pub dir: Vec2,
}

/// One endpoint event of an edge.
pub(super) struct Ev {
    pub p: u32,
    /// Buddy event: the edge's other endpoint.
    pub other: u32,
    pub left: bool,
    pub loc: Loc,
    /// Input polygons owning this edge (XOR-accumulated on overlap).
    pub owner: u32,
    /// Per-polygon inside-state just below this edge (valid while in S);
    /// after output emission, repurposed as the inside-is-below bit.
    pub below: u32,
    pub line: Line,
    /// Queue node while queued.
    pub node_q: Option<dict::NodeId>,
    /// Status node while active (left events only).
    pub node_s: Option<dict::NodeId>,
    /// Ring partner at the same point after chain pairing (`NONE` =
    /// singleton).
    pub ring: u32,
    /// Already part of an extracted path.
    pub used: bool,
}

#[inline]
pub(super) fn coord(pts: &[Pt], p: u32) -> Vec2 {
    pts[p as usize].coord
}

/// Exact lexicographic compare of two distinct point handles.
#[inline]
pub(super) fn pt_cmp(pts: &[Pt], a: u32, b: u32) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    crate::geom::lex_cmp(coord(pts, a), coord(pts, b))
}

/// Edge-vs-point compare: -1 if `b` lies above the line `a1 -> a2`
/// (the edge sorts below), +1 if below, 0 if on the line.
#[inline]
pub(super) fn pt2_pt_cmp(eps: &Eps, pts: &[Pt], a1: u32, a2: u32, b: u32) -> i32 {
    -crate::geom::orient(eps, coord(pts, a1), coord(pts, a2), coord(pts, b))
}

#[inline]
pub(super) fn left_pt(evs: &[Ev], e: u32) -> u32 {
    let ev = &evs[e as usize];
    if ev.left {
        ev.p
    } else {
        evs[ev.other as usize].p
    }
}

#[inline]
pub(super) fn right_pt(evs: &[Ev], e: u32) -> u32 {
    let ev = &evs[e as usize];
    if ev.left {
        evs[ev.other as usize].p
    } else {
        ev.p
    }
}

/// Event order in Q: left (small) to right (large):
/// - left coordinates before right coordinates,
/// - at the same point, right endpoints before left endpoints,
/// - at the same point and side, the lower edge first.
///
/// May return Equal for collinear edges sharing endpoint and direction;
/// their processing order does not matter (they get split later).
pub(super) fn ev_cmp(eps: &Eps, pts: &[Pt], evs: &[Ev], e1: u32, e2: u32) -> Ordering {
    let (v1, v2) = (&evs[e1 as usize], &evs[e2 as usize]);
    if v1.p != v2.p {
        let c = pt_cmp(pts, v1.p, v2.p);
        debug_assert_ne!(c, Ordering::Equal, "distinct points with equal coords");
        return c;
    }
    if v1.left != v2.left {
        // right endpoint first
        return (v1.left as u8).cmp(&(v2.left as u8));
    }
    let o2 = evs[v2.other as usize].p;
    pt2_pt_cmp(eps, pts, left_pt(evs, e1), right_pt(evs, e1), o2).cmp(&0)
}

/// Segment order in S, bottom (small) to top (large).
///
/// Only correct when one argument is the edge being inserted at the current
/// sweep position; it is not a total order over time. Collinear segments
/// fall back to a consistent arbitrary order.
pub(super) fn seg_cmp(eps: &Eps, pts: &[Pt], evs: &[Ev], e1: u32, e2: u32) -> Ordering {
    debug_assert!(evs[e1 as usize].left && evs[e2 as usize].left);
    if e1 == e2 {
        return Ordering::Equal;
    }
    let (v1, v2) = (&evs[e1 as usize], &evs[e2 as usize]);
    let e1_p_cmp = pt2_pt_cmp(eps, pts, v1.p, evs[v1.other as usize].p, v2.p);
    let e1_o_cmp = pt2_pt_cmp(
        eps,
        pts,
        v1.p,
        evs[v1.other as usize].p,
        evs[v2.other as usize].p,
    );

    if e1_p_cmp != 0 || e1_o_cmp != 0 {
        // non-collinear
        if e1_p_cmp == 0 {
            // e2's left point is on e1: order by e2's right point
            return e1_o_cmp.cmp(&0);
        }
        if ev_cmp(eps, pts, evs, e1, e2) == Ordering::Greater {
            // e2 was processed first: is e1 below e2's line?
            return if pt2_pt_cmp(eps, pts, v2.p, evs[v2.other as usize].p, v1.p) >= 0 {
                Ordering::Less
            } else {
                Ordering::Greater
            };
        }
        // e1 was processed first
        return if e1_p_cmp <= 0 {
            Ordering::Less
        } else {
            Ordering::Greater
        };
    }

    // collinear: any consistent criterion
    if v1.p == v2.p {
        return e1.cmp(&e2);
    }
    ev_cmp(eps, pts, evs, e1, e2)
}

/// Set the cached line form on both events of an edge.
///
/// Always computed from the left endpoint so collinear pieces of one line
/// share identical coefficients.
pub(super) fn set_slope(eps: &Eps, pts: &[Pt], evs: &mut [Ev], e: u32) {
    let e1 = if evs[e as usize].left {
        e
    } else {
        evs[e as usize].other
    };
    let e2 = evs[e1 as usize].other;
    let p1 = coord(pts, evs[e1 as usize].p);
    let p2 = coord(pts, evs[e2 as usize].p);
    let d = p2 - p1;
    let swap = eps.lt(d.x.abs(), d.y.abs());
    let (dx, dy) = if swap { (d.y, d.x) } else { (d.x, d.y) };
    let (px, py) = if swap { (p1.y, p1.x) } else { (p1.x, p1.y) };
    let a = dy / dx;
    let b = py - a * px;
    debug_assert!(eps.le(a.abs(), 1.0));
    let line = Line {
        a,
        b,
        swap,
        dir: d / d.norm(),
    };
    evs[e1 as usize].line = line;
    evs[e2 as usize].line = line;
}

/// Write (X, Y) of a line-local coordinate pair into a `Vec2`, honoring the
/// axis swap.
#[inline]
fn put_xy(swap: bool, r: &mut Vec2, x: f64, y: f64) {
    if swap {
        r.y = x;
        r.x = y;
    } else {
        r.x = x;
        r.y = y;
    }
}

/// Intersection of two cached lines given as (slope, offset, swap).
///
/// The steeper-parameterized line is moved into the flatter one's axis
/// convention first; the caller guarantees the lines are not parallel.
pub(super) fn intersection_point(
    eps: &Eps,
    mut ka: f64,
    mut kb: f64,
    mut ks: bool,
    mut ma: f64,
    mut mb: f64,
    mut ms: bool,
) -> Vec2 {
    if ka.abs() < ma.abs() {
        std::mem::swap(&mut ka, &mut ma);
        std::mem::swap(&mut kb, &mut mb);
        std::mem::swap(&mut ks, &mut ms);
    }
    // ka is closer to ±1, ma closer to 0
    let mut r = Vec2::zeros();
    if ks != ms {
        if eps.eq(ma, 0.0) {
            put_xy(ks, &mut r, mb, ka * mb + kb);
            return r;
        }
        // re-express the k line in the m axis convention
        debug_assert!(!eps.eq(ka, 0.0));
        ka = 1.0 / ka;
        kb *= -ka;
        ks = ms;
    }
    debug_assert!(!eps.eq(ka, ma), "parallel lines must be filtered earlier");
    let q = (mb - kb) / (ka - ma);
    put_xy(ks, &mut r, q, ka * q + kb);
    r
}

/// Is `b` within the closed interval spanned by `a` and `c` (ε-closed)?
#[inline]
pub(super) fn dim_between(eps: &Eps, a: f64, b: f64, c: f64) -> bool {
    if a < c {
        eps.le(a, b) && eps.le(b, c)
    } else {
        eps.ge(a, b) && eps.ge(b, c)
    }
}

/// Is point `b` on the segment `a..c`, within 1.5 grid units off-line?
///
/// Used only by the overlap detector, which must base its decision on point
/// coordinates (not slopes) to stay consistent with endpoint compares.
pub(super) fn coord_between(eps: &Eps, a: Vec2, b: Vec2, c: Vec2) -> bool {
    if !dim_between(eps, a.x, b.x, c.x) || !dim_between(eps, a.y, b.y, c.y) {
        return false;
    }
    let dx = c.x - a.x;
    let dy = c.y - a.y;
    if dx.abs() > dy.abs() {
        let t = (b.x - a.x) / dx;
        let y = a.y + t * dy;
        Eps::e_eq(eps.pt * 1.5, y, b.y)
    } else {
        let t = (b.y - a.y) / dy;
        let x = a.x + t * dx;
        Eps::e_eq(eps.pt * 1.5, x, b.x)
    }
}

pub(super) fn pt_between(eps: &Eps, pts: &[Pt], a: u32, b: u32, c: u32) -> bool {
    if a == b || b == c {
        return true;
    }
    debug_assert_ne!(a, c);
    coord_between(eps, coord(pts, a), coord(pts, b), coord(pts, c))
}

/// Overlap classification of two segments el--ol and eh--oh.
///
/// Returns 3 on (partial) overlap, 1 if eh's left point lies on el--ol,
/// 2 if el's left point lies on eh--oh, 0 otherwise. Segments that merely
/// meet at endpooints are excluded (those need no collapse).
pub(super) fn ev4_overlap(eps: &Eps, pts: &[Pt], evs: &[Ev], el: u32, eh: u32) -> u32 {
    let ol = evs[el as usize].other;
    let oh = evs[eh as usize].other;
    let (pl, pol) = (evs[el as usize].p, evs[ol as usize].p);
    let (ph, poh) = (evs[eh as usize].p, evs[oh as usize].p);

    let mut result = 0;
    if pt_between(eps, pts, pl, ph, pol) {
        if pt_between(eps, pts, pl, poh, pol) {
            return 3;
        }
        if pt_between(eps, pts, ph, pol, poh) {
            return if pol != ph { 3 } else { 1 };
        }
        result = 1;
    }
    if pt_between(eps, pts, ph, pl, poh) {
        if pt_between(eps, pts, ph, pol, poh) {
            return 3;
        }
        if pt_between(eps, pts, pl, poh, pol) {
            return if poh != pl { 3 } else { 2 };
        }
        return 2;
    }
    result
}
