//! Reassembly of sweep output edges into closed polygon paths.
//!
//! Edges arrive as endpoint pairs in no particular order. Because several
//! output edges can meet in one point, endpoints cannot simply be connected
//! as they come in: that could create crossing paths. Instead all
//! endpoints are collected, grouped by point, and paired per group:
//! exactly two connect directly; larger (always even) groups are sorted by
//! the absolute angle of their outgoing edge and paired cyclically, which
//! guarantees no two output edges cross at the shared vertex. Same-angle
//! pairs are collapsed edges (a-b-a) and annihilate.
//!
//! Paths are then walked out of the pairing by alternating buddy and
//! ring-partner hops. Each path starts at a left event oriented so the
//! interior lies left of the travel direction: outer paths come out with
//! positive signed area, holes negative. Collinear interior vertices are
//! filtered unless `all_points` is set or the vertex is used by more than
//! one path. In `flatten` mode a ring that revisits a point is split into
//! disjoint paths on the spot.

use std::f64::consts::PI;

use crate::err::{Error, Result};
use crate::geom::{in_line, lex_cmp, Eps};
use crate::poly::{Path, Poly2, Vec2Loc};

use super::event::{coord, Ev, Pt, NONE};
use super::Sweep;

/// Ring partner at the same point (identity for unpaired singletons).
#[inline]
fn chain_other(evs: &[Ev], e: u32) -> u32 {
    let r = evs[e as usize].ring;
    if r == NONE {
        e
    } else {
        r
    }
}

/// Absolute angle of the edge leaving `e`'s point, for pairing order.
///
/// x and y are swapped in the atan2 so the ±π seam is vertical rather than
/// horizontal; +π is identified with −π (mapped to −π) so opposite
/// verticals sort equally. Both choices bias ties toward start/end vertices
/// rather than bends, which the triangulator handles more robustly.
fn ev_atan2(eps: &Eps, pts: &[Pt], evs: &[Ev], e: u32) -> f64 {
    let p = coord(pts, evs[e as usize].p);
    let o = coord(pts, evs[evs[e as usize].other as usize].p);
    let a = f64::atan2(p.x - o.x, p.y - o.y);
    if Eps::e_eq(eps.eq, a, PI) || Eps::e_eq(eps.eq, a, -PI) {
        -PI
    } else {
        a
    }
}

/// Do two edges at the same point leave in the same direction?
/// (Collapsed a-b-a pairs; cheaper than comparing atan2.)
fn same_dir(eps: &Eps, pts: &[Pt], evs: &[Ev], e1: u32, e2: u32) -> bool {
    debug_assert_eq!(evs[e1 as usize].p, evs[e2 as usize].p);
    let p1 = coord(pts, evs[e1 as usize].p);
    let o1 = coord(pts, evs[evs[e1 as usize].other as usize].p);
    let p2 = coord(pts, evs[e2 as usize].p);
    let o2 = coord(pts, evs[evs[e2 as usize].other as usize].p);
    in_line(eps, o1, p1, o2)
        && eps.cmp(0.0, o1.x - p1.x) == eps.cmp(0.0, o2.x - p2.x)
        && eps.cmp(0.0, o1.y - p1.y) == eps.cmp(0.0, o2.y - p2.y)
}

/// Pair up all endpoints meeting at one point.
fn flush_vertex(sw: &mut Sweep, group: &[u32]) -> Result<()> {
    let odd_err = |sw: &Sweep| {
        let p = sw.evs[group[0] as usize].p;
        Error::topology(
            sw.pts[p as usize].loc,
            "odd number of edges meet in one output vertex",
        )
    };
    if group.len() % 2 != 0 {
        return Err(odd_err(sw));
    }

    let mut v: Vec<u32> = group.to_vec();
    if v.len() > 2 {
        // atan2 is slow; only larger groups need the angular order
        v.sort_by(|&a, &b| {
            let aa = ev_atan2(sw.eps, &sw.pts, &sw.evs, a);
            let bb = ev_atan2(sw.eps, &sw.pts, &sw.evs, b);
            aa.partial_cmp(&bb).unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    // drop both members of same-direction adjacent pairs (collapses)
    let mut keep: Vec<u32> = Vec::with_capacity(v.len());
    for i in 0..v.len() {
        if i > 0 && same_dir(sw.eps, &sw.pts, &sw.evs, v[i], v[i - 1]) {
            continue;
        }
        if i + 1 < v.len() && same_dir(sw.eps, &sw.pts, &sw.evs, v[i], v[i + 1]) {
            continue;
        }
        keep.push(v[i]);
    }
    if keep.len() % 2 != 0 {
        return Err(odd_err(sw));
    }

    for pair in keep.chunks(2) {
        let (e1, e2) = (pair[0], pair[1]);
        sw.evs[e1 as usize].ring = e2;
        sw.evs[e2 as usize].ring = e1;
        let p = sw.evs[e1 as usize].p;
        sw.pts[p as usize].path_cnt += 1;
    }
    Ok(())
}

/// Group all output endpoints by point and pair each group.
pub(super) fn combine(sw: &mut Sweep) -> Result<()> {
    {
        let Sweep { end, evs, pts, .. } = sw;
        // stable: insertion order within a point is kept
        end.sort_by(|&a, &b| {
            lex_cmp(
                coord(pts, evs[a as usize].p),
                coord(pts, evs[b as usize].p),
            )
        });
    }
    let mut i = 0;
    while i < sw.end.len() {
        let p = sw.evs[sw.end[i] as usize].p;
        let mut j = i + 1;
        while j < sw.end.len() && sw.evs[sw.end[j] as usize].p == p {
            j += 1;
        }
        let group: Vec<u32> = sw.end[i..j].to_vec();
        flush_vertex(sw, &group)?;
        i = j;
    }
    Ok(())
}

/// Append point `q` to the path being built; in `flatten` mode, split off a
/// ring when `q` repeats within the current path.
fn path_add_point(sw: &mut Sweep, r: &mut Poly2, path: &mut Path, stack: &mut u32, q: u32) {
    let pi = {
        let pt = &mut sw.pts[q as usize];
        if pt.point_idx == NONE {
            pt.point_idx = r.points.len() as u32;
            r.points.push(Vec2Loc {
                coord: pt.coord,
                loc: pt.loc,
                color: pt.color,
            });
        }
        pt.point_idx
    };
    debug_assert!((pi as usize) < r.points.len());

    let fi = sw.pts[q as usize].face_idx;
    if sw.flatten && (fi as usize) < path.point_idx.len() {
        // the point closes a ring inside the current path: split it off
        let cnt = path.point_idx.len() - fi as usize;
        if cnt >= 3 {
            r.paths.push(Path {
                point_idx: path.point_idx[fi as usize..].to_vec(),
            });
        }
        // unwind the ring points (the shared point stays on the stack)
        for _ in 1..cnt {
            debug_assert_ne!(*stack, NONE);
            let h = *stack;
            sw.pts[h as usize].face_idx = NONE;
            *stack = sw.pts[h as usize].next;
        }
        debug_assert_ne!(*stack, NONE);
        path.point_idx.truncate(fi as usize + 1);
    } else {
        sw.pts[q as usize].face_idx = path.point_idx.len() as u32;
        path.point_idx.push(pi);
        sw.pts[q as usize].next = *stack;
        *stack = q;
    }
}

/// Visit `cur` between `prev` and `next`; emit its point unless it is a
/// filtered collinear interior vertex. Returns whether it was emitted.
fn path_add_point3(
    sw: &mut Sweep,
    r: &mut Poly2,
    path: &mut Path,
    stack: &mut u32,
    prev: u32,
    cur: u32,
    next: u32,
) -> bool {
    debug_assert!(!sw.evs[cur as usize].used);
    sw.evs[cur as usize].used = true;

    let pp = sw.evs[prev as usize].p;
    let pc = sw.evs[cur as usize].p;
    let pn = sw.evs[next as usize].p;
    if sw.all_points
        || sw.pts[pc as usize].path_cnt > 1
        || !in_line(
            sw.eps,
            coord(&sw.pts, pp),
            coord(&sw.pts, pc),
            coord(&sw.pts, pn),
        )
    {
        path_add_point(sw, r, path, stack, pc);
        return true;
    }
    false
}

/// Extract the closed path through `e0`, if it has not been taken yet.
fn path_make(sw: &mut Sweep, r: &mut Poly2, e0_in: u32) {
    let mut e0 = e0_in;
    if !sw.evs[e0 as usize].left
        || sw.evs[e0 as usize].used
        || sw.evs[chain_other(&sw.evs, e0) as usize].used
    {
        return;
    }
    let mut e1 = sw.evs[e0 as usize].other;
    debug_assert!(!sw.evs[e1 as usize].left);

    // Orient so the interior is above the edge when traveling e0 -> e1
    // (left to right); that puts the interior left of the travel direction.
    if sw.evs[e1 as usize].below != 0 {
        std::mem::swap(&mut e0, &mut e1);
    }

    // Keep chain_other(ex).other == ey by hopping to the ring partner.
    e0 = chain_other(&sw.evs, e0);
    let mut ea = e0;
    let mut eb = e1;
    let mut ec = sw.evs[chain_other(&sw.evs, e1) as usize].other;
    debug_assert_eq!(sw.evs[chain_other(&sw.evs, ea) as usize].other, eb);
    if ea == ec {
        // two-edge collapse; longer collinear chains are dropped later
        return;
    }

    let mut path = Path::default();
    let mut stack: u32 = NONE;
    loop {
        if path_add_point3(sw, r, &mut path, &mut stack, ea, eb, ec) {
            ea = eb;
        }
        eb = ec;
        ec = sw.evs[chain_other(&sw.evs, eb) as usize].other;
        if ec == e0 {
            break;
        }
    }
    if path_add_point3(sw, r, &mut path, &mut stack, ea, eb, e0) {
        ea = eb;
    }
    path_add_point3(sw, r, &mut path, &mut stack, ea, e0, e1);

    // reset per-path point state for later extractions
    while stack != NONE {
        let n = sw.pts[stack as usize].next;
        sw.pts[stack as usize].face_idx = NONE;
        stack = n;
    }

    if path.point_idx.len() >= 3 {
        r.paths.push(path);
    }
}

/// Walk every paired endpoint group into output paths.
pub(super) fn poly_make(sw: &mut Sweep) -> Result<Poly2> {
    let mut out = Poly2::new();
    for i in 0..sw.end.len() {
        let e = sw.end[i];
        // start only at left nodes so the orientation choice is available
        if sw.evs[e as usize].left && !sw.evs[e as usize].used {
            path_make(sw, &mut out, e);
        }
    }
    Ok(out)
}
