//! Ordered index map with external comparators (a treap).
//!
//! The sweep needs two orderings (event order for the queue, line order for
//! the status) over nodes that live in shared arenas, and the status order
//! is positional: it is only guaranteed correct at the instant of insertion.
//! That rules out key-owning maps like `BTreeMap`; instead this treap takes
//! a comparator closure per operation that compares payload handles, and
//! removal/neighbour queries never compare at all.
//!
//! Payloads are `u32` handles into whatever arena the caller owns. Each
//! caller stores the returned `NodeId` to remove or navigate later; a
//! payload's membership state is exactly "do I hold a live `NodeId`".

use std::cmp::Ordering;

/// Handle of a tree node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeId(u32);

const NIL: u32 = u32::MAX;

#[derive(Clone, Debug)]
struct Node {
    item: u32,
    prio: u64,
    parent: u32,
    left: u32,
    right: u32,
}

/// Treap keyed by caller-supplied comparisons.
#[derive(Clone, Debug, Default)]
pub struct Map {
    root: u32,
    nodes: Vec<Node>,
    free: Vec<u32>,
    tick: u64,
    len: usize,
}

impl Map {
    pub fn new() -> Self {
        Self {
            root: NIL,
            nodes: Vec::new(),
            free: Vec::new(),
            tick: 0,
            len: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn item(&self, n: NodeId) -> u32 {
        self.nodes[n.0 as usize].item
    }

    /// Replace the payload of a node without moving it.
    ///
    /// The caller asserts the new payload sorts at the same position (bend
    /// transitions swap the continuing edge into its predecessor's slot).
    #[inline]
    pub fn replace_item(&mut self, n: NodeId, item: u32) {
        self.nodes[n.0 as usize].item = item;
    }

    /// Insert `item`; `cmp(existing)` orders the new item against an
    /// existing payload. Equal sorts after existing entries.
    pub fn insert_with<F>(&mut self, item: u32, mut cmp: F) -> NodeId
    where
        F: FnMut(u32) -> Ordering,
    {
        let id = self.alloc(item);
        if self.root == NIL {
            self.root = id;
            self.len += 1;
            return NodeId(id);
        }
        let mut cur = self.root;
        loop {
            let go_left = cmp(self.nodes[cur as usize].item) == Ordering::Less;
            let child = if go_left {
                self.nodes[cur as usize].left
            } else {
                self.nodes[cur as usize].right
            };
            if child == NIL {
                if go_left {
                    self.nodes[cur as usize].left = id;
                } else {
                    self.nodes[cur as usize].right = id;
                }
                self.nodes[id as usize].parent = cur;
                break;
            }
            cur = child;
        }
        self.bubble_up(id);
        self.len += 1;
        NodeId(id)
    }

    /// Remove by node handle (no comparisons).
    pub fn remove(&mut self, n: NodeId) {
        let id = n.0;
        // Rotate down until at most one child remains.
        loop {
            let (l, r) = {
                let nd = &self.nodes[id as usize];
                (nd.left, nd.right)
            };
            if l == NIL || r == NIL {
                break;
            }
            let up = if self.nodes[l as usize].prio < self.nodes[r as usize].prio {
                l
            } else {
                r
            };
            self.rotate_up(up);
        }
        let child = {
            let nd = &self.nodes[id as usize];
            if nd.left != NIL {
                nd.left
            } else {
                nd.right
            }
        };
        let parent = self.nodes[id as usize].parent;
        if child != NIL {
            self.nodes[child as usize].parent = parent;
        }
        if parent == NIL {
            self.root = child;
        } else if self.nodes[parent as usize].left == id {
            self.nodes[parent as usize].left = child;
        } else {
            self.nodes[parent as usize].right = child;
        }
        self.free.push(id);
        self.len -= 1;
    }

    /// Leftmost node.
    pub fn min(&self) -> Option<NodeId> {
        if self.root == NIL {
            return None;
        }
        let mut cur = self.root;
        while self.nodes[cur as usize].left != NIL {
            cur = self.nodes[cur as usize].left;
        }
        Some(NodeId(cur))
    }

    /// In-order successor.
    pub fn next(&self, n: NodeId) -> Option<NodeId> {
        let mut cur = n.0;
        if self.nodes[cur as usize].right != NIL {
            cur = self.nodes[cur as usize].right;
            while self.nodes[cur as usize].left != NIL {
                cur = self.nodes[cur as usize].left;
            }
            return Some(NodeId(cur));
        }
        loop {
            let p = self.nodes[cur as usize].parent;
            if p == NIL {
                return None;
            }
            if self.nodes[p as usize].left == cur {
                return Some(NodeId(p));
            }
            cur = p;
        }
    }

    /// In-order predecessor.
    pub fn prev(&self, n: NodeId) -> Option<NodeId> {
        let mut cur = n.0;
        if self.nodes[cur as usize].left != NIL {
            cur = self.nodes[cur as usize].left;
            while self.nodes[cur as usize].right != NIL {
                cur = self.nodes[cur as usize].right;
            }
            return Some(NodeId(cur));
        }
        loop {
            let p = self.nodes[cur as usize].parent;
            if p == NIL {
                return None;
            }
            if self.nodes[p as usize].right == cur {
                return Some(NodeId(p));
            }
            cur = p;
        }
    }

    /// Locate an insertion position: `cmp(existing)` orders the probe
    /// against an existing payload. Returns the neighbours the probe would
    /// land between (`below` sorts before it, `above` after).
    pub fn find_neighbours<F>(&self, mut cmp: F) -> (Option<NodeId>, Option<NodeId>)
    where
        F: FnMut(u32) -> Ordering,
    {
        let mut below = None;
        let mut above = None;
        let mut cur = self.root;
        while cur != NIL {
            if cmp(self.nodes[cur as usize].item) == Ordering::Less {
                above = Some(NodeId(cur));
                cur = self.nodes[cur as usize].left;
            } else {
                below = Some(NodeId(cur));
                cur = self.nodes[cur as usize].right;
            }
        }
        (below, above)
    }

    fn alloc(&mut self, item: u32) -> u32 {
        self.tick = self.tick.wrapping_add(1);
        let prio = splitmix64(self.tick);
        let node = Node {
            item,
            prio,
            parent: NIL,
            left: NIL,
            right: NIL,
        };
        match self.free.pop() {
            Some(id) => {
                self.nodes[id as usize] = node;
                id
            }
            None => {
                self.nodes.push(node);
                (self.nodes.len() - 1) as u32
            }
        }
    }

    fn bubble_up(&mut self, id: u32) {
        while {
            let p = self.nodes[id as usize].parent;
            p != NIL && self.nodes[id as usize].prio < self.nodes[p as usize].prio
        } {
            self.rotate_up(id);
        }
    }

    /// Rotate `x` above its parent, preserving in-order positions.
    fn rotate_up(&mut self, x: u32) {
        let p = self.nodes[x as usize].parent;
        debug_assert!(p != NIL);
        let g = self.nodes[p as usize].parent;
        let x_is_left = self.nodes[p as usize].left == x;
        // move x's inner child to p
        let inner = if x_is_left {
            self.nodes[x as usize].right
        } else {
            self.nodes[x as usize].left
        };
        if x_is_left {
            self.nodes[p as usize].left = inner;
            self.nodes[x as usize].right = p;
        } else {
            self.nodes[p as usize].right = inner;
            self.nodes[x as usize].left = p;
        }
        if inner != NIL {
            self.nodes[inner as usize].parent = p;
        }
        self.nodes[p as usize].parent = x;
        self.nodes[x as usize].parent = g;
        if g == NIL {
            self.root = x;
        } else if self.nodes[g as usize].left == p {
            self.nodes[g as usize].left = x;
        } else {
            self.nodes[g as usize].right = x;
        }
    }
}

/// Deterministic priority stream (splitmix64).
#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn in_order(m: &Map) -> Vec<u32> {
        let mut out = Vec::new();
        let mut cur = m.min();
        while let Some(n) = cur {
            out.push(m.item(n));
            cur = m.next(n);
        }
        out
    }

    #[test]
    fn sorted_after_random_inserts_and_removals() {
        let mut rng = StdRng::seed_from_u64(42);
        let vals: Vec<u32> = (0..500).map(|_| rng.gen_range(0..10_000)).collect();
        let mut m = Map::new();
        let mut handles = Vec::new();
        for (i, _) in vals.iter().enumerate() {
            let h = m.insert_with(i as u32, |other| vals[i].cmp(&vals[other as usize]));
            handles.push(h);
        }
        let got = in_order(&m);
        let mut want: Vec<u32> = (0..vals.len() as u32).collect();
        want.sort_by_key(|&i| vals[i as usize]);
        // stable within equal keys is not required; compare the key sequence
        let got_keys: Vec<u32> = got.iter().map(|&i| vals[i as usize]).collect();
        let want_keys: Vec<u32> = want.iter().map(|&i| vals[i as usize]).collect();
        assert_eq!(got_keys, want_keys);

        // remove every other node, order must persist without comparisons
        for (i, h) in handles.iter().enumerate() {
            if i % 2 == 0 {
                m.remove(*h);
            }
        }
        let got = in_order(&m);
        let got_keys: Vec<u32> = got.iter().map(|&i| vals[i as usize]).collect();
        let mut want_keys: Vec<u32> = vals
            .iter()
            .enumerate()
            .filter(|(i, _)| i % 2 == 1)
            .map(|(_, &v)| v)
            .collect();
        want_keys.sort();
        assert_eq!(got_keys, want_keys);
        assert_eq!(m.len(), 250);
    }

    #[test]
    fn neighbours_bracket_probe() {
        let vals = [10u32, 20, 30, 40, 50];
        let mut m = Map::new();
        for i in 0..vals.len() as u32 {
            m.insert_with(i, |other| vals[i as usize].cmp(&vals[other as usize]));
        }
        // probe 35 between 30 and 40
        let (below, above) = m.find_neighbours(|other| 35u32.cmp(&vals[other as usize]));
        assert_eq!(vals[m.item(below.unwrap()) as usize], 30);
        assert_eq!(vals[m.item(above.unwrap()) as usize], 40);
        // probe below the minimum
        let (below, above) = m.find_neighbours(|other| 5u32.cmp(&vals[other as usize]));
        assert!(below.is_none());
        assert_eq!(vals[m.item(above.unwrap()) as usize], 10);
    }

    #[test]
    fn prev_next_roundtrip() {
        let vals = [3u32, 1, 4, 1, 5, 9, 2, 6];
        let mut m = Map::new();
        for i in 0..vals.len() as u32 {
            m.insert_with(i, |other| vals[i as usize].cmp(&vals[other as usize]));
        }
        let mut cur = m.min().unwrap();
        let mut count = 1;
        while let Some(nx) = m.next(cur) {
            assert_eq!(m.item(m.prev(nx).unwrap()), m.item(cur));
            cur = nx;
            count += 1;
        }
        assert_eq!(count, vals.len());
    }
}
