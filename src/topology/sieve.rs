//! # Sieve: bidirectional mesh topology
//!
//! A sieve stores the incidence arrows of a mesh: an arrow `src -> dst` means
//! `dst` lies in the boundary (cone) of `src`. Cells point at their faces,
//! faces at their vertices. The trait offers the default traversals used by
//! the closure accessor; `InMemorySieve` is the map-backed implementation.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use once_cell::sync::OnceCell;

use crate::topology::point::PointId;

/// Directed incidence relation over mesh points.
pub trait Sieve {
    /// Points directly below `p`, in insertion order.
    fn cone(&self, p: PointId) -> &[PointId];

    /// Points directly above `p`, in insertion order.
    fn support(&self, p: PointId) -> &[PointId];

    /// Every point known to the sieve, ascending.
    fn points(&self) -> Vec<PointId>;

    /// Transitive closure of `p` following cone arrows.
    ///
    /// The order is breadth-first: `p`, then its cone, then the cones of those
    /// points, each point reported the first time it is seen. For cells built
    /// from oriented edges this reproduces the local vertex numbering used by
    /// the reference basis.
    fn closure(&self, p: PointId) -> Vec<PointId> {
        let mut out = vec![p];
        let mut seen = BTreeSet::from([p]);
        let mut queue = VecDeque::from([p]);
        while let Some(q) = queue.pop_front() {
            for &r in self.cone(q) {
                if seen.insert(r) {
                    out.push(r);
                    queue.push_back(r);
                }
            }
        }
        out
    }

    /// Transitive star of `p` following support arrows, breadth-first.
    fn star(&self, p: PointId) -> Vec<PointId> {
        let mut out = vec![p];
        let mut seen = BTreeSet::from([p]);
        let mut queue = VecDeque::from([p]);
        while let Some(q) = queue.pop_front() {
            for &r in self.support(q) {
                if seen.insert(r) {
                    out.push(r);
                    queue.push_back(r);
                }
            }
        }
        out
    }
}

/// Map-backed sieve with a lazily computed depth stratification.
#[derive(Clone, Debug, Default)]
pub struct InMemorySieve {
    cones: BTreeMap<PointId, Vec<PointId>>,
    supports: BTreeMap<PointId, Vec<PointId>>,
    /// `strata[d]` holds the points at depth `d` (vertices have depth 0).
    /// Invalidated on mutation.
    strata: OnceCell<Vec<Vec<PointId>>>,
}

impl InMemorySieve {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `p` without any arrows.
    pub fn add_point(&mut self, p: PointId) {
        self.cones.entry(p).or_default();
        self.supports.entry(p).or_default();
        self.strata.take();
    }

    /// Inserts the arrow `src -> dst`. Duplicate arrows are ignored.
    pub fn add_arrow(&mut self, src: PointId, dst: PointId) {
        let cone = self.cones.entry(src).or_default();
        if cone.contains(&dst) {
            return;
        }
        cone.push(dst);
        self.supports.entry(dst).or_default().push(src);
        self.cones.entry(dst).or_default();
        self.supports.entry(src).or_default();
        self.strata.take();
    }

    /// Inserts `src -> dst` for every `dst` of `cone`, keeping the given order.
    pub fn set_cone(&mut self, src: PointId, cone: impl IntoIterator<Item = PointId>) {
        for dst in cone {
            self.add_arrow(src, dst);
        }
    }

    /// Points grouped by depth, computed once and cached.
    pub fn depth_strata(&self) -> &[Vec<PointId>] {
        self.strata.get_or_init(|| {
            let mut depth: BTreeMap<PointId, usize> = BTreeMap::new();
            // Points are visited in ascending order; depth is resolved
            // recursively through the cone, which is acyclic for a mesh.
            fn resolve(
                s: &InMemorySieve,
                p: PointId,
                depth: &mut BTreeMap<PointId, usize>,
            ) -> usize {
                if let Some(&d) = depth.get(&p) {
                    return d;
                }
                let d = s
                    .cone(p)
                    .iter()
                    .map(|&q| resolve(s, q, depth) + 1)
                    .max()
                    .unwrap_or(0);
                depth.insert(p, d);
                d
            }
            for &p in self.cones.keys() {
                resolve(self, p, &mut depth);
            }
            let max = depth.values().copied().max().unwrap_or(0);
            let mut strata = vec![Vec::new(); max + 1];
            for (p, d) in depth {
                strata[d].push(p);
            }
            strata
        })
    }
}

impl Sieve for InMemorySieve {
    fn cone(&self, p: PointId) -> &[PointId] {
        self.cones.get(&p).map_or(&[], Vec::as_slice)
    }

    fn support(&self, p: PointId) -> &[PointId] {
        self.supports.get(&p).map_or(&[], Vec::as_slice)
    }

    fn points(&self) -> Vec<PointId> {
        self.cones.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(id: u64) -> PointId {
        PointId::new(id).unwrap()
    }

    /// One quad (1) with edges 6..9 and vertices 2..5 oriented counterclockwise.
    fn quad() -> InMemorySieve {
        let mut s = InMemorySieve::new();
        s.set_cone(p(1), [p(6), p(7), p(8), p(9)]);
        s.set_cone(p(6), [p(2), p(3)]);
        s.set_cone(p(7), [p(3), p(4)]);
        s.set_cone(p(8), [p(5), p(4)]);
        s.set_cone(p(9), [p(2), p(5)]);
        s
    }

    #[test]
    fn closure_is_breadth_first() {
        let s = quad();
        assert_eq!(
            s.closure(p(1)),
            vec![p(1), p(6), p(7), p(8), p(9), p(2), p(3), p(4), p(5)]
        );
    }

    #[test]
    fn star_and_support() {
        let s = quad();
        assert_eq!(s.support(p(3)), &[p(6), p(7)]);
        assert_eq!(s.star(p(3)), vec![p(3), p(6), p(7), p(1)]);
    }

    #[test]
    fn strata_by_depth() {
        let mut s = quad();
        let strata = s.depth_strata();
        assert_eq!(strata.len(), 3);
        assert_eq!(strata[0], vec![p(2), p(3), p(4), p(5)]);
        assert_eq!(strata[2], vec![p(1)]);
        s.add_point(p(10));
        assert_eq!(s.depth_strata()[0].len(), 5);
    }

    #[test]
    fn duplicate_arrows_ignored() {
        let mut s = InMemorySieve::new();
        s.add_arrow(p(1), p(2));
        s.add_arrow(p(1), p(2));
        assert_eq!(s.cone(p(1)), &[p(2)]);
        assert_eq!(s.support(p(2)), &[p(1)]);
    }
}
