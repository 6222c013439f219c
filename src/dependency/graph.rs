//! Dependency graph over named quantities.
//!
//! An edge `a -> b` records that `a` depends on `b`. Traversals start from a
//! set of roots and visit children in ascending order, which makes them
//! deterministic: the same roots on an unchanged graph always give the same
//! sequence. Every traversal first checks the reachable subgraph for cycles
//! and refuses to produce a partial order if one exists.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt::Debug;

use itertools::Itertools;

use crate::mesh_error::MeshFormsError;

/// Adjacency map `node -> {nodes it depends on}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DependencyGraph<T: Ord + Clone> {
    deps: BTreeMap<T, BTreeSet<T>>,
}

impl<T: Ord + Clone> Default for DependencyGraph<T> {
    fn default() -> Self {
        Self {
            deps: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Active,
    Done,
}

impl<T: Ord + Clone + Debug> DependencyGraph<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node without edges.
    pub fn add_node(&mut self, a: T) {
        self.deps.entry(a).or_default();
    }

    /// Records that `a` depends on `b`.
    pub fn add_edge(&mut self, a: T, b: T) {
        self.deps.entry(b.clone()).or_default();
        self.deps.entry(a).or_default().insert(b);
    }

    pub fn has_node(&self, a: &T) -> bool {
        self.deps.contains_key(a)
    }

    pub fn has_edge(&self, a: &T, b: &T) -> bool {
        self.deps.get(a).is_some_and(|s| s.contains(b))
    }

    /// Direct dependencies of `a`, ascending.
    pub fn dependencies(&self, a: &T) -> impl Iterator<Item = &T> {
        self.deps.get(a).into_iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.deps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deps.is_empty()
    }

    pub fn clear(&mut self) {
        self.deps.clear();
    }

    /// Depth-first visitation order from `roots`.
    ///
    /// Uses an explicit stack; children are pushed in ascending order, so the
    /// largest child is visited first.
    pub fn dfs(&self, roots: impl IntoIterator<Item = T>) -> Result<Vec<T>, MeshFormsError> {
        let roots: Vec<T> = roots.into_iter().collect();
        self.check_acyclic(&roots)?;
        let mut visited = BTreeSet::new();
        let mut out = Vec::new();
        let mut stack = roots;
        while let Some(v) = stack.pop() {
            if !visited.insert(v.clone()) {
                continue;
            }
            stack.extend(self.dependencies(&v).filter(|c| !visited.contains(*c)).cloned());
            out.push(v);
        }
        Ok(out)
    }

    /// Breadth-first visitation order from `roots`.
    pub fn bfs(&self, roots: impl IntoIterator<Item = T>) -> Result<Vec<T>, MeshFormsError> {
        let roots: Vec<T> = roots.into_iter().collect();
        self.check_acyclic(&roots)?;
        let mut seen: BTreeSet<T> = BTreeSet::new();
        let mut queue = VecDeque::new();
        for r in roots {
            if seen.insert(r.clone()) {
                queue.push_back(r);
            }
        }
        let mut out = Vec::new();
        while let Some(v) = queue.pop_front() {
            for c in self.dependencies(&v) {
                if seen.insert(c.clone()) {
                    queue.push_back(c.clone());
                }
            }
            out.push(v);
        }
        Ok(out)
    }

    /// Order in which the nodes reachable from `roots` can be computed:
    /// every node appears after all of its dependencies.
    pub fn evaluation_order(
        &self,
        roots: impl IntoIterator<Item = T>,
    ) -> Result<Vec<T>, MeshFormsError> {
        let roots: Vec<T> = roots.into_iter().collect();
        self.check_acyclic(&roots)?;
        let mut done = BTreeSet::new();
        let mut out = Vec::new();
        for r in roots {
            self.post_order(r, &mut done, &mut out);
        }
        Ok(out)
    }

    fn post_order(&self, v: T, done: &mut BTreeSet<T>, out: &mut Vec<T>) {
        if done.contains(&v) {
            return;
        }
        done.insert(v.clone());
        for c in self.dependencies(&v) {
            self.post_order(c.clone(), done, out);
        }
        out.push(v);
    }

    /// Fails with `CyclicDependency` if a cycle is reachable from `roots`.
    ///
    /// A node reached again while it is still on the current path closes a
    /// cycle; reaching a finished node (a diamond) is fine.
    pub fn check_acyclic(&self, roots: &[T]) -> Result<(), MeshFormsError> {
        let mut marks: BTreeMap<T, Mark> = BTreeMap::new();
        for r in roots {
            let mut path = Vec::new();
            self.visit(r, &mut marks, &mut path)?;
        }
        Ok(())
    }

    fn visit(
        &self,
        v: &T,
        marks: &mut BTreeMap<T, Mark>,
        path: &mut Vec<T>,
    ) -> Result<(), MeshFormsError> {
        match marks.get(v) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Active) => {
                let start = path.iter().position(|p| p == v).unwrap_or(0);
                let cycle = path[start..]
                    .iter()
                    .chain(std::iter::once(v))
                    .map(|p| format!("{p:?}"))
                    .join(" -> ");
                log::error!("Cyclic dependency detected: {cycle}");
                return Err(MeshFormsError::CyclicDependency(cycle));
            }
            None => {}
        }
        marks.insert(v.clone(), Mark::Active);
        path.push(v.clone());
        for c in self.dependencies(v) {
            self.visit(c, marks, path)?;
        }
        path.pop();
        marks.insert(v.clone(), Mark::Done);
        Ok(())
    }
}
