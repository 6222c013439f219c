//! Point label storage for topology metadata.
//!
//! Labels map `PointId` to integer tags, grouped by label name. Boundary
//! names and material regions are both labels; a boundary is the stratum of
//! its label with value 1.

use std::collections::{BTreeMap, BTreeSet};

use crate::topology::point::PointId;

/// Named integer labels for mesh points.
#[derive(Clone, Debug, Default)]
pub struct LabelSet {
    labels: BTreeMap<String, BTreeMap<PointId, i32>>,
}

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns `value` for `point` under label `name`.
    ///
    /// Returns the previous value, if any.
    pub fn set_label(&mut self, point: PointId, name: &str, value: i32) -> Option<i32> {
        self.labels
            .entry(name.to_string())
            .or_default()
            .insert(point, value)
    }

    /// Returns the label value for `point` under `name`.
    pub fn get_label(&self, point: PointId, name: &str) -> Option<i32> {
        self.labels
            .get(name)
            .and_then(|map| map.get(&point).copied())
    }

    /// True when a label called `name` exists.
    pub fn has_label(&self, name: &str) -> bool {
        self.labels.contains_key(name)
    }

    /// Label names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.labels.keys().map(String::as_str)
    }

    /// Returns all points with label `name == value` in ascending order.
    pub fn stratum_points(&self, name: &str, value: i32) -> Vec<PointId> {
        self.labels.get(name).map_or_else(Vec::new, |map| {
            map.iter()
                .filter_map(|(&point, &v)| (v == value).then_some(point))
                .collect()
        })
    }

    /// Returns the number of points with label `name == value`.
    pub fn stratum_size(&self, name: &str, value: i32) -> usize {
        self.labels
            .get(name)
            .map_or(0, |map| map.values().filter(|&&v| v == value).count())
    }

    /// Distinct values stored for label `name`, sorted ascending.
    pub fn stratum_values(&self, name: &str) -> BTreeSet<i32> {
        self.labels
            .get(name)
            .map_or_else(BTreeSet::new, |map| map.values().copied().collect())
    }
}
