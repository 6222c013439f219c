//! Atlas: mapping mesh points to contiguous slices of a flat DOF array.
//!
//! Offsets are assigned in insertion order, so the layout of the global
//! vector is fully determined by the order in which points are inserted.

use std::collections::BTreeMap;

use crate::mesh_error::MeshFormsError;
use crate::topology::point::PointId;

/// Point to `(offset, len)` map with insertion-order offsets.
///
/// # Invariants
///
/// - Each point appears exactly once in `order`.
/// - `map` contains precisely the keys listed in `order`.
/// - Every slice has `len > 0`; offsets are contiguous in insertion order and
///   `total_len` equals the sum of all lengths.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Atlas {
    map: BTreeMap<PointId, (usize, usize)>,
    order: Vec<PointId>,
    total_len: usize,
}

impl Atlas {
    /// Inserts a new point with a slice of length `len` and returns its offset.
    ///
    /// # Errors
    /// `ZeroLengthSlice` if `len == 0`, `DuplicatePoint(p)` if `p` is present.
    ///
    /// ```rust
    /// # fn try_main() -> Result<(), mesh_forms::mesh_error::MeshFormsError> {
    /// use mesh_forms::data::atlas::Atlas;
    /// use mesh_forms::topology::point::PointId;
    /// let mut atlas = Atlas::default();
    /// let offset = atlas.try_insert(PointId::new(7)?, 3)?;
    /// assert_eq!(offset, 0);
    /// assert_eq!(atlas.total_len(), 3);
    /// # Ok(())
    /// # }
    /// # try_main().unwrap();
    /// ```
    pub fn try_insert(&mut self, p: PointId, len: usize) -> Result<usize, MeshFormsError> {
        if len == 0 {
            return Err(MeshFormsError::ZeroLengthSlice);
        }
        if self.map.contains_key(&p) {
            return Err(MeshFormsError::DuplicatePoint(p));
        }
        let offset = self.total_len;
        self.map.insert(p, (offset, len));
        self.order.push(p);
        self.total_len += len;
        #[cfg(any(debug_assertions, feature = "check-invariants"))]
        debug_assert!(self.validate_invariants().is_ok());
        Ok(offset)
    }

    /// `(offset, len)` of `p`, if present.
    #[inline]
    pub fn get(&self, p: PointId) -> Option<(usize, usize)> {
        self.map.get(&p).copied()
    }

    #[inline]
    pub fn contains(&self, p: PointId) -> bool {
        self.map.contains_key(&p)
    }

    /// Number of registered points (not DOFs).
    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Size of the flat buffer described by the atlas.
    #[inline]
    pub fn total_len(&self) -> usize {
        self.total_len
    }

    /// Points in insertion order.
    pub fn points(&self) -> impl Iterator<Item = PointId> + '_ {
        self.order.iter().copied()
    }

    /// Checks the structural invariants listed on the type.
    pub fn validate_invariants(&self) -> Result<(), MeshFormsError> {
        let mut expected = 0;
        for p in &self.order {
            let (offset, len) = self
                .map
                .get(p)
                .copied()
                .ok_or(MeshFormsError::MissingSectionPoint(*p))?;
            if len == 0 {
                return Err(MeshFormsError::ZeroLengthSlice);
            }
            if offset != expected {
                return Err(MeshFormsError::InvalidGeometry(format!(
                    "atlas offset of {p} is {offset}, expected {expected}"
                )));
            }
            expected += len;
        }
        if expected != self.total_len || self.map.len() != self.order.len() {
            return Err(MeshFormsError::InvalidGeometry(
                "atlas total length out of sync".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(id: u64) -> PointId {
        PointId::new(id).unwrap()
    }

    #[test]
    fn offsets_follow_insertion_order() {
        let mut a = Atlas::default();
        assert_eq!(a.try_insert(p(5), 2).unwrap(), 0);
        assert_eq!(a.try_insert(p(1), 3).unwrap(), 2);
        assert_eq!(a.get(p(1)), Some((2, 3)));
        assert_eq!(a.points().collect::<Vec<_>>(), vec![p(5), p(1)]);
        assert_eq!(a.total_len(), 5);
        a.validate_invariants().unwrap();
    }

    #[test]
    fn rejects_duplicates_and_empty_slices() {
        let mut a = Atlas::default();
        a.try_insert(p(1), 1).unwrap();
        assert_eq!(a.try_insert(p(1), 1), Err(MeshFormsError::DuplicatePoint(p(1))));
        assert_eq!(a.try_insert(p(2), 0), Err(MeshFormsError::ZeroLengthSlice));
    }

    #[test]
    fn serializes_with_serde() {
        let mut a = Atlas::default();
        a.try_insert(p(3), 2).unwrap();
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["total_len"], 2);
        assert_eq!(json["order"], serde_json::json!([3]));
    }
}
