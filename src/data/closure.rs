//! Closure accessor: moves DOFs between algebraic objects and per-point buffers.
//!
//! The closure of a point is the point itself plus everything in its
//! topological boundary. Its DOF block is ordered by the section's
//! [`ClosureLayout`]: field-major lists every DOF of the lowest field id over
//! the closure before moving to the next field; point-major lists every DOF
//! of the first closure point before moving to the next point. Within one
//! field on one point, components are contiguous.

use std::collections::BTreeMap;

use crate::algebra::{InsertMode, MatrixLike, VectorLike};
use crate::data::section::{ClosureLayout, Section};
use crate::mesh_error::MeshFormsError;
use crate::topology::point::PointId;
use crate::topology::sieve::Sieve;

/// Positions of each field's DOFs inside a closure buffer.
///
/// `positions[f][b * nc + c]` is the buffer index of component `c` on the
/// `b`-th closure point carrying field `f`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClosureMap {
    pub positions: BTreeMap<usize, Vec<usize>>,
}

impl ClosureMap {
    /// Positions of `field`, empty when the field is absent from the closure.
    pub fn field(&self, field: usize) -> &[usize] {
        self.positions.get(&field).map_or(&[], Vec::as_slice)
    }
}

/// Read/write access to closures under one section.
#[derive(Clone, Copy, Debug)]
pub struct ClosureAccessor<'a, S: Sieve> {
    sieve: &'a S,
    section: &'a Section,
}

impl<'a, S: Sieve> ClosureAccessor<'a, S> {
    pub fn new(sieve: &'a S, section: &'a Section) -> Self {
        Self { sieve, section }
    }

    pub fn section(&self) -> &'a Section {
        self.section
    }

    /// Closure points carrying DOFs, in closure order.
    pub fn closure_points(&self, p: PointId) -> Vec<PointId> {
        self.sieve
            .closure(p)
            .into_iter()
            .filter(|q| self.section.contains(*q))
            .collect()
    }

    /// Global indices of the closure DOFs, in layout order.
    pub fn closure_indices(&self, p: PointId) -> Vec<usize> {
        let mut out = Vec::new();
        self.walk(p, |global, _| out.push(global));
        out
    }

    /// Per-field positions inside the closure buffer of `p`.
    pub fn closure_map(&self, p: PointId) -> ClosureMap {
        let mut map = ClosureMap::default();
        let mut pos = 0;
        self.walk(p, |_, field| {
            map.positions.entry(field).or_default().push(pos);
            pos += 1;
        });
        map
    }

    /// Number of DOFs on the closure of `p`.
    pub fn closure_size(&self, p: PointId) -> usize {
        self.closure_points(p)
            .iter()
            .filter_map(|&q| self.section.atlas().get(q))
            .map(|(_, len)| len)
            .sum()
    }

    /// Visits `(global index, field)` for every closure DOF in layout order.
    fn walk(&self, p: PointId, mut visit: impl FnMut(usize, usize)) {
        let points = self.closure_points(p);
        let mut emit = |q: PointId, field: usize| {
            if let Some((start, len)) = self.section.field_offset(q, field) {
                for i in start..start + len {
                    visit(i, field);
                }
            }
        };
        match self.section.layout() {
            ClosureLayout::FieldMajor => {
                for &field in self.section.field_ids() {
                    for &q in &points {
                        emit(q, field);
                    }
                }
            }
            ClosureLayout::PointMajor => {
                for &q in &points {
                    for fd in self.section.field_dofs(q) {
                        emit(q, fd.field);
                    }
                }
            }
        }
    }

    /// Reads the closure of `p` from `v`.
    pub fn get_closure<V: VectorLike + ?Sized>(
        &self,
        v: &V,
        p: PointId,
    ) -> Result<Vec<f64>, MeshFormsError> {
        let idx = self.closure_indices(p);
        let mut out = vec![0.0; idx.len()];
        v.get_values(&idx, &mut out)?;
        Ok(out)
    }

    /// Reads exactly `N` closure values.
    ///
    /// # Panics
    /// When the closure of `p` does not hold exactly `N` DOFs; a mismatch is
    /// a programming error in the caller.
    pub fn get_closure_fixed<const N: usize, V: VectorLike + ?Sized>(
        &self,
        v: &V,
        p: PointId,
    ) -> Result<[f64; N], MeshFormsError> {
        let idx = self.closure_indices(p);
        assert_eq!(
            idx.len(),
            N,
            "closure of point {p} has {} dofs, requested {N}",
            idx.len()
        );
        let mut out = [0.0; N];
        v.get_values(&idx, &mut out)?;
        Ok(out)
    }

    /// Writes `vals` into the closure of `p`.
    pub fn set_closure<V: VectorLike + ?Sized>(
        &self,
        v: &mut V,
        p: PointId,
        vals: &[f64],
        mode: InsertMode,
    ) -> Result<(), MeshFormsError> {
        let idx = self.closure_indices(p);
        if idx.len() != vals.len() {
            return Err(MeshFormsError::ClosureSizeMismatch {
                point: p,
                expected: idx.len(),
                found: vals.len(),
            });
        }
        v.set_values(&idx, vals, mode)
    }

    /// Writes exactly `N` closure values.
    ///
    /// # Panics
    /// When the closure of `p` does not hold exactly `N` DOFs.
    pub fn set_closure_fixed<const N: usize, V: VectorLike + ?Sized>(
        &self,
        v: &mut V,
        p: PointId,
        vals: &[f64; N],
        mode: InsertMode,
    ) -> Result<(), MeshFormsError> {
        let idx = self.closure_indices(p);
        assert_eq!(
            idx.len(),
            N,
            "closure of point {p} has {} dofs, provided {N}",
            idx.len()
        );
        v.set_values(&idx, vals, mode)
    }

    /// Writes a dense row-major block coupling the closures of `rows` and `cols`.
    pub fn set_closure_matrix<M: MatrixLike + ?Sized>(
        &self,
        m: &mut M,
        rows: &[PointId],
        cols: &[PointId],
        block: &[f64],
        mode: InsertMode,
    ) -> Result<(), MeshFormsError> {
        let ri: Vec<usize> = rows.iter().flat_map(|&p| self.closure_indices(p)).collect();
        let ci: Vec<usize> = cols.iter().flat_map(|&p| self.closure_indices(p)).collect();
        if ri.len() * ci.len() != block.len() {
            return Err(match rows.first().or(cols.first()) {
                Some(&point) => MeshFormsError::ClosureSizeMismatch {
                    point,
                    expected: ri.len() * ci.len(),
                    found: block.len(),
                },
                None => MeshFormsError::IndexOutOfBounds {
                    index: block.len(),
                    len: 0,
                },
            });
        }
        m.set_values(&ri, &ci, block, mode)
    }

    /// Reads the DOFs of `p` alone (no closure).
    pub fn get_point_values<V: VectorLike + ?Sized>(
        &self,
        v: &V,
        p: PointId,
    ) -> Result<Vec<f64>, MeshFormsError> {
        let (offset, len) = self.section.offset(p)?;
        let idx: Vec<usize> = (offset..offset + len).collect();
        let mut out = vec![0.0; len];
        v.get_values(&idx, &mut out)?;
        Ok(out)
    }

    /// Writes the DOFs of `p` alone (no closure).
    pub fn set_point_values<V: VectorLike + ?Sized>(
        &self,
        v: &mut V,
        p: PointId,
        vals: &[f64],
        mode: InsertMode,
    ) -> Result<(), MeshFormsError> {
        let (offset, len) = self.section.offset(p)?;
        if vals.len() != len {
            return Err(MeshFormsError::ClosureSizeMismatch {
                point: p,
                expected: len,
                found: vals.len(),
            });
        }
        let idx: Vec<usize> = (offset..offset + len).collect();
        v.set_values(&idx, vals, mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::{DenseMatrix, DenseVector};
    use crate::data::section::SectionBuilder;
    use crate::topology::sieve::InMemorySieve;

    fn p(id: u64) -> PointId {
        PointId::new(id).unwrap()
    }

    /// Segment 1 with vertices 2, 3. Field 0 (nc=1) on vertices, field 1
    /// (nc=2) on vertices, field 2 (nc=1) on the cell.
    fn setup(layout: ClosureLayout) -> (InMemorySieve, Section) {
        let mut s = InMemorySieve::new();
        s.set_cone(p(1), [p(2), p(3)]);
        let mut b = SectionBuilder::new();
        b.add_dofs(p(1), 2, 1);
        for v in [p(2), p(3)] {
            b.add_dofs(v, 0, 1).add_dofs(v, 1, 2);
        }
        (s, b.build(layout).unwrap())
    }

    #[test]
    fn field_major_indices() {
        let (s, sec) = setup(ClosureLayout::FieldMajor);
        let acc = ClosureAccessor::new(&s, &sec);
        // cell [0], v2 [1,2,3], v3 [4,5,6]
        assert_eq!(acc.closure_indices(p(1)), vec![1, 4, 2, 3, 5, 6, 0]);
        let map = acc.closure_map(p(1));
        assert_eq!(map.field(0), &[0, 1]);
        assert_eq!(map.field(1), &[2, 3, 4, 5]);
        assert_eq!(map.field(2), &[6]);
        assert_eq!(acc.closure_size(p(1)), 7);
    }

    #[test]
    fn point_major_indices() {
        let (s, sec) = setup(ClosureLayout::PointMajor);
        let acc = ClosureAccessor::new(&s, &sec);
        assert_eq!(acc.closure_indices(p(1)), vec![0, 1, 2, 3, 4, 5, 6]);
        let map = acc.closure_map(p(1));
        assert_eq!(map.field(1), &[2, 3, 5, 6]);
    }

    #[test]
    fn set_get_round_trip_and_add() {
        let (s, sec) = setup(ClosureLayout::FieldMajor);
        let acc = ClosureAccessor::new(&s, &sec);
        let mut v = DenseVector::new(sec.len());
        let vals = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        acc.set_closure_fixed(&mut v, p(1), &vals, InsertMode::Insert).unwrap();
        assert_eq!(acc.get_closure_fixed::<7, _>(&v, p(1)).unwrap(), vals);
        acc.set_closure(&mut v, p(2), &[1.0, 1.0, 1.0], InsertMode::Add).unwrap();
        assert_eq!(acc.get_point_values(&v, p(2)).unwrap(), vec![2.0, 4.0, 5.0]);
    }

    #[test]
    fn size_mismatch_is_an_error() {
        let (s, sec) = setup(ClosureLayout::FieldMajor);
        let acc = ClosureAccessor::new(&s, &sec);
        let mut v = DenseVector::new(sec.len());
        assert_eq!(
            acc.set_closure(&mut v, p(1), &[1.0], InsertMode::Insert),
            Err(MeshFormsError::ClosureSizeMismatch {
                point: p(1),
                expected: 7,
                found: 1
            })
        );
    }

    #[test]
    #[should_panic(expected = "closure of point 1 has 7 dofs")]
    fn fixed_size_mismatch_panics() {
        let (s, sec) = setup(ClosureLayout::FieldMajor);
        let acc = ClosureAccessor::new(&s, &sec);
        let v = DenseVector::new(sec.len());
        let _ = acc.get_closure_fixed::<3, _>(&v, p(1));
    }

    #[test]
    fn matrix_block() {
        let mut s = InMemorySieve::new();
        s.set_cone(p(1), [p(2), p(3)]);
        let mut b = SectionBuilder::new();
        b.add_dofs(p(2), 0, 1).add_dofs(p(3), 0, 1);
        let sec = b.build(ClosureLayout::FieldMajor).unwrap();
        let acc = ClosureAccessor::new(&s, &sec);
        let mut m = DenseMatrix::new(2, 2);
        acc.set_closure_matrix(&mut m, &[p(1)], &[p(1)], &[1.0, -1.0, -1.0, 1.0], InsertMode::Add)
            .unwrap();
        acc.set_closure_matrix(&mut m, &[p(1)], &[p(1)], &[1.0, -1.0, -1.0, 1.0], InsertMode::Add)
            .unwrap();
        assert_eq!(m.as_slice(), &[2.0, -2.0, -2.0, 2.0]);
    }
}
