//! Vector contract and a dense implementation.

use std::ops::{Index, IndexMut};

use crate::algebra::InsertMode;
use crate::mesh_error::MeshFormsError;

/// Indexed access to an algebraic vector.
pub trait VectorLike {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads `out[i] = self[idx[i]]`.
    fn get_values(&self, idx: &[usize], out: &mut [f64]) -> Result<(), MeshFormsError>;

    /// Writes `vals[i]` into `self[idx[i]]` according to `mode`.
    fn set_values(
        &mut self,
        idx: &[usize],
        vals: &[f64],
        mode: InsertMode,
    ) -> Result<(), MeshFormsError>;

    /// Sets every entry to zero.
    fn zero(&mut self);

    /// Start of a batch of writes. No-op for local storage.
    fn assembly_begin(&mut self) {}

    /// End of a batch of writes. No-op for local storage.
    fn assembly_end(&mut self) {}

    /// Contiguous view of the local entries.
    fn as_slice(&self) -> &[f64];
}

/// Heap-allocated dense vector.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DenseVector {
    data: Vec<f64>,
}

impl DenseVector {
    /// Zero vector of length `n`.
    pub fn new(n: usize) -> Self {
        Self { data: vec![0.0; n] }
    }

    pub fn from_vec(data: Vec<f64>) -> Self {
        Self { data }
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    fn check(&self, i: usize) -> Result<(), MeshFormsError> {
        if i < self.data.len() {
            Ok(())
        } else {
            Err(MeshFormsError::IndexOutOfBounds {
                index: i,
                len: self.data.len(),
            })
        }
    }
}

impl VectorLike for DenseVector {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn get_values(&self, idx: &[usize], out: &mut [f64]) -> Result<(), MeshFormsError> {
        for (&i, o) in idx.iter().zip(out.iter_mut()) {
            self.check(i)?;
            *o = self.data[i];
        }
        Ok(())
    }

    fn set_values(
        &mut self,
        idx: &[usize],
        vals: &[f64],
        mode: InsertMode,
    ) -> Result<(), MeshFormsError> {
        for (&i, &v) in idx.iter().zip(vals) {
            self.check(i)?;
            mode.apply(&mut self.data[i], v);
        }
        Ok(())
    }

    fn zero(&mut self) {
        self.data.iter_mut().for_each(|v| *v = 0.0);
    }

    fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

impl Index<usize> for DenseVector {
    type Output = f64;

    fn index(&self, i: usize) -> &f64 {
        &self.data[i]
    }
}

impl IndexMut<usize> for DenseVector {
    fn index_mut(&mut self, i: usize) -> &mut f64 {
        &mut self.data[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_add() {
        let mut v = DenseVector::new(3);
        v.set_values(&[0, 2], &[1.0, 2.0], InsertMode::Insert).unwrap();
        v.set_values(&[2], &[0.5], InsertMode::Add).unwrap();
        assert_eq!(v.as_slice(), &[1.0, 0.0, 2.5]);
        let mut out = [0.0; 2];
        v.get_values(&[2, 0], &mut out).unwrap();
        assert_eq!(out, [2.5, 1.0]);
    }

    #[test]
    fn out_of_bounds() {
        let mut v = DenseVector::new(1);
        assert_eq!(
            v.set_values(&[4], &[1.0], InsertMode::Add),
            Err(MeshFormsError::IndexOutOfBounds { index: 4, len: 1 })
        );
    }
}
