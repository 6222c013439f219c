//! Matrix contract and a dense row-major implementation.

use crate::algebra::InsertMode;
use crate::mesh_error::MeshFormsError;

/// Indexed block access to an algebraic matrix.
pub trait MatrixLike {
    fn nrows(&self) -> usize;
    fn ncols(&self) -> usize;

    /// Entry `(i, j)`.
    fn get(&self, i: usize, j: usize) -> Result<f64, MeshFormsError>;

    /// Writes the row-major `rows.len() x cols.len()` block.
    fn set_values(
        &mut self,
        rows: &[usize],
        cols: &[usize],
        block: &[f64],
        mode: InsertMode,
    ) -> Result<(), MeshFormsError>;

    /// Zeros the given rows and puts `diag` on their diagonal.
    fn zero_rows_diagonal(&mut self, rows: &[usize], diag: f64) -> Result<(), MeshFormsError>;

    fn zero_entries(&mut self);

    fn assembly_begin(&mut self) {}

    fn assembly_end(&mut self) {}
}

/// Dense row-major matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseMatrix {
    nrows: usize,
    ncols: usize,
    data: Vec<f64>,
}

impl DenseMatrix {
    pub fn new(nrows: usize, ncols: usize) -> Self {
        Self {
            nrows,
            ncols,
            data: vec![0.0; nrows * ncols],
        }
    }

    /// Row `i` as a slice.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.ncols..(i + 1) * self.ncols]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// `y = A x`.
    pub fn mult(&self, x: &[f64]) -> Vec<f64> {
        (0..self.nrows)
            .map(|i| self.row(i).iter().zip(x).map(|(a, b)| a * b).sum())
            .collect()
    }

    fn check(&self, i: usize, j: usize) -> Result<(), MeshFormsError> {
        if i >= self.nrows {
            return Err(MeshFormsError::IndexOutOfBounds {
                index: i,
                len: self.nrows,
            });
        }
        if j >= self.ncols {
            return Err(MeshFormsError::IndexOutOfBounds {
                index: j,
                len: self.ncols,
            });
        }
        Ok(())
    }
}

impl MatrixLike for DenseMatrix {
    fn nrows(&self) -> usize {
        self.nrows
    }

    fn ncols(&self) -> usize {
        self.ncols
    }

    fn get(&self, i: usize, j: usize) -> Result<f64, MeshFormsError> {
        self.check(i, j)?;
        Ok(self.data[i * self.ncols + j])
    }

    fn set_values(
        &mut self,
        rows: &[usize],
        cols: &[usize],
        block: &[f64],
        mode: InsertMode,
    ) -> Result<(), MeshFormsError> {
        if block.len() != rows.len() * cols.len() {
            return Err(MeshFormsError::IndexOutOfBounds {
                index: block.len(),
                len: rows.len() * cols.len(),
            });
        }
        for (r, &i) in rows.iter().enumerate() {
            for (c, &j) in cols.iter().enumerate() {
                self.check(i, j)?;
                mode.apply(&mut self.data[i * self.ncols + j], block[r * cols.len() + c]);
            }
        }
        Ok(())
    }

    fn zero_rows_diagonal(&mut self, rows: &[usize], diag: f64) -> Result<(), MeshFormsError> {
        for &i in rows {
            self.check(i, i.min(self.ncols.saturating_sub(1)))?;
            let ncols = self.ncols;
            self.data[i * ncols..(i + 1) * ncols]
                .iter_mut()
                .for_each(|v| *v = 0.0);
            if i < ncols {
                self.data[i * ncols + i] = diag;
            }
        }
        Ok(())
    }

    fn zero_entries(&mut self) {
        self.data.iter_mut().for_each(|v| *v = 0.0);
    }
}
