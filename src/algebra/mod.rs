//! Read/write contracts of the algebraic collaborator.
//!
//! The assembly engine never owns solver storage. It talks to vectors and
//! matrices through [`VectorLike`] and [`MatrixLike`], issuing indexed writes
//! with an explicit [`InsertMode`] and bracketing them with assembly calls.
//! Dense implementations are provided for tests and small problems.

pub mod matrix;
pub mod vector;

pub use matrix::{DenseMatrix, MatrixLike};
pub use vector::{DenseVector, VectorLike};

/// How written values combine with existing entries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum InsertMode {
    /// Overwrite existing entries.
    #[default]
    Insert,
    /// Accumulate into existing entries.
    Add,
}

impl InsertMode {
    #[inline]
    pub(crate) fn apply(self, slot: &mut f64, value: f64) {
        match self {
            InsertMode::Insert => *slot = value,
            InsertMode::Add => *slot += value,
        }
    }
}
