//! `PointId`: a strong, zero-cost handle for mesh entities
//!
//! Every cell, face, edge and vertex of a mesh is addressed by a `PointId`.
//! The handle wraps a nonzero `u64`; 0 is reserved as an invalid value so
//! `Option<PointId>` costs nothing extra.

use crate::mesh_error::MeshFormsError;
use std::{fmt, num::NonZeroU64};

/// Opaque identifier of a mesh point.
///
/// This type is `repr(transparent)` over `NonZeroU64` and can be handed to a
/// C solver exactly like a `u64`.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct PointId(NonZeroU64);

impl PointId {
    /// Creates a new `PointId`, rejecting the reserved value 0.
    ///
    /// ```rust
    /// # use mesh_forms::topology::point::PointId;
    /// let p = PointId::new(1).unwrap();
    /// assert_eq!(p.get(), 1);
    /// assert!(PointId::new(0).is_err());
    /// ```
    #[inline]
    pub fn new(raw: u64) -> Result<Self, MeshFormsError> {
        NonZeroU64::new(raw)
            .map(PointId)
            .ok_or(MeshFormsError::InvalidPointId)
    }

    /// Returns the raw `u64` value.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Debug for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PointId").field(&self.get()).finish()
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// `PointId` travels over MPI as a plain `u64`.
#[cfg(feature = "mpi-support")]
unsafe impl mpi::datatype::Equivalence for PointId {
    type Out = <u64 as mpi::datatype::Equivalence>::Out;

    fn equivalent_datatype() -> Self::Out {
        u64::equivalent_datatype()
    }
}

#[cfg(test)]
mod layout_tests {
    use super::*;
    use static_assertions::{assert_eq_align, assert_eq_size};

    assert_eq_size!(PointId, u64);
    assert_eq_size!(Option<PointId>, u64);
    assert_eq_align!(PointId, u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_rejected() {
        assert_eq!(PointId::new(0), Err(MeshFormsError::InvalidPointId));
    }

    #[test]
    fn debug_and_display() {
        let p = PointId::new(7).unwrap();
        assert_eq!(format!("{p:?}"), "PointId(7)");
        assert_eq!(format!("{p}"), "7");
    }

    #[test]
    fn serde_is_transparent() {
        let p = PointId::new(12).unwrap();
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "12");
        let back: PointId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
