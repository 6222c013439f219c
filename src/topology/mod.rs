//! Mesh topology: point handles, cell types, labels and the sieve.

pub mod cell_type;
pub mod labels;
pub mod point;
pub mod sieve;

pub use cell_type::CellType;
pub use labels::LabelSet;
pub use point::PointId;
pub use sieve::{InMemorySieve, Sieve};
