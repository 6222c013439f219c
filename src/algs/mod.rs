//! Algorithms over a mesh, a section and a weak form.
//!
//! [`assembly`] hosts the element integration engine used by the
//! finite-element problem driver.

pub mod assembly;

pub use assembly::{Assembler, AuxData};
