//! Field catalog and element runtime (basis, quadrature, tabulation).

pub mod fields;
pub mod runtime;

pub use fields::{FieldCatalog, FieldInfo};
pub use runtime::{Basis, ElementTabulation, QuadratureRule, tabulate_element, tabulate_facet};
