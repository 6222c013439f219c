//! Weak-form statements: keys, integrand contracts, per-point views and the
//! registry that owns integrands.

pub mod integrand;
pub mod kinds;
pub mod registry;
pub mod views;

pub use integrand::{JacobianFunc, ResidualFunc, jacobian_fn, residual_fn};
pub use kinds::{Domain, FormKey, JacobianKind, JacobianSet, Region, ResidualKind};
pub use registry::WeakForm;
pub use views::{FieldGradient, FieldLayout, FieldValue, Normal, Point, QuadratureContext, QuadraturePoint};
