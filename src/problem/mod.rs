//! Problem drivers.
//!
//! A problem owns the mesh, the field catalog and everything registered
//! against it. Capabilities are split into small traits so that code driving
//! a solve only depends on what it uses:
//! - [`DiscreteProblem`]: fields and DOF layout,
//! - [`NonlinearSystem`]: residual, Jacobian and essential values,
//! - [`TransientState`]: time, time shift and time derivative.
//!
//! Concrete PDEs implement [`PdeDefinition`] (finite elements) or
//! [`FvDefinition`] (finite volumes) and are composed into [`FeProblem`] or
//! [`FvProblem`].

pub mod aux;
pub mod fe;
pub mod fv;
pub mod initial;
pub mod options;

pub use aux::AuxFieldEvaluator;
pub use fe::FeProblem;
pub use fv::{FaceFlux, FvDefinition, FvProblem, RiemannSolver};
pub use initial::InitialCondition;
pub use options::{FvOptions, ProblemOptions};

use crate::algebra::{DenseVector, MatrixLike, VectorLike};
use crate::data::section::Section;
use crate::dependency::DependencyEvaluator;
use crate::discretization::fields::FieldCatalog;
use crate::mesh::Mesh;
use crate::mesh_error::MeshFormsError;
use crate::topology::point::PointId;
use crate::weak_form::registry::WeakForm;

/// Access to fields and DOF layout.
pub trait DiscreteProblem {
    fn mesh(&self) -> &Mesh;

    fn catalog(&self) -> &FieldCatalog;

    /// DOF layout; available after `create()`.
    fn section(&self) -> Result<&Section, MeshFormsError>;

    fn num_dofs(&self) -> usize {
        self.section().map_or(0, Section::len)
    }
}

/// The algebraic system a nonlinear solver drives.
pub trait NonlinearSystem {
    /// Overwrites `f` with the residual at `x`.
    fn compute_residual(
        &mut self,
        x: &dyn VectorLike,
        f: &mut dyn VectorLike,
    ) -> Result<(), MeshFormsError>;

    /// Overwrites `j` (and `p`, when given) with the Jacobian at `x`.
    fn compute_jacobian(
        &mut self,
        x: &dyn VectorLike,
        j: &mut dyn MatrixLike,
        p: Option<&mut dyn MatrixLike>,
    ) -> Result<(), MeshFormsError>;

    /// Inserts the prescribed essential values into `x`.
    fn apply_essential_bcs(&self, x: &mut dyn VectorLike) -> Result<(), MeshFormsError>;
}

/// Time state consumed by integrands and boundary evaluators.
pub trait TransientState {
    fn time(&self) -> f64;

    fn set_time(&mut self, time: f64);

    /// Shift `s` of `d(u_t)/du = s` used by implicit time integrators.
    fn time_shift(&self) -> f64;

    fn set_time_shift(&mut self, shift: f64);

    /// Time derivative of the state; `None` for steady problems.
    fn set_time_derivative(&mut self, x_t: Option<DenseVector>);
}

/// A finite-element PDE: its fields, integrands and derived values.
pub trait PdeDefinition {
    fn set_up_fields(&self, catalog: &mut FieldCatalog) -> Result<(), MeshFormsError>;

    fn set_up_weak_form(
        &self,
        catalog: &FieldCatalog,
        weak_form: &mut WeakForm,
    ) -> Result<(), MeshFormsError>;

    fn set_up_functionals(&self, _evaluator: &mut DependencyEvaluator) -> Result<(), MeshFormsError> {
        Ok(())
    }
}

/// Points carrying DOFs of `field`, with the coordinates their values are
/// sampled at (vertex position, or cell centroid for cellwise fields).
pub(crate) fn field_nodes(
    mesh: &Mesh,
    section: &Section,
    field: usize,
) -> Result<Vec<(PointId, usize, Vec<f64>)>, MeshFormsError> {
    section
        .points()
        .filter_map(|p| section.field_offset(p, field).map(|(off, _)| (p, off)))
        .map(|(p, off)| {
            let xyz = if mesh.point_dimension(p)? == 0 {
                mesh.coordinates(p)?.to_vec()
            } else {
                mesh.centroid(p)?
            };
            Ok((p, off, xyz))
        })
        .collect()
}
