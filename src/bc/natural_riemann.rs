//! Natural Riemann boundary conditions for finite-volume problems.
//!
//! The condition computes the ghost state behind a boundary face from the
//! interior state, the face centroid and the outward normal. The Riemann
//! solver then sees the face as an interior face between the two states.

use crate::bc::delegate::{Delegate, RawCallback, RiemannCallback, RiemannFn};
use crate::discretization::fields::FieldCatalog;
use crate::mesh_error::MeshFormsError;

/// Ghost-state boundary condition.
#[derive(Debug)]
pub struct NaturalRiemannBc {
    name: String,
    boundary: String,
    field: Option<String>,
    fid: Option<usize>,
    components: Vec<usize>,
    ghost: Delegate<RiemannFn>,
}

impl NaturalRiemannBc {
    /// `ghost(time, centroid, normal, interior, ghost_out)`.
    pub fn new<G>(name: &str, boundary: &str, components: &[usize], ghost: G) -> Self
    where
        G: Fn(f64, &[f64], &[f64], &[f64], &mut [f64]) + Send + Sync + 'static,
    {
        Self::from_delegate(name, boundary, components, Delegate::<RiemannFn>::new(ghost))
    }

    pub fn from_delegate(
        name: &str,
        boundary: &str,
        components: &[usize],
        ghost: Delegate<RiemannFn>,
    ) -> Self {
        Self {
            name: name.to_string(),
            boundary: boundary.to_string(),
            field: None,
            fid: None,
            components: components.to_vec(),
            ghost,
        }
    }

    pub fn with_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn components(&self) -> &[usize] {
        &self.components
    }

    pub fn field_id(&self) -> Result<usize, MeshFormsError> {
        self.fid.ok_or(MeshFormsError::NotCreated("NaturalRiemannBc::field_id"))
    }

    pub fn evaluate(&self, time: f64, c: &[f64], n: &[f64], x_i: &[f64], x_g: &mut [f64]) {
        self.ghost.call(time, c, n, x_i, x_g);
    }

    /// Ghost evaluator in the solver's C convention.
    pub fn callback(&self) -> RawCallback<'_, RiemannCallback> {
        RawCallback::natural_riemann(&self.ghost)
    }

    pub(crate) fn create(&mut self, catalog: &FieldCatalog) -> Result<(), MeshFormsError> {
        let fid = super::resolve_field(catalog, self.field.as_deref(), &self.name)?;
        super::check_components(catalog, fid, &self.components)?;
        self.fid = Some(fid);
        Ok(())
    }
}
