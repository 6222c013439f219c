//! Essential (Dirichlet) boundary conditions.
//!
//! An essential condition never enters the weak form. It prescribes values
//! for selected components of one field on the vertices of a boundary, and
//! the problem eliminates those DOFs directly.

use crate::bc::delegate::{Delegate, EssentialCallback, EssentialFn, RawCallback};
use crate::discretization::fields::FieldCatalog;
use crate::mesh_error::MeshFormsError;

/// Strongly imposed boundary values.
#[derive(Debug)]
pub struct EssentialBc {
    name: String,
    boundary: String,
    field: Option<String>,
    fid: Option<usize>,
    components: Vec<usize>,
    value: Delegate<EssentialFn>,
    value_t: Option<Delegate<EssentialFn>>,
}

impl EssentialBc {
    /// Condition `u(t, x)` on `components` of the target field.
    pub fn new<G>(name: &str, boundary: &str, components: &[usize], value: G) -> Self
    where
        G: Fn(f64, &[f64], &mut [f64]) + Send + Sync + 'static,
    {
        Self::from_delegate(name, boundary, components, Delegate::<EssentialFn>::new(value))
    }

    pub fn from_delegate(
        name: &str,
        boundary: &str,
        components: &[usize],
        value: Delegate<EssentialFn>,
    ) -> Self {
        Self {
            name: name.to_string(),
            boundary: boundary.to_string(),
            field: None,
            fid: None,
            components: components.to_vec(),
            value,
            value_t: None,
        }
    }

    /// Target field by name; required on multi-field problems.
    pub fn with_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }

    /// Prescribed time derivative. Without one, the derivative is zero.
    pub fn with_time_derivative<G>(mut self, value_t: G) -> Self
    where
        G: Fn(f64, &[f64], &mut [f64]) + Send + Sync + 'static,
    {
        self.value_t = Some(Delegate::<EssentialFn>::new(value_t));
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

    /// Resolved target field.
    pub fn field_id(&self) -> Result<usize, MeshFormsError> {
        self.fid.ok_or(MeshFormsError::NotCreated("EssentialBc::field_id"))
    }

    pub fn evaluate(&self, time: f64, x: &[f64], u: &mut [f64]) {
        self.value.call(time, x, u);
    }

    pub fn evaluate_t(&self, time: f64, x: &[f64], u: &mut [f64]) {
        match &self.value_t {
            Some(d) => d.call(time, x, u),
            None => u.fill(0.0),
        }
    }

    /// Value evaluator in the solver's C convention.
    pub fn callback(&self) -> RawCallback<'_, EssentialCallback> {
        RawCallback::essential(&self.value)
    }

    /// Time-derivative evaluator in the solver's C convention, if any.
    pub fn callback_t(&self) -> Option<RawCallback<'_, EssentialCallback>> {
        self.value_t.as_ref().map(RawCallback::essential)
    }

    pub(crate) fn create(&mut self, catalog: &FieldCatalog) -> Result<(), MeshFormsError> {
        let fid = super::resolve_field(catalog, self.field.as_deref(), &self.name)?;
        super::check_components(catalog, fid, &self.components)?;
        self.fid = Some(fid);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_derivative_defaults_to_zero() {
        let bc = EssentialBc::new("inlet", "left", &[0], |t, _, u| u[0] = 2.0 * t);
        let mut u = [7.0];
        bc.evaluate_t(1.0, &[0.0], &mut u);
        assert_eq!(u, [0.0]);
        assert!(bc.callback_t().is_none());
        bc.evaluate(1.5, &[0.0], &mut u);
        assert_eq!(u, [3.0]);
    }

    #[test]
    fn field_must_be_named_on_multi_field_problems() {
        let mut cat = FieldCatalog::new();
        cat.add_field("u", 1, 1).unwrap();
        cat.add_field("v", 1, 1).unwrap();
        let mut bc = EssentialBc::new("wall", "left", &[0], |_, _, u| u[0] = 0.0);
        assert_eq!(
            bc.create(&cat),
            Err(MeshFormsError::MissingFieldParameter("wall".into()))
        );
        let mut bc = bc.with_field("v");
        bc.create(&cat).unwrap();
        assert_eq!(bc.field_id().unwrap(), 1);
    }
}
