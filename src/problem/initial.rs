//! Initial conditions.

use crate::bc::delegate::{Delegate, EssentialCallback, EssentialFn, RawCallback};
use crate::discretization::fields::FieldCatalog;
use crate::mesh_error::MeshFormsError;

/// Initial state `u(t0, x)` of one field.
#[derive(Debug)]
pub struct InitialCondition {
    name: String,
    field: Option<String>,
    fid: Option<usize>,
    nc: usize,
    value: Delegate<EssentialFn>,
}

impl InitialCondition {
    /// Condition producing `nc` components.
    pub fn new<G>(name: &str, nc: usize, value: G) -> Self
    where
        G: Fn(f64, &[f64], &mut [f64]) + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            field: None,
            fid: None,
            nc,
            value: Delegate::<EssentialFn>::new(value),
        }
    }

    pub fn with_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_components(&self) -> usize {
        self.nc
    }

    pub fn field_id(&self) -> Result<usize, MeshFormsError> {
        self.fid.ok_or(MeshFormsError::NotCreated("InitialCondition::field_id"))
    }

    pub fn evaluate(&self, time: f64, x: &[f64], u: &mut [f64]) {
        self.value.call(time, x, u);
    }

    pub fn callback(&self) -> RawCallback<'_, EssentialCallback> {
        RawCallback::essential(&self.value)
    }

    pub(crate) fn create(&mut self, catalog: &FieldCatalog) -> Result<(), MeshFormsError> {
        let fid = crate::bc::resolve_field(catalog, self.field.as_deref(), &self.name)?;
        let expected = catalog.field_num_components(fid)?;
        if expected != self.nc {
            let err = MeshFormsError::ComponentCountMismatch {
                name: self.name.clone(),
                expected,
                found: self.nc,
            };
            log::error!("{err}");
            return Err(err);
        }
        self.fid = Some(fid);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_count_must_match_field() {
        let mut cat = FieldCatalog::new();
        cat.add_field("vel", 2, 1).unwrap();
        let mut ic = InitialCondition::new("ic", 1, |_, _, u| u[0] = 0.0);
        assert_eq!(
            ic.create(&cat),
            Err(MeshFormsError::ComponentCountMismatch {
                name: "ic".into(),
                expected: 2,
                found: 1
            })
        );
        let mut ic = InitialCondition::new("ic", 2, |_, x, u| {
            u[0] = x[0];
            u[1] = -x[0];
        });
        ic.create(&cat).unwrap();
        let mut u = [0.0; 2];
        assert_eq!(ic.callback().invoke(0.0, &[3.0], &mut u), 0);
        assert_eq!(u, [3.0, -3.0]);
    }

    #[test]
    fn unknown_field_name() {
        let mut cat = FieldCatalog::new();
        cat.add_field("u", 1, 1).unwrap();
        let mut ic = InitialCondition::new("ic", 1, |_, _, u| u[0] = 0.0).with_field("p");
        assert_eq!(
            ic.create(&cat),
            Err(MeshFormsError::UnknownFieldName("p".into()))
        );
    }
}
