//! Evaluators that fill auxiliary fields.
//!
//! An auxiliary field is data the integrands read but the solver does not
//! solve for (material coefficients, prescribed velocities). Its values are
//! projected once, at problem creation, by sampling an evaluator at the DOF
//! locations: vertices for order 1, cell centroids for order 0.

use crate::discretization::fields::FieldCatalog;
use crate::mesh::Mesh;
use crate::mesh_error::MeshFormsError;

type AuxFn = dyn Fn(f64, &[f64], &mut [f64]) + Send + Sync;

enum AuxSource {
    Constant(Vec<f64>),
    Function { nc: usize, func: Box<AuxFn> },
}

/// Source of values for one auxiliary field.
pub struct AuxFieldEvaluator {
    name: String,
    field: String,
    fid: Option<usize>,
    region: Option<String>,
    source: AuxSource,
}

impl std::fmt::Debug for AuxFieldEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuxFieldEvaluator")
            .field("name", &self.name)
            .field("field", &self.field)
            .field("region", &self.region)
            .field("nc", &self.num_components())
            .finish()
    }
}

impl AuxFieldEvaluator {
    /// Same value everywhere.
    pub fn constant(name: &str, field: &str, values: &[f64]) -> Self {
        Self::with_source(name, field, AuxSource::Constant(values.to_vec()))
    }

    /// `func(time, x, out)` with `nc` components.
    pub fn function<G>(name: &str, field: &str, nc: usize, func: G) -> Self
    where
        G: Fn(f64, &[f64], &mut [f64]) + Send + Sync + 'static,
    {
        Self::with_source(
            name,
            field,
            AuxSource::Function {
                nc,
                func: Box::new(func),
            },
        )
    }

    fn with_source(name: &str, field: &str, source: AuxSource) -> Self {
        Self {
            name: name.to_string(),
            field: field.to_string(),
            fid: None,
            region: None,
            source,
        }
    }

    /// Only sample points labelled `region == 1`.
    pub fn in_region(mut self, region: &str) -> Self {
        self.region = Some(region.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn num_components(&self) -> usize {
        match &self.source {
            AuxSource::Constant(v) => v.len(),
            AuxSource::Function { nc, .. } => *nc,
        }
    }

    pub fn field_id(&self) -> Result<usize, MeshFormsError> {
        self.fid.ok_or(MeshFormsError::NotCreated("AuxFieldEvaluator::field_id"))
    }

    pub fn evaluate(&self, time: f64, x: &[f64], out: &mut [f64]) {
        match &self.source {
            AuxSource::Constant(v) => out.copy_from_slice(v),
            AuxSource::Function { func, .. } => func(time, x, out),
        }
    }

    pub(crate) fn create(&mut self, mesh: &Mesh, catalog: &FieldCatalog) -> Result<(), MeshFormsError> {
        let fid = catalog.aux_field_id(&self.field).inspect_err(|e| log::error!("{e}"))?;
        let expected = catalog.aux_field_num_components(fid)?;
        if expected != self.num_components() {
            let err = MeshFormsError::ComponentCountMismatch {
                name: self.name.clone(),
                expected,
                found: self.num_components(),
            };
            log::error!("{err}");
            return Err(err);
        }
        if let Some(region) = self.region.as_deref() {
            if !mesh.has_label(region) {
                log::error!("Auxiliary evaluator '{}' uses unknown region '{region}'", self.name);
                return Err(MeshFormsError::UnknownLabel(region.to_string()));
            }
        }
        self.fid = Some(fid);
        Ok(())
    }
}
