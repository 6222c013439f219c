//! Natural (flux) boundary conditions.
//!
//! A natural condition is a set of boundary integrands. At problem setup it
//! moves them into the weak form under the key
//! `(boundary, 1, field, part 0)`, after which the engine integrates them
//! exactly like volume terms restricted to the boundary facets.

use crate::discretization::fields::FieldCatalog;
use crate::mesh_error::MeshFormsError;
use crate::weak_form::integrand::{JacobianFunc, ResidualFunc};
use crate::weak_form::kinds::{JacobianKind, ResidualKind};
use crate::weak_form::registry::WeakForm;

struct JacobianTerm {
    kind: JacobianKind,
    /// Basis field by name; `None` couples the condition's own field.
    coupled: Option<String>,
    func: Box<dyn JacobianFunc>,
}

/// Weakly imposed boundary condition.
pub struct NaturalBc {
    name: String,
    boundary: String,
    field: Option<String>,
    fid: Option<usize>,
    components: Vec<usize>,
    residual: Vec<(ResidualKind, Box<dyn ResidualFunc>)>,
    jacobian: Vec<JacobianTerm>,
}

impl std::fmt::Debug for NaturalBc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NaturalBc")
            .field("name", &self.name)
            .field("boundary", &self.boundary)
            .field("fid", &self.fid)
            .field("pending_terms", &(self.residual.len() + self.jacobian.len()))
            .finish()
    }
}

impl NaturalBc {
    pub fn new(name: &str, boundary: &str, components: &[usize]) -> Self {
        Self {
            name: name.to_string(),
            boundary: boundary.to_string(),
            field: None,
            fid: None,
            components: components.to_vec(),
            residual: Vec::new(),
            jacobian: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }

    /// Boundary term tested with the test-function value.
    pub fn f0(mut self, func: impl ResidualFunc + 'static) -> Self {
        self.residual.push((ResidualKind::BndF0, Box::new(func)));
        self
    }

    /// Boundary term tested with the test-function gradient.
    pub fn f1(mut self, func: impl ResidualFunc + 'static) -> Self {
        self.residual.push((ResidualKind::BndF1, Box::new(func)));
        self
    }

    pub fn g0(self, func: impl JacobianFunc + 'static) -> Self {
        self.jacobian_term(JacobianKind::BndG0, None, func)
    }

    pub fn g1(self, func: impl JacobianFunc + 'static) -> Self {
        self.jacobian_term(JacobianKind::BndG1, None, func)
    }

    pub fn g2(self, func: impl JacobianFunc + 'static) -> Self {
        self.jacobian_term(JacobianKind::BndG2, None, func)
    }

    pub fn g3(self, func: impl JacobianFunc + 'static) -> Self {
        self.jacobian_term(JacobianKind::BndG3, None, func)
    }

    /// Jacobian term coupling this field to the basis field `coupled`
    /// (by name). `kind` is mapped onto its boundary variant.
    pub fn jacobian_term(
        mut self,
        kind: JacobianKind,
        coupled: Option<&str>,
        func: impl JacobianFunc + 'static,
    ) -> Self {
        let kind = [
            JacobianKind::BndG0,
            JacobianKind::BndG1,
            JacobianKind::BndG2,
            JacobianKind::BndG3,
        ][kind.term()];
        self.jacobian.push(JacobianTerm {
            kind,
            coupled: coupled.map(str::to_string),
            func: Box::new(func),
        });
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
        self.fid.ok_or(MeshFormsError::NotCreated("NaturalBc::field_id"))
    }

    pub(crate) fn create(&mut self, catalog: &FieldCatalog) -> Result<(), MeshFormsError> {
        let fid = super::resolve_field(catalog, self.field.as_deref(), &self.name)?;
        super::check_components(catalog, fid, &self.components)?;
        for term in &self.jacobian {
            if let Some(g) = term.coupled.as_deref() {
                catalog.field_id(g)?;
            }
        }
        self.fid = Some(fid);
        Ok(())
    }

    /// Moves the integrands into `wf`. Later calls register nothing.
    pub(crate) fn set_up_weak_form(
        &mut self,
        wf: &mut WeakForm,
        catalog: &FieldCatalog,
    ) -> Result<(), MeshFormsError> {
        let fid = self.field_id()?;
        let label = Some(self.boundary.as_str());
        for (kind, func) in self.residual.drain(..) {
            wf.add_residual_boxed(kind, label, 1, fid, 0, func);
        }
        for term in self.jacobian.drain(..) {
            let gid = match term.coupled.as_deref() {
                Some(g) => catalog.field_id(g)?,
                None => fid,
            };
            wf.add_jacobian_boxed(term.kind, label, 1, fid, gid, 0, term.func);
        }
        Ok(())
    }
}
