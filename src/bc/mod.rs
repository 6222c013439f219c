//! Boundary conditions: essential, natural and natural Riemann.
//!
//! The three variants share only their attachment data (name, boundary,
//! target field, components). Each exposes its own evaluation contract:
//! essential conditions prescribe DOF values, natural conditions contribute
//! boundary integrands to the weak form, and natural Riemann conditions
//! compute ghost states for finite-volume fluxes.

pub mod delegate;
pub mod essential;
pub mod natural;
pub mod natural_riemann;

pub use delegate::{
    Delegate, EssentialCallback, EssentialFn, RawCallback, RiemannCallback, RiemannFn,
    essential_trampoline, natural_riemann_trampoline,
};
pub use essential::EssentialBc;
pub use natural::NaturalBc;
pub use natural_riemann::NaturalRiemannBc;

use crate::discretization::fields::FieldCatalog;
use crate::mesh::Mesh;
use crate::mesh_error::MeshFormsError;

/// A boundary condition attached to a problem.
#[derive(Debug)]
pub enum BoundaryCondition {
    Essential(EssentialBc),
    Natural(NaturalBc),
    NaturalRiemann(NaturalRiemannBc),
}

impl BoundaryCondition {
    pub fn name(&self) -> &str {
        match self {
            Self::Essential(bc) => bc.name(),
            Self::Natural(bc) => bc.name(),
            Self::NaturalRiemann(bc) => bc.name(),
        }
    }

    pub fn boundary(&self) -> &str {
        match self {
            Self::Essential(bc) => bc.boundary(),
            Self::Natural(bc) => bc.boundary(),
            Self::NaturalRiemann(bc) => bc.boundary(),
        }
    }

    pub fn components(&self) -> &[usize] {
        match self {
            Self::Essential(bc) => bc.components(),
            Self::Natural(bc) => bc.components(),
            Self::NaturalRiemann(bc) => bc.components(),
        }
    }

    pub fn field_id(&self) -> Result<usize, MeshFormsError> {
        match self {
            Self::Essential(bc) => bc.field_id(),
            Self::Natural(bc) => bc.field_id(),
            Self::NaturalRiemann(bc) => bc.field_id(),
        }
    }

    /// Variant name as used in messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Essential(_) => "Essential",
            Self::Natural(_) => "Natural",
            Self::NaturalRiemann(_) => "NaturalRiemann",
        }
    }

    /// Checks the boundary exists and resolves the target field.
    pub(crate) fn create(&mut self, mesh: &Mesh, catalog: &FieldCatalog) -> Result<(), MeshFormsError> {
        if !mesh.has_label(self.boundary()) {
            let err = MeshFormsError::UnknownBoundary {
                bc: self.name().to_string(),
                boundary: self.boundary().to_string(),
            };
            log::error!("{err}");
            return Err(err);
        }
        match self {
            Self::Essential(bc) => bc.create(catalog),
            Self::Natural(bc) => bc.create(catalog),
            Self::NaturalRiemann(bc) => bc.create(catalog),
        }
    }
}

impl From<EssentialBc> for BoundaryCondition {
    fn from(bc: EssentialBc) -> Self {
        Self::Essential(bc)
    }
}

impl From<NaturalBc> for BoundaryCondition {
    fn from(bc: NaturalBc) -> Self {
        Self::Natural(bc)
    }
}

impl From<NaturalRiemannBc> for BoundaryCondition {
    fn from(bc: NaturalRiemannBc) -> Self {
        Self::NaturalRiemann(bc)
    }
}

/// Target field of a BC or IC: the only field, or the named one.
pub(crate) fn resolve_field(
    catalog: &FieldCatalog,
    field: Option<&str>,
    owner: &str,
) -> Result<usize, MeshFormsError> {
    match (catalog.num_fields(), field) {
        (_, Some(name)) => catalog.field_id(name),
        (1, None) => catalog
            .fields()
            .next()
            .map(|fi| fi.id)
            .ok_or(MeshFormsError::UnknownField(0)),
        (_, None) => {
            log::error!(
                "'{owner}': use the 'field' parameter to assign this object to an existing field."
            );
            Err(MeshFormsError::MissingFieldParameter(owner.to_string()))
        }
    }
}

pub(crate) fn check_components(
    catalog: &FieldCatalog,
    fid: usize,
    components: &[usize],
) -> Result<(), MeshFormsError> {
    let nc = catalog.field_num_components(fid)?;
    match components.iter().find(|&&c| c >= nc) {
        Some(&component) => {
            log::error!("component {component} out of range for field with {nc} components");
            Err(MeshFormsError::ComponentOutOfRange { component, nc })
        }
        None => Ok(()),
    }
}
