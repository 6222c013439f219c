//! MeshFormsError: Unified error type for mesh-forms public APIs
//!
//! Every fallible operation in the crate reports through this enum. Setup-time
//! configuration problems (duplicate fields, unknown boundaries, component
//! mismatches) are detected before any assembly runs, so an application can
//! abort with a readable message instead of producing garbage residuals.

use crate::topology::point::PointId;
use thiserror::Error;

/// Unified error type for mesh-forms operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshFormsError {
    /// Attempted to construct a PointId with a zero value (invalid).
    #[error("PointId must be non-zero (0 is reserved as invalid/sentinel)")]
    InvalidPointId,
    /// A point was inserted twice into an atlas.
    #[error("duplicate point {0} in atlas")]
    DuplicatePoint(PointId),
    /// Atlas slices must have a positive length.
    #[error("zero-length slice requested in atlas")]
    ZeroLengthSlice,
    /// The section has no degrees of freedom for this point.
    #[error("point {0} is not part of the section")]
    MissingSectionPoint(PointId),
    /// A closure buffer did not match the number of DOFs on the closure.
    #[error("closure of point {point} has {expected} dofs, buffer has {found}")]
    ClosureSizeMismatch {
        point: PointId,
        expected: usize,
        found: usize,
    },
    /// A vector or matrix index was outside the algebraic object.
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// A field ID is registered twice.
    #[error("Cannot add field '{name}' with ID = {id}. ID already exists.")]
    DuplicateField { id: usize, name: String },
    /// An auxiliary field ID is registered twice.
    #[error("Cannot add auxiliary field '{name}' with ID = {id}. ID is already taken.")]
    DuplicateAuxField { id: usize, name: String },
    /// A field name is registered twice.
    #[error("Cannot add field '{0}'. Name already exists.")]
    DuplicateFieldName(String),
    /// An auxiliary field name is registered twice.
    #[error("Cannot add auxiliary field '{0}'. Name already exists.")]
    DuplicateAuxFieldName(String),
    /// Lookup of a field by ID failed.
    #[error("Field with ID = '{0}' does not exist.")]
    UnknownField(usize),
    /// Lookup of a field by name failed.
    #[error("Field '{0}' does not exist. Typo?")]
    UnknownFieldName(String),
    /// Lookup of an auxiliary field by ID failed.
    #[error("Auxiliary field with ID = '{0}' does not exist.")]
    UnknownAuxField(usize),
    /// Lookup of an auxiliary field by name failed.
    #[error("Auxiliary field '{0}' does not exist. Typo?")]
    UnknownAuxFieldName(String),
    /// Component names only exist on multi-component fields.
    #[error("Unable to set component name for single-component field")]
    SingleComponentField,
    /// Component index outside of `0..nc`.
    #[error("component {component} out of range for field with {nc} components")]
    ComponentOutOfRange { component: usize, nc: usize },

    /// A boundary condition names a boundary the mesh does not have.
    #[error("Boundary condition '{bc}' is set on boundary '{boundary}' which does not exist in the mesh.")]
    UnknownBoundary { bc: String, boundary: String },
    /// A region name does not correspond to a mesh label.
    #[error("Region '{0}' does not exist in the mesh.")]
    UnknownLabel(String),
    /// Multi-field problems need an explicit target field for BCs and ICs.
    #[error("'{0}': use the 'field' parameter to assign this object to an existing field.")]
    MissingFieldParameter(String),
    /// An initial/boundary condition or aux evaluator targets a field with a different size.
    #[error("'{name}' operates on {found} component(s), but is set on a field with {expected} component(s).")]
    ComponentCountMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    /// Two initial conditions were attached to the same field.
    #[error("Initial condition '{0}' is being applied to a field that already has an initial condition.")]
    DuplicateInitialCondition(String),
    /// Initial conditions must cover every field when any is given.
    #[error("Provided {fields} field(s), but {ics} initial condition(s).")]
    InitialConditionCount { fields: usize, ics: usize },
    /// The boundary-condition variant is not meaningful for this discretization.
    #[error("{kind} BCs are not supported for {discretization} problems")]
    UnsupportedBoundaryCondition {
        kind: &'static str,
        discretization: &'static str,
    },

    /// The dependency graph contains a cycle.
    #[error("Cyclic dependency detected: {0}")]
    CyclicDependency(String),
    /// A functional with this name already exists.
    #[error("Functional with name '{0}' already exists.")]
    DuplicateFunctional(String),
    /// No functional with this name exists.
    #[error("No functional with name '{0}' found. Typo?")]
    UnknownFunctional(String),
    /// A value was declared by two suppliers.
    #[error("Trying to declare an already existing value '{0}'.")]
    ValueAlreadyDeclared(String),
    /// A value was requested with a different type than it was declared with.
    #[error("Value '{0}' was requested with a mismatched type")]
    ValueTypeMismatch(String),
    /// A value was requested before any supplier declared it.
    #[error("Value '{0}' is not supplied by any functional")]
    UnknownValue(String),

    /// The requested operation is not implemented for this element/dimension.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
    /// Geometric data is inconsistent.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
    /// A callback invoked through the C calling convention reported failure.
    #[error("callback '{name}' returned error code {code}")]
    CallbackFailed { name: String, code: i32 },
    /// The problem has not been created yet.
    #[error("problem must be created before calling {0}")]
    NotCreated(&'static str),
}
