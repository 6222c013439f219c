#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mesh-forms
//!
//! mesh-forms assembles the residual vectors and Jacobian matrices of PDE
//! weak forms on unstructured meshes and dispatches boundary conditions into
//! that assembly. It sits between a mesh and an external nonlinear solver:
//! the solver owns the vectors and matrices, mesh-forms fills them.
//!
//! ## Features
//! - Weak-form registry keyed by `(region, field, part)` holding residual
//!   (`F0`, `F1`) and Jacobian (`G0..G3`) integrands, with boundary and
//!   preconditioner variants
//! - Element integration engine with per-quadrature-point field views
//! - Closure read/write between global vectors and element buffers
//! - Essential, natural and natural Riemann boundary conditions, with
//!   `extern "C"` trampolines for solvers expecting C callbacks
//! - Dependency-ordered evaluation of named derived values
//! - Finite-element and explicit finite-volume problem drivers
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! mesh-forms = "0.3"
//! # Optional features:
//! # features = ["mpi-support", "check-invariants"]
//! ```
//!
//! ## Determinism
//!
//! Registries, labels and sections are ordered maps; closures are traversed
//! breadth first in cone order. Two runs over the same input produce the
//! same DOF numbering and the same assembly order.

pub mod algebra;
pub mod algs;
pub mod bc;
pub mod data;
pub mod dependency;
pub mod discretization;
pub mod mesh;
pub mod mesh_error;
pub mod problem;
pub mod topology;
pub mod weak_form;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algebra::{DenseMatrix, DenseVector, InsertMode, MatrixLike, VectorLike};
    pub use crate::algs::assembly::{Assembler, AuxData};
    pub use crate::bc::{
        BoundaryCondition, Delegate, EssentialBc, EssentialFn, NaturalBc, NaturalRiemannBc,
        RawCallback, RiemannFn,
    };
    pub use crate::data::closure::ClosureAccessor;
    pub use crate::data::section::{ClosureLayout, Section};
    pub use crate::dependency::{
        DependencyEvaluator, DependencyGraph, ScalarFunctional, ValueFunctional, ValueStore,
    };
    pub use crate::discretization::fields::{FieldCatalog, FieldInfo};
    pub use crate::mesh::{Mesh, line_mesh, rectangle_mesh};
    pub use crate::mesh_error::MeshFormsError;
    pub use crate::problem::{
        AuxFieldEvaluator, DiscreteProblem, FaceFlux, FeProblem, FvDefinition, FvOptions,
        FvProblem, InitialCondition, NonlinearSystem, PdeDefinition, ProblemOptions,
        RiemannSolver, TransientState,
    };
    pub use crate::topology::cell_type::CellType;
    pub use crate::topology::labels::LabelSet;
    pub use crate::topology::point::PointId;
    pub use crate::topology::sieve::{InMemorySieve, Sieve};
    pub use crate::weak_form::{
        Domain, JacobianFunc, JacobianKind, JacobianSet, QuadratureContext, ResidualFunc,
        ResidualKind, WeakForm, jacobian_fn, residual_fn,
    };
}
