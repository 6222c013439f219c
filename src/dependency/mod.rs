//! Dependency graph and dependency-ordered evaluation of derived values.

pub mod evaluator;
pub mod graph;

pub use evaluator::{DependencyEvaluator, ScalarFunctional, ValueFunctional, ValueStore};
pub use graph::DependencyGraph;
