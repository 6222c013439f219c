//! Problem configuration.

use serde::{Deserialize, Serialize};

use crate::data::section::ClosureLayout;

/// Options of a finite-element problem.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProblemOptions {
    /// DOF ordering inside closure buffers.
    pub closure_layout: ClosureLayout,
    /// Degree of polynomials integrated exactly by the element rules.
    pub quadrature_order: usize,
    /// Initial simulation time.
    pub time: f64,
}

impl Default for ProblemOptions {
    fn default() -> Self {
        Self {
            closure_layout: ClosureLayout::FieldMajor,
            quadrature_order: 2,
            time: 0.0,
        }
    }
}

/// Options of an explicit finite-volume problem.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FvOptions {
    pub closure_layout: ClosureLayout,
    pub time: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_take_defaults() {
        let opts: ProblemOptions = serde_json::from_str(r#"{"time": 1.5}"#).unwrap();
        assert_eq!(opts.quadrature_order, 2);
        assert_eq!(opts.closure_layout, ClosureLayout::FieldMajor);
        assert_eq!(opts.time, 1.5);

        let fv: FvOptions = serde_json::from_str(r#"{"closure_layout": "PointMajor"}"#).unwrap();
        assert_eq!(fv.closure_layout, ClosureLayout::PointMajor);
        assert_eq!(fv.time, 0.0);
    }
}
