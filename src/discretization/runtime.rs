//! Reference bases, quadrature rules and physical element tabulation.
//!
//! The assembly engine consumes an [`ElementTabulation`] per cell or facet:
//! quadrature weights, absolute Jacobian determinants, basis values and
//! physical basis gradients, and the physical quadrature points.

use crate::mesh_error::MeshFormsError;
use crate::topology::cell_type::CellType;

/// Supported basis implementations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Basis {
    /// Linear Lagrange basis on the segment `[-1, 1]`.
    LagrangeP1Segment,
    /// Linear Lagrange basis on the triangle `(0,0), (1,0), (0,1)`.
    LagrangeP1Triangle,
    /// Bilinear Lagrange basis on the square `[-1, 1]^2`.
    LagrangeQ1Quadrilateral,
}

impl Basis {
    /// First-order basis for a cell type.
    pub fn for_cell(cell_type: CellType) -> Result<Self, MeshFormsError> {
        match cell_type {
            CellType::Segment => Ok(Self::LagrangeP1Segment),
            CellType::Triangle => Ok(Self::LagrangeP1Triangle),
            CellType::Quadrilateral => Ok(Self::LagrangeQ1Quadrilateral),
            CellType::Vertex => Err(MeshFormsError::Unsupported(
                "basis on a vertex cell".to_string(),
            )),
        }
    }

    /// Reference dimension of the basis.
    pub fn dimension(&self) -> usize {
        match self {
            Basis::LagrangeP1Segment => 1,
            Basis::LagrangeP1Triangle | Basis::LagrangeQ1Quadrilateral => 2,
        }
    }

    /// Number of basis functions per element.
    pub fn num_nodes(&self) -> usize {
        match self {
            Basis::LagrangeP1Segment => 2,
            Basis::LagrangeP1Triangle => 3,
            Basis::LagrangeQ1Quadrilateral => 4,
        }
    }

    pub fn cell_type(&self) -> CellType {
        match self {
            Basis::LagrangeP1Segment => CellType::Segment,
            Basis::LagrangeP1Triangle => CellType::Triangle,
            Basis::LagrangeQ1Quadrilateral => CellType::Quadrilateral,
        }
    }

    /// Reference coordinates of the nodes, in closure order.
    pub fn reference_nodes(&self) -> Vec<Vec<f64>> {
        match self {
            Basis::LagrangeP1Segment => vec![vec![-1.0], vec![1.0]],
            Basis::LagrangeP1Triangle => vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]],
            Basis::LagrangeQ1Quadrilateral => vec![
                vec![-1.0, -1.0],
                vec![1.0, -1.0],
                vec![1.0, 1.0],
                vec![-1.0, 1.0],
            ],
        }
    }

    /// Reference centroid.
    pub fn reference_centroid(&self) -> Vec<f64> {
        match self {
            Basis::LagrangeP1Segment => vec![0.0],
            Basis::LagrangeP1Triangle => vec![1.0 / 3.0, 1.0 / 3.0],
            Basis::LagrangeQ1Quadrilateral => vec![0.0, 0.0],
        }
    }

    /// Evaluate basis values and reference gradients at reference points.
    pub fn tabulate(&self, points: &[Vec<f64>]) -> Result<BasisTabulation, MeshFormsError> {
        let dim = self.dimension();
        if let Some(bad) = points.iter().find(|p| p.len() != dim) {
            return Err(MeshFormsError::InvalidGeometry(format!(
                "{:?} expects {dim}D reference points, found {}D",
                self,
                bad.len()
            )));
        }
        let mut values = Vec::with_capacity(points.len());
        let mut gradients = Vec::with_capacity(points.len());
        for p in points {
            match self {
                Basis::LagrangeP1Segment => {
                    let xi = p[0];
                    values.push(vec![0.5 * (1.0 - xi), 0.5 * (1.0 + xi)]);
                    gradients.push(vec![vec![-0.5], vec![0.5]]);
                }
                Basis::LagrangeP1Triangle => {
                    let (xi, eta) = (p[0], p[1]);
                    values.push(vec![1.0 - xi - eta, xi, eta]);
                    gradients.push(vec![vec![-1.0, -1.0], vec![1.0, 0.0], vec![0.0, 1.0]]);
                }
                Basis::LagrangeQ1Quadrilateral => {
                    let (xi, eta) = (p[0], p[1]);
                    values.push(vec![
                        0.25 * (1.0 - xi) * (1.0 - eta),
                        0.25 * (1.0 + xi) * (1.0 - eta),
                        0.25 * (1.0 + xi) * (1.0 + eta),
                        0.25 * (1.0 - xi) * (1.0 + eta),
                    ]);
                    gradients.push(vec![
                        vec![-0.25 * (1.0 - eta), -0.25 * (1.0 - xi)],
                        vec![0.25 * (1.0 - eta), -0.25 * (1.0 + xi)],
                        vec![0.25 * (1.0 + eta), 0.25 * (1.0 + xi)],
                        vec![-0.25 * (1.0 + eta), 0.25 * (1.0 - xi)],
                    ]);
                }
            }
        }
        Ok(BasisTabulation { values, gradients })
    }
}

/// Basis function tabulation on the reference element.
#[derive(Clone, Debug)]
pub struct BasisTabulation {
    /// Basis values per quadrature point: `[qp][basis]`.
    pub values: Vec<Vec<f64>>,
    /// Reference gradients per quadrature point: `[qp][basis][dim]`.
    pub gradients: Vec<Vec<Vec<f64>>>,
}

/// Quadrature rule on a reference element.
#[derive(Clone, Debug)]
pub struct QuadratureRule {
    pub points: Vec<Vec<f64>>,
    pub weights: Vec<f64>,
}

impl QuadratureRule {
    /// Gauss rule on `cell_type` exact for polynomials of degree `order`.
    ///
    /// A vertex gets the single empty point with unit weight, which makes
    /// point evaluation on 1D boundaries fit the same loop as 2D facets.
    pub fn gauss(cell_type: CellType, order: usize) -> Result<Self, MeshFormsError> {
        match cell_type {
            CellType::Vertex => Ok(Self {
                points: vec![vec![]],
                weights: vec![1.0],
            }),
            CellType::Segment => gauss_legendre_1d(order / 2 + 1),
            CellType::Quadrilateral => {
                let line = gauss_legendre_1d(order / 2 + 1)?;
                Ok(tensor_product(&line, &line))
            }
            CellType::Triangle => match order {
                0 | 1 => Ok(Self {
                    points: vec![vec![1.0 / 3.0, 1.0 / 3.0]],
                    weights: vec![0.5],
                }),
                2 => Ok(Self {
                    points: vec![
                        vec![1.0 / 6.0, 1.0 / 6.0],
                        vec![2.0 / 3.0, 1.0 / 6.0],
                        vec![1.0 / 6.0, 2.0 / 3.0],
                    ],
                    weights: vec![1.0 / 6.0; 3],
                }),
                _ => Err(MeshFormsError::Unsupported(format!(
                    "triangle quadrature of order {order}"
                ))),
            },
        }
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

/// Tabulation data on a physical cell or facet.
#[derive(Clone, Debug, Default)]
pub struct ElementTabulation {
    /// Reference quadrature weights.
    pub weights: Vec<f64>,
    /// Absolute Jacobian determinant of the integration domain per point.
    pub jacobian_dets: Vec<f64>,
    /// Quadrature points in physical space.
    pub physical_points: Vec<Vec<f64>>,
    /// Basis values per quadrature point: `[qp][basis]`.
    pub basis_values: Vec<Vec<f64>>,
    /// Physical basis gradients per quadrature point: `[qp][basis][dim]`.
    pub basis_gradients: Vec<Vec<Vec<f64>>>,
}

impl ElementTabulation {
    pub fn num_points(&self) -> usize {
        self.weights.len()
    }

    pub fn num_basis(&self) -> usize {
        self.basis_values.first().map_or(0, Vec::len)
    }
}

/// Tabulate a cell: quadrature in the cell's reference element.
pub fn tabulate_element(
    basis: Basis,
    quad: &QuadratureRule,
    node_coords: &[Vec<f64>],
) -> Result<ElementTabulation, MeshFormsError> {
    let mapped = map_reference_points(basis, node_coords, &quad.points)?;
    Ok(ElementTabulation {
        weights: quad.weights.clone(),
        jacobian_dets: mapped.dets,
        physical_points: mapped.points,
        basis_values: mapped.values,
        basis_gradients: mapped.gradients,
    })
}

/// Tabulate the cell basis on one of its facets.
///
/// `facet_nodes` are the local indices (into the cell's closure order) of the
/// facet's vertices. Facet quadrature points are mapped into the cell's
/// reference element so basis values and gradients belong to the cell, while
/// the determinant measures the facet.
pub fn tabulate_facet(
    basis: Basis,
    facet_quad: &QuadratureRule,
    node_coords: &[Vec<f64>],
    facet_nodes: &[usize],
) -> Result<ElementTabulation, MeshFormsError> {
    let ref_nodes = basis.reference_nodes();
    let node = |i: usize| {
        ref_nodes.get(i).ok_or_else(|| {
            MeshFormsError::InvalidGeometry(format!("facet node {i} outside {basis:?}"))
        })
    };
    let (ref_points, facet_det) = match facet_nodes {
        [a] => (vec![node(*a)?.clone(); facet_quad.len()], 1.0),
        [a, b] => {
            let (ra, rb) = (node(*a)?, node(*b)?);
            let pts = facet_quad
                .points
                .iter()
                .map(|s| {
                    let t = 0.5 * (1.0 + s[0]);
                    ra.iter().zip(rb).map(|(x, y)| (1.0 - t) * x + t * y).collect()
                })
                .collect();
            let (xa, xb) = (&node_coords[*a], &node_coords[*b]);
            let len = crate::mesh::norm(
                &xa.iter().zip(xb).map(|(x, y)| y - x).collect::<Vec<_>>(),
            );
            (pts, 0.5 * len)
        }
        other => {
            return Err(MeshFormsError::Unsupported(format!(
                "facet with {} vertices",
                other.len()
            )));
        }
    };
    let mapped = map_reference_points(basis, node_coords, &ref_points)?;
    Ok(ElementTabulation {
        weights: facet_quad.weights.clone(),
        jacobian_dets: vec![facet_det; facet_quad.len()],
        physical_points: mapped.points,
        basis_values: mapped.values,
        basis_gradients: mapped.gradients,
    })
}

struct MappedPoints {
    points: Vec<Vec<f64>>,
    values: Vec<Vec<f64>>,
    gradients: Vec<Vec<Vec<f64>>>,
    dets: Vec<f64>,
}

fn map_reference_points(
    basis: Basis,
    node_coords: &[Vec<f64>],
    ref_points: &[Vec<f64>],
) -> Result<MappedPoints, MeshFormsError> {
    let num_nodes = basis.num_nodes();
    if node_coords.len() != num_nodes {
        return Err(MeshFormsError::InvalidGeometry(format!(
            "expected {num_nodes} node coordinates, found {}",
            node_coords.len()
        )));
    }
    let dim = basis.dimension();
    if node_coords.iter().any(|x| x.len() != dim) {
        return Err(MeshFormsError::InvalidGeometry(format!(
            "basis dimension {dim} does not match coordinate dimension"
        )));
    }
    let tab = basis.tabulate(ref_points)?;
    let mut out = MappedPoints {
        points: Vec::with_capacity(ref_points.len()),
        values: Vec::with_capacity(ref_points.len()),
        gradients: Vec::with_capacity(ref_points.len()),
        dets: Vec::with_capacity(ref_points.len()),
    };
    for (values, ref_grads) in tab.values.into_iter().zip(tab.gradients) {
        let jac = build_jacobian(dim, node_coords, &ref_grads);
        let (det, inv) = invert_jacobian(dim, &jac)?;
        let grads = ref_grads
            .iter()
            .map(|g| {
                (0..dim)
                    .map(|pd| (0..dim).map(|rd| inv[rd * dim + pd] * g[rd]).sum())
                    .collect()
            })
            .collect();
        let mut x = vec![0.0; dim];
        for (node, v) in node_coords.iter().zip(&values) {
            for d in 0..dim {
                x[d] += v * node[d];
            }
        }
        out.points.push(x);
        out.values.push(values);
        out.gradients.push(grads);
        out.dets.push(det.abs());
    }
    Ok(out)
}

fn gauss_legendre_1d(n: usize) -> Result<QuadratureRule, MeshFormsError> {
    let (points, weights) = match n {
        1 => (vec![0.0], vec![2.0]),
        2 => {
            let a = 1.0 / 3.0_f64.sqrt();
            (vec![-a, a], vec![1.0, 1.0])
        }
        3 => {
            let a = (3.0_f64 / 5.0).sqrt();
            (vec![-a, 0.0, a], vec![5.0 / 9.0, 8.0 / 9.0, 5.0 / 9.0])
        }
        _ => {
            return Err(MeshFormsError::Unsupported(format!(
                "{n}-point Gauss-Legendre rule"
            )));
        }
    };
    Ok(QuadratureRule {
        points: points.into_iter().map(|x| vec![x]).collect(),
        weights,
    })
}

fn tensor_product(a: &QuadratureRule, b: &QuadratureRule) -> QuadratureRule {
    let mut points = Vec::with_capacity(a.len() * b.len());
    let mut weights = Vec::with_capacity(a.len() * b.len());
    for (pb, wb) in b.points.iter().zip(&b.weights) {
        for (pa, wa) in a.points.iter().zip(&a.weights) {
            points.push(vec![pa[0], pb[0]]);
            weights.push(wa * wb);
        }
    }
    QuadratureRule { points, weights }
}

fn build_jacobian(dim: usize, node_coords: &[Vec<f64>], ref_grads: &[Vec<f64>]) -> Vec<f64> {
    let mut jac = vec![0.0; dim * dim];
    for (node, grad) in node_coords.iter().zip(ref_grads) {
        for pd in 0..dim {
            for rd in 0..dim {
                jac[pd * dim + rd] += node[pd] * grad[rd];
            }
        }
    }
    jac
}

fn invert_jacobian(dim: usize, jac: &[f64]) -> Result<(f64, Vec<f64>), MeshFormsError> {
    let singular = || MeshFormsError::InvalidGeometry("zero Jacobian determinant".to_string());
    match dim {
        1 => {
            let det = jac[0];
            if det.abs() < f64::EPSILON {
                return Err(singular());
            }
            Ok((det, vec![1.0 / det]))
        }
        2 => {
            let (a, b, c, d) = (jac[0], jac[1], jac[2], jac[3]);
            let det = a * d - b * c;
            if det.abs() < f64::EPSILON {
                return Err(singular());
            }
            Ok((det, vec![d / det, -b / det, -c / det, a / det]))
        }
        _ => Err(MeshFormsError::Unsupported(format!(
            "Jacobian inversion in {dim}D"
        ))),
    }
}
