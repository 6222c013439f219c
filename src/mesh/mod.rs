//! Unstructured mesh: topology, vertex coordinates, cell types and labels.
//!
//! `Mesh` is the geometric collaborator of the assembly engine. It answers
//! the questions the engine asks about a region: which cells or facets it
//! contains, which vertices close over them, and what their measures,
//! centroids and normals are.

pub mod boundary;
pub mod meshgen;

use std::collections::{BTreeMap, BTreeSet};

use num_traits::Float;

use crate::mesh_error::MeshFormsError;
use crate::topology::cell_type::CellType;
use crate::topology::labels::LabelSet;
use crate::topology::point::PointId;
use crate::topology::sieve::{InMemorySieve, Sieve};

pub use boundary::BoundaryInfo;
pub use meshgen::{line_mesh, rectangle_mesh};

/// Mesh with explicit cells, faces and vertices.
#[derive(Clone, Debug)]
pub struct Mesh {
    dim: usize,
    sieve: InMemorySieve,
    cell_types: BTreeMap<PointId, CellType>,
    coordinates: BTreeMap<PointId, Vec<f64>>,
    labels: LabelSet,
}

impl Mesh {
    /// Empty mesh of spatial dimension `dim`.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            sieve: InMemorySieve::new(),
            cell_types: BTreeMap::new(),
            coordinates: BTreeMap::new(),
            labels: LabelSet::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dim
    }

    pub fn sieve(&self) -> &InMemorySieve {
        &self.sieve
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn labels_mut(&mut self) -> &mut LabelSet {
        &mut self.labels
    }

    /// Registers a point of the given cell type.
    pub fn add_point(&mut self, p: PointId, cell_type: CellType) {
        self.sieve.add_point(p);
        self.cell_types.insert(p, cell_type);
    }

    /// Sets the cone of `p` in the given (oriented) order.
    pub fn set_cone(&mut self, p: PointId, cone: impl IntoIterator<Item = PointId>) {
        self.sieve.set_cone(p, cone);
    }

    /// Sets the coordinates of a vertex.
    pub fn set_coordinates(&mut self, v: PointId, xyz: &[f64]) -> Result<(), MeshFormsError> {
        if xyz.len() != self.dim {
            return Err(MeshFormsError::InvalidGeometry(format!(
                "vertex {v} has {} coordinates, mesh dimension is {}",
                xyz.len(),
                self.dim
            )));
        }
        self.coordinates.insert(v, xyz.to_vec());
        Ok(())
    }

    pub fn cell_type(&self, p: PointId) -> Result<CellType, MeshFormsError> {
        self.cell_types
            .get(&p)
            .copied()
            .ok_or_else(|| MeshFormsError::InvalidGeometry(format!("unknown mesh point {p}")))
    }

    pub fn coordinates(&self, v: PointId) -> Result<&[f64], MeshFormsError> {
        self.coordinates
            .get(&v)
            .map(Vec::as_slice)
            .ok_or_else(|| MeshFormsError::InvalidGeometry(format!("vertex {v} has no coordinates")))
    }

    /// Points of topological dimension `d`, ascending.
    pub fn points_of_dimension(&self, d: usize) -> Vec<PointId> {
        self.sieve.depth_strata().get(d).cloned().unwrap_or_default()
    }

    /// Cells (points of the mesh dimension), ascending.
    pub fn cells(&self) -> Vec<PointId> {
        self.points_of_dimension(self.dim)
    }

    /// Codimension-1 points, ascending.
    pub fn facets(&self) -> Vec<PointId> {
        match self.dim {
            0 => Vec::new(),
            d => self.points_of_dimension(d - 1),
        }
    }

    pub fn vertices(&self) -> Vec<PointId> {
        self.points_of_dimension(0)
    }

    /// Topological dimension of `p`.
    pub fn point_dimension(&self, p: PointId) -> Result<usize, MeshFormsError> {
        Ok(self.cell_type(p)?.dimension())
    }

    /// Vertices in the closure of `p`, in closure order.
    pub fn closure_vertices(&self, p: PointId) -> Vec<PointId> {
        self.sieve
            .closure(p)
            .into_iter()
            .filter(|q| self.cell_types.get(q) == Some(&CellType::Vertex))
            .collect()
    }

    /// Coordinates of the closure vertices of `p`.
    pub fn vertex_coordinates(&self, p: PointId) -> Result<Vec<Vec<f64>>, MeshFormsError> {
        self.closure_vertices(p)
            .into_iter()
            .map(|v| self.coordinates(v).map(<[f64]>::to_vec))
            .collect()
    }

    /// Cells adjacent to a facet.
    pub fn facet_cells(&self, f: PointId) -> &[PointId] {
        self.sieve.support(f)
    }

    /// True when the facet has exactly one adjacent cell.
    pub fn is_boundary_facet(&self, f: PointId) -> bool {
        self.sieve.support(f).len() == 1
    }

    pub fn has_label(&self, name: &str) -> bool {
        self.labels.has_label(name)
    }

    /// Cells of the region `label == value`; `None` selects every cell.
    pub fn region_cells(&self, label: Option<&str>, value: i32) -> Vec<PointId> {
        self.region_points_of_dimension(label, value, self.dim)
    }

    /// Facets of the region `label == value`; `None` selects boundary facets.
    pub fn region_facets(&self, label: Option<&str>, value: i32) -> Vec<PointId> {
        match label {
            None => self
                .facets()
                .into_iter()
                .filter(|&f| self.is_boundary_facet(f))
                .collect(),
            Some(_) if self.dim == 0 => Vec::new(),
            Some(_) => self.region_points_of_dimension(label, value, self.dim - 1),
        }
    }

    fn region_points_of_dimension(
        &self,
        label: Option<&str>,
        value: i32,
        d: usize,
    ) -> Vec<PointId> {
        match label {
            None => self.points_of_dimension(d),
            Some(name) => self
                .labels
                .stratum_points(name, value)
                .into_iter()
                .filter(|&p| self.cell_types.get(&p).map(|c| c.dimension()) == Some(d))
                .collect(),
        }
    }

    /// Vertices in the closure of the labelled points (or of all cells).
    pub fn region_vertices(&self, label: Option<&str>, value: i32) -> Vec<PointId> {
        let seeds = match label {
            None => return self.vertices(),
            Some(name) => self.labels.stratum_points(name, value),
        };
        let set: BTreeSet<PointId> = seeds
            .into_iter()
            .flat_map(|p| self.closure_vertices(p))
            .collect();
        set.into_iter().collect()
    }

    /// Arithmetic mean of the closure vertices.
    pub fn centroid(&self, p: PointId) -> Result<Vec<f64>, MeshFormsError> {
        let coords = self.vertex_coordinates(p)?;
        if coords.is_empty() {
            return Err(MeshFormsError::InvalidGeometry(format!(
                "point {p} has no vertices"
            )));
        }
        let n = coords.len() as f64;
        let mut c = vec![0.0; self.dim];
        for x in &coords {
            for (ci, xi) in c.iter_mut().zip(x) {
                *ci += xi / n;
            }
        }
        Ok(c)
    }

    /// Measure of a point: 1 for vertices, length, area.
    pub fn volume(&self, p: PointId) -> Result<f64, MeshFormsError> {
        let ct = self.cell_type(p)?;
        if ct == CellType::Vertex {
            return Ok(1.0);
        }
        let x = self.vertex_coordinates(p)?;
        if x.len() != ct.vertex_count() {
            return Err(MeshFormsError::InvalidGeometry(format!(
                "{ct:?} {p} has {} vertices",
                x.len()
            )));
        }
        match (ct, self.dim) {
            (CellType::Segment, _) => {
                let t: Vec<f64> = x[1].iter().zip(&x[0]).map(|(b, a)| b - a).collect();
                Ok(norm(&t))
            }
            (CellType::Triangle, 2) => {
                let (a, b, c) = (&x[0], &x[1], &x[2]);
                Ok(0.5 * ((b[0] - a[0]) * (c[1] - a[1]) - (c[0] - a[0]) * (b[1] - a[1])).abs())
            }
            (CellType::Quadrilateral, 2) => {
                let mut twice = 0.0;
                for i in 0..4 {
                    let (a, b) = (&x[i], &x[(i + 1) % 4]);
                    twice += a[0] * b[1] - b[0] * a[1];
                }
                Ok(0.5 * twice.abs())
            }
            (ct, d) => Err(MeshFormsError::Unsupported(format!(
                "volume of {ct:?} in {d}D"
            ))),
        }
    }

    /// Unit normal of a facet with a fixed orientation.
    ///
    /// In 1D the normal is `+x`. In 2D it is the facet tangent (first to
    /// second cone vertex) rotated clockwise.
    pub fn facet_normal(&self, f: PointId) -> Result<Vec<f64>, MeshFormsError> {
        match self.dim {
            1 => Ok(vec![1.0]),
            2 => {
                let x = self.vertex_coordinates(f)?;
                if x.len() != 2 {
                    return Err(MeshFormsError::InvalidGeometry(format!(
                        "facet {f} is not a segment"
                    )));
                }
                let t = [x[1][0] - x[0][0], x[1][1] - x[0][1]];
                let len = norm(&t);
                if len <= f64::EPSILON {
                    return Err(MeshFormsError::InvalidGeometry(format!(
                        "facet {f} has zero length"
                    )));
                }
                Ok(vec![t[1] / len, -t[0] / len])
            }
            d => Err(MeshFormsError::Unsupported(format!("facet normals in {d}D"))),
        }
    }

    /// Unit normal of facet `f` pointing out of `cell`.
    pub fn outward_normal(&self, f: PointId, cell: PointId) -> Result<Vec<f64>, MeshFormsError> {
        let mut n = self.facet_normal(f)?;
        if self.normal_points_into(f, cell, &n)? {
            n.iter_mut().for_each(|v| *v = -*v);
        }
        Ok(n)
    }

    /// True when `n` points from facet `f` into `cell`.
    pub(crate) fn normal_points_into(
        &self,
        f: PointId,
        cell: PointId,
        n: &[f64],
    ) -> Result<bool, MeshFormsError> {
        let fc = self.centroid(f)?;
        let cc = self.centroid(cell)?;
        let d: Vec<f64> = fc.iter().zip(&cc).map(|(a, b)| a - b).collect();
        Ok(dot(n, &d) < 0.0)
    }
}

/// Euclidean dot product.
pub(crate) fn dot<T: Float>(a: &[T], b: &[T]) -> T {
    a.iter().zip(b).fold(T::zero(), |acc, (&x, &y)| acc + x * y)
}

/// Euclidean norm.
pub(crate) fn norm<T: Float>(a: &[T]) -> T {
    dot(a, a).sqrt()
}
