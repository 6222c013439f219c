//! Boundary geometry: facet normals and lengths, nodal normals.

use std::collections::BTreeMap;

use crate::discretization::runtime::{Basis, QuadratureRule, tabulate_element};
use crate::mesh::{Mesh, norm};
use crate::mesh_error::MeshFormsError;
use crate::topology::cell_type::CellType;
use crate::topology::point::PointId;
use crate::topology::sieve::Sieve;

/// Geometry of one labelled boundary.
#[derive(Clone, Debug, Default)]
pub struct BoundaryInfo {
    /// Boundary facets, ascending.
    pub facets: Vec<PointId>,
    /// Facet measure (length in 2D, 1 in 1D).
    pub length: Vec<f64>,
    /// Facet unit outward normal.
    pub normal: Vec<Vec<f64>>,
    /// Vertices in the closure of the facets, ascending.
    pub vertices: Vec<PointId>,
    /// Vertex unit outward normal.
    pub nodal_normal: Vec<Vec<f64>>,
}

impl BoundaryInfo {
    /// Computes facet and nodal normals for the facets of `label == value`.
    pub fn compute(mesh: &Mesh, label: &str, value: i32) -> Result<Self, MeshFormsError> {
        if !mesh.has_label(label) {
            log::error!("boundary '{label}' does not exist in the mesh");
            return Err(MeshFormsError::UnknownLabel(label.to_string()));
        }
        let facets = mesh.region_facets(Some(label), value);
        let mut info = BoundaryInfo {
            facets,
            ..Default::default()
        };
        for &f in &info.facets {
            let cell = single_cell(mesh, f)?;
            info.length.push(mesh.volume(f)?);
            info.normal.push(mesh.outward_normal(f, cell)?);
        }
        info.vertices = mesh.region_vertices(Some(label), value);
        info.compute_nodal_normals(mesh)?;
        Ok(info)
    }

    /// Nodal normal = normalized sum over incident cells of `|K| grad(phi_v)`
    /// evaluated at the cell centroid.
    fn compute_nodal_normals(&mut self, mesh: &Mesh) -> Result<(), MeshFormsError> {
        let dim = mesh.dimension();
        let mut sums: BTreeMap<PointId, Vec<f64>> = self
            .vertices
            .iter()
            .map(|&v| (v, vec![0.0; dim]))
            .collect();
        for cell in mesh.cells() {
            let verts = mesh.closure_vertices(cell);
            if !verts.iter().any(|v| sums.contains_key(v)) {
                continue;
            }
            let basis = Basis::for_cell(mesh.cell_type(cell)?)?;
            let quad = QuadratureRule {
                points: vec![basis.reference_centroid()],
                weights: vec![1.0],
            };
            let tab = tabulate_element(basis, &quad, &mesh.vertex_coordinates(cell)?)?;
            let vol = mesh.volume(cell)?;
            for (local, v) in verts.iter().enumerate() {
                if let Some(sum) = sums.get_mut(v) {
                    for (s, g) in sum.iter_mut().zip(&tab.basis_gradients[0][local]) {
                        *s += vol * g;
                    }
                }
            }
        }
        self.nodal_normal = self
            .vertices
            .iter()
            .map(|v| {
                let s = &sums[v];
                let mag = norm(s);
                s.iter().map(|x| x / mag).collect()
            })
            .collect();
        if mesh
            .cells()
            .first()
            .map(|&c| mesh.cell_type(c))
            .transpose()?
            == Some(CellType::Triangle)
        {
            self.correct_nodal_normals(mesh);
        }
        Ok(())
    }

    /// Triangle meshes only: a vertex touching exactly one facet of this
    /// boundary takes that facet's normal. Other element types are left as
    /// computed; whether they need the same treatment is unresolved.
    fn correct_nodal_normals(&mut self, mesh: &Mesh) {
        let idx_of: BTreeMap<PointId, usize> =
            self.facets.iter().enumerate().map(|(i, &f)| (f, i)).collect();
        for (i, v) in self.vertices.iter().enumerate() {
            let common: Vec<usize> = mesh
                .sieve()
                .support(*v)
                .iter()
                .filter_map(|f| idx_of.get(f).copied())
                .collect();
            if let [only] = common.as_slice() {
                self.nodal_normal[i] = self.normal[*only].clone();
            }
        }
    }
}

fn single_cell(mesh: &Mesh, f: PointId) -> Result<PointId, MeshFormsError> {
    match mesh.facet_cells(f) {
        [c] => Ok(*c),
        other => Err(MeshFormsError::InvalidGeometry(format!(
            "facet {f} has {} adjacent cells, expected a boundary facet",
            other.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::rectangle_mesh;

    fn close(a: &[f64], b: &[f64]) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-12)
    }

    #[test]
    fn facet_normals_point_outward() {
        let mesh = rectangle_mesh(2, 2, [0.0, 0.0], [1.0, 1.0], CellType::Quadrilateral).unwrap();
        let info = BoundaryInfo::compute(&mesh, "left", 1).unwrap();
        assert_eq!(info.facets.len(), 2);
        for (n, l) in info.normal.iter().zip(&info.length) {
            assert!(close(n, &[-1.0, 0.0]));
            assert!((l - 0.5).abs() < 1e-14);
        }
        let top = BoundaryInfo::compute(&mesh, "top", 1).unwrap();
        assert!(top.normal.iter().all(|n| close(n, &[0.0, 1.0])));
    }

    #[test]
    fn quad_corner_nodal_normal_is_diagonal() {
        let mesh = rectangle_mesh(2, 2, [0.0, 0.0], [1.0, 1.0], CellType::Quadrilateral).unwrap();
        let info = BoundaryInfo::compute(&mesh, "left", 1).unwrap();
        assert_eq!(info.vertices.len(), 3);
        let s = 1.0 / 2.0_f64.sqrt();
        let corner = mesh.coordinates(info.vertices[0]).unwrap();
        assert_eq!(corner, &[0.0, 0.0]);
        assert!(close(&info.nodal_normal[0], &[-s, -s]));
        assert!(close(&info.nodal_normal[1], &[-1.0, 0.0]));
    }

    #[test]
    fn triangle_corner_snaps_to_facet_normal() {
        let mesh = rectangle_mesh(2, 2, [0.0, 0.0], [1.0, 1.0], CellType::Triangle).unwrap();
        let info = BoundaryInfo::compute(&mesh, "left", 1).unwrap();
        for n in &info.nodal_normal {
            assert!(close(n, &[-1.0, 0.0]));
        }
    }

    #[test]
    fn unknown_boundary() {
        let mesh = rectangle_mesh(1, 1, [0.0, 0.0], [1.0, 1.0], CellType::Triangle).unwrap();
        assert_eq!(
            BoundaryInfo::compute(&mesh, "inlet", 1).unwrap_err(),
            MeshFormsError::UnknownLabel("inlet".into())
        );
    }
}
