//! Structured mesh generators for tests, demos and benchmarks.
//!
//! Generated meshes number cells first, then vertices, then (in 2D) edges.
//! Every boundary side is a label (`left`, `right`, `bottom`, `top`) with
//! stratum value 1 covering the side's facets and their vertices; `marker`
//! covers the whole boundary.

use itertools::iproduct;

use crate::mesh::Mesh;
use crate::mesh_error::MeshFormsError;
use crate::topology::cell_type::CellType;
use crate::topology::point::PointId;
use crate::topology::sieve::Sieve;

/// Uniform 1D mesh of `nx` segments on `[xmin, xmax]`.
pub fn line_mesh(nx: usize, xmin: f64, xmax: f64) -> Result<Mesh, MeshFormsError> {
    if nx == 0 || xmax <= xmin {
        return Err(MeshFormsError::InvalidGeometry(format!(
            "line mesh needs nx > 0 and xmin < xmax, got nx={nx}, [{xmin}, {xmax}]"
        )));
    }
    let mut mesh = Mesh::new(1);
    let vertex = |i: usize| PointId::new((nx + 1 + i) as u64);
    let h = (xmax - xmin) / nx as f64;
    for i in 0..=nx {
        let v = vertex(i)?;
        mesh.add_point(v, CellType::Vertex);
        mesh.set_coordinates(v, &[xmin + h * i as f64])?;
    }
    for i in 0..nx {
        let c = PointId::new(1 + i as u64)?;
        mesh.add_point(c, CellType::Segment);
        mesh.set_cone(c, [vertex(i)?, vertex(i + 1)?]);
    }
    let (first, last) = (vertex(0)?, vertex(nx)?);
    let labels = mesh.labels_mut();
    labels.set_label(first, "left", 1);
    labels.set_label(last, "right", 1);
    labels.set_label(first, "marker", 1);
    labels.set_label(last, "marker", 1);
    log::debug!("line mesh: {nx} cells on [{xmin}, {xmax}]");
    Ok(mesh)
}

/// Uniform 2D mesh of `nx * ny` quads (or twice as many triangles) on the
/// box spanned by `min` and `max`.
///
/// Cell cones list edges so that the breadth-first closure visits vertices
/// counterclockwise starting at the lower-left one.
pub fn rectangle_mesh(
    nx: usize,
    ny: usize,
    min: [f64; 2],
    max: [f64; 2],
    cell_type: CellType,
) -> Result<Mesh, MeshFormsError> {
    if nx == 0 || ny == 0 || max[0] <= min[0] || max[1] <= min[1] {
        return Err(MeshFormsError::InvalidGeometry(format!(
            "rectangle mesh needs positive extents, got {nx}x{ny} on {min:?}..{max:?}"
        )));
    }
    let cells_per_box = match cell_type {
        CellType::Quadrilateral => 1,
        CellType::Triangle => 2,
        other => {
            return Err(MeshFormsError::Unsupported(format!(
                "rectangle mesh of {other:?} cells"
            )));
        }
    };

    let n_cells = nx * ny * cells_per_box;
    let vbase = n_cells + 1;
    let vid = |i: usize, j: usize| vbase + j * (nx + 1) + i;
    let hbase = vbase + (nx + 1) * (ny + 1);
    let hid = |i: usize, j: usize| hbase + j * nx + i;
    let vebase = hbase + nx * (ny + 1);
    let veid = |i: usize, j: usize| vebase + j * (nx + 1) + i;
    let dbase = vebase + (nx + 1) * ny;
    let did = |i: usize, j: usize| dbase + j * nx + i;
    let pid = |raw: usize| PointId::new(raw as u64);

    let mut mesh = Mesh::new(2);
    let (hx, hy) = ((max[0] - min[0]) / nx as f64, (max[1] - min[1]) / ny as f64);
    for (j, i) in iproduct!(0..=ny, 0..=nx) {
        let v = pid(vid(i, j))?;
        mesh.add_point(v, CellType::Vertex);
        mesh.set_coordinates(v, &[min[0] + hx * i as f64, min[1] + hy * j as f64])?;
    }
    for (j, i) in iproduct!(0..=ny, 0..nx) {
        let e = pid(hid(i, j))?;
        mesh.add_point(e, CellType::Segment);
        mesh.set_cone(e, [pid(vid(i, j))?, pid(vid(i + 1, j))?]);
    }
    for (j, i) in iproduct!(0..ny, 0..=nx) {
        let e = pid(veid(i, j))?;
        mesh.add_point(e, CellType::Segment);
        mesh.set_cone(e, [pid(vid(i, j))?, pid(vid(i, j + 1))?]);
    }

    for (j, i) in iproduct!(0..ny, 0..nx) {
        let bottom = pid(hid(i, j))?;
        let right = pid(veid(i + 1, j))?;
        let top = pid(hid(i, j + 1))?;
        let left = pid(veid(i, j))?;
        let k = j * nx + i;
        match cell_type {
            CellType::Quadrilateral => {
                let c = pid(1 + k)?;
                mesh.add_point(c, CellType::Quadrilateral);
                mesh.set_cone(c, [bottom, right, top, left]);
            }
            _ => {
                let diag = pid(did(i, j))?;
                mesh.add_point(diag, CellType::Segment);
                mesh.set_cone(diag, [pid(vid(i, j))?, pid(vid(i + 1, j + 1))?]);
                let lower = pid(1 + 2 * k)?;
                mesh.add_point(lower, CellType::Triangle);
                mesh.set_cone(lower, [bottom, right, diag]);
                let upper = pid(2 + 2 * k)?;
                mesh.add_point(upper, CellType::Triangle);
                mesh.set_cone(upper, [diag, top, left]);
            }
        }
    }

    let mut sides: Vec<(&str, PointId)> = Vec::new();
    for i in 0..nx {
        sides.push(("bottom", pid(hid(i, 0))?));
        sides.push(("top", pid(hid(i, ny))?));
    }
    for j in 0..ny {
        sides.push(("left", pid(veid(0, j))?));
        sides.push(("right", pid(veid(nx, j))?));
    }
    for (name, edge) in sides {
        let closure = mesh.sieve().closure(edge);
        let labels = mesh.labels_mut();
        for p in closure {
            labels.set_label(p, name, 1);
            labels.set_label(p, "marker", 1);
        }
    }
    log::debug!("rectangle mesh: {n_cells} {cell_type:?} cells ({nx}x{ny})");
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_closure_is_counterclockwise() {
        let mesh = rectangle_mesh(1, 1, [0.0, 0.0], [1.0, 1.0], CellType::Triangle).unwrap();
        let cells = mesh.cells();
        assert_eq!(cells.len(), 2);
        let lower = mesh.vertex_coordinates(cells[0]).unwrap();
        assert_eq!(lower, vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![1.0, 1.0]]);
        let upper = mesh.vertex_coordinates(cells[1]).unwrap();
        assert_eq!(upper, vec![vec![0.0, 0.0], vec![1.0, 1.0], vec![0.0, 1.0]]);
        for c in cells {
            assert!((mesh.volume(c).unwrap() - 0.5).abs() < 1e-14);
        }
    }

    #[test]
    fn quad_closure_is_counterclockwise() {
        let mesh = rectangle_mesh(1, 1, [0.0, 0.0], [1.0, 1.0], CellType::Quadrilateral).unwrap();
        let x = mesh.vertex_coordinates(mesh.cells()[0]).unwrap();
        assert_eq!(
            x,
            vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![1.0, 1.0], vec![0.0, 1.0]]
        );
    }

    #[test]
    fn side_labels_cover_facets_and_vertices() {
        let mesh = rectangle_mesh(3, 2, [0.0, 0.0], [3.0, 2.0], CellType::Quadrilateral).unwrap();
        assert_eq!(mesh.region_facets(Some("left"), 1).len(), 2);
        assert_eq!(mesh.region_facets(Some("bottom"), 1).len(), 3);
        assert_eq!(mesh.region_vertices(Some("left"), 1).len(), 3);
        assert_eq!(mesh.region_facets(None, 0).len(), 10);
        for f in mesh.region_facets(Some("top"), 1) {
            assert!(mesh.is_boundary_facet(f));
        }
    }

    #[test]
    fn line_mesh_labels() {
        let mesh = line_mesh(4, -1.0, 1.0).unwrap();
        assert_eq!(mesh.cells().len(), 4);
        let left = mesh.labels().stratum_points("left", 1);
        assert_eq!(mesh.coordinates(left[0]).unwrap(), &[-1.0]);
        assert!(line_mesh(0, 0.0, 1.0).is_err());
    }
}
