//! Explicit finite-volume problem driver.
//!
//! All fields are cellwise constants, folded into a single combined field
//! (see [`FieldCatalog::finite_volume_view`]). Every facet carries a fixed
//! unit normal; the cell the normal points out of is the left state, the
//! other the right state. On a boundary facet the missing state is a ghost
//! computed by the natural Riemann condition covering the facet, or a copy
//! of the interior state when no condition covers it.
//!
//! The right-hand side of `du/dt = -div F` is assembled per cell as
//! `rhs[L] -= F * area / vol(L)` and `rhs[R] += F * area / vol(R)`.

use crate::algebra::{DenseVector, InsertMode, VectorLike};
use crate::bc::BoundaryCondition;
use crate::data::section::Section;
use crate::discretization::fields::{FieldCatalog, FieldInfo};
use crate::mesh::{Mesh, dot};
use crate::mesh_error::MeshFormsError;
use crate::problem::options::FvOptions;
use crate::problem::{DiscreteProblem, TransientState};
use crate::topology::point::PointId;

/// Numerical flux across a facet.
pub trait RiemannSolver {
    /// Writes the flux through a facet at `x` with unit normal `n`, from the
    /// left state to the right state.
    fn flux(&self, x: &[f64], n: &[f64], left: &[f64], right: &[f64], flux: &mut [f64]);
}

impl<F> RiemannSolver for F
where
    F: Fn(&[f64], &[f64], &[f64], &[f64], &mut [f64]),
{
    fn flux(&self, x: &[f64], n: &[f64], left: &[f64], right: &[f64], flux: &mut [f64]) {
        self(x, n, left, right, flux)
    }
}

/// A finite-volume PDE: its fields and its Riemann solver.
pub trait FvDefinition: RiemannSolver {
    fn set_up_fields(&self, catalog: &mut FieldCatalog) -> Result<(), MeshFormsError>;
}

/// Flux through one facet.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceFlux {
    pub facet: PointId,
    /// Cell on the left; `None` when the left state is a ghost.
    pub left: Option<PointId>,
    /// Cell on the right; `None` when the right state is a ghost.
    pub right: Option<PointId>,
    pub flux: Vec<f64>,
    pub area: f64,
}

/// Explicit finite-volume problem.
pub struct FvProblem<D: FvDefinition> {
    def: D,
    mesh: Mesh,
    options: FvOptions,
    catalog: FieldCatalog,
    field: Option<FieldInfo>,
    bcs: Vec<BoundaryCondition>,
    section: Option<Section>,
    time: f64,
    time_shift: f64,
    x_t: Option<DenseVector>,
}

impl<D: FvDefinition> std::fmt::Debug for FvProblem<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FvProblem")
            .field("field", &self.field)
            .field("bcs", &self.bcs.len())
            .field("created", &self.section.is_some())
            .finish()
    }
}

impl<D: FvDefinition> FvProblem<D> {
    pub fn new(mesh: Mesh, def: D, options: FvOptions) -> Self {
        let time = options.time;
        Self {
            def,
            mesh,
            options,
            catalog: FieldCatalog::new(),
            field: None,
            bcs: Vec::new(),
            section: None,
            time,
            time_shift: 0.0,
            x_t: None,
        }
    }

    /// Only natural Riemann conditions are meaningful here.
    pub fn add_boundary_condition(
        &mut self,
        bc: impl Into<BoundaryCondition>,
    ) -> Result<(), MeshFormsError> {
        let bc = bc.into();
        if self.section.is_some() {
            return Err(MeshFormsError::Unsupported(
                "adding a boundary condition after create()".into(),
            ));
        }
        match bc {
            BoundaryCondition::NaturalRiemann(_) => {
                self.bcs.push(bc);
                Ok(())
            }
            _ => {
                let err = MeshFormsError::UnsupportedBoundaryCondition {
                    kind: bc.kind(),
                    discretization: "finite volume",
                };
                log::error!("'{}': {err}", bc.name());
                Err(err)
            }
        }
    }

    pub fn create(&mut self) -> Result<(), MeshFormsError> {
        if self.section.is_some() {
            return Err(MeshFormsError::Unsupported("create() called twice".into()));
        }
        let mut catalog = FieldCatalog::new();
        self.def.set_up_fields(&mut catalog)?;
        if catalog.num_fields() == 0 {
            return Err(MeshFormsError::Unsupported("problem without fields".into()));
        }
        if let Some(fi) = catalog.fields().find(|fi| fi.order != 0) {
            return Err(MeshFormsError::Unsupported(format!(
                "finite-volume field '{}' of order {}",
                fi.name, fi.order
            )));
        }
        for bc in &mut self.bcs {
            bc.create(&self.mesh, &catalog)?;
        }
        let field = catalog.finite_volume_view();
        let section = Section::from_fields(&self.mesh, [&field], self.options.closure_layout)?;
        log::info!(
            "finite-volume problem: field '{}' with {} component(s), {} BC(s), {} DOFs",
            field.name,
            field.nc,
            self.bcs.len(),
            section.len()
        );
        self.catalog = catalog;
        self.field = Some(field);
        self.section = Some(section);
        Ok(())
    }

    /// The combined cellwise field.
    pub fn field(&self) -> Result<&FieldInfo, MeshFormsError> {
        self.field.as_ref().ok_or(MeshFormsError::NotCreated("field"))
    }

    pub fn definition(&self) -> &D {
        &self.def
    }

    pub fn boundary_conditions(&self) -> &[BoundaryCondition] {
        &self.bcs
    }

    pub fn time_derivative(&self) -> Option<&DenseVector> {
        self.x_t.as_ref()
    }

    fn cell_state<'x>(
        section: &Section,
        x: &'x dyn VectorLike,
        cell: PointId,
    ) -> Result<&'x [f64], MeshFormsError> {
        let (off, len) = section.offset(cell)?;
        x.as_slice()
            .get(off..off + len)
            .ok_or(MeshFormsError::IndexOutOfBounds {
                index: off + len,
                len: x.len(),
            })
    }

    /// Ghost state behind boundary facet `f`.
    fn ghost_state(
        &self,
        f: PointId,
        centroid: &[f64],
        outward: &[f64],
        interior: &[f64],
    ) -> Result<Vec<f64>, MeshFormsError> {
        let mut ghost = interior.to_vec();
        let covering = self.bcs.iter().find_map(|bc| match bc {
            BoundaryCondition::NaturalRiemann(r)
                if self.mesh.labels().get_label(f, r.boundary()) == Some(1) =>
            {
                Some(r)
            }
            _ => None,
        });
        if let Some(bc) = covering {
            let code = bc.callback().invoke(self.time, centroid, outward, interior, &mut ghost);
            if code != 0 {
                log::error!("callback '{}' returned error code {code}", bc.name());
                return Err(MeshFormsError::CallbackFailed {
                    name: bc.name().to_string(),
                    code,
                });
            }
        }
        Ok(ghost)
    }

    /// Numerical flux through every facet at state `x`.
    pub fn compute_face_fluxes(&self, x: &dyn VectorLike) -> Result<Vec<FaceFlux>, MeshFormsError> {
        let section = self.section.as_ref().ok_or(MeshFormsError::NotCreated("compute_face_fluxes"))?;
        let nc = self.field()?.nc;
        let mut out = Vec::new();
        for f in self.mesh.facets() {
            let n = self.mesh.facet_normal(f)?;
            let c = self.mesh.centroid(f)?;
            let area = self.mesh.volume(f)?;
            let (left, right, u_l, u_r) = match *self.mesh.facet_cells(f) {
                [a, b] => {
                    let (l, r) = if self.mesh.normal_points_into(f, a, &n)? {
                        (b, a)
                    } else {
                        (a, b)
                    };
                    let u_l = Self::cell_state(section, x, l)?.to_vec();
                    let u_r = Self::cell_state(section, x, r)?.to_vec();
                    (Some(l), Some(r), u_l, u_r)
                }
                [cell] => {
                    let interior = Self::cell_state(section, x, cell)?;
                    let outward = self.mesh.outward_normal(f, cell)?;
                    let ghost = self.ghost_state(f, &c, &outward, interior)?;
                    if dot(&outward, &n) > 0.0 {
                        (Some(cell), None, interior.to_vec(), ghost)
                    } else {
                        (None, Some(cell), ghost, interior.to_vec())
                    }
                }
                _ => continue,
            };
            let mut flux = vec![0.0; nc];
            self.def.flux(&c, &n, &u_l, &u_r, &mut flux);
            out.push(FaceFlux {
                facet: f,
                left,
                right,
                flux,
                area,
            });
        }
        log::trace!("computed {} face fluxes", out.len());
        Ok(out)
    }

    /// Overwrites `rhs` with `-div F` at state `x`.
    pub fn compute_rhs(&self, x: &dyn VectorLike, rhs: &mut dyn VectorLike) -> Result<(), MeshFormsError> {
        let section = self.section.as_ref().ok_or(MeshFormsError::NotCreated("compute_rhs"))?;
        rhs.zero();
        rhs.assembly_begin();
        for ff in self.compute_face_fluxes(x)? {
            for (cell, sign) in [(ff.left, -1.0), (ff.right, 1.0)] {
                let Some(cell) = cell else { continue };
                let (off, len) = section.offset(cell)?;
                let scale = sign * ff.area / self.mesh.volume(cell)?;
                let vals: Vec<f64> = ff.flux.iter().map(|v| v * scale).collect();
                let idx: Vec<usize> = (off..off + len).collect();
                rhs.set_values(&idx, &vals, InsertMode::Add)?;
            }
        }
        rhs.assembly_end();
        Ok(())
    }
}

impl<D: FvDefinition> DiscreteProblem for FvProblem<D> {
    fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    fn section(&self) -> Result<&Section, MeshFormsError> {
        self.section.as_ref().ok_or(MeshFormsError::NotCreated("section"))
    }
}

impl<D: FvDefinition> TransientState for FvProblem<D> {
    fn time(&self) -> f64 {
        self.time
    }

    fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    fn time_shift(&self) -> f64 {
        self.time_shift
    }

    fn set_time_shift(&mut self, shift: f64) {
        self.time_shift = shift;
    }

    fn set_time_derivative(&mut self, x_t: Option<DenseVector>) {
        self.x_t = x_t;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bc::{EssentialBc, NaturalBc};
    use crate::mesh::line_mesh;

    struct Copy1;

    impl RiemannSolver for Copy1 {
        fn flux(&self, _: &[f64], _: &[f64], l: &[f64], _: &[f64], f: &mut [f64]) {
            f.copy_from_slice(l);
        }
    }

    impl FvDefinition for Copy1 {
        fn set_up_fields(&self, catalog: &mut FieldCatalog) -> Result<(), MeshFormsError> {
            catalog.add_field("u", 1, 0).map(|_| ())
        }
    }

    #[test]
    fn essential_and_natural_rejected() {
        let mesh = line_mesh(2, 0.0, 1.0).unwrap();
        let mut p = FvProblem::new(mesh, Copy1, FvOptions::default());
        assert_eq!(
            p.add_boundary_condition(EssentialBc::new("e", "left", &[0], |_, _, u| u[0] = 0.0)),
            Err(MeshFormsError::UnsupportedBoundaryCondition {
                kind: "Essential",
                discretization: "finite volume"
            })
        );
        assert_eq!(
            p.add_boundary_condition(NaturalBc::new("n", "left", &[0])),
            Err(MeshFormsError::UnsupportedBoundaryCondition {
                kind: "Natural",
                discretization: "finite volume"
            })
        );
    }

    #[test]
    fn closure_solver_and_uncovered_boundary() {
        let solver = |_: &[f64], _: &[f64], l: &[f64], r: &[f64], f: &mut [f64]| f[0] = l[0] - r[0];
        let mut f = [0.0];
        solver.flux(&[0.0], &[1.0], &[3.0], &[1.0], &mut f);
        assert_eq!(f, [2.0]);

        let mesh = line_mesh(2, 0.0, 1.0).unwrap();
        let mut p = FvProblem::new(mesh, Copy1, FvOptions::default());
        p.create().unwrap();
        let x = DenseVector::from_vec(vec![1.0, 1.0]);
        let mut rhs = DenseVector::new(2);
        p.compute_rhs(&x, &mut rhs).unwrap();
        // uniform state, no BC: every cell balances
        assert!(rhs.as_slice().iter().all(|v| v.abs() < 1e-12));
    }
}
