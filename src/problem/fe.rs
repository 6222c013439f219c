//! Finite-element problem driver.
//!
//! [`FeProblem`] composes a [`PdeDefinition`] with the mesh, the field
//! catalog, the weak form, the dependency evaluator, boundary and initial
//! conditions and auxiliary evaluators. `create()` performs every
//! configuration check up front; afterwards the problem serves residuals and
//! Jacobians through [`NonlinearSystem`].
//!
//! Essential DOFs are eliminated row-wise: their residual entry is
//! `x - g` and their Jacobian row is the identity row.

use std::collections::BTreeSet;

use crate::algebra::{DenseVector, InsertMode, MatrixLike, VectorLike};
use crate::algs::assembly::{Assembler, AuxData};
use crate::bc::{BoundaryCondition, EssentialBc};
use crate::data::section::Section;
use crate::dependency::DependencyEvaluator;
use crate::discretization::fields::FieldCatalog;
use crate::mesh::Mesh;
use crate::mesh_error::MeshFormsError;
use crate::problem::aux::AuxFieldEvaluator;
use crate::problem::initial::InitialCondition;
use crate::problem::options::ProblemOptions;
use crate::problem::{DiscreteProblem, NonlinearSystem, PdeDefinition, TransientState, field_nodes};
use crate::weak_form::kinds::JacobianSet;
use crate::weak_form::registry::WeakForm;

/// Finite-element problem.
pub struct FeProblem<P: PdeDefinition> {
    pde: P,
    mesh: Mesh,
    options: ProblemOptions,
    catalog: FieldCatalog,
    weak_form: WeakForm,
    evaluator: DependencyEvaluator,
    bcs: Vec<BoundaryCondition>,
    ics: Vec<InitialCondition>,
    aux_evaluators: Vec<AuxFieldEvaluator>,
    section: Option<Section>,
    aux_section: Option<Section>,
    aux_values: DenseVector,
    time: f64,
    time_shift: f64,
    x_t: Option<DenseVector>,
}

impl<P: PdeDefinition> std::fmt::Debug for FeProblem<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeProblem")
            .field("fields", &self.catalog.field_names())
            .field("weak_form", &self.weak_form)
            .field("bcs", &self.bcs.len())
            .field("created", &self.section.is_some())
            .finish()
    }
}

impl<P: PdeDefinition> FeProblem<P> {
    pub fn new(mesh: Mesh, pde: P, options: ProblemOptions) -> Self {
        let time = options.time;
        Self {
            pde,
            mesh,
            options,
            catalog: FieldCatalog::new(),
            weak_form: WeakForm::default(),
            evaluator: DependencyEvaluator::new(),
            bcs: Vec::new(),
            ics: Vec::new(),
            aux_evaluators: Vec::new(),
            section: None,
            aux_section: None,
            aux_values: DenseVector::new(0),
            time,
            time_shift: 0.0,
            x_t: None,
        }
    }

    fn check_not_created(&self, what: &str) -> Result<(), MeshFormsError> {
        match self.section {
            Some(_) => Err(MeshFormsError::Unsupported(format!(
                "adding {what} after create()"
            ))),
            None => Ok(()),
        }
    }

    pub fn add_boundary_condition(
        &mut self,
        bc: impl Into<BoundaryCondition>,
    ) -> Result<(), MeshFormsError> {
        self.check_not_created("a boundary condition")?;
        self.bcs.push(bc.into());
        Ok(())
    }

    pub fn add_initial_condition(&mut self, ic: InitialCondition) -> Result<(), MeshFormsError> {
        self.check_not_created("an initial condition")?;
        self.ics.push(ic);
        Ok(())
    }

    pub fn add_aux_evaluator(&mut self, aux: AuxFieldEvaluator) -> Result<(), MeshFormsError> {
        self.check_not_created("an auxiliary evaluator")?;
        self.aux_evaluators.push(aux);
        Ok(())
    }

    /// Validates the configuration and builds the weak form and DOF layouts.
    pub fn create(&mut self) -> Result<(), MeshFormsError> {
        if self.section.is_some() {
            return Err(MeshFormsError::Unsupported("create() called twice".into()));
        }
        let mut catalog = FieldCatalog::new();
        self.pde.set_up_fields(&mut catalog)?;
        if catalog.num_fields() == 0 {
            return Err(MeshFormsError::Unsupported("problem without fields".into()));
        }

        for bc in &mut self.bcs {
            if let BoundaryCondition::NaturalRiemann(_) = bc {
                let err = MeshFormsError::UnsupportedBoundaryCondition {
                    kind: "NaturalRiemann",
                    discretization: "finite element",
                };
                log::error!("'{}': {err}", bc.name());
                return Err(err);
            }
            bc.create(&self.mesh, &catalog)?;
            if let BoundaryCondition::Essential(e) = bc {
                if catalog.field_order(e.field_id()?)? == 0 {
                    return Err(MeshFormsError::Unsupported(format!(
                        "essential condition '{}' on a cellwise field",
                        e.name()
                    )));
                }
            }
        }
        self.create_initial_conditions(&catalog)?;
        for aux in &mut self.aux_evaluators {
            aux.create(&self.mesh, &catalog)?;
        }

        let n_fields = catalog.fields().map(|f| f.id + 1).max().unwrap_or(0);
        let mut weak_form = WeakForm::new(n_fields);
        self.pde.set_up_weak_form(&catalog, &mut weak_form)?;
        for bc in &mut self.bcs {
            if let BoundaryCondition::Natural(n) = bc {
                n.set_up_weak_form(&mut weak_form, &catalog)?;
            }
        }
        if let Some(id) = weak_form.field_ids().into_iter().find(|&id| !catalog.has_field_by_id(id)) {
            let err = MeshFormsError::UnknownField(id);
            log::error!("weak form term on an unregistered field: {err}");
            return Err(err);
        }

        let mut evaluator = DependencyEvaluator::new();
        self.pde.set_up_functionals(&mut evaluator)?;
        evaluator.declare_values()?;
        let requested = weak_form.dependent_values();
        evaluator.evaluation_order(requested.iter().map(String::as_str))?;

        let mut section = Section::from_fields(&self.mesh, catalog.fields(), self.options.closure_layout)?;
        for bc in &self.bcs {
            if let BoundaryCondition::Essential(e) = bc {
                let fid = e.field_id()?;
                for v in self.mesh.region_vertices(Some(e.boundary()), 1) {
                    if section.field_offset(v, fid).is_some() {
                        section.constrain(v, fid, e.components())?;
                    }
                }
            }
        }

        if catalog.num_aux_fields() > 0 {
            let aux_section =
                Section::from_fields(&self.mesh, catalog.aux_fields(), self.options.closure_layout)?;
            self.aux_values = DenseVector::new(aux_section.len());
            self.aux_section = Some(aux_section);
        }

        log::info!(
            "finite-element problem: {} field(s), {} aux field(s), {} BC(s), {} DOFs",
            catalog.num_fields(),
            catalog.num_aux_fields(),
            self.bcs.len(),
            section.len()
        );
        self.catalog = catalog;
        self.weak_form = weak_form;
        self.evaluator = evaluator;
        self.section = Some(section);
        self.project_aux_fields()
    }

    fn create_initial_conditions(&mut self, catalog: &FieldCatalog) -> Result<(), MeshFormsError> {
        if self.ics.is_empty() {
            return Ok(());
        }
        if self.ics.len() != catalog.num_fields() {
            let err = MeshFormsError::InitialConditionCount {
                fields: catalog.num_fields(),
                ics: self.ics.len(),
            };
            log::error!("{err}");
            return Err(err);
        }
        let mut seen = BTreeSet::new();
        for ic in &mut self.ics {
            ic.create(catalog)?;
            if !seen.insert(ic.field_id()?) {
                let err = MeshFormsError::DuplicateInitialCondition(ic.name().to_string());
                log::error!("{err}");
                return Err(err);
            }
        }
        Ok(())
    }

    /// Samples every auxiliary evaluator at its field's DOF locations.
    fn project_aux_fields(&mut self) -> Result<(), MeshFormsError> {
        let Some(aux_section) = &self.aux_section else {
            return Ok(());
        };
        for aux in &self.aux_evaluators {
            let fid = aux.field_id()?;
            let nc = aux.num_components();
            let allowed: Option<BTreeSet<_>> = aux.region().map(|r| {
                let vertices = self.mesh.region_vertices(Some(r), 1);
                vertices.into_iter().chain(self.mesh.region_cells(Some(r), 1)).collect()
            });
            let mut buf = vec![0.0; nc];
            for (p, off, xyz) in field_nodes(&self.mesh, aux_section, fid)? {
                if allowed.as_ref().is_some_and(|set| !set.contains(&p)) {
                    continue;
                }
                aux.evaluate(self.time, &xyz, &mut buf);
                let idx: Vec<usize> = (off..off + nc).collect();
                self.aux_values.set_values(&idx, &buf, InsertMode::Insert)?;
            }
        }
        Ok(())
    }

    fn created_section(&self, caller: &'static str) -> Result<&Section, MeshFormsError> {
        self.section.as_ref().ok_or(MeshFormsError::NotCreated(caller))
    }

    fn essential_bcs(&self) -> impl Iterator<Item = &EssentialBc> {
        self.bcs.iter().filter_map(|bc| match bc {
            BoundaryCondition::Essential(e) => Some(e),
            _ => None,
        })
    }

    /// Calls `visit(bc, offset, xyz)` for every vertex an essential BC touches.
    fn for_each_essential_node(
        &self,
        caller: &'static str,
        mut visit: impl FnMut(&EssentialBc, usize, &[f64]) -> Result<(), MeshFormsError>,
    ) -> Result<(), MeshFormsError> {
        let section = self.created_section(caller)?;
        for bc in self.essential_bcs() {
            let fid = bc.field_id()?;
            for v in self.mesh.region_vertices(Some(bc.boundary()), 1) {
                if let Some((off, _)) = section.field_offset(v, fid) {
                    visit(bc, off, self.mesh.coordinates(v)?)?;
                }
            }
        }
        Ok(())
    }

    fn num_components(&self, bc: &EssentialBc) -> Result<usize, MeshFormsError> {
        self.catalog.field_num_components(bc.field_id()?)
    }

    /// Inserts the prescribed time derivative of essential values into `x_t`.
    pub fn apply_essential_bcs_t(&self, x_t: &mut dyn VectorLike) -> Result<(), MeshFormsError> {
        self.for_each_essential_node("apply_essential_bcs_t", |bc, off, xyz| {
            let mut u = vec![0.0; self.num_components(bc)?];
            match bc.callback_t() {
                Some(cb) => check_code(bc.name(), cb.invoke(self.time, xyz, &mut u))?,
                None => u.fill(0.0),
            }
            write_components(&mut *x_t, off, bc.components(), &u)
        })
    }

    /// Projects the initial conditions and applies essential values.
    /// Fields without an initial condition start at zero.
    pub fn initial_guess(&self) -> Result<DenseVector, MeshFormsError> {
        let section = self.created_section("initial_guess")?;
        let mut x = DenseVector::new(section.len());
        for ic in &self.ics {
            let fid = ic.field_id()?;
            let mut u = vec![0.0; ic.num_components()];
            for (_, off, xyz) in field_nodes(&self.mesh, section, fid)? {
                check_code(ic.name(), ic.callback().invoke(self.time, &xyz, &mut u))?;
                let idx: Vec<usize> = (off..off + u.len()).collect();
                x.set_values(&idx, &u, InsertMode::Insert)?;
            }
        }
        self.apply_essential_bcs(&mut x)?;
        Ok(x)
    }

    /// True when no Jacobian terms are registered and the solver must
    /// approximate the Jacobian itself.
    pub fn uses_matrix_free_jacobian(&self) -> bool {
        !self.weak_form.has_jacobian()
    }

    pub fn weak_form(&self) -> &WeakForm {
        &self.weak_form
    }

    pub fn evaluator(&self) -> &DependencyEvaluator {
        &self.evaluator
    }

    pub fn options(&self) -> &ProblemOptions {
        &self.options
    }

    pub fn pde(&self) -> &P {
        &self.pde
    }

    pub fn boundary_conditions(&self) -> &[BoundaryCondition] {
        &self.bcs
    }

    pub fn initial_conditions(&self) -> &[InitialCondition] {
        &self.ics
    }

    /// Auxiliary layout and values, when the problem has aux fields.
    pub fn aux(&self) -> Option<(&Section, &DenseVector)> {
        self.aux_section.as_ref().map(|s| (s, &self.aux_values))
    }

    /// Global indices of constrained DOFs.
    pub fn constrained_dofs(&self) -> Vec<usize> {
        self.section
            .as_ref()
            .map_or_else(Vec::new, Section::constrained_indices)
    }

    fn assemble_jacobian(
        &mut self,
        x: &dyn VectorLike,
        set: JacobianSet,
        m: &mut dyn MatrixLike,
    ) -> Result<(), MeshFormsError> {
        let Self {
            mesh,
            options,
            catalog,
            weak_form,
            evaluator,
            section,
            aux_section,
            aux_values,
            time,
            time_shift,
            x_t,
            ..
        } = self;
        let section = section.as_ref().ok_or(MeshFormsError::NotCreated("compute_jacobian"))?;
        m.zero_entries();
        let aux = aux_section.as_ref().map(|s| AuxData {
            section: s,
            values: &*aux_values,
        });
        assembler(mesh, catalog, weak_form, section, aux, options, *time, *time_shift)
            .compute_jacobian(evaluator, x, x_t.as_ref().map(|v| v as &dyn VectorLike), set, m)?;
        m.zero_rows_diagonal(&section.constrained_indices(), 1.0)
    }
}

#[allow(clippy::too_many_arguments)]
fn assembler<'a>(
    mesh: &'a Mesh,
    catalog: &'a FieldCatalog,
    weak_form: &'a WeakForm,
    section: &'a Section,
    aux: Option<AuxData<'a>>,
    options: &ProblemOptions,
    time: f64,
    time_shift: f64,
) -> Assembler<'a> {
    let a = Assembler::new(mesh, catalog, weak_form, section)
        .with_quadrature_order(options.quadrature_order)
        .with_time(time, time_shift);
    match aux {
        Some(aux) => a.with_aux(aux),
        None => a,
    }
}

fn check_code(name: &str, code: i32) -> Result<(), MeshFormsError> {
    match code {
        0 => Ok(()),
        code => {
            log::error!("callback '{name}' returned error code {code}");
            Err(MeshFormsError::CallbackFailed {
                name: name.to_string(),
                code,
            })
        }
    }
}

fn write_components(
    v: &mut dyn VectorLike,
    off: usize,
    components: &[usize],
    u: &[f64],
) -> Result<(), MeshFormsError> {
    let idx: Vec<usize> = components.iter().map(|c| off + c).collect();
    let vals: Vec<f64> = components.iter().map(|&c| u[c]).collect();
    v.set_values(&idx, &vals, InsertMode::Insert)
}

impl<P: PdeDefinition> DiscreteProblem for FeProblem<P> {
    fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    fn section(&self) -> Result<&Section, MeshFormsError> {
        self.created_section("section")
    }
}

impl<P: PdeDefinition> NonlinearSystem for FeProblem<P> {
    fn compute_residual(
        &mut self,
        x: &dyn VectorLike,
        f: &mut dyn VectorLike,
    ) -> Result<(), MeshFormsError> {
        {
            let Self {
                mesh,
                options,
                catalog,
                weak_form,
                evaluator,
                section,
                aux_section,
                aux_values,
                time,
                time_shift,
                x_t,
                ..
            } = &mut *self;
            let section = section.as_ref().ok_or(MeshFormsError::NotCreated("compute_residual"))?;
            f.zero();
            let aux = aux_section.as_ref().map(|s| AuxData {
                section: s,
                values: &*aux_values,
            });
            assembler(mesh, catalog, weak_form, section, aux, options, *time, *time_shift)
                .compute_residual(evaluator, x, x_t.as_ref().map(|v| v as &dyn VectorLike), f)?;
        }
        let xs = x.as_slice();
        self.for_each_essential_node("compute_residual", |bc, off, xyz| {
            let mut g = vec![0.0; self.num_components(bc)?];
            bc.evaluate(self.time, xyz, &mut g);
            let r: Vec<f64> = bc.components().iter().map(|&c| xs[off + c] - g[c]).collect();
            let idx: Vec<usize> = bc.components().iter().map(|c| off + c).collect();
            f.set_values(&idx, &r, InsertMode::Insert)
        })
    }

    fn compute_jacobian(
        &mut self,
        x: &dyn VectorLike,
        j: &mut dyn MatrixLike,
        p: Option<&mut dyn MatrixLike>,
    ) -> Result<(), MeshFormsError> {
        self.assemble_jacobian(x, JacobianSet::Jacobian, j)?;
        if let Some(p) = p {
            let set = if self.weak_form.has_jacobian_preconditioner() {
                JacobianSet::Preconditioner
            } else {
                JacobianSet::Jacobian
            };
            self.assemble_jacobian(x, set, p)?;
        }
        Ok(())
    }

    fn apply_essential_bcs(&self, x: &mut dyn VectorLike) -> Result<(), MeshFormsError> {
        self.for_each_essential_node("apply_essential_bcs", |bc, off, xyz| {
            let mut u = vec![0.0; self.num_components(bc)?];
            check_code(bc.name(), bc.callback().invoke(self.time, xyz, &mut u))?;
            write_components(&mut *x, off, bc.components(), &u)
        })
    }
}

impl<P: PdeDefinition> TransientState for FeProblem<P> {
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
    use crate::bc::NaturalRiemannBc;
    use crate::mesh::line_mesh;
    use crate::weak_form::integrand::residual_fn;
    use crate::weak_form::kinds::ResidualKind;

    struct Mass;

    impl PdeDefinition for Mass {
        fn set_up_fields(&self, catalog: &mut FieldCatalog) -> Result<(), MeshFormsError> {
            catalog.add_field("u", 1, 1).map(|_| ())
        }

        fn set_up_weak_form(
            &self,
            _catalog: &FieldCatalog,
            wf: &mut WeakForm,
        ) -> Result<(), MeshFormsError> {
            wf.add_residual(ResidualKind::F0, None, 0, 0, 0, residual_fn(|ctx, f| f[0] = ctx.u(0)[0]));
            Ok(())
        }
    }

    #[test]
    fn use_before_create() {
        let mesh = line_mesh(2, 0.0, 1.0).unwrap();
        let mut p = FeProblem::new(mesh, Mass, ProblemOptions::default());
        let x = DenseVector::new(3);
        let mut f = DenseVector::new(3);
        assert_eq!(
            p.compute_residual(&x, &mut f),
            Err(MeshFormsError::NotCreated("compute_residual"))
        );
        assert_eq!(p.num_dofs(), 0);
        p.create().unwrap();
        assert_eq!(p.num_dofs(), 3);
        assert!(p.uses_matrix_free_jacobian());
        assert!(p.add_initial_condition(InitialCondition::new("ic", 1, |_, _, u| u[0] = 0.0)).is_err());
    }

    #[test]
    fn riemann_condition_rejected() {
        let mesh = line_mesh(2, 0.0, 1.0).unwrap();
        let mut p = FeProblem::new(mesh, Mass, ProblemOptions::default());
        p.add_boundary_condition(NaturalRiemannBc::new("w", "left", &[0], |_, _, _, xi, xg| {
            xg.copy_from_slice(xi)
        }))
        .unwrap();
        assert_eq!(
            p.create(),
            Err(MeshFormsError::UnsupportedBoundaryCondition {
                kind: "NaturalRiemann",
                discretization: "finite element"
            })
        );
    }

    #[test]
    fn failing_callback_reported() {
        assert_eq!(
            check_code("bc", 3),
            Err(MeshFormsError::CallbackFailed {
                name: "bc".into(),
                code: 3
            })
        );
        assert!(check_code("bc", 0).is_ok());
    }
}
