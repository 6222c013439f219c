//! Element integration engine.
//!
//! For every region the weak form names, the engine visits the cells (or
//! boundary facets) of that region and, per element:
//! 1. gathers the closure coefficients of the primary fields, their time
//!    derivative and the auxiliary fields,
//! 2. tabulates the element (weights, determinants, basis values and
//!    physical gradients),
//! 3. at each quadrature point interpolates fields into scratch buffers,
//!    runs the functionals producing derived values, and evaluates every
//!    integrand registered for the current field (or field pair),
//! 4. scatters the element buffer with additive insertion.
//!
//! F0/G0/G2 terms are weighted by the test-function value, F1/G1/G3 terms by
//! its gradient. Element buffers are fresh for every element.

use crate::algebra::{InsertMode, MatrixLike, VectorLike};
use crate::data::closure::{ClosureAccessor, ClosureMap};
use crate::data::section::Section;
use crate::dependency::DependencyEvaluator;
use crate::discretization::fields::{FieldCatalog, FieldInfo};
use crate::discretization::runtime::{
    Basis, ElementTabulation, QuadratureRule, tabulate_element, tabulate_facet,
};
use crate::mesh::Mesh;
use crate::mesh_error::MeshFormsError;
use crate::topology::point::PointId;
use crate::topology::sieve::InMemorySieve;
use crate::weak_form::kinds::{Domain, JacobianSet, Region, ResidualKind};
use crate::weak_form::registry::WeakForm;
use crate::weak_form::views::{
    FieldLayout, Normal, Point, PointBuffers, QuadratureContext, QuadraturePoint,
};

/// Auxiliary data: DOF layout plus values.
#[derive(Clone, Copy)]
pub struct AuxData<'a> {
    pub section: &'a Section,
    pub values: &'a dyn VectorLike,
}

/// Borrowed state for one residual or Jacobian evaluation.
pub struct Assembler<'a> {
    mesh: &'a Mesh,
    catalog: &'a FieldCatalog,
    weak_form: &'a WeakForm,
    section: &'a Section,
    aux: Option<AuxData<'a>>,
    layout: FieldLayout,
    aux_layout: FieldLayout,
    quadrature_order: usize,
    time: f64,
    time_shift: f64,
}

/// Placement of one field's DOFs in an element.
#[derive(Clone, Debug)]
struct FieldShape {
    /// `positions[b * nc + c]`: closure buffer index of component `c` on node `b`.
    positions: Vec<usize>,
    nb: usize,
    nc: usize,
    /// Cellwise constant (order 0): `phi = 1`, no gradient.
    constant: bool,
}

impl FieldShape {
    fn locate(fi: &FieldInfo, map: &ClosureMap, basis: Basis) -> Option<Self> {
        let constant = fi.order == 0;
        let nb = if constant { 1 } else { basis.num_nodes() };
        let positions = map.field(fi.id);
        (positions.len() == nb * fi.nc).then(|| Self {
            positions: positions.to_vec(),
            nb,
            nc: fi.nc,
            constant,
        })
    }

    #[inline]
    fn phi(&self, tab: &ElementTabulation, q: usize, b: usize) -> f64 {
        if self.constant { 1.0 } else { tab.basis_values[q][b] }
    }

    #[inline]
    fn grad<'t>(&self, tab: &'t ElementTabulation, q: usize, b: usize) -> Option<&'t [f64]> {
        (!self.constant).then(|| tab.basis_gradients[q][b].as_slice())
    }
}

/// Everything gathered for one cell or boundary facet.
struct Element {
    cell: PointId,
    tab: ElementTabulation,
    normal: Option<Vec<f64>>,
    coef: Vec<f64>,
    coef_t: Vec<f64>,
    aux_coef: Vec<f64>,
    shapes: Vec<Option<FieldShape>>,
    aux_shapes: Vec<Option<FieldShape>>,
}

fn sum_terms<T: ?Sized>(funcs: &[Box<T>], out: &mut [f64], mut eval: impl FnMut(&T, &mut [f64])) {
    out.fill(0.0);
    let mut tmp = vec![0.0; out.len()];
    for func in funcs {
        tmp.fill(0.0);
        eval(func.as_ref(), &mut tmp);
        for (o, t) in out.iter_mut().zip(&tmp) {
            *o += t;
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn interpolate(
    shapes: &[Option<FieldShape>],
    layout: &FieldLayout,
    tab: &ElementTabulation,
    q: usize,
    dim: usize,
    coef: &[f64],
    val: &mut [f64],
    grad: &mut [f64],
) {
    for (k, shape) in shapes.iter().enumerate() {
        let Some(s) = shape else { continue };
        let off = layout.offset(k);
        for b in 0..s.nb {
            let phi = s.phi(tab, q, b);
            let g = s.grad(tab, q, b);
            for c in 0..s.nc {
                let v = coef[s.positions[b * s.nc + c]];
                val[off + c] += phi * v;
                if let (Some(g), false) = (g, grad.is_empty()) {
                    for d in 0..dim {
                        grad[(off + c) * dim + d] += g[d] * v;
                    }
                }
            }
        }
    }
}

impl<'a> Assembler<'a> {
    pub fn new(
        mesh: &'a Mesh,
        catalog: &'a FieldCatalog,
        weak_form: &'a WeakForm,
        section: &'a Section,
    ) -> Self {
        Self {
            mesh,
            catalog,
            weak_form,
            section,
            aux: None,
            layout: FieldLayout::new(catalog.fields().map(|f| (f.id, f.nc))),
            aux_layout: FieldLayout::new(catalog.aux_fields().map(|f| (f.id, f.nc))),
            quadrature_order: 2,
            time: 0.0,
            time_shift: 0.0,
        }
    }

    pub fn with_aux(mut self, aux: AuxData<'a>) -> Self {
        self.aux = Some(aux);
        self
    }

    pub fn with_quadrature_order(mut self, order: usize) -> Self {
        self.quadrature_order = order;
        self
    }

    pub fn with_time(mut self, time: f64, time_shift: f64) -> Self {
        self.time = time;
        self.time_shift = time_shift;
        self
    }

    fn accessor(&self) -> ClosureAccessor<'a, InMemorySieve> {
        ClosureAccessor::new(self.mesh.sieve(), self.section)
    }

    /// Adds the weak-form residual at `x` (and `x_t`) into `f`.
    pub fn compute_residual(
        &self,
        evaluator: &mut DependencyEvaluator,
        x: &dyn VectorLike,
        x_t: Option<&dyn VectorLike>,
        f: &mut dyn VectorLike,
    ) -> Result<(), MeshFormsError> {
        let order = self.functional_order(evaluator)?;
        f.assembly_begin();
        for region in self.weak_form.get_regions(Domain::Volume) {
            self.residual_region(&region, Domain::Volume, evaluator, &order, x, x_t, f)?;
        }
        for region in self.weak_form.get_regions(Domain::Boundary) {
            self.residual_region(&region, Domain::Boundary, evaluator, &order, x, x_t, f)?;
        }
        f.assembly_end();
        Ok(())
    }

    /// Adds the Jacobian (or preconditioner) of the weak form at `x` into `j`.
    pub fn compute_jacobian(
        &self,
        evaluator: &mut DependencyEvaluator,
        x: &dyn VectorLike,
        x_t: Option<&dyn VectorLike>,
        set: JacobianSet,
        j: &mut dyn MatrixLike,
    ) -> Result<(), MeshFormsError> {
        let order = self.functional_order(evaluator)?;
        j.assembly_begin();
        for domain in [Domain::Volume, Domain::Boundary] {
            for region in self.weak_form.get_regions(domain) {
                self.jacobian_region(&region, domain, set, evaluator, &order, x, x_t, j)?;
            }
        }
        j.assembly_end();
        Ok(())
    }

    fn functional_order(&self, evaluator: &DependencyEvaluator) -> Result<Vec<String>, MeshFormsError> {
        let requested = self.weak_form.dependent_values();
        evaluator.evaluation_order(requested.iter().map(String::as_str))
    }

    fn residual_kinds(domain: Domain) -> [ResidualKind; 2] {
        match domain {
            Domain::Volume => [ResidualKind::F0, ResidualKind::F1],
            Domain::Boundary => [ResidualKind::BndF0, ResidualKind::BndF1],
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn residual_region(
        &self,
        region: &Region,
        domain: Domain,
        evaluator: &mut DependencyEvaluator,
        order: &[String],
        x: &dyn VectorLike,
        x_t: Option<&dyn VectorLike>,
        f: &mut dyn VectorLike,
    ) -> Result<(), MeshFormsError> {
        let label = region.label.as_deref();
        let kinds = Self::residual_kinds(domain);
        let has_terms = self.layout.ids().iter().any(|&id| {
            kinds.iter().any(|&k| {
                !self
                    .weak_form
                    .get_residual(k, label, region.value, id, region.part)
                    .is_empty()
            })
        });
        if !has_terms {
            return Ok(());
        }
        let points = self.region_points(region, domain);
        log::trace!("residual: {domain:?} region {region:?}, {} elements", points.len());
        let dim = self.mesh.dimension();
        let accessor = self.accessor();
        for p in points {
            let el = self.gather(p, domain, x, x_t)?;
            let mut elem = vec![0.0; el.coef.len()];
            self.visit_points(&el, evaluator, order, |ctx, q, wdet| {
                for (k, shape) in el.shapes.iter().enumerate() {
                    let Some(s) = shape else { continue };
                    let id = self.layout.ids()[k];
                    let f0s = self.weak_form.get_residual(kinds[0], label, region.value, id, region.part);
                    let f1s = self.weak_form.get_residual(kinds[1], label, region.value, id, region.part);
                    if f0s.is_empty() && f1s.is_empty() {
                        continue;
                    }
                    let mut f0 = vec![0.0; s.nc];
                    let mut f1 = vec![0.0; s.nc * dim];
                    sum_terms(f0s, &mut f0, |func, out| func.evaluate(ctx, out));
                    sum_terms(f1s, &mut f1, |func, out| func.evaluate(ctx, out));
                    for b in 0..s.nb {
                        let phi = s.phi(&el.tab, q, b);
                        let grad = s.grad(&el.tab, q, b);
                        for c in 0..s.nc {
                            let mut v = phi * f0[c];
                            if let Some(g) = grad {
                                for d in 0..dim {
                                    v += g[d] * f1[c * dim + d];
                                }
                            }
                            elem[s.positions[b * s.nc + c]] += wdet * v;
                        }
                    }
                }
            })?;
            accessor.set_closure(f, el.cell, &elem, InsertMode::Add)?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn jacobian_region(
        &self,
        region: &Region,
        domain: Domain,
        set: JacobianSet,
        evaluator: &mut DependencyEvaluator,
        order: &[String],
        x: &dyn VectorLike,
        x_t: Option<&dyn VectorLike>,
        j: &mut dyn MatrixLike,
    ) -> Result<(), MeshFormsError> {
        let label = region.label.as_deref();
        let kinds = set.kinds(domain);
        let ids = self.layout.ids();
        let has_terms = ids.iter().any(|&f| {
            ids.iter().any(|&g| {
                kinds.iter().any(|&k| {
                    !self
                        .weak_form
                        .get_jacobian(k, label, region.value, f, g, region.part)
                        .is_empty()
                })
            })
        });
        if !has_terms {
            return Ok(());
        }
        let points = self.region_points(region, domain);
        log::trace!("jacobian: {domain:?} region {region:?}, {} elements", points.len());
        let dim = self.mesh.dimension();
        let accessor = self.accessor();
        for p in points {
            let el = self.gather(p, domain, x, x_t)?;
            let n = el.coef.len();
            let mut mat = vec![0.0; n * n];
            self.visit_points(&el, evaluator, order, |ctx, q, wdet| {
                for (kf, sf) in el.shapes.iter().enumerate() {
                    let Some(sf) = sf else { continue };
                    for (kg, sg) in el.shapes.iter().enumerate() {
                        let Some(sg) = sg else { continue };
                        let (idf, idg) = (ids[kf], ids[kg]);
                        let terms = kinds.map(|k| {
                            self.weak_form
                                .get_jacobian(k, label, region.value, idf, idg, region.part)
                        });
                        if terms.iter().all(|t| t.is_empty()) {
                            continue;
                        }
                        let (ncf, ncg) = (sf.nc, sg.nc);
                        let mut g0 = vec![0.0; ncf * ncg];
                        let mut g1 = vec![0.0; ncf * ncg * dim];
                        let mut g2 = vec![0.0; ncf * ncg * dim];
                        let mut g3 = vec![0.0; ncf * ncg * dim * dim];
                        sum_terms(terms[0], &mut g0, |func, out| func.evaluate(ctx, out));
                        sum_terms(terms[1], &mut g1, |func, out| func.evaluate(ctx, out));
                        sum_terms(terms[2], &mut g2, |func, out| func.evaluate(ctx, out));
                        sum_terms(terms[3], &mut g3, |func, out| func.evaluate(ctx, out));
                        for bf in 0..sf.nb {
                            let phif = sf.phi(&el.tab, q, bf);
                            let gradf = sf.grad(&el.tab, q, bf);
                            for fc in 0..ncf {
                                let row = sf.positions[bf * ncf + fc];
                                for bg in 0..sg.nb {
                                    let phig = sg.phi(&el.tab, q, bg);
                                    let gradg = sg.grad(&el.tab, q, bg);
                                    for gc in 0..ncg {
                                        let col = sg.positions[bg * ncg + gc];
                                        let fg = fc * ncg + gc;
                                        let mut v = phif * g0[fg] * phig;
                                        if let Some(gg) = gradg {
                                            for d in 0..dim {
                                                v += phif * g1[fg * dim + d] * gg[d];
                                            }
                                        }
                                        if let Some(gf) = gradf {
                                            for d in 0..dim {
                                                v += gf[d] * g2[fg * dim + d] * phig;
                                            }
                                            if let Some(gg) = gradg {
                                                for df in 0..dim {
                                                    for dg in 0..dim {
                                                        v += gf[df]
                                                            * g3[(fg * dim + df) * dim + dg]
                                                            * gg[dg];
                                                    }
                                                }
                                            }
                                        }
                                        mat[row * n + col] += wdet * v;
                                    }
                                }
                            }
                        }
                    }
                }
            })?;
            accessor.set_closure_matrix(j, &[el.cell], &[el.cell], &mat, InsertMode::Add)?;
        }
        Ok(())
    }

    /// Cells of a volume region, or boundary facets of a boundary region.
    fn region_points(&self, region: &Region, domain: Domain) -> Vec<PointId> {
        let label = region.label.as_deref();
        match domain {
            Domain::Volume => self.mesh.region_cells(label, region.value),
            Domain::Boundary => self
                .mesh
                .region_facets(label, region.value)
                .into_iter()
                .filter(|&f| self.mesh.is_boundary_facet(f))
                .collect(),
        }
    }

    /// Gathers geometry and coefficients of a cell, or of the cell behind a
    /// boundary facet.
    fn gather(
        &self,
        p: PointId,
        domain: Domain,
        x: &dyn VectorLike,
        x_t: Option<&dyn VectorLike>,
    ) -> Result<Element, MeshFormsError> {
        let (cell, tab, normal) = match domain {
            Domain::Volume => {
                let basis = Basis::for_cell(self.mesh.cell_type(p)?)?;
                let quad = QuadratureRule::gauss(self.mesh.cell_type(p)?, self.quadrature_order)?;
                let tab = tabulate_element(basis, &quad, &self.mesh.vertex_coordinates(p)?)?;
                (p, tab, None)
            }
            Domain::Boundary => {
                let cell = self.mesh.facet_cells(p)[0];
                let basis = Basis::for_cell(self.mesh.cell_type(cell)?)?;
                let cell_vertices = self.mesh.closure_vertices(cell);
                let facet_nodes = self
                    .mesh
                    .closure_vertices(p)
                    .into_iter()
                    .map(|v| {
                        cell_vertices.iter().position(|&w| w == v).ok_or_else(|| {
                            MeshFormsError::InvalidGeometry(format!(
                                "vertex {v} of facet {p} is not in cell {cell}"
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let quad = QuadratureRule::gauss(self.mesh.cell_type(p)?, self.quadrature_order)?;
                let tab = tabulate_facet(
                    basis,
                    &quad,
                    &self.mesh.vertex_coordinates(cell)?,
                    &facet_nodes,
                )?;
                (cell, tab, Some(self.mesh.outward_normal(p, cell)?))
            }
        };
        let basis = Basis::for_cell(self.mesh.cell_type(cell)?)?;
        let accessor = self.accessor();
        let map = accessor.closure_map(cell);
        let shapes = self
            .catalog
            .fields()
            .map(|fi| FieldShape::locate(fi, &map, basis))
            .collect();
        let coef = accessor.get_closure(x, cell)?;
        let coef_t = match x_t {
            Some(v) => accessor.get_closure(v, cell)?,
            None => Vec::new(),
        };
        let (aux_coef, aux_shapes) = match self.aux {
            Some(aux) => {
                let aux_accessor = ClosureAccessor::new(self.mesh.sieve(), aux.section);
                let aux_map = aux_accessor.closure_map(cell);
                let shapes = self
                    .catalog
                    .aux_fields()
                    .map(|fi| FieldShape::locate(fi, &aux_map, basis))
                    .collect();
                (aux_accessor.get_closure(aux.values, cell)?, shapes)
            }
            None => (Vec::new(), Vec::new()),
        };
        Ok(Element {
            cell,
            tab,
            normal,
            coef,
            coef_t,
            aux_coef,
            shapes,
            aux_shapes,
        })
    }

    /// Binds the views at every quadrature point of `el` and hands them to `body`
    /// together with the point index and `weight * |J|`.
    fn visit_points(
        &self,
        el: &Element,
        evaluator: &mut DependencyEvaluator,
        order: &[String],
        mut body: impl FnMut(&QuadratureContext<'_>, usize, f64),
    ) -> Result<(), MeshFormsError> {
        let dim = self.mesh.dimension();
        let mut buf = PointBuffers::new(dim, &self.layout, &self.aux_layout);
        for q in 0..el.tab.num_points() {
            buf.reset();
            buf.xyz.copy_from_slice(&el.tab.physical_points[q]);
            if let Some(n) = &el.normal {
                buf.normal.copy_from_slice(n);
            }
            interpolate(&el.shapes, &self.layout, &el.tab, q, dim, &el.coef, &mut buf.u, &mut buf.u_x);
            if !el.coef_t.is_empty() {
                interpolate(&el.shapes, &self.layout, &el.tab, q, dim, &el.coef_t, &mut buf.u_t, &mut []);
            }
            if !el.aux_coef.is_empty() {
                interpolate(
                    &el.aux_shapes,
                    &self.aux_layout,
                    &el.tab,
                    q,
                    dim,
                    &el.aux_coef,
                    &mut buf.a,
                    &mut buf.a_x,
                );
            }
            let qp = QuadraturePoint {
                dim,
                time: self.time,
                time_shift: self.time_shift,
                xyz: Point::new(&buf.xyz),
                normal: el.normal.as_ref().map(|_| Normal::new(&buf.normal)),
                fields: &self.layout,
                u: &buf.u,
                u_x: &buf.u_x,
                u_t: &buf.u_t,
                aux_fields: &self.aux_layout,
                a: &buf.a,
                a_x: &buf.a_x,
            };
            evaluator.evaluate(order, &qp)?;
            let ctx = QuadratureContext {
                point: &qp,
                values: evaluator.values(),
            };
            body(&ctx, q, el.tab.weights[q] * el.tab.jacobian_dets[q]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::{DenseMatrix, DenseVector};
    use crate::data::section::ClosureLayout;
    use crate::mesh::line_mesh;
    use crate::weak_form::integrand::{jacobian_fn, residual_fn};
    use crate::weak_form::kinds::JacobianKind;

    fn setup(nx: usize) -> (Mesh, FieldCatalog, Section) {
        let mesh = line_mesh(nx, 0.0, 1.0).unwrap();
        let mut cat = FieldCatalog::new();
        cat.add_field("u", 1, 1).unwrap();
        let section = Section::from_fields(&mesh, cat.fields(), ClosureLayout::FieldMajor).unwrap();
        (mesh, cat, section)
    }

    #[test]
    fn constant_source_integrates_to_domain_length() {
        let (mesh, cat, section) = setup(4);
        let mut wf = WeakForm::new(1);
        wf.add_residual(ResidualKind::F0, None, 0, 0, 0, residual_fn(|_, f| f[0] = 1.0));
        let mut ev = DependencyEvaluator::new();
        let x = DenseVector::new(section.len());
        let mut f = DenseVector::new(section.len());
        Assembler::new(&mesh, &cat, &wf, &section)
            .compute_residual(&mut ev, &x, None, &mut f)
            .unwrap();
        let total: f64 = f.as_slice().iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
        // interior nodes get h, end nodes h/2
        let mut sorted = f.as_slice().to_vec();
        sorted.sort_by(f64::total_cmp);
        assert!((sorted[0] - 0.125).abs() < 1e-12);
        assert!((sorted[4] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn laplacian_stiffness_rows_sum_to_zero() {
        let (mesh, cat, section) = setup(3);
        let mut wf = WeakForm::new(1);
        wf.add_jacobian(JacobianKind::G3, None, 0, 0, 0, 0, jacobian_fn(|_, g| g[0] = 1.0));
        let mut ev = DependencyEvaluator::new();
        let x = DenseVector::new(section.len());
        let mut j = DenseMatrix::new(section.len(), section.len());
        Assembler::new(&mesh, &cat, &wf, &section)
            .compute_jacobian(&mut ev, &x, None, JacobianSet::Jacobian, &mut j)
            .unwrap();
        for i in 0..section.len() {
            let s: f64 = j.row(i).iter().sum();
            assert!(s.abs() < 1e-12);
        }
        // h = 1/3, so diagonal is 3 at ends and 6 inside
        let mut diag: Vec<f64> = (0..section.len()).map(|i| j.get(i, i).unwrap()).collect();
        diag.sort_by(f64::total_cmp);
        assert!((diag[0] - 3.0).abs() < 1e-12);
        assert!((diag[3] - 6.0).abs() < 1e-12);
    }

    #[test]
    fn boundary_term_hits_only_labelled_vertex() {
        let (mesh, cat, section) = setup(2);
        let mut wf = WeakForm::new(1);
        wf.add_residual(ResidualKind::BndF0, Some("right"), 1, 0, 0, residual_fn(|ctx, f| {
            f[0] = 2.0 * ctx.normal.map_or(0.0, |n| n[0]);
        }));
        let mut ev = DependencyEvaluator::new();
        let x = DenseVector::new(section.len());
        let mut f = DenseVector::new(section.len());
        Assembler::new(&mesh, &cat, &wf, &section)
            .compute_residual(&mut ev, &x, None, &mut f)
            .unwrap();
        let right = mesh.labels().stratum_points("right", 1)[0];
        let (off, _) = section.offset(right).unwrap();
        for (i, v) in f.as_slice().iter().enumerate() {
            let expected = if i == off { 2.0 } else { 0.0 };
            assert!((v - expected).abs() < 1e-12);
        }
    }
}
