use mesh_forms::prelude::*;

fn close(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

/// `-div(grad u) + u^2 = s`, with hand-written Jacobian.
struct Reaction {
    copies: usize,
}

impl PdeDefinition for Reaction {
    fn set_up_fields(&self, catalog: &mut FieldCatalog) -> Result<(), MeshFormsError> {
        catalog.add_field("u", 1, 1).map(|_| ())
    }

    fn set_up_weak_form(&self, _: &FieldCatalog, wf: &mut WeakForm) -> Result<(), MeshFormsError> {
        for _ in 0..self.copies {
            wf.add_residual(ResidualKind::F0, None, 0, 0, 0, residual_fn(|ctx, f| {
                let u = ctx.u(0)[0];
                f[0] = u * u - ctx.xyz[0];
            }));
            wf.add_residual(ResidualKind::F1, None, 0, 0, 0, residual_fn(|ctx, f| {
                f.copy_from_slice(ctx.u_x(0).as_slice());
            }));
            wf.add_jacobian(JacobianKind::G0, None, 0, 0, 0, 0, jacobian_fn(|ctx, g| {
                g[0] = 2.0 * ctx.u(0)[0];
            }));
            wf.add_jacobian(JacobianKind::G3, None, 0, 0, 0, 0, jacobian_fn(|ctx, g| {
                for d in 0..ctx.dim {
                    g[d * ctx.dim + d] = 1.0;
                }
            }));
        }
        Ok(())
    }
}

fn created(mesh: Mesh, copies: usize) -> FeProblem<Reaction> {
    let mut p = FeProblem::new(mesh, Reaction { copies }, ProblemOptions::default());
    p.create().unwrap();
    p
}

fn sample_state(n: usize) -> DenseVector {
    DenseVector::from_vec((0..n).map(|i| 0.3 + 0.1 * i as f64).collect())
}

#[test]
fn duplicated_integrands_double_the_residual() {
    let mut one = created(line_mesh(5, 0.0, 1.0).unwrap(), 1);
    let mut two = created(line_mesh(5, 0.0, 1.0).unwrap(), 2);
    let x = sample_state(one.num_dofs());
    let mut f1 = DenseVector::new(one.num_dofs());
    let mut f2 = DenseVector::new(two.num_dofs());
    one.compute_residual(&x, &mut f1).unwrap();
    two.compute_residual(&x, &mut f2).unwrap();
    for (a, b) in f1.as_slice().iter().zip(f2.as_slice()) {
        assert!(close(2.0 * a, *b, 1e-12));
    }
}

#[test]
fn residual_is_overwritten_not_accumulated() {
    let mut p = created(line_mesh(3, 0.0, 1.0).unwrap(), 1);
    let x = sample_state(p.num_dofs());
    let mut f = DenseVector::new(p.num_dofs());
    p.compute_residual(&x, &mut f).unwrap();
    let first = f.as_slice().to_vec();
    p.compute_residual(&x, &mut f).unwrap();
    assert_eq!(first, f.as_slice());
}

#[test]
fn jacobian_matches_finite_differences() {
    for mesh in [
        line_mesh(4, 0.0, 1.0).unwrap(),
        rectangle_mesh(2, 2, [0.0, 0.0], [1.0, 1.0], CellType::Triangle).unwrap(),
        rectangle_mesh(2, 1, [0.0, 0.0], [2.0, 1.0], CellType::Quadrilateral).unwrap(),
    ] {
        let mut p = created(mesh, 1);
        let n = p.num_dofs();
        let x = sample_state(n);
        let mut j = DenseMatrix::new(n, n);
        p.compute_jacobian(&x, &mut j, None).unwrap();

        let mut f0 = DenseVector::new(n);
        p.compute_residual(&x, &mut f0).unwrap();
        let eps = 1e-7;
        for col in 0..n {
            let mut xp = x.clone();
            xp[col] += eps;
            let mut fp = DenseVector::new(n);
            p.compute_residual(&xp, &mut fp).unwrap();
            for row in 0..n {
                let fd = (fp[row] - f0[row]) / eps;
                assert!(
                    close(fd, j.get(row, col).unwrap(), 1e-5),
                    "J[{row},{col}] = {} but finite difference gives {fd}",
                    j.get(row, col).unwrap()
                );
            }
        }
    }
}

#[test]
fn mass_matrix_sums_to_domain_area() {
    struct Mass;
    impl PdeDefinition for Mass {
        fn set_up_fields(&self, catalog: &mut FieldCatalog) -> Result<(), MeshFormsError> {
            catalog.add_field("u", 1, 1).map(|_| ())
        }
        fn set_up_weak_form(&self, _: &FieldCatalog, wf: &mut WeakForm) -> Result<(), MeshFormsError> {
            wf.add_jacobian(JacobianKind::G0, None, 0, 0, 0, 0, jacobian_fn(|_, g| g[0] = 1.0));
            Ok(())
        }
    }
    let mesh = rectangle_mesh(3, 2, [0.0, 0.0], [1.5, 2.0], CellType::Triangle).unwrap();
    let mut p = FeProblem::new(mesh, Mass, ProblemOptions::default());
    p.create().unwrap();
    let n = p.num_dofs();
    let mut j = DenseMatrix::new(n, n);
    p.compute_jacobian(&DenseVector::new(n), &mut j, None).unwrap();
    let total: f64 = j.as_slice().iter().sum();
    assert!(close(total, 3.0, 1e-12));
    assert!(!p.uses_matrix_free_jacobian());
}

#[test]
fn preconditioner_falls_back_to_jacobian_terms() {
    let mut p = created(line_mesh(3, 0.0, 1.0).unwrap(), 1);
    let n = p.num_dofs();
    let x = sample_state(n);
    let mut j = DenseMatrix::new(n, n);
    let mut pc = DenseMatrix::new(n, n);
    p.compute_jacobian(&x, &mut j, Some(&mut pc)).unwrap();
    assert_eq!(j.as_slice(), pc.as_slice());
}

#[test]
fn preconditioner_terms_assembled_separately() {
    struct Split;
    impl PdeDefinition for Split {
        fn set_up_fields(&self, catalog: &mut FieldCatalog) -> Result<(), MeshFormsError> {
            catalog.add_field("u", 1, 1).map(|_| ())
        }
        fn set_up_weak_form(&self, _: &FieldCatalog, wf: &mut WeakForm) -> Result<(), MeshFormsError> {
            wf.add_jacobian(JacobianKind::G0, None, 0, 0, 0, 0, jacobian_fn(|_, g| g[0] = 1.0));
            wf.add_jacobian(JacobianKind::Gp0, None, 0, 0, 0, 0, jacobian_fn(|_, g| g[0] = 4.0));
            Ok(())
        }
    }
    let mut p = FeProblem::new(line_mesh(2, 0.0, 1.0).unwrap(), Split, ProblemOptions::default());
    p.create().unwrap();
    let n = p.num_dofs();
    let mut j = DenseMatrix::new(n, n);
    let mut pc = DenseMatrix::new(n, n);
    p.compute_jacobian(&DenseVector::new(n), &mut j, Some(&mut pc)).unwrap();
    for (a, b) in j.as_slice().iter().zip(pc.as_slice()) {
        assert!(close(4.0 * a, *b, 1e-12));
    }
}

/// One field `u` plus a single term registered on field `stray`.
struct StrayTerm {
    stray: usize,
    jacobian: bool,
}

impl PdeDefinition for StrayTerm {
    fn set_up_fields(&self, catalog: &mut FieldCatalog) -> Result<(), MeshFormsError> {
        catalog.add_field("u", 1, 1).map(|_| ())
    }

    fn set_up_weak_form(&self, _: &FieldCatalog, wf: &mut WeakForm) -> Result<(), MeshFormsError> {
        if self.jacobian {
            wf.add_jacobian(JacobianKind::G0, None, 0, self.stray, 0, 0, jacobian_fn(|_, g| g[0] = 1.0));
        } else {
            wf.add_residual(ResidualKind::F0, None, 0, self.stray, 0, residual_fn(|_, f| f[0] = 1.0));
        }
        Ok(())
    }
}

#[test]
fn terms_on_unregistered_fields_fail_create() {
    for jacobian in [false, true] {
        let pde = StrayTerm { stray: 7, jacobian };
        let mut p = FeProblem::new(line_mesh(2, 0.0, 1.0).unwrap(), pde, ProblemOptions::default());
        assert_eq!(p.create(), Err(MeshFormsError::UnknownField(7)));
        assert_eq!(p.num_dofs(), 0);
    }

    let pde = StrayTerm { stray: 0, jacobian: false };
    let mut p = FeProblem::new(line_mesh(2, 0.0, 1.0).unwrap(), pde, ProblemOptions::default());
    p.create().unwrap();
    let mut f = DenseVector::new(3);
    p.compute_residual(&DenseVector::new(3), &mut f).unwrap();
    assert!(close(f.as_slice().iter().sum(), 1.0, 1e-12));
}

/// Two fields: a scalar `p` on vertices and a cellwise vector `q` coupled
/// through a G0 block.
struct Coupled;

impl PdeDefinition for Coupled {
    fn set_up_fields(&self, catalog: &mut FieldCatalog) -> Result<(), MeshFormsError> {
        catalog.add_field("p", 1, 1)?;
        catalog.add_field("q", 2, 0)?;
        Ok(())
    }

    fn set_up_weak_form(&self, catalog: &FieldCatalog, wf: &mut WeakForm) -> Result<(), MeshFormsError> {
        let (p, q) = (catalog.field_id("p")?, catalog.field_id("q")?);
        wf.add_residual(ResidualKind::F0, None, 0, q, 0, residual_fn(move |ctx, f| {
            f[0] = ctx.u(q)[0] - ctx.u(p)[0];
            f[1] = ctx.u(q)[1];
        }));
        wf.add_jacobian(JacobianKind::G0, None, 0, q, p, 0, jacobian_fn(|_, g| {
            g[0] = -1.0;
            g[1] = 0.0;
        }));
        Ok(())
    }
}

#[test]
fn off_diagonal_block_lands_in_field_rows_and_columns() {
    let mut prob = FeProblem::new(line_mesh(2, 0.0, 1.0).unwrap(), Coupled, ProblemOptions::default());
    prob.create().unwrap();
    assert_eq!(prob.weak_form().num_fields(), 2);
    assert_eq!(prob.weak_form().jacobian_keys(JacobianKind::G0)[0].field, 2);

    let n = prob.num_dofs();
    assert_eq!(n, 3 + 2 * 2);
    let mut j = DenseMatrix::new(n, n);
    prob.compute_jacobian(&DenseVector::new(n), &mut j, None).unwrap();

    let section = prob.section().unwrap();
    let mesh = prob.mesh();
    for cell in mesh.cells() {
        let (q0, _) = section.field_offset(cell, 1).unwrap();
        // each cell has length 1/2 and two hat functions integrating to 1/4
        let row_sum: f64 = j.row(q0).iter().sum();
        assert!(close(row_sum, -0.5, 1e-12));
        assert!(j.row(q0 + 1).iter().all(|v| *v == 0.0));
        for v in mesh.closure_vertices(cell) {
            let (pv, _) = section.field_offset(v, 0).unwrap();
            assert!(close(j.get(q0, pv).unwrap(), -0.25, 1e-12));
        }
    }
    // p rows carry no terms
    for v in mesh.vertices() {
        let (pv, _) = section.field_offset(v, 0).unwrap();
        assert!(j.row(pv).iter().all(|x| *x == 0.0));
    }
}

/// Diffusion whose coefficient comes from an auxiliary field through a
/// derived value.
struct AuxDiffusion;

struct Scaled;

impl ResidualFunc for Scaled {
    fn evaluate(&self, ctx: &QuadratureContext<'_>, out: &mut [f64]) {
        let k = ctx.values.get::<f64>("k2").copied().unwrap_or(f64::NAN);
        for (o, g) in out.iter_mut().zip(ctx.u_x(0).as_slice()) {
            *o = k * g;
        }
    }

    fn dependent_values(&self) -> Vec<String> {
        vec!["k2".into()]
    }
}

impl PdeDefinition for AuxDiffusion {
    fn set_up_fields(&self, catalog: &mut FieldCatalog) -> Result<(), MeshFormsError> {
        catalog.add_field("u", 1, 1)?;
        catalog.add_aux_field("k", 1, 0, None)?;
        Ok(())
    }

    fn set_up_weak_form(&self, _: &FieldCatalog, wf: &mut WeakForm) -> Result<(), MeshFormsError> {
        wf.add_residual(ResidualKind::F1, None, 0, 0, 0, Scaled);
        Ok(())
    }

    fn set_up_functionals(&self, ev: &mut DependencyEvaluator) -> Result<(), MeshFormsError> {
        ev.create_functional("k2", ScalarFunctional::new("k2", &[], |qp, _| 2.0 * qp.a(0)[0]))
    }
}

#[test]
fn aux_field_and_derived_value_scale_the_flux() {
    let mut p = FeProblem::new(line_mesh(4, 0.0, 1.0).unwrap(), AuxDiffusion, ProblemOptions::default());
    p.add_aux_evaluator(AuxFieldEvaluator::constant("k_val", "k", &[1.5]))
        .unwrap();
    p.create().unwrap();
    let (aux_section, aux_values) = p.aux().unwrap();
    assert_eq!(aux_section.len(), 4);
    assert!(aux_values.as_slice().iter().all(|v| *v == 1.5));

    let mut f = DenseVector::new(5);
    p.compute_residual(&DenseVector::new(5), &mut f).unwrap();
    assert!(f.as_slice().iter().all(|v| *v == 0.0));

    // u = x^2 at the vertices, so element slopes are (2i + 1) / 4
    let x = DenseVector::from_vec((0..5).map(|i| (i as f64 / 4.0).powi(2)).collect());
    p.compute_residual(&x, &mut f).unwrap();
    let sum: f64 = f.as_slice().iter().sum();
    assert!(close(sum, 0.0, 1e-12));
    assert!(close(f[0], -3.0 * 0.25, 1e-12));
    assert!(close(f[4], 3.0 * 1.75, 1e-12));
}
