//! Integrand contracts.
//!
//! An integrand is evaluated once per quadrature point and writes a small
//! fixed-size output. Layouts, with `nc` the test field's components, `ncg`
//! the basis field's components and `dim` the spatial dimension:
//!
//! | kind | length | index |
//! |------|--------|-------|
//! | F0   | `nc` | `c` |
//! | F1   | `nc*dim` | `c*dim + d` |
//! | G0   | `nc*ncg` | `fc*ncg + gc` |
//! | G1   | `nc*ncg*dim` | `(fc*ncg + gc)*dim + d_basis` |
//! | G2   | `nc*ncg*dim` | `(fc*ncg + gc)*dim + d_test` |
//! | G3   | `nc*ncg*dim*dim` | `((fc*ncg + gc)*dim + d_test)*dim + d_basis` |
//!
//! The output buffer is zeroed before every call.

use crate::weak_form::views::QuadratureContext;

/// Residual integrand (`F0`, `F1` and their boundary variants).
pub trait ResidualFunc: Send + Sync {
    fn evaluate(&self, ctx: &QuadratureContext<'_>, out: &mut [f64]);

    /// Names of derived values this integrand reads from the value store.
    fn dependent_values(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Jacobian integrand (`G0..G3` and variants).
pub trait JacobianFunc: Send + Sync {
    fn evaluate(&self, ctx: &QuadratureContext<'_>, out: &mut [f64]);

    fn dependent_values(&self) -> Vec<String> {
        Vec::new()
    }
}

impl<F> ResidualFunc for F
where
    F: Fn(&QuadratureContext<'_>, &mut [f64]) + Send + Sync,
{
    fn evaluate(&self, ctx: &QuadratureContext<'_>, out: &mut [f64]) {
        self(ctx, out)
    }
}

impl<F> JacobianFunc for F
where
    F: Fn(&QuadratureContext<'_>, &mut [f64]) + Send + Sync,
{
    fn evaluate(&self, ctx: &QuadratureContext<'_>, out: &mut [f64]) {
        self(ctx, out)
    }
}

/// Turns a closure into a residual integrand.
///
/// Passing the closure through this function lets its argument types be
/// inferred.
pub fn residual_fn<F>(f: F) -> impl ResidualFunc
where
    F: Fn(&QuadratureContext<'_>, &mut [f64]) + Send + Sync + 'static,
{
    f
}

/// Turns a closure into a Jacobian integrand.
pub fn jacobian_fn<F>(f: F) -> impl JacobianFunc
where
    F: Fn(&QuadratureContext<'_>, &mut [f64]) + Send + Sync + 'static,
{
    f
}
