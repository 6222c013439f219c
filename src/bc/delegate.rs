//! Typed callbacks and their C-convention trampolines.
//!
//! External solvers accept a boundary evaluator as an untyped function
//! pointer plus an opaque context pointer. A [`Delegate`] owns the typed
//! evaluator (a closure, or a method bound to a shared target); a
//! [`RawCallback`] pairs one of the `extern "C"` trampolines below with a
//! pointer to that delegate. The trampoline casts the context back and
//! re-applies the typed call. The raw pair borrows the delegate, so it
//! cannot outlive it.

use std::ffi::c_void;
use std::marker::PhantomData;
use std::sync::Arc;

/// `(time, x, u)`: prescribed value `u` at coordinates `x`.
pub type EssentialFn = dyn Fn(f64, &[f64], &mut [f64]) + Send + Sync;

/// `(time, centroid, normal, interior, ghost)`: ghost state of a boundary face.
pub type RiemannFn = dyn Fn(f64, &[f64], &[f64], &[f64], &mut [f64]) + Send + Sync;

/// C signature of an essential evaluator: `(dim, time, x, nc, u, ctx)`.
pub type EssentialCallback =
    unsafe extern "C" fn(i64, f64, *const f64, i64, *mut f64, *mut c_void) -> i32;

/// C signature of a Riemann ghost evaluator:
/// `(dim, nc, time, c, n, x_interior, x_ghost, ctx)`.
pub type RiemannCallback = unsafe extern "C" fn(
    i64,
    i64,
    f64,
    *const f64,
    *const f64,
    *const f64,
    *mut f64,
    *mut c_void,
) -> i32;

/// Owned typed evaluator.
pub struct Delegate<F: ?Sized> {
    func: Box<F>,
}

impl<F: ?Sized> std::fmt::Debug for Delegate<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Delegate")
    }
}

impl Delegate<EssentialFn> {
    pub fn new<G>(g: G) -> Self
    where
        G: Fn(f64, &[f64], &mut [f64]) + Send + Sync + 'static,
    {
        Self { func: Box::new(g) }
    }

    /// Binds `method` to a shared `target`.
    pub fn bind<T>(target: Arc<T>, method: fn(&T, f64, &[f64], &mut [f64])) -> Self
    where
        T: Send + Sync + 'static,
    {
        Self::new(move |t, x, u| method(&target, t, x, u))
    }

    #[inline]
    pub fn call(&self, time: f64, x: &[f64], u: &mut [f64]) {
        (self.func)(time, x, u)
    }
}

impl Delegate<RiemannFn> {
    pub fn new<G>(g: G) -> Self
    where
        G: Fn(f64, &[f64], &[f64], &[f64], &mut [f64]) + Send + Sync + 'static,
    {
        Self { func: Box::new(g) }
    }

    /// Binds `method` to a shared `target`.
    pub fn bind<T>(
        target: Arc<T>,
        method: fn(&T, f64, &[f64], &[f64], &[f64], &mut [f64]),
    ) -> Self
    where
        T: Send + Sync + 'static,
    {
        Self::new(move |t, c, n, xi, xg| method(&target, t, c, n, xi, xg))
    }

    #[inline]
    pub fn call(&self, time: f64, c: &[f64], n: &[f64], x_i: &[f64], x_g: &mut [f64]) {
        (self.func)(time, c, n, x_i, x_g)
    }
}

/// Trampoline for [`EssentialCallback`]. `ctx` must point to a live
/// `Delegate<EssentialFn>`.
///
/// Returns 0 on success and 1 when a pointer is null or a size is negative.
///
/// # Safety
/// `x` must be valid for `dim` reads and `u` for `nc` writes; `ctx` must be
/// null or point to a `Delegate<EssentialFn>` that outlives the call.
pub unsafe extern "C" fn essential_trampoline(
    dim: i64,
    time: f64,
    x: *const f64,
    nc: i64,
    u: *mut f64,
    ctx: *mut c_void,
) -> i32 {
    let (Ok(dim), Ok(nc)) = (usize::try_from(dim), usize::try_from(nc)) else {
        return 1;
    };
    if ctx.is_null() || x.is_null() || u.is_null() {
        return 1;
    }
    // SAFETY: caller contract above.
    let (delegate, x, u) = unsafe {
        (
            &*(ctx as *const Delegate<EssentialFn>),
            std::slice::from_raw_parts(x, dim),
            std::slice::from_raw_parts_mut(u, nc),
        )
    };
    delegate.call(time, x, u);
    0
}

/// Trampoline for [`RiemannCallback`]. `ctx` must point to a live
/// `Delegate<RiemannFn>`.
///
/// # Safety
/// `c` and `n` must be valid for `dim` reads, `x_i` for `nc` reads and `x_g`
/// for `nc` writes; `ctx` must be null or point to a `Delegate<RiemannFn>`
/// that outlives the call.
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn natural_riemann_trampoline(
    dim: i64,
    nc: i64,
    time: f64,
    c: *const f64,
    n: *const f64,
    x_i: *const f64,
    x_g: *mut f64,
    ctx: *mut c_void,
) -> i32 {
    let (Ok(dim), Ok(nc)) = (usize::try_from(dim), usize::try_from(nc)) else {
        return 1;
    };
    if ctx.is_null() || c.is_null() || n.is_null() || x_i.is_null() || x_g.is_null() {
        return 1;
    }
    // SAFETY: caller contract above.
    let (delegate, c, n, x_i, x_g) = unsafe {
        (
            &*(ctx as *const Delegate<RiemannFn>),
            std::slice::from_raw_parts(c, dim),
            std::slice::from_raw_parts(n, dim),
            std::slice::from_raw_parts(x_i, nc),
            std::slice::from_raw_parts_mut(x_g, nc),
        )
    };
    delegate.call(time, c, n, x_i, x_g);
    0
}

/// Function pointer plus opaque context, as an external solver stores them.
#[derive(Clone, Copy, Debug)]
pub struct RawCallback<'a, F> {
    pub func: F,
    pub ctx: *mut c_void,
    _delegate: PhantomData<&'a ()>,
}

impl<'a> RawCallback<'a, EssentialCallback> {
    pub fn essential(delegate: &'a Delegate<EssentialFn>) -> Self {
        Self {
            func: essential_trampoline,
            ctx: delegate as *const Delegate<EssentialFn> as *mut c_void,
            _delegate: PhantomData,
        }
    }

    /// Calls through the C convention, as the solver would.
    pub fn invoke(&self, time: f64, x: &[f64], u: &mut [f64]) -> i32 {
        // SAFETY: slices give valid pointers and lengths; `ctx` borrows a
        // delegate for `'a`.
        unsafe {
            (self.func)(
                x.len() as i64,
                time,
                x.as_ptr(),
                u.len() as i64,
                u.as_mut_ptr(),
                self.ctx,
            )
        }
    }
}

impl<'a> RawCallback<'a, RiemannCallback> {
    pub fn natural_riemann(delegate: &'a Delegate<RiemannFn>) -> Self {
        Self {
            func: natural_riemann_trampoline,
            ctx: delegate as *const Delegate<RiemannFn> as *mut c_void,
            _delegate: PhantomData,
        }
    }

    pub fn invoke(&self, time: f64, c: &[f64], n: &[f64], x_i: &[f64], x_g: &mut [f64]) -> i32 {
        if x_i.len() != x_g.len() || c.len() != n.len() {
            return 1;
        }
        // SAFETY: slices give valid pointers and matching lengths; `ctx`
        // borrows a delegate for `'a`.
        unsafe {
            (self.func)(
                c.len() as i64,
                x_i.len() as i64,
                time,
                c.as_ptr(),
                n.as_ptr(),
                x_i.as_ptr(),
                x_g.as_mut_ptr(),
                self.ctx,
            )
        }
    }
}
