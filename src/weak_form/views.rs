//! Late-bound read-only views handed to integrands.
//!
//! The assembly engine evaluates every field, gradient and time derivative
//! at a quadrature point into scratch buffers, then lends them to integrands
//! through these borrowed views. A view is valid for exactly one integrand
//! call; the borrow checker enforces that no integrand keeps one.

use std::ops::Index;

use crate::dependency::ValueStore;

/// Offsets of each field inside the flat per-point buffers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldLayout {
    ids: Vec<usize>,
    nc: Vec<usize>,
    offsets: Vec<usize>,
    total: usize,
}

impl FieldLayout {
    /// Layout of `(id, nc)` pairs in the given order.
    pub fn new(fields: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let mut layout = Self::default();
        for (id, nc) in fields {
            layout.ids.push(id);
            layout.nc.push(nc);
            layout.offsets.push(layout.total);
            layout.total += nc;
        }
        layout
    }

    /// Position of field `id` in the layout.
    pub fn index_of(&self, id: usize) -> Option<usize> {
        self.ids.iter().position(|&i| i == id)
    }

    pub fn ids(&self) -> &[usize] {
        &self.ids
    }

    /// Components of the field at position `k`.
    pub fn num_components(&self, k: usize) -> usize {
        self.nc[k]
    }

    pub fn offset(&self, k: usize) -> usize {
        self.offsets[k]
    }

    /// Total number of components over all fields.
    pub fn total(&self) -> usize {
        self.total
    }

    fn range(&self, id: usize) -> std::ops::Range<usize> {
        match self.index_of(id) {
            Some(k) => self.offsets[k]..self.offsets[k] + self.nc[k],
            None => 0..0,
        }
    }
}

/// Values of one field at the current point, one entry per component.
#[derive(Clone, Copy, Debug)]
pub struct FieldValue<'a> {
    data: &'a [f64],
}

impl<'a> FieldValue<'a> {
    pub fn new(data: &'a [f64]) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &'a [f64] {
        self.data
    }
}

impl Index<usize> for FieldValue<'_> {
    type Output = f64;

    fn index(&self, c: usize) -> &f64 {
        &self.data[c]
    }
}

/// Gradient of one field: `get(c, d)` is `d u_c / d x_d`.
#[derive(Clone, Copy, Debug)]
pub struct FieldGradient<'a> {
    data: &'a [f64],
    dim: usize,
}

impl<'a> FieldGradient<'a> {
    pub fn new(data: &'a [f64], dim: usize) -> Self {
        Self { data, dim }
    }

    #[inline]
    pub fn get(&self, c: usize, d: usize) -> f64 {
        self.data[c * self.dim + d]
    }

    /// Gradient of component `c`.
    pub fn component(&self, c: usize) -> &'a [f64] {
        &self.data[c * self.dim..(c + 1) * self.dim]
    }

    pub fn as_slice(&self) -> &'a [f64] {
        self.data
    }
}

/// Physical coordinates of the current point.
#[derive(Clone, Copy, Debug)]
pub struct Point<'a> {
    xyz: &'a [f64],
}

impl<'a> Point<'a> {
    pub fn new(xyz: &'a [f64]) -> Self {
        Self { xyz }
    }

    pub fn as_slice(&self) -> &'a [f64] {
        self.xyz
    }
}

impl Index<usize> for Point<'_> {
    type Output = f64;

    fn index(&self, d: usize) -> &f64 {
        &self.xyz[d]
    }
}

/// Outward unit normal at the current boundary point.
#[derive(Clone, Copy, Debug)]
pub struct Normal<'a> {
    n: &'a [f64],
}

impl<'a> Normal<'a> {
    pub fn new(n: &'a [f64]) -> Self {
        Self { n }
    }

    pub fn as_slice(&self) -> &'a [f64] {
        self.n
    }
}

impl Index<usize> for Normal<'_> {
    type Output = f64;

    fn index(&self, d: usize) -> &f64 {
        &self.n[d]
    }
}

/// Everything known at one quadrature point.
///
/// Field accessors take a field id. Asking for a field that is not part of
/// the problem yields an empty view.
#[derive(Clone, Copy, Debug)]
pub struct QuadraturePoint<'a> {
    pub dim: usize,
    pub time: f64,
    /// Shift `a` in `d(u_t)/du = a`, set by implicit time steppers.
    pub time_shift: f64,
    pub xyz: Point<'a>,
    pub normal: Option<Normal<'a>>,
    pub(crate) fields: &'a FieldLayout,
    pub(crate) u: &'a [f64],
    pub(crate) u_x: &'a [f64],
    pub(crate) u_t: &'a [f64],
    pub(crate) aux_fields: &'a FieldLayout,
    pub(crate) a: &'a [f64],
    pub(crate) a_x: &'a [f64],
}

impl<'a> QuadraturePoint<'a> {
    /// Value of field `id`.
    pub fn u(&self, id: usize) -> FieldValue<'a> {
        FieldValue::new(&self.u[self.fields.range(id)])
    }

    /// Gradient of field `id`.
    pub fn u_x(&self, id: usize) -> FieldGradient<'a> {
        let r = self.fields.range(id);
        FieldGradient::new(&self.u_x[r.start * self.dim..r.end * self.dim], self.dim)
    }

    /// Time derivative of field `id`; zero for steady problems.
    pub fn u_t(&self, id: usize) -> FieldValue<'a> {
        FieldValue::new(&self.u_t[self.fields.range(id)])
    }

    /// Value of auxiliary field `id`.
    pub fn a(&self, id: usize) -> FieldValue<'a> {
        FieldValue::new(&self.a[self.aux_fields.range(id)])
    }

    /// Gradient of auxiliary field `id`.
    pub fn a_x(&self, id: usize) -> FieldGradient<'a> {
        let r = self.aux_fields.range(id);
        FieldGradient::new(&self.a_x[r.start * self.dim..r.end * self.dim], self.dim)
    }
}

/// What an integrand sees: the point data plus the derived-value store.
#[derive(Clone, Copy)]
pub struct QuadratureContext<'a> {
    pub point: &'a QuadraturePoint<'a>,
    pub values: &'a ValueStore,
}

impl<'a> std::ops::Deref for QuadratureContext<'a> {
    type Target = QuadraturePoint<'a>;

    fn deref(&self) -> &Self::Target {
        self.point
    }
}

/// Owned per-point buffers the engine fills and then lends out.
#[derive(Clone, Debug, Default)]
pub(crate) struct PointBuffers {
    pub xyz: Vec<f64>,
    pub normal: Vec<f64>,
    pub u: Vec<f64>,
    pub u_x: Vec<f64>,
    pub u_t: Vec<f64>,
    pub a: Vec<f64>,
    pub a_x: Vec<f64>,
}

impl PointBuffers {
    pub fn new(dim: usize, fields: &FieldLayout, aux: &FieldLayout) -> Self {
        Self {
            xyz: vec![0.0; dim],
            normal: vec![0.0; dim],
            u: vec![0.0; fields.total()],
            u_x: vec![0.0; fields.total() * dim],
            u_t: vec![0.0; fields.total()],
            a: vec![0.0; aux.total()],
            a_x: vec![0.0; aux.total() * dim],
        }
    }

    /// Zeros every buffer before the next point.
    pub fn reset(&mut self) {
        for b in [
            &mut self.xyz,
            &mut self.normal,
            &mut self.u,
            &mut self.u_x,
            &mut self.u_t,
            &mut self.a,
            &mut self.a_x,
        ] {
            b.iter_mut().for_each(|v| *v = 0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn views_slice_the_right_field() {
        let layout = FieldLayout::new([(0, 1), (3, 2)]);
        let aux = FieldLayout::default();
        let u = [1.0, 2.0, 3.0];
        let u_x = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        let zeros = [0.0; 3];
        let xyz = [0.5, 0.5];
        let qp = QuadraturePoint {
            dim: 2,
            time: 0.0,
            time_shift: 0.0,
            xyz: Point::new(&xyz),
            normal: None,
            fields: &layout,
            u: &u,
            u_x: &u_x,
            u_t: &zeros,
            aux_fields: &aux,
            a: &[],
            a_x: &[],
        };
        assert_eq!(qp.u(0).as_slice(), &[1.0]);
        assert_eq!(qp.u(3)[1], 3.0);
        assert_eq!(qp.u_x(3).get(1, 0), 0.5);
        assert_eq!(qp.u_x(3).component(0), &[0.3, 0.4]);
        assert!(qp.u(7).is_empty());
        assert!(qp.a(0).is_empty());
        assert_eq!(qp.xyz[1], 0.5);
    }
}
