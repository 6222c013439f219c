//! Weak-form registry: keyed lists of residual and Jacobian integrands.
//!
//! One table per statement kind maps a [`FormKey`] to the integrands
//! registered under it, in insertion order. Lookups of absent keys return an
//! empty slice; "no contribution" is a normal outcome. The registry owns its
//! integrands and drops each exactly once with the table.

use std::collections::{BTreeMap, BTreeSet};

use crate::weak_form::integrand::{JacobianFunc, ResidualFunc};
use crate::weak_form::kinds::{Domain, FormKey, JacobianKind, Region, ResidualKind};

type ResidualTable = BTreeMap<FormKey, Vec<Box<dyn ResidualFunc>>>;
type JacobianTable = BTreeMap<FormKey, Vec<Box<dyn JacobianFunc>>>;

/// Registry of weak-form integrands.
#[derive(Default)]
pub struct WeakForm {
    n_fields: usize,
    res: BTreeMap<ResidualKind, ResidualTable>,
    jac: BTreeMap<JacobianKind, JacobianTable>,
}

impl std::fmt::Debug for WeakForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakForm")
            .field("n_fields", &self.n_fields)
            .field("residual_terms", &self.num_residual_terms())
            .field("jacobian_terms", &self.num_jacobian_terms())
            .finish()
    }
}

impl WeakForm {
    /// Empty registry for a problem with `n_fields` fields.
    pub fn new(n_fields: usize) -> Self {
        Self {
            n_fields,
            ..Self::default()
        }
    }

    /// Number of fields used to combine Jacobian field pairs.
    pub fn num_fields(&self) -> usize {
        self.n_fields
    }

    pub fn set_num_fields(&mut self, n_fields: usize) {
        self.n_fields = n_fields;
    }

    /// Combined index of the field pair `(f, g)`.
    pub fn jacobian_index(&self, f: usize, g: usize) -> usize {
        f * self.n_fields + g
    }

    /// Appends a residual integrand under `(kind, label, value, field, part)`.
    pub fn add_residual(
        &mut self,
        kind: ResidualKind,
        label: Option<&str>,
        value: i32,
        field: usize,
        part: i32,
        func: impl ResidualFunc + 'static,
    ) {
        self.add_residual_boxed(kind, label, value, field, part, Box::new(func));
    }

    /// Same as [`add_residual`](Self::add_residual) for an already boxed integrand.
    pub fn add_residual_boxed(
        &mut self,
        kind: ResidualKind,
        label: Option<&str>,
        value: i32,
        field: usize,
        part: i32,
        func: Box<dyn ResidualFunc>,
    ) {
        let key = FormKey::new(label, value, field, part);
        log::debug!("weak form: {kind:?} term on {key:?}");
        self.res
            .entry(kind)
            .or_default()
            .entry(key)
            .or_default()
            .push(func);
    }

    /// Appends a Jacobian integrand for the field pair `(f, g)`.
    #[allow(clippy::too_many_arguments)]
    pub fn add_jacobian(
        &mut self,
        kind: JacobianKind,
        label: Option<&str>,
        value: i32,
        f: usize,
        g: usize,
        part: i32,
        func: impl JacobianFunc + 'static,
    ) {
        self.add_jacobian_boxed(kind, label, value, f, g, part, Box::new(func));
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_jacobian_boxed(
        &mut self,
        kind: JacobianKind,
        label: Option<&str>,
        value: i32,
        f: usize,
        g: usize,
        part: i32,
        func: Box<dyn JacobianFunc>,
    ) {
        let key = FormKey::new(label, value, self.jacobian_index(f, g), part);
        log::debug!("weak form: {kind:?} term ({f}, {g}) on {key:?}");
        self.jac
            .entry(kind)
            .or_default()
            .entry(key)
            .or_default()
            .push(func);
    }

    /// Residual integrands under the key; empty when nothing is registered.
    pub fn get_residual(
        &self,
        kind: ResidualKind,
        label: Option<&str>,
        value: i32,
        field: usize,
        part: i32,
    ) -> &[Box<dyn ResidualFunc>] {
        let key = FormKey::new(label, value, field, part);
        self.res
            .get(&kind)
            .and_then(|t| t.get(&key))
            .map_or(&[], Vec::as_slice)
    }

    /// Jacobian integrands for `(f, g)` under the key; empty when absent.
    pub fn get_jacobian(
        &self,
        kind: JacobianKind,
        label: Option<&str>,
        value: i32,
        f: usize,
        g: usize,
        part: i32,
    ) -> &[Box<dyn JacobianFunc>] {
        let key = FormKey::new(label, value, self.jacobian_index(f, g), part);
        self.jac
            .get(&kind)
            .and_then(|t| t.get(&key))
            .map_or(&[], Vec::as_slice)
    }

    /// Keys with at least one residual integrand of `kind`, ascending.
    pub fn residual_keys(&self, kind: ResidualKind) -> Vec<FormKey> {
        self.res
            .get(&kind)
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Keys with at least one Jacobian integrand of `kind`, ascending.
    pub fn jacobian_keys(&self, kind: JacobianKind) -> Vec<FormKey> {
        self.jac
            .get(&kind)
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Distinct regions with at least one residual or Jacobian term in `domain`.
    pub fn get_regions(&self, domain: Domain) -> BTreeSet<Region> {
        let res = self
            .res
            .iter()
            .filter(|(k, _)| k.domain() == domain)
            .flat_map(|(_, t)| t.keys());
        let jac = self
            .jac
            .iter()
            .filter(|(k, _)| k.domain() == domain)
            .flat_map(|(_, t)| t.keys());
        res.chain(jac).map(FormKey::region).collect()
    }

    /// True when any volume `G0..G3` term is registered.
    pub fn has_jacobian(&self) -> bool {
        [JacobianKind::G0, JacobianKind::G1, JacobianKind::G2, JacobianKind::G3]
            .iter()
            .any(|k| self.jac.get(k).is_some_and(|t| !t.is_empty()))
    }

    /// True when any `Gp0..Gp3` term is registered.
    pub fn has_jacobian_preconditioner(&self) -> bool {
        [JacobianKind::Gp0, JacobianKind::Gp1, JacobianKind::Gp2, JacobianKind::Gp3]
            .iter()
            .any(|k| self.jac.get(k).is_some_and(|t| !t.is_empty()))
    }

    /// Field ids referenced by any registered term. Jacobian keys are split
    /// back into their test and basis fields.
    pub fn field_ids(&self) -> BTreeSet<usize> {
        let n = self.n_fields.max(1);
        let res = self.res.values().flat_map(|t| t.keys()).map(|k| k.field);
        let jac = self
            .jac
            .values()
            .flat_map(|t| t.keys())
            .flat_map(|k| [k.field / n, k.field % n]);
        res.chain(jac).collect()
    }

    /// Every derived value requested by any integrand.
    pub fn dependent_values(&self) -> BTreeSet<String> {
        let res = self
            .res
            .values()
            .flat_map(|t| t.values().flatten())
            .flat_map(|f| f.dependent_values());
        let jac = self
            .jac
            .values()
            .flat_map(|t| t.values().flatten())
            .flat_map(|f| f.dependent_values());
        res.chain(jac).collect()
    }

    /// Total number of registered integrands.
    pub fn len(&self) -> usize {
        self.num_residual_terms() + self.num_jacobian_terms()
    }

    fn num_residual_terms(&self) -> usize {
        self.res.values().flat_map(|t| t.values()).map(Vec::len).sum()
    }

    fn num_jacobian_terms(&self) -> usize {
        self.jac.values().flat_map(|t| t.values()).map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weak_form::integrand::{jacobian_fn, residual_fn};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn missing_keys_are_empty() {
        let wf = WeakForm::new(2);
        assert!(wf.get_residual(ResidualKind::F0, None, 0, 0, 0).is_empty());
        assert!(wf.get_jacobian(JacobianKind::G3, Some("left"), 1, 1, 0, 0).is_empty());
        assert!(wf.get_regions(Domain::Volume).is_empty());
        assert!(!wf.has_jacobian());
    }

    #[test]
    fn field_ids_split_jacobian_pairs() {
        let mut wf = WeakForm::new(3);
        wf.add_residual(ResidualKind::BndF0, Some("left"), 1, 1, 0, residual_fn(|_, _| {}));
        wf.add_jacobian(JacobianKind::G1, None, 0, 2, 0, 0, jacobian_fn(|_, _| {}));
        assert_eq!(wf.field_ids().into_iter().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert!(WeakForm::new(0).field_ids().is_empty());
    }

    #[test]
    fn jacobian_keys_combine_fields() {
        let mut wf = WeakForm::new(3);
        wf.add_jacobian(JacobianKind::G1, None, 0, 2, 1, 0, jacobian_fn(|_, _| {}));
        let keys = wf.jacobian_keys(JacobianKind::G1);
        assert_eq!(keys, vec![FormKey::new(None, 0, 7, 0)]);
        assert_eq!(wf.get_jacobian(JacobianKind::G1, None, 0, 2, 1, 0).len(), 1);
        assert!(wf.get_jacobian(JacobianKind::G1, None, 0, 1, 2, 0).is_empty());
        assert!(wf.has_jacobian());
        assert!(!wf.has_jacobian_preconditioner());
    }

    #[test]
    fn preconditioner_only_does_not_count_as_jacobian() {
        let mut wf = WeakForm::new(1);
        wf.add_jacobian(JacobianKind::Gp0, None, 0, 0, 0, 0, jacobian_fn(|_, _| {}));
        assert!(!wf.has_jacobian());
        assert!(wf.has_jacobian_preconditioner());
    }

    #[test]
    fn regions_by_domain() {
        let mut wf = WeakForm::new(1);
        wf.add_residual(ResidualKind::F0, None, 0, 0, 0, residual_fn(|_, _| {}));
        wf.add_residual(ResidualKind::F1, None, 0, 0, 0, residual_fn(|_, _| {}));
        wf.add_residual(ResidualKind::BndF0, Some("left"), 1, 0, 0, residual_fn(|_, _| {}));
        wf.add_jacobian(JacobianKind::BndG0, Some("right"), 1, 0, 0, 0, jacobian_fn(|_, _| {}));
        let vol: Vec<Region> = wf.get_regions(Domain::Volume).into_iter().collect();
        assert_eq!(vol, vec![Region { label: None, value: 0, part: 0 }]);
        let bnd: Vec<Option<String>> = wf
            .get_regions(Domain::Boundary)
            .into_iter()
            .map(|r| r.label)
            .collect();
        assert_eq!(bnd, vec![Some("left".to_string()), Some("right".to_string())]);
        assert_eq!(wf.len(), 4);
    }

    struct Counted(Arc<AtomicUsize>);

    impl ResidualFunc for Counted {
        fn evaluate(&self, _: &crate::weak_form::views::QuadratureContext<'_>, _: &mut [f64]) {}
    }

    impl Drop for Counted {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn integrands_dropped_once() {
        let drops = Arc::new(AtomicUsize::new(0));
        {
            let mut wf = WeakForm::new(1);
            for _ in 0..3 {
                wf.add_residual(ResidualKind::F0, None, 0, 0, 0, Counted(drops.clone()));
            }
            assert_eq!(wf.get_residual(ResidualKind::F0, None, 0, 0, 0).len(), 3);
        }
        assert_eq!(drops.load(Ordering::SeqCst), 3);
    }
}
