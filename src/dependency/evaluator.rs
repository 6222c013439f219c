//! Named derived values and the functionals that compute them.
//!
//! A functional provides one or more named values and may depend on values
//! provided by other functionals. The evaluator resolves, from the set of
//! values integrands ask for, which functionals must run and in what order,
//! then runs them once per quadrature point before the integrands.

use std::any::Any;
use std::collections::BTreeMap;

use crate::dependency::graph::DependencyGraph;
use crate::mesh_error::MeshFormsError;
use crate::weak_form::views::QuadraturePoint;

/// Typed storage for named values.
#[derive(Default)]
pub struct ValueStore {
    values: BTreeMap<String, Box<dyn Any + Send + Sync>>,
}

impl std::fmt::Debug for ValueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

impl ValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of `name` restricted to `region`: `name@region`.
    pub fn qualified(name: &str, region: Option<&str>) -> String {
        match region {
            None | Some("") => name.to_string(),
            Some(r) => format!("{name}@{r}"),
        }
    }

    /// Declares `name` with the default value of `T`.
    pub fn declare<T: Any + Send + Sync + Default>(&mut self, name: &str) -> Result<(), MeshFormsError> {
        if self.values.contains_key(name) {
            log::error!("Trying to declare an already existing value '{name}'.");
            return Err(MeshFormsError::ValueAlreadyDeclared(name.to_string()));
        }
        self.values.insert(name.to_string(), Box::new(T::default()));
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn get<T: Any>(&self, name: &str) -> Result<&T, MeshFormsError> {
        self.values
            .get(name)
            .ok_or_else(|| MeshFormsError::UnknownValue(name.to_string()))?
            .downcast_ref::<T>()
            .ok_or_else(|| MeshFormsError::ValueTypeMismatch(name.to_string()))
    }

    pub fn get_mut<T: Any>(&mut self, name: &str) -> Result<&mut T, MeshFormsError> {
        self.values
            .get_mut(name)
            .ok_or_else(|| MeshFormsError::UnknownValue(name.to_string()))?
            .downcast_mut::<T>()
            .ok_or_else(|| MeshFormsError::ValueTypeMismatch(name.to_string()))
    }

    /// Overwrites a declared value.
    pub fn set<T: Any>(&mut self, name: &str, value: T) -> Result<(), MeshFormsError> {
        *self.get_mut::<T>(name)? = value;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

/// A computation producing named values at a quadrature point.
pub trait ValueFunctional: Send + Sync {
    /// Names of the values this functional writes.
    fn provides(&self) -> Vec<String>;

    /// Names of the values this functional reads.
    fn depends_on(&self) -> Vec<String> {
        Vec::new()
    }

    /// Declares the provided values. Scalars by default.
    fn declare(&self, store: &mut ValueStore) -> Result<(), MeshFormsError> {
        for name in self.provides() {
            store.declare::<f64>(&name)?;
        }
        Ok(())
    }

    fn evaluate(&self, qp: &QuadraturePoint<'_>, store: &mut ValueStore) -> Result<(), MeshFormsError>;
}

type ScalarFn = dyn Fn(&QuadraturePoint<'_>, &ValueStore) -> f64 + Send + Sync;

/// Closure-backed functional providing one scalar value.
pub struct ScalarFunctional {
    name: String,
    depends_on: Vec<String>,
    func: Box<ScalarFn>,
}

impl ScalarFunctional {
    pub fn new<F>(name: &str, depends_on: &[&str], func: F) -> Self
    where
        F: Fn(&QuadraturePoint<'_>, &ValueStore) -> f64 + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
            func: Box::new(func),
        }
    }

    /// Restricts the provided value and its dependencies to `region`.
    pub fn in_region(mut self, region: &str) -> Self {
        self.name = ValueStore::qualified(&self.name, Some(region));
        self.depends_on = self
            .depends_on
            .iter()
            .map(|d| ValueStore::qualified(d, Some(region)))
            .collect();
        self
    }
}

impl ValueFunctional for ScalarFunctional {
    fn provides(&self) -> Vec<String> {
        vec![self.name.clone()]
    }

    fn depends_on(&self) -> Vec<String> {
        self.depends_on.clone()
    }

    fn evaluate(&self, qp: &QuadraturePoint<'_>, store: &mut ValueStore) -> Result<(), MeshFormsError> {
        let v = (self.func)(qp, store);
        store.set(&self.name, v)
    }
}

/// Owner of functionals and of the values they compute.
#[derive(Default)]
pub struct DependencyEvaluator {
    functionals: BTreeMap<String, Box<dyn ValueFunctional>>,
    values: ValueStore,
}

impl std::fmt::Debug for DependencyEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyEvaluator")
            .field("functionals", &self.functionals.keys().collect::<Vec<_>>())
            .field("values", &self.values)
            .finish()
    }
}

impl DependencyEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a functional under a unique name.
    pub fn create_functional(
        &mut self,
        name: &str,
        functional: impl ValueFunctional + 'static,
    ) -> Result<(), MeshFormsError> {
        if self.functionals.contains_key(name) {
            log::error!("Functional with name '{name}' already exists.");
            return Err(MeshFormsError::DuplicateFunctional(name.to_string()));
        }
        self.functionals.insert(name.to_string(), Box::new(functional));
        Ok(())
    }

    pub fn functional(&self, name: &str) -> Result<&dyn ValueFunctional, MeshFormsError> {
        self.functionals
            .get(name)
            .map(|f| f.as_ref())
            .ok_or_else(|| MeshFormsError::UnknownFunctional(name.to_string()))
    }

    /// Functional names, ascending.
    pub fn functional_names(&self) -> impl Iterator<Item = &str> {
        self.functionals.keys().map(String::as_str)
    }

    pub fn values(&self) -> &ValueStore {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut ValueStore {
        &mut self.values
    }

    /// Map from value name to the name of the functional providing it.
    pub fn suppliers(&self) -> Result<BTreeMap<String, String>, MeshFormsError> {
        let mut out = BTreeMap::new();
        for (fname, f) in &self.functionals {
            for value in f.provides() {
                if let Some(prev) = out.insert(value.clone(), fname.clone()) {
                    log::error!("Value '{value}' is provided by both '{prev}' and '{fname}'.");
                    return Err(MeshFormsError::ValueAlreadyDeclared(value));
                }
            }
        }
        Ok(out)
    }

    /// Graph over functional names: `a -> b` when `a` reads a value `b` provides.
    pub fn build_graph(
        &self,
        suppliers: &BTreeMap<String, String>,
    ) -> Result<DependencyGraph<String>, MeshFormsError> {
        let mut graph = DependencyGraph::new();
        for (fname, f) in &self.functionals {
            graph.add_node(fname.clone());
            for dep in f.depends_on() {
                let Some(supplier) = suppliers.get(&dep) else {
                    log::error!("Functional '{fname}' depends on '{dep}', which nothing provides.");
                    return Err(MeshFormsError::UnknownValue(dep));
                };
                graph.add_edge(fname.clone(), supplier.clone());
            }
        }
        Ok(graph)
    }

    /// Functionals to run, dependencies first, so that every requested value
    /// is available afterwards.
    pub fn evaluation_order<'s>(
        &self,
        requested: impl IntoIterator<Item = &'s str>,
    ) -> Result<Vec<String>, MeshFormsError> {
        let suppliers = self.suppliers()?;
        let graph = self.build_graph(&suppliers)?;
        let mut roots = Vec::new();
        for value in requested {
            match suppliers.get(value) {
                Some(f) => roots.push(f.clone()),
                None => {
                    log::error!("No functional provides the value '{value}'.");
                    return Err(MeshFormsError::UnknownValue(value.to_string()));
                }
            }
        }
        graph.evaluation_order(roots)
    }

    /// Declares every provided value in the store. Call once after all
    /// functionals are created.
    pub fn declare_values(&mut self) -> Result<(), MeshFormsError> {
        let Self { functionals, values } = self;
        for f in functionals.values() {
            f.declare(values)?;
        }
        Ok(())
    }

    /// Runs the functionals named in `order` at one quadrature point.
    pub fn evaluate(&mut self, order: &[String], qp: &QuadraturePoint<'_>) -> Result<(), MeshFormsError> {
        let Self { functionals, values } = self;
        for name in order {
            let f = functionals
                .get(name)
                .ok_or_else(|| MeshFormsError::UnknownFunctional(name.clone()))?;
            f.evaluate(qp, values)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_declare_get_set() {
        let mut s = ValueStore::new();
        s.declare::<f64>("mu").unwrap();
        assert_eq!(*s.get::<f64>("mu").unwrap(), 0.0);
        s.set("mu", 2.5).unwrap();
        assert_eq!(*s.get::<f64>("mu").unwrap(), 2.5);
        assert_eq!(
            s.declare::<f64>("mu"),
            Err(MeshFormsError::ValueAlreadyDeclared("mu".into()))
        );
        assert_eq!(s.get::<i32>("mu"), Err(MeshFormsError::ValueTypeMismatch("mu".into())));
        assert_eq!(s.get::<f64>("rho"), Err(MeshFormsError::UnknownValue("rho".into())));
    }

    #[test]
    fn qualified_names() {
        assert_eq!(ValueStore::qualified("mu", None), "mu");
        assert_eq!(ValueStore::qualified("mu", Some("")), "mu");
        assert_eq!(ValueStore::qualified("mu", Some("fluid")), "mu@fluid");
    }

    #[test]
    fn duplicate_and_unknown_functionals() {
        let mut ev = DependencyEvaluator::new();
        ev.create_functional("mu", ScalarFunctional::new("mu", &[], |_, _| 1.0))
            .unwrap();
        let err = ev
            .create_functional("mu", ScalarFunctional::new("mu", &[], |_, _| 1.0))
            .unwrap_err();
        assert_eq!(err.to_string(), "Functional with name 'mu' already exists.");
        let err = ev.functional("nu").err().unwrap();
        assert_eq!(err.to_string(), "No functional with name 'nu' found. Typo?");
    }

    #[test]
    fn order_puts_dependencies_first() {
        let mut ev = DependencyEvaluator::new();
        ev.create_functional("visc", ScalarFunctional::new("nu", &["mu", "rho"], |_, _| 0.0))
            .unwrap();
        ev.create_functional("dens", ScalarFunctional::new("rho", &[], |_, _| 0.0))
            .unwrap();
        ev.create_functional("dyn", ScalarFunctional::new("mu", &["rho"], |_, _| 0.0))
            .unwrap();
        let order = ev.evaluation_order(["nu"]).unwrap();
        assert_eq!(order, vec!["dens", "dyn", "visc"]);
        assert_eq!(ev.evaluation_order(["rho"]).unwrap(), vec!["dens"]);
        assert!(ev.evaluation_order(["missing"]).is_err());
    }

    #[test]
    fn region_qualifies_names() {
        let f = ScalarFunctional::new("mu", &["T"], |_, _| 0.0).in_region("core");
        assert_eq!(f.provides(), vec!["mu@core"]);
        assert_eq!(f.depends_on(), vec!["T@core"]);
    }
}
