use mesh_forms::prelude::*;
use proptest::prelude::*;

/// Random DAG on `n` nodes: edges only go from a smaller to a larger id.
fn dag() -> impl Strategy<Value = DependencyGraph<usize>> {
    (2usize..12).prop_flat_map(|n| {
        proptest::collection::vec((0..n, 0..n), 0..3 * n).prop_map(move |pairs| {
            let mut g = DependencyGraph::new();
            for i in 0..n {
                g.add_node(i);
            }
            for (a, b) in pairs {
                if a < b {
                    g.add_edge(a, b);
                }
            }
            g
        })
    })
}

proptest! {
    #[test]
    fn traversals_are_deterministic(g in dag()) {
        prop_assert_eq!(g.dfs([0]).unwrap(), g.dfs([0]).unwrap());
        prop_assert_eq!(g.bfs([0]).unwrap(), g.bfs([0]).unwrap());
        prop_assert_eq!(g.evaluation_order([0]).unwrap(), g.evaluation_order([0]).unwrap());
    }

    #[test]
    fn traversals_visit_the_reachable_set_once(g in dag()) {
        let mut dfs = g.dfs([0]).unwrap();
        let mut bfs = g.bfs([0]).unwrap();
        let mut order = g.evaluation_order([0]).unwrap();
        prop_assert_eq!(dfs[0], 0);
        prop_assert_eq!(bfs[0], 0);
        dfs.sort_unstable();
        bfs.sort_unstable();
        order.sort_unstable();
        let len = dfs.len();
        dfs.dedup();
        prop_assert_eq!(dfs.len(), len);
        prop_assert_eq!(&dfs, &bfs);
        prop_assert_eq!(&dfs, &order);
    }

    #[test]
    fn dependencies_come_first(g in dag()) {
        let order = g.evaluation_order([0]).unwrap();
        for (i, a) in order.iter().enumerate() {
            for b in g.dependencies(a) {
                let j = order.iter().position(|x| x == b).unwrap();
                prop_assert!(j < i, "{} needed by {} but scheduled later", b, a);
            }
        }
    }

    #[test]
    fn back_edge_closes_a_cycle(g in dag()) {
        let reach = g.dfs([0]).unwrap();
        let Some(&last) = reach.iter().max() else { return Ok(()) };
        prop_assume!(last != 0);
        let mut g = g;
        g.add_edge(last, 0);
        // last is reachable from 0, so last -> 0 closes a loop
        let err = g.evaluation_order([0]).unwrap_err();
        prop_assert!(matches!(err, MeshFormsError::CyclicDependency(_)));
        prop_assert!(g.dfs([0]).is_err());
        prop_assert!(g.bfs([last]).is_err());
    }
}

#[test]
fn evaluator_orders_functionals() {
    let mut ev = DependencyEvaluator::new();
    ev.create_functional("nu", ScalarFunctional::new("nu", &["mu", "rho"], |_, v| {
        v.get::<f64>("mu").copied().unwrap_or(0.0) / v.get::<f64>("rho").copied().unwrap_or(1.0)
    }))
    .unwrap();
    ev.create_functional("mu", ScalarFunctional::new("mu", &["T"], |_, _| 1.0))
        .unwrap();
    ev.create_functional("rho", ScalarFunctional::new("rho", &[], |_, _| 2.0))
        .unwrap();
    ev.create_functional("T", ScalarFunctional::new("T", &[], |_, _| 300.0))
        .unwrap();
    let order = ev.evaluation_order(["nu"]).unwrap();
    let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
    assert!(pos("T") < pos("mu"));
    assert!(pos("mu") < pos("nu"));
    assert!(pos("rho") < pos("nu"));
    assert_eq!(order.len(), 4);

    assert_eq!(
        ev.evaluation_order(["kappa"]),
        Err(MeshFormsError::UnknownValue("kappa".into()))
    );
}

#[test]
fn evaluator_rejects_cycles_and_missing_providers() {
    let mut ev = DependencyEvaluator::new();
    ev.create_functional("a", ScalarFunctional::new("a", &["b"], |_, _| 0.0))
        .unwrap();
    ev.create_functional("b", ScalarFunctional::new("b", &["a"], |_, _| 0.0))
        .unwrap();
    assert!(matches!(
        ev.evaluation_order(["a"]),
        Err(MeshFormsError::CyclicDependency(_))
    ));

    let mut ev = DependencyEvaluator::new();
    ev.create_functional("a", ScalarFunctional::new("a", &["ghost"], |_, _| 0.0))
        .unwrap();
    assert_eq!(
        ev.evaluation_order(["a"]),
        Err(MeshFormsError::UnknownValue("ghost".into()))
    );
}

#[test]
fn region_qualified_values_are_distinct() {
    let mut ev = DependencyEvaluator::new();
    ev.create_functional("mu", ScalarFunctional::new("mu", &[], |_, _| 1.0))
        .unwrap();
    ev.create_functional("mu_fluid", ScalarFunctional::new("mu", &[], |_, _| 2.0).in_region("fluid"))
        .unwrap();
    ev.declare_values().unwrap();
    assert!(ev.values().contains("mu"));
    assert!(ev.values().contains("mu@fluid"));
    assert_eq!(ev.evaluation_order(["mu@fluid"]).unwrap(), vec!["mu_fluid".to_string()]);
}
