use lattice::{
    Dag, Domain, Engine, EngineConfig, EquationRegistry, EvaluationOptions, NodeId, NodeKind,
};

#[test]
fn test_shared_random_node_is_computed_once() {
    let engine = Engine::default();
    let results = engine
        .evaluate([("x", "[1:50]")], ["x + rand() - rand()"], EvaluationOptions::default())
        .unwrap();
    let expected: Vec<f64> = (1..=50).map(f64::from).collect();
    for (value, x) in results[0].iter().zip(&expected) {
        assert!((value - x).abs() < 1e-12);
    }
}

#[test]
fn test_high_threshold_disables_sharing_of_results() {
    let config = EngineConfig {
        cache_threshold: 100,
        ..EngineConfig::default()
    };
    let engine = Engine::with_config(EquationRegistry::new(), config);
    let results = engine
        .evaluate([("x", "[1:50]")], ["rand() - rand()"], EvaluationOptions::default())
        .unwrap();
    assert_eq!(results[0].len(), 50);
    assert!(results[0].iter().any(|v| *v != 0.0));
}

#[test]
fn test_seeded_random_is_reproducible() {
    let engine = Engine::default();
    let options = EvaluationOptions::default();
    let first = engine
        .evaluate([("x", "[1:10]")], ["rand(42) + 0*x"], options)
        .unwrap();
    let second = Engine::default()
        .evaluate([("x", "[1:10]")], ["rand(42) + 0*x"], options)
        .unwrap();
    assert_eq!(first, second);
    assert!(first[0].iter().all(|v| (0.0..1.0).contains(v)));
}

fn shared_square() -> (Dag, NodeId, NodeId) {
    let mut dag = Dag::new(2);
    let x = dag.add(NodeKind::Variable("x".to_string()), "x", vec![]);
    let square = dag.add(NodeKind::Times, "x*x", vec![x, x]);
    (dag, x, square)
}

#[test]
fn test_cache_is_keyed_by_domain() {
    let (dag, x, square) = shared_square();
    let first = Domain::new().set_variable("x", vec![1.0, 2.0]).unwrap();
    let second = Domain::new().set_variable("x", vec![3.0]).unwrap();

    assert_eq!(dag.evaluate(square, &first).unwrap(), vec![1.0, 4.0]);
    assert!(dag.is_cached(x, &first));
    assert!(!dag.is_cached(square, &first));
    assert!(!dag.is_cached(x, &second));

    assert_eq!(dag.evaluate(square, &second).unwrap(), vec![9.0]);
    assert!(dag.is_cached(x, &second));

    dag.clear_cache(square);
    assert!(!dag.is_cached(x, &first));
    assert!(!dag.is_cached(x, &second));
}

#[test]
fn test_callers_get_private_copies() {
    let (dag, x, _) = shared_square();
    let domain = Domain::new().set_variable("x", vec![1.0, 2.0]).unwrap();

    let mut values = dag.evaluate(x, &domain).unwrap();
    values[0] = 100.0;
    assert_eq!(dag.evaluate(x, &domain).unwrap(), vec![1.0, 2.0]);
}
