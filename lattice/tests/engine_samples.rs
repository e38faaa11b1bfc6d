use lattice::parser::literals::parse_domain_literal;
use lattice::{Blocks, DomainMode, Engine, EvaluationOptions};

fn assert_close(actual: &[f64], expected: &[f64], tolerance: f64) {
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).abs() <= tolerance,
            "point {}: expected {}, got {}",
            i,
            e,
            a
        );
    }
}

#[test]
fn test_using_variables() {
    let engine = Engine::from_definitions([
        ("f(x)", "x^2"),
        ("g(x)", "2*f(x) + 1"),
        ("h(x)", "g(sin(x))"),
    ])
    .unwrap();

    let results = engine
        .evaluate(
            [("x", "[0 1 2 3]")],
            ["f(x)", "g(x)", "h(x)"],
            EvaluationOptions::default(),
        )
        .unwrap();

    assert_eq!(results[0], vec![0.0, 1.0, 4.0, 9.0]);
    assert_eq!(results[1], vec![1.0, 3.0, 9.0, 19.0]);
    let expected: Vec<f64> = [0.0f64, 1.0, 2.0, 3.0]
        .iter()
        .map(|x| 2.0 * x.sin().powi(2) + 1.0)
        .collect();
    assert_close(&results[2], &expected, 1e-12);
}

#[test]
fn test_multi_variate_domain_recombination() {
    let engine = Engine::from_definitions([("f(x,y)", "x + 10*y")]).unwrap();
    let results = engine
        .evaluate(
            [("x", "[1 2 3]"), ("y", "[1:3]")],
            ["x", "y", "f(x,y)"],
            EvaluationOptions::default(),
        )
        .unwrap();

    assert_eq!(
        results[0],
        vec![1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 1.0, 2.0, 3.0]
    );
    assert_eq!(
        results[1],
        vec![1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 3.0, 3.0, 3.0]
    );
    assert_eq!(
        results[2],
        vec![11.0, 12.0, 13.0, 21.0, 22.0, 23.0, 31.0, 32.0, 33.0]
    );
}

#[test]
fn test_declaration_order_sets_tiling() {
    let engine = Engine::default();
    let results = engine
        .evaluate(
            [("y", "[4 5]"), ("x", "[1 2 3]")],
            ["x", "y"],
            EvaluationOptions::default(),
        )
        .unwrap();
    assert_eq!(results[1], vec![4.0, 5.0, 4.0, 5.0, 4.0, 5.0]);
    assert_eq!(results[0], vec![1.0, 1.0, 2.0, 2.0, 3.0, 3.0]);
}

#[test]
fn test_unreferenced_variables_are_not_recombined() {
    let engine = Engine::default();
    let results = engine
        .evaluate(
            [("x", "[1 2 3]"), ("unused", "[1:100]")],
            ["x * 2"],
            EvaluationOptions::default(),
        )
        .unwrap();
    assert_eq!(results[0], vec![2.0, 4.0, 6.0]);
}

#[test]
fn test_summation_approximates_pi() {
    let engine = Engine::from_definitions([
        ("ChebyshevTerm(k)", "( (-1)^k * (sqrt(2)-1)^(2*k+1)) / (2*k+1)"),
        ("piApprox(k)", "8*cumsum(ChebyshevTerm(k))"),
    ])
    .unwrap();

    let results = engine
        .evaluate(
            [("k", "[0:20]")],
            ["piApprox(k)"],
            EvaluationOptions::new(4, DomainMode::Combine),
        )
        .unwrap();

    assert_eq!(results[0].len(), 21);
    assert!((results[0][20] - std::f64::consts::PI).abs() < 1e-12);
    assert!(results[0][0] > 3.3);
}

#[test]
fn test_whole_domain_reductions_force_one_block() {
    let engine = Engine::default();
    let results = engine
        .evaluate(
            [("x", "[1:4]")],
            ["sum(x)", "max(x)", "x - min(x)"],
            EvaluationOptions::new(2, DomainMode::Combine),
        )
        .unwrap();
    assert_eq!(results[0], vec![10.0; 4]);
    assert_eq!(results[1], vec![4.0; 4]);
    assert_eq!(results[2], vec![0.0, 1.0, 2.0, 3.0]);
}

#[test]
fn test_calculator_expressions() {
    let value = Engine::evaluate_expression("log10(1000) / (1.4 + 1.6)").unwrap();
    assert!((value - 1.0).abs() < 1e-6);
    assert_eq!(Engine::evaluate_expression("5 - 10 + 5").unwrap(), 0.0);
    assert_eq!(Engine::evaluate_expression("2*0").unwrap(), 0.0);
    assert_eq!(Engine::evaluate_expression("2^3^2").unwrap(), 64.0);
    assert_eq!(Engine::evaluate_expression("round(2.5) + round(3.5)").unwrap(), 6.0);
    assert_eq!(Engine::evaluate_expression("3 > 2 & 1 == 1").unwrap(), 1.0);
    assert!((Engine::evaluate_expression("sind(90)").unwrap() - 1.0).abs() < 1e-15);
}

#[test]
fn test_operator_ranking() {
    assert_eq!(Engine::evaluate_expression("8/2*2").unwrap(), 2.0);
    assert_eq!(Engine::evaluate_expression("0 & 1 | 1").unwrap(), 0.0);
    assert_eq!(Engine::evaluate_expression("-1/2 * ( 3 - 1^2 )").unwrap(), -0.25);
    assert_eq!(Engine::evaluate_expression("7 % 4 * 2").unwrap(), 7.0 % 8.0);
    assert_eq!(Engine::evaluate_expression("10 - 4 + 3").unwrap(), 9.0);
}

#[test]
fn test_long_flat_expressions() {
    let sum = vec!["1"; 300].join("+");
    assert_eq!(Engine::evaluate_expression(&sum).unwrap(), 300.0);

    let engine = Engine::from_definitions([("f(x)", "x + 1")]).unwrap();
    let calls = vec!["f(x)"; 300].join(" + ");
    let results = engine
        .evaluate([("x", "[0 1]")], [calls.as_str()], EvaluationOptions::default())
        .unwrap();
    assert_eq!(results[0], vec![300.0, 600.0]);
}

#[test]
fn test_explicit_points_versus_combination() {
    let engine = Engine::from_definitions([("f(x,y)", "1")]).unwrap();
    let domain = [("x", "[1,2,5,6,9]"), ("y", "[1,2,5,6,9]")];

    let explicit = engine
        .evaluate(domain, ["f(x,y)"], EvaluationOptions::new(1, DomainMode::Explicit))
        .unwrap();
    assert_eq!(explicit[0].len(), 5);

    let combined = engine
        .evaluate(domain, ["f(x,y)"], EvaluationOptions::new(1, DomainMode::Combine))
        .unwrap();
    assert_eq!(combined[0].len(), 25);
}

#[test]
fn test_explicit_points_pair_values() {
    let engine = Engine::default();
    let results = engine
        .evaluate(
            [("x", "[1 2 3]"), ("y", "[10 20 30]")],
            ["x + y"],
            EvaluationOptions::new(1, DomainMode::Explicit),
        )
        .unwrap();
    assert_eq!(results[0], vec![11.0, 22.0, 33.0]);
}

#[test]
fn test_automatic_splitting() {
    let engine = Engine::from_definitions([("f(x)", "2*x + 1")]).unwrap();
    let results = engine
        .evaluate(
            [("x", "[0.001:0.001:10]")],
            ["f(x)"],
            EvaluationOptions::new(Blocks::Auto, DomainMode::Combine),
        )
        .unwrap();

    let x = parse_domain_literal("[0.001:0.001:10]").unwrap();
    assert_eq!(results[0].len(), 10000);
    let expected: Vec<f64> = x.iter().map(|v| 2.0 * v + 1.0).collect();
    assert_eq!(results[0], expected);
}

#[test]
fn test_fixed_block_counts_agree() {
    let engine = Engine::from_definitions([("f(x,y)", "x*y - sin(x)")]).unwrap();
    let domain = [("x", "[0:0.5:5]"), ("y", "[-1 0 1]")];
    let single = engine
        .evaluate(domain, ["f(x,y)"], EvaluationOptions::default())
        .unwrap();
    for blocks in [2, 3, 7, 33] {
        let split = engine
            .evaluate(domain, ["f(x,y)"], EvaluationOptions::new(blocks, DomainMode::Combine))
            .unwrap();
        assert_eq!(split, single, "{} blocks", blocks);
    }
}

#[test]
fn test_constant_output_has_one_point() {
    let engine = Engine::from_definitions([("c", "6 * 7")]).unwrap();
    let results = engine
        .evaluate([("x", "[1 2 3]")], ["c", "pi"], EvaluationOptions::default())
        .unwrap();
    assert_eq!(results[0], vec![42.0]);
    assert_eq!(results[1], vec![std::f64::consts::PI]);
}

#[test]
fn test_bare_reference_uses_formal_parameters() {
    let engine = Engine::from_definitions([("f(x)", "x + 1")]).unwrap();
    let results = engine
        .evaluate([("x", "[1 2]")], ["f", "f * 2"], EvaluationOptions::default())
        .unwrap();
    assert_eq!(results[0], vec![2.0, 3.0]);
    assert_eq!(results[1], vec![4.0, 6.0]);
}

#[test]
fn test_validate_reports_broken_definitions() {
    let engine = Engine::from_definitions([("f(x)", "x"), ("g(x,y)", "f(x)")]).unwrap();
    assert!(engine.validate().is_err());

    let engine = Engine::from_definitions([("f(x)", "x"), ("g(x,y)", "f(x) * y")]).unwrap();
    assert!(engine.validate().is_ok());
}
