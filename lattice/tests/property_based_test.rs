use lattice::parser::literals::parse_domain_literal;
use lattice::{Domain, DomainMode, Engine, EvaluationOptions};
use proptest::prelude::*;

fn literal(values: &[i32]) -> String {
    let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", items.join(" "))
}

fn as_floats(values: &[i32]) -> Vec<f64> {
    values.iter().map(|v| f64::from(*v)).collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 100,
        ..ProptestConfig::default()
    })]

    #[test]
    fn prop_recombination_tiles_first_variable_fastest(
        xs in prop::collection::vec(-1000i32..1000, 1..12),
        ys in prop::collection::vec(-1000i32..1000, 1..12),
    ) {
        let x = as_floats(&xs);
        let y = as_floats(&ys);
        let domain = Domain::from_declarations([("x", x.clone()), ("y", y.clone())])
            .recombine_variables(&["x", "y"])
            .unwrap();

        prop_assert_eq!(domain.len(), x.len() * y.len());
        let bound_x = domain.binding("x").unwrap();
        let bound_y = domain.binding("y").unwrap();
        for point in 0..domain.len() {
            prop_assert_eq!(bound_x[point], x[point % x.len()]);
            prop_assert_eq!(bound_y[point], y[point / x.len()]);
        }
    }

    #[test]
    fn prop_split_yields_contiguous_blocks(
        xs in prop::collection::vec(-1000i32..1000, 1..60),
        fraction in 0.0f64..1.0,
    ) {
        let x = as_floats(&xs);
        let domain = Domain::from_declarations([("x", x.clone())])
            .recombine_variable("x")
            .unwrap();
        let count = 1 + ((x.len() - 1) as f64 * fraction) as usize;

        let blocks = domain.split(count).unwrap();
        let block_size = x.len().div_ceil(count);
        prop_assert!(blocks.len() <= count);
        prop_assert_eq!(blocks.len(), x.len().div_ceil(block_size));

        let mut joined = Vec::new();
        for (index, block) in blocks.iter().enumerate() {
            prop_assert!(!block.is_empty());
            if index + 1 < blocks.len() {
                prop_assert_eq!(block.len(), block_size);
            } else {
                prop_assert!(block.len() <= block_size);
            }
            joined.extend(block.binding("x").unwrap());
        }
        prop_assert_eq!(joined, x);
    }

    #[test]
    fn prop_block_count_does_not_change_results(
        xs in prop::collection::vec(-1000i32..1000, 1..40),
        fraction in 0.0f64..1.0,
    ) {
        let engine = Engine::from_definitions([("f(x)", "x^2 - 3*x + sin(x)")]).unwrap();
        let domain = [("x", literal(&xs))];
        let count = 1 + ((xs.len() - 1) as f64 * fraction) as usize;

        let single = engine
            .evaluate(domain.clone(), ["f(x)"], EvaluationOptions::default())
            .unwrap();
        let split = engine
            .evaluate(domain, ["f(x)"], EvaluationOptions::new(count, DomainMode::Combine))
            .unwrap();
        prop_assert_eq!(single, split);
    }

    #[test]
    fn prop_multiplication_by_zero(xs in prop::collection::vec(-1000i32..1000, 1..20)) {
        let engine = Engine::default();
        let results = engine
            .evaluate([("x", literal(&xs))], ["x * 0", "0 * x"], EvaluationOptions::default())
            .unwrap();
        prop_assert!(results.iter().flatten().all(|v| *v == 0.0));
    }

    #[test]
    fn prop_integer_range_length(start in -500i32..500, span in 0i32..500) {
        let stop = start + span;
        let values = parse_domain_literal(&format!("[{}:{}]", start, stop)).unwrap();
        prop_assert_eq!(values.len(), span as usize + 1);
        prop_assert_eq!(values[0], f64::from(start));
        prop_assert_eq!(values[values.len() - 1], f64::from(stop));
    }

    #[test]
    fn prop_calculator_addition(a in -10000i32..10000, b in -10000i32..10000) {
        let value = Engine::evaluate_expression(&format!("{} + {}", a, b)).unwrap();
        prop_assert_eq!(value, f64::from(a) + f64::from(b));
    }
}
