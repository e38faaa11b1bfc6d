use super::{Dag, Node, NodeId, NodeKind};
use crate::domain::Domain;
use crate::{LatticeError, LatticeResult};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::f64::consts::{E, PI};

impl Dag {
    /// Uncached evaluation of one node. Children go through `evaluate`, so
    /// every buffer seen here is already private and is reused in place.
    pub(super) fn compute(&self, node: &Node, domain: &Domain) -> LatticeResult<Vec<f64>> {
        let len = domain.len();
        match &node.kind {
            NodeKind::Constant(value) => Ok(vec![*value; len]),
            NodeKind::E => Ok(vec![E; len]),
            NodeKind::Pi => Ok(vec![PI; len]),
            NodeKind::Random => self.random(node, domain),
            NodeKind::Variable(name) => domain.binding(name),
            NodeKind::Wrapper => {
                let child = single_child(node)?;
                self.evaluate(child, domain)
            }
            NodeKind::Piecewise => self.piecewise(node, domain),
            NodeKind::DomainTransformation { parameters, .. } => {
                self.transform(node, parameters, domain)
            }
            NodeKind::NumericFunction1D { variable, curve } => {
                let points = domain.binding(variable)?;
                Ok(points.into_iter().map(|x| curve.value(x)).collect())
            }
            NodeKind::NumericFunction2D { variables, surface } => {
                let first = domain.binding(&variables.0)?;
                let second = domain.binding(&variables.1)?;
                Ok(first
                    .into_iter()
                    .zip(second)
                    .map(|(x1, x2)| surface.value(x1, x2))
                    .collect())
            }
            NodeKind::Minus => self.minus(node, domain),
            NodeKind::Times => self.times(node, domain),
            NodeKind::Sum => {
                let values = self.evaluate(single_child(node)?, domain)?;
                let total: f64 = values.iter().sum();
                Ok(vec![total; len])
            }
            NodeKind::CumSum => self.cumsum(node, domain),
            NodeKind::Max => self.extremum(node, domain, f64::NEG_INFINITY, ieee_max),
            NodeKind::Min => self.extremum(node, domain, f64::INFINITY, ieee_min),
            kind => {
                if let Some(f) = kind.unary_function() {
                    let mut values = self.evaluate(single_child(node)?, domain)?;
                    values.iter_mut().for_each(|v| *v = f(*v));
                    return Ok(values);
                }
                if let Some(f) = kind.binary_function() {
                    let (lhs, rhs) = two_children(node)?;
                    let mut values = self.evaluate(lhs, domain)?;
                    let right = self.evaluate(rhs, domain)?;
                    values
                        .iter_mut()
                        .zip(right)
                        .for_each(|(v, r)| *v = f(*v, r));
                    return Ok(values);
                }
                Err(LatticeError::evaluation(
                    &node.label,
                    format!("{} cannot be evaluated", kind.name()),
                ))
            }
        }
    }

    fn minus(&self, node: &Node, domain: &Domain) -> LatticeResult<Vec<f64>> {
        let (first, rest) = node.children.split_first().ok_or_else(|| {
            LatticeError::evaluation(&node.label, "minus requires at least one operand")
        })?;
        let mut values = self.evaluate(*first, domain)?;
        if rest.is_empty() {
            values.iter_mut().for_each(|v| *v = -*v);
            return Ok(values);
        }
        for child in rest {
            let right = self.evaluate(*child, domain)?;
            values.iter_mut().zip(right).for_each(|(v, r)| *v -= r);
        }
        Ok(values)
    }

    /// Product of the operands. When the first literal constant among the
    /// first two operands is zero, the result is all zeros and nothing else
    /// is evaluated.
    fn times(&self, node: &Node, domain: &Domain) -> LatticeResult<Vec<f64>> {
        if node.children.is_empty() {
            return Err(LatticeError::evaluation(
                &node.label,
                "times requires at least one operand",
            ));
        }
        let literal = node.children.iter().take(2).find_map(|child| {
            match self.node(*child).kind {
                NodeKind::Constant(value) => Some(value),
                _ => None,
            }
        });
        if literal == Some(0.0) {
            return Ok(vec![0.0; domain.len()]);
        }

        let mut values = self.evaluate(node.children[0], domain)?;
        for child in &node.children[1..] {
            let right = self.evaluate(*child, domain)?;
            values.iter_mut().zip(right).for_each(|(v, r)| *v *= r);
        }
        Ok(values)
    }

    /// Running sum in point order. Only meaningful along a single axis.
    fn cumsum(&self, node: &Node, domain: &Domain) -> LatticeResult<Vec<f64>> {
        let child = single_child(node)?;
        let bound = domain.bound_names();
        if bound.len() > 1 {
            return Err(LatticeError::evaluation(
                &node.label,
                format!(
                    "cumsum needs a domain bound to one variable, found {}",
                    bound.join(", ")
                ),
            ));
        }
        let mut values = self.evaluate(child, domain)?;
        let mut running = 0.0;
        for v in values.iter_mut() {
            running += *v;
            *v = running;
        }
        Ok(values)
    }

    /// One operand reduces over the whole domain; several combine point by point.
    fn extremum(
        &self,
        node: &Node,
        domain: &Domain,
        start: f64,
        pick: fn(f64, f64) -> f64,
    ) -> LatticeResult<Vec<f64>> {
        match node.children.as_slice() {
            [] => Err(LatticeError::evaluation(
                &node.label,
                format!("{} requires at least one operand", node.kind.name()),
            )),
            [only] => {
                let values = self.evaluate(*only, domain)?;
                let reduced = values.into_iter().fold(start, pick);
                Ok(vec![reduced; domain.len()])
            }
            children => {
                let mut values = vec![start; domain.len()];
                for child in children {
                    let operand = self.evaluate(*child, domain)?;
                    values
                        .iter_mut()
                        .zip(operand)
                        .for_each(|(v, o)| *v = pick(*v, o));
                }
                Ok(values)
            }
        }
    }

    /// Uniform draws in [0, 1), one per point. A single operand seeds the
    /// generator from its first value.
    fn random(&self, node: &Node, domain: &Domain) -> LatticeResult<Vec<f64>> {
        let len = domain.len();
        match node.children.as_slice() {
            [] => {
                let mut rng = rand::thread_rng();
                Ok((0..len).map(|_| rng.gen::<f64>()).collect())
            }
            [seed] => {
                let seeds = self.evaluate(*seed, domain)?;
                let seed = seeds.first().copied().unwrap_or(0.0);
                let mut rng = ChaCha8Rng::seed_from_u64(seed as i64 as u64);
                Ok((0..len).map(|_| rng.gen::<f64>()).collect())
            }
            children => Err(LatticeError::evaluation(
                &node.label,
                format!("random takes at most one argument, got {}", children.len()),
            )),
        }
    }

    /// Evaluate the body of a user function. Substitutions are computed in
    /// the caller's domain and bound as the callee's parameters.
    fn transform(
        &self,
        node: &Node,
        parameters: &[String],
        domain: &Domain,
    ) -> LatticeResult<Vec<f64>> {
        let (body, substitutions) = node.children.split_first().ok_or_else(|| {
            LatticeError::evaluation(&node.label, "function call has no body")
        })?;

        let mut transformed: Option<Domain> = None;
        for (parameter, substitution) in parameters.iter().zip(substitutions) {
            let values = self.evaluate(*substitution, domain)?;
            let base = transformed.as_ref().unwrap_or(domain);
            transformed = Some(base.set_variable(parameter, values)?);
        }

        match transformed {
            Some(local) => self.evaluate(*body, &local),
            None => self.evaluate(*body, domain),
        }
    }
}

fn single_child(node: &Node) -> LatticeResult<NodeId> {
    match node.children.as_slice() {
        [child] => Ok(*child),
        children => Err(LatticeError::evaluation(
            &node.label,
            format!(
                "{} takes exactly one argument, got {}",
                node.kind.name(),
                children.len()
            ),
        )),
    }
}

fn two_children(node: &Node) -> LatticeResult<(NodeId, NodeId)> {
    match node.children.as_slice() {
        [lhs, rhs] => Ok((*lhs, *rhs)),
        children => Err(LatticeError::evaluation(
            &node.label,
            format!(
                "{} takes exactly two operands, got {}",
                node.kind.name(),
                children.len()
            ),
        )),
    }
}

fn ieee_max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.max(b)
    }
}

fn ieee_min(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.min(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(values: Vec<f64>) -> Domain {
        Domain::new().set_variable("x", values).unwrap()
    }

    fn leaf(dag: &mut Dag, name: &str) -> NodeId {
        dag.add(NodeKind::Variable(name.to_string()), name, vec![])
    }

    #[test]
    fn test_times_short_circuits_on_literal_zero() {
        let mut dag = Dag::new(2);
        let unbound = leaf(&mut dag, "y");
        let zero = dag.add(NodeKind::Constant(0.0), "0", vec![]);
        let product = dag.add(NodeKind::Times, "y*0", vec![unbound, zero]);
        let domain = points(vec![1.0, 2.0]);
        assert_eq!(dag.evaluate(product, &domain).unwrap(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_times_checks_first_literal_only() {
        let mut dag = Dag::new(2);
        let two = dag.add(NodeKind::Constant(2.0), "2", vec![]);
        let zero = dag.add(NodeKind::Constant(0.0), "0", vec![]);
        let product = dag.add(NodeKind::Times, "2*0", vec![two, zero]);
        assert_eq!(dag.evaluate(product, &points(vec![5.0])).unwrap(), vec![0.0]);

        let unbound = leaf(&mut dag, "y");
        let other = dag.add(NodeKind::Times, "2*y", vec![two, unbound]);
        assert!(dag.evaluate(other, &points(vec![5.0])).is_err());
    }

    #[test]
    fn test_reductions() {
        let mut dag = Dag::new(2);
        let x = leaf(&mut dag, "x");
        let total = dag.add(NodeKind::Sum, "sum(x)", vec![x]);
        let running = dag.add(NodeKind::CumSum, "cumsum(x)", vec![x]);
        let biggest = dag.add(NodeKind::Max, "max(x)", vec![x]);
        let domain = points(vec![1.0, 5.0, 2.0]);

        assert_eq!(dag.evaluate(total, &domain).unwrap(), vec![8.0; 3]);
        assert_eq!(dag.evaluate(running, &domain).unwrap(), vec![1.0, 6.0, 8.0]);
        assert_eq!(dag.evaluate(biggest, &domain).unwrap(), vec![5.0; 3]);
    }

    #[test]
    fn test_elementwise_min_propagates_nan() {
        let mut dag = Dag::new(2);
        let x = leaf(&mut dag, "x");
        let one = dag.add(NodeKind::Constant(1.0), "1", vec![]);
        let smaller = dag.add(NodeKind::Min, "min(x,1)", vec![x, one]);
        let values = dag
            .evaluate(smaller, &points(vec![0.0, f64::NAN, 3.0]))
            .unwrap();
        assert_eq!(values[0], 0.0);
        assert!(values[1].is_nan());
        assert_eq!(values[2], 1.0);
    }

    #[test]
    fn test_cumsum_rejects_multi_variable_domain() {
        let mut dag = Dag::new(2);
        let x = leaf(&mut dag, "x");
        let running = dag.add(NodeKind::CumSum, "cumsum(x)", vec![x]);
        let domain = points(vec![1.0, 2.0])
            .set_variable("y", vec![3.0, 4.0])
            .unwrap();
        assert!(matches!(
            dag.evaluate(running, &domain),
            Err(LatticeError::Evaluation { .. })
        ));
    }

    #[test]
    fn test_structural_misuse() {
        let mut dag = Dag::new(2);
        let x = leaf(&mut dag, "x");
        let modulo = dag.add(NodeKind::Mod, "mod(x)", vec![x]);
        let random = dag.add(NodeKind::Random, "rand(x,x)", vec![x, x]);
        let empty = dag.add(NodeKind::Max, "max()", vec![]);
        let domain = points(vec![1.0]);
        assert!(dag.evaluate(modulo, &domain).is_err());
        assert!(dag.evaluate(random, &domain).is_err());
        assert!(dag.evaluate(empty, &domain).is_err());
    }

    #[test]
    fn test_seeded_random_is_repeatable() {
        let mut dag = Dag::new(2);
        let seed = dag.add(NodeKind::Constant(7.0), "7", vec![]);
        let random = dag.add(NodeKind::Random, "rand(7)", vec![seed]);
        let first = dag.evaluate(random, &points(vec![0.0; 4])).unwrap();
        let second = dag.evaluate(random, &points(vec![0.0; 4])).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
        assert!(first.iter().all(|v| (0.0..1.0).contains(v)));
    }

    #[test]
    fn test_transformation_binds_in_caller_frame() {
        let mut dag = Dag::new(2);
        let x = leaf(&mut dag, "x");
        let body = dag.add(NodeKind::Times, "x*x", vec![x, x]);
        let one = dag.add(NodeKind::Constant(1.0), "1", vec![]);
        let shifted = dag.add(NodeKind::Plus, "x+1", vec![x, one]);
        let call = dag.add(
            NodeKind::DomainTransformation {
                symbol: "f".to_string(),
                parameters: vec!["x".to_string()],
            },
            "f(x+1)",
            vec![body, shifted],
        );
        assert_eq!(
            dag.evaluate(call, &points(vec![1.0, 2.0])).unwrap(),
            vec![4.0, 9.0]
        );
        assert_eq!(dag.transformation(call, "x"), Some(shifted));
    }
}
