use super::{Dag, Node};
use crate::domain::Domain;
use crate::LatticeResult;
use tracing::warn;

impl Dag {
    /// Children are read as `(condition, result)` pairs with an optional
    /// trailing else. A point claimed by two conditions is over-defined and
    /// stays NaN; a point claimed by none takes the else value, or NaN.
    pub(super) fn piecewise(&self, node: &Node, domain: &Domain) -> LatticeResult<Vec<f64>> {
        let len = domain.len();
        let pairs: Vec<_> = node.children.chunks_exact(2).collect();
        let otherwise = node.children.chunks_exact(2).remainder().first().copied();

        let conditions = pairs
            .iter()
            .map(|pair| self.evaluate(pair[0], domain))
            .collect::<LatticeResult<Vec<_>>>()?;

        let mut output = vec![f64::NAN; len];
        let mut claimed = vec![false; len];
        let mut over_defined = vec![false; len];

        for (pair, condition) in pairs.iter().zip(&conditions) {
            if !condition.iter().any(|&c| c == 1.0) {
                continue;
            }
            let result = self.evaluate(pair[1], domain)?;
            for point in 0..len {
                if condition[point] != 1.0 {
                    continue;
                }
                if claimed[point] {
                    over_defined[point] = true;
                    output[point] = f64::NAN;
                } else {
                    claimed[point] = true;
                    output[point] = result[point];
                }
            }
        }

        let over_count = over_defined.iter().filter(|&&over| over).count();
        if over_count > 0 {
            warn!(
                node = %node.label,
                points = over_count,
                "piecewise function is over-defined; those points are NaN"
            );
        }

        let unclaimed = claimed.iter().filter(|&&c| !c).count();
        if unclaimed > 0 {
            match otherwise {
                Some(fallback) => {
                    let values = self.evaluate(fallback, domain)?;
                    for point in 0..len {
                        if !claimed[point] {
                            output[point] = values[point];
                        }
                    }
                }
                None => warn!(
                    node = %node.label,
                    points = unclaimed,
                    "piecewise function is under-defined; those points are NaN"
                ),
            }
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::Domain;
    use crate::nodes::{Dag, NodeId, NodeKind};

    fn constant(dag: &mut Dag, value: f64) -> NodeId {
        dag.add(NodeKind::Constant(value), value.to_string(), vec![])
    }

    /// `if x<0 then <neg> if x>=0 then <pos>`, optionally with an else
    fn sign_split(dag: &mut Dag, upper: f64, otherwise: Option<f64>) -> NodeId {
        let x = dag.add(NodeKind::Variable("x".to_string()), "x", vec![]);
        let zero = constant(dag, 0.0);
        let bound = constant(dag, upper);
        let negative = dag.add(NodeKind::Less, "x<0", vec![x, zero]);
        let minus_x = dag.add(NodeKind::Minus, "-x", vec![x]);
        let low = dag.add(NodeKind::GreaterEqual, "x>=0", vec![x, zero]);
        let high = dag.add(NodeKind::Less, "x<upper", vec![x, bound]);
        let in_range = dag.add(NodeKind::And, "x>=0 & x<upper", vec![low, high]);
        let mut children = vec![negative, minus_x, in_range, x];
        if let Some(value) = otherwise {
            children.push(constant(dag, value));
        }
        dag.add(NodeKind::Piecewise, "piecewise", children)
    }

    fn line(values: Vec<f64>) -> Domain {
        Domain::new().set_variable("x", values).unwrap()
    }

    #[test]
    fn test_absolute_value() {
        let mut dag = Dag::new(2);
        let abs = sign_split(&mut dag, f64::INFINITY, None);
        assert_eq!(
            dag.evaluate(abs, &line(vec![-1.0, 0.0, 1.0])).unwrap(),
            vec![1.0, 0.0, 1.0]
        );
    }

    #[test]
    fn test_under_defined_points() {
        let mut dag = Dag::new(2);
        let partial = sign_split(&mut dag, 1.0, None);
        let values = dag.evaluate(partial, &line(vec![-2.0, 0.5, 3.0])).unwrap();
        assert_eq!(&values[..2], &[2.0, 0.5]);
        assert!(values[2].is_nan());

        let mut dag = Dag::new(2);
        let with_else = sign_split(&mut dag, 1.0, Some(99.0));
        let values = dag.evaluate(with_else, &line(vec![-2.0, 0.5, 3.0])).unwrap();
        assert_eq!(values, vec![2.0, 0.5, 99.0]);
    }

    #[test]
    fn test_over_defined_points_stay_nan() {
        let mut dag = Dag::new(2);
        let x = dag.add(NodeKind::Variable("x".to_string()), "x", vec![]);
        let zero = constant(&mut dag, 0.0);
        let below = dag.add(NodeKind::Less, "x<0", vec![x, zero]);
        let at_most = dag.add(NodeKind::LessEqual, "x<=0", vec![x, zero]);
        let one = constant(&mut dag, 1.0);
        let two = constant(&mut dag, 2.0);
        let fallback = constant(&mut dag, 3.0);
        let piecewise = dag.add(
            NodeKind::Piecewise,
            "overlap",
            vec![below, one, at_most, two, below, one, fallback],
        );
        let values = dag.evaluate(piecewise, &line(vec![-1.0, 0.0, 1.0])).unwrap();
        assert!(values[0].is_nan());
        assert_eq!(values[1], 2.0);
        assert_eq!(values[2], 3.0);
    }
}
