use crate::config::{Blocks, DomainMode, EngineConfig, EvaluationOptions};
use crate::domain::Domain;
use crate::interpolation::{Interpolator, SplineInterpolator};
use crate::lexer;
use crate::nodes::{Dag, NodeId};
use crate::parser::literals::parse_domain_literal;
use crate::parser::ExpressionParser;
use crate::registry::{EquationRegistry, Metadata};
use crate::{LatticeError, LatticeResult};
use std::cell::{Ref, RefCell, RefMut};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Variable bound when no output reads the domain, so constants still
/// evaluate over exactly one point.
const UNIT_VARIABLE: &str = "__unit__";

/// The Lattice evaluation engine.
///
/// Holds the user definitions and the DAG parsed from them. Outputs parsed by
/// earlier calls stay in the DAG, so repeated evaluations reuse their nodes.
#[derive(Debug)]
pub struct Engine {
    parser: RefCell<ExpressionParser>,
    config: EngineConfig,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EquationRegistry::new())
    }
}

impl Engine {
    pub fn new(registry: EquationRegistry) -> Self {
        Self::with_config(registry, EngineConfig::default())
    }

    /// Create an engine with a custom configuration
    pub fn with_config(registry: EquationRegistry, config: EngineConfig) -> Self {
        Self::with_interpolator(registry, config, Box::new(SplineInterpolator))
    }

    /// Create an engine whose sampled functions use `interpolator`
    pub fn with_interpolator(
        registry: EquationRegistry,
        config: EngineConfig,
        interpolator: Box<dyn Interpolator>,
    ) -> Self {
        let parser = ExpressionParser::new(registry, &config, interpolator);
        Self {
            parser: RefCell::new(parser),
            config,
        }
    }

    /// Build an engine from `(signature, definition)` pairs such as
    /// `("f(x,y)", "x + y")`.
    pub fn from_definitions<I, S, D>(definitions: I) -> LatticeResult<Self>
    where
        I: IntoIterator<Item = (S, D)>,
        S: AsRef<str>,
        D: AsRef<str>,
    {
        Self::from_definitions_with_metadata(definitions, HashMap::new())
    }

    /// Like [`Engine::from_definitions`], with metadata per symbol name
    pub fn from_definitions_with_metadata<I, S, D>(
        definitions: I,
        mut metadata: HashMap<String, Metadata>,
    ) -> LatticeResult<Self>
    where
        I: IntoIterator<Item = (S, D)>,
        S: AsRef<str>,
        D: AsRef<str>,
    {
        let mut registry = EquationRegistry::new();
        for (signature, definition) in definitions {
            let signature = signature.as_ref();
            let symbol = lexer::function_name(signature).unwrap_or(signature);
            let symbol_metadata = metadata.remove(symbol).unwrap_or_default();
            registry.add_with_metadata(signature, definition.as_ref(), symbol_metadata)?;
        }
        Ok(Self::new(registry))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The registered definitions
    ///
    /// The guard shares the engine's parser. While it is alive, calls that
    /// parse (`evaluate`, `parse_output`, `validate`) return
    /// [`LatticeError::Busy`].
    pub fn registry(&self) -> Ref<'_, EquationRegistry> {
        Ref::map(self.parser.borrow(), |parser| parser.registry())
    }

    /// The evaluation DAG built so far
    ///
    /// Drop the guard before parsing or evaluating again; until then those
    /// calls return [`LatticeError::Busy`].
    pub fn dag(&self) -> Ref<'_, Dag> {
        Ref::map(self.parser.borrow(), |parser| parser.dag())
    }

    fn parser_mut(&self) -> LatticeResult<RefMut<'_, ExpressionParser>> {
        self.parser.try_borrow_mut().map_err(|_| {
            LatticeError::Busy(
                "a registry or DAG guard is still held; drop it before parsing".to_string(),
            )
        })
    }

    /// Parse an output expression (wrapped) without evaluating it
    pub fn parse_output(&self, text: &str) -> LatticeResult<NodeId> {
        self.parser_mut()?.parse_output(text)
    }

    /// Parse every registered definition, reporting the first definition error
    pub fn validate(&self) -> LatticeResult<()> {
        self.parser_mut()?.parse_all_symbols()
    }

    /// Evaluate a standalone expression with no user definitions and no domain
    pub fn evaluate_expression(text: &str) -> LatticeResult<f64> {
        Engine::default().evaluate_scalar(text)
    }

    /// Evaluate an expression that reads no domain variable, using the
    /// registered definitions
    pub fn evaluate_scalar(&self, text: &str) -> LatticeResult<f64> {
        let no_domain: [(&str, &str); 0] = [];
        let results = self.evaluate(no_domain, [text], EvaluationOptions::default())?;
        results
            .first()
            .and_then(|column| column.first())
            .copied()
            .ok_or_else(|| LatticeError::evaluation(text, "expression produced no value"))
    }

    /// Evaluate `outputs` over the domain declared by `domain_definitions`
    ///
    /// Domain definitions are `(name, literal)` pairs in declaration order,
    /// e.g. `("x", "[0:0.1:1]")`. The result holds one array per output, in
    /// request order, each with one value per domain point.
    pub fn evaluate<I, N, L, O, T>(
        &self,
        domain_definitions: I,
        outputs: O,
        options: EvaluationOptions,
    ) -> LatticeResult<Vec<Vec<f64>>>
    where
        I: IntoIterator<Item = (N, L)>,
        N: AsRef<str>,
        L: AsRef<str>,
        O: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let wrappers = {
            let mut parser = self.parser_mut()?;
            outputs
                .into_iter()
                .map(|output| parser.parse_output(output.as_ref()))
                .collect::<LatticeResult<Vec<NodeId>>>()?
        };
        if wrappers.is_empty() {
            return Err(LatticeError::Domain(
                "No output columns are specified".to_string(),
            ));
        }

        let declarations = read_declarations(domain_definitions)?;
        let parser = self.parser.borrow();
        let dag = parser.dag();

        let referenced: BTreeSet<String> = wrappers
            .iter()
            .flat_map(|wrapper| dag.free_variables(*wrapper))
            .collect();
        if let Some(missing) = referenced
            .iter()
            .find(|name| !declarations.iter().any(|(declared, _)| declared == *name))
        {
            return Err(LatticeError::Domain(format!(
                "{} is not defined in the domain",
                missing
            )));
        }

        let splittable = wrappers.iter().all(|wrapper| dag.is_splittable(*wrapper));
        let bound_order: Vec<&String> = declarations
            .iter()
            .map(|(name, _)| name)
            .filter(|name| referenced.contains(*name))
            .collect();

        let base = Domain::from_declarations(declarations.iter().cloned());
        if options.mode == DomainMode::Explicit && !referenced.is_empty() && !base.is_same_length_defs()
        {
            return Err(LatticeError::Domain(
                "Explicit points need every domain variable declared with the same length"
                    .to_string(),
            ));
        }

        let mut domain = base;
        for name in &bound_order {
            domain = match options.mode {
                DomainMode::Combine => domain.recombine_variable(name)?,
                DomainMode::Explicit => domain.set_variable(name, domain.declaration(name)?)?,
            };
        }

        let mut block_count = match options.blocks {
            Blocks::Auto => (domain.len() / self.config.auto_block_size.max(1)).max(1),
            Blocks::Fixed(count) => count,
        };
        if bound_order.is_empty() {
            domain = domain.set_variable(UNIT_VARIABLE, vec![0.0])?;
            block_count = 1;
        }
        if !splittable {
            block_count = 1;
        }

        debug!(
            outputs = wrappers.len(),
            variables = ?bound_order,
            points = domain.len(),
            splittable,
            requested_blocks = block_count,
            "evaluating"
        );

        let blocks = domain.split(block_count)?;
        debug!(blocks = blocks.len(), "domain split");
        let mut results: Vec<Vec<f64>> = vec![vec![0.0; domain.len()]; wrappers.len()];
        let mut offset = 0;
        for (index, block) in blocks.iter().enumerate() {
            let filled = evaluate_block(dag, &wrappers, block, offset, &mut results);
            for wrapper in &wrappers {
                dag.clear_cache(*wrapper);
            }
            filled?;
            debug!(block = index, points = block.len(), "block evaluated");
            offset += block.len();
        }

        Ok(results)
    }
}

fn evaluate_block(
    dag: &Dag,
    wrappers: &[NodeId],
    block: &Domain,
    offset: usize,
    results: &mut [Vec<f64>],
) -> LatticeResult<()> {
    for (wrapper, column) in wrappers.iter().zip(results.iter_mut()) {
        let values = dag.evaluate(*wrapper, block)?;
        column[offset..offset + values.len()].copy_from_slice(&values);
    }
    Ok(())
}

fn read_declarations<I, N, L>(definitions: I) -> LatticeResult<Vec<(String, Vec<f64>)>>
where
    I: IntoIterator<Item = (N, L)>,
    N: AsRef<str>,
    L: AsRef<str>,
{
    let mut declarations: Vec<(String, Vec<f64>)> = Vec::new();
    for (name, literal) in definitions {
        let name = name.as_ref().trim();
        if !lexer::is_identifier(name) {
            return Err(LatticeError::Domain(format!(
                "'{}' is not a valid domain variable name",
                name
            )));
        }
        if declarations.iter().any(|(declared, _)| declared == name) {
            return Err(LatticeError::Domain(format!(
                "{} is declared more than once",
                name
            )));
        }
        let values = parse_domain_literal(literal.as_ref())?;
        if values.is_empty() {
            return Err(LatticeError::Domain(format!("{} has no values", name)));
        }
        declarations.push((name.to_string(), values));
    }
    Ok(declarations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculator_entry_points() {
        assert_eq!(Engine::evaluate_expression("1 + 2 * 3").unwrap(), 7.0);

        let engine = Engine::from_definitions([("double(x)", "2*x")]).unwrap();
        assert_eq!(engine.evaluate_scalar("double(4)").unwrap(), 8.0);
    }

    #[test]
    fn test_no_outputs_is_an_error() {
        let engine = Engine::default();
        let outputs: [&str; 0] = [];
        assert!(matches!(
            engine.evaluate([("x", "[1 2]")], outputs, EvaluationOptions::default()),
            Err(LatticeError::Domain(_))
        ));
    }

    #[test]
    fn test_metadata_is_matched_by_symbol_name() {
        let mut metadata = HashMap::new();
        let mut linear = Metadata::new();
        linear.insert("interpolation".to_string(), "Linear".to_string());
        metadata.insert("g".to_string(), linear);

        let engine =
            Engine::from_definitions_with_metadata([("g(t)", "[0,0;2,4;4,0]")], metadata).unwrap();
        let results = engine
            .evaluate([("t", "[1 3]")], ["g(t)"], EvaluationOptions::default())
            .unwrap();
        assert_eq!(results[0], vec![2.0, 2.0]);
    }

    #[test]
    fn test_held_dag_guard_is_an_error_not_a_panic() {
        let engine = Engine::from_definitions([("f(x)", "x + 1")]).unwrap();
        let dag = engine.dag();
        assert!(matches!(
            engine.evaluate([("x", "[1 2]")], ["f(x)"], EvaluationOptions::default()),
            Err(LatticeError::Busy(_))
        ));
        assert!(matches!(engine.validate(), Err(LatticeError::Busy(_))));
        drop(dag);

        let results = engine
            .evaluate([("x", "[1 2]")], ["f(x)"], EvaluationOptions::default())
            .unwrap();
        assert_eq!(results[0], vec![2.0, 3.0]);
    }

    #[test]
    fn test_duplicate_declaration_rejected() {
        let engine = Engine::default();
        assert!(engine
            .evaluate([("x", "[1]"), ("x", "[2]")], ["x"], EvaluationOptions::default())
            .is_err());
    }
}
