//! Text to evaluation DAG
//!
//! Every `(text, metadata)` pair is parsed once. Later references to the same
//! pair return the same [`NodeId`], which is what gives shared
//! sub-expressions several parents and lets their results be cached.

use crate::config::EngineConfig;
use crate::interpolation::{InterpolationKind, Interpolator};
use crate::lexer;
use crate::nodes::{Dag, NodeId, NodeKind};
use crate::registry::{
    EquationRegistry, Metadata, INDEPENDENT_VARIABLE, INDEPENDENT_VARIABLE_1,
    INDEPENDENT_VARIABLE_2, INTERPOLATION,
};
use crate::{LatticeError, LatticeResult};
use std::collections::HashMap;

pub mod expressions;
pub mod literals;
pub mod symbols;

#[derive(Debug)]
pub struct ExpressionParser {
    registry: EquationRegistry,
    dag: Dag,
    parsed: HashMap<(String, Metadata), NodeId>,
    outputs: HashMap<String, NodeId>,
    interpolator: Box<dyn Interpolator>,
    max_depth: usize,
    depth: usize,
}

impl ExpressionParser {
    pub fn new(
        registry: EquationRegistry,
        config: &EngineConfig,
        interpolator: Box<dyn Interpolator>,
    ) -> Self {
        Self {
            registry,
            dag: Dag::new(config.cache_threshold),
            parsed: HashMap::new(),
            outputs: HashMap::new(),
            interpolator,
            max_depth: config.max_expression_depth,
            depth: 0,
        }
    }

    pub fn registry(&self) -> &EquationRegistry {
        &self.registry
    }

    pub fn dag(&self) -> &Dag {
        &self.dag
    }

    /// Parse every registered symbol as a full call, so that arity and
    /// free-variable problems surface before anything is evaluated.
    pub fn parse_all_symbols(&mut self) -> LatticeResult<()> {
        let signatures: Vec<String> = self
            .registry
            .symbols()
            .iter()
            .filter_map(|symbol| self.registry.signature(symbol))
            .collect();
        for signature in signatures {
            self.parse(&signature, &Metadata::new())?;
        }
        Ok(())
    }

    /// Parse a requested output and put a wrapper above it, so the output
    /// expression gains one more parent edge.
    pub fn parse_output(&mut self, text: &str) -> LatticeResult<NodeId> {
        let key = text.trim().to_string();
        if let Some(wrapper) = self.outputs.get(&key) {
            return Ok(*wrapper);
        }
        let root = self.parse(&key, &Metadata::new())?;
        let wrapper = self.dag.add(NodeKind::Wrapper, key.clone(), vec![root]);
        self.outputs.insert(key, wrapper);
        Ok(wrapper)
    }

    /// Parse `text` under `metadata`, reusing the node from any earlier parse
    /// of the same pair.
    pub fn parse(&mut self, text: &str, metadata: &Metadata) -> LatticeResult<NodeId> {
        self.depth += 1;
        if self.depth > self.max_depth {
            self.depth -= 1;
            return Err(LatticeError::ResourceLimitExceeded {
                limit_name: "max_expression_depth".to_string(),
                limit_value: self.max_depth.to_string(),
                actual_value: (self.max_depth + 1).to_string(),
                suggestion: "Simplify the expression or check for recursive definitions"
                    .to_string(),
            });
        }
        let result = self.parse_memoized(text, metadata);
        self.depth -= 1;
        result
    }

    /// Parse one side of an operator split. Operands sit at the same nesting
    /// level as the expression they came from, so a long flat chain such as
    /// `1+1+...+1` does not count against the depth limit.
    fn parse_operand(&mut self, text: &str, metadata: &Metadata) -> LatticeResult<NodeId> {
        self.parse_memoized(text, metadata)
    }

    fn parse_memoized(&mut self, text: &str, metadata: &Metadata) -> LatticeResult<NodeId> {
        let text = text.trim();
        if text.is_empty() {
            return Err(LatticeError::syntax("empty expression", text));
        }

        let is_call = lexer::is_function_call(text);
        let key_text = if is_call {
            text.chars().filter(|c| !c.is_whitespace()).collect()
        } else {
            text.to_string()
        };

        if is_call {
            let name = lexer::function_name(text).unwrap_or_default();
            if !self.registry.is_defined(name) && NodeKind::builtin(name).is_none() {
                return Err(LatticeError::Definition(format!(
                    "Function is not defined: {}",
                    name
                )));
            }
        }

        let key = (key_text, metadata.clone());
        if let Some(id) = self.parsed.get(&key) {
            return Ok(*id);
        }

        let id = self.dispatch(text, metadata)?;
        self.parsed.insert(key, id);
        Ok(id)
    }

    fn dispatch(&mut self, text: &str, metadata: &Metadata) -> LatticeResult<NodeId> {
        let named = lexer::is_function_call(text) || lexer::is_identifier(text);
        let name = lexer::function_name(text).unwrap_or_default().to_string();

        if named && self.registry.is_defined(&name) {
            return self.parse_user_symbol(text, &name, metadata);
        }
        if named && NodeKind::builtin(&name).is_some() {
            return self.parse_builtin(text, &name, metadata);
        }
        if lexer::is_identifier(text) {
            return Ok(self
                .dag
                .add(NodeKind::Variable(text.to_string()), text, vec![]));
        }
        if lexer::is_paren_group(text) {
            return self.parse(&text[1..text.len() - 1], metadata);
        }
        if lexer::is_matrix(text) {
            return self.parse_numeric_function(text, metadata);
        }
        if lexer::is_piecewise(text) {
            return self.parse_piecewise(text, metadata);
        }
        if lexer::is_number(text) {
            let value = text
                .parse::<f64>()
                .map_err(|_| LatticeError::syntax("invalid number", text))?;
            return Ok(self.dag.add(NodeKind::Constant(value), text, vec![]));
        }
        self.parse_split(text, metadata)
    }

    /// A `[..]` table: two columns sample a curve, wider tables sample a
    /// surface whose first row and first column hold the grid coordinates.
    fn parse_numeric_function(&mut self, text: &str, metadata: &Metadata) -> LatticeResult<NodeId> {
        let rows = literals::parse_table(text)?;
        let width = rows.first().map_or(0, Vec::len);
        if rows.len() <= 1 || width <= 1 {
            return Err(LatticeError::Definition(format!(
                "Not enough data is defined in {}",
                text
            )));
        }

        let kind = InterpolationKind::from_metadata(metadata.get(INTERPOLATION).map(String::as_str));
        let variable = |key: &str| {
            metadata.get(key).cloned().ok_or_else(|| {
                LatticeError::Definition(format!(
                    "Sampled function {} has no '{}' metadata",
                    text, key
                ))
            })
        };

        let node_kind = if width == 2 {
            let x: Vec<f64> = rows.iter().map(|row| row[0]).collect();
            let y: Vec<f64> = rows.iter().map(|row| row[1]).collect();
            NodeKind::NumericFunction1D {
                variable: variable(INDEPENDENT_VARIABLE)?,
                curve: self.interpolator.fit_curve(&x, &y, kind)?,
            }
        } else {
            let x1: Vec<f64> = rows[1..].iter().map(|row| row[0]).collect();
            let x2: Vec<f64> = rows[0][1..].to_vec();
            let z: Vec<Vec<f64>> = rows[1..].iter().map(|row| row[1..].to_vec()).collect();
            NodeKind::NumericFunction2D {
                variables: (
                    variable(INDEPENDENT_VARIABLE_1)?,
                    variable(INDEPENDENT_VARIABLE_2)?,
                ),
                surface: self.interpolator.fit_surface(&x1, &x2, &z, kind)?,
            }
        };
        Ok(self.dag.add(node_kind, text, vec![]))
    }
}
