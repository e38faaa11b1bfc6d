use crate::lexer;
use crate::nodes::kind::is_builtin_name;
use crate::{LatticeError, LatticeResult};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::warn;

/// Metadata attached to a symbol: string keys to string values
pub type Metadata = BTreeMap<String, String>;

pub const INDEPENDENT_VARIABLE: &str = "independent_variable";
pub const INDEPENDENT_VARIABLE_1: &str = "independent_variable_1";
pub const INDEPENDENT_VARIABLE_2: &str = "independent_variable_2";
pub const INTERPOLATION: &str = "interpolation";

/// A registered symbol: its formal parameters, definition text and metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    pub parameters: Vec<String>,
    pub definition: String,
    pub metadata: Metadata,
}

/// Symbol table of user definitions
///
/// Symbol names are unique. A formal parameter name never equals any
/// registered symbol name, whichever of the two was registered first.
#[derive(Debug, Clone, Default)]
pub struct EquationRegistry {
    order: Vec<String>,
    equations: HashMap<String, Equation>,
}

impl EquationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `signature` (`f(x,y)` or a bare `a`) with its definition text.
    pub fn add(&mut self, signature: &str, definition: &str) -> LatticeResult<()> {
        self.add_with_metadata(signature, definition, Metadata::new())
    }

    pub fn add_with_metadata(
        &mut self,
        signature: &str,
        definition: &str,
        mut metadata: Metadata,
    ) -> LatticeResult<()> {
        let signature = signature.trim();
        let symbol = lexer::function_name(signature)
            .filter(|_| lexer::is_identifier(signature) || lexer::is_function_call(signature))
            .ok_or_else(|| {
                LatticeError::Definition(format!("Invalid symbol signature '{}'", signature))
            })?
            .to_string();
        let parameters = lexer::function_args(signature);

        for parameter in &parameters {
            if !lexer::is_identifier(parameter) {
                return Err(LatticeError::Definition(format!(
                    "Invalid parameter '{}' in signature '{}'",
                    parameter, signature
                )));
            }
        }
        let unique: BTreeSet<&String> = parameters.iter().collect();
        if unique.len() != parameters.len() {
            return Err(LatticeError::Definition(format!(
                "Signature '{}' repeats a parameter name",
                signature
            )));
        }

        self.validate_names(&symbol, &parameters)?;

        if is_builtin_name(&symbol) {
            warn!(symbol = %symbol, "user definition overrides a built-in function");
        }

        if lexer::is_matrix(definition) {
            apply_numeric_defaults(&parameters, &mut metadata);
        }

        self.order.push(symbol.clone());
        self.equations.insert(
            symbol,
            Equation {
                parameters,
                definition: definition.trim().to_string(),
                metadata,
            },
        );
        Ok(())
    }

    fn validate_names(&self, symbol: &str, parameters: &[String]) -> LatticeResult<()> {
        if self.equations.contains_key(symbol) {
            return Err(LatticeError::Definition(format!(
                "Symbol {} is already defined",
                symbol
            )));
        }

        if parameters.iter().any(|parameter| parameter == symbol) {
            return Err(LatticeError::Definition(format!(
                "Symbol {} uses its own name as a parameter",
                symbol
            )));
        }

        if let Some(parameter) = parameters.iter().find(|p| self.equations.contains_key(*p)) {
            return Err(LatticeError::Definition(format!(
                "Parameter {} of {} collides with the defined symbol {}",
                parameter, symbol, parameter
            )));
        }

        if let Some(owner) = self
            .order
            .iter()
            .find(|other| self.equations[*other].parameters.iter().any(|p| p == symbol))
        {
            return Err(LatticeError::Definition(format!(
                "Symbol {} collides with a parameter of {}",
                symbol, owner
            )));
        }

        Ok(())
    }

    pub fn is_defined(&self, symbol: &str) -> bool {
        self.equations.contains_key(symbol)
    }

    /// Symbols in registration order
    pub fn symbols(&self) -> &[String] {
        &self.order
    }

    pub fn get(&self, symbol: &str) -> Option<&Equation> {
        self.equations.get(symbol)
    }

    pub fn parameters(&self, symbol: &str) -> Option<&[String]> {
        self.equations.get(symbol).map(|eq| eq.parameters.as_slice())
    }

    pub fn definition(&self, symbol: &str) -> Option<&str> {
        self.equations.get(symbol).map(|eq| eq.definition.as_str())
    }

    pub fn metadata(&self, symbol: &str) -> Option<&Metadata> {
        self.equations.get(symbol).map(|eq| &eq.metadata)
    }

    pub fn metadata_value(&self, symbol: &str, key: &str) -> Option<&str> {
        self.metadata(symbol)
            .and_then(|metadata| metadata.get(key))
            .map(String::as_str)
    }

    /// `f(x,y)` for a parameterized symbol, `a` for a plain one
    pub fn signature(&self, symbol: &str) -> Option<String> {
        let equation = self.equations.get(symbol)?;
        if equation.parameters.is_empty() {
            Some(symbol.to_string())
        } else {
            Some(format!("{}({})", symbol, equation.parameters.join(",")))
        }
    }

    /// Sorted union of every formal parameter name
    pub fn all_domain_variables(&self) -> Vec<String> {
        let names: BTreeSet<&String> = self
            .equations
            .values()
            .flat_map(|eq| eq.parameters.iter())
            .collect();
        names.into_iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

fn apply_numeric_defaults(parameters: &[String], metadata: &mut Metadata) {
    match parameters {
        [x] => {
            metadata
                .entry(INDEPENDENT_VARIABLE.to_string())
                .or_insert_with(|| x.clone());
        }
        [x1, x2] => {
            metadata
                .entry(INDEPENDENT_VARIABLE_1.to_string())
                .or_insert_with(|| x1.clone());
            metadata
                .entry(INDEPENDENT_VARIABLE_2.to_string())
                .or_insert_with(|| x2.clone());
        }
        _ => {}
    }
}
