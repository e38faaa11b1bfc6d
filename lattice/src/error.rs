use thiserror::Error;

/// Error types for the Lattice engine
///
/// Every failure propagates straight to the caller. Evaluation has no
/// partial-result mode: either every requested column is produced or one of
/// these is returned before any output exists.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LatticeError {
    /// Malformed text: unmatched parentheses, unparseable tokens, dangling operators
    #[error("Syntax error: {message} (in '{input}')")]
    Syntax { message: String, input: String },

    /// Symbol/parameter collisions, arity mismatches, free-variable mismatches
    #[error("Definition error: {0}")]
    Definition(String),

    /// Undeclared domain variables, mismatched explicit-point lengths, bad splits
    #[error("Domain error: {0}")]
    Domain(String),

    /// Structural misuse of a node discovered while evaluating it
    #[error("Evaluation error in '{node}': {message}")]
    Evaluation { node: String, message: String },

    /// The interpolation service could not fit the supplied samples
    #[error("Interpolation error: {0}")]
    Interpolation(String),

    /// The engine's parser is borrowed by a guard the caller still holds
    #[error("Engine busy: {0}")]
    Busy(String),

    /// A configured resource limit was exceeded
    #[error("Resource limit exceeded: {limit_name} (limit: {limit_value}, actual: {actual_value}). {suggestion}")]
    ResourceLimitExceeded {
        limit_name: String,
        limit_value: String,
        actual_value: String,
        suggestion: String,
    },
}

impl LatticeError {
    /// Create a syntax error for the given input text
    pub fn syntax(message: impl Into<String>, input: impl Into<String>) -> Self {
        Self::Syntax {
            message: message.into(),
            input: input.into(),
        }
    }

    /// Create an evaluation error attributed to a node label
    pub fn evaluation(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Evaluation {
            node: node.into(),
            message: message.into(),
        }
    }
}
