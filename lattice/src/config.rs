use crate::{LatticeError, LatticeResult};
use serde::{Deserialize, Serialize};

/// Engine configuration, threaded explicitly from the `Engine` into the
/// parser and the evaluation DAG it builds.
///
/// The defaults are what every engine uses unless told otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum number of parent edges a node needs before it caches its
    /// per-domain result. Raising it trades CPU for memory.
    pub cache_threshold: usize,

    /// Target points per block when the caller asks for automatic splitting
    pub auto_block_size: usize,

    /// Maximum parser recursion depth
    /// Real usage: ~10 levels, Limit: 256
    pub max_expression_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_threshold: 2,
            auto_block_size: 1000,
            max_expression_depth: 256,
        }
    }
}

impl EngineConfig {
    /// Create a new EngineConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a configuration from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> LatticeResult<Self> {
        let config: EngineConfig = serde_json::from_str(json)
            .map_err(|e| LatticeError::Definition(format!("Invalid engine configuration: {}", e)))?;
        if config.auto_block_size == 0 {
            return Err(LatticeError::Definition(
                "auto_block_size must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }
}

/// How many blocks the orchestrator splits the domain into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Blocks {
    /// `max(1, length / auto_block_size)` blocks
    Auto,
    /// Blocks of `ceil(points / n)` points, so at most `n` of them (forced to 1
    /// when an output needs the whole domain)
    Fixed(usize),
}

impl From<i64> for Blocks {
    /// Non-positive counts mean "choose automatically".
    fn from(count: i64) -> Self {
        if count <= 0 {
            Blocks::Auto
        } else {
            Blocks::Fixed(count as usize)
        }
    }
}

impl From<i32> for Blocks {
    fn from(count: i32) -> Self {
        Blocks::from(i64::from(count))
    }
}

impl From<usize> for Blocks {
    fn from(count: usize) -> Self {
        if count == 0 {
            Blocks::Auto
        } else {
            Blocks::Fixed(count)
        }
    }
}

/// How declared domain variables are turned into evaluation points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainMode {
    /// Cartesian recombination of every referenced variable
    Combine,
    /// Declarations are pre-aligned points; all must share one length
    Explicit,
}

/// Per-call evaluation choices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationOptions {
    pub blocks: Blocks,
    pub mode: DomainMode,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            blocks: Blocks::Fixed(1),
            mode: DomainMode::Combine,
        }
    }
}

impl EvaluationOptions {
    pub fn new(blocks: impl Into<Blocks>, mode: DomainMode) -> Self {
        Self {
            blocks: blocks.into(),
            mode,
        }
    }
}
