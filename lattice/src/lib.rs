//! # Lattice Engine
//!
//! **Named formulas, evaluated over grids**
//!
//! Lattice lets a caller define named mathematical functions as text (analytic
//! infix expressions, piecewise conditionals, or sampled 1D/2D tables) and
//! evaluate output expressions over a multi-variable numeric domain. Every
//! requested output comes back as one array, aligned by request order and by
//! domain point.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lattice::{Engine, EvaluationOptions, LatticeResult};
//!
//! fn main() -> LatticeResult<()> {
//!     let engine = Engine::from_definitions([
//!         ("f(x)", "x^2"),
//!         ("g(x,y)", "f(x) + y"),
//!     ])?;
//!
//!     let results = engine.evaluate(
//!         [("x", "[1:3]"), ("y", "[10 20]")],
//!         ["g(x,y)"],
//!         EvaluationOptions::default(),
//!     )?;
//!
//!     assert_eq!(results[0], vec![11.0, 14.0, 19.0, 21.0, 24.0, 29.0]);
//!     Ok(())
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Domains
//! A [`Domain`] holds raw variable declarations and the bound arrays the
//! evaluation actually runs over. Binding a second variable takes the
//! Cartesian product with the first. Domains are immutable: every transform
//! returns a new one with a fresh identity.
//!
//! ### The evaluation DAG
//! Definitions are parsed into a [`Dag`] of nodes. Identical text parsed with
//! identical metadata always yields the same node, so shared sub-expressions
//! are computed once per domain and cached.
//!
//! ### Blocks
//! Large domains are split into blocks evaluated one after another. Outputs
//! that need the whole domain at once (`sum`, `cumsum`, single-argument
//! `min`/`max`) force a single block.

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod interpolation;
pub mod lexer;
pub mod nodes;
pub mod parser;
pub mod registry;

pub use config::{Blocks, DomainMode, EngineConfig, EvaluationOptions};
pub use domain::{Domain, DomainId};
pub use engine::Engine;
pub use error::LatticeError;
pub use interpolation::{Curve, InterpolationKind, Interpolator, SplineInterpolator, Surface};
pub use nodes::{Dag, Node, NodeId, NodeKind};
pub use parser::ExpressionParser;
pub use registry::EquationRegistry;

/// Result type for Lattice operations
pub type LatticeResult<T> = Result<T, LatticeError>;
