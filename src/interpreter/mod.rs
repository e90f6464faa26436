//! Minimal script layer for page programs.
//!
//! Page scripts are S-expressions evaluated once per frame by the page engine.
//! This module provides the uniform [`Expression`] value, a reader, and an
//! environment that resolves builtins and applies them to evaluated
//! arguments. Richer language semantics live in the embedding engine.

/// Evaluation environment and builtin registry.
pub mod env;
/// Uniform expression representation.
pub mod expression;
/// Per-frame script driver.
pub mod frame;
/// Reader for script source text.
pub mod parser;

pub use env::{Builtin, Env};
pub use expression::{Expression, Primitive};
pub use frame::{FrameLoop, FrameReport};
pub use parser::{parse_expression, parse_script};

use crate::bridge::BridgeError;
use thiserror::Error;

/// Convenience result alias for interpreter operations.
pub type Result<T> = std::result::Result<T, EvalError>;

/// Errors surfaced while reading or evaluating scripts.
#[derive(Debug, Error)]
pub enum EvalError {
    /// Parsing failed due to invalid syntax.
    #[error("invalid script syntax: {0}")]
    Syntax(String),

    /// A symbol had no binding.
    #[error("unbound symbol '{0}'")]
    UnboundSymbol(String),

    /// The head of an application is not a known builtin.
    #[error("'{0}' is not callable")]
    NotCallable(String),

    /// A special form was used with the wrong shape.
    #[error("malformed form: {0}")]
    Malformed(String),

    /// A builtin reported a failure.
    #[error("builtin '{name}' failed: {source}")]
    Builtin {
        /// Name the builtin was invoked under
        name: String,
        /// Underlying bridge error
        #[source]
        source: BridgeError,
    },
}
