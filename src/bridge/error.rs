//! Error types for bridge functions
//!
//! Shape and variant failures are detected locally; service failures are
//! carried through unchanged so scripts see the backend's own message.

use thiserror::Error;

use crate::service::ServiceError;

/// Errors returned by builtins and the call cache.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// An expression's payload does not have the shape a function requires.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Shape the caller asked for
        expected: &'static str,
        /// Shape actually carried
        found: &'static str,
    },

    /// A domain value is not the expected sub-kind.
    #[error("variant mismatch: expected {expected}, found {found}")]
    VariantMismatch {
        /// Variant the projection accepts
        expected: &'static str,
        /// Variant actually supplied
        found: &'static str,
    },

    /// The underlying service call failed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The cache was used with a namespace that was never declared.
    #[error("call namespace '{0}' was not declared")]
    UndeclaredNamespace(String),

    /// Wrong number of arguments.
    #[error("{name} expects {expected} argument(s), found {found}")]
    Arity {
        /// Builtin name
        name: &'static str,
        /// Required argument count
        expected: usize,
        /// Supplied argument count
        found: usize,
    },
}

impl BridgeError {
    /// Shorthand for [`BridgeError::VariantMismatch`].
    pub fn variant(expected: &'static str, found: &'static str) -> Self {
        BridgeError::VariantMismatch { expected, found }
    }
}

/// Convenience result alias for bridge operations
pub type BridgeResult<T> = std::result::Result<T, BridgeError>;
