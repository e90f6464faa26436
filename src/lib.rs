//! Talk Bridge – cached service primitives for an S-expression scripting layer
//!
//! Scripts evaluated by the page engine (once per rendered frame) query live
//! asset data through builtins such as `dt:identity` and `ps:results`. This
//! crate provides:
//! - A uniform [`Expression`] value with a single codec for native payloads
//! - A namespaced, single-flight call cache so repeated frames never re-issue
//!   requests for inputs already answered
//! - Builtin registration and a minimal evaluation environment
//! - Typed service capabilities plus a JSON fixture backend

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Bridge functions, call cache and value codec.
pub mod bridge;
/// Bridge configuration loading and persistence.
pub mod config;
/// Expression model, reader and evaluation environment.
pub mod interpreter;
/// Service capabilities and domain result types.
pub mod service;

// Re-export key types for convenience
pub use bridge::{BridgeError, CachePolicy, CallCache};
pub use config::BridgeConfig;
pub use interpreter::{Env, EvalError, Expression, Primitive};
pub use service::{CallContext, IdentityService, ProcessService, ServiceError, Services};

/// Current version of the bridge crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
