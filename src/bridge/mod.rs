//! Bridge between scripts and the asset services
//!
//! [`load`] is the one-shot setup step: it declares the cache namespaces,
//! builds the shared [`CallCache`], and installs every builtin into an
//! [`Env`]. After that, scripts can call:
//!
//! - `dt:identity`, `ps:results` – memoized service calls
//! - `identity->cell`, `identity->module`, `identity->pack` – variant checks
//! - `cell:id`, `module:id`, `pack:id`, `identity:id`, `identity:kind`
//! - `pr:kind`, `pr:id`

use std::sync::Arc;

/// Namespaced, single-flight call cache.
pub mod cache;
/// Native value codec.
pub mod codec;
/// Bridge error taxonomy.
pub mod error;
/// Cached service builtins and projections.
pub mod functions;

pub use cache::{CachePolicy, CacheStats, CallCache};
pub use error::{BridgeError, BridgeResult};
pub use functions::{Bridge, IDENTITY_NAMESPACE, NAMESPACES, RESULTS_NAMESPACE};

use crate::config::BridgeConfig;
use crate::interpreter::Env;
use crate::service::Services;

/// Build the cache and bridge from `config` and install all builtins.
pub fn load(env: &mut Env, services: Services, config: &BridgeConfig) -> Arc<Bridge> {
    let cache = Arc::new(CallCache::new(NAMESPACES, config.cache_policy()));
    let bridge = Arc::new(Bridge::new(services, cache, config.call_timeout()));
    install(&bridge, env);
    bridge
}

/// Install every bridge builtin into `env`.
pub fn install(bridge: &Arc<Bridge>, env: &mut Env) {
    // digital twin
    let identity = bridge.clone();
    env.add_builtin(IDENTITY_NAMESPACE, move |args| identity.identity(args));
    env.add_builtin("identity->cell", functions::identity_to_cell);
    env.add_builtin("identity->module", functions::identity_to_module);
    env.add_builtin("identity->pack", functions::identity_to_pack);
    env.add_builtin("identity:id", functions::identity_id);
    env.add_builtin("identity:kind", functions::identity_kind);
    env.add_builtin("cell:id", functions::cell_id);
    env.add_builtin("module:id", functions::module_id);
    env.add_builtin("pack:id", functions::pack_id);

    // process
    let results = bridge.clone();
    env.add_builtin(RESULTS_NAMESPACE, move |args| results.results(args));
    env.add_builtin("pr:kind", functions::result_kind);
    env.add_builtin("pr:id", functions::result_id);

    tracing::debug!(builtins = env.builtin_names().len(), "bridge builtins installed");
}
