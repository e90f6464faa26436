//! Builtins that mediate between scripts and the services.
//!
//! Service calls (`dt:identity`, `ps:results`) are memoized per input.
//! Projections (`cell:id`, `pr:kind`, ...) only unwrap, check the variant and
//! re-wrap; they never touch the cache or the network.

use std::sync::Arc;
use std::time::Duration;

use super::cache::CallCache;
use super::codec::{self, Native};
use super::{BridgeError, BridgeResult};
use crate::interpreter::Expression;
use crate::service::{CallContext, Identity, ProcessResult, ServiceResult, Services};

/// Cache namespace for identity lookups.
pub const IDENTITY_NAMESPACE: &str = "dt:identity";
/// Cache namespace for process-result retrieval.
pub const RESULTS_NAMESPACE: &str = "ps:results";

/// Every namespace the bridge uses; declared when the cache is built.
pub const NAMESPACES: [&str; 2] = [IDENTITY_NAMESPACE, RESULTS_NAMESPACE];

/// Service handles plus the cache shared by the cached builtins.
pub struct Bridge {
    services: Services,
    cache: Arc<CallCache>,
    call_timeout: Option<Duration>,
}

impl Bridge {
    /// Create a bridge over injected handles and cache.
    pub fn new(services: Services, cache: Arc<CallCache>, call_timeout: Option<Duration>) -> Self {
        Self {
            services,
            cache,
            call_timeout,
        }
    }

    /// Shared call cache.
    pub fn cache(&self) -> &Arc<CallCache> {
        &self.cache
    }

    /// `(dt:identity nvid)` – resolve an asset identifier to its identity.
    pub fn identity(&self, args: &[Expression]) -> BridgeResult<Expression> {
        self.cached_call(IDENTITY_NAMESPACE, args, |ctx, nvid| {
            let identity = self.services.identity.lookup_identity(ctx, nvid)?;
            Ok(codec::wrap(identity))
        })
    }

    /// `(ps:results nvid)` – ordered process results for an asset.
    pub fn results(&self, args: &[Expression]) -> BridgeResult<Expression> {
        self.cached_call(RESULTS_NAMESPACE, args, |ctx, nvid| {
            let results = self.services.process.fetch_results(ctx, nvid)?;
            Ok(codec::wrap_list(results))
        })
    }

    fn cached_call<F>(
        &self,
        namespace: &'static str,
        args: &[Expression],
        call: F,
    ) -> BridgeResult<Expression>
    where
        F: FnOnce(&CallContext, &str) -> ServiceResult<Expression>,
    {
        let key = single_arg(namespace, args)?;
        self.cache.get_or_try_insert_with(namespace, key, || {
            let input: String = codec::unwrap(key)?;
            let ctx = CallContext::with_timeout(self.call_timeout);
            tracing::info!(namespace, input = %input, request_id = %ctx.request_id, "calling service");
            call(&ctx, &input).map_err(|err| {
                tracing::warn!(namespace, input = %input, request_id = %ctx.request_id, error = %err, "service call failed");
                BridgeError::from(err)
            })
        })
    }
}

fn single_arg<'a>(name: &'static str, args: &'a [Expression]) -> BridgeResult<&'a Expression> {
    match args {
        [arg] => Ok(arg),
        _ => Err(BridgeError::Arity {
            name,
            expected: 1,
            found: args.len(),
        }),
    }
}

fn project<T, R, F>(name: &'static str, args: &[Expression], field: F) -> BridgeResult<Expression>
where
    T: Native,
    R: Native,
    F: FnOnce(&T) -> BridgeResult<R>,
{
    let value: T = codec::unwrap(single_arg(name, args)?)?;
    Ok(codec::wrap(field(&value)?))
}

/// `(identity->cell identity)` – assert the identity is a cell.
pub fn identity_to_cell(args: &[Expression]) -> BridgeResult<Expression> {
    project("identity->cell", args, |identity: &Identity| {
        identity
            .as_cell()
            .map(|_| identity.clone())
            .ok_or_else(|| BridgeError::variant("cell", identity.kind()))
    })
}

/// `(identity->module identity)` – assert the identity is a module.
pub fn identity_to_module(args: &[Expression]) -> BridgeResult<Expression> {
    project("identity->module", args, |identity: &Identity| {
        identity
            .as_module()
            .map(|_| identity.clone())
            .ok_or_else(|| BridgeError::variant("module", identity.kind()))
    })
}

/// `(identity->pack identity)` – assert the identity is a pack.
pub fn identity_to_pack(args: &[Expression]) -> BridgeResult<Expression> {
    project("identity->pack", args, |identity: &Identity| {
        identity
            .as_pack()
            .map(|_| identity.clone())
            .ok_or_else(|| BridgeError::variant("pack", identity.kind()))
    })
}

/// `(cell:id cell)`
pub fn cell_id(args: &[Expression]) -> BridgeResult<Expression> {
    project("cell:id", args, |identity: &Identity| {
        identity
            .as_cell()
            .map(|cell| cell.id.clone())
            .ok_or_else(|| BridgeError::variant("cell", identity.kind()))
    })
}

/// `(module:id module)`
pub fn module_id(args: &[Expression]) -> BridgeResult<Expression> {
    project("module:id", args, |identity: &Identity| {
        identity
            .as_module()
            .map(|module| module.id.clone())
            .ok_or_else(|| BridgeError::variant("module", identity.kind()))
    })
}

/// `(pack:id pack)`
pub fn pack_id(args: &[Expression]) -> BridgeResult<Expression> {
    project("pack:id", args, |identity: &Identity| {
        identity
            .as_pack()
            .map(|pack| pack.id.clone())
            .ok_or_else(|| BridgeError::variant("pack", identity.kind()))
    })
}

/// `(identity:id identity)` – identifier of any variant.
pub fn identity_id(args: &[Expression]) -> BridgeResult<Expression> {
    project("identity:id", args, |identity: &Identity| {
        Ok(identity.id().to_string())
    })
}

/// `(identity:kind identity)` – variant tag as a string.
pub fn identity_kind(args: &[Expression]) -> BridgeResult<Expression> {
    project("identity:kind", args, |identity: &Identity| {
        Ok(identity.kind().to_string())
    })
}

/// `(pr:kind result)`
pub fn result_kind(args: &[Expression]) -> BridgeResult<Expression> {
    project("pr:kind", args, |result: &ProcessResult| Ok(result.kind.clone()))
}

/// `(pr:id result)`
pub fn result_id(args: &[Expression]) -> BridgeResult<Expression> {
    project("pr:id", args, |result: &ProcessResult| Ok(result.id.clone()))
}
