//! Service capabilities consumed by the bridge
//!
//! The bridge depends only on the two narrow traits below. Concrete clients
//! (HTTP, fixtures, test doubles) are injected at load time and shared for the
//! lifetime of the process.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Identity and process-result records.
pub mod domain;
/// JSON fixture backend.
pub mod fixture;

pub use domain::{Cell, Identity, Module, Pack, ProcessResult};
pub use fixture::{FixtureError, FixtureServices};

/// Errors reported by a service client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// No record exists for the requested identifier.
    #[error("'{0}' not found")]
    NotFound(String),

    /// The request was rejected by authentication/authorization.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The backend could not be reached or answered with a failure.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The call exceeded the deadline carried by its context.
    #[error("request {request_id} exceeded its deadline")]
    DeadlineExceeded {
        /// Request identifier of the timed-out call
        request_id: Uuid,
    },

    /// The backend answered with a payload that could not be decoded.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Convenience result alias for service calls
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Per-call context handed to service clients.
///
/// A fresh context is created for every outbound call. The bridge itself never
/// enforces the deadline; clients that support one read it from here.
#[derive(Debug, Clone)]
pub struct CallContext {
    /// Unique identifier for correlating logs across client and bridge.
    pub request_id: Uuid,
    /// Time the call was issued.
    pub issued_at: DateTime<Utc>,
    /// Optional wall-clock deadline.
    pub deadline: Option<DateTime<Utc>>,
}

impl CallContext {
    /// Create a context without a deadline.
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            issued_at: Utc::now(),
            deadline: None,
        }
    }

    /// Create a context whose deadline lies `timeout` after issue time.
    /// Timeouts too large to represent leave the context without a deadline.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        let mut ctx = Self::new();
        ctx.deadline = timeout
            .and_then(|timeout| chrono::Duration::from_std(timeout).ok())
            .and_then(|timeout| ctx.issued_at.checked_add_signed(timeout));
        ctx
    }

    /// Whether the deadline (if any) has passed.
    pub fn is_expired(&self) -> bool {
        self.deadline.map(|deadline| Utc::now() >= deadline) == Some(true)
    }

    /// Fail with [`ServiceError::DeadlineExceeded`] once the deadline passed.
    pub fn check_deadline(&self) -> ServiceResult<()> {
        if self.is_expired() {
            Err(ServiceError::DeadlineExceeded {
                request_id: self.request_id,
            })
        } else {
            Ok(())
        }
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Identity lookup capability (digital twin).
pub trait IdentityService: Send + Sync {
    /// Resolve an asset identifier to its identity record.
    fn lookup_identity(&self, ctx: &CallContext, id: &str) -> ServiceResult<Identity>;
}

/// Process-result retrieval capability.
pub trait ProcessService: Send + Sync {
    /// Fetch the ordered list of process results recorded for an asset.
    fn fetch_results(&self, ctx: &CallContext, id: &str) -> ServiceResult<Vec<ProcessResult>>;
}

/// Process-wide service handles, constructed once and shared by every builtin.
#[derive(Clone)]
pub struct Services {
    /// Identity lookup handle.
    pub identity: Arc<dyn IdentityService>,
    /// Process-result handle.
    pub process: Arc<dyn ProcessService>,
}

impl Services {
    /// Bundle two capability handles.
    pub fn new(identity: Arc<dyn IdentityService>, process: Arc<dyn ProcessService>) -> Self {
        Self { identity, process }
    }

    /// Use one backend for both capabilities.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: IdentityService + ProcessService + 'static,
    {
        Self {
            identity: backend.clone(),
            process: backend,
        }
    }
}
