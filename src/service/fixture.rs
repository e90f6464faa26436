//! JSON-backed implementation of both service capabilities.
//!
//! Fixture files look like:
//!
//! ```json
//! {
//!   "identities": { "abc123": { "kind": "cell", "id": "c-1", "nvid": "abc123" } },
//!   "results": { "abc123": [ { "id": "r-1", "identity": "abc123", "kind": "formation" } ] },
//!   "unavailable": [ "zzz999" ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::{
    CallContext, Identity, IdentityService, ProcessResult, ProcessService, ServiceError,
    ServiceResult,
};

/// Errors raised while loading a fixture document.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// The fixture file could not be read.
    #[error("failed to read fixtures {path}: {source}")]
    Io {
        /// Path that was read
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The fixture document is not valid JSON for [`FixtureServices`].
    #[error("invalid fixture document: {0}")]
    Json(#[from] serde_json::Error),
}

/// In-memory service backend loaded from a fixture document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureServices {
    /// Identity records keyed by asset identifier.
    #[serde(default)]
    pub identities: HashMap<String, Identity>,
    /// Ordered process results keyed by asset identifier.
    #[serde(default)]
    pub results: HashMap<String, Vec<ProcessResult>>,
    /// Identifiers whose lookups fail as if the backend were down.
    #[serde(default)]
    pub unavailable: HashSet<String>,
}

impl FixtureServices {
    /// Parse fixtures from JSON bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, FixtureError> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Load fixtures from a JSON file.
    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        let data = std::fs::read(path).map_err(|source| FixtureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_slice(&data)
    }

    fn guard(&self, ctx: &CallContext, id: &str) -> ServiceResult<()> {
        ctx.check_deadline()?;
        if self.unavailable.contains(id) {
            return Err(ServiceError::Unavailable(format!("backend refused '{}'", id)));
        }
        Ok(())
    }
}

impl IdentityService for FixtureServices {
    fn lookup_identity(&self, ctx: &CallContext, id: &str) -> ServiceResult<Identity> {
        self.guard(ctx, id)?;
        self.identities
            .get(id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))
    }
}

impl ProcessService for FixtureServices {
    fn fetch_results(&self, ctx: &CallContext, id: &str) -> ServiceResult<Vec<ProcessResult>> {
        self.guard(ctx, id)?;
        // Assets without recorded results answer with an empty list.
        Ok(self.results.get(id).cloned().unwrap_or_default())
    }
}
