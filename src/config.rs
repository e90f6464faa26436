//! Bridge configuration
//!
//! Stored as pretty-printed JSON. Every field has a default, so a partial file
//! (or none at all) is valid.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::bridge::CachePolicy;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the file failed
    #[error("IO error on {path}: {source}")]
    Io {
        /// File being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// The file is not valid configuration JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Configuration for the bridge and its frame loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Seconds a cached service answer stays valid (None: forever)
    pub cache_ttl_secs: Option<u64>,

    /// Deadline placed on each outbound call context, in milliseconds
    pub call_timeout_ms: Option<u64>,

    /// Number of frames the CLI evaluates a script for
    pub frames: u64,

    /// Pause between frames, in milliseconds
    pub frame_interval_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: None,
            call_timeout_ms: None,
            frames: 1,
            frame_interval_ms: 0,
        }
    }
}

impl BridgeConfig {
    /// Cache expiry policy derived from `cache_ttl_secs`.
    pub fn cache_policy(&self) -> CachePolicy {
        match self.cache_ttl_secs {
            Some(secs) => CachePolicy::Ttl(Duration::from_secs(secs)),
            None => CachePolicy::Forever,
        }
    }

    /// Per-call deadline derived from `call_timeout_ms`.
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }

    /// Pause between frames.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

/// Write configuration as pretty JSON, creating parent directories.
pub fn write_config(path: &Path, config: &BridgeConfig) -> ConfigResult<()> {
    let json = serde_json::to_vec_pretty(config)?;
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, json).map_err(io_err)?;
    Ok(())
}

/// Load configuration from a JSON file.
pub fn load_config(path: &Path) -> ConfigResult<BridgeConfig> {
    let data = std::fs::read(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: BridgeConfig = serde_json::from_slice(&data)?;
    Ok(config)
}
