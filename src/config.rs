//! Configuration model for the lock manager.
//!
//! `LockConfig` can be built programmatically, parsed from a YAML file
//! (unknown fields are ignored for forward compatibility), or read from
//! environment variables. Required settings without a value fail validation
//! with a configuration error at lock-manager construction time.

use crate::error::{NetlatchError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable for the lock wait timeout (seconds).
pub const ENV_WAIT_TIMEOUT: &str = "NETLATCH_WAIT_TIMEOUT";

/// Environment variable for the maximum acquisition attempts.
pub const ENV_MAX_ATTEMPTS: &str = "NETLATCH_MAX_ATTEMPTS";

/// Environment variable for the lock expiration duration (seconds).
pub const ENV_LOCK_EXPIRATION: &str = "NETLATCH_LOCK_EXPIRATION";

/// Environment variable for the lock-store table/collection identifier.
pub const ENV_LOCK_TABLE: &str = "NETLATCH_LOCK_TABLE";

/// Fallback wait timeout applied when the configured value is unset or below 1.
const WAIT_TIMEOUT_FALLBACK_SECS: u64 = 3;

/// Configuration for a [`LockManager`](crate::manager::LockManager).
///
/// `expiration_secs` and `table` are required and have no default; the
/// zero/empty placeholders they deserialize to are rejected by [`validate`].
///
/// [`validate`]: LockConfig::validate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Maximum time to wait for lock acquisition, in seconds.
    /// Values below 1 fall back to 3.
    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,

    /// Maximum number of acquisition attempts before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Duration after which a stored lock record is considered abandoned,
    /// in seconds. Required.
    pub expiration_secs: u64,

    /// Identifier of the lock-store table, collection, or directory. Required.
    pub table: String,
}

fn default_wait_timeout_secs() -> u64 {
    WAIT_TIMEOUT_FALLBACK_SECS
}
fn default_max_attempts() -> u32 {
    10
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            wait_timeout_secs: default_wait_timeout_secs(),
            max_attempts: default_max_attempts(),
            expiration_secs: 0,
            table: String::new(),
        }
    }
}

impl LockConfig {
    /// Create a config with the required settings and defaults for the rest.
    pub fn new(table: impl Into<String>, expiration_secs: u64) -> Self {
        Self {
            table: table.into(),
            expiration_secs,
            ..Self::default()
        }
    }

    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward
    /// compatibility.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            NetlatchError::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: LockConfig = serde_yaml::from_str(yaml)
            .map_err(|e| NetlatchError::Config(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to a YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| NetlatchError::Config(format!("failed to serialize config: {}", e)))
    }

    /// Build config from environment variables.
    ///
    /// `NETLATCH_LOCK_EXPIRATION` and `NETLATCH_LOCK_TABLE` are required;
    /// `NETLATCH_WAIT_TIMEOUT` and `NETLATCH_MAX_ATTEMPTS` fall back to
    /// their defaults when unset.
    pub fn from_env() -> Result<Self> {
        let config = Self {
            wait_timeout_secs: env_parse(ENV_WAIT_TIMEOUT)?.unwrap_or_else(default_wait_timeout_secs),
            max_attempts: env_parse(ENV_MAX_ATTEMPTS)?.unwrap_or_else(default_max_attempts),
            expiration_secs: env_parse(ENV_LOCK_EXPIRATION)?.ok_or_else(|| {
                NetlatchError::Config(format!("{} is required but not set", ENV_LOCK_EXPIRATION))
            })?,
            table: std::env::var(ENV_LOCK_TABLE).map_err(|_| {
                NetlatchError::Config(format!("{} is required but not set", ENV_LOCK_TABLE))
            })?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate config values.
    ///
    /// Validation rules:
    /// - `expiration_secs` must be set and greater than 0
    /// - `table` must be non-empty
    /// - `max_attempts` must be greater than 0
    pub fn validate(&self) -> Result<()> {
        if self.expiration_secs == 0 {
            return Err(NetlatchError::Config(
                "expiration_secs is required and must be greater than 0".to_string(),
            ));
        }

        if self.table.is_empty() {
            return Err(NetlatchError::Config(
                "table is required and must be non-empty".to_string(),
            ));
        }

        if self.max_attempts == 0 {
            return Err(NetlatchError::Config(
                "max_attempts must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// The wait timeout actually applied: configured values below 1 second
    /// fall back to 3 seconds.
    pub fn effective_wait_timeout_secs(&self) -> u64 {
        if self.wait_timeout_secs < 1 {
            WAIT_TIMEOUT_FALLBACK_SECS
        } else {
            self.wait_timeout_secs
        }
    }
}

/// Parse an optional integer environment variable.
fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(value) => value.parse::<T>().map(Some).map_err(|_| {
            NetlatchError::Config(format!("{} has an invalid value: '{}'", key, value))
        }),
        Err(_) => Ok(None),
    }
}
