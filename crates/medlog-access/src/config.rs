//! Service configuration
//!
//! Loaded from JSON or from `MEDLOG_*` environment variables. Only the
//! service's own ledger identity is required; everything else has a
//! default.

use std::time::Duration;

use medlog_integrity::{ContentHash, Identity};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const ENV_SERVICE_ADDRESS: &str = "MEDLOG_SERVICE_ADDRESS";
pub const ENV_UPSTREAM_TIMEOUT_MS: &str = "MEDLOG_UPSTREAM_TIMEOUT_MS";
pub const ENV_CONTENT_GATEWAY: &str = "MEDLOG_CONTENT_GATEWAY";
pub const ENV_PROBE_CONTENT: &str = "MEDLOG_PROBE_CONTENT";

/// Default bound on any single upstream call
pub const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 5_000;

/// Default public gateway used to build record content URLs
pub const DEFAULT_CONTENT_GATEWAY: &str = "https://ipfs.io/ipfs/";

/// Settings for the authorization engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Identity the service transacts under on the ledger. Staff identities
    /// authenticate requests; only this identity writes records.
    pub service_identity: Identity,

    #[serde(default = "default_upstream_timeout_ms")]
    pub upstream_timeout_ms: u64,

    /// Prefix joined with a content hash to form a fetchable URL
    #[serde(default = "default_content_gateway")]
    pub content_gateway: String,

    /// Check each listed record's content is retrievable
    #[serde(default = "default_probe_content")]
    pub probe_content: bool,
}

fn default_upstream_timeout_ms() -> u64 {
    DEFAULT_UPSTREAM_TIMEOUT_MS
}

fn default_content_gateway() -> String {
    DEFAULT_CONTENT_GATEWAY.to_string()
}

fn default_probe_content() -> bool {
    true
}

impl AccessConfig {
    /// Defaults for everything except the service identity
    pub fn new(service_identity: Identity) -> Self {
        AccessConfig {
            service_identity,
            upstream_timeout_ms: DEFAULT_UPSTREAM_TIMEOUT_MS,
            content_gateway: DEFAULT_CONTENT_GATEWAY.to_string(),
            probe_content: true,
        }
    }

    /// Parse and validate a JSON config document
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: AccessConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read `MEDLOG_*` variables from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup, e.g. a map in tests
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let address = lookup(ENV_SERVICE_ADDRESS).ok_or(ConfigError::Missing(ENV_SERVICE_ADDRESS))?;
        let service_identity = address.parse::<Identity>().map_err(|e| ConfigError::Invalid {
            key: ENV_SERVICE_ADDRESS,
            reason: e.to_string(),
        })?;

        let mut config = AccessConfig::new(service_identity);

        if let Some(ms) = lookup(ENV_UPSTREAM_TIMEOUT_MS) {
            config.upstream_timeout_ms = ms.trim().parse().map_err(|_| ConfigError::Invalid {
                key: ENV_UPSTREAM_TIMEOUT_MS,
                reason: format!("not a number of milliseconds: {ms}"),
            })?;
        }
        if let Some(gateway) = lookup(ENV_CONTENT_GATEWAY) {
            config.content_gateway = gateway.trim().to_string();
        }
        if let Some(probe) = lookup(ENV_PROBE_CONTENT) {
            config.probe_content = match probe.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => {
                    return Err(ConfigError::Invalid {
                        key: ENV_PROBE_CONTENT,
                        reason: format!("expected true/false, got {other}"),
                    })
                }
            };
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "upstream_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.content_gateway.is_empty() {
            return Err(ConfigError::Invalid {
                key: "content_gateway",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }

    /// Public URL of a content blob
    pub fn content_url(&self, hash: &ContentHash) -> String {
        if self.content_gateway.ends_with('/') {
            format!("{}{}", self.content_gateway, hash)
        } else {
            format!("{}/{}", self.content_gateway, hash)
        }
    }
}
