//! Configuration for stratus-edge.

use std::time::Duration;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;

use crate::error::{EdgeError, Result};

/// Top-level configuration for the edge control plane core.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EdgeConfig {
    /// Result cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Health monitoring configuration.
    #[serde(default)]
    pub health: HealthConfig,

    /// Rollout behaviour configuration.
    #[serde(default)]
    pub deployment: DeploymentConfig,
}

impl EdgeConfig {
    /// Load configuration from the default sources.
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default values
    /// 2. `stratus-edge.toml` in the current directory (if present)
    /// 3. Environment variables with `STRATUS_EDGE_` prefix
    pub fn load() -> Result<Self> {
        Figment::new()
            .merge(Toml::file("stratus-edge.toml"))
            .merge(Env::prefixed("STRATUS_EDGE_").split("__"))
            .extract()
            .map_err(|e| EdgeError::config(e.to_string()))
    }

    /// Load configuration from a specific TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("STRATUS_EDGE_").split("__"))
            .extract()
            .map_err(|e| EdgeError::config(e.to_string()))
    }
}

/// Result cache configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of entries held at once.
    pub capacity: usize,
    /// TTL applied when `put` is called without an explicit TTL.
    #[serde(with = "serde_duration_secs")]
    pub default_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            default_ttl: Duration::from_secs(300),
        }
    }
}

/// Health monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Heartbeat age beyond which a node is considered unhealthy.
    #[serde(with = "serde_duration_secs")]
    pub heartbeat_timeout: Duration,
    /// Most recent checks retained per node; oldest dropped on overflow.
    pub history_limit: usize,
    /// Default window for flap detection.
    pub flap_window: usize,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            heartbeat_timeout: Duration::from_secs(60),
            history_limit: 100,
            flap_window: 10,
        }
    }
}

/// Rollout behaviour configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeploymentConfig {
    /// Percentage of targets in the canary batch when none is given.
    pub canary_percent: u8,
    /// Whether rollouts roll back on failure when the request does not say.
    pub rollback_on_error: bool,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            canary_percent: 10,
            rollback_on_error: true,
        }
    }
}

/// Serde helper for Duration as seconds.
mod serde_duration_secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = EdgeConfig::default();
        assert_eq!(config.cache.capacity, 1024);
        assert_eq!(config.health.heartbeat_timeout, Duration::from_secs(60));
        assert_eq!(config.health.history_limit, 100);
        assert_eq!(config.deployment.canary_percent, 10);
        assert!(config.deployment.rollback_on_error);
    }

    #[test]
    fn durations_deserialise_from_secs() {
        let config: EdgeConfig = serde_json::from_str(
            r#"{"cache": {"capacity": 4, "default_ttl": 30}, "health": {"heartbeat_timeout": 5}}"#,
        )
        .unwrap();
        assert_eq!(config.cache.capacity, 4);
        assert_eq!(config.cache.default_ttl, Duration::from_secs(30));
        assert_eq!(config.health.heartbeat_timeout, Duration::from_secs(5));
        // Unspecified sections fall back to defaults.
        assert_eq!(config.health.flap_window, 10);
    }
}
