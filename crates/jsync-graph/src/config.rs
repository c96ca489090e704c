//! Connection, backend and index-await configuration.
//!
//! Loaded from a TOML file. Every field has a default, so an empty file (or
//! no file at all) targets a local single-node setup.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{SchemaError, SchemaResult};

/// Default Gremlin Server HTTP endpoint.
pub const DEFAULT_ENDPOINT_URL: &str = "http://localhost:8182";

/// Environment variable overriding the endpoint URL.
pub const ENDPOINT_URL_ENV: &str = "JSYNC_URL";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JsyncConfig {
    pub endpoint: EndpointConfig,
    pub backend: BackendConfig,
    #[serde(rename = "await")]
    pub await_: AwaitConfig,
}

/// Where the Gremlin Server listens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub url: String,
    pub request_timeout_secs: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ENDPOINT_URL.to_string(),
            request_timeout_secs: 120,
        }
    }
}

/// Storage and search backends written into new graph configurations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub storage_backend: String,
    pub storage_hostname: String,
    pub storage_port: u16,
    pub index_backend: String,
    pub index_hostname: String,
    pub index_port: u16,
    /// Name of the search index used by mixed indexes.
    pub index_name: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            storage_backend: "cql".to_string(),
            storage_hostname: "127.0.0.1".to_string(),
            storage_port: 9042,
            index_backend: "elasticsearch".to_string(),
            index_hostname: "127.0.0.1".to_string(),
            index_port: 9200,
            index_name: "search".to_string(),
        }
    }
}

/// How index status transitions are awaited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AwaitStrategy {
    /// Each phase is its own submission; waits are a local polling loop.
    #[default]
    Poll,
    /// All phases go out as one script using the server-side status watchers.
    Backend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AwaitConfig {
    pub strategy: AwaitStrategy,
    pub timeout_secs: u64,
    pub initial_interval_ms: u64,
    pub max_interval_ms: u64,
    pub multiplier: f64,
}

impl Default for AwaitConfig {
    fn default() -> Self {
        Self {
            strategy: AwaitStrategy::Poll,
            timeout_secs: 300,
            initial_interval_ms: 500,
            max_interval_ms: 10_000,
            multiplier: 2.0,
        }
    }
}

impl AwaitConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn initial_interval(&self) -> Duration {
        Duration::from_millis(self.initial_interval_ms)
    }

    /// Next poll interval after `current`, capped at `max_interval_ms`.
    ///
    /// A product too large to represent saturates at the cap.
    pub fn next_interval(&self, current: Duration) -> Duration {
        let max = Duration::from_millis(self.max_interval_ms);
        Duration::try_from_secs_f64(current.as_secs_f64() * self.multiplier.max(1.0))
            .unwrap_or(max)
            .min(max)
    }
}

impl JsyncConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> SchemaResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> SchemaResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Apply `JSYNC_URL` if it is set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(ENDPOINT_URL_ENV) {
            self.endpoint.url = url;
        }
        self
    }

    fn validate(&self) -> SchemaResult<()> {
        if self.endpoint.url.trim().is_empty() {
            return Err(SchemaError::Config("endpoint.url must not be empty".into()));
        }
        if self.backend.index_name.trim().is_empty() {
            return Err(SchemaError::Config("backend.index_name must not be empty".into()));
        }
        if self.await_.initial_interval_ms == 0 {
            return Err(SchemaError::Config("await.initial_interval_ms must be positive".into()));
        }
        if self.await_.max_interval_ms < self.await_.initial_interval_ms {
            return Err(SchemaError::Config(
                "await.max_interval_ms must not be below await.initial_interval_ms".into(),
            ));
        }
        if !self.await_.multiplier.is_finite() || self.await_.multiplier < 1.0 {
            return Err(SchemaError::Config(
                "await.multiplier must be a finite number of at least 1.0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = JsyncConfig::from_toml_str("").unwrap();
        assert_eq!(config.endpoint.url, DEFAULT_ENDPOINT_URL);
        assert_eq!(config.backend.index_name, "search");
        assert_eq!(config.await_.strategy, AwaitStrategy::Poll);
    }

    #[test]
    fn test_partial_override() {
        let text = r#"
            [backend]
            storage_backend = "cassandrathrift"
            storage_port = 9160

            [await]
            strategy = "backend"
            timeout_secs = 30
        "#;
        let config = JsyncConfig::from_toml_str(text).unwrap();
        assert_eq!(config.backend.storage_backend, "cassandrathrift");
        assert_eq!(config.backend.storage_port, 9160);
        assert_eq!(config.backend.index_port, 9200);
        assert_eq!(config.await_.strategy, AwaitStrategy::Backend);
        assert_eq!(config.await_.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_demo_config_parses() {
        let config = JsyncConfig::from_toml_str(include_str!("../../../demos/jsync.toml")).unwrap();
        assert_eq!(config.backend.storage_backend, "cql");
        assert_eq!(config.await_.max_interval_ms, 10_000);
    }

    #[test]
    fn test_rejects_empty_url() {
        let err = JsyncConfig::from_toml_str("[endpoint]\nurl = \"\"").unwrap_err();
        assert!(matches!(err, SchemaError::Config(_)));
    }

    #[test]
    fn test_backoff_is_capped() {
        let config = AwaitConfig {
            initial_interval_ms: 4_000,
            max_interval_ms: 6_000,
            ..AwaitConfig::default()
        };
        let next = config.next_interval(config.initial_interval());
        assert_eq!(next, Duration::from_millis(6_000));
    }

    #[test]
    fn test_rejects_unusable_backoff() {
        for text in [
            "[await]\nmultiplier = inf\n",
            "[await]\nmultiplier = nan\n",
            "[await]\nmultiplier = 0.5\n",
            "[await]\nmax_interval_ms = 0\n",
            "[await]\ninitial_interval_ms = 2000\nmax_interval_ms = 1000\n",
        ] {
            let err = JsyncConfig::from_toml_str(text).unwrap_err();
            assert!(matches!(err, SchemaError::Config(_)), "accepted: {text}");
        }
    }

    #[test]
    fn test_oversized_backoff_saturates_at_cap() {
        for multiplier in [f64::INFINITY, f64::MAX, 1e300] {
            let config = AwaitConfig {
                initial_interval_ms: 500,
                max_interval_ms: 8_000,
                multiplier,
                ..AwaitConfig::default()
            };
            let next = config.next_interval(Duration::from_secs(u64::MAX / 2));
            assert_eq!(next, Duration::from_millis(8_000));
        }
    }
}
