// src/config.rs
//! Client configuration
//!
//! Every key has a default, so an empty environment yields a working
//! local setup. Values come from an optional file (any format the `config`
//! crate understands) overlaid with `FRAUD_RULES_*` environment variables,
//! nested keys separated by `__` (e.g. `FRAUD_RULES_API__BASE_URL`).

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const ENV_PREFIX: &str = "FRAUD_RULES";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EditorConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Origin of the platform API; request paths are appended to it
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Bearer token sent with every request
    #[serde(default)]
    pub auth_token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            auth_token: None,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// How long a fetched list is served without refetching
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_after_secs: default_stale_after_secs(),
        }
    }
}

impl CacheConfig {
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }
}

fn default_stale_after_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` overrides it
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}

impl EditorConfig {
    /// Load from a file, with environment overrides on top
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(environment())
            .build()?;

        settings.try_deserialize()
    }

    /// Load from the environment only
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(environment())
            .build()?;

        settings.try_deserialize()
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.api.base_url, "http://localhost:3000");
        assert_eq!(config.api.timeout(), Duration::from_secs(30));
        assert!(config.api.auth_token.is_none());
        assert_eq!(config.cache.stale_after(), Duration::from_secs(30));
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_from_toml_file() {
        let path = std::env::temp_dir().join(format!(
            "fraud-rule-editor-{}.toml",
            uuid::Uuid::new_v4().simple()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[api]
base_url = "https://tracker.example.com"
timeout_secs = 5

[cache]
stale_after_secs = 0
"#
        )
        .unwrap();

        let config = EditorConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.api.base_url, "https://tracker.example.com");
        assert_eq!(config.api.timeout_secs, 5);
        assert_eq!(config.cache.stale_after_secs, 0);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_from_env_without_variables_uses_defaults() {
        let config = EditorConfig::from_env().unwrap();
        assert!(!config.api.base_url.is_empty());
    }
}
