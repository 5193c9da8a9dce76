//! Configuration management for icaet-mcp
//!
//! Credentials come from the environment (see [`Settings`]); behavioral
//! options are read from an optional TOML file.

mod defaults;
mod settings;

pub use defaults::*;
pub use settings::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Upstream API options
    #[serde(default)]
    pub api: ApiConfig,

    /// How successful responses are rendered
    #[serde(default)]
    pub response: ResponseConfig,
}

/// Upstream API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL; requests go to `{base_url}/query`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Overall request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Give 401 and 400 responses dedicated guidance instead of `HTTP {status}`
    #[serde(default = "default_auth_error_hints")]
    pub auth_error_hints: bool,
}

/// Response rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseConfig {
    #[serde(default = "default_response_format")]
    pub format: ResponseFormat,
}

/// Rendering of a successful upstream body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// The `answer` field when present, otherwise the whole body as JSON
    Answer,
    /// The whole body as pretty-printed JSON
    Json,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            auth_error_hints: default_auth_error_hints(),
        }
    }
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            format: default_response_format(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Get the default base directory (~/.icaet)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".icaet")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path, or from the default location when it exists.
    ///
    /// Without an explicit path a missing file means built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        let default_path = Self::default_config_path();
        if default_path.exists() {
            Self::load(&default_path)
        } else {
            debug!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.api.timeout_secs == 0 || self.api.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(Error::Config(format!(
                "api.timeout_secs must be between 1 and {}",
                MAX_TIMEOUT_SECS
            )));
        }

        let url = Url::parse(&self.api.base_url)
            .map_err(|e| Error::Config(format!("Invalid api.base_url: {}", e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(Error::Config(format!(
                "api.base_url must use http or https, got '{}'",
                url.scheme()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.timeout_secs, 30);
        assert!(config.api.auth_error_hints);
        assert_eq!(config.response.format, ResponseFormat::Answer);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_load_partial_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[api]
base_url = "http://127.0.0.1:9000"
timeout_secs = 20

[response]
format = "json"
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.api.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.api.timeout(), Duration::from_secs(20));
        assert!(config.api.auth_error_hints);
        assert_eq!(config.response.format, ResponseFormat::Json);
    }

    #[test]
    fn test_config_load_missing_explicit_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("absent.toml");
        let err = Config::load_or_default(Some(path.as_path())).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.api.timeout_secs = 0;
        assert!(config.validate().is_err());

        config.api.timeout_secs = MAX_TIMEOUT_SECS + 1;
        assert!(config.validate().is_err());

        config.api.timeout_secs = 20;
        assert!(config.validate().is_ok());

        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        config.api.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[api]\ntimeout_secs = \"soon\"\n").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, Error::TomlParse(_)));
    }
}
