//! Application configuration loaded from a JSON file.
//!
//! ```json
//! {
//!   "API_ID": 12345,
//!   "API_HASH": "0123456789abcdef0123456789abcdef",
//!   "SESSION_NAME": "media",
//!   "PATH_DOWNLOAD": "./downloads"
//! }
//! ```
//!
//! `SERVICE_URL`, `MAX_ATTEMPTS` and `RETRY_RATE_LIMITED` are optional.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::download::{DEFAULT_MAX_ATTEMPTS, MAX_CONFIGURABLE_ATTEMPTS, RetryPolicy};
use crate::service::{DEFAULT_SERVICE_URL, ServiceCredentials};

/// Config file read when no path is given.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

fn default_download_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_service_url() -> String {
    DEFAULT_SERVICE_URL.to_string()
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

/// `API_ID` may be written as a number or a numeric string.
#[derive(Deserialize)]
#[serde(untagged)]
enum ApiId {
    Number(i64),
    Text(String),
}

fn deserialize_api_id<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match ApiId::deserialize(deserializer)? {
        ApiId::Number(id) => Ok(id),
        ApiId::Text(text) => text.trim().parse().map_err(|_| {
            serde::de::Error::custom(format!("API_ID must be an integer, got {text:?}"))
        }),
    }
}

/// Validated runtime configuration.
#[derive(Clone, Deserialize)]
pub struct AppConfig {
    /// Numeric application id.
    #[serde(rename = "API_ID", deserialize_with = "deserialize_api_id")]
    pub api_id: i64,
    /// Application secret.
    #[serde(rename = "API_HASH")]
    pub api_hash: String,
    /// Persisted session name.
    #[serde(rename = "SESSION_NAME")]
    pub session_name: String,
    /// Download root.
    #[serde(rename = "PATH_DOWNLOAD", default = "default_download_dir")]
    pub download_dir: PathBuf,
    /// Gateway base URL.
    #[serde(rename = "SERVICE_URL", default = "default_service_url")]
    pub service_url: String,
    /// Attempts per message.
    #[serde(rename = "MAX_ATTEMPTS", default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Re-attempt rate-limited messages after the wait.
    #[serde(rename = "RETRY_RATE_LIMITED", default)]
    pub retry_rate_limited: bool,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_id", &self.api_id)
            .field("api_hash", &"<redacted>")
            .field("session_name", &self.session_name)
            .field("download_dir", &self.download_dir)
            .field("service_url", &self.service_url)
            .field("max_attempts", &self.max_attempts)
            .field("retry_rate_limited", &self.retry_rate_limited)
            .finish()
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Replaces `PATH_DOWNLOAD`.
    pub download_dir: Option<PathBuf>,
    /// Replaces `MAX_ATTEMPTS`.
    pub max_attempts: Option<u32>,
    /// Forces `RETRY_RATE_LIMITED` on when set.
    pub retry_rate_limited: bool,
}

impl AppConfig {
    /// Reads, parses and validates the config file at `path`.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, is not valid JSON, lacks a
    /// required key, or holds an out-of-range value.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_json(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!(path = %path.display(), ?config, "config loaded");
        Ok(config)
    }

    /// Parses and validates a JSON document.
    ///
    /// # Errors
    ///
    /// Same as [`AppConfig::load`], minus file access.
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Validates config values.
    ///
    /// # Errors
    ///
    /// Returns a message naming the offending key and the expected values.
    pub fn validate(&self) -> Result<()> {
        if self.api_hash.trim().is_empty() {
            bail!("Invalid config value for `API_HASH`: must not be empty");
        }
        if self.session_name.trim().is_empty() {
            bail!("Invalid config value for `SESSION_NAME`: must not be empty");
        }
        if !(1..=MAX_CONFIGURABLE_ATTEMPTS).contains(&self.max_attempts) {
            bail!(
                "Invalid config value for `MAX_ATTEMPTS`: {}. Expected range: 1..={MAX_CONFIGURABLE_ATTEMPTS}",
                self.max_attempts
            );
        }
        if self.download_dir.as_os_str().is_empty() {
            bail!("Invalid config value for `PATH_DOWNLOAD`: must not be empty");
        }
        match Url::parse(&self.service_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => bail!(
                "Invalid config value for `SERVICE_URL`: {}. Expected an http(s) URL",
                self.service_url
            ),
        }
        Ok(())
    }

    /// Applies command-line overrides and re-validates.
    ///
    /// # Errors
    ///
    /// Fails when an override is out of range.
    pub fn apply(&mut self, overrides: &ConfigOverrides) -> Result<()> {
        if let Some(dir) = &overrides.download_dir {
            self.download_dir.clone_from(dir);
        }
        if let Some(max_attempts) = overrides.max_attempts {
            self.max_attempts = max_attempts;
        }
        if overrides.retry_rate_limited {
            self.retry_rate_limited = true;
        }
        self.validate()
    }

    /// Retry policy described by this config.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_max_attempts(self.max_attempts).retry_rate_limited(self.retry_rate_limited)
    }

    /// Credentials for the gateway.
    #[must_use]
    pub fn credentials(&self) -> ServiceCredentials {
        ServiceCredentials {
            api_id: self.api_id,
            api_hash: self.api_hash.clone(),
            session_name: self.session_name.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{"API_ID": 12345, "API_HASH": "abc123", "SESSION_NAME": "media"}"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = AppConfig::from_json(MINIMAL).unwrap();
        assert_eq!(config.api_id, 12345);
        assert_eq!(config.download_dir, PathBuf::from("."));
        assert_eq!(config.service_url, DEFAULT_SERVICE_URL);
        assert_eq!(config.max_attempts, 1);
        assert!(!config.retry_rate_limited);
    }

    #[test]
    fn test_full_config() {
        let config = AppConfig::from_json(
            r#"{
                "API_ID": "777",
                "API_HASH": "abc",
                "SESSION_NAME": "s",
                "PATH_DOWNLOAD": "/data/media",
                "SERVICE_URL": "https://gw.local:9000/base",
                "MAX_ATTEMPTS": 4,
                "RETRY_RATE_LIMITED": true,
                "UNRELATED": "ignored"
            }"#,
        )
        .unwrap();
        assert_eq!(config.api_id, 777);
        assert_eq!(config.download_dir, PathBuf::from("/data/media"));
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts(), 4);
        assert!(policy.retries_rate_limited());
    }

    #[test]
    fn test_missing_required_key_is_reported() {
        let err = AppConfig::from_json(r#"{"API_ID": 1, "API_HASH": "x"}"#).unwrap_err();
        assert!(format!("{err:#}").contains("SESSION_NAME"), "got: {err:#}");
    }

    #[test]
    fn test_non_numeric_api_id_is_rejected() {
        let err = AppConfig::from_json(r#"{"API_ID": "abc", "API_HASH": "x", "SESSION_NAME": "s"}"#)
            .unwrap_err();
        assert!(format!("{err:#}").contains("API_ID"), "got: {err:#}");
    }

    #[test]
    fn test_empty_hash_is_rejected() {
        let err = AppConfig::from_json(r#"{"API_ID": 1, "API_HASH": " ", "SESSION_NAME": "s"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("API_HASH"));
    }

    #[test]
    fn test_max_attempts_range() {
        let json = r#"{"API_ID": 1, "API_HASH": "x", "SESSION_NAME": "s", "MAX_ATTEMPTS": 11}"#;
        let err = AppConfig::from_json(json).unwrap_err();
        assert!(err.to_string().contains("Expected range: 1..=10"), "got: {err}");
    }

    #[test]
    fn test_bad_service_url() {
        let json = r#"{"API_ID": 1, "API_HASH": "x", "SESSION_NAME": "s", "SERVICE_URL": "ftp://x"}"#;
        let err = AppConfig::from_json(json).unwrap_err();
        assert!(err.to_string().contains("SERVICE_URL"));
    }

    #[test]
    fn test_overrides_take_precedence() {
        let mut config = AppConfig::from_json(MINIMAL).unwrap();
        config
            .apply(&ConfigOverrides {
                download_dir: Some(PathBuf::from("/tmp/out")),
                max_attempts: Some(3),
                retry_rate_limited: true,
            })
            .unwrap();
        assert_eq!(config.download_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.max_attempts, 3);
        assert!(config.retry_rate_limited);
    }

    #[test]
    fn test_out_of_range_override_is_rejected() {
        let mut config = AppConfig::from_json(MINIMAL).unwrap();
        let result = config.apply(&ConfigOverrides {
            max_attempts: Some(0),
            ..ConfigOverrides::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let err = AppConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, MINIMAL).unwrap();
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.session_name, "media");
        assert!(!format!("{config:?}").contains("abc123"));
        assert_eq!(config.credentials().api_hash, "abc123");
    }
}
