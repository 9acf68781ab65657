//! On-disk and environment configuration
//!
//! Read from `<config_dir>/schedule-triage/config.toml` when present; every
//! key is optional. `INTERCOM_TOKEN` and `INTERCOM_BASE_URL` override the
//! file and are read after `.env` has been loaded.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::{ConcurrencyConfig, DEFAULT_BASE_URL, ResilienceConfig, RetryConfig};

pub const APP_DIR: &str = "schedule-triage";
pub const CONFIG_FILE: &str = "config.toml";
pub const TOKEN_ENV: &str = "INTERCOM_TOKEN";
pub const BASE_URL_ENV: &str = "INTERCOM_BASE_URL";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub intercom: IntercomSection,
    pub batch: BatchSection,
    pub retry: RetrySection,
    pub export: ExportSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntercomSection {
    pub base_url: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSection {
    pub group_size: Option<usize>,
    /// Groups allowed in flight at once
    pub concurrency: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_attempts: Option<u32>,
    pub backoff_unit_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSection {
    pub directory: Option<PathBuf>,
}

/// `<config_dir>/schedule-triage/config.toml`
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

impl Config {
    /// Defaults, then the config file if it exists, then the environment
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = match config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };

        Ok(config.with_env(|key| std::env::var(key).ok()))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment overrides through `lookup`
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(token) = lookup(TOKEN_ENV).filter(|t| !t.trim().is_empty()) {
            self.intercom.token = Some(token);
        }
        if let Some(url) = lookup(BASE_URL_ENV).filter(|u| !u.trim().is_empty()) {
            self.intercom.base_url = Some(url);
        }
        self
    }

    pub fn base_url(&self) -> &str {
        self.intercom.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn token(&self) -> Option<&str> {
        self.intercom.token.as_deref().filter(|t| !t.trim().is_empty())
    }

    pub fn export_dir(&self) -> PathBuf {
        self.export.directory.clone().unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR)
                .join("exports")
        })
    }

    pub fn resilience(&self) -> ResilienceConfig {
        let retry_defaults = RetryConfig::default();
        let concurrency_defaults = ConcurrencyConfig::default();

        ResilienceConfig::builder()
            .max_attempts(self.retry.max_attempts.unwrap_or(retry_defaults.max_attempts))
            .backoff_unit(
                self.retry
                    .backoff_unit_ms
                    .map(Duration::from_millis)
                    .unwrap_or(retry_defaults.backoff_unit),
            )
            .group_size(self.batch.group_size.unwrap_or(concurrency_defaults.group_size))
            .max_in_flight_groups(
                self.batch
                    .concurrency
                    .unwrap_or(concurrency_defaults.max_in_flight_groups),
            )
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.token(), None);
        assert_eq!(config.resilience(), ResilienceConfig::default());
    }

    #[test]
    fn test_partial_config() {
        let config = Config::from_toml_str(
            r#"
            [intercom]
            token = "tok_file"

            [batch]
            group_size = 5
            concurrency = 2

            [retry]
            backoff_unit_ms = 250

            [export]
            directory = "/tmp/exports"
            "#,
        )
        .unwrap();

        let resilience = config.resilience();
        assert_eq!(resilience.concurrency.group_size, 5);
        assert_eq!(resilience.concurrency.max_in_flight_groups, 2);
        assert_eq!(resilience.retry.max_attempts, 6);
        assert_eq!(resilience.retry.backoff_unit, Duration::from_millis(250));
        assert_eq!(config.token(), Some("tok_file"));
        assert_eq!(config.export_dir(), PathBuf::from("/tmp/exports"));
    }

    #[test]
    fn test_env_overrides_file() {
        let config = Config::from_toml_str("[intercom]\ntoken = \"tok_file\"\n")
            .unwrap()
            .with_env(|key| match key {
                TOKEN_ENV => Some("tok_env".to_string()),
                BASE_URL_ENV => Some("   ".to_string()),
                _ => None,
            });

        assert_eq!(config.token(), Some("tok_env"));
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[intercom]\nbase_url = \"http://localhost:9000\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.base_url(), "http://localhost:9000");
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(Config::from_toml_str("[batch]\ngroup_size = \"lots\"").is_err());
    }
}
