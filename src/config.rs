//! Tool configuration
//!
//! Values come from an optional TOML file, then from `ZONECTL_*` environment
//! variables. Command line flags are applied last by the binary.

use std::fmt;
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::api::retry::RetryConfig;
use crate::dns::bulk::BatchSize;

pub const ENV_ZONES_BATCH_SIZE: &str = "ZONECTL_ZONES_BATCH_SIZE";

/// A configuration value that cannot be used
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub parameter: String,
    pub value: String,
    pub reason: String,
    pub suggestion: String,
}

impl ConfigError {
    pub fn invalid(parameter: &str, value: &str, reason: &str) -> Self {
        ConfigError {
            parameter: parameter.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
            suggestion: format!("Fix or unset {}", parameter),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Configuration error: {}='{}' - {}. {}",
            self.parameter, self.value, self.reason, self.suggestion
        )
    }
}

impl std::error::Error for ConfigError {}

/// On-disk layout; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    host: Option<String>,
    api_key: Option<String>,
    zones_batch_size: Option<usize>,
    timeout_secs: Option<u64>,
    retry_max: Option<u32>,
    retry_wait_min: Option<u64>,
    retry_wait_max: Option<u64>,
    retry_disabled: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolConfig {
    /// Base URL of the management API
    pub host: Option<String>,
    /// Value sent in the `X-API-Key` header
    pub api_key: Option<String>,
    /// Maximum zones per bulk create request
    pub zones_batch_size: BatchSize,
    /// Per-request timeout
    pub timeout_secs: u64,
    pub retry: RetryConfig,
}

impl Default for ToolConfig {
    fn default() -> Self {
        ToolConfig {
            host: None,
            api_key: None,
            zones_batch_size: BatchSize::default(),
            timeout_secs: 30,
            retry: RetryConfig::default(),
        }
    }
}

impl ToolConfig {
    /// Loads `path` if given, then applies the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_from(|key| std::env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError {
            parameter: "config".to_string(),
            value: path.display().to_string(),
            reason: e.to_string(),
            suggestion: "Check that the file exists and is readable".to_string(),
        })?;
        Self::from_toml(&raw).map_err(|mut e| {
            if e.parameter == "config" {
                e.value = path.display().to_string();
            }
            e
        })
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(raw).map_err(|e| ConfigError {
            parameter: "config".to_string(),
            value: String::new(),
            reason: e.to_string(),
            suggestion: "Check the TOML syntax and key names".to_string(),
        })?;

        let mut config = ToolConfig {
            host: file.host,
            api_key: file.api_key,
            ..ToolConfig::default()
        };

        if let Some(size) = file.zones_batch_size {
            config.zones_batch_size = NonZeroUsize::new(size).map(BatchSize::from).ok_or_else(|| {
                ConfigError::invalid("zones_batch_size", "0", "batch size must be positive")
            })?;
        }
        if let Some(timeout) = file.timeout_secs {
            config.timeout_secs = timeout;
        }
        if let Some(max) = file.retry_max {
            config.retry.max_retries = max;
        }
        if let Some(min) = file.retry_wait_min {
            config.retry.initial_backoff = Duration::from_secs(min);
        }
        if let Some(max) = file.retry_wait_max {
            config.retry.max_backoff = Duration::from_secs(max);
        }
        if file.retry_disabled == Some(true) {
            config.retry.enabled = false;
        }

        Ok(config)
    }

    /// Overrides values from environment variables found through `lookup`.
    pub fn apply_env_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_ZONES_BATCH_SIZE) {
            self.zones_batch_size = raw.parse::<BatchSize>().map_err(|reason| ConfigError {
                parameter: ENV_ZONES_BATCH_SIZE.to_string(),
                value: raw.clone(),
                reason,
                suggestion: format!("Set {} to a positive integer or unset it", ENV_ZONES_BATCH_SIZE),
            })?;
            log::debug!("Bulk batch size overridden to {}", self.zones_batch_size);
        }

        self.retry = self.retry.apply_env(&lookup)?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ToolConfig::default().apply_env_from(env(&[])).unwrap();
        assert_eq!(config.zones_batch_size.get(), 1000);
        assert_eq!(config.timeout_secs, 30);
        assert!(config.retry.enabled);
    }

    #[test]
    fn test_batch_size_from_env() {
        let config = ToolConfig::default()
            .apply_env_from(env(&[(ENV_ZONES_BATCH_SIZE, "250")]))
            .unwrap();
        assert_eq!(config.zones_batch_size.get(), 250);
    }

    #[test]
    fn test_invalid_batch_size_is_fatal() {
        for bad in &["0", "-3", "many", ""] {
            let err = ToolConfig::default()
                .apply_env_from(env(&[(ENV_ZONES_BATCH_SIZE, bad)]))
                .unwrap_err();
            assert_eq!(err.parameter, ENV_ZONES_BATCH_SIZE);
            assert_eq!(err.value, *bad);
        }
    }

    #[test]
    fn test_toml_then_env() {
        let config = ToolConfig::from_toml(
            r#"
            host = "https://dns.example.net"
            api_key = "secret"
            zones_batch_size = 50
            timeout_secs = 10
            retry_max = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.host.as_deref(), Some("https://dns.example.net"));
        assert_eq!(config.zones_batch_size.get(), 50);
        assert_eq!(config.retry.max_retries, 2);

        let config = config
            .apply_env_from(env(&[(ENV_ZONES_BATCH_SIZE, "7")]))
            .unwrap();
        assert_eq!(config.zones_batch_size.get(), 7);
        assert_eq!(config.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_toml_rejects_unknown_keys() {
        let err = ToolConfig::from_toml("hots = \"typo\"").unwrap_err();
        assert_eq!(err.parameter, "config");
    }

    #[test]
    fn test_toml_zero_batch_size() {
        let err = ToolConfig::from_toml("zones_batch_size = 0").unwrap_err();
        assert_eq!(err.parameter, "zones_batch_size");
    }
}
