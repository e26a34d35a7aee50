//! Sentinel Configuration - server, remote scorer, sampling and history tunables
//!
//! Each section implements `Default` with the values in [`super::defaults`], so
//! a missing file or a partial file behaves exactly like the built-in setup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use super::defaults;

/// Environment variable naming a config file.
pub const CONFIG_PATH_ENV: &str = "TURBINE_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "turbine_config.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a sentinel deployment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentinelConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub sampling: SamplingConfig,

    #[serde(default)]
    pub history: HistoryConfig,
}

impl SentinelConfig {
    /// Load configuration using the standard search order, then apply
    /// environment overrides:
    /// 1. `$TURBINE_CONFIG`
    /// 2. `./turbine_config.toml`
    /// 3. Built-in defaults
    pub fn load() -> Self {
        let mut config = Self::load_file_or_default();
        config.apply_env_overrides();
        config
    }

    fn load_file_or_default() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from {}", CONFIG_PATH_ENV);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_PATH_ENV);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_PATH_ENV);
            }
        }

        // 2. Check ./turbine_config.toml
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        // 3. Defaults
        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config = Self::from_toml(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })?;
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// `TURBINE_SERVER_ADDR` and `TURBINE_REMOTE_URL` win over the file.
    fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("TURBINE_SERVER_ADDR") {
            if !addr.trim().is_empty() {
                self.server.addr = addr;
            }
        }
        if let Ok(url) = std::env::var("TURBINE_REMOTE_URL") {
            self.remote.base_url = if url.trim().is_empty() { None } else { Some(url) };
        }
    }

    /// Check every section and report all problems at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        if self.server.addr.trim().is_empty() {
            errors.push("server.addr must not be empty".to_string());
        }
        if self.sampling.interval_ms == 0 {
            errors.push("sampling.interval_ms must be > 0".to_string());
        }
        if self.history.capacity == 0 {
            errors.push("history.capacity must be > 0".to_string());
        }
        if self.remote.timeout_ms == 0 {
            errors.push("remote.timeout_ms must be > 0".to_string());
        }
        if let Some(url) = &self.remote.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                errors.push(format!(
                    "remote.base_url must start with http:// or https:// (got '{url}')"
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Sections
// ============================================================================

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: defaults::SERVER_ADDR.to_string(),
        }
    }
}

/// Remote scoring service. With no `base_url` every prediction is local.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: Option<String>,
    pub timeout_ms: u64,
    pub fallback_delay_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: defaults::REMOTE_TIMEOUT_MS,
            fallback_delay_ms: defaults::FALLBACK_DELAY_MS,
        }
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn fallback_delay(&self) -> Duration {
        Duration::from_millis(self.fallback_delay_ms)
    }
}

/// Sampling Loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub interval_ms: u64,
    /// Seed for perturbation and scoring noise; entropy when absent.
    pub seed: Option<u64>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_ms: defaults::SAMPLING_INTERVAL_MS,
            seed: None,
        }
    }
}

impl SamplingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// History Store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: defaults::HISTORY_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = SentinelConfig::from_toml("").expect("empty TOML should parse");
        assert_eq!(config, SentinelConfig::default());
        assert_eq!(config.sampling.interval(), Duration::from_millis(3_000));
        assert_eq!(config.remote.timeout(), Duration::from_millis(10_000));
        assert_eq!(config.remote.fallback_delay(), Duration::from_millis(1_500));
        assert_eq!(config.history.capacity, 50);
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let toml_str = r#"
            [remote]
            base_url = "http://scorer:8000"

            [sampling]
            seed = 7
        "#;
        let config = SentinelConfig::from_toml(toml_str).expect("partial TOML should parse");
        assert_eq!(config.remote.base_url.as_deref(), Some("http://scorer:8000"));
        assert_eq!(config.remote.timeout_ms, defaults::REMOTE_TIMEOUT_MS);
        assert_eq!(config.sampling.seed, Some(7));
        assert_eq!(config.sampling.interval_ms, defaults::SAMPLING_INTERVAL_MS);
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let toml_str = r#"
            [sampling]
            interval_ms = 0

            [history]
            capacity = 0

            [remote]
            base_url = "scorer:8000"
        "#;
        match SentinelConfig::from_toml(toml_str) {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors.len(), 3, "{errors:?}");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = SentinelConfig::default();
        config.remote.base_url = Some("https://scorer.example".to_string());
        config.sampling.seed = Some(1234);

        let toml_str = config.to_toml().expect("serialization should work");
        let back = SentinelConfig::from_toml(&toml_str).expect("deserialization should work");
        assert_eq!(back, config);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\naddr = \"127.0.0.1:9090\"").unwrap();

        let config = SentinelConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.server.addr, "127.0.0.1:9090");
    }

    #[test]
    fn test_load_from_file_reports_path_on_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\naddr = ").unwrap();

        match SentinelConfig::load_from_file(file.path()) {
            Err(ConfigError::Parse(path, _)) => assert_eq!(path, file.path()),
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
