use std::path::Path;
use std::time::Duration;

use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub polling: PollingConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

/// Backend REST API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api/".to_string(),
            timeout_seconds: 10,
        }
    }
}

/// Intervals for the viewer and comment synchronizers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub viewer_interval_seconds: u64,
    pub comment_interval_seconds: u64,
    /// Probe cadence while waiting for the backend to assign a stream id.
    pub room_resolve_probe_seconds: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            viewer_interval_seconds: 5,
            comment_interval_seconds: 5,
            room_resolve_probe_seconds: 1,
        }
    }
}

impl PollingConfig {
    #[must_use]
    pub const fn viewer_interval(&self) -> Duration {
        Duration::from_secs(at_least_one(self.viewer_interval_seconds))
    }

    #[must_use]
    pub const fn comment_interval(&self) -> Duration {
        Duration::from_secs(at_least_one(self.comment_interval_seconds))
    }

    #[must_use]
    pub const fn room_resolve_probe_interval(&self) -> Duration {
        Duration::from_secs(at_least_one(self.room_resolve_probe_seconds))
    }
}

/// A zero period would panic inside `tokio::time::interval`; misconfigured
/// intervals clamp to one second instead.
const fn at_least_one(secs: u64) -> u64 {
    if secs == 0 {
        1
    } else {
        secs
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_profiles: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_profiles: 4096 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided)
    /// 3. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        // Override with environment variables (GEOLIVE_API_BASE_URL, etc.)
        builder = builder.add_source(
            Environment::with_prefix("GEOLIVE")
                .separator("_")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load from environment variables only.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from file path
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.api.base_url.is_empty());
        assert_eq!(config.api.timeout_seconds, 10);
        assert_eq!(config.polling.viewer_interval(), Duration::from_secs(5));
        assert_eq!(config.polling.comment_interval(), Duration::from_secs(5));
        assert_eq!(
            config.polling.room_resolve_probe_interval(),
            Duration::from_secs(1)
        );
        assert!(config.cache.max_profiles > 0);
    }

    #[test]
    fn test_zero_intervals_clamp_to_one_second() {
        let polling = PollingConfig {
            viewer_interval_seconds: 0,
            comment_interval_seconds: 0,
            room_resolve_probe_seconds: 0,
        };
        assert_eq!(polling.viewer_interval(), Duration::from_secs(1));
        assert_eq!(polling.comment_interval(), Duration::from_secs(1));
        assert_eq!(polling.room_resolve_probe_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = Config::load(Some("/nonexistent/geolive.yaml")).unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "pretty");
    }
}
