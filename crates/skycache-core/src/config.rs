use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

const DEFAULT_GEOCODING_URL: &str = "https://api.openweathermap.org/geo/1.0/direct";
const DEFAULT_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote provider endpoints
    #[serde(default)]
    pub openweather: OpenWeatherConfig,

    /// Per-key city cache settings
    #[serde(default)]
    pub cache: CacheConfig,
}

/// How a city cache keeps its entries up to date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RefreshMode {
    /// Refresh only when a lookup finds stale data.
    #[default]
    OnDemand,
    /// Refresh on lookup, and also in the background once the first lookup ran.
    Polling,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenWeatherConfig {
    /// Direct geocoding endpoint (city name to coordinates)
    #[serde(default = "default_geocoding_url")]
    pub geocoding_url: String,

    /// Current weather endpoint (coordinates to conditions)
    #[serde(default = "default_weather_url")]
    pub weather_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_geocoding_url() -> String {
    DEFAULT_GEOCODING_URL.to_string()
}

fn default_weather_url() -> String {
    DEFAULT_WEATHER_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    concat!("skycache/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for OpenWeatherConfig {
    fn default() -> Self {
        Self {
            geocoding_url: default_geocoding_url(),
            weather_url: default_weather_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl OpenWeatherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cities held per cache
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Age in seconds after which cached weather is fetched again
    #[serde(default = "default_freshness_secs")]
    pub freshness_secs: u64,

    /// Pause between background refresh cycles, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Mode used when a cache is requested without one
    #[serde(default)]
    pub default_mode: RefreshMode,
}

fn default_capacity() -> usize {
    10
}

fn default_freshness_secs() -> u64 {
    595
}

fn default_poll_interval_ms() -> u64 {
    1000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            freshness_secs: default_freshness_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            default_mode: RefreshMode::default(),
        }
    }
}

impl CacheConfig {
    pub fn freshness_window(&self) -> Duration {
        Duration::from_secs(self.freshness_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path, creating default if it doesn't exist
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            tracing::info!("No config at {}, writing defaults", config_path.display());
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(config_path)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        Self::load()?.into_validated()
    }

    /// Validate an already loaded configuration, logging warnings.
    pub fn into_validated(self) -> Result<(Self, ValidationResult)> {
        let validation = self.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((self, validation))
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(
            &self.openweather.geocoding_url,
            "openweather.geocoding_url",
            &mut result,
        );
        self.validate_url(
            &self.openweather.weather_url,
            "openweather.weather_url",
            &mut result,
        );

        if self.openweather.timeout_secs == 0 {
            result.add_error("openweather.timeout_secs", "Timeout must be greater than 0");
        }

        if self.cache.capacity == 0 {
            result.add_error("cache.capacity", "Capacity must be greater than 0");
        } else if self.cache.capacity > 1000 {
            result.add_warning("cache.capacity", "Capacity is unusually large (>1000)");
        }

        if self.cache.freshness_secs == 0 {
            result.add_warning(
                "cache.freshness_secs",
                "Freshness window is 0, every lookup will refetch",
            );
        }

        if self.cache.poll_interval_ms == 0 {
            result.add_error(
                "cache.poll_interval_ms",
                "Poll interval must be greater than 0",
            );
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if url.port() == Some(0) {
                    result.add_error(field_name, "Port cannot be 0");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(config_path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ConfigError::NotFound("platform config directory".to_string()))?
            .join("skycache");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_default_engine_constants() {
        let cache = CacheConfig::default();
        assert_eq!(cache.capacity, 10);
        assert_eq!(cache.freshness_window(), Duration::from_secs(595));
        assert_eq!(cache.poll_interval(), Duration::from_secs(1));
        assert_eq!(cache.default_mode, RefreshMode::OnDemand);
    }

    #[test]
    fn test_invalid_url() {
        let mut config = Config::default();
        config.openweather.weather_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "openweather.weather_url"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.openweather.geocoding_url = "ftp://localhost:8080/geo".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_zero_capacity_is_error() {
        let mut config = Config::default();
        config.cache.capacity = 0;
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "cache.capacity"));
    }

    #[test]
    fn test_zero_freshness_is_warning() {
        let mut config = Config::default();
        config.cache.freshness_secs = 0;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "cache.freshness_secs"));
    }

    #[test]
    fn test_zero_poll_interval_is_error() {
        let mut config = Config::default();
        config.cache.poll_interval_ms = 0;
        let result = config.validate();
        assert!(!result.is_valid());
        assert_eq!(result.error_summary(), "cache.poll_interval_ms: Poll interval must be greater than 0");
    }

    #[test]
    fn test_into_validated_rejects_errors() {
        let mut config = Config::default();
        config.openweather.timeout_secs = 0;
        let err = config.into_validated().unwrap_err();
        assert!(err.to_string().contains("openweather.timeout_secs"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [cache]
            default_mode = "polling"
            "#,
        )
        .unwrap();
        assert_eq!(config.cache.default_mode, RefreshMode::Polling);
        assert_eq!(config.cache.capacity, 10);
        assert_eq!(config.openweather.geocoding_url, DEFAULT_GEOCODING_URL);
    }

    #[test]
    fn test_load_from_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.cache.freshness_secs, 595);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.cache.capacity = 25;
        config.cache.default_mode = RefreshMode::Polling;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.cache.capacity, 25);
        assert_eq!(loaded.cache.default_mode, RefreshMode::Polling);
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[cache\ncapacity = ").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }
}
