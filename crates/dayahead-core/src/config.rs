use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

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

    /// All errors joined on one line
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the SQLite cache files
    pub data_dir: PathBuf,

    #[serde(default)]
    pub weather: WeatherConfig,

    #[serde(default)]
    pub news: NewsConfig,

    #[serde(default)]
    pub fun_fact: FunFactConfig,

    #[serde(default)]
    pub calendar: CalendarConfig,

    #[serde(default)]
    pub geocoding: GeocodingConfig,

    #[serde(default)]
    pub refresh: RefreshConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Open-Meteo base URL
    pub base_url: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.open-meteo.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    /// Base URL of the headline feed
    pub base_url: String,

    /// Category shown in the view state and used for the summary headline
    #[serde(default = "default_news_category")]
    pub category: String,
}

fn default_news_category() -> String {
    "US".to_string()
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://saurav.tech/NewsAPI".to_string(),
            category: default_news_category(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunFactConfig {
    pub base_url: String,

    #[serde(default = "default_fun_fact_language")]
    pub language: String,
}

fn default_fun_fact_language() -> String {
    "en".to_string()
}

impl Default for FunFactConfig {
    fn default() -> Self {
        Self {
            base_url: "https://uselessfacts.jsph.pl".to_string(),
            language: default_fun_fact_language(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Maximum number of events kept in the cache
    #[serde(default = "default_max_events")]
    pub max_events: usize,

    /// Look-ahead window in hours
    #[serde(default = "default_window_hours")]
    pub window_hours: i64,

    /// Calendar to read events from
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,

    /// Environment variable holding the calendar access token. When the
    /// variable is unset, calendar access is treated as not granted.
    #[serde(default = "default_token_env")]
    pub access_token_env: String,
}

fn default_max_events() -> usize {
    3
}

fn default_window_hours() -> i64 {
    24
}

fn default_calendar_id() -> String {
    "primary".to_string()
}

fn default_token_env() -> String {
    "DAYAHEAD_CALENDAR_TOKEN".to_string()
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            max_events: default_max_events(),
            window_hours: default_window_hours(),
            calendar_id: default_calendar_id(),
            access_token_env: default_token_env(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// Nominatim reverse-geocoding endpoint
    pub reverse_url: String,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            reverse_url: "https://nominatim.openstreetmap.org/reverse".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Periodic refresh interval in minutes
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u32,

    /// Retries after a failed cycle before falling back to the interval
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First retry delay in seconds (doubles each attempt)
    #[serde(default = "default_initial_backoff_secs")]
    pub initial_backoff_secs: u64,

    /// Upper bound on retry delay in seconds
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,
}

fn default_interval_minutes() -> u32 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_secs() -> u64 {
    30
}

fn default_max_backoff_secs() -> u64 {
    600
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
            max_retries: default_max_retries(),
            initial_backoff_secs: default_initial_backoff_secs(),
            max_backoff_secs: default_max_backoff_secs(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dayahead");

        Self {
            data_dir,
            weather: WeatherConfig::default(),
            news: NewsConfig::default(),
            fun_fact: FunFactConfig::default(),
            calendar: CalendarConfig::default(),
            geocoding: GeocodingConfig::default(),
            refresh: RefreshConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific file, writing defaults if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Warnings are logged; errors fail the load.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.weather.base_url, "weather.base_url", &mut result);
        self.validate_url(&self.news.base_url, "news.base_url", &mut result);
        self.validate_url(&self.fun_fact.base_url, "fun_fact.base_url", &mut result);
        self.validate_url(&self.geocoding.reverse_url, "geocoding.reverse_url", &mut result);

        if self.news.category.trim().is_empty() {
            result.add_error("news.category", "Category must not be empty");
        }

        if self.fun_fact.language.trim().is_empty() {
            result.add_error("fun_fact.language", "Language must not be empty");
        }

        if !(1..=5).contains(&self.calendar.max_events) {
            result.add_error("calendar.max_events", "Must be between 1 and 5");
        }

        if self.calendar.window_hours <= 0 {
            result.add_error("calendar.window_hours", "Window must be positive");
        } else if self.calendar.window_hours != 24 {
            result.add_warning(
                "calendar.window_hours",
                "Summary wording assumes a 24 hour window",
            );
        }

        if self.refresh.interval_minutes == 0 {
            result.add_warning(
                "refresh.interval_minutes",
                "Periodic refresh disabled (0 minutes)",
            );
        } else if self.refresh.interval_minutes > 1440 {
            result.add_warning(
                "refresh.interval_minutes",
                "Refresh interval is more than 24 hours",
            );
        }

        if self.refresh.initial_backoff_secs > self.refresh.max_backoff_secs {
            result.add_error(
                "refresh.initial_backoff_secs",
                "Initial backoff exceeds the maximum backoff",
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

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Path of a cache file inside the data directory
    pub fn cache_path(&self, file_name: &str) -> PathBuf {
        self.data_dir.join(file_name)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("dayahead");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_invalid_url() {
        let mut config = Config::default();
        config.weather.base_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "weather.base_url"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.news.base_url = "ftp://localhost:8080".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_max_events_bounds() {
        let mut config = Config::default();
        config.calendar.max_events = 0;
        assert!(!config.validate().is_valid());

        config.calendar.max_events = 6;
        assert!(!config.validate().is_valid());

        config.calendar.max_events = 5;
        assert!(config.validate().is_valid());
    }

    #[test]
    fn test_zero_interval_is_warning() {
        let mut config = Config::default();
        config.refresh.interval_minutes = 0;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "refresh.interval_minutes"));
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.news.category, "US");

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.calendar.max_events, config.calendar.max_events);
        assert_eq!(reloaded.data_dir, config.data_dir);
    }

    #[test]
    fn test_partial_file_uses_section_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "data_dir = \"/tmp/dayahead\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/dayahead"));
        assert_eq!(config.refresh.max_retries, 3);
        assert_eq!(config.fun_fact.language, "en");
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
