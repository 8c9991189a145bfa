//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/tbanalyzer/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/tbanalyzer/` (~/.config/tbanalyzer/)
//! - Data: `$XDG_DATA_HOME/tbanalyzer/` (~/.local/share/tbanalyzer/)
//! - State/Logs: `$XDG_STATE_HOME/tbanalyzer/` (~/.local/state/tbanalyzer/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Metric computation settings
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Result bundle cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Chart rendering defaults
    #[serde(default)]
    pub chart: ChartDefaults,

    /// Report rendering defaults
    #[serde(default)]
    pub report: ReportDefaults,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metric computation settings
#[derive(Debug, Deserialize)]
pub struct AnalysisConfig {
    /// Added to rarity before dividing value by it
    #[serde(default = "default_efficiency_epsilon")]
    pub efficiency_epsilon: f64,

    /// Log every empty or failed view at debug level
    #[serde(default)]
    pub debug: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            efficiency_epsilon: default_efficiency_epsilon(),
            debug: false,
        }
    }
}

fn default_efficiency_epsilon() -> f64 {
    0.1
}

/// Storage backend for cached result bundles
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Process-local map, lost on exit
    Memory,
    /// SQLite file under the data directory
    Sqlite,
    /// Never caches
    None,
}

/// Result bundle cache settings
#[derive(Debug, Deserialize)]
pub struct CacheConfig {
    /// Enable/disable caching entirely
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// Where cached bundles live
    #[serde(default = "default_cache_backend")]
    pub backend: CacheBackend,

    /// Override for the cache directory
    pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            backend: default_cache_backend(),
            path: None,
        }
    }
}

impl CacheConfig {
    /// Backend actually in effect once `enabled` is taken into account.
    pub fn effective_backend(&self) -> CacheBackend {
        if self.enabled {
            self.backend
        } else {
            CacheBackend::None
        }
    }

    /// Directory holding the on-disk cache.
    pub fn dir(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(Config::cache_dir)
    }
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_backend() -> CacheBackend {
    CacheBackend::Sqlite
}

/// Chart rendering defaults
#[derive(Debug, Deserialize)]
pub struct ChartDefaults {
    /// Figure width in pixels
    #[serde(default = "default_chart_width")]
    pub width: u32,

    /// Figure height in pixels
    #[serde(default = "default_chart_height")]
    pub height: u32,

    /// Number of categories shown on bar/line charts
    #[serde(default = "default_chart_top_n")]
    pub top_n: usize,

    /// Slices shown before the rest collapse into "Others"
    #[serde(default = "default_pie_max_categories")]
    pub pie_max_categories: usize,
}

impl Default for ChartDefaults {
    fn default() -> Self {
        Self {
            width: default_chart_width(),
            height: default_chart_height(),
            top_n: default_chart_top_n(),
            pie_max_categories: default_pie_max_categories(),
        }
    }
}

fn default_chart_width() -> u32 {
    800
}

fn default_chart_height() -> u32 {
    480
}

fn default_chart_top_n() -> usize {
    10
}

fn default_pie_max_categories() -> usize {
    8
}

/// Report rendering defaults
#[derive(Debug, Deserialize)]
pub struct ReportDefaults {
    /// Document title
    #[serde(default = "default_report_title")]
    pub title: String,

    /// Maximum rows per table section
    #[serde(default = "default_table_rows")]
    pub table_rows: usize,
}

impl Default for ReportDefaults {
    fn default() -> Self {
        Self {
            title: default_report_title(),
            table_rows: default_table_rows(),
        }
    }
}

fn default_report_title() -> String {
    "Total Battle Chest Analysis".to_string()
}

fn default_table_rows() -> usize {
    25
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate value ranges, returning an error message if invalid
    pub fn validate(&self) -> Result<()> {
        let epsilon = self.analysis.efficiency_epsilon;
        if !epsilon.is_finite() || epsilon <= 0.0 {
            return Err(Error::Config(
                "analysis.efficiency_epsilon must be a positive number".to_string(),
            ));
        }
        if self.chart.width == 0 || self.chart.height == 0 {
            return Err(Error::Config(
                "chart.width and chart.height must be greater than 0".to_string(),
            ));
        }
        if self.chart.top_n == 0 {
            return Err(Error::Config(
                "chart.top_n must be greater than 0".to_string(),
            ));
        }
        if self.chart.pie_max_categories == 0 {
            return Err(Error::Config(
                "chart.pie_max_categories must be greater than 0".to_string(),
            ));
        }
        if self.report.table_rows == 0 {
            return Err(Error::Config(
                "report.table_rows must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/tbanalyzer/config.toml` (~/.config/tbanalyzer/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("tbanalyzer").join("config.toml")
    }

    /// Returns the data directory path
    ///
    /// `$XDG_DATA_HOME/tbanalyzer/` (~/.local/share/tbanalyzer/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("tbanalyzer")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/tbanalyzer/` (~/.local/state/tbanalyzer/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("tbanalyzer")
    }

    /// Returns the default analysis cache directory
    ///
    /// `$XDG_DATA_HOME/tbanalyzer/analysis_cache/`
    pub fn cache_dir() -> PathBuf {
        Self::data_dir().join("analysis_cache")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/tbanalyzer/tbanalyzer.log` (~/.local/state/tbanalyzer/tbanalyzer.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("tbanalyzer.log")
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// This is mainly for CLI binaries that want explicit, stable path behavior
    /// before invoking other components that read these env vars.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_DATA_HOME").is_err() {
            std::env::set_var("XDG_DATA_HOME", home.join(".local/share"));
        }

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.analysis.efficiency_epsilon, 0.1);
        assert!(!config.analysis.debug);
        assert_eq!(config.cache.effective_backend(), CacheBackend::Sqlite);
        assert_eq!(config.chart.pie_max_categories, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[analysis]
efficiency_epsilon = 0.25
debug = true

[cache]
backend = "memory"

[chart]
top_n = 5

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.analysis.efficiency_epsilon, 0.25);
        assert!(config.analysis.debug);
        assert_eq!(config.cache.backend, CacheBackend::Memory);
        assert_eq!(config.chart.top_n, 5);
        assert_eq!(config.chart.width, 800);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_disabled_cache_has_no_backend() {
        let toml = r#"
[cache]
enabled = false
backend = "sqlite"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.cache.effective_backend(), CacheBackend::None);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let config = Config {
            analysis: AnalysisConfig {
                efficiency_epsilon: 0.0,
                debug: false,
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            chart: ChartDefaults {
                pie_max_categories: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[report]\ntitle = \"Clan Weekly\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.report.title, "Clan Weekly");
        assert_eq!(config.report.table_rows, 25);

        std::fs::write(&path, "[chart]\nwidth = 0\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }
}
