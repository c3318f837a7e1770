//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.dtsinsight.toml` files.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = ".dtsinsight.toml";

/// Longest accepted recent-activity window.
pub const MAX_RECENT_WINDOW_DAYS: i64 = 36_500;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Remote prediction service settings.
    #[serde(default)]
    pub predictor: PredictorSettings,

    /// Analytics settings.
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Path of the JSON document store.
    #[serde(default = "default_store")]
    pub store: String,

    /// Number of concurrent backfill categorizations.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            store: default_store(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_store() -> String {
    "dts_documents.json".to_string()
}

fn default_concurrency() -> usize {
    4
}

/// Remote prediction service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictorSettings {
    /// Ask the remote service before falling back to keywords.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Prediction endpoint URL.
    #[serde(default = "default_predictor_url")]
    pub url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for PredictorSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            url: default_predictor_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_predictor_url() -> String {
    "http://localhost:5001/predict".to_string()
}

fn default_timeout() -> u64 {
    5
}

/// What happens to categories computed for uncategorized documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackfillMode {
    /// Used for the current response only.
    #[default]
    Ephemeral,
    /// Written back to the store.
    Persist,
}

/// Analytics settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default)]
    pub backfill: BackfillMode,

    /// Days counted as "recent", inclusive of the boundary.
    #[serde(default = "default_recent_window")]
    pub recent_window_days: i64,

    /// Newest documents included in the analytics payload.
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            backfill: BackfillMode::default(),
            recent_window_days: default_recent_window(),
            sample_size: default_sample_size(),
        }
    }
}

fn default_recent_window() -> i64 {
    7
}

fn default_sample_size() -> usize {
    10
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Check value ranges that the file format cannot express.
    pub fn validate(&self) -> Result<()> {
        let window = self.analytics.recent_window_days;
        if !(0..=MAX_RECENT_WINDOW_DAYS).contains(&window) {
            bail!(
                "analytics.recent_window_days must be between 0 and {}, got {}",
                MAX_RECENT_WINDOW_DAYS,
                window
            );
        }
        if self.general.concurrency == 0 {
            bail!("general.concurrency must be at least 1");
        }
        if self.predictor.timeout_seconds == 0 {
            bail!("predictor.timeout_seconds must be at least 1");
        }
        Ok(())
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings and only
    /// override when given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref store) = args.store {
            self.general.store = store.display().to_string();
        }
        if let Some(concurrency) = args.concurrency {
            self.general.concurrency = concurrency;
        }

        if let Some(ref url) = args.predict_url {
            self.predictor.url = url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.predictor.timeout_seconds = timeout;
        }
        if args.no_remote {
            self.predictor.enabled = false;
        }

        if let Some(backfill) = args.backfill {
            self.analytics.backfill = backfill;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.store, "dts_documents.json");
        assert_eq!(config.general.concurrency, 4);
        assert!(config.predictor.enabled);
        assert_eq!(config.predictor.url, "http://localhost:5001/predict");
        assert_eq!(config.predictor.timeout_seconds, 5);
        assert_eq!(config.analytics.backfill, BackfillMode::Ephemeral);
        assert_eq!(config.analytics.recent_window_days, 7);
        assert_eq!(config.analytics.sample_size, 10);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
store = "/var/lib/dts/documents.json"

[predictor]
enabled = false
timeout_seconds = 2

[analytics]
backfill = "persist"
sample_size = 5
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.store, "/var/lib/dts/documents.json");
        assert_eq!(config.general.concurrency, 4);
        assert!(!config.predictor.enabled);
        assert_eq!(config.predictor.url, "http://localhost:5001/predict");
        assert_eq!(config.predictor.timeout_seconds, 2);
        assert_eq!(config.analytics.backfill, BackfillMode::Persist);
        assert_eq!(config.analytics.recent_window_days, 7);
        assert_eq!(config.analytics.sample_size, 5);
    }

    #[test]
    fn test_unknown_backfill_mode_is_rejected() {
        let result: std::result::Result<Config, _> =
            toml::from_str("[analytics]\nbackfill = \"sometimes\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[predictor]"));
        assert!(toml_str.contains("[analytics]"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.analytics.backfill, BackfillMode::Ephemeral);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "[general]\nconcurrency = 8\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.general.concurrency, 8);
        assert!(Config::load(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);

        std::fs::write(&path, "[analytics]\nrecent_window_days = 200000000\n").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("recent_window_days"));

        std::fs::write(&path, "[analytics]\nrecent_window_days = -1\n").unwrap();
        assert!(Config::load(&path).is_err());

        std::fs::write(&path, "[general]\nconcurrency = 0\n").unwrap();
        assert!(Config::load(&path).is_err());

        assert!(Config::default().validate().is_ok());
    }
}
