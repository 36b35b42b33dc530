/*!
 * Configuration types for Fieldtrack
 */

use crate::error::{FieldtrackError, Result};
use fieldtrack_core_interface::{Accuracy, IndicatorText, TaskOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name under which the capture task is registered with the scheduler
pub const DEFAULT_TASK_NAME: &str = "background-location-task";

/// Path of the telemetry ingestion route on the backend
pub const DEFAULT_TELEMETRY_PATH: &str = "/api/telemetry/location";

/// Main configuration for the tracking host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Background task name (registration is idempotent per name)
    #[serde(default = "default_task_name")]
    pub task_name: String,

    /// Requested fix quality
    #[serde(default)]
    pub accuracy: Accuracy,

    /// Minimum time between captures in milliseconds
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,

    /// Minimum movement between delivered samples in meters (0 = time-based)
    #[serde(default)]
    pub distance_interval_m: f64,

    /// Title of the persistent tracking indicator
    #[serde(default = "default_indicator_title")]
    pub indicator_title: String,

    /// Body of the persistent tracking indicator
    #[serde(default = "default_indicator_body")]
    pub indicator_body: String,

    /// Backend base URL, e.g. `https://api.example.com`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Telemetry ingestion path appended to `base_url`
    #[serde(default = "default_telemetry_path")]
    pub telemetry_path: String,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Bearer token for the telemetry endpoint (None = unauthenticated)
    #[serde(default)]
    pub auth_token: Option<String>,

    /// How location permissions are answered on this host
    #[serde(default)]
    pub permissions: PermissionMode,

    /// Log level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stdout)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for log_level = debug)
    #[serde(default)]
    pub verbose: bool,

    /// Where location samples come from on this host
    #[serde(default)]
    pub source: SourceConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            task_name: default_task_name(),
            accuracy: Accuracy::High,
            min_interval_ms: default_min_interval_ms(),
            distance_interval_m: 0.0,
            indicator_title: default_indicator_title(),
            indicator_body: default_indicator_body(),
            base_url: default_base_url(),
            telemetry_path: default_telemetry_path(),
            request_timeout_ms: default_request_timeout_ms(),
            auth_token: None,
            permissions: PermissionMode::default(),
            log_level: LogLevel::default(),
            log_file: None,
            verbose: false,
            source: SourceConfig::default(),
        }
    }
}

/// Location source for hosts without a platform location service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    /// Fixed position (depot terminals, vehicle gateways with a known bay)
    Static {
        latitude: f64,
        longitude: f64,
        #[serde(default = "default_static_accuracy")]
        accuracy: f64,
        #[serde(default)]
        speed: f64,
    },
    /// Replay a JSON-lines file of recorded samples
    Replay { path: PathBuf },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Static {
            latitude: 0.0,
            longitude: 0.0,
            accuracy: default_static_accuracy(),
            speed: 0.0,
        }
    }
}

/// How permission requests are answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PermissionMode {
    /// Ask the operator on the terminal
    #[default]
    Prompt,
    /// Pre-approved (managed devices)
    Granted,
    /// Tracking disabled by policy
    Denied,
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

// Default value functions for serde
fn default_task_name() -> String {
    DEFAULT_TASK_NAME.to_string()
}

fn default_min_interval_ms() -> u64 {
    5_000
}

fn default_indicator_title() -> String {
    IndicatorText::default().title
}

fn default_indicator_body() -> String {
    IndicatorText::default().body
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_telemetry_path() -> String {
    DEFAULT_TELEMETRY_PATH.to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_static_accuracy() -> f64 {
    10.0
}

impl TrackerConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: TrackerConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a TOML file, creating parent directories
    pub fn to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Default location: `~/.fieldtrack/fieldtrack.toml`
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| FieldtrackError::Config("Could not determine home directory".into()))?;
        Ok(home.join(".fieldtrack").join("fieldtrack.toml"))
    }

    /// Load from `path`, or from the default location if it exists, or defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Self::default_path()?;
                if default.exists() {
                    Self::from_file(&default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.task_name.trim().is_empty() {
            return Err(FieldtrackError::Config("task_name must not be empty".into()));
        }

        self.task_options()
            .validate()
            .map_err(FieldtrackError::Config)?;

        if self.request_timeout_ms == 0 {
            return Err(FieldtrackError::Config(
                "request_timeout_ms must be greater than 0".into(),
            ));
        }

        self.telemetry_url()?;

        if let SourceConfig::Static {
            latitude,
            longitude,
            accuracy,
            ..
        } = &self.source
        {
            if !(-90.0..=90.0).contains(latitude) || !(-180.0..=180.0).contains(longitude) {
                return Err(FieldtrackError::Config(format!(
                    "static source coordinates out of range: {}, {}",
                    latitude, longitude
                )));
            }
            if *accuracy < 0.0 {
                return Err(FieldtrackError::Config(
                    "static source accuracy must not be negative".into(),
                ));
            }
        }

        Ok(())
    }

    /// Options the capture task is registered with
    pub fn task_options(&self) -> TaskOptions {
        TaskOptions {
            accuracy: self.accuracy,
            min_interval_ms: self.min_interval_ms,
            distance_interval_m: self.distance_interval_m,
            pause_automatically: false,
            show_persistent_indicator: true,
            indicator: IndicatorText {
                title: self.indicator_title.clone(),
                body: self.indicator_body.clone(),
            },
        }
    }

    /// Full telemetry endpoint URL
    pub fn telemetry_url(&self) -> Result<reqwest::Url> {
        let base = reqwest::Url::parse(&self.base_url)
            .map_err(|e| FieldtrackError::Config(format!("invalid base_url: {}", e)))?;
        base.join(&self.telemetry_path)
            .map_err(|e| FieldtrackError::Config(format!("invalid telemetry_path: {}", e)))
    }

    /// Per-request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = TrackerConfig::default();

        assert_eq!(config.task_name, DEFAULT_TASK_NAME);
        assert_eq!(config.accuracy, Accuracy::High);
        assert_eq!(config.min_interval_ms, 5_000);
        assert_eq!(config.distance_interval_m, 0.0);
        assert_eq!(config.permissions, PermissionMode::Prompt);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_task_options_match_tracking_profile() {
        let options = TrackerConfig::default().task_options();

        assert_eq!(options.accuracy, Accuracy::High);
        assert_eq!(options.min_interval_ms, 5_000);
        assert_eq!(options.distance_interval_m, 0.0);
        assert!(!options.pause_automatically);
        assert!(options.show_persistent_indicator);
    }

    #[test]
    fn test_telemetry_url() {
        let config = TrackerConfig {
            base_url: "https://api.example.com".to_string(),
            ..Default::default()
        };

        assert_eq!(
            config.telemetry_url().unwrap().as_str(),
            "https://api.example.com/api/telemetry/location"
        );
    }

    #[test]
    fn test_validation_failures() {
        let mut config = TrackerConfig {
            min_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        config.min_interval_ms = 5_000;

        config.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
        config.base_url = default_base_url();

        config.request_timeout_ms = 0;
        assert!(config.validate().is_err());
        config.request_timeout_ms = 10_000;

        config.source = SourceConfig::Static {
            latitude: 91.0,
            longitude: 0.0,
            accuracy: 5.0,
            speed: 0.0,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serialization_roundtrip_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("fieldtrack.toml");

        let config = TrackerConfig {
            auth_token: Some("secret".to_string()),
            source: SourceConfig::Replay {
                path: PathBuf::from("/var/lib/fieldtrack/route.jsonl"),
            },
            ..Default::default()
        };
        config.to_file(&path).unwrap();

        let loaded = TrackerConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_hand_written_config_file() {
        let toml_str = r#"
            base_url = "https://fsm.example.com"
            auth_token = "abc123"
            min_interval_ms = 15000
            permissions = "granted"
            log_level = "debug"

            [source]
            kind = "static"
            latitude = 12.9
            longitude = 77.6
        "#;

        let config: TrackerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.min_interval_ms, 15_000);
        assert_eq!(config.permissions, PermissionMode::Granted);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.task_name, DEFAULT_TASK_NAME);
        assert_eq!(
            config.source,
            SourceConfig::Static {
                latitude: 12.9,
                longitude: 77.6,
                accuracy: 10.0,
                speed: 0.0,
            }
        );
        assert!(config.validate().is_ok());
    }
}
