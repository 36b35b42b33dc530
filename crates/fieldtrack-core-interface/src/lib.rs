//! Fieldtrack Core Interface: Platform Ports
//!
//! This crate defines the boundary between the tracking pipeline and the
//! platform it runs on. Everything the pipeline cannot own itself is modeled
//! as a port:
//!
//! 1. **Permissions**: foreground and background location consent
//! 2. **Scheduling**: the durable background task registry ("is task X registered")
//! 3. **Location**: the source that produces sample batches for each invocation
//! 4. **Indicator**: the persistent user-visible "tracking is active" notice
//!
//! # Architecture
//!
//! ```text
//! application ──start()/stop()──> controller ──register()──> SchedulerPort
//!                                                               │
//!                                        LocationProvider <─────┤ (own cadence)
//!                                                               v
//!                                                   TaskHandler::handle(batch_or_error)
//! ```
//!
//! The scheduler, not the application, decides when a task runs. A handler
//! receives either a batch of samples or the platform error that prevented
//! one, and must return without propagating anything back.
//!
//! # Example
//!
//! ```rust,no_run
//! use fieldtrack_core_interface::{SchedulerPort, TaskHandler, TaskOptions};
//! use std::sync::Arc;
//!
//! async fn ensure_registered(
//!     scheduler: &dyn SchedulerPort,
//!     handler: Arc<dyn TaskHandler>,
//! ) -> fieldtrack_core_interface::Result<()> {
//!     if !scheduler.is_registered("background-location-task").await? {
//!         scheduler
//!             .register("background-location-task", TaskOptions::default(), handler)
//!             .await?;
//!     }
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Mean Earth radius used for great-circle distances, in meters
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

#[derive(Error, Debug)]
pub enum PortError {
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("Task already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Task not registered: {0}")]
    NotRegistered(String),

    #[error("Invalid task options: {0}")]
    InvalidOptions(String),
}

pub type Result<T> = std::result::Result<T, PortError>;

/// Platform-level failure delivered into a task invocation instead of a batch
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaskError {
    #[error("location permission revoked")]
    PermissionRevoked,

    #[error("location unavailable: {0}")]
    LocationUnavailable(String),

    #[error("platform error: {0}")]
    Platform(String),
}

/// What the scheduler hands to a task on every invocation
pub type TaskInvocation = std::result::Result<Vec<LocationSample>, TaskError>;

/// One location fix as produced by the platform
///
/// Samples are ephemeral: they are created for a single task invocation and
/// dropped at the end of it, whatever the outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    /// Latitude in decimal degrees
    pub latitude: f64,

    /// Longitude in decimal degrees
    pub longitude: f64,

    /// Horizontal accuracy radius in meters
    pub accuracy: f64,

    /// Ground speed in m/s (0 when the source does not report one)
    #[serde(default)]
    pub speed: f64,

    /// When the source captured the fix
    #[serde(default = "Utc::now")]
    pub captured_at: DateTime<Utc>,
}

impl LocationSample {
    /// Create a stationary sample captured now
    pub fn new(latitude: f64, longitude: f64, accuracy: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
            speed: 0.0,
            captured_at: Utc::now(),
        }
    }

    /// Set the ground speed
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    /// Set the capture timestamp
    pub fn captured_at(mut self, captured_at: DateTime<Utc>) -> Self {
        self.captured_at = captured_at;
        self
    }

    /// Great-circle distance to another sample in meters (haversine)
    pub fn distance_to(&self, other: &LocationSample) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
    }
}

/// Requested fix quality for a background task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accuracy {
    Low,
    Balanced,
    #[default]
    High,
    Best,
}

impl fmt::Display for Accuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Accuracy::Low => "low",
            Accuracy::Balanced => "balanced",
            Accuracy::High => "high",
            Accuracy::Best => "best",
        };
        f.write_str(name)
    }
}

/// Which location permission is being negotiated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionScope {
    /// Location access while the application is in the foreground
    Foreground,
    /// Location access while the application is backgrounded or not running
    Background,
}

impl fmt::Display for PermissionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionScope::Foreground => f.write_str("foreground"),
            PermissionScope::Background => f.write_str("background"),
        }
    }
}

/// Result of a permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Granted,
    Denied,
    /// The user dismissed the request without answering
    Undetermined,
}

impl PermissionStatus {
    /// Only an explicit grant counts
    pub fn is_granted(self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}

/// Title and body of the persistent "tracking active" notice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorText {
    pub title: String,
    pub body: String,
}

impl Default for IndicatorText {
    fn default() -> Self {
        Self {
            title: "Location tracking active".to_string(),
            body: "Your location is being shared with dispatch while you are on shift.".to_string(),
        }
    }
}

/// Configuration handed to the scheduler when a task is registered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOptions {
    /// Requested fix quality
    pub accuracy: Accuracy,

    /// Minimum time between invocations, in milliseconds
    ///
    /// **Default:** 5000
    pub min_interval_ms: u64,

    /// Minimum movement between delivered samples, in meters
    ///
    /// `0` means sampling is purely time-based.
    ///
    /// **Default:** 0
    pub distance_interval_m: f64,

    /// Whether the platform may pause delivery when the device looks stationary
    ///
    /// **Default:** false
    pub pause_automatically: bool,

    /// Whether a persistent indicator must be shown while the task is registered
    ///
    /// **Default:** true
    pub show_persistent_indicator: bool,

    /// Indicator text
    pub indicator: IndicatorText,
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self {
            accuracy: Accuracy::High,
            min_interval_ms: 5_000,
            distance_interval_m: 0.0,
            pause_automatically: false,
            show_persistent_indicator: true,
            indicator: IndicatorText::default(),
        }
    }
}

impl TaskOptions {
    /// Minimum interval as a `Duration`
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    /// Validate the options before registration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.min_interval_ms == 0 {
            return Err("min_interval_ms must be greater than 0".to_string());
        }

        if !self.distance_interval_m.is_finite() || self.distance_interval_m < 0.0 {
            return Err("distance_interval_m must be a non-negative number".to_string());
        }

        if self.show_persistent_indicator && self.indicator.title.trim().is_empty() {
            return Err("indicator title must not be empty".to_string());
        }

        Ok(())
    }
}

/// Work the scheduler runs on every invocation of a registered task
///
/// Implementations must not panic and must return in bounded time; the
/// scheduler has no way to surface a failure back to the application.
#[async_trait]
pub trait TaskHandler: Send + Sync + 'static {
    async fn handle(&self, invocation: TaskInvocation);
}

/// Location permission negotiation
#[async_trait]
pub trait PermissionPort: Send + Sync {
    /// Request access while the application is in the foreground
    async fn request_foreground(&self) -> PermissionStatus;

    /// Request access while the application is backgrounded
    ///
    /// Platforms only grant this after the foreground permission.
    async fn request_background(&self) -> PermissionStatus;
}

/// The platform's background task registry
///
/// The registry is the single source of truth for whether a task is
/// registered. Callers must query it rather than keep their own flag.
#[async_trait]
pub trait SchedulerPort: Send + Sync {
    /// Whether a task with this name is currently registered
    async fn is_registered(&self, task_name: &str) -> Result<bool>;

    /// Register a named task
    ///
    /// # Errors
    ///
    /// Returns `PortError::AlreadyRegistered` if the name is taken and
    /// `PortError::InvalidOptions` if the options are rejected.
    async fn register(
        &self,
        task_name: &str,
        options: TaskOptions,
        handler: Arc<dyn TaskHandler>,
    ) -> Result<()>;

    /// Deregister a named task
    ///
    /// Future invocations are cancelled. An invocation that already started
    /// runs to completion.
    ///
    /// # Errors
    ///
    /// Returns `PortError::NotRegistered` if no such task exists.
    async fn deregister(&self, task_name: &str) -> Result<()>;
}

/// Produces the batch delivered to a task on each invocation
#[async_trait]
pub trait LocationProvider: Send + Sync + 'static {
    /// Capture the current position at the requested accuracy
    ///
    /// The first sample of a successful batch is the most recent.
    async fn capture(&self, accuracy: Accuracy) -> TaskInvocation;
}

/// Persistent user-visible notice shown while a task is registered
pub trait ForegroundIndicator: Send + Sync {
    fn show(&self, task_name: &str, text: &IndicatorText);

    fn clear(&self, task_name: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_defaults_speed_to_zero() {
        let sample = LocationSample::new(12.9, 77.6, 8.0);
        assert_eq!(sample.speed, 0.0);

        let json = r#"{"latitude": 1.0, "longitude": 2.0, "accuracy": 5.0}"#;
        let parsed: LocationSample = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.speed, 0.0);
        assert_eq!(parsed.accuracy, 5.0);
    }

    #[test]
    fn test_distance_between_samples() {
        let a = LocationSample::new(12.9, 77.6, 8.0);
        assert_eq!(a.distance_to(&a), 0.0);

        // One degree of latitude is roughly 111 km
        let b = LocationSample::new(13.9, 77.6, 8.0);
        let d = a.distance_to(&b);
        assert!((d - 111_195.0).abs() < 100.0, "got {}", d);
    }

    #[test]
    fn test_default_task_options() {
        let options = TaskOptions::default();

        assert_eq!(options.accuracy, Accuracy::High);
        assert_eq!(options.min_interval_ms, 5_000);
        assert_eq!(options.min_interval(), Duration::from_secs(5));
        assert_eq!(options.distance_interval_m, 0.0);
        assert!(!options.pause_automatically);
        assert!(options.show_persistent_indicator);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_task_options_validation() {
        let mut options = TaskOptions::default();

        options.min_interval_ms = 0;
        assert!(options.validate().is_err());
        options.min_interval_ms = 5_000;

        options.distance_interval_m = -1.0;
        assert!(options.validate().is_err());
        options.distance_interval_m = f64::NAN;
        assert!(options.validate().is_err());
        options.distance_interval_m = 0.0;

        options.indicator.title = "  ".to_string();
        assert!(options.validate().is_err());
        options.show_persistent_indicator = false;
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_permission_status() {
        assert!(PermissionStatus::Granted.is_granted());
        assert!(!PermissionStatus::Denied.is_granted());
        assert!(!PermissionStatus::Undetermined.is_granted());
    }

    #[test]
    fn test_accuracy_serde() {
        let json = serde_json::to_string(&Accuracy::High).unwrap();
        assert_eq!(json, "\"high\"");
        assert_eq!(Accuracy::Balanced.to_string(), "balanced");
    }

    #[test]
    fn test_port_error_messages() {
        let errors = [
            PortError::Scheduler("registry offline".to_string()),
            PortError::AlreadyRegistered("task".to_string()),
            PortError::NotRegistered("task".to_string()),
            PortError::InvalidOptions("min_interval_ms must be greater than 0".to_string()),
        ];

        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        assert_eq!(
            messages,
            vec![
                "Scheduler error: registry offline",
                "Task already registered: task",
                "Task not registered: task",
                "Invalid task options: min_interval_ms must be greater than 0",
            ]
        );
    }
}
