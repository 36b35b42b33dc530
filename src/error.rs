/*!
 * Error types for Fieldtrack
 */

use fieldtrack_core_interface::PortError;
use std::fmt;
use std::io;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FieldtrackError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_NOT_TRACKING: i32 = 1;
pub const EXIT_FATAL: i32 = 2;

/// Errors surfaced by the host around the tracking pipeline
///
/// The pipeline itself never returns these to its caller; they come from
/// loading configuration, building adapters and talking to ports directly.
#[derive(Error, Debug)]
pub enum FieldtrackError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Config file could not be parsed
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Config could not be serialized
    #[error("Failed to serialize configuration: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// Platform port failure
    #[error(transparent)]
    Port(#[from] PortError),

    /// A report sent outside the background task failed
    #[error("Report failed: {0}")]
    Report(#[from] ReportError),

    /// Location replay file could not be read
    #[error("Invalid replay file {path}: {reason}")]
    Replay { path: String, reason: String },

    /// Logging could not be initialized
    #[error("Logging error: {0}")]
    Logging(String),
}

impl FieldtrackError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            FieldtrackError::Report(_) | FieldtrackError::Port(_) => EXIT_NOT_TRACKING,
            _ => EXIT_FATAL,
        }
    }

    /// Check if this error is fatal (the host cannot continue)
    pub fn is_fatal(&self) -> bool {
        match self {
            FieldtrackError::Config(_)
            | FieldtrackError::ConfigParse(_)
            | FieldtrackError::ConfigWrite(_)
            | FieldtrackError::Replay { .. }
            | FieldtrackError::Logging(_) => true,

            FieldtrackError::Io(_) | FieldtrackError::Port(_) | FieldtrackError::Report(_) => {
                false
            }
        }
    }
}

/// Failure of a single transmission attempt
///
/// Every variant means the same thing to the capture task: this attempt
/// failed and the sample is dropped.
#[derive(Error, Debug)]
pub enum ReportError {
    /// Connection, TLS or protocol failure
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status
    #[error("endpoint returned status {0}")]
    Status(reqwest::StatusCode),

    /// Sample could not be encoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Attempt did not finish within the allowed time
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// Reporter panicked mid-attempt
    #[error("reporter panicked")]
    Panicked,
}

impl ReportError {
    /// Short label for logs and counters
    pub fn kind(&self) -> ReportErrorKind {
        match self {
            ReportError::Transport(_) => ReportErrorKind::Transport,
            ReportError::Status(_) => ReportErrorKind::Status,
            ReportError::Serialization(_) => ReportErrorKind::Serialization,
            ReportError::Timeout(_) => ReportErrorKind::Timeout,
            ReportError::Panicked => ReportErrorKind::Panicked,
        }
    }
}

/// Classification of transmission failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportErrorKind {
    Transport,
    Status,
    Serialization,
    Timeout,
    Panicked,
}

impl fmt::Display for ReportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportErrorKind::Transport => write!(f, "transport"),
            ReportErrorKind::Status => write!(f, "status"),
            ReportErrorKind::Serialization => write!(f, "serialization"),
            ReportErrorKind::Timeout => write!(f, "timeout"),
            ReportErrorKind::Panicked => write!(f, "panicked"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            FieldtrackError::Config("bad".to_string()).exit_code(),
            EXIT_FATAL
        );
        assert_eq!(
            FieldtrackError::Report(ReportError::Panicked).exit_code(),
            EXIT_NOT_TRACKING
        );
        assert_eq!(
            FieldtrackError::Port(PortError::Scheduler("down".to_string())).exit_code(),
            EXIT_NOT_TRACKING
        );
    }

    #[test]
    fn test_fatal_classification() {
        assert!(FieldtrackError::Config("bad".to_string()).is_fatal());
        assert!(FieldtrackError::Logging("bad".to_string()).is_fatal());
        assert!(!FieldtrackError::Io(io::Error::other("disk")).is_fatal());
        assert!(!FieldtrackError::Report(ReportError::Timeout(Duration::from_secs(1))).is_fatal());
    }

    #[test]
    fn test_report_error_kind() {
        let status = ReportError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status.kind(), ReportErrorKind::Status);
        assert_eq!(status.to_string(), "endpoint returned status 503 Service Unavailable");

        assert_eq!(ReportError::Panicked.kind().to_string(), "panicked");
        assert_eq!(
            ReportError::Timeout(Duration::from_secs(10)).kind(),
            ReportErrorKind::Timeout
        );
    }
}
