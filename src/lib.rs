/*!
 * Fieldtrack - background location telemetry
 *
 * Keeps a device's position flowing to a backend while tracking is on:
 * - Idempotent start/stop of a named background capture task
 * - Foreground then background permission checks before registration
 * - A capture task that reports the freshest sample only when online
 * - Failure isolation: nothing raised inside a capture escapes it
 *
 * The platform sits behind the ports in `fieldtrack_core_interface`; this
 * crate supplies the lifecycle controller, the capture task and host
 * adapters for running the whole thing from a terminal.
 */

pub mod capture;
pub mod commands;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod observer;
pub mod reachability;
pub mod reporter;
pub mod system;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used types
pub use capture::{BackgroundCaptureTask, CaptureOutcome};
pub use config::TrackerConfig;
pub use controller::{RegistrationState, StartOutcome, StopOutcome, TrackingLifecycleController};
pub use error::{FieldtrackError, ReportError, Result};
pub use observer::{CaptureObserver, CaptureStats, ObserverSet, TracingObserver};
pub use reachability::{InterfaceProbe, ReachabilityProbe};
pub use reporter::{HttpReporter, SampleReporter};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
