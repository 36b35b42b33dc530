/*!
 * Capture observation hooks
 *
 * The capture task swallows every failure. Observers are the seam that makes
 * those dropped outcomes visible without changing that contract.
 */

use crate::capture::CaptureOutcome;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Receives the outcome of every capture task invocation
///
/// Called from the background execution context; implementations must be
/// quick and must not panic.
pub trait CaptureObserver: Send + Sync {
    fn observe(&self, outcome: &CaptureOutcome);
}

/// Logs every outcome through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl CaptureObserver for TracingObserver {
    fn observe(&self, outcome: &CaptureOutcome) {
        match outcome {
            CaptureOutcome::Delivered(sample) => debug!(
                latitude = sample.latitude,
                longitude = sample.longitude,
                accuracy = sample.accuracy,
                "Location sample delivered"
            ),
            CaptureOutcome::TransmissionFailed(e) => {
                warn!(kind = %e.kind(), "Location sample dropped: {}", e)
            }
            CaptureOutcome::SchedulerError(e) => {
                warn!("Capture skipped, scheduler reported: {}", e)
            }
            CaptureOutcome::Offline => debug!("Capture skipped, device offline"),
            CaptureOutcome::EmptyBatch => debug!("Capture skipped, empty batch"),
        }
    }
}

/// Point-in-time copy of the capture counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureSummary {
    pub invocations: u64,
    pub scheduler_errors: u64,
    pub empty_batches: u64,
    pub offline: u64,
    pub delivered: u64,
    pub failed: u64,
}

impl CaptureSummary {
    /// Share of transmission attempts that reached the backend (0.0 - 1.0)
    pub fn delivery_ratio(&self) -> f64 {
        let attempts = self.delivered + self.failed;
        if attempts == 0 {
            1.0 // Nothing attempted, nothing lost in transit
        } else {
            self.delivered as f64 / attempts as f64
        }
    }

    /// Format a human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "Captures: {} | Delivered: {} | Failed: {} ({:.1}% delivered) | Offline: {} | Empty: {} | Scheduler errors: {}",
            self.invocations,
            self.delivered,
            self.failed,
            self.delivery_ratio() * 100.0,
            self.offline,
            self.empty_batches,
            self.scheduler_errors
        )
    }
}

/// Counts outcomes by kind
#[derive(Debug, Default)]
pub struct CaptureStats {
    invocations: AtomicU64,
    scheduler_errors: AtomicU64,
    empty_batches: AtomicU64,
    offline: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl CaptureStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> CaptureSummary {
        CaptureSummary {
            invocations: self.invocations.load(Ordering::Relaxed),
            scheduler_errors: self.scheduler_errors.load(Ordering::Relaxed),
            empty_batches: self.empty_batches.load(Ordering::Relaxed),
            offline: self.offline.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

impl CaptureObserver for CaptureStats {
    fn observe(&self, outcome: &CaptureOutcome) {
        self.invocations.fetch_add(1, Ordering::Relaxed);

        let counter = match outcome {
            CaptureOutcome::SchedulerError(_) => &self.scheduler_errors,
            CaptureOutcome::EmptyBatch => &self.empty_batches,
            CaptureOutcome::Offline => &self.offline,
            CaptureOutcome::Delivered(_) => &self.delivered,
            CaptureOutcome::TransmissionFailed(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Fans an outcome out to several observers
#[derive(Default, Clone)]
pub struct ObserverSet {
    observers: Vec<Arc<dyn CaptureObserver>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn CaptureObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl CaptureObserver for ObserverSet {
    fn observe(&self, outcome: &CaptureOutcome) {
        for observer in &self.observers {
            observer.observe(outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReportError;
    use fieldtrack_core_interface::{LocationSample, TaskError};

    #[test]
    fn test_stats_count_each_outcome() {
        let stats = CaptureStats::new();

        stats.observe(&CaptureOutcome::Delivered(LocationSample::new(1.0, 2.0, 3.0)));
        stats.observe(&CaptureOutcome::Delivered(LocationSample::new(1.0, 2.0, 3.0)));
        stats.observe(&CaptureOutcome::TransmissionFailed(ReportError::Panicked));
        stats.observe(&CaptureOutcome::Offline);
        stats.observe(&CaptureOutcome::EmptyBatch);
        stats.observe(&CaptureOutcome::SchedulerError(TaskError::PermissionRevoked));

        let summary = stats.snapshot();
        assert_eq!(summary.invocations, 6);
        assert_eq!(summary.delivered, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.offline, 1);
        assert_eq!(summary.empty_batches, 1);
        assert_eq!(summary.scheduler_errors, 1);
        assert!((summary.delivery_ratio() - 2.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_delivery_ratio_without_attempts() {
        let summary = CaptureSummary {
            offline: 4,
            ..Default::default()
        };
        assert_eq!(summary.delivery_ratio(), 1.0);
    }

    #[test]
    fn test_summary_format() {
        let summary = CaptureSummary {
            invocations: 10,
            delivered: 6,
            failed: 2,
            offline: 2,
            ..Default::default()
        };

        let text = summary.summary();
        assert!(text.contains("Captures: 10"));
        assert!(text.contains("Delivered: 6"));
        assert!(text.contains("75.0% delivered"));
    }

    #[test]
    fn test_observer_set_fans_out() {
        let first = Arc::new(CaptureStats::new());
        let second = Arc::new(CaptureStats::new());
        let set = ObserverSet::new()
            .with(first.clone())
            .with(second.clone())
            .with(Arc::new(TracingObserver));

        set.observe(&CaptureOutcome::Offline);

        assert_eq!(set.len(), 3);
        assert_eq!(first.snapshot().offline, 1);
        assert_eq!(second.snapshot().offline, 1);
    }
}
