/*!
 * Background Capture Task - the scheduler-invoked unit of work
 *
 * Each invocation is a self-contained transaction:
 *
 *   batch or error ──> first sample ──> reachable? ──> report ──> done
 *
 * Any step may end the invocation early. Nothing escapes it: scheduler
 * errors, offline periods and failed transmissions all end in a
 * `CaptureOutcome` that is handed to the observer and then dropped along with
 * the sample.
 */

use crate::error::ReportError;
use crate::observer::{CaptureObserver, TracingObserver};
use crate::reachability::ReachabilityProbe;
use crate::reporter::SampleReporter;
use async_trait::async_trait;
use fieldtrack_core_interface::{LocationSample, TaskError, TaskHandler, TaskInvocation};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

/// Upper bound on a single transmission attempt inside the task
pub const DEFAULT_REPORT_TIMEOUT: Duration = Duration::from_secs(25);

/// How a single invocation ended
#[derive(Debug)]
pub enum CaptureOutcome {
    /// The scheduler delivered an error instead of a batch
    SchedulerError(TaskError),

    /// The batch held no samples
    EmptyBatch,

    /// The device had no usable network; no request was made
    Offline,

    /// The sample reached the backend
    Delivered(LocationSample),

    /// The attempt failed and the sample was discarded
    TransmissionFailed(ReportError),
}

impl CaptureOutcome {
    /// Whether a network call was attempted
    pub fn attempted_transmission(&self) -> bool {
        matches!(
            self,
            CaptureOutcome::Delivered(_) | CaptureOutcome::TransmissionFailed(_)
        )
    }
}

/// Handler registered with the scheduler for location tracking
pub struct BackgroundCaptureTask {
    probe: Arc<dyn ReachabilityProbe>,
    reporter: Arc<dyn SampleReporter>,
    observer: Arc<dyn CaptureObserver>,
    report_timeout: Duration,
}

impl BackgroundCaptureTask {
    pub fn new(probe: Arc<dyn ReachabilityProbe>, reporter: Arc<dyn SampleReporter>) -> Self {
        Self {
            probe,
            reporter,
            observer: Arc::new(TracingObserver),
            report_timeout: DEFAULT_REPORT_TIMEOUT,
        }
    }

    /// Replace the outcome observer (defaults to `TracingObserver`)
    pub fn with_observer(mut self, observer: Arc<dyn CaptureObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Bound the time a transmission attempt may take
    pub fn with_report_timeout(mut self, timeout: Duration) -> Self {
        self.report_timeout = timeout;
        self
    }

    /// Run one invocation and return how it ended
    ///
    /// Never fails and never panics on behalf of the probe or the reporter.
    pub async fn run_once(&self, invocation: TaskInvocation) -> CaptureOutcome {
        let batch = match invocation {
            Ok(batch) => batch,
            Err(e) => return CaptureOutcome::SchedulerError(e),
        };

        // Only the most recent sample is reported
        let Some(sample) = batch.into_iter().next() else {
            return CaptureOutcome::EmptyBatch;
        };

        // A probe that panics is treated as offline
        let connected = std::panic::catch_unwind(AssertUnwindSafe(|| self.probe.is_connected()))
            .unwrap_or_else(|_| {
                warn!("Reachability probe panicked, treating device as offline");
                false
            });
        if !connected {
            return CaptureOutcome::Offline;
        }

        let attempt = AssertUnwindSafe(self.reporter.report(&sample)).catch_unwind();

        match tokio::time::timeout(self.report_timeout, attempt).await {
            Ok(Ok(Ok(()))) => CaptureOutcome::Delivered(sample),
            Ok(Ok(Err(e))) => CaptureOutcome::TransmissionFailed(e),
            Ok(Err(_panic)) => CaptureOutcome::TransmissionFailed(ReportError::Panicked),
            Err(_elapsed) => {
                CaptureOutcome::TransmissionFailed(ReportError::Timeout(self.report_timeout))
            }
        }
    }
}

#[async_trait]
impl TaskHandler for BackgroundCaptureTask {
    async fn handle(&self, invocation: TaskInvocation) {
        let work = AssertUnwindSafe(async {
            let outcome = self.run_once(invocation).await;
            self.observer.observe(&outcome);
        });

        if work.catch_unwind().await.is_err() {
            error!("Capture task invocation panicked; sample dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::init_test_logging;
    use crate::observer::CaptureStats;
    use crate::testing::{CountingProbe, RecordingReporter, ReporterBehavior};

    fn sample() -> LocationSample {
        LocationSample::new(12.9, 77.6, 8.0).with_speed(3.2)
    }

    fn task(
        connected: bool,
        behavior: ReporterBehavior,
    ) -> (BackgroundCaptureTask, Arc<CountingProbe>, Arc<RecordingReporter>) {
        init_test_logging();
        let probe = Arc::new(CountingProbe::new(connected));
        let reporter = Arc::new(RecordingReporter::new(behavior));
        let task = BackgroundCaptureTask::new(probe.clone(), reporter.clone());
        (task, probe, reporter)
    }

    #[tokio::test]
    async fn test_delivers_first_sample_when_connected() {
        let (task, probe, reporter) = task(true, ReporterBehavior::Accept);
        let newest = sample();
        let older = LocationSample::new(1.0, 1.0, 50.0);

        let outcome = task.run_once(Ok(vec![newest.clone(), older])).await;

        assert!(matches!(outcome, CaptureOutcome::Delivered(ref s) if s.latitude == 12.9));
        assert_eq!(probe.calls(), 1);
        assert_eq!(reporter.reported(), vec![newest]);
    }

    #[tokio::test]
    async fn test_scheduler_error_returns_early() {
        let (task, probe, reporter) = task(true, ReporterBehavior::Accept);

        let outcome = task.run_once(Err(TaskError::PermissionRevoked)).await;

        assert!(matches!(
            outcome,
            CaptureOutcome::SchedulerError(TaskError::PermissionRevoked)
        ));
        assert_eq!(probe.calls(), 0);
        assert_eq!(reporter.attempts(), 0);
    }

    #[tokio::test]
    async fn test_empty_batch_touches_nothing() {
        let (task, probe, reporter) = task(true, ReporterBehavior::Accept);

        let outcome = task.run_once(Ok(Vec::new())).await;

        assert!(matches!(outcome, CaptureOutcome::EmptyBatch));
        assert_eq!(probe.calls(), 0);
        assert_eq!(reporter.attempts(), 0);
    }

    #[tokio::test]
    async fn test_offline_skips_reporter() {
        let (task, probe, reporter) = task(false, ReporterBehavior::Accept);

        let outcome = task.run_once(Ok(vec![sample()])).await;

        assert!(matches!(outcome, CaptureOutcome::Offline));
        assert!(!outcome.attempted_transmission());
        assert_eq!(probe.calls(), 1);
        assert_eq!(reporter.attempts(), 0);
    }

    #[tokio::test]
    async fn test_reporter_error_is_swallowed() {
        let (task, _probe, reporter) = task(
            true,
            ReporterBehavior::Reject(reqwest::StatusCode::INTERNAL_SERVER_ERROR),
        );

        let outcome = task.run_once(Ok(vec![sample()])).await;

        assert!(matches!(
            outcome,
            CaptureOutcome::TransmissionFailed(ReportError::Status(s)) if s.as_u16() == 500
        ));
        assert_eq!(reporter.attempts(), 1);
        assert!(reporter.reported().is_empty());
    }

    #[tokio::test]
    async fn test_reporter_panic_is_contained() {
        let (task, _probe, reporter) = task(true, ReporterBehavior::Panic);

        let outcome = task.run_once(Ok(vec![sample()])).await;

        assert!(matches!(
            outcome,
            CaptureOutcome::TransmissionFailed(ReportError::Panicked)
        ));
        assert_eq!(reporter.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_reporter_times_out() {
        let (task, _probe, reporter) = task(true, ReporterBehavior::Hang);
        let task = task.with_report_timeout(Duration::from_secs(2));

        let outcome = task.run_once(Ok(vec![sample()])).await;

        assert!(matches!(
            outcome,
            CaptureOutcome::TransmissionFailed(ReportError::Timeout(d)) if d == Duration::from_secs(2)
        ));
        assert_eq!(reporter.attempts(), 1);
    }

    #[tokio::test]
    async fn test_handle_feeds_observer() {
        let (task, _probe, _reporter) = task(true, ReporterBehavior::Accept);
        let stats = Arc::new(CaptureStats::new());
        let task = task.with_observer(stats.clone());

        task.handle(Ok(vec![sample()])).await;
        task.handle(Ok(Vec::new())).await;
        task.handle(Err(TaskError::Platform("gps off".to_string()))).await;

        let summary = stats.snapshot();
        assert_eq!(summary.invocations, 3);
        assert_eq!(summary.delivered, 1);
        assert_eq!(summary.empty_batches, 1);
        assert_eq!(summary.scheduler_errors, 1);
    }

    struct PanickingProbe;

    impl ReachabilityProbe for PanickingProbe {
        fn is_connected(&self) -> bool {
            panic!("interface table unreadable");
        }
    }

    struct PanickingObserver;

    impl CaptureObserver for PanickingObserver {
        fn observe(&self, _outcome: &CaptureOutcome) {
            panic!("observer failure");
        }
    }

    #[tokio::test]
    async fn test_panicking_probe_counts_as_offline() {
        init_test_logging();
        let reporter = Arc::new(RecordingReporter::new(ReporterBehavior::Accept));
        let stats = Arc::new(CaptureStats::new());
        let task = Arc::new(
            BackgroundCaptureTask::new(Arc::new(PanickingProbe), reporter.clone())
                .with_observer(stats.clone()),
        );

        let worker = task.clone();
        let joined = tokio::spawn(async move { worker.handle(Ok(vec![sample()])).await }).await;

        assert!(joined.is_ok());
        assert_eq!(reporter.attempts(), 0);
        assert_eq!(stats.snapshot().offline, 1);
    }

    #[tokio::test]
    async fn test_panicking_observer_stays_inside_task() {
        let (task, _probe, reporter) = task(true, ReporterBehavior::Accept);
        let task = Arc::new(task.with_observer(Arc::new(PanickingObserver)));

        let worker = task.clone();
        let joined = tokio::spawn(async move { worker.handle(Ok(vec![sample()])).await }).await;

        assert!(joined.is_ok());
        assert_eq!(reporter.reported().len(), 1);
    }
}
