//! Interval Scheduler: the background task registry
//!
//! Each registered task owns a worker that wakes on its own timer, captures a
//! batch from the location provider and hands it to the task's handler. The
//! application never drives these workers; it only registers and deregisters
//! them.

use crate::filter::DistanceFilter;
use crate::indicator::TracingIndicator;
use crate::metrics::{TaskStats, TaskStatsSnapshot};
use async_trait::async_trait;
use fieldtrack_core_interface::{
    ForegroundIndicator, LocationProvider, PortError, Result, SchedulerPort, TaskHandler,
    TaskOptions,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info, warn};

/// Bookkeeping for one registered task
///
/// Dropping the slot cancels its worker, so a scheduler dropped without
/// `shutdown()` leaves nothing running.
struct TaskSlot {
    options: TaskOptions,
    cancel: CancellationToken,
    worker: JoinHandle<()>,
    stats: Arc<TaskStats>,
    _cancel_on_drop: DropGuard,
}

/// In-process stand-in for a platform background task scheduler
///
/// Workers run on the tokio runtime, independent of whoever registered them.
/// Deregistering a task stops future ticks; an invocation already handed to
/// the handler is never interrupted.
///
/// # Example
///
/// ```no_run
/// # use fieldtrack_scheduler::IntervalScheduler;
/// # use fieldtrack_core_interface::{LocationProvider, SchedulerPort, TaskHandler, TaskOptions};
/// # use std::sync::Arc;
/// # async fn example(
/// #     provider: Arc<dyn LocationProvider>,
/// #     handler: Arc<dyn TaskHandler>,
/// # ) -> fieldtrack_core_interface::Result<()> {
/// let scheduler = IntervalScheduler::new(provider);
///
/// scheduler
///     .register("background-location-task", TaskOptions::default(), handler)
///     .await?;
///
/// // ... later
/// scheduler.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct IntervalScheduler {
    /// Source of the batches delivered to every task
    provider: Arc<dyn LocationProvider>,

    /// Persistent notice shown while a task that asks for one is registered
    indicator: Arc<dyn ForegroundIndicator>,

    /// Registered tasks (name -> slot)
    tasks: Arc<RwLock<HashMap<String, TaskSlot>>>,
}

impl IntervalScheduler {
    /// Create a scheduler that announces its indicator through the log
    pub fn new(provider: Arc<dyn LocationProvider>) -> Self {
        Self {
            provider,
            indicator: Arc::new(TracingIndicator),
            tasks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Replace the persistent indicator
    pub fn with_indicator(mut self, indicator: Arc<dyn ForegroundIndicator>) -> Self {
        self.indicator = indicator;
        self
    }

    /// Names of all registered tasks
    pub async fn task_names(&self) -> Vec<String> {
        let tasks = self.tasks.read().await;
        tasks.keys().cloned().collect()
    }

    /// Options a task was registered with
    pub async fn options(&self, task_name: &str) -> Option<TaskOptions> {
        let tasks = self.tasks.read().await;
        tasks.get(task_name).map(|slot| slot.options.clone())
    }

    /// Current counters for a task
    pub async fn stats(&self, task_name: &str) -> Option<TaskStatsSnapshot> {
        let tasks = self.tasks.read().await;
        tasks.get(task_name).map(|slot| slot.stats.snapshot())
    }

    /// Deregister every task and wait for in-flight invocations to finish
    pub async fn shutdown(&self) {
        let drained: Vec<(String, TaskSlot)> = {
            let mut tasks = self.tasks.write().await;
            tasks.drain().collect()
        };

        if drained.is_empty() {
            return;
        }

        info!("Shutting down scheduler ({} task(s))", drained.len());

        for (name, slot) in drained {
            slot.cancel.cancel();
            if slot.options.show_persistent_indicator {
                self.indicator.clear(&name);
            }

            if let Err(e) = slot.worker.await {
                error!(task = %name, "Worker terminated abnormally: {}", e);
            }

            debug!(task = %name, "{}", slot.stats.snapshot().summary());
        }
    }
}

#[async_trait]
impl SchedulerPort for IntervalScheduler {
    async fn is_registered(&self, task_name: &str) -> Result<bool> {
        let tasks = self.tasks.read().await;
        Ok(tasks.contains_key(task_name))
    }

    async fn register(
        &self,
        task_name: &str,
        options: TaskOptions,
        handler: Arc<dyn TaskHandler>,
    ) -> Result<()> {
        options.validate().map_err(PortError::InvalidOptions)?;

        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(task_name) {
            return Err(PortError::AlreadyRegistered(task_name.to_string()));
        }

        if options.pause_automatically {
            debug!(
                task = task_name,
                "Automatic pausing requested; the interval scheduler never pauses"
            );
        }

        let cancel = CancellationToken::new();
        let stats = Arc::new(TaskStats::new());

        let worker = tokio::spawn(run_worker(
            task_name.to_string(),
            options.clone(),
            self.provider.clone(),
            handler,
            cancel.clone(),
            stats.clone(),
        ));

        if options.show_persistent_indicator {
            self.indicator.show(task_name, &options.indicator);
        }

        info!(
            task = task_name,
            "Registered background task | Accuracy: {} | Interval: {}ms | Distance: {}m",
            options.accuracy,
            options.min_interval_ms,
            options.distance_interval_m
        );

        tasks.insert(
            task_name.to_string(),
            TaskSlot {
                options,
                cancel: cancel.clone(),
                worker,
                stats,
                _cancel_on_drop: cancel.clone().drop_guard(),
            },
        );

        Ok(())
    }

    async fn deregister(&self, task_name: &str) -> Result<()> {
        let slot = {
            let mut tasks = self.tasks.write().await;
            tasks
                .remove(task_name)
                .ok_or_else(|| PortError::NotRegistered(task_name.to_string()))?
        };

        // Only future ticks are cancelled; the worker is detached so an
        // in-flight invocation completes on its own.
        slot.cancel.cancel();

        if slot.options.show_persistent_indicator {
            self.indicator.clear(task_name);
        }

        info!(task = task_name, "Deregistered background task");
        debug!(task = task_name, "{}", slot.stats.snapshot().summary());

        Ok(())
    }
}

/// Worker loop for a single task
async fn run_worker(
    task_name: String,
    options: TaskOptions,
    provider: Arc<dyn LocationProvider>,
    handler: Arc<dyn TaskHandler>,
    cancel: CancellationToken,
    stats: Arc<TaskStats>,
) {
    let mut interval = tokio::time::interval(options.min_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut filter = DistanceFilter::new(options.distance_interval_m);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        stats.record_tick();

        // A capture still running at deregistration is abandoned, never delivered
        let captured = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            captured = provider.capture(options.accuracy) => captured,
        };

        let invocation = match captured {
            Ok(batch) if batch.is_empty() => Ok(batch),
            Ok(batch) => {
                let kept = filter.apply(batch);
                if kept.is_empty() {
                    stats.record_filtered();
                    debug!(task = %task_name, "All samples within distance interval, skipping");
                    continue;
                }
                Ok(kept)
            }
            Err(e) => {
                stats.record_provider_error();
                Err(e)
            }
        };

        stats.record_invocation();

        // Each invocation runs as its own task so that neither cancellation
        // nor a panicking handler can tear it down halfway.
        let handler = handler.clone();
        let invocation = tokio::spawn(async move { handler.handle(invocation).await });

        if let Err(e) = invocation.await {
            stats.record_handler_panic();
            warn!(task = %task_name, "Task invocation aborted: {}", e);
        }
    }

    debug!(task = %task_name, "Worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldtrack_core_interface::{Accuracy, LocationSample, TaskInvocation};

    struct FixedProvider;

    #[async_trait]
    impl LocationProvider for FixedProvider {
        async fn capture(&self, _accuracy: Accuracy) -> TaskInvocation {
            Ok(vec![LocationSample::new(12.9, 77.6, 8.0)])
        }
    }

    struct NoopHandler;

    #[async_trait]
    impl TaskHandler for NoopHandler {
        async fn handle(&self, _invocation: TaskInvocation) {}
    }

    fn scheduler() -> IntervalScheduler {
        IntervalScheduler::new(Arc::new(FixedProvider))
    }

    #[tokio::test]
    async fn test_register_and_query() {
        let scheduler = scheduler();

        assert!(!scheduler.is_registered("task").await.unwrap());

        scheduler
            .register("task", TaskOptions::default(), Arc::new(NoopHandler))
            .await
            .unwrap();

        assert!(scheduler.is_registered("task").await.unwrap());
        assert_eq!(scheduler.task_names().await, vec!["task".to_string()]);
        assert_eq!(
            scheduler.options("task").await,
            Some(TaskOptions::default())
        );

        scheduler.shutdown().await;
        assert!(!scheduler.is_registered("task").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let scheduler = scheduler();

        scheduler
            .register("task", TaskOptions::default(), Arc::new(NoopHandler))
            .await
            .unwrap();

        let err = scheduler
            .register("task", TaskOptions::default(), Arc::new(NoopHandler))
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::AlreadyRegistered(name) if name == "task"));

        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_invalid_options_rejected() {
        let scheduler = scheduler();
        let options = TaskOptions {
            min_interval_ms: 0,
            ..Default::default()
        };

        let err = scheduler
            .register("task", options, Arc::new(NoopHandler))
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::InvalidOptions(_)));
        assert!(!scheduler.is_registered("task").await.unwrap());
    }

    #[tokio::test]
    async fn test_deregister_unknown_task() {
        let scheduler = scheduler();

        let err = scheduler.deregister("missing").await.unwrap_err();
        assert!(matches!(err, PortError::NotRegistered(_)));
    }
}
