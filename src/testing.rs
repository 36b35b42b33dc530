/*!
 * In-memory port implementations for testing
 *
 * These stand in for the platform (permission dialogs, the background task
 * registry) and for the network (reachability, telemetry endpoint) so that
 * tracking behaviour can be exercised without a device or a backend.
 *
 * # Example
 *
 * ```rust
 * use fieldtrack::testing::{MockPermissions, MockScheduler};
 * use fieldtrack_core_interface::{PermissionStatus, SchedulerPort};
 *
 * # tokio_test::block_on(async {
 * let scheduler = MockScheduler::new();
 * assert!(!scheduler.is_registered("task").await.unwrap());
 *
 * let permissions = MockPermissions::new(PermissionStatus::Granted, PermissionStatus::Denied);
 * assert_eq!(permissions.background_requests(), 0);
 * # });
 * ```
 */

use crate::error::ReportError;
use crate::reachability::ReachabilityProbe;
use crate::reporter::SampleReporter;
use async_trait::async_trait;
use fieldtrack_core_interface::{
    LocationSample, PermissionPort, PermissionStatus, PortError, Result, SchedulerPort,
    TaskHandler, TaskInvocation, TaskOptions,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Lock a mutex, recovering the data if a panicking test poisoned it
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A call observed by `MockScheduler`
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerCall {
    IsRegistered(String),
    Register(String, TaskOptions),
    Deregister(String),
}

/// Background task registry that records every call
///
/// Registered handlers are kept so a test can play the platform and invoke
/// them with `deliver`.
#[derive(Default, Clone)]
pub struct MockScheduler {
    registry: Arc<Mutex<HashMap<String, (TaskOptions, Arc<dyn TaskHandler>)>>>,
    calls: Arc<Mutex<Vec<SchedulerCall>>>,
    unavailable: Arc<AtomicBool>,
}

impl MockScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `PortError::Scheduler`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Every call received, in order
    pub fn calls(&self) -> Vec<SchedulerCall> {
        lock(&self.calls).clone()
    }

    /// Options passed to each `register` call
    pub fn registrations(&self) -> Vec<(String, TaskOptions)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SchedulerCall::Register(name, options) => Some((name, options)),
                _ => None,
            })
            .collect()
    }

    /// Names passed to each `deregister` call
    pub fn deregistrations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SchedulerCall::Deregister(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    /// Invoke a registered task the way the platform would
    ///
    /// Returns false if no task with that name is registered.
    pub async fn deliver(&self, task_name: &str, invocation: TaskInvocation) -> bool {
        let handler = lock(&self.registry)
            .get(task_name)
            .map(|(_, handler)| handler.clone());

        match handler {
            Some(handler) => {
                handler.handle(invocation).await;
                true
            }
            None => false,
        }
    }

    /// Drop a registration behind the controller's back (e.g. OS cleanup)
    pub fn forget(&self, task_name: &str) {
        lock(&self.registry).remove(task_name);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(PortError::Scheduler("scheduler unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SchedulerPort for MockScheduler {
    async fn is_registered(&self, task_name: &str) -> Result<bool> {
        lock(&self.calls).push(SchedulerCall::IsRegistered(task_name.to_string()));
        self.check_available()?;
        Ok(lock(&self.registry).contains_key(task_name))
    }

    async fn register(
        &self,
        task_name: &str,
        options: TaskOptions,
        handler: Arc<dyn TaskHandler>,
    ) -> Result<()> {
        lock(&self.calls).push(SchedulerCall::Register(
            task_name.to_string(),
            options.clone(),
        ));
        self.check_available()?;

        let mut registry = lock(&self.registry);
        if registry.contains_key(task_name) {
            return Err(PortError::AlreadyRegistered(task_name.to_string()));
        }
        registry.insert(task_name.to_string(), (options, handler));
        Ok(())
    }

    async fn deregister(&self, task_name: &str) -> Result<()> {
        lock(&self.calls).push(SchedulerCall::Deregister(task_name.to_string()));
        self.check_available()?;

        lock(&self.registry)
            .remove(task_name)
            .map(|_| ())
            .ok_or_else(|| PortError::NotRegistered(task_name.to_string()))
    }
}

/// Permission port with scripted answers
#[derive(Debug)]
pub struct MockPermissions {
    foreground: PermissionStatus,
    background: PermissionStatus,
    foreground_requests: AtomicUsize,
    background_requests: AtomicUsize,
}

impl MockPermissions {
    pub fn new(foreground: PermissionStatus, background: PermissionStatus) -> Self {
        Self {
            foreground,
            background,
            foreground_requests: AtomicUsize::new(0),
            background_requests: AtomicUsize::new(0),
        }
    }

    /// Both permissions granted
    pub fn granted() -> Self {
        Self::new(PermissionStatus::Granted, PermissionStatus::Granted)
    }

    pub fn foreground_requests(&self) -> usize {
        self.foreground_requests.load(Ordering::SeqCst)
    }

    pub fn background_requests(&self) -> usize {
        self.background_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionPort for MockPermissions {
    async fn request_foreground(&self) -> PermissionStatus {
        self.foreground_requests.fetch_add(1, Ordering::SeqCst);
        self.foreground
    }

    async fn request_background(&self) -> PermissionStatus {
        self.background_requests.fetch_add(1, Ordering::SeqCst);
        self.background
    }
}

/// Reachability probe that counts how often it was asked
#[derive(Debug)]
pub struct CountingProbe {
    connected: AtomicBool,
    calls: AtomicUsize,
}

impl CountingProbe {
    pub fn new(connected: bool) -> Self {
        Self {
            connected: AtomicBool::new(connected),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ReachabilityProbe for CountingProbe {
    fn is_connected(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.connected.load(Ordering::SeqCst)
    }
}

/// How `RecordingReporter` answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReporterBehavior {
    /// Every report succeeds
    Accept,
    /// Every report fails with this status
    Reject(reqwest::StatusCode),
    /// Every report panics
    Panic,
    /// Every report waits forever
    Hang,
}

/// Reporter that records accepted samples instead of sending them
#[derive(Debug)]
pub struct RecordingReporter {
    behavior: Mutex<ReporterBehavior>,
    attempts: AtomicUsize,
    reported: Mutex<Vec<LocationSample>>,
}

impl RecordingReporter {
    pub fn new(behavior: ReporterBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            attempts: AtomicUsize::new(0),
            reported: Mutex::new(Vec::new()),
        }
    }

    pub fn set_behavior(&self, behavior: ReporterBehavior) {
        *lock(&self.behavior) = behavior;
    }

    /// Number of times `report` was called
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Samples that were accepted
    pub fn reported(&self) -> Vec<LocationSample> {
        lock(&self.reported).clone()
    }
}

#[async_trait]
impl SampleReporter for RecordingReporter {
    async fn report(&self, sample: &LocationSample) -> std::result::Result<(), ReportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let behavior = *lock(&self.behavior);
        match behavior {
            ReporterBehavior::Accept => {
                lock(&self.reported).push(sample.clone());
                Ok(())
            }
            ReporterBehavior::Reject(status) => Err(ReportError::Status(status)),
            ReporterBehavior::Panic => panic!("reporter failure injected by test"),
            ReporterBehavior::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}
