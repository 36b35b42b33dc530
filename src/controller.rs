/*!
 * Tracking Lifecycle Controller - the only way in and out of tracking
 *
 * `start()` negotiates permissions and makes sure exactly one background task
 * is registered under the configured name; `stop()` removes it. Neither ever
 * returns an error: a denied permission or an unavailable scheduler simply
 * means tracking is not running, which the returned outcome reports.
 *
 * The scheduler's registry is the only source of truth for whether the task
 * is registered. The controller queries it before every decision and keeps
 * its own `RegistrationState` purely as a record of what it last observed.
 */

use fieldtrack_core_interface::{
    PermissionPort, PermissionScope, PortError, SchedulerPort, TaskHandler, TaskOptions,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Registration state as last observed by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationState {
    #[default]
    Unregistered,
    /// A `register` call is in flight
    Registering,
    Active,
    /// A `deregister` call is in flight
    Stopping,
}

impl fmt::Display for RegistrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationState::Unregistered => write!(f, "unregistered"),
            RegistrationState::Registering => write!(f, "registering"),
            RegistrationState::Active => write!(f, "active"),
            RegistrationState::Stopping => write!(f, "stopping"),
        }
    }
}

/// Result of a `start()` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The task was registered by this call
    Registered,
    /// The task was already registered; nothing changed
    AlreadyRegistered,
    /// A permission was not granted; nothing was registered
    PermissionDenied(PermissionScope),
    /// The scheduler could not be queried or refused the registration
    SchedulerUnavailable,
}

impl StartOutcome {
    /// Whether tracking is running after this call
    pub fn is_tracking(&self) -> bool {
        matches!(
            self,
            StartOutcome::Registered | StartOutcome::AlreadyRegistered
        )
    }
}

/// Result of a `stop()` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The task was deregistered by this call
    Deregistered,
    /// No task was registered; nothing changed
    NotRegistered,
    /// The scheduler could not be queried or refused the deregistration
    SchedulerUnavailable,
}

/// Enables and disables background location tracking
///
/// # Example
///
/// ```no_run
/// use fieldtrack::controller::TrackingLifecycleController;
/// use fieldtrack_core_interface::{PermissionPort, SchedulerPort, TaskHandler, TaskOptions};
/// use std::sync::Arc;
///
/// # async fn example(
/// #     permissions: Arc<dyn PermissionPort>,
/// #     scheduler: Arc<dyn SchedulerPort>,
/// #     task: Arc<dyn TaskHandler>,
/// # ) {
/// let controller = TrackingLifecycleController::new(
///     permissions,
///     scheduler,
///     task,
///     "background-location-task",
///     TaskOptions::default(),
/// );
///
/// if controller.start().await.is_tracking() {
///     // ... on logout
///     controller.stop().await;
/// }
/// # }
/// ```
pub struct TrackingLifecycleController {
    permissions: Arc<dyn PermissionPort>,
    scheduler: Arc<dyn SchedulerPort>,
    task: Arc<dyn TaskHandler>,
    task_name: String,
    options: TaskOptions,
    state: RwLock<RegistrationState>,
}

impl TrackingLifecycleController {
    pub fn new(
        permissions: Arc<dyn PermissionPort>,
        scheduler: Arc<dyn SchedulerPort>,
        task: Arc<dyn TaskHandler>,
        task_name: impl Into<String>,
        options: TaskOptions,
    ) -> Self {
        Self {
            permissions,
            scheduler,
            task,
            task_name: task_name.into(),
            options,
            state: RwLock::new(RegistrationState::Unregistered),
        }
    }

    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    pub fn options(&self) -> &TaskOptions {
        &self.options
    }

    /// Last state this controller observed
    pub async fn state(&self) -> RegistrationState {
        *self.state.read().await
    }

    /// Ask the scheduler whether the task is registered right now
    pub async fn is_active(&self) -> bool {
        match self.scheduler.is_registered(&self.task_name).await {
            Ok(registered) => registered,
            Err(e) => {
                warn!(task = %self.task_name, "Could not query scheduler: {}", e);
                false
            }
        }
    }

    /// Enable background tracking
    ///
    /// 1. Request foreground permission; stop here if not granted
    /// 2. Request background permission; stop here if not granted
    /// 3. Query the scheduler for an existing registration
    /// 4. Register the capture task if there is none
    ///
    /// Calling this repeatedly never registers more than one task.
    pub async fn start(&self) -> StartOutcome {
        let foreground = self.permissions.request_foreground().await;
        if !foreground.is_granted() {
            info!(task = %self.task_name, ?foreground, "Foreground location permission not granted");
            return StartOutcome::PermissionDenied(PermissionScope::Foreground);
        }

        let background = self.permissions.request_background().await;
        if !background.is_granted() {
            info!(task = %self.task_name, ?background, "Background location permission not granted");
            return StartOutcome::PermissionDenied(PermissionScope::Background);
        }

        match self.scheduler.is_registered(&self.task_name).await {
            Ok(true) => {
                debug!(task = %self.task_name, "Background task already registered");
                self.set_state(RegistrationState::Active).await;
                return StartOutcome::AlreadyRegistered;
            }
            Ok(false) => {}
            Err(e) => {
                warn!(task = %self.task_name, "Could not query scheduler: {}", e);
                return StartOutcome::SchedulerUnavailable;
            }
        }

        self.set_state(RegistrationState::Registering).await;

        let result = self
            .scheduler
            .register(&self.task_name, self.options.clone(), self.task.clone())
            .await;

        match result {
            Ok(()) => {
                self.set_state(RegistrationState::Active).await;
                info!(
                    task = %self.task_name,
                    interval_ms = self.options.min_interval_ms,
                    "Background location tracking started"
                );
                StartOutcome::Registered
            }
            // Registered by someone else between the query and our call
            Err(PortError::AlreadyRegistered(_)) => {
                self.set_state(RegistrationState::Active).await;
                StartOutcome::AlreadyRegistered
            }
            Err(e) => {
                self.set_state(RegistrationState::Unregistered).await;
                warn!(task = %self.task_name, "Background task registration failed: {}", e);
                StartOutcome::SchedulerUnavailable
            }
        }
    }

    /// Disable background tracking
    ///
    /// Safe to call when tracking is not running. An invocation that is
    /// already executing is left to finish.
    pub async fn stop(&self) -> StopOutcome {
        match self.scheduler.is_registered(&self.task_name).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(task = %self.task_name, "Background task not registered, nothing to stop");
                self.set_state(RegistrationState::Unregistered).await;
                return StopOutcome::NotRegistered;
            }
            Err(e) => {
                warn!(task = %self.task_name, "Could not query scheduler: {}", e);
                return StopOutcome::SchedulerUnavailable;
            }
        }

        self.set_state(RegistrationState::Stopping).await;

        match self.scheduler.deregister(&self.task_name).await {
            Ok(()) => {
                self.set_state(RegistrationState::Unregistered).await;
                info!(task = %self.task_name, "Background location tracking stopped");
                StopOutcome::Deregistered
            }
            // Removed by someone else between the query and our call
            Err(PortError::NotRegistered(_)) => {
                self.set_state(RegistrationState::Unregistered).await;
                StopOutcome::NotRegistered
            }
            Err(e) => {
                self.set_state(RegistrationState::Active).await;
                warn!(task = %self.task_name, "Background task deregistration failed: {}", e);
                StopOutcome::SchedulerUnavailable
            }
        }
    }

    async fn set_state(&self, state: RegistrationState) {
        let mut current = self.state.write().await;
        let previous = *current;
        if previous != state {
            debug!(task = %self.task_name, from = %previous, to = %state, "Registration state change");
            *current = state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockPermissions, MockScheduler, SchedulerCall};
    use async_trait::async_trait;
    use fieldtrack_core_interface::{PermissionStatus, TaskInvocation};

    const TASK: &str = "background-location-task";

    struct NoopTask;

    #[async_trait]
    impl TaskHandler for NoopTask {
        async fn handle(&self, _invocation: TaskInvocation) {}
    }

    fn controller(
        permissions: MockPermissions,
    ) -> (TrackingLifecycleController, Arc<MockPermissions>, MockScheduler) {
        let permissions = Arc::new(permissions);
        let scheduler = MockScheduler::new();
        let controller = TrackingLifecycleController::new(
            permissions.clone(),
            Arc::new(scheduler.clone()),
            Arc::new(NoopTask),
            TASK,
            TaskOptions::default(),
        );
        (controller, permissions, scheduler)
    }

    #[tokio::test]
    async fn test_start_registers_once() {
        let (controller, _permissions, scheduler) = controller(MockPermissions::granted());

        assert_eq!(controller.start().await, StartOutcome::Registered);
        assert_eq!(controller.start().await, StartOutcome::AlreadyRegistered);

        assert_eq!(scheduler.registrations().len(), 1);
        assert_eq!(controller.state().await, RegistrationState::Active);
        assert!(controller.is_active().await);
    }

    #[tokio::test]
    async fn test_foreground_denial_short_circuits() {
        let (controller, permissions, scheduler) = controller(MockPermissions::new(
            PermissionStatus::Denied,
            PermissionStatus::Granted,
        ));

        let outcome = controller.start().await;

        assert_eq!(
            outcome,
            StartOutcome::PermissionDenied(PermissionScope::Foreground)
        );
        assert!(!outcome.is_tracking());
        assert_eq!(permissions.foreground_requests(), 1);
        assert_eq!(permissions.background_requests(), 0);
        assert!(scheduler.calls().is_empty());
        assert_eq!(controller.state().await, RegistrationState::Unregistered);
    }

    #[tokio::test]
    async fn test_background_denial_registers_nothing() {
        let (controller, permissions, scheduler) = controller(MockPermissions::new(
            PermissionStatus::Granted,
            PermissionStatus::Undetermined,
        ));

        assert_eq!(
            controller.start().await,
            StartOutcome::PermissionDenied(PermissionScope::Background)
        );
        assert_eq!(permissions.background_requests(), 1);
        assert!(scheduler.registrations().is_empty());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let (controller, _permissions, scheduler) = controller(MockPermissions::granted());

        controller.start().await;
        assert_eq!(controller.stop().await, StopOutcome::Deregistered);
        assert_eq!(controller.stop().await, StopOutcome::NotRegistered);

        assert_eq!(scheduler.deregistrations(), vec![TASK.to_string()]);
        assert_eq!(controller.state().await, RegistrationState::Unregistered);
    }

    #[tokio::test]
    async fn test_stop_without_start() {
        let (controller, _permissions, scheduler) = controller(MockPermissions::granted());

        assert_eq!(controller.stop().await, StopOutcome::NotRegistered);
        assert_eq!(
            scheduler.calls(),
            vec![SchedulerCall::IsRegistered(TASK.to_string())]
        );
    }

    #[tokio::test]
    async fn test_scheduler_is_queried_not_cached() {
        let (controller, _permissions, scheduler) = controller(MockPermissions::granted());

        controller.start().await;

        // The platform dropped the registration without telling us
        scheduler.forget(TASK);

        assert_eq!(controller.start().await, StartOutcome::Registered);
        assert_eq!(scheduler.registrations().len(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_scheduler_is_not_an_error() {
        let (controller, _permissions, scheduler) = controller(MockPermissions::granted());
        scheduler.set_unavailable(true);

        assert_eq!(controller.start().await, StartOutcome::SchedulerUnavailable);
        assert_eq!(controller.stop().await, StopOutcome::SchedulerUnavailable);
        assert!(!controller.is_active().await);
        assert_eq!(controller.state().await, RegistrationState::Unregistered);
    }
}
