//! Fieldtrack Scheduler: In-Process Background Task Driver
//!
//! Mobile platforms run registered background work on their own cadence,
//! whether or not the application is in the foreground. On servers and
//! desktops there is no such service, so this crate provides one: an
//! implementation of `SchedulerPort` that owns a timer-driven worker per task.
//!
//! # Worker Cycle
//!
//! ```text
//! ┌─────────────┐
//! │    Tick     │──> Wait for the task's minimum interval (missed ticks skipped)
//! └──────┬──────┘
//!        │
//!        v
//! ┌─────────────┐
//! │   Capture   │──> Ask the LocationProvider for a batch (or its error)
//! └──────┬──────┘
//!        │
//!        v
//! ┌─────────────┐
//! │   Filter    │──> Drop samples inside the distance interval, if any
//! └──────┬──────┘
//!        │
//!        v
//! ┌─────────────┐
//! │   Invoke    │──> Run the TaskHandler to completion
//! └──────┬──────┘
//!        │
//!        └────> Loop until deregistered
//! ```
//!
//! # Example
//!
//! ```no_run
//! use fieldtrack_core_interface::{LocationProvider, SchedulerPort, TaskHandler, TaskOptions};
//! use fieldtrack_scheduler::IntervalScheduler;
//! use std::sync::Arc;
//!
//! # async fn example(
//! #     provider: Arc<dyn LocationProvider>,
//! #     handler: Arc<dyn TaskHandler>,
//! # ) -> fieldtrack_core_interface::Result<()> {
//! let scheduler = IntervalScheduler::new(provider);
//! scheduler
//!     .register("background-location-task", TaskOptions::default(), handler)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod daemon;
pub mod filter;
pub mod indicator;
pub mod metrics;

pub use daemon::IntervalScheduler;
pub use filter::DistanceFilter;
pub use indicator::TracingIndicator;
pub use metrics::{TaskStats, TaskStatsSnapshot};
