//! Scheduler Metrics
//!
//! Per-task counters for the interval worker loop.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of a task's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatsSnapshot {
    /// Number of timer ticks the worker observed
    pub ticks: u64,

    /// Number of times the handler was invoked (batch or error)
    pub invocations: u64,

    /// Number of invocations that carried a provider error
    pub provider_errors: u64,

    /// Number of ticks skipped because the distance filter removed every sample
    pub filtered: u64,

    /// Number of invocations whose handler panicked
    pub handler_panics: u64,
}

impl TaskStatsSnapshot {
    /// Format a human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "Ticks: {} | Invocations: {} | Provider errors: {} | Filtered: {} | Handler panics: {}",
            self.ticks, self.invocations, self.provider_errors, self.filtered, self.handler_panics
        )
    }
}

/// Live counters shared between the registry and a task's worker
#[derive(Debug, Default)]
pub struct TaskStats {
    ticks: AtomicU64,
    invocations: AtomicU64,
    provider_errors: AtomicU64,
    filtered: AtomicU64,
    handler_panics: AtomicU64,
}

impl TaskStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invocation(&self) {
        self.invocations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_provider_error(&self) {
        self.provider_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_filtered(&self) {
        self.filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_handler_panic(&self) {
        self.handler_panics.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> TaskStatsSnapshot {
        TaskStatsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            invocations: self.invocations.load(Ordering::Relaxed),
            provider_errors: self.provider_errors.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            handler_panics: self.handler_panics.load(Ordering::Relaxed),
        }
    }
}
