//! Built-in persistent indicators

use fieldtrack_core_interface::{ForegroundIndicator, IndicatorText};
use tracing::info;

/// Announces the indicator through the log
///
/// Used when no interactive surface is attached, e.g. when running as a
/// service whose log is the only thing an operator sees.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingIndicator;

impl ForegroundIndicator for TracingIndicator {
    fn show(&self, task_name: &str, text: &IndicatorText) {
        info!(task = task_name, "📍 {}: {}", text.title, text.body);
    }

    fn clear(&self, task_name: &str) {
        info!(task = task_name, "Location tracking indicator cleared");
    }
}
