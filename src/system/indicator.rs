//! Persistent tracking notice on the operator's terminal

use console::{style, Term};
use fieldtrack_core_interface::{ForegroundIndicator, IndicatorText};

/// Prints the indicator to stderr when tracking starts and stops
#[derive(Debug, Clone)]
pub struct ConsoleIndicator {
    term: Term,
}

impl ConsoleIndicator {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }
}

impl Default for ConsoleIndicator {
    fn default() -> Self {
        Self::new()
    }
}

impl ForegroundIndicator for ConsoleIndicator {
    fn show(&self, _task_name: &str, text: &IndicatorText) {
        // Terminal write failures have nowhere to go
        let _ = self.term.write_line(&format!(
            "{} {}\n   {}",
            style("●").green().bold(),
            style(&text.title).bold(),
            style(&text.body).dim()
        ));
    }

    fn clear(&self, _task_name: &str) {
        let _ = self.term.write_line(&format!(
            "{} {}",
            style("○").dim(),
            style("Location tracking stopped").dim()
        ));
    }
}
