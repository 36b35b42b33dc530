//! Location sources for hosts without a platform location service

use crate::config::SourceConfig;
use crate::error::{FieldtrackError, Result};
use async_trait::async_trait;
use chrono::Utc;
use fieldtrack_core_interface::{
    Accuracy, LocationProvider, LocationSample, TaskError, TaskInvocation,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Reports the same position on every capture
#[derive(Debug, Clone)]
pub struct StaticProvider {
    sample: LocationSample,
}

impl StaticProvider {
    pub fn new(sample: LocationSample) -> Self {
        Self { sample }
    }
}

#[async_trait]
impl LocationProvider for StaticProvider {
    async fn capture(&self, _accuracy: Accuracy) -> TaskInvocation {
        Ok(vec![self.sample.clone().captured_at(Utc::now())])
    }
}

/// Walks through a recorded route, one sample per capture
///
/// The file holds one JSON sample per line
/// (`{"latitude": .., "longitude": .., "accuracy": .., "speed": ..}`); blank
/// lines are ignored. Once the route is exhausted the last position is
/// repeated, like a device parked at its destination.
#[derive(Debug)]
pub struct ReplayProvider {
    samples: Vec<LocationSample>,
    cursor: AtomicUsize,
}

impl ReplayProvider {
    pub fn new(samples: Vec<LocationSample>) -> Self {
        Self {
            samples,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Load a JSON-lines route file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let samples = parse_route(&contents).map_err(|reason| FieldtrackError::Replay {
            path: path.display().to_string(),
            reason,
        })?;

        debug!(path = %path.display(), samples = samples.len(), "Loaded replay route");
        Ok(Self::new(samples))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

fn parse_route(contents: &str) -> std::result::Result<Vec<LocationSample>, String> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str::<LocationSample>(line)
                .map_err(|e| format!("line {}: {}", idx + 1, e))
        })
        .collect()
}

#[async_trait]
impl LocationProvider for ReplayProvider {
    async fn capture(&self, _accuracy: Accuracy) -> TaskInvocation {
        let Some(last) = self.samples.len().checked_sub(1) else {
            return Err(TaskError::LocationUnavailable(
                "replay route is empty".to_string(),
            ));
        };

        let idx = self.cursor.fetch_add(1, Ordering::Relaxed).min(last);
        Ok(vec![self.samples[idx].clone().captured_at(Utc::now())])
    }
}

/// Build the provider described by configuration
pub fn from_config(source: &SourceConfig) -> Result<Arc<dyn LocationProvider>> {
    Ok(match source {
        SourceConfig::Static {
            latitude,
            longitude,
            accuracy,
            speed,
        } => Arc::new(StaticProvider::new(
            LocationSample::new(*latitude, *longitude, *accuracy).with_speed(*speed),
        )),
        SourceConfig::Replay { path } => Arc::new(ReplayProvider::from_file(path)?),
    })
}
