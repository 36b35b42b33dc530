/*!
 * Location Sample Reporter - one sample, one request
 *
 * Every call performs exactly one POST to the telemetry endpoint. There is no
 * retry and no per-status policy: any failure is returned to the caller as a
 * `ReportError` and the caller decides what to do with it (the capture task
 * drops it).
 */

use crate::config::TrackerConfig;
use crate::error::{FieldtrackError, ReportError};
use async_trait::async_trait;
use fieldtrack_core_interface::LocationSample;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Sends a single location sample to the backend
#[async_trait]
pub trait SampleReporter: Send + Sync {
    async fn report(&self, sample: &LocationSample) -> Result<(), ReportError>;
}

/// Wire body accepted by the telemetry endpoint
///
/// The capture timestamp stays on the device; the backend stamps records on
/// arrival.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
    pub speed: f64,
}

impl From<&LocationSample> for TelemetryRecord {
    fn from(sample: &LocationSample) -> Self {
        Self {
            latitude: sample.latitude,
            longitude: sample.longitude,
            accuracy: sample.accuracy,
            speed: sample.speed,
        }
    }
}

/// Reporter that POSTs JSON over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpReporter {
    client: Client,
    url: Url,
    auth_token: Option<String>,
}

impl HttpReporter {
    /// Create a reporter for `url` with a per-request timeout
    pub fn new(url: Url, timeout: Duration) -> Result<Self, ReportError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("fieldtrack/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            url,
            auth_token: None,
        })
    }

    /// Build a reporter from the tracker configuration
    pub fn from_config(config: &TrackerConfig) -> Result<Self, FieldtrackError> {
        let reporter = Self::new(config.telemetry_url()?, config.request_timeout())?;
        Ok(match &config.auth_token {
            Some(token) => reporter.with_bearer_token(token.clone()),
            None => reporter,
        })
    }

    /// Authenticate requests with a bearer token
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Endpoint this reporter posts to
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl SampleReporter for HttpReporter {
    async fn report(&self, sample: &LocationSample) -> Result<(), ReportError> {
        let body = serde_json::to_vec(&TelemetryRecord::from(sample))?;

        let mut request = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body);

        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(ReportError::Status(status));
        }

        debug!(url = %self.url, %status, "Location sample accepted");
        Ok(())
    }
}
