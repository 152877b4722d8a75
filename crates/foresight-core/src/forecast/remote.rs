//! Remote and synthetic forecast backends
//!
//! The remote backend is an opaque paid API: points and a horizon go in,
//! predictions come out. Failures are propagated as
//! [`Error::RemoteBackend`](crate::Error::RemoteBackend); falling back to a
//! statistical method is an explicit caller decision, never automatic.

use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RemoteBackendConfig;
use crate::error::{Error, Result};
use crate::models::{ForecastPrediction, TimeSeriesPoint};

use super::statistical::{daily_timestamps, prediction, z_score};

/// A remote forecasting backend
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    /// Model name stamped into the forecast's model info
    fn name(&self) -> &str;

    /// Predict `horizon_days` future values from the given history
    async fn forecast(
        &self,
        points: &[TimeSeriesPoint],
        horizon_days: u32,
    ) -> Result<Vec<ForecastPrediction>>;
}

/// HTTP client for a TimeGPT-style forecasting API
pub struct TimeGptClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Serialize)]
struct ForecastCall {
    points: Vec<TimeSeriesPoint>,
    horizon_days: u32,
}

#[derive(Deserialize)]
struct ForecastCallResponse {
    predictions: Vec<ForecastPrediction>,
}

impl TimeGptClient {
    /// Create a client from configuration
    pub fn new(config: &RemoteBackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl RemoteBackend for TimeGptClient {
    fn name(&self) -> &str {
        "timegpt"
    }

    async fn forecast(
        &self,
        points: &[TimeSeriesPoint],
        horizon_days: u32,
    ) -> Result<Vec<ForecastPrediction>> {
        let url = format!("{}/v1/forecast", self.base_url);
        let call = ForecastCall {
            points: points.to_vec(),
            horizon_days,
        };

        debug!(url = %url, points = points.len(), horizon_days, "calling remote backend");

        let response = self
            .client
            .post(&url)
            .header("X-API-Key", &self.api_key)
            .json(&call)
            .send()
            .await
            .map_err(|e| Error::remote(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::remote(format!("backend returned {status}: {body}")));
        }

        let body: ForecastCallResponse = response
            .json()
            .await
            .map_err(|e| Error::remote(format!("malformed backend response: {e}")))?;

        if body.predictions.len() != horizon_days as usize {
            return Err(Error::remote(format!(
                "backend returned {} predictions for a {horizon_days}-day horizon",
                body.predictions.len()
            )));
        }

        Ok(body.predictions)
    }
}

/// Deterministic synthetic backend for development and demos
///
/// Produces a random walk around the last observed value. The generator is
/// seeded from the input itself, so identical input always yields identical
/// predictions; that seed derivation is this backend's determinism contract.
#[derive(Debug, Clone)]
pub struct StubBackend {
    /// Largest per-step drift, as a fraction of the value scale
    pub drift_fraction: f64,
}

impl Default for StubBackend {
    fn default() -> Self {
        Self {
            drift_fraction: 0.02,
        }
    }
}

impl StubBackend {
    /// Predict a seeded random walk from the last observed value
    pub fn predict(
        &self,
        points: &[TimeSeriesPoint],
        horizon_days: u32,
        confidence_level: f64,
        clamp_non_negative: bool,
    ) -> Vec<ForecastPrediction> {
        let last = points[points.len() - 1];
        let scale = last.value.abs().max(1.0);
        let half_width = z_score(confidence_level) * self.drift_fraction * scale;

        let mut rng = StdRng::seed_from_u64(seed_from_input(points, horizon_days));
        let mut value = last.value;

        daily_timestamps(last.timestamp, horizon_days)
            .into_iter()
            .map(|ts| {
                value += rng.gen_range(-self.drift_fraction..=self.drift_fraction) * scale;
                prediction(ts, value, half_width, clamp_non_negative)
            })
            .collect()
    }
}

/// Seed derived from the input so the walk is reproducible per request
fn seed_from_input(points: &[TimeSeriesPoint], horizon_days: u32) -> u64 {
    let last = points[points.len() - 1];
    last.value
        .to_bits()
        .wrapping_mul(0x9e37_79b9_7f4a_7c15)
        ^ (points.len() as u64).rotate_left(17)
        ^ u64::from(horizon_days).rotate_left(47)
}
