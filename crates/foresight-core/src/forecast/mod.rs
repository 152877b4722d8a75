//! Forecast engine
//!
//! Computes predictions with confidence intervals from historical points.
//! The statistical methods run in-process and are pure; the stub and remote
//! variants cover development and paid-API backends. Which variant runs is
//! decided once, at backend selection time, and passed in as a
//! [`ForecastBackend`] value.

mod remote;
mod statistical;

pub use remote::{RemoteBackend, StubBackend, TimeGptClient};

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::config::ForecastingConfig;
use crate::error::{Error, Result};
use crate::models::{
    Forecast, ForecastBackend, ForecastMethod, ForecastPrediction, ForecastRequest, ModelInfo,
};

/// Forecast engine
///
/// Holds the statistical configuration and the optional remote backend
/// client. Collaborators are injected at construction.
pub struct ForecastEngine {
    config: ForecastingConfig,
    stub: StubBackend,
    remote: Option<Arc<dyn RemoteBackend>>,
}

impl ForecastEngine {
    /// Create an engine with no remote backend configured
    pub fn new(config: ForecastingConfig) -> Self {
        Self {
            config,
            stub: StubBackend::default(),
            remote: None,
        }
    }

    /// Attach a remote paid backend
    pub fn with_remote(mut self, remote: Arc<dyn RemoteBackend>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Run a forecast on the given backend
    ///
    /// Fails with [`Error::InsufficientData`] for fewer than 2 points and
    /// [`Error::InvalidParameter`] for a bad horizon or confidence level.
    /// Remote failures are propagated; there is no automatic fallback.
    pub async fn run(
        &self,
        request: &ForecastRequest,
        backend: ForecastBackend,
    ) -> Result<Forecast> {
        self.validate(request)?;

        let (predictions, model_info) = match backend {
            ForecastBackend::Statistical => self.statistical(request)?,
            ForecastBackend::Stub => {
                let predictions = self.stub.predict(
                    &request.points,
                    request.horizon_days,
                    request.confidence_level,
                    request.clamp_non_negative,
                );
                let model_info = ModelInfo {
                    name: "stub".to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    parameters: serde_json::json!({
                        "drift_fraction": self.stub.drift_fraction,
                        "confidence_level": request.confidence_level,
                    }),
                };
                (predictions, model_info)
            }
            ForecastBackend::TimeGpt => {
                let remote = self
                    .remote
                    .as_ref()
                    .ok_or_else(|| Error::remote("no remote backend configured"))?;
                let predictions = remote
                    .forecast(&request.points, request.horizon_days)
                    .await?;
                let model_info = ModelInfo {
                    name: remote.name().to_string(),
                    version: "remote".to_string(),
                    parameters: serde_json::json!({
                        "horizon_days": request.horizon_days,
                    }),
                };
                (predictions, model_info)
            }
        };

        debug!(
            metric = %request.metric,
            backend = %backend,
            predictions = predictions.len(),
            "forecast complete"
        );

        Ok(Forecast {
            metric: request.metric.clone(),
            predictions,
            model_info,
            generated_at: Utc::now(),
        })
    }

    /// Run a statistical method in-process
    fn statistical(
        &self,
        request: &ForecastRequest,
    ) -> Result<(Vec<ForecastPrediction>, ModelInfo)> {
        let cfg = &self.config;
        let (predictions, parameters) = match request.method {
            ForecastMethod::Sma => {
                let predictions = statistical::sma(
                    &request.points,
                    request.horizon_days,
                    request.confidence_level,
                    cfg.sma_window,
                    request.clamp_non_negative,
                );
                (
                    predictions,
                    serde_json::json!({
                        "window": cfg.sma_window,
                        "confidence_level": request.confidence_level,
                    }),
                )
            }
            ForecastMethod::Ewma => {
                if !(0.0..1.0).contains(&cfg.ewma_alpha) || cfg.ewma_alpha == 0.0 {
                    return Err(Error::invalid_parameter(format!(
                        "ewma alpha must be in (0, 1), got {}",
                        cfg.ewma_alpha
                    )));
                }
                let predictions = statistical::ewma(
                    &request.points,
                    request.horizon_days,
                    request.confidence_level,
                    cfg.ewma_alpha,
                    request.clamp_non_negative,
                );
                (
                    predictions,
                    serde_json::json!({
                        "alpha": cfg.ewma_alpha,
                        "confidence_level": request.confidence_level,
                    }),
                )
            }
            ForecastMethod::Linear => {
                let predictions = statistical::linear(
                    &request.points,
                    request.horizon_days,
                    request.confidence_level,
                    cfg.linear_window,
                    request.clamp_non_negative,
                );
                (
                    predictions,
                    serde_json::json!({
                        "window": cfg.linear_window,
                        "confidence_level": request.confidence_level,
                    }),
                )
            }
        };

        let model_info = ModelInfo {
            name: request.method.name().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            parameters,
        };

        Ok((predictions, model_info))
    }

    fn validate(&self, request: &ForecastRequest) -> Result<()> {
        if request.points.len() < 2 {
            return Err(Error::InsufficientData {
                points: request.points.len(),
            });
        }
        if request.horizon_days == 0 {
            return Err(Error::invalid_parameter("horizon_days must be positive"));
        }
        if !(request.confidence_level > 0.0 && request.confidence_level < 1.0) {
            return Err(Error::invalid_parameter(format!(
                "confidence_level must be in (0, 1), got {}",
                request.confidence_level
            )));
        }
        if request.points.iter().any(|p| !p.value.is_finite()) {
            return Err(Error::invalid_parameter("history contains non-finite values"));
        }

        Ok(())
    }
}
