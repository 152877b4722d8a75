//! Forecast data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::series::TimeSeriesPoint;

/// Statistical forecasting method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ForecastMethod {
    /// Simple moving average over a trailing window
    #[default]
    Sma,
    /// Exponentially weighted moving average
    Ewma,
    /// Ordinary least-squares fit over a trailing window
    Linear,
}

impl ForecastMethod {
    /// Canonical method name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sma => "sma",
            Self::Ewma => "ewma",
            Self::Linear => "linear",
        }
    }
}

/// A request to forecast a metric
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastRequest {
    /// Metric this forecast is for
    pub metric: String,

    /// Historical points, ascending by timestamp (at least 2)
    pub points: Vec<TimeSeriesPoint>,

    /// Number of future days to predict (at least 1)
    pub horizon_days: u32,

    /// Confidence level for the prediction band, in (0, 1)
    pub confidence_level: f64,

    /// Statistical method to use on the statistical backend
    pub method: ForecastMethod,

    /// Clamp predictions and lower bounds at zero. Set this for metrics
    /// whose domain cannot go negative (counts, revenue); it is not assumed
    /// globally.
    #[serde(default)]
    pub clamp_non_negative: bool,
}

/// One predicted value with its confidence band
///
/// Invariant: `confidence_lower <= predicted_value <= confidence_upper`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPrediction {
    /// Day this prediction is for
    pub timestamp: DateTime<Utc>,

    /// Predicted value
    pub predicted_value: f64,

    /// Lower bound of the confidence band
    pub confidence_lower: f64,

    /// Upper bound of the confidence band
    pub confidence_upper: f64,
}

/// Information about the model that produced a forecast
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model name (e.g. "sma", "linear", "timegpt")
    pub name: String,

    /// Model version
    pub version: String,

    /// Model parameters (window sizes, smoothing factors, ...)
    pub parameters: serde_json::Value,
}

/// A completed forecast
///
/// Immutable once produced; owned by the requesting call and handed to the
/// persistence collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forecast {
    /// Metric the forecast is for
    pub metric: String,

    /// Predictions, one per horizon day, ascending by timestamp
    pub predictions: Vec<ForecastPrediction>,

    /// Model that produced the predictions
    pub model_info: ModelInfo,

    /// When the forecast was generated
    pub generated_at: DateTime<Utc>,
}
