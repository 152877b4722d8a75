//! Configuration management for Foresight

use serde::{Deserialize, Serialize};

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Forecasting configuration
    pub forecasting: ForecastingConfig,

    /// Alerting configuration
    pub alerting: AlertingConfig,

    /// Remote forecast backend configuration
    pub remote_backend: RemoteBackendConfig,
}

/// Forecasting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastingConfig {
    /// Trailing window for the simple moving average method
    pub sma_window: usize,
    /// Smoothing factor for the exponentially weighted method (0 < alpha < 1)
    pub ewma_alpha: f64,
    /// Trailing window for the linear regression method
    pub linear_window: usize,
    /// Confidence level used when a request does not specify one
    pub default_confidence_level: f64,
}

impl Default for ForecastingConfig {
    fn default() -> Self {
        Self {
            sma_window: 7,
            ewma_alpha: 0.3,
            linear_window: 6,
            default_confidence_level: 0.95,
        }
    }
}

/// Alerting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertingConfig {
    /// Minutes during which a rule that already fired is not fired again.
    /// Zero disables suppression and restores fire-on-every-pass behavior.
    pub suppression_window_minutes: u64,
    /// Horizon used when a rule does not specify one
    pub default_horizon_days: u32,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            suppression_window_minutes: 15,
            default_horizon_days: 7,
        }
    }
}

/// Remote forecast backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteBackendConfig {
    /// Base URL of the remote forecasting API
    pub base_url: String,
    /// API key sent with every call
    pub api_key: String,
    /// HTTP client timeout in seconds
    pub timeout_secs: u64,
    /// Estimated cost of one forecast call in USD
    pub price_per_call_usd: f64,
}

impl Default for RemoteBackendConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.timegpt.example.com".to_string(),
            api_key: String::new(),
            timeout_secs: 30,
            price_per_call_usd: 0.05,
        }
    }
}
