//! Per-call cost estimation for forecast backends

use std::collections::HashMap;

use crate::models::ForecastBackend;

/// Per-call pricing for forecast backends (USD)
///
/// Fills [`BackendSelectionResult::cost_estimate`]; free backends produce no
/// estimate at all.
///
/// [`BackendSelectionResult::cost_estimate`]: crate::models::BackendSelectionResult
#[derive(Debug, Clone)]
pub struct BackendPricing {
    per_call: HashMap<ForecastBackend, f64>,
}

impl Default for BackendPricing {
    fn default() -> Self {
        Self::new(0.05)
    }
}

impl BackendPricing {
    /// Create a pricing table with the given remote per-call price
    pub fn new(timegpt_per_call_usd: f64) -> Self {
        let mut per_call = HashMap::new();
        per_call.insert(ForecastBackend::TimeGpt, timegpt_per_call_usd);
        Self { per_call }
    }

    /// Estimated cost of one call on a backend, if it costs anything
    pub fn estimate(&self, backend: ForecastBackend) -> Option<f64> {
        self.per_call
            .get(&backend)
            .copied()
            .filter(|price| *price > 0.0)
    }

    /// Add or update the price of a backend
    pub fn set_price(&mut self, backend: ForecastBackend, per_call_usd: f64) {
        self.per_call.insert(backend, per_call_usd);
    }
}
