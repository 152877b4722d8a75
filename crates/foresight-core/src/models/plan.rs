//! Plan policy and backend selection models

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A forecasting backend
///
/// Closed set of variants; the backend for a request is resolved exactly
/// once, at selection time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ForecastBackend {
    /// In-process statistical methods (SMA, EWMA, linear). Never metered.
    #[default]
    #[serde(alias = "stat")]
    Statistical,
    /// Deterministic synthetic backend for development and demos
    Stub,
    /// Remote paid forecasting API
    TimeGpt,
}

impl fmt::Display for ForecastBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Statistical => "statistical",
            Self::Stub => "stub",
            Self::TimeGpt => "timegpt",
        };
        f.write_str(name)
    }
}

/// Per-plan backend policy
///
/// Static configuration, read-only at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendPolicy {
    /// Plan this policy belongs to
    pub plan_id: String,

    /// Backend used when the caller does not request one
    pub default_backend: ForecastBackend,

    /// Backends the plan may use at all
    pub allowed_backends: Vec<ForecastBackend>,

    /// Daily call limits per backend: `> 0` finite quota, `0` unlimited,
    /// `-1` disabled for this plan
    pub daily_limits: HashMap<ForecastBackend, i64>,

    /// Most history points a forecast request may carry
    pub max_history_points: usize,

    /// Longest horizon a forecast request may ask for
    pub max_horizon_days: u32,
}

impl BackendPolicy {
    /// Whether the plan permits a backend
    pub fn allows(&self, backend: ForecastBackend) -> bool {
        self.allowed_backends.contains(&backend)
    }

    /// Daily limit for a backend; absent entries mean unlimited
    pub fn daily_limit(&self, backend: ForecastBackend) -> i64 {
        self.daily_limits.get(&backend).copied().unwrap_or(0)
    }

    /// Whether a backend counts against a finite daily quota
    pub fn is_metered(&self, backend: ForecastBackend) -> bool {
        backend != ForecastBackend::Statistical && self.daily_limit(backend) > 0
    }
}

/// A per-organization, per-backend, per-day usage counter snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCounter {
    /// Organization the counter belongs to
    pub org_id: String,

    /// Metered backend
    pub backend: ForecastBackend,

    /// Day the counter covers; reset is implicit in the key
    pub day: NaiveDate,

    /// Calls recorded so far
    pub count: i64,
}

/// Outcome of backend selection for one forecast request
///
/// Produced once per request; not persisted by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSelectionResult {
    /// Backend the forecast will run on
    pub selected_backend: ForecastBackend,

    /// Why this backend was chosen
    pub rationale: String,

    /// Backend the caller asked for, when selection fell back from it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_from: Option<ForecastBackend>,

    /// Warning surfaced to the caller (quota exhausted, not permitted, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,

    /// Estimated cost of the call in USD, for metered backends
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_estimate: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_serde_roundtrip() {
        let json = serde_json::to_string(&ForecastBackend::TimeGpt).unwrap();
        assert_eq!(json, "\"timegpt\"");
        let back: ForecastBackend = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ForecastBackend::TimeGpt);
    }

    #[test]
    fn backend_accepts_legacy_stat_tag() {
        let backend: ForecastBackend = serde_json::from_str("\"stat\"").unwrap();
        assert_eq!(backend, ForecastBackend::Statistical);
    }

    #[test]
    fn absent_limit_means_unlimited() {
        let policy = BackendPolicy {
            plan_id: "test".to_string(),
            default_backend: ForecastBackend::Statistical,
            allowed_backends: vec![ForecastBackend::Statistical, ForecastBackend::Stub],
            daily_limits: HashMap::new(),
            max_history_points: 100,
            max_horizon_days: 30,
        };

        assert_eq!(policy.daily_limit(ForecastBackend::Stub), 0);
        assert!(!policy.is_metered(ForecastBackend::Stub));
    }
}
