//! Plan policy lookup
//!
//! Backend policies are static configuration, read-only at runtime. The
//! built-in catalog mirrors the hosted plan tiers; embedders with their own
//! billing source implement [`PlanPolicies`] against it.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::models::{BackendPolicy, ForecastBackend};

/// Plan policy lookup
pub trait PlanPolicies: Send + Sync {
    /// Policy for a plan
    fn backend_policy(&self, plan_id: &str) -> Result<BackendPolicy>;
}

/// Static in-memory plan catalog
pub struct StaticPlanPolicies {
    plans: HashMap<String, BackendPolicy>,
}

impl Default for StaticPlanPolicies {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticPlanPolicies {
    /// Create the catalog with the built-in plan tiers
    pub fn new() -> Self {
        let mut plans = HashMap::new();

        // free: statistical methods only, paid backend disabled outright
        plans.insert(
            "free".to_string(),
            BackendPolicy {
                plan_id: "free".to_string(),
                default_backend: ForecastBackend::Statistical,
                allowed_backends: vec![ForecastBackend::Statistical, ForecastBackend::Stub],
                daily_limits: HashMap::from([(ForecastBackend::TimeGpt, -1)]),
                max_history_points: 90,
                max_horizon_days: 14,
            },
        );

        // growth: paid backend with a modest daily quota
        plans.insert(
            "growth".to_string(),
            BackendPolicy {
                plan_id: "growth".to_string(),
                default_backend: ForecastBackend::Statistical,
                allowed_backends: vec![
                    ForecastBackend::Statistical,
                    ForecastBackend::Stub,
                    ForecastBackend::TimeGpt,
                ],
                daily_limits: HashMap::from([(ForecastBackend::TimeGpt, 25)]),
                max_history_points: 365,
                max_horizon_days: 30,
            },
        );

        // scale: generous quota, long history and horizon
        plans.insert(
            "scale".to_string(),
            BackendPolicy {
                plan_id: "scale".to_string(),
                default_backend: ForecastBackend::Statistical,
                allowed_backends: vec![
                    ForecastBackend::Statistical,
                    ForecastBackend::Stub,
                    ForecastBackend::TimeGpt,
                ],
                daily_limits: HashMap::from([(ForecastBackend::TimeGpt, 250)]),
                max_history_points: 1825,
                max_horizon_days: 90,
            },
        );

        Self { plans }
    }

    /// Add or replace a plan
    pub fn with_plan(mut self, policy: BackendPolicy) -> Self {
        self.plans.insert(policy.plan_id.clone(), policy);
        self
    }
}

impl PlanPolicies for StaticPlanPolicies {
    fn backend_policy(&self, plan_id: &str) -> Result<BackendPolicy> {
        self.plans
            .get(plan_id)
            .cloned()
            .ok_or_else(|| Error::not_found("plan", plan_id))
    }
}
