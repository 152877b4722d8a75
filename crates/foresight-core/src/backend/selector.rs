//! Backend selection
//!
//! Decides which forecast backend a request runs on, given the plan policy
//! and current usage. Quota pressure never fails a request here: a metered
//! backend at its daily limit downgrades to the statistical backend with a
//! warning. Only requests exceeding a hard plan cap are rejected.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{BackendSelectionResult, ForecastBackend};

use super::cost::BackendPricing;
use super::policy::PlanPolicies;
use super::usage::{today, UsageStore};

/// Chooses the forecast backend for a request
///
/// Collaborators are injected at construction; there is no shared global
/// state. The quota check reads the counter without reserving it: two
/// concurrent requests can both pass the check before either increments,
/// permitting transient over-quota use up to the degree of concurrency.
/// Closing that window fully would require a reserve-style counter at the
/// storage layer; the accepted contract is an atomic post-forecast
/// increment (see [`UsageStore`]), charged only after the paid call
/// succeeded.
pub struct BackendSelector {
    policies: Arc<dyn PlanPolicies>,
    usage: Arc<dyn UsageStore>,
    pricing: BackendPricing,
}

impl BackendSelector {
    /// Create a selector
    pub fn new(policies: Arc<dyn PlanPolicies>, usage: Arc<dyn UsageStore>) -> Self {
        Self {
            policies,
            usage,
            pricing: BackendPricing::default(),
        }
    }

    /// Use a custom pricing table for cost estimates
    pub fn with_pricing(mut self, pricing: BackendPricing) -> Self {
        self.pricing = pricing;
        self
    }

    /// Select the backend for one forecast request
    ///
    /// Fails only for hard plan caps ([`Error::PlanLimitExceeded`]) or a
    /// storage error reading usage; everything else downgrades and explains
    /// itself in `rationale` and `warning`.
    pub async fn select(
        &self,
        org_id: &str,
        plan_id: &str,
        requested: Option<ForecastBackend>,
        history_points: usize,
        horizon_days: u32,
    ) -> Result<BackendSelectionResult> {
        let policy = self.policies.backend_policy(plan_id)?;

        if history_points > policy.max_history_points {
            return Err(Error::plan_limit(format!(
                "{history_points} history points exceeds plan '{plan_id}' maximum of {}",
                policy.max_history_points
            )));
        }
        if horizon_days > policy.max_horizon_days {
            return Err(Error::plan_limit(format!(
                "{horizon_days}-day horizon exceeds plan '{plan_id}' maximum of {}",
                policy.max_horizon_days
            )));
        }

        let mut fallback_from = None;
        let mut warning = None;

        let (mut selected, mut rationale) = match requested {
            None => (policy.default_backend, "plan default".to_string()),
            Some(backend) if !policy.allows(backend) => {
                warn!(
                    org_id,
                    plan_id,
                    backend = %backend,
                    "requested backend not permitted for plan"
                );
                fallback_from = Some(backend);
                warning = Some(format!(
                    "backend '{backend}' is not permitted for plan '{plan_id}'"
                ));
                (
                    policy.default_backend,
                    "requested backend not permitted for plan, using plan default".to_string(),
                )
            }
            Some(backend) => (backend, format!("requested backend '{backend}'")),
        };

        // -1 sentinel: the backend exists but this plan has it switched off
        if policy.daily_limit(selected) < 0 {
            warn!(org_id, plan_id, backend = %selected, "backend disabled for plan");
            warning = Some(format!(
                "backend '{selected}' is disabled for plan '{plan_id}'"
            ));
            fallback_from = fallback_from.or(Some(selected));
            selected = ForecastBackend::Statistical;
            rationale = "backend disabled for plan, fell back to statistical".to_string();
        }

        // quota applies to metered backends only; statistical has no limit
        let limit = policy.daily_limit(selected);
        if selected != ForecastBackend::Statistical && limit > 0 {
            let day = today();
            let used = self.usage.usage(org_id, selected, day).await?;
            if used >= limit {
                warn!(
                    org_id,
                    backend = %selected,
                    used,
                    limit,
                    "daily quota exhausted, falling back to statistical"
                );
                warning = Some(format!(
                    "daily quota exhausted for backend '{selected}' ({used}/{limit})"
                ));
                fallback_from = fallback_from.or(Some(selected));
                selected = ForecastBackend::Statistical;
                rationale = "quota exceeded, fell back to statistical".to_string();
            } else {
                debug!(org_id, backend = %selected, used, limit, "quota check passed");
            }
        }

        Ok(BackendSelectionResult {
            selected_backend: selected,
            rationale,
            fallback_from,
            warning,
            cost_estimate: self.pricing.estimate(selected),
        })
    }
}
