//! End-to-end forecast orchestration
//!
//! The reference embedding of the core: fetch history, select a backend,
//! run the engine, charge quota only after a successful run, persist the
//! forecast. The HTTP layer of the embedding application calls this.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::backend::{today, BackendPricing, BackendSelector, PlanPolicies, UsageStore};
use crate::config::ForecastingConfig;
use crate::error::Result;
use crate::forecast::ForecastEngine;
use crate::models::{
    BackendSelectionResult, Forecast, ForecastBackend, ForecastMethod, ForecastRequest,
};
use crate::store::{ForecastStore, PointStore};

/// One forecast generation job
#[derive(Debug, Clone)]
pub struct ForecastJob {
    /// Organization the metric belongs to
    pub org_id: String,

    /// Plan the organization is on
    pub plan_id: String,

    /// Metric to forecast
    pub metric: String,

    /// Backend the caller asked for, if any
    pub requested_backend: Option<ForecastBackend>,

    /// Number of future days to predict
    pub horizon_days: u32,

    /// Statistical method for the statistical backend
    pub method: ForecastMethod,

    /// Confidence level; the configured default when absent
    pub confidence_level: Option<f64>,

    /// Clamp predictions at zero for non-negative metrics
    pub clamp_non_negative: bool,
}

/// Result of a completed forecast job
#[derive(Debug, Clone)]
pub struct ForecastOutcome {
    /// Identifier assigned by the forecast store
    pub forecast_id: Uuid,

    /// The forecast itself
    pub forecast: Forecast,

    /// How the backend was chosen
    pub selection: BackendSelectionResult,
}

/// Orchestrates one forecast from history to persisted result
pub struct ForecastService {
    points: Arc<dyn PointStore>,
    policies: Arc<dyn PlanPolicies>,
    usage: Arc<dyn UsageStore>,
    selector: BackendSelector,
    engine: ForecastEngine,
    forecasts: Arc<dyn ForecastStore>,
    config: ForecastingConfig,
}

impl ForecastService {
    /// Create a service from its collaborators
    pub fn new(
        points: Arc<dyn PointStore>,
        policies: Arc<dyn PlanPolicies>,
        usage: Arc<dyn UsageStore>,
        engine: ForecastEngine,
        forecasts: Arc<dyn ForecastStore>,
        config: ForecastingConfig,
    ) -> Self {
        let selector = BackendSelector::new(policies.clone(), usage.clone());
        Self {
            points,
            policies,
            usage,
            selector,
            engine,
            forecasts,
            config,
        }
    }

    /// Use a custom pricing table for selection cost estimates
    pub fn with_pricing(mut self, pricing: BackendPricing) -> Self {
        self.selector = self.selector.with_pricing(pricing);
        self
    }

    /// Run one forecast job end to end
    ///
    /// Quota for a metered backend is charged only after the backend call
    /// succeeded, so failed calls never consume budget. Between the
    /// selector's quota read and this increment there is an accepted race
    /// window under concurrent requests.
    pub async fn generate(&self, job: &ForecastJob) -> Result<ForecastOutcome> {
        let policy = self.policies.backend_policy(&job.plan_id)?;

        let points = self
            .points
            .recent_points(&job.org_id, &job.metric, policy.max_history_points)
            .await?;
        debug!(
            org_id = %job.org_id,
            metric = %job.metric,
            points = points.len(),
            "history loaded"
        );

        let selection = self
            .selector
            .select(
                &job.org_id,
                &job.plan_id,
                job.requested_backend,
                points.len(),
                job.horizon_days,
            )
            .await?;

        let request = ForecastRequest {
            metric: job.metric.clone(),
            points,
            horizon_days: job.horizon_days,
            confidence_level: job
                .confidence_level
                .unwrap_or(self.config.default_confidence_level),
            method: job.method,
            clamp_non_negative: job.clamp_non_negative,
        };

        let forecast = self.engine.run(&request, selection.selected_backend).await?;

        if policy.is_metered(selection.selected_backend) {
            let count = self
                .usage
                .increment(&job.org_id, selection.selected_backend, today())
                .await?;
            debug!(
                org_id = %job.org_id,
                backend = %selection.selected_backend,
                count,
                "usage charged"
            );
        }

        let forecast_id = self.forecasts.save_forecast(&forecast).await?;

        info!(
            org_id = %job.org_id,
            metric = %job.metric,
            backend = %selection.selected_backend,
            forecast_id = %forecast_id,
            predictions = forecast.predictions.len(),
            "forecast generated"
        );

        Ok(ForecastOutcome {
            forecast_id,
            forecast,
            selection,
        })
    }
}
