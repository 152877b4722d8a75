//! Storage collaborator interfaces
//!
//! The core does not own persistence. These traits are the narrow surface
//! it needs from the embedding application's storage layer; the in-memory
//! implementations serve tests and single-process embeddings.

mod memory;

pub use memory::{InMemoryForecastStore, InMemoryPointStore};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Forecast, TimeSeriesPoint};

/// Ordered time-series point retrieval
#[async_trait]
pub trait PointStore: Send + Sync {
    /// Up to `limit` most recent points for a metric, ascending by timestamp
    async fn recent_points(
        &self,
        org_id: &str,
        metric: &str,
        limit: usize,
    ) -> Result<Vec<TimeSeriesPoint>>;
}

/// Forecast persistence
#[async_trait]
pub trait ForecastStore: Send + Sync {
    /// Persist a completed forecast, returning its identifier
    async fn save_forecast(&self, forecast: &Forecast) -> Result<Uuid>;

    /// The most recently completed forecast for a metric, if any
    async fn latest_forecast(&self, metric: &str) -> Result<Option<Forecast>>;
}
