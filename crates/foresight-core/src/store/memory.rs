//! In-memory storage implementations

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Forecast, TimeSeriesPoint};

use super::{ForecastStore, PointStore};

type SeriesKey = (String, String);

/// In-memory point store
#[derive(Debug, Default)]
pub struct InMemoryPointStore {
    series: RwLock<HashMap<SeriesKey, Vec<TimeSeriesPoint>>>,
}

impl InMemoryPointStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the series for a metric; points must already be ascending
    pub fn set_series(&self, org_id: &str, metric: &str, points: Vec<TimeSeriesPoint>) {
        self.series
            .write()
            .insert((org_id.to_string(), metric.to_string()), points);
    }
}

#[async_trait]
impl PointStore for InMemoryPointStore {
    async fn recent_points(
        &self,
        org_id: &str,
        metric: &str,
        limit: usize,
    ) -> Result<Vec<TimeSeriesPoint>> {
        let series = self.series.read();
        let points = series
            .get(&(org_id.to_string(), metric.to_string()))
            .cloned()
            .unwrap_or_default();

        let skip = points.len().saturating_sub(limit);
        Ok(points[skip..].to_vec())
    }
}

/// In-memory forecast store
#[derive(Debug, Default)]
pub struct InMemoryForecastStore {
    forecasts: RwLock<HashMap<String, Vec<(Uuid, Forecast)>>>,
}

impl InMemoryForecastStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ForecastStore for InMemoryForecastStore {
    async fn save_forecast(&self, forecast: &Forecast) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.forecasts
            .write()
            .entry(forecast.metric.clone())
            .or_default()
            .push((id, forecast.clone()));
        Ok(id)
    }

    async fn latest_forecast(&self, metric: &str) -> Result<Option<Forecast>> {
        let forecasts = self.forecasts.read();
        Ok(forecasts
            .get(metric)
            .and_then(|entries| entries.last())
            .map(|(_, forecast)| forecast.clone()))
    }
}
