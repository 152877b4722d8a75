//! Time-series data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single observation of a metric
///
/// Series are ordered ascending by timestamp. Duplicate timestamps are
/// conflated by the storage collaborator before they reach this core.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    /// When the value was observed
    pub timestamp: DateTime<Utc>,

    /// Observed value
    pub value: f64,
}

impl TimeSeriesPoint {
    /// Create a new point
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}
