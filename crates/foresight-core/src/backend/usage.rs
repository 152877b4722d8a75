//! Per-organization backend usage tracking
//!
//! Counters are keyed by `(org, backend, day)`; day rollover is implicit in
//! the key, there is no reset operation.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use dashmap::DashMap;

use crate::error::Result;
use crate::models::{ForecastBackend, UsageCounter};

/// The current usage day (UTC)
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Store of per-day backend usage counters
///
/// `increment` must be an atomic read-modify-write at the storage layer.
/// Between the selector's quota read and the post-forecast increment there
/// is an accepted race window (see [`BackendSelector`]); the increment
/// itself must never lose counts under concurrency.
///
/// [`BackendSelector`]: crate::backend::BackendSelector
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Calls recorded for `(org, backend, day)` so far
    async fn usage(&self, org_id: &str, backend: ForecastBackend, day: NaiveDate) -> Result<i64>;

    /// Atomically add one call and return the new count
    async fn increment(
        &self,
        org_id: &str,
        backend: ForecastBackend,
        day: NaiveDate,
    ) -> Result<i64>;
}

type UsageKey = (String, ForecastBackend, NaiveDate);

/// In-memory usage store for tests and single-process embeddings
///
/// The per-entry lock of the underlying map makes `increment` atomic, which
/// is the same contract a production store must provide with a conditional
/// update or transactional counter.
#[derive(Debug, Default)]
pub struct InMemoryUsageStore {
    counters: DashMap<UsageKey, i64>,
}

impl InMemoryUsageStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every counter, for inspection
    pub fn counters(&self) -> Vec<UsageCounter> {
        self.counters
            .iter()
            .map(|entry| {
                let (org_id, backend, day) = entry.key().clone();
                UsageCounter {
                    org_id,
                    backend,
                    day,
                    count: *entry.value(),
                }
            })
            .collect()
    }
}

#[async_trait]
impl UsageStore for InMemoryUsageStore {
    async fn usage(&self, org_id: &str, backend: ForecastBackend, day: NaiveDate) -> Result<i64> {
        let key = (org_id.to_string(), backend, day);
        Ok(self.counters.get(&key).map(|c| *c).unwrap_or(0))
    }

    async fn increment(
        &self,
        org_id: &str,
        backend: ForecastBackend,
        day: NaiveDate,
    ) -> Result<i64> {
        let key = (org_id.to_string(), backend, day);
        let mut entry = self.counters.entry(key).or_insert(0);
        *entry += 1;
        Ok(*entry)
    }
}
