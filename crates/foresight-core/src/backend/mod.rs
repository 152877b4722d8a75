//! Backend selection and usage tracking
//!
//! Chooses which forecast backend a request runs on, enforces plan policy,
//! and tracks per-day usage of metered backends.

mod cost;
mod policy;
mod selector;
mod usage;

pub use cost::BackendPricing;
pub use policy::{PlanPolicies, StaticPlanPolicies};
pub use selector::BackendSelector;
pub use usage::{today, InMemoryUsageStore, UsageStore};
