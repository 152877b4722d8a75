//! # Foresight
//!
//! Forecasting, quota, and alerting engine for organization metrics.
//!
//! Foresight turns per-organization time-series metrics into statistical
//! forecasts, enforces plan-based quotas on paid forecast backends, and
//! evaluates alert rules against forecasts to deliver multi-channel
//! notifications.
//!
//! ## Architecture
//!
//! - **Forecast Engine**: SMA / EWMA / linear methods in-process, plus stub
//!   and remote paid backends
//! - **Backend Selector**: plan policy + daily usage decide which backend a
//!   request runs on; quota pressure downgrades, never fails
//! - **Alert Evaluator**: scans rules against the latest forecasts with
//!   per-rule failure isolation and an explicit re-fire suppression window
//! - **Notification Dispatcher**: per-channel senders with failure
//!   isolation (webhook and Slack built in)
//!
//! Persistence, HTTP routing, and authentication live in the embedding
//! application and reach the core through the collaborator traits in
//! [`store`], [`backend`], and [`alerting`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_precision_loss)]

pub mod alerting;
pub mod backend;
pub mod config;
pub mod error;
pub mod forecast;
pub mod models;
pub mod service;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::alerting::{AlertEvaluator, NotificationDispatcher};
    pub use crate::backend::{BackendSelector, InMemoryUsageStore, StaticPlanPolicies, UsageStore};
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::forecast::ForecastEngine;
    pub use crate::models::*;
    pub use crate::service::{ForecastJob, ForecastService};
    pub use crate::store::{ForecastStore, PointStore};
}
