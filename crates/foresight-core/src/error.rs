//! Error types for Foresight

use thiserror::Error;

/// Result type alias using Foresight's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Foresight operations
///
/// Only fatal conditions live here. Soft failures (a rule with no forecast,
/// a channel that could not be reached) are recorded in the per-item result
/// of the batch operation that produced them and never abort the batch.
#[derive(Error, Debug)]
pub enum Error {
    /// Too little history to forecast from
    #[error("insufficient history: {points} point(s), need at least 2")]
    InsufficientData {
        /// Number of points that were supplied
        points: usize,
    },

    /// Invalid forecast parameter (horizon, confidence level, ...)
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Request exceeds a hard plan limit; no fallback is attempted
    #[error("plan limit exceeded: {0}")]
    PlanLimitExceeded(String),

    /// Paid forecast backend failed; propagated without fallback
    #[error("remote backend error: {0}")]
    RemoteBackend(String),

    /// Storage collaborator error
    #[error("storage error: {0}")]
    Storage(String),

    /// Not found error
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity that was looked up
        entity: String,
        /// Identifier used for the lookup
        id: String,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid parameter error
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Create a plan limit error
    pub fn plan_limit(msg: impl Into<String>) -> Self {
        Self::PlanLimitExceeded(msg.into())
    }

    /// Create a remote backend error
    pub fn remote(msg: impl Into<String>) -> Self {
        Self::RemoteBackend(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
