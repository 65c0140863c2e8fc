// Error taxonomy shared by the stores, gateways, state machine and diff engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConductorError {
    /// Malformed or unknown input (400).
    #[error("validation error: {0}")]
    Validation(String),

    /// State-machine rule violated, e.g. begin while an interval is open (400).
    #[error("{reason} (network={network}, snapshot={snapshot}, action={action})")]
    Conflict {
        network: String,
        snapshot: String,
        action: String,
        reason: String,
    },

    /// Missing marker, snapshot or referenced resource (404).
    #[error("{0}")]
    NotFound(String),

    /// Metrics backend or usecase-parameter service failure (500).
    #[error("gateway error: {0}")]
    Gateway(String),

    /// Local durable storage failure (500).
    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, ConductorError>;

impl ConductorError {
    pub fn conflict(network: &str, snapshot: &str, action: &str, reason: &str) -> Self {
        ConductorError::Conflict {
            network: network.to_string(),
            snapshot: snapshot.to_string(),
            action: action.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Stable machine-readable code used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ConductorError::Validation(_) => "VALIDATION_ERROR",
            ConductorError::Conflict { .. } => "CONFLICT",
            ConductorError::NotFound(_) => "NOT_FOUND",
            ConductorError::Gateway(_) => "GATEWAY_ERROR",
            ConductorError::Storage(_) => "STORAGE_ERROR",
        }
    }
}

impl From<sqlx::Error> for ConductorError {
    fn from(e: sqlx::Error) -> Self {
        ConductorError::Storage(e.to_string())
    }
}

impl From<reqwest::Error> for ConductorError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ConductorError::Gateway(format!("request timed out: {}", e))
        } else {
            ConductorError::Gateway(e.to_string())
        }
    }
}
