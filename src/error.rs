//! Engine-wide error taxonomy. Every pipeline stage returns one of these
//! kinds; the router is the only place that turns them into HTTP responses.

use std::fmt;

use crate::provider::store::StoreError;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Malformed or missing request input. Not retryable as-is.
    Validation(String),
    /// No probability table exists for the game id.
    NotFound(u32),
    /// The table store could not be reached or returned garbage. Transient.
    Unavailable(String),
    /// The goal cannot be reached in a bounded number of draws.
    InvalidGoal(String),
    /// The sample set cannot support the requested statistics.
    InsufficientSamples(String),
    /// Caller is over the request budget for the current window.
    RateLimited { reset_unix: u64 },
}

impl EngineError {
    /// HTTP status line the router should use for this kind.
    pub fn http_status(&self) -> (u16, &'static str) {
        match self {
            Self::Validation(_) => (400, "Bad Request"),
            Self::NotFound(_) => (404, "Not Found"),
            Self::Unavailable(_) => (503, "Service Unavailable"),
            Self::InvalidGoal(_) | Self::InsufficientSamples(_) => (422, "Unprocessable Entity"),
            Self::RateLimited { .. } => (429, "Too Many Requests"),
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "validation error: {msg}"),
            Self::NotFound(game_id) => write!(f, "unknown GAME_ID: {game_id}"),
            Self::Unavailable(msg) => write!(f, "table store unavailable: {msg}"),
            Self::InvalidGoal(msg) => write!(f, "invalid goal: {msg}"),
            Self::InsufficientSamples(msg) => write!(f, "insufficient samples: {msg}"),
            Self::RateLimited { reset_unix } => {
                write!(f, "rate limited: retry after {reset_unix} (unix seconds)")
            }
        }
    }
}

impl std::error::Error for EngineError {}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(game_id) => Self::NotFound(game_id),
            StoreError::Unavailable(msg) => Self::Unavailable(msg),
        }
    }
}
