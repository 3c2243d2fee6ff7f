//! Error types for run API clients.

use thiserror::Error;

use scanrun_core::CoreError;

/// Errors that can occur when talking to a run backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Backend could not be reached at all.
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    /// Backend refused the submission.
    #[error("run rejected: {0}")]
    Rejected(String),

    /// Unknown run identifier.
    #[error("not found: {0}")]
    NotFound(String),

    /// Results requested before the run is done.
    #[error("results not ready: {0}")]
    NotReady(String),

    /// Optional operation not offered by this backend.
    #[error("operation not supported: {0}")]
    Unsupported(&'static str),

    /// Backend failed while handling the request (5xx).
    #[error("backend error: {0}")]
    Server(String),

    /// HTTP error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ApiError {
    /// Returns true for failures worth retrying on the next poll.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Unreachable(_) | Self::Server(_) | Self::Http(_) | Self::NotReady(_)
        )
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::RunNotFound(id) => Self::NotFound(format!("Run not found: {id}")),
            CoreError::ResultsNotReady(id) => Self::NotReady(format!("Results not ready: {id}")),
            other => Self::Rejected(other.to_string()),
        }
    }
}
