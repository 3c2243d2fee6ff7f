//! Request and response bodies of the HTTP API.

use serde::{Deserialize, Serialize};

use scanrun_core::{RunId, RunStatus};

/// Body of a successful run submission.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRunResponse {
    pub run_id: RunId,
    pub status: RunStatus,
}

/// Body of a cancel request's answer.
#[derive(Debug, Serialize, Deserialize)]
pub struct CancelResponse {
    pub status: RunStatus,
}

/// Query string of the logs endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct LogsQuery {
    #[serde(default)]
    pub cursor: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
