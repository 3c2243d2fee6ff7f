//! The run backend capability consumed by the dashboard.

use async_trait::async_trait;

use scanrun_core::{LogsPage, RunId, RunPayload, RunResults, RunState};

use crate::error::ApiError;

/// Optional operations a backend may offer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Backend accepts cancel requests.
    pub cancel: bool,
}

/// Operations every run backend provides.
///
/// Implemented by the in-process simulated engine and by [`HttpRunApi`]; the
/// orchestrator only ever sees this trait.
///
/// [`HttpRunApi`]: crate::HttpRunApi
#[async_trait]
pub trait RunApi: Send + Sync {
    /// Submit a new run and return its identifier.
    async fn create_run(&self, payload: &RunPayload) -> Result<RunId, ApiError>;

    /// Fetch the current run snapshot.
    async fn get_run(&self, run_id: &RunId) -> Result<RunState, ApiError>;

    /// Fetch log lines from `cursor` onward.
    async fn get_logs(&self, run_id: &RunId, cursor: usize) -> Result<LogsPage, ApiError>;

    /// Fetch the final results. Fails with [`ApiError::NotReady`] unless the
    /// run is `done`.
    async fn get_results(&self, run_id: &RunId) -> Result<RunResults, ApiError>;

    /// Optional operations this backend supports.
    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    /// Ask the backend to stop a run.
    ///
    /// Callers must check [`RunApi::capabilities`] first.
    async fn cancel_run(&self, _run_id: &RunId) -> Result<(), ApiError> {
        Err(ApiError::Unsupported("cancel_run"))
    }
}
