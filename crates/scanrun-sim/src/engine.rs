//! The simulated engine behind the [`RunApi`] contract.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use scanrun_client::{ApiError, Capabilities, RunApi};
use scanrun_core::{LogsPage, RunId, RunPayload, RunResults, RunState, RunStatus};

use crate::config::SimConfig;
use crate::store::{RunStore, SimRun};
use crate::timers::schedule_start;

/// Message recorded on runs stopped by a cancel request.
pub const CANCELLED_BY_USER: &str = "Cancelled by user";

const CANCELLED_LINE: &str = "Run cancelled by user.";

/// In-process stand-in for a scan backend.
///
/// Runs progress on tokio timers: `queued` for `start_delay`, then `running`
/// for a random duration, then `done`. A cancel request forces a pending run
/// to `failed` and aborts all of its timers.
pub struct SimulatedEngine {
    store: Arc<RunStore>,
    config: Arc<SimConfig>,
}

impl SimulatedEngine {
    /// Create an engine with its own empty run store.
    pub fn new(config: SimConfig) -> Self {
        Self::with_store(Arc::new(RunStore::new()), config)
    }

    /// Create an engine over an existing store.
    pub fn with_store(store: Arc<RunStore>, config: SimConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    /// The run table.
    pub fn store(&self) -> &Arc<RunStore> {
        &self.store
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Abort every armed timer. Runs keep their last state.
    pub async fn shutdown(&self) {
        let aborted = self.store.abort_all().await;
        info!(aborted, "Simulated engine shut down");
    }
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl Drop for SimulatedEngine {
    fn drop(&mut self) {
        if let Some(aborted) = self.store.try_abort_all() {
            debug!(aborted, "Released simulated run timers on drop");
        }
    }
}

#[async_trait]
impl RunApi for SimulatedEngine {
    async fn create_run(&self, payload: &RunPayload) -> Result<RunId, ApiError> {
        let run_id = RunId::generate();
        self.store
            .insert(SimRun::new(run_id.clone(), payload.clone()))
            .await;

        // Arm the start timer only once the record exists.
        let handle = schedule_start(self.store.clone(), self.config.clone(), run_id.clone());
        self.store
            .update(&run_id, |run| {
                if run.state.status == RunStatus::Queued {
                    run.timers.start = Some(handle);
                }
            })
            .await;

        info!(
            run_id = %run_id,
            endpoint = %payload.endpoint_url,
            model = %payload.model,
            rounds = payload.rounds,
            requests_per_node = payload.requests_per_node,
            "Simulated run queued"
        );
        Ok(run_id)
    }

    async fn get_run(&self, run_id: &RunId) -> Result<RunState, ApiError> {
        Ok(self.store.snapshot(run_id).await?)
    }

    async fn get_logs(&self, run_id: &RunId, cursor: usize) -> Result<LogsPage, ApiError> {
        Ok(self.store.logs(run_id, cursor).await?)
    }

    async fn get_results(&self, run_id: &RunId) -> Result<RunResults, ApiError> {
        Ok(self.store.results(run_id).await?)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities { cancel: true }
    }

    async fn cancel_run(&self, run_id: &RunId) -> Result<(), ApiError> {
        let outcome = self
            .store
            .update(run_id, |run| {
                if run.state.status.is_terminal() {
                    return None;
                }
                // Timers go first so nothing can tick after the transition.
                let aborted = run.timers.cancel_all();
                run.state.fail(CANCELLED_BY_USER).ok()?;
                run.push_log(CANCELLED_LINE);
                Some(aborted)
            })
            .await
            .ok_or_else(|| ApiError::NotFound(format!("Run not found: {run_id}")))?;

        match outcome {
            Some(aborted) => info!(run_id = %run_id, aborted, "Simulated run cancelled"),
            None => debug!(run_id = %run_id, "Cancel ignored for terminal run"),
        }
        Ok(())
    }
}
