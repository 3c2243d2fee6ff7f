//! Authoritative run records of the simulated engine.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::debug;

use scanrun_core::{CoreError, LogsPage, RunId, RunPayload, RunResults, RunState, RunStatus};

/// Scheduled tasks armed for one run.
///
/// Owned by the run's slot in the [`RunStore`] and only touched while the
/// store's write lock is held.
#[derive(Debug, Default)]
pub struct RunTimers {
    pub(crate) start: Option<JoinHandle<()>>,
    pub(crate) progress: Option<JoinHandle<()>>,
    pub(crate) logs: Option<JoinHandle<()>>,
    pub(crate) completion: Option<JoinHandle<()>>,
}

impl RunTimers {
    /// Abort the two periodic tickers.
    pub(crate) fn release_tickers(&mut self) {
        for handle in [self.progress.take(), self.logs.take()].into_iter().flatten() {
            handle.abort();
        }
    }

    /// Abort every armed task. Returns how many were armed.
    pub(crate) fn cancel_all(&mut self) -> usize {
        let handles = [
            self.start.take(),
            self.progress.take(),
            self.logs.take(),
            self.completion.take(),
        ];
        let mut armed = 0;
        for handle in handles.into_iter().flatten() {
            handle.abort();
            armed += 1;
        }
        armed
    }

    /// Number of tasks still armed.
    pub fn armed(&self) -> usize {
        [&self.start, &self.progress, &self.logs, &self.completion]
            .iter()
            .filter(|h| h.is_some())
            .count()
    }
}

/// One simulated run.
#[derive(Debug)]
pub struct SimRun {
    pub(crate) state: RunState,
    pub(crate) payload: RunPayload,
    pub(crate) logs: Vec<String>,
    pub(crate) results: Option<RunResults>,
    pub(crate) timers: RunTimers,
}

impl SimRun {
    pub(crate) fn new(run_id: RunId, payload: RunPayload) -> Self {
        let first = format!("Queued run for {}", payload.endpoint_url);
        Self {
            state: RunState::queued(run_id),
            payload,
            logs: vec![first],
            results: None,
            timers: RunTimers::default(),
        }
    }

    /// Append one line to the log stream.
    pub(crate) fn push_log(&mut self, line: impl Into<String>) {
        self.logs.push(line.into());
    }

    pub fn status(&self) -> RunStatus {
        self.state.status
    }

    pub fn timers(&self) -> &RunTimers {
        &self.timers
    }
}

/// Run table keyed by identifier.
///
/// Records are retained for the lifetime of the store.
#[derive(Debug, Default)]
pub struct RunStore {
    runs: RwLock<HashMap<RunId, SimRun>>,
}

impl RunStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn insert(&self, run: SimRun) {
        let run_id = run.state.run_id.clone();
        self.runs.write().await.insert(run_id, run);
    }

    /// Mutate one run under the write lock.
    ///
    /// Returns `None` if the run is unknown.
    pub(crate) async fn update<F, R>(&self, run_id: &RunId, f: F) -> Option<R>
    where
        F: FnOnce(&mut SimRun) -> R,
    {
        let mut runs = self.runs.write().await;
        runs.get_mut(run_id).map(f)
    }

    /// Read one run under the read lock.
    pub async fn read<F, R>(&self, run_id: &RunId, f: F) -> Result<R, CoreError>
    where
        F: FnOnce(&SimRun) -> R,
    {
        let runs = self.runs.read().await;
        runs.get(run_id)
            .map(f)
            .ok_or_else(|| CoreError::RunNotFound(run_id.to_string()))
    }

    /// Current snapshot of a run.
    pub async fn snapshot(&self, run_id: &RunId) -> Result<RunState, CoreError> {
        self.read(run_id, |run| run.state.clone()).await
    }

    /// Log lines from `cursor` onward.
    pub async fn logs(&self, run_id: &RunId, cursor: usize) -> Result<LogsPage, CoreError> {
        self.read(run_id, |run| LogsPage::from_cursor(&run.logs, cursor))
            .await
    }

    /// Results, available only once the run is done.
    pub async fn results(&self, run_id: &RunId) -> Result<RunResults, CoreError> {
        self.read(run_id, |run| match (&run.state.status, &run.results) {
            (RunStatus::Done, Some(results)) => Ok(results.clone()),
            _ => Err(CoreError::ResultsNotReady(run_id.to_string())),
        })
        .await?
    }

    /// Number of runs ever created.
    pub async fn run_count(&self) -> usize {
        self.runs.read().await.len()
    }

    /// Number of runs not yet terminal.
    pub async fn active_count(&self) -> usize {
        self.runs
            .read()
            .await
            .values()
            .filter(|run| run.state.status.is_active())
            .count()
    }

    /// Count runs per status.
    pub async fn status_counts(&self) -> HashMap<RunStatus, usize> {
        let mut counts = HashMap::new();
        for run in self.runs.read().await.values() {
            *counts.entry(run.state.status).or_insert(0) += 1;
        }
        counts
    }

    /// Abort every armed timer of every run.
    pub async fn abort_all(&self) -> usize {
        let mut runs = self.runs.write().await;
        let aborted: usize = runs.values_mut().map(|run| run.timers.cancel_all()).sum();
        debug!(aborted, "Aborted all simulated run timers");
        aborted
    }

    /// Non-blocking variant of [`RunStore::abort_all`] for use in `Drop`.
    pub(crate) fn try_abort_all(&self) -> Option<usize> {
        let mut runs = self.runs.try_write().ok()?;
        Some(runs.values_mut().map(|run| run.timers.cancel_all()).sum())
    }
}
