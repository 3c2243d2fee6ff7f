//! Client-side run lifecycle: submit, poll status, poll logs, fetch results.
//!
//! Two independent pollers run per active run. Each tick spawns its own
//! request so a slow backend never delays the next tick; the responses are
//! then fenced before they touch the view:
//! - every response carries the generation of the run it was issued for and
//!   is dropped once a newer run (or teardown) bumped the generation;
//! - status responses carry a sequence number and only a newer one may
//!   replace the applied snapshot;
//! - log responses carry the cursor they asked for and are only appended if
//!   that is still the current cursor.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use scanrun_client::{ApiError, RunApi};
use scanrun_core::{RunId, RunPayload, RunStatus};

use crate::config::PollConfig;
use crate::state::RunView;

/// State shared between the orchestrator and its poller tasks.
struct Shared {
    api: Arc<dyn RunApi>,
    view: watch::Sender<RunView>,
    status_seq: AtomicU64,
}

/// What a single log poll did to the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogPoll {
    /// Lines were appended and the cursor advanced.
    Appended(usize),
    /// Nothing new at the current cursor.
    Empty,
    /// The cursor moved (or the run was superseded) while the request was in
    /// flight; the response was dropped.
    Superseded,
}

/// Handles of the pollers armed for one run.
struct Pollers {
    token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl Pollers {
    fn stop(self) {
        self.token.cancel();
        for handle in self.handles {
            handle.abort();
        }
    }
}

/// Drives the lifecycle of one active run at a time.
pub struct RunOrchestrator {
    shared: Arc<Shared>,
    config: PollConfig,
    pollers: Mutex<Option<Pollers>>,
}

impl RunOrchestrator {
    /// Create an orchestrator over any run backend.
    pub fn new(api: Arc<dyn RunApi>, config: PollConfig) -> Self {
        let (view, _) = watch::channel(RunView::default());
        Self {
            shared: Arc::new(Shared {
                api,
                view,
                status_seq: AtomicU64::new(0),
            }),
            config,
            pollers: Mutex::new(None),
        }
    }

    /// Current view snapshot.
    pub fn view(&self) -> RunView {
        self.shared.view.borrow().clone()
    }

    /// Receive every view change.
    pub fn subscribe(&self) -> watch::Receiver<RunView> {
        self.shared.view.subscribe()
    }

    /// Submit a run and start tracking it.
    ///
    /// On failure the error message is recorded in the view and returned;
    /// nothing else changes and any previously tracked run keeps polling.
    pub async fn start_run(&self, payload: &RunPayload) -> Result<RunId, ApiError> {
        match self.shared.api.create_run(payload).await {
            Ok(run_id) => {
                info!(run_id = %run_id, endpoint = %payload.endpoint_url, "Run submitted");
                self.attach(run_id.clone());
                Ok(run_id)
            }
            Err(e) => {
                warn!(error = %e, "Failed to start run");
                let message = e.to_string();
                self.shared.view.send_modify(|view| view.error = Some(message));
                Err(e)
            }
        }
    }

    /// Track an already submitted run.
    pub fn attach(&self, run_id: RunId) {
        let mut generation = 0;
        self.shared.view.send_modify(|view| {
            generation = view.generation + 1;
            *view = RunView::adopt(run_id.clone(), generation);
        });

        let token = CancellationToken::new();
        let handles = vec![
            tokio::spawn(status_loop(
                self.shared.clone(),
                generation,
                token.clone(),
                self.config.status_interval,
            )),
            tokio::spawn(log_loop(
                self.shared.clone(),
                generation,
                token.clone(),
                self.config.log_interval,
            )),
        ];

        let previous = self.lock_pollers().replace(Pollers { token, handles });
        if let Some(previous) = previous {
            previous.stop();
        }
        debug!(run_id = %run_id, generation, "Pollers armed");
    }

    /// Ask the backend to cancel the active run, then re-fetch its status.
    ///
    /// Returns `Ok(false)` without doing anything when the backend offers no
    /// cancel operation, no run is active, or the orchestrator was stopped.
    /// The view only changes once the re-fetched status arrives.
    pub async fn cancel_run(&self) -> Result<bool, ApiError> {
        if !self.shared.api.capabilities().cancel {
            warn!("Cancel requested but the backend does not support it");
            return Ok(false);
        }
        if self.lock_pollers().is_none() {
            debug!("Cancel requested after teardown, ignoring");
            return Ok(false);
        }

        let (run_id, generation) = {
            let view = self.shared.view.borrow();
            match (&view.run_id, view.is_terminal()) {
                (Some(run_id), false) => (run_id.clone(), view.generation),
                _ => return Ok(false),
            }
        };

        info!(run_id = %run_id, "Cancelling run");
        self.shared.api.cancel_run(&run_id).await?;
        self.shared.poll_status(&run_id, generation).await?;
        Ok(true)
    }

    /// Wait until the active run is settled: terminal, and for `done` the
    /// results fetch has resolved.
    pub async fn wait_for_terminal(&self) -> RunView {
        let mut rx = self.subscribe();
        let settled = rx.wait_for(|view| view.is_settled()).await;
        match settled {
            Ok(view) => view.clone(),
            Err(_) => self.view(),
        }
    }

    /// Stop both pollers. Responses still in flight are discarded.
    pub fn stop(&self) {
        if let Some(pollers) = self.lock_pollers().take() {
            pollers.stop();
        }
        // Bumping the generation fences out anything already in flight.
        self.shared.view.send_modify(|view| view.generation += 1);
    }

    fn lock_pollers(&self) -> std::sync::MutexGuard<'_, Option<Pollers>> {
        self.pollers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for RunOrchestrator {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Shared {
    /// Run id of `generation`, or `None` once it was superseded.
    fn current_run(&self, generation: u64) -> Option<RunId> {
        let view = self.view.borrow();
        if view.generation == generation {
            view.run_id.clone()
        } else {
            None
        }
    }

    fn view_matches(&self, generation: u64, check: impl FnOnce(&RunView) -> bool) -> bool {
        let view = self.view.borrow();
        view.generation == generation && check(&view)
    }

    /// Fetch status once and apply it if it is still the newest.
    ///
    /// Returns whether the response was applied.
    async fn poll_status(
        self: &Arc<Self>,
        run_id: &RunId,
        generation: u64,
    ) -> Result<bool, ApiError> {
        let seq = self.status_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let state = self.api.get_run(run_id).await?;

        let mut fetch_results = false;
        let applied = self.view.send_if_modified(|view| {
            if view.generation != generation || seq <= view.applied_status_seq {
                return false;
            }
            view.applied_status_seq = seq;
            if state.status == RunStatus::Done && !view.results_requested {
                view.results_requested = true;
                fetch_results = true;
            }
            view.state = Some(state);
            true
        });

        if !applied {
            debug!(run_id = %run_id, seq, "Discarded stale status response");
        }
        if fetch_results {
            let shared = self.clone();
            let run_id = run_id.clone();
            tokio::spawn(async move { shared.fetch_results(&run_id, generation).await });
        }
        Ok(applied)
    }

    /// Fetch logs from the current cursor and append them if nothing moved
    /// the cursor in the meantime.
    async fn poll_logs(&self, run_id: &RunId, generation: u64) -> Result<LogPoll, ApiError> {
        // Read the cursor at request time, not when the loop was armed.
        let cursor = self.view.borrow().cursor;
        let page = self.api.get_logs(run_id, cursor).await?;

        let count = page.lines.len();
        let mut outcome = LogPoll::Superseded;
        self.view.send_if_modified(|view| {
            if view.generation != generation || view.cursor != cursor {
                return false;
            }
            if count == 0 {
                outcome = LogPoll::Empty;
                return false;
            }
            view.logs.extend(page.lines);
            view.cursor = page.next_cursor;
            outcome = LogPoll::Appended(count);
            true
        });

        match outcome {
            LogPoll::Appended(lines) => {
                debug!(run_id = %run_id, cursor, lines, "Appended log lines")
            }
            LogPoll::Superseded => {
                debug!(run_id = %run_id, cursor, "Discarded overlapping log response")
            }
            LogPoll::Empty => {}
        }
        Ok(outcome)
    }

    /// The single results fetch of a run. Not retried.
    async fn fetch_results(&self, run_id: &RunId, generation: u64) {
        let outcome = self.api.get_results(run_id).await;

        match &outcome {
            Ok(_) => info!(run_id = %run_id, "Results fetched"),
            Err(ApiError::NotReady(reason)) => {
                debug!(run_id = %run_id, reason = %reason, "Results not ready")
            }
            Err(e) => warn!(run_id = %run_id, error = %e, "Failed to fetch results"),
        }

        self.view.send_if_modified(|view| {
            if view.generation != generation {
                return false;
            }
            match outcome {
                Ok(results) => view.results = Some(results),
                Err(e) => view.results_error = Some(e.to_string()),
            }
            true
        });
    }
}

fn ticker(period: Duration) -> time::Interval {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Periodic status poll. Ends once the run is settled or superseded.
async fn status_loop(
    shared: Arc<Shared>,
    generation: u64,
    token: CancellationToken,
    period: Duration,
) {
    let mut interval = ticker(period);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = interval.tick() => {}
        }

        let Some(run_id) = shared.current_run(generation) else {
            break;
        };
        if shared.view_matches(generation, RunView::is_settled) {
            debug!(run_id = %run_id, "Run settled, status poller done");
            break;
        }

        let shared = shared.clone();
        tokio::spawn(async move {
            if let Err(e) = shared.poll_status(&run_id, generation).await {
                warn!(run_id = %run_id, error = %e, "Status poll failed");
            }
        });
    }
}

/// Periodic log poll. Once the run is terminal it polls inline until the
/// stream is drained, then ends.
async fn log_loop(
    shared: Arc<Shared>,
    generation: u64,
    token: CancellationToken,
    period: Duration,
) {
    let mut interval = ticker(period);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = interval.tick() => {}
        }

        let Some(run_id) = shared.current_run(generation) else {
            break;
        };

        if shared.view_matches(generation, RunView::is_terminal) {
            // Only an empty page at the current cursor proves the stream is
            // drained; a superseded response says nothing about the tail.
            match shared.poll_logs(&run_id, generation).await {
                Ok(LogPoll::Empty) | Err(ApiError::NotFound(_)) => {
                    debug!(run_id = %run_id, "Log stream drained, log poller done");
                    break;
                }
                Ok(_) => continue,
                Err(e) => {
                    warn!(run_id = %run_id, error = %e, "Log poll failed");
                    continue;
                }
            }
        }

        let shared = shared.clone();
        tokio::spawn(async move {
            if let Err(e) = shared.poll_logs(&run_id, generation).await {
                warn!(run_id = %run_id, error = %e, "Log poll failed");
            }
        });
    }
}
