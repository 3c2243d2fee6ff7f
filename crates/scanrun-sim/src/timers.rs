//! Scheduled tasks that drive one simulated run.
//!
//! Every task re-checks the run's status under the store's write lock before
//! mutating anything. Aborting the task handles stops future ticks; the
//! status check covers a tick that was already woken when the abort landed.

use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info};

use scanrun_core::{Progress, RunId, RunStatus};

use crate::config::SimConfig;
use crate::results::synthesize;
use crate::store::RunStore;

const FLAVOR_MESSAGES: [&str; 7] = [
    "Analyzing schema nodes...",
    "Generating exploratory query...",
    "Attempting mutation fuzzing...",
    "Synthesizing auth bypass patterns...",
    "Scoring potential issue severity...",
    "LLM thinking about next path...",
    "Batching follow-up requests...",
];

pub(crate) const STARTED_LINE: &str = "Run started: warming up LLM and probing schema...";
pub(crate) const FINISHED_LINE: &str = "Run finished: summarizing findings...";

/// Arm the queued -> running transition.
pub(crate) fn schedule_start(
    store: Arc<RunStore>,
    config: Arc<SimConfig>,
    run_id: RunId,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        time::sleep(config.start_delay).await;
        begin_running(store, config, run_id).await;
    })
}

async fn begin_running(store: Arc<RunStore>, config: Arc<SimConfig>, run_id: RunId) {
    let handle_store = store.clone();
    let started = store
        .update(&run_id, move |run| {
            // Our own handle; the task is finishing.
            run.timers.start.take();

            if run.state.status != RunStatus::Queued || run.state.start().is_err() {
                return None;
            }
            run.state.progress =
                Progress::new(config.initial_progress, RunStatus::Running.as_str());
            run.push_log(STARTED_LINE);

            let duration = draw(config.min_duration, config.max_duration);
            let started_at = Instant::now();
            let id = run.state.run_id.clone();

            run.timers.progress = Some(tokio::spawn(progress_ticker(
                handle_store.clone(),
                config.clone(),
                id.clone(),
                started_at,
                duration,
            )));
            run.timers.logs = Some(tokio::spawn(log_ticker(
                handle_store.clone(),
                config.clone(),
                id.clone(),
            )));
            run.timers.completion = Some(tokio::spawn(complete_after(
                handle_store,
                id,
                duration,
            )));
            Some(duration)
        })
        .await
        .flatten();

    if let Some(duration) = started {
        info!(
            run_id = %run_id,
            duration_ms = duration.as_millis() as u64,
            "Simulated run started"
        );
    }
}

/// Recompute progress as elapsed / duration, capped below completion.
async fn progress_ticker(
    store: Arc<RunStore>,
    config: Arc<SimConfig>,
    run_id: RunId,
    started_at: Instant,
    duration: Duration,
) {
    let period = config.progress_interval;
    let mut ticker = time::interval_at(started_at + period, period);

    loop {
        ticker.tick().await;
        let live = store
            .update(&run_id, |run| {
                if run.state.status != RunStatus::Running {
                    return false;
                }
                let total = duration.as_secs_f64().max(f64::EPSILON);
                let ratio = started_at.elapsed().as_secs_f64() / total;
                let pct = ratio.min(config.progress_cap);
                if pct > run.state.progress.pct {
                    run.state.progress.pct = pct;
                }
                true
            })
            .await
            .unwrap_or(false);

        if !live {
            break;
        }
    }
}

/// Append one flavour line per randomized tick.
async fn log_ticker(store: Arc<RunStore>, config: Arc<SimConfig>, run_id: RunId) {
    loop {
        time::sleep(draw(config.log_interval_min, config.log_interval_max)).await;

        let live = store
            .update(&run_id, |run| {
                if run.state.status != RunStatus::Running {
                    return false;
                }
                let message = FLAVOR_MESSAGES
                    .choose(&mut rand::thread_rng())
                    .copied()
                    .unwrap_or(FLAVOR_MESSAGES[0]);
                run.push_log(format!(
                    "{} | {}",
                    chrono::Local::now().format("%H:%M:%S"),
                    message
                ));
                true
            })
            .await
            .unwrap_or(false);

        if !live {
            break;
        }
    }
}

/// One-shot completion event.
async fn complete_after(store: Arc<RunStore>, run_id: RunId, duration: Duration) {
    time::sleep(duration).await;

    let completed = store
        .update(&run_id, |run| {
            run.timers.completion.take();
            if run.state.status != RunStatus::Running {
                return false;
            }
            run.timers.release_tickers();
            if run.state.complete().is_err() {
                return false;
            }
            run.push_log(FINISHED_LINE);
            run.results = Some(synthesize(&run.payload, &mut rand::thread_rng()));
            true
        })
        .await
        .unwrap_or(false);

    if completed {
        info!(run_id = %run_id, "Simulated run done");
    } else {
        debug!(run_id = %run_id, "Completion fired for a run that is no longer running");
    }
}

fn draw(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    rand::thread_rng().gen_range(min..=max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_within_bounds() {
        let min = Duration::from_millis(500);
        let max = Duration::from_millis(1500);
        for _ in 0..100 {
            let d = draw(min, max);
            assert!(d >= min && d <= max);
        }
        assert_eq!(draw(max, min), max);
    }
}
