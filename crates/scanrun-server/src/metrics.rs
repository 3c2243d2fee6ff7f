//! Prometheus metrics collection and formatting.
//!
//! This module provides metrics in Prometheus text exposition format.

use std::fmt::Write;
use std::sync::Arc;

use chrono::Utc;

use scanrun_core::RunStatus;

use crate::state::AppState;

const STATUSES: [RunStatus; 5] = [
    RunStatus::Queued,
    RunStatus::Running,
    RunStatus::Done,
    RunStatus::Failed,
    RunStatus::Cancelled,
];

/// Collect all metrics from AppState and format as Prometheus text.
pub async fn collect_metrics(state: &Arc<AppState>) -> String {
    let mut output = String::new();

    collect_run_metrics(state, &mut output).await;
    collect_process_metrics(state, &mut output);

    output
}

/// Collect run metrics by status.
async fn collect_run_metrics(state: &Arc<AppState>, output: &mut String) {
    let counts = state.engine.store().status_counts().await;

    writeln!(
        output,
        "# HELP scanrun_runs_total Number of known runs by status"
    )
    .ok();
    writeln!(output, "# TYPE scanrun_runs_total gauge").ok();
    for status in STATUSES {
        let count = counts.get(&status).copied().unwrap_or(0);
        writeln!(output, "scanrun_runs_total{{status=\"{status}\"}} {count}").ok();
    }
}

fn collect_process_metrics(state: &Arc<AppState>, output: &mut String) {
    let uptime = (Utc::now() - state.started_at).num_seconds().max(0);

    writeln!(
        output,
        "# HELP scanrun_uptime_seconds Seconds since the server started"
    )
    .ok();
    writeln!(output, "# TYPE scanrun_uptime_seconds gauge").ok();
    writeln!(output, "scanrun_uptime_seconds {uptime}").ok();
}
