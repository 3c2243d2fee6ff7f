//! Run snapshot, progress and log page types.

use crate::{CoreError, RunId, RunStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fractional completion of a run plus a human-readable stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    /// Completion in `[0, 1]`.
    pub pct: f64,

    /// Short stage label (e.g. "queued", "running").
    pub stage: String,

    /// Optional free-text detail for the current stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Progress {
    /// Create a progress value, clamping `pct` into `[0, 1]`.
    pub fn new(pct: f64, stage: impl Into<String>) -> Self {
        Self {
            pct: pct.clamp(0.0, 1.0),
            stage: stage.into(),
            detail: None,
        }
    }

    /// Builder method to set the detail text.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new(0.0, RunStatus::Queued.as_str())
    }
}

/// Authoritative snapshot of a run as reported by a backend.
///
/// `started_at` is set iff the status is not `queued`, and `finished_at` is
/// set iff the status is terminal. The transition methods below are the only
/// way engines mutate a snapshot, which keeps both invariants intact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    /// Run identifier.
    pub run_id: RunId,

    /// Current lifecycle status.
    pub status: RunStatus,

    /// Current progress.
    #[serde(default)]
    pub progress: Progress,

    /// When the engine began work.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// When the run reached a terminal state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    /// Failure/cancellation message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunState {
    /// Create a freshly queued run.
    pub fn queued(run_id: RunId) -> Self {
        Self {
            run_id,
            status: RunStatus::Queued,
            progress: Progress::default(),
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    /// Mark the run as started.
    pub fn start(&mut self) -> Result<(), CoreError> {
        self.transition(RunStatus::Running)?;
        self.started_at = Some(Utc::now());
        self.progress = Progress::new(0.0, RunStatus::Running.as_str());
        Ok(())
    }

    /// Mark the run as done.
    pub fn complete(&mut self) -> Result<(), CoreError> {
        self.transition(RunStatus::Done)?;
        self.finish();
        self.progress = Progress::new(1.0, RunStatus::Done.as_str());
        Ok(())
    }

    /// Mark the run as failed with an explanation.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), CoreError> {
        self.transition(RunStatus::Failed)?;
        self.finish();
        self.error = Some(error.into());
        self.progress = Progress::new(0.0, RunStatus::Failed.as_str());
        Ok(())
    }

    /// Mark the run as cancelled.
    pub fn cancel(&mut self) -> Result<(), CoreError> {
        self.transition(RunStatus::Cancelled)?;
        self.finish();
        self.error = Some("Cancelled".to_string());
        self.progress = Progress::new(0.0, RunStatus::Cancelled.as_str());
        Ok(())
    }

    fn transition(&mut self, to: RunStatus) -> Result<(), CoreError> {
        let allowed = match (self.status, to) {
            (RunStatus::Queued, RunStatus::Running) => true,
            (RunStatus::Running, RunStatus::Done) => true,
            (from, RunStatus::Failed | RunStatus::Cancelled) => from.is_active(),
            _ => false,
        };
        if !allowed {
            return Err(CoreError::InvalidStateTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        Ok(())
    }

    fn finish(&mut self) {
        let now = Utc::now();
        // A run cancelled while queued never started; stamp both so that
        // started_at stays set for every non-queued status.
        self.started_at.get_or_insert(now);
        self.finished_at = Some(now);
    }
}

/// One slice of a run's append-only log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsPage {
    /// Lines at indexes `cursor..next_cursor`, in append order.
    pub lines: Vec<String>,

    /// Cursor to pass on the next fetch.
    pub next_cursor: usize,
}

impl LogsPage {
    /// Slice `lines` from `cursor` onward.
    ///
    /// A cursor past the end yields no lines and echoes the cursor back, so
    /// `next_cursor == cursor + lines.len()` always holds.
    pub fn from_cursor(lines: &[String], cursor: usize) -> Self {
        let slice = lines.get(cursor..).unwrap_or_default();
        Self {
            lines: slice.to_vec(),
            next_cursor: cursor + slice.len(),
        }
    }

    /// Returns true if the page carries no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("line {i}")).collect()
    }

    #[test]
    fn test_lifecycle_sets_timestamps_once() {
        let mut run = RunState::queued(RunId::new("r1"));
        assert!(run.started_at.is_none());
        assert!(run.finished_at.is_none());

        run.start().unwrap();
        let started = run.started_at;
        assert!(started.is_some());
        assert!(run.finished_at.is_none());

        run.complete().unwrap();
        assert_eq!(run.status, RunStatus::Done);
        assert_eq!(run.started_at, started);
        assert!(run.finished_at.is_some());
        assert_eq!(run.progress.pct, 1.0);
    }

    #[test]
    fn test_terminal_is_final() {
        let mut run = RunState::queued(RunId::new("r1"));
        run.start().unwrap();
        run.fail("boom").unwrap();

        assert!(matches!(
            run.complete(),
            Err(CoreError::InvalidStateTransition { .. })
        ));
        assert!(run.fail("again").is_err());
        assert_eq!(run.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_queued_cannot_complete() {
        let mut run = RunState::queued(RunId::new("r1"));
        assert!(run.complete().is_err());
        assert_eq!(run.status, RunStatus::Queued);
    }

    #[test]
    fn test_fail_from_queued_keeps_invariants() {
        let mut run = RunState::queued(RunId::new("r1"));
        run.fail("Cancelled by user").unwrap();
        assert!(run.started_at.is_some());
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn test_logs_page_cursor_math() {
        let all = lines(5);

        let page = LogsPage::from_cursor(&all, 0);
        assert_eq!(page.lines.len(), 5);
        assert_eq!(page.next_cursor, 5);

        let page = LogsPage::from_cursor(&all, 3);
        assert_eq!(page.lines, vec!["line 3", "line 4"]);
        assert_eq!(page.next_cursor, 5);

        let page = LogsPage::from_cursor(&all, 9);
        assert!(page.is_empty());
        assert_eq!(page.next_cursor, 9);
    }

    #[test]
    fn test_run_state_wire_format() {
        let run = RunState::queued(RunId::new("r1"));
        let json = serde_json::to_value(&run).unwrap();
        assert_eq!(json["runId"], "r1");
        assert_eq!(json["status"], "queued");
        assert_eq!(json["progress"]["stage"], "queued");
        assert!(json.get("startedAt").is_none());

        let parsed: RunState = serde_json::from_value(serde_json::json!({
            "runId": "r2",
            "status": "running",
            "progress": {"pct": 0.5, "stage": "executing_candidates", "detail": "3/6"},
            "startedAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(parsed.status, RunStatus::Running);
        assert_eq!(parsed.progress.detail.as_deref(), Some("3/6"));
    }
}
