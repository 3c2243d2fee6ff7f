//! UI-facing state of the active run.

use scanrun_core::{RunId, RunResults, RunState, RunStatus};

/// Snapshot of everything the dashboard shows about the active run.
///
/// Published through a `watch` channel; readers get cheap consistent copies
/// and never hold a lock.
#[derive(Debug, Clone, Default)]
pub struct RunView {
    /// Active run, if one was started.
    pub run_id: Option<RunId>,

    /// Last applied status snapshot.
    pub state: Option<RunState>,

    /// Accumulated log lines, in delivery order.
    pub logs: Vec<String>,

    /// Number of log lines already delivered.
    pub cursor: usize,

    /// Final results once fetched.
    pub results: Option<RunResults>,

    /// Last submission error.
    pub error: Option<String>,

    /// The one results fetch for this run has been issued.
    pub results_requested: bool,

    /// Why the results fetch failed, if it did.
    pub results_error: Option<String>,

    // Fencing: identifies the run the view belongs to, and the sequence of
    // the newest status response applied to it.
    pub(crate) generation: u64,
    pub(crate) applied_status_seq: u64,
}

impl RunView {
    /// Fresh view for a newly adopted run.
    pub(crate) fn adopt(run_id: RunId, generation: u64) -> Self {
        Self {
            state: Some(RunState::queued(run_id.clone())),
            run_id: Some(run_id),
            generation,
            ..Self::default()
        }
    }

    /// Current status, if known.
    pub fn status(&self) -> Option<RunStatus> {
        self.state.as_ref().map(|s| s.status)
    }

    /// Returns true if the run reached a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status().is_some_and(|s| s.is_terminal())
    }

    /// Terminal, and for `done` the results fetch has resolved.
    pub fn is_settled(&self) -> bool {
        match self.status() {
            Some(RunStatus::Done) => self.results.is_some() || self.results_error.is_some(),
            Some(status) => status.is_terminal(),
            None => false,
        }
    }

    /// Progress in whole percent.
    pub fn progress_percent(&self) -> u8 {
        self.state
            .as_ref()
            .map(|s| (s.progress.pct.clamp(0.0, 1.0) * 100.0).round() as u8)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adopt_resets_everything() {
        let view = RunView::adopt(RunId::new("r1"), 3);
        assert_eq!(view.status(), Some(RunStatus::Queued));
        assert!(view.logs.is_empty());
        assert_eq!(view.cursor, 0);
        assert!(view.results.is_none());
        assert!(view.error.is_none());
        assert_eq!(view.generation, 3);
        assert!(!view.is_settled());
    }

    #[test]
    fn test_settled_requires_results_for_done() {
        let mut view = RunView::adopt(RunId::new("r1"), 1);
        let state = view.state.as_mut().unwrap();
        state.start().unwrap();
        state.complete().unwrap();

        assert!(view.is_terminal());
        assert!(!view.is_settled());

        view.results_error = Some("gone".to_string());
        assert!(view.is_settled());
        assert_eq!(view.progress_percent(), 100);
    }

    #[test]
    fn test_failed_is_settled_without_results() {
        let mut view = RunView::adopt(RunId::new("r1"), 1);
        view.state.as_mut().unwrap().fail("boom").unwrap();
        assert!(view.is_settled());
    }
}
