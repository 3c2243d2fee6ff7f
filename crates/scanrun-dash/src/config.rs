//! Dashboard configuration.

use std::time::Duration;

/// Polling cadence of the orchestrator.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Interval between status polls.
    pub status_interval: Duration,

    /// Interval between log polls.
    pub log_interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            status_interval: Duration::from_millis(1200),
            log_interval: Duration::from_millis(1000),
        }
    }
}
