//! Simulated engine configuration.

use std::time::Duration;

/// Timing knobs of the simulated engine.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Delay between creation and the run entering `running`.
    pub start_delay: Duration,

    /// Shortest total running time.
    pub min_duration: Duration,

    /// Longest total running time.
    pub max_duration: Duration,

    /// Cadence of the progress ticker.
    pub progress_interval: Duration,

    /// Shortest gap between two flavour log lines.
    pub log_interval_min: Duration,

    /// Longest gap between two flavour log lines.
    pub log_interval_max: Duration,

    /// Progress reported when a run starts.
    pub initial_progress: f64,

    /// Ceiling for ticker-computed progress. Must stay below 1.0; only the
    /// completion event reports 1.0.
    pub progress_cap: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            start_delay: Duration::from_millis(800),
            min_duration: Duration::from_secs(20),
            max_duration: Duration::from_secs(40),
            progress_interval: Duration::from_secs(1),
            log_interval_min: Duration::from_millis(500),
            log_interval_max: Duration::from_millis(1500),
            initial_progress: 0.02,
            progress_cap: 0.96,
        }
    }
}

impl SimConfig {
    /// Shortened timings for demos.
    pub fn fast() -> Self {
        Self {
            start_delay: Duration::from_millis(200),
            min_duration: Duration::from_secs(4),
            max_duration: Duration::from_secs(8),
            progress_interval: Duration::from_millis(250),
            log_interval_min: Duration::from_millis(150),
            log_interval_max: Duration::from_millis(400),
            ..Self::default()
        }
    }
}
