//! Shared application state.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use scanrun_sim::{SimConfig, SimulatedEngine};

/// Shared application state.
pub struct AppState {
    /// Engine executing every submitted run.
    pub engine: SimulatedEngine,

    /// When the server started.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create a new AppState wrapped in Arc.
    pub fn new(sim: SimConfig) -> Arc<Self> {
        Arc::new(Self {
            engine: SimulatedEngine::new(sim),
            started_at: Utc::now(),
        })
    }
}
