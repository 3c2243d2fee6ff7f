//! Server configuration.

use scanrun_sim::SimConfig;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP bind address.
    pub bind_addr: String,

    /// Timings of the simulated engine behind the API.
    pub sim: SimConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            sim: SimConfig::default(),
        }
    }
}
