//! Simulated scan backend.
//!
//! [`SimulatedEngine`] implements the same [`RunApi`](scanrun_client::RunApi)
//! contract as a real backend, entirely in process: runs are driven by tokio
//! timers held in an explicit [`RunStore`].

pub mod config;
pub mod engine;
pub mod results;
pub mod store;
mod timers;

pub use config::SimConfig;
pub use engine::{SimulatedEngine, CANCELLED_BY_USER};
pub use store::{RunStore, RunTimers, SimRun};
