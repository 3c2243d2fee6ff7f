//! ScanRun dashboard.
//!
//! [`RunOrchestrator`] submits a run through any [`RunApi`](scanrun_client::RunApi)
//! backend and keeps a [`RunView`] current by polling status and logs. The
//! `ui` and `app` modules put a terminal front end on top of it.

pub mod app;
pub mod config;
pub mod orchestrator;
pub mod state;
pub mod ui;

pub use config::PollConfig;
pub use orchestrator::RunOrchestrator;
pub use state::RunView;
