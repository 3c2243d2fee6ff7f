//! ScanRun REST server library.
//!
//! Serves the run API over HTTP on top of the in-process simulated engine,
//! plus health and Prometheus metrics endpoints.

pub mod config;
pub mod http;
pub mod metrics;
pub mod state;

pub use config::ServerConfig;
pub use http::create_router;
pub use state::AppState;
