//! ScanRun Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Network/HTTP
//! - Async runtimes
//!
//! All types here describe scan runs as every backend and client sees them.

pub mod error;
pub mod ids;
pub mod model;
pub mod results;
pub mod run;
pub mod status;

// Re-export commonly used types
pub use error::CoreError;
pub use ids::RunId;
pub use model::{validate_http_url, LlmProvider, RunPayload, MAX_REQUESTS_PER_NODE, MAX_ROUNDS};
pub use results::{Artifact, ResultsSummary, RunResults, SchemaCounts};
pub use run::{LogsPage, Progress, RunState};
pub use status::RunStatus;
