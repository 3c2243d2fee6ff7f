//! Client-side access to ScanRun backends.
//!
//! Defines the [`RunApi`] capability the dashboard depends on and an HTTP
//! implementation that talks to the REST backend.

pub mod api;
pub mod error;
pub mod http;

pub use api::{Capabilities, RunApi};
pub use error::ApiError;
pub use http::HttpRunApi;
