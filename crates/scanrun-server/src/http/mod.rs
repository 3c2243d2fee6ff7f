//! HTTP API.
//!
//! Provides endpoints for:
//! - Run submission and tracking (`/api/runs`, `/api/runs/{id}/...`)
//! - Health check (`/health`)
//! - Prometheus metrics (`/metrics`)

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod handlers;
pub mod responses;

/// Create the HTTP router.
pub fn create_router(state: Arc<AppState>) -> Router {
    // Dashboards are served from other origins.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Run API
        .route("/api/runs", post(handlers::create_run))
        .route("/api/runs/:run_id", get(handlers::get_run))
        .route("/api/runs/:run_id/logs", get(handlers::get_logs))
        .route("/api/runs/:run_id/results", get(handlers::get_results))
        .route("/api/runs/:run_id/cancel", post(handlers::cancel_run))
        // Observability routes
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
