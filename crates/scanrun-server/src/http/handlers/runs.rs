//! Run API handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{info, warn};

use scanrun_client::{ApiError, RunApi};
use scanrun_core::{RunId, RunPayload, RunStatus};

use crate::http::responses::{CancelResponse, CreateRunResponse, ErrorResponse, LogsQuery};
use crate::state::AppState;

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}

/// Translate an engine error into an HTTP answer.
fn api_error(err: ApiError) -> Response {
    match err {
        ApiError::NotFound(_) => error_response(StatusCode::NOT_FOUND, "Run not found"),
        ApiError::NotReady(_) => error_response(StatusCode::CONFLICT, "Results not ready"),
        ApiError::Rejected(message) => error_response(StatusCode::BAD_REQUEST, message),
        ApiError::Unsupported(op) => {
            error_response(StatusCode::NOT_IMPLEMENTED, format!("{op} is not supported"))
        }
        other => {
            warn!(error = %other, "Request failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    }
}

/// Submit a new run.
pub async fn create_run(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RunPayload>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!(error = %rejection, "Malformed run submission");
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    if let Err(e) = payload.validate() {
        warn!(error = %e, "Rejected run submission");
        return error_response(StatusCode::BAD_REQUEST, e.to_string());
    }

    match state.engine.create_run(&payload).await {
        Ok(run_id) => {
            info!(run_id = %run_id, endpoint = %payload.endpoint_url, "Run accepted");
            Json(CreateRunResponse {
                run_id,
                status: RunStatus::Queued,
            })
            .into_response()
        }
        Err(e) => api_error(e),
    }
}

/// Current run snapshot.
pub async fn get_run(State(state): State<Arc<AppState>>, Path(run_id): Path<String>) -> Response {
    match state.engine.get_run(&RunId::new(run_id)).await {
        Ok(run) => Json(run).into_response(),
        Err(e) => api_error(e),
    }
}

/// Log lines from `?cursor=` onward.
pub async fn get_logs(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<String>,
    Query(query): Query<LogsQuery>,
) -> Response {
    match state.engine.get_logs(&RunId::new(run_id), query.cursor).await {
        Ok(page) => Json(page).into_response(),
        Err(e) => api_error(e),
    }
}

/// Final results; 409 until the run is done.
pub async fn get_results(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<String>,
) -> Response {
    match state.engine.get_results(&RunId::new(run_id)).await {
        Ok(results) => Json(results).into_response(),
        Err(e) => api_error(e),
    }
}

/// Cancel a pending run. Terminal runs are left as they are.
pub async fn cancel_run(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<String>,
) -> Response {
    let run_id = RunId::new(run_id);
    if let Err(e) = state.engine.cancel_run(&run_id).await {
        return api_error(e);
    }

    match state.engine.get_run(&run_id).await {
        Ok(run) => Json(CancelResponse { status: run.status }).into_response(),
        Err(e) => api_error(e),
    }
}
