//! HTTP API behaviour, exercised through the router without a socket.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use scanrun_server::{create_router, AppState};
use scanrun_sim::SimConfig;

fn router() -> (Router, Arc<AppState>) {
    let state = AppState::new(SimConfig::fast());
    (create_router(state.clone()), state)
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn submission() -> Value {
    json!({
        "endpointUrl": "https://api.example.com/graphql",
        "llmProvider": "ollama",
        "model": "llama3",
        "rounds": 2,
        "requestsPerNode": 2
    })
}

async fn create(router: &Router) -> String {
    let (status, body) = send(router, Method::POST, "/api/runs", Some(submission())).await;
    assert_eq!(status, StatusCode::OK);
    body["runId"].as_str().unwrap().to_string()
}

#[tokio::test(start_paused = true)]
async fn test_create_run_returns_queued() {
    let (router, _) = router();

    let (status, body) = send(&router, Method::POST, "/api/runs", Some(submission())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "queued");
    assert!(!body["runId"].as_str().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_invalid_submission_is_bad_request() {
    let (router, state) = router();

    let mut bad_url = submission();
    bad_url["endpointUrl"] = json!("ftp://example.com");
    let (status, body) = send(&router, Method::POST, "/api/runs", Some(bad_url)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let mut too_many_rounds = submission();
    too_many_rounds["rounds"] = json!(11);
    let (status, _) = send(&router, Method::POST, "/api/runs", Some(too_many_rounds)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&router, Method::POST, "/api/runs", Some(json!({"model": 1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    assert_eq!(state.engine.store().run_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_run_is_not_found() {
    let (router, _) = router();

    for uri in [
        "/api/runs/missing",
        "/api/runs/missing/logs",
        "/api/runs/missing/results",
    ] {
        let (status, body) = send(&router, Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body["error"], "Run not found");
    }

    let (status, _) = send(&router, Method::POST, "/api/runs/missing/cancel", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test(start_paused = true)]
async fn test_results_conflict_until_done() {
    let (router, _) = router();
    let run_id = create(&router).await;

    let (status, body) = send(&router, Method::GET, &format!("/api/runs/{run_id}/results"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Results not ready");

    tokio::time::sleep(Duration::from_secs(10)).await;

    let (status, body) = send(&router, Method::GET, &format!("/api/runs/{run_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "done");
    assert!(body["finishedAt"].is_string());

    let (status, body) = send(&router, Method::GET, &format!("/api/runs/{run_id}/results"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["endpoint"], "https://api.example.com/graphql");
    assert!(body["rawJson"].is_object());
}

#[tokio::test(start_paused = true)]
async fn test_logs_follow_cursor() {
    let (router, _) = router();
    let run_id = create(&router).await;
    tokio::time::sleep(Duration::from_secs(2)).await;

    let (status, first) = send(&router, Method::GET, &format!("/api/runs/{run_id}/logs"), None).await;
    assert_eq!(status, StatusCode::OK);
    let lines = first["lines"].as_array().unwrap();
    assert!(!lines.is_empty());
    assert_eq!(first["nextCursor"], lines.len());

    let cursor = first["nextCursor"].as_u64().unwrap();
    let (_, past_end) = send(
        &router,
        Method::GET,
        &format!("/api/runs/{run_id}/logs?cursor={}", cursor + 100),
        None,
    )
    .await;
    assert!(past_end["lines"].as_array().unwrap().is_empty());
    assert_eq!(past_end["nextCursor"], cursor + 100);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_running_run() {
    let (router, _) = router();
    let run_id = create(&router).await;
    tokio::time::sleep(Duration::from_secs(1)).await;

    let (status, body) = send(&router, Method::POST, &format!("/api/runs/{run_id}/cancel"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "failed");

    tokio::time::sleep(Duration::from_secs(20)).await;
    let (_, run) = send(&router, Method::GET, &format!("/api/runs/{run_id}"), None).await;
    assert_eq!(run["status"], "failed");
    assert_eq!(run["error"], "Cancelled by user");

    let (status, _) = send(&router, Method::GET, &format!("/api/runs/{run_id}/results"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test(start_paused = true)]
async fn test_health_and_metrics() {
    let (router, _) = router();
    create(&router).await;

    let (status, body) = send(&router, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["runs"], 1);

    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("scanrun_runs_total{status=\"queued\"} 1"));
}
