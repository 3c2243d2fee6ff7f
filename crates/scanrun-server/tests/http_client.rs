//! The REST client against a live server on a loopback socket.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use scanrun_client::{ApiError, HttpRunApi, RunApi};
use scanrun_core::{RunId, RunPayload, RunStatus};
use scanrun_dash::{PollConfig, RunOrchestrator};
use scanrun_server::{create_router, AppState};
use scanrun_sim::{SimConfig, CANCELLED_BY_USER};

async fn serve() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = create_router(AppState::new(SimConfig::fast()));
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn payload() -> RunPayload {
    RunPayload::new("https://api.example.com/graphql").with_budget(2, 2)
}

#[tokio::test]
async fn test_client_follows_run_over_http() {
    let addr = serve().await;
    let api = HttpRunApi::new(&format!("http://{addr}"));
    assert!(api.health().await.unwrap());

    let run_id = api.create_run(&payload()).await.unwrap();
    assert!(!run_id.as_str().is_empty());

    let state = api.get_run(&run_id).await.unwrap();
    assert_eq!(state.run_id, run_id);
    assert!(matches!(state.status, RunStatus::Queued | RunStatus::Running));

    tokio::time::sleep(Duration::from_millis(500)).await;
    let page = api.get_logs(&run_id, 0).await.unwrap();
    assert_eq!(page.next_cursor, page.lines.len());

    let err = api.get_results(&run_id).await.unwrap_err();
    assert!(matches!(err, ApiError::NotReady(_)), "{err}");

    api.cancel_run(&run_id).await.unwrap();
    let state = api.get_run(&run_id).await.unwrap();
    assert_eq!(state.status, RunStatus::Failed);
    assert_eq!(state.error.as_deref(), Some(CANCELLED_BY_USER));
}

#[tokio::test]
async fn test_client_surfaces_server_errors() {
    let addr = serve().await;
    let api = HttpRunApi::new(&format!("http://{addr}"));

    let err = api
        .create_run(&payload().with_budget(11, 2))
        .await
        .unwrap_err();
    match err {
        ApiError::Rejected(message) => {
            assert!(message.contains("rounds must be between"), "{message}")
        }
        other => panic!("expected rejection, got {other}"),
    }

    let err = api
        .create_run(&RunPayload::new("ftp://example.com/graphql"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Rejected(ref m) if m.contains("http or https")), "{err}");

    let missing = RunId::new("missing");
    assert!(matches!(api.get_run(&missing).await, Err(ApiError::NotFound(_))));
    assert!(matches!(api.get_logs(&missing, 0).await, Err(ApiError::NotFound(_))));
    assert!(matches!(api.get_results(&missing).await, Err(ApiError::NotFound(_))));
    assert!(matches!(api.cancel_run(&missing).await, Err(ApiError::NotFound(_))));
}

#[tokio::test]
async fn test_orchestrator_completes_run_over_http() {
    let addr = serve().await;
    let api = Arc::new(HttpRunApi::new(&format!("http://{addr}")));
    let config = PollConfig {
        status_interval: Duration::from_millis(200),
        log_interval: Duration::from_millis(150),
    };
    let orch = RunOrchestrator::new(api.clone(), config);

    let run_id = orch.start_run(&payload()).await.unwrap();
    let view = tokio::time::timeout(Duration::from_secs(30), orch.wait_for_terminal())
        .await
        .unwrap();

    assert_eq!(view.status(), Some(RunStatus::Done));
    let results = view.results.as_ref().unwrap();
    assert_eq!(results.summary.endpoint, "https://api.example.com/graphql");
    assert_eq!(results.raw["rounds"], 2);
    assert_eq!(results.raw["requestsPerNode"], 2);

    // Logs are complete once the run is done; wait for the final drain.
    let full = api.get_logs(&run_id, 0).await.unwrap();
    let mut rx = orch.subscribe();
    let view = tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|view| view.cursor == full.next_cursor),
    )
    .await
    .unwrap()
    .unwrap()
    .clone();
    assert_eq!(view.logs, full.lines);

    orch.stop();
}
