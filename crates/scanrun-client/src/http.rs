//! HTTP client for the REST run backend.

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use scanrun_core::{LogsPage, RunId, RunPayload, RunResults, RunState};

use crate::api::{Capabilities, RunApi};
use crate::error::ApiError;

/// Body of a successful `POST /api/runs`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRunResponse {
    run_id: RunId,
}

/// Error body returned by the backend (`error`, or FastAPI-style `detail`).
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    detail: Option<serde_json::Value>,
}

impl ErrorBody {
    fn message(self) -> Option<String> {
        self.error.or_else(|| {
            self.detail.map(|d| match d {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
        })
    }
}

/// [`RunApi`] implementation backed by the REST API.
#[derive(Debug, Clone)]
pub struct HttpRunApi {
    inner: reqwest::Client,
    base_url: String,
    cancel: bool,
}

impl HttpRunApi {
    /// Create a new HTTP client.
    pub fn new(base_url: &str) -> Self {
        Self {
            inner: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            cancel: true,
        }
    }

    /// Advertise (or hide) the cancel endpoint.
    pub fn with_cancel(mut self, enabled: bool) -> Self {
        self.cancel = enabled;
        self
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if the backend is healthy.
    pub async fn health(&self) -> Result<bool, ApiError> {
        let url = format!("{}/health", self.base_url);
        debug!(url = %url, "Checking health");

        let response = self.inner.get(&url).send().await.map_err(transport)?;
        Ok(response.status().is_success())
    }

    fn run_url(&self, run_id: &RunId, suffix: &str) -> String {
        format!("{}/api/runs/{}{}", self.base_url, run_id, suffix)
    }

    async fn get(&self, url: &str) -> Result<Response, ApiError> {
        debug!(url = %url, "GET request");
        self.inner.get(url).send().await.map_err(transport)
    }
}

#[async_trait]
impl RunApi for HttpRunApi {
    async fn create_run(&self, payload: &RunPayload) -> Result<RunId, ApiError> {
        let url = format!("{}/api/runs", self.base_url);
        debug!(url = %url, endpoint = %payload.endpoint_url, "POST request");

        let response = self
            .inner
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            let status = response.status();
            let message = error_message(response).await;
            return Err(ApiError::Rejected(
                message.unwrap_or_else(|| format!("HTTP {status}: failed to start run")),
            ));
        }

        let body: CreateRunResponse = decode(response).await?;
        Ok(body.run_id)
    }

    async fn get_run(&self, run_id: &RunId) -> Result<RunState, ApiError> {
        let url = self.run_url(run_id, "");
        let response = self.get(&url).await?;
        decode(check_found(response, run_id).await?).await
    }

    async fn get_logs(&self, run_id: &RunId, cursor: usize) -> Result<LogsPage, ApiError> {
        let url = format!("{}?cursor={}", self.run_url(run_id, "/logs"), cursor);
        let response = self.get(&url).await?;
        decode(check_found(response, run_id).await?).await
    }

    async fn get_results(&self, run_id: &RunId) -> Result<RunResults, ApiError> {
        let url = self.run_url(run_id, "/results");
        let response = self.get(&url).await?;

        let status = response.status();
        if status.is_success() {
            return decode(response).await;
        }

        let message = error_message(response)
            .await
            .unwrap_or_else(|| format!("HTTP {status}"));
        Err(classify_results_failure(status, message))
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            cancel: self.cancel,
        }
    }

    async fn cancel_run(&self, run_id: &RunId) -> Result<(), ApiError> {
        if !self.cancel {
            return Err(ApiError::Unsupported("cancel_run"));
        }

        let url = self.run_url(run_id, "/cancel");
        debug!(url = %url, "POST request");

        let response = self.inner.post(&url).send().await.map_err(transport)?;
        check_found(response, run_id).await?;
        Ok(())
    }
}

/// Map a reqwest failure that happened before any response arrived.
fn transport(err: reqwest::Error) -> ApiError {
    if err.is_connect() || err.is_timeout() {
        ApiError::Unreachable(err.to_string())
    } else {
        ApiError::Http(err)
    }
}

async fn check_found(response: Response, run_id: &RunId) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound(format!("Run not found: {run_id}")));
    }
    let message = error_message(response)
        .await
        .unwrap_or_else(|| format!("HTTP {status}"));
    Err(classify_failure(status, message))
}

/// Non-success answer that is neither "not found" nor "not ready".
fn classify_failure(status: StatusCode, message: String) -> ApiError {
    if status.is_server_error() {
        ApiError::Server(message)
    } else {
        ApiError::Rejected(message)
    }
}

/// The REST backend answers 409 for "not ready"; older backends reuse 404
/// for both cases, so the message decides.
fn classify_results_failure(status: StatusCode, message: String) -> ApiError {
    let lower = message.to_ascii_lowercase();
    match status {
        StatusCode::CONFLICT => ApiError::NotReady(message),
        StatusCode::NOT_FOUND if lower.contains("not ready") => ApiError::NotReady(message),
        StatusCode::NOT_FOUND => ApiError::NotFound(message),
        other => classify_failure(other, message),
    }
}

async fn error_message(response: Response) -> Option<String> {
    let text = response.text().await.ok()?;
    parse_error_message(&text)
}

fn parse_error_message(text: &str) -> Option<String> {
    match serde_json::from_str::<ErrorBody>(text) {
        Ok(body) => body.message(),
        Err(_) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Err(_) => None,
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    response
        .json()
        .await
        .map_err(|e| ApiError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trimmed() {
        let client = HttpRunApi::new("http://localhost:8000/");
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(
            client.run_url(&RunId::new("abc"), "/logs"),
            "http://localhost:8000/api/runs/abc/logs"
        );
    }

    #[test]
    fn test_cancel_capability_toggle() {
        let client = HttpRunApi::new("http://localhost:8000");
        assert!(client.capabilities().cancel);
        assert!(!client.with_cancel(false).capabilities().cancel);
    }

    #[test]
    fn test_parse_error_message() {
        assert_eq!(
            parse_error_message(r#"{"error": "Run not found"}"#).as_deref(),
            Some("Run not found")
        );
        assert_eq!(
            parse_error_message(r#"{"detail": "Results not ready"}"#).as_deref(),
            Some("Results not ready")
        );
        assert_eq!(parse_error_message("plain text").as_deref(), Some("plain text"));
        assert_eq!(parse_error_message(""), None);
    }

    #[test]
    fn test_classify_results_failure() {
        assert!(matches!(
            classify_results_failure(StatusCode::CONFLICT, "Results not ready".into()),
            ApiError::NotReady(_)
        ));
        assert!(matches!(
            classify_results_failure(StatusCode::NOT_FOUND, "Results not ready".into()),
            ApiError::NotReady(_)
        ));
        assert!(matches!(
            classify_results_failure(StatusCode::NOT_FOUND, "Run not found".into()),
            ApiError::NotFound(_)
        ));
    }

    #[test]
    fn test_server_faults_are_not_misreported() {
        let err = classify_results_failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            "database unavailable".into(),
        );
        assert!(matches!(err, ApiError::Server(_)), "got {err:?}");
        assert!(err.is_transient());

        let err = classify_failure(StatusCode::BAD_GATEWAY, "HTTP 502".into());
        assert!(matches!(err, ApiError::Server(_)));

        let err = classify_failure(StatusCode::BAD_REQUEST, "bad cursor".into());
        assert!(matches!(err, ApiError::Rejected(_)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        // Port 9 (discard) is closed on test hosts; connection is refused.
        let client = HttpRunApi::new("http://127.0.0.1:9");
        let err = client
            .create_run(&RunPayload::new("https://api.example.com/graphql"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unreachable(_)), "got {err:?}");
    }
}
