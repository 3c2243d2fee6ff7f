//! Run submission payload and model provider types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::CoreError;

/// Upper bound on scan rounds per run.
pub const MAX_ROUNDS: u32 = 10;

/// Upper bound on requests issued per schema node.
pub const MAX_REQUESTS_PER_NODE: u32 = 20;

/// LLM provider that drives query generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    /// Local Ollama daemon.
    #[default]
    Ollama,
    /// Any OpenAI-compatible chat completions API.
    OpenaiCompatible,
    /// Google Gemini.
    Gemini,
    /// Anything else the backend knows how to reach.
    Other,
}

impl LlmProvider {
    /// Wire label of the provider.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenaiCompatible => "openai_compatible",
            Self::Gemini => "gemini",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ollama" => Ok(Self::Ollama),
            "openai_compatible" | "openai" => Ok(Self::OpenaiCompatible),
            "gemini" => Ok(Self::Gemini),
            "other" => Ok(Self::Other),
            other => Err(CoreError::InvalidInput(format!(
                "unsupported llmProvider '{other}'"
            ))),
        }
    }
}

/// Everything needed to launch a scan run.
///
/// Only lives for the duration of the submission; engines may echo selected
/// fields back in their results but never the credential.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunPayload {
    /// GraphQL endpoint under test.
    pub endpoint_url: String,

    /// Which LLM provider generates candidate queries.
    #[serde(default)]
    pub llm_provider: LlmProvider,

    /// Model name understood by the provider.
    pub model: String,

    /// Provider credential, if the provider needs one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Extra headers for the GraphQL target, as raw JSON object text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graphql_headers_json: Option<String>,

    /// Number of generation rounds (1..=10).
    pub rounds: u32,

    /// Requests issued per schema node (1..=20).
    pub requests_per_node: u32,

    /// Free-text notes carried into the results summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl RunPayload {
    /// Create a payload with the default provider settings.
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            llm_provider: LlmProvider::Ollama,
            model: "llama3".to_string(),
            api_key: None,
            graphql_headers_json: None,
            rounds: 2,
            requests_per_node: 2,
            notes: None,
        }
    }

    /// Builder method to select the provider and model.
    pub fn with_model(mut self, provider: LlmProvider, model: impl Into<String>) -> Self {
        self.llm_provider = provider;
        self.model = model.into();
        self
    }

    /// Builder method to set the provider credential.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Builder method to set the GraphQL header JSON.
    pub fn with_headers_json(mut self, json: impl Into<String>) -> Self {
        self.graphql_headers_json = Some(json.into());
        self
    }

    /// Builder method to set the scan budget.
    pub fn with_budget(mut self, rounds: u32, requests_per_node: u32) -> Self {
        self.rounds = rounds;
        self.requests_per_node = requests_per_node;
        self
    }

    /// Builder method to attach notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Check the payload against the backend's acceptance rules.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_http_url(&self.endpoint_url)?;

        if !(1..=MAX_ROUNDS).contains(&self.rounds) {
            return Err(CoreError::InvalidInput(format!(
                "rounds must be between 1 and {MAX_ROUNDS}"
            )));
        }
        if !(1..=MAX_REQUESTS_PER_NODE).contains(&self.requests_per_node) {
            return Err(CoreError::InvalidInput(format!(
                "requestsPerNode must be between 1 and {MAX_REQUESTS_PER_NODE}"
            )));
        }
        if self.model.trim().is_empty() {
            return Err(CoreError::InvalidInput("model is required".to_string()));
        }

        self.parse_headers()?;
        Ok(())
    }

    /// Parse the header JSON into a header map.
    ///
    /// Returns `None` when no (or blank) header text was supplied. Non-string
    /// values are stringified.
    pub fn parse_headers(&self) -> Result<Option<BTreeMap<String, String>>, CoreError> {
        let raw = match self.graphql_headers_json.as_deref() {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => return Ok(None),
        };

        let value: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| CoreError::InvalidInput(format!("Invalid headers JSON: {e}")))?;

        let object = value.as_object().ok_or_else(|| {
            CoreError::InvalidInput("graphqlHeadersJson must be a JSON object".to_string())
        })?;

        let headers = object
            .iter()
            .map(|(k, v)| {
                let v = match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), v)
            })
            .collect();

        Ok(Some(headers))
    }
}

impl fmt::Debug for RunPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunPayload")
            .field("endpoint_url", &self.endpoint_url)
            .field("llm_provider", &self.llm_provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("graphql_headers_json", &self.graphql_headers_json)
            .field("rounds", &self.rounds)
            .field("requests_per_node", &self.requests_per_node)
            .field("notes", &self.notes)
            .finish()
    }
}

/// Require an absolute http(s) URL with a host.
pub fn validate_http_url(raw: &str) -> Result<(), CoreError> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| CoreError::InvalidInput(format!("endpointUrl is not a valid URL: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(CoreError::InvalidInput(
            "endpointUrl must be http or https".to_string(),
        ));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(CoreError::InvalidInput(
            "endpointUrl is missing host".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> RunPayload {
        RunPayload::new("https://api.example.com/graphql")
    }

    #[test]
    fn test_valid_payload() {
        assert!(payload().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let p = RunPayload::new("ftp://api.example.com/graphql");
        assert!(matches!(p.validate(), Err(CoreError::InvalidInput(_))));

        let p = RunPayload::new("not a url");
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_budget_bounds() {
        assert!(payload().with_budget(0, 2).validate().is_err());
        assert!(payload().with_budget(11, 2).validate().is_err());
        assert!(payload().with_budget(10, 20).validate().is_ok());
        assert!(payload().with_budget(1, 21).validate().is_err());
    }

    #[test]
    fn test_parse_headers() {
        let p = payload().with_headers_json(r#"{"Authorization": "Bearer x", "X-Retry": 3}"#);
        let headers = p.parse_headers().unwrap().unwrap();
        assert_eq!(headers.get("Authorization").unwrap(), "Bearer x");
        assert_eq!(headers.get("X-Retry").unwrap(), "3");

        let blank = payload().with_headers_json("   ");
        assert_eq!(blank.parse_headers().unwrap(), None);

        let array = payload().with_headers_json("[1, 2]");
        assert!(array.validate().is_err());

        let broken = payload().with_headers_json("{oops");
        assert!(broken.validate().is_err());
    }

    #[test]
    fn test_wire_names_are_camel_case() {
        let p = payload().with_api_key("secret");
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["endpointUrl"], "https://api.example.com/graphql");
        assert_eq!(json["llmProvider"], "ollama");
        assert_eq!(json["requestsPerNode"], 2);
        assert_eq!(json["apiKey"], "secret");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let p = payload().with_api_key("super-secret");
        let rendered = format!("{:?}", p);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!(
            "openai_compatible".parse::<LlmProvider>().unwrap(),
            LlmProvider::OpenaiCompatible
        );
        assert!("bard".parse::<LlmProvider>().is_err());
    }
}
