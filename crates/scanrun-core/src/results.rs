//! Final results of a completed run.

use serde::{Deserialize, Serialize};

/// Schema element counts discovered during a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaCounts {
    pub types: u32,
    pub queries: u32,
    pub mutations: u32,
}

/// Structured headline numbers of a finished scan.
///
/// Every field is defaulted so sparser summaries from other backends still
/// deserialize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultsSummary {
    /// Endpoint that was scanned.
    pub endpoint: String,

    /// Number of plausible candidate queries found.
    pub candidates: u32,

    /// Number of candidate executions / mutations tried.
    pub executions: u32,

    /// Schema element counts.
    pub counts: SchemaCounts,

    /// Number of potential issues flagged.
    pub issues: u32,

    /// One-line prose summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Notes echoed from the submission.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Downloadable file produced by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
    pub url: String,
}

impl Artifact {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Results of a run, produced at most once and only after `done`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResults {
    /// Structured summary.
    pub summary: ResultsSummary,

    /// Downloadable artifacts.
    #[serde(default)]
    pub artifacts: Vec<Artifact>,

    /// Full raw result document. Opaque to the client.
    #[serde(rename = "rawJson")]
    pub raw: serde_json::Value,
}
