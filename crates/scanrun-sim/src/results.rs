//! Synthesized results of a finished simulated run.

use rand::Rng;
use serde_json::json;

use scanrun_core::{Artifact, ResultsSummary, RunPayload, RunResults, SchemaCounts};

/// Issues every simulated scan "finds".
const POTENTIAL_ISSUES: [&str; 2] = [
    "Exposed introspection enabled",
    "Potential IDOR vector on user node",
];

/// Build a results document with fixed shape and random counts.
///
/// Echoes the request parameters but never the credential.
pub fn synthesize<R: Rng + ?Sized>(payload: &RunPayload, rng: &mut R) -> RunResults {
    let valid_queries: u32 = rng.gen_range(3..12);
    let mutations_tried: u32 = rng.gen_range(1..6);
    let issues = POTENTIAL_ISSUES.len() as u32;

    let raw = json!({
        "endpoint": payload.endpoint_url,
        "model": payload.model,
        "llmProvider": payload.llm_provider,
        "rounds": payload.rounds,
        "requestsPerNode": payload.requests_per_node,
        "notes": payload.notes,
        "validQueriesFound": valid_queries,
        "mutationsTried": mutations_tried,
        "potentialIssues": POTENTIAL_ISSUES,
    });

    let summary = ResultsSummary {
        endpoint: payload.endpoint_url.clone(),
        candidates: valid_queries,
        executions: mutations_tried,
        counts: SchemaCounts {
            types: 0,
            queries: 0,
            mutations: mutations_tried,
        },
        issues,
        text: Some(format!(
            "Scanned {}. Found {} plausible queries and {} potential issues.",
            payload.endpoint_url, valid_queries, issues
        )),
        notes: payload.notes.clone(),
    };

    RunResults {
        summary,
        artifacts: vec![
            Artifact::new("summary.json", "#"),
            Artifact::new("raw_results.json", "#"),
        ],
        raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesized_shape() {
        let payload = RunPayload::new("https://api.example.com/graphql")
            .with_budget(3, 4)
            .with_api_key("sk-secret")
            .with_notes("staging");

        let results = synthesize(&payload, &mut rand::thread_rng());

        assert!((3..12).contains(&results.summary.candidates));
        assert!((1..6).contains(&results.summary.executions));
        assert_eq!(results.summary.counts.mutations, results.summary.executions);
        assert_eq!(results.summary.issues, 2);
        assert_eq!(results.summary.notes.as_deref(), Some("staging"));
        assert_eq!(results.raw["rounds"], 3);
        assert_eq!(results.raw["requestsPerNode"], 4);
        assert_eq!(results.raw["potentialIssues"].as_array().unwrap().len(), 2);
        assert_eq!(results.artifacts.len(), 2);

        let rendered = serde_json::to_string(&results).unwrap();
        assert!(!rendered.contains("sk-secret"));
    }
}
