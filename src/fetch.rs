// src/fetch.rs
// One network round-trip per call: fetch the summary endpoint, validate
// the envelope, return a well-formed Snapshot or a typed failure.
// Retry policy lives with the scheduler (there is none: a failed fetch
// waits for the next tick or a manual trigger).

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;

use crate::snapshot::Snapshot;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Transport failure; no data available this cycle.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    /// The payload failed schema validation. Treated like a network
    /// failure for display purposes but logged distinctly.
    #[error("malformed summary payload: {0}")]
    Malformed(String),
    /// The remote explicitly reported failure.
    #[error("server reported failure: {0}")]
    Server(String),
}

impl FetchError {
    /// Stable label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Network(_) => "network",
            FetchError::Malformed(_) => "malformed",
            FetchError::Server(_) => "server",
        }
    }
}

/// A provider of aggregate snapshots. The scheduler only ever talks to
/// this trait, so tests substitute stub sources.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_summary(&self) -> Result<Snapshot, FetchError>;
    fn name(&self) -> &'static str;
}

/// Production source: one GET of the discovery service's summary
/// endpoint with a bounded client timeout.
pub struct HttpSnapshotSource {
    url: String,
    client: reqwest::Client,
}

impl HttpSnapshotSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building snapshot http client")?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn fetch_summary(&self) -> Result<Snapshot, FetchError> {
        let resp = self.client.get(&self.url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        parse_summary(status, &body)
    }

    fn name(&self) -> &'static str {
        "discovery-summary"
    }
}

#[derive(serde::Deserialize)]
struct SummaryEnvelope {
    success: bool,
    #[serde(default)]
    data: Option<Snapshot>,
    #[serde(default)]
    error: Option<String>,
}

/// Classify one HTTP exchange into a Snapshot or a FetchError. Split
/// out of the trait impl so the mapping is testable without a server.
pub fn parse_summary(status: StatusCode, body: &str) -> Result<Snapshot, FetchError> {
    if !status.is_success() {
        // Prefer the envelope's structured message when the error body
        // still parses; fall back to a body snippet.
        let msg = serde_json::from_str::<SummaryEnvelope>(body)
            .ok()
            .and_then(|env| env.error)
            .unwrap_or_else(|| snippet(body));
        return Err(FetchError::Server(format!("status {status}: {msg}")));
    }

    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Err(FetchError::Malformed("empty or null body".into()));
    }

    let envelope: SummaryEnvelope =
        serde_json::from_str(trimmed).map_err(|e| FetchError::Malformed(e.to_string()))?;

    if !envelope.success {
        return Err(FetchError::Server(
            envelope
                .error
                .unwrap_or_else(|| "unspecified server error".into()),
        ));
    }
    envelope
        .data
        .ok_or_else(|| FetchError::Malformed("success envelope without data".into()))
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".into();
    }
    trimmed.chars().take(120).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUMMARY_OK: &str = include_str!("../tests/fixtures/summary.json");

    #[test]
    fn well_formed_envelope_parses() {
        let snap = parse_summary(StatusCode::OK, SUMMARY_OK).unwrap();
        assert_eq!(snap.stats.total_projects, 128);
        assert_eq!(snap.recent.items.len(), snap.recent.count);
        assert!(snap.head_activity_ts().is_some());
    }

    #[test]
    fn explicit_failure_envelope_is_a_server_error() {
        let body = r#"{"success": false, "error": "collector offline", "data": null}"#;
        match parse_summary(StatusCode::OK, body) {
            Err(FetchError::Server(msg)) => assert!(msg.contains("collector offline")),
            other => panic!("expected Server error, got {other:?}"),
        }
    }

    #[test]
    fn non_success_status_is_a_server_error() {
        let err = parse_summary(StatusCode::BAD_GATEWAY, "upstream died").unwrap_err();
        assert_eq!(err.kind(), "server");
        assert!(err.to_string().contains("502"));
    }

    #[test]
    fn garbage_and_empty_bodies_are_malformed() {
        assert_eq!(
            parse_summary(StatusCode::OK, "not json").unwrap_err().kind(),
            "malformed"
        );
        assert_eq!(
            parse_summary(StatusCode::OK, "  ").unwrap_err().kind(),
            "malformed"
        );
        assert_eq!(
            parse_summary(StatusCode::OK, "null").unwrap_err().kind(),
            "malformed"
        );
    }

    #[test]
    fn missing_field_fails_validation_not_silently_defaults() {
        // Drop a required stats counter from an otherwise valid payload.
        let mut v: serde_json::Value = serde_json::from_str(SUMMARY_OK).unwrap();
        v["data"]["stats"]
            .as_object_mut()
            .unwrap()
            .remove("total_projects");
        let body = v.to_string();
        assert_eq!(
            parse_summary(StatusCode::OK, &body).unwrap_err().kind(),
            "malformed"
        );
    }

    #[test]
    fn success_without_data_is_malformed() {
        let body = r#"{"success": true, "data": null}"#;
        assert_eq!(
            parse_summary(StatusCode::OK, body).unwrap_err().kind(),
            "malformed"
        );
    }
}
