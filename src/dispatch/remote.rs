//! Remote scoring client
//!
//! HTTP client for the external scoring service (`POST /predict`,
//! `POST /explain`, `GET /health`). Everything that can go wrong on this side
//! of the wire is a [`RemoteError`]; the dispatcher decides what to do with it.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::types::{Explanation, TelemetryRecord, Verdict};

/// Remote scoring errors
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("no remote scoring service configured")]
    Disabled,
    #[error("remote call timed out after {0:?}")]
    Timeout(Duration),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Server returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// A scoring service reachable over the network.
#[async_trait]
pub trait RemoteScorer: Send + Sync {
    async fn predict(&self, record: &TelemetryRecord) -> Result<Verdict, RemoteError>;

    async fn explain(&self, record: &TelemetryRecord) -> Result<Explanation, RemoteError>;

    /// `Ok` when the service answers its health probe with a success status.
    async fn health(&self) -> Result<(), RemoteError>;

    /// Human-readable target for logging.
    fn endpoint(&self) -> &str;
}

/// [`RemoteScorer`] over HTTP + JSON.
#[derive(Clone)]
pub struct HttpRemoteScorer {
    http: reqwest::Client,
    base_url: String,
}

impl HttpRemoteScorer {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        record: &TelemetryRecord,
    ) -> Result<T, RemoteError> {
        let resp = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(record)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(RemoteError::Status(resp.status()));
        }

        let body = resp.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| RemoteError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl RemoteScorer for HttpRemoteScorer {
    async fn predict(&self, record: &TelemetryRecord) -> Result<Verdict, RemoteError> {
        let verdict: Verdict = self.post_json("/predict", record).await?;
        verdict.check_bounds().map_err(RemoteError::Malformed)?;
        Ok(verdict)
    }

    async fn explain(&self, record: &TelemetryRecord) -> Result<Explanation, RemoteError> {
        self.post_json("/explain", record).await
    }

    async fn health(&self) -> Result<(), RemoteError> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(RemoteError::Status(resp.status()))
        }
    }

    fn endpoint(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_trimmed() {
        let scorer =
            HttpRemoteScorer::new("http://scorer:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(scorer.endpoint(), "http://scorer:8000");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_http_error() {
        // Port 9 (discard) on loopback is closed on CI hosts.
        let scorer = HttpRemoteScorer::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = scorer
            .predict(&TelemetryRecord::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Http(_)), "got {err:?}");
    }
}
