//! AI completion-verification client.
//!
//! The model itself is an external service; this module only ships the
//! evidence over and interprets the verdict. Transient upstream errors
//! (rate limits, 5xx, network) are retried with exponential back-off,
//! capped at [`MAX_ATTEMPTS`] — the verdict call is read-only, so
//! retrying is safe.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::{ApiError, Result};

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF_SECS: u64 = 1;

/// What the verifier decided about a submitted completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub approved: bool,
    pub confidence: f64,
    pub reasoning: String,
}

/// Evidence submitted for a task completion.
#[derive(Debug, Clone, Serialize)]
pub struct Submission<'a> {
    pub task_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_photo: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<&'a str>,
}

#[async_trait]
pub trait CompletionVerifier: Send + Sync {
    async fn verify(&self, submission: &Submission<'_>) -> Result<Verdict>;
}

// ─────────────────────────────────────────────────────────
// HTTP implementation
// ─────────────────────────────────────────────────────────

pub struct HttpVerifier {
    http: Client,
    url: String,
    api_key: Option<String>,
}

impl HttpVerifier {
    pub fn new(http: Client, url: String, api_key: Option<String>) -> Self {
        Self { http, url, api_key }
    }
}

#[async_trait]
impl CompletionVerifier for HttpVerifier {
    async fn verify(&self, submission: &Submission<'_>) -> Result<Verdict> {
        let mut backoff = INITIAL_BACKOFF_SECS;

        for attempt in 1..=MAX_ATTEMPTS {
            let mut request = self.http.post(&self.url).json(submission);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            match request.send().await {
                Err(e) if attempt < MAX_ATTEMPTS => {
                    warn!("verifier request failed (retry in {backoff}s): {e}");
                }
                Err(e) => return Err(ApiError::Http(e)),
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response.json::<Verdict>().await?);
                    }
                    let retryable = status == reqwest::StatusCode::TOO_MANY_REQUESTS
                        || status.is_server_error();
                    if !retryable || attempt == MAX_ATTEMPTS {
                        return Err(ApiError::Verifier(format!(
                            "verification service returned {status}"
                        )));
                    }
                    warn!("verifier returned {status} (retry in {backoff}s)");
                }
            }

            tokio::time::sleep(Duration::from_secs(backoff)).await;
            backoff *= 2;
        }

        unreachable!("loop returns on the final attempt")
    }
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
