//! Chat-completion client with per-attempt timeouts and class-based backoff.

mod retry;
mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use retry::{FailureClass, backoff};
pub use transport::{ChatTransport, HttpTransport, TransportError, TransportResponse};

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::config::ApiKey;
use crate::metrics::UPSTREAM_ATTEMPTS;
use crate::models::{ChatRequest, ChatResponse, UpstreamErrorBody};

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("upstream API key is not configured")]
    MissingCredential,

    #[error("upstream request timed out after {attempts} attempt(s)")]
    Timeout { attempts: u32 },

    #[error("upstream API error: {status} - {message}")]
    Status { status: u16, message: String },

    #[error("upstream request failed: {0}")]
    Network(String),

    #[error("upstream response could not be decoded: {0}")]
    MalformedBody(String),

    #[error("AI service returned empty response")]
    EmptyResponse,
}

/// How a single logical call is executed.
#[derive(Debug, Clone, Copy)]
pub struct CallPolicy {
    // None means the attempt is never cancelled
    pub timeout: Option<Duration>,
    pub max_attempts: u32,
}

impl CallPolicy {
    pub const ANALYSIS: Self = Self {
        timeout: Some(Duration::from_secs(30)),
        max_attempts: 3,
    };

    pub const COMMENT: Self = Self {
        timeout: Some(Duration::from_secs(25)),
        max_attempts: 1,
    };

    // Simplified-prompt escalation: one uncancelled attempt
    pub const SIMPLIFIED: Self = Self {
        timeout: None,
        max_attempts: 1,
    };
}

pub struct UpstreamClient {
    transport: Arc<dyn ChatTransport>,
    api_key: Option<ApiKey>,
}

impl UpstreamClient {
    pub fn new(transport: Arc<dyn ChatTransport>, api_key: Option<ApiKey>) -> Self {
        Self { transport, api_key }
    }

    pub fn ensure_configured(&self) -> Result<&ApiKey, UpstreamError> {
        self.api_key.as_ref().ok_or(UpstreamError::MissingCredential)
    }

    /// Runs `request` until it succeeds, hits a terminal status, or the
    /// attempt budget is spent. The last observed failure is returned.
    pub async fn generate(
        &self,
        request: &ChatRequest,
        policy: CallPolicy,
    ) -> Result<String, UpstreamError> {
        let api_key = self.ensure_configured()?;
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(
                model = %request.model,
                attempt,
                max_attempts,
                "Upstream request attempt"
            );

            let (class, err) = match self.attempt(request, api_key, policy.timeout).await {
                Ok(response) if (200..300).contains(&response.status) => {
                    UPSTREAM_ATTEMPTS.with_label_values(&["success"]).inc();
                    return decode_content(&response.body);
                }
                Ok(response) => {
                    let class = FailureClass::from_status(response.status);
                    let err = UpstreamError::Status {
                        status: response.status,
                        message: error_message(&response.body),
                    };
                    (class, err)
                }
                Err(AttemptError::TimedOut) => {
                    warn!(attempt, "Upstream request timed out");
                    (
                        FailureClass::Timeout,
                        UpstreamError::Timeout { attempts: attempt },
                    )
                }
                Err(AttemptError::Transport(e)) => {
                    warn!(attempt, error = %e, "Upstream request failed");
                    (FailureClass::Network, UpstreamError::Network(e.0))
                }
            };
            UPSTREAM_ATTEMPTS.with_label_values(&[class.label()]).inc();

            match backoff(class, attempt, max_attempts) {
                Some(delay) => {
                    info!(
                        attempt,
                        failure = class.label(),
                        delay_ms = delay.as_millis() as u64,
                        "Retrying upstream request after backoff"
                    );
                    sleep(delay).await;
                }
                None => {
                    warn!(attempt, failure = class.label(), error = %err, "Giving up on upstream request");
                    return Err(err);
                }
            }
        }
    }

    async fn attempt(
        &self,
        request: &ChatRequest,
        api_key: &ApiKey,
        limit: Option<Duration>,
    ) -> Result<TransportResponse, AttemptError> {
        let call = self.transport.post(request, api_key);
        match limit {
            // dropping the future on timeout cancels the in-flight call
            Some(limit) => match timeout(limit, call).await {
                Ok(result) => result.map_err(AttemptError::Transport),
                Err(_) => Err(AttemptError::TimedOut),
            },
            None => call.await.map_err(AttemptError::Transport),
        }
    }
}

enum AttemptError {
    TimedOut,
    Transport(TransportError),
}

fn decode_content(body: &str) -> Result<String, UpstreamError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| UpstreamError::MalformedBody(e.to_string()))?;
    parsed.first_content().ok_or(UpstreamError::EmptyResponse)
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<UpstreamErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|d| d.message)
        .unwrap_or_else(|| "Unknown error".to_string())
}
