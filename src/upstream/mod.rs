//! Shared machinery for the speech and chat upstream proxies.
//!
//! Both proxies follow the same shape: fail fast on a missing credential,
//! send a bounded request, retry transient failures (429 or timeout) with
//! randomized increasing backoff, and surface everything else as a single
//! structured error carrying bounded diagnostic detail. Credentials never
//! appear in any error path.

pub mod chat;
pub mod speech;

use std::time::Duration;

use axum::http::StatusCode;
use rand::Rng;
use thiserror::Error;

use crate::respond::{bounded_detail, ApiError, ErrorKind};

pub use chat::ChatClient;
pub use speech::SpeechClient;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Server missing {0}")]
    MissingCredential(&'static str),
    #[error("Upstream rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },
    #[error("Upstream timed out after {attempts} attempts")]
    TimedOut { attempts: u32 },
    #[error("Upstream {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("Upstream transport error: {0}")]
    Transport(String),
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::MissingCredential(_) => ApiError::new(
                ErrorKind::Config,
                err.to_string(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            other => ApiError::upstream(other.to_string()),
        }
    }
}

/// Bounded retry with randomized increasing backoff. Delay for attempt `n`
/// (1-based) is `base_delay * n` plus up to `jitter`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub jitter: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            jitter: Duration::from_millis(100),
        }
    }

    pub fn backoff(&self, attempt: u32) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..jitter_ms))
        };
        self.base_delay * attempt + jitter
    }
}

/// Injectable sleep so tests can assert attempt counts and delay growth
/// without real timers.
#[async_trait::async_trait]
pub trait Delay: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioDelay;

#[async_trait::async_trait]
impl Delay for TokioDelay {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Explicit retry loop around a single upstream request.
///
/// A 429 response or a request timeout is transient and retried until the
/// policy's attempts are exhausted. Any other transport error fails
/// immediately; any other HTTP status is returned to the caller for
/// classification.
pub async fn send_with_retry(
    policy: &RetryPolicy,
    delay: &dyn Delay,
    builder: reqwest::RequestBuilder,
) -> Result<reqwest::Response, UpstreamError> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let request = builder
            .try_clone()
            .ok_or_else(|| UpstreamError::Transport("request is not retryable".to_string()))?;
        match request.send().await {
            Ok(resp) if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS => {
                if attempt >= policy.max_attempts {
                    return Err(UpstreamError::RateLimited { attempts: attempt });
                }
                let pause = policy.backoff(attempt);
                tracing::info!(attempt, pause_ms = pause.as_millis() as u64, "upstream rate limited; backing off");
                delay.sleep(pause).await;
            }
            Ok(resp) => return Ok(resp),
            Err(err) if err.is_timeout() => {
                if attempt >= policy.max_attempts {
                    return Err(UpstreamError::TimedOut { attempts: attempt });
                }
                let pause = policy.backoff(attempt);
                tracing::info!(attempt, pause_ms = pause.as_millis() as u64, "upstream timeout; backing off");
                delay.sleep(pause).await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "upstream transport error");
                return Err(UpstreamError::Transport(err.to_string()));
            }
        }
    }
}

/// Classifies a non-success response into a status error with bounded detail
/// pulled from the upstream body.
pub async fn status_error(resp: reqwest::Response) -> UpstreamError {
    let status = resp.status().as_u16();
    let text = resp.text().await.unwrap_or_default();
    UpstreamError::Status {
        status,
        detail: extract_detail(&text),
    }
}

/// Pulls the most useful human-readable fragment out of an upstream error
/// body: `error.message`, `message` or `detail` from JSON, else the raw text.
fn extract_detail(body: &str) -> String {
    let detail = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => json
            .pointer("/error/message")
            .or_else(|| json.get("message"))
            .or_else(|| json.get("detail"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string()),
        Err(_) => body.to_string(),
    };
    bounded_detail(detail.trim())
}
