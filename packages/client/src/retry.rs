//! HTTP retry for transient failures.
//!
//! Every backend call goes through [`send`], which re-sends the request
//! with exponential backoff on connection errors, timeouts, HTTP 429 and
//! HTTP 5xx. Other statuses are returned as-is: the routing backend
//! reports "no route found" as a 4xx with a JSON body the caller still
//! needs to read.

use std::time::Duration;

use crate::ClientError;

/// First backoff delay; doubles on every retry.
const BASE_DELAY: Duration = Duration::from_millis(250);

/// Maximum length of a response body kept in error messages.
const BODY_PREVIEW_LEN: usize = 300;

/// Status and body of a finished HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    /// HTTP status code.
    pub status: u16,
    /// Response body text.
    pub body: String,
}

impl HttpReply {
    /// Whether the status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Whether the status is 4xx.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status >= 400 && self.status < 500
    }

    /// The body as a [`ClientError::Status`].
    #[must_use]
    pub fn into_status_error(self) -> ClientError {
        ClientError::Status {
            status: self.status,
            body: preview(&self.body),
        }
    }
}

/// Sends the request built by `build_request`, retrying transient
/// failures up to `max_retries` times.
///
/// The closure is called once per attempt since a
/// [`reqwest::RequestBuilder`] is consumed by sending it.
///
/// # Errors
///
/// Returns [`ClientError::Http`] if the request cannot be sent after all
/// retries, or [`ClientError::Status`] if the server keeps answering 429
/// or 5xx.
pub async fn send<F>(build_request: F, max_retries: u32) -> Result<HttpReply, ClientError>
where
    F: Fn() -> reqwest::RequestBuilder + Send + Sync,
{
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            let delay = backoff(attempt);
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && attempt < max_retries {
                    log::warn!("  transient error: {e}");
                    attempt += 1;
                    continue;
                }
                return Err(ClientError::Http(e));
            }
            Ok(response) => {
                let status = response.status();
                if is_retryable_status(status.as_u16()) && attempt < max_retries {
                    log::warn!("  HTTP {status}");
                    attempt += 1;
                    continue;
                }

                let body = response.text().await?;
                let reply = HttpReply {
                    status: status.as_u16(),
                    body,
                };
                if is_retryable_status(reply.status) {
                    log::error!("HTTP {status} after {max_retries} retries, giving up");
                    return Err(reply.into_status_error());
                }
                return Ok(reply);
            }
        }
    }
}

/// Delay before retry number `attempt` (1-based).
fn backoff(attempt: u32) -> Duration {
    BASE_DELAY.saturating_mul(1u32 << attempt.saturating_sub(1).min(10))
}

/// 429 and 5xx are worth another try; everything else is final.
const fn is_retryable_status(status: u16) -> bool {
    status == 429 || status >= 500
}

fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}

fn preview(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_PREVIEW_LEN) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
