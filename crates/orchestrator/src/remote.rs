//! Bounded-timeout, bounded-retry HTTP plumbing for remote service calls.
//!
//! Retries apply to connection-establishment failures only. A response that
//! arrived, whatever its status code, is returned as-is for the caller to
//! interpret; timeouts fail immediately.

use std::time::Duration;

use thiserror::Error;

/// Per-call timeout for remote service requests.
pub const REMOTE_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Transport-level failures of a remote call.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// Connection establishment kept failing until retries ran out.
    #[error("Service unavailable after {attempts} attempts")]
    Unavailable { attempts: u32 },

    /// The call exceeded the per-call timeout.
    #[error("Remote call timed out")]
    Timeout,

    /// Anything else: protocol errors, unexpected statuses where the
    /// caller demanded success, malformed response bodies.
    #[error("Unexpected remote failure: {0}")]
    Unexpected(String),
}

/// Exponential backoff policy for connection retries.
///
/// The delay before attempt `n + 1` is `base_delay * 2^n`, capped at
/// `max_delay`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Returns the backoff delay after the given zero-based failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.min(31);
        let delay = self.base_delay.saturating_mul(1u32 << exp);
        delay.min(self.max_delay)
    }
}

/// Builds a shared HTTP client with the fixed per-call timeout applied.
pub fn build_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REMOTE_CALL_TIMEOUT)
        .build()
}

/// Sends a request, retrying connection-establishment failures with
/// exponential backoff per the policy.
///
/// Any HTTP-level response is a success at this layer, even a 4xx/5xx;
/// status interpretation belongs to the service client on top.
pub async fn send_with_retry(
    request: reqwest::RequestBuilder,
    policy: &RetryPolicy,
) -> Result<reqwest::Response, ClientError> {
    let mut failed_attempts = 0u32;
    loop {
        let attempt_request = request
            .try_clone()
            .ok_or_else(|| ClientError::Unexpected("request body is not cloneable".to_string()))?;

        match attempt_request.send().await {
            Ok(response) => return Ok(response),
            Err(err) if err.is_timeout() => return Err(ClientError::Timeout),
            Err(err) if err.is_connect() => {
                failed_attempts += 1;
                if failed_attempts >= policy.max_attempts {
                    return Err(ClientError::Unavailable {
                        attempts: failed_attempts,
                    });
                }
                let delay = policy.delay_for(failed_attempts - 1);
                tracing::warn!(
                    attempt = failed_attempts,
                    backoff_ms = %delay.as_millis(),
                    error = %err,
                    "connection failed, retrying after backoff"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(ClientError::Unexpected(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles_per_attempt() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for(3), Duration::from_millis(800));
    }

    #[test]
    fn test_delay_caps_at_max() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
        };
        assert_eq!(policy.delay_for(6), Duration::from_secs(2));
        assert_eq!(policy.delay_for(30), Duration::from_secs(2));
    }

    #[test]
    fn test_large_attempt_does_not_overflow() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(u32::MAX), policy.max_delay);
    }

    #[tokio::test]
    async fn test_connection_refused_exhausts_retries() {
        let client = build_client().unwrap();
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        };

        // Nothing listens on port 1; connects are refused immediately.
        let result = send_with_retry(client.get("http://127.0.0.1:1/"), &policy).await;

        match result {
            Err(ClientError::Unavailable { attempts }) => assert_eq!(attempts, 3),
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_error_status_is_not_retried() {
        // A status-only check: send_with_retry must hand any arrived
        // response back untouched. Use a local listener speaking raw HTTP.
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\n\r\n")
                .await
                .unwrap();
        });

        let client = build_client().unwrap();
        let policy = RetryPolicy::default();
        let response = send_with_retry(client.get(format!("http://{addr}/")), &policy)
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
