//! Retry loop around a single route attempt.
//!
//! Server errors (5xx) and transport failures back off exponentially, with
//! full jitter, up to `max_retries_on_error` times. Rate-limit responses sleep for the
//! server-supplied `retry_after` (5 seconds when absent) up to
//! `max_retries_on_rate_limit` times, or forever when that limit is `None`.
//! Every other outcome is returned immediately.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::config::ClientConfig;
use crate::error::ClientError;

/// Delay after a 429 that carried no `retry_after`.
const DEFAULT_RATE_LIMIT_BACKOFF_SECS: u64 = 5;

#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryPolicy {
    pub max_retries_on_error: u32,
    pub max_retries_on_rate_limit: Option<u32>,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            max_retries_on_error: config.max_retries_on_error,
            max_retries_on_rate_limit: config.max_retries_on_rate_limit,
            base_delay: config.retry_base_delay,
        }
    }

    /// Upper bound of the backoff before retry number `attempt` (0-based):
    /// base, 2*base, 4*base...
    fn backoff_ceiling(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    /// A uniformly random point in `[0, backoff_ceiling(attempt))`.
    fn server_error_delay(&self, attempt: u32) -> Duration {
        let ceiling = self.backoff_ceiling(attempt);
        let factor: f64 = rand::thread_rng().gen();
        Duration::try_from_secs_f64(ceiling.as_secs_f64() * factor).unwrap_or(ceiling)
    }

    fn may_retry_rate_limit(&self, retried: u32) -> bool {
        self.max_retries_on_rate_limit.map_or(true, |max| retried < max)
    }
}

/// Run `attempt` until it succeeds or fails with a non-retryable error.
pub(crate) async fn with_retries<T, F, Fut>(
    policy: &RetryPolicy,
    route: &str,
    mut attempt: F,
) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let mut server_errors = 0u32;
    let mut rate_limits = 0u32;
    loop {
        match attempt().await {
            Err(e) if e.is_retryable_server_error() && server_errors < policy.max_retries_on_error => {
                let delay = policy.server_error_delay(server_errors);
                server_errors += 1;
                tracing::warn!(
                    route,
                    attempt = server_errors,
                    max_retries = policy.max_retries_on_error,
                    "request failed, retrying in {delay:?}: {e}"
                );
                tokio::time::sleep(delay).await;
            }
            Err(ClientError::RateLimit { retry_after, .. })
                if policy.may_retry_rate_limit(rate_limits) =>
            {
                rate_limits += 1;
                let delay =
                    Duration::from_secs(retry_after.unwrap_or(DEFAULT_RATE_LIMIT_BACKOFF_SECS));
                tracing::warn!(route, attempt = rate_limits, "rate limited, retrying in {delay:?}");
                tokio::time::sleep(delay).await;
            }
            outcome => return outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn policy(max_errors: u32, max_rate: Option<u32>) -> RetryPolicy {
        RetryPolicy {
            max_retries_on_error: max_errors,
            max_retries_on_rate_limit: max_rate,
            base_delay: Duration::from_millis(1),
        }
    }

    fn server_error() -> ClientError {
        ClientError::InternalServer {
            request_id: None,
            status: 500,
            body: String::new(),
        }
    }

    #[test]
    fn ceiling_doubles() {
        let p = RetryPolicy {
            base_delay: Duration::from_millis(200),
            ..policy(3, None)
        };
        assert_eq!(p.backoff_ceiling(0), Duration::from_millis(200));
        assert_eq!(p.backoff_ceiling(2), Duration::from_millis(800));
    }

    #[test]
    fn delay_is_jittered_below_ceiling() {
        let p = RetryPolicy {
            base_delay: Duration::from_millis(200),
            ..policy(3, None)
        };
        let delays: Vec<_> = (0..64).map(|_| p.server_error_delay(2)).collect();
        assert!(delays.iter().all(|d| *d <= Duration::from_millis(800)));
        assert!(delays.iter().any(|d| *d != delays[0]));
    }

    #[tokio::test]
    async fn server_errors_exhaust_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result: Result<(), _> = with_retries(&policy(3, None), "check/user", || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(server_error())
            }
        })
        .await;
        assert!(matches!(result, Err(ClientError::InternalServer { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn rate_limit_limit_is_honoured() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result: Result<(), _> = with_retries(&policy(0, Some(2)), "check/user", || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(ClientError::RateLimit {
                    request_id: None,
                    error: None,
                    retry_after: Some(0),
                })
            }
        })
        .await;
        assert!(matches!(result, Err(ClientError::RateLimit { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result: Result<(), _> = with_retries(&policy(5, None), "check/user", || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(ClientError::BadInput {
                    request_id: None,
                    message: "nope".into(),
                })
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn success_after_transient_failure() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result = with_retries(&policy(2, None), "check/user", || {
            let c = c.clone();
            async move {
                if c.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(server_error())
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
    }
}
