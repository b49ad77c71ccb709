//! Shared call pipeline for every upstream: rate-limit, then circuit-break,
//! then retry-with-exponential-backoff-and-jitter (§4.E).

use crate::error::{ClientError, Result};
use sentinel_resilience::{CircuitBreaker, RateLimiter};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub rate_limited_base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
            rate_limited_base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(20),
        }
    }
}

fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let exp = base.saturating_mul(1u32 << attempt.min(8));
    let capped = exp.min(max);
    let jitter_ms = rand::random::<u64>() % 250;
    capped + Duration::from_millis(jitter_ms)
}

/// Run `f` through rate limiter, circuit breaker, and retry policy.
pub async fn call_with_resilience<F, Fut, T>(
    rate_limiter: &RateLimiter,
    breaker: &CircuitBreaker,
    policy: RetryPolicy,
    mut f: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        rate_limiter.wait_for_capacity(None).await?;
        breaker.check().await?;

        match f().await {
            Ok(value) => {
                rate_limiter.note_success();
                breaker.record_success().await;
                return Ok(value);
            }
            Err(err) => {
                breaker.record_failure().await;
                if err.is_rate_limited() {
                    rate_limiter.note_rate_limited();
                } else {
                    rate_limiter.note_success();
                }

                if attempt >= policy.max_retries || !err.is_retryable() {
                    return Err(err);
                }

                let base = if err.is_rate_limited() {
                    policy.rate_limited_base_delay
                } else {
                    policy.base_delay
                };
                let delay = backoff_delay(attempt, base, policy.max_delay);
                warn!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying call");
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Map a non-2xx reqwest response into the appropriate typed error.
pub async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::HttpStatus {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_caps() {
        let small = backoff_delay(0, Duration::from_millis(100), Duration::from_secs(5));
        let large = backoff_delay(10, Duration::from_millis(100), Duration::from_secs(5));
        assert!(small <= Duration::from_millis(350));
        assert!(large <= Duration::from_millis(5250));
    }
}
