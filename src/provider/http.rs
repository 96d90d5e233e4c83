use rand::Rng;
use reqwest::StatusCode;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

const RETRY_JITTER_DIVISOR: u128 = 4; // + up to 25% jitter

/// Retry schedule for outbound provider calls: exponential backoff from
/// `base_delay` plus jitter.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    fn base_delay_for(&self, attempt: usize) -> Duration {
        let multiplier = 1u32.checked_shl(attempt as u32).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(multiplier)
    }

    /// Wait before retry number `attempt + 1`.
    fn backoff(&self, attempt: usize) -> Duration {
        let base = self.base_delay_for(attempt);
        base + jitter(base)
    }
}

fn is_retriable_status(status: StatusCode) -> bool {
    // 529 is the provider's "overloaded" status.
    matches!(
        status,
        StatusCode::REQUEST_TIMEOUT
            | StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    ) || status.as_u16() == 529
}

/// The provider could not be reached or dropped the connection mid-body.
fn is_transient_transport_error(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout() || err.is_body()
}

fn jitter(base: Duration) -> Duration {
    let ceiling = u64::try_from(base.as_millis() / RETRY_JITTER_DIVISOR).unwrap_or(u64::MAX);
    if ceiling == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=ceiling))
}

/// Send a request, retrying transient failures.
///
/// Non-success responses that are not retriable (or that exhaust the retry
/// budget) are returned as `Ok` so the caller can read the body.
pub(super) async fn send_with_retry(
    policy: RetryPolicy,
    mut make_request: impl FnMut() -> reqwest::RequestBuilder,
) -> Result<reqwest::Response, reqwest::Error> {
    let mut attempt = 0;

    loop {
        let max_attempts = policy.max_retries + 1;

        match make_request().send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response);
                }

                if is_retriable_status(status) && attempt < policy.max_retries {
                    let delay = policy.backoff(attempt);
                    debug!(
                        "Model provider answered {}; trying again in {:?} ({} of {} attempts used)",
                        status,
                        delay,
                        attempt + 1,
                        max_attempts
                    );
                    let _ = response.bytes().await;
                    sleep(delay).await;
                    attempt += 1;
                    continue;
                }

                return Ok(response);
            }
            Err(err) => {
                if is_transient_transport_error(&err) && attempt < policy.max_retries {
                    let delay = policy.backoff(attempt);
                    debug!(
                        "Model provider unreachable ({}); trying again in {:?} ({} of {} attempts used)",
                        err,
                        delay,
                        attempt + 1,
                        max_attempts
                    );
                    sleep(delay).await;
                    attempt += 1;
                    continue;
                }

                debug!("Giving up on the model provider after {} attempt(s)", attempt + 1);
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.base_delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.base_delay_for(2), Duration::from_secs(4));
    }

    #[test]
    fn test_backoff_adds_at_most_a_quarter() {
        let policy = RetryPolicy::default();
        for _ in 0..20 {
            let delay = policy.backoff(1);
            assert!(delay >= Duration::from_secs(2));
            assert!(delay <= Duration::from_millis(2500));
        }
        assert_eq!(jitter(Duration::from_millis(3)), Duration::ZERO);
    }

    #[test]
    fn test_overloaded_is_retriable() {
        assert!(is_retriable_status(StatusCode::from_u16(529).unwrap()));
        assert!(is_retriable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_retriable_status(StatusCode::UNAUTHORIZED));
    }
}
