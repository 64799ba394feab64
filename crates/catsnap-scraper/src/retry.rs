//! Retry with linear backoff for transient fetch failures.
//!
//! Transient errors (network failures, timeouts, 429, 5xx, malformed bodies)
//! are retried until the attempt budget runs out, at which point the last
//! cause is wrapped in [`ScraperError::FetchExhausted`]. Permanent errors
//! (404 and other 4xx) are returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

/// Executes `operation` up to `max_attempts` times.
///
/// After failed attempt `n` (1-based) the function sleeps `base_delay * n`
/// before trying again.
///
/// | Attempt | Sleep after failure (`base_delay = 5s`) |
/// |---------|-----------------------------------------|
/// | 1 | 5 s |
/// | 2 | 10 s |
/// | 3 (last with `max_attempts = 3`) | none, returns `FetchExhausted` |
///
/// A `max_attempts` of 0 is treated as 1.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    url: &str,
    max_attempts: u32,
    base_delay: Duration,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_transient() {
            return Err(err);
        }

        if attempt >= max_attempts {
            return Err(ScraperError::FetchExhausted {
                url: url.to_owned(),
                attempts: attempt,
                source: Box::new(err),
            });
        }

        let delay = base_delay.saturating_mul(attempt);
        tracing::warn!(
            url,
            attempt,
            max_attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "transient fetch error, retrying after backoff"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    const URL: &str = "https://shop.example/products.json";

    fn server_error() -> ScraperError {
        ScraperError::UnexpectedStatus {
            status: 503,
            url: URL.to_owned(),
        }
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(URL, 3, Duration::ZERO, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, ScraperError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_failures_then_succeeds() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(URL, 3, Duration::ZERO, || {
            let cc = Arc::clone(&cc);
            async move {
                let n = cc.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(server_error())
                } else {
                    Ok::<u32, ScraperError>(99)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausting_budget_wraps_last_error() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(URL, 3, Duration::ZERO, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, ScraperError>(ScraperError::MalformedBody {
                    url: URL.to_owned(),
                    reason: "EOF while parsing".to_owned(),
                })
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
        match result {
            Err(ScraperError::FetchExhausted {
                attempts, source, ..
            }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(*source, ScraperError::MalformedBody { .. }));
            }
            other => panic!("expected FetchExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn does_not_retry_not_found() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(URL, 3, Duration::ZERO, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, ScraperError>(ScraperError::NotFound {
                    url: URL.to_owned(),
                })
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(ScraperError::NotFound { .. })));
    }

    #[tokio::test]
    async fn zero_budget_still_attempts_once() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(URL, 0, Duration::ZERO, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, ScraperError>(server_error())
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(matches!(
            result,
            Err(ScraperError::FetchExhausted { attempts: 1, .. })
        ));
    }

    #[tokio::test]
    async fn backoff_grows_linearly() {
        let start = std::time::Instant::now();
        let result = retry_with_backoff(URL, 3, Duration::from_millis(20), || async {
            Err::<u32, ScraperError>(server_error())
        })
        .await;
        assert!(result.is_err());
        // 20ms after attempt 1, 40ms after attempt 2, none after the last.
        assert!(start.elapsed() >= Duration::from_millis(60));
    }
}
