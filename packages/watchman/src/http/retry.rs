//! Bounded, fixed-delay retry.
//!
//! One policy type covers every source. What differs per source is only the
//! attempt count, the delay, and what happens once attempts run out: either
//! hand the last failing response back to the caller ([`Exhausted::ReturnLast`])
//! or fail the call ([`Exhausted::Fail`]).

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use super::{FetchRequest, FetchResponse, HttpFetcher};
use crate::error::{Result, WatchmanError};

/// Behaviour once every attempt has failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exhausted {
    /// Return the last non-200 response and let the caller decide.
    ReturnLast,
    /// Raise [`WatchmanError::TransientFetch`].
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub on_exhausted: Exhausted,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration, on_exhausted: Exhausted) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            on_exhausted,
        }
    }

    /// Reddit data calls: 3 attempts, 5s apart, then hand back the failing page.
    pub fn reddit() -> Self {
        Self::new(3, Duration::from_secs(5), Exhausted::ReturnLast)
    }

    /// Twitter search: fail on the first non-200.
    pub fn twitter() -> Self {
        Self::new(1, Duration::ZERO, Exhausted::Fail)
    }

    /// Yahoo Finance batches: `max_retry` back-to-back attempts.
    pub fn yahoo_finance(max_retry: u32) -> Self {
        Self::new(max_retry, Duration::ZERO, Exhausted::Fail)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Run `op` until it succeeds or attempts run out, returning the last error.
    ///
    /// `op` receives the 1-based attempt number. `on_exhausted` is not consulted
    /// here: a fallible operation has no "last response" to return.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts => {
                    warn!(label, attempt, max_attempts = attempts, error = %e, "Attempt failed, retrying");
                    self.pause().await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// Issue `request`, retrying non-200 responses per `policy`.
///
/// Transport errors are retried too, but when the final attempt is a
/// transport error it is returned as-is since there is no response to hand back.
pub async fn fetch_with_retry(
    fetcher: &dyn HttpFetcher,
    request: &FetchRequest,
    policy: &RetryPolicy,
) -> Result<FetchResponse> {
    let attempts = policy.max_attempts.max(1);
    let mut last: Option<FetchResponse> = None;

    for attempt in 1..=attempts {
        if attempt > 1 {
            policy.pause().await;
        }

        match fetcher.fetch(request).await {
            Ok(response) if response.is_success() => return Ok(response),
            Ok(response) => {
                warn!(
                    url = %request.url,
                    status = response.status,
                    attempt,
                    max_attempts = attempts,
                    "Non-200 response"
                );
                last = Some(response);
            }
            Err(e) if attempt < attempts => {
                warn!(url = %request.url, attempt, error = %e, "HTTP call failed");
                last = None;
            }
            Err(e) => return Err(e),
        }
    }

    match (last, policy.on_exhausted) {
        (Some(response), Exhausted::ReturnLast) => Ok(response),
        (Some(response), Exhausted::Fail) => Err(WatchmanError::TransientFetch {
            url: request.url.clone(),
            status: response.status,
            body: response.body,
        }),
        (None, _) => Err(WatchmanError::Config(format!(
            "retry policy for {} made no attempts",
            request.url
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFetcher;

    const URL: &str = "https://api.example.com/data";

    #[tokio::test]
    async fn test_returns_first_success() {
        let mock = MockFetcher::new();
        mock.push(URL, FetchResponse::new(500, "boom"));
        mock.push(URL, FetchResponse::ok("{}"));

        let policy = RetryPolicy::reddit().with_delay(Duration::ZERO);
        let response = fetch_with_retry(&mock, &FetchRequest::get(URL), &policy)
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_return_last_hands_back_failing_response() {
        let mock = MockFetcher::new();
        mock.always(URL, FetchResponse::new(503, "unavailable"));

        let policy = RetryPolicy::reddit().with_delay(Duration::ZERO);
        let response = fetch_with_retry(&mock, &FetchRequest::get(URL), &policy)
            .await
            .unwrap();

        assert_eq!(response.status, 503);
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_fail_fast_raises_on_first_non_200() {
        let mock = MockFetcher::new();
        mock.push(URL, FetchResponse::new(429, "Too Many Requests"));
        mock.push(URL, FetchResponse::ok("{}"));

        let result = fetch_with_retry(&mock, &FetchRequest::get(URL), &RetryPolicy::twitter()).await;

        match result {
            Err(WatchmanError::TransientFetch { status, .. }) => assert_eq!(status, 429),
            other => panic!("expected TransientFetch, got {:?}", other),
        }
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_run_retries_until_ok() {
        let policy = RetryPolicy::yahoo_finance(3);
        let value = policy
            .run("batch", |attempt| async move {
                if attempt < 3 {
                    Err(WatchmanError::partial("batch", "bad body"))
                } else {
                    Ok(attempt)
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 3);
    }

    #[tokio::test]
    async fn test_run_returns_last_error() {
        let policy = RetryPolicy::yahoo_finance(2);
        let mut seen = 0;
        let result: Result<()> = policy
            .run("batch", |attempt| {
                seen = attempt;
                async move { Err(WatchmanError::partial("batch", format!("attempt {}", attempt))) }
            })
            .await;

        assert_eq!(seen, 2);
        assert!(result.unwrap_err().to_string().contains("attempt 2"));
    }

    #[test]
    fn test_zero_attempts_clamped_to_one() {
        assert_eq!(RetryPolicy::yahoo_finance(0).max_attempts, 1);
    }
}
