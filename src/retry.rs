//! Bounded, interval-based retry-until-success execution.
//!
//! Every other component in the crate funnels its "poll until the page gets
//! there" behaviour through [`RetryPoller::poll`], replacing the ad-hoc
//! sleep-in-a-loop pattern with a declarative `(probe, options)` pair. The
//! module also hosts the deadline-racing primitive shared by the
//! authenticator and the orchestrator.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::time;

use crate::config::CrosspostConfig;
use crate::logging::{LogLevel, WorkflowLogger};

/// Failures are logged only on this attempt stride to avoid flooding.
const FAILURE_LOG_STRIDE: u32 = 5;

/// Budget for one polled operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryOptions {
    pub timeout: Duration,
    pub interval: Duration,
    pub max_retries: u32,
    /// Diagnostic label only; never drives behaviour.
    pub label: String,
}

impl RetryOptions {
    pub fn new(label: impl Into<String>, timeout: Duration, interval: Duration, max_retries: u32) -> Self {
        RetryOptions {
            timeout,
            interval,
            max_retries,
            label: label.into(),
        }
    }

    /// Budget derived from the configured per-stage defaults.
    pub fn stage_default(label: impl Into<String>, config: &CrosspostConfig) -> Self {
        RetryOptions::new(
            label,
            Duration::from_millis(config.stage_timeout_ms),
            Duration::from_millis(config.stage_interval_ms),
            config.stage_max_retries,
        )
    }
}

/// Terminal failure after the retry budget is exhausted.
#[derive(Debug, Error)]
#[error("retry budget exhausted for '{label}' after {attempts} attempts ({elapsed_ms}ms): {}",
    last_error.as_deref().unwrap_or("no result produced"))]
pub struct RetryFailure {
    pub label: String,
    pub attempts: u32,
    pub elapsed_ms: u128,
    /// Last captured transient error, if any probe raised one.
    pub last_error: Option<String>,
}

/// Bounded retry executor.
pub struct RetryPoller {
    logger: Arc<WorkflowLogger>,
}

impl RetryPoller {
    pub fn new(logger: Arc<WorkflowLogger>) -> Self {
        Self { logger }
    }

    pub fn logger(&self) -> &WorkflowLogger {
        &self.logger
    }

    /// Invoke `probe` repeatedly until it yields a value.
    ///
    /// A probe returning `Ok(None)` and a probe raising a transient error are
    /// treated identically: both consume one attempt and are retried after
    /// `interval`. Polling stops at the first of timeout-elapsed or
    /// max-retries-reached; the last captured error (or a generic no-result
    /// marker) is attached to the terminal [`RetryFailure`]. On success the
    /// value is returned immediately without a trailing sleep.
    pub async fn poll<T, E, F, Fut>(
        &self,
        options: &RetryOptions,
        mut probe: F,
    ) -> Result<T, RetryFailure>
    where
        E: std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        let started = Instant::now();
        let mut attempts: u32 = 0;
        let mut last_error: Option<String> = None;

        loop {
            attempts += 1;
            match probe().await {
                Ok(Some(value)) => {
                    self.logger.stage_event(&options.label, attempts, "ok", LogLevel::Debug);
                    return Ok(value);
                }
                Ok(None) => {}
                Err(err) => {
                    last_error = Some(err.to_string());
                }
            }

            if attempts % FAILURE_LOG_STRIDE == 0 {
                self.logger.stage_event(
                    &options.label,
                    attempts,
                    "still waiting",
                    LogLevel::Debug,
                );
            }

            if attempts >= options.max_retries || started.elapsed() >= options.timeout {
                let failure = RetryFailure {
                    label: options.label.clone(),
                    attempts,
                    elapsed_ms: started.elapsed().as_millis(),
                    last_error,
                };
                self.logger.stage_event(
                    &options.label,
                    attempts,
                    "budget exhausted",
                    LogLevel::Error,
                );
                return Err(failure);
            }

            time::sleep(options.interval).await;
        }
    }
}

/// Race a future against a fixed deadline.
///
/// Returns `None` when the deadline wins. Used for the bounded login
/// heuristic and the overall session budget.
pub async fn within_deadline<F>(limit: Duration, fut: F) -> Option<F::Output>
where
    F: Future,
{
    time::timeout(limit, fut).await.ok()
}

/// Fixed human-like pause between simulated interactions.
pub async fn pacing_pause(config: &CrosspostConfig) {
    if config.pacing_ms > 0 {
        time::sleep(Duration::from_millis(config.pacing_ms)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Verbosity;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn poller() -> RetryPoller {
        RetryPoller::new(Arc::new(WorkflowLogger::new(Verbosity::Minimal)))
    }

    fn options(timeout_ms: u64, interval_ms: u64, max_retries: u32) -> RetryOptions {
        RetryOptions::new(
            "test",
            Duration::from_millis(timeout_ms),
            Duration::from_millis(interval_ms),
            max_retries,
        )
    }

    #[tokio::test]
    async fn always_falsy_probe_makes_exactly_max_retries_attempts() {
        let attempts = AtomicU32::new(0);
        let started = Instant::now();

        let result: Result<(), _> = poller()
            .poll(&options(60_000, 20, 4), || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Ok::<Option<()>, Infallible>(None) }
            })
            .await;

        let failure = result.expect_err("budget must be exhausted");
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        assert_eq!(failure.attempts, 4);
        // n attempts imply n-1 interval sleeps.
        assert!(started.elapsed() >= Duration::from_millis(3 * 20));
        assert!(failure.last_error.is_none());
        assert!(failure.to_string().contains("no result produced"));
    }

    #[tokio::test]
    async fn first_truthy_result_returns_without_extra_sleep() {
        let started = Instant::now();
        let value = poller()
            .poll(&options(60_000, 5_000, 10), || async {
                Ok::<_, Infallible>(Some(42))
            })
            .await
            .expect("first attempt succeeds");
        assert_eq!(value, 42);
        assert!(started.elapsed() < Duration::from_millis(1_000));
    }

    #[tokio::test]
    async fn transient_errors_are_captured_not_reraised() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), _> = poller()
            .poll(&options(60_000, 1, 3), || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 1 {
                        Err(format!("boom on attempt {n}"))
                    } else {
                        Ok(None)
                    }
                }
            })
            .await;

        let failure = result.expect_err("budget must be exhausted");
        assert_eq!(failure.attempts, 3);
        assert_eq!(failure.last_error.as_deref(), Some("boom on attempt 1"));
        assert!(failure.to_string().contains("boom on attempt 1"));
    }

    #[tokio::test]
    async fn timeout_stops_polling_before_max_retries() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), _> = poller()
            .poll(&options(25, 10, 1_000), || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Ok::<Option<()>, Infallible>(None) }
            })
            .await;

        let failure = result.expect_err("timeout must exhaust the budget");
        assert!(failure.attempts < 1_000);
        assert!(failure.elapsed_ms >= 25);
    }

    #[tokio::test]
    async fn probe_recovers_after_transient_failures() {
        let attempts = AtomicU32::new(0);
        let value = poller()
            .poll(&options(60_000, 1, 10), || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err("not yet")
                    } else {
                        Ok(Some("done"))
                    }
                }
            })
            .await
            .expect("third attempt succeeds");
        assert_eq!(value, "done");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn within_deadline_yields_none_on_expiry() {
        let result = within_deadline(Duration::from_millis(10), async {
            time::sleep(Duration::from_secs(5)).await;
            1
        })
        .await;
        assert!(result.is_none());

        let result = within_deadline(Duration::from_secs(5), async { 1 }).await;
        assert_eq!(result, Some(1));
    }
}
