//! Fixed-delay retry policy with cancellable waits.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};

/// How often and how patiently an operation is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, at least one
    pub max_attempts: u32,
    /// Pause between attempts; does not grow
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run out.
    ///
    /// The attempt number (starting at 1) is passed to the operation. Errors
    /// that are not retryable end the loop at once. A cancelled `shutdown`
    /// interrupts the wait and yields [`AppError::Cancelled`].
    pub async fn run<T, F, Fut>(
        &self,
        label: &str,
        shutdown: &CancellationToken,
        mut operation: F,
    ) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    log::error!(
                        "{} failed (attempt {}/{}): {}",
                        label,
                        attempt,
                        self.max_attempts,
                        e
                    );
                    last_error = Some(e);
                }
            }

            if attempt < self.max_attempts && !self.delay.is_zero() {
                tokio::select! {
                    _ = shutdown.cancelled() => return Err(AppError::Cancelled),
                    _ = tokio::time::sleep(self.delay) => {}
                }
            }
        }

        Err(AppError::RetriesExhausted {
            attempts: self.max_attempts,
            message: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(5))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test]
    async fn test_succeeds_after_failures() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let calls = AtomicU32::new(0);

        let result = policy
            .run("op", &CancellationToken::new(), |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(AppError::Status { status: 502 })
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausts_attempts() {
        let policy = RetryPolicy::new(2, Duration::ZERO);
        let result: Result<()> = policy
            .run("op", &CancellationToken::new(), |_| async {
                Err(AppError::payload("broken"))
            })
            .await;

        match result {
            Err(AppError::RetriesExhausted { attempts, message }) => {
                assert_eq!(attempts, 2);
                assert!(message.contains("broken"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_permanent_error_stops_early() {
        let policy = RetryPolicy::new(5, Duration::ZERO);
        let calls = AtomicU32::new(0);

        let result: Result<()> = policy
            .run("op", &CancellationToken::new(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AppError::selector("[[", "bad")) }
            })
            .await;

        assert!(matches!(result, Err(AppError::Selector { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_wait() {
        let policy = RetryPolicy::new(3, Duration::from_secs(3600));
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let result: Result<()> = policy
            .run("op", &shutdown, |_| async {
                Err(AppError::Status { status: 503 })
            })
            .await;

        assert!(matches!(result, Err(AppError::Cancelled)));
    }

    #[test]
    fn test_at_least_one_attempt() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }
}
