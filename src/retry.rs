//! Bounded retry with linear backoff.
//!
//! An operation is attempted up to `max_attempts` times. After a retryable
//! failure on attempt `n` the executor waits `base_delay * n` before the
//! next attempt. A non-retryable failure, or a failure on the final
//! attempt, is returned unchanged.

use std::{fmt, future::Future, time::Duration};

use tokio::time::{sleep, Instant};

use crate::RequestError;

/// Attempt ceiling, backoff base and optional overall deadline.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts permitted, including the first. Always at least 1.
    pub max_attempts: u32,
    /// Delay unit; the wait after attempt `n` is `base_delay * n`.
    pub base_delay: Duration,
    /// Upper bound on the time spent across all attempts and waits.
    pub deadline: Option<Duration>,
}

/// What the executor does after a failed attempt.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryDecision {
    /// Sleep for the given delay, then run attempt `next_attempt`.
    Wait {
        delay: Duration,
        next_attempt: u32,
    },
    /// Stop and surface the error of the last attempt.
    Fail,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Backoff wait after failed attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Transition out of a failed `attempt`.
    ///
    /// `elapsed` is the time spent since the first attempt started.
    pub fn decide(&self, attempt: u32, retryable: bool, elapsed: Duration) -> RetryDecision {
        if !retryable || attempt >= self.max_attempts {
            return RetryDecision::Fail;
        }
        let delay = self.delay_for(attempt);
        if let Some(deadline) = self.deadline {
            if elapsed.saturating_add(delay) >= deadline {
                return RetryDecision::Fail;
            }
        }
        RetryDecision::Wait {
            delay,
            next_attempt: attempt + 1,
        }
    }

    /// Time left before the deadline, if one is set.
    pub fn remaining(&self, elapsed: Duration) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_sub(elapsed))
    }

    /// Runs `operation` until it succeeds, fails with an error `should_retry`
    /// rejects, or the attempt ceiling is reached.
    ///
    /// `operation` receives the 1-based attempt number.
    pub async fn execute<T, E, F, Fut, P>(&self, mut operation: F, should_retry: P) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: fmt::Display,
    {
        let started = Instant::now();
        let mut attempt = 1u32;
        loop {
            let err = match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            match self.decide(attempt, should_retry(&err), started.elapsed()) {
                RetryDecision::Fail => return Err(err),
                RetryDecision::Wait {
                    delay,
                    next_attempt,
                } => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "attempt failed, retrying"
                    );

                    sleep(delay).await;
                    attempt = next_attempt;
                }
            }
        }
    }
}

/// Retry predicate for request failures.
///
/// Transport failures, 5xx and 429 are retryable; everything else is not.
pub fn is_retryable(err: &RequestError) -> bool {
    match err {
        RequestError::Transport(_) => true,
        RequestError::Http { status, .. } => *status >= 500 || *status == 429,
        RequestError::Encode(_) | RequestError::Decode(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicU32, Ordering},
        time::Duration,
    };

    use tokio::time::Instant;

    use super::{is_retryable, RetryDecision, RetryPolicy};
    use crate::{RequestError, TransportError};

    fn http(status: u16) -> RequestError {
        RequestError::Http {
            status,
            body: String::new(),
        }
    }

    #[test]
    fn predicate_classifies_failures() {
        assert!(is_retryable(&RequestError::Transport(TransportError::Connect(
            "refused".to_owned()
        ))));
        assert!(is_retryable(&RequestError::Transport(TransportError::Timeout(
            "slow".to_owned()
        ))));
        assert!(is_retryable(&http(500)));
        assert!(is_retryable(&http(503)));
        assert!(is_retryable(&http(429)));
        assert!(!is_retryable(&http(400)));
        assert!(!is_retryable(&http(404)));
        assert!(!is_retryable(&RequestError::Decode("bad".to_owned())));
    }

    #[test]
    fn decide_walks_linear_backoff() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        assert_eq!(
            policy.decide(1, true, Duration::ZERO),
            RetryDecision::Wait {
                delay: Duration::from_millis(100),
                next_attempt: 2
            }
        );
        assert_eq!(
            policy.decide(2, true, Duration::ZERO),
            RetryDecision::Wait {
                delay: Duration::from_millis(200),
                next_attempt: 3
            }
        );
        assert_eq!(policy.decide(3, true, Duration::ZERO), RetryDecision::Fail);
        assert_eq!(policy.decide(1, false, Duration::ZERO), RetryDecision::Fail);
    }

    #[test]
    fn decide_stops_before_crossing_deadline() {
        let policy =
            RetryPolicy::new(5, Duration::from_millis(100)).with_deadline(Duration::from_millis(250));
        assert!(matches!(
            policy.decide(1, true, Duration::from_millis(10)),
            RetryDecision::Wait { .. }
        ));
        assert_eq!(
            policy.decide(2, true, Duration::from_millis(120)),
            RetryDecision::Fail
        );
    }

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn always_retryable_failure_runs_every_attempt() {
        let policy = RetryPolicy::new(4, Duration::from_millis(10));
        let calls = AtomicU32::new(0);

        let err = policy
            .execute(
                |attempt| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async move { Err::<(), String>(format!("fail {attempt}")) }
                },
                |_| true,
            )
            .await
            .expect_err("must exhaust attempts");

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(err, "fail 4");
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_failure_runs_once() {
        let policy = RetryPolicy::new(5, Duration::from_millis(10));
        let calls = AtomicU32::new(0);

        let err = policy
            .execute(
                |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err::<(), RequestError>(http(404)) }
                },
                is_retryable,
            )
            .await
            .expect_err("must fail");

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test(start_paused = true)]
    async fn success_short_circuits_and_waits_linearly() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100));
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let value = policy
            .execute(
                |attempt| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if attempt < 3 {
                            Err(http(503))
                        } else {
                            Ok(attempt)
                        }
                    }
                },
                is_retryable,
            )
            .await
            .expect("third attempt must succeed");

        assert_eq!(value, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1x + 2x base delay
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(300), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(400), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_cuts_retry_sequence_short() {
        let policy =
            RetryPolicy::new(10, Duration::from_millis(100)).with_deadline(Duration::from_millis(350));
        let calls = AtomicU32::new(0);

        let _ = policy
            .execute(
                |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err::<(), RequestError>(http(500)) }
                },
                is_retryable,
            )
            .await;

        // waits of 100 and 200 fit, the third (300) would cross 350ms
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
