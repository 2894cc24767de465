//! Fixed-interval retry loop
//!
//! Shared by the generation job poller and photo delivery. Each attempt
//! returns a [`Verdict`]; the loop sleeps `interval` between attempts and
//! never sleeps after the last one.

use std::future::Future;
use std::time::Duration;

/// How many times to try and how long to wait between tries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Same attempt budget, no waiting. Used by tests.
    #[allow(dead_code)]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self::new(Duration::ZERO, max_attempts)
    }
}

/// Outcome of a single attempt
#[derive(Debug)]
pub enum Verdict<T, E> {
    /// Terminal success
    Ready(T),
    /// Not done yet; the optional error is remembered in case this was the last attempt
    Retry(Option<E>),
    /// Terminal failure, remaining attempts are skipped
    Abort(E),
}

/// Outcome of the whole loop
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    Ready(T),
    Aborted(E),
    /// Budget used up. `last_error` is the error of the final attempt, if it failed.
    Exhausted { attempts: u32, last_error: Option<E> },
}

/// Run `attempt` (called with 1-based attempt numbers) until it yields a terminal
/// verdict or `policy.max_attempts` is reached.
pub async fn retry<T, E, F, Fut>(policy: RetryPolicy, mut attempt: F) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Verdict<T, E>>,
{
    let mut last_error = None;

    for n in 1..=policy.max_attempts {
        match attempt(n).await {
            Verdict::Ready(value) => return RetryOutcome::Ready(value),
            Verdict::Abort(err) => return RetryOutcome::Aborted(err),
            Verdict::Retry(err) => {
                last_error = err;
                if n < policy.max_attempts && !policy.interval.is_zero() {
                    tokio::time::sleep(policy.interval).await;
                }
            }
        }
    }

    RetryOutcome::Exhausted {
        attempts: policy.max_attempts,
        last_error,
    }
}
