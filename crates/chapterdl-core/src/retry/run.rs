//! Retry loop: run a closure until success, a permanent error, or the budget is spent.

use super::classify;
use super::error::FetchError;
use super::policy::{FailureKind, RetryDecision, RetryPolicy};
use crate::control::{CancelToken, Sleeper};

/// Final error after the retry loop gave up.
#[derive(Debug, thiserror::Error)]
#[error("{kind:?}: {source}")]
pub struct RetryError {
    pub kind: FailureKind,
    #[source]
    pub source: FetchError,
}

/// Result of [`run_with_retry`] together with the number of attempts made.
#[derive(Debug)]
pub struct Attempts<T> {
    pub attempts: u32,
    pub result: Result<T, RetryError>,
}

/// Runs `f` until it succeeds or the retry policy says to stop.
///
/// `f` receives the 1-based attempt number. On a transient failure the loop
/// sleeps for the backoff duration through `sleeper`, then tries again. It
/// never makes more than `policy.attempt_budget()` attempts. A cancelled sleep
/// ends the loop with the last error as `FailureKind::Transient`.
pub fn run_with_retry<T, F>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    cancel: &CancelToken,
    mut f: F,
) -> Attempts<T>
where
    F: FnMut(u32) -> Result<T, FetchError>,
{
    let mut attempt = 1u32;
    loop {
        let err = match f(attempt) {
            Ok(v) => {
                return Attempts {
                    attempts: attempt,
                    result: Ok(v),
                }
            }
            Err(e) => e,
        };
        let kind = classify::classify(&err);
        let give_up = |kind: FailureKind, source: FetchError| Attempts {
            attempts: attempt,
            result: Err(RetryError { kind, source }),
        };
        if kind.failure_kind() == FailureKind::Permanent {
            return give_up(FailureKind::Permanent, err);
        }
        match policy.decide(attempt, kind) {
            RetryDecision::NoRetry => return give_up(FailureKind::Exhausted, err),
            RetryDecision::RetryAfter(d) => {
                tracing::warn!(attempt, delay_ms = d.as_millis() as u64, error = %err, "transient failure, backing off");
                if sleeper.sleep(d, cancel).is_err() {
                    return give_up(FailureKind::Transient, err);
                }
                attempt += 1;
            }
        }
    }
}
