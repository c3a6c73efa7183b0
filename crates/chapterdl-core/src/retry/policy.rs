use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// High-level classification of an error for retry purposes.
///
/// Callers map HTTP status codes and curl errors into these kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation timed out (connect/read).
    Timeout,
    /// Server asked us to slow down (e.g. 429, 503).
    Throttled,
    /// Network-level failure (connection reset, DNS, etc.).
    Connection,
    /// HTTP status that is retryable but not strictly throttling (5xx).
    Http5xx(u16),
    /// The page does not exist (404, 410).
    NotFound,
    /// Any other error (not retried).
    Other,
}

impl ErrorKind {
    /// Whether this kind is worth another attempt.
    pub fn failure_kind(self) -> FailureKind {
        match self {
            ErrorKind::Timeout
            | ErrorKind::Throttled
            | ErrorKind::Connection
            | ErrorKind::Http5xx(_) => FailureKind::Transient,
            ErrorKind::NotFound | ErrorKind::Other => FailureKind::Permanent,
        }
    }
}

/// How a page fetch ultimately failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// Retryable failure; only final when the run was cancelled mid-retry.
    Transient,
    /// Not retryable (404, malformed response).
    Permanent,
    /// Every attempt in the budget failed transiently.
    Exhausted,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Exponential backoff policy with a ceiling and optional jitter.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Base delay for backoff.
    pub base_delay: Duration,
    /// Upper bound on backoff delay.
    pub max_delay: Duration,
    /// Scale each delay by a random factor in [0.5, 1.0].
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(120),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Attempt budget; a zero budget still makes one attempt.
    pub fn attempt_budget(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay before retry `k` (0-based): `min(max_delay, base * 2^k)`, jittered when enabled.
    pub fn backoff(&self, k: u32) -> Duration {
        let sample = if self.jitter {
            rand::thread_rng().gen_range(0.0..=1.0)
        } else {
            1.0
        };
        self.backoff_with(k, sample)
    }

    /// Pure form of [`RetryPolicy::backoff`]. `sample` in [0, 1] picks the point
    /// in the jitter window; it is ignored when jitter is off.
    pub fn backoff_with(&self, k: u32, sample: f64) -> Duration {
        let exp = 1u32 << k.min(16);
        let capped = self.base_delay.saturating_mul(exp).min(self.max_delay);
        if !self.jitter {
            return capped;
        }
        let factor = 0.5 + 0.5 * sample.clamp(0.0, 1.0);
        capped.mul_f64(factor).min(self.max_delay)
    }

    /// Compute the next backoff delay for a given attempt and error kind.
    ///
    /// `attempt` is 1-based (1 = first attempt). Returns `RetryDecision::NoRetry`
    /// when we should stop retrying.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.attempt_budget() {
            return RetryDecision::NoRetry;
        }
        match kind.failure_kind() {
            FailureKind::Transient => RetryDecision::RetryAfter(self.backoff(attempt - 1)),
            FailureKind::Permanent | FailureKind::Exhausted => RetryDecision::NoRetry,
        }
    }
}
