//! Retry and backoff policy.
//!
//! This module encapsulates error classification (timeouts, throttling,
//! connection failures, missing pages) and exponential backoff decisions so
//! that the image fetcher and the pipeline share a consistent policy.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use error::FetchError;
pub use policy::{ErrorKind, FailureKind, RetryDecision, RetryPolicy};
pub use run::{run_with_retry, Attempts, RetryError};
