//! Page fetch error type for retry classification.

use thiserror::Error;

/// Error returned by a single page request (curl failure or HTTP error).
/// Kept separate from anyhow so the retry loop can classify it.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Curl reported an error (timeout, connection, etc.).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// HTTP response had a non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),
    /// 2xx response without a body; treated as malformed.
    #[error("empty response body")]
    EmptyBody,
}
