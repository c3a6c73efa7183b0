//! Image fetcher: one page with bounded retries.
//!
//! Wraps a [`PageSource`] with the shared [`RetryPolicy`]; transient errors
//! (timeouts, connection resets, 5xx, 429) are retried with backoff, permanent
//! ones (404, malformed response) are returned immediately.

mod source;

pub use source::{CurlSource, FetchedBody, HttpOptions, PageSource};

use std::sync::Arc;

use crate::chapter::{PageData, PageRef};
use crate::control::{CancelToken, Sleeper};
use crate::retry::{run_with_retry, FailureKind, RetryPolicy};

/// A page that could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFailure {
    pub index: u32,
    pub kind: FailureKind,
    pub attempts: u32,
    pub message: String,
}

/// Outcome of fetching one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    Fetched { page: PageData, attempts: u32 },
    Failed(PageFailure),
}

impl FetchResult {
    pub fn index(&self) -> u32 {
        match self {
            FetchResult::Fetched { page, .. } => page.index,
            FetchResult::Failed(f) => f.index,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            FetchResult::Fetched { attempts, .. } => *attempts,
            FetchResult::Failed(f) => f.attempts,
        }
    }
}

/// Fetches pages through a source with retry and backoff. Cheap to share across workers.
#[derive(Clone)]
pub struct ImageFetcher {
    source: Arc<dyn PageSource>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    referer: Option<String>,
}

impl ImageFetcher {
    pub fn new(source: Arc<dyn PageSource>, policy: RetryPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            source,
            policy,
            sleeper,
            referer: None,
        }
    }

    /// Referer header sent with every page request.
    pub fn with_referer(mut self, referer: Option<String>) -> Self {
        self.referer = referer;
        self
    }

    /// Fetches one page. Makes at most `policy.attempt_budget()` attempts.
    pub fn fetch(&self, page: &PageRef, cancel: &CancelToken) -> FetchResult {
        let referer = self.referer.as_deref();
        let out = run_with_retry(&self.policy, self.sleeper.as_ref(), cancel, |attempt| {
            tracing::debug!(index = page.index, attempt, url = %page.url, "fetching page");
            self.source.get(&page.url, referer)
        });
        match out.result {
            Ok(body) => FetchResult::Fetched {
                page: PageData {
                    index: page.index,
                    url: page.url.clone(),
                    bytes: body.bytes,
                    content_type: body.content_type,
                },
                attempts: out.attempts,
            },
            Err(e) => {
                tracing::warn!(
                    index = page.index,
                    attempts = out.attempts,
                    kind = ?e.kind,
                    url = %page.url,
                    "giving up on page: {}",
                    e.source
                );
                FetchResult::Failed(PageFailure {
                    index: page.index,
                    kind: e.kind,
                    attempts: out.attempts,
                    message: e.source.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory page source and sleeper shared by unit tests.

    use super::*;
    use crate::control::RunAborted;
    use crate::retry::FetchError;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Serves scripted responses per URL. Each URL has a queue of results; the
    /// last one repeats. URLs without a script return 404.
    #[derive(Default)]
    pub struct ScriptedSource {
        scripts: Mutex<HashMap<String, Vec<Result<Vec<u8>, u32>>>>,
        calls: Mutex<HashMap<String, usize>>,
        delays: HashMap<String, Duration>,
        cancel_after: HashMap<String, CancelToken>,
        in_flight: AtomicUsize,
        pub max_in_flight: AtomicUsize,
    }

    impl ScriptedSource {
        pub fn ok(mut self, url: &str, bytes: &[u8]) -> Self {
            self.scripts.get_mut().unwrap().insert(url.to_string(), vec![Ok(bytes.to_vec())]);
            self
        }

        pub fn script(mut self, url: &str, steps: Vec<Result<Vec<u8>, u32>>) -> Self {
            self.scripts.get_mut().unwrap().insert(url.to_string(), steps);
            self
        }

        pub fn delay(mut self, url: &str, d: Duration) -> Self {
            self.delays.insert(url.to_string(), d);
            self
        }

        /// Fires `token` once `url` has been answered, whatever the answer.
        pub fn cancel_after(mut self, url: &str, token: CancelToken) -> Self {
            self.cancel_after.insert(url.to_string(), token);
            self
        }

        pub fn calls(&self, url: &str) -> usize {
            self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
        }
    }

    impl PageSource for ScriptedSource {
        fn get(&self, url: &str, _referer: Option<&str>) -> Result<FetchedBody, FetchError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if let Some(d) = self.delays.get(url) {
                std::thread::sleep(*d);
            }
            let n = {
                let mut calls = self.calls.lock().unwrap();
                let c = calls.entry(url.to_string()).or_insert(0);
                *c += 1;
                *c
            };
            let step = self
                .scripts
                .lock()
                .unwrap()
                .get(url)
                .and_then(|s| s.get(n - 1).or_else(|| s.last()).cloned());
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if let Some(token) = self.cancel_after.get(url) {
                token.cancel();
            }
            match step {
                Some(Ok(bytes)) => Ok(FetchedBody {
                    bytes,
                    content_type: Some("image/png".to_string()),
                }),
                Some(Err(code)) => Err(FetchError::Http(code)),
                None => Err(FetchError::Http(404)),
            }
        }
    }

    /// Records requested sleeps without sleeping.
    #[derive(Default)]
    pub struct RecordingSleeper(pub Mutex<Vec<Duration>>);

    impl RecordingSleeper {
        pub fn count(&self) -> usize {
            self.0.lock().unwrap().len()
        }
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, d: Duration, cancel: &CancelToken) -> Result<(), RunAborted> {
            self.0.lock().unwrap().push(d);
            cancel.check()
        }
    }

    pub fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            jitter: false,
        }
    }
}
