//! Concurrent and sequential execution of page fetches.

use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use crate::chapter::PageRef;
use crate::control::{CancelToken, RunAborted};
use crate::fetcher::{FetchResult, ImageFetcher};

/// Fetch pages with a bounded worker pool. Results are returned in completion
/// order; a failed page never stops its siblings. On cancellation workers stop
/// taking new pages and the call returns `Err(RunAborted)` once they exit.
pub(super) fn run_concurrent(
    fetcher: &ImageFetcher,
    pages: &[PageRef],
    max_workers: usize,
    cancel: &CancelToken,
) -> Result<Vec<FetchResult>, RunAborted> {
    let count = pages.len();
    let work: Arc<Mutex<VecDeque<PageRef>>> = Arc::new(Mutex::new(pages.iter().cloned().collect()));
    let (tx, rx) = mpsc::channel();
    let num_workers = max_workers.max(1).min(count);
    let mut handles = Vec::with_capacity(num_workers);
    for _ in 0..num_workers {
        let work = Arc::clone(&work);
        let tx = tx.clone();
        let fetcher = fetcher.clone();
        let cancel = cancel.clone();
        handles.push(std::thread::spawn(move || loop {
            if cancel.is_cancelled() {
                break;
            }
            let page = match work.lock() {
                Ok(mut q) => q.pop_front(),
                Err(_) => None,
            };
            let Some(page) = page else {
                break;
            };
            let res = fetcher.fetch(&page, &cancel);
            if tx.send(res).is_err() {
                break;
            }
        }));
    }
    drop(tx);

    let mut results = Vec::with_capacity(count);
    for res in rx.iter() {
        results.push(res);
    }

    let panicked = handles.into_iter().filter_map(|h| h.join().err()).count();
    cancel.check()?;
    // A panicked worker loses the page it held; the caller records it as missing.
    if panicked > 0 {
        tracing::warn!(workers = panicked, "fetch worker panicked");
    }
    Ok(results)
}

/// Fetch pages one at a time in index order.
pub(super) fn run_sequential(
    fetcher: &ImageFetcher,
    pages: &[PageRef],
    cancel: &CancelToken,
) -> Result<Vec<FetchResult>, RunAborted> {
    let mut results = Vec::with_capacity(pages.len());
    for page in pages {
        cancel.check()?;
        results.push(fetcher.fetch(page, cancel));
    }
    cancel.check()?;
    Ok(results)
}
