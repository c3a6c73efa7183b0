//! Fetch coordinator: all pages of one chapter.
//!
//! Fans the page list out to a bounded pool of fetch workers (or fetches them
//! one by one), then folds the per-page results into a [`ChapterOutcome`] in
//! ascending page order. Page failures never escape as errors; they become
//! `failed_pages` and a `Partial` or `Failed` status.

mod run;

use std::collections::{BTreeMap, BTreeSet};

use crate::chapter::{ChapterOutcome, ChapterRef, PageData, PageRef};
use crate::control::{CancelToken, RunAborted};
use crate::fetcher::{FetchResult, ImageFetcher, PageFailure};

/// How pages within a chapter are fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// One page at a time, in index order.
    Sequential,
    /// Up to `max_workers` pages in flight.
    Parallel { max_workers: usize },
}

/// Per-chapter fetch counters for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub attempts: u32,
    pub failures: Vec<PageFailure>,
}

/// Fetches every page of `chapter`.
///
/// Returns `Err(RunAborted)` when `cancel` fires; in that case no outcome is
/// produced and nothing should be archived for the chapter.
pub fn fetch_chapter(
    fetcher: &ImageFetcher,
    chapter: &ChapterRef,
    pages: &[PageRef],
    mode: FetchMode,
    cancel: &CancelToken,
) -> Result<(ChapterOutcome, FetchSummary), RunAborted> {
    if pages.is_empty() {
        tracing::warn!(chapter = %chapter.number, "no pages resolved");
        return Ok((
            ChapterOutcome::from_results(chapter.clone(), Vec::new(), BTreeSet::new()),
            FetchSummary::default(),
        ));
    }

    let results = match mode {
        FetchMode::Sequential => run::run_sequential(fetcher, pages, cancel)?,
        FetchMode::Parallel { max_workers } => run::run_concurrent(fetcher, pages, max_workers, cancel)?,
    };
    Ok(fold_results(chapter, pages, results))
}

/// Orders results by page index. Any requested page without a success is
/// recorded as failed, including pages whose worker never reported back.
fn fold_results(
    chapter: &ChapterRef,
    pages: &[PageRef],
    results: Vec<FetchResult>,
) -> (ChapterOutcome, FetchSummary) {
    let mut summary = FetchSummary::default();
    let mut fetched: BTreeMap<u32, PageData> = BTreeMap::new();
    for res in results {
        summary.attempts += res.attempts();
        match res {
            FetchResult::Fetched { page, .. } => {
                fetched.insert(page.index, page);
            }
            FetchResult::Failed(f) => summary.failures.push(f),
        }
    }
    summary.failures.sort_by_key(|f| f.index);

    let failed: BTreeSet<u32> = pages
        .iter()
        .map(|p| p.index)
        .filter(|i| !fetched.contains_key(i))
        .collect();
    let outcome = ChapterOutcome::from_results(chapter.clone(), fetched.into_values().collect(), failed);
    (outcome, summary)
}
