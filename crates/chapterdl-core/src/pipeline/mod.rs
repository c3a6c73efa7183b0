//! Pipeline orchestrator: runs one series, chapters strictly one at a time.
//!
//! Per chapter: skip-existing check (complete archives only), fetch every page
//! through the coordinator (on a blocking task), archive unless nothing was
//! fetched, report once. Pacing pauses land before the next chapter that
//! actually fetches. Page and chapter failures never stop the run;
//! only output-directory I/O does.

mod report;

pub use report::{ChapterReport, RunReport};

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::archive::{assemble, inspect, sanitize_series_title, save_series_cover, ArchiveNaming, Cover, OutputFormat};
use crate::chapter::{ChapterNumber, ChapterRef, ChapterStatus, PageRef};
use crate::control::{CancelToken, Sleeper};
use crate::coordinator::{fetch_chapter, FetchMode};
use crate::fetcher::{FetchResult, ImageFetcher};
use crate::pacing::ChapterPacer;
use crate::resume;

/// Run settings derived from [`crate::config::ChapterdlConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    pub mode: FetchMode,
    pub pacer: ChapterPacer,
    pub skip_existing: bool,
    pub resume: bool,
    /// Put the series cover at the front of every chapter archive.
    pub embed_cover: bool,
}

/// A chapter and its resolved page list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterWork {
    pub chapter: ChapterRef,
    pub pages: Vec<PageRef>,
}

impl AsRef<ChapterRef> for ChapterWork {
    fn as_ref(&self) -> &ChapterRef {
        &self.chapter
    }
}

/// One series to fetch.
#[derive(Debug, Clone, Default)]
pub struct WorkRequest {
    pub series_id: String,
    pub title: String,
    pub chapters: Vec<ChapterWork>,
    /// Explicit chapter numbers; disables resume filtering when set.
    pub selection: Option<BTreeSet<ChapterNumber>>,
    pub cover_url: Option<String>,
}

/// Errors that stop a run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("cannot create output directory {}: {source}", path.display())]
    Destination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write archive for chapter {chapter}: {reason}")]
    ArchiveWrite { chapter: ChapterNumber, reason: String },
    #[error("cannot read output directory {}: {reason}", path.display())]
    Scan { path: PathBuf, reason: String },
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Folder name for a series: sanitized title, else sanitized id.
pub fn series_folder_name(title: &str, series_id: &str) -> String {
    let name = sanitize_series_title(title);
    if !name.is_empty() {
        return name;
    }
    let id = sanitize_series_title(series_id);
    if id.is_empty() {
        "series".to_string()
    } else {
        id
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    fetcher: ImageFetcher,
    sleeper: Arc<dyn Sleeper>,
    cancel: CancelToken,
    reports: Option<mpsc::Sender<ChapterReport>>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, fetcher: ImageFetcher, sleeper: Arc<dyn Sleeper>, cancel: CancelToken) -> Self {
        Self {
            config,
            fetcher,
            sleeper,
            cancel,
            reports: None,
        }
    }

    /// Also send each chapter report on `tx` as soon as the chapter finishes.
    pub fn with_reports(mut self, tx: mpsc::Sender<ChapterReport>) -> Self {
        self.reports = Some(tx);
        self
    }

    pub async fn run(&self, request: WorkRequest) -> Result<RunReport, PipelineError> {
        let WorkRequest {
            series_id,
            title,
            mut chapters,
            selection,
            cover_url,
        } = request;

        let folder = series_folder_name(&title, &series_id);
        let dir = self.config.output_dir.join(&folder);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| PipelineError::Destination {
                path: dir.clone(),
                source,
            })?;
        let naming = ArchiveNaming::new(self.config.format, folder);
        let mut report = RunReport {
            series: title,
            output_dir: dir.clone(),
            ..Default::default()
        };

        chapters.sort_by(|a, b| a.chapter.number.cmp(&b.chapter.number));
        if let Some(sel) = &selection {
            chapters.retain(|c| sel.contains(&c.chapter.number));
        }
        if self.config.resume && selection.is_none() {
            let entries = resume::scan_output_dir(&dir).map_err(|e| PipelineError::Scan {
                path: dir.clone(),
                reason: format!("{e:#}"),
            })?;
            let cutoff = resume::resolve_resume_point(&entries, &naming);
            match &cutoff {
                Some(c) => tracing::info!(cutoff = %c, "resuming after highest archived chapter"),
                None => tracing::info!("no archived chapters found; fetching all"),
            }
            chapters = resume::filter_after(chapters, cutoff.as_ref());
            report.resume_point = cutoff;
        }

        let cover = match cover_url {
            Some(url) => self.fetch_cover(url).await?,
            None => None,
        };
        if let Some(c) = &cover {
            if let Err(e) = save_series_cover(&dir, &series_id, c) {
                tracing::warn!("could not save series cover: {e:#}");
            }
        }
        let cover = cover.filter(|_| self.config.embed_cover).map(Arc::new);

        tracing::info!(series = %report.series, chapters = chapters.len(), dir = %dir.display(), "starting run");
        let mut processed = 0u32;
        let mut pending_pause: Option<Duration> = None;
        for work in chapters {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let path = dir.join(naming.file_name(&work.chapter));
            if let Some(r) = self.precheck(&work, &path).await? {
                self.emit(&mut report, r).await;
                continue;
            }
            if let Some(delay) = pending_pause.take() {
                if !self.pace(delay, processed).await? {
                    report.cancelled = true;
                    break;
                }
            }
            let Some(chapter_report) = self.process_chapter(work, &dir, &naming, cover.clone()).await? else {
                report.cancelled = true;
                break;
            };
            self.emit(&mut report, chapter_report).await;
            processed += 1;
            pending_pause = self.config.pacer.delay_after(processed);
        }

        if report.cancelled {
            tracing::warn!(done = report.chapters.len(), "run cancelled");
        }
        Ok(report)
    }

    /// Report for a chapter that needs no fetch: a complete archive is already
    /// on disk, or no pages were resolved. Such chapters do not count for pacing.
    async fn precheck(&self, work: &ChapterWork, path: &Path) -> Result<Option<ChapterReport>, PipelineError> {
        let chapter = &work.chapter;
        if self.config.skip_existing && self.is_fully_archived(path).await? {
            tracing::info!(chapter = %chapter.number, path = %path.display(), "archive exists, skipping");
            let mut r = ChapterReport::new(chapter, ChapterStatus::SkippedExisting);
            r.archive = Some(path.to_path_buf());
            return Ok(Some(r));
        }
        if work.pages.is_empty() {
            tracing::warn!(chapter = %chapter.number, "no pages resolved");
            let mut r = ChapterReport::new(chapter, ChapterStatus::Failed);
            r.reason = Some("no pages resolved".to_string());
            return Ok(Some(r));
        }
        Ok(None)
    }

    /// True when `path` is a readable archive without missing pages. Partial or
    /// unreadable archives are fetched again and overwritten.
    async fn is_fully_archived(&self, path: &Path) -> Result<bool, PipelineError> {
        if !path.exists() {
            return Ok(false);
        }
        let p = path.to_path_buf();
        match tokio::task::spawn_blocking(move || inspect(&p)).await? {
            Ok(info) if !info.is_partial() => Ok(true),
            Ok(info) => {
                tracing::info!(path = %path.display(), missing = ?info.missing_pages, "archive is partial, fetching again");
                Ok(false)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "unreadable archive, fetching again: {e:#}");
                Ok(false)
            }
        }
    }

    /// Fetches and archives one chapter; `None` when cancelled mid-chapter.
    async fn process_chapter(
        &self,
        work: ChapterWork,
        dir: &Path,
        naming: &ArchiveNaming,
        cover: Option<Arc<Cover>>,
    ) -> Result<Option<ChapterReport>, PipelineError> {
        let ChapterWork { chapter, pages } = work;
        tracing::info!(chapter = %chapter.number, pages = pages.len(), "fetching chapter");
        let fetched = {
            let fetcher = self.fetcher.clone();
            let cancel = self.cancel.clone();
            let mode = self.config.mode;
            let chapter = chapter.clone();
            tokio::task::spawn_blocking(move || fetch_chapter(&fetcher, &chapter, &pages, mode, &cancel)).await?
        };
        let Ok((outcome, summary)) = fetched else {
            tracing::info!(chapter = %chapter.number, "cancelled, discarding chapter");
            return Ok(None);
        };

        let mut r = ChapterReport::new(&chapter, outcome.status);
        r.attempts = summary.attempts;
        r.missing_pages = outcome.failed_pages.iter().copied().collect();
        if outcome.status == ChapterStatus::Failed {
            r.reason = summary.failures.first().map(|f| f.message.clone());
            return Ok(Some(r));
        }

        let archived = {
            let destination = dir.to_path_buf();
            let naming = naming.clone();
            tokio::task::spawn_blocking(move || assemble(&outcome, &destination, &naming, cover.as_deref())).await?
        }
        .map_err(|e| PipelineError::ArchiveWrite {
            chapter: chapter.number.clone(),
            reason: format!("{e:#}"),
        })?;
        r.archive = Some(archived.path);
        Ok(Some(r))
    }

    async fn fetch_cover(&self, url: String) -> Result<Option<Cover>, PipelineError> {
        let fetcher = self.fetcher.clone();
        let cancel = self.cancel.clone();
        let res = tokio::task::spawn_blocking(move || fetcher.fetch(&PageRef { index: 0, url }, &cancel)).await?;
        match res {
            FetchResult::Fetched { page, .. } => Ok(Some(Cover::from_page(&page))),
            FetchResult::Failed(f) => {
                tracing::warn!(attempts = f.attempts, "could not fetch cover: {}", f.message);
                Ok(None)
            }
        }
    }

    /// Sleeps for the pacing delay; `false` when cancelled meanwhile.
    async fn pace(&self, delay: Duration, processed: u32) -> Result<bool, PipelineError> {
        tracing::info!(secs = delay.as_secs(), processed, "rate limiting between chapters");
        let sleeper = Arc::clone(&self.sleeper);
        let cancel = self.cancel.clone();
        let slept = tokio::task::spawn_blocking(move || sleeper.sleep(delay, &cancel)).await?;
        Ok(slept.is_ok())
    }

    async fn emit(&self, report: &mut RunReport, r: ChapterReport) {
        match r.status {
            ChapterStatus::Partial => tracing::warn!(
                chapter = %r.number,
                missing = ?r.missing_pages,
                "chapter archived with missing pages"
            ),
            ChapterStatus::Failed => tracing::warn!(
                chapter = %r.number,
                reason = r.reason.as_deref().unwrap_or("all pages failed"),
                "chapter failed"
            ),
            status => tracing::info!(chapter = %r.number, %status, "chapter done"),
        }
        if let Some(tx) = &self.reports {
            if tx.send(r.clone()).await.is_err() {
                tracing::debug!("report receiver dropped");
            }
        }
        report.chapters.push(r);
    }
}
