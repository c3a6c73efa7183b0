//! Chapter and page references plus the per-chapter outcome.

mod number;

pub use number::{ChapterNumber, ParseChapterNumberError};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// One chapter of a work as resolved from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRef {
    pub number: ChapterNumber,
    /// Opaque catalog identifier.
    pub id: String,
    pub title: String,
    /// Release label such as "Side Story". `Chapter` and `#` mean no label.
    #[serde(default)]
    pub kind: Option<String>,
}

impl ChapterRef {
    pub fn new(number: ChapterNumber, id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            number,
            id: id.into(),
            title: title.into(),
            kind: None,
        }
    }

    /// Label to carry into archive names, if any.
    pub fn label(&self) -> Option<&str> {
        match self.kind.as_deref().map(str::trim) {
            None | Some("") | Some("Chapter") | Some("#") => None,
            Some(k) => Some(k),
        }
    }
}

impl AsRef<ChapterRef> for ChapterRef {
    fn as_ref(&self) -> &ChapterRef {
        self
    }
}

/// One image within a chapter. `index` is 1-based and defines archive order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRef {
    pub index: u32,
    pub url: String,
}

impl PageRef {
    /// Numbers a chapter's page URLs 1..=n in the given order.
    pub fn from_urls<I, S>(urls: I) -> Vec<PageRef>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        urls.into_iter()
            .enumerate()
            .map(|(i, url)| PageRef {
                index: i as u32 + 1,
                url: url.into(),
            })
            .collect()
    }
}

/// A successfully fetched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageData {
    pub index: u32,
    pub url: String,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Terminal status of a chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChapterStatus {
    Complete,
    Partial,
    SkippedExisting,
    Failed,
}

impl ChapterStatus {
    /// True when an archive exists for the chapter after the run.
    pub fn is_success(self) -> bool {
        !matches!(self, ChapterStatus::Failed)
    }
}

impl fmt::Display for ChapterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChapterStatus::Complete => "complete",
            ChapterStatus::Partial => "partial",
            ChapterStatus::SkippedExisting => "skipped-existing",
            ChapterStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Result of fetching every page of one chapter.
#[derive(Debug, Clone)]
pub struct ChapterOutcome {
    pub chapter: ChapterRef,
    /// Successful pages in ascending index order.
    pub pages: Vec<PageData>,
    /// Indices of pages that could not be fetched.
    pub failed_pages: BTreeSet<u32>,
    pub status: ChapterStatus,
}

impl ChapterOutcome {
    /// Derives the status from what was fetched: no pages is `Failed`, any gap is `Partial`.
    pub fn from_results(chapter: ChapterRef, mut pages: Vec<PageData>, failed_pages: BTreeSet<u32>) -> Self {
        pages.sort_by_key(|p| p.index);
        let status = if pages.is_empty() {
            ChapterStatus::Failed
        } else if failed_pages.is_empty() {
            ChapterStatus::Complete
        } else {
            ChapterStatus::Partial
        };
        Self {
            chapter,
            pages,
            failed_pages,
            status,
        }
    }
}
