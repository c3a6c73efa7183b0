//! Archive assembler: one zip container per chapter.
//!
//! Entries are the successful pages in ascending index, optionally preceded by
//! a cover. Partial chapters carry a zip comment naming the missing pages so
//! they can be told apart from complete ones on disk. Archives are written to
//! a `.part` file and renamed into place only once fully written.

mod cover;
mod media;
mod naming;
mod writer;

pub use cover::{embed_cover, is_cover_entry, save_series_cover, Cover};
pub use media::image_extension;
pub use naming::{page_entry_name, page_index_width, sanitize_series_title, ArchiveNaming, OutputFormat};
pub use writer::{temp_path, ArchiveWriter, TEMP_SUFFIX};

use anyhow::{bail, Context, Result};
use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::chapter::{ChapterOutcome, ChapterStatus};

const PARTIAL_COMMENT_PREFIX: &str = "chapterdl: partial, missing pages ";

/// What `assemble` wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedChapter {
    pub path: PathBuf,
    /// Page entries written (cover excluded).
    pub pages: usize,
    pub cover: bool,
    pub partial: bool,
}

/// Writes `outcome` as an archive in `destination`. A failed outcome is an error;
/// the caller must not archive chapters without pages.
pub fn assemble(
    outcome: &ChapterOutcome,
    destination: &Path,
    naming: &ArchiveNaming,
    cover: Option<&Cover>,
) -> Result<ArchivedChapter> {
    if outcome.status == ChapterStatus::Failed || outcome.pages.is_empty() {
        bail!("chapter {} has no pages to archive", outcome.chapter.number);
    }
    let final_path = destination.join(naming.file_name(&outcome.chapter));

    let max_index = outcome
        .pages
        .iter()
        .map(|p| p.index)
        .chain(outcome.failed_pages.iter().copied())
        .max()
        .unwrap_or(0);
    let width = page_index_width(max_index);

    // A page served as a cover image keeps a cover-recognisable entry name.
    let entries: Vec<String> = outcome
        .pages
        .iter()
        .map(|page| {
            let ext = image_extension(page.content_type.as_deref(), &page.url, &page.bytes);
            let name = page_entry_name(page.index, width, &ext);
            if is_cover_entry(&page.url) {
                name.replacen('.', "_cover.", 1)
            } else {
                name
            }
        })
        .collect();
    let has_cover = entries.iter().any(|n| is_cover_entry(n));
    let cover = cover.filter(|_| !has_cover);

    let mut w = ArchiveWriter::create(&final_path)?;
    if let Some(c) = cover {
        w.add_entry(&c.entry_name(width), &c.bytes)?;
    }
    for (page, name) in outcome.pages.iter().zip(&entries) {
        w.add_entry(name, &page.bytes)?;
    }
    let partial = !outcome.failed_pages.is_empty();
    if partial {
        w.set_comment(partial_comment(&outcome.failed_pages));
    }
    w.finalize(&final_path)?;

    tracing::debug!(
        path = %final_path.display(),
        pages = outcome.pages.len(),
        partial,
        "archive written"
    );
    Ok(ArchivedChapter {
        path: final_path,
        pages: outcome.pages.len(),
        cover: cover.is_some(),
        partial,
    })
}

fn partial_comment(missing: &BTreeSet<u32>) -> String {
    let list: Vec<String> = missing.iter().map(u32::to_string).collect();
    format!("{}{}", PARTIAL_COMMENT_PREFIX, list.join(","))
}

/// Entry names and missing-page marker of an existing archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveInfo {
    pub entries: Vec<String>,
    /// Empty for complete archives.
    pub missing_pages: Vec<u32>,
}

impl ArchiveInfo {
    pub fn is_partial(&self) -> bool {
        !self.missing_pages.is_empty()
    }
}

pub fn inspect(path: &Path) -> Result<ArchiveInfo> {
    let file = File::open(path).with_context(|| format!("open archive {}", path.display()))?;
    let mut zip = zip::ZipArchive::new(file).with_context(|| format!("read archive {}", path.display()))?;
    let mut entries = Vec::with_capacity(zip.len());
    for i in 0..zip.len() {
        entries.push(zip.by_index(i).context("zip entry")?.name().to_string());
    }
    let comment = String::from_utf8_lossy(zip.comment()).into_owned();
    let missing_pages = comment
        .strip_prefix(PARTIAL_COMMENT_PREFIX)
        .map(|list| list.split(',').filter_map(|s| s.trim().parse().ok()).collect())
        .unwrap_or_default();
    Ok(ArchiveInfo { entries, missing_pages })
}
