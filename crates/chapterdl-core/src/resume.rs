//! Resume point from archives already in the output directory.
//!
//! Resolution is a pure function over a snapshot of entry names. The cutoff is
//! the highest chapter number found; chapters at or below it are never
//! refetched, even when lower numbers are missing (no gap backfill).

use anyhow::{Context, Result};
use std::path::Path;

use crate::archive::ArchiveNaming;
use crate::chapter::{ChapterNumber, ChapterRef};

/// Highest chapter number among `entries` that parse under `naming`.
pub fn resolve_resume_point<I, S>(entries: I, naming: &ArchiveNaming) -> Option<ChapterNumber>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    entries.into_iter().filter_map(|name| naming.parse(name.as_ref())).max()
}

/// File names in `dir`. A missing directory yields an empty snapshot.
pub fn scan_output_dir(dir: &Path) -> Result<Vec<String>> {
    let rd = match std::fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e).with_context(|| format!("read dir {}", dir.display())),
    };
    let mut names = Vec::new();
    for entry in rd {
        let entry = entry.with_context(|| format!("read dir {}", dir.display()))?;
        if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Chapters strictly after `cutoff`; all of them when there is no cutoff.
pub fn filter_after<T: AsRef<ChapterRef>>(chapters: Vec<T>, cutoff: Option<&ChapterNumber>) -> Vec<T> {
    match cutoff {
        None => chapters,
        Some(c) => chapters.into_iter().filter(|ch| &ch.as_ref().number > c).collect(),
    }
}
