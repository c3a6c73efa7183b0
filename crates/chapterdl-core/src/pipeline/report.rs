//! Per-chapter and per-run reports.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::chapter::{ChapterNumber, ChapterRef, ChapterStatus};

/// Terminal status of one chapter, emitted exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterReport {
    pub number: ChapterNumber,
    pub title: String,
    pub status: ChapterStatus,
    /// Page indices missing from a partial archive, or every page of a failed chapter.
    pub missing_pages: Vec<u32>,
    pub archive: Option<PathBuf>,
    /// HTTP attempts spent on the chapter's pages.
    pub attempts: u32,
    /// Why the chapter failed, when it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ChapterReport {
    pub(super) fn new(chapter: &ChapterRef, status: ChapterStatus) -> Self {
        Self {
            number: chapter.number.clone(),
            title: chapter.title.clone(),
            status,
            missing_pages: Vec::new(),
            archive: None,
            attempts: 0,
            reason: None,
        }
    }
}

/// Everything one `Pipeline::run` did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub series: String,
    pub output_dir: PathBuf,
    /// Cutoff used when resuming; chapters at or below it were not considered.
    pub resume_point: Option<ChapterNumber>,
    pub chapters: Vec<ChapterReport>,
    /// Stopped by the user before every chapter was processed.
    pub cancelled: bool,
}

impl RunReport {
    pub fn count(&self, status: ChapterStatus) -> usize {
        self.chapters.iter().filter(|c| c.status == status).count()
    }

    /// 1 when cancelled, or when some chapter failed and none succeeded; else 0.
    pub fn exit_status(&self) -> i32 {
        if self.cancelled {
            return 1;
        }
        let succeeded = self.chapters.iter().any(|c| c.status.is_success());
        if !succeeded && self.count(ChapterStatus::Failed) > 0 {
            1
        } else {
            0
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = self.to_json().context("serialize run report")?;
        std::fs::write(path, json).with_context(|| format!("write report {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(statuses: &[ChapterStatus]) -> RunReport {
        RunReport {
            chapters: statuses
                .iter()
                .enumerate()
                .map(|(i, s)| ChapterReport::new(&ChapterRef::new(ChapterNumber::new(i as u64 + 1), "id", "t"), *s))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn exit_status_rules() {
        use ChapterStatus::*;
        assert_eq!(report(&[]).exit_status(), 0);
        assert_eq!(report(&[Complete, Partial, SkippedExisting]).exit_status(), 0);
        assert_eq!(report(&[Failed, Partial]).exit_status(), 0);
        assert_eq!(report(&[Failed, Failed]).exit_status(), 1);
        let mut cancelled = report(&[Complete]);
        cancelled.cancelled = true;
        assert_eq!(cancelled.exit_status(), 1);
    }

    #[test]
    fn json_uses_kebab_status_and_string_numbers() {
        let mut r = report(&[ChapterStatus::SkippedExisting]);
        r.chapters[0].number = "12.5".parse().unwrap();
        let v: serde_json::Value = serde_json::from_str(&r.to_json().unwrap()).unwrap();
        assert_eq!(v["chapters"][0]["status"], "skipped-existing");
        assert_eq!(v["chapters"][0]["number"], "12.5");
        assert!(v["chapters"][0].get("reason").is_none());
    }
}
