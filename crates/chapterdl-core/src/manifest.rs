//! Series manifest: the resolved chapter list handed over by the catalog resolver.
//!
//! ```json
//! {
//!   "series_id": "01J...",
//!   "title": "Foo",
//!   "referer": "https://catalog.example/",
//!   "cover_url": "https://img.example/cover.webp",
//!   "chapters": [
//!     { "number": "12.5", "id": "01K...", "title": "Chapter 12.5", "kind": "Chapter",
//!       "pages": ["https://img.example/12.5/1.png"] }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use crate::chapter::{ChapterNumber, ChapterRef, PageRef, ParseChapterNumberError};
use crate::pipeline::{ChapterWork, WorkRequest};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesManifest {
    pub series_id: String,
    pub title: String,
    #[serde(default)]
    pub referer: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    pub chapters: Vec<ManifestChapter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestChapter {
    #[serde(flatten)]
    pub chapter: ChapterRef,
    #[serde(default)]
    pub pages: Vec<String>,
}

impl SeriesManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).with_context(|| format!("read manifest {}", path.display()))?;
        Self::from_json(&data).with_context(|| format!("parse manifest {}", path.display()))
    }

    pub fn from_json(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }

    /// Pipeline request for this series; `selection` limits it to those chapters.
    pub fn into_request(self, selection: Option<BTreeSet<ChapterNumber>>) -> WorkRequest {
        WorkRequest {
            series_id: self.series_id,
            title: self.title,
            chapters: self
                .chapters
                .into_iter()
                .map(|c| ChapterWork {
                    chapter: c.chapter,
                    pages: PageRef::from_urls(c.pages),
                })
                .collect(),
            selection,
            cover_url: self.cover_url,
        }
    }
}

/// Parses `"12, 12.5,13"` into chapter numbers. Empty items are ignored.
pub fn parse_chapter_selection(s: &str) -> Result<BTreeSet<ChapterNumber>, ParseChapterNumberError> {
    s.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "series_id": "01ARZ3NDEKTSV4RRFFQ69G5FAV",
        "title": "Foo Bar",
        "referer": "https://catalog.example/series/1",
        "chapters": [
            { "number": 2, "id": "b", "title": "Chapter 2", "pages": ["https://img/2/1.png", "https://img/2/2.png"] },
            { "number": "1.50", "id": "a", "title": "Chapter 1.5", "kind": "Side Story", "pages": [] },
            { "number": 3.0, "id": "c", "title": "Chapter 3" }
        ]
    }"#;

    #[test]
    fn parses_numbers_in_any_json_form() {
        let m = SeriesManifest::from_json(MANIFEST).unwrap();
        let nums: Vec<String> = m.chapters.iter().map(|c| c.chapter.number.to_string()).collect();
        assert_eq!(nums, ["2", "1.5", "3"]);
        assert_eq!(m.chapters[1].chapter.kind.as_deref(), Some("Side Story"));
        assert!(m.chapters[2].pages.is_empty());
        assert_eq!(m.cover_url, None);
    }

    #[test]
    fn request_numbers_pages_from_one() {
        let req = SeriesManifest::from_json(MANIFEST).unwrap().into_request(None);
        assert_eq!(req.title, "Foo Bar");
        assert_eq!(req.chapters[0].pages[1].index, 2);
        assert_eq!(req.chapters[0].pages[1].url, "https://img/2/2.png");
    }

    #[test]
    fn load_reports_path_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = SeriesManifest::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("m.json"));
    }

    #[test]
    fn selection_parsing() {
        let sel = parse_chapter_selection("12, 12.5,13,,").unwrap();
        let got: Vec<String> = sel.iter().map(ToString::to_string).collect();
        assert_eq!(got, ["12", "12.5", "13"]);
        assert!(parse_chapter_selection("12,abc").is_err());
    }
}
