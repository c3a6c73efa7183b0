//! Cover images: the leading archive entry and the per-series cover file.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::media;
use super::writer::ArchiveWriter;
use crate::chapter::PageData;

/// Cover image bytes plus the extension to store them under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cover {
    pub bytes: Vec<u8>,
    pub ext: String,
}

impl Cover {
    pub fn from_page(page: &PageData) -> Self {
        Self {
            ext: media::image_extension(page.content_type.as_deref(), &page.url, &page.bytes),
            bytes: page.bytes.clone(),
        }
    }

    /// Reads a cover from disk; extension from magic bytes, else the file name.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).with_context(|| format!("read cover {}", path.display()))?;
        let ext = media::sniff(&bytes)
            .map(str::to_string)
            .or_else(|| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .map(str::to_ascii_lowercase)
            })
            .unwrap_or_else(|| "img".to_string());
        Ok(Self { bytes, ext })
    }

    /// Archive entry name padded like the page entries, e.g. `000_cover.jpg`
    /// beside `001.png`, or `0000_cover.jpg` beside `0001.png`.
    pub fn entry_name(&self, width: usize) -> String {
        format!("{:0width$}_cover.{}", 0, self.ext, width = width)
    }
}

/// Page entry width already used in an archive: the longest leading digit run.
fn entry_width<'a>(names: impl IntoIterator<Item = &'a str>) -> usize {
    names
        .into_iter()
        .map(|n| n.bytes().take_while(u8::is_ascii_digit).count())
        .max()
        .unwrap_or(0)
        .max(3)
}

/// True when an entry or URL file name looks like a cover image.
pub fn is_cover_entry(name: &str) -> bool {
    let file = name.rsplit('/').next().unwrap_or(name);
    let stem = file.rsplit_once('.').map_or(file, |(s, _)| s);
    stem.to_ascii_lowercase().contains("cover")
}

/// Adds `cover` as the first entry of an existing archive.
///
/// Returns `Ok(false)` without touching the file when the archive already has
/// a cover entry. The archive is rewritten through a temp file; the comment is kept.
pub fn embed_cover(archive_path: &Path, cover: &Cover) -> Result<bool> {
    let file = File::open(archive_path).with_context(|| format!("open archive {}", archive_path.display()))?;
    let mut zip = zip::ZipArchive::new(file).with_context(|| format!("read archive {}", archive_path.display()))?;
    if zip.file_names().any(is_cover_entry) {
        tracing::debug!(path = %archive_path.display(), "archive already has a cover");
        return Ok(false);
    }

    let comment = String::from_utf8_lossy(zip.comment()).into_owned();
    let width = entry_width(zip.file_names());
    let mut writer = ArchiveWriter::create(archive_path)?;
    writer.add_entry(&cover.entry_name(width), &cover.bytes)?;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).context("zip entry")?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut data).with_context(|| format!("read entry {name}"))?;
        writer.add_entry(&name, &data)?;
    }
    if !comment.is_empty() {
        writer.set_comment(comment);
    }
    drop(zip);
    writer.finalize(archive_path)?;
    tracing::info!(path = %archive_path.display(), "embedded cover");
    Ok(true)
}

/// Writes the series cover as `{series_id}.{ext}` in `series_dir`.
pub fn save_series_cover(series_dir: &Path, series_id: &str, cover: &Cover) -> Result<PathBuf> {
    let path = series_dir.join(format!("{}.{}", series_id, cover.ext));
    std::fs::write(&path, &cover.bytes).with_context(|| format!("write series cover {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3];

    fn write_archive(path: &Path, entries: &[(&str, &[u8])], comment: Option<&str>) {
        let mut w = ArchiveWriter::create(path).unwrap();
        for (name, data) in entries {
            w.add_entry(name, data).unwrap();
        }
        if let Some(c) = comment {
            w.set_comment(c.to_string());
        }
        w.finalize(path).unwrap();
    }

    fn names(path: &Path) -> Vec<String> {
        let mut zip = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        (0..zip.len()).map(|i| zip.by_index(i).unwrap().name().to_string()).collect()
    }

    #[test]
    fn cover_names() {
        assert!(is_cover_entry("000_cover.jpg"));
        assert!(is_cover_entry("https://img.example/x/Cover.webp"));
        assert!(!is_cover_entry("001.jpg"));
        assert!(!is_cover_entry("covers/001.jpg"));
    }

    #[test]
    fn embed_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Foo-1.cbz");
        write_archive(&path, &[("001.png", b"a"), ("002.png", b"b")], Some("chapterdl: partial, missing pages 3"));
        let cover = Cover {
            bytes: JPEG.to_vec(),
            ext: "jpg".into(),
        };

        assert!(embed_cover(&path, &cover).unwrap());
        assert_eq!(names(&path), ["000_cover.jpg", "001.png", "002.png"]);
        assert!(!embed_cover(&path, &cover).unwrap());
        assert_eq!(names(&path), ["000_cover.jpg", "001.png", "002.png"]);

        let zip = zip::ZipArchive::new(File::open(&path).unwrap()).unwrap();
        assert_eq!(zip.comment(), b"chapterdl: partial, missing pages 3");
    }

    #[test]
    fn embedded_cover_matches_wide_page_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Foo-1.cbz");
        write_archive(&path, &[("0001.png", b"a"), ("1000.png", b"b")], None);
        let cover = Cover {
            bytes: JPEG.to_vec(),
            ext: "jpg".into(),
        };
        assert!(embed_cover(&path, &cover).unwrap());
        let mut sorted = names(&path);
        sorted.sort();
        assert_eq!(sorted, ["0000_cover.jpg", "0001.png", "1000.png"]);
    }

    #[test]
    fn cover_from_file_sniffs_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("front.bin");
        std::fs::write(&path, JPEG).unwrap();
        assert_eq!(Cover::from_file(&path).unwrap().ext, "jpg");
    }

    #[test]
    fn series_cover_is_named_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let cover = Cover {
            bytes: JPEG.to_vec(),
            ext: "jpg".into(),
        };
        let p = save_series_cover(dir.path(), "01ARZ3NDEKTSV4RRFFQ69G5FAV", &cover).unwrap();
        assert_eq!(p.file_name().unwrap(), "01ARZ3NDEKTSV4RRFFQ69G5FAV.jpg");
        assert_eq!(std::fs::read(p).unwrap(), JPEG);
    }
}
