//! Temp-file archive writer with atomic finalize.
//!
//! Entries are written to `<final>.part`; `finalize` finishes the zip, syncs it
//! and renames it over the final path. Dropping an unfinalized writer removes
//! the temp file, so a cancelled or failed chapter leaves nothing behind.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `Foo-1.cbz` → `Foo-1.cbz.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

pub struct ArchiveWriter {
    zip: Option<ZipWriter<File>>,
    temp_path: PathBuf,
    options: SimpleFileOptions,
    committed: bool,
}

impl ArchiveWriter {
    /// Create the temp file for `final_path`. Overwrites a stale temp file.
    pub fn create(final_path: &Path) -> Result<Self> {
        let temp_path = temp_path(final_path);
        let file = File::create(&temp_path)
            .with_context(|| format!("failed to create temp archive: {}", temp_path.display()))?;
        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .unix_permissions(0o644);
        Ok(Self {
            zip: Some(ZipWriter::new(file)),
            temp_path,
            options,
            committed: false,
        })
    }

    pub fn add_entry(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let zip = self.zip.as_mut().context("archive already finalized")?;
        zip.start_file(name, self.options)
            .with_context(|| format!("zip start_file {name}"))?;
        zip.write_all(data).with_context(|| format!("zip write {name}"))?;
        Ok(())
    }

    pub fn set_comment(&mut self, comment: String) {
        if let Some(zip) = self.zip.as_mut() {
            zip.set_comment(comment);
        }
    }

    /// Path to the current temp file.
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Finish the archive and atomically rename it to `final_path`.
    pub fn finalize(mut self, final_path: &Path) -> Result<()> {
        let zip = self.zip.take().context("archive already finalized")?;
        let file = zip.finish().context("zip finish")?;
        file.sync_all().context("archive sync failed")?;
        drop(file);
        std::fs::rename(&self.temp_path, final_path).with_context(|| {
            format!(
                "failed to rename {} to {}",
                self.temp_path.display(),
                final_path.display()
            )
        })?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for ArchiveWriter {
    fn drop(&mut self) {
        if !self.committed {
            self.zip.take();
            if let Err(e) = std::fs::remove_file(&self.temp_path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %self.temp_path.display(), "could not remove temp archive: {e}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_path_appends_part() {
        let p = temp_path(Path::new("Foo-1.cbz"));
        assert_eq!(p.to_string_lossy(), "Foo-1.cbz.part");
        let p2 = temp_path(Path::new("/tmp/vol_001.zip"));
        assert_eq!(p2.to_string_lossy(), "/tmp/vol_001.zip.part");
    }

    #[test]
    fn finalize_renames_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("a.cbz");
        let mut w = ArchiveWriter::create(&final_path).unwrap();
        assert!(w.temp_path().exists());
        w.add_entry("001.png", b"one").unwrap();
        w.finalize(&final_path).unwrap();
        assert!(final_path.exists());
        assert!(!temp_path(&final_path).exists());

        let mut zip = zip::ZipArchive::new(File::open(&final_path).unwrap()).unwrap();
        assert_eq!(zip.len(), 1);
        assert_eq!(zip.by_index(0).unwrap().name(), "001.png");
    }

    #[test]
    fn dropped_writer_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("b.cbz");
        {
            let mut w = ArchiveWriter::create(&final_path).unwrap();
            w.add_entry("001.png", b"one").unwrap();
        }
        assert!(!final_path.exists());
        assert!(!temp_path(&final_path).exists());
    }
}
