//! `chapterdl resume-point` – show the resume cutoff for a series folder.

use anyhow::Result;
use chapterdl_core::archive::{sanitize_series_title, ArchiveNaming, OutputFormat};
use chapterdl_core::resume::{resolve_resume_point, scan_output_dir};
use std::path::Path;

pub fn run_resume_point(series_dir: &Path, series: Option<&str>) -> Result<()> {
    let series = match series {
        Some(s) => sanitize_series_title(s),
        None => series_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    // Both naming schemes are recognised; the format only matters for writing.
    let naming = ArchiveNaming::new(OutputFormat::Cbz, series);
    let entries = scan_output_dir(series_dir)?;
    match resolve_resume_point(&entries, &naming) {
        Some(n) => println!("{n}"),
        None => println!("No archived chapters in {}", series_dir.display()),
    }
    Ok(())
}
