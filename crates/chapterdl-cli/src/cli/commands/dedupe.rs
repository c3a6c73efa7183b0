//! `chapterdl dedupe` – merge duplicate series folders in a library.

use anyhow::{bail, Result};
use chapterdl_core::maintenance::{apply, plan_dedupe, snapshot};
use std::path::Path;

pub fn run_dedupe(library: &Path, dry_run: bool) -> Result<()> {
    if !library.is_dir() {
        bail!("directory not found: {}", library.display());
    }
    println!("Scanning for duplicates in: {}", library.display());
    if dry_run {
        println!("Dry run: nothing will be moved or deleted.");
    }

    let plan = plan_dedupe(&snapshot(library)?);
    if plan.is_empty() {
        println!("No duplicates found.");
        return Ok(());
    }

    println!("Found {} series with duplicate folders:\n", plan.groups.len());
    for g in &plan.groups {
        println!("Series ID: {}", g.series_id);
        println!("  KEEP:   {} (priority {:.1})", g.keep.display(), g.keep_priority);
        for (dir, priority) in &g.remove {
            println!("  REMOVE: {} (priority {:.1})", dir.display(), priority);
        }
        for mv in &g.moves {
            let name = mv.from.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            println!("  MOVE:   {name}");
        }
        println!();
    }

    if dry_run {
        return Ok(());
    }
    let summary = apply(&plan)?;
    println!(
        "Moved {} archive(s), removed {} folder(s).",
        summary.moved, summary.removed
    );
    Ok(())
}
