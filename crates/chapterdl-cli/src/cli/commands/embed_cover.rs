//! `chapterdl embed-cover` – put a cover image at the front of an archive.

use anyhow::Result;
use chapterdl_core::archive::{embed_cover, Cover};
use std::path::Path;

pub fn run_embed_cover(archive: &Path, cover: &Path) -> Result<()> {
    let cover = Cover::from_file(cover)?;
    if embed_cover(archive, &cover)? {
        println!("Added cover to {}", archive.display());
    } else {
        println!("{} already has a cover", archive.display());
    }
    Ok(())
}
