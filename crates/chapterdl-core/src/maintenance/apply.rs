use anyhow::{Context, Result};

use super::DedupePlan;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub moved: usize,
    pub removed: usize,
}

/// Moves archives into the kept folders, then deletes the duplicates.
/// Archives that appeared at the destination since planning are left in place.
pub fn apply(plan: &DedupePlan) -> Result<ApplySummary> {
    let mut summary = ApplySummary::default();
    for group in &plan.groups {
        for mv in &group.moves {
            if mv.to.exists() {
                tracing::warn!(path = %mv.to.display(), "destination appeared since planning, not moving");
                continue;
            }
            move_file(&mv.from, &mv.to)?;
            summary.moved += 1;
        }
        for (dir, _) in &group.remove {
            std::fs::remove_dir_all(dir).with_context(|| format!("remove {}", dir.display()))?;
            tracing::info!(series = %group.series_id, path = %dir.display(), "removed duplicate folder");
            summary.removed += 1;
        }
    }
    Ok(summary)
}

/// Rename, falling back to copy + delete across filesystems.
fn move_file(from: &std::path::Path, to: &std::path::Path) -> Result<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    std::fs::copy(from, to).with_context(|| format!("copy {} to {}", from.display(), to.display()))?;
    std::fs::remove_file(from).with_context(|| format!("remove {}", from.display()))?;
    Ok(())
}
