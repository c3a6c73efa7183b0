//! Library maintenance: merge duplicate series folders.
//!
//! Two folders belong to the same series when both hold a series cover named
//! by the same 26-character series id (`{id}.jpg` or `{id}.webp`). Planning is
//! a pure function over a [`SeriesFolder`] snapshot; [`apply`] performs it.

mod apply;

pub use apply::{apply, ApplySummary};

use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

const SERIES_ID_LEN: usize = 26;

/// One folder of the library as seen at scan time.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesFolder {
    pub name: String,
    pub path: PathBuf,
    /// Plain file names directly inside the folder.
    pub files: Vec<String>,
    /// Modification time in seconds since the epoch; 0 when unknown.
    pub modified: f64,
}

impl SeriesFolder {
    pub fn series_id(&self) -> Option<String> {
        series_id_of(self.files.iter().map(String::as_str))
    }

    pub fn archives(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(String::as_str).filter(|f| is_archive(f))
    }

    /// Keep score: capitalised names, longer names, more archives, then newer mtime.
    pub fn priority(&self) -> f64 {
        let mut score = 0.0;
        if self.name.chars().any(char::is_uppercase) {
            score += 100.0;
        }
        score += self.name.chars().count() as f64 * 2.0;
        score += self.archives().count() as f64 * 10.0;
        score + self.modified / 1e6
    }
}

fn is_archive(name: &str) -> bool {
    name.ends_with(".cbz") || name.ends_with(".zip")
}

/// Series id from a cover file name such as `01J76XYHEWTDVAMWPMEQS89C3Y.webp`.
pub fn series_id_of<'a>(files: impl IntoIterator<Item = &'a str>) -> Option<String> {
    files.into_iter().find_map(|f| {
        let stem = f.strip_suffix(".jpg").or_else(|| f.strip_suffix(".webp"))?;
        (stem.chars().count() == SERIES_ID_LEN).then(|| stem.to_string())
    })
}

/// Reads every sub-folder of `library`.
pub fn snapshot(library: &Path) -> Result<Vec<SeriesFolder>> {
    let rd = std::fs::read_dir(library).with_context(|| format!("read library {}", library.display()))?;
    let mut folders = Vec::new();
    for entry in rd {
        let entry = entry.with_context(|| format!("read library {}", library.display()))?;
        let meta = match entry.metadata() {
            Ok(m) if m.is_dir() => m,
            _ => continue,
        };
        let path = entry.path();
        let modified = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map_or(0.0, |d| d.as_secs_f64());
        let mut files = Vec::new();
        for f in std::fs::read_dir(&path).with_context(|| format!("read folder {}", path.display()))? {
            let f = f?;
            if f.file_type().map(|t| t.is_file()).unwrap_or(false) {
                files.push(f.file_name().to_string_lossy().into_owned());
            }
        }
        files.sort();
        folders.push(SeriesFolder {
            name: entry.file_name().to_string_lossy().into_owned(),
            path,
            files,
            modified,
        });
    }
    folders.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(folders)
}

/// An archive to move from a duplicate into the kept folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveMove {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Folders sharing one series id.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateGroup {
    pub series_id: String,
    pub keep: PathBuf,
    pub keep_priority: f64,
    /// Duplicates to delete after their archives are moved, with their priority.
    pub remove: Vec<(PathBuf, f64)>,
    pub moves: Vec<ArchiveMove>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedupePlan {
    pub groups: Vec<DuplicateGroup>,
}

impl DedupePlan {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Groups folders by series id and picks the highest-priority folder of each
/// group to keep. Archives missing from the kept folder are moved into it;
/// when several duplicates hold the same name, the higher-priority one wins.
pub fn plan_dedupe(folders: &[SeriesFolder]) -> DedupePlan {
    let mut by_id: BTreeMap<String, Vec<&SeriesFolder>> = BTreeMap::new();
    for f in folders {
        if let Some(id) = f.series_id() {
            by_id.entry(id).or_default().push(f);
        }
    }

    let mut groups = Vec::new();
    for (series_id, mut members) in by_id {
        if members.len() < 2 {
            continue;
        }
        members.sort_by(|a, b| b.priority().total_cmp(&a.priority()).then_with(|| a.name.cmp(&b.name)));
        let keep = members[0];
        let mut present: BTreeSet<&str> = keep.archives().collect();
        let mut moves = Vec::new();
        for dup in &members[1..] {
            for name in dup.archives() {
                if present.insert(name) {
                    moves.push(ArchiveMove {
                        from: dup.path.join(name),
                        to: keep.path.join(name),
                    });
                }
            }
        }
        groups.push(DuplicateGroup {
            series_id,
            keep: keep.path.clone(),
            keep_priority: keep.priority(),
            remove: members[1..].iter().map(|d| (d.path.clone(), d.priority())).collect(),
            moves,
        });
    }
    DedupePlan { groups }
}
