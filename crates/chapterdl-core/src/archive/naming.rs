//! Deterministic archive and entry names.
//!
//! Two schemes, both parseable back to the chapter number:
//! - cbz: `{series}-{number}[-{label}].cbz`, e.g. `Foo-12.5.cbz`
//! - zip: `vol_{NNN}.zip` for integral numbers, `vol_{whole}-{fraction}.zip` otherwise

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::chapter::{ChapterNumber, ChapterRef};

/// Archive container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Cbz,
    Zip,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Cbz => f.write_str("cbz"),
            OutputFormat::Zip => f.write_str("zip"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cbz" => Ok(OutputFormat::Cbz),
            "zip" => Ok(OutputFormat::Zip),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

/// Names archives for one series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveNaming {
    pub format: OutputFormat,
    /// Sanitized series title used as the cbz prefix.
    pub series: String,
}

impl ArchiveNaming {
    pub fn new(format: OutputFormat, series: impl Into<String>) -> Self {
        Self {
            format,
            series: series.into(),
        }
    }

    /// File name for a chapter's archive.
    pub fn file_name(&self, chapter: &ChapterRef) -> String {
        let n = &chapter.number;
        match self.format {
            OutputFormat::Cbz => match chapter.label().map(sanitize_series_title) {
                Some(label) if !label.is_empty() => format!("{}-{}-{}.cbz", self.series, n, label),
                _ => format!("{}-{}.cbz", self.series, n),
            },
            OutputFormat::Zip => match n.fraction() {
                None => format!("vol_{:03}.zip", n.whole()),
                Some(frac) => format!("vol_{}-{}.zip", n.whole(), frac),
            },
        }
    }

    /// Chapter number encoded in `name`, under either scheme. Foreign names give `None`.
    pub fn parse(&self, name: &str) -> Option<ChapterNumber> {
        parse_zip_name(name).or_else(|| self.parse_cbz_name(name))
    }

    fn parse_cbz_name(&self, name: &str) -> Option<ChapterNumber> {
        let rest = name.strip_suffix(".cbz")?.strip_prefix(self.series.as_str())?.strip_prefix('-')?;
        let whole_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        if whole_len == 0 {
            return None;
        }
        let (whole, mut tail) = rest.split_at(whole_len);
        let mut fraction = "";
        if let Some(after_dot) = tail.strip_prefix('.') {
            let frac_len = after_dot.bytes().take_while(u8::is_ascii_digit).count();
            if frac_len == 0 {
                return None;
            }
            fraction = &after_dot[..frac_len];
            tail = &after_dot[frac_len..];
        }
        if !(tail.is_empty() || tail.starts_with('-')) {
            return None;
        }
        ChapterNumber::from_parts(whole.parse().ok()?, fraction).ok()
    }
}

fn parse_zip_name(name: &str) -> Option<ChapterNumber> {
    let stem = name.strip_prefix("vol_")?.strip_suffix(".zip")?;
    let (whole, fraction) = match stem.split_once('-') {
        Some((w, f)) => (w, f),
        None => (stem, ""),
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || (stem.contains('-') && !all_digits(fraction)) {
        return None;
    }
    ChapterNumber::from_parts(whole.parse().ok()?, fraction).ok()
}

/// Folder-safe series title: spaces become `-`, anything outside
/// `[A-Za-z0-9_-]` is dropped, dash runs collapse, edges are trimmed.
pub fn sanitize_series_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut prev_dash = false;
    for c in title.chars() {
        let c = if c == ' ' { '-' } else { c };
        if !(c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            continue;
        }
        if c == '-' {
            if !prev_dash {
                out.push('-');
            }
            prev_dash = true;
        } else {
            out.push(c);
            prev_dash = false;
        }
    }
    out.trim_matches('-').to_string()
}

/// Zero-pad width for page entries: at least 3, enough for `max_index`.
pub fn page_index_width(max_index: u32) -> usize {
    max_index.to_string().len().max(3)
}

/// Entry name for a page, e.g. `007.jpg`.
pub fn page_entry_name(index: u32, width: usize, ext: &str) -> String {
    format!("{:0width$}.{}", index, ext, width = width)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter(n: &str) -> ChapterRef {
        ChapterRef::new(n.parse().unwrap(), "id", "t")
    }

    fn num(s: &str) -> ChapterNumber {
        s.parse().unwrap()
    }

    #[test]
    fn cbz_names() {
        let naming = ArchiveNaming::new(OutputFormat::Cbz, "Foo");
        assert_eq!(naming.file_name(&chapter("12")), "Foo-12.cbz");
        assert_eq!(naming.file_name(&chapter("12.5")), "Foo-12.5.cbz");
        let mut side = chapter("3");
        side.kind = Some("Side Story".into());
        assert_eq!(naming.file_name(&side), "Foo-3-Side-Story.cbz");
    }

    #[test]
    fn zip_names() {
        let naming = ArchiveNaming::new(OutputFormat::Zip, "Foo");
        assert_eq!(naming.file_name(&chapter("7")), "vol_007.zip");
        assert_eq!(naming.file_name(&chapter("1234")), "vol_1234.zip");
        assert_eq!(naming.file_name(&chapter("12.5")), "vol_12-5.zip");
    }

    #[test]
    fn names_parse_back() {
        for format in [OutputFormat::Cbz, OutputFormat::Zip] {
            let naming = ArchiveNaming::new(format, "Foo");
            for n in ["1", "12.5", "100", "3.25"] {
                let name = naming.file_name(&chapter(n));
                assert_eq!(naming.parse(&name), Some(num(n)), "{name}");
            }
        }
    }

    #[test]
    fn parse_ignores_foreign_names() {
        let naming = ArchiveNaming::new(OutputFormat::Cbz, "Foo");
        for name in [
            "cover.jpg",
            "Foo.cbz",
            "Foo-.cbz",
            "Foo-abc.cbz",
            "Foo-1x.cbz",
            "Foo-1..cbz",
            "Bar-3.cbz",
            "Foo-Bar-3.cbz",
            "vol_.zip",
            "vol_1-.zip",
            "vol_a.zip",
            "Foo-3.cbz.part",
            "vol_003.zip.part",
        ] {
            assert_eq!(naming.parse(name), None, "{name}");
        }
        assert_eq!(naming.parse("Foo-4-Extra.cbz"), Some(num("4")));
        assert_eq!(naming.parse("vol_0012.zip"), Some(num("12")));
    }

    #[test]
    fn sanitize_titles() {
        assert_eq!(sanitize_series_title("One Piece"), "One-Piece");
        assert_eq!(sanitize_series_title("  Re:Zero -- Arc 2! "), "ReZero-Arc-2");
        assert_eq!(sanitize_series_title("Café au lait"), "Caf-au-lait");
        assert_eq!(sanitize_series_title("___"), "___");
    }

    #[test]
    fn entry_names_are_padded() {
        assert_eq!(page_index_width(9), 3);
        assert_eq!(page_index_width(1200), 4);
        assert_eq!(page_entry_name(7, 3, "jpg"), "007.jpg");
        assert_eq!(page_entry_name(12, 4, "png"), "0012.png");
    }
}
