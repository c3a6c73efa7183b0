//! Exact decimal chapter numbers (`12`, `12.5`).
//!
//! Stored as the integral part plus the fractional digits with trailing zeros
//! stripped. With trailing zeros gone, lexicographic order of the fractional
//! digits is numeric order.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A non-negative decimal chapter number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChapterNumber {
    whole: u64,
    /// Fractional digits without trailing zeros; empty for integral numbers.
    fraction: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid chapter number: {0:?}")]
pub struct ParseChapterNumberError(pub String);

impl ChapterNumber {
    /// Integral chapter number.
    pub fn new(whole: u64) -> Self {
        Self {
            whole,
            fraction: String::new(),
        }
    }

    /// Build from the integral part and the digits after the decimal point.
    pub fn from_parts(whole: u64, fraction_digits: &str) -> Result<Self, ParseChapterNumberError> {
        if !fraction_digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseChapterNumberError(format!("{whole}.{fraction_digits}")));
        }
        Ok(Self {
            whole,
            fraction: fraction_digits.trim_end_matches('0').to_string(),
        })
    }

    pub fn whole(&self) -> u64 {
        self.whole
    }

    /// Fractional digits (no trailing zeros), or `None` for integral numbers.
    pub fn fraction(&self) -> Option<&str> {
        if self.fraction.is_empty() {
            None
        } else {
            Some(&self.fraction)
        }
    }

    pub fn is_integral(&self) -> bool {
        self.fraction.is_empty()
    }
}

impl FromStr for ChapterNumber {
    type Err = ParseChapterNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let err = || ParseChapterNumberError(s.to_string());
        let (whole, fraction) = match trimmed.split_once('.') {
            Some((w, f)) => (w, f),
            None => (trimmed, ""),
        };
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        let whole: u64 = whole.parse().map_err(|_| err())?;
        Self::from_parts(whole, fraction).map_err(|_| err())
    }
}

impl fmt::Display for ChapterNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fraction.is_empty() {
            write!(f, "{}", self.whole)
        } else {
            write!(f, "{}.{}", self.whole, self.fraction)
        }
    }
}

impl Ord for ChapterNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        self.whole
            .cmp(&other.whole)
            .then_with(|| self.fraction.as_str().cmp(other.fraction.as_str()))
    }
}

impl PartialOrd for ChapterNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for ChapterNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChapterNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Manifests carry numbers either as strings ("12.5") or JSON numbers (12.5).
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Int(u64),
            Float(f64),
        }
        let text = match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s,
            Raw::Int(n) => n.to_string(),
            Raw::Float(x) => x.to_string(),
        };
        text.parse().map_err(serde::de::Error::custom)
    }
}
