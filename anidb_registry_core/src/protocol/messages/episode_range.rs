//! Released-episode ranges as reported in group status replies
//!
//! Two sub-grammars exist: plain numbers (`1-9`, `12`) and numbers sharing a
//! letter prefix (`S1-S7`, `C2`). A span is classified once from its first
//! character and decoded by the matching grammar.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

/// Widest span accepted; anything larger is treated as corruption
pub const MAX_SPAN_WIDTH: u32 = 10_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EpisodeRangeError {
    #[error("empty episode span")]
    Empty,

    #[error("malformed episode span `{0}`")]
    Malformed(String),

    #[error("episode span `{0}` mixes prefixes")]
    MixedPrefix(String),

    #[error("episode span `{0}` ends before it starts")]
    Reversed(String),

    #[error("episode span `{0}` is wider than {MAX_SPAN_WIDTH} episodes")]
    TooWide(String),
}

/// One contiguous run of episodes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EpisodeSpan {
    Numeric { start: u32, end: u32 },
    Prefixed { prefix: String, start: u32, end: u32 },
}

impl EpisodeSpan {
    /// Classify `text` by its first character and decode it
    pub fn detect(text: &str) -> Result<Self, EpisodeRangeError> {
        let text = text.trim();
        match text.chars().next() {
            None => Err(EpisodeRangeError::Empty),
            Some(c) if c.is_ascii_digit() => Self::decode_numeric(text),
            Some(c) if c.is_ascii_alphabetic() => Self::decode_prefixed(text),
            Some(_) => Err(EpisodeRangeError::Malformed(text.to_string())),
        }
    }

    fn decode_numeric(text: &str) -> Result<Self, EpisodeRangeError> {
        let malformed = || EpisodeRangeError::Malformed(text.to_string());
        let (start, end) = match text.split_once('-') {
            Some((start, end)) => (
                parse_number(start).ok_or_else(malformed)?,
                parse_number(end).ok_or_else(malformed)?,
            ),
            None => {
                let single = parse_number(text).ok_or_else(malformed)?;
                (single, single)
            }
        };
        check_bounds(text, start, end)?;
        Ok(Self::Numeric { start, end })
    }

    fn decode_prefixed(text: &str) -> Result<Self, EpisodeRangeError> {
        let malformed = || EpisodeRangeError::Malformed(text.to_string());
        let (prefix, start, end) = match text.split_once('-') {
            Some((start, end)) => {
                let (prefix, start) = split_label(start).ok_or_else(malformed)?;
                let (end_prefix, end) = split_label(end).ok_or_else(malformed)?;
                if prefix.is_empty() || prefix != end_prefix {
                    return Err(EpisodeRangeError::MixedPrefix(text.to_string()));
                }
                (prefix, start, end)
            }
            None => {
                let (prefix, number) = split_label(text).ok_or_else(malformed)?;
                (prefix, number, number)
            }
        };
        check_bounds(text, start, end)?;
        Ok(Self::Prefixed {
            prefix: prefix.to_string(),
            start,
            end,
        })
    }

    pub fn prefix(&self) -> &str {
        match self {
            Self::Numeric { .. } => "",
            Self::Prefixed { prefix, .. } => prefix,
        }
    }

    pub fn bounds(&self) -> (u32, u32) {
        match self {
            Self::Numeric { start, end } | Self::Prefixed { start, end, .. } => (*start, *end),
        }
    }

    pub fn len(&self) -> usize {
        let (start, end) = self.bounds();
        (end - start) as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether the span covers the episode `prefix` + `number`
    pub fn covers(&self, prefix: &str, number: u32) -> bool {
        let (start, end) = self.bounds();
        self.prefix() == prefix && (start..=end).contains(&number)
    }

    /// Episode labels in order, prefix preserved
    pub fn labels(&self) -> impl Iterator<Item = String> + '_ {
        let (start, end) = self.bounds();
        let prefix = self.prefix();
        (start..=end).map(move |n| format!("{prefix}{n}"))
    }
}

impl fmt::Display for EpisodeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (start, end) = self.bounds();
        let prefix = self.prefix();
        if start == end {
            write!(f, "{prefix}{start}")
        } else {
            write!(f, "{prefix}{start}-{prefix}{end}")
        }
    }
}

/// A comma-separated list of spans, e.g. `1-9,S1-S2,12`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpisodeRange {
    spans: Vec<EpisodeSpan>,
}

impl EpisodeRange {
    /// Parse a range list; empty text is an empty range
    pub fn parse(text: &str) -> Result<Self, EpisodeRangeError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Self::default());
        }
        let spans = text
            .split(',')
            .map(EpisodeSpan::detect)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { spans })
    }

    pub fn spans(&self) -> &[EpisodeSpan] {
        &self.spans
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Every released episode label, in reply order
    pub fn expand(&self) -> Vec<String> {
        self.spans.iter().flat_map(EpisodeSpan::labels).collect()
    }

    /// Check membership of an episode label without expanding
    pub fn contains(&self, label: &str) -> bool {
        match split_label(label.trim()) {
            Some((prefix, number)) => self.spans.iter().any(|span| span.covers(prefix, number)),
            None => false,
        }
    }
}

impl fmt::Display for EpisodeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.spans.iter().map(ToString::to_string).collect();
        f.write_str(&rendered.join(","))
    }
}

/// Whether released episodes skip a number within any prefix group
///
/// `S5` is only compared with other `S` episodes, never with plain numbers.
/// Labels that are not episode numbers are ignored.
pub fn has_release_gaps<S: AsRef<str>>(labels: &[S]) -> bool {
    let mut groups: BTreeMap<&str, BTreeSet<u32>> = BTreeMap::new();
    for label in labels {
        if let Some((prefix, number)) = split_label(label.as_ref().trim()) {
            groups.entry(prefix).or_default().insert(number);
        }
    }

    groups.values().any(|numbers| {
        match (numbers.first(), numbers.last()) {
            (Some(first), Some(last)) => (last - first) as usize + 1 != numbers.len(),
            _ => false,
        }
    })
}

/// Split `S12` into (`S`, 12); plain numbers have an empty prefix
fn split_label(label: &str) -> Option<(&str, u32)> {
    let digits_at = label.find(|c: char| c.is_ascii_digit())?;
    let (prefix, digits) = label.split_at(digits_at);
    if !prefix.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    parse_number(digits).map(|number| (prefix, number))
}

fn parse_number(text: &str) -> Option<u32> {
    let text = text.trim();
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn check_bounds(text: &str, start: u32, end: u32) -> Result<(), EpisodeRangeError> {
    if end < start {
        return Err(EpisodeRangeError::Reversed(text.to_string()));
    }
    if end - start >= MAX_SPAN_WIDTH {
        return Err(EpisodeRangeError::TooWide(text.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_detect_numeric() {
        assert_eq!(
            EpisodeSpan::detect("1-9").unwrap(),
            EpisodeSpan::Numeric { start: 1, end: 9 }
        );
        assert_eq!(
            EpisodeSpan::detect("12").unwrap(),
            EpisodeSpan::Numeric { start: 12, end: 12 }
        );
    }

    #[test]
    fn test_detect_prefixed() {
        assert_eq!(
            EpisodeSpan::detect("S1-S7").unwrap(),
            EpisodeSpan::Prefixed {
                prefix: "S".into(),
                start: 1,
                end: 7
            }
        );
        assert_eq!(
            EpisodeSpan::detect("C2").unwrap(),
            EpisodeSpan::Prefixed {
                prefix: "C".into(),
                start: 2,
                end: 2
            }
        );
    }

    #[test]
    fn test_detect_rejects_malformed() {
        assert_eq!(EpisodeSpan::detect(""), Err(EpisodeRangeError::Empty));
        assert!(matches!(
            EpisodeSpan::detect("S1-C3"),
            Err(EpisodeRangeError::MixedPrefix(_))
        ));
        assert!(matches!(
            EpisodeSpan::detect("S1-4"),
            Err(EpisodeRangeError::MixedPrefix(_))
        ));
        assert!(matches!(
            EpisodeSpan::detect("9-1"),
            Err(EpisodeRangeError::Reversed(_))
        ));
        assert!(matches!(
            EpisodeSpan::detect("1-20000"),
            Err(EpisodeRangeError::TooWide(_))
        ));
        assert!(matches!(
            EpisodeSpan::detect("1-x"),
            Err(EpisodeRangeError::Malformed(_))
        ));
        assert!(matches!(
            EpisodeSpan::detect("-3"),
            Err(EpisodeRangeError::Malformed(_))
        ));
    }

    #[test]
    fn test_expand_numeric_range() {
        let range = EpisodeRange::parse("1-9").unwrap();
        assert_eq!(
            range.expand(),
            vec!["1", "2", "3", "4", "5", "6", "7", "8", "9"]
        );
    }

    #[test]
    fn test_expand_singletons_without_gap_filling() {
        let range = EpisodeRange::parse("5,7").unwrap();
        assert_eq!(range.expand(), vec!["5", "7"]);
    }

    #[test]
    fn test_expand_preserves_prefix() {
        let range = EpisodeRange::parse("1-2,S1-S3").unwrap();
        assert_eq!(range.expand(), vec!["1", "2", "S1", "S2", "S3"]);
        assert_eq!(range.to_string(), "1-2,S1-S3");
    }

    #[test]
    fn test_empty_range() {
        let range = EpisodeRange::parse("").unwrap();
        assert!(range.is_empty());
        assert!(range.expand().is_empty());
    }

    #[test]
    fn test_contains() {
        let range = EpisodeRange::parse("1-9,S5").unwrap();
        assert!(range.contains("4"));
        assert!(range.contains("S5"));
        assert!(!range.contains("S4"));
        assert!(!range.contains("10"));
        assert!(!range.contains("abc"));
    }

    #[test]
    fn test_release_gaps() {
        assert!(has_release_gaps(&["1", "2", "4"]));
        assert!(!has_release_gaps(&["1", "2", "3"]));
        assert!(!has_release_gaps::<&str>(&[]));
    }

    #[test]
    fn test_release_gaps_compare_within_prefix() {
        // Specials are contiguous among themselves
        assert!(!has_release_gaps(&["1", "2", "S5", "S6"]));
        assert!(has_release_gaps(&["1", "2", "S5", "S7"]));
        // Order and duplicates do not matter
        assert!(!has_release_gaps(&["3", "1", "2", "2"]));
    }

    proptest! {
        #[test]
        fn prop_numeric_expansion_length(start in 0u32..5_000, width in 0u32..500) {
            let end = start + width;
            let range = EpisodeRange::parse(&format!("{start}-{end}")).unwrap();
            let labels = range.expand();
            prop_assert_eq!(labels.len(), width as usize + 1);
            prop_assert!(!has_release_gaps(&labels));
        }
    }
}
