//! # Text Processing Module
//!
//! This module provides the text stages that run before any value is located:
//!
//! - Normalization of raw OCR output (whitespace, case)
//! - Isolation of the "per 100 g/ml" section of the label
//! - An indexable line view with bounded, stoppable lookahead

use crate::nutrition_patterns::{PER_100_MARKER_REGEX, SPACE_RUN_REGEX};
use crate::parser_config::ParserConfig;
use log::{debug, trace};

/// Canonicalize raw OCR text
///
/// Strips carriage returns, turns tabs into spaces, collapses runs of spaces and
/// lowercases. Line breaks are preserved.
///
/// # Examples
///
/// ```rust
/// use nutrilabel::text_processing::normalize;
///
/// assert_eq!(normalize("Grassi\t  10 g\r\nProteine"), "grassi 10 g\nproteine");
/// ```
pub fn normalize(raw: &str) -> String {
    let text = raw.replace('\r', "").replace('\t', " ");
    SPACE_RUN_REGEX.replace_all(&text, " ").to_lowercase()
}

/// Join all lines of `text` with single spaces
///
/// Every `\n` is replaced by one space, so byte offsets into the flattened text are
/// valid offsets into `text` as well.
pub fn flatten(text: &str) -> String {
    text.replace('\n', " ")
}

/// Byte offsets at which the lines of `text` start, always beginning with 0
pub fn line_starts(text: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(text.match_indices('\n').map(|(i, _)| i + 1))
        .collect()
}

/// Where the text of a [`Section`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionOrigin {
    /// Window starting at the "per 100" marker found at this offset
    Marker { offset: usize },
    /// Marker found, but the window held too few lines; full text used
    SparseFallback { offset: usize },
    /// No marker; full text used
    FullText,
}

/// Sub-window of the normalized text most likely to hold the nutrition table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section<'a> {
    text: &'a str,
    origin: SectionOrigin,
}

impl<'a> Section<'a> {
    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn origin(&self) -> SectionOrigin {
        self.origin
    }

    /// Whether the section is narrower than the full text
    pub fn is_isolated(&self) -> bool {
        matches!(self.origin, SectionOrigin::Marker { .. })
    }
}

/// Finds the "per 100 g/ml" table in normalized text
#[derive(Debug, Clone)]
pub struct SectionIsolator {
    window: usize,
    min_lines: usize,
}

impl SectionIsolator {
    pub fn new(window: usize, min_lines: usize) -> Self {
        Self { window, min_lines }
    }

    pub fn from_config(config: &ParserConfig) -> Self {
        Self::new(config.section_window, config.min_section_lines)
    }

    /// Isolate the section starting at the first "per 100" marker
    ///
    /// Falls back to the whole text when there is no marker, or when the window
    /// holds fewer than the minimum number of non-empty lines (a run-on line
    /// rather than a table).
    pub fn isolate<'a>(&self, normalized: &'a str) -> Section<'a> {
        let Some(marker) = PER_100_MARKER_REGEX.find(normalized) else {
            debug!("No per-100 marker found, using full text");
            return Section {
                text: normalized,
                origin: SectionOrigin::FullText,
            };
        };

        let start = marker.start();
        let end = normalized[start..]
            .char_indices()
            .nth(self.window)
            .map(|(i, _)| start + i)
            .unwrap_or(normalized.len());
        let window = &normalized[start..end];

        let line_count = window.lines().filter(|l| !l.trim().is_empty()).count();
        if line_count < self.min_lines {
            debug!(
                "Per-100 window at offset {} has {} lines (< {}), using full text",
                start, line_count, self.min_lines
            );
            return Section {
                text: normalized,
                origin: SectionOrigin::SparseFallback { offset: start },
            };
        }

        trace!(
            "Isolated per-100 section at offset {} ({} bytes, {} lines)",
            start,
            window.len(),
            line_count
        );
        Section {
            text: window,
            origin: SectionOrigin::Marker { offset: start },
        }
    }
}

/// Decision taken for one line during [`LineIndex::lookahead`]
#[derive(Debug, Clone, PartialEq)]
pub enum Lookahead<T> {
    /// Not this line, keep going
    Continue,
    /// Halt the scan without a result
    Stop,
    /// Result found
    Found(T),
}

/// Ordered, indexable sequence of non-empty, trimmed, lowercased lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineIndex {
    lines: Vec<String>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let lines = text
            .lines()
            .map(|line| line.trim().to_lowercase())
            .filter(|line| !line.is_empty())
            .collect();
        Self { lines }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.lines.iter().map(String::as_str).enumerate()
    }

    /// Scan at most `max` lines after `from`, in order
    ///
    /// `step` classifies each visited line. The scan ends on the first
    /// [`Lookahead::Found`] or [`Lookahead::Stop`], or at the end of the sequence.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use nutrilabel::text_processing::{LineIndex, Lookahead};
    ///
    /// let lines = LineIndex::new("carboidrati\ndi cui zuccheri 5 g\n12 g");
    /// let first_digit_line = lines.lookahead(0, 6, |line| {
    ///     if line.starts_with(|c: char| c.is_ascii_digit()) {
    ///         Lookahead::Found(line.to_string())
    ///     } else {
    ///         Lookahead::Continue
    ///     }
    /// });
    /// assert_eq!(first_digit_line.as_deref(), Some("12 g"));
    /// ```
    pub fn lookahead<T, F>(&self, from: usize, max: usize, mut step: F) -> Option<T>
    where
        F: FnMut(&str) -> Lookahead<T>,
    {
        for line in self.lines.iter().skip(from.saturating_add(1)).take(max) {
            match step(line) {
                Lookahead::Continue => continue,
                Lookahead::Stop => {
                    trace!("Lookahead from line {} stopped at '{}'", from, line);
                    return None;
                }
                Lookahead::Found(found) => return Some(found),
            }
        }
        None
    }

    /// Scan at most `max` lines before `from`, nearest first
    ///
    /// Same contract as [`LineIndex::lookahead`], walking backwards.
    pub fn lookbehind<T, F>(&self, from: usize, max: usize, mut step: F) -> Option<T>
    where
        F: FnMut(&str) -> Lookahead<T>,
    {
        let end = from.min(self.lines.len());
        for line in self.lines[..end].iter().rev().take(max) {
            match step(line) {
                Lookahead::Continue => continue,
                Lookahead::Stop => return None,
                Lookahead::Found(found) => return Some(found),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_normalize_keeps_line_breaks() {
        assert_eq!(
            normalize("Valori   Nutrizionali\r\n\tPer 100 g"),
            "valori nutrizionali\n per 100 g"
        );
    }

    #[test]
    fn test_flatten_preserves_offsets() {
        let text = "carboidrati\n12 g";
        let flat = flatten(text);
        assert_eq!(flat.len(), text.len());
        assert_eq!(flat, "carboidrati 12 g");
    }

    #[test]
    fn test_line_starts() {
        assert_eq!(line_starts(""), vec![0]);
        assert_eq!(line_starts("energia\n\ncarboidrati 30 g\n"), vec![0, 8, 9, 26]);
    }

    #[test]
    fn test_isolate_without_marker() {
        let isolator = SectionIsolator::new(1600, 4);
        let section = isolator.isolate("ingredienti: acqua, zucchero");
        assert_eq!(section.origin(), SectionOrigin::FullText);
        assert!(!section.is_isolated());
    }

    #[test]
    fn test_isolate_respects_window_in_characters() {
        let isolator = SectionIsolator::new(12, 1);
        let section = isolator.isolate("intro\nper 100 g è più buono");
        assert_eq!(section.text().chars().count(), 12);
        assert!(section.text().starts_with("per 100 g"));
    }

    #[test]
    fn test_lookahead_is_bounded() {
        let lines = LineIndex::new("a\nb\nc\nd");
        let mut visited = Vec::new();
        let found: Option<()> = lines.lookahead(0, 2, |line| {
            visited.push(line.to_string());
            Lookahead::Continue
        });
        assert!(found.is_none());
        assert_eq!(visited, vec!["b", "c"]);
    }

    #[test]
    fn test_lookahead_past_end_is_empty() {
        let lines = LineIndex::new("a\nb");
        let found: Option<()> = lines.lookahead(1, 6, |_| Lookahead::Found(()));
        assert!(found.is_none());
        let found: Option<()> = lines.lookahead(usize::MAX, 6, |_| Lookahead::Found(()));
        assert!(found.is_none());
    }

    #[test]
    fn test_lookbehind_walks_backwards() {
        let lines = LineIndex::new("a\nb\nc\nd");
        let mut visited = Vec::new();
        let found: Option<()> = lines.lookbehind(3, 2, |line| {
            visited.push(line.to_string());
            Lookahead::Continue
        });
        assert!(found.is_none());
        assert_eq!(visited, vec!["c", "b"]);

        let first: Option<String> = lines.lookbehind(0, 6, |line| Lookahead::Found(line.to_string()));
        assert!(first.is_none());
        let clamped = lines.lookbehind(99, 1, |line| Lookahead::Found(line.to_string()));
        assert_eq!(clamped.as_deref(), Some("d"));
    }

    #[test]
    fn test_lookahead_stop_halts() {
        let lines = LineIndex::new("label\nstop here\n42");
        let found = lines.lookahead(0, 6, |line| {
            if line.starts_with("stop") {
                Lookahead::Stop
            } else {
                Lookahead::Found(line.to_string())
            }
        });
        assert!(found.is_none());
    }
}
