//! # Nutrition Patterns Module
//!
//! This module contains the structural regex patterns (section marker, numbers) and
//! builds keyword patterns out of the vocabulary.

use crate::errors::ConfigError;
use lazy_static::lazy_static;
use regex::{Match, Regex};

/// "per 100 g", "per 100 gr", "per 100 ml"; OCR often reads the "l" of "ml" as "1"
///
/// No leading word boundary: "valoriper 100g" is a common OCR merge.
pub const PER_100_MARKER_PATTERN: &str = r"per\s*100\s*(?:gr?|m[l1])";

/// Decimal-looking token, comma or dot separator
pub const NUMBER_PATTERN: &str = r"\d+(?:[.,]\d+)?";

lazy_static! {
    pub static ref PER_100_MARKER_REGEX: Regex =
        Regex::new(PER_100_MARKER_PATTERN).expect("Section marker pattern should be valid");
    pub static ref NUMBER_REGEX: Regex =
        Regex::new(NUMBER_PATTERN).expect("Number pattern should be valid");
    pub static ref SPACE_RUN_REGEX: Regex =
        Regex::new(r" {2,}").expect("Space run pattern should be valid");
    /// "1046/250", the figures of a "kj/kcal" column pair
    pub static ref NUMBER_PAIR_REGEX: Regex = Regex::new(&format!(
        r"(?P<first>{NUMBER_PATTERN})\s*/\s*(?P<second>{NUMBER_PATTERN})"
    ))
    .expect("Number pair pattern should be valid");
}

/// Parse the first number in `text`, comma or dot as decimal separator
pub fn parse_first_number(text: &str) -> Option<f64> {
    NUMBER_REGEX.find(text).and_then(|m| parse_number(m.as_str()))
}

/// Parse a number token; non-finite results are rejected
pub fn parse_number(token: &str) -> Option<f64> {
    token
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

/// How a keyword must sit in the text to count as a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordBoundary {
    /// Whole word: starts on a word boundary, not followed by a letter
    Word,
    /// Anywhere, e.g. units glued to numbers ("250kcal")
    Substring,
}

/// Build a regex alternation from keywords: lowercased, deduplicated, longest first,
/// escaped, inner whitespace tolerant to OCR spacing
pub fn keyword_alternation<S: AsRef<str>>(keywords: &[S], boundary: KeywordBoundary) -> String {
    let mut words: Vec<String> = keywords
        .iter()
        .map(|k| k.as_ref().trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    words.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    words.dedup();

    words
        .iter()
        .map(|word| {
            let body = word
                .split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+");
            let starts_with_word_char = word.chars().next().is_some_and(|c| c.is_alphanumeric());
            if boundary == KeywordBoundary::Word && starts_with_word_char {
                format!(r"\b{body}")
            } else {
                body
            }
        })
        .collect::<Vec<_>>()
        .join("|")
}

/// Case-insensitive pattern recognizing a set of synonyms for one concept
#[derive(Debug, Clone)]
pub struct KeywordPattern {
    regex: Regex,
    prefix: Regex,
    alternation: String,
}

impl KeywordPattern {
    /// Compile a keyword pattern
    ///
    /// # Examples
    ///
    /// ```rust
    /// use nutrilabel::nutrition_patterns::{KeywordBoundary, KeywordPattern};
    ///
    /// let carbs = KeywordPattern::from_keywords(&["carboidrati", "carbs"], KeywordBoundary::Word)?;
    /// assert!(carbs.is_match("Carboidrati 30 g"));
    /// assert!(!carbs.is_match("carbsoda"));
    /// # Ok::<(), nutrilabel::errors::ConfigError>(())
    /// ```
    pub fn from_keywords<S: AsRef<str>>(
        keywords: &[S],
        boundary: KeywordBoundary,
    ) -> Result<Self, ConfigError> {
        let alternation = keyword_alternation(keywords, boundary);
        if alternation.is_empty() {
            return Err(ConfigError::Vocabulary(
                "keyword list cannot be empty".to_string(),
            ));
        }
        let body = match boundary {
            KeywordBoundary::Word => format!(r"(?P<kw>{alternation})(?:[^\p{{L}}]|$)"),
            KeywordBoundary::Substring => format!(r"(?P<kw>{alternation})"),
        };
        let regex = Regex::new(&format!("(?i){body}"))?;
        let prefix = Regex::new(&format!("(?i)^{body}"))?;
        Ok(Self {
            regex,
            prefix,
            alternation,
        })
    }

    /// Alternation source, for embedding into larger patterns
    pub fn alternation(&self) -> &str {
        &self.alternation
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// First keyword occurrence (the keyword itself, without the trailing delimiter)
    pub fn find<'t>(&self, text: &'t str) -> Option<Match<'t>> {
        self.regex.captures(text).and_then(|c| c.name("kw"))
    }

    /// Every keyword occurrence, left to right
    pub fn find_iter<'r, 't>(&'r self, text: &'t str) -> impl Iterator<Item = Match<'t>> + 'r
    where
        't: 'r,
    {
        self.regex.captures_iter(text).filter_map(|c| c.name("kw"))
    }

    /// Whether `text` starts with one of the keywords
    ///
    /// Anchored, so the cost does not depend on the length of `text`.
    pub fn is_prefix_of(&self, text: &str) -> bool {
        self.prefix.is_match(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_variants() {
        assert!(PER_100_MARKER_REGEX.is_match("valori per 100 g"));
        assert!(PER_100_MARKER_REGEX.is_match("per 100g"));
        assert!(PER_100_MARKER_REGEX.is_match("per100 gr"));
        assert!(PER_100_MARKER_REGEX.is_match("per 100 ml"));
        assert!(PER_100_MARKER_REGEX.is_match("per 100 m1"));
        // OCR often glues the marker to the preceding word
        assert!(PER_100_MARKER_REGEX.is_match("valoriper 100g"));
        assert!(!PER_100_MARKER_REGEX.is_match("per 1000 kg"));
        assert!(!PER_100_MARKER_REGEX.is_match("per porzione 30 g"));
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_first_number("30,5 g"), Some(30.5));
        assert_eq!(parse_first_number("< 0.5 g"), Some(0.5));
        assert_eq!(parse_first_number("tracce"), None);
        let huge = "9".repeat(400);
        assert_eq!(parse_number(&huge), None);
    }

    #[test]
    fn test_alternation_longest_first() {
        let alt = keyword_alternation(&["protein", "proteine", "Protein"], KeywordBoundary::Word);
        assert_eq!(alt, r"\bproteine|\bprotein");
    }

    #[test]
    fn test_multi_word_keywords_tolerate_spacing() {
        let pattern =
            KeywordPattern::from_keywords(&["di cui"], KeywordBoundary::Word).unwrap();
        assert!(pattern.is_match("di  cui zuccheri"));
        assert!(pattern.is_match("- di cui saturi"));
        assert!(!pattern.is_match("dicui"));
    }

    #[test]
    fn test_word_boundary_allows_glued_digits() {
        let pattern = KeywordPattern::from_keywords(&["grassi"], KeywordBoundary::Word).unwrap();
        let m = pattern.find("grassi10g").unwrap();
        assert_eq!(m.as_str(), "grassi");
        assert!(!pattern.is_match("grassissimo"));
    }

    #[test]
    fn test_substring_boundary_for_units() {
        let units = KeywordPattern::from_keywords(&["kcal"], KeywordBoundary::Substring).unwrap();
        assert!(units.is_match("250kcal"));
        assert!(units.is_prefix_of("kcal 250"));
        assert!(units.is_prefix_of("KCAL"));
        assert!(!units.is_prefix_of("250 kcal"));
        assert!(!units.is_prefix_of(&format!("{}kcal", " ".repeat(10_000))));
    }

    #[test]
    fn test_empty_keywords_rejected() {
        let empty: [&str; 0] = [];
        assert!(KeywordPattern::from_keywords(&empty, KeywordBoundary::Word).is_err());
    }
}
