//! # Label Parser Module
//!
//! Wires the pipeline together: normalize, isolate the per-100 section, index the
//! lines, locate every quantity, then score and name the result.
//!
//! Parsing never fails. Missing data is reported as absence: a key that was not
//! found is omitted, and `per100` is `None` when no macro nutrient was found.
//!
//! ## Usage
//!
//! ```rust
//! use nutrilabel::label_parser::parse_label_text;
//!
//! let result = parse_label_text("Per 100 g\nEnergia 250 kcal\nCarboidrati 30.5 g\nProteine 5 g\nGrassi 10 g");
//! let per100 = result.per100.unwrap();
//! assert_eq!(per100.c, Some(30.5));
//! assert_eq!(per100.kcal_label, Some(250.0));
//! ```

use crate::errors::ConfigError;
use crate::macro_extractor::MacroExtractor;
use crate::nutrition_types::{MacroExtraction, ParseResult};
use crate::parser_config::{ConfidenceConfig, ParserConfig};
use crate::text_processing::{normalize, LineIndex, SectionIsolator};
use crate::value_locator::ValueLocator;
use crate::vocabulary::Vocabulary;
use lazy_static::lazy_static;
use log::{debug, info};

lazy_static! {
    static ref DEFAULT_PARSER: NutritionLabelParser = NutritionLabelParser::default();
}

/// Parse with the built-in configuration and vocabulary
pub fn parse_label_text(raw_text: &str) -> ParseResult {
    DEFAULT_PARSER.parse(raw_text)
}

/// Heuristic nutrition-label parser
#[derive(Debug, Clone)]
pub struct NutritionLabelParser {
    config: ParserConfig,
    vocabulary: Vocabulary,
    isolator: SectionIsolator,
    extractor: MacroExtractor,
}

impl NutritionLabelParser {
    /// Create a parser with the default configuration and bilingual vocabulary
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_config(ParserConfig::default(), Vocabulary::default())
    }

    /// Create a parser with custom configuration and vocabulary
    ///
    /// # Examples
    ///
    /// ```rust
    /// use nutrilabel::label_parser::NutritionLabelParser;
    /// use nutrilabel::parser_config::ParserConfig;
    /// use nutrilabel::vocabulary::Vocabulary;
    ///
    /// let config = ParserConfig {
    ///     min_macros_for_per100: 2,
    ///     ..Default::default()
    /// };
    /// let parser = NutritionLabelParser::with_config(config, Vocabulary::default())?;
    /// assert!(parser.parse("Proteine 5 g").per100.is_none());
    /// # Ok::<(), nutrilabel::errors::ConfigError>(())
    /// ```
    pub fn with_config(config: ParserConfig, vocabulary: Vocabulary) -> Result<Self, ConfigError> {
        config.validate()?;
        vocabulary.validate()?;
        let extractor = MacroExtractor::new(&vocabulary)?;

        info!(
            "Creating NutritionLabelParser: window={}, lookahead={}, proximity={}, min_macros={}",
            config.section_window,
            config.lookahead_lines,
            config.proximity_span,
            config.min_macros_for_per100
        );

        Ok(Self {
            isolator: SectionIsolator::from_config(&config),
            config,
            vocabulary,
            extractor,
        })
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Locate every quantity, keeping how each one was found
    pub fn extract(&self, raw_text: &str) -> MacroExtraction {
        let normalized = normalize(raw_text);
        let section = self.isolator.isolate(&normalized);
        let section_lines = LineIndex::new(section.text());
        let full_lines = LineIndex::new(&normalized);
        debug!(
            "Section {:?}: {} lines (full text {} lines)",
            section.origin(),
            section_lines.len(),
            full_lines.len()
        );

        let locator = ValueLocator::new(
            section,
            &normalized,
            &section_lines,
            &full_lines,
            self.extractor.markers(),
            &self.config,
        );
        self.extractor.extract(&locator)
    }

    /// Parse one OCR transcription
    pub fn parse(&self, raw_text: &str) -> ParseResult {
        let extraction = self.extract(raw_text);
        let found = extraction.macro_count();

        let per100 = if found >= self.config.min_macros_for_per100 {
            Some(extraction.to_per100())
        } else {
            None
        };
        let confidence = score_confidence(
            found,
            extraction.calories.is_some(),
            &self.config.confidence,
        );
        let name_guess = guess_name(raw_text, &self.vocabulary);

        info!(
            "Parsed label: {} of 3 macros, calories={}, confidence={}",
            found,
            extraction.calories.is_some(),
            confidence
        );

        ParseResult {
            name_guess,
            per100,
            confidence,
            raw_text: raw_text.to_string(),
        }
    }
}

impl Default for NutritionLabelParser {
    fn default() -> Self {
        Self::new().expect("Default parser configuration should be valid")
    }
}

/// Confidence from how many of carbohydrates/protein/fat were found
///
/// 3 → `all_macros`, 2 → `two_macros`, otherwise `baseline`; `calorie_bonus` is
/// added when calories were found. Rounded to two decimals.
pub fn score_confidence(found_macros: usize, has_calories: bool, config: &ConfidenceConfig) -> f64 {
    let base = match found_macros {
        n if n >= 3 => config.all_macros,
        2 => config.two_macros,
        _ => config.baseline,
    };
    let mut score = if has_calories {
        base + config.calorie_bonus
    } else {
        base
    };
    if config.clamp_to_unit {
        score = score.clamp(0.0, 1.0);
    }
    (score * 100.0).round() / 100.0
}

/// First raw line of at least three characters that is not a boilerplate header
pub fn guess_name(raw_text: &str, vocabulary: &Vocabulary) -> String {
    raw_text
        .lines()
        .map(str::trim)
        .find(|line| line.chars().count() >= 3 && !vocabulary.is_boilerplate_header(line))
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_table() {
        let config = ConfidenceConfig::default();
        assert_eq!(score_confidence(3, false, &config), 0.9);
        assert_eq!(score_confidence(3, true, &config), 0.95);
        assert_eq!(score_confidence(2, false, &config), 0.6);
        assert_eq!(score_confidence(1, false, &config), 0.3);
        assert_eq!(score_confidence(0, false, &config), 0.3);
        assert_eq!(score_confidence(0, true, &config), 0.35);
    }

    #[test]
    fn test_confidence_clamp() {
        let config = ConfidenceConfig {
            all_macros: 0.98,
            calorie_bonus: 0.05,
            ..Default::default()
        };
        assert_eq!(score_confidence(3, true, &config), 1.0);

        let unclamped = ConfidenceConfig {
            clamp_to_unit: false,
            ..config
        };
        assert_eq!(score_confidence(3, true, &unclamped), 1.03);
    }

    #[test]
    fn test_guess_name_skips_boilerplate_and_short_lines() {
        let vocabulary = Vocabulary::default();
        assert_eq!(
            guess_name("VALORI NUTRIZIONALI\n  ab \n  Biscotti al cacao  ", &vocabulary),
            "Biscotti al cacao"
        );
        assert_eq!(guess_name("", &vocabulary), "");
        assert_eq!(guess_name("\n\n x\n", &vocabulary), "");
    }

    #[test]
    fn test_calories_alone_do_not_make_per100() {
        let parser = NutritionLabelParser::default();
        let result = parser.parse("Energia 250 kcal");
        assert!(result.per100.is_none());
        assert_eq!(result.confidence, 0.35);
    }

    #[test]
    fn test_parser_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NutritionLabelParser>();
    }
}
