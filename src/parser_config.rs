//! # Parser Configuration Module
//!
//! This module defines the tunables of the extraction engine: section window size,
//! lookahead depth, proximity span, the threshold for reporting `per100` at all and
//! the confidence constants.

use crate::errors::ConfigError;

// Constants for parser configuration
pub const DEFAULT_SECTION_WINDOW: usize = 1600;
pub const DEFAULT_MIN_SECTION_LINES: usize = 4;
pub const DEFAULT_LOOKAHEAD_LINES: usize = 6;
pub const DEFAULT_PROXIMITY_SPAN: usize = 160;
pub const DEFAULT_MIN_MACROS_FOR_PER100: usize = 1;
/// Cap applied to `rawText` at the output boundary, never inside the engine
pub const DEFAULT_RAW_TEXT_CAP: usize = 4000;

/// Confidence scoring constants
#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceConfig {
    /// Score when carbohydrates, protein and fat were all found
    pub all_macros: f64,
    /// Score when two of the three were found
    pub two_macros: f64,
    /// Score for zero or one
    pub baseline: f64,
    /// Added when calories were found
    pub calorie_bonus: f64,
    /// Clamp the final score into [0, 1]
    pub clamp_to_unit: bool,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            all_macros: 0.9,
            two_macros: 0.6,
            baseline: 0.3,
            calorie_bonus: 0.05,
            clamp_to_unit: true,
        }
    }
}

/// Configuration structure for label parsing
#[derive(Debug, Clone, PartialEq)]
pub struct ParserConfig {
    /// Characters kept after the "per 100" marker
    pub section_window: usize,
    /// Fewer non-empty lines than this in the window means a run-on line, not a table
    pub min_section_lines: usize,
    /// Lines scanned forward from a label line that has no value of its own
    pub lookahead_lines: usize,
    /// Characters after a label in which the proximity strategy looks for a number
    pub proximity_span: usize,
    /// How many of carbohydrates/protein/fat must be found before `per100` is reported
    pub min_macros_for_per100: usize,
    /// Confidence scoring constants
    pub confidence: ConfidenceConfig,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            section_window: DEFAULT_SECTION_WINDOW,
            min_section_lines: DEFAULT_MIN_SECTION_LINES,
            lookahead_lines: DEFAULT_LOOKAHEAD_LINES,
            proximity_span: DEFAULT_PROXIMITY_SPAN,
            min_macros_for_per100: DEFAULT_MIN_MACROS_FOR_PER100,
            confidence: ConfidenceConfig::default(),
        }
    }
}

impl ParserConfig {
    /// Validate parser configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.section_window == 0 {
            return Err(ConfigError::Parameter(
                "section_window must be greater than 0".to_string(),
            ));
        }
        if self.lookahead_lines == 0 {
            return Err(ConfigError::Parameter(
                "lookahead_lines must be greater than 0".to_string(),
            ));
        }
        if self.proximity_span == 0 {
            return Err(ConfigError::Parameter(
                "proximity_span must be greater than 0".to_string(),
            ));
        }
        // Zero would allow an empty per100 mapping
        if !(1..=3).contains(&self.min_macros_for_per100) {
            return Err(ConfigError::Parameter(format!(
                "min_macros_for_per100 must be between 1 and 3, got {}",
                self.min_macros_for_per100
            )));
        }

        let scores = [
            ("all_macros", self.confidence.all_macros),
            ("two_macros", self.confidence.two_macros),
            ("baseline", self.confidence.baseline),
            ("calorie_bonus", self.confidence.calorie_bonus),
        ];
        for (name, score) in scores {
            if !score.is_finite() || score < 0.0 {
                return Err(ConfigError::Parameter(format!(
                    "confidence.{name} must be a finite non-negative number, got {score}"
                )));
            }
        }

        Ok(())
    }
}
