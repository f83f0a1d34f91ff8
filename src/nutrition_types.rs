//! # Nutrition Types Module
//!
//! This module defines the result types of label parsing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Keys reported in the `per100` mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacroKey {
    Carbohydrates,
    Protein,
    Fat,
    Calories,
}

impl MacroKey {
    /// Key name in the serialized result
    pub fn as_str(&self) -> &'static str {
        match self {
            MacroKey::Carbohydrates => "c",
            MacroKey::Protein => "p",
            MacroKey::Fat => "f",
            MacroKey::Calories => "kcalLabel",
        }
    }
}

impl fmt::Display for MacroKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strategy that produced a located value, highest precision first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateStrategy {
    /// Label and number adjacent in the isolated section
    InlineSection,
    /// Label and number adjacent somewhere in the full text
    InlineFull,
    /// Number within a bounded span after the label
    Proximity,
    /// Label line followed by a value line
    LineScan,
    /// Dedicated energy-line policy
    EnergyLine,
}

/// A value and how it was found
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocatedValue {
    pub value: f64,
    pub strategy: LocateStrategy,
}

/// Per-macro outcome of one extraction run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MacroExtraction {
    pub carbohydrates: Option<LocatedValue>,
    pub protein: Option<LocatedValue>,
    pub fat: Option<LocatedValue>,
    pub calories: Option<LocatedValue>,
}

impl MacroExtraction {
    pub fn get(&self, key: MacroKey) -> Option<LocatedValue> {
        match key {
            MacroKey::Carbohydrates => self.carbohydrates,
            MacroKey::Protein => self.protein,
            MacroKey::Fat => self.fat,
            MacroKey::Calories => self.calories,
        }
    }

    /// How many of carbohydrates, protein and fat were found
    pub fn macro_count(&self) -> usize {
        [self.carbohydrates, self.protein, self.fat]
            .iter()
            .filter(|v| v.is_some())
            .count()
    }

    pub fn to_per100(&self) -> Per100 {
        Per100 {
            c: self.carbohydrates.map(|v| v.value),
            p: self.protein.map(|v| v.value),
            f: self.fat.map(|v| v.value),
            kcal_label: self.calories.map(|v| v.value),
        }
    }
}

/// Values per 100 g/ml; absent means "not found", never zero
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Per100 {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub c: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub f: Option<f64>,
    #[serde(
        rename = "kcalLabel",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub kcal_label: Option<f64>,
}

/// Structured outcome for one OCR transcription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    /// Best-guess product name, empty if none
    pub name_guess: String,
    /// `None` when no macro nutrient was found
    pub per100: Option<Per100>,
    /// Heuristic score of how many fields were located
    pub confidence: f64,
    /// The transcription the result was computed from
    pub raw_text: String,
}

impl ParseResult {
    /// Truncate `raw_text` to at most `max_chars` characters, for output boundaries
    pub fn with_raw_text_cap(mut self, max_chars: usize) -> Self {
        if let Some((byte_end, _)) = self.raw_text.char_indices().nth(max_chars) {
            self.raw_text.truncate(byte_end);
        }
        self
    }
}
