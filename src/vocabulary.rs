//! # Keyword Vocabulary Module
//!
//! Label, exclusion and marker keywords are data, not patterns: adding a language
//! means adding tokens here (or in `config/vocabulary.json`), never touching the
//! matching code.

use crate::errors::ConfigError;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default location of the vocabulary override file
pub const DEFAULT_VOCABULARY_PATH: &str = "config/vocabulary.json";

/// Keywords for one macro nutrient
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MacroVocabulary {
    /// Synonyms of the nutrient's own row label
    pub labels: Vec<String>,
    /// Sub-nutrients whose rows must never provide this nutrient's value
    #[serde(default)]
    pub exclusions: Vec<String>,
}

/// Keywords for the energy row
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EnergyVocabulary {
    /// Row labels ("energia", "energy")
    pub labels: Vec<String>,
    /// Units of the reported calorie figure ("kcal")
    pub calorie_units: Vec<String>,
    /// Other energy units that mark a line as an energy line ("kj")
    #[serde(default)]
    pub other_units: Vec<String>,
}

/// Complete keyword vocabulary used by the parser
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Vocabulary {
    pub carbohydrates: MacroVocabulary,
    pub protein: MacroVocabulary,
    pub fat: MacroVocabulary,
    pub energy: EnergyVocabulary,
    /// Markers of a sub-row ("di cui", "of which")
    pub sub_row_markers: Vec<String>,
    /// Header lines that are never a product name
    #[serde(default)]
    pub boilerplate_headers: Vec<String>,
}

fn tokens(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

impl Default for Vocabulary {
    /// Built-in Italian/English vocabulary
    fn default() -> Self {
        Self {
            carbohydrates: MacroVocabulary {
                labels: tokens(&["carboidrati", "carbohydrates", "carbohydrate", "carbs"]),
                exclusions: tokens(&[
                    "zuccheri", "sugars", "sugar", "polioli", "polyols", "amido", "starch",
                ]),
            },
            protein: MacroVocabulary {
                labels: tokens(&["proteine", "protein", "proteins"]),
                exclusions: Vec::new(),
            },
            fat: MacroVocabulary {
                labels: tokens(&["grassi", "fat", "fats", "lipidi"]),
                exclusions: tokens(&[
                    "saturi",
                    "saturated",
                    "saturates",
                    "monoinsaturi",
                    "polinsaturi",
                    "monounsaturates",
                    "polyunsaturates",
                ]),
            },
            energy: EnergyVocabulary {
                labels: tokens(&["energia", "energy", "valore energetico"]),
                calorie_units: tokens(&["kcal"]),
                other_units: tokens(&["kj"]),
            },
            sub_row_markers: tokens(&["di cui", "of which"]),
            boilerplate_headers: tokens(&[
                "valori nutrizionali",
                "valori nutrizionali medi",
                "informazioni nutrizionali",
                "dichiarazione nutrizionale",
                "nutrition facts",
                "nutrition information",
                "nutrition declaration",
            ]),
        }
    }
}

impl Vocabulary {
    /// Parse and validate a vocabulary from its JSON form
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let vocabulary: Vocabulary = serde_json::from_str(content)?;
        vocabulary.validate()?;
        Ok(vocabulary)
    }

    /// Validate vocabulary contents
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("carbohydrates.labels", &self.carbohydrates.labels),
            ("protein.labels", &self.protein.labels),
            ("fat.labels", &self.fat.labels),
            ("energy.labels", &self.energy.labels),
            ("energy.calorie_units", &self.energy.calorie_units),
            ("sub_row_markers", &self.sub_row_markers),
        ];
        for (category, words) in required {
            if words.is_empty() {
                return Err(ConfigError::Vocabulary(format!("{category} cannot be empty")));
            }
        }

        let all = [
            ("carbohydrates.labels", &self.carbohydrates.labels),
            ("carbohydrates.exclusions", &self.carbohydrates.exclusions),
            ("protein.labels", &self.protein.labels),
            ("protein.exclusions", &self.protein.exclusions),
            ("fat.labels", &self.fat.labels),
            ("fat.exclusions", &self.fat.exclusions),
            ("energy.labels", &self.energy.labels),
            ("energy.calorie_units", &self.energy.calorie_units),
            ("energy.other_units", &self.energy.other_units),
            ("sub_row_markers", &self.sub_row_markers),
            ("boilerplate_headers", &self.boilerplate_headers),
        ];
        for (category, words) in all {
            for (i, word) in words.iter().enumerate() {
                if word.trim().is_empty() {
                    return Err(ConfigError::Vocabulary(format!(
                        "{category}[{i}] cannot be empty"
                    )));
                }
                if word.chars().any(|c| c.is_control()) {
                    return Err(ConfigError::Vocabulary(format!(
                        "{category}[{i}] '{word}' contains control characters"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Whether `line` is exactly one of the boilerplate headers
    pub fn is_boilerplate_header(&self, line: &str) -> bool {
        let candidate = line.trim().trim_end_matches(':').trim_end().to_lowercase();
        self.boilerplate_headers
            .iter()
            .any(|header| header.to_lowercase() == candidate)
    }
}

/// Load the vocabulary from a JSON file, falling back to the built-in one
pub fn load_vocabulary(path: impl AsRef<Path>) -> Vocabulary {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(content) => match Vocabulary::from_json_str(&content) {
            Ok(vocabulary) => {
                debug!("Loaded vocabulary from {}", path.display());
                vocabulary
            }
            Err(e) => {
                warn!(
                    "Invalid vocabulary in '{}': {}. Using built-in vocabulary.",
                    path.display(),
                    e
                );
                Vocabulary::default()
            }
        },
        Err(e) => {
            debug!(
                "No vocabulary file at '{}' ({}). Using built-in vocabulary.",
                path.display(),
                e
            );
            Vocabulary::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_vocabulary_is_valid() {
        assert!(Vocabulary::default().validate().is_ok());
    }

    #[test]
    fn test_empty_labels_rejected() {
        let mut vocabulary = Vocabulary::default();
        vocabulary.protein.labels.clear();
        let err = vocabulary.validate().unwrap_err();
        assert_eq!(
            err,
            ConfigError::Vocabulary("protein.labels cannot be empty".to_string())
        );
    }

    #[test]
    fn test_control_characters_rejected() {
        let mut vocabulary = Vocabulary::default();
        vocabulary.fat.exclusions.push("satu\u{7}".to_string());
        assert!(vocabulary.validate().is_err());
    }

    #[test]
    fn test_boilerplate_header_matching() {
        let vocabulary = Vocabulary::default();
        assert!(vocabulary.is_boilerplate_header("Valori nutrizionali"));
        assert!(vocabulary.is_boilerplate_header("  NUTRITION FACTS: "));
        assert!(!vocabulary.is_boilerplate_header("Valori nutrizionali per 100 g"));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let vocabulary = load_vocabulary("/definitely/not/here/vocabulary.json");
        assert_eq!(vocabulary, Vocabulary::default());
    }
}
