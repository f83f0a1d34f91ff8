//! # Macro Extractor Module
//!
//! Configures the value locator for carbohydrates, protein and fat from the
//! vocabulary, and applies the dedicated energy-line policy for calories.

use crate::errors::ConfigError;
use crate::nutrition_patterns::{
    keyword_alternation, parse_first_number, parse_number, KeywordBoundary, KeywordPattern,
    NUMBER_PAIR_REGEX, NUMBER_PATTERN,
};
use crate::nutrition_types::{LocateStrategy, LocatedValue, MacroExtraction, MacroKey};
use crate::text_processing::{LineIndex, Lookahead};
use crate::value_locator::{LineMarkers, MacroRule, ValueLocator};
use crate::vocabulary::{MacroVocabulary, Vocabulary};
use log::{debug, trace};
use regex::Regex;

/// Extracts the four per-100 quantities from one transcription
#[derive(Debug, Clone)]
pub struct MacroExtractor {
    carbohydrates: MacroRule,
    protein: MacroRule,
    fat: MacroRule,
    markers: LineMarkers,
    calorie_units: KeywordPattern,
    other_energy_units: Option<KeywordPattern>,
    calorie_figure: Regex,
    unit_pair: Regex,
}

fn optional_pattern(keywords: &[String]) -> Result<Option<KeywordPattern>, ConfigError> {
    if keywords.is_empty() {
        Ok(None)
    } else {
        KeywordPattern::from_keywords(keywords, KeywordBoundary::Word).map(Some)
    }
}

fn build_rule(
    key: MacroKey,
    own: &MacroVocabulary,
    others: [&MacroVocabulary; 2],
) -> Result<MacroRule, ConfigError> {
    let label = KeywordPattern::from_keywords(&own.labels, KeywordBoundary::Word)?;
    let exclusion = optional_pattern(&own.exclusions)?;
    let other_labels: Vec<String> = others
        .iter()
        .flat_map(|vocab| vocab.labels.iter().cloned())
        .collect();
    let boundary = optional_pattern(&other_labels)?;
    MacroRule::new(key, label, exclusion, boundary)
}

impl MacroExtractor {
    /// Compile rules and markers from a vocabulary
    pub fn new(vocabulary: &Vocabulary) -> Result<Self, ConfigError> {
        let carbs = &vocabulary.carbohydrates;
        let protein = &vocabulary.protein;
        let fat = &vocabulary.fat;

        let markers = LineMarkers {
            sub_row: KeywordPattern::from_keywords(
                &vocabulary.sub_row_markers,
                KeywordBoundary::Word,
            )?,
            energy_labels: KeywordPattern::from_keywords(
                &vocabulary.energy.labels,
                KeywordBoundary::Word,
            )?,
            energy_units: KeywordPattern::from_keywords(
                &[
                    vocabulary.energy.calorie_units.as_slice(),
                    vocabulary.energy.other_units.as_slice(),
                ]
                .concat(),
                KeywordBoundary::Substring,
            )?,
        };

        let calorie_units = KeywordPattern::from_keywords(
            &vocabulary.energy.calorie_units,
            KeywordBoundary::Substring,
        )?;
        let other_energy_units = if vocabulary.energy.other_units.is_empty() {
            None
        } else {
            Some(KeywordPattern::from_keywords(
                &vocabulary.energy.other_units,
                KeywordBoundary::Substring,
            )?)
        };
        let all_units = [
            vocabulary.energy.calorie_units.as_slice(),
            vocabulary.energy.other_units.as_slice(),
        ]
        .concat();
        let unit_pair = Regex::new(&format!(
            r"(?i)(?P<first>{units})\s*/\s*(?P<second>{units})",
            units = keyword_alternation(&all_units, KeywordBoundary::Substring)
        ))?;
        let calorie_figure = Regex::new(&format!(
            r"(?i)(?P<value>{})\s*(?:{})",
            NUMBER_PATTERN,
            keyword_alternation(&vocabulary.energy.calorie_units, KeywordBoundary::Substring)
        ))?;

        Ok(Self {
            carbohydrates: build_rule(MacroKey::Carbohydrates, carbs, [protein, fat])?,
            protein: build_rule(MacroKey::Protein, protein, [carbs, fat])?,
            fat: build_rule(MacroKey::Fat, fat, [carbs, protein])?,
            markers,
            calorie_units,
            other_energy_units,
            calorie_figure,
            unit_pair,
        })
    }

    pub fn markers(&self) -> &LineMarkers {
        &self.markers
    }

    /// Rule used for a macro nutrient; calories have their own policy
    pub fn rule(&self, key: MacroKey) -> Option<&MacroRule> {
        match key {
            MacroKey::Carbohydrates => Some(&self.carbohydrates),
            MacroKey::Protein => Some(&self.protein),
            MacroKey::Fat => Some(&self.fat),
            MacroKey::Calories => None,
        }
    }

    /// Run every lookup against one transcription
    pub fn extract(&self, locator: &ValueLocator<'_>) -> MacroExtraction {
        let calories = self
            .locate_energy(locator.section_lines())
            .or_else(|| {
                locator
                    .section()
                    .is_isolated()
                    .then(|| self.locate_energy(locator.full_lines()))
                    .flatten()
            })
            .map(|value| LocatedValue {
                value,
                strategy: LocateStrategy::EnergyLine,
            });
        if let Some(found) = calories {
            debug!("Located {} = {}", MacroKey::Calories, found.value);
        }

        MacroExtraction {
            carbohydrates: locator.locate(&self.carbohydrates),
            protein: locator.locate(&self.protein),
            fat: locator.locate(&self.fat),
            calories,
        }
    }

    /// Energy policy over one line sequence
    ///
    /// Candidates are lines carrying a calorie unit. A candidate that also carries
    /// an energy label ("energia") wins; its figure is on the line or on the next
    /// one, since OCR often splits "Energia" and "<value> kcal". Without such a
    /// candidate, the first calorie line with a figure on it or right after it wins.
    /// Last, a bare number line right above a calorie line is taken.
    pub fn locate_energy(&self, lines: &LineIndex) -> Option<f64> {
        let candidates: Vec<(usize, &str)> = lines
            .iter()
            .filter(|(_, line)| self.calorie_units.is_match(line))
            .collect();
        trace!("{} calorie line candidates", candidates.len());

        let labelled = candidates
            .iter()
            .filter(|(_, line)| self.markers.energy_labels.is_match(line))
            .find_map(|&(index, line)| self.figure_on_or_after(lines, index, line));

        labelled
            .or_else(|| {
                candidates
                    .iter()
                    .find_map(|&(index, line)| self.figure_on_or_after(lines, index, line))
            })
            .or_else(|| {
                candidates.iter().find_map(|&(index, _)| {
                    lines.lookbehind(index, 1, |previous| match parse_number(previous) {
                        Some(value) => Lookahead::Found(value),
                        None => Lookahead::Stop,
                    })
                })
            })
    }

    fn figure_on_or_after(&self, lines: &LineIndex, index: usize, line: &str) -> Option<f64> {
        self.calorie_figure(line).or_else(|| {
            let next = lines.get(index + 1)?;
            if self.reports_other_unit_only(next) {
                return None;
            }
            // "energia kj/kcal" above "1046/250"
            self.calorie_position(line)
                .and_then(|position| number_pair(next).map(|pair| pair[position]))
                .or_else(|| self.calorie_figure(next))
        })
    }

    /// The figure paired with the calorie unit
    ///
    /// With a unit pair ("kj/kcal 1046/250", "1046/250 kj/kcal") the figure at the
    /// calorie unit's position wins. Otherwise the number right before the calorie
    /// unit, else the first number on the line.
    fn calorie_figure(&self, line: &str) -> Option<f64> {
        if let (Some(position), Some(pair)) = (self.calorie_position(line), number_pair(line)) {
            trace!("Calorie figure taken from unit pair in '{}'", line);
            return Some(pair[position]);
        }
        self.calorie_figure
            .captures_iter(line)
            .find_map(|caps| caps.name("value").and_then(|m| parse_number(m.as_str())))
            .or_else(|| parse_first_number(line))
    }

    /// Index of the calorie unit within a "kj/kcal" style unit pair
    fn calorie_position(&self, line: &str) -> Option<usize> {
        let caps = self.unit_pair.captures(line)?;
        ["first", "second"]
            .iter()
            .position(|name| {
                caps.name(name)
                    .is_some_and(|unit| self.calorie_units.is_prefix_of(unit.as_str()))
            })
    }

    fn reports_other_unit_only(&self, line: &str) -> bool {
        !self.calorie_units.is_match(line)
            && self
                .other_energy_units
                .as_ref()
                .is_some_and(|units| units.is_match(line))
    }
}

/// Both figures of a "1046/250" pair, in order
fn number_pair(line: &str) -> Option<[f64; 2]> {
    let caps = NUMBER_PAIR_REGEX.captures(line)?;
    let first = parse_number(caps.name("first")?.as_str())?;
    let second = parse_number(caps.name("second")?.as_str())?;
    Some([first, second])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> MacroExtractor {
        MacroExtractor::new(&Vocabulary::default()).unwrap()
    }

    #[test]
    fn test_energy_prefers_labelled_line() {
        let lines = LineIndex::new("100 kcal per porzione\nenergia 1046 kj / 250 kcal");
        assert_eq!(extractor().locate_energy(&lines), Some(250.0));
    }

    #[test]
    fn test_energy_value_on_next_line() {
        let lines = LineIndex::new("energia kcal\n68,0");
        assert_eq!(extractor().locate_energy(&lines), Some(68.0));
    }

    #[test]
    fn test_energy_fallback_to_bare_unit_line() {
        let lines = LineIndex::new("energia\nkcal\n68.0");
        assert_eq!(extractor().locate_energy(&lines), Some(68.0));
    }

    #[test]
    fn test_energy_ignores_kj_only_next_line() {
        let lines = LineIndex::new("kcal\n1046 kj");
        assert_eq!(extractor().locate_energy(&lines), None);
    }

    #[test]
    fn test_energy_figure_above_unit_line() {
        let lines = LineIndex::new("energia\n250\nkcal");
        assert_eq!(extractor().locate_energy(&lines), Some(250.0));

        let lines = LineIndex::new("grassi 10 g\nkcal");
        assert_eq!(extractor().locate_energy(&lines), None);
    }

    #[test]
    fn test_energy_unit_pair_picks_calorie_column() {
        for text in [
            "energia kj/kcal 1046/250",
            "energia 1046/250 kj/kcal",
            "energy kcal / kj 250 / 1046",
            "energia kj/kcal\n1046/250",
        ] {
            let lines = LineIndex::new(text);
            assert_eq!(extractor().locate_energy(&lines), Some(250.0), "{text}");
        }
    }

    #[test]
    fn test_no_calorie_line() {
        let lines = LineIndex::new("energia 1046 kj");
        assert_eq!(extractor().locate_energy(&lines), None);
    }

    #[test]
    fn test_rules_exist_for_macros_only() {
        let extractor = extractor();
        assert!(extractor.rule(MacroKey::Carbohydrates).is_some());
        assert!(extractor.rule(MacroKey::Calories).is_none());
    }
}
