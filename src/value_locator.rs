//! # Value Locator Module
//!
//! Finds the single most plausible number for a label, trying strategies in
//! strict priority order and returning on the first hit:
//!
//! 1. Label immediately followed by a number, in the isolated section
//! 2. The same, in the full text
//! 3. A number within a bounded span after the label (section, then full text)
//! 4. A line scan: the label line, then a bounded lookahead over following lines
//!
//! Sub-rows ("di cui", "of which") and caller-supplied exclusions ("zuccheri" for
//! carbohydrates, "saturi" for fat) never provide the value.

use crate::errors::ConfigError;
use crate::nutrition_patterns::{parse_number, KeywordPattern, NUMBER_PATTERN, NUMBER_REGEX};
use crate::nutrition_types::{LocateStrategy, LocatedValue, MacroKey};
use crate::parser_config::ParserConfig;
use crate::text_processing::{flatten, line_starts, LineIndex, Lookahead, Section};
use log::{debug, trace};
use regex::Regex;

/// Label and exclusion configuration for one lookup
#[derive(Debug, Clone)]
pub struct MacroRule {
    key: MacroKey,
    label: KeywordPattern,
    exclusion: Option<KeywordPattern>,
    boundary: Option<KeywordPattern>,
    inline: Regex,
}

impl MacroRule {
    /// Build a rule
    ///
    /// `exclusion` disqualifies lines (sub-nutrients of this macro), `boundary`
    /// marks rows of other macros that a scan must not run into.
    pub fn new(
        key: MacroKey,
        label: KeywordPattern,
        exclusion: Option<KeywordPattern>,
        boundary: Option<KeywordPattern>,
    ) -> Result<Self, ConfigError> {
        let inline = Regex::new(&format!(
            r"(?i)(?P<label>{})\s*:?\s*(?P<value>{})",
            label.alternation(),
            NUMBER_PATTERN
        ))?;
        Ok(Self {
            key,
            label,
            exclusion,
            boundary,
            inline,
        })
    }

    pub fn key(&self) -> MacroKey {
        self.key
    }

    pub fn label(&self) -> &KeywordPattern {
        &self.label
    }

    fn is_excluded(&self, text: &str) -> bool {
        self.exclusion.as_ref().is_some_and(|e| e.is_match(text))
    }

    fn exclusion_spans(&self, text: &str) -> Vec<(usize, usize)> {
        self.exclusion
            .as_ref()
            .map(|e| keyword_spans(e, text))
            .unwrap_or_default()
    }

    fn crosses_boundary(&self, text: &str) -> bool {
        self.boundary.as_ref().is_some_and(|b| b.is_match(text))
    }
}

/// Markers shared by every lookup
#[derive(Debug, Clone)]
pub struct LineMarkers {
    /// "di cui", "of which"
    pub sub_row: KeywordPattern,
    /// "energia", "energy"
    pub energy_labels: KeywordPattern,
    /// "kcal", "kj"; matched inside words so "250kcal" counts
    pub energy_units: KeywordPattern,
}

impl LineMarkers {
    /// Whether the line reports energy rather than a mass
    pub fn is_energy_line(&self, line: &str) -> bool {
        self.energy_units.is_match(line) || self.energy_labels.is_match(line)
    }
}

/// Keyword occurrences as `(start, end)` byte spans, left to right
fn keyword_spans(pattern: &KeywordPattern, text: &str) -> Vec<(usize, usize)> {
    pattern.find_iter(text).map(|m| (m.start(), m.end())).collect()
}

/// Whether one of the sorted, non-overlapping `spans` lies inside `from..to`
fn span_within(spans: &[(usize, usize)], from: usize, to: usize) -> bool {
    let before = spans.partition_point(|&(_, end)| end <= to);
    before > 0 && spans[before - 1].0 >= from
}

/// Normalized text prepared for offset-based matching
///
/// `flat` has the line breaks of `text` replaced by spaces, so offsets are shared.
/// Line starts and sub-row marker spans are computed once, keeping label checks
/// logarithmic in the length of the text.
struct FlatText<'a> {
    text: &'a str,
    flat: String,
    line_starts: Vec<usize>,
    sub_rows: Vec<(usize, usize)>,
}

impl<'a> FlatText<'a> {
    fn new(text: &'a str, markers: &LineMarkers) -> Self {
        Self {
            text,
            flat: flatten(text),
            line_starts: line_starts(text),
            sub_rows: keyword_spans(&markers.sub_row, text),
        }
    }

    /// Start of the line holding byte `offset`
    fn line_start(&self, offset: usize) -> usize {
        let line = self.line_starts.partition_point(|&start| start <= offset);
        self.line_starts[line.saturating_sub(1)]
    }
}

/// Layered lookup over one normalized transcription
pub struct ValueLocator<'a> {
    section: Section<'a>,
    section_text: FlatText<'a>,
    full_text: FlatText<'a>,
    section_lines: &'a LineIndex,
    full_lines: &'a LineIndex,
    markers: &'a LineMarkers,
    lookahead_lines: usize,
    proximity_span: usize,
}

impl<'a> ValueLocator<'a> {
    pub fn new(
        section: Section<'a>,
        full_text: &'a str,
        section_lines: &'a LineIndex,
        full_lines: &'a LineIndex,
        markers: &'a LineMarkers,
        config: &ParserConfig,
    ) -> Self {
        Self {
            section,
            section_text: FlatText::new(section.text(), markers),
            full_text: FlatText::new(full_text, markers),
            section_lines,
            full_lines,
            markers,
            lookahead_lines: config.lookahead_lines,
            proximity_span: config.proximity_span,
        }
    }

    pub fn section(&self) -> Section<'a> {
        self.section
    }

    pub fn section_lines(&self) -> &'a LineIndex {
        self.section_lines
    }

    pub fn full_lines(&self) -> &'a LineIndex {
        self.full_lines
    }

    /// Best-guess value for `rule`, or `None`
    pub fn locate(&self, rule: &MacroRule) -> Option<LocatedValue> {
        let isolated = self.section.is_isolated();

        let located = self
            .inline(rule, &self.section_text)
            .map(|v| (v, LocateStrategy::InlineSection))
            .or_else(|| {
                isolated
                    .then(|| self.inline(rule, &self.full_text))
                    .flatten()
                    .map(|v| (v, LocateStrategy::InlineFull))
            })
            .or_else(|| {
                self.proximity(rule, &self.section_text)
                    .or_else(|| {
                        isolated
                            .then(|| self.proximity(rule, &self.full_text))
                            .flatten()
                    })
                    .map(|v| (v, LocateStrategy::Proximity))
            })
            .or_else(|| {
                self.line_scan(rule, self.section_lines)
                    .or_else(|| isolated.then(|| self.line_scan(rule, self.full_lines)).flatten())
                    .map(|v| (v, LocateStrategy::LineScan))
            });

        match located {
            Some((value, strategy)) => {
                debug!("Located {} = {} via {:?}", rule.key, value, strategy);
                Some(LocatedValue { value, strategy })
            }
            None => {
                debug!("No value located for {}", rule.key);
                None
            }
        }
    }

    /// Label directly followed by a number (optional colon and whitespace)
    fn inline(&self, rule: &MacroRule, text: &FlatText<'_>) -> Option<f64> {
        let flat = text.flat.as_str();
        let exclusions = rule.exclusion_spans(text.text);
        for caps in rule.inline.captures_iter(flat) {
            let (Some(label), Some(value)) = (caps.name("label"), caps.name("value")) else {
                continue;
            };
            if label_disqualified(text, &exclusions, label.start()) {
                trace!("Inline match for {} sits on a sub-row, skipped", rule.key);
                continue;
            }
            if self.followed_by_energy_unit(flat, value.end()) {
                continue;
            }
            if let Some(v) = parse_number(value.as_str()) {
                return Some(v);
            }
        }
        None
    }

    /// First number within the proximity span after the label
    ///
    /// The span is cut at the first sub-row marker, exclusion, energy keyword or
    /// label of another macro.
    fn proximity(&self, rule: &MacroRule, text: &FlatText<'_>) -> Option<f64> {
        let flat = text.flat.as_str();
        let exclusions = rule.exclusion_spans(text.text);
        for label in rule.label.find_iter(flat) {
            if label_disqualified(text, &exclusions, label.start()) {
                continue;
            }

            let start = label.end();
            let end = flat[start..]
                .char_indices()
                .nth(self.proximity_span)
                .map(|(i, _)| start + i)
                .unwrap_or(flat.len());
            let mut window = &flat[start..end];
            if let Some(cut) = self.stop_offset(rule, window) {
                window = &window[..cut];
            }

            for number in NUMBER_REGEX.find_iter(window) {
                if self.followed_by_energy_unit(flat, start + number.end()) {
                    continue;
                }
                if let Some(v) = parse_number(number.as_str()) {
                    trace!("Proximity match for {}: '{}'", rule.key, window.trim());
                    return Some(v);
                }
            }
        }
        None
    }

    /// Label line, then a bounded forward scan for the value line
    fn line_scan(&self, rule: &MacroRule, lines: &LineIndex) -> Option<f64> {
        for (index, line) in lines.iter() {
            if self.markers.sub_row.is_match(line) || rule.is_excluded(line) {
                continue;
            }
            let Some(label) = rule.label.find(line) else {
                continue;
            };

            let mut rest = &line[label.end()..];
            if let Some(cut) = self.stop_offset(rule, rest) {
                rest = &rest[..cut];
            }
            if let Some(v) = self.first_mass_number(rest) {
                return Some(v);
            }

            let mut pending_sub_row = false;
            let found = lines.lookahead(index, self.lookahead_lines, |next| {
                self.classify_following(rule, next, &mut pending_sub_row)
            });
            if found.is_some() {
                return found;
            }
        }
        None
    }

    /// Decide what a line after a value-less label line means for `rule`
    ///
    /// `pending_sub_row` is set by a sub-nutrient row without a figure: the next
    /// number line belongs to that row, not to the parent.
    fn classify_following(
        &self,
        rule: &MacroRule,
        line: &str,
        pending_sub_row: &mut bool,
    ) -> Lookahead<f64> {
        let excluded = rule.is_excluded(line);
        if self.markers.sub_row.is_match(line) && !excluded {
            // Another block's sub-row: the parent's value is not coming
            return Lookahead::Stop;
        }
        if excluded {
            *pending_sub_row = self.first_mass_number(line).is_none();
            return Lookahead::Continue;
        }
        if rule.key != MacroKey::Calories && self.markers.is_energy_line(line) {
            return Lookahead::Continue;
        }
        if rule.crosses_boundary(line) {
            return Lookahead::Stop;
        }
        match self.first_mass_number(line) {
            Some(_) if *pending_sub_row => {
                trace!("'{}' belongs to the preceding sub-row of {}", line, rule.key);
                *pending_sub_row = false;
                Lookahead::Continue
            }
            Some(v) => Lookahead::Found(v),
            None => Lookahead::Continue,
        }
    }

    /// Offset of the first keyword that ends a proximity window
    fn stop_offset(&self, rule: &MacroRule, window: &str) -> Option<usize> {
        [
            Some(&self.markers.sub_row),
            Some(&self.markers.energy_labels),
            Some(&self.markers.energy_units),
            rule.exclusion.as_ref(),
            rule.boundary.as_ref(),
        ]
        .into_iter()
        .flatten()
        .filter_map(|pattern| pattern.find(window).map(|m| m.start()))
        .min()
    }

    fn followed_by_energy_unit(&self, text: &str, offset: usize) -> bool {
        text.get(offset..)
            .is_some_and(|rest| self.markers.energy_units.is_prefix_of(rest.trim_start()))
    }

    /// First number in `text` that is not an energy figure
    fn first_mass_number(&self, text: &str) -> Option<f64> {
        NUMBER_REGEX
            .find_iter(text)
            .filter(|m| !self.followed_by_energy_unit(text, m.end()))
            .find_map(|m| parse_number(m.as_str()))
    }
}

/// Whether the line text before the label marks it as a sub-row or excluded row
fn label_disqualified(
    text: &FlatText<'_>,
    exclusions: &[(usize, usize)],
    label_start: usize,
) -> bool {
    let line_start = text.line_start(label_start);
    span_within(&text.sub_rows, line_start, label_start)
        || span_within(exclusions, line_start, label_start)
}
