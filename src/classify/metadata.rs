//! Heuristic metadata for catalog rows.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::rules::{LabeledKeywords, MetadataRules, RuleSet};
use crate::text::{char_len, normalize_for_match};

static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(20\d{2})\b").unwrap());

/// Upper bound of the urgency score.
pub const MAX_URGENCY: u8 = 10;

/// Number of keywords kept per flyer.
const MAX_KEYWORDS: usize = 15;

/// Fields detected from a flyer's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlyerMetadata {
    pub year: Option<i32>,
    pub series: Option<String>,
    pub platform: Option<String>,
    pub promotion: Option<String>,
    pub content_category: String,
    pub tone: String,
    /// Number of urgency words present, clamped to `0..=10`.
    pub urgency: u8,
}

#[derive(Debug, Clone)]
pub struct MetadataDetector {
    rules: MetadataRules,
}

impl MetadataDetector {
    pub fn new(rules: &RuleSet) -> Self {
        Self {
            rules: rules.metadata.clone(),
        }
    }

    pub fn detect(&self, text: &str) -> FlyerMetadata {
        let folded = normalize_for_match(text);

        let year = YEAR
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok());

        let urgency = self
            .rules
            .urgency_words
            .iter()
            .filter(|w| folded.contains(w.as_str()))
            .count()
            .min(usize::from(MAX_URGENCY)) as u8;

        FlyerMetadata {
            year,
            series: first_present(&self.rules.series, &folded),
            platform: first_present(&self.rules.platforms, &folded),
            promotion: first_present(&self.rules.promotions, &folded),
            content_category: first_label(&self.rules.content_categories, &folded)
                .unwrap_or_else(|| self.rules.default_content_category.clone()),
            tone: first_label(&self.rules.tones, &folded)
                .unwrap_or_else(|| self.rules.default_tone.clone()),
            urgency,
        }
    }
}

/// Unique lowercase words longer than three characters, first fifteen, in
/// order of appearance.
pub fn keywords(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| char_len(w) > 3)
        .filter(|w| seen.insert(w.clone()))
        .take(MAX_KEYWORDS)
        .collect()
}

fn first_present(words: &[String], folded: &str) -> Option<String> {
    words.iter().find(|w| folded.contains(w.as_str())).cloned()
}

/// Label of the first table with any keyword present in `folded`.
pub(crate) fn first_label(tables: &[LabeledKeywords], folded: &str) -> Option<String> {
    tables
        .iter()
        .find(|t| t.keywords.iter().any(|k| folded.contains(k.as_str())))
        .map(|t| t.label.clone())
}
