//! Picks the best text among several OCR attempts.

use serde::{Deserialize, Serialize};

use super::normalize::{char_len, normalize_for_match};
use crate::models::ExtractionAttempt;
use crate::rules::RuleSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionOptions {
    /// Cleaned text shorter than this (in characters) is not usable.
    pub min_chars: usize,
    /// Points added per distinct relevance keyword found.
    pub keyword_bonus: usize,
}

impl Default for SelectionOptions {
    fn default() -> Self {
        Self {
            min_chars: 10,
            keyword_bonus: 5,
        }
    }
}

/// Scores cleaned candidates by length plus a relevance bonus.
#[derive(Debug, Clone)]
pub struct CandidateSelector {
    options: SelectionOptions,
    keywords: Vec<String>,
}

impl CandidateSelector {
    pub fn new(options: SelectionOptions, rules: &RuleSet) -> Self {
        Self {
            options,
            keywords: rules.relevance_keywords.clone(),
        }
    }

    /// Score a cleaned candidate. Unusable candidates score zero.
    pub fn score(&self, cleaned: &str) -> usize {
        let len = char_len(cleaned);
        if len == 0 || len < self.options.min_chars {
            return 0;
        }
        len + self.options.keyword_bonus * self.keyword_hits(cleaned)
    }

    /// Number of distinct relevance keywords present in `text`.
    pub fn keyword_hits(&self, text: &str) -> usize {
        let folded = normalize_for_match(text);
        self.keywords
            .iter()
            .filter(|k| folded.contains(k.as_str()))
            .count()
    }

    /// Fill in the score of every attempt.
    pub fn score_attempts(&self, attempts: &mut [ExtractionAttempt]) {
        for attempt in attempts.iter_mut() {
            attempt.score = self.score(&attempt.cleaned_text);
        }
    }

    /// Index of the winning attempt: the first one holding the maximum
    /// positive score. `None` when nothing is usable.
    pub fn select_index(&self, attempts: &[ExtractionAttempt]) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;
        for (i, attempt) in attempts.iter().enumerate() {
            let score = self.score(&attempt.cleaned_text);
            if score == 0 {
                continue;
            }
            match best {
                Some((_, best_score)) if best_score >= score => {}
                _ => best = Some((i, score)),
            }
        }
        best.map(|(i, _)| i)
    }

    /// The winning attempt, if any.
    pub fn select<'a>(&self, attempts: &'a [ExtractionAttempt]) -> Option<&'a ExtractionAttempt> {
        self.select_index(attempts).map(|i| &attempts[i])
    }

    /// The winning cleaned text, or an empty string.
    pub fn best_text(&self, attempts: &[ExtractionAttempt]) -> String {
        self.select(attempts)
            .map(|a| a.cleaned_text.clone())
            .unwrap_or_default()
    }
}
