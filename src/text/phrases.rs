//! Ranks raw OCR lines by how much they look like headline copy.

use super::normalize::{char_len, collapse_whitespace, normalize_for_match};
use crate::rules::RuleSet;

const KEYWORD_POINTS: usize = 3;
const LONG_LINE_POINTS: usize = 2;
const SHOUTING_POINTS: usize = 4;
const PUNCTUATION_POINTS: usize = 1;

/// A line of raw OCR output with its score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedPhrase {
    pub text: String,
    pub score: usize,
}

#[derive(Debug, Clone)]
pub struct PhraseRanker {
    keywords: Vec<String>,
}

impl PhraseRanker {
    pub fn new(rules: &RuleSet) -> Self {
        Self {
            keywords: rules.relevance_keywords.clone(),
        }
    }

    /// Score a single line. Lines with fewer than three words score zero.
    pub fn score_line(&self, line: &str) -> usize {
        let words = line.split_whitespace().count();
        if words < 3 {
            return 0;
        }

        let folded = normalize_for_match(line);
        let mut score = KEYWORD_POINTS
            * self
                .keywords
                .iter()
                .filter(|k| folded.contains(k.as_str()))
                .count();

        if words >= 5 {
            score += LONG_LINE_POINTS;
        }
        if char_len(line) > 8 && is_all_caps(line) {
            score += SHOUTING_POINTS;
        }
        if line.contains('!') || line.contains('?') {
            score += PUNCTUATION_POINTS;
        }
        score
    }

    /// Every line with a positive score, best first. Equal scores keep
    /// their order of appearance.
    pub fn rank(&self, raw: &str) -> Vec<RankedPhrase> {
        let mut ranked: Vec<RankedPhrase> = raw
            .lines()
            .map(collapse_whitespace)
            .filter_map(|text| {
                let score = self.score_line(&text);
                (score > 0).then_some(RankedPhrase { text, score })
            })
            .collect();
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked
    }

    /// The `n` best lines joined with a space.
    pub fn top(&self, raw: &str, n: usize) -> String {
        self.rank(raw)
            .into_iter()
            .take(n)
            .map(|p| p.text)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn is_all_caps(line: &str) -> bool {
    let mut letters = line.chars().filter(|c| c.is_alphabetic()).peekable();
    letters.peek().is_some() && letters.all(|c| !c.is_lowercase())
}
