//! Deterministic cleanup of raw OCR output.

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::normalize::{char_len, collapse_whitespace, strip_accents};
use crate::rules::{RuleSet, RulesError};

/// Characters that cannot appear in a filename on common filesystems.
const ILLEGAL_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

const ELLIPSIS: &str = "...";

/// Tuning knobs for [`TextCleaner`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerOptions {
    /// Longest cleaned text, in characters, before truncation kicks in.
    pub max_chars: usize,
    /// Word budget kept when truncating.
    pub max_words: usize,
    /// Tokens shorter than this are dropped.
    pub min_token_chars: usize,
    /// Fold accented letters to their base letter.
    pub strip_accents: bool,
}

impl Default for CleanerOptions {
    fn default() -> Self {
        Self {
            max_chars: 150,
            max_words: 20,
            min_token_chars: 2,
            strip_accents: false,
        }
    }
}

/// Regex pipeline that turns raw OCR text into short, filename-safe copy.
///
/// The output never has more characters than the input: every step either
/// removes characters or replaces one run of whitespace with a single space,
/// and truncation only happens when the text is over budget.
#[derive(Debug, Clone)]
pub struct TextCleaner {
    options: CleanerOptions,
    junk: Vec<Regex>,
}

impl TextCleaner {
    /// Build a cleaner using the junk rules from `rules`.
    pub fn new(options: CleanerOptions, rules: &RuleSet) -> Result<Self, RulesError> {
        Ok(Self::with_patterns(options, rules.compile_junk_patterns()?))
    }

    /// Build a cleaner from already compiled junk patterns.
    pub fn with_patterns(options: CleanerOptions, junk: Vec<Regex>) -> Self {
        Self { options, junk }
    }

    pub fn options(&self) -> &CleanerOptions {
        &self.options
    }

    /// Clean `text`.
    pub fn clean(&self, text: &str) -> String {
        let stripped: String = text.chars().filter(|c| !ILLEGAL_CHARS.contains(c)).collect();
        let mut cleaned = collapse_whitespace(&stripped);

        if self.options.strip_accents {
            cleaned = strip_accents(&cleaned);
        }

        let kept: Vec<&str> = cleaned
            .split(' ')
            .filter(|token| !token.is_empty() && !self.is_junk(token))
            .collect();
        let joined = kept.join(" ");

        self.truncate(joined)
    }

    fn is_junk(&self, token: &str) -> bool {
        char_len(token) < self.options.min_token_chars
            || self.junk.iter().any(|re| re.is_match(token))
    }

    /// Cut over-long text to at most `max_words` words and `max_chars`
    /// characters, marking the cut with an ellipsis.
    fn truncate(&self, text: String) -> String {
        let max_chars = self.options.max_chars;
        if char_len(&text) <= max_chars {
            return text;
        }

        let ellipsis_len = char_len(ELLIPSIS);
        if max_chars <= ellipsis_len {
            return text.chars().take(max_chars).collect();
        }

        let budget = max_chars - ellipsis_len;
        let mut out = String::new();
        let mut out_len = 0;
        for word in text.split(' ').take(self.options.max_words) {
            let sep = usize::from(!out.is_empty());
            let word_len = char_len(word);
            if out_len + sep + word_len > budget {
                break;
            }
            if sep == 1 {
                out.push(' ');
            }
            out.push_str(word);
            out_len += sep + word_len;
        }

        if out.is_empty() {
            out = text.chars().take(budget).collect();
        }

        out.push_str(ELLIPSIS);
        out
    }
}
