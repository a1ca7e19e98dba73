//! Filename generation from a classification and extracted text.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::Classification;
use crate::rules::RuleSet;
use crate::text::{char_len, normalize_for_match, strip_accents};

/// Collision suffixes added by the mover: ` (3)` or `_3`.
static COLLISION_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?: \(\d+\)|_\d+)$").unwrap());

/// Stem used when neither the classification nor the text yields a token.
const EMPTY_STEM: &str = "flyer";

/// Which classification label opens the file name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadToken {
    #[default]
    Subcategory,
    Category,
    Both,
}

/// Which text feeds the descriptive part of the name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameText {
    /// The cleaned text of the winning OCR attempt.
    #[default]
    Cleaned,
    /// The best-ranked headline lines of its raw text.
    Phrases,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingOptions {
    /// Longest stem, in characters, extension excluded.
    pub max_chars: usize,
    pub separator: String,
    pub lead: LeadToken,
    /// Fold accented letters to ASCII.
    pub ascii: bool,
    pub text: NameText,
}

impl Default for NamingOptions {
    fn default() -> Self {
        Self {
            max_chars: 80,
            separator: "_".to_string(),
            lead: LeadToken::Subcategory,
            ascii: true,
            text: NameText::Cleaned,
        }
    }
}

/// Builds sanitized, length-capped file names.
///
/// Output depends only on the inputs and the options, so generating twice
/// always yields the same name.
#[derive(Debug, Clone)]
pub struct FilenameGenerator {
    options: NamingOptions,
    stopwords: HashSet<String>,
    /// Every lead this generator can produce from the rule table.
    leads: Vec<String>,
}

impl FilenameGenerator {
    pub fn new(options: NamingOptions, rules: &RuleSet) -> Self {
        let stopwords = rules.stopwords.iter().cloned().collect();
        let mut generator = Self {
            options,
            stopwords,
            leads: Vec::new(),
        };

        let mut leads = Vec::new();
        for category in &rules.categories {
            let category_lead = generator.join(&generator.tokenize(&category.name));
            for sub in &category.subcategories {
                let sub_lead = generator.join(&generator.tokenize(&sub.name));
                leads.push(format!("{}{}{}", category_lead, generator.options.separator, sub_lead));
                leads.push(sub_lead);
            }
            leads.push(category_lead);
        }
        leads.retain(|l| !l.is_empty());
        leads.sort_by_key(|l| std::cmp::Reverse(l.len()));
        leads.dedup();
        generator.leads = leads;

        generator
    }

    pub fn options(&self) -> &NamingOptions {
        &self.options
    }

    /// Build `lead_text-tokens.ext` for a classified flyer.
    pub fn generate(&self, classification: &Classification, text: &str, extension: &str) -> String {
        let mut tokens = self.lead_tokens(classification);
        let mut seen: HashSet<String> = tokens.iter().cloned().collect();

        for token in self.tokenize(text) {
            if self.stopwords.contains(&normalize_for_match(&token)) {
                continue;
            }
            if seen.insert(token.clone()) {
                tokens.push(token);
            }
        }

        let mut stem = self.cap(&tokens);
        if stem.is_empty() {
            stem = EMPTY_STEM.to_string();
        }

        let extension = extension.trim_start_matches('.').to_lowercase();
        if extension.is_empty() {
            stem
        } else {
            format!("{}.{}", stem, extension)
        }
    }

    /// True when `stem` already looks like something [`generate`](Self::generate)
    /// produced, with or without a collision suffix.
    pub fn is_generated(&self, stem: &str) -> bool {
        let base = COLLISION_SUFFIX.replace(stem, "");
        let sep = self.options.separator.as_str();

        let shaped = !base.is_empty()
            && base.chars().all(|c| {
                (c.is_alphanumeric() && !c.is_uppercase())
                    || c == '-'
                    || sep.contains(c)
            })
            && (!self.options.ascii || base.is_ascii());
        if !shaped {
            return false;
        }

        self.leads.iter().any(|lead| {
            base.strip_prefix(lead.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with(sep))
        })
    }

    fn lead_tokens(&self, classification: &Classification) -> Vec<String> {
        let mut tokens = Vec::new();
        if matches!(self.options.lead, LeadToken::Category | LeadToken::Both) {
            tokens.extend(self.tokenize(&classification.category));
        }
        if matches!(self.options.lead, LeadToken::Subcategory | LeadToken::Both) {
            tokens.extend(self.tokenize(&classification.subcategory));
        }
        tokens
    }

    /// Lowercase, optionally fold accents, and split on anything that is not
    /// a letter, digit or hyphen.
    fn tokenize(&self, text: &str) -> Vec<String> {
        let folded = if self.options.ascii {
            strip_accents(text)
        } else {
            text.to_string()
        };

        folded
            .to_lowercase()
            .split(|c: char| !(c.is_alphanumeric() || c == '-'))
            .map(|t| t.trim_matches('-'))
            .filter(|t| !t.is_empty())
            .filter(|t| !self.options.ascii || t.is_ascii())
            .map(String::from)
            .collect()
    }

    fn join(&self, tokens: &[String]) -> String {
        tokens.join(&self.options.separator)
    }

    /// Join tokens, stopping before the first one that would exceed the cap.
    /// A single over-long first token is cut at the character limit.
    fn cap(&self, tokens: &[String]) -> String {
        let max = self.options.max_chars;
        let sep_len = char_len(&self.options.separator);
        let mut out = String::new();
        let mut len = 0;

        for token in tokens {
            let token_len = char_len(token);
            if out.is_empty() {
                if token_len > max {
                    return token.chars().take(max).collect();
                }
                out.push_str(token);
                len = token_len;
                continue;
            }
            if len + sep_len + token_len > max {
                break;
            }
            out.push_str(&self.options.separator);
            out.push_str(token);
            len += sep_len + token_len;
        }

        out
    }
}
