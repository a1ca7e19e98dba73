//! Keyword-table classification.

use serde::{Deserialize, Serialize};

use super::filename::text_from_filename;
use crate::models::{Classification, MatchSource};
use crate::rules::{CategoryRule, RuleSet, SubcategoryRule};
use crate::text::{char_len, normalize_for_match};

/// How competing subcategories are resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchPolicy {
    /// First keyword hit in table declaration order.
    #[default]
    FirstMatch,
    /// Subcategory with the most distinct keyword hits; ties go to the
    /// earlier declaration.
    MostKeywords,
    /// Subcategory owning the longest matched keyword; ties go to the
    /// earlier declaration.
    LongestKeyword,
}

impl MatchPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstMatch => "first-match",
            Self::MostKeywords => "most-keywords",
            Self::LongestKeyword => "longest-keyword",
        }
    }
}

/// A subcategory hit while scanning the table.
struct Hit<'a> {
    category: &'a CategoryRule,
    subcategory: &'a SubcategoryRule,
    keyword: &'a str,
    count: usize,
}

/// Maps text to a `(category, subcategory)` pair from the rule table.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: RuleSet,
    policy: MatchPolicy,
}

impl Classifier {
    pub fn new(rules: &RuleSet, policy: MatchPolicy) -> Self {
        Self {
            rules: rules.clone(),
            policy,
        }
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Classify free text. Always returns a pair from the table.
    pub fn classify(&self, text: &str) -> Classification {
        self.match_text(text, MatchSource::Text)
            .unwrap_or_else(|| self.fallback())
    }

    /// Classify a flyer from its best OCR text, then its file name, then the
    /// folder it sits in.
    pub fn classify_flyer(
        &self,
        best_text: &str,
        file_name: &str,
        parent_dir: Option<&str>,
    ) -> Classification {
        if let Some(found) = self.match_text(best_text, MatchSource::Text) {
            return found;
        }
        if let Some(found) = self.match_text(&text_from_filename(file_name), MatchSource::Filename) {
            return found;
        }
        if let Some(found) = parent_dir.and_then(|dir| self.match_text(dir, MatchSource::Folder)) {
            return found;
        }
        self.fallback()
    }

    /// The designated catch-all pair.
    pub fn fallback(&self) -> Classification {
        let fallback = &self.rules.fallback;
        let category = self
            .rules
            .category(&fallback.category)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| fallback.category.clone());

        Classification {
            category_id: fallback.category.clone(),
            category,
            subcategory: fallback.subcategory.clone(),
            keyword: None,
            source: MatchSource::Fallback,
        }
    }

    /// Match `text` against the table, returning `None` when no keyword hits.
    pub fn match_text(&self, text: &str, source: MatchSource) -> Option<Classification> {
        let folded = normalize_for_match(text);
        if folded.is_empty() {
            return None;
        }

        let hit = match self.policy {
            MatchPolicy::FirstMatch => self.hits(&folded).next(),
            MatchPolicy::MostKeywords => self.hits(&folded).fold(None, |best: Option<Hit>, hit| {
                match best {
                    Some(b) if b.count >= hit.count => Some(b),
                    _ => Some(hit),
                }
            }),
            MatchPolicy::LongestKeyword => self.hits(&folded).fold(None, |best: Option<Hit>, hit| {
                match best {
                    Some(b) if char_len(b.keyword) >= char_len(hit.keyword) => Some(b),
                    _ => Some(hit),
                }
            }),
        }?;

        Some(Classification {
            category_id: hit.category.id.clone(),
            category: hit.category.name.clone(),
            subcategory: hit.subcategory.name.clone(),
            keyword: Some(hit.keyword.to_string()),
            source,
        })
    }

    /// Every subcategory with at least one hit, in declaration order.
    ///
    /// `keyword` is the first hit for first-match and most-keywords, and the
    /// longest hit for longest-keyword.
    fn hits<'a>(&'a self, folded: &'a str) -> impl Iterator<Item = Hit<'a>> + 'a {
        let longest = self.policy == MatchPolicy::LongestKeyword;
        self.rules.categories.iter().flat_map(move |category| {
            category.subcategories.iter().filter_map(move |subcategory| {
                let mut matched = subcategory
                    .keywords
                    .iter()
                    .filter(|k| folded.contains(k.as_str()));
                let first = matched.next()?;

                let mut keyword = first.as_str();
                let mut count = 1;
                for k in matched {
                    count += 1;
                    if longest && char_len(k) > char_len(keyword) {
                        keyword = k.as_str();
                    }
                }

                Some(Hit {
                    category,
                    subcategory,
                    keyword,
                    count,
                })
            })
        })
    }
}
