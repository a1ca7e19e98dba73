//! Data-driven keyword tables.
//!
//! Category tables, relevance keywords, junk rules and the metadata and
//! calendar heuristics all live in a versioned TOML document. The default
//! document is compiled into the binary; a user file can replace it.

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::text::normalize_for_match;

/// The rule document shipped with the crate.
pub const DEFAULT_RULES: &str = include_str!("../rules/default.toml");

/// Errors raised while loading or validating a rule set.
#[derive(Debug, Error)]
pub enum RulesError {
    #[error("Failed to read rules file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse rules: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize rules: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid junk pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid rules: {0}")]
    Invalid(String),
}

/// A full rule document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    /// Document version, bumped whenever tables change meaning.
    pub version: u32,
    /// Words that make an OCR candidate more likely to be real flyer copy.
    #[serde(default)]
    pub relevance_keywords: Vec<String>,
    /// Words left out of generated filenames.
    #[serde(default)]
    pub stopwords: Vec<String>,
    /// Anchored regexes; a token matching any of them is dropped by the cleaner.
    #[serde(default)]
    pub junk_patterns: Vec<String>,
    /// Where unmatched input lands.
    pub fallback: FallbackRule,
    /// Ordered category table.
    pub categories: Vec<CategoryRule>,
    #[serde(default)]
    pub metadata: MetadataRules,
    #[serde(default)]
    pub calendar: CalendarRules,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackRule {
    pub category: String,
    pub subcategory: String,
}

/// A top-level category and its ordered subcategories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRule {
    /// Folder-style identifier, e.g. `01_Esportes`.
    pub id: String,
    /// Display name, e.g. `Esportes`.
    pub name: String,
    pub subcategories: Vec<SubcategoryRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubcategoryRule {
    pub name: String,
    pub keywords: Vec<String>,
}

/// A label chosen when any of its keywords is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledKeywords {
    pub label: String,
    pub keywords: Vec<String>,
}

/// Tables for catalog metadata detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataRules {
    #[serde(default)]
    pub series: Vec<String>,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub promotions: Vec<String>,
    #[serde(default)]
    pub urgency_words: Vec<String>,
    #[serde(default = "default_content_category")]
    pub default_content_category: String,
    #[serde(default = "default_tone")]
    pub default_tone: String,
    #[serde(default)]
    pub content_categories: Vec<LabeledKeywords>,
    #[serde(default)]
    pub tones: Vec<LabeledKeywords>,
}

fn default_content_category() -> String {
    "geral".to_string()
}

fn default_tone() -> String {
    "neutro".to_string()
}

impl Default for MetadataRules {
    fn default() -> Self {
        Self {
            series: Vec::new(),
            platforms: Vec::new(),
            promotions: Vec::new(),
            urgency_words: Vec::new(),
            default_content_category: default_content_category(),
            default_tone: default_tone(),
            content_categories: Vec::new(),
            tones: Vec::new(),
        }
    }
}

/// Tables for the posting calendar view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarRules {
    #[serde(default = "default_month")]
    pub default_month: String,
    #[serde(default = "default_theme")]
    pub default_theme: String,
    #[serde(default = "default_weekday")]
    pub default_weekday: String,
    #[serde(default = "default_daypart")]
    pub default_daypart: String,
    #[serde(default)]
    pub months: Vec<LabeledKeywords>,
    #[serde(default)]
    pub themes: Vec<LabeledKeywords>,
    #[serde(default)]
    pub weekdays: Vec<LabeledKeywords>,
    #[serde(default)]
    pub dayparts: Vec<LabeledKeywords>,
    #[serde(default)]
    pub insights: Vec<LabeledKeywords>,
}

fn default_month() -> String {
    "Ano Todo".to_string()
}

fn default_theme() -> String {
    "Geral".to_string()
}

fn default_weekday() -> String {
    "Qualquer dia".to_string()
}

fn default_daypart() -> String {
    "Qualquer horário".to_string()
}

impl Default for CalendarRules {
    fn default() -> Self {
        Self {
            default_month: default_month(),
            default_theme: default_theme(),
            default_weekday: default_weekday(),
            default_daypart: default_daypart(),
            months: Vec::new(),
            themes: Vec::new(),
            weekdays: Vec::new(),
            dayparts: Vec::new(),
            insights: Vec::new(),
        }
    }
}

impl RuleSet {
    /// Parse the compiled-in default rules.
    pub fn embedded() -> Result<Self, RulesError> {
        Self::from_toml_str(DEFAULT_RULES)
    }

    /// Parse, validate and normalize a TOML rule document.
    pub fn from_toml_str(contents: &str) -> Result<Self, RulesError> {
        let rules: RuleSet = toml::from_str(contents)?;
        rules.validate()?;
        Ok(rules.normalized())
    }

    /// Load rules from a file on disk.
    pub fn load(path: &Path) -> Result<Self, RulesError> {
        let contents = std::fs::read_to_string(path).map_err(|source| RulesError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Load from `path` if given, otherwise use the embedded rules.
    pub fn load_or_embedded(path: Option<&Path>) -> Result<Self, RulesError> {
        match path {
            Some(p) => Self::load(p),
            None => Self::embedded(),
        }
    }

    /// Render the rule set back to TOML.
    pub fn to_toml(&self) -> Result<String, RulesError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check structural invariants the classifier relies on.
    pub fn validate(&self) -> Result<(), RulesError> {
        if self.categories.is_empty() {
            return Err(RulesError::Invalid("no categories defined".to_string()));
        }

        for category in &self.categories {
            if category.subcategories.is_empty() {
                return Err(RulesError::Invalid(format!(
                    "category '{}' has no subcategories",
                    category.id
                )));
            }
            for sub in &category.subcategories {
                if sub.keywords.iter().all(|k| k.trim().is_empty())
                    && !self.is_fallback(&category.id, &sub.name)
                {
                    return Err(RulesError::Invalid(format!(
                        "subcategory '{}/{}' has no keywords",
                        category.id, sub.name
                    )));
                }
            }
        }

        if self
            .subcategory(&self.fallback.category, &self.fallback.subcategory)
            .is_none()
        {
            return Err(RulesError::Invalid(format!(
                "fallback '{}/{}' is not in the category table",
                self.fallback.category, self.fallback.subcategory
            )));
        }

        self.compile_junk_patterns()?;
        Ok(())
    }

    /// Compile the junk patterns.
    pub fn compile_junk_patterns(&self) -> Result<Vec<Regex>, RulesError> {
        self.junk_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| RulesError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect()
    }

    /// Look up a category by id.
    pub fn category(&self, id: &str) -> Option<&CategoryRule> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Look up a subcategory within a category.
    pub fn subcategory(&self, category_id: &str, name: &str) -> Option<&SubcategoryRule> {
        self.category(category_id)
            .and_then(|c| c.subcategories.iter().find(|s| s.name == name))
    }

    fn is_fallback(&self, category_id: &str, subcategory: &str) -> bool {
        self.fallback.category == category_id && self.fallback.subcategory == subcategory
    }

    /// Copy of the rule set with every keyword folded for matching.
    fn normalized(mut self) -> Self {
        fn fold(words: &mut Vec<String>) {
            *words = words
                .iter()
                .map(|w| normalize_for_match(w))
                .filter(|w| !w.is_empty())
                .collect();
        }
        fn fold_tables(tables: &mut [LabeledKeywords]) {
            for table in tables {
                fold(&mut table.keywords);
            }
        }

        fold(&mut self.relevance_keywords);
        fold(&mut self.stopwords);
        for category in &mut self.categories {
            for sub in &mut category.subcategories {
                fold(&mut sub.keywords);
            }
        }

        fold(&mut self.metadata.series);
        fold(&mut self.metadata.platforms);
        fold(&mut self.metadata.promotions);
        fold(&mut self.metadata.urgency_words);
        fold_tables(&mut self.metadata.content_categories);
        fold_tables(&mut self.metadata.tones);

        fold_tables(&mut self.calendar.months);
        fold_tables(&mut self.calendar.themes);
        fold_tables(&mut self.calendar.weekdays);
        fold_tables(&mut self.calendar.dayparts);
        fold_tables(&mut self.calendar.insights);

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_rules_parse_and_validate() {
        let rules = RuleSet::embedded().unwrap();
        assert!(rules.version >= 1);
        assert_eq!(rules.categories.len(), 10);
        assert_eq!(rules.categories[0].id, "01_Esportes");
        assert_eq!(rules.fallback.category, "10_Generico");
        assert!(rules.subcategory("10_Generico", "outros").is_some());
    }

    #[test]
    fn test_declaration_order_is_preserved() {
        let rules = RuleSet::embedded().unwrap();
        let ids: Vec<_> = rules.categories.iter().map(|c| c.id.as_str()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);

        let sports: Vec<_> = rules.categories[0]
            .subcategories
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(sports[0], "futebol");
        assert!(sports.contains(&"basquete"));
    }

    #[test]
    fn test_fallback_must_exist() {
        let doc = r#"
            version = 1
            [fallback]
            category = "missing"
            subcategory = "x"
            [[categories]]
            id = "a"
            name = "A"
            [[categories.subcategories]]
            name = "b"
            keywords = ["b"]
        "#;
        let err = RuleSet::from_toml_str(doc).unwrap_err();
        assert!(matches!(err, RulesError::Invalid(_)));
    }

    #[test]
    fn test_bad_junk_pattern_rejected() {
        let doc = r#"
            version = 1
            junk_patterns = ["(unclosed"]
            [fallback]
            category = "a"
            subcategory = "b"
            [[categories]]
            id = "a"
            name = "A"
            [[categories.subcategories]]
            name = "b"
            keywords = []
        "#;
        let err = RuleSet::from_toml_str(doc).unwrap_err();
        assert!(matches!(err, RulesError::InvalidPattern { .. }));
    }

    #[test]
    fn test_keywords_are_normalized_on_load() {
        let doc = r#"
            version = 1
            relevance_keywords = ["Promoção", "  AO VIVO "]
            [fallback]
            category = "a"
            subcategory = "b"
            [[categories]]
            id = "a"
            name = "A"
            [[categories.subcategories]]
            name = "b"
            keywords = ["Vôlei"]
        "#;
        let rules = RuleSet::from_toml_str(doc).unwrap();
        assert_eq!(rules.relevance_keywords, vec!["promocao", "ao vivo"]);
        assert_eq!(rules.categories[0].subcategories[0].keywords, vec!["volei"]);
    }

    #[test]
    fn test_round_trips_through_toml() {
        let rules = RuleSet::embedded().unwrap();
        let rendered = rules.to_toml().unwrap();
        let reparsed = RuleSet::from_toml_str(&rendered).unwrap();
        assert_eq!(reparsed.categories.len(), rules.categories.len());
        assert_eq!(reparsed.fallback, rules.fallback);
    }

    #[test]
    fn test_load_missing_file() {
        let err = RuleSet::load(Path::new("/nonexistent/rules.toml")).unwrap_err();
        assert!(matches!(err, RulesError::Io { .. }));
    }
}
