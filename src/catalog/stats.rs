use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::models::CatalogRecord;

const TOP_CONTENT_CATEGORIES: usize = 5;
const TOP_TONES: usize = 3;
const TOP_KEYWORDS: usize = 30;

/// Aggregate figures over the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CatalogStats {
    pub total: usize,
    pub categories: usize,
    pub subcategories: usize,
    pub with_year: usize,
    pub with_series: usize,
    pub with_platform: usize,
    pub with_promotion: usize,
    /// Rounded to two decimals.
    pub mean_urgency: f64,
    pub top_content_categories: Vec<(String, usize)>,
    pub top_tones: Vec<(String, usize)>,
    pub top_keywords: Vec<(String, usize)>,
}

impl CatalogStats {
    pub fn compute(records: &[CatalogRecord]) -> Self {
        let total = records.len();
        if total == 0 {
            return Self::default();
        }

        let categories: HashSet<&str> = records.iter().map(|r| r.category.as_str()).collect();
        let subcategories: HashSet<(&str, &str)> = records
            .iter()
            .filter(|r| !r.subcategory.is_empty())
            .map(|r| (r.category.as_str(), r.subcategory.as_str()))
            .collect();

        let urgency_sum: u64 = records.iter().map(|r| u64::from(r.urgency)).sum();
        let mean_urgency = (urgency_sum as f64 / total as f64 * 100.0).round() / 100.0;

        Self {
            total,
            categories: categories.len(),
            subcategories: subcategories.len(),
            with_year: records.iter().filter(|r| r.year.is_some()).count(),
            with_series: records.iter().filter(|r| r.series.is_some()).count(),
            with_platform: records.iter().filter(|r| r.platform.is_some()).count(),
            with_promotion: records.iter().filter(|r| r.promotion.is_some()).count(),
            mean_urgency,
            top_content_categories: top_counts(
                records.iter().map(|r| r.content_category.as_str()),
                TOP_CONTENT_CATEGORIES,
            ),
            top_tones: top_counts(records.iter().map(|r| r.tone.as_str()), TOP_TONES),
            top_keywords: top_counts(
                records.iter().flat_map(|r| r.keywords.iter().map(String::as_str)),
                TOP_KEYWORDS,
            ),
        }
    }

    /// Label/value rows for display and export.
    pub fn summary_rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Total de flyers", self.total.to_string()),
            ("Categorias", self.categories.to_string()),
            ("Subcategorias", self.subcategories.to_string()),
            ("Com ano", self.with_year.to_string()),
            ("Com série", self.with_series.to_string()),
            ("Com plataforma", self.with_platform.to_string()),
            ("Com promoção", self.with_promotion.to_string()),
            ("Urgência média", format!("{:.2}", self.mean_urgency)),
        ]
    }
}

/// Most frequent values, ties broken alphabetically.
fn top_counts<'a>(values: impl Iterator<Item = &'a str>, n: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }

    let mut sorted: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted.truncate(n);
    sorted
}
