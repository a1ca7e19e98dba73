//! Posting calendar suggestions for the planning sheet.

use serde::Serialize;

use super::metadata::first_label;
use crate::rules::CalendarRules;
use crate::text::normalize_for_match;

/// When and how to post a flyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarHints {
    pub month: String,
    pub theme: String,
    pub weekday: String,
    pub daypart: String,
    pub insight: Option<String>,
}

impl CalendarHints {
    /// Suggest a slot for a flyer from its name or text.
    pub fn for_name(name: &str, rules: &CalendarRules) -> Self {
        let folded = normalize_for_match(name);

        Self {
            month: first_label(&rules.months, &folded).unwrap_or_else(|| rules.default_month.clone()),
            theme: first_label(&rules.themes, &folded).unwrap_or_else(|| rules.default_theme.clone()),
            weekday: first_label(&rules.weekdays, &folded)
                .unwrap_or_else(|| rules.default_weekday.clone()),
            daypart: first_label(&rules.dayparts, &folded)
                .unwrap_or_else(|| rules.default_daypart.clone()),
            insight: first_label(&rules.insights, &folded),
        }
    }
}
