//! Flyer classification and catalog heuristics.
//!
//! Everything here is a lookup over the keyword tables in [`RuleSet`]:
//! - [`Classifier`] picks the category/subcategory pair
//! - [`MetadataDetector`] fills the catalog's derived columns
//! - [`CalendarHints`] suggests when to post a flyer
//!
//! [`RuleSet`]: crate::rules::RuleSet

mod calendar;
mod classifier;
mod filename;
mod metadata;

pub use calendar::CalendarHints;
pub use classifier::{Classifier, MatchPolicy};
pub use filename::{text_from_filename, words_from_filename};
pub use metadata::{keywords, FlyerMetadata, MetadataDetector, MAX_URGENCY};
