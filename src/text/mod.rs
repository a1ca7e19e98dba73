//! Text normalization, cleanup and candidate selection.

mod cleaner;
mod normalize;
mod phrases;
mod selector;

pub use cleaner::{CleanerOptions, TextCleaner};
pub use normalize::{char_len, collapse_whitespace, normalize_for_match, strip_accents};
pub use phrases::{PhraseRanker, RankedPhrase};
pub use selector::{CandidateSelector, SelectionOptions};
