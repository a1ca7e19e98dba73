//! Data models for flyersort.

mod catalog;
mod classification;
mod extraction;
mod image;
mod plan;

pub use catalog::CatalogRecord;
pub use classification::{Classification, MatchSource};
pub use extraction::ExtractionAttempt;
pub use image::{has_image_extension, ImageFile, IMAGE_EXTENSIONS};
pub use plan::{MoveFailure, MoveReport, PlannedMove, RenamePlan, SkippedImage};
