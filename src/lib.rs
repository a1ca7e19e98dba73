//! flyersort - OCR-driven organizer for IPTV promotional flyers.
//!
//! The pipeline enumerates flyer images, extracts text with one or more OCR
//! backends, keeps the best candidate, classifies it against keyword tables,
//! and proposes a sanitized filename. Plans are computed without side effects
//! and applied separately. A SQLite catalog and a spreadsheet export sit on
//! top of an already organized tree.

// Model types use `from_str` methods that return Option<Self>,
// not Result<Self, Error> as std::str::FromStr requires.
#![allow(clippy::should_implement_trait)]

pub mod catalog;
pub mod classify;
pub mod config;
pub mod models;
pub mod naming;
pub mod ocr;
pub mod organize;
pub mod pipeline;
pub mod rules;
pub mod scan;
pub mod text;
