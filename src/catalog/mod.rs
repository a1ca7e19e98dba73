//! Flyer catalog: a flat SQLite table rebuilt from an organized tree, plus
//! statistics and a spreadsheet export.

mod export;
mod repository;
mod stats;

use std::path::PathBuf;

use thiserror::Error;

use crate::scan::ScanError;

pub use export::WorkbookExporter;
pub use repository::{build_record, CatalogRepository, RebuildSummary, UNCATEGORIZED};
pub use stats::CatalogStats;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("Workbook error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error("Catalog root does not exist: {0}")]
    RootMissing(PathBuf),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
