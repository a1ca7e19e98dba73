//! Planning and applying renames.
//!
//! Organizing is two-phase: [`Planner::plan`] computes every target without
//! touching the filesystem, and [`Mover::apply`] carries the plan out. A
//! file is never overwritten; collisions get a numeric suffix.

mod backup;
mod mover;
mod plan;

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::rules::RuleSet;

pub use backup::{backup_dir, backup_dir_at};
pub use mover::{move_file, Mover};
pub use plan::Planner;

#[derive(Debug, Error)]
pub enum MoveError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to move {from} to {to}: {source}")]
    Io {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to back up {path}: {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// How a collision counter is attached to a file name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuffixStyle {
    /// `name (1).png`
    #[default]
    Parens,
    /// `name_1.png`
    Underscore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizeOptions {
    pub suffix: SuffixStyle,
    /// Descend into subdirectories of the source.
    pub recursive: bool,
    /// Leave files that already carry a generated name where they are.
    pub skip_generated: bool,
    /// Copy the source directory to a timestamped sibling before applying.
    pub backup: bool,
}

impl Default for OrganizeOptions {
    fn default() -> Self {
        Self {
            suffix: SuffixStyle::Parens,
            recursive: false,
            skip_generated: true,
            backup: false,
        }
    }
}

/// `file_name` with collision counter `n` attached before the extension.
pub fn suffixed_name(file_name: &str, n: usize, style: SuffixStyle) -> String {
    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (file_name, None),
    };

    let stem = match style {
        SuffixStyle::Parens => format!("{} ({})", stem, n),
        SuffixStyle::Underscore => format!("{}_{}", stem, n),
    };

    match ext {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem,
    }
}

/// First free path for `file_name` in `dir`: the name itself, else the
/// smallest `n >= 1` whose suffixed name is not taken.
pub fn resolve_collision(dir: &Path, file_name: &str, style: SuffixStyle) -> PathBuf {
    resolve_with(dir, file_name, style, |path| path.exists())
}

/// Like [`resolve_collision`] with a caller-supplied notion of "taken".
pub(crate) fn resolve_with<F>(dir: &Path, file_name: &str, style: SuffixStyle, is_taken: F) -> PathBuf
where
    F: Fn(&Path) -> bool,
{
    let candidate = dir.join(file_name);
    if !is_taken(&candidate) {
        return candidate;
    }

    (1..)
        .map(|n| dir.join(suffixed_name(file_name, n, style)))
        .find(|path| !is_taken(path))
        .unwrap_or(candidate)
}

/// Create `dest/{category_id}/{subcategory}` for every table entry.
///
/// Returns the number of directories that did not exist before.
pub fn create_structure(dest: &Path, rules: &RuleSet) -> Result<usize, MoveError> {
    let mut created = 0;
    for category in &rules.categories {
        for sub in &category.subcategories {
            let dir = dest.join(&category.id).join(&sub.name);
            if dir.is_dir() {
                continue;
            }
            std::fs::create_dir_all(&dir).map_err(|source| MoveError::CreateDir {
                path: dir.clone(),
                source,
            })?;
            debug!("Created {}", dir.display());
            created += 1;
        }
    }
    Ok(created)
}
