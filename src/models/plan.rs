use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::Classification;

/// A single proposed rename or move.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedMove {
    pub source: PathBuf,
    /// Collision-free target as resolved at planning time.
    pub target: PathBuf,
    pub classification: Classification,
    /// Text the new name was built from.
    pub text: String,
}

impl PlannedMove {
    /// True when the file already sits at its target.
    pub fn is_noop(&self) -> bool {
        self.source == self.target
    }
}

/// An image left out of a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedImage {
    pub path: PathBuf,
    pub reason: String,
}

/// Side-effect-free result of planning a batch.
///
/// Plans round-trip through JSON so a reviewed plan can be applied later
/// exactly as shown.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenamePlan {
    /// Directory the images were scanned from.
    pub source: Option<PathBuf>,
    /// Organize root, when not renaming in place.
    pub destination: Option<PathBuf>,
    pub moves: Vec<PlannedMove>,
    pub skipped: Vec<SkippedImage>,
}

impl RenamePlan {
    pub fn is_empty(&self) -> bool {
        self.moves.iter().all(PlannedMove::is_noop)
    }

    /// Moves that actually change something.
    pub fn changes(&self) -> impl Iterator<Item = &PlannedMove> {
        self.moves.iter().filter(|m| !m.is_noop())
    }
}

/// A move that failed; the source was left in place.
#[derive(Debug, Clone, Serialize)]
pub struct MoveFailure {
    pub source: PathBuf,
    pub message: String,
}

/// Tally of an applied plan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MoveReport {
    pub processed: usize,
    pub moved: usize,
    pub unchanged: usize,
    pub errors: Vec<MoveFailure>,
    /// Final location of every moved file, in plan order.
    pub destinations: Vec<PathBuf>,
}

impl MoveReport {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}
