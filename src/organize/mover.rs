use std::fs;
use std::path::Path;

use tracing::{info, warn};

use super::{resolve_collision, MoveError, SuffixStyle};
use crate::models::{MoveFailure, MoveReport, PlannedMove, RenamePlan};

/// Carries out a [`RenamePlan`].
#[derive(Debug, Clone, Default)]
pub struct Mover {
    suffix: SuffixStyle,
}

impl Mover {
    pub fn new(suffix: SuffixStyle) -> Self {
        Self { suffix }
    }

    /// Apply every move in the plan.
    ///
    /// Failures are recorded in the report and leave the source in place;
    /// the remaining moves still run.
    pub fn apply(&self, plan: &RenamePlan) -> MoveReport {
        self.apply_with(plan, |_, _| {})
    }

    /// Like [`apply`](Self::apply), calling `on_move` after each entry.
    pub fn apply_with<F>(&self, plan: &RenamePlan, mut on_move: F) -> MoveReport
    where
        F: FnMut(&PlannedMove, Result<&Path, &MoveError>),
    {
        let mut report = MoveReport::default();

        for planned in &plan.moves {
            report.processed += 1;

            if planned.is_noop() {
                report.unchanged += 1;
                on_move(planned, Ok(&planned.source));
                continue;
            }

            match self.apply_one(planned) {
                Ok(dest) => {
                    on_move(planned, Ok(&dest));
                    report.moved += 1;
                    report.destinations.push(dest);
                }
                Err(e) => {
                    warn!("{}", e);
                    on_move(planned, Err(&e));
                    report.errors.push(MoveFailure {
                        source: planned.source.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Processed {} files: {} moved, {} unchanged, {} errors",
            report.processed,
            report.moved,
            report.unchanged,
            report.error_count()
        );
        report
    }

    fn apply_one(&self, planned: &PlannedMove) -> Result<std::path::PathBuf, MoveError> {
        let dir = planned
            .target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let file_name = planned
            .target
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();

        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(&dir).map_err(|source| MoveError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }

        // Files may have appeared since planning.
        let target = if planned.target.exists() {
            resolve_collision(&dir, file_name, self.suffix)
        } else {
            planned.target.clone()
        };

        move_file(&planned.source, &target)?;
        Ok(target)
    }
}

/// Rename `from` to `to`, falling back to copy and remove across
/// filesystems. On failure `from` is untouched and no partial copy remains.
pub fn move_file(from: &Path, to: &Path) -> Result<(), MoveError> {
    let io_err = |source: std::io::Error| MoveError::Io {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    if fs::rename(from, to).is_ok() {
        return Ok(());
    }

    if let Err(e) = fs::copy(from, to) {
        let _ = fs::remove_file(to);
        return Err(io_err(e));
    }

    if let Err(e) = fs::remove_file(from) {
        let _ = fs::remove_file(to);
        return Err(io_err(e));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Classification, MatchSource};
    use tempfile::TempDir;

    fn planned(source: &Path, target: &Path) -> PlannedMove {
        PlannedMove {
            source: source.to_path_buf(),
            target: target.to_path_buf(),
            classification: Classification {
                category_id: "10_Generico".to_string(),
                category: "Generico".to_string(),
                subcategory: "outros".to_string(),
                keyword: None,
                source: MatchSource::Fallback,
            },
            text: String::new(),
        }
    }

    #[test]
    fn test_apply_moves_into_new_directory() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("IMG_1.png");
        fs::write(&src, b"one").unwrap();
        let target = dir.path().join("out").join("outros").join("outros.png");

        let report = Mover::default().apply(&RenamePlan {
            moves: vec![planned(&src, &target)],
            skipped: Vec::new(),
            ..Default::default()
        });

        assert_eq!(report.moved, 1);
        assert_eq!(report.error_count(), 0);
        assert!(!src.exists());
        assert_eq!(fs::read(&target).unwrap(), b"one");
    }

    #[test]
    fn test_apply_never_overwrites_late_arrival() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("IMG_1.png");
        fs::write(&src, b"new").unwrap();
        let target = dir.path().join("outros.png");
        fs::write(&target, b"old").unwrap();

        let report = Mover::default().apply(&RenamePlan {
            moves: vec![planned(&src, &target)],
            skipped: Vec::new(),
            ..Default::default()
        });

        assert_eq!(fs::read(&target).unwrap(), b"old");
        assert_eq!(report.destinations, vec![dir.path().join("outros (1).png")]);
        assert_eq!(fs::read(dir.path().join("outros (1).png")).unwrap(), b"new");
    }

    #[test]
    fn test_failed_move_is_tallied_and_batch_continues() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("gone.png");
        let src = dir.path().join("IMG_2.png");
        fs::write(&src, b"two").unwrap();

        let report = Mover::default().apply(&RenamePlan {
            moves: vec![
                planned(&missing, &dir.path().join("a.png")),
                planned(&src, &dir.path().join("b.png")),
                planned(&dir.path().join("same.png"), &dir.path().join("same.png")),
            ],
            skipped: Vec::new(),
            ..Default::default()
        });

        assert_eq!(report.processed, 3);
        assert_eq!(report.moved, 1);
        assert_eq!(report.unchanged, 1);
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.errors[0].source, missing);
        assert!(!dir.path().join("a.png").exists());
        assert!(dir.path().join("b.png").exists());
    }
}
