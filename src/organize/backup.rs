use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::info;
use walkdir::WalkDir;

use super::{resolve_collision, MoveError, SuffixStyle};

/// Copy `source` to a timestamped sibling, `<name>_Backup_<YYYYmmdd_HHMMSS>`,
/// before a batch rewrites it. Returns the backup directory.
pub fn backup_dir(source: &Path) -> Result<PathBuf, MoveError> {
    backup_dir_at(source, Local::now())
}

/// Like [`backup_dir`] with an explicit timestamp.
pub fn backup_dir_at(source: &Path, at: DateTime<Local>) -> Result<PathBuf, MoveError> {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "flyers".to_string());
    let parent = source.parent().unwrap_or_else(|| Path::new("."));
    let backup_name = format!("{}_Backup_{}", name, at.format("%Y%m%d_%H%M%S"));
    let backup = resolve_collision(parent, &backup_name, SuffixStyle::Underscore);

    for entry in WalkDir::new(source) {
        let entry = entry.map_err(|e| MoveError::Backup {
            path: source.to_path_buf(),
            source: e.into(),
        })?;
        let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
        let target = backup.join(relative);

        let copied = if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
        } else {
            fs::copy(entry.path(), &target).map(|_| ())
        };
        copied.map_err(|e| MoveError::Backup {
            path: entry.path().to_path_buf(),
            source: e,
        })?;
    }

    info!("Backed up {} to {}", source.display(), backup.display());
    Ok(backup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_backup_copies_tree_to_timestamped_sibling() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("Divulgacao");
        fs::create_dir_all(source.join("antigos")).unwrap();
        fs::write(source.join("IMG_1.png"), b"one").unwrap();
        fs::write(source.join("antigos/IMG_2.jpg"), b"two").unwrap();

        let at = Local.with_ymd_and_hms(2025, 12, 24, 9, 30, 0).unwrap();
        let backup = backup_dir_at(&source, at).unwrap();

        assert_eq!(backup, dir.path().join("Divulgacao_Backup_20251224_093000"));
        assert_eq!(fs::read(backup.join("IMG_1.png")).unwrap(), b"one");
        assert_eq!(fs::read(backup.join("antigos/IMG_2.jpg")).unwrap(), b"two");
        assert!(source.join("IMG_1.png").exists());
    }

    #[test]
    fn test_second_backup_in_same_second_gets_suffix() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("lote");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("a.png"), b"a").unwrap();

        let at = Local.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let first = backup_dir_at(&source, at).unwrap();
        let second = backup_dir_at(&source, at).unwrap();

        assert_ne!(first, second);
        assert_eq!(second, dir.path().join("lote_Backup_20250102_030405_1"));
        assert!(second.join("a.png").exists());
    }

    #[test]
    fn test_missing_source_is_error() {
        let dir = TempDir::new().unwrap();
        let err = backup_dir(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, MoveError::Backup { .. }));
    }
}
