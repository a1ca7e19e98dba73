//! Image discovery.
//!
//! Lists flyer images under a source directory. Results are sorted by path
//! so that plans built from them are deterministic.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::models::{has_image_extension, ImageFile};

/// Directories never descended into.
const DEFAULT_SKIP_DIRS: &[&str] = &["tessdata"];

/// Bytes read to sniff a file's real type.
const SNIFF_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Source directory does not exist: {0}")]
    SourceMissing(PathBuf),

    #[error("Source is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Enumerates image files in a directory.
#[derive(Debug, Clone)]
pub struct ImageScanner {
    recursive: bool,
    skip_dirs: Vec<String>,
}

impl Default for ImageScanner {
    fn default() -> Self {
        Self::new(false)
    }
}

impl ImageScanner {
    pub fn new(recursive: bool) -> Self {
        Self {
            recursive,
            skip_dirs: DEFAULT_SKIP_DIRS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Also skip directories with this name.
    pub fn skip_dir(mut self, name: impl Into<String>) -> Self {
        self.skip_dirs.push(name.into());
        self
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// List images under `dir`.
    ///
    /// A missing or non-directory source is an error. Entries that cannot be
    /// read are logged and skipped.
    pub fn scan(&self, dir: &Path) -> Result<Vec<ImageFile>, ScanError> {
        if !dir.exists() {
            return Err(ScanError::SourceMissing(dir.to_path_buf()));
        }
        if !dir.is_dir() {
            return Err(ScanError::NotADirectory(dir.to_path_buf()));
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let walker = WalkDir::new(dir)
            .max_depth(max_depth)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !self.is_skipped_dir(entry));

        let mut images = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(ScanError::Walk {
                        path: dir.to_path_buf(),
                        source: e,
                    })
                }
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let Some(image) = ImageFile::from_path(entry.path()) else {
                if has_image_extension(entry.path()) {
                    warn!(
                        "Skipping {}: file name is not valid UTF-8",
                        entry.path().display()
                    );
                }
                continue;
            };

            if !sniffs_as_image(entry.path()) {
                warn!(
                    "Skipping {}: content is not an image",
                    entry.path().display()
                );
                continue;
            }

            images.push(image);
        }

        images.sort_by(|a, b| a.path.cmp(&b.path));
        debug!("Found {} images in {}", images.len(), dir.display());
        Ok(images)
    }

    fn is_skipped_dir(&self, entry: &DirEntry) -> bool {
        if !entry.file_type().is_dir() {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        name.starts_with('.') || self.skip_dirs.iter().any(|s| *s == name)
    }
}

/// False only when the file's magic bytes identify a non-image type.
/// Unknown or unreadable content is given the benefit of the doubt; the
/// OCR step reports those.
fn sniffs_as_image(path: &Path) -> bool {
    let mut buffer = [0u8; SNIFF_LEN];
    let bytes_read = match File::open(path).and_then(|mut f| f.read(&mut buffer)) {
        Ok(n) => n,
        Err(e) => {
            debug!("Could not sniff {}: {}", path.display(), e);
            return true;
        }
    };

    match infer::get(&buffer[..bytes_read]) {
        Some(kind) => kind.matcher_type() == infer::MatcherType::Image,
        None => true,
    }
}
