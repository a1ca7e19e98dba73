use std::path::{Path, PathBuf};

use serde::Serialize;

/// Extensions treated as flyer images, lowercase.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// An image discovered on disk. Identity is the path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageFile {
    pub path: PathBuf,
    pub file_name: String,
    /// Lowercased extension without the dot.
    pub extension: String,
}

/// True when `path` ends in a supported image extension, whatever the rest
/// of the name looks like.
pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

impl ImageFile {
    /// Build from a path, or `None` when the extension is not a supported
    /// image type or the file name is not valid UTF-8. Matching is
    /// case-insensitive.
    pub fn from_path(path: &Path) -> Option<Self> {
        if !has_image_extension(path) {
            return None;
        }
        let extension = path.extension()?.to_str()?.to_lowercase();
        let file_name = path.file_name()?.to_str()?.to_string();
        Some(Self {
            path: path.to_path_buf(),
            file_name,
            extension,
        })
    }

    /// File name without its extension.
    pub fn stem(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.file_name)
    }

    /// Directory containing the image.
    pub fn parent(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Name of the directory containing the image, if it has one.
    pub fn parent_name(&self) -> Option<&str> {
        self.path.parent()?.file_name()?.to_str()
    }
}
