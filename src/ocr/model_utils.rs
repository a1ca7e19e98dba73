//! Shared helpers for OCR backends: binary lookup and model downloads.

// Model helpers are only reached with ocr-ocrs or ocr-paddle enabled.
#![cfg_attr(
    not(any(feature = "ocr-ocrs", feature = "ocr-paddle")),
    allow(dead_code)
)]

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::info;

use super::backend::OcrError;

/// Environment variable overriding where models are stored.
pub const MODEL_DIR_ENV: &str = "FLYERSORT_MODEL_DIR";

/// Check if a binary is available in PATH.
pub fn check_binary(name: &str) -> bool {
    which::which(name).is_ok()
}

/// Model file specification for downloading.
pub struct ModelSpec {
    /// URL to download from.
    pub url: &'static str,
    /// Filename to save as.
    pub filename: &'static str,
    /// Human-readable size for progress messages.
    pub size_hint: &'static str,
}

/// Where a backend keeps its model files.
pub struct ModelDirConfig {
    /// Subdirectory name, e.g. "ocrs" or "paddle-ocr".
    pub subdir: &'static str,
    /// Files that must all be present.
    pub required_files: &'static [&'static str],
}

impl ModelDirConfig {
    /// Directory models are downloaded into.
    pub fn default_dir(&self) -> PathBuf {
        if let Some(dir) = std::env::var_os(MODEL_DIR_ENV) {
            return PathBuf::from(dir).join(self.subdir);
        }
        dirs::data_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join("flyersort")
            .join("models")
            .join(self.subdir)
    }

    /// Standard directories searched for already installed models.
    pub fn candidate_dirs(&self) -> Vec<PathBuf> {
        [
            Some(self.default_dir()),
            dirs::data_dir().map(|d| d.join(self.subdir).join("models")),
            dirs::home_dir().map(|d| d.join(format!(".{}", self.subdir)).join("models")),
            Some(PathBuf::from(format!("/usr/share/{}/models", self.subdir))),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    pub fn has_required_files(&self, dir: &Path) -> bool {
        self.required_files.iter().all(|file| dir.join(file).exists())
    }

    /// First directory holding every required file, preferring `configured`.
    pub fn locate(&self, configured: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = configured {
            if self.has_required_files(path) {
                return Some(path.to_path_buf());
            }
        }
        self.candidate_dirs()
            .into_iter()
            .find(|dir| self.has_required_files(dir))
    }
}

/// Download a file from a URL to a local path using curl or wget.
pub fn download_file(url: &str, dest: &Path) -> Result<(), OcrError> {
    let status = Command::new("curl")
        .args(["-fSL", "--progress-bar", "-o"])
        .arg(dest)
        .arg(url)
        .status();

    match status {
        Ok(status) if status.success() => Ok(()),
        Ok(_) => {
            let _ = std::fs::remove_file(dest);
            Err(OcrError::OcrFailed(format!("Failed to download {}", url)))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let status = Command::new("wget")
                .args(["-q", "--show-progress", "-O"])
                .arg(dest)
                .arg(url)
                .status();

            match status {
                Ok(status) if status.success() => Ok(()),
                Ok(_) => {
                    let _ = std::fs::remove_file(dest);
                    Err(OcrError::OcrFailed(format!("Failed to download {}", url)))
                }
                Err(_) => Err(OcrError::BackendNotAvailable(
                    "Neither curl nor wget found. Install one to download models.".to_string(),
                )),
            }
        }
        Err(e) => Err(OcrError::Io(e)),
    }
}

/// Download a model file unless it is already present.
pub fn ensure_model_file(spec: &ModelSpec, model_dir: &Path) -> Result<(), OcrError> {
    let dest = model_dir.join(spec.filename);
    if !dest.exists() {
        info!("Downloading {} (~{})", spec.filename, spec.size_hint);
        download_file(spec.url, &dest)?;
        info!("Downloaded {}", spec.filename);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CONFIG: ModelDirConfig = ModelDirConfig {
        subdir: "test-engine",
        required_files: &["a.onnx", "b.onnx"],
    };

    #[test]
    fn test_required_files() {
        let dir = TempDir::new().unwrap();
        assert!(!CONFIG.has_required_files(dir.path()));
        std::fs::write(dir.path().join("a.onnx"), b"").unwrap();
        assert!(!CONFIG.has_required_files(dir.path()));
        std::fs::write(dir.path().join("b.onnx"), b"").unwrap();
        assert!(CONFIG.has_required_files(dir.path()));
        assert_eq!(CONFIG.locate(Some(dir.path())), Some(dir.path().to_path_buf()));
    }

    #[test]
    fn test_missing_binary() {
        assert!(!check_binary("flyersort-definitely-not-a-real-binary"));
    }
}
