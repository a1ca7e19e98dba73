//! Tesseract OCR backend.
//!
//! Runs the `tesseract` command-line tool. Language, page segmentation mode,
//! character whitelist and tessdata directory come from [`OcrConfig`].

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;
use std::time::Instant;

use tracing::debug;

use super::backend::{OcrBackend, OcrBackendType, OcrConfig, OcrError, OcrResult};
use super::model_utils::check_binary;

/// Tesseract OCR backend.
pub struct TesseractBackend {
    config: OcrConfig,
    installed_languages: OnceLock<Vec<String>>,
}

impl TesseractBackend {
    /// Create a new Tesseract backend with default configuration.
    pub fn new() -> Self {
        Self::with_config(OcrConfig::default())
    }

    /// Create a new Tesseract backend with custom configuration.
    pub fn with_config(config: OcrConfig) -> Self {
        Self {
            config,
            installed_languages: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    /// Command-line arguments following the image path.
    fn build_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["stdout".into(), "-l".into(), self.config.language.clone().into()];
        if let Some(psm) = self.config.psm {
            args.push("--psm".into());
            args.push(psm.to_string().into());
        }
        if let Some(ref dir) = self.config.tessdata_dir {
            args.push("--tessdata-dir".into());
            args.push(dir.as_os_str().to_owned());
        }
        if let Some(ref whitelist) = self.config.whitelist {
            args.push("-c".into());
            args.push(format!("tessedit_char_whitelist={}", whitelist).into());
        }
        args
    }

    /// Run Tesseract on an image file.
    fn run_tesseract(&self, image_path: &Path) -> Result<String, OcrError> {
        let output = Command::new("tesseract")
            .arg(image_path)
            .args(self.build_args())
            .output();

        match output {
            Ok(output) => {
                if output.status.success() {
                    Ok(String::from_utf8_lossy(&output.stdout).to_string())
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    Err(OcrError::OcrFailed(format!("tesseract failed: {}", stderr.trim())))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
                OcrError::BackendNotAvailable("tesseract not found (install tesseract-ocr)".to_string()),
            ),
            Err(e) => Err(OcrError::Io(e)),
        }
    }

    /// Languages tesseract reports as installed. Queried once per backend.
    pub fn installed_languages(&self) -> &[String] {
        self.installed_languages.get_or_init(|| {
            let mut cmd = Command::new("tesseract");
            if let Some(ref dir) = self.config.tessdata_dir {
                cmd.arg("--tessdata-dir").arg(dir);
            }
            match cmd.arg("--list-langs").output() {
                // Older releases print the list on stderr.
                Ok(output) => {
                    let mut text = String::from_utf8_lossy(&output.stdout).to_string();
                    text.push('\n');
                    text.push_str(&String::from_utf8_lossy(&output.stderr));
                    parse_language_list(&text)
                }
                Err(e) => {
                    debug!("tesseract --list-langs failed: {}", e);
                    Vec::new()
                }
            }
        })
    }

    /// Whether every language in a `por+eng` style list is installed.
    pub fn has_language(&self, language: &str) -> bool {
        language.split('+').filter(|l| !l.is_empty()).all(|lang| {
            if let Some(ref dir) = self.config.tessdata_dir {
                if dir.join(format!("{}.traineddata", lang)).exists() {
                    return true;
                }
            }
            self.installed_languages().iter().any(|l| l == lang)
        })
    }
}

/// Parse `tesseract --list-langs` output.
fn parse_language_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.contains(' ') && !line.ends_with(':'))
        .map(String::from)
        .collect()
}

impl Default for TesseractBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrBackend for TesseractBackend {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::Tesseract
    }

    fn is_available(&self) -> bool {
        check_binary("tesseract") && self.has_language(&self.config.language)
    }

    fn availability_hint(&self) -> String {
        if !check_binary("tesseract") {
            "Tesseract not installed. Install with: apt install tesseract-ocr".to_string()
        } else if !self.has_language(&self.config.language) {
            format!(
                "Tesseract language '{}' not installed. Install with: apt install tesseract-ocr-{}",
                self.config.language,
                self.config.language.split('+').next().unwrap_or("por")
            )
        } else {
            format!("Tesseract is available ({})", self.config.label())
        }
    }

    fn ocr_image(&self, image_path: &Path) -> Result<OcrResult, OcrError> {
        let start = Instant::now();
        let text = self.run_tesseract(image_path)?;
        let elapsed = start.elapsed();

        Ok(OcrResult {
            text,
            confidence: None,
            backend: OcrBackendType::Tesseract,
            model: Some(self.config.language.clone()),
            processing_time_ms: elapsed.as_millis() as u64,
        })
    }

    fn config_label(&self) -> String {
        self.config.label()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_build_args() {
        let backend = TesseractBackend::with_config(OcrConfig {
            language: "por".to_string(),
            psm: Some(6),
            whitelist: Some("ABC".to_string()),
            tessdata_dir: Some(PathBuf::from("/opt/tessdata")),
            model_path: None,
        });
        let args: Vec<String> = backend
            .build_args()
            .into_iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        assert_eq!(
            args,
            vec![
                "stdout",
                "-l",
                "por",
                "--psm",
                "6",
                "--tessdata-dir",
                "/opt/tessdata",
                "-c",
                "tessedit_char_whitelist=ABC",
            ]
        );
    }

    #[test]
    fn test_default_args() {
        let args = TesseractBackend::new().build_args();
        assert_eq!(args.len(), 3);
    }

    #[test]
    fn test_parse_language_list() {
        let out = "List of available languages in \"/usr/share/tessdata/\" (3):\neng\nosd\npor\n";
        assert_eq!(parse_language_list(out), vec!["eng", "osd", "por"]);
        assert!(parse_language_list("").is_empty());
    }

    #[test]
    fn test_traineddata_in_tessdata_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("por.traineddata"), b"").unwrap();
        let backend = TesseractBackend::with_config(OcrConfig {
            tessdata_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        });
        assert!(backend.has_language("por"));
    }
}
