//! Pure-Rust OCR through the `ocrs` crate.
//!
//! The engine ignores the Tesseract-specific knobs (language, psm,
//! whitelist). Detection and recognition models are fetched on first use
//! from https://ocrs-models.s3-accelerate.amazonaws.com/

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Instant;

use tracing::debug;

use super::backend::{OcrBackend, OcrBackendType, OcrConfig, OcrError, OcrResult};
use super::model_utils::{ensure_model_file, ModelDirConfig, ModelSpec};

static ENGINE: OnceLock<ocrs::OcrEngine> = OnceLock::new();

const DETECTION: ModelSpec = ModelSpec {
    url: "https://ocrs-models.s3-accelerate.amazonaws.com/text-detection.rten",
    filename: "text-detection.rten",
    size_hint: "2.5 MB",
};

const RECOGNITION: ModelSpec = ModelSpec {
    url: "https://ocrs-models.s3-accelerate.amazonaws.com/text-recognition.rten",
    filename: "text-recognition.rten",
    size_hint: "10 MB",
};

const MODELS: ModelDirConfig = ModelDirConfig {
    subdir: "ocrs",
    required_files: &[DETECTION.filename, RECOGNITION.filename],
};

/// Recognized lines with fewer letters or digits than this are treated as
/// artwork and dropped.
const MIN_LINE_ALNUM: usize = 2;

/// `ocrs` engine, shared by every instance in the process.
pub struct OcrsBackend {
    config: OcrConfig,
}

impl OcrsBackend {
    pub fn new() -> Self {
        Self::with_config(OcrConfig::default())
    }

    pub fn with_config(config: OcrConfig) -> Self {
        Self { config }
    }

    fn model_dir(&self) -> Option<PathBuf> {
        MODELS.locate(self.config.model_path.as_deref())
    }

    fn engine(&self) -> Result<&'static ocrs::OcrEngine, OcrError> {
        if let Some(engine) = ENGINE.get() {
            return Ok(engine);
        }

        let dir = match self.model_dir() {
            Some(dir) => dir,
            None => {
                let dir = MODELS.default_dir();
                std::fs::create_dir_all(&dir)?;
                ensure_model_file(&DETECTION, &dir)?;
                ensure_model_file(&RECOGNITION, &dir)?;
                dir
            }
        };

        let load = |spec: &ModelSpec| {
            rten::Model::load_file(dir.join(spec.filename))
                .map_err(|e| OcrError::ModelNotFound(format!("{}: {}", spec.filename, e)))
        };
        let engine = ocrs::OcrEngine::new(ocrs::OcrEngineParams {
            detection_model: Some(load(&DETECTION)?),
            recognition_model: Some(load(&RECOGNITION)?),
            ..Default::default()
        })
        .map_err(|e| OcrError::OcrFailed(format!("Failed to create ocrs engine: {}", e)))?;

        // A concurrent caller may have set it first.
        let _ = ENGINE.set(engine);
        ENGINE
            .get()
            .ok_or_else(|| OcrError::OcrFailed("ocrs engine was not cached".to_string()))
    }

    /// Detect words, group them into lines and recognize each line.
    fn read_lines(&self, image_path: &Path) -> Result<Vec<String>, OcrError> {
        let engine = self.engine()?;

        let rgb = image::open(image_path)
            .map_err(|e| OcrError::ImageError(format!("{}: {}", image_path.display(), e)))?
            .into_rgb8();
        let source = ocrs::ImageSource::from_bytes(rgb.as_raw(), rgb.dimensions())
            .map_err(|e| OcrError::ImageError(format!("Unsupported image layout: {}", e)))?;
        let input = engine
            .prepare_input(source)
            .map_err(|e| OcrError::OcrFailed(format!("Failed to prepare input: {}", e)))?;

        let words = engine
            .detect_words(&input)
            .map_err(|e| OcrError::OcrFailed(format!("Word detection failed: {}", e)))?;
        let line_rects = engine.find_text_lines(&input, &words);
        let lines = engine
            .recognize_text(&input, &line_rects)
            .map_err(|e| OcrError::OcrFailed(format!("Recognition failed: {}", e)))?;

        let detected = lines.len();
        let kept = keep_text_lines(lines.iter().flatten().map(|line| line.to_string()));
        debug!(
            "ocrs: {} of {} lines kept for {}",
            kept.len(),
            detected,
            image_path.display()
        );
        Ok(kept)
    }
}

/// Trim lines and drop those that are mostly artwork.
fn keep_text_lines(lines: impl Iterator<Item = String>) -> Vec<String> {
    lines
        .map(|line| line.trim().to_string())
        .filter(|line| line.chars().filter(|c| c.is_alphanumeric()).count() >= MIN_LINE_ALNUM)
        .collect()
}

impl Default for OcrsBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrBackend for OcrsBackend {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::Ocrs
    }

    /// Models are downloaded on demand, so the engine can always run.
    fn is_available(&self) -> bool {
        true
    }

    fn availability_hint(&self) -> String {
        match self.model_dir() {
            Some(path) => format!("ocrs models in {}", path.display()),
            None => format!(
                "ocrs models (~12 MB) will be downloaded to {} on first use",
                MODELS.default_dir().display()
            ),
        }
    }

    fn ocr_image(&self, image_path: &Path) -> Result<OcrResult, OcrError> {
        let start = Instant::now();
        let lines = self.read_lines(image_path)?;

        Ok(OcrResult {
            text: lines.join("\n"),
            confidence: None,
            backend: OcrBackendType::Ocrs,
            model: Some(RECOGNITION.filename.to_string()),
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn config_label(&self) -> String {
        "line-by-line".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artwork_lines_dropped() {
        let lines = ["  FUTEBOL AO VIVO ", "|", "★ ★", "4K", "é"]
            .into_iter()
            .map(String::from);
        assert_eq!(keep_text_lines(lines), vec!["FUTEBOL AO VIVO", "4K"]);
    }
}
