//! PaddleOCR through `paddle-ocr-rs` (ONNX Runtime).
//!
//! PP-OCRv4 detection, recognition and angle models are fetched on first use
//! from the RapidOCR model mirrors. Blocks are returned in reading order and
//! low-confidence blocks are dropped before the text reaches the cleaner.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

use paddle_ocr_rs::ocr_lite::OcrLite;
use tracing::debug;

use super::backend::{OcrBackend, OcrBackendType, OcrConfig, OcrError, OcrResult};
use super::model_utils::{ensure_model_file, ModelDirConfig, ModelSpec};

/// `detect_from_path` takes `&mut self`.
static ENGINE: OnceLock<Mutex<OcrLite>> = OnceLock::new();

const DET: ModelSpec = ModelSpec {
    url: "https://huggingface.co/SWHL/RapidOCR/resolve/main/PP-OCRv4/ch_PP-OCRv4_det_infer.onnx",
    filename: "ch_PP-OCRv4_det_infer.onnx",
    size_hint: "4 MB",
};

const REC: ModelSpec = ModelSpec {
    url: "https://huggingface.co/SWHL/RapidOCR/resolve/main/PP-OCRv4/ch_PP-OCRv4_rec_infer.onnx",
    filename: "ch_PP-OCRv4_rec_infer.onnx",
    size_hint: "10 MB",
};

const CLS: ModelSpec = ModelSpec {
    url: "https://www.modelscope.cn/models/RapidAI/RapidOCR/resolve/v3.4.0/onnx/PP-OCRv4/cls/ch_ppocr_mobile_v2.0_cls_infer.onnx",
    filename: "ch_ppocr_mobile_v2.0_cls_infer.onnx",
    size_hint: "1 MB",
};

const MODELS: ModelDirConfig = ModelDirConfig {
    subdir: "paddle-ocr",
    required_files: &[DET.filename, REC.filename, CLS.filename],
};

/// Detector and recognizer tuning for poster-sized headline text.
struct DetectParams {
    padding: u32,
    max_side: u32,
    box_score: f32,
    box_threshold: f32,
    unclip_ratio: f32,
}

const DETECT: DetectParams = DetectParams {
    padding: 50,
    max_side: 1024,
    box_score: 0.5,
    box_threshold: 0.3,
    unclip_ratio: 1.6,
};

/// Blocks recognized with a lower score are dropped.
const MIN_TEXT_SCORE: f32 = 0.5;

const THREADS: usize = 4;

/// A recognized block reduced to what ordering and filtering need.
#[derive(Debug, Clone, PartialEq)]
struct Block {
    top: u32,
    left: u32,
    score: f32,
    text: String,
}

/// PaddleOCR backend via ONNX Runtime.
pub struct PaddleBackend {
    config: OcrConfig,
}

impl PaddleBackend {
    pub fn new() -> Self {
        Self::with_config(OcrConfig::default())
    }

    pub fn with_config(config: OcrConfig) -> Self {
        Self { config }
    }

    fn model_dir(&self) -> Option<PathBuf> {
        MODELS.locate(self.config.model_path.as_deref())
    }

    fn engine(&self) -> Result<&'static Mutex<OcrLite>, OcrError> {
        if let Some(engine) = ENGINE.get() {
            return Ok(engine);
        }

        let dir = match self.model_dir() {
            Some(dir) => dir,
            None => {
                let dir = MODELS.default_dir();
                std::fs::create_dir_all(&dir)?;
                for spec in [&DET, &REC, &CLS] {
                    ensure_model_file(spec, &dir)?;
                }
                dir
            }
        };
        let path_of = |spec: &ModelSpec| dir.join(spec.filename).to_string_lossy().into_owned();

        let mut ocr = OcrLite::new();
        ocr.init_models(&path_of(&DET), &path_of(&CLS), &path_of(&REC), THREADS)
            .map_err(|e| OcrError::OcrFailed(format!("Failed to init PaddleOCR: {}", e)))?;

        let _ = ENGINE.set(Mutex::new(ocr));
        ENGINE
            .get()
            .ok_or_else(|| OcrError::OcrFailed("PaddleOCR engine was not cached".to_string()))
    }

    fn detect(&self, image_path: &Path) -> Result<Vec<Block>, OcrError> {
        let path = image_path
            .to_str()
            .ok_or_else(|| OcrError::ImageError(format!("Non UTF-8 path: {:?}", image_path)))?;

        let mut ocr = self
            .engine()?
            .lock()
            .map_err(|e| OcrError::OcrFailed(format!("PaddleOCR engine poisoned: {}", e)))?;

        let result = ocr
            .detect_from_path(
                path,
                DETECT.padding,
                DETECT.max_side,
                DETECT.box_score,
                DETECT.box_threshold,
                DETECT.unclip_ratio,
                true,  // do angle
                false, // most angle
            )
            .map_err(|e| OcrError::OcrFailed(format!("PaddleOCR detection failed: {}", e)))?;

        Ok(result
            .text_blocks
            .iter()
            .map(|block| Block {
                top: block.box_points.iter().map(|p| p.y).min().unwrap_or(0),
                left: block.box_points.iter().map(|p| p.x).min().unwrap_or(0),
                score: block.text_score,
                text: block.text.trim().to_string(),
            })
            .collect())
    }
}

/// Keep confident, non-empty blocks in reading order and average their
/// scores.
fn assemble(mut blocks: Vec<Block>) -> (String, Option<f32>) {
    blocks.retain(|b| b.score >= MIN_TEXT_SCORE && !b.text.is_empty());
    blocks.sort_by_key(|b| (b.top, b.left));

    if blocks.is_empty() {
        return (String::new(), None);
    }

    let mean = blocks.iter().map(|b| b.score).sum::<f32>() / blocks.len() as f32;
    let text = blocks
        .into_iter()
        .map(|b| b.text)
        .collect::<Vec<_>>()
        .join("\n");
    (text, Some(mean))
}

impl Default for PaddleBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrBackend for PaddleBackend {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::PaddleOcr
    }

    fn is_available(&self) -> bool {
        true
    }

    fn availability_hint(&self) -> String {
        match self.model_dir() {
            Some(path) => format!("PaddleOCR models in {}", path.display()),
            None => format!(
                "PaddleOCR models (~15 MB) will be downloaded to {} on first use",
                MODELS.default_dir().display()
            ),
        }
    }

    fn ocr_image(&self, image_path: &Path) -> Result<OcrResult, OcrError> {
        let start = Instant::now();
        let blocks = self.detect(image_path)?;
        let detected = blocks.len();
        let (text, confidence) = assemble(blocks);
        debug!(
            "PaddleOCR: {} blocks, mean score {:?} for {}",
            detected,
            confidence,
            image_path.display()
        );

        Ok(OcrResult {
            text,
            confidence,
            backend: OcrBackendType::PaddleOcr,
            model: Some("PP-OCRv4".to_string()),
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn config_label(&self) -> String {
        format!("min_score={}", MIN_TEXT_SCORE)
    }
}
