//! OCR backend abstraction.
//!
//! Every engine is an "image in, text out" capability behind [`OcrBackend`].
//! The extractor only ever talks to this trait, so engines can be swapped or
//! chained through configuration.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from OCR backends.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    ImageError(String),
}

/// Result of OCR processing.
#[derive(Debug, Clone)]
pub struct OcrResult {
    /// Extracted text content.
    pub text: String,
    /// Confidence score (0.0 - 1.0), if available.
    pub confidence: Option<f32>,
    /// Which backend produced this result.
    pub backend: OcrBackendType,
    /// Which model or language was used.
    pub model: Option<String>,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Available OCR backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OcrBackendType {
    /// Tesseract OCR via command-line.
    Tesseract,
    /// Pure Rust OCR engine (ocrs crate).
    Ocrs,
    /// PaddleOCR via ONNX Runtime.
    PaddleOcr,
}

impl OcrBackendType {
    /// Every backend type, compiled in or not.
    pub const ALL: [OcrBackendType; 3] = [Self::Tesseract, Self::Ocrs, Self::PaddleOcr];

    pub fn as_str(&self) -> &'static str {
        match self {
            OcrBackendType::Tesseract => "tesseract",
            OcrBackendType::Ocrs => "ocrs",
            OcrBackendType::PaddleOcr => "paddleocr",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "tesseract" => Some(OcrBackendType::Tesseract),
            "ocrs" => Some(OcrBackendType::Ocrs),
            "paddleocr" | "paddle" => Some(OcrBackendType::PaddleOcr),
            _ => None,
        }
    }

    /// Cargo feature that compiles this backend in, if any.
    pub fn feature(&self) -> Option<&'static str> {
        match self {
            OcrBackendType::Tesseract => None,
            OcrBackendType::Ocrs => Some("ocr-ocrs"),
            OcrBackendType::PaddleOcr => Some("ocr-paddle"),
        }
    }

    /// Whether this binary was built with the backend.
    pub fn is_compiled(&self) -> bool {
        match self {
            OcrBackendType::Tesseract => true,
            OcrBackendType::Ocrs => cfg!(feature = "ocr-ocrs"),
            OcrBackendType::PaddleOcr => cfg!(feature = "ocr-paddle"),
        }
    }
}

impl std::fmt::Display for OcrBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trait for OCR backends.
pub trait OcrBackend: Send + Sync {
    /// Get the backend type.
    fn backend_type(&self) -> OcrBackendType;

    /// Check if this backend is available (dependencies installed, models present).
    fn is_available(&self) -> bool;

    /// Get a description of what's needed to make this backend available.
    fn availability_hint(&self) -> String;

    /// Run OCR on an image file.
    fn ocr_image(&self, image_path: &Path) -> Result<OcrResult, OcrError>;

    /// Label used in logs and attempt tables.
    fn name(&self) -> String {
        self.backend_type().to_string()
    }

    /// Short description of the configuration this instance runs with.
    fn config_label(&self) -> String {
        String::new()
    }
}

/// Configuration for OCR backends.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrConfig {
    /// Language for OCR, e.g. "por" or "por+eng".
    pub language: String,
    /// Tesseract page segmentation mode.
    pub psm: Option<u8>,
    /// Characters Tesseract is allowed to emit.
    pub whitelist: Option<String>,
    /// Directory holding `*.traineddata` files.
    pub tessdata_dir: Option<PathBuf>,
    /// Path to model files (for backends that need them).
    pub model_path: Option<PathBuf>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "por".to_string(),
            psm: None,
            whitelist: None,
            tessdata_dir: None,
            model_path: None,
        }
    }
}

impl OcrConfig {
    /// Same configuration with another language.
    pub fn with_language(&self, language: &str) -> Self {
        Self {
            language: language.to_string(),
            ..self.clone()
        }
    }

    /// Compact label such as `lang=por psm=6`.
    pub fn label(&self) -> String {
        let mut parts = vec![format!("lang={}", self.language)];
        if let Some(psm) = self.psm {
            parts.push(format!("psm={}", psm));
        }
        if self.whitelist.is_some() {
            parts.push("whitelist".to_string());
        }
        parts.join(" ")
    }
}

/// Registry of OCR backends, used to inspect and compare engines.
pub struct OcrManager {
    backends: Vec<Box<dyn OcrBackend>>,
    primary: OcrBackendType,
}

impl OcrManager {
    /// Create a new OCR manager with the specified primary backend.
    pub fn new(primary: OcrBackendType) -> Self {
        Self {
            backends: Vec::new(),
            primary,
        }
    }

    /// A manager holding every backend compiled into this binary.
    pub fn with_compiled_backends(config: &OcrConfig) -> Self {
        let mut manager = Self::new(OcrBackendType::Tesseract);
        manager.register(Box::new(super::TesseractBackend::with_config(config.clone())));
        #[cfg(feature = "ocr-ocrs")]
        manager.register(Box::new(super::OcrsBackend::with_config(config.clone())));
        #[cfg(feature = "ocr-paddle")]
        manager.register(Box::new(super::PaddleBackend::with_config(config.clone())));
        manager
    }

    /// Register a backend.
    pub fn register(&mut self, backend: Box<dyn OcrBackend>) {
        self.backends.push(backend);
    }

    /// Get the primary backend.
    pub fn primary(&self) -> Option<&dyn OcrBackend> {
        self.get(self.primary)
    }

    /// Get a specific backend by type.
    pub fn get(&self, backend_type: OcrBackendType) -> Option<&dyn OcrBackend> {
        self.backends
            .iter()
            .find(|b| b.backend_type() == backend_type)
            .map(|b| b.as_ref())
    }

    /// List all registered backends.
    pub fn backends(&self) -> impl Iterator<Item = &dyn OcrBackend> {
        self.backends.iter().map(|b| b.as_ref())
    }

    /// List available backends (those that can actually run).
    pub fn available_backends(&self) -> impl Iterator<Item = &dyn OcrBackend> {
        self.backends
            .iter()
            .filter(|b| b.is_available())
            .map(|b| b.as_ref())
    }

    /// Get a specific backend, validated and ready to use.
    fn get_ready_backend(&self, backend_type: OcrBackendType) -> Result<&dyn OcrBackend, OcrError> {
        let backend = self.get(backend_type).ok_or_else(|| {
            OcrError::BackendNotAvailable(format!("Backend {} not registered", backend_type))
        })?;
        if !backend.is_available() {
            return Err(OcrError::BackendNotAvailable(backend.availability_hint()));
        }
        Ok(backend)
    }

    /// Run OCR using the primary backend.
    pub fn ocr_image(&self, image_path: &Path) -> Result<OcrResult, OcrError> {
        self.get_ready_backend(self.primary)?.ocr_image(image_path)
    }

    /// Run OCR using a specific backend.
    pub fn ocr_image_with(
        &self,
        image_path: &Path,
        backend_type: OcrBackendType,
    ) -> Result<OcrResult, OcrError> {
        self.get_ready_backend(backend_type)?.ocr_image(image_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(OcrBackendType, bool);

    impl OcrBackend for Fixed {
        fn backend_type(&self) -> OcrBackendType {
            self.0
        }
        fn is_available(&self) -> bool {
            self.1
        }
        fn availability_hint(&self) -> String {
            "fixed".to_string()
        }
        fn ocr_image(&self, _image_path: &Path) -> Result<OcrResult, OcrError> {
            Ok(OcrResult {
                text: self.0.to_string(),
                confidence: None,
                backend: self.0,
                model: None,
                processing_time_ms: 0,
            })
        }
    }

    #[test]
    fn test_backend_type_parsing() {
        assert_eq!(OcrBackendType::from_str("Tesseract"), Some(OcrBackendType::Tesseract));
        assert_eq!(OcrBackendType::from_str("paddle"), Some(OcrBackendType::PaddleOcr));
        assert_eq!(OcrBackendType::from_str("gemini"), None);
        for t in OcrBackendType::ALL {
            assert_eq!(OcrBackendType::from_str(t.as_str()), Some(t));
        }
    }

    #[test]
    fn test_config_label() {
        let config = OcrConfig {
            psm: Some(6),
            ..Default::default()
        };
        assert_eq!(config.label(), "lang=por psm=6");
        assert_eq!(config.with_language("eng").label(), "lang=eng psm=6");
    }

    #[test]
    fn test_manager_routes_to_available_backends() {
        let mut manager = OcrManager::new(OcrBackendType::Ocrs);
        manager.register(Box::new(Fixed(OcrBackendType::Tesseract, true)));
        manager.register(Box::new(Fixed(OcrBackendType::Ocrs, false)));

        assert_eq!(manager.backends().count(), 2);
        assert_eq!(manager.available_backends().count(), 1);
        assert!(manager.ocr_image(Path::new("x.png")).is_err());

        let result = manager
            .ocr_image_with(Path::new("x.png"), OcrBackendType::Tesseract)
            .unwrap();
        assert_eq!(result.text, "tesseract");
        assert!(manager
            .ocr_image_with(Path::new("x.png"), OcrBackendType::PaddleOcr)
            .is_err());
    }
}
