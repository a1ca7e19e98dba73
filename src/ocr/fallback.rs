//! Fallback OCR backend that tries multiple backends in sequence.
//!
//! A chain such as `["ocrs", "tesseract"]` runs the first engine that is
//! available and falls through to the next one when it errors.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::backend::{OcrBackend, OcrBackendType, OcrConfig, OcrError, OcrResult};
use super::tesseract::TesseractBackend;

#[cfg(feature = "ocr-ocrs")]
use super::ocrs_backend::OcrsBackend;
#[cfg(feature = "ocr-paddle")]
use super::paddle_backend::PaddleBackend;

/// A fallback chain of OCR backends.
pub struct FallbackOcrBackend {
    backends: Vec<Arc<dyn OcrBackend>>,
}

impl FallbackOcrBackend {
    /// Build a chain from backend names, keeping only available ones.
    ///
    /// Unknown names are logged and ignored. An empty chain falls back to
    /// Tesseract when it is installed.
    pub fn from_names(backend_names: &[&str], config: &OcrConfig) -> Self {
        let mut backends: Vec<Arc<dyn OcrBackend>> = Vec::new();

        for name in backend_names {
            match create_backend(name, config) {
                Some(backend) if backend.is_available() => {
                    debug!("OCR fallback chain: added {} backend", name);
                    backends.push(backend);
                }
                Some(backend) => debug!(
                    "OCR fallback chain: {} not available ({})",
                    name,
                    backend.availability_hint()
                ),
                None => warn!("OCR fallback chain: unknown backend '{}'", name),
            }
        }

        if backends.is_empty() {
            let tesseract = Arc::new(TesseractBackend::with_config(config.clone()));
            if tesseract.is_available() {
                backends.push(tesseract);
            }
        }

        info!("OCR fallback chain initialized with {} backends", backends.len());
        Self { backends }
    }

    /// Build a chain from ready-made backends, in order.
    pub fn from_backends(backends: Vec<Arc<dyn OcrBackend>>) -> Self {
        Self { backends }
    }

    /// Backend types in the chain, in order.
    pub fn available_backends(&self) -> Vec<OcrBackendType> {
        self.backends.iter().map(|b| b.backend_type()).collect()
    }

    pub fn has_backends(&self) -> bool {
        !self.backends.is_empty()
    }

    fn run_with_fallback<F>(&self, operation: F) -> Result<OcrResult, OcrError>
    where
        F: Fn(&dyn OcrBackend) -> Result<OcrResult, OcrError>,
    {
        let mut last_error: Option<OcrError> = None;

        for backend in &self.backends {
            match operation(backend.as_ref()) {
                Ok(result) => {
                    debug!("OCR succeeded with {} backend", backend.backend_type());
                    return Ok(result);
                }
                Err(e) => {
                    warn!("OCR backend {} failed: {}, trying next", backend.backend_type(), e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            OcrError::BackendNotAvailable("No OCR backends available".to_string())
        }))
    }
}

/// Create a backend by name, if it is compiled into this binary.
pub fn create_backend(name: &str, config: &OcrConfig) -> Option<Arc<dyn OcrBackend>> {
    match OcrBackendType::from_str(name)? {
        OcrBackendType::Tesseract => Some(Arc::new(TesseractBackend::with_config(config.clone()))),
        #[cfg(feature = "ocr-ocrs")]
        OcrBackendType::Ocrs => Some(Arc::new(OcrsBackend::with_config(config.clone()))),
        #[cfg(feature = "ocr-paddle")]
        OcrBackendType::PaddleOcr => Some(Arc::new(PaddleBackend::with_config(config.clone()))),
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

/// Check if a named backend is compiled in and can run.
pub fn check_backend_available(name: &str) -> bool {
    create_backend(name, &OcrConfig::default())
        .map(|b| b.is_available())
        .unwrap_or(false)
}

impl OcrBackend for FallbackOcrBackend {
    fn backend_type(&self) -> OcrBackendType {
        self.backends
            .first()
            .map(|b| b.backend_type())
            .unwrap_or(OcrBackendType::Tesseract)
    }

    fn is_available(&self) -> bool {
        self.backends.iter().any(|b| b.is_available())
    }

    fn availability_hint(&self) -> String {
        if self.backends.is_empty() {
            "No OCR backends configured or available".to_string()
        } else {
            format!("Fallback chain: {}", self.name())
        }
    }

    fn ocr_image(&self, image_path: &Path) -> Result<OcrResult, OcrError> {
        self.run_with_fallback(|backend| backend.ocr_image(image_path))
    }

    fn name(&self) -> String {
        self.backends
            .iter()
            .map(|b| b.backend_type().to_string())
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    fn config_label(&self) -> String {
        self.backends
            .first()
            .map(|b| b.config_label())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scripted {
        kind: OcrBackendType,
        reply: Option<&'static str>,
    }

    impl OcrBackend for Scripted {
        fn backend_type(&self) -> OcrBackendType {
            self.kind
        }
        fn is_available(&self) -> bool {
            true
        }
        fn availability_hint(&self) -> String {
            String::new()
        }
        fn ocr_image(&self, _image_path: &Path) -> Result<OcrResult, OcrError> {
            match self.reply {
                Some(text) => Ok(OcrResult {
                    text: text.to_string(),
                    confidence: None,
                    backend: self.kind,
                    model: None,
                    processing_time_ms: 0,
                }),
                None => Err(OcrError::OcrFailed("scripted failure".to_string())),
            }
        }
    }

    #[test]
    fn test_unknown_backend_ignored() {
        let chain = FallbackOcrBackend::from_names(&["gemini", "tesseract"], &OcrConfig::default());
        assert!(chain.available_backends().len() <= 1);
        assert!(create_backend("gemini", &OcrConfig::default()).is_none());
    }

    #[test]
    fn test_falls_through_to_next_backend() {
        let chain = FallbackOcrBackend::from_backends(vec![
            Arc::new(Scripted {
                kind: OcrBackendType::Ocrs,
                reply: None,
            }),
            Arc::new(Scripted {
                kind: OcrBackendType::Tesseract,
                reply: Some("AO VIVO"),
            }),
        ]);
        let result = chain.ocr_image(Path::new("x.png")).unwrap();
        assert_eq!(result.text, "AO VIVO");
        assert_eq!(result.backend, OcrBackendType::Tesseract);
        assert_eq!(chain.name(), "ocrs -> tesseract");
    }

    #[test]
    fn test_empty_chain_errors() {
        let chain = FallbackOcrBackend::from_backends(Vec::new());
        assert!(!chain.is_available());
        assert!(matches!(
            chain.ocr_image(Path::new("x.png")),
            Err(OcrError::BackendNotAvailable(_))
        ));
    }
}
