//! OCR and text extraction.
//!
//! Backends:
//! - **Tesseract**: command-line OCR, always compiled in (default)
//! - **OCRS**: pure Rust OCR, no external binaries (feature: ocr-ocrs)
//! - **PaddleOCR**: CNN-based OCR via ONNX (feature: ocr-paddle)
//!
//! [`TextExtractor`] runs every configured backend and attempt against an
//! image and returns the individual results. Use `OcrManager` to compare
//! engines side by side.

mod backend;
mod extractor;
mod fallback;
mod model_utils;
mod preprocess;
mod tesseract;

#[cfg(feature = "ocr-ocrs")]
mod ocrs_backend;
#[cfg(feature = "ocr-paddle")]
mod paddle_backend;

pub use backend::{OcrBackend, OcrBackendType, OcrConfig, OcrError, OcrManager, OcrResult};
pub use extractor::{build_backends, TextExtractor};
pub use fallback::{check_backend_available, create_backend, FallbackOcrBackend};
pub use model_utils::check_binary;
pub use preprocess::{PreparedImage, PreprocessOptions, Preprocessor};
pub use tesseract::TesseractBackend;

#[cfg(feature = "ocr-ocrs")]
pub use ocrs_backend::OcrsBackend;
#[cfg(feature = "ocr-paddle")]
pub use paddle_backend::PaddleBackend;
