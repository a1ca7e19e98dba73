//! Multi-attempt text extraction for a single image.
//!
//! Every configured backend (and, for Tesseract, every configured attempt)
//! runs against the same preprocessed image. A failing attempt never stops
//! the others: it is recorded with its error and empty text. When nothing
//! usable comes back, one extra pass runs in the fallback language.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use super::backend::{OcrBackend, OcrBackendType};
use super::fallback::{create_backend, FallbackOcrBackend};
use super::preprocess::{PreprocessOptions, Preprocessor};
use super::tesseract::TesseractBackend;
use crate::config::{BackendEntry, OcrSettings};
use crate::models::ExtractionAttempt;
use crate::text::{char_len, CandidateSelector, TextCleaner};

/// Runs every configured OCR attempt against an image.
pub struct TextExtractor {
    backends: Vec<Arc<dyn OcrBackend>>,
    fallback: Option<Arc<dyn OcrBackend>>,
    /// Best cleaned text shorter than this triggers the fallback pass.
    fallback_min_chars: usize,
    preprocessor: Preprocessor,
    cleaner: TextCleaner,
    selector: CandidateSelector,
}

impl TextExtractor {
    /// Create an extractor over ready-made backends, with no fallback pass
    /// and no preprocessing.
    pub fn new(
        backends: Vec<Arc<dyn OcrBackend>>,
        cleaner: TextCleaner,
        selector: CandidateSelector,
    ) -> Self {
        Self {
            backends,
            fallback: None,
            fallback_min_chars: 0,
            preprocessor: Preprocessor::new(PreprocessOptions {
                enabled: false,
                ..Default::default()
            }),
            cleaner,
            selector,
        }
    }

    /// Build the backend list described by the OCR config section.
    pub fn from_settings(
        settings: &OcrSettings,
        cleaner: TextCleaner,
        selector: CandidateSelector,
    ) -> Self {
        let fallback: Option<Arc<dyn OcrBackend>> = if settings.fallback_language.is_empty() {
            None
        } else {
            Some(Arc::new(TesseractBackend::with_config(
                settings.fallback_config(),
            )))
        };

        Self::new(build_backends(settings), cleaner, selector)
            .with_fallback(fallback, settings.fallback_min_chars)
            .with_preprocessor(Preprocessor::new(settings.preprocess.clone()))
    }

    /// Set the backend run when the primary pass reads too little.
    pub fn with_fallback(mut self, backend: Option<Arc<dyn OcrBackend>>, min_chars: usize) -> Self {
        self.fallback = backend;
        self.fallback_min_chars = min_chars;
        self
    }

    pub fn with_preprocessor(mut self, preprocessor: Preprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    pub fn backends(&self) -> &[Arc<dyn OcrBackend>] {
        &self.backends
    }

    pub fn cleaner(&self) -> &TextCleaner {
        &self.cleaner
    }

    pub fn selector(&self) -> &CandidateSelector {
        &self.selector
    }

    /// Run every attempt against `image_path`.
    ///
    /// Returned attempts carry cleaned text and score. The list is never
    /// empty when at least one backend is configured.
    pub fn extract(&self, image_path: &Path) -> Vec<ExtractionAttempt> {
        let prepared = match self.preprocessor.prepare(image_path) {
            Ok(prepared) => prepared,
            Err(e) => {
                warn!("Preprocessing {} failed: {}", image_path.display(), e);
                super::preprocess::PreparedImage::Original(image_path.to_path_buf())
            }
        };

        let mut attempts: Vec<ExtractionAttempt> = self
            .backends
            .iter()
            .map(|backend| self.run_attempt(backend.as_ref(), prepared.path()))
            .collect();

        let best_len = attempts
            .iter()
            .map(|a| char_len(&a.cleaned_text))
            .max()
            .unwrap_or(0);

        if best_len < self.fallback_min_chars {
            if let Some(ref fallback) = self.fallback {
                debug!(
                    "Best text for {} has {} chars, running {} pass",
                    image_path.display(),
                    best_len,
                    fallback.config_label()
                );
                attempts.push(self.run_attempt(fallback.as_ref(), prepared.path()));
            }
        }

        attempts
    }

    /// Cleaned text of the winning attempt, or an empty string.
    pub fn best_text(&self, attempts: &[ExtractionAttempt]) -> String {
        self.selector.best_text(attempts)
    }

    fn run_attempt(&self, backend: &dyn OcrBackend, path: &Path) -> ExtractionAttempt {
        let name = backend.name();
        let config = backend.config_label();

        if !backend.is_available() {
            debug!("Skipping {} [{}]: {}", name, config, backend.availability_hint());
            return ExtractionAttempt::failed(name, config, backend.availability_hint());
        }

        match backend.ocr_image(path) {
            Ok(result) => {
                let cleaned_text = self.cleaner.clean(&result.text);
                let score = self.selector.score(&cleaned_text);
                ExtractionAttempt {
                    backend: name,
                    config,
                    raw_text: result.text,
                    cleaned_text,
                    score,
                    error: None,
                    processing_time_ms: result.processing_time_ms,
                }
            }
            Err(e) => {
                warn!("OCR attempt {} [{}] failed on {}: {}", name, config, path.display(), e);
                ExtractionAttempt::failed(name, config, e)
            }
        }
    }
}

/// Expand backend entries into concrete backends.
///
/// A single `tesseract` entry becomes one backend per configured attempt.
pub fn build_backends(settings: &OcrSettings) -> Vec<Arc<dyn OcrBackend>> {
    let base = settings.base_config();
    let mut backends: Vec<Arc<dyn OcrBackend>> = Vec::new();

    for entry in &settings.backends {
        match entry {
            BackendEntry::Single(name)
                if OcrBackendType::from_str(name) == Some(OcrBackendType::Tesseract) =>
            {
                if settings.attempts.is_empty() {
                    backends.push(Arc::new(TesseractBackend::with_config(base.clone())));
                }
                for attempt in &settings.attempts {
                    backends.push(Arc::new(TesseractBackend::with_config(
                        settings.backend_config(attempt),
                    )));
                }
            }
            BackendEntry::Single(name) => match create_backend(name, &base) {
                Some(backend) => backends.push(backend),
                None => warn!("Unknown or disabled OCR backend '{}'", name),
            },
            BackendEntry::Chain(names) => {
                let names: Vec<&str> = names.iter().map(String::as_str).collect();
                backends.push(Arc::new(FallbackOcrBackend::from_names(&names, &base)));
            }
        }
    }

    backends
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AttemptConfig;
    use crate::ocr::{OcrError, OcrResult};
    use crate::rules::RuleSet;
    use crate::text::{CleanerOptions, SelectionOptions};

    struct Scripted {
        label: &'static str,
        reply: Result<&'static str, &'static str>,
    }

    impl OcrBackend for Scripted {
        fn backend_type(&self) -> OcrBackendType {
            OcrBackendType::Tesseract
        }
        fn is_available(&self) -> bool {
            true
        }
        fn availability_hint(&self) -> String {
            String::new()
        }
        fn ocr_image(&self, _image_path: &Path) -> Result<OcrResult, OcrError> {
            match self.reply {
                Ok(text) => Ok(OcrResult {
                    text: text.to_string(),
                    confidence: None,
                    backend: OcrBackendType::Tesseract,
                    model: None,
                    processing_time_ms: 1,
                }),
                Err(msg) => Err(OcrError::OcrFailed(msg.to_string())),
            }
        }
        fn config_label(&self) -> String {
            self.label.to_string()
        }
    }

    fn scripted(label: &'static str, reply: Result<&'static str, &'static str>) -> Arc<dyn OcrBackend> {
        Arc::new(Scripted { label, reply })
    }

    fn extractor(backends: Vec<Arc<dyn OcrBackend>>) -> TextExtractor {
        let rules = RuleSet::embedded().unwrap();
        TextExtractor::new(
            backends,
            TextCleaner::new(CleanerOptions::default(), &rules).unwrap(),
            CandidateSelector::new(SelectionOptions::default(), &rules),
        )
    }

    #[test]
    fn test_failed_attempt_is_empty_not_fatal() {
        let ex = extractor(vec![
            scripted("broken", Err("engine crashed")),
            scripted("good", Ok("ACOMPANHE O BASQUETE AO VIVO")),
        ]);
        let attempts = ex.extract(Path::new("flyer.png"));

        assert_eq!(attempts.len(), 2);
        assert!(attempts[0].is_failed());
        assert_eq!(attempts[0].cleaned_text, "");
        assert_eq!(attempts[1].cleaned_text, "ACOMPANHE BASQUETE AO VIVO");
        assert!(attempts[1].score > 0);
        assert_eq!(ex.best_text(&attempts), "ACOMPANHE BASQUETE AO VIVO");
    }

    #[test]
    fn test_fallback_pass_runs_when_text_is_short() {
        let ex = extractor(vec![scripted("por", Ok("| x |"))])
            .with_fallback(Some(scripted("eng", Ok("WATCH LIVE SPORTS NOW"))), 10);
        let attempts = ex.extract(Path::new("flyer.png"));

        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[1].config, "eng");
        assert_eq!(ex.best_text(&attempts), "WATCH LIVE SPORTS NOW");
    }

    #[test]
    fn test_fallback_pass_skipped_when_text_is_enough() {
        let ex = extractor(vec![scripted("por", Ok("PROMOÇÃO DE NATAL IMPERDÍVEL"))])
            .with_fallback(Some(scripted("eng", Ok("unused"))), 10);
        assert_eq!(ex.extract(Path::new("flyer.png")).len(), 1);
    }

    #[test]
    fn test_build_backends_expands_tesseract_attempts() {
        let settings = OcrSettings {
            attempts: vec![
                AttemptConfig {
                    language: "por".to_string(),
                    psm: Some(6),
                    whitelist: None,
                },
                AttemptConfig {
                    language: "por".to_string(),
                    psm: Some(11),
                    whitelist: None,
                },
            ],
            backends: vec![
                BackendEntry::Single("tesseract".to_string()),
                BackendEntry::Single("not-a-backend".to_string()),
                BackendEntry::Chain(vec!["tesseract".to_string()]),
            ],
            ..Default::default()
        };
        let backends = build_backends(&settings);
        assert_eq!(backends.len(), 3);
        assert_eq!(backends[0].config_label(), "lang=por psm=6");
        assert_eq!(backends[1].config_label(), "lang=por psm=11");
    }
}
