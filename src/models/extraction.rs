use serde::Serialize;

/// One OCR call against one image with one configuration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionAttempt {
    /// Backend label, e.g. `tesseract` or `ocrs`.
    pub backend: String,
    /// Human-readable configuration, e.g. `lang=por psm=6`.
    pub config: String,
    pub raw_text: String,
    pub cleaned_text: String,
    pub score: usize,
    /// Set when the backend failed; the texts are then empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub processing_time_ms: u64,
}

impl ExtractionAttempt {
    /// An attempt that produced no text because the backend failed.
    pub fn failed(backend: impl Into<String>, config: impl Into<String>, error: impl ToString) -> Self {
        Self {
            backend: backend.into(),
            config: config.into(),
            error: Some(error.to_string()),
            ..Default::default()
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Short label used in logs and tables.
    pub fn label(&self) -> String {
        if self.config.is_empty() {
            self.backend.clone()
        } else {
            format!("{} [{}]", self.backend, self.config)
        }
    }
}
