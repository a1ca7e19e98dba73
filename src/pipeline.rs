//! End-to-end analysis of a single flyer.
//!
//! Enumerator output goes in, a classification and a proposed name come out.
//! Nothing here touches the filesystem apart from reading the image; moving
//! files is left to [`organize`](crate::organize).

use serde::Serialize;
use tracing::{debug, info};

use crate::classify::{text_from_filename, Classifier};
use crate::config::Config;
use crate::models::{Classification, ExtractionAttempt, ImageFile, MatchSource};
use crate::naming::{FilenameGenerator, NameText};
use crate::ocr::TextExtractor;
use crate::rules::{RuleSet, RulesError};
use crate::text::{CandidateSelector, PhraseRanker, TextCleaner};

/// Where the text for classification comes from.
pub enum TextSource {
    /// Run OCR through the extractor.
    Ocr(TextExtractor),
    /// Skip OCR; rely on the file name and folder.
    FilenameOnly,
}

/// Everything the pipeline learned about one image.
#[derive(Debug, Clone, Serialize)]
pub struct FlyerAnalysis {
    pub image: ImageFile,
    pub attempts: Vec<ExtractionAttempt>,
    /// Cleaned text of the winning attempt, empty when nothing was usable.
    pub best_text: String,
    pub classification: Classification,
    pub proposed_name: String,
}

pub struct Pipeline {
    source: TextSource,
    classifier: Classifier,
    generator: FilenameGenerator,
    phrases: PhraseRanker,
}

impl Pipeline {
    pub fn new(
        source: TextSource,
        classifier: Classifier,
        generator: FilenameGenerator,
        phrases: PhraseRanker,
    ) -> Self {
        Self {
            source,
            classifier,
            generator,
            phrases,
        }
    }

    /// Build every stage from configuration. With `use_ocr` off, OCR is
    /// skipped entirely.
    pub fn from_config(config: &Config, rules: &RuleSet, use_ocr: bool) -> Result<Self, RulesError> {
        let source = if use_ocr {
            let cleaner = TextCleaner::new(config.cleaner.clone(), rules)?;
            let selector = CandidateSelector::new(config.selection.clone(), rules);
            TextSource::Ocr(TextExtractor::from_settings(&config.ocr, cleaner, selector))
        } else {
            TextSource::FilenameOnly
        };

        Ok(Self::new(
            source,
            Classifier::new(rules, config.classify.policy),
            FilenameGenerator::new(config.naming.clone(), rules),
            PhraseRanker::new(rules),
        ))
    }

    pub fn extractor(&self) -> Option<&TextExtractor> {
        match &self.source {
            TextSource::Ocr(extractor) => Some(extractor),
            TextSource::FilenameOnly => None,
        }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn generator(&self) -> &FilenameGenerator {
        &self.generator
    }

    /// Analyze one image.
    pub fn analyze(&self, image: &ImageFile) -> FlyerAnalysis {
        let (attempts, winner) = match &self.source {
            TextSource::Ocr(extractor) => {
                let attempts = extractor.extract(&image.path);
                let winner = extractor.selector().select_index(&attempts);
                (attempts, winner)
            }
            TextSource::FilenameOnly => (Vec::new(), None),
        };

        let best_text = winner
            .map(|i| attempts[i].cleaned_text.clone())
            .unwrap_or_default();

        let classification =
            self.classifier
                .classify_flyer(&best_text, &image.file_name, image.parent_name());

        let name_text = match (self.generator.options().text, winner) {
            (NameText::Phrases, Some(i)) => {
                let top = self.phrases.top(&attempts[i].raw_text, 2);
                if top.is_empty() {
                    best_text.clone()
                } else {
                    top
                }
            }
            _ if !best_text.is_empty() => best_text.clone(),
            _ if classification.source == MatchSource::Filename => {
                text_from_filename(&image.file_name)
            }
            _ => String::new(),
        };

        let proposed_name = self
            .generator
            .generate(&classification, &name_text, &image.extension);

        debug!(
            "{} -> {} ({}, via {})",
            image.file_name,
            proposed_name,
            classification.label(),
            classification.source
        );

        FlyerAnalysis {
            image: image.clone(),
            attempts,
            best_text,
            classification,
            proposed_name,
        }
    }

    /// Analyze a batch, calling `on_progress` after each image.
    pub fn analyze_all<F>(&self, images: &[ImageFile], mut on_progress: F) -> Vec<FlyerAnalysis>
    where
        F: FnMut(&FlyerAnalysis),
    {
        let analyses: Vec<FlyerAnalysis> = images
            .iter()
            .map(|image| {
                let analysis = self.analyze(image);
                on_progress(&analysis);
                analysis
            })
            .collect();

        let fallback = analyses
            .iter()
            .filter(|a| a.classification.is_fallback())
            .count();
        info!(
            "Analyzed {} images ({} unclassified)",
            analyses.len(),
            fallback
        );

        analyses
    }
}
