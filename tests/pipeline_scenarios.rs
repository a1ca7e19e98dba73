//! End-to-end pipeline tests with scripted OCR engines.
//!
//! Every stage is real except the OCR engine, which replays fixed text so
//! the tests run without tesseract or model files.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use flyersort::classify::{Classifier, MatchPolicy};
use flyersort::models::{ImageFile, MatchSource, RenamePlan};
use flyersort::naming::{FilenameGenerator, NamingOptions};
use flyersort::ocr::{OcrBackend, OcrBackendType, OcrError, OcrResult, TextExtractor};
use flyersort::organize::{backup_dir, Mover, OrganizeOptions, Planner};
use flyersort::pipeline::{Pipeline, TextSource};
use flyersort::rules::RuleSet;
use flyersort::text::{CandidateSelector, CleanerOptions, PhraseRanker, SelectionOptions, TextCleaner};

/// Replays a fixed reply for every image.
struct Replay {
    label: &'static str,
    reply: Result<&'static str, &'static str>,
}

impl OcrBackend for Replay {
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
                processing_time_ms: 0,
            }),
            Err(msg) => Err(OcrError::OcrFailed(msg.to_string())),
        }
    }

    fn config_label(&self) -> String {
        self.label.to_string()
    }
}

fn replay(label: &'static str, reply: Result<&'static str, &'static str>) -> Arc<dyn OcrBackend> {
    Arc::new(Replay { label, reply })
}

fn pipeline(rules: &RuleSet, backends: Vec<Arc<dyn OcrBackend>>) -> Pipeline {
    let extractor = TextExtractor::new(
        backends,
        TextCleaner::new(CleanerOptions::default(), rules).unwrap(),
        CandidateSelector::new(SelectionOptions::default(), rules),
    );
    Pipeline::new(
        TextSource::Ocr(extractor),
        Classifier::new(rules, MatchPolicy::FirstMatch),
        FilenameGenerator::new(NamingOptions::default(), rules),
        PhraseRanker::new(rules),
    )
}

fn image(dir: &Path, name: &str, content: &[u8]) -> ImageFile {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    ImageFile::from_path(&path).unwrap()
}

#[test]
fn test_basketball_flyer_is_classified_and_named() {
    let rules = RuleSet::embedded().unwrap();
    let dir = TempDir::new().unwrap();
    let flyer = image(dir.path(), "IMG_4821_v2.png", b"png");

    let pipeline = pipeline(
        &rules,
        vec![replay("por", Ok("ACOMPANHE O BASQUETE AO VIVO COM QUALIDADE"))],
    );
    let analysis = pipeline.analyze(&flyer);

    assert_eq!(analysis.classification.category, "Esportes");
    assert_eq!(analysis.classification.subcategory, "basquete");
    assert_eq!(analysis.classification.keyword.as_deref(), Some("basquete"));
    assert_eq!(analysis.classification.source, MatchSource::Text);
    assert_eq!(
        analysis.proposed_name,
        "basquete_acompanhe_ao_vivo_qualidade.png"
    );
}

#[test]
fn test_best_attempt_wins_over_noise_and_failures() {
    let rules = RuleSet::embedded().unwrap();
    let dir = TempDir::new().unwrap();
    let flyer = image(dir.path(), "IMG_0007.jpg", b"jpg");

    let pipeline = pipeline(
        &rules,
        vec![
            replay("por psm=3", Ok("| ~ 7 .")),
            replay("por psm=6", Err("engine crashed")),
            replay("por+eng psm=11", Ok("UFC 300 LUTA PRINCIPAL AO VIVO")),
        ],
    );
    let analysis = pipeline.analyze(&flyer);

    assert_eq!(analysis.attempts.len(), 3);
    assert!(analysis.attempts[1].is_failed());
    assert_eq!(analysis.attempts[0].score, 0);
    assert_eq!(analysis.best_text, "UFC 300 LUTA PRINCIPAL AO VIVO");
    assert_eq!(analysis.classification.subcategory, "ufc_mma");
    assert!(analysis.proposed_name.starts_with("ufc_mma_"));
    assert!(analysis.proposed_name.ends_with(".jpg"));
}

#[test]
fn test_unreadable_flyers_get_distinct_generic_names() {
    let rules = RuleSet::embedded().unwrap();
    let root = TempDir::new().unwrap();
    let source = root.path().join("lote");
    let dest = root.path().join("organizado");
    fs::create_dir_all(&source).unwrap();

    let images = vec![
        image(&source, "IMG_1.png", b"first"),
        image(&source, "IMG_2.png", b"second"),
    ];

    let pipeline = pipeline(&rules, vec![replay("por", Ok(""))]);
    let analyses = pipeline.analyze_all(&images, |_| {});

    for analysis in &analyses {
        assert!(analysis.classification.is_fallback());
        assert_eq!(analysis.classification.category_id, rules.fallback.category);
        assert_eq!(analysis.classification.subcategory, rules.fallback.subcategory);
    }
    assert_eq!(analyses[0].proposed_name, analyses[1].proposed_name);

    let planner = Planner::new(
        OrganizeOptions::default(),
        FilenameGenerator::new(NamingOptions::default(), &rules),
    );
    let plan = planner.plan(&analyses, Some(&dest));
    assert_ne!(plan.moves[0].target, plan.moves[1].target);

    let report = Mover::default().apply(&plan);
    assert_eq!(report.moved, 2);
    assert_eq!(report.error_count(), 0);

    let generic = dest
        .join(&rules.fallback.category)
        .join(&rules.fallback.subcategory);
    let mut contents: Vec<Vec<u8>> = fs::read_dir(&generic)
        .unwrap()
        .map(|entry| fs::read(entry.unwrap().path()).unwrap())
        .collect();
    contents.sort();
    assert_eq!(contents, vec![b"first".to_vec(), b"second".to_vec()]);
    assert!(!images[0].path.exists());
    assert!(!images[1].path.exists());
}

#[test]
fn test_apply_resolves_files_created_after_planning() {
    let rules = RuleSet::embedded().unwrap();
    let dir = TempDir::new().unwrap();
    let flyer = image(dir.path(), "IMG_9.png", b"new");

    let pipeline = pipeline(&rules, vec![replay("por", Ok("ASSISTA FUTEBOL AO VIVO HOJE"))]);
    let analysis = pipeline.analyze(&flyer);

    let planner = Planner::new(
        OrganizeOptions::default(),
        FilenameGenerator::new(NamingOptions::default(), &rules),
    );
    let plan = planner.plan(std::slice::from_ref(&analysis), None);
    let planned_target = plan.moves[0].target.clone();

    fs::write(&planned_target, b"intruder").unwrap();

    let report = Mover::default().apply(&plan);
    assert_eq!(report.moved, 1);
    assert_ne!(report.destinations[0], planned_target);
    assert_eq!(fs::read(&planned_target).unwrap(), b"intruder");
    assert_eq!(fs::read(&report.destinations[0]).unwrap(), b"new");
}

#[test]
fn test_saved_plan_applies_as_reviewed_after_backup() {
    let rules = RuleSet::embedded().unwrap();
    let root = TempDir::new().unwrap();
    let source = root.path().join("Divulgacao");
    let dest = root.path().join("organizado");
    fs::create_dir_all(&source).unwrap();
    let flyer = image(&source, "IMG_3.png", b"ufc");

    let pipeline = pipeline(&rules, vec![replay("por", Ok("UFC 300 LUTA PRINCIPAL AO VIVO"))]);
    let analysis = pipeline.analyze(&flyer);
    let planner = Planner::new(
        OrganizeOptions::default(),
        FilenameGenerator::new(NamingOptions::default(), &rules),
    );
    let mut plan = planner.plan(std::slice::from_ref(&analysis), Some(&dest));
    plan.source = Some(source.clone());

    let saved = serde_json::to_string_pretty(&plan).unwrap();
    let reviewed: RenamePlan = serde_json::from_str(&saved).unwrap();
    assert_eq!(reviewed.source.as_deref(), Some(source.as_path()));
    assert_eq!(reviewed.destination.as_deref(), Some(dest.as_path()));
    assert_eq!(reviewed.moves[0].target, plan.moves[0].target);
    assert_eq!(reviewed.moves[0].classification, plan.moves[0].classification);

    let backup = backup_dir(&source).unwrap();
    let report = Mover::default().apply(&reviewed);

    assert_eq!(report.moved, 1);
    assert_eq!(report.destinations[0], plan.moves[0].target);
    assert!(!flyer.path.exists());
    assert_eq!(fs::read(backup.join("IMG_3.png")).unwrap(), b"ufc");
    assert!(backup
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("Divulgacao_Backup_"));
}
