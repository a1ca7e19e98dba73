//! Organize a batch by file name, then catalog and export the result.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use flyersort::catalog::{CatalogRepository, CatalogStats, WorkbookExporter};
use flyersort::classify::MetadataDetector;
use flyersort::config::Config;
use flyersort::models::ImageFile;
use flyersort::naming::FilenameGenerator;
use flyersort::organize::{create_structure, Mover, Planner};
use flyersort::pipeline::Pipeline;
use flyersort::rules::RuleSet;
use flyersort::scan::ImageScanner;

fn write(dir: &Path, name: &str, content: &[u8]) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(name), content).unwrap();
}

#[test]
fn test_organize_then_catalog() {
    let rules = RuleSet::embedded().unwrap();
    let config = Config::default();
    let tmp = TempDir::new().unwrap();
    let inbox = tmp.path().join("entrada");
    let dest = tmp.path().join("organizado");

    write(&inbox, "ufc_luta_principal_v2.png", b"ufc");
    write(&inbox, "Futebol Brasileirao 2025 - Oferta Hoje.jpg", b"futebol");
    write(&inbox, "ufc_luta_principal (1).png", b"ufc");
    write(&inbox, "notes.txt", b"not an image");

    let images = ImageScanner::new(false).scan(&inbox).unwrap();
    assert_eq!(images.len(), 3);

    let pipeline = Pipeline::from_config(&config, &rules, false).unwrap();
    let analyses = pipeline.analyze_all(&images, |_| {});

    let planner = Planner::new(
        config.organize.clone(),
        FilenameGenerator::new(config.naming.clone(), &rules),
    );
    let plan = planner.plan(&analyses, Some(&dest));
    assert_eq!(plan.moves.len(), 3);

    create_structure(&dest, &rules).unwrap();
    let report = Mover::new(config.organize.suffix).apply(&plan);
    assert_eq!(report.moved, 3);
    assert!(ImageScanner::new(false).scan(&inbox).unwrap().is_empty());

    let repo = CatalogRepository::new(&tmp.path().join("flyers.db")).unwrap();
    let summary = repo
        .rebuild(&dest, &MetadataDetector::new(&rules))
        .unwrap();
    assert_eq!(summary.inserted, 3);
    assert_eq!(summary.errors, 0);

    let records = repo.all().unwrap();
    for analysis in &analyses {
        let id = &analysis.classification.category_id;
        let sub = &analysis.classification.subcategory;
        assert!(
            records
                .iter()
                .any(|r| &r.category == id && &r.subcategory == sub),
            "no row for {}/{}",
            id,
            sub
        );
    }

    let football = repo.search("futebol").unwrap();
    assert_eq!(football.len(), 1);
    assert_eq!(football[0].year, Some(2025));
    assert!(football[0].promotion.is_some());
    assert!(football[0].urgency >= 1);
    assert!(ImageFile::from_path(&dest.join(&football[0].relative_path)).is_some());

    let duplicates = repo.duplicates().unwrap();
    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0].len(), 2);

    let stats = CatalogStats::compute(&records);
    assert_eq!(stats.total, 3);
    assert_eq!(stats.with_year, 1);

    let workbook = tmp.path().join("catalogo.xlsx");
    WorkbookExporter::new(&rules)
        .export(&records, &workbook)
        .unwrap();
    assert!(fs::metadata(&workbook).unwrap().len() > 0);

    // Rebuilding again replaces rather than appends.
    let again = repo
        .rebuild(&dest, &MetadataDetector::new(&rules))
        .unwrap();
    assert_eq!(again.deleted, 3);
    assert_eq!(repo.count().unwrap(), 3);
}
