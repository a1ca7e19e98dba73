//! Scan, classify, plan and apply commands.

use std::path::{Path, PathBuf};

use console::style;

use flyersort::classify::{Classifier, FlyerMetadata, MetadataDetector};
use flyersort::config::{Config, Settings};
use flyersort::models::{Classification, ImageFile, RenamePlan};
use flyersort::naming::FilenameGenerator;
use flyersort::organize::{backup_dir, create_structure, Mover, Planner};
use flyersort::pipeline::Pipeline;
use flyersort::scan::ImageScanner;

use crate::cli::helpers::{analyze_dir, load_rules, print_plan, progress_bar};

/// List the images a run would pick up.
pub fn cmd_scan(dir: &Path, recursive: bool) -> anyhow::Result<()> {
    let images = ImageScanner::new(recursive).scan(dir)?;
    for image in &images {
        let shown = image.path.strip_prefix(dir).unwrap_or(&image.path);
        println!("  {}", shown.display());
    }
    println!(
        "{} {} images in {}",
        style("✓").green(),
        images.len(),
        dir.display()
    );
    Ok(())
}

fn print_classification(classification: &Classification, metadata: &FlyerMetadata) {
    println!(
        "{} {} {}",
        style("Category:").bold(),
        style(classification.label()).cyan(),
        style(format!("(via {})", classification.source)).dim()
    );
    if let Some(ref keyword) = classification.keyword {
        println!("  Keyword:  {}", keyword);
    }
    if let Some(year) = metadata.year {
        println!("  Year:     {}", year);
    }
    if let Some(ref series) = metadata.series {
        println!("  Series:   {}", series);
    }
    if let Some(ref platform) = metadata.platform {
        println!("  Platform: {}", platform);
    }
    if let Some(ref promotion) = metadata.promotion {
        println!("  Promo:    {}", promotion);
    }
    println!(
        "  Content:  {}  Tone: {}  Urgency: {}",
        metadata.content_category, metadata.tone, metadata.urgency
    );
}

/// Classify literal text, or run one image through the pipeline.
pub fn cmd_classify(
    settings: &Settings,
    config: &Config,
    text: Option<&str>,
    file: Option<&Path>,
    no_ocr: bool,
) -> anyhow::Result<()> {
    let rules = load_rules(settings)?;
    let detector = MetadataDetector::new(&rules);

    if let Some(path) = file {
        let image = ImageFile::from_path(path)
            .ok_or_else(|| anyhow::anyhow!("Not a supported image: {}", path.display()))?;
        if !image.path.is_file() {
            anyhow::bail!("Image not found: {}", path.display());
        }

        let pipeline = Pipeline::from_config(config, &rules, !no_ocr)?;
        let analysis = pipeline.analyze(&image);
        if !analysis.best_text.is_empty() {
            println!("{} {}", style("Text:").bold(), analysis.best_text);
        }
        print_classification(
            &analysis.classification,
            &detector.detect(&analysis.best_text),
        );
        println!(
            "{} {}",
            style("Proposed name:").bold(),
            style(&analysis.proposed_name).green()
        );
        return Ok(());
    }

    let text = text.unwrap_or_default();
    let classifier = Classifier::new(&rules, config.classify.policy);
    print_classification(&classifier.classify(text), &detector.detect(text));
    Ok(())
}

fn build_plan(
    settings: &Settings,
    config: &Config,
    dir: &Path,
    dest: Option<&Path>,
    use_ocr: bool,
    recursive: bool,
) -> anyhow::Result<RenamePlan> {
    let rules = load_rules(settings)?;
    let analyses = analyze_dir(
        config,
        &rules,
        dir,
        use_ocr,
        recursive || config.organize.recursive,
    )?;
    let planner = Planner::new(
        config.organize.clone(),
        FilenameGenerator::new(config.naming.clone(), &rules),
    );
    let mut plan = planner.plan(&analyses, dest);
    plan.source = Some(dir.to_path_buf());
    Ok(plan)
}

/// Show the plan without touching anything.
pub fn cmd_plan(
    settings: &Settings,
    config: &Config,
    dir: &Path,
    dest: Option<&Path>,
    use_ocr: bool,
    recursive: bool,
    json: bool,
) -> anyhow::Result<()> {
    let plan = build_plan(settings, config, dir, dest, use_ocr, recursive)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_plan(&plan, dest.unwrap_or(dir));
    }
    Ok(())
}

/// Where `apply` gets its plan from.
pub enum PlanSource {
    /// Scan and classify a directory now.
    Scan {
        dir: PathBuf,
        dest: Option<PathBuf>,
        use_ocr: bool,
        recursive: bool,
    },
    /// A plan saved earlier with `plan --json`.
    File(PathBuf),
}

fn read_plan(path: &Path) -> anyhow::Result<RenamePlan> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read plan {}: {}", path.display(), e))?;
    serde_json::from_str(&json)
        .map_err(|e| anyhow::anyhow!("Invalid plan {}: {}", path.display(), e))
}

/// Apply a plan. Without `confirm` this only shows it.
pub fn cmd_apply(
    settings: &Settings,
    config: &Config,
    source: PlanSource,
    backup: bool,
    confirm: bool,
) -> anyhow::Result<()> {
    let rules = load_rules(settings)?;
    let plan = match source {
        PlanSource::Scan {
            dir,
            dest,
            use_ocr,
            recursive,
        } => build_plan(settings, config, &dir, dest.as_deref(), use_ocr, recursive)?,
        PlanSource::File(path) => read_plan(&path)?,
    };

    let Some(dir) = plan.source.clone() else {
        anyhow::bail!("Plan does not record its source directory");
    };
    let dest = plan.destination.clone();
    let root = dest.as_deref().unwrap_or(&dir);

    if !confirm {
        print_plan(&plan, root);
        println!();
        println!(
            "{} Nothing was moved. Re-run with --confirm to apply.",
            style("!").yellow()
        );
        return Ok(());
    }

    if plan.is_empty() {
        println!("{} Nothing to do", style("✓").green());
        return Ok(());
    }

    if backup || config.organize.backup {
        let copy = backup_dir(&dir)?;
        println!(
            "{} Backup written to {}",
            style("✓").green(),
            copy.display()
        );
    }

    if let Some(ref dest) = dest {
        create_structure(dest, &rules)?;
    }

    let pb = progress_bar(plan.moves.len())?;
    let report = Mover::new(config.organize.suffix).apply_with(&plan, |planned, result| {
        pb.inc(1);
        match result {
            Ok(to) if !planned.is_noop() => pb.println(format!(
                "  {} {} -> {}",
                style("✓").green(),
                planned.source.strip_prefix(&dir).unwrap_or(&planned.source).display(),
                to.strip_prefix(root).unwrap_or(to).display()
            )),
            Ok(_) => {}
            Err(e) => pb.println(format!("  {} {}", style("✗").red(), e)),
        }
    });
    pb.finish_and_clear();

    println!(
        "{} {} moved, {} unchanged, {} errors",
        if report.error_count() == 0 {
            style("✓").green()
        } else {
            style("!").yellow()
        },
        report.moved,
        report.unchanged,
        report.error_count()
    );

    if report.error_count() > 0 {
        anyhow::bail!("{} files could not be moved", report.error_count());
    }
    Ok(())
}

/// Create the category tree under `dest`.
pub fn cmd_structure(settings: &Settings, dest: &Path) -> anyhow::Result<()> {
    let rules = load_rules(settings)?;
    let created = create_structure(dest, &rules)?;
    println!(
        "{} Created {} folders under {}",
        style("✓").green(),
        created,
        dest.display()
    );
    Ok(())
}
