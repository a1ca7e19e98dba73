//! Shared helper functions for CLI commands.

use std::path::Path;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use flyersort::config::{Config, Settings};
use flyersort::models::RenamePlan;
use flyersort::pipeline::{FlyerAnalysis, Pipeline};
use flyersort::rules::RuleSet;
use flyersort::scan::ImageScanner;

/// Bar used for every per-image loop.
pub fn progress_bar(len: usize) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Load keyword tables, naming the file on failure.
pub fn load_rules(settings: &Settings) -> anyhow::Result<RuleSet> {
    settings.load_rules().map_err(|e| match settings.rules_path {
        Some(ref path) => anyhow::anyhow!("Failed to load rules from {}: {}", path.display(), e),
        None => anyhow::anyhow!("Built-in rules are invalid: {}", e),
    })
}

/// Scan `dir` and run every image through the pipeline with a progress bar.
pub fn analyze_dir(
    config: &Config,
    rules: &RuleSet,
    dir: &Path,
    use_ocr: bool,
    recursive: bool,
) -> anyhow::Result<Vec<FlyerAnalysis>> {
    let images = ImageScanner::new(recursive).scan(dir)?;
    if images.is_empty() {
        println!(
            "{} No images found in {}",
            style("!").yellow(),
            dir.display()
        );
        return Ok(Vec::new());
    }

    let pipeline = Pipeline::from_config(config, rules, use_ocr)?;
    if let Some(extractor) = pipeline.extractor() {
        if extractor.backends().iter().all(|b| !b.is_available()) {
            println!(
                "{} No OCR backend is available; classifying by file name only",
                style("!").yellow()
            );
        }
    }

    let pb = progress_bar(images.len())?;
    let analyses = pipeline.analyze_all(&images, |analysis| {
        pb.set_message(analysis.image.file_name.clone());
        pb.inc(1);
    });
    pb.finish_and_clear();

    Ok(analyses)
}

/// Print a plan, with paths shown relative to `root` where possible.
pub fn print_plan(plan: &RenamePlan, root: &Path) {
    let rel = |path: &Path| -> String {
        path.strip_prefix(root)
            .unwrap_or(path)
            .display()
            .to_string()
    };

    for planned in &plan.moves {
        if planned.is_noop() {
            println!(
                "  {} {} {}",
                style("=").dim(),
                rel(&planned.source),
                style("(unchanged)").dim()
            );
            continue;
        }
        println!(
            "  {} {} -> {}",
            style("→").cyan(),
            rel(&planned.source),
            style(rel(&planned.target)).bold()
        );
        println!(
            "      {} {}",
            style(planned.classification.label()).dim(),
            style(format!("via {}", planned.classification.source)).dim()
        );
    }

    for skipped in &plan.skipped {
        println!(
            "  {} {} {}",
            style("-").dim(),
            rel(&skipped.path),
            style(format!("({})", skipped.reason)).dim()
        );
    }

    let changes = plan.changes().count();
    println!();
    println!(
        "{} {} to move, {} unchanged, {} skipped",
        style("Plan:").bold(),
        changes,
        plan.moves.len() - changes,
        plan.skipped.len()
    );
}
