//! Single-image OCR inspection.

use std::path::Path;

use console::style;

use flyersort::classify::Classifier;
use flyersort::config::{BackendEntry, Config, Settings};
use flyersort::models::ImageFile;
use flyersort::ocr::{OcrManager, TextExtractor};
use flyersort::text::{char_len, CandidateSelector, TextCleaner};

use crate::cli::helpers::load_rules;

/// Parse `tesseract,ocrs>tesseract` into backend entries.
fn parse_backend_list(list: &str) -> Vec<BackendEntry> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|item| {
            let chain: Vec<String> = item
                .split('>')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if chain.len() == 1 {
                BackendEntry::Single(chain[0].clone())
            } else {
                BackendEntry::Chain(chain)
            }
        })
        .collect()
}

/// Run every configured attempt on one image and show how each scored.
pub fn cmd_ocr(
    settings: &Settings,
    config: &Config,
    image: &Path,
    backends: Option<&str>,
) -> anyhow::Result<()> {
    let file = ImageFile::from_path(image)
        .ok_or_else(|| anyhow::anyhow!("Not a supported image: {}", image.display()))?;
    if !file.path.is_file() {
        anyhow::bail!("Image not found: {}", image.display());
    }

    let rules = load_rules(settings)?;
    let mut ocr = config.ocr.clone();
    if let Some(list) = backends {
        ocr.backends = parse_backend_list(list);
        if ocr.backends.is_empty() {
            anyhow::bail!("No backends given in '{}'", list);
        }
    }

    let cleaner = TextCleaner::new(config.cleaner.clone(), &rules)?;
    let selector = CandidateSelector::new(config.selection.clone(), &rules);
    let extractor = TextExtractor::from_settings(&ocr, cleaner, selector);

    let attempts = extractor.extract(&file.path);
    let winner = extractor.selector().select_index(&attempts);

    println!("{} {}", style("OCR attempts for").bold(), file.file_name);
    for (i, attempt) in attempts.iter().enumerate() {
        let marker = if Some(i) == winner {
            style("★").green()
        } else if attempt.is_failed() {
            style("✗").red()
        } else {
            style("·").dim()
        };
        println!(
            "  {} {} {}",
            marker,
            style(attempt.label()).bold(),
            style(format!(
                "score={} chars={} {}ms",
                attempt.score,
                char_len(&attempt.cleaned_text),
                attempt.processing_time_ms
            ))
            .dim()
        );
        match attempt.error {
            Some(ref error) => println!("      {}", style(error).red()),
            None if attempt.cleaned_text.is_empty() => {
                println!("      {}", style("(no usable text)").dim())
            }
            None => println!("      {}", attempt.cleaned_text),
        }
    }

    let best_text = winner
        .map(|i| attempts[i].cleaned_text.as_str())
        .unwrap_or("");
    let classification = Classifier::new(&rules, config.classify.policy).classify_flyer(
        best_text,
        &file.file_name,
        file.parent_name(),
    );

    println!();
    match winner {
        Some(i) => println!(
            "{} Best: {}",
            style("✓").green(),
            style(attempts[i].label()).cyan()
        ),
        None => println!("{} No attempt produced usable text", style("!").yellow()),
    }
    println!(
        "  Classification: {} {}",
        style(classification.label()).bold(),
        style(format!("(via {})", classification.source)).dim()
    );

    Ok(())
}

/// Run each compiled backend once with default settings, side by side.
pub fn cmd_ocr_compare(config: &Config, image: &Path) -> anyhow::Result<()> {
    if !image.is_file() {
        anyhow::bail!("Image not found: {}", image.display());
    }

    let manager = OcrManager::with_compiled_backends(&config.ocr.base_config());
    let mut ran = 0;

    for backend in manager.backends() {
        if !backend.is_available() {
            println!(
                "{} {} {}",
                style("✗").red(),
                style(backend.name()).bold(),
                style(format!("({})", backend.availability_hint())).dim()
            );
            continue;
        }

        ran += 1;
        match manager.ocr_image_with(image, backend.backend_type()) {
            Ok(result) => {
                println!(
                    "{} {} {}",
                    style("✓").green(),
                    style(backend.name()).bold(),
                    style(format!(
                        "{}ms{}",
                        result.processing_time_ms,
                        result
                            .confidence
                            .map(|c| format!(" confidence={:.2}", c))
                            .unwrap_or_default()
                    ))
                    .dim()
                );
                for line in result.text.lines().filter(|l| !l.trim().is_empty()) {
                    println!("    {}", line.trim());
                }
            }
            Err(e) => println!(
                "{} {} {}",
                style("✗").red(),
                style(backend.name()).bold(),
                style(e).red()
            ),
        }
        println!();
    }

    if ran == 0 {
        println!("{} No OCR backend is available", style("!").yellow());
    }
    Ok(())
}
