//! Backend availability check.

use console::style;

use flyersort::config::Config;
use flyersort::ocr::{build_backends, check_binary, OcrManager, TesseractBackend};

/// Report which OCR backends can run and which languages tesseract has.
pub fn cmd_check(config: &Config) -> anyhow::Result<()> {
    let base = config.ocr.base_config();
    let manager = OcrManager::with_compiled_backends(&base);

    println!("{}", style("OCR backends").bold());
    for backend in manager.backends() {
        if backend.is_available() {
            println!("  {} {}", style("✓").green(), backend.name());
        } else {
            println!(
                "  {} {} {}",
                style("✗").red(),
                backend.name(),
                style(format!("({})", backend.availability_hint())).dim()
            );
        }
    }

    let tesseract = TesseractBackend::with_config(base);
    if check_binary("tesseract") {
        let installed = tesseract.installed_languages();
        println!();
        println!("{}", style("Tesseract languages").bold());
        println!("  {}", installed.join(", "));

        let mut wanted: Vec<&str> = config
            .ocr
            .attempts
            .iter()
            .flat_map(|a| a.language.split('+'))
            .chain(config.ocr.fallback_language.split('+'))
            .filter(|l| !l.is_empty())
            .collect();
        wanted.sort_unstable();
        wanted.dedup();

        for lang in wanted {
            if !tesseract.has_language(lang) {
                println!(
                    "  {} Language '{}' is configured but not installed",
                    style("!").yellow(),
                    lang
                );
            }
        }
    }

    let configured = build_backends(&config.ocr);
    let usable = configured.iter().filter(|b| b.is_available()).count();
    println!();
    println!(
        "{} {} of {} configured attempts can run",
        if usable > 0 {
            style("✓").green()
        } else {
            style("✗").red()
        },
        usable,
        configured.len()
    );
    if usable == 0 {
        println!("  Images will be classified by file and folder name only");
    }

    Ok(())
}
