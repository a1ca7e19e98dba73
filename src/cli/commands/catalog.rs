//! Catalog database commands.

use std::path::Path;

use console::style;

use flyersort::catalog::{CatalogRepository, CatalogStats, WorkbookExporter};
use flyersort::classify::MetadataDetector;
use flyersort::config::Settings;

use crate::cli::helpers::load_rules;

fn open_repo(settings: &Settings) -> anyhow::Result<CatalogRepository> {
    settings.ensure_directories()?;
    Ok(CatalogRepository::new(&settings.database_path())?)
}

/// Rebuild the catalog from an organized tree.
pub fn cmd_rebuild(settings: &Settings, root: &Path) -> anyhow::Result<()> {
    let rules = load_rules(settings)?;
    let repo = open_repo(settings)?;

    println!(
        "{} Rebuilding catalog from {}",
        style("→").cyan(),
        root.display()
    );
    let summary = repo.rebuild(root, &MetadataDetector::new(&rules))?;

    println!(
        "{} {} flyers cataloged ({} previous rows removed)",
        style("✓").green(),
        summary.inserted,
        summary.deleted
    );
    if summary.errors > 0 {
        println!(
            "{} {} images could not be read; see the log for details",
            style("!").yellow(),
            summary.errors
        );
    }
    Ok(())
}

/// Export the catalog to a workbook.
pub fn cmd_export(settings: &Settings, output: &Path) -> anyhow::Result<()> {
    let rules = load_rules(settings)?;
    let repo = open_repo(settings)?;
    let records = repo.all()?;

    if records.is_empty() {
        println!(
            "{} Catalog is empty; run `flyers catalog rebuild` first",
            style("!").yellow()
        );
    }

    WorkbookExporter::new(&rules).export(&records, output)?;
    println!(
        "{} Exported {} flyers to {}",
        style("✓").green(),
        records.len(),
        output.display()
    );
    Ok(())
}

/// Search extracted text, names and keywords.
pub fn cmd_search(settings: &Settings, term: &str, limit: usize) -> anyhow::Result<()> {
    let repo = open_repo(settings)?;
    let results = repo.search(term)?;

    if results.is_empty() {
        println!("{} No flyers match '{}'", style("!").yellow(), term);
        return Ok(());
    }

    for record in results.iter().take(limit) {
        println!(
            "  {} {}",
            style(&record.relative_path).bold(),
            style(format!("[{}]", record.category)).dim()
        );
        if !record.extracted_text.is_empty() {
            println!("      {}", record.extracted_text);
        }
    }
    if results.len() > limit {
        println!(
            "  {} and {} more",
            style("…").dim(),
            results.len() - limit
        );
    }
    Ok(())
}

/// Print aggregate figures.
pub fn cmd_stats(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let repo = open_repo(settings)?;
    let stats = CatalogStats::compute(&repo.all()?);

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("{}", style("Catalog").bold());
    for (label, value) in stats.summary_rows() {
        println!("  {:<18} {}", label, value);
    }

    let sections = [
        ("Content", &stats.top_content_categories),
        ("Tone", &stats.top_tones),
        ("Keywords", &stats.top_keywords),
    ];
    for (title, counts) in sections {
        if counts.is_empty() {
            continue;
        }
        println!();
        println!("{}", style(title).bold());
        for (label, count) in counts.iter().take(10) {
            println!("  {:<18} {}", label, count);
        }
    }
    Ok(())
}

/// List groups of identical files.
pub fn cmd_duplicates(settings: &Settings) -> anyhow::Result<()> {
    let repo = open_repo(settings)?;
    let groups = repo.duplicates()?;

    if groups.is_empty() {
        println!("{} No duplicates found", style("✓").green());
        return Ok(());
    }

    for group in &groups {
        println!(
            "{} {}",
            style(&group[0].content_hash[..group[0].content_hash.len().min(12)]).cyan(),
            style(format!("({} copies)", group.len())).dim()
        );
        for record in group {
            println!("  {}", record.relative_path);
        }
    }
    println!();
    println!(
        "{} {} groups, {} redundant files",
        style("!").yellow(),
        groups.len(),
        groups.iter().map(|g| g.len() - 1).sum::<usize>()
    );
    Ok(())
}
