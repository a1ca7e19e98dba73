//! Rules dump command.

use std::path::Path;

use console::style;

use flyersort::config::Settings;

use crate::cli::helpers::load_rules;

/// Print the effective keyword tables, or write them to `output`.
pub fn cmd_rules(settings: &Settings, output: Option<&Path>) -> anyhow::Result<()> {
    let rules = load_rules(settings)?;
    let toml = rules.to_toml()?;

    match output {
        Some(path) => {
            if path.exists() {
                anyhow::bail!("{} already exists", path.display());
            }
            std::fs::write(path, toml)?;
            println!(
                "{} Wrote {} categories to {}",
                style("✓").green(),
                rules.categories.len(),
                path.display()
            );
        }
        None => print!("{}", toml),
    }
    Ok(())
}
