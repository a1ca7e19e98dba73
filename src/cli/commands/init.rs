//! Initialize command.

use console::style;

use flyersort::catalog::CatalogRepository;
use flyersort::config::{Config, Settings, CONFIG_NAME};

/// Initialize the data directory, catalog database and a starter config.
pub async fn cmd_init(settings: &Settings, config: &Config) -> anyhow::Result<()> {
    settings.ensure_directories()?;

    let repo = CatalogRepository::new(&settings.database_path())?;
    println!(
        "  {} Catalog database: {}",
        style("✓").green(),
        repo.db_path().display()
    );

    if config.source_path.is_none() {
        let config_path = settings.data_dir.join(format!("{}.toml", CONFIG_NAME));
        if config_path.exists() {
            println!(
                "  {} Config already exists: {}",
                style("!").yellow(),
                config_path.display()
            );
        } else {
            tokio::fs::write(&config_path, Config::default().to_toml()?).await?;
            println!(
                "  {} Wrote default config: {}",
                style("✓").green(),
                config_path.display()
            );
        }
    } else if let Some(ref path) = config.source_path {
        println!("  {} Using config: {}", style("✓").green(), path.display());
    }

    println!(
        "{} Initialized flyersort in {}",
        style("✓").green(),
        settings.data_dir.display()
    );

    Ok(())
}
