//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod catalog;
mod check;
mod init;
mod ocr;
mod organize;
mod rules;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use flyersort::config::{load_settings_with_options, LoadOptions};

#[derive(Parser)]
#[command(name = "flyers")]
#[command(about = "OCR-driven organizer and catalog for IPTV promotional flyers")]
#[command(version)]
pub struct Cli {
    /// Target directory or database file (overrides config file).
    /// Can be a directory containing flyers.db or a .db file directly.
    #[arg(long, short = 't', global = true)]
    target: Option<PathBuf>,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Resolve relative paths from current working directory instead of config file location
    #[arg(long, global = true)]
    cwd: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and catalog database
    Init,

    /// Check which OCR backends are installed and usable
    Check,

    /// List the flyer images in a directory
    Scan {
        /// Directory to scan
        dir: PathBuf,
        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,
    },

    /// Run OCR on one image and show every attempt
    Ocr {
        /// Image to read
        image: PathBuf,
        /// Backends to use instead of the configured list (comma-separated,
        /// `a>b` for a fallback chain, e.g. tesseract,ocrs>tesseract)
        #[arg(short, long)]
        backends: Option<String>,
        /// Run every compiled backend once with default settings and compare
        #[arg(long)]
        compare: bool,
    },

    /// Classify a piece of text or an image file
    Classify {
        /// Text to classify
        #[arg(required_unless_present = "file")]
        text: Option<String>,
        /// Image to OCR and classify instead
        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,
        /// Skip OCR and classify by file and folder name only
        #[arg(long)]
        no_ocr: bool,
    },

    /// Show proposed renames and moves without touching any file
    Plan {
        /// Directory holding the flyers
        dir: PathBuf,
        /// Organize into DEST/<category>/<subcategory> instead of renaming in place
        #[arg(short, long)]
        dest: Option<PathBuf>,
        /// Skip OCR and classify by file and folder name only
        #[arg(long)]
        no_ocr: bool,
        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rename and move flyers (prints the plan and refuses without --confirm)
    Apply {
        /// Directory holding the flyers
        #[arg(required_unless_present = "plan")]
        dir: Option<PathBuf>,
        /// Organize into DEST/<category>/<subcategory> instead of renaming in place
        #[arg(short, long, conflicts_with = "plan")]
        dest: Option<PathBuf>,
        /// Skip OCR and classify by file and folder name only
        #[arg(long)]
        no_ocr: bool,
        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,
        /// Apply a plan saved with `plan --json` instead of planning again
        #[arg(long, value_name = "FILE", conflicts_with_all = ["dir", "no_ocr", "recursive"])]
        plan: Option<PathBuf>,
        /// Copy the source directory to <name>_Backup_<timestamp> first
        #[arg(long)]
        backup: bool,
        /// Actually perform the moves
        #[arg(long)]
        confirm: bool,
    },

    /// Create the category/subcategory folder tree
    Structure {
        /// Destination root
        dest: PathBuf,
    },

    /// Catalog database operations
    Catalog {
        #[command(subcommand)]
        command: CatalogCommands,
    },

    /// Print the effective keyword rules as TOML
    Rules {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum CatalogCommands {
    /// Rebuild the catalog from an organized tree (deletes all rows first)
    Rebuild {
        /// Root of the organized tree
        root: PathBuf,
    },
    /// Export the catalog to an .xlsx workbook
    Export {
        /// Output workbook path
        output: PathBuf,
    },
    /// Search extracted text, file names and keywords
    Search {
        /// Search term
        term: String,
        /// Limit number of results
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },
    /// Show catalog statistics
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List flyers with identical content
    Duplicates,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        use_cwd: cli.cwd,
        target: cli.target,
    };
    let (settings, config) = load_settings_with_options(options).await;

    match cli.command {
        Commands::Init => init::cmd_init(&settings, &config).await,
        Commands::Check => check::cmd_check(&config),
        Commands::Scan { dir, recursive } => {
            organize::cmd_scan(&dir, recursive || config.organize.recursive)
        }
        Commands::Ocr {
            image,
            backends,
            compare,
        } => {
            if compare {
                ocr::cmd_ocr_compare(&config, &image)
            } else {
                ocr::cmd_ocr(&settings, &config, &image, backends.as_deref())
            }
        }
        Commands::Classify { text, file, no_ocr } => {
            organize::cmd_classify(&settings, &config, text.as_deref(), file.as_deref(), no_ocr)
        }
        Commands::Plan {
            dir,
            dest,
            no_ocr,
            recursive,
            json,
        } => organize::cmd_plan(
            &settings,
            &config,
            &dir,
            dest.as_deref(),
            !no_ocr,
            recursive,
            json,
        ),
        Commands::Apply {
            dir,
            dest,
            no_ocr,
            recursive,
            plan,
            backup,
            confirm,
        } => {
            let source = match (plan, dir) {
                (Some(file), _) => organize::PlanSource::File(file),
                (None, Some(dir)) => organize::PlanSource::Scan {
                    dir,
                    dest,
                    use_ocr: !no_ocr,
                    recursive,
                },
                (None, None) => anyhow::bail!("Give a directory or --plan FILE"),
            };
            organize::cmd_apply(&settings, &config, source, backup, confirm)
        }
        Commands::Structure { dest } => organize::cmd_structure(&settings, &dest),
        Commands::Catalog { command } => match command {
            CatalogCommands::Rebuild { root } => catalog::cmd_rebuild(&settings, &root),
            CatalogCommands::Export { output } => catalog::cmd_export(&settings, &output),
            CatalogCommands::Search { term, limit } => {
                catalog::cmd_search(&settings, &term, limit)
            }
            CatalogCommands::Stats { json } => catalog::cmd_stats(&settings, json),
            CatalogCommands::Duplicates => catalog::cmd_duplicates(&settings),
        },
        Commands::Rules { output } => rules::cmd_rules(&settings, output.as_deref()),
    }
}
