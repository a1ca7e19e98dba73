//! Configuration management for flyersort using the prefer crate.
//!
//! A config file (`flyersort.toml`, `.yaml`, `.json`, ...) is discovered by
//! prefer or given explicitly with `--config`. Every section is optional and
//! falls back to the defaults documented on each field.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::classify::MatchPolicy;
use crate::naming::NamingOptions;
use crate::ocr::{OcrConfig, PreprocessOptions};
use crate::organize::OrganizeOptions;
use crate::rules::{RuleSet, RulesError};
use crate::text::{CleanerOptions, SelectionOptions};

/// Name prefer searches for.
pub const CONFIG_NAME: &str = "flyersort";

/// Default catalog database filename.
pub const DEFAULT_DATABASE_FILENAME: &str = "flyers.db";

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "FLYERSORT_DATA_DIR";

/// Characters Tesseract may emit when a whitelist attempt runs.
pub const FLYER_WHITELIST: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyzÀÁÂÃÇÉÊÍÓÔÕÚàáâãçéêíóôõú0123456789!?.,- ";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {format} config {path}: {message}")]
    Parse {
        path: PathBuf,
        format: &'static str,
        message: String,
    },
}

/// A backend entry - either a single backend or a fallback chain.
///
/// Examples:
/// - `"tesseract"` - runs once per configured attempt
/// - `["ocrs", "tesseract"]` - fallback chain, tries ocrs first, tesseract if it fails
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BackendEntry {
    /// Single backend that always runs.
    Single(String),
    /// Fallback chain - tries backends in order until one succeeds.
    Chain(Vec<String>),
}

impl BackendEntry {
    /// Get the primary backend name (first in chain or the single backend).
    pub fn primary(&self) -> &str {
        match self {
            BackendEntry::Single(s) => s,
            BackendEntry::Chain(v) => v.first().map(|s| s.as_str()).unwrap_or(""),
        }
    }

    /// Get all backend names in this entry.
    pub fn backends(&self) -> Vec<&str> {
        match self {
            BackendEntry::Single(s) => vec![s.as_str()],
            BackendEntry::Chain(v) => v.iter().map(|s| s.as_str()).collect(),
        }
    }

    /// Check if this is a fallback chain (multiple backends).
    pub fn is_chain(&self) -> bool {
        matches!(self, BackendEntry::Chain(v) if v.len() > 1)
    }
}

/// One Tesseract configuration to try.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptConfig {
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub psm: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whitelist: Option<String>,
}

impl AttemptConfig {
    fn new(language: &str, psm: u8) -> Self {
        Self {
            language: language.to_string(),
            psm: Some(psm),
            whitelist: None,
        }
    }
}

/// OCR section.
///
/// Each entry in `backends` is either a backend name or a fallback chain.
/// A plain `"tesseract"` entry runs once per item in `attempts`; any other
/// entry runs once with the first attempt's language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    /// Language of the extra pass run when nothing usable was read.
    pub fallback_language: String,
    /// Best cleaned text shorter than this (in characters) triggers the extra pass.
    pub fallback_min_chars: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tessdata_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,
    pub backends: Vec<BackendEntry>,
    pub attempts: Vec<AttemptConfig>,
    pub preprocess: PreprocessOptions,
}

fn default_ocr_backends() -> Vec<BackendEntry> {
    vec![BackendEntry::Single("tesseract".to_string())]
}

fn default_attempts() -> Vec<AttemptConfig> {
    vec![
        AttemptConfig {
            whitelist: Some(FLYER_WHITELIST.to_string()),
            ..AttemptConfig::new("por", 6)
        },
        AttemptConfig::new("por", 6),
        AttemptConfig::new("por", 8),
        AttemptConfig::new("por", 7),
        AttemptConfig::new("por", 11),
    ]
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            backends: default_ocr_backends(),
            attempts: default_attempts(),
            fallback_language: "eng".to_string(),
            fallback_min_chars: 10,
            tessdata_dir: None,
            model_path: None,
            preprocess: PreprocessOptions::default(),
        }
    }
}

impl OcrSettings {
    /// Backend configuration for one attempt.
    pub fn backend_config(&self, attempt: &AttemptConfig) -> OcrConfig {
        OcrConfig {
            language: attempt.language.clone(),
            psm: attempt.psm,
            whitelist: attempt.whitelist.clone(),
            tessdata_dir: self.tessdata_dir.clone(),
            model_path: self.model_path.clone(),
        }
    }

    /// Configuration for entries that do not iterate over attempts.
    pub fn base_config(&self) -> OcrConfig {
        match self.attempts.first() {
            Some(attempt) => OcrConfig {
                whitelist: None,
                ..self.backend_config(attempt)
            },
            None => OcrConfig {
                tessdata_dir: self.tessdata_dir.clone(),
                model_path: self.model_path.clone(),
                ..OcrConfig::default()
            },
        }
    }

    /// Configuration of the extra fallback-language pass.
    pub fn fallback_config(&self) -> OcrConfig {
        OcrConfig {
            psm: Some(6),
            ..self.base_config().with_language(&self.fallback_language)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifySettings {
    pub policy: MatchPolicy,
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data directory path.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "target")]
    pub data_dir: Option<String>,
    /// Database filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Rules file replacing the built-in keyword tables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<String>,
    #[serde(default)]
    pub ocr: OcrSettings,
    #[serde(default)]
    pub cleaner: CleanerOptions,
    #[serde(default)]
    pub selection: SelectionOptions,
    #[serde(default)]
    pub classify: ClassifySettings,
    #[serde(default)]
    pub naming: NamingOptions,
    #[serde(default)]
    pub organize: OrganizeOptions,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers flyersort config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load(CONFIG_NAME).await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => Self::load_from_path(path).await.unwrap_or_else(|e| {
                    warn!("{}; using defaults", e);
                    Self::default()
                }),
                None => Self::default(),
            },
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports TOML, YAML and JSON based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let mut config = Self::parse(&contents, path)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse config text, picking the format from `path`'s extension.
    pub fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let parse_error = |format: &'static str, message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            format,
            message,
        };

        match ext {
            "toml" => toml::from_str(contents).map_err(|e| parse_error("TOML", e.to_string())),
            "yaml" | "yml" => {
                serde_yaml::from_str(contents).map_err(|e| parse_error("YAML", e.to_string()))
            }
            _ => serde_json::from_str(contents).map_err(|e| parse_error("JSON", e.to_string())),
        }
    }

    /// Get the base directory for resolving relative paths.
    /// Returns the config file's parent directory if available, otherwise None.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings and resolve relative paths inside
    /// the OCR section.
    pub fn apply_to_settings(&mut self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = self.resolve_path(data_dir, base_dir);
        }
        if let Some(ref database) = self.database {
            settings.database_filename = database.clone();
        }
        if let Some(ref rules) = self.rules {
            settings.rules_path = Some(self.resolve_path(rules, base_dir));
        }

        let tessdata = self
            .ocr
            .tessdata_dir
            .as_ref()
            .map(|p| self.resolve_path(&p.to_string_lossy(), base_dir));
        let models = self
            .ocr
            .model_path
            .as_ref()
            .map(|p| self.resolve_path(&p.to_string_lossy(), base_dir));
        self.ocr.tessdata_dir = tessdata;
        self.ocr.model_path = models;
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database filename.
    pub database_filename: String,
    /// Rules file, when not using the built-in tables.
    pub rules_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        // Documents dir -> Home dir -> Current dir
        let data_dir = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_NAME);

        Self {
            data_dir,
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            rules_path: None,
        }
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ..Default::default()
        }
    }

    /// Get the full path to the catalog database.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }

    /// Ensure the data directory exists.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.data_dir).map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create data directory '{}': {}",
                    self.data_dir.display(),
                    e
                ),
            )
        })
    }

    /// Load the keyword tables: the configured rules file or the built-in set.
    pub fn load_rules(&self) -> Result<RuleSet, RulesError> {
        RuleSet::load_or_embedded(self.rules_path.as_deref())
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Use CWD for relative paths instead of config file directory.
    pub use_cwd: bool,
    /// Data directory or database file (--target flag).
    /// Can be a directory containing flyers.db or a .db file directly.
    pub target: Option<PathBuf>,
}

/// A `--target` value split into data directory and database filename.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTarget {
    pub data_dir: PathBuf,
    pub database_filename: String,
}

impl ResolvedTarget {
    /// - A `.db`/`.sqlite` path (or an existing file) names the database itself
    /// - Anything else is a directory holding `flyers.db`
    pub fn from_path(path: &Path) -> Self {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(path)
        };

        let is_db_file = path
            .extension()
            .is_some_and(|ext| ext == "db" || ext == "sqlite" || ext == "sqlite3")
            || path.is_file();

        if is_db_file {
            Self {
                database_filename: path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or(DEFAULT_DATABASE_FILENAME)
                    .to_string(),
                data_dir: path.parent().unwrap_or(Path::new(".")).to_path_buf(),
            }
        } else {
            Self {
                data_dir: path,
                database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            }
        }
    }
}

/// Look for a config file inside the data directory.
fn find_config_in_data_dir(data_dir: &Path) -> Option<PathBuf> {
    let extensions = ["toml", "yaml", "yml", "json"];
    let basenames = [CONFIG_NAME, "config"];

    for basename in basenames {
        for ext in extensions {
            let path = data_dir.join(format!("{}.{}", basename, ext));
            if path.exists() {
                return Some(path);
            }
        }
    }
    None
}

/// Load config from file sources.
async fn load_file_config(options: &LoadOptions, data_dir_override: Option<&Path>) -> Config {
    // Priority 1: Explicit --config flag
    if let Some(ref config_path) = options.config_path {
        return Config::load_from_path(config_path)
            .await
            .unwrap_or_else(|e| {
                warn!("{}; using defaults", e);
                Config::default()
            });
    }

    // Priority 2: Config inside the data dir
    if let Some(data_dir) = data_dir_override {
        if let Some(config_path) = find_config_in_data_dir(data_dir) {
            debug!("Found config in data dir: {}", config_path.display());
            return Config::load_from_path(&config_path)
                .await
                .unwrap_or_else(|e| {
                    warn!("{}; using defaults", e);
                    Config::default()
                });
        }
    }

    // Priority 3: Auto-discover via prefer
    Config::load().await
}

/// Load settings with explicit options.
/// Returns (Settings, Config) tuple.
pub async fn load_settings_with_options(options: LoadOptions) -> (Settings, Config) {
    let env_data_dir = std::env::var(DATA_DIR_ENV)
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from);

    let resolved_target = options
        .target
        .as_deref()
        .or(env_data_dir.as_deref())
        .map(ResolvedTarget::from_path);

    let mut config =
        load_file_config(&options, resolved_target.as_ref().map(|t| t.data_dir.as_path())).await;

    let mut settings = Settings::default();

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let base_dir = if options.use_cwd {
        cwd
    } else {
        config.base_dir().unwrap_or(cwd)
    };

    config.apply_to_settings(&mut settings, &base_dir);

    // --target (or FLYERSORT_DATA_DIR) takes precedence over the file
    if let Some(target) = resolved_target {
        debug!("Using data dir {}", target.data_dir.display());
        settings.data_dir = target.data_dir;
        settings.database_filename = target.database_filename;
    }

    (settings, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::MatchPolicy;
    use crate::organize::SuffixStyle;
    use tempfile::TempDir;

    #[test]
    fn test_backend_entry_untagged() {
        let entries: Vec<BackendEntry> =
            serde_json::from_str(r#"["tesseract", ["ocrs", "tesseract"]]"#).unwrap();
        assert_eq!(entries[0], BackendEntry::Single("tesseract".to_string()));
        assert!(entries[1].is_chain());
        assert_eq!(entries[1].primary(), "ocrs");
        assert_eq!(entries[1].backends(), vec!["ocrs", "tesseract"]);
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.ocr.fallback_language, "eng");
        assert_eq!(config.ocr.fallback_min_chars, 10);
        assert_eq!(config.cleaner.max_chars, 150);
        assert_eq!(config.selection.min_chars, 10);
        assert_eq!(config.selection.keyword_bonus, 5);
        assert_eq!(config.classify.policy, MatchPolicy::FirstMatch);
        assert_eq!(config.naming.max_chars, 80);
        assert_eq!(config.organize.suffix, SuffixStyle::Parens);
        assert!(config.ocr.attempts.len() > 1);
    }

    #[test]
    fn test_parse_toml_sections() {
        let toml = r#"
            data_dir = "~/flyers"
            rules = "rules.toml"

            [ocr]
            backends = ["tesseract", ["ocrs", "tesseract"]]
            attempts = [{ language = "por", psm = 6 }]
            fallback_language = "spa"

            [ocr.preprocess]
            contrast = 2.5

            [classify]
            policy = "most-keywords"

            [organize]
            suffix = "underscore"
            backup = true
        "#;
        let config = Config::parse(toml, Path::new("flyersort.toml")).unwrap();
        assert_eq!(config.ocr.backends.len(), 2);
        assert_eq!(config.ocr.attempts[0].psm, Some(6));
        assert_eq!(config.ocr.fallback_language, "spa");
        assert_eq!(config.ocr.fallback_min_chars, 10);
        assert!((config.ocr.preprocess.contrast - 2.5).abs() < f32::EPSILON);
        assert!(config.ocr.preprocess.equalize);
        assert_eq!(config.classify.policy, MatchPolicy::MostKeywords);
        assert_eq!(config.organize.suffix, SuffixStyle::Underscore);
        assert!(config.organize.backup);
        assert!(config.organize.skip_generated);
        assert_eq!(config.cleaner, CleanerOptions::default());
    }

    #[test]
    fn test_parse_yaml_and_json() {
        let yaml = "selection:\n  min_chars: 15\n";
        let config = Config::parse(yaml, Path::new("flyersort.yaml")).unwrap();
        assert_eq!(config.selection.min_chars, 15);
        assert_eq!(config.selection.keyword_bonus, 5);

        let json = r#"{"naming": {"max_chars": 50}}"#;
        let config = Config::parse(json, Path::new("flyersort.json")).unwrap();
        assert_eq!(config.naming.max_chars, 50);
    }

    #[test]
    fn test_parse_error_names_format() {
        let err = Config::parse("[ocr", Path::new("x.toml")).unwrap_err();
        assert!(err.to_string().contains("TOML"));
    }

    #[tokio::test]
    async fn test_load_from_path_resolves_relative_paths() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("flyersort.toml");
        std::fs::write(
            &path,
            "data_dir = \"data\"\nrules = \"my-rules.toml\"\n[ocr]\ntessdata_dir = \"tessdata\"\n",
        )
        .unwrap();

        let mut config = Config::load_from_path(&path).await.unwrap();
        let base = config.base_dir().unwrap();
        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, &base);

        assert_eq!(settings.data_dir, dir.path().join("data"));
        assert_eq!(settings.rules_path, Some(dir.path().join("my-rules.toml")));
        assert_eq!(config.ocr.tessdata_dir, Some(dir.path().join("tessdata")));
    }

    #[tokio::test]
    async fn test_missing_config_file_is_error() {
        let err = Config::load_from_path(Path::new("/nonexistent/flyersort.toml"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_resolved_target() {
        let t = ResolvedTarget::from_path(Path::new("/srv/flyers/catalog.db"));
        assert_eq!(t.data_dir, PathBuf::from("/srv/flyers"));
        assert_eq!(t.database_filename, "catalog.db");

        let t = ResolvedTarget::from_path(Path::new("/srv/flyers"));
        assert_eq!(t.data_dir, PathBuf::from("/srv/flyers"));
        assert_eq!(t.database_filename, DEFAULT_DATABASE_FILENAME);
    }

    #[test]
    fn test_fallback_config_uses_fallback_language() {
        let settings = OcrSettings::default();
        let config = settings.fallback_config();
        assert_eq!(config.language, "eng");
        assert_eq!(config.whitelist, None);
        assert_eq!(config.psm, Some(6));
    }

    #[test]
    fn test_effective_config_round_trips() {
        let rendered = Config::default().to_toml().unwrap();
        let parsed = Config::parse(&rendered, Path::new("x.toml")).unwrap();
        assert_eq!(parsed.ocr, OcrSettings::default());
    }
}
