//! Configuration handling for f5-lint

use crate::coordinator::DocumentMatcher;
use crate::loader::RuleCatalog;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(#[from] std::io::Error),
    #[error("Failed to parse JSON config: {0}")]
    ParseJson(#[from] serde_json::Error),
    #[error("Failed to parse YAML config: {0}")]
    ParseYaml(#[from] serde_yaml::Error),
    #[error("Invalid glob pattern: {0}")]
    InvalidGlob(#[from] globset::Error),
}

/// Catalog file used when nothing else names one
pub const DEFAULT_CATALOG: &str = "rules.json";

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Rule catalog file
    pub catalog: Option<PathBuf>,
    /// Whether document updates trigger scans
    pub enabled: bool,
    /// Only keep these rules (if Some)
    pub enabled_rules: Option<Vec<String>>,
    /// Drop these rules
    pub disabled_rules: Vec<String>,
    /// Show statistics at the end
    pub statistics: bool,
    /// File patterns never scanned
    pub exclude_patterns: GlobSet,
    /// Recognized document kinds
    pub documents: DocumentMatcher,
    /// Number of parallel jobs (0 = auto)
    pub jobs: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog: None,
            enabled: true,
            enabled_rules: None,
            disabled_rules: Vec::new(),
            statistics: false,
            exclude_patterns: GlobSet::empty(),
            documents: DocumentMatcher::default(),
            jobs: 0,
        }
    }
}

/// CLI options to merge into config
#[derive(Debug, Default)]
pub struct CliOptions {
    /// Catalog path (replaces config if set)
    pub catalog: Option<PathBuf>,
    /// Rules to keep (replaces config if set)
    pub enabled_rules: Option<Vec<String>>,
    /// Rules to drop (adds to config)
    pub disabled_rules: Vec<String>,
    /// Show statistics
    pub statistics: bool,
    /// Number of parallel jobs
    pub jobs: Option<usize>,
}

/// Document kind patterns in the config file
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct DocumentPatterns {
    /// Globs for TMOS configuration files (empty = defaults)
    #[serde(default)]
    pub tmos: Vec<String>,
    /// Globs for NGINX configuration files (empty = defaults)
    #[serde(default)]
    pub nginx: Vec<String>,
}

/// Configuration file format (.f5lintrc.json or .f5lintrc.yaml)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    /// Rule catalog path, relative to the config file
    #[serde(default)]
    pub catalog: Option<PathBuf>,

    /// Whether diagnostics run at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Rules to keep (if specified, only these run)
    #[serde(default)]
    pub select: Vec<String>,

    /// Rules to drop
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Additional rules to drop (added to ignore, not replacing)
    #[serde(default)]
    pub extend_ignore: Vec<String>,

    /// File/folder patterns to exclude
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Recognized document kinds
    #[serde(default)]
    pub documents: DocumentPatterns,

    /// Number of parallel jobs (0 = auto)
    #[serde(default)]
    pub jobs: usize,
}

fn default_enabled() -> bool {
    true
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            catalog: None,
            enabled: true,
            select: Vec::new(),
            ignore: Vec::new(),
            extend_ignore: Vec::new(),
            exclude: Vec::new(),
            documents: DocumentPatterns::default(),
            jobs: 0,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let mut config_file: ConfigFile =
            if path.extension().is_some_and(|e| e == "yaml" || e == "yml") {
                serde_yaml::from_str(&content)?
            } else {
                serde_json::from_str(&content)?
            };

        if let (Some(catalog), Some(dir)) = (config_file.catalog.as_ref(), path.parent()) {
            if catalog.is_relative() {
                config_file.catalog = Some(dir.join(catalog));
            }
        }

        Self::from_config_file(config_file)
    }

    /// Try to find and load config from standard locations
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(PathBuf, Self)>, ConfigError> {
        let config_names = [
            ".f5lintrc.json",
            ".f5lintrc.yaml",
            ".f5lintrc.yml",
            ".f5lintrc",
            "f5lint.json",
            "f5lint.yaml",
        ];

        let mut current = start_dir.to_path_buf();
        loop {
            for name in &config_names {
                let config_path = current.join(name);
                if config_path.exists() {
                    let config = Self::from_file(&config_path)?;
                    return Ok(Some((config_path, config)));
                }
            }

            if !current.pop() {
                break;
            }
        }

        Ok(None)
    }

    /// Build config from a ConfigFile
    pub fn from_config_file(file: ConfigFile) -> Result<Self, ConfigError> {
        let mut exclude_builder = GlobSetBuilder::new();
        for pattern in &file.exclude {
            exclude_builder.add(Glob::new(pattern)?);
        }
        let exclude_patterns = exclude_builder.build()?;

        let documents = DocumentMatcher::from_patterns(&file.documents)?;

        let mut disabled_rules = file.ignore;
        disabled_rules.extend(file.extend_ignore);

        Ok(Self {
            catalog: file.catalog,
            enabled: file.enabled,
            enabled_rules: if file.select.is_empty() {
                None
            } else {
                Some(file.select)
            },
            disabled_rules,
            statistics: false,
            exclude_patterns,
            documents,
            jobs: file.jobs,
        })
    }

    /// Merge CLI options into this config (CLI takes precedence)
    pub fn merge_cli(&mut self, opts: CliOptions) {
        if opts.catalog.is_some() {
            self.catalog = opts.catalog;
        }

        if opts.enabled_rules.is_some() {
            self.enabled_rules = opts.enabled_rules;
        }

        self.disabled_rules.extend(opts.disabled_rules);
        self.statistics = opts.statistics;

        if let Some(j) = opts.jobs {
            self.jobs = j;
        }
    }

    /// Catalog path to load
    pub fn catalog_path(&self) -> PathBuf {
        self.catalog
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG))
    }

    /// Check if a rule is enabled
    pub fn is_rule_enabled(&self, code: &str) -> bool {
        if self.disabled_rules.iter().any(|r| r == code) {
            return false;
        }

        if let Some(ref enabled) = self.enabled_rules {
            return enabled.iter().any(|r| r == code);
        }

        true
    }

    /// Catalog restricted to enabled rules, order preserved
    pub fn apply_to_catalog(&self, catalog: &RuleCatalog) -> RuleCatalog {
        catalog.retain(|rule| self.is_rule_enabled(&rule.code))
    }

    /// Check if a file should be excluded
    pub fn is_file_excluded(&self, file_path: &Path) -> bool {
        self.exclude_patterns.is_match(file_path)
    }
}
