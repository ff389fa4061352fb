//! Rule catalog - loads rule definitions from a JSON or YAML file

use crate::rules::{Category, Rule, Technology};
use crate::Severity;
use once_cell::sync::OnceCell;
use fancy_regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read rule catalog {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse JSON rule catalog: {0}")]
    ParseJson(#[from] serde_json::Error),
    #[error("Failed to parse YAML rule catalog: {0}")]
    ParseYaml(#[from] serde_yaml::Error),
    #[error("Invalid rule #{index} ({code}): {reason}")]
    InvalidRule {
        index: usize,
        code: String,
        reason: String,
    },
    #[error("Rule catalog was not loaded from a file and cannot be reloaded")]
    NoSource,
}

/// JSON/YAML structure for a single rule record
#[derive(Debug, Deserialize)]
struct RuleRecord {
    code: String,
    severity: String,
    title: String,
    message: String,
    #[serde(default, alias = "regex")]
    pattern: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    technology: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl RuleRecord {
    fn into_rule(self, index: usize) -> Result<Rule, LoadError> {
        let invalid = |reason: String| LoadError::InvalidRule {
            index,
            code: self.code.clone(),
            reason,
        };

        let severity: Severity = self.severity.parse().map_err(invalid)?;
        let category: Option<Category> = non_blank(self.category.as_deref())
            .map(str::parse)
            .transpose()
            .map_err(invalid)?;
        let technology: Option<Technology> = non_blank(self.technology.as_deref())
            .map(str::parse)
            .transpose()
            .map_err(invalid)?;

        Ok(Rule {
            code: self.code,
            severity,
            title: self.title,
            message: self.message,
            pattern: self.pattern,
            category,
            technology,
            description: self.description,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// An ordered, read-only collection of rules
///
/// Patterns are not validated at load time. Each one is compiled on first
/// use and the outcome, success or failure, is cached for the lifetime of
/// this catalog value.
#[derive(Debug, Clone, Default)]
pub struct RuleCatalog {
    rules: Vec<Rule>,
    matchers: Vec<OnceCell<Result<Regex, fancy_regex::Error>>>,
    source: Option<PathBuf>,
}

impl RuleCatalog {
    /// Build a catalog from rules already in memory
    pub fn new(rules: Vec<Rule>) -> Self {
        let matchers = rules.iter().map(|_| OnceCell::new()).collect();
        Self {
            rules,
            matchers,
            source: None,
        }
    }

    /// Load a catalog file
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        Self::from_file(path)
    }

    /// Load a catalog file, choosing YAML for `.yaml`/`.yml` and JSON otherwise
    pub fn from_file(path: &Path) -> Result<Self, LoadError> {
        let content = fs::read_to_string(path).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut catalog = if path.extension().is_some_and(|e| e == "yaml" || e == "yml") {
            Self::from_yaml_str(&content)?
        } else {
            Self::from_json_str(&content)?
        };
        catalog.source = Some(path.to_path_buf());

        tracing::debug!("Loaded {} rules from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// Parse a JSON array of rule records
    pub fn from_json_str(content: &str) -> Result<Self, LoadError> {
        let records: Vec<RuleRecord> = serde_json::from_str(content)?;
        Self::from_records(records)
    }

    /// Parse a YAML sequence of rule records
    pub fn from_yaml_str(content: &str) -> Result<Self, LoadError> {
        let records: Vec<RuleRecord> = serde_yaml::from_str(content)?;
        Self::from_records(records)
    }

    fn from_records(records: Vec<RuleRecord>) -> Result<Self, LoadError> {
        let rules = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| record.into_rule(index))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(rules))
    }

    /// Re-read the catalog's source file, returning a fresh catalog
    ///
    /// `self` is left untouched, so scans holding the old value keep a
    /// consistent view. Any `retain` filter applied to `self` is not
    /// carried over.
    pub fn reload(&self) -> Result<Self, LoadError> {
        let path = self.source.as_deref().ok_or(LoadError::NoSource)?;
        let catalog = Self::from_file(path)?;
        tracing::info!("Reloaded rule catalog from {}", path.display());
        Ok(catalog)
    }

    /// New catalog containing only the rules accepted by `keep`, in order
    ///
    /// The result keeps the source path, so [`reload`](Self::reload) on it
    /// re-reads every rule in the file. Apply the same filter again after
    /// reloading.
    pub fn retain<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&Rule) -> bool,
    {
        let rules = self.rules.iter().filter(|r| keep(r)).cloned().collect();
        let mut catalog = Self::new(rules);
        catalog.source = self.source.clone();
        catalog
    }

    /// Rules in catalog order
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// File this catalog was loaded from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Compiled pattern for the rule at `index`, compiling it on first use
    ///
    /// Patterns may use look-around and backreferences.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn matcher(&self, index: usize) -> Result<&Regex, &fancy_regex::Error> {
        self.matchers[index]
            .get_or_init(|| Regex::new(&self.rules[index].pattern))
            .as_ref()
    }
}
