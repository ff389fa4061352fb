//! f5-lint: a rule-driven diagnostic scanner for configuration text
//!
//! Scans TMOS, NGINX and XC configuration text against a catalog of
//! regex rules and reports positioned findings, plus statistics about both
//! the findings and the catalog itself.

pub mod config;
pub mod coordinator;
pub mod diagnostics;
pub mod engine;
pub mod loader;
pub mod output;
pub mod rules;
pub mod stats;
pub mod unit;

pub use config::{CliOptions, Config, ConfigError};
pub use coordinator::{
    DiagnosticSink, DocumentId, DocumentKind, DocumentMatcher, PublishedFindings,
    UpdateCoordinator,
};
pub use diagnostics::{Finding, Position, Range, Severity};
pub use engine::{scan, DiagnosticEngine};
pub use loader::{LoadError, RuleCatalog};
pub use rules::{Category, Rule, Technology};
pub use stats::{catalog_stats, finding_stats, CatalogStats, FindingStats};
pub use unit::TextUnit;
