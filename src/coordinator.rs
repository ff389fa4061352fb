//! Update coordinator - rescans documents on editor events
//!
//! The coordinator owns the catalog and forwards findings to a
//! [`DiagnosticSink`]. Documents whose path matches neither the TMOS nor the
//! NGINX patterns are ignored without error.

use crate::config::DocumentPatterns;
use crate::diagnostics::Finding;
use crate::engine::DiagnosticEngine;
use crate::loader::RuleCatalog;
use crate::unit::TextUnit;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Default globs for NGINX documents
pub const DEFAULT_NGINX_PATTERNS: &[&str] = &["**/nginx.conf", "**/*.nginx", "**/nginx/**/*.conf"];

/// Default globs for TMOS documents
pub const DEFAULT_TMOS_PATTERNS: &[&str] = &["**/bigip*.conf", "**/*.tmos", "**/*.conf"];

/// Document identifier (a path or a `file://` URI)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filesystem path of the document
    pub fn path(&self) -> PathBuf {
        PathBuf::from(self.0.strip_prefix("file://").unwrap_or(&self.0))
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<&Path> for DocumentId {
    fn from(path: &Path) -> Self {
        Self::new(path.to_string_lossy())
    }
}

/// Recognized document kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Tmos,
    Nginx,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Tmos => "tmos",
            DocumentKind::Nginx => "nginx",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Classifies paths into document kinds
///
/// NGINX patterns are checked first, so `nginx/sites/app.conf` is NGINX even
/// though `**/*.conf` also names TMOS.
#[derive(Debug, Clone)]
pub struct DocumentMatcher {
    tmos: GlobSet,
    nginx: GlobSet,
}

impl DocumentMatcher {
    pub fn new<S: AsRef<str>>(tmos: &[S], nginx: &[S]) -> Result<Self, globset::Error> {
        Ok(Self {
            tmos: build_set(tmos)?,
            nginx: build_set(nginx)?,
        })
    }

    /// Build from config patterns; an empty list keeps the defaults
    pub fn from_patterns(patterns: &DocumentPatterns) -> Result<Self, globset::Error> {
        let tmos = if patterns.tmos.is_empty() {
            build_set(DEFAULT_TMOS_PATTERNS)?
        } else {
            build_set(patterns.tmos.as_slice())?
        };
        let nginx = if patterns.nginx.is_empty() {
            build_set(DEFAULT_NGINX_PATTERNS)?
        } else {
            build_set(patterns.nginx.as_slice())?
        };
        Ok(Self { tmos, nginx })
    }

    pub fn kind_of(&self, path: &Path) -> Option<DocumentKind> {
        if self.nginx.is_match(path) {
            Some(DocumentKind::Nginx)
        } else if self.tmos.is_match(path) {
            Some(DocumentKind::Tmos)
        } else {
            None
        }
    }

    pub fn kind_of_document(&self, document: &DocumentId) -> Option<DocumentKind> {
        self.kind_of(&document.path())
    }
}

impl Default for DocumentMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_TMOS_PATTERNS, DEFAULT_NGINX_PATTERNS).unwrap_or_else(|_| Self {
            tmos: GlobSet::empty(),
            nginx: GlobSet::empty(),
        })
    }
}

fn build_set<S: AsRef<str>>(patterns: &[S]) -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern.as_ref())?);
    }
    builder.build()
}

/// Receives findings for display
pub trait DiagnosticSink {
    /// Replace the findings shown for `document`
    fn publish(&mut self, document: &DocumentId, findings: Vec<Finding>);

    /// Remove the findings shown for `document`
    fn clear(&mut self, document: &DocumentId);

    /// Remove all findings
    fn clear_all(&mut self);
}

/// In-memory sink holding the latest findings per document
#[derive(Debug, Default, Clone)]
pub struct PublishedFindings {
    documents: HashMap<DocumentId, Vec<Finding>>,
}

impl PublishedFindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, document: &DocumentId) -> Option<&[Finding]> {
        self.documents.get(document).map(Vec::as_slice)
    }

    pub fn is_published(&self, document: &DocumentId) -> bool {
        self.documents.contains_key(document)
    }

    /// Number of documents with published findings
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> impl Iterator<Item = &DocumentId> {
        self.documents.keys()
    }
}

impl DiagnosticSink for PublishedFindings {
    fn publish(&mut self, document: &DocumentId, findings: Vec<Finding>) {
        self.documents.insert(document.clone(), findings);
    }

    fn clear(&mut self, document: &DocumentId) {
        self.documents.remove(document);
    }

    fn clear_all(&mut self) {
        self.documents.clear();
    }
}

/// Rescans recognized documents on open and change, and publishes findings
pub struct UpdateCoordinator<S: DiagnosticSink> {
    catalog: RuleCatalog,
    matcher: DocumentMatcher,
    sink: S,
    enabled: bool,
    last_document: Option<DocumentId>,
}

impl<S: DiagnosticSink> UpdateCoordinator<S> {
    /// Create an enabled coordinator
    pub fn new(catalog: RuleCatalog, matcher: DocumentMatcher, sink: S) -> Self {
        Self {
            catalog,
            matcher,
            sink,
            enabled: true,
            last_document: None,
        }
    }

    pub fn document_opened(&mut self, document: &DocumentId, text: &str) -> Option<Vec<Finding>> {
        tracing::debug!("Document opened: {}", document);
        self.rescan(document, text)
    }

    pub fn document_changed(&mut self, document: &DocumentId, text: &str) -> Option<Vec<Finding>> {
        tracing::debug!("Document changed: {}", document);
        self.rescan(document, text)
    }

    pub fn document_closed(&mut self, document: &DocumentId) {
        if self.matcher.kind_of_document(document).is_none() {
            return;
        }
        tracing::debug!("Document closed: {}", document);
        self.sink.clear(document);
    }

    /// Rescan a document's full text
    ///
    /// Returns None for unrecognized documents. While disabled, previous
    /// findings are cleared and nothing new is published.
    pub fn rescan(&mut self, document: &DocumentId, text: &str) -> Option<Vec<Finding>> {
        self.rescan_unit(document, &TextUnit::leaf(text))
    }

    /// Rescan a document made of several text units
    pub fn rescan_unit(&mut self, document: &DocumentId, unit: &TextUnit) -> Option<Vec<Finding>> {
        let kind = self.matcher.kind_of_document(document)?;

        self.sink.clear(document);
        self.last_document = Some(document.clone());

        if !self.enabled {
            tracing::debug!("Diagnostics disabled, skipping {}", document);
            return Some(Vec::new());
        }

        let findings = DiagnosticEngine::new(&self.catalog).scan(unit);
        tracing::debug!(
            "Scanned {} document {}: {} finding(s)",
            kind,
            document,
            findings.len()
        );
        self.sink.publish(document, findings.clone());
        Some(findings)
    }

    /// Enable or disable diagnostics; disabling clears everything published
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.sink.clear_all();
        }
        tracing::debug!("Diagnostics {}", if enabled { "enabled" } else { "disabled" });
    }

    /// Flip the enabled flag, returning the new state
    pub fn toggle(&mut self) -> bool {
        self.set_enabled(!self.enabled);
        self.enabled
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Most recently scanned document
    pub fn last_document(&self) -> Option<&DocumentId> {
        self.last_document.as_ref()
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    /// Swap in a new catalog, returning the old one
    ///
    /// Published findings are not rescanned; the next open or change uses
    /// the new rules.
    pub fn replace_catalog(&mut self, catalog: RuleCatalog) -> RuleCatalog {
        tracing::debug!("Catalog replaced: {} rule(s)", catalog.len());
        std::mem::replace(&mut self.catalog, catalog)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}
