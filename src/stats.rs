//! Statistics over findings and over the rule catalog

use crate::diagnostics::{Finding, Severity};
use crate::loader::RuleCatalog;
use crate::rules::{Category, Technology};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// One counter per severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SeverityCounts {
    pub error: usize,
    pub warning: usize,
    pub information: usize,
    pub hint: usize,
}

impl SeverityCounts {
    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Error => self.error,
            Severity::Warning => self.warning,
            Severity::Information => self.information,
            Severity::Hint => self.hint,
        }
    }

    pub fn increment(&mut self, severity: Severity) {
        self.add(severity, 1);
    }

    pub fn add(&mut self, severity: Severity, count: usize) {
        let slot = match severity {
            Severity::Error => &mut self.error,
            Severity::Warning => &mut self.warning,
            Severity::Information => &mut self.information,
            Severity::Hint => &mut self.hint,
        };
        *slot += count;
    }

    pub fn total(&self) -> usize {
        self.error + self.warning + self.information + self.hint
    }
}

/// Finding counts by severity
///
/// Only severities that were actually observed are reported; a severity
/// with no findings is absent rather than zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FindingStats {
    counts: SeverityCounts,
}

impl FindingStats {
    /// Record a finding
    pub fn record(&mut self, finding: &Finding) {
        self.counts.increment(finding.severity);
    }

    /// Merge another statistics into this one
    pub fn merge(&mut self, other: &FindingStats) {
        for (severity, count) in other.iter() {
            self.counts.add(severity, count);
        }
    }

    /// Count for `severity`, or None if none were observed
    pub fn get(&self, severity: Severity) -> Option<usize> {
        Some(self.counts.get(severity)).filter(|&n| n > 0)
    }

    /// Observed severities with their counts, in ordinal order
    pub fn iter(&self) -> impl Iterator<Item = (Severity, usize)> + '_ {
        Severity::ALL
            .into_iter()
            .map(|s| (s, self.counts.get(s)))
            .filter(|(_, n)| *n > 0)
    }

    pub fn total(&self) -> usize {
        self.counts.total()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn error_count(&self) -> usize {
        self.counts.error
    }

    pub fn warning_count(&self) -> usize {
        self.counts.warning
    }
}

impl Serialize for FindingStats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (severity, count) in self.iter() {
            map.serialize_entry(severity.as_str(), &count)?;
        }
        map.end()
    }
}

/// Summarize findings by severity
pub fn finding_stats(findings: &[Finding]) -> FindingStats {
    let mut stats = FindingStats::default();
    for finding in findings {
        stats.record(finding);
    }
    stats
}

/// Rule counts by title-inferred technology
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct TechnologyCounts {
    #[serde(rename = "XC")]
    pub xc: usize,
    #[serde(rename = "TMOS")]
    pub tmos: usize,
    #[serde(rename = "NGINX")]
    pub nginx: usize,
    #[serde(rename = "General")]
    pub general: usize,
}

impl TechnologyCounts {
    pub fn get(&self, technology: Technology) -> usize {
        match technology {
            Technology::Xc => self.xc,
            Technology::Tmos => self.tmos,
            Technology::Nginx => self.nginx,
            Technology::General => self.general,
        }
    }

    pub fn increment(&mut self, technology: Technology) {
        let slot = match technology {
            Technology::Xc => &mut self.xc,
            Technology::Tmos => &mut self.tmos,
            Technology::Nginx => &mut self.nginx,
            Technology::General => &mut self.general,
        };
        *slot += 1;
    }
}

/// Rule counts by declared category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryCounts([usize; Category::ALL.len()]);

impl CategoryCounts {
    pub fn get(&self, category: Category) -> usize {
        self.0[category.index()]
    }

    pub fn increment(&mut self, category: Category) {
        self.0[category.index()] += 1;
    }

    /// Every category with its count, including zeros
    pub fn iter(&self) -> impl Iterator<Item = (Category, usize)> + '_ {
        Category::ALL.into_iter().map(|c| (c, self.get(c)))
    }

    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }
}

impl Serialize for CategoryCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Category::ALL.len()))?;
        for (category, count) in self.iter() {
            map.serialize_entry(category.as_str(), &count)?;
        }
        map.end()
    }
}

/// Summary of the rule catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStats {
    /// Number of rules
    pub total: usize,
    /// Counts by title prefix, not by the `technology` field
    pub by_technology: TechnologyCounts,
    /// Counts by declared category; uncategorized rules are not counted
    pub by_category: CategoryCounts,
    /// Counts by declared severity
    pub by_severity: SeverityCounts,
    /// Rules whose pattern is non-empty after trimming
    pub active_rules: usize,
}

/// Summarize the rule catalog
pub fn catalog_stats(catalog: &RuleCatalog) -> CatalogStats {
    let mut stats = CatalogStats {
        total: catalog.len(),
        ..Default::default()
    };

    for rule in catalog.iter() {
        stats.by_severity.increment(rule.severity);
        stats.by_technology.increment(rule.inferred_technology());
        if let Some(category) = rule.category {
            stats.by_category.increment(category);
        }
        if rule.has_pattern() {
            stats.active_rules += 1;
        }
    }

    stats
}
