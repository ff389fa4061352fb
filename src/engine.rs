//! Diagnostic engine - runs catalog rules over text units

use crate::diagnostics::{Finding, Range};
use crate::loader::RuleCatalog;
use crate::rules::Rule;
use crate::unit::{split_lines, TextUnit};
use fancy_regex::Regex;

/// Scans text units against a rule catalog
///
/// Findings are ordered by leaf (depth-first), then line, then catalog order
/// within a line. Each rule contributes at most one finding per line.
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticEngine<'a> {
    catalog: &'a RuleCatalog,
}

impl<'a> DiagnosticEngine<'a> {
    /// Create an engine over a catalog
    pub fn new(catalog: &'a RuleCatalog) -> Self {
        Self { catalog }
    }

    /// Scan a unit and return all findings
    pub fn scan(&self, unit: &TextUnit) -> Vec<Finding> {
        let mut findings = Vec::new();
        self.scan_into(unit, &mut findings);
        findings
    }

    /// Scan a single text blob
    pub fn scan_text(&self, text: &str) -> Vec<Finding> {
        let mut findings = Vec::new();
        self.scan_leaf(text, &mut findings);
        findings
    }

    /// Scan a unit, appending findings to `findings`
    pub fn scan_into(&self, unit: &TextUnit, findings: &mut Vec<Finding>) {
        match unit {
            TextUnit::Leaf(text) => self.scan_leaf(text, findings),
            TextUnit::Group(units) => {
                for unit in units {
                    self.scan_into(unit, findings);
                }
            }
        }
    }

    fn scan_leaf(&self, text: &str, findings: &mut Vec<Finding>) {
        if text.is_empty() {
            return;
        }

        let matchers = self.matchers();
        if matchers.is_empty() {
            return;
        }

        for (line_idx, line) in split_lines(text).enumerate() {
            for (rule, regex) in &matchers {
                // First match only
                let m = match regex.find(line) {
                    Ok(Some(m)) => m,
                    Ok(None) => continue,
                    Err(e) => {
                        tracing::warn!(
                            "Skipping rule {} on line {}: pattern failed: {}",
                            rule.code,
                            line_idx,
                            e
                        );
                        continue;
                    }
                };
                let start = utf16_len(&line[..m.start()]);
                let end = start + utf16_len(m.as_str());

                findings.push(Finding::new(
                    &rule.code,
                    rule.severity,
                    &rule.message,
                    Range::on_line(line_idx, start, end),
                ));
            }
        }
    }

    /// Compiled active rules in catalog order
    ///
    /// Rules whose pattern fails to compile are logged and left out; the
    /// rest of the catalog is unaffected.
    fn matchers(&self) -> Vec<(&'a Rule, &'a Regex)> {
        let catalog = self.catalog;
        catalog
            .iter()
            .enumerate()
            .filter(|(_, rule)| rule.is_active())
            .filter_map(|(idx, rule)| match catalog.matcher(idx) {
                Ok(regex) => Some((rule, regex)),
                Err(e) => {
                    tracing::warn!("Skipping rule {}: invalid pattern: {}", rule.code, e);
                    None
                }
            })
            .collect()
    }

    /// Number of rules the engine will evaluate
    ///
    /// Counts rules with a non-empty pattern that compiles.
    pub fn rule_count(&self) -> usize {
        self.catalog
            .iter()
            .enumerate()
            .filter(|(idx, rule)| rule.is_active() && self.catalog.matcher(*idx).is_ok())
            .count()
    }
}

/// Scan `unit` against `catalog`
pub fn scan(unit: &TextUnit, catalog: &RuleCatalog) -> Vec<Finding> {
    DiagnosticEngine::new(catalog).scan(unit)
}

fn utf16_len(s: &str) -> usize {
    s.chars().map(char::len_utf16).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Severity;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    /// Log sink shared between the subscriber and the test
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn rule(code: &str, severity: Severity, pattern: &str) -> Rule {
        Rule {
            code: code.to_string(),
            severity,
            title: format!("TMOS-{}", code),
            message: format!("{} matched", code),
            pattern: pattern.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_single_match_position() {
        let catalog = RuleCatalog::new(vec![rule("W1", Severity::Warning, "bar")]);
        let findings = scan(&TextUnit::leaf("foo bar baz"), &catalog);

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].code, "W1");
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(findings[0].message, "W1 matched");
        assert_eq!(findings[0].range, Range::on_line(0, 4, 7));
    }

    #[test]
    fn test_empty_pattern_never_matches() {
        let catalog = RuleCatalog::new(vec![rule("E0", Severity::Error, "")]);
        let unit = TextUnit::leaf("anything\n\n   \nat all");
        assert!(scan(&unit, &catalog).is_empty());
    }

    #[test]
    fn test_invalid_pattern_is_isolated() {
        let catalog = RuleCatalog::new(vec![
            rule("BAD", Severity::Error, "[unclosed"),
            rule("OK", Severity::Information, "ltm"),
        ]);
        let unit = TextUnit::leaf("ltm pool a\nltm pool b\nltm pool c");
        let findings = scan(&unit, &catalog);

        assert_eq!(findings.len(), 3);
        assert!(findings.iter().all(|f| f.code == "OK"));
        let lines: Vec<_> = findings.iter().map(Finding::line).collect();
        assert_eq!(lines, vec![0, 1, 2]);
    }

    #[test]
    fn test_only_first_match_per_line() {
        let catalog = RuleCatalog::new(vec![rule("R", Severity::Hint, "ab")]);
        let findings = scan(&TextUnit::leaf("ab ab ab"), &catalog);

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].range, Range::on_line(0, 0, 2));
    }

    #[test]
    fn test_order_line_then_catalog() {
        let catalog = RuleCatalog::new(vec![
            rule("SECOND-COL", Severity::Warning, "y"),
            rule("FIRST-COL", Severity::Error, "x"),
        ]);
        let findings = scan(&TextUnit::leaf("x y\nx\ny"), &catalog);
        let order: Vec<_> = findings
            .iter()
            .map(|f| (f.line(), f.code.as_str()))
            .collect();

        // Catalog order wins within a line, even against column order
        assert_eq!(
            order,
            vec![
                (0, "SECOND-COL"),
                (0, "FIRST-COL"),
                (1, "FIRST-COL"),
                (2, "SECOND-COL"),
            ]
        );
    }

    #[test]
    fn test_group_is_depth_first_concatenation() {
        let catalog = RuleCatalog::new(vec![rule("P", Severity::Warning, "pool")]);
        let a = TextUnit::leaf("pool a");
        let b = TextUnit::leaf("x\npool b");
        let c = TextUnit::leaf("pool c\npool d");
        let unit = TextUnit::group(vec![
            a.clone(),
            TextUnit::group(vec![b.clone(), TextUnit::group(Vec::new())]),
            c.clone(),
        ]);

        let mut expected = scan(&a, &catalog);
        expected.extend(scan(&b, &catalog));
        expected.extend(scan(&c, &catalog));

        let findings = scan(&unit, &catalog);
        assert_eq!(findings.len(), 4);
        assert_eq!(findings, expected);
    }

    #[test]
    fn test_lines_are_leaf_relative() {
        let catalog = RuleCatalog::new(vec![rule("P", Severity::Warning, "pool")]);
        let unit = TextUnit::group(vec![
            TextUnit::leaf("a\nb\npool"),
            TextUnit::leaf("pool"),
        ]);
        let lines: Vec<_> = scan(&unit, &catalog).iter().map(Finding::line).collect();
        assert_eq!(lines, vec![2, 0]);
    }

    #[test]
    fn test_empty_inputs() {
        let catalog = RuleCatalog::new(vec![rule("ANY", Severity::Warning, "^")]);
        assert!(scan(&TextUnit::leaf(""), &catalog).is_empty());
        assert!(scan(&TextUnit::group(Vec::new()), &catalog).is_empty());
        assert!(scan(&TextUnit::group(vec![TextUnit::leaf("")]), &catalog).is_empty());
    }

    #[test]
    fn test_whitespace_lines_scanned() {
        let catalog = RuleCatalog::new(vec![rule("WS", Severity::Hint, r"^\s+$")]);
        let findings = scan(&TextUnit::leaf("a\n   \nb"), &catalog);

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].range, Range::on_line(1, 0, 3));
    }

    #[test]
    fn test_trailing_carriage_return_kept() {
        let catalog = RuleCatalog::new(vec![rule("CR", Severity::Hint, "\r$")]);
        let findings = scan(&TextUnit::leaf("a\r\nb"), &catalog);

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].range, Range::on_line(0, 1, 2));
    }

    #[test]
    fn test_columns_in_utf16_units() {
        let catalog = RuleCatalog::new(vec![rule("U", Severity::Warning, "bar")]);
        // 'é' is two bytes in UTF-8 but one UTF-16 unit; the emoji is two units
        let findings = scan(&TextUnit::leaf("é 😀 bar"), &catalog);

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].range, Range::on_line(0, 5, 8));
    }

    #[test]
    fn test_scan_is_idempotent() {
        let catalog = RuleCatalog::new(vec![
            rule("A", Severity::Error, "virtual"),
            rule("B", Severity::Warning, "pool"),
            rule("BAD", Severity::Hint, "(unbalanced"),
        ]);
        let unit = TextUnit::group(vec![
            TextUnit::leaf("ltm virtual v1 {\n  pool p1\n}"),
            TextUnit::leaf("ltm pool p1 { }"),
        ]);
        assert_eq!(scan(&unit, &catalog), scan(&unit, &catalog));
    }

    #[test]
    fn test_scan_text_matches_leaf_scan() {
        let catalog = RuleCatalog::new(vec![rule("A", Severity::Error, "a")]);
        let engine = DiagnosticEngine::new(&catalog);
        assert_eq!(engine.scan_text("a\nb\na"), engine.scan(&TextUnit::leaf("a\nb\na")));
    }

    #[test]
    fn test_scan_into_accumulates() {
        let catalog = RuleCatalog::new(vec![rule("A", Severity::Error, "a")]);
        let engine = DiagnosticEngine::new(&catalog);
        let mut findings = Vec::new();
        engine.scan_into(&TextUnit::leaf("a"), &mut findings);
        engine.scan_into(&TextUnit::leaf("a"), &mut findings);
        assert_eq!(findings.len(), 2);
    }

    #[test]
    fn test_duplicate_codes_not_deduplicated() {
        let catalog = RuleCatalog::new(vec![
            rule("DUP", Severity::Error, "pool"),
            rule("DUP", Severity::Warning, "po"),
        ]);
        let findings = scan(&TextUnit::leaf("pool"), &catalog);
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].severity, Severity::Error);
        assert_eq!(findings[1].severity, Severity::Warning);
    }

    #[test]
    fn test_rule_count_excludes_inactive_and_invalid() {
        let catalog = RuleCatalog::new(vec![
            rule("A", Severity::Error, "a"),
            rule("B", Severity::Error, ""),
            rule("C", Severity::Error, "[bad"),
        ]);
        assert_eq!(DiagnosticEngine::new(&catalog).rule_count(), 1);
    }

    #[test]
    fn test_lookahead_and_backreference_rules() {
        let catalog = RuleCatalog::new(vec![
            rule("LA", Severity::Warning, r"ssl-profile (?!.*tls1_2)"),
            rule("BR", Severity::Hint, r"(\w+) \1"),
        ]);
        let findings = scan(&TextUnit::leaf("ssl-profile clientssl\npool pool"), &catalog);

        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].code, "LA");
        assert_eq!(findings[0].range, Range::on_line(0, 0, 12));
        assert_eq!(findings[1].code, "BR");
        assert_eq!(findings[1].range, Range::on_line(1, 0, 9));
    }

    #[test]
    fn test_negative_lookahead_suppresses_match() {
        let catalog = RuleCatalog::new(vec![rule(
            "LA",
            Severity::Warning,
            r"ssl-profile (?!.*tls1_2)",
        )]);
        let findings = scan(&TextUnit::leaf("ssl-profile clientssl options tls1_2"), &catalog);
        assert!(findings.is_empty());
    }

    #[test]
    fn test_invalid_pattern_logs_warning() {
        let catalog = RuleCatalog::new(vec![
            rule("BAD", Severity::Error, "[unclosed"),
            rule("OK", Severity::Hint, "ltm"),
        ]);
        let expected_error = catalog.matcher(0).unwrap_err().to_string();

        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        let findings = tracing::subscriber::with_default(subscriber, || {
            scan(&TextUnit::leaf("ltm pool a"), &catalog)
        });

        assert_eq!(findings.len(), 1);
        let output = logs.contents();
        assert!(output.contains("WARN"), "no warning in {:?}", output);
        assert!(output.contains("BAD"), "rule code missing in {:?}", output);
        assert!(
            output.contains(&expected_error),
            "regex error missing in {:?}",
            output
        );
    }
}
