//! Output formatters for scan results

use crate::diagnostics::{Finding, Range, Severity};
use crate::loader::RuleCatalog;
use crate::stats::{CatalogStats, FindingStats};
use crate::unit::split_lines;
use serde::Serialize;
use std::fmt::Write as _;
use std::io::{self, Write};

/// Findings for one scanned input
#[derive(Debug, Clone)]
pub struct FileFindings {
    /// Display path (`-` for stdin)
    pub path: String,
    /// Scanned text, when lines map to it directly
    pub source: Option<String>,
    pub findings: Vec<Finding>,
}

impl FileFindings {
    pub fn new(path: impl Into<String>, source: Option<String>, findings: Vec<Finding>) -> Self {
        Self {
            path: path.into(),
            source,
            findings,
        }
    }

    fn source_line(&self, line: usize) -> Option<&str> {
        self.source
            .as_deref()
            .and_then(|text| split_lines(text).nth(line))
            .map(|l| l.trim_end_matches('\r'))
    }
}

/// Summarize findings across all inputs
pub fn summarize(results: &[FileFindings]) -> FindingStats {
    let mut stats = FindingStats::default();
    for finding in results.iter().flat_map(|r| &r.findings) {
        stats.record(finding);
    }
    stats
}

/// Format findings in human-readable text
///
/// Locations are shown 1-based, the way editors display them.
pub fn format_text(results: &[FileFindings]) -> String {
    let mut out = String::new();

    for result in results {
        for finding in &result.findings {
            let line = finding.range.start.line + 1;
            let column = finding.range.start.character + 1;

            // Header: severity[code]: message
            let _ = writeln!(
                out,
                "{}[{}]: {}",
                finding.severity.colored(),
                finding.code,
                finding.message
            );

            // Location: --> file:line:column
            let _ = writeln!(
                out,
                "  \x1b[1;34m-->\x1b[0m {}:{}:{}",
                result.path, line, column
            );

            if let Some(source) = result.source_line(finding.range.start.line) {
                let line_num = line.to_string();
                let padding = " ".repeat(line_num.len());

                let _ = writeln!(out, "   \x1b[1;34m{}\x1b[0m |", padding);
                let _ = writeln!(out, " \x1b[1;34m{}\x1b[0m | {}", line_num, source);

                // Underline the match
                let (underline_padding, width) = caret_layout(source, &finding.range);
                let underline = "^".repeat(width);
                let _ = writeln!(
                    out,
                    "   \x1b[1;34m{}\x1b[0m | {}{}{}\x1b[0m",
                    padding,
                    underline_padding,
                    finding.severity.color_code(),
                    underline
                );
            }

            let _ = writeln!(out);
        }
    }

    out
}

/// Padding and caret count that put the underline under `range` in `source`
///
/// Columns are UTF-16 offsets. Tabs before the match are copied so the
/// terminal expands them the same way; every other character pads as one space.
fn caret_layout(source: &str, range: &Range) -> (String, usize) {
    let start = range.start.character;
    let end = range.end.character;
    let mut padding = String::new();
    let mut width = 0;
    let mut offset = 0;

    for c in source.chars() {
        if offset >= end {
            break;
        }
        if offset < start {
            padding.push(if c == '\t' { '\t' } else { ' ' });
        } else {
            width += 1;
        }
        offset += c.len_utf16();
    }

    // Range past the end of the quoted line
    if offset < start {
        padding.push_str(&" ".repeat(start - offset));
    }

    (padding, width.max(1))
}

/// Print findings in human-readable text
pub fn print_text(results: &[FileFindings]) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let _ = handle.write_all(format_text(results).as_bytes());
}

/// Format the per-severity summary printed by `--statistics`
pub fn format_statistics(stats: &FindingStats) -> String {
    let mut out = String::new();
    for (severity, count) in stats.iter() {
        let _ = writeln!(out, "{:>6}  {}", count, severity);
    }
    let _ = writeln!(out, "{:>6}  total", stats.total());
    out
}

pub fn print_statistics(stats: &FindingStats) {
    println!();
    print!("{}", format_statistics(stats));
}

/// JSON output format
#[derive(Serialize)]
struct JsonOutput<'a> {
    files: Vec<JsonFile<'a>>,
    summary: JsonSummary,
}

#[derive(Serialize)]
struct JsonFile<'a> {
    path: &'a str,
    findings: &'a [Finding],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonSummary {
    total: usize,
    by_severity: FindingStats,
}

/// Format findings as JSON; ranges stay zero-based
pub fn format_json(results: &[FileFindings]) -> Result<String, serde_json::Error> {
    let stats = summarize(results);
    let output = JsonOutput {
        files: results
            .iter()
            .map(|r| JsonFile {
                path: &r.path,
                findings: &r.findings,
            })
            .collect(),
        summary: JsonSummary {
            total: stats.total(),
            by_severity: stats,
        },
    };

    serde_json::to_string_pretty(&output)
}

/// Print findings in JSON format
pub fn print_json(results: &[FileFindings]) -> io::Result<()> {
    let json = format_json(results)?;
    println!("{}", json);
    Ok(())
}

/// SARIF (Static Analysis Results Interchange Format) output
#[derive(Serialize)]
struct SarifOutput<'a> {
    #[serde(rename = "$schema")]
    schema: &'static str,
    version: &'static str,
    runs: Vec<SarifRun<'a>>,
}

#[derive(Serialize)]
struct SarifRun<'a> {
    tool: SarifTool,
    results: Vec<SarifResult<'a>>,
}

#[derive(Serialize)]
struct SarifTool {
    driver: SarifDriver,
}

#[derive(Serialize)]
struct SarifDriver {
    name: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct SarifResult<'a> {
    #[serde(rename = "ruleId")]
    rule_id: &'a str,
    level: &'static str,
    message: SarifMessage<'a>,
    locations: Vec<SarifLocation<'a>>,
}

#[derive(Serialize)]
struct SarifMessage<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct SarifLocation<'a> {
    #[serde(rename = "physicalLocation")]
    physical_location: SarifPhysicalLocation<'a>,
}

#[derive(Serialize)]
struct SarifPhysicalLocation<'a> {
    #[serde(rename = "artifactLocation")]
    artifact_location: SarifArtifactLocation<'a>,
    region: SarifRegion,
}

#[derive(Serialize)]
struct SarifArtifactLocation<'a> {
    uri: &'a str,
}

#[derive(Serialize)]
struct SarifRegion {
    #[serde(rename = "startLine")]
    start_line: usize,
    #[serde(rename = "startColumn")]
    start_column: usize,
    #[serde(rename = "endColumn")]
    end_column: usize,
}

fn sarif_level(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Information | Severity::Hint => "note",
    }
}

/// Format findings as SARIF 2.1.0 (for CI/CD integration)
pub fn format_sarif(results: &[FileFindings]) -> Result<String, serde_json::Error> {
    let sarif_results: Vec<SarifResult> = results
        .iter()
        .flat_map(|r| r.findings.iter().map(move |f| (r.path.as_str(), f)))
        .map(|(path, f)| SarifResult {
            rule_id: &f.code,
            level: sarif_level(f.severity),
            message: SarifMessage { text: &f.message },
            locations: vec![SarifLocation {
                physical_location: SarifPhysicalLocation {
                    artifact_location: SarifArtifactLocation { uri: path },
                    region: SarifRegion {
                        start_line: f.range.start.line + 1,
                        start_column: f.range.start.character + 1,
                        end_column: f.range.end.character + 1,
                    },
                },
            }],
        })
        .collect();

    let sarif = SarifOutput {
        schema: "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json",
        version: "2.1.0",
        runs: vec![SarifRun {
            tool: SarifTool {
                driver: SarifDriver {
                    name: "f5-lint",
                    version: env!("CARGO_PKG_VERSION"),
                },
            },
            results: sarif_results,
        }],
    };

    serde_json::to_string_pretty(&sarif)
}

/// Print findings in SARIF format
pub fn print_sarif(results: &[FileFindings]) -> io::Result<()> {
    let sarif = format_sarif(results)?;
    println!("{}", sarif);
    Ok(())
}

/// Format catalog statistics and the rule list as text
pub fn format_catalog_text(catalog: &RuleCatalog, stats: &CatalogStats) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{} rules ({} active)",
        stats.total, stats.active_rules
    );

    let _ = writeln!(out, "\nBy technology:");
    for technology in crate::rules::Technology::ALL {
        let _ = writeln!(
            out,
            "  {:<10} {}",
            technology,
            stats.by_technology.get(technology)
        );
    }

    let _ = writeln!(out, "\nBy severity:");
    for severity in Severity::ALL {
        let _ = writeln!(out, "  {:<12} {}", severity, stats.by_severity.get(severity));
    }

    let _ = writeln!(out, "\nBy category:");
    for (category, count) in stats.by_category.iter() {
        let _ = writeln!(out, "  {:<20} {}", category, count);
    }

    if !catalog.is_empty() {
        let _ = writeln!(out, "\nRules:");
        for rule in catalog.iter() {
            let marker = if rule.has_pattern() { ' ' } else { '-' };
            let _ = writeln!(
                out,
                " {}{:<16} {:<12} {}",
                marker, rule.code, rule.severity, rule.title
            );
        }
    }

    out
}

#[derive(Serialize)]
struct JsonCatalog<'a> {
    stats: &'a CatalogStats,
    rules: Vec<JsonRule<'a>>,
}

#[derive(Serialize)]
struct JsonRule<'a> {
    code: &'a str,
    severity: Severity,
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<&'static str>,
    active: bool,
}

/// Format catalog statistics and the rule list as JSON
pub fn format_catalog_json(
    catalog: &RuleCatalog,
    stats: &CatalogStats,
) -> Result<String, serde_json::Error> {
    let output = JsonCatalog {
        stats,
        rules: catalog
            .iter()
            .map(|r| JsonRule {
                code: &r.code,
                severity: r.severity,
                title: &r.title,
                category: r.category.map(|c| c.as_str()),
                active: r.has_pattern(),
            })
            .collect(),
    };

    serde_json::to_string_pretty(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Category, Rule};
    use crate::stats::catalog_stats;

    fn make_finding(severity: Severity, code: &str, line: usize, start: usize, end: usize) -> Finding {
        Finding::new(
            code,
            severity,
            &format!("Test message for {}", code),
            Range::on_line(line, start, end),
        )
    }

    fn single(findings: Vec<Finding>) -> Vec<FileFindings> {
        vec![FileFindings::new(
            "bigip.conf",
            Some("ltm virtual v1 {\n    ip-forward\n}".to_string()),
            findings,
        )]
    }

    #[test]
    fn test_format_text_location_and_caret() {
        let results = single(vec![make_finding(Severity::Error, "TMOS-002", 1, 4, 14)]);
        let output = format_text(&results);

        assert!(output.contains("[TMOS-002]: Test message for TMOS-002"));
        assert!(output.contains("bigip.conf:2:5"));
        assert!(output.contains("|     ip-forward"));
        assert!(output.contains(&"^".repeat(10)));
        assert!(!output.contains(&"^".repeat(11)));
    }

    #[test]
    fn test_format_text_caret_after_tab_and_wide_char() {
        let results = vec![FileFindings::new(
            "nginx.conf",
            Some("\t\u{1F600} bar".to_string()),
            vec![make_finding(Severity::Warning, "NGINX-009", 0, 4, 7)],
        )];
        let output = format_text(&results);

        let expected = format!("| \t  {}^^^\x1b[0m", Severity::Warning.color_code());
        assert!(output.contains(&expected));
        assert!(!output.contains("^^^^"));
    }

    #[test]
    fn test_caret_layout_past_line_end() {
        let (padding, width) = caret_layout("ab", &Range::on_line(0, 4, 4));
        assert_eq!(padding, "    ");
        assert_eq!(width, 1);
    }

    #[test]
    fn test_format_text_without_source() {
        let results = vec![FileFindings::new(
            "units.json",
            None,
            vec![make_finding(Severity::Hint, "H", 0, 0, 1)],
        )];
        let output = format_text(&results);
        assert!(output.contains("units.json:1:1"));
        assert!(!output.contains('^'));
    }

    #[test]
    fn test_format_text_empty() {
        assert!(format_text(&[]).is_empty());
    }

    #[test]
    fn test_format_statistics() {
        let stats = summarize(&single(vec![
            make_finding(Severity::Warning, "A", 0, 0, 1),
            make_finding(Severity::Warning, "B", 0, 0, 1),
        ]));
        let output = format_statistics(&stats);

        assert!(output.contains("     2  warning"));
        assert!(output.contains("     2  total"));
        assert!(!output.contains("error"));
    }

    #[test]
    fn test_format_json_empty() {
        let output = format_json(&[]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(parsed["files"].as_array().unwrap().len(), 0);
        assert_eq!(parsed["summary"]["total"], 0);
        assert_eq!(parsed["summary"]["bySeverity"], serde_json::json!({}));
    }

    #[test]
    fn test_format_json_zero_based_ranges() {
        let results = single(vec![
            make_finding(Severity::Error, "E1", 1, 4, 14),
            make_finding(Severity::Information, "I1", 0, 0, 3),
        ]);
        let output = format_json(&results).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();

        let finding = &parsed["files"][0]["findings"][0];
        assert_eq!(parsed["files"][0]["path"], "bigip.conf");
        assert_eq!(finding["code"], "E1");
        assert_eq!(finding["severity"], "error");
        assert_eq!(finding["range"]["start"]["line"], 1);
        assert_eq!(finding["range"]["start"]["character"], 4);
        assert_eq!(finding["range"]["end"]["character"], 14);
        assert_eq!(parsed["summary"]["total"], 2);
        assert_eq!(parsed["summary"]["bySeverity"]["error"], 1);
        assert_eq!(parsed["summary"]["bySeverity"]["information"], 1);
        assert!(parsed["summary"]["bySeverity"]["warning"].is_null());
    }

    #[test]
    fn test_format_sarif_empty() {
        let output = format_sarif(&[]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(parsed["version"], "2.1.0");
        assert!(parsed["runs"][0]["results"].as_array().unwrap().is_empty());
        assert_eq!(parsed["runs"][0]["tool"]["driver"]["name"], "f5-lint");
    }

    #[test]
    fn test_format_sarif_one_based_region() {
        let results = single(vec![make_finding(Severity::Warning, "W1", 1, 4, 14)]);
        let output = format_sarif(&results).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();

        let result = &parsed["runs"][0]["results"][0];
        let location = &result["locations"][0]["physicalLocation"];
        assert_eq!(result["ruleId"], "W1");
        assert_eq!(result["level"], "warning");
        assert_eq!(location["artifactLocation"]["uri"], "bigip.conf");
        assert_eq!(location["region"]["startLine"], 2);
        assert_eq!(location["region"]["startColumn"], 5);
        assert_eq!(location["region"]["endColumn"], 15);
    }

    #[test]
    fn test_format_sarif_severity_levels() {
        let results = single(vec![
            make_finding(Severity::Error, "E", 0, 0, 1),
            make_finding(Severity::Warning, "W", 0, 0, 1),
            make_finding(Severity::Information, "I", 0, 0, 1),
            make_finding(Severity::Hint, "H", 0, 0, 1),
        ]);
        let output = format_sarif(&results).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();

        let levels: Vec<_> = parsed["runs"][0]["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["level"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(levels, vec!["error", "warning", "note", "note"]);
    }

    #[test]
    fn test_format_catalog() {
        let catalog = RuleCatalog::new(vec![
            Rule {
                code: "XC-001".to_string(),
                title: "XC-WAF-Off".to_string(),
                severity: Severity::Error,
                pattern: "waf: off".to_string(),
                category: Some(Category::Security),
                ..Default::default()
            },
            Rule {
                code: "GEN-001".to_string(),
                title: "Placeholder".to_string(),
                ..Default::default()
            },
        ]);
        let stats = catalog_stats(&catalog);

        let text = format_catalog_text(&catalog, &stats);
        assert!(text.starts_with("2 rules (1 active)"));
        assert!(text.contains("XC-001"));
        assert!(text.contains(" -GEN-001"));

        let json: serde_json::Value =
            serde_json::from_str(&format_catalog_json(&catalog, &stats).unwrap()).unwrap();
        assert_eq!(json["stats"]["total"], 2);
        assert_eq!(json["stats"]["byTechnology"]["XC"], 1);
        assert_eq!(json["rules"][0]["category"], "security");
        assert_eq!(json["rules"][1]["active"], false);
        assert!(json["rules"][1]["category"].is_null());
    }
}
