//! Diagnostic types produced by a scan

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Severity level for rules and findings
///
/// The declaration order is the ordinal encoding used by editor hosts and by
/// the statistics counters: Error = 0, Warning = 1, Information = 2, Hint = 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Definite problem
    Error,
    /// Potential issue
    Warning,
    /// Informational note
    Information,
    /// Lowest-priority suggestion
    Hint,
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Severity::Error),
            "warning" | "warn" => Ok(Severity::Warning),
            "information" | "info" => Ok(Severity::Information),
            "hint" => Ok(Severity::Hint),
            _ => Err(format!("unknown severity '{}'", s)),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl Severity {
    /// Every severity, in ordinal order
    pub const ALL: [Severity; 4] = [
        Severity::Error,
        Severity::Warning,
        Severity::Information,
        Severity::Hint,
    ];

    /// Fixed ordinal encoding (Error = 0 .. Hint = 3)
    pub fn ordinal(self) -> usize {
        match self {
            Severity::Error => 0,
            Severity::Warning => 1,
            Severity::Information => 2,
            Severity::Hint => 3,
        }
    }

    /// Get display name
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Information => "information",
            Severity::Hint => "hint",
        }
    }

    /// ANSI color prefix used by the text printer
    pub fn color_code(&self) -> &'static str {
        match self {
            Severity::Error => "\x1b[1;31m",
            Severity::Warning => "\x1b[1;33m",
            Severity::Information => "\x1b[1;36m",
            Severity::Hint => "\x1b[1;32m",
        }
    }

    /// Get colored display name for terminal output
    pub fn colored(&self) -> String {
        format!("{}{}\x1b[0m", self.color_code(), self.as_str())
    }
}

/// Zero-based position inside a scanned text leaf
///
/// `character` counts UTF-16 code units, the unit editor hosts use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Position {
    pub line: usize,
    pub character: usize,
}

/// Half-open span on a single line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    /// Build a span covering `[start_col, end_col)` on `line`
    pub fn on_line(line: usize, start_col: usize, end_col: usize) -> Self {
        Self {
            start: Position {
                line,
                character: start_col,
            },
            end: Position {
                line,
                character: end_col,
            },
        }
    }

    /// Length of the span in columns
    pub fn len(&self) -> usize {
        self.end.character.saturating_sub(self.start.character)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single rule match
///
/// Findings carry no reference to the text leaf that produced them; the
/// range is local to that leaf's own line numbering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    /// Code of the rule that triggered this finding
    pub code: String,
    /// Rule message, copied verbatim
    pub message: String,
    /// Rule severity
    pub severity: Severity,
    /// Matched span
    pub range: Range,
}

impl Finding {
    /// Create a new finding
    pub fn new(
        code: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        range: Range,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            severity,
            range,
        }
    }

    /// Zero-based line of the match
    pub fn line(&self) -> usize {
        self.range.start.line
    }
}
