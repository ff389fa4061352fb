//! Text units - the scan input shape
//!
//! A unit is either one text blob or an ordered group of units. Groups model
//! a document made of logically separate sub-documents (apps) that are still
//! scanned under one call. In JSON a leaf is a string and a group is an array:
//!
//! ```json
//! ["ltm virtual /Common/app1 { }", ["ltm pool /Common/p1 { }", "ltm node n1 { }"]]
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextUnit {
    /// Newline-separated lines
    Leaf(String),
    /// Ordered sub-units, scanned depth-first, left to right
    Group(Vec<TextUnit>),
}

impl TextUnit {
    pub fn leaf(text: impl Into<String>) -> Self {
        TextUnit::Leaf(text.into())
    }

    pub fn group(units: impl IntoIterator<Item = TextUnit>) -> Self {
        TextUnit::Group(units.into_iter().collect())
    }

    /// Parse a unit from JSON (a string, or nested arrays of strings)
    pub fn from_json_str(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Leaf texts in depth-first, left-to-right order
    pub fn leaves(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            TextUnit::Leaf(text) => out.push(text.as_str()),
            TextUnit::Group(units) => {
                for unit in units {
                    unit.collect_leaves(out);
                }
            }
        }
    }

    /// True when no leaf has any line to scan
    pub fn is_empty(&self) -> bool {
        match self {
            TextUnit::Leaf(text) => text.is_empty(),
            TextUnit::Group(units) => units.iter().all(TextUnit::is_empty),
        }
    }
}

impl From<&str> for TextUnit {
    fn from(text: &str) -> Self {
        TextUnit::Leaf(text.to_string())
    }
}

impl From<String> for TextUnit {
    fn from(text: String) -> Self {
        TextUnit::Leaf(text)
    }
}

impl From<Vec<TextUnit>> for TextUnit {
    fn from(units: Vec<TextUnit>) -> Self {
        TextUnit::Group(units)
    }
}

/// Split leaf text into scan lines
///
/// Only `\n` separates lines, so a trailing `\r` stays on the line. The
/// empty string has no lines at all.
pub fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    let mut lines = text.split('\n');
    if text.is_empty() {
        lines.next();
    }
    lines
}
