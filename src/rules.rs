//! Rule definitions

use crate::Severity;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Rule category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    SslTls,
    LoadBalancing,
    Persistence,
    Monitoring,
    Security,
    Performance,
    Compatibility,
    Networking,
    Policies,
}

impl Category {
    /// Every category, in counter order
    pub const ALL: [Category; 9] = [
        Category::SslTls,
        Category::LoadBalancing,
        Category::Persistence,
        Category::Monitoring,
        Category::Security,
        Category::Performance,
        Category::Compatibility,
        Category::Networking,
        Category::Policies,
    ];

    /// Index into `ALL`
    pub fn index(self) -> usize {
        self as usize
    }

    /// Catalog spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::SslTls => "ssl_tls",
            Category::LoadBalancing => "load_balancing",
            Category::Persistence => "persistence",
            Category::Monitoring => "monitoring",
            Category::Security => "security",
            Category::Performance => "performance",
            Category::Compatibility => "compatibility",
            Category::Networking => "networking",
            Category::Policies => "policies",
        }
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == lowered)
            .ok_or_else(|| format!("unknown category '{}'", s))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Technology a rule targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Technology {
    #[serde(rename = "XC")]
    Xc,
    #[serde(rename = "TMOS")]
    Tmos,
    #[serde(rename = "NGINX")]
    Nginx,
    General,
}

impl Technology {
    pub const ALL: [Technology; 4] = [
        Technology::Xc,
        Technology::Tmos,
        Technology::Nginx,
        Technology::General,
    ];

    /// Catalog spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Technology::Xc => "XC",
            Technology::Tmos => "TMOS",
            Technology::Nginx => "NGINX",
            Technology::General => "General",
        }
    }

    /// Infer technology from a rule title prefix (`XC-`, `TMOS-`, `NGINX-`)
    ///
    /// Anything else is General. This deliberately ignores the rule's
    /// explicit `technology` field.
    pub fn from_title(title: &str) -> Self {
        if title.starts_with("XC-") {
            Technology::Xc
        } else if title.starts_with("TMOS-") {
            Technology::Tmos
        } else if title.starts_with("NGINX-") {
            Technology::Nginx
        } else {
            Technology::General
        }
    }
}

impl FromStr for Technology {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "xc" => Ok(Technology::Xc),
            "tmos" => Ok(Technology::Tmos),
            "nginx" => Ok(Technology::Nginx),
            "general" => Ok(Technology::General),
            _ => Err(format!("unknown technology '{}'", s)),
        }
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A diagnostic rule definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    /// Rule identifier (expected unique, not enforced)
    pub code: String,
    /// Severity level
    pub severity: Severity,
    /// Human-readable name, conventionally prefixed `XC-`, `TMOS-` or `NGINX-`
    pub title: String,
    /// Message attached verbatim to every finding
    pub message: String,
    /// Regular expression; empty means the rule is inactive
    pub pattern: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technology: Option<Technology>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Default for Rule {
    fn default() -> Self {
        Self {
            code: String::new(),
            severity: Severity::Warning,
            title: String::new(),
            message: String::new(),
            pattern: String::new(),
            category: None,
            technology: None,
            description: None,
        }
    }
}

impl Rule {
    /// Whether the engine evaluates this rule at all
    pub fn is_active(&self) -> bool {
        !self.pattern.is_empty()
    }

    /// Whether the pattern has content other than whitespace
    pub fn has_pattern(&self) -> bool {
        !self.pattern.trim().is_empty()
    }

    /// Technology inferred from the title prefix
    pub fn inferred_technology(&self) -> Technology {
        Technology::from_title(&self.title)
    }
}
