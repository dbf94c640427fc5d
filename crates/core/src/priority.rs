//! Load priority and dashboard category types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Load priority. Lower numeric value = higher priority, so derived `Ord`
/// sorts Critical first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Must load immediately — gates perceived readiness.
    Critical = 0,
    /// Load early, preferably before the user reaches it.
    Important = 1,
    /// Load when it scrolls into view.
    Deferred = 2,
    /// Load eventually, when nothing more urgent is pending.
    Background = 3,
}

impl Priority {
    /// All priorities, highest first.
    pub const ALL: [Priority; 4] = [
        Priority::Critical,
        Priority::Important,
        Priority::Deferred,
        Priority::Background,
    ];

    /// Step one level toward Background, saturating.
    pub fn demote(self) -> Priority {
        match self {
            Priority::Critical => Priority::Critical,
            Priority::Important => Priority::Deferred,
            Priority::Deferred => Priority::Background,
            Priority::Background => Priority::Background,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::Important => "important",
            Priority::Deferred => "deferred",
            Priority::Background => "background",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a priority or category from a string fails.
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "critical" => Ok(Priority::Critical),
            "important" => Ok(Priority::Important),
            "deferred" => Ok(Priority::Deferred),
            "background" => Ok(Priority::Background),
            _ => Err(ParseEnumError {
                kind: "priority",
                value: s.to_string(),
            }),
        }
    }
}

/// Dashboard domain a unit or widget belongs to. Used for scenario
/// overrides, registry browsing, and telemetry grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Communication,
    PoliticalIntel,
    Analytics,
    Visualization,
    FieldOps,
    Scheduling,
    Media,
    General,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Communication => "communication",
            Category::PoliticalIntel => "political-intel",
            Category::Analytics => "analytics",
            Category::Visualization => "visualization",
            Category::FieldOps => "field-ops",
            Category::Scheduling => "scheduling",
            Category::Media => "media",
            Category::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "communication" => Ok(Category::Communication),
            "political-intel" => Ok(Category::PoliticalIntel),
            "analytics" => Ok(Category::Analytics),
            "visualization" => Ok(Category::Visualization),
            "field-ops" => Ok(Category::FieldOps),
            "scheduling" => Ok(Category::Scheduling),
            "media" => Ok(Category::Media),
            "general" => Ok(Category::General),
            _ => Err(ParseEnumError {
                kind: "category",
                value: s.to_string(),
            }),
        }
    }
}
