//! Destination offers and the changes between snapshots.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

/// Placeholder for a field that could not be extracted.
pub const NOT_AVAILABLE: &str = "N/A";

/// Where in the markup a destination was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceHint {
    /// Trigger phrase followed by the name in running text
    BodyText,
    /// Name inside a flight-related hyperlink
    LinkText,
}

/// A flight destination offer extracted from one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationRecord {
    /// Name as written on the page
    pub local_name: String,

    /// Translated name; identity for comparisons
    pub display_name: String,

    /// Currency-prefixed price token or [`NOT_AVAILABLE`]
    pub price: String,

    pub departure_date: String,

    pub return_date: String,

    /// Number of trigger-phrase matches
    pub occurrences: usize,

    pub source: SourceHint,
}

impl DestinationRecord {
    /// A record found only through a hyperlink: every field is a sentinel.
    pub fn from_link(local_name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            local_name: local_name.into(),
            display_name: display_name.into(),
            price: NOT_AVAILABLE.to_string(),
            departure_date: NOT_AVAILABLE.to_string(),
            return_date: NOT_AVAILABLE.to_string(),
            occurrences: 1,
            source: SourceHint::LinkText,
        }
    }

    /// Whether the price was resolved to a real token.
    pub fn has_price(&self) -> bool {
        self.price != NOT_AVAILABLE
    }
}

impl fmt::Display for DestinationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.price)
    }
}

/// One detected difference between consecutive snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Added(String),
    Removed(String),
    PriceChanged {
        name: String,
        old: String,
        new: String,
    },
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::Added(name) => write!(f, "+ Added: {}", name),
            Change::Removed(name) => write!(f, "- Removed: {}", name),
            Change::PriceChanged { name, old, new } => {
                write!(f, "💰 {}: {} → {}", name, old, new)
            }
        }
    }
}

// Changes travel as their rendered text.
impl Serialize for Change {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
