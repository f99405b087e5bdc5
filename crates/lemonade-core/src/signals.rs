//! Signal items collected from external sources.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of a collected signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalType {
    News,
    Funding,
    Social,
    Product,
}

impl SignalType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SignalType::News => "news",
            SignalType::Funding => "funding",
            SignalType::Social => "social",
            SignalType::Product => "product",
        }
    }
}

impl std::fmt::Display for SignalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One piece of externally observed content about a competitor.
///
/// Construct through [`SignalItem::new`], which refuses blank titles or content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalItem {
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub kind: SignalType,
}

impl SignalItem {
    /// Returns `None` when the trimmed title or content is empty.
    #[must_use]
    pub fn new(title: &str, content: &str, kind: SignalType) -> Option<Self> {
        let title = title.trim();
        let content = content.trim();
        if title.is_empty() || content.is_empty() {
            return None;
        }
        Some(Self {
            title: title.to_string(),
            content: content.to_string(),
            url: None,
            published_at: None,
            kind,
        })
    }

    #[must_use]
    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.url = url.filter(|u| !u.trim().is_empty());
        self
    }

    #[must_use]
    pub fn with_published_at(mut self, published_at: Option<DateTime<Utc>>) -> Self {
        self.published_at = published_at;
        self
    }
}

/// All items one source produced for one competitor during a single analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorSignal {
    pub source: String,
    pub competitor: String,
    pub items: Vec<SignalItem>,
    /// Set when the source errored rather than simply finding nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unavailable: Option<String>,
}

impl CompetitorSignal {
    /// Keep only the first `n` items; used by the preview summariser.
    #[must_use]
    pub fn truncated(&self, n: usize) -> Self {
        Self {
            source: self.source.clone(),
            competitor: self.competitor.clone(),
            items: self.items.iter().take(n).cloned().collect(),
            unavailable: self.unavailable.clone(),
        }
    }
}

/// Which source families an analysis request enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceToggles {
    #[serde(default)]
    pub news: bool,
    #[serde(default)]
    pub funding: bool,
    #[serde(default)]
    pub social: bool,
    #[serde(default)]
    pub products: bool,
}

impl Default for SourceToggles {
    fn default() -> Self {
        Self {
            news: true,
            funding: true,
            social: false,
            products: false,
        }
    }
}

impl SourceToggles {
    #[must_use]
    pub fn any(&self) -> bool {
        self.news || self.funding || self.social || self.products
    }

    /// Names of the enabled families in a stable order.
    #[must_use]
    pub fn enabled(&self) -> Vec<&'static str> {
        let mut out = Vec::with_capacity(4);
        if self.news {
            out.push("news");
        }
        if self.funding {
            out.push("funding");
        }
        if self.social {
            out.push("social");
        }
        if self.products {
            out.push("products");
        }
        out
    }
}
