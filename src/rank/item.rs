use std::fmt;

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};

/// Where a suggestion came from. Each kind gets its own base treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// The user's own history.
    Recent,
    /// A generic suggestion derived from learned queries.
    Suggest,
    /// A curated shortcut.
    Quick,
    /// A live catalog match.
    Product,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Recent => "recent",
            ItemKind::Suggest => "suggest",
            ItemKind::Quick => "quick",
            ItemKind::Product => "product",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate row in the suggestion dropdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictiveItem {
    pub kind: ItemKind,
    pub label: String,
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<String>,
    /// Set by the ranker on every pass.
    #[serde(skip_deserializing)]
    pub score: i32,
}

impl PredictiveItem {
    pub fn new(kind: ItemKind, label: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            href: href.into(),
            image: None,
            meta: None,
            score: 0,
        }
    }

    /// Product row from the live catalog.
    pub fn product(label: impl Into<String>, href: impl Into<String>) -> Self {
        Self::new(ItemKind::Product, label, href)
    }

    /// Item that re-runs `query` as a full search.
    pub fn for_query(kind: ItemKind, query: &str) -> Self {
        Self::new(kind, query, search_href(query))
    }

    pub fn with_meta(mut self, meta: impl Into<String>) -> Self {
        self.meta = Some(meta.into());
        self
    }
}

/// Link to the full results page for `query`.
pub fn search_href(query: &str) -> String {
    format!(
        "/search?q={}",
        utf8_percent_encode(query.trim(), NON_ALPHANUMERIC)
    )
}
