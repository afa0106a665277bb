//! A local product catalog searched with fuzzy matching.
//!
//! Backs the `presearch` binary and doubles as a realistic [`Fetcher`] for
//! tests: it honours cancellation while it simulates backend latency.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use frizbee::{Options, match_list};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::FetchError;
use crate::fetch::{FetchFuture, Fetcher};
use crate::rank::PredictiveItem;

/// Catalogs at least this large use frizbee's prefilter.
const PREFILTER_ENABLE_THRESHOLD: usize = 1_000;

/// Default cap on products returned by one fetch.
pub const DEFAULT_FETCH_LIMIT: usize = 8;

#[derive(Debug, Clone, Deserialize)]
struct CatalogEntry {
    label: String,
    href: String,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    meta: Option<String>,
}

impl From<CatalogEntry> for PredictiveItem {
    fn from(entry: CatalogEntry) -> Self {
        let mut item = PredictiveItem::product(entry.label, entry.href);
        item.image = entry.image;
        item.meta = entry.meta;
        item
    }
}

/// Products available to the fuzzy fetcher.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<PredictiveItem>,
}

impl Catalog {
    pub fn new(products: Vec<PredictiveItem>) -> Self {
        Self { products }
    }

    /// Read a JSON array of `{label, href, image?, meta?}` objects.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("invalid catalog {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let entries: Vec<CatalogEntry> = serde_json::from_str(raw)?;
        Ok(Self::new(entries.into_iter().map(PredictiveItem::from).collect()))
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Best fuzzy matches for `query`, highest score first.
    pub fn search(&self, query: &str, limit: usize) -> Vec<PredictiveItem> {
        let needle = query.trim();
        if needle.is_empty() || self.products.is_empty() {
            return Vec::new();
        }

        let haystacks: Vec<&str> = self.products.iter().map(|item| item.label.as_str()).collect();
        let mut matches: Vec<(u16, usize)> = match_list(
            needle,
            &haystacks,
            options_for_query(needle, haystacks.len()),
        )
        .into_iter()
        .filter(|entry| entry.score > 0)
        .map(|entry| (entry.score, entry.index_in_haystack as usize))
        .collect();
        matches.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        matches
            .into_iter()
            .take(limit)
            .map(|(_, index)| self.products[index].clone())
            .collect()
    }
}

/// Fuzzy options scaled to the needle length and catalog size.
fn options_for_query(query: &str, catalog_len: usize) -> Options {
    let length = query.chars().count();
    let allowed_typos: u16 = match length {
        0..=1 => 0,
        2..=4 => 1,
        5..=7 => 2,
        _ => 3,
    };

    let mut options = Options {
        prefilter: false,
        ..Options::default()
    };
    if catalog_len >= PREFILTER_ENABLE_THRESHOLD {
        options.prefilter = true;
        options.max_typos = Some(allowed_typos);
    } else {
        options.max_typos = None;
    }
    options.sort = false;
    options
}

/// [`Fetcher`] over a shared [`Catalog`] with optional artificial latency.
#[derive(Debug, Clone)]
pub struct CatalogFetcher {
    catalog: Arc<Catalog>,
    latency: Duration,
    limit: usize,
}

impl CatalogFetcher {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
            latency: Duration::ZERO,
            limit: DEFAULT_FETCH_LIMIT,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

impl Fetcher for CatalogFetcher {
    type Output = Vec<PredictiveItem>;

    fn fetch(&self, query: String, cancel: CancellationToken) -> FetchFuture<Self::Output> {
        let catalog = Arc::clone(&self.catalog);
        let latency = self.latency;
        let limit = self.limit;
        Box::pin(async move {
            if !latency.is_zero() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                    _ = tokio::time::sleep(latency) => {}
                }
            }
            let products = catalog.search(&query, limit);
            debug!(query = %query, matches = products.len(), "catalog searched");
            Ok(products)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {"label": "Nike Air Max 90", "href": "/p/air-max-90", "meta": "$130"},
        {"label": "Nike Dunk Low", "href": "/p/dunk-low"},
        {"label": "Puma Suede Classic", "href": "/p/suede", "image": "/i/suede.jpg"}
    ]"#;

    #[test]
    fn parses_optional_fields() {
        let catalog = Catalog::from_json(SAMPLE).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.products[0].meta.as_deref(), Some("$130"));
        assert_eq!(catalog.products[2].image.as_deref(), Some("/i/suede.jpg"));
        assert!(catalog.products.iter().all(|item| item.kind == crate::rank::ItemKind::Product));
    }

    #[test]
    fn rejects_entries_without_href() {
        assert!(Catalog::from_json(r#"[{"label": "Nike"}]"#).is_err());
    }

    #[test]
    fn search_finds_matching_labels() {
        let catalog = Catalog::from_json(SAMPLE).unwrap();
        let labels: Vec<String> = catalog
            .search("nike", 10)
            .into_iter()
            .map(|item| item.label)
            .collect();
        assert!(labels.len() >= 2);
        assert!(labels[..2].iter().all(|label| label.starts_with("Nike")));
        assert!(catalog.search("   ", 10).is_empty());
    }

    #[test]
    fn search_respects_limit() {
        let catalog = Catalog::from_json(SAMPLE).unwrap();
        assert_eq!(catalog.search("nike", 1).len(), 1);
    }

    #[test]
    fn prefilter_only_for_large_catalogs() {
        assert!(!options_for_query("nike", 10).prefilter);
        let large = options_for_query("nike", PREFILTER_ENABLE_THRESHOLD);
        assert!(large.prefilter);
        assert_eq!(large.max_typos, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_fetch_reports_cancellation() {
        let fetcher = CatalogFetcher::new(Catalog::from_json(SAMPLE).unwrap())
            .with_latency(Duration::from_millis(200));
        let cancel = CancellationToken::new();
        let pending = fetcher.fetch("nike".to_string(), cancel.clone());
        cancel.cancel();
        assert_eq!(pending.await, Err(FetchError::Cancelled));
    }
}
