use super::item::{ItemKind, PredictiveItem};
use crate::patterns::normalize_query;

/// Most learned queries offered as suggestions for one query.
pub const MAX_SUGGESTIONS: usize = 6;

/// Everything the dropdown can draw from for one ranking pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct CandidateSources<'a> {
    pub recents: &'a [String],
    pub last_queries: &'a [String],
    pub quick: &'a [PredictiveItem],
    pub products: &'a [PredictiveItem],
}

/// Build the unranked candidate list for `query`.
///
/// With an empty query the recents and quick links are offered as-is.
/// Otherwise recents and quick links must contain the query, and learned
/// queries that extend it become suggestions. Products are always included.
pub fn gather(query: &str, sources: CandidateSources<'_>) -> Vec<PredictiveItem> {
    let query = normalize_query(query);
    let mut items = Vec::new();

    items.extend(
        sources
            .recents
            .iter()
            .filter(|recent| query.is_empty() || normalize_query(recent).contains(&query))
            .map(|recent| PredictiveItem::for_query(ItemKind::Recent, recent)),
    );

    if !query.is_empty() {
        items.extend(
            sources
                .last_queries
                .iter()
                .filter(|learned| {
                    let learned = normalize_query(learned);
                    learned != query && learned.starts_with(&query)
                })
                .take(MAX_SUGGESTIONS)
                .map(|learned| PredictiveItem::for_query(ItemKind::Suggest, learned)),
        );
    }

    items.extend(
        sources
            .quick
            .iter()
            .filter(|quick| query.is_empty() || normalize_query(&quick.label).contains(&query))
            .map(|quick| PredictiveItem {
                kind: ItemKind::Quick,
                ..quick.clone()
            }),
    );

    items.extend(sources.products.iter().cloned().map(|mut product| {
        product.kind = ItemKind::Product;
        product
    }));

    items
}
