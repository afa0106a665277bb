use std::collections::HashSet;

use super::item::{ItemKind, PredictiveItem};
use crate::patterns::{PatternStats, char_prefix, normalize_query};

/// Longest query prefix consulted for the learned-pattern boost.
pub const PATTERN_PREFIX_LEN: usize = 8;

const EXACT: i32 = 50;
const STARTS_WITH: i32 = 38;
const CONTAINS: i32 = 18;

const RECENT_BASE: i32 = 24;
const RECENT_STARTS_WITH: i32 = 22;
const RECENT_REMEMBERED: i32 = 12;

const PRODUCT_STARTS_WITH: i32 = 60;
const PRODUCT_CONTAINS: i32 = 32;
const PRODUCT_BASELINE: i32 = 8;

const PATTERN_BASE: u32 = 6;
const PATTERN_CAP: u32 = 26;
const SHORTCUT_DIVISOR: u32 = 3;
const SHORTCUT_CAP: u32 = 10;

/// How a normalized label relates to the normalized query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Match {
    Exact,
    StartsWith,
    Contains,
    None,
}

impl Match {
    fn of(label: &str, query: &str) -> Self {
        if query.is_empty() {
            Match::None
        } else if label == query {
            Match::Exact
        } else if label.starts_with(query) {
            Match::StartsWith
        } else if label.contains(query) {
            Match::Contains
        } else {
            Match::None
        }
    }

    fn starts_with(self) -> bool {
        matches!(self, Match::Exact | Match::StartsWith)
    }
}

/// Score, order and de-duplicate `candidates` for `query`.
///
/// Sorting is stable, so equally scored items keep their input order, and
/// only the first item for each `href` survives. Identical inputs always give
/// identical output.
pub fn rank(
    query: &str,
    candidates: Vec<PredictiveItem>,
    recents: &[String],
    stats: &PatternStats,
) -> Vec<PredictiveItem> {
    let query = normalize_query(query);
    let prefix = char_prefix(&query, PATTERN_PREFIX_LEN);
    let learned = Some(stats.hits_for(prefix))
        .filter(|hits| *hits > 0)
        .map(|hits| (prefix, hits));

    let mut scored: Vec<PredictiveItem> = candidates
        .into_iter()
        .map(|mut item| {
            item.score = score(&item, &query, learned, recents);
            item
        })
        .collect();

    scored.sort_by(|a, b| b.score.cmp(&a.score));

    let mut seen = HashSet::new();
    scored.retain(|item| seen.insert(item.href.clone()));
    scored
}

fn score(
    item: &PredictiveItem,
    query: &str,
    learned: Option<(&str, u32)>,
    recents: &[String],
) -> i32 {
    let label = normalize_query(&item.label);
    let relation = Match::of(&label, query);

    let mut score = match item.kind {
        ItemKind::Product => match relation {
            Match::Exact | Match::StartsWith => PRODUCT_STARTS_WITH,
            Match::Contains => PRODUCT_CONTAINS,
            Match::None => PRODUCT_BASELINE,
        },
        _ => match relation {
            Match::Exact => EXACT,
            Match::StartsWith => STARTS_WITH,
            Match::Contains => CONTAINS,
            Match::None => 0,
        },
    };

    if item.kind == ItemKind::Recent {
        score += RECENT_BASE;
        if relation.starts_with() {
            score += RECENT_STARTS_WITH;
        }
        if recents.iter().any(|recent| recent == &item.label) {
            score += RECENT_REMEMBERED;
        }
    }

    if let Some((prefix, hits)) = learned {
        if label.starts_with(prefix) {
            score += boost(PATTERN_BASE.saturating_add(hits).min(PATTERN_CAP));
            if matches!(item.kind, ItemKind::Quick | ItemKind::Suggest) {
                score += boost((hits / SHORTCUT_DIVISOR).min(SHORTCUT_CAP));
            }
        }
    }

    score
}

fn boost(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
