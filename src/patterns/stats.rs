//! The learned pattern record and its pure update rules.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::recents::{push_distinct, repair_list};

/// Shortest prefix that is counted.
pub const PREFIX_MIN_LEN: usize = 3;
/// Longest prefix that is counted.
pub const PREFIX_MAX_LEN: usize = 12;
/// Capacity of [`PatternStats::last_queries`].
pub const LAST_QUERIES_CAP: usize = 30;
/// Initial typing interval estimate.
pub const DEFAULT_KEY_INTERVAL_MS: u32 = 140;
/// Range the stored typing interval is clamped to on read.
pub const KEY_INTERVAL_BOUNDS: RangeInclusive<u32> = 60..=420;

/// Prefix frequencies, recent queries and typing speed learned from the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternStats {
    pub prefix_hits: BTreeMap<String, u32>,
    pub last_queries: Vec<String>,
    pub avg_key_interval_ms: u32,
    pub submits: u64,
    pub picks: u64,
    pub updated_at: u64,
}

impl Default for PatternStats {
    fn default() -> Self {
        Self {
            prefix_hits: BTreeMap::new(),
            last_queries: Vec::new(),
            avg_key_interval_ms: DEFAULT_KEY_INTERVAL_MS,
            submits: 0,
            picks: 0,
            updated_at: 0,
        }
    }
}

impl PatternStats {
    /// Rebuild a record from a decoded blob.
    ///
    /// Anything that is not an object yields the default record. Inside an
    /// object every field is validated on its own and falls back to its
    /// default when missing or malformed.
    pub fn repair(value: &Value) -> Self {
        let Value::Object(fields) = value else {
            return Self::default();
        };

        Self {
            prefix_hits: repair_prefix_hits(fields.get("prefixHits")),
            last_queries: repair_list(fields.get("lastQueries"), LAST_QUERIES_CAP),
            avg_key_interval_ms: fields
                .get("avgKeyIntervalMs")
                .and_then(Value::as_f64)
                .filter(|value| value.is_finite())
                .map(clamp_key_interval)
                .unwrap_or(DEFAULT_KEY_INTERVAL_MS),
            submits: counter(fields, "submits"),
            picks: counter(fields, "picks"),
            updated_at: counter(fields, "updatedAt"),
        }
    }

    /// Hit count for an already normalized prefix.
    pub fn hits_for(&self, prefix: &str) -> u32 {
        self.prefix_hits.get(prefix).copied().unwrap_or(0)
    }

    /// Stored typing interval, clamped to [`KEY_INTERVAL_BOUNDS`].
    pub fn key_interval_ms(&self) -> u32 {
        self.avg_key_interval_ms
            .clamp(*KEY_INTERVAL_BOUNDS.start(), *KEY_INTERVAL_BOUNDS.end())
    }

    /// Add `query` to the front of [`Self::last_queries`].
    pub fn remember_query(&mut self, query: &str) {
        push_distinct(&mut self.last_queries, query, LAST_QUERIES_CAP);
    }
}

fn repair_prefix_hits(value: Option<&Value>) -> BTreeMap<String, u32> {
    let Some(Value::Object(entries)) = value else {
        return BTreeMap::new();
    };

    let mut repaired = BTreeMap::new();
    for (key, hits) in entries {
        let Some(hits) = hits.as_u64() else {
            continue;
        };
        let key = key.to_lowercase();
        if !(PREFIX_MIN_LEN..=PREFIX_MAX_LEN).contains(&key.chars().count()) {
            continue;
        }
        // Keys differing only in case fold into one counter.
        let total: &mut u32 = repaired.entry(key).or_insert(0);
        *total = total.saturating_add(u32::try_from(hits).unwrap_or(u32::MAX));
    }
    repaired
}

fn counter(fields: &Map<String, Value>, name: &str) -> u64 {
    fields.get(name).and_then(Value::as_u64).unwrap_or(0)
}

fn clamp_key_interval(value: f64) -> u32 {
    let low = f64::from(*KEY_INTERVAL_BOUNDS.start());
    let high = f64::from(*KEY_INTERVAL_BOUNDS.end());
    value.round().clamp(low, high) as u32
}

/// Lowercase, trimmed form used for every prefix comparison.
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// First `len` characters of `text`.
pub fn char_prefix(text: &str, len: usize) -> &str {
    match text.char_indices().nth(len) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Return a copy of `stats` with every counted prefix of `query` bumped by one.
///
/// Prefixes of [`PREFIX_MIN_LEN`] through [`PREFIX_MAX_LEN`] characters of the
/// normalized query are counted. A blank query returns an unchanged copy.
pub fn bump_prefix_hits(stats: &PatternStats, query: &str) -> PatternStats {
    let mut next = stats.clone();
    let normalized = normalize_query(query);
    let len = normalized.chars().count().min(PREFIX_MAX_LEN);

    for prefix_len in PREFIX_MIN_LEN..=len {
        let prefix = char_prefix(&normalized, prefix_len);
        let hits = next.prefix_hits.entry(prefix.to_string()).or_insert(0);
        *hits = hits.saturating_add(1);
    }

    next
}
