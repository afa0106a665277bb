//! Durable memory of what the user searches for.
//!
//! [`PatternMemory`] owns the two persisted records (pattern statistics and
//! the recents list) and applies submissions and picks to them with a
//! read-merge-write against the store. Once a write fails the session copy
//! is ahead of the store and becomes the merge base until a write succeeds.

mod recents;
mod stats;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use crate::store::{PATTERNS_KEY, PersistentStore, RECENTS_KEY, load_json, save_json};

pub use recents::{RECENTS_CAP, push_distinct};
pub use stats::{
    DEFAULT_KEY_INTERVAL_MS, KEY_INTERVAL_BOUNDS, LAST_QUERIES_CAP, PREFIX_MAX_LEN,
    PREFIX_MIN_LEN, PatternStats, bump_prefix_hits, char_prefix, normalize_query,
};

/// Which explicit user action is being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    /// Enter or an explicit search button.
    Submit,
    /// Selection of a suggestion.
    Pick,
}

/// Learned statistics plus recent queries, backed by a [`PersistentStore`].
pub struct PatternMemory {
    store: Arc<dyn PersistentStore>,
    stats: PatternStats,
    recents: Vec<String>,
    /// The session copy holds changes the store failed to accept.
    unsaved: bool,
}

impl PatternMemory {
    /// Load both records from `store`, substituting defaults for anything
    /// missing or unreadable.
    pub fn load(store: Arc<dyn PersistentStore>) -> Self {
        let stats = read_stats(store.as_ref()).unwrap_or_default();
        let recents = read_recents(store.as_ref()).unwrap_or_default();
        debug!(
            prefixes = stats.prefix_hits.len(),
            recents = recents.len(),
            "loaded pattern memory"
        );
        Self {
            store,
            stats,
            recents,
            unsaved: false,
        }
    }

    pub fn stats(&self) -> &PatternStats {
        &self.stats
    }

    pub fn recents(&self) -> &[String] {
        &self.recents
    }

    /// Record an explicit search submission.
    pub fn record_submit(&mut self, query: &str, key_interval_ms: Option<u32>) {
        self.record(Interaction::Submit, query, key_interval_ms);
    }

    /// Record the selection of a suggestion by its label.
    pub fn record_pick(&mut self, label: &str, key_interval_ms: Option<u32>) {
        self.record(Interaction::Pick, label, key_interval_ms);
    }

    fn record(&mut self, interaction: Interaction, query: &str, key_interval_ms: Option<u32>) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }

        let (mut recents, base) = self.merge_base();
        push_distinct(&mut recents, query, RECENTS_CAP);

        let mut stats = bump_prefix_hits(&base, query);
        match interaction {
            Interaction::Submit => stats.submits = stats.submits.saturating_add(1),
            Interaction::Pick => stats.picks = stats.picks.saturating_add(1),
        }
        stats.remember_query(query);
        if let Some(interval) = key_interval_ms {
            stats.avg_key_interval_ms =
                interval.clamp(*KEY_INTERVAL_BOUNDS.start(), *KEY_INTERVAL_BOUNDS.end());
        }
        stats.updated_at = now_millis().max(stats.updated_at);

        let mut saved = true;
        for (key, result) in [
            (RECENTS_KEY, save_json(self.store.as_ref(), RECENTS_KEY, &recents)),
            (PATTERNS_KEY, save_json(self.store.as_ref(), PATTERNS_KEY, &stats)),
        ] {
            if let Err(err) = result {
                warn!(key, error = %err, "failed to persist record");
                saved = false;
            }
        }
        self.unsaved = !saved;
        debug!(?interaction, query, submits = stats.submits, picks = stats.picks, "recorded query");

        self.recents = recents;
        self.stats = stats;
    }

    /// Records to apply the next interaction to.
    ///
    /// Normally this is what is durable now, so changes from other handles
    /// are kept. The session copy is used when the store has nothing
    /// readable or is behind after a failed write.
    fn merge_base(&self) -> (Vec<String>, PatternStats) {
        if self.unsaved {
            return (self.recents.clone(), self.stats.clone());
        }
        let recents = read_recents(self.store.as_ref()).unwrap_or_else(|| self.recents.clone());
        let stats = read_stats(self.store.as_ref()).unwrap_or_else(|| self.stats.clone());
        (recents, stats)
    }
}

fn read_stats(store: &dyn PersistentStore) -> Option<PatternStats> {
    load_json(store, PATTERNS_KEY).map(|value| PatternStats::repair(&value))
}

fn read_recents(store: &dyn PersistentStore) -> Option<Vec<String>> {
    load_json(store, RECENTS_KEY).map(|value| recents::repair_list(Some(&value), RECENTS_CAP))
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::MemoryStore;
    use proptest::prelude::*;

    struct ReadOnlyStore;

    impl PersistentStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Option<String> {
            None
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("read only".into()))
        }
    }

    /// Serves whatever was seeded but rejects every write.
    struct FullStore(MemoryStore);

    impl PersistentStore for FullStore {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(key)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("quota exceeded".into()))
        }
    }

    fn fresh_memory() -> (Arc<MemoryStore>, PatternMemory) {
        let store = Arc::new(MemoryStore::new());
        let memory = PatternMemory::load(store.clone());
        (store, memory)
    }

    #[test]
    fn empty_store_loads_defaults() {
        let (_, memory) = fresh_memory();
        assert_eq!(memory.stats(), &PatternStats::default());
        assert!(memory.recents().is_empty());
    }

    #[test]
    fn submit_updates_and_persists_both_records() {
        let (store, mut memory) = fresh_memory();
        memory.record_submit("Nike", Some(110));

        assert_eq!(memory.recents(), ["Nike"]);
        assert_eq!(memory.stats().submits, 1);
        assert_eq!(memory.stats().picks, 0);
        assert_eq!(memory.stats().hits_for("nik"), 1);
        assert_eq!(memory.stats().last_queries, vec!["Nike"]);
        assert_eq!(memory.stats().avg_key_interval_ms, 110);
        assert!(memory.stats().updated_at > 0);

        let reloaded = PatternMemory::load(store);
        assert_eq!(reloaded.stats(), memory.stats());
        assert_eq!(reloaded.recents(), memory.recents());
    }

    #[test]
    fn pick_counts_separately() {
        let (_, mut memory) = fresh_memory();
        memory.record_pick("Air Max 90", None);
        assert_eq!(memory.stats().picks, 1);
        assert_eq!(memory.stats().submits, 0);
        assert_eq!(memory.stats().hits_for("air max"), 1);
        assert_eq!(memory.stats().avg_key_interval_ms, DEFAULT_KEY_INTERVAL_MS);
    }

    #[test]
    fn blank_submissions_are_ignored() {
        let (store, mut memory) = fresh_memory();
        memory.record_submit("  ", None);
        assert_eq!(memory.stats().submits, 0);
        assert!(store.is_empty());
    }

    #[test]
    fn merge_reads_records_written_by_another_handle() {
        let (store, mut first) = fresh_memory();
        let mut second = PatternMemory::load(store.clone());

        first.record_submit("nike", None);
        second.record_submit("puma", None);

        let reloaded = PatternMemory::load(store);
        assert_eq!(reloaded.stats().submits, 2);
        assert_eq!(reloaded.recents(), ["puma", "nike"]);
    }

    #[test]
    fn state_advances_when_writes_fail() {
        let mut memory = PatternMemory::load(Arc::new(ReadOnlyStore));
        memory.record_submit("nike", None);
        memory.record_submit("nike", None);
        assert_eq!(memory.stats().submits, 2);
        assert_eq!(memory.stats().hits_for("nike"), 2);
        assert_eq!(memory.recents(), ["nike"]);
    }

    #[test]
    fn rejected_writes_do_not_roll_back_the_session() {
        let seed = MemoryStore::new();
        let mut seeded = PatternMemory::load(Arc::new(MemoryStore::new()));
        seeded.record_submit("nike", None);
        seed.set(PATTERNS_KEY, &serde_json::to_string(seeded.stats()).unwrap())
            .unwrap();
        seed.set(RECENTS_KEY, "[\"nike\"]").unwrap();

        let mut memory = PatternMemory::load(Arc::new(FullStore(seed)));
        assert_eq!(memory.stats().submits, 1);

        memory.record_submit("nike", None);
        memory.record_submit("nike", None);
        memory.record_submit("puma", None);

        assert_eq!(memory.stats().hits_for("nike"), 3);
        assert_eq!(memory.stats().hits_for("pum"), 1);
        assert_eq!(memory.stats().submits, 4);
        assert_eq!(memory.recents(), ["puma", "nike"]);
    }

    #[test]
    fn successful_write_resumes_merging_with_the_store() {
        let store = Arc::new(MemoryStore::new());
        let mut memory = PatternMemory::load(store.clone());
        memory.unsaved = true;
        memory.record_submit("nike", None);
        assert!(!memory.unsaved);

        let mut other = PatternMemory::load(store.clone());
        other.record_submit("puma", None);
        memory.record_submit("adidas", None);

        assert_eq!(memory.stats().submits, 3);
        assert_eq!(memory.recents(), ["adidas", "puma", "nike"]);
    }

    #[test]
    fn corrupted_blobs_load_as_defaults() {
        let store = Arc::new(MemoryStore::new());
        store.set(PATTERNS_KEY, "{\"prefixHits\": {").unwrap();
        store.set(RECENTS_KEY, "{\"not\": \"a list\"}").unwrap();

        let memory = PatternMemory::load(store);
        assert_eq!(memory.stats(), &PatternStats::default());
        assert!(memory.recents().is_empty());
    }

    proptest! {
        #[test]
        fn lists_stay_bounded_and_distinct(
            actions in proptest::collection::vec((any::<bool>(), "[a-dA-D]{1,3}"), 0..80)
        ) {
            let (_, mut memory) = fresh_memory();
            for (submit, query) in &actions {
                if *submit {
                    memory.record_submit(query, None);
                } else {
                    memory.record_pick(query, None);
                }
            }

            let recents = memory.recents();
            let last = &memory.stats().last_queries;
            prop_assert!(recents.len() <= RECENTS_CAP);
            prop_assert!(last.len() <= LAST_QUERIES_CAP);
            for list in [recents, last.as_slice()] {
                let mut folded: Vec<String> = list.iter().map(|q| q.to_lowercase()).collect();
                folded.sort();
                folded.dedup();
                prop_assert_eq!(folded.len(), list.len());
            }
        }
    }
}
