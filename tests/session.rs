use std::sync::Arc;
use std::time::{Duration, Instant};

use presearch::store::RECENTS_KEY;
use presearch::{
    Catalog, CatalogFetcher, ControllerOptions, FetchPhase, FileStore, ItemKind,
    ManualScheduler, PersistentStore, SearchController,
};
use tempfile::tempdir;

const CATALOG: &str = r#"[
    {"label": "Nike Air Max 90", "href": "/p/air-max-90"},
    {"label": "Nike Dunk Low", "href": "/p/dunk-low"},
    {"label": "Adidas Samba", "href": "/p/samba"}
]"#;

fn controller(
    store: Arc<dyn PersistentStore>,
    scheduler: Arc<ManualScheduler>,
    latency: Duration,
) -> SearchController<CatalogFetcher> {
    let fetcher = CatalogFetcher::new(Catalog::from_json(CATALOG).unwrap()).with_latency(latency);
    SearchController::builder(fetcher)
        .store(store)
        .scheduler(scheduler)
        .options(ControllerOptions::default())
        .build()
        .unwrap()
}

fn type_word(controller: &SearchController<CatalogFetcher>, word: &str, start: Instant) {
    let mut typed = String::new();
    for (index, ch) in word.chars().enumerate() {
        typed.push(ch);
        controller.on_query_change(&typed, start + Duration::from_millis(90 * index as u64));
    }
}

#[tokio::test(start_paused = true)]
async fn learned_patterns_survive_a_restart() {
    let dir = tempdir().unwrap();
    let start = Instant::now();

    {
        let scheduler = Arc::new(ManualScheduler::new());
        let store = Arc::new(FileStore::new(dir.path()));
        let first = controller(store, scheduler.clone(), Duration::ZERO);
        type_word(&first, "nike", start);
        scheduler.advance(Duration::from_secs(1));
        first.settled().await;
        first.on_submit("nike");
        first.on_submit("nike");
        first.on_close();
    }

    let scheduler = Arc::new(ManualScheduler::new());
    let second = controller(Arc::new(FileStore::new(dir.path())), scheduler, Duration::ZERO);
    let stats = second.stats();
    assert_eq!(stats.hits_for("nik"), 2);
    assert_eq!(stats.hits_for("nike"), 2);
    assert_eq!(stats.submits, 2);
    assert_eq!(second.recents(), vec!["nike".to_string()]);

    let raw = FileStore::new(dir.path()).get(RECENTS_KEY).unwrap();
    assert_eq!(raw, r#"["nike"]"#);
}

#[tokio::test(start_paused = true)]
async fn learned_prefix_shortens_the_debounce() {
    let store: Arc<dyn PersistentStore> = Arc::new(presearch::MemoryStore::new());
    let start = Instant::now();

    let scheduler = Arc::new(ManualScheduler::new());
    let session = controller(store.clone(), scheduler, Duration::ZERO);
    type_word(&session, "adid", start);
    let cold = session.snapshot().delay_ms;
    for _ in 0..14 {
        session.on_submit("adidas");
    }
    session.on_close();

    type_word(&session, "adid", start + Duration::from_secs(10));
    let warm = session.snapshot().delay_ms;
    assert!(warm < cold, "expected {warm} < {cold}");
}

#[tokio::test(start_paused = true)]
async fn newest_query_wins_against_a_slow_catalog() {
    let store: Arc<dyn PersistentStore> = Arc::new(presearch::MemoryStore::new());
    let scheduler = Arc::new(ManualScheduler::new());
    let session = controller(store, scheduler.clone(), Duration::from_millis(300));
    let start = Instant::now();

    session.on_query_change("ad", start);
    scheduler.advance(Duration::from_secs(1));
    assert!(session.snapshot().loading);

    session.on_query_change("nike dunk", start + Duration::from_millis(100));
    scheduler.advance(Duration::from_secs(1));
    session.settled().await;

    let snapshot = session.snapshot();
    assert_eq!(snapshot.phase, FetchPhase::Success);
    assert_eq!(snapshot.debounced_query, "nike dunk");
    let first = &snapshot.items[0];
    assert_eq!(first.kind, ItemKind::Product);
    assert_eq!(first.label, "Nike Dunk Low");
    assert_eq!(first.score, 60);
}
