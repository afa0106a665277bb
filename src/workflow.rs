use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::info;

use presearch::{
    Catalog, CatalogFetcher, FileStore, MemoryStore, PatternStats, PersistentStore,
    PredictiveItem, SearchController, SearchSnapshot,
};

use crate::cli::CliArgs;
use crate::settings::ResolvedConfig;

/// What one replayed search session produced.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionOutcome {
    pub(crate) snapshot: SearchSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) submitted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) picked: Option<PredictiveItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) stats: Option<PatternStats>,
}

/// User actions to replay against the controller.
#[derive(Debug, Clone)]
pub(crate) struct SessionScript {
    query: String,
    key_interval: Duration,
    submit: bool,
    pick: Option<usize>,
    show_stats: bool,
}

impl SessionScript {
    pub(crate) fn from_cli(cli: &CliArgs) -> Self {
        Self {
            query: cli.query.clone().unwrap_or_default(),
            key_interval: Duration::from_millis(cli.key_interval_ms),
            submit: cli.submit,
            pick: cli.pick,
            show_stats: cli.stats,
        }
    }
}

/// Coordinates building the controller and replaying a typing session.
pub(crate) struct SearchWorkflow {
    controller: SearchController<CatalogFetcher>,
    script: SessionScript,
}

impl SearchWorkflow {
    pub(crate) fn from_config(config: ResolvedConfig, script: SessionScript) -> Result<Self> {
        let store: Arc<dyn PersistentStore> = match &config.data_dir {
            Some(dir) => Arc::new(FileStore::new(dir)),
            None => Arc::new(MemoryStore::new()),
        };

        let catalog = match &config.catalog {
            Some(path) => Catalog::from_path(path)?,
            None => Catalog::default(),
        };
        info!(products = catalog.len(), "catalog loaded");

        let fetcher = CatalogFetcher::new(catalog)
            .with_latency(config.fetch_latency)
            .with_limit(config.fetch_limit);
        let controller = SearchController::builder(fetcher)
            .store(store)
            .options(config.controller)
            .build()
            .context("failed to build search controller")?;

        Ok(Self { controller, script })
    }

    pub(crate) async fn run(self) -> Result<SessionOutcome> {
        let Self { controller, script } = self;

        type_out(&controller, &script.query, script.key_interval).await;
        controller.settled().await;
        let snapshot = controller.snapshot();

        let submitted = if script.submit && !script.query.trim().is_empty() {
            controller.on_submit(&script.query);
            Some(script.query.trim().to_string())
        } else {
            None
        };

        let picked = match script.pick {
            Some(position) => {
                let Some(item) = position
                    .checked_sub(1)
                    .and_then(|index| snapshot.items.get(index))
                else {
                    bail!(
                        "cannot pick suggestion {position}: {} available",
                        snapshot.items.len()
                    );
                };
                controller.on_pick(item);
                Some(item.clone())
            }
            None => None,
        };

        let stats = script.show_stats.then(|| controller.stats());
        controller.on_close();

        Ok(SessionOutcome {
            snapshot,
            submitted,
            picked,
            stats,
        })
    }
}

/// Feed `text` to the controller one character at a time.
async fn type_out(
    controller: &SearchController<CatalogFetcher>,
    text: &str,
    key_interval: Duration,
) {
    if text.is_empty() {
        controller.on_query_change("", Instant::now());
        return;
    }

    let mut typed = String::with_capacity(text.len());
    for (position, ch) in text.chars().enumerate() {
        if position > 0 {
            tokio::time::sleep(key_interval).await;
        }
        typed.push(ch);
        controller.on_query_change(&typed, Instant::now());
    }
}
