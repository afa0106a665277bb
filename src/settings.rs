use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, ensure};
use config::{Config, ConfigError, File};
use serde::Deserialize;

use presearch::catalog::DEFAULT_FETCH_LIMIT;
use presearch::controller::DEFAULT_MAX_ITEMS;
use presearch::fetch::DEFAULT_MIN_QUERY_LEN;
use presearch::{ControllerOptions, DebounceTuning, ItemKind, PredictiveItem, app_dirs, logging};

use crate::cli::CliArgs;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    store: StoreSection,
    fetch: FetchSection,
    debounce: DebounceTuning,
    log: LogSection,
    quick: Vec<QuickLinkSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct StoreSection {
    data_dir: Option<PathBuf>,
    ephemeral: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct FetchSection {
    catalog: Option<PathBuf>,
    min_query_len: Option<usize>,
    max_items: Option<usize>,
    limit: Option<usize>,
    latency_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct LogSection {
    level: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct QuickLinkSection {
    label: String,
    href: String,
}

pub struct ResolvedConfig {
    /// `None` keeps learned patterns in memory only.
    pub data_dir: Option<PathBuf>,
    pub catalog: Option<PathBuf>,
    pub fetch_limit: usize,
    pub fetch_latency: Duration,
    pub log_level: String,
    pub controller: ControllerOptions,
}

impl ResolvedConfig {
    pub fn print_summary(&self) {
        println!("Effective configuration:");
        match &self.data_dir {
            Some(dir) => println!("  Data directory: {}", dir.display()),
            None => println!("  Data directory: (in memory)"),
        }
        match &self.catalog {
            Some(path) => println!("  Catalog: {}", path.display()),
            None => println!("  Catalog: (none)"),
        }
        println!("  Fetch limit: {}", self.fetch_limit);
        println!("  Fetch latency: {} ms", self.fetch_latency.as_millis());
        println!("  Minimum query length: {}", self.controller.min_query_len);
        println!("  Maximum items: {}", self.controller.max_items);
        println!("  Log level: {}", self.log_level);

        let tuning = &self.controller.tuning;
        let bases: Vec<String> = tuning.base_ms.iter().map(|ms| format!("{ms:.0}")).collect();
        println!("  Debounce base: {} ms", bases.join(" / "));
        println!(
            "  Debounce bounds: {}..={} ms",
            tuning.min_ms, tuning.max_ms
        );
        println!(
            "  Speed factor: {:+.2}..{:+.2} around {} ms",
            tuning.speed_min, tuning.speed_max, tuning.speed_pivot_ms
        );
        println!(
            "  Pattern factor: up to {:.2} over {} hits",
            tuning.pattern_max, tuning.pattern_hits_scale
        );

        if self.controller.quick_links.is_empty() {
            println!("  Quick links: (none)");
        } else {
            println!("  Quick links:");
            for link in &self.controller.quick_links {
                println!("    {} -> {}", link.label, link.href);
            }
        }
    }
}

pub fn load(cli: &CliArgs) -> Result<ResolvedConfig> {
    let builder = build_config(cli)?;
    let mut raw: RawConfig = builder
        .try_deserialize()
        .map_err(|err| anyhow!("failed to deserialize configuration: {err}"))?;
    raw.apply_cli_overrides(cli);
    raw.resolve()
}

fn build_config(cli: &CliArgs) -> Result<Config> {
    let mut builder = Config::builder();

    if !cli.no_config {
        for path in default_config_files() {
            builder = builder.add_source(File::from(path).required(false));
        }
    }

    for path in &cli.config {
        builder = builder.add_source(File::from(path.clone()).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("presearch")
            .separator("__")
            .try_parsing(true)
            .list_separator(","),
    );

    builder.build().map_err(|err| match err {
        ConfigError::Frozen => anyhow!("configuration builder is frozen"),
        other => other.into(),
    })
}

fn default_config_files() -> Vec<PathBuf> {
    let mut files = Vec::new();

    if let Ok(dir) = app_dirs::get_config_dir() {
        files.push(dir.join("config.toml"));
    }

    if let Ok(current_dir) = env::current_dir() {
        files.push(current_dir.join(".presearch.toml"));
        files.push(current_dir.join("presearch.toml"));
    }

    files
}

impl RawConfig {
    fn apply_cli_overrides(&mut self, cli: &CliArgs) {
        if let Some(dir) = cli.data_dir.clone() {
            self.store.data_dir = Some(dir);
        }
        if cli.ephemeral {
            self.store.ephemeral = Some(true);
        }
        if let Some(path) = cli.catalog.clone() {
            self.fetch.catalog = Some(path);
        }
        if let Some(value) = cli.min_query_len {
            self.fetch.min_query_len = Some(value);
        }
        if let Some(value) = cli.max_items {
            self.fetch.max_items = Some(value);
        }
        if let Some(value) = cli.fetch_latency_ms {
            self.fetch.latency_ms = Some(value);
        }
        if let Some(level) = cli.log_level.clone() {
            self.log.level = Some(level);
        }
    }

    fn resolve(self) -> Result<ResolvedConfig> {
        let data_dir = if self.store.ephemeral.unwrap_or(false) {
            None
        } else {
            let dir = match self.store.data_dir {
                Some(dir) => dir,
                None => app_dirs::get_data_dir()?,
            };
            Some(absolutize(dir)?)
        };

        let catalog = self.fetch.catalog.map(absolutize).transpose()?;

        let tuning = self.debounce;
        tuning.validate()?;

        let max_items = self.fetch.max_items.unwrap_or(DEFAULT_MAX_ITEMS);
        ensure!(max_items > 0, "fetch.max_items must be at least 1");

        let quick_links = self
            .quick
            .into_iter()
            .filter_map(|link| {
                let label = link.label.trim().to_string();
                let href = link.href.trim().to_string();
                (!label.is_empty() && !href.is_empty())
                    .then(|| PredictiveItem::new(ItemKind::Quick, label, href))
            })
            .collect();

        let log_level = self
            .log
            .level
            .map(|level| level.trim().to_string())
            .filter(|level| !level.is_empty())
            .unwrap_or_else(|| logging::DEFAULT_LEVEL.to_string());

        Ok(ResolvedConfig {
            data_dir,
            catalog,
            fetch_limit: self.fetch.limit.unwrap_or(DEFAULT_FETCH_LIMIT),
            fetch_latency: Duration::from_millis(self.fetch.latency_ms.unwrap_or(0)),
            log_level,
            controller: ControllerOptions {
                tuning,
                min_query_len: self.fetch.min_query_len.unwrap_or(DEFAULT_MIN_QUERY_LEN),
                max_items,
                quick_links,
            },
        })
    }
}

fn absolutize(path: PathBuf) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path);
    }
    Ok(env::current_dir()
        .context("failed to resolve current directory")?
        .join(path))
}
