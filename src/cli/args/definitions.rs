use std::path::PathBuf;

use clap::{ArgAction, ColorChoice, Parser};

use super::options::OutputFormat;
use super::styles::{cli_styles, long_version};

/// Command-line arguments accepted by the `presearch` binary.
#[derive(Parser, Debug)]
#[command(
    name = "presearch",
    version,
    long_version = long_version(),
    about = "Replay typing against a product catalog and show predictive suggestions",
    color = ColorChoice::Auto,
    styles = cli_styles()
)]
pub(crate) struct CliArgs {
    #[arg(
        short,
        long = "config",
        value_name = "FILE",
        env = "PRESEARCH_CONFIG",
        action = ArgAction::Append,
        help = "Additional configuration file to merge (default: none)"
    )]
    pub(crate) config: Vec<PathBuf>,
    #[arg(
        short = 'n',
        long = "no-config",
        help = "Skip loading default configuration files (default: disabled)"
    )]
    pub(crate) no_config: bool,
    #[arg(
        short = 'C',
        long,
        value_name = "FILE",
        help = "JSON array of products to search (default: no live results)"
    )]
    pub(crate) catalog: Option<PathBuf>,
    #[arg(
        short = 'q',
        long,
        value_name = "TEXT",
        help = "Text typed one character at a time (default: empty)"
    )]
    pub(crate) query: Option<String>,
    #[arg(
        short = 'k',
        long = "key-interval-ms",
        value_name = "MS",
        default_value_t = 120,
        help = "Milliseconds between simulated keystrokes"
    )]
    pub(crate) key_interval_ms: u64,
    #[arg(
        long = "fetch-latency-ms",
        value_name = "MS",
        help = "Artificial catalog latency (default: 0)"
    )]
    pub(crate) fetch_latency_ms: Option<u64>,
    #[arg(
        short = 's',
        long,
        help = "Record the typed query as a submitted search (default: disabled)"
    )]
    pub(crate) submit: bool,
    #[arg(
        long,
        value_name = "N",
        help = "Record the N-th ranked suggestion (1-based) as picked"
    )]
    pub(crate) pick: Option<usize>,
    #[arg(
        short = 'd',
        long = "data-dir",
        value_name = "PATH",
        help = "Directory holding learned patterns (default: platform data directory)"
    )]
    pub(crate) data_dir: Option<PathBuf>,
    #[arg(
        short = 'e',
        long,
        help = "Keep learned patterns in memory only (default: disabled)"
    )]
    pub(crate) ephemeral: bool,
    #[arg(
        long = "min-query-len",
        value_name = "NUM",
        help = "Shortest query sent to the catalog (default: 2)"
    )]
    pub(crate) min_query_len: Option<usize>,
    #[arg(
        short = 'm',
        long = "max-items",
        value_name = "NUM",
        help = "Maximum number of suggestions shown (default: 12)"
    )]
    pub(crate) max_items: Option<usize>,
    #[arg(
        long = "log-level",
        value_name = "LEVEL",
        help = "Log filter used when PRESEARCH_LOG is unset (default: warn)"
    )]
    pub(crate) log_level: Option<String>,
    #[arg(long, help = "Print the learned pattern statistics (default: disabled)")]
    pub(crate) stats: bool,
    #[arg(
        short = 'p',
        long = "print-config",
        help = "Print the resolved configuration before running (default: disabled)"
    )]
    pub(crate) print_config: bool,
    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value_t = OutputFormat::Plain,
        help = "Choose how to print the result"
    )]
    pub(crate) output: OutputFormat,
}
