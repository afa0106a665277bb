use std::fmt::Write;
use std::path::PathBuf;

use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use presearch::{app_dirs, logging};

fn describe(dir: anyhow::Result<PathBuf>) -> String {
    dir.map(|path| path.display().to_string())
        .unwrap_or_else(|err| format!("unavailable ({err})"))
}

/// Version banner listing where configuration and learned patterns live.
pub(super) fn long_version() -> &'static str {
    let mut details = format!("presearch {}", env!("CARGO_PKG_VERSION"));
    let _ = writeln!(details);
    let _ = writeln!(details, "config directory: {}", describe(app_dirs::get_config_dir()));
    let _ = writeln!(details, "data directory: {}", describe(app_dirs::get_data_dir()));
    let _ = write!(details, "log filter variable: {}", logging::LOG_ENV);

    Box::leak(details.into_boxed_str())
}

/// Help colours: green headings, cyan flags, yellow value names.
pub(super) fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
        .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
        .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
        .placeholder(AnsiColor::Yellow.on_default())
        .valid(AnsiColor::Cyan.on_default())
}
