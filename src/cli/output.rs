use std::fmt::Write;

use anyhow::Result;
use unicode_width::UnicodeWidthStr;

use presearch::{FetchPhase, PatternStats, PredictiveItem};

use crate::workflow::SessionOutcome;

/// Labels wider than this are not padded further.
const LABEL_COLUMN: usize = 32;

/// Print a plain-text representation of the session outcome.
pub(crate) fn print_plain(outcome: &SessionOutcome) {
    print!("{}", format_outcome_plain(outcome));
}

/// Render the session outcome as aligned, human-readable text.
pub(crate) fn format_outcome_plain(outcome: &SessionOutcome) -> String {
    let snapshot = &outcome.snapshot;
    let mut text = String::new();

    let _ = writeln!(
        text,
        "query: '{}' (debounce {} ms, {})",
        snapshot.query,
        snapshot.delay_ms,
        phase_label(snapshot.phase)
    );
    if let Some(error) = &snapshot.error {
        let _ = writeln!(text, "error: {error}");
    }

    if snapshot.items.is_empty() {
        let _ = writeln!(text, "No suggestions");
    }
    for (position, item) in snapshot.items.iter().enumerate() {
        let _ = writeln!(text, "{}", format_item(position + 1, item));
    }

    if let Some(query) = &outcome.submitted {
        let _ = writeln!(text, "submitted: {query}");
    }
    if let Some(item) = &outcome.picked {
        let _ = writeln!(text, "picked: {} ({})", item.label, item.href);
    }
    if let Some(stats) = &outcome.stats {
        text.push_str(&format_stats(stats));
    }
    text
}

fn phase_label(phase: FetchPhase) -> &'static str {
    match phase {
        FetchPhase::Closed => "closed",
        FetchPhase::Idle => "idle",
        FetchPhase::Loading => "loading",
        FetchPhase::Success => "success",
        FetchPhase::Error => "error",
    }
}

fn format_item(position: usize, item: &PredictiveItem) -> String {
    let width = item.label.width();
    let padding = LABEL_COLUMN.saturating_sub(width);
    format!(
        "{position:>3}. {:<8} {}{} {:>4}  {}",
        item.kind.as_str(),
        item.label,
        " ".repeat(padding),
        item.score,
        item.href
    )
}

fn format_stats(stats: &PatternStats) -> String {
    let mut text = String::new();
    let _ = writeln!(
        text,
        "stats: {} submits, {} picks, {} ms between keys",
        stats.submits, stats.picks, stats.avg_key_interval_ms
    );

    let mut hits: Vec<(&String, &u32)> = stats.prefix_hits.iter().collect();
    hits.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (prefix, count) in hits.into_iter().take(10) {
        let _ = writeln!(text, "  {prefix:<12} {count}");
    }
    if !stats.last_queries.is_empty() {
        let _ = writeln!(text, "  recent: {}", stats.last_queries.join(", "));
    }
    text
}

/// Format the session outcome as a JSON string.
pub(crate) fn format_outcome_json(outcome: &SessionOutcome) -> Result<String> {
    Ok(serde_json::to_string_pretty(outcome)?)
}

/// Print the JSON representation of the session outcome.
pub(crate) fn print_json(outcome: &SessionOutcome) -> Result<()> {
    println!("{}", format_outcome_json(outcome)?);
    Ok(())
}
