//! Scoring and merging of suggestion candidates.
//!
//! Candidates come from four places (recent queries, learned suggestions,
//! curated quick links and live product matches). [`gather`] collects them
//! for a query and [`rank`] orders the result against the learned patterns.

mod candidates;
mod item;
mod score;

pub use candidates::{CandidateSources, MAX_SUGGESTIONS, gather};
pub use item::{ItemKind, PredictiveItem, search_href};
pub use score::{PATTERN_PREFIX_LEN, rank};
