use serde::Deserialize;

use crate::error::TuningError;
use crate::patterns::{PREFIX_MIN_LEN, PatternStats, char_prefix, normalize_query};

/// Tunable constants of the adaptive debounce.
///
/// The defaults are hand-calibrated; every field can be overridden from the
/// `[debounce]` configuration section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DebounceTuning {
    /// Base delay for one, two, three-to-four, five-to-seven and eight or
    /// more characters.
    pub base_ms: [f64; 5],
    pub speed_pivot_ms: f64,
    pub speed_span_ms: f64,
    pub speed_min: f64,
    pub speed_max: f64,
    pub sample_min_ms: u32,
    pub sample_max_ms: u32,
    pub pattern_prefix_len: usize,
    pub pattern_hits_scale: f64,
    pub pattern_max: f64,
    pub similar_factor: f64,
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Default for DebounceTuning {
    fn default() -> Self {
        Self {
            base_ms: [340.0, 300.0, 260.0, 220.0, 180.0],
            speed_pivot_ms: 80.0,
            speed_span_ms: 240.0,
            speed_min: -0.35,
            speed_max: 0.55,
            sample_min_ms: 40,
            sample_max_ms: 520,
            pattern_prefix_len: 8,
            pattern_hits_scale: 14.0,
            pattern_max: 0.55,
            similar_factor: 0.55,
            min_ms: 60,
            max_ms: 420,
        }
    }
}

impl DebounceTuning {
    /// Reject values that invert a range or make a factor meaningless.
    pub fn validate(&self) -> Result<(), TuningError> {
        let fail = |field: &'static str, problem: &'static str| -> Result<(), TuningError> {
            Err(TuningError { field, problem })
        };

        if self.min_ms > self.max_ms {
            return fail("min_ms", "must not exceed max_ms");
        }
        if self.sample_min_ms > self.sample_max_ms {
            return fail("sample_min_ms", "must not exceed sample_max_ms");
        }
        if self.base_ms.iter().any(|ms| !ms.is_finite() || *ms < 0.0) {
            return fail("base_ms", "must hold finite, non-negative values");
        }
        if !self.speed_pivot_ms.is_finite() {
            return fail("speed_pivot_ms", "must be finite");
        }
        if !(self.speed_span_ms.is_finite() && self.speed_span_ms > 0.0) {
            return fail("speed_span_ms", "must be finite and above zero");
        }
        if !(self.speed_min.is_finite() && self.speed_max.is_finite()) {
            return fail("speed_min", "and speed_max must be finite");
        }
        if self.speed_min > self.speed_max {
            return fail("speed_min", "must not exceed speed_max");
        }
        if !(self.pattern_hits_scale.is_finite() && self.pattern_hits_scale > 0.0) {
            return fail("pattern_hits_scale", "must be finite and above zero");
        }
        if !(0.0..=1.0).contains(&self.pattern_max) {
            return fail("pattern_max", "must lie within 0..=1");
        }
        if !(self.similar_factor.is_finite() && self.similar_factor >= 0.0) {
            return fail("similar_factor", "must be finite and non-negative");
        }
        Ok(())
    }

    fn base_for(&self, len: usize) -> f64 {
        match len {
            0 => 0.0,
            1 => self.base_ms[0],
            2 => self.base_ms[1],
            3..=4 => self.base_ms[2],
            5..=7 => self.base_ms[3],
            _ => self.base_ms[4],
        }
    }

    fn speed_factor(&self, key_interval_ms: u32) -> f64 {
        // max/min rather than clamp: an unvalidated tuning must not panic.
        let interval = f64::from(key_interval_ms.max(self.sample_min_ms).min(self.sample_max_ms));
        ((interval - self.speed_pivot_ms) / self.speed_span_ms)
            .max(self.speed_min)
            .min(self.speed_max)
    }

    fn pattern_factor(&self, hits: u32) -> f64 {
        (f64::from(hits) / self.pattern_hits_scale)
            .max(0.0)
            .min(self.pattern_max)
    }
}

/// Delay in milliseconds to wait before searching for `query`.
///
/// `key_interval_ms` is the live typing estimate; when absent the stored
/// average from `stats` is used. A blank query is always zero so clearing
/// the field takes effect immediately. This is a pure function. It never
/// panics, though only a tuning that passes [`DebounceTuning::validate`]
/// gives meaningful delays.
pub fn compute_delay(
    query: &str,
    key_interval_ms: Option<u32>,
    stats: &PatternStats,
    tuning: &DebounceTuning,
) -> u64 {
    let normalized = normalize_query(query);
    let len = normalized.chars().count();
    if len == 0 {
        return 0;
    }

    let interval = key_interval_ms.unwrap_or_else(|| stats.key_interval_ms());
    let speed = tuning.speed_factor(interval);
    let pattern = tuning.pattern_factor(pattern_hits(&normalized, stats, tuning));

    let mut ms = tuning.base_for(len) * (1.0 + speed) * (1.0 - pattern);
    if resembles_recent(&normalized, stats) {
        ms *= tuning.similar_factor;
    }

    let ms = ms.round().max(0.0) as u64;
    ms.max(tuning.min_ms).min(tuning.max_ms)
}

/// Learned hits for the query's leading characters.
fn pattern_hits(normalized: &str, stats: &PatternStats, tuning: &DebounceTuning) -> u32 {
    let prefix = char_prefix(normalized, tuning.pattern_prefix_len);
    if prefix.chars().count() < PREFIX_MIN_LEN {
        return 0;
    }
    stats.hits_for(prefix)
}

fn resembles_recent(normalized: &str, stats: &PatternStats) -> bool {
    stats.last_queries.iter().any(|recent| {
        let recent = normalize_query(recent);
        !recent.is_empty() && (recent.starts_with(normalized) || normalized.starts_with(&recent))
    })
}
