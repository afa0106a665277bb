//! Typing speed estimation.

use std::time::Instant;

/// Shortest interval fed into the average, in milliseconds.
pub const MIN_SAMPLE_MS: u64 = 40;
/// Longest interval fed into the average, in milliseconds.
pub const MAX_SAMPLE_MS: u64 = 520;

const PRIOR_WEIGHT: f64 = 0.72;
const SAMPLE_WEIGHT: f64 = 0.28;

/// Exponential moving average of the time between keystrokes.
#[derive(Debug, Clone)]
pub struct TypingVelocityTracker {
    ema_ms: u32,
    previous: Option<Instant>,
}

impl TypingVelocityTracker {
    /// Start from a previously learned average.
    pub fn new(seed_ms: u32) -> Self {
        Self {
            ema_ms: seed_ms,
            previous: None,
        }
    }

    /// Register a keystroke at `now`.
    ///
    /// The first keystroke after construction or [`Self::end_session`] has no
    /// interval to measure and only stores the timestamp.
    pub fn record(&mut self, now: Instant) {
        if let Some(previous) = self.previous {
            let elapsed = now.saturating_duration_since(previous).as_millis();
            let sample = u64::try_from(elapsed)
                .unwrap_or(u64::MAX)
                .clamp(MIN_SAMPLE_MS, MAX_SAMPLE_MS);
            let next = f64::from(self.ema_ms) * PRIOR_WEIGHT + sample as f64 * SAMPLE_WEIGHT;
            self.ema_ms = next.round() as u32;
        }
        self.previous = Some(now);
    }

    pub fn ema_ms(&self) -> u32 {
        self.ema_ms
    }

    /// Forget the last keystroke so the next one starts a fresh interval.
    pub fn end_session(&mut self) {
        self.previous = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn first_keystroke_keeps_seed() {
        let mut tracker = TypingVelocityTracker::new(140);
        tracker.record(Instant::now());
        assert_eq!(tracker.ema_ms(), 140);
    }

    #[test]
    fn interval_moves_average() {
        let start = Instant::now();
        let mut tracker = TypingVelocityTracker::new(140);
        tracker.record(start);
        tracker.record(start + Duration::from_millis(100));
        // 140 * 0.72 + 100 * 0.28 = 128.8
        assert_eq!(tracker.ema_ms(), 129);
    }

    #[test]
    fn samples_are_clamped() {
        let start = Instant::now();
        let mut fast = TypingVelocityTracker::new(140);
        fast.record(start);
        fast.record(start + Duration::from_millis(5));
        // 140 * 0.72 + 40 * 0.28 = 112
        assert_eq!(fast.ema_ms(), 112);

        let mut slow = TypingVelocityTracker::new(140);
        slow.record(start);
        slow.record(start + Duration::from_secs(10));
        // 140 * 0.72 + 520 * 0.28 = 246.4
        assert_eq!(slow.ema_ms(), 246);
    }

    #[test]
    fn ending_session_skips_the_gap() {
        let start = Instant::now();
        let mut tracker = TypingVelocityTracker::new(140);
        tracker.record(start);
        tracker.end_session();
        tracker.record(start + Duration::from_secs(30));
        assert_eq!(tracker.ema_ms(), 140);
    }
}
