//! Shared timing/range types and the monotonicity and non-overlap
//! invariants enforced on sentence timings after each merge pass.

use serde::{Deserialize, Serialize};

/// A half-open-by-convention time range in seconds. `end == start` is a
/// degenerate "unknown" range, not an error; see [`TimingRange::is_unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingRange {
    pub start: f64,
    pub end: f64,
}

impl TimingRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub const UNKNOWN: TimingRange = TimingRange { start: 0.0, end: 0.0 };

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    pub fn is_unknown(&self) -> bool {
        self.start == 0.0 && self.end == 0.0
    }

    /// The union of two ranges: earliest start, latest end. Used when
    /// rolling up word timings into their containing sentence.
    pub fn union(&self, other: &TimingRange) -> TimingRange {
        if self.is_unknown() {
            return *other;
        }
        if other.is_unknown() {
            return *self;
        }
        TimingRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Returns a copy with `end` clamped so it never exceeds `limit`.
    pub fn shrink_end_to(&self, limit: f64) -> TimingRange {
        if self.end > limit {
            TimingRange { start: self.start, end: limit }
        } else {
            *self
        }
    }
}

/// Sentence timing, extending [`TimingRange`] with provenance metadata.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentenceTiming {
    pub range: TimingRange,
    /// True once a TextGrid interval has overwritten this timing.
    pub fragment_backed: bool,
    pub confidence: Option<f64>,
}

impl SentenceTiming {
    pub fn unknown() -> Self {
        Self { range: TimingRange::UNKNOWN, fragment_backed: false, confidence: None }
    }

    pub fn from_range(range: TimingRange) -> Self {
        Self { range, fragment_backed: false, confidence: None }
    }
}

/// Enforces global monotonicity and non-overlap across a sequence of
/// sentence timings sorted by `start`: overlapping ends are shrunk to the
/// next sentence's start; degenerate (zero-duration) ranges are retained
/// but left as-is (callers flag them via `TimingRange::is_unknown`/`duration() == 0`).
///
/// Returns the number of timings that were shrunk, for reporting.
pub fn enforce_monotonicity(timings: &mut [SentenceTiming]) -> usize {
    let mut shrunk = 0;
    for i in 0..timings.len().saturating_sub(1) {
        let next_start = timings[i + 1].range.start;
        if timings[i].range.end > next_start {
            timings[i].range = timings[i].range.shrink_end_to(next_start);
            shrunk += 1;
        }
    }
    shrunk
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_prefers_known_range() {
        let unknown = TimingRange::UNKNOWN;
        let known = TimingRange::new(1.0, 2.0);
        assert_eq!(unknown.union(&known), known);
        assert_eq!(known.union(&unknown), known);
    }

    #[test]
    fn union_spans_both_ranges() {
        let a = TimingRange::new(1.0, 2.0);
        let b = TimingRange::new(0.5, 1.5);
        let u = a.union(&b);
        assert_eq!(u, TimingRange::new(0.5, 2.0));
    }

    #[test]
    fn monotonicity_shrinks_overlaps() {
        let mut timings = vec![
            SentenceTiming::from_range(TimingRange::new(0.0, 2.0)),
            SentenceTiming::from_range(TimingRange::new(1.5, 3.0)),
            SentenceTiming::from_range(TimingRange::new(3.0, 4.0)),
        ];
        let shrunk = enforce_monotonicity(&mut timings);
        assert_eq!(shrunk, 1);
        assert_eq!(timings[0].range.end, 1.5);
        for w in timings.windows(2) {
            assert!(w[0].range.end <= w[1].range.start);
        }
    }

    #[test]
    fn degenerate_ranges_are_retained() {
        let mut timings = vec![
            SentenceTiming::from_range(TimingRange::new(1.0, 1.0)),
            SentenceTiming::from_range(TimingRange::new(1.0, 2.0)),
        ];
        enforce_monotonicity(&mut timings);
        assert_eq!(timings[0].range.duration(), 0.0);
    }
}
