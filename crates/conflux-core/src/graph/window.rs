//! Windowing strategies for logical collections.
//!
//! A windowing strategy partitions a collection into time-based groups for
//! aggregation. It is set exactly once per edge at construction time and is
//! immutable thereafter; translation reads it to pick the windowing runtime
//! for the detected execution mode.
//!
//! ## Window Kinds
//!
//! - **Global**: a single implicit window covering all time
//! - **Fixed**: non-overlapping intervals of size W
//! - **Sliding**: overlapping intervals of size W advancing by period P
//! - **Session**: per-key activity windows merged while gaps stay below a
//!   gap duration

use std::time::Duration;

use smallvec::SmallVec;

/// A half-open event-time interval `[start, end)` in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowSpan {
    /// Inclusive start timestamp (ms).
    pub start: i64,
    /// Exclusive end timestamp (ms).
    pub end: i64,
}

impl WindowSpan {
    /// Creates a span from explicit bounds.
    #[must_use]
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// The single global window covering all representable time.
    #[must_use]
    pub fn global() -> Self {
        Self {
            start: i64::MIN,
            end: i64::MAX,
        }
    }

    /// Returns whether the timestamp falls inside this span.
    #[must_use]
    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start && timestamp < self.end
    }

    /// Returns whether two spans overlap or touch.
    #[must_use]
    pub fn intersects(&self, other: &WindowSpan) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Merges two overlapping or touching spans into their union.
    #[must_use]
    pub fn merge(&self, other: &WindowSpan) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// The kind of windowing applied to a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowKind {
    /// Single implicit window over all time.
    #[default]
    Global,
    /// Non-overlapping intervals of fixed size.
    Fixed {
        /// Window size.
        size: Duration,
    },
    /// Overlapping intervals of fixed size advancing by a period.
    Sliding {
        /// Window size.
        size: Duration,
        /// Slide period between consecutive window starts.
        period: Duration,
    },
    /// Activity windows merged while the inter-event gap stays below `gap`.
    Session {
        /// Maximum inactivity gap before a session closes.
        gap: Duration,
    },
}

/// When grouped output for a window is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Trigger {
    /// Emit once the watermark passes the window end.
    #[default]
    OnWatermark,
    /// Emit every time the window has accumulated this many elements.
    AfterCount(u64),
}

/// The full windowing policy of a collection: window kind, trigger, and
/// allowed lateness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowingStrategy {
    /// How elements are partitioned into windows.
    pub kind: WindowKind,
    /// When grouped results are emitted.
    pub trigger: Trigger,
    /// How long past the window end late elements are still accepted.
    pub allowed_lateness: Duration,
}

#[allow(clippy::cast_possible_wrap)]
fn millis(d: Duration) -> i64 {
    d.as_millis() as i64
}

impl WindowingStrategy {
    /// The default strategy: a single global window.
    #[must_use]
    pub fn global() -> Self {
        Self::default()
    }

    /// Fixed windows of the given size.
    #[must_use]
    pub fn fixed(size: Duration) -> Self {
        Self {
            kind: WindowKind::Fixed { size },
            ..Self::default()
        }
    }

    /// Sliding windows of the given size advancing by `period`.
    #[must_use]
    pub fn sliding(size: Duration, period: Duration) -> Self {
        Self {
            kind: WindowKind::Sliding { size, period },
            ..Self::default()
        }
    }

    /// Session windows with the given inactivity gap.
    #[must_use]
    pub fn session(gap: Duration) -> Self {
        Self {
            kind: WindowKind::Session { gap },
            ..Self::default()
        }
    }

    /// Sets the trigger.
    #[must_use]
    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = trigger;
        self
    }

    /// Sets the allowed lateness.
    #[must_use]
    pub fn with_allowed_lateness(mut self, lateness: Duration) -> Self {
        self.allowed_lateness = lateness;
        self
    }

    /// Checks the strategy for degenerate parameters.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if a window size, slide period,
    /// or session gap is zero, if a slide period exceeds the window size,
    /// or if a count trigger fires after zero elements.
    pub fn check(&self) -> Result<(), String> {
        match self.kind {
            WindowKind::Global => {}
            WindowKind::Fixed { size } => {
                if size.is_zero() {
                    return Err("fixed window size must be > 0".to_string());
                }
            }
            WindowKind::Sliding { size, period } => {
                if size.is_zero() {
                    return Err("sliding window size must be > 0".to_string());
                }
                if period.is_zero() {
                    return Err("sliding window period must be > 0".to_string());
                }
                // With period > size, timestamps between windows would be
                // assigned nowhere and silently dropped at grouping time.
                if period > size {
                    return Err(
                        "sliding window period must not exceed the window size".to_string()
                    );
                }
            }
            WindowKind::Session { gap } => {
                if gap.is_zero() {
                    return Err("session gap must be > 0".to_string());
                }
            }
        }
        if let Trigger::AfterCount(0) = self.trigger {
            return Err("count trigger must fire after at least 1 element".to_string());
        }
        Ok(())
    }

    /// Assigns the window(s) a timestamp belongs to.
    ///
    /// Fixed and global windowing assign exactly one window; sliding
    /// assigns `ceil(size / period)` windows; session assigns a proto
    /// window `[ts, ts + gap)` that is merged with overlapping sessions at
    /// grouping time.
    #[must_use]
    pub fn assign(&self, timestamp: i64) -> SmallVec<[WindowSpan; 2]> {
        let mut spans = SmallVec::new();
        match self.kind {
            WindowKind::Global => spans.push(WindowSpan::global()),
            WindowKind::Fixed { size } => {
                let size = millis(size);
                let start = timestamp.div_euclid(size) * size;
                spans.push(WindowSpan::new(start, start + size));
            }
            WindowKind::Sliding { size, period } => {
                let size = millis(size);
                let period = millis(period);
                let last_start = timestamp - timestamp.rem_euclid(period);
                let mut start = last_start;
                while start > timestamp.saturating_sub(size) {
                    spans.push(WindowSpan::new(start, start + size));
                    start -= period;
                }
                spans.reverse();
            }
            WindowKind::Session { gap } => {
                spans.push(WindowSpan::new(timestamp, timestamp + millis(gap)));
            }
        }
        spans
    }
}

/// Merges overlapping session proto-windows into final session spans.
///
/// Input spans need not be ordered; output is sorted by start and pairwise
/// disjoint.
#[must_use]
pub fn merge_sessions(mut spans: Vec<WindowSpan>) -> Vec<WindowSpan> {
    if spans.is_empty() {
        return spans;
    }
    spans.sort_unstable();
    let mut merged = Vec::with_capacity(spans.len());
    let mut current = spans[0];
    for span in &spans[1..] {
        if current.intersects(span) {
            current = current.merge(span);
        } else {
            merged.push(current);
            current = *span;
        }
    }
    merged.push(current);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_assigns_single_window() {
        let strategy = WindowingStrategy::global();
        let spans = strategy.assign(123_456);
        assert_eq!(spans.as_slice(), &[WindowSpan::global()]);
    }

    #[test]
    fn fixed_assigns_aligned_interval() {
        let strategy = WindowingStrategy::fixed(Duration::from_secs(60));
        let spans = strategy.assign(125_000);
        assert_eq!(spans.as_slice(), &[WindowSpan::new(120_000, 180_000)]);
        assert!(spans[0].contains(125_000));
    }

    #[test]
    fn fixed_handles_negative_timestamps() {
        let strategy = WindowingStrategy::fixed(Duration::from_secs(1));
        let spans = strategy.assign(-500);
        assert_eq!(spans.as_slice(), &[WindowSpan::new(-1000, 0)]);
    }

    #[test]
    fn sliding_assigns_overlapping_intervals() {
        let strategy =
            WindowingStrategy::sliding(Duration::from_secs(10), Duration::from_secs(5));
        let spans = strategy.assign(12_000);
        assert_eq!(
            spans.as_slice(),
            &[
                WindowSpan::new(5_000, 15_000),
                WindowSpan::new(10_000, 20_000),
            ]
        );
        for span in &spans {
            assert!(span.contains(12_000));
        }
    }

    #[test]
    fn session_assigns_proto_window() {
        let strategy = WindowingStrategy::session(Duration::from_secs(30));
        let spans = strategy.assign(1_000);
        assert_eq!(spans.as_slice(), &[WindowSpan::new(1_000, 31_000)]);
    }

    #[test]
    fn merge_sessions_joins_overlapping() {
        let merged = merge_sessions(vec![
            WindowSpan::new(100, 200),
            WindowSpan::new(500, 600),
            WindowSpan::new(150, 300),
        ]);
        assert_eq!(
            merged,
            vec![WindowSpan::new(100, 300), WindowSpan::new(500, 600)]
        );
    }

    #[test]
    fn merge_sessions_empty() {
        assert!(merge_sessions(Vec::new()).is_empty());
    }

    #[test]
    fn check_rejects_zero_sizes() {
        assert!(WindowingStrategy::fixed(Duration::ZERO).check().is_err());
        assert!(WindowingStrategy::sliding(Duration::from_secs(1), Duration::ZERO)
            .check()
            .is_err());
        assert!(WindowingStrategy::session(Duration::ZERO).check().is_err());
        assert!(WindowingStrategy::global()
            .with_trigger(Trigger::AfterCount(0))
            .check()
            .is_err());
        assert!(WindowingStrategy::fixed(Duration::from_secs(1)).check().is_ok());
    }

    #[test]
    fn check_rejects_sliding_period_exceeding_size() {
        // A 10s window every 30s would leave 20s gaps no window covers.
        let gappy =
            WindowingStrategy::sliding(Duration::from_secs(10), Duration::from_secs(30));
        assert!(gappy.check().is_err());

        let dense =
            WindowingStrategy::sliding(Duration::from_secs(30), Duration::from_secs(10));
        assert!(dense.check().is_ok());

        // Tumbling-equivalent sliding windows stay valid.
        let tumbling =
            WindowingStrategy::sliding(Duration::from_secs(10), Duration::from_secs(10));
        assert!(tumbling.check().is_ok());
    }
}
