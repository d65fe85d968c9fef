//! Closed time intervals and boundary-inclusive overlap.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

/// Errors raised while building or checking interval lists.
///
/// All of these are scoped to a single participant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntervalError {
    /// There were no active observations to build intervals from.
    #[error("no active observations")]
    EmptyInput,

    /// Timestamps were not in ascending order.
    #[error("timestamps out of order at index {index}: {current} precedes {previous}")]
    Unsorted {
        index: usize,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    /// A derived list broke one of the interval list invariants.
    #[error("interval invariant violated: {0}")]
    InvariantViolation(String),
}

/// A closed time interval `[start, end]`.
///
/// Degenerate when `start == end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Interval {
    /// Creates an interval, rejecting `start > end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, IntervalError> {
        if start > end {
            return Err(IntervalError::InvariantViolation(format!(
                "interval start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Creates a degenerate interval covering a single instant.
    pub const fn instant(at: DateTime<Utc>) -> Self {
        Self { start: at, end: at }
    }

    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn is_degenerate(&self) -> bool {
        self.start == self.end
    }

    /// Returns the shared duration with `other`, or `None` when they are apart.
    ///
    /// Touching intervals overlap with a zero duration.
    pub fn overlap(&self, other: &Self) -> Option<Duration> {
        if other.end >= self.start && other.start <= self.end {
            Some(other.end.min(self.end) - other.start.max(self.start))
        } else {
            None
        }
    }

    /// Whether the interiors of the two intervals intersect.
    ///
    /// Sharing only an endpoint does not count.
    pub fn interiors_intersect(&self, other: &Self) -> bool {
        self.start.max(other.start) < self.end.min(other.end)
    }
}

/// Sums the overlap between `window` and every interval in `intervals`.
pub fn total_overlap(window: &Interval, intervals: &[Interval]) -> Duration {
    intervals
        .iter()
        .filter_map(|interval| window.overlap(interval))
        .fold(Duration::zero(), |total, overlap| total + overlap)
}
