//! Active interval merging and inactive gap derivation.
//!
//! Active observations closer together than the gap threshold belong to the
//! same active interval. The spaces between active intervals are inactive.
//! Time before the first and after the last active interval is unobserved
//! and belongs to neither list.

use chrono::{DateTime, Duration, Utc};

use crate::interval::{Interval, IntervalError};

/// Merges ascending active timestamps into maximal active intervals.
///
/// A timestamp extends the current interval when its gap to the previous
/// timestamp is at most `gap_threshold`; otherwise it opens a new one.
pub fn merge_active(
    timestamps: &[DateTime<Utc>],
    gap_threshold: Duration,
) -> Result<Vec<Interval>, IntervalError> {
    let Some((&first, rest)) = timestamps.split_first() else {
        return Err(IntervalError::EmptyInput);
    };

    let mut intervals = Vec::new();
    let mut start = first;
    let mut previous = first;

    for (offset, &current) in rest.iter().enumerate() {
        if current < previous {
            return Err(IntervalError::Unsorted {
                index: offset + 1,
                previous,
                current,
            });
        }
        if current - previous > gap_threshold {
            intervals.push(Interval::new(start, previous)?);
            start = current;
        }
        previous = current;
    }
    intervals.push(Interval::new(start, previous)?);

    check_gap_invariant(&intervals, gap_threshold)?;
    Ok(intervals)
}

/// Derives the inactive gaps between consecutive active intervals.
pub fn derive_inactive(active: &[Interval]) -> Result<Vec<Interval>, IntervalError> {
    if active.is_empty() {
        return Err(IntervalError::EmptyInput);
    }
    check_ordered(active)?;

    active
        .windows(2)
        .filter(|pair| pair[1].start() - pair[0].end() > Duration::zero())
        .map(|pair| Interval::new(pair[0].end(), pair[1].start()))
        .collect()
}

/// Checks that consecutive intervals are separated by more than `gap_threshold`.
pub fn check_gap_invariant(
    intervals: &[Interval],
    gap_threshold: Duration,
) -> Result<(), IntervalError> {
    check_ordered(intervals)?;
    for pair in intervals.windows(2) {
        let gap = pair[1].start() - pair[0].end();
        if gap <= gap_threshold {
            return Err(IntervalError::InvariantViolation(format!(
                "active intervals ending {} and starting {} are only {}s apart",
                pair[0].end(),
                pair[1].start(),
                gap.num_seconds()
            )));
        }
    }
    Ok(())
}

/// Checks that no active interval overlaps an inactive one.
///
/// Both lists must be ordered; shared endpoints are allowed.
pub fn check_disjoint(active: &[Interval], inactive: &[Interval]) -> Result<(), IntervalError> {
    let (mut a, mut i) = (0, 0);
    while a < active.len() && i < inactive.len() {
        if active[a].interiors_intersect(&inactive[i]) {
            return Err(IntervalError::InvariantViolation(format!(
                "active interval starting {} overlaps inactive interval starting {}",
                active[a].start(),
                inactive[i].start()
            )));
        }
        if active[a].end() <= inactive[i].end() {
            a += 1;
        } else {
            i += 1;
        }
    }
    Ok(())
}

/// Checks that a list is sorted by start and free of overlapping interiors.
fn check_ordered(intervals: &[Interval]) -> Result<(), IntervalError> {
    for pair in intervals.windows(2) {
        if pair[1].start() < pair[0].end() {
            return Err(IntervalError::InvariantViolation(format!(
                "interval starting {} begins before the previous one ends at {}",
                pair[1].start(),
                pair[0].end()
            )));
        }
    }
    Ok(())
}
