//! Recurring daily observation windows.
//!
//! A recurring window is a pair of wall-clock times. When the end time is
//! earlier than the start time the window crosses midnight and ends on the
//! following calendar day.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::interval::{Interval, IntervalError};

/// A daily window between two wall-clock times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecurringWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl RecurringWindow {
    pub const fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Whether the window ends on the day after it starts.
    pub fn wraps_midnight(&self) -> bool {
        self.end < self.start
    }

    /// Instantiates the window for every calendar day of `[first, last]`.
    ///
    /// Days are taken in `tz`. Windows that do not intersect the span are
    /// dropped and the rest are clipped to it, so the result is
    /// chronological and non-overlapping.
    ///
    /// Fails when a day's window resolves to a start after its end, which a
    /// forward DST transition can cause for a same-day window.
    pub fn daily_windows(
        &self,
        first: DateTime<Utc>,
        last: DateTime<Utc>,
        tz: Tz,
    ) -> Result<Vec<Interval>, IntervalError> {
        if first > last {
            return Ok(Vec::new());
        }

        let first_day = first.with_timezone(&tz).date_naive();
        let last_day = last.with_timezone(&tz).date_naive();
        let end_offset = if self.wraps_midnight() {
            Duration::days(1)
        } else {
            Duration::zero()
        };

        let mut windows = Vec::new();
        for day in first_day.iter_days().take_while(|day| *day <= last_day) {
            let window_start = local_to_utc(tz, day, self.start);
            let window_end = local_to_utc(tz, day + end_offset, self.end);
            if window_start > window_end {
                return Err(IntervalError::InvariantViolation(format!(
                    "window on {day} starts at {window_start} but ends at {window_end} in {tz}"
                )));
            }
            if window_start < last && window_end > first {
                windows.push(Interval::new(window_start.max(first), window_end.min(last))?);
            }
        }
        Ok(windows)
    }
}

/// Resolves a wall-clock time on `day` in `tz` to an instant.
///
/// Ambiguous times use the earlier instant. Times skipped by a forward
/// transition are shifted forward by an hour.
fn local_to_utc(tz: Tz, day: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    let local = day.and_time(time);
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        LocalResult::None => tz
            .from_local_datetime(&(local + Duration::hours(1)))
            .earliest()
            .map_or_else(
                || Utc.from_utc_datetime(&local),
                |dt| dt.with_timezone(&Utc),
            ),
    }
}
