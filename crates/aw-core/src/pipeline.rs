//! Per-participant daily accounting.
//!
//! # Algorithm Summary
//!
//! 1. Sort the participant's observations and keep the active timestamps
//! 2. Merge them into active intervals and derive the inactive gaps
//! 3. Instantiate the recurring window for every day of the observed span
//! 4. Measure each window's overlap with the active and inactive lists
//!
//! Participants are independent, so [`analyze`] computes them in parallel
//! and isolates failures to the participant that caused them.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use rayon::prelude::*;

use crate::interval::{Interval, IntervalError, total_overlap};
use crate::merge::{check_disjoint, derive_inactive, merge_active};
use crate::types::{Observation, ParticipantId, ValidationError};
use crate::window::RecurringWindow;

/// Parameters for one accounting run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Largest spacing between active observations inside one active interval.
    gap_threshold: Duration,
    window: RecurringWindow,
    /// Zone used to decide which calendar day an instant belongs to.
    timezone: Tz,
}

impl PipelineConfig {
    /// Creates a configuration, rejecting a negative gap threshold.
    pub fn new(
        gap_threshold: Duration,
        window: RecurringWindow,
        timezone: Tz,
    ) -> Result<Self, ValidationError> {
        if gap_threshold < Duration::zero() {
            return Err(ValidationError::NegativeGapThreshold {
                minutes: gap_threshold.num_minutes(),
            });
        }
        Ok(Self {
            gap_threshold,
            window,
            timezone,
        })
    }

    pub const fn gap_threshold(&self) -> Duration {
        self.gap_threshold
    }

    pub const fn window(&self) -> RecurringWindow {
        self.window
    }

    pub const fn timezone(&self) -> Tz {
        self.timezone
    }
}

/// Active and inactive time inside one daily window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyRow {
    pub window: Interval,
    pub active: Duration,
    pub inactive: Duration,
}

/// Computed rows for one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantReport {
    pub participant_id: ParticipantId,
    pub active_intervals: Vec<Interval>,
    pub inactive_intervals: Vec<Interval>,
    pub rows: Vec<DailyRow>,
}

/// What happened to one participant in a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantOutcome {
    Computed(ParticipantReport),
    /// No active observations; nothing to report.
    Skipped { participant_id: ParticipantId },
    Failed {
        participant_id: ParticipantId,
        error: IntervalError,
    },
}

impl ParticipantOutcome {
    pub fn participant_id(&self) -> &ParticipantId {
        match self {
            Self::Computed(report) => &report.participant_id,
            Self::Skipped { participant_id } | Self::Failed { participant_id, .. } => {
                participant_id
            }
        }
    }
}

/// Counts of outcomes in a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub computed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[ParticipantOutcome]) -> Self {
        outcomes
            .iter()
            .fold(Self::default(), |mut summary, outcome| {
                match outcome {
                    ParticipantOutcome::Computed(_) => summary.computed += 1,
                    ParticipantOutcome::Skipped { .. } => summary.skipped += 1,
                    ParticipantOutcome::Failed { .. } => summary.failed += 1,
                }
                summary
            })
    }
}

/// Destination for computed participant reports.
///
/// Each participant is written to its own target, so implementations never
/// need to coordinate between participants.
pub trait ResultSink {
    type Error;

    /// Stores the report's rows, replacing anything previously stored for
    /// the same participant.
    fn write_participant(&mut self, report: &ParticipantReport) -> Result<(), Self::Error>;
}

/// Computes daily rows for a single participant.
///
/// `observations` may arrive in any order. Observations belonging to other
/// participants are ignored.
pub fn compute_participant(
    participant_id: &ParticipantId,
    observations: &[Observation],
    config: &PipelineConfig,
) -> Result<ParticipantReport, IntervalError> {
    let mut active_timestamps: Vec<DateTime<Utc>> = observations
        .iter()
        .filter(|o| o.is_active && &o.participant_id == participant_id)
        .map(|o| o.measured_at)
        .collect();
    active_timestamps.sort_unstable();

    let active = merge_active(&active_timestamps, config.gap_threshold)?;
    let inactive = derive_inactive(&active)?;
    check_disjoint(&active, &inactive)?;

    let Some((first, last)) = observed_span(&active, &inactive) else {
        return Err(IntervalError::EmptyInput);
    };

    let rows = config
        .window
        .daily_windows(first, last, config.timezone)?
        .into_iter()
        .map(|window| daily_row(window, &active, &inactive))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ParticipantReport {
        participant_id: participant_id.clone(),
        active_intervals: active,
        inactive_intervals: inactive,
        rows,
    })
}

/// Computes every participant found in `observations`.
///
/// Outcomes are ordered by participant ID.
pub fn analyze(observations: Vec<Observation>, config: &PipelineConfig) -> Vec<ParticipantOutcome> {
    let mut by_participant: BTreeMap<ParticipantId, Vec<Observation>> = BTreeMap::new();
    for observation in observations {
        by_participant
            .entry(observation.participant_id.clone())
            .or_default()
            .push(observation);
    }

    tracing::debug!(
        participants = by_participant.len(),
        "computing daily windows"
    );

    let groups: Vec<_> = by_participant.into_iter().collect();
    groups
        .par_iter()
        .map(|(participant_id, observations)| {
            match compute_participant(participant_id, observations, config) {
                Ok(report) => {
                    tracing::debug!(
                        participant_id = %participant_id,
                        windows = report.rows.len(),
                        active_intervals = report.active_intervals.len(),
                        "computed participant"
                    );
                    ParticipantOutcome::Computed(report)
                }
                Err(IntervalError::EmptyInput) => {
                    tracing::info!(
                        participant_id = %participant_id,
                        "skipping participant without active observations"
                    );
                    ParticipantOutcome::Skipped {
                        participant_id: participant_id.clone(),
                    }
                }
                Err(error) => {
                    tracing::warn!(participant_id = %participant_id, error = %error, "participant failed");
                    ParticipantOutcome::Failed {
                        participant_id: participant_id.clone(),
                        error,
                    }
                }
            }
        })
        .collect()
}

/// Earliest and latest endpoints over both interval lists.
pub fn observed_span(
    active: &[Interval],
    inactive: &[Interval],
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let first = [active.first(), inactive.first()]
        .into_iter()
        .flatten()
        .map(Interval::start)
        .min()?;
    let last = [active.last(), inactive.last()]
        .into_iter()
        .flatten()
        .map(Interval::end)
        .max()?;
    Some((first, last))
}

fn daily_row(
    window: Interval,
    active: &[Interval],
    inactive: &[Interval],
) -> Result<DailyRow, IntervalError> {
    let active_time = total_overlap(&window, active);
    let inactive_time = total_overlap(&window, inactive);
    if active_time + inactive_time > window.duration() {
        return Err(IntervalError::InvariantViolation(format!(
            "window starting {} holds {}s of activity but lasts {}s",
            window.start(),
            (active_time + inactive_time).num_seconds(),
            window.duration().num_seconds()
        )));
    }
    Ok(DailyRow {
        window,
        active: active_time,
        inactive: inactive_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone};

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, day, hour, minute, 0)
            .single()
            .expect("valid test timestamp")
    }

    fn participant(id: &str) -> ParticipantId {
        ParticipantId::new(id).unwrap()
    }

    fn observation(id: &str, measured_at: DateTime<Utc>, is_active: bool) -> Observation {
        Observation::new(participant(id), measured_at, is_active)
    }

    fn overnight_config() -> PipelineConfig {
        PipelineConfig::new(
            Duration::minutes(30),
            RecurringWindow::new(
                NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            ),
            Tz::UTC,
        )
        .unwrap()
    }

    #[test]
    fn config_rejects_negative_threshold() {
        let err = PipelineConfig::new(
            Duration::minutes(-5),
            overnight_config().window(),
            Tz::UTC,
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::NegativeGapThreshold { minutes: -5 });
    }

    #[test]
    fn computes_active_and_inactive_time_per_window() {
        // Active 22:00-23:00, idle until 02:00, active 02:00-02:20 (Jan 1 → Jan 2).
        let mut observations: Vec<_> = (0..=6)
            .map(|i| observation("p1", at(1, 22, 0) + Duration::minutes(i * 10), true))
            .collect();
        observations.push(observation("p1", at(2, 2, 0), true));
        observations.push(observation("p1", at(2, 2, 20), true));
        observations.push(observation("p1", at(2, 1, 0), false));

        let report = compute_participant(&participant("p1"), &observations, &overnight_config())
            .unwrap();

        assert_eq!(report.active_intervals.len(), 2);
        assert_eq!(report.inactive_intervals.len(), 1);
        assert_eq!(report.rows.len(), 1);

        let row = report.rows[0];
        assert_eq!(row.window.start(), at(1, 22, 0));
        assert_eq!(row.window.end(), at(2, 2, 20));
        assert_eq!(row.active, Duration::minutes(80));
        assert_eq!(row.inactive, Duration::hours(3));
    }

    #[test]
    fn input_order_does_not_matter() {
        let mut observations = vec![
            observation("p1", at(1, 23, 0), true),
            observation("p1", at(1, 21, 0), true),
            observation("p1", at(2, 3, 0), true),
        ];
        let config = overnight_config();
        let sorted = compute_participant(&participant("p1"), &observations, &config).unwrap();
        observations.reverse();
        let reversed = compute_participant(&participant("p1"), &observations, &config).unwrap();
        assert_eq!(sorted, reversed);
    }

    #[test]
    fn participant_without_active_observations_is_empty_input() {
        let observations = vec![observation("p1", at(1, 22, 0), false)];
        let err =
            compute_participant(&participant("p1"), &observations, &overnight_config())
                .unwrap_err();
        assert_eq!(err, IntervalError::EmptyInput);
    }

    #[test]
    fn rows_respect_coverage_bound() {
        let observations: Vec<_> = [0, 20, 90, 100, 300, 310, 900, 1500, 1510, 2000]
            .into_iter()
            .map(|m| observation("p1", at(1, 20, 0) + Duration::minutes(m), true))
            .collect();
        let report =
            compute_participant(&participant("p1"), &observations, &overnight_config()).unwrap();
        assert!(!report.rows.is_empty());
        for row in &report.rows {
            assert!(row.active + row.inactive <= row.window.duration());
        }
    }

    #[test]
    fn rows_cover_window_when_observed_throughout() {
        let observations: Vec<_> = (0..=12 * 6)
            .map(|i| observation("p1", at(1, 21, 0) + Duration::minutes(i * 10), i % 20 < 10))
            .collect();
        let report =
            compute_participant(&participant("p1"), &observations, &overnight_config()).unwrap();
        let row = report.rows[0];
        assert_eq!(row.active + row.inactive, row.window.duration());
    }

    #[test]
    fn analyze_isolates_participants() {
        let observations = vec![
            observation("b", at(1, 22, 0), true),
            observation("b", at(1, 23, 30), true),
            observation("a", at(1, 22, 0), false),
            observation("c", at(2, 1, 0), true),
        ];

        let outcomes = analyze(observations, &overnight_config());
        let ids: Vec<_> = outcomes.iter().map(|o| o.participant_id().as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        assert!(matches!(outcomes[0], ParticipantOutcome::Skipped { .. }));
        let ParticipantOutcome::Computed(report) = &outcomes[1] else {
            panic!("participant b should compute");
        };
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].inactive, Duration::minutes(90));
        assert!(matches!(outcomes[2], ParticipantOutcome::Computed(_)));

        let summary = BatchSummary::from_outcomes(&outcomes);
        assert_eq!(
            summary,
            BatchSummary {
                computed: 2,
                skipped: 1,
                failed: 0,
            }
        );
    }

    #[test]
    fn window_error_fails_only_that_participant() {
        let march = |day: u32, hour: u32, minute: u32| {
            Utc.with_ymd_and_hms(2023, 3, day, hour, minute, 0)
                .single()
                .expect("valid test timestamp")
        };
        // In New York 02:30 on 2023-03-12 is skipped and lands after 03:15.
        let config = PipelineConfig::new(
            Duration::minutes(30),
            RecurringWindow::new(
                NaiveTime::from_hms_opt(2, 30, 0).unwrap(),
                NaiveTime::from_hms_opt(3, 15, 0).unwrap(),
            ),
            chrono_tz::America::New_York,
        )
        .unwrap();
        let observations = vec![
            observation("dst", march(12, 6, 0), true),
            observation("dst", march(12, 9, 0), true),
            observation("ok", march(13, 7, 0), true),
            observation("ok", march(13, 7, 10), true),
        ];

        let outcomes = analyze(observations, &config);

        assert!(matches!(
            &outcomes[0],
            ParticipantOutcome::Failed {
                error: IntervalError::InvariantViolation(_),
                ..
            }
        ));
        let ParticipantOutcome::Computed(report) = &outcomes[1] else {
            panic!("participant ok should compute");
        };
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].active, Duration::minutes(10));
    }

    #[test]
    fn observed_span_prefers_union_of_lists() {
        let active = [
            Interval::new(at(1, 10, 0), at(1, 11, 0)).unwrap(),
            Interval::new(at(1, 13, 0), at(1, 14, 0)).unwrap(),
        ];
        let inactive = [Interval::new(at(1, 11, 0), at(1, 13, 0)).unwrap()];
        assert_eq!(
            observed_span(&active, &inactive),
            Some((at(1, 10, 0), at(1, 14, 0)))
        );
        assert_eq!(
            observed_span(&active[..1], &[]),
            Some((at(1, 10, 0), at(1, 11, 0)))
        );
        assert_eq!(observed_span(&[], &[]), None);
    }

    struct RecordingSink(Vec<(String, usize)>);

    impl ResultSink for RecordingSink {
        type Error = std::convert::Infallible;

        fn write_participant(&mut self, report: &ParticipantReport) -> Result<(), Self::Error> {
            self.0
                .push((report.participant_id.to_string(), report.rows.len()));
            Ok(())
        }
    }

    #[test]
    fn sink_receives_computed_reports() {
        let observations = vec![
            observation("p1", at(1, 22, 0), true),
            observation("p2", at(1, 12, 0), true),
        ];
        let mut sink = RecordingSink(Vec::new());
        for outcome in analyze(observations, &overnight_config()) {
            if let ParticipantOutcome::Computed(report) = outcome {
                sink.write_participant(&report).unwrap();
            }
        }
        assert_eq!(
            sink.0,
            vec![("p1".to_string(), 1), ("p2".to_string(), 0)]
        );
    }
}
