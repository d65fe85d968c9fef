//! Report command for stored daily windows.
//!
//! Renders one participant's windows in the configured time zone, either as
//! a human-readable table or as JSON.

use std::io::Write;

use anyhow::{Context, Result};
use aw_core::ParticipantId;
use aw_db::DailyWindowRecord;
use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;
use clap::Args;
use serde::Serialize;

use crate::Config;
use crate::commands::util::{format_duration, open_database};

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Participant to report on.
    pub participant: String,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct ReportJson {
    participant_id: String,
    timezone: String,
    total_active_ms: i64,
    total_inactive_ms: i64,
    windows: Vec<WindowJson>,
}

#[derive(Debug, Serialize)]
struct WindowJson {
    window_start: String,
    window_end: String,
    active_ms: i64,
    inactive_ms: i64,
    computed_at: String,
}

pub fn run<W: Write>(writer: &mut W, args: &ReportArgs, config: &Config) -> Result<()> {
    let participant_id =
        ParticipantId::new(args.participant.as_str()).context("invalid participant")?;
    let db = open_database(config)?;
    let windows = db
        .list_daily_windows(participant_id.as_str())
        .context("failed to load daily windows")?;

    if args.json {
        let report = build_json(&participant_id, &windows, config.timezone);
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
    } else {
        write_human(writer, &participant_id, &windows, config.timezone)?;
    }
    Ok(())
}

fn build_json(participant_id: &ParticipantId, windows: &[DailyWindowRecord], tz: Tz) -> ReportJson {
    ReportJson {
        participant_id: participant_id.to_string(),
        timezone: tz.name().to_string(),
        total_active_ms: windows.iter().map(|w| w.active_ms).sum(),
        total_inactive_ms: windows.iter().map(|w| w.inactive_ms).sum(),
        windows: windows
            .iter()
            .map(|w| WindowJson {
                window_start: rfc3339_local(w.window_start, tz),
                window_end: rfc3339_local(w.window_end, tz),
                active_ms: w.active_ms,
                inactive_ms: w.inactive_ms,
                computed_at: w.computed_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            })
            .collect(),
    }
}

fn write_human<W: Write>(
    writer: &mut W,
    participant_id: &ParticipantId,
    windows: &[DailyWindowRecord],
    tz: Tz,
) -> Result<()> {
    if windows.is_empty() {
        writeln!(
            writer,
            "No daily windows stored for {participant_id}. Run `aw compute` first."
        )?;
        return Ok(());
    }

    writeln!(writer, "Participant {participant_id} ({})", tz.name())?;
    writeln!(writer)?;
    writeln!(writer, "{:<35} {:>9} {:>9}", "WINDOW", "ACTIVE", "INACTIVE")?;
    for window in windows {
        let span = format!(
            "{} - {}",
            short_local(window.window_start, tz),
            short_local(window.window_end, tz)
        );
        writeln!(
            writer,
            "{span:<35} {:>9} {:>9}",
            format_duration(window.active_ms),
            format_duration(window.inactive_ms)
        )?;
    }

    let active: i64 = windows.iter().map(|w| w.active_ms).sum();
    let inactive: i64 = windows.iter().map(|w| w.inactive_ms).sum();
    writeln!(writer)?;
    writeln!(
        writer,
        "Total: {} active, {} inactive over {} window(s)",
        format_duration(active),
        format_duration(inactive),
        windows.len()
    )?;
    Ok(())
}

fn short_local(timestamp: DateTime<Utc>, tz: Tz) -> String {
    timestamp.with_timezone(&tz).format("%Y-%m-%d %H:%M").to_string()
}

fn rfc3339_local(timestamp: DateTime<Utc>, tz: Tz) -> String {
    timestamp
        .with_timezone(&tz)
        .to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    use aw_core::{DailyRow, Interval, ParticipantReport};
    use aw_db::Database;
    use chrono::{Duration, NaiveTime, TimeZone};
    use insta::assert_snapshot;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, day, hour, minute, 0)
            .single()
            .expect("valid test timestamp")
    }

    fn seeded_config(temp: &tempfile::TempDir, timezone: Tz) -> Config {
        let config = Config {
            database_path: temp.path().join("aw.db"),
            results_dir: None,
            gap_threshold_minutes: 30,
            window_start: NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
            window_end: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            timezone,
        };
        let mut db = Database::open(&config.database_path).unwrap();
        let report = ParticipantReport {
            participant_id: ParticipantId::new("p1").unwrap(),
            active_intervals: Vec::new(),
            inactive_intervals: Vec::new(),
            rows: vec![
                DailyRow {
                    window: Interval::new(at(2, 1, 0), at(2, 13, 0)).unwrap(),
                    active: Duration::minutes(80),
                    inactive: Duration::hours(3),
                },
                DailyRow {
                    window: Interval::new(at(3, 1, 0), at(3, 2, 30)).unwrap(),
                    active: Duration::minutes(45),
                    inactive: Duration::zero(),
                },
            ],
        };
        db.replace_daily_windows(&report, at(4, 12, 0)).unwrap();
        config
    }

    #[test]
    fn report_renders_table_in_configured_zone() {
        let temp = tempfile::tempdir().unwrap();
        let config = seeded_config(&temp, chrono_tz::America::Halifax);
        let args = ReportArgs {
            participant: "p1".to_string(),
            json: false,
        };

        let mut output = Vec::new();
        run(&mut output, &args, &config).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_snapshot!(output, @r"
        Participant p1 (America/Halifax)

        WINDOW                                 ACTIVE  INACTIVE
        2023-01-01 21:00 - 2023-01-02 09:00    1h 20m     3h 0m
        2023-01-02 21:00 - 2023-01-02 22:30       45m        0m

        Total: 2h 5m active, 3h 0m inactive over 2 window(s)
        ");
    }

    #[test]
    fn report_json_includes_totals() {
        let temp = tempfile::tempdir().unwrap();
        let config = seeded_config(&temp, Tz::UTC);
        let args = ReportArgs {
            participant: "p1".to_string(),
            json: true,
        };

        let mut output = Vec::new();
        run(&mut output, &args, &config).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value["participant_id"], "p1");
        assert_eq!(value["timezone"], "UTC");
        assert_eq!(value["total_active_ms"], 125 * 60_000);
        assert_eq!(value["total_inactive_ms"], 3 * 3_600_000);
        assert_eq!(value["windows"][0]["window_start"], "2023-01-02T01:00:00+00:00");
        assert_eq!(value["windows"][1]["computed_at"], "2023-01-04T12:00:00Z");
    }

    #[test]
    fn report_without_windows_points_at_compute() {
        let temp = tempfile::tempdir().unwrap();
        let config = seeded_config(&temp, Tz::UTC);
        let args = ReportArgs {
            participant: "p9".to_string(),
            json: false,
        };

        let mut output = Vec::new();
        run(&mut output, &args, &config).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_snapshot!(output, @"No daily windows stored for p9. Run `aw compute` first.");
    }

    #[test]
    fn report_rejects_unsafe_participant_id() {
        let temp = tempfile::tempdir().unwrap();
        let config = seeded_config(&temp, Tz::UTC);
        let args = ReportArgs {
            participant: "../p1".to_string(),
            json: false,
        };
        assert!(run(&mut Vec::new(), &args, &config).is_err());
    }
}
