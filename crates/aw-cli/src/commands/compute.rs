//! Compute command: merges observations into intervals and totals each daily window.
//!
//! Participants are computed in parallel; results are then written one
//! participant at a time to the database and, when configured, to a CSV
//! directory. A participant whose computation or write fails is reported and
//! the batch continues.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use aw_core::{
    BatchSummary, ParticipantId, ParticipantOutcome, ParticipantReport, ResultSink, analyze,
};
use aw_db::Database;
use chrono::NaiveTime;
use chrono_tz::Tz;
use clap::Args;

use crate::commands::util::{open_database, parse_time_of_day, parse_timezone};
use crate::{Config, CsvDirectory};

#[derive(Debug, Default, Args)]
pub struct ComputeArgs {
    /// Only compute these participants (repeatable). Defaults to all.
    #[arg(long = "participant", value_name = "ID")]
    pub participants: Vec<String>,

    /// Also write `<ID>.csv` files into this directory.
    #[arg(long, value_name = "DIR")]
    pub csv_dir: Option<PathBuf>,

    /// Largest spacing in minutes between observations of one active interval.
    #[arg(long, value_name = "MINUTES")]
    pub gap_minutes: Option<i64>,

    /// Daily window start (HH:MM).
    #[arg(long, value_parser = parse_time_of_day)]
    pub window_start: Option<NaiveTime>,

    /// Daily window end (HH:MM). Earlier than the start means overnight.
    #[arg(long, value_parser = parse_time_of_day)]
    pub window_end: Option<NaiveTime>,

    /// IANA time zone that decides calendar days (e.g., America/Halifax).
    #[arg(long, value_parser = parse_timezone)]
    pub timezone: Option<Tz>,
}

impl ComputeArgs {
    /// Applies command-line overrides on top of the loaded configuration.
    fn resolve(&self, config: &Config) -> Config {
        let mut resolved = config.clone();
        if let Some(minutes) = self.gap_minutes {
            resolved.gap_threshold_minutes = minutes;
        }
        if let Some(start) = self.window_start {
            resolved.window_start = start;
        }
        if let Some(end) = self.window_end {
            resolved.window_end = end;
        }
        if let Some(timezone) = self.timezone {
            resolved.timezone = timezone;
        }
        if let Some(dir) = &self.csv_dir {
            resolved.results_dir = Some(dir.clone());
        }
        resolved
    }
}

pub fn run<W: Write>(writer: &mut W, args: &ComputeArgs, config: &Config) -> Result<BatchSummary> {
    let config = args.resolve(config);
    let pipeline = config
        .pipeline_config()
        .context("invalid compute settings")?;
    let participants = args
        .participants
        .iter()
        .map(|id| ParticipantId::new(id.as_str()))
        .collect::<Result<Vec<_>, _>>()
        .context("invalid --participant")?;

    let mut db = open_database(&config)?;
    let observations = db
        .list_observations(&participants)
        .context("failed to load observations")?;
    tracing::info!(
        observations = observations.len(),
        gap_minutes = config.gap_threshold_minutes,
        timezone = %config.timezone,
        "starting computation"
    );

    let mut csv = config
        .results_dir
        .clone()
        .map(|dir| CsvDirectory::create(dir, config.timezone))
        .transpose()?;

    let outcomes = analyze(observations, &pipeline);
    let mut summary = BatchSummary::default();
    for outcome in &outcomes {
        match outcome {
            ParticipantOutcome::Computed(report) => {
                match store_report(&mut db, csv.as_mut(), report) {
                    Ok(()) => {
                        summary.computed += 1;
                        writeln!(
                            writer,
                            "{}: {} window(s)",
                            report.participant_id,
                            report.rows.len()
                        )?;
                    }
                    Err(e) => {
                        tracing::warn!(
                            participant_id = %report.participant_id,
                            error = %format!("{e:#}"),
                            "failed to store results"
                        );
                        summary.failed += 1;
                        writeln!(writer, "{}: failed: {e:#}", report.participant_id)?;
                    }
                }
            }
            ParticipantOutcome::Skipped { participant_id } => {
                summary.skipped += 1;
                writeln!(writer, "{participant_id}: skipped (no active observations)")?;
            }
            ParticipantOutcome::Failed {
                participant_id,
                error,
            } => {
                summary.failed += 1;
                writeln!(writer, "{participant_id}: failed: {error}")?;
            }
        }
    }

    writeln!(
        writer,
        "Computed {}, skipped {}, failed {}.",
        summary.computed, summary.skipped, summary.failed
    )?;
    Ok(summary)
}

fn store_report(
    db: &mut Database,
    csv: Option<&mut CsvDirectory>,
    report: &ParticipantReport,
) -> Result<()> {
    db.write_participant(report)
        .context("failed to store daily windows")?;
    if let Some(csv) = csv {
        csv.write_participant(report)?;
    }
    Ok(())
}
