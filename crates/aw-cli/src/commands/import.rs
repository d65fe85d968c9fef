//! Import command for loading classified observations into the local `SQLite` store.
//!
//! Reads JSON Lines from stdin. Each record names a participant, a timestamp,
//! and either a decoded `is_active` flag or the raw packed `payload`, which
//! is decoded and filtered to known, high-confidence readings.

use std::io::{BufRead, Write};

use anyhow::{Context, Result, anyhow};
use aw_core::{ActivityReading, Observation, ParticipantId};
use clap::Args;
use serde::Deserialize;

use crate::Config;
use crate::commands::util::{open_database, parse_timestamp};

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Skip lines that fail to parse instead of aborting the import.
    #[arg(long)]
    pub skip_invalid: bool,
}

/// Counts reported after an import.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub duplicates: usize,
    /// Raw payloads dropped for unknown activity or low confidence.
    pub filtered: usize,
    /// Lines skipped with `--skip-invalid`.
    pub invalid: usize,
}

pub fn run<R: BufRead, W: Write>(
    reader: R,
    writer: &mut W,
    args: &ImportArgs,
    config: &Config,
) -> Result<ImportSummary> {
    let parsed = parse_observations(reader, args.skip_invalid)?;

    let mut db = open_database(config)?;
    let inserted = db
        .insert_observations(&parsed.observations)
        .context("failed to store observations")?;

    let summary = ImportSummary {
        inserted,
        duplicates: parsed.observations.len() - inserted,
        filtered: parsed.filtered,
        invalid: parsed.invalid,
    };
    tracing::info!(
        inserted = summary.inserted,
        duplicates = summary.duplicates,
        filtered = summary.filtered,
        invalid = summary.invalid,
        "imported observations"
    );

    writeln!(
        writer,
        "Imported {} observation(s): {} duplicate, {} filtered, {} invalid.",
        summary.inserted, summary.duplicates, summary.filtered, summary.invalid
    )?;
    Ok(summary)
}

#[derive(Debug, Default)]
struct ParsedObservations {
    observations: Vec<Observation>,
    filtered: usize,
    invalid: usize,
}

fn parse_observations<R: BufRead>(reader: R, skip_invalid: bool) -> Result<ParsedObservations> {
    let mut parsed = ParsedObservations::default();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", idx + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let record = serde_json::from_str::<ImportRecord>(trimmed)
            .with_context(|| format!("invalid JSON on line {}", idx + 1))
            .and_then(|record| {
                record
                    .into_observation()
                    .with_context(|| format!("invalid observation on line {}", idx + 1))
            });
        match record {
            Ok(Some(observation)) => parsed.observations.push(observation),
            Ok(None) => parsed.filtered += 1,
            Err(e) if skip_invalid => {
                tracing::warn!(error = %format!("{e:#}"), "skipping invalid line");
                parsed.invalid += 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(parsed)
}

#[derive(Debug, Deserialize)]
struct ImportRecord {
    #[serde(alias = "participantid")]
    participant_id: String,
    #[serde(alias = "measuredat")]
    measured_at: String,
    #[serde(default)]
    is_active: Option<bool>,
    #[serde(default, alias = "value0")]
    payload: Option<String>,
}

impl ImportRecord {
    /// Returns `None` when a raw payload is filtered out.
    fn into_observation(self) -> Result<Option<Observation>> {
        let participant_id = ParticipantId::new(self.participant_id)?;
        let measured_at = parse_timestamp(self.measured_at.trim())?;

        let is_active = match (self.is_active, self.payload) {
            (Some(is_active), _) => is_active,
            (None, Some(payload)) => {
                let reading: ActivityReading = payload.parse()?;
                if !reading.is_usable() {
                    return Ok(None);
                }
                reading.is_active()
            }
            (None, None) => return Err(anyhow!("missing is_active or payload")),
        };

        Ok(Some(Observation::new(participant_id, measured_at, is_active)))
    }
}
