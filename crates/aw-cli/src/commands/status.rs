//! Status command for showing stored data per participant.

use std::io::Write;

use anyhow::{Context, Result};

use crate::Config;
use crate::commands::util::open_database;

pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let db = open_database(config)?;
    let summaries = db
        .participant_summaries()
        .context("failed to summarize participants")?;

    writeln!(writer, "Activity windows status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;

    if summaries.is_empty() {
        writeln!(writer, "No observations recorded.")?;
        return Ok(());
    }

    writeln!(writer, "Participants:")?;
    for summary in summaries {
        writeln!(
            writer,
            "- {}: {} observation(s), {} active, {} to {}, {} window(s)",
            summary.participant_id,
            summary.observations,
            summary.active_observations,
            summary.first_observed,
            summary.last_observed,
            summary.windows
        )?;
    }

    Ok(())
}
