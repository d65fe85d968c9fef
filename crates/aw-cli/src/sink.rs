//! CSV output, one file per participant.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use aw_core::{DailyRow, ParticipantId, ParticipantReport, ResultSink};
use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;

const HEADER: &str = "window_start,window_end,active_ms,inactive_ms";

/// Writes `<dir>/<participant>.csv` for every report it receives.
#[derive(Debug)]
pub struct CsvDirectory {
    dir: PathBuf,
    timezone: Tz,
}

impl CsvDirectory {
    /// Creates the output directory if needed.
    pub fn create(dir: PathBuf, timezone: Tz) -> Result<Self> {
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create results directory {}", dir.display()))?;
        Ok(Self { dir, timezone })
    }

    pub fn path_for(&self, participant_id: &ParticipantId) -> PathBuf {
        self.dir.join(format!("{participant_id}.csv"))
    }
}

impl ResultSink for CsvDirectory {
    type Error = anyhow::Error;

    fn write_participant(&mut self, report: &ParticipantReport) -> Result<()> {
        let path = self.path_for(&report.participant_id);
        let file =
            File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        write_rows(&mut writer, &report.rows, self.timezone)
            .and_then(|()| writer.flush())
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::debug!(path = %path.display(), rows = report.rows.len(), "wrote csv");
        Ok(())
    }
}

/// Writes the header and one line per row, with window bounds in `timezone`.
pub fn write_rows<W: Write>(writer: &mut W, rows: &[DailyRow], timezone: Tz) -> io::Result<()> {
    writeln!(writer, "{HEADER}")?;
    for row in rows {
        writeln!(
            writer,
            "{},{},{},{}",
            format_local(row.window.start(), timezone),
            format_local(row.window.end(), timezone),
            row.active.num_milliseconds(),
            row.inactive.num_milliseconds()
        )?;
    }
    Ok(())
}

fn format_local(timestamp: DateTime<Utc>, timezone: Tz) -> String {
    timestamp
        .with_timezone(&timezone)
        .to_rfc3339_opts(SecondsFormat::AutoSi, false)
}
