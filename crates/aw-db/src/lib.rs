//! Storage layer for activity windows.
//!
//! Provides persistence for classified observations and computed daily
//! windows using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! Computation happens on in-memory data, so a single connection on the
//! calling thread is enough: observations are loaded once, and results are
//! written back after the parallel pass finishes.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 UTC format with microseconds
//! (e.g., `2023-01-01T21:00:00.000000Z`). The fixed width keeps lexicographic
//! ordering identical to chronological ordering.
//!
//! ## Result Rows
//!
//! `daily_windows` holds one row per participant and window. Rows for a
//! participant are replaced wholesale on every computation, so the table
//! always reflects the latest run for that participant.

use std::path::Path;

use aw_core::{Observation, ParticipantId, ParticipantReport, ResultSink, ValidationError};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, params};
use thiserror::Error;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored timestamp could not be parsed.
    #[error("invalid timestamp for participant {participant_id}: {timestamp}")]
    TimestampParse {
        participant_id: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored participant ID failed validation.
    #[error("invalid participant ID: {0}")]
    InvalidParticipant(#[from] ValidationError),
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// One stored daily window for a participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyWindowRecord {
    pub participant_id: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub active_ms: i64,
    pub inactive_ms: i64,
    pub computed_at: DateTime<Utc>,
}

/// Per-participant overview of stored data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantSummary {
    pub participant_id: String,
    pub observations: i64,
    pub active_observations: i64,
    pub first_observed: String,
    pub last_observed: String,
    pub windows: i64,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- Classified activity records, one per participant and instant
            -- is_active: 1 when the participant was moving, 0 otherwise
            CREATE TABLE IF NOT EXISTS observations (
                participant_id TEXT NOT NULL,
                measured_at TEXT NOT NULL,
                is_active INTEGER NOT NULL,
                PRIMARY KEY (participant_id, measured_at)
            );

            CREATE INDEX IF NOT EXISTS idx_observations_measured ON observations(measured_at);

            CREATE TABLE IF NOT EXISTS daily_windows (
                participant_id TEXT NOT NULL,
                window_start TEXT NOT NULL,
                window_end TEXT NOT NULL,
                active_ms INTEGER NOT NULL,
                inactive_ms INTEGER NOT NULL,
                computed_at TEXT NOT NULL,
                PRIMARY KEY (participant_id, window_start)
            );
            ",
        )?;
        Ok(())
    }

    /// Inserts a batch of observations, ignoring duplicates.
    ///
    /// Returns the number of rows actually inserted.
    pub fn insert_observations(&mut self, observations: &[Observation]) -> Result<usize, DbError> {
        if observations.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "
                INSERT OR IGNORE INTO observations (participant_id, measured_at, is_active)
                VALUES (?, ?, ?)
                ",
            )?;
            for observation in observations {
                inserted += stmt.execute(params![
                    observation.participant_id.as_str(),
                    format_timestamp(observation.measured_at),
                    observation.is_active,
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Lists observations ordered by participant then time.
    ///
    /// When `participants` is non-empty only those participants are returned.
    pub fn list_observations(
        &self,
        participants: &[ParticipantId],
    ) -> Result<Vec<Observation>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT participant_id, measured_at, is_active
            FROM observations
            ORDER BY participant_id ASC, measured_at ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, bool>(2)?,
            ))
        })?;

        let mut observations = Vec::new();
        for row in rows {
            let (participant_id, measured_at, is_active) = row?;
            if !participants.is_empty()
                && !participants.iter().any(|p| p.as_str() == participant_id)
            {
                continue;
            }
            let measured_at = parse_timestamp(&measured_at, &participant_id)?;
            let participant_id = ParticipantId::new(participant_id)?;
            observations.push(Observation::new(participant_id, measured_at, is_active));
        }
        Ok(observations)
    }

    /// Replaces all stored windows for one participant.
    pub fn replace_daily_windows(
        &mut self,
        report: &ParticipantReport,
        computed_at: DateTime<Utc>,
    ) -> Result<usize, DbError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM daily_windows WHERE participant_id = ?",
            [report.participant_id.as_str()],
        )?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "
                INSERT INTO daily_windows
                (participant_id, window_start, window_end, active_ms, inactive_ms, computed_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ",
            )?;
            let computed_at = format_timestamp(computed_at);
            for row in &report.rows {
                inserted += stmt.execute(params![
                    report.participant_id.as_str(),
                    format_timestamp(row.window.start()),
                    format_timestamp(row.window.end()),
                    row.active.num_milliseconds(),
                    row.inactive.num_milliseconds(),
                    computed_at,
                ])?;
            }
        }
        tx.commit()?;
        tracing::debug!(
            participant_id = %report.participant_id,
            windows = inserted,
            "stored daily windows"
        );
        Ok(inserted)
    }

    /// Lists stored windows for a participant in chronological order.
    pub fn list_daily_windows(&self, participant_id: &str) -> Result<Vec<DailyWindowRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT window_start, window_end, active_ms, inactive_ms, computed_at
            FROM daily_windows
            WHERE participant_id = ?
            ORDER BY window_start ASC
            ",
        )?;
        let rows = stmt.query_map([participant_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut windows = Vec::new();
        for row in rows {
            let (start, end, active_ms, inactive_ms, computed_at) = row?;
            windows.push(DailyWindowRecord {
                participant_id: participant_id.to_string(),
                window_start: parse_timestamp(&start, participant_id)?,
                window_end: parse_timestamp(&end, participant_id)?,
                active_ms,
                inactive_ms,
                computed_at: parse_timestamp(&computed_at, participant_id)?,
            });
        }
        Ok(windows)
    }

    /// Summarizes stored observations and windows per participant.
    pub fn participant_summaries(&self) -> Result<Vec<ParticipantSummary>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT o.participant_id,
                   COUNT(*),
                   SUM(o.is_active),
                   MIN(o.measured_at),
                   MAX(o.measured_at),
                   (SELECT COUNT(*) FROM daily_windows w WHERE w.participant_id = o.participant_id)
            FROM observations o
            GROUP BY o.participant_id
            ORDER BY o.participant_id ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ParticipantSummary {
                participant_id: row.get(0)?,
                observations: row.get(1)?,
                active_observations: row.get(2)?,
                first_observed: row.get(3)?,
                last_observed: row.get(4)?,
                windows: row.get(5)?,
            })
        })?;
        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(row?);
        }
        Ok(summaries)
    }
}

impl ResultSink for Database {
    type Error = DbError;

    fn write_participant(&mut self, report: &ParticipantReport) -> Result<(), Self::Error> {
        self.replace_daily_windows(report, Utc::now())?;
        Ok(())
    }
}

fn parse_timestamp(timestamp: &str, participant_id: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            participant_id: participant_id.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}
