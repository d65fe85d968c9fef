//! Shared utilities for CLI commands.

use anyhow::{Context, Result};
use aw_db::Database;
use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::Config;

/// Open the configured database, ensuring the parent directory exists.
pub fn open_database(config: &Config) -> Result<Database> {
    let parent = config
        .database_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty());
    if let Some(parent) = parent {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))
}

/// Parse a wall-clock time given as `HH:MM` or `HH:MM:SS`.
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|_| format!("invalid time of day: {s}. Use HH:MM or HH:MM:SS (e.g., 21:00)"))
}

/// Parse an IANA time zone name such as `America/Halifax`.
pub fn parse_timezone(s: &str) -> Result<Tz, String> {
    s.parse::<Tz>()
        .map_err(|e| format!("invalid time zone: {s} ({e})"))
}

/// Parse an observation timestamp.
///
/// Supports:
/// - RFC 3339: "2023-01-01T21:00:00-04:00"
/// - SQL-style with offset: "2023-01-01 21:00:00.123-04:00"
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z"))
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| {
            format!("invalid timestamp: {s}. Use RFC 3339 with an offset (e.g., 2023-01-01T21:00:00Z)")
        })
}

/// Formats milliseconds as duration string.
/// Returns "Xh Ym" if >= 1 hour, "Xm" if < 1 hour.
/// Negative durations are treated as 0m.
pub fn format_duration(ms: i64) -> String {
    if ms < 0 {
        return "0m".to_string();
    }
    let total_minutes = ms / 60_000;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}
