//! Configuration loading and management.

use std::path::{Path, PathBuf};

use aw_core::{PipelineConfig, RecurringWindow, ValidationError};
use chrono::{Duration, NaiveTime};
use chrono_tz::Tz;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Default gap between active observations before a new interval starts.
const DEFAULT_GAP_THRESHOLD_MINUTES: i64 = 30;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Directory for per-participant CSV files. CSV output is off when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results_dir: Option<PathBuf>,

    /// Largest spacing, in minutes, between observations of one active interval.
    pub gap_threshold_minutes: i64,

    /// Wall-clock start of the daily window (`HH:MM:SS`).
    pub window_start: NaiveTime,

    /// Wall-clock end of the daily window; earlier than the start means overnight.
    pub window_end: NaiveTime,

    /// IANA zone used to decide calendar days.
    pub timezone: Tz,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("aw.db"),
            results_dir: None,
            gap_threshold_minutes: DEFAULT_GAP_THRESHOLD_MINUTES,
            window_start: NaiveTime::from_hms_opt(21, 0, 0).unwrap_or(NaiveTime::MIN),
            window_end: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            timezone: system_timezone(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (AW_*)
        figment = figment.merge(Env::prefixed("AW_"));

        figment.extract()
    }

    /// Builds the pipeline parameters described by this configuration.
    pub fn pipeline_config(&self) -> Result<PipelineConfig, ValidationError> {
        let minutes = self.gap_threshold_minutes;
        let gap_threshold = Duration::try_minutes(minutes)
            .ok_or(ValidationError::GapThresholdOutOfRange { minutes })?;
        PipelineConfig::new(
            gap_threshold,
            RecurringWindow::new(self.window_start, self.window_end),
            self.timezone,
        )
    }
}

/// Returns the system time zone, falling back to UTC.
fn system_timezone() -> Tz {
    iana_time_zone::get_timezone()
        .ok()
        .and_then(|name| name.parse::<Tz>().ok())
        .unwrap_or(Tz::UTC)
}

/// Returns the platform-specific config directory for aw.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("aw"))
}

/// Returns the platform-specific data directory for aw.
///
/// On Linux: `~/.local/share/aw`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("aw"))
}
