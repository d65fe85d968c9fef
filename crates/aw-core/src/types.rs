//! Core type definitions with validation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// The participant ID cannot be used as a file name.
    #[error("participant ID {value:?} must not contain path separators or be a relative path")]
    UnsafeParticipantId { value: String },

    /// The gap threshold was negative.
    #[error("gap threshold must not be negative, got {minutes} minutes")]
    NegativeGapThreshold { minutes: i64 },

    /// The gap threshold does not fit in a duration.
    #[error("gap threshold of {minutes} minutes is out of range")]
    GapThresholdOutOfRange { minutes: i64 },
}

/// A validated participant identifier.
///
/// Participant IDs must be non-empty and usable as a file name, since the
/// CSV sink writes one file per participant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Creates a new ID after validation.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::Empty {
                field: "participant ID",
            });
        }
        if id == "." || id == ".." || id.contains(['/', '\\']) {
            return Err(ValidationError::UnsafeParticipantId { value: id });
        }
        Ok(Self(id))
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ParticipantId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ParticipantId> for String {
    fn from(id: ParticipantId) -> Self {
        id.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ParticipantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One classified activity record for a participant.
///
/// Records are expected to be filtered to confident, known classifications
/// before they reach the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub participant_id: ParticipantId,
    pub measured_at: DateTime<Utc>,
    pub is_active: bool,
}

impl Observation {
    pub const fn new(
        participant_id: ParticipantId,
        measured_at: DateTime<Utc>,
        is_active: bool,
    ) -> Self {
        Self {
            participant_id,
            measured_at,
            is_active,
        }
    }
}
