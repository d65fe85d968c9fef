//! Decoding of packed activity-recognition payloads.
//!
//! Raw sensor rows carry a single string alternating labels and values:
//!
//! ```text
//! stationary, 1, walking, 0, running, 0, automotive, 0, cycling, 0, unknown, 0, confidence, High
//! ```
//!
//! Only the value positions are read; labels are ignored. Flags must be
//! exactly `0` or `1`; any other value is rejected.

use std::str::FromStr;

use thiserror::Error;

const SEPARATOR: &str = ", ";
const FIELD_COUNT: usize = 14;
const CONFIDENCE_INDEX: usize = 13;

/// Errors from decoding a packed payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// The payload had fewer fields than the format requires.
    #[error("payload has {found} fields, expected at least 14")]
    TooFewFields { found: usize },

    /// A flag position did not hold `0` or `1`.
    #[error("payload field {index} is not a 0/1 flag: {value:?}")]
    InvalidFlag { index: usize, value: String },
}

/// Activity classification decoded from one payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActivityReading {
    pub stationary: bool,
    pub walking: bool,
    pub running: bool,
    pub in_vehicle: bool,
    pub cycling: bool,
    pub unknown: bool,
    /// Whether the classifier reported `High` confidence.
    pub high_confidence: bool,
}

impl ActivityReading {
    /// Known classification reported with high confidence.
    pub const fn is_usable(&self) -> bool {
        !self.unknown && self.high_confidence
    }

    /// Anything except sitting still outside a vehicle counts as active.
    pub const fn is_active(&self) -> bool {
        !(self.stationary && !self.in_vehicle)
    }
}

impl FromStr for ActivityReading {
    type Err = PayloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.trim().split(SEPARATOR).collect();
        if fields.len() < FIELD_COUNT {
            return Err(PayloadError::TooFewFields {
                found: fields.len(),
            });
        }

        let flag = |index: usize| -> Result<bool, PayloadError> {
            let value = fields[index].trim();
            match value {
                "0" => Ok(false),
                "1" => Ok(true),
                _ => Err(PayloadError::InvalidFlag {
                    index,
                    value: value.to_string(),
                }),
            }
        };

        Ok(Self {
            stationary: flag(1)?,
            walking: flag(3)?,
            running: flag(5)?,
            in_vehicle: flag(7)?,
            cycling: flag(9)?,
            unknown: flag(11)?,
            high_confidence: fields[CONFIDENCE_INDEX].trim() == "High",
        })
    }
}
