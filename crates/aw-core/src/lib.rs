//! Core domain logic for daily activity accounting.
//!
//! This crate contains the fundamental types and logic for:
//! - Merging active observations into intervals under a gap threshold
//! - Generating recurring, possibly overnight, daily windows
//! - Measuring active and inactive time inside each window
//! - Decoding packed activity-recognition payloads

mod interval;
mod merge;
pub mod payload;
mod pipeline;
mod types;
mod window;

pub use interval::{Interval, IntervalError, total_overlap};
pub use merge::{check_disjoint, check_gap_invariant, derive_inactive, merge_active};
pub use payload::{ActivityReading, PayloadError};
pub use pipeline::{
    BatchSummary, DailyRow, ParticipantOutcome, ParticipantReport, PipelineConfig, ResultSink,
    analyze, compute_participant, observed_span,
};
pub use types::{Observation, ParticipantId, ValidationError};
pub use window::RecurringWindow;
