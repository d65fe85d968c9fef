//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::compute::ComputeArgs;
use crate::commands::import::ImportArgs;
use crate::commands::report::ReportArgs;

/// Nightly activity windows from classified observations.
///
/// Imports per-participant activity observations, merges them into active
/// and inactive intervals, and totals both inside a recurring daily window.
#[derive(Debug, Parser)]
#[command(name = "aw", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Import observations as JSON Lines from stdin.
    Import(ImportArgs),

    /// Compute daily window totals for every participant.
    Compute(ComputeArgs),

    /// Show stored daily windows for one participant.
    Report(ReportArgs),

    /// Show stored observations and windows per participant.
    Status,
}
