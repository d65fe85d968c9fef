//! Activity windows CLI library.
//!
//! This crate provides the command-line surface over `aw-core` and `aw-db`.

mod cli;
pub mod commands;
mod config;
mod sink;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use sink::CsvDirectory;
