//! Command implementations.

pub mod compute;
pub mod import;
pub mod report;
pub mod status;
pub mod util;
