//! CLI subcommand implementations.

pub mod ranges;
pub mod report;
pub mod util;
