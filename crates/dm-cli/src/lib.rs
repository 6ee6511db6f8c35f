//! Daily presence map CLI library.
//!
//! This crate provides the event log reader and the report front end for
//! the daymap pipeline.

mod cli;
pub mod commands;
mod config;
pub mod source;

pub use cli::{Cli, Commands, RangesArgs, ReportArgs, WindowArgs};
pub use config::{Config, Settings};
