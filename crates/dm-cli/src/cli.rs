//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Daily presence map.
///
/// Reads a log of session begin/end markers and shows, for every day, which
/// parts of the day were active.
#[derive(Debug, Parser)]
#[command(name = "dm", version, about, long_about = None)]
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
    /// Show one presence row per day.
    Report(ReportArgs),

    /// Print reconstructed session ranges as JSONL.
    Ranges(RangesArgs),
}

/// Which slice of the log to read.
#[derive(Debug, Default, Args)]
pub struct WindowArgs {
    /// Event log to read (`-` for stdin). Overrides the configured path.
    #[arg(short, long)]
    pub log: Option<PathBuf>,

    /// Report the current week (default).
    #[arg(long, conflicts_with_all = ["last_week", "weeks", "from"])]
    pub week: bool,

    /// Report the previous week.
    #[arg(long, conflicts_with_all = ["weeks", "from"])]
    pub last_week: bool,

    /// Report the current week and the N-1 weeks before it.
    #[arg(long, value_name = "N", conflicts_with = "from")]
    pub weeks: Option<u32>,

    /// Start of the window: ISO 8601 date or datetime, or relative (e.g., '2 weeks ago').
    #[arg(long)]
    pub from: Option<String>,

    /// End of the window (exclusive). Defaults to the end of today.
    #[arg(long, requires = "from")]
    pub to: Option<String>,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[command(flatten)]
    pub window: WindowArgs,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,

    /// Disable weekend highlighting.
    #[arg(long)]
    pub no_color: bool,

    /// Do not group rows by week.
    #[arg(long)]
    pub no_weeks: bool,
}

#[derive(Debug, Args)]
pub struct RangesArgs {
    #[command(flatten)]
    pub window: WindowArgs,
}
