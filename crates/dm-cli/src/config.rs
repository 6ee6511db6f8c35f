//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{FixedOffset, Offset, Utc};
use dm_core::{BucketConfig, DEFAULT_BUCKETS_PER_DAY, PairingPolicy};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the JSONL event log.
    pub log_path: PathBuf,
    /// Number of time-of-day slots per row.
    pub buckets_per_day: u32,
    /// Fixed offset applied to every event timestamp, e.g. `+02:00`.
    pub utc_offset: String,
    /// How to treat repeated begin or end markers.
    pub pairing: PairingPolicy,
    /// Highlight weekend rows.
    pub color: bool,
    /// Group report rows by ISO week.
    pub group_by_week: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("log_path", &self.log_path)
            .field("buckets_per_day", &self.buckets_per_day)
            .field("utc_offset", &self.utc_offset)
            .field("pairing", &self.pairing)
            .finish_non_exhaustive()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            log_path: data_dir.join("events.jsonl"),
            buckets_per_day: DEFAULT_BUCKETS_PER_DAY,
            utc_offset: "+00:00".to_string(),
            pairing: PairingPolicy::default(),
            color: true,
            group_by_week: true,
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

        // Load from environment variables (DM_*)
        figment = figment.merge(Env::prefixed("DM_"));

        figment.extract()
    }

    /// Validates the raw values into pipeline settings.
    ///
    /// Runs before any event is read so a bad bucket count never reaches the
    /// pipeline.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let buckets = BucketConfig::new(self.buckets_per_day)
            .context("invalid buckets_per_day in configuration")?;
        let offset = parse_offset(&self.utc_offset)?;
        Ok(Settings {
            buckets,
            offset,
            pairing: self.pairing,
            color: self.color,
            group_by_week: self.group_by_week,
        })
    }
}

/// Validated configuration handed to commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub buckets: BucketConfig,
    pub offset: FixedOffset,
    pub pairing: PairingPolicy,
    pub color: bool,
    pub group_by_week: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            buckets: BucketConfig::default(),
            offset: Utc.fix(),
            pairing: PairingPolicy::default(),
            color: true,
            group_by_week: true,
        }
    }
}

/// Parses an offset such as `+02:00`, `-0530` or `Z`.
pub fn parse_offset(s: &str) -> anyhow::Result<FixedOffset> {
    let trimmed = s.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }
    trimmed
        .parse::<FixedOffset>()
        .with_context(|| format!("invalid utc_offset {s:?}, expected e.g. +02:00"))
}

/// Returns the platform-specific config directory for daymap.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("daymap"))
}

/// Returns the platform-specific data directory for daymap.
///
/// On Linux: `~/.local/share/daymap`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("daymap"))
}
