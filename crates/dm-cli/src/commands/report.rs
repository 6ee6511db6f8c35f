//! Report command: one presence row per day.
//!
//! This module implements `dm report` with various window options
//! (--week, --last-week, --weeks, --from/--to) and output formats
//! (human-readable, JSON).

use std::fmt::Write as _;
use std::io::Write;

use anyhow::Result;
use chrono::{Datelike, NaiveDate, TimeDelta, Weekday};
use colored::Colorize;
use dm_core::{BucketConfig, DayAggregate, Presence, presence_by_day};
use serde::Serialize;

use crate::cli::ReportArgs;
use crate::commands::util::{format_duration, now_at, resolve_window};
use crate::source::{EventLog, Window};
use crate::{Config, Settings};

/// Width of the `Mon 2025-01-27  ` row prefix.
const PREFIX_WIDTH: usize = 16;

/// Formatting options for a single render call.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext {
    /// Highlight Saturday and Sunday rows.
    pub color: bool,
    /// Insert ISO week headers and weekly totals.
    pub group_by_week: bool,
    pub buckets: BucketConfig,
}

impl RenderContext {
    pub const fn from_settings(settings: &Settings, args: &ReportArgs) -> Self {
        Self {
            color: settings.color && !args.no_color,
            group_by_week: settings.group_by_week && !args.no_weeks,
            buckets: settings.buckets,
        }
    }

    fn label_width(&self) -> usize {
        PREFIX_WIDTH + self.buckets.len() + 2
    }
}

/// One report row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayRow {
    pub date: NaiveDate,
    pub presence: Presence,
    pub duration: TimeDelta,
}

/// Computed report data.
#[derive(Debug)]
pub struct ReportData {
    pub window: Window,
    pub rows: Vec<DayRow>,
}

impl ReportData {
    pub fn total(&self) -> TimeDelta {
        self.rows.iter().map(|row| row.duration).sum()
    }
}

/// Builds one row per date in the window, filling idle dates with empty rows.
pub fn generate_report_data(aggregate: &DayAggregate, window: Window) -> ReportData {
    let config = aggregate.config();
    let rows = window
        .dates()
        .map(|date| {
            let presence = aggregate.get_or_empty(date);
            let duration = config.duration_of(&presence);
            DayRow {
                date,
                presence,
                duration,
            }
        })
        .collect();
    ReportData { window, rows }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Formats a bucket span, e.g. "30m" or "15s".
fn format_span(span: TimeDelta) -> String {
    if span.num_seconds() % 60 == 0 {
        format!("{}m", span.num_minutes())
    } else {
        format!("{}s", span.num_seconds())
    }
}

/// Hour labels aligned with the bucket columns, every six hours.
fn ruler(buckets: &BucketConfig) -> Option<String> {
    let len = buckets.len();
    if len < 24 {
        return None;
    }
    let mut line = " ".repeat(PREFIX_WIDTH);
    for hour in (0..24).step_by(6) {
        let column = PREFIX_WIDTH + hour * len / 24;
        if column < line.len() {
            continue;
        }
        line.push_str(&" ".repeat(column - line.len()));
        line.push_str(&hour.to_string());
    }
    Some(line)
}

fn format_row(row: &DayRow, ctx: &RenderContext) -> String {
    let line = format!(
        "{} {}  {}  {:>7}",
        row.date.format("%a"),
        row.date.format("%Y-%m-%d"),
        row.presence.render(),
        format_duration(row.duration)
    );
    if ctx.color && is_weekend(row.date) {
        line.yellow().to_string()
    } else {
        line
    }
}

fn format_total(label: &str, total: TimeDelta, ctx: &RenderContext) -> String {
    let width = ctx.label_width();
    format!("{label:<width$}{:>7}", format_duration(total))
}

/// Formats the human-readable report output.
pub fn format_report(data: &ReportData, ctx: &RenderContext) -> String {
    let mut output = String::new();

    let first = data.rows.first().map(|row| row.date);
    let last = data.rows.last().map(|row| row.date);
    if let (Some(first), Some(last)) = (first, last) {
        writeln!(
            output,
            "DAYMAP: {first} to {last} ({} buckets)",
            format_span(ctx.buckets.bucket_span())
        )
        .unwrap();
    }

    if let Some(ruler) = ruler(&ctx.buckets) {
        writeln!(output).unwrap();
        writeln!(output, "{ruler}").unwrap();
    }

    let mut current_week = None;
    let mut week_total = TimeDelta::zero();
    for row in &data.rows {
        if ctx.group_by_week {
            let week = row.date.iso_week();
            if current_week != Some(week) {
                if current_week.is_some() {
                    writeln!(output, "{}", format_total("Week total", week_total, ctx)).unwrap();
                    writeln!(output).unwrap();
                }
                writeln!(output, "Week {}, {}", week.week(), week.year()).unwrap();
                current_week = Some(week);
                week_total = TimeDelta::zero();
            }
            week_total += row.duration;
        }
        writeln!(output, "{}", format_row(row, ctx)).unwrap();
    }
    if current_week.is_some() {
        writeln!(output, "{}", format_total("Week total", week_total, ctx)).unwrap();
    }

    writeln!(output).unwrap();
    writeln!(output, "{}", format_total("TOTAL", data.total(), ctx)).unwrap();

    output
}

// ========== JSON Output ==========

/// JSON report structure.
#[derive(Debug, Serialize)]
pub struct JsonReport {
    pub from: String,
    pub to: String,
    pub buckets_per_day: u32,
    pub bucket_seconds: i64,
    pub days: Vec<JsonDay>,
    pub total_minutes: i64,
}

#[derive(Debug, Serialize)]
pub struct JsonDay {
    pub date: NaiveDate,
    pub weekday: String,
    pub presence: Presence,
    pub worked_buckets: usize,
    pub minutes: i64,
}

/// Formats report data as JSON.
pub fn format_report_json(data: &ReportData, ctx: &RenderContext) -> Result<String> {
    let report = JsonReport {
        from: data.window.from.format("%Y-%m-%dT%H:%M:%S").to_string(),
        to: data.window.to.format("%Y-%m-%dT%H:%M:%S").to_string(),
        buckets_per_day: ctx.buckets.buckets_per_day(),
        bucket_seconds: ctx.buckets.bucket_span().num_seconds(),
        days: data
            .rows
            .iter()
            .map(|row| JsonDay {
                date: row.date,
                weekday: row.date.format("%a").to_string(),
                presence: row.presence.clone(),
                worked_buckets: row.presence.worked_buckets(),
                minutes: row.duration.num_minutes(),
            })
            .collect(),
        total_minutes: data.total().num_minutes(),
    };

    Ok(serde_json::to_string_pretty(&report)?)
}

// ========== Public Interface ==========

/// Runs the report command.
pub fn run<W: Write>(
    writer: &mut W,
    args: &ReportArgs,
    config: &Config,
    settings: &Settings,
) -> Result<()> {
    let window = resolve_window(&args.window, now_at(settings.offset), settings.offset)?;
    let log_path = args.window.log.as_deref().unwrap_or(config.log_path.as_path());
    tracing::debug!(?window, log = %log_path.display(), "generating report");

    let events = EventLog::open(log_path)?.events(window, settings.offset);
    let aggregate: DayAggregate = presence_by_day(events, settings.buckets, settings.pairing)?;

    let data = generate_report_data(&aggregate, window);
    let ctx = RenderContext::from_settings(settings, args);

    if args.json {
        writeln!(writer, "{}", format_report_json(&data, &ctx)?)?;
    } else {
        write!(writer, "{}", format_report(&data, &ctx))?;
    }

    Ok(())
}
