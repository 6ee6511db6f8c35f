//! Shared utilities for CLI commands.

use std::sync::LazyLock;

use anyhow::Context;
use chrono::{
    DateTime, Datelike, Days, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime,
};
use regex::Regex;

use crate::cli::WindowArgs;
use crate::source::Window;

/// Pre-compiled regex for relative time parsing.
static RELATIVE_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\s+(minute|hour|day|week)s?\s+ago$").expect("relative time regex is valid")
});

/// Conservative bounds for relative time parsing (~1000 years in minutes).
const MAX_RELATIVE_MINUTES: i64 = 1000 * 365 * 24 * 60;

/// Parse a datetime string as ISO 8601, a bare date, or relative time.
///
/// Supports:
/// - ISO 8601 with offset: "2026-01-15T10:30:00Z" (shifted to `offset`)
/// - ISO 8601 without offset: "2026-01-15T10:30:00" (taken as wall-clock)
/// - Date: "2026-01-15" (midnight)
/// - Relative: "2 hours ago", "30 minutes ago", "1 day ago", "1 week ago"
pub fn parse_datetime(
    s: &str,
    now: NaiveDateTime,
    offset: FixedOffset,
) -> anyhow::Result<NaiveDateTime> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&offset).naive_local());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M") {
        return Ok(dt);
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN));
    }

    // Try relative time: "N hours/minutes/days/weeks ago"
    let Some(caps) = RELATIVE_TIME_RE.captures(s) else {
        anyhow::bail!(
            "Invalid datetime: {s}. Use ISO 8601 (e.g., 2026-01-15 or 2026-01-15T10:30:00Z) or relative (e.g., '2 weeks ago')"
        );
    };

    let n: i64 = caps[1]
        .parse()
        .context("failed to parse number in relative time")?;

    let (max_for_unit, minutes_per_unit) = match &caps[2] {
        "minute" => (MAX_RELATIVE_MINUTES, 1),
        "hour" => (MAX_RELATIVE_MINUTES / 60, 60),
        "day" => (MAX_RELATIVE_MINUTES / (60 * 24), 60 * 24),
        "week" => (MAX_RELATIVE_MINUTES / (60 * 24 * 7), 60 * 24 * 7),
        unit => anyhow::bail!("Unknown time unit: {unit}"),
    };

    if n > max_for_unit {
        anyhow::bail!("Relative time value too large: {n} {}", &caps[2]);
    }

    // Safe to create Duration now that we've validated the range
    let duration = Duration::minutes(n * minutes_per_unit);
    Ok(now - duration)
}

/// Report period selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Week,
    LastWeek,
    /// The current week and the `n - 1` weeks before it.
    Weeks(u32),
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Monday of the week containing `date`.
fn week_start(date: NaiveDate) -> NaiveDate {
    let days_since_monday = date.weekday().num_days_from_monday();
    date - Duration::days(i64::from(days_since_monday))
}

/// Calculates period boundaries (Mon 00:00 to Mon 00:00) as a half-open window.
pub fn period_window(period: Period, today: NaiveDate) -> anyhow::Result<Window> {
    let monday = week_start(today);
    let (start, end) = match period {
        Period::Week => (monday, monday + Duration::days(7)),
        Period::LastWeek => (monday - Duration::days(7), monday),
        Period::Weeks(n) => {
            if n == 0 {
                anyhow::bail!("--weeks must be at least 1");
            }
            let start = monday
                .checked_sub_days(Days::new(u64::from(n - 1) * 7))
                .with_context(|| format!("--weeks {n} reaches before the earliest date"))?;
            (start, monday + Duration::days(7))
        }
    };
    Window::new(midnight(start), midnight(end))
}

/// Resolves the window flags against the current wall-clock time.
pub fn resolve_window(
    args: &WindowArgs,
    now: NaiveDateTime,
    offset: FixedOffset,
) -> anyhow::Result<Window> {
    if let Some(from) = &args.from {
        let from = parse_datetime(from, now, offset).context("invalid --from")?;
        let to = match &args.to {
            Some(to) => parse_datetime(to, now, offset).context("invalid --to")?,
            None => midnight(now.date() + Duration::days(1)),
        };
        return Window::new(from, to);
    }

    let period = if args.last_week {
        Period::LastWeek
    } else if let Some(n) = args.weeks {
        Period::Weeks(n)
    } else {
        Period::Week
    };
    period_window(period, now.date())
}

/// Current wall-clock time at `offset`.
pub fn now_at(offset: FixedOffset) -> NaiveDateTime {
    chrono::Utc::now().with_timezone(&offset).naive_local()
}

/// Formats a duration as "Xh Ym" if >= 1 hour, "Xm" if < 1 hour.
/// Negative durations are treated as 0m.
pub fn format_duration(duration: Duration) -> String {
    let ms = duration.num_milliseconds();
    if ms < 0 {
        return "0m".to_string();
    }
    let total_minutes = ms / 60_000;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}
