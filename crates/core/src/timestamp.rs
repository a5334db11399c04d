//! Timestamp-to-day normalization
//!
//! Snapshot exports and delta files carry timestamps in a few shapes. Everything
//! that lands in the activity log is keyed by a zero-padded `YYYY-MM-DD` day, and
//! anything that cannot be parsed is attributed to the current day rather than
//! rejected.

use crate::clock::{Clock, DAY_FORMAT};

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// `T`-separated forms accepted when no UTC offset is present
const ISO_NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Space-separated forms written by the extractor
const SPACED_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"];

static FILENAME_DATE: OnceLock<Option<Regex>> = OnceLock::new();

/// Parse the calendar day out of a timestamp string.
///
/// Accepts RFC 3339 (`2025-07-02T10:30:15+03:00`, `...Z`), naive ISO 8601
/// (`2025-07-02T10:30:15.123`), space-separated (`2025-07-02 10:30:15`) and bare
/// dates (`2025-07-02`). Returns `None` for empty or unrecognized input.
pub fn parse_day(timestamp: &str) -> Option<NaiveDate> {
    let ts = timestamp.trim();
    if ts.is_empty() {
        return None;
    }

    if ts.contains('T') {
        if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
            return Some(dt.date_naive());
        }
        return ISO_NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(ts, fmt).ok())
            .map(|dt| dt.date());
    }

    SPACED_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(ts, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| NaiveDate::parse_from_str(ts, DAY_FORMAT).ok())
}

/// Day key for a timestamp, falling back to the clock's current day.
pub fn day_key(timestamp: &str, clock: &dyn Clock) -> String {
    match parse_day(timestamp) {
        Some(day) => day.format(DAY_FORMAT).to_string(),
        None => {
            if !timestamp.trim().is_empty() {
                tracing::warn!(timestamp, "Unparseable timestamp, attributing to current day");
            }
            clock.today_key()
        }
    }
}

/// Date embedded in a file name such as `snapshot_2025-07-02.csv`.
pub fn date_in_file_name(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let pattern = FILENAME_DATE.get_or_init(|| Regex::new(r"(\d{4}-\d{2}-\d{2})").ok());
    let captures = pattern.as_ref()?.captures(name)?;
    Some(captures.get(1)?.as_str().to_string())
}

/// Date a snapshot file describes.
///
/// Prefers a date in the file name, then the file's modification day, then the
/// clock's current day.
pub fn snapshot_date_for(path: &Path, clock: &dyn Clock) -> String {
    if let Some(date) = date_in_file_name(path) {
        return date;
    }

    let modified = std::fs::metadata(path).and_then(|meta| meta.modified());
    match modified {
        Ok(mtime) => DateTime::<Local>::from(mtime).format(DAY_FORMAT).to_string(),
        Err(_) => clock.today_key(),
    }
}
