//! JSON documents: delta sets, the activity log and raw review counts

use crate::atomic::{replace_with_backup, write_atomic};
use crate::error::Result;

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use studylog_core::logging::sanitize_path;
use studylog_core::{ActivityLog, Clock, DeltaSet, RawActivitySummary};

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn to_pretty_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Load a delta set. Missing or malformed files are errors.
pub fn load_deltas(path: &Path) -> Result<DeltaSet> {
    let deltas: DeltaSet = read_json(path)?;
    tracing::debug!(path = %sanitize_path(path), deltas = deltas.len(), "Loaded delta set");
    Ok(deltas)
}

pub fn save_deltas(path: &Path, deltas: &DeltaSet) -> Result<()> {
    write_atomic(path, &to_pretty_json(deltas)?)
}

/// Read the activity log; `Ok(None)` when the file does not exist.
pub fn read_activity_log(path: &Path) -> Result<Option<ActivityLog>> {
    if !path.exists() {
        return Ok(None);
    }
    read_json(path).map(Some)
}

/// Load the activity log, starting fresh when it is absent or unreadable.
pub fn load_activity_log(path: &Path, clock: &dyn Clock) -> ActivityLog {
    match read_activity_log(path) {
        Ok(Some(log)) => {
            tracing::debug!(
                path = %sanitize_path(path),
                days = log.daily_activity.len(),
                "Loaded activity log"
            );
            log
        }
        Ok(None) => {
            tracing::info!(path = %sanitize_path(path), "No activity log yet, creating a new one");
            ActivityLog::new(clock)
        }
        Err(e) => {
            tracing::warn!(path = %sanitize_path(path), error = %e, "Activity log unreadable, starting fresh");
            ActivityLog::new(clock)
        }
    }
}

/// Persist the log, keeping the prior version as `<path>.backup`.
pub fn save_activity_log(path: &Path, log: &ActivityLog) -> Result<Option<PathBuf>> {
    let backup = replace_with_backup(path, &to_pretty_json(log)?)?;
    tracing::debug!(path = %sanitize_path(path), backup = backup.is_some(), "Saved activity log");
    Ok(backup)
}

/// Load a raw activity summary; `None` with a warning when it cannot be read.
pub fn load_review_counts(path: &Path) -> Option<RawActivitySummary> {
    match read_json::<RawActivitySummary>(path) {
        Ok(summary) => Some(summary),
        Err(e) => {
            tracing::warn!(path = %sanitize_path(path), error = %e, "Ignoring unreadable activity summary");
            None
        }
    }
}

pub fn save_review_counts(path: &Path, summary: &RawActivitySummary) -> Result<()> {
    write_atomic(path, &to_pretty_json(summary)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;
    use studylog_core::{DailyReviewCount, FixedClock, ItemSnapshot, Snapshot, detect};
    use tempfile::TempDir;

    fn clock() -> FixedClock {
        FixedClock::at_noon(NaiveDate::from_ymd_opt(2025, 7, 2).unwrap())
    }

    fn sample_deltas() -> DeltaSet {
        let previous: Snapshot = [ItemSnapshot::new("N1", "Learning", "Finnish").with_text("talo", "house")]
            .into_iter()
            .collect();
        let current: Snapshot = [ItemSnapshot::new("N1", "Learning", "Finnish")
            .with_text("talo", "house")
            .with_last_review("2025-07-02 10:30:15")]
        .into_iter()
        .collect();
        detect(&previous, &current, &clock()).with_snapshot_date("2025-07-02")
    }

    #[test]
    fn test_load_deltas_missing_is_error() {
        let temp = TempDir::new().unwrap();
        let result = load_deltas(&temp.path().join("deltas.json"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_load_deltas_malformed_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("deltas.json");
        fs::write(&path, "{\"reviews\": [").unwrap();
        assert!(matches!(load_deltas(&path), Err(Error::Json(_))));
    }

    #[test]
    fn test_deltas_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("deltas_2025-07-02.json");
        let deltas = sample_deltas();

        save_deltas(&path, &deltas).unwrap();
        assert_eq!(load_deltas(&path).unwrap(), deltas);
    }

    #[test]
    fn test_missing_log_starts_fresh() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("activity_log.json");

        assert!(read_activity_log(&path).unwrap().is_none());
        let log = load_activity_log(&path, &clock());
        assert!(log.daily_activity.is_empty());
        assert_eq!(log.metadata.created, "2025-07-02T12:00:00");
    }

    #[test]
    fn test_corrupt_log_starts_fresh() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("activity_log.json");
        fs::write(&path, "not json").unwrap();

        let log = load_activity_log(&path, &clock());
        assert!(log.daily_activity.is_empty());
        assert!(log.metadata.last_updated.is_none());
    }

    #[test]
    fn test_save_log_keeps_backup() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("activity_log.json");
        let clock = clock();

        let mut log = load_activity_log(&path, &clock);
        assert!(save_activity_log(&path, &log).unwrap().is_none());

        log.merge(&sample_deltas(), &clock);
        let backup = save_activity_log(&path, &log).unwrap().unwrap();

        let previous = read_activity_log(&backup).unwrap().unwrap();
        assert!(previous.daily_activity.is_empty());
        let saved = read_activity_log(&path).unwrap().unwrap();
        assert_eq!(saved, log);
    }

    #[test]
    fn test_round_trip_preserves_daily_activity_bytes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("activity_log.json");
        let clock = clock();

        let mut log = ActivityLog::new(&clock);
        log.merge(&sample_deltas(), &clock);
        save_activity_log(&path, &log).unwrap();
        let before = serde_json::to_string_pretty(&read_activity_log(&path).unwrap().unwrap().daily_activity).unwrap();

        let mut reloaded = load_activity_log(&path, &clock);
        reloaded.merge(&DeltaSet::empty(&clock), &clock);
        save_activity_log(&path, &reloaded).unwrap();
        let after = serde_json::to_string_pretty(&read_activity_log(&path).unwrap().unwrap().daily_activity).unwrap();

        assert_eq!(before, after);
    }

    #[test]
    fn test_merge_same_file_twice_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let deltas_path = temp.path().join("deltas.json");
        let log_path = temp.path().join("activity_log.json");
        let clock = clock();
        save_deltas(&deltas_path, &sample_deltas()).unwrap();

        for _ in 0..2 {
            let deltas = load_deltas(&deltas_path).unwrap();
            let mut log = load_activity_log(&log_path, &clock);
            log.merge(&deltas, &clock);
            save_activity_log(&log_path, &log).unwrap();
        }

        let log = read_activity_log(&log_path).unwrap().unwrap();
        let day = log.day("2025-07-02").unwrap();
        assert_eq!(day.reviews.len(), 1);
        assert_eq!(day.stats.total_reviews, 1);
    }

    #[test]
    fn test_review_counts_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("review_counts.json");
        let mut days = BTreeMap::new();
        days.insert(
            "2025-07-01".to_string(),
            DailyReviewCount { reviews: 20, successful: 18, avg_time: 4000.0, total_time: 80000 },
        );
        let summary = RawActivitySummary::new(days, "2025-07-02T12:00:00");

        save_review_counts(&path, &summary).unwrap();
        assert_eq!(load_review_counts(&path), Some(summary));
    }

    #[test]
    fn test_unreadable_review_counts_are_ignored() {
        let temp = TempDir::new().unwrap();
        assert!(load_review_counts(&temp.path().join("missing.json")).is_none());

        let path = temp.path().join("review_counts.json");
        fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(load_review_counts(&path).is_none());
    }
}
