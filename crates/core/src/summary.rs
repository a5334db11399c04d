//! Whole-log statistics printed after a merge

use crate::activity::ActivityLog;

use serde::Serialize;
use std::collections::BTreeSet;

/// Totals and averages across every day in the log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub total_days_tracked: usize,
    /// Days with at least one review or new study
    pub active_days: usize,
    pub total_reviews: usize,
    pub total_new_studies: usize,
    pub total_level_changes: usize,
    pub unique_collections: usize,
    pub average_daily_reviews: f64,
    pub average_daily_new_studies: f64,
}

impl SummaryStats {
    pub fn from_log(log: &ActivityLog) -> Self {
        let mut active_days = 0;
        let mut total_reviews = 0;
        let mut total_new_studies = 0;
        let mut total_level_changes = 0;
        let mut collections = BTreeSet::new();

        for day in log.daily_activity.values() {
            if !day.reviews.is_empty() || !day.new_studies.is_empty() {
                active_days += 1;
            }
            total_reviews += day.reviews.len();
            total_new_studies += day.new_studies.len();
            total_level_changes += day.level_changes.len();
            collections.extend(day.stats.collections_studied.iter().map(String::as_str));
        }

        let divisor = active_days.max(1) as f64;
        Self {
            total_days_tracked: log.daily_activity.len(),
            active_days,
            total_reviews,
            total_new_studies,
            total_level_changes,
            unique_collections: collections.len(),
            average_daily_reviews: round_one_decimal(total_reviews as f64 / divisor),
            average_daily_new_studies: round_one_decimal(total_new_studies as f64 / divisor),
        }
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{DayRecord, LevelChangeEntry, NewStudyEntry, ReviewEntry};
    use crate::clock::FixedClock;
    use chrono::NaiveDate;

    fn review(id: &str, deck: &str) -> ReviewEntry {
        ReviewEntry {
            item_id: id.to_string(),
            collection_name: deck.to_string(),
            level: "Young".to_string(),
            primary_text: String::new(),
            secondary_text: String::new(),
            timestamp: None,
        }
    }

    fn log() -> ActivityLog {
        ActivityLog::new(&FixedClock::at_noon(NaiveDate::from_ymd_opt(2025, 7, 2).unwrap()))
    }

    #[test]
    fn test_empty_log() {
        let stats = SummaryStats::from_log(&log());
        assert_eq!(stats.total_days_tracked, 0);
        assert_eq!(stats.active_days, 0);
        assert_eq!(stats.average_daily_reviews, 0.0);
    }

    #[test]
    fn test_totals_and_averages() {
        let mut log = log();

        let mut day1 = DayRecord { reviews: vec![review("1", "Finnish"), review("2", "Finnish")], ..Default::default() };
        day1.new_studies.push(NewStudyEntry {
            item_id: "3".to_string(),
            collection_name: "Swedish".to_string(),
            level: "New".to_string(),
            primary_text: String::new(),
            secondary_text: String::new(),
            timestamp: None,
        });
        day1.recompute_stats();

        let mut day2 = DayRecord { reviews: vec![review("1", "Finnish")], ..Default::default() };
        day2.recompute_stats();

        let mut only_levels = DayRecord::default();
        only_levels.level_changes.push(LevelChangeEntry {
            item_id: "9".to_string(),
            collection_name: "Japanese".to_string(),
            primary_text: String::new(),
            secondary_text: String::new(),
            previous_level: "New".to_string(),
            new_level: "Learning".to_string(),
            timestamp: None,
        });
        only_levels.recompute_stats();

        log.daily_activity.insert("2025-07-01".to_string(), day1);
        log.daily_activity.insert("2025-07-02".to_string(), day2);
        log.daily_activity.insert("2025-07-03".to_string(), only_levels);

        let stats = SummaryStats::from_log(&log);
        assert_eq!(stats.total_days_tracked, 3);
        assert_eq!(stats.active_days, 2);
        assert_eq!(stats.total_reviews, 3);
        assert_eq!(stats.total_new_studies, 1);
        assert_eq!(stats.total_level_changes, 1);
        assert_eq!(stats.unique_collections, 2);
        assert_eq!(stats.average_daily_reviews, 1.5);
        assert_eq!(stats.average_daily_new_studies, 0.5);
    }

    #[test]
    fn test_round_one_decimal() {
        assert_eq!(round_one_decimal(2.0 / 3.0), 0.7);
        assert_eq!(round_one_decimal(10.0), 10.0);
    }
}
