//! Raw per-day review counters produced by the extractor
//!
//! These are copied into the activity log verbatim; nothing here is derived
//! from deltas.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Review counters for one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReviewCount {
    /// Number of review events
    pub reviews: u64,
    /// Reviews answered with anything other than "again"
    #[serde(default)]
    pub successful: u64,
    /// Mean answer time in milliseconds
    #[serde(default)]
    pub avg_time: f64,
    /// Summed answer time in milliseconds
    #[serde(default)]
    pub total_time: u64,
}

/// Document written by `extract` with counts per day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawActivitySummary {
    pub daily_activity: BTreeMap<String, DailyReviewCount>,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub total_days: usize,
}

impl RawActivitySummary {
    pub fn new(daily_activity: BTreeMap<String, DailyReviewCount>, last_updated: impl Into<String>) -> Self {
        let total_days = daily_activity.len();
        Self { daily_activity, last_updated: Some(last_updated.into()), total_days }
    }

    /// Sum of review events over all days
    pub fn total_reviews(&self) -> u64 {
        self.daily_activity.values().map(|day| day.reviews).sum()
    }
}
