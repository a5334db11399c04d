//! Persistent per-day activity log and the merge that feeds it
//!
//! The log only grows by day: each run drops newly detected deltas into the day
//! they happened, skips anything already recorded for that day, recomputes the
//! derived stats and trims days that fell out of the retention window.

use crate::clock::{Clock, DAY_FORMAT};
use crate::delta::{DeltaSet, LevelChangeDelta, NewStudyDelta, ReviewDelta};
use crate::review_counts::{DailyReviewCount, RawActivitySummary};
use crate::timestamp::day_key;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Format version written into new logs
pub const LOG_VERSION: &str = "1.0";

/// Default number of days kept in the log
pub const DEFAULT_RETENTION_DAYS: u32 = 365;

/// Log-level bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMetadata {
    pub created: String,
    /// Null until the first merge
    pub last_updated: Option<String>,
    pub total_days_tracked: usize,
    pub version: String,
}

/// A review recorded on a given day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewEntry {
    #[serde(alias = "note_id")]
    pub item_id: String,
    #[serde(alias = "deck_name")]
    pub collection_name: String,
    #[serde(alias = "anki_level")]
    pub level: String,
    #[serde(alias = "finnish")]
    pub primary_text: String,
    #[serde(alias = "translation")]
    pub secondary_text: String,
    pub timestamp: Option<String>,
}

/// An item first studied on a given day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStudyEntry {
    #[serde(alias = "note_id")]
    pub item_id: String,
    #[serde(alias = "deck_name")]
    pub collection_name: String,
    #[serde(alias = "anki_level")]
    pub level: String,
    #[serde(alias = "finnish")]
    pub primary_text: String,
    #[serde(alias = "translation")]
    pub secondary_text: String,
    pub timestamp: Option<String>,
}

/// A level transition observed on a given day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelChangeEntry {
    #[serde(alias = "note_id")]
    pub item_id: String,
    #[serde(alias = "deck_name")]
    pub collection_name: String,
    #[serde(alias = "finnish")]
    pub primary_text: String,
    #[serde(alias = "translation")]
    pub secondary_text: String,
    pub previous_level: String,
    pub new_level: String,
    /// When the merge observed the transition
    pub timestamp: Option<String>,
}

/// Counts derived from a day's entry lists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayStats {
    pub total_reviews: usize,
    pub total_new_studies: usize,
    pub total_level_changes: usize,
    /// Distinct collections touched by reviews or new studies, sorted
    #[serde(alias = "decks_studied")]
    pub collections_studied: Vec<String>,
}

/// Everything recorded for one calendar day
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRecord {
    #[serde(default)]
    pub reviews: Vec<ReviewEntry>,
    #[serde(default)]
    pub new_studies: Vec<NewStudyEntry>,
    #[serde(default)]
    pub level_changes: Vec<LevelChangeEntry>,
    #[serde(default)]
    pub stats: DayStats,
}

impl DayRecord {
    pub fn has_activity(&self) -> bool {
        !self.reviews.is_empty() || !self.new_studies.is_empty() || !self.level_changes.is_empty()
    }

    /// Rebuild `stats` from the entry lists.
    pub fn recompute_stats(&mut self) {
        let collections: BTreeSet<&str> = self
            .reviews
            .iter()
            .map(|r| r.collection_name.as_str())
            .chain(self.new_studies.iter().map(|s| s.collection_name.as_str()))
            .collect();

        self.stats = DayStats {
            total_reviews: self.reviews.len(),
            total_new_studies: self.new_studies.len(),
            total_level_changes: self.level_changes.len(),
            collections_studied: collections.into_iter().map(str::to_string).collect(),
        };
    }

    fn add_review(&mut self, entry: ReviewEntry) -> bool {
        if self.reviews.iter().any(|r| r.item_id == entry.item_id) {
            return false;
        }
        self.reviews.push(entry);
        true
    }

    fn add_new_study(&mut self, entry: NewStudyEntry) -> bool {
        if self.new_studies.iter().any(|s| s.item_id == entry.item_id) {
            return false;
        }
        self.new_studies.push(entry);
        true
    }

    fn add_level_change(&mut self, entry: LevelChangeEntry) -> bool {
        if self.level_changes.iter().any(|c| c.item_id == entry.item_id) {
            return false;
        }
        self.level_changes.push(entry);
        true
    }
}

impl From<&ReviewDelta> for ReviewEntry {
    fn from(delta: &ReviewDelta) -> Self {
        Self {
            item_id: delta.item_id.clone(),
            collection_name: delta.collection_name.clone(),
            level: delta.level.clone(),
            primary_text: delta.primary_text.clone(),
            secondary_text: delta.secondary_text.clone(),
            timestamp: Some(delta.new_review.clone()),
        }
    }
}

impl From<&NewStudyDelta> for NewStudyEntry {
    fn from(delta: &NewStudyDelta) -> Self {
        Self {
            item_id: delta.item_id.clone(),
            collection_name: delta.collection_name.clone(),
            level: delta.level.clone(),
            primary_text: delta.primary_text.clone(),
            secondary_text: delta.secondary_text.clone(),
            timestamp: Some(delta.first_study_date.clone()),
        }
    }
}

impl LevelChangeEntry {
    fn observed(delta: &LevelChangeDelta, at: String) -> Self {
        Self {
            item_id: delta.item_id.clone(),
            collection_name: delta.collection_name.clone(),
            primary_text: delta.primary_text.clone(),
            secondary_text: delta.secondary_text.clone(),
            previous_level: delta.previous_level.clone(),
            new_level: delta.new_level.clone(),
            timestamp: Some(at),
        }
    }
}

/// Which entry list a merge touched
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntryKind {
    Review,
    NewStudy,
    LevelChange,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Review => "reviews",
            EntryKind::NewStudy => "new studies",
            EntryKind::LevelChange => "level changes",
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of merging one list into one day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayMerge {
    pub added: usize,
    pub skipped: usize,
    /// List length after the merge
    pub total: usize,
}

/// What a merge changed, keyed by day and entry kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub days: BTreeMap<(String, EntryKind), DayMerge>,
}

impl MergeReport {
    pub fn added(&self) -> usize {
        self.days.values().map(|m| m.added).sum()
    }

    pub fn skipped(&self) -> usize {
        self.days.values().map(|m| m.skipped).sum()
    }

    fn record(&mut self, day: &str, kind: EntryKind, added: bool) {
        let entry = self
            .days
            .entry((day.to_string(), kind))
            .or_insert(DayMerge { added: 0, skipped: 0, total: 0 });
        if added {
            entry.added += 1;
        } else {
            entry.skipped += 1;
        }
    }
}

/// The persisted activity log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLog {
    pub metadata: LogMetadata,
    #[serde(default)]
    pub daily_activity: BTreeMap<String, DayRecord>,
    /// Raw review counters copied from the extractor, by day
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub review_counts: BTreeMap<String, DailyReviewCount>,
}

impl ActivityLog {
    /// A fresh log with no days
    pub fn new(clock: &dyn Clock) -> Self {
        Self {
            metadata: LogMetadata {
                created: clock.timestamp(),
                last_updated: None,
                total_days_tracked: 0,
                version: LOG_VERSION.to_string(),
            },
            daily_activity: BTreeMap::new(),
            review_counts: BTreeMap::new(),
        }
    }

    pub fn day(&self, key: &str) -> Option<&DayRecord> {
        self.daily_activity.get(key)
    }

    fn day_mut(&mut self, key: &str) -> &mut DayRecord {
        self.daily_activity.entry(key.to_string()).or_default()
    }

    /// Merge a delta set into the log.
    ///
    /// Reviews land on the day of `new_review`, new studies on the day of
    /// `first_study_date`, and level changes on the clock's current day. An
    /// item already present in a day's list is skipped, so merging the same
    /// delta set twice leaves the log unchanged apart from `last_updated`.
    pub fn merge(&mut self, deltas: &DeltaSet, clock: &dyn Clock) -> MergeReport {
        if let Some(date) = &deltas.snapshot_date
            && self.day(date).is_some_and(DayRecord::has_activity)
        {
            tracing::warn!(date = %date, "Day already has activity data, merging");
        }

        let mut report = MergeReport::default();

        for review in &deltas.reviews {
            let day = day_key(&review.new_review, clock);
            let added = self.day_mut(&day).add_review(ReviewEntry::from(review));
            report.record(&day, EntryKind::Review, added);
        }

        for study in &deltas.new_studies {
            let day = day_key(&study.first_study_date, clock);
            let added = self.day_mut(&day).add_new_study(NewStudyEntry::from(study));
            report.record(&day, EntryKind::NewStudy, added);
        }

        let today = clock.today_key();
        let observed_at = clock.timestamp();
        for change in &deltas.level_changes {
            let entry = LevelChangeEntry::observed(change, observed_at.clone());
            let added = self.day_mut(&today).add_level_change(entry);
            report.record(&today, EntryKind::LevelChange, added);
        }

        for ((day, kind), merged) in report.days.iter_mut() {
            if let Some(record) = self.daily_activity.get(day) {
                merged.total = match kind {
                    EntryKind::Review => record.reviews.len(),
                    EntryKind::NewStudy => record.new_studies.len(),
                    EntryKind::LevelChange => record.level_changes.len(),
                };
            }
            tracing::info!(
                day = %day,
                kind = %kind,
                added = merged.added,
                total = merged.total,
                "Merged entries"
            );
        }

        self.recompute_stats();
        self.touch(clock);
        report
    }

    /// Copy raw per-day review counters into the log, replacing existing days.
    pub fn incorporate_review_counts(&mut self, summary: &RawActivitySummary) -> usize {
        for (day, counts) in &summary.daily_activity {
            self.review_counts.insert(day.clone(), counts.clone());
        }
        summary.daily_activity.len()
    }

    /// Rebuild the stats of every day.
    pub fn recompute_stats(&mut self) {
        for record in self.daily_activity.values_mut() {
            record.recompute_stats();
        }
        self.metadata.total_days_tracked = self.daily_activity.len();
    }

    /// Drop every day strictly before `today - retention_days`.
    ///
    /// Returns the number of activity days removed. A window reaching past the
    /// earliest representable date keeps everything.
    pub fn apply_retention(&mut self, retention_days: u32, today: chrono::NaiveDate) -> usize {
        let Some(cutoff) = today.checked_sub_days(chrono::Days::new(u64::from(retention_days))) else {
            self.metadata.total_days_tracked = self.daily_activity.len();
            return 0;
        };
        let cutoff_key = cutoff.format(DAY_FORMAT).to_string();

        let before = self.daily_activity.len();
        self.daily_activity.retain(|day, _| day.as_str() >= cutoff_key.as_str());
        self.review_counts.retain(|day, _| day.as_str() >= cutoff_key.as_str());
        self.metadata.total_days_tracked = self.daily_activity.len();

        let removed = before - self.daily_activity.len();
        if removed > 0 {
            tracing::info!(removed, cutoff = %cutoff_key, "Trimmed days outside retention window");
        }
        removed
    }

    fn touch(&mut self, clock: &dyn Clock) {
        self.metadata.last_updated = Some(clock.timestamp());
        self.metadata.total_days_tracked = self.daily_activity.len();
    }
}
