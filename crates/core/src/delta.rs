//! Change detection between two snapshots
//!
//! Compares the previous and current export item by item and classifies what
//! changed into reviews, newly started items and level transitions. Items that
//! only exist in the previous export are counted but otherwise ignored.

use crate::clock::Clock;
use crate::snapshot::{ItemSnapshot, Snapshot};

use serde::{Deserialize, Serialize};

/// An item whose `last_review_date` moved to a new non-empty value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDelta {
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
    /// Review date in the previous snapshot, possibly empty
    pub previous_review: String,
    pub new_review: String,
}

/// An item that was started since the previous snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStudyDelta {
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
    pub first_study_date: String,
}

/// An item whose maturity label changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelChangeDelta {
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
}

/// Counters describing the two snapshots that were compared
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionMetadata {
    /// When detection ran (ISO 8601)
    pub detection_date: String,
    #[serde(alias = "yesterday_cards")]
    pub previous_items: usize,
    #[serde(alias = "today_cards")]
    pub current_items: usize,
    /// Items only present in the current snapshot
    #[serde(alias = "new_cards_added")]
    pub items_added: usize,
    /// Items only present in the previous snapshot
    #[serde(alias = "cards_removed")]
    pub items_removed: usize,
}

/// Output of one detector run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaSet {
    #[serde(default)]
    pub reviews: Vec<ReviewDelta>,
    #[serde(default)]
    pub new_studies: Vec<NewStudyDelta>,
    #[serde(default)]
    pub level_changes: Vec<LevelChangeDelta>,
    pub metadata: DetectionMetadata,
    /// Day the current snapshot was taken, when known
    #[serde(default, alias = "date", skip_serializing_if = "Option::is_none")]
    pub snapshot_date: Option<String>,
}

impl DeltaSet {
    /// A delta set with no changes, stamped with the clock's time
    pub fn empty(clock: &dyn Clock) -> Self {
        Self {
            reviews: Vec::new(),
            new_studies: Vec::new(),
            level_changes: Vec::new(),
            metadata: DetectionMetadata {
                detection_date: clock.timestamp(),
                previous_items: 0,
                current_items: 0,
                items_added: 0,
                items_removed: 0,
            },
            snapshot_date: None,
        }
    }

    pub fn with_snapshot_date(mut self, date: impl Into<String>) -> Self {
        self.snapshot_date = Some(date.into());
        self
    }

    /// Total number of deltas across all three kinds
    pub fn len(&self) -> usize {
        self.reviews.len() + self.new_studies.len() + self.level_changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReviewDelta {
    fn between(previous: &ItemSnapshot, current: &ItemSnapshot) -> Self {
        Self {
            item_id: current.item_id.clone(),
            collection_name: current.collection_name.clone(),
            level: current.level.clone(),
            primary_text: current.primary_text.clone(),
            secondary_text: current.secondary_text.clone(),
            previous_review: previous.last_review_date.clone(),
            new_review: current.last_review_date.clone(),
        }
    }
}

impl NewStudyDelta {
    fn from_current(current: &ItemSnapshot) -> Self {
        Self {
            item_id: current.item_id.clone(),
            collection_name: current.collection_name.clone(),
            level: current.level.clone(),
            primary_text: current.primary_text.clone(),
            secondary_text: current.secondary_text.clone(),
            first_study_date: current.first_study_date.clone(),
        }
    }
}

impl LevelChangeDelta {
    fn between(previous: &ItemSnapshot, current: &ItemSnapshot) -> Self {
        Self {
            item_id: current.item_id.clone(),
            collection_name: current.collection_name.clone(),
            primary_text: current.primary_text.clone(),
            secondary_text: current.secondary_text.clone(),
            previous_level: previous.level.clone(),
            new_level: current.level.clone(),
        }
    }
}

/// Compare two snapshots and classify every per-item change.
pub fn detect(previous: &Snapshot, current: &Snapshot, clock: &dyn Clock) -> DeltaSet {
    let mut deltas = DeltaSet::empty(clock);
    deltas.metadata.previous_items = previous.len();
    deltas.metadata.current_items = current.len();
    deltas.metadata.items_added = current.count_missing_from(previous);
    deltas.metadata.items_removed = previous.count_missing_from(current);

    for item in current.iter() {
        match previous.get(&item.item_id) {
            Some(before) => {
                if before.last_review_date != item.last_review_date && !item.last_review_date.is_empty() {
                    deltas.reviews.push(ReviewDelta::between(before, item));
                }
                if before.first_study_date != item.first_study_date && !item.first_study_date.is_empty() {
                    deltas.new_studies.push(NewStudyDelta::from_current(item));
                }
                if before.level != item.level {
                    deltas.level_changes.push(LevelChangeDelta::between(before, item));
                }
            }
            None if !item.first_study_date.is_empty() => {
                deltas.new_studies.push(NewStudyDelta::from_current(item));
            }
            None => {}
        }
    }

    tracing::debug!(
        reviews = deltas.reviews.len(),
        new_studies = deltas.new_studies.len(),
        level_changes = deltas.level_changes.len(),
        added = deltas.metadata.items_added,
        removed = deltas.metadata.items_removed,
        "Detected changes"
    );

    deltas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::NaiveDate;

    fn clock() -> FixedClock {
        FixedClock::at_noon(NaiveDate::from_ymd_opt(2025, 7, 2).unwrap())
    }

    fn snapshot(items: Vec<ItemSnapshot>) -> Snapshot {
        items.into_iter().collect()
    }

    #[test]
    fn test_first_review_of_unreviewed_item() {
        let previous = snapshot(vec![ItemSnapshot::new("N1", "New", "Finnish")]);
        let current = snapshot(vec![
            ItemSnapshot::new("N1", "New", "Finnish").with_last_review("2025-07-02 10:00:00"),
        ]);

        let deltas = detect(&previous, &current, &clock());
        assert_eq!(deltas.reviews.len(), 1);
        assert_eq!(deltas.reviews[0].item_id, "N1");
        assert_eq!(deltas.reviews[0].previous_review, "");
        assert_eq!(deltas.reviews[0].new_review, "2025-07-02 10:00:00");
        assert!(deltas.new_studies.is_empty());
        assert!(deltas.level_changes.is_empty());
    }

    #[test]
    fn test_brand_new_item_only_new_study() {
        let previous = snapshot(vec![]);
        let current = snapshot(vec![
            ItemSnapshot::new("N2", "Learning", "Finnish")
                .with_first_study("2025-07-01")
                .with_last_review("2025-07-01 09:00:00"),
        ]);

        let deltas = detect(&previous, &current, &clock());
        assert_eq!(deltas.new_studies.len(), 1);
        assert_eq!(deltas.new_studies[0].first_study_date, "2025-07-01");
        assert!(deltas.reviews.is_empty());
        assert!(deltas.level_changes.is_empty());
        assert_eq!(deltas.metadata.items_added, 1);
    }

    #[test]
    fn test_brand_new_unstudied_item_is_silent() {
        let current = snapshot(vec![ItemSnapshot::new("N3", "New", "Finnish")]);
        let deltas = detect(&Snapshot::new(), &current, &clock());
        assert!(deltas.is_empty());
        assert_eq!(deltas.metadata.items_added, 1);
    }

    #[test]
    fn test_unreviewed_item_emits_nothing() {
        let previous = snapshot(vec![
            ItemSnapshot::new("1", "Young", "D").with_last_review("2025-07-01 08:00:00"),
        ]);
        let current = snapshot(vec![ItemSnapshot::new("1", "Young", "D")]);

        let deltas = detect(&previous, &current, &clock());
        assert!(deltas.is_empty());
    }

    #[test]
    fn test_multiple_variants_for_one_item() {
        let previous = snapshot(vec![
            ItemSnapshot::new("1", "Learning", "D")
                .with_first_study("2025-06-20")
                .with_last_review("2025-07-01 08:00:00"),
        ]);
        let current = snapshot(vec![
            ItemSnapshot::new("1", "Young", "D")
                .with_first_study("2025-06-20")
                .with_last_review("2025-07-02 08:00:00"),
        ]);

        let deltas = detect(&previous, &current, &clock());
        assert_eq!(deltas.reviews.len(), 1);
        assert_eq!(deltas.level_changes.len(), 1);
        assert!(deltas.new_studies.is_empty());
        assert_eq!(deltas.level_changes[0].previous_level, "Learning");
        assert_eq!(deltas.level_changes[0].new_level, "Young");
    }

    #[test]
    fn test_level_regression_is_detected() {
        let previous = snapshot(vec![ItemSnapshot::new("1", "Mature", "D")]);
        let current = snapshot(vec![ItemSnapshot::new("1", "Learning", "D")]);

        let deltas = detect(&previous, &current, &clock());
        assert_eq!(deltas.level_changes.len(), 1);
        assert_eq!(deltas.level_changes[0].new_level, "Learning");
    }

    #[test]
    fn test_first_study_change_on_existing_item() {
        let previous = snapshot(vec![ItemSnapshot::new("1", "New", "D")]);
        let current = snapshot(vec![ItemSnapshot::new("1", "New", "D").with_first_study("2025-07-02")]);

        let deltas = detect(&previous, &current, &clock());
        assert_eq!(deltas.new_studies.len(), 1);
        assert!(deltas.reviews.is_empty());
        assert!(deltas.level_changes.is_empty());
    }

    #[test]
    fn test_unchanged_items_produce_nothing() {
        let item = ItemSnapshot::new("1", "Young", "D")
            .with_first_study("2025-06-01")
            .with_last_review("2025-07-01 10:00:00")
            .with_text("talo", "house");
        let previous = snapshot(vec![item.clone()]);
        let current = snapshot(vec![item]);

        let deltas = detect(&previous, &current, &clock());
        assert!(deltas.is_empty());
        assert_eq!(deltas.metadata.previous_items, 1);
        assert_eq!(deltas.metadata.current_items, 1);
        assert_eq!(deltas.metadata.items_added, 0);
        assert_eq!(deltas.metadata.items_removed, 0);
    }

    #[test]
    fn test_removed_items_are_counted_not_emitted() {
        let previous = snapshot(vec![
            ItemSnapshot::new("1", "Young", "D"),
            ItemSnapshot::new("2", "Young", "D").with_last_review("2025-07-01 10:00:00"),
        ]);
        let current = snapshot(vec![ItemSnapshot::new("1", "Young", "D")]);

        let deltas = detect(&previous, &current, &clock());
        assert!(deltas.is_empty());
        assert_eq!(deltas.metadata.items_removed, 1);
    }

    #[test]
    fn test_partition_has_one_delta_per_kind_per_item() {
        let previous = snapshot(
            (0..20)
                .map(|i| ItemSnapshot::new(i.to_string(), "New", "D"))
                .collect(),
        );
        let current = snapshot(
            (0..20)
                .map(|i| {
                    let item = ItemSnapshot::new(i.to_string(), if i % 3 == 0 { "Learning" } else { "New" }, "D");
                    if i % 2 == 0 { item.with_last_review("2025-07-02 07:00:00") } else { item }
                })
                .collect(),
        );

        let deltas = detect(&previous, &current, &clock());
        assert_eq!(deltas.reviews.len(), 10);
        assert_eq!(deltas.level_changes.len(), 7);

        let mut ids: Vec<_> = deltas.reviews.iter().map(|d| d.item_id.clone()).collect();
        ids.dedup();
        assert_eq!(ids.len(), deltas.reviews.len());
    }

    #[test]
    fn test_metadata_stamped_by_clock() {
        let deltas = detect(&Snapshot::new(), &Snapshot::new(), &clock());
        assert_eq!(deltas.metadata.detection_date, "2025-07-02T12:00:00");
        assert!(deltas.snapshot_date.is_none());
    }

    #[test]
    fn test_delta_set_serialization_shape() {
        let deltas = DeltaSet::empty(&clock()).with_snapshot_date("2025-07-02");
        let value = serde_json::to_value(&deltas).unwrap();

        assert!(value["reviews"].is_array());
        assert!(value["new_studies"].is_array());
        assert!(value["level_changes"].is_array());
        assert_eq!(value["metadata"]["current_items"], 0);
        assert_eq!(value["snapshot_date"], "2025-07-02");
    }

    #[test]
    fn test_delta_set_reads_legacy_document() {
        let json = r#"{
            "reviews": [{
                "note_id": "7", "deck_name": "Finnish", "anki_level": "Young",
                "finnish": "kissa", "translation": "cat",
                "previous_review": "", "new_review": "2025-07-02 10:30:15"
            }],
            "new_studies": [],
            "level_changes": [],
            "metadata": {
                "detection_date": "2025-07-02T21:00:00.123456",
                "yesterday_cards": 10, "today_cards": 11,
                "new_cards_added": 1, "cards_removed": 0
            }
        }"#;

        let deltas: DeltaSet = serde_json::from_str(json).unwrap();
        assert_eq!(deltas.reviews[0].item_id, "7");
        assert_eq!(deltas.metadata.current_items, 11);
        assert_eq!(deltas.len(), 1);
    }
}
