//! Point-in-time card state keyed by item identifier

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One study item as exported at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    /// Stable identifier, unique within a snapshot
    #[serde(alias = "note_id")]
    pub item_id: String,
    /// Maturity label (New, Learning, Young, Mature, Very Mature)
    #[serde(alias = "anki_level")]
    pub level: String,
    /// Grouping label, the deck name
    #[serde(alias = "deck_name")]
    pub collection_name: String,
    /// Day the item was first studied; empty if never
    pub first_study_date: String,
    /// Most recent review; empty if never reviewed
    pub last_review_date: String,
    /// Prompt side of the card
    #[serde(alias = "finnish")]
    pub primary_text: String,
    /// Answer side of the card
    #[serde(alias = "translation")]
    pub secondary_text: String,
}

impl ItemSnapshot {
    /// Create an item with only identity fields set
    pub fn new(item_id: impl Into<String>, level: impl Into<String>, collection_name: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            level: level.into(),
            collection_name: collection_name.into(),
            first_study_date: String::new(),
            last_review_date: String::new(),
            primary_text: String::new(),
            secondary_text: String::new(),
        }
    }

    pub fn with_first_study(mut self, date: impl Into<String>) -> Self {
        self.first_study_date = date.into();
        self
    }

    pub fn with_last_review(mut self, date: impl Into<String>) -> Self {
        self.last_review_date = date.into();
        self
    }

    pub fn with_text(mut self, primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        self.primary_text = primary.into();
        self.secondary_text = secondary.into();
        self
    }
}

/// All items of one export, keyed by `item_id`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    items: BTreeMap<String, ItemSnapshot>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from exported rows.
    ///
    /// Returns the snapshot and the number of rows whose `item_id` repeated an
    /// earlier row; the later row wins.
    pub fn from_items(items: impl IntoIterator<Item = ItemSnapshot>) -> (Self, usize) {
        let mut snapshot = Self::new();
        let mut duplicates = 0;
        for item in items {
            if snapshot.insert(item).is_some() {
                duplicates += 1;
            }
        }
        (snapshot, duplicates)
    }

    /// Insert an item, returning the one it replaced
    pub fn insert(&mut self, item: ItemSnapshot) -> Option<ItemSnapshot> {
        self.items.insert(item.item_id.clone(), item)
    }

    pub fn get(&self, item_id: &str) -> Option<&ItemSnapshot> {
        self.items.get(item_id)
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.items.contains_key(item_id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in `item_id` order
    pub fn iter(&self) -> impl Iterator<Item = &ItemSnapshot> {
        self.items.values()
    }

    /// Number of ids present here but not in `other`
    pub fn count_missing_from(&self, other: &Snapshot) -> usize {
        self.items.keys().filter(|id| !other.contains(id)).count()
    }
}

impl FromIterator<ItemSnapshot> for Snapshot {
    fn from_iter<I: IntoIterator<Item = ItemSnapshot>>(iter: I) -> Self {
        Self::from_items(iter).0
    }
}

/// Maturity bucket derived from a card's review interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    New,
    Learning,
    Young,
    Mature,
    VeryMature,
}

impl Level {
    /// Bucket for an interval in days
    pub fn from_interval(interval_days: i64) -> Self {
        match interval_days {
            i64::MIN..=0 => Level::New,
            1..=6 => Level::Learning,
            7..=29 => Level::Young,
            30..=179 => Level::Mature,
            _ => Level::VeryMature,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::New => "New",
            Level::Learning => "Learning",
            Level::Young => "Young",
            Level::Mature => "Mature",
            Level::VeryMature => "Very Mature",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
