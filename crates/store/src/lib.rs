//! File and collection storage for studylog
//!
//! Snapshot CSVs, delta sets, the activity log and raw review counts live on
//! disk as plain files; the extractor reads an Anki `collection.anki2`.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use studylog_core::{SystemClock, detect};
//! use studylog_store::{load_activity_log, load_snapshot, save_activity_log};
//!
//! let clock = SystemClock::new();
//! let previous = load_snapshot(Path::new("exports/snapshot_2025-07-01.csv"));
//! let current = load_snapshot(Path::new("exports/snapshot_2025-07-02.csv"));
//! let deltas = detect(&previous, &current, &clock);
//!
//! let log_path = Path::new("activity_log.json");
//! let mut log = load_activity_log(log_path, &clock);
//! log.merge(&deltas, &clock);
//! save_activity_log(log_path, &log)?;
//! # Ok::<(), studylog_store::Error>(())
//! ```

mod atomic;
mod documents;
mod error;
mod extractor;
mod snapshot_csv;

pub use atomic::{replace_with_backup, sibling, write_atomic};
pub use documents::{
    load_activity_log, load_deltas, load_review_counts, read_activity_log, save_activity_log, save_deltas,
    save_review_counts,
};
pub use error::{Error, Result};
pub use extractor::{
    COLLECTION_FILE, Collection, ExportPaths, Extraction, REVIEW_COUNTS_FILE, default_profile_dir, extract,
    find_collection, locate_profile_dir, write_exports,
};
pub use snapshot_csv::{SnapshotFile, load_snapshot, read_snapshot, write_snapshot};
