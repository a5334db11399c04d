//! Snapshot CSV files
//!
//! A snapshot file has a header row naming at least the seven item columns;
//! column order is free and extra columns are ignored. Files written by the
//! older extractor (`note_id`, `deck_name`, `anki_level`, ...) load too.

use crate::atomic::write_atomic;
use crate::error::{Error, Result};

use std::path::Path;
use studylog_core::logging::sanitize_path;
use studylog_core::{ItemSnapshot, Snapshot};

/// A parsed snapshot plus the number of rows that repeated an earlier `item_id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFile {
    pub snapshot: Snapshot,
    pub duplicates: usize,
}

/// Parse a snapshot file, failing on the first malformed row.
pub fn read_snapshot(path: &Path) -> Result<SnapshotFile> {
    let mut reader = csv::Reader::from_path(path)?;
    let items = reader.deserialize::<ItemSnapshot>().collect::<std::result::Result<Vec<_>, csv::Error>>()?;
    let (snapshot, duplicates) = Snapshot::from_items(items);
    Ok(SnapshotFile { snapshot, duplicates })
}

/// Load a snapshot, degrading to an empty one.
///
/// A missing file is normal on the first run. A file with any malformed row
/// is discarded whole with a warning, never partially used.
pub fn load_snapshot(path: &Path) -> Snapshot {
    if !path.exists() {
        tracing::info!(path = %sanitize_path(path), "Snapshot not found, treating as empty");
        return Snapshot::new();
    }

    match read_snapshot(path) {
        Ok(SnapshotFile { snapshot, duplicates }) => {
            if duplicates > 0 {
                tracing::warn!(
                    path = %sanitize_path(path),
                    duplicates,
                    "Snapshot repeats item ids, keeping the last row of each"
                );
            }
            tracing::debug!(path = %sanitize_path(path), items = snapshot.len(), "Loaded snapshot");
            snapshot
        }
        Err(e) => {
            tracing::warn!(path = %sanitize_path(path), error = %e, "Discarding unreadable snapshot");
            Snapshot::new()
        }
    }
}

/// Write items as a snapshot CSV with the canonical header.
pub fn write_snapshot<'a>(path: &Path, items: impl IntoIterator<Item = &'a ItemSnapshot>) -> Result<()> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for item in items {
        writer.serialize(item)?;
    }
    let bytes = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
    write_atomic(path, &bytes)
}
