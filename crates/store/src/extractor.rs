//! Read-only extraction from an Anki profile's `collection.anki2`
//!
//! Produces one snapshot row per card and a per-day summary of the review
//! log. The collection is opened read-only; Anki's `.colpkg` backups are not
//! read.

use crate::documents::save_review_counts;
use crate::error::{Error, Result};
use crate::snapshot_csv::write_snapshot;

use chrono::{Days, Local, NaiveDateTime, TimeZone};
use rusqlite::{Connection, OpenFlags};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use studylog_core::logging::sanitize_path;
use studylog_core::{Clock, DAY_FORMAT, DailyReviewCount, ItemSnapshot, Level, RawActivitySummary};

/// File name of the live collection database
pub const COLLECTION_FILE: &str = "collection.anki2";

/// File name of the raw activity summary written next to snapshots
pub const REVIEW_COUNTS_FILE: &str = "review_counts.json";

const REVIEW_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const CARDS_QUERY: &str = "
    SELECT
        c.id,
        d.name,
        c.ivl,
        n.flds,
        (SELECT MIN(r.id) FROM revlog r WHERE r.cid = c.id),
        (SELECT MAX(r.id) FROM revlog r WHERE r.cid = c.id)
    FROM cards c
    JOIN notes n ON c.nid = n.id
    JOIN decks d ON c.did = d.id
    WHERE c.queue >= 0
    ORDER BY n.id, c.ord
";

const REVLOG_QUERY: &str = "SELECT id, ease, time FROM revlog WHERE id >= ?1 ORDER BY id";

/// Platform default Anki2 directory for `profile`.
pub fn default_profile_dir(profile: &str) -> Result<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        home_dir()?.join("Library").join("Application Support").join("Anki2")
    } else if cfg!(target_os = "windows") {
        let appdata = env::var("APPDATA")
            .map(PathBuf::from)
            .or_else(|_| home_dir().map(|home| home.join("AppData").join("Roaming")))?;
        appdata.join("Anki2")
    } else if cfg!(target_os = "linux") {
        home_dir()?.join(".local").join("share").join("Anki2")
    } else {
        return Err(Error::UnsupportedPlatform(env::consts::OS.to_string()));
    };

    Ok(base.join(profile))
}

fn home_dir() -> Result<PathBuf> {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .map_err(|_| Error::data_dir_not_found("~"))
}

/// The profile directory to read: `data_dir` when given, else the platform default.
pub fn locate_profile_dir(data_dir: Option<&Path>, profile: &str) -> Result<PathBuf> {
    let dir = match data_dir {
        Some(dir) => dir.to_path_buf(),
        None => default_profile_dir(profile)?,
    };

    if !dir.is_dir() {
        return Err(Error::data_dir_not_found(dir));
    }
    Ok(dir)
}

/// Path of `collection.anki2` inside a profile directory.
pub fn find_collection(profile_dir: &Path) -> Result<PathBuf> {
    let collection = profile_dir.join(COLLECTION_FILE);
    if collection.is_file() {
        return Ok(collection);
    }

    if has_colpkg_backups(&profile_dir.join("backups")) {
        tracing::warn!(
            dir = %sanitize_path(profile_dir),
            "Only .colpkg backups found; close Anki and make sure collection.anki2 exists"
        );
    }

    Err(Error::collection_not_found(profile_dir))
}

fn has_colpkg_backups(dir: &Path) -> bool {
    fs::read_dir(dir).is_ok_and(|entries| {
        entries
            .filter_map(|entry| entry.ok())
            .any(|entry| entry.path().extension().is_some_and(|ext| ext == "colpkg"))
    })
}

/// Local wall-clock time of an Anki millisecond timestamp
fn local_time(millis: i64) -> Option<NaiveDateTime> {
    Local.timestamp_millis_opt(millis).single().map(|dt| dt.naive_local())
}

fn split_fields(fields: &str) -> (String, String) {
    let mut parts = fields.split('\x1f');
    let primary = parts.next().unwrap_or_default().to_string();
    let secondary = parts.next().unwrap_or_default().to_string();
    (primary, secondary)
}

/// An open, read-only Anki collection
pub struct Collection {
    conn: Connection,
}

impl Collection {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        tracing::debug!(path = %sanitize_path(path), "Opened collection");
        Ok(Self { conn })
    }

    /// One snapshot item per live card, keyed by card id
    pub fn items(&self) -> Result<Vec<ItemSnapshot>> {
        let mut stmt = self.conn.prepare(CARDS_QUERY)?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<i64>>(4)?,
                row.get::<_, Option<i64>>(5)?,
            ))
        })?;

        let format = |millis: Option<i64>| {
            millis
                .and_then(local_time)
                .map(|time| time.format(REVIEW_TIME_FORMAT).to_string())
                .unwrap_or_default()
        };

        let mut items = Vec::new();
        for row in rows {
            let (card_id, deck, interval, fields, first_review, last_review) = row?;
            let (primary, secondary) = split_fields(&fields);
            items.push(
                ItemSnapshot::new(
                    card_id.to_string(),
                    Level::from_interval(interval).as_str(),
                    deck.replace('\x1f', "::"),
                )
                .with_first_study(format(first_review))
                .with_last_review(format(last_review))
                .with_text(primary, secondary),
            );
        }

        tracing::debug!(cards = items.len(), "Read cards from collection");
        Ok(items)
    }

    /// Review counts per local day for the last `retention_days` days
    pub fn review_counts(&self, retention_days: u32, clock: &dyn Clock) -> Result<RawActivitySummary> {
        let cutoff = clock
            .today()
            .checked_sub_days(Days::new(u64::from(retention_days)))
            .and_then(|day| day.and_hms_opt(0, 0, 0))
            .and_then(|midnight| Local.from_local_datetime(&midnight).earliest())
            .map_or(0, |dt| dt.timestamp_millis());

        let mut stmt = self.conn.prepare(REVLOG_QUERY)?;
        let rows = stmt.query_map([cutoff], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, i64>(2)?))
        })?;

        let mut days: BTreeMap<String, DailyReviewCount> = BTreeMap::new();
        for row in rows {
            let (id, ease, time) = row?;
            let Some(reviewed_at) = local_time(id) else {
                continue;
            };

            let day = days.entry(reviewed_at.format(DAY_FORMAT).to_string()).or_insert(DailyReviewCount {
                reviews: 0,
                successful: 0,
                avg_time: 0.0,
                total_time: 0,
            });
            day.reviews += 1;
            if ease > 0 {
                day.successful += 1;
            }
            day.total_time += u64::try_from(time).unwrap_or(0);
        }

        for day in days.values_mut() {
            day.avg_time = day.total_time as f64 / day.reviews as f64;
        }

        Ok(RawActivitySummary::new(days, clock.timestamp()))
    }
}

/// Everything read from a collection in one run
#[derive(Debug, Clone)]
pub struct Extraction {
    pub items: Vec<ItemSnapshot>,
    pub review_counts: RawActivitySummary,
}

/// Files written by [`write_exports`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub snapshot: PathBuf,
    pub review_counts: PathBuf,
}

/// Read cards and review counts from the collection in `profile_dir`.
pub fn extract(profile_dir: &Path, retention_days: u32, clock: &dyn Clock) -> Result<Extraction> {
    let collection = Collection::open(&find_collection(profile_dir)?)?;
    let items = collection.items()?;
    let review_counts = collection.review_counts(retention_days, clock)?;

    tracing::info!(
        cards = items.len(),
        days = review_counts.total_days,
        "Extracted collection data"
    );
    Ok(Extraction { items, review_counts })
}

/// Write `snapshot_<today>.csv` and `review_counts.json` into `output_dir`.
pub fn write_exports(output_dir: &Path, extraction: &Extraction, clock: &dyn Clock) -> Result<ExportPaths> {
    let paths = ExportPaths {
        snapshot: output_dir.join(format!("snapshot_{}.csv", clock.today_key())),
        review_counts: output_dir.join(REVIEW_COUNTS_FILE),
    };

    write_snapshot(&paths.snapshot, &extraction.items)?;
    save_review_counts(&paths.review_counts, &extraction.review_counts)?;
    Ok(paths)
}
