pub mod activity;
pub mod clock;
pub mod config;
pub mod delta;
pub mod error;
pub mod logging;
pub mod review_counts;
pub mod snapshot;
pub mod summary;
pub mod timestamp;

pub use activity::{
    ActivityLog, DEFAULT_RETENTION_DAYS, DayMerge, DayRecord, DayStats, EntryKind, LOG_VERSION, LevelChangeEntry,
    LogMetadata, MergeReport, NewStudyEntry, ReviewEntry,
};
pub use clock::{Clock, DAY_FORMAT, FixedClock, SystemClock, TIMESTAMP_FORMAT};
pub use config::{Config, ConfigError, DEFAULT_CONFIG_FILE, ExtractConfig, FileLoggingConfig};
pub use delta::{DeltaSet, DetectionMetadata, LevelChangeDelta, NewStudyDelta, ReviewDelta, detect};
pub use error::{Error, Result};
pub use logging::{LogFormat, init_logging, sanitize_path};
pub use review_counts::{DailyReviewCount, RawActivitySummary};
pub use snapshot::{ItemSnapshot, Level, Snapshot};
pub use summary::SummaryStats;
pub use timestamp::{date_in_file_name, day_key, parse_day, snapshot_date_for};
