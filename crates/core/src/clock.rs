//! Time source used for defaulting dates and stamping metadata
//!
//! Every "now" read in detection and merging goes through a [`Clock`], so tests
//! can pin the current day instead of depending on wall-clock time.

use chrono::{Local, NaiveDate, NaiveDateTime};

/// Format used for day keys in the activity log
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Format used for metadata and level-change timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Source of the current local wall-clock time
pub trait Clock: Send + Sync {
    /// Current local date and time
    fn now(&self) -> NaiveDateTime;

    /// Current local calendar day
    fn today(&self) -> NaiveDate {
        self.now().date()
    }

    /// Current day formatted as a `YYYY-MM-DD` key
    fn today_key(&self) -> String {
        self.today().format(DAY_FORMAT).to_string()
    }

    /// Current time formatted as an ISO 8601 timestamp
    fn timestamp(&self) -> String {
        self.now().format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Clock backed by the system's local time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock frozen at a single instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock {
    now: NaiveDateTime,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now }
    }

    /// Clock fixed at noon of the given day
    pub fn at_noon(day: NaiveDate) -> Self {
        Self { now: day.and_hms_opt(12, 0, 0).unwrap_or_default() }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.now
    }
}
