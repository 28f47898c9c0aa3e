//! # Counter history on disk
//!
//! One gzip-compressed JSON file per (category, metric, key). Each file holds
//! the ordered `(value, timestamp)` snapshots of a single cumulative counter,
//! which is enough to answer "how much did this grow since X" without keeping
//! old dumps around.
//!
//! Writes are full-file replacements. There is no locking: the refresh cycle
//! guarantees a single writer per path.

pub mod series;
pub mod storage;

pub use series::{TimeSeries, TimeSeriesEntry, COMPACTION_WINDOW_DAYS};
pub use storage::{series_key, series_path, shadowed_keys, update_series, SeriesStore};

/// Which kind of entity a series belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Character,
    Guild,
    Realm,
    Class,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Character => "character",
            Category::Guild => "guild",
            Category::Realm => "realm",
            Category::Class => "class",
        }
    }
}

/// Which counter a series records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Xp,
    Rp,
    /// Number of characters in a guild, realm or class
    Count,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Xp => "xp",
            Metric::Rp => "rp",
            Metric::Count => "count",
        }
    }
}
