//! Ordered counter history with in-place dedup, compaction and windowed deltas

use {
    chrono::{DateTime, TimeDelta, Utc},
    serde::{Deserialize, Deserializer, Serialize},
};

/// Entries closer together than this collapse into one on `compact()`
pub const COMPACTION_WINDOW_DAYS: i64 = 30;

/// One counter snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TimeSeriesEntry {
    pub value: u64,
    pub timestamp: DateTime<Utc>,
}

/// Counter history of one metric for one entity
///
/// Invariant: entries are strictly increasing by timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TimeSeries {
    #[serde(default, deserialize_with = "null_as_empty")]
    entries: Vec<TimeSeriesEntry>,
}

// Older files were written with `"Entries": null` for empty series.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<TimeSeriesEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<TimeSeriesEntry>>::deserialize(deserializer)?.unwrap_or_default())
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a series from arbitrary entries, restoring the ordering invariant
    ///
    /// When several entries share a timestamp the last one wins.
    pub fn from_entries(entries: Vec<TimeSeriesEntry>) -> Self {
        let mut series = Self { entries };
        series.normalize();
        series
    }

    pub fn entries(&self) -> &[TimeSeriesEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&TimeSeriesEntry> {
        self.entries.last()
    }

    /// Record `value` at `timestamp`
    ///
    /// Returns `true` when a new entry was inserted. An existing entry with the
    /// same timestamp is overwritten in place and `false` is returned, so the
    /// caller can skip rewriting the file.
    ///
    /// The duplicate scan walks backwards from the newest entry and stops at the
    /// first older timestamp; snapshots arrive nearly in order, so this usually
    /// looks at one entry.
    pub fn append(&mut self, value: u64, timestamp: DateTime<Utc>) -> bool {
        for entry in self.entries.iter_mut().rev() {
            if entry.timestamp < timestamp {
                break;
            }
            if entry.timestamp == timestamp {
                entry.value = value;
                return false;
            }
        }

        let idx = self.entries.partition_point(|e| e.timestamp < timestamp);
        self.entries.insert(idx, TimeSeriesEntry { value, timestamp });
        true
    }

    /// Collapse entries closer than `COMPACTION_WINDOW_DAYS` into one
    ///
    /// Buckets are anchored on the newest entry and grow backwards in time. Each
    /// bucket keeps the anchor's timestamp with the largest value seen in the
    /// bucket; for a counter that never decreases this is the anchor itself.
    /// Remaining entries are at least one window apart. Lossy: the finer
    /// history inside a window is gone afterwards.
    pub fn compact(&mut self) {
        let window = TimeDelta::days(COMPACTION_WINDOW_DAYS);
        let mut newest_first = self.entries.iter().rev().copied();
        let Some(mut current) = newest_first.next() else {
            return;
        };

        let mut kept = Vec::with_capacity(self.entries.len());
        for entry in newest_first {
            if current.timestamp - entry.timestamp < window {
                current.value = current.value.max(entry.value);
            } else {
                kept.push(current);
                current = entry;
            }
        }
        kept.push(current);
        kept.reverse();

        self.entries = kept;
    }

    /// All entries strictly after `date`, oldest first
    pub fn entries_since(&self, date: DateTime<Utc>) -> &[TimeSeriesEntry] {
        let start = self.entries.partition_point(|e| e.timestamp <= date);
        &self.entries[start..]
    }

    /// Growth of the counter since `date`
    ///
    /// - no entries after `date`: 0
    /// - a single entry and no earlier history: that entry's value
    /// - otherwise `last - first`, where `first` is the newest entry at or
    ///   before `date` if there is one, else the oldest entry after it
    ///
    /// The subtraction is order-corrected: if `first` is not older than `last`
    /// the operands are swapped. This hides data that violates the
    /// never-decreasing assumption instead of reporting a negative jump from a
    /// stale entry; a genuine decrease is still reported as negative.
    pub fn value_since(&self, date: DateTime<Utc>) -> i64 {
        let start = self.entries.partition_point(|e| e.timestamp <= date);
        let window = &self.entries[start..];

        let (first, last) = match (start.checked_sub(1), window) {
            (_, []) => return 0,
            (None, [only]) => return clamp_i64(i128::from(only.value)),
            (Some(before), [.., last]) => (&self.entries[before], last),
            (None, [first, .., last]) => (first, last),
        };

        if first.timestamp < last.timestamp {
            clamp_i64(i128::from(last.value) - i128::from(first.value))
        } else {
            clamp_i64(i128::from(first.value) - i128::from(last.value))
        }
    }

    /// Restore the ordering invariant after decoding a file
    pub(crate) fn normalize(&mut self) {
        self.entries.sort_by_key(|e| e.timestamp);
        // keep the last of each run of equal timestamps
        let mut deduped: Vec<TimeSeriesEntry> = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            match deduped.last_mut() {
                Some(prev) if prev.timestamp == entry.timestamp => *prev = entry,
                _ => deduped.push(entry),
            }
        }
        self.entries = deduped;
    }
}

fn clamp_i64(v: i128) -> i64 {
    v.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}
