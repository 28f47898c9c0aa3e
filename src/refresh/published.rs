//! The snapshot readers see

use {
    crate::{
        error::{HeraldError, Result},
        models::{Character, Guild},
        pipeline::{Statistics, MAX_RESULTS},
        search::PrefixIndex,
    },
    arc_swap::ArcSwapOption,
    chrono::{DateTime, Utc},
    std::sync::Arc,
};

/// Finished statistics of one cycle plus its search indexes
#[derive(Debug)]
pub struct Snapshot {
    pub statistics: Statistics,
    /// Lower-cased character name to character key
    characters: PrefixIndex<String>,
    /// Lower-cased guild name to display name
    guilds: PrefixIndex<String>,
    pub published_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(statistics: Statistics, published_at: DateTime<Utc>) -> Self {
        let characters = statistics
            .characters
            .iter()
            .map(|(key, c)| (c.name.as_str(), key.clone()))
            .collect();
        let guilds = statistics
            .guilds
            .keys()
            .filter(|name| !name.is_empty())
            .map(|name| (name.as_str(), name.clone()))
            .collect();

        Self {
            statistics,
            characters,
            guilds,
            published_at,
        }
    }

    /// Characters whose name starts with `prefix`, case-insensitive
    pub fn search_characters(&self, prefix: &str, limit: usize) -> Vec<&Character> {
        self.characters
            .walk_prefix(prefix, limit.min(MAX_RESULTS))
            .filter_map(|key| self.statistics.characters.get(key))
            .collect()
    }

    pub fn search_guilds(&self, prefix: &str, limit: usize) -> Vec<&Guild> {
        self.guilds
            .walk_prefix(prefix, limit.min(MAX_RESULTS))
            .filter_map(|name| self.statistics.guilds.get(name))
            .collect()
    }
}

/// Holder of the current snapshot
///
/// Readers take an `Arc` and keep using it for as long as they like; a new
/// publication replaces the pointer as a whole and never touches the old one.
#[derive(Debug, Default)]
pub struct PublishedStatistics {
    current: ArcSwapOption<Snapshot>,
}

impl PublishedStatistics {
    pub fn new() -> Self {
        Self {
            current: ArcSwapOption::empty(),
        }
    }

    pub fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        self.current.store(Some(Arc::clone(&snapshot)));
        snapshot
    }

    /// `None` until the first cycle succeeded
    pub fn load(&self) -> Option<Arc<Snapshot>> {
        self.current.load_full()
    }

    pub fn current(&self) -> Result<Arc<Snapshot>> {
        self.load()
            .ok_or_else(|| HeraldError::not_found("statistics (no refresh has completed yet)"))
    }
}
