//! Fan-out of one cycle's counters into the series store
//!
//! Four groups (guilds, realms, classes, characters) are written on their own
//! blocking tasks. Within a group paths are written one after the other, and no
//! path belongs to more than one group, so no file ever has two writers.

use {
    crate::{
        models::Character,
        pipeline::{Query, Statistics},
        timeseries::{shadowed_keys, Category, Metric, SeriesStore},
    },
    chrono::{DateTime, Utc},
    std::collections::{HashMap, HashSet},
    tokio::task::JoinSet,
};

/// One value to record in one series
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesUpdate {
    pub category: Category,
    pub metric: Metric,
    pub key: String,
    pub value: u64,
    pub timestamp: DateTime<Utc>,
}

/// Every write of one cycle, grouped by writer task
#[derive(Debug, Clone, Default)]
pub struct UpdatePlan {
    pub guilds: Vec<SeriesUpdate>,
    pub realms: Vec<SeriesUpdate>,
    pub classes: Vec<SeriesUpdate>,
    pub characters: Vec<SeriesUpdate>,
}

impl UpdatePlan {
    /// Derive the writes for `stats`
    ///
    /// Aggregates are stamped with the cycle `timestamp`; characters carry
    /// their own last update time and fall back to `timestamp` when the dump
    /// has none. The unguilded bucket gets no history, and neither does a key
    /// that shares its file with another key of the same category.
    pub fn from_statistics(stats: &Statistics, timestamp: DateTime<Utc>) -> Self {
        let guilds = series_holders(Category::Guild, &stats.by_guild)
            .filter(|(name, _)| !name.is_empty())
            .flat_map(|(name, query)| aggregate_updates(Category::Guild, name, query, timestamp))
            .collect();

        let realms = series_holders(Category::Realm, &stats.by_realm)
            .flat_map(|(name, query)| aggregate_updates(Category::Realm, name, query, timestamp))
            .collect();

        let classes = series_holders(Category::Class, &stats.by_class)
            .flat_map(|(name, query)| aggregate_updates(Category::Class, name, query, timestamp))
            .collect();

        let characters = character_updates(&stats.characters, timestamp);

        Self {
            guilds,
            realms,
            classes,
            characters,
        }
    }

    pub fn len(&self) -> usize {
        self.guilds.len() + self.realms.len() + self.classes.len() + self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Entries of `map` that own their series file
fn series_holders<V>(
    category: Category,
    map: &HashMap<String, V>,
) -> impl Iterator<Item = (&String, &V)> {
    let shadowed: HashSet<String> = shadowed_keys(map.keys().map(String::as_str));
    for key in &shadowed {
        log::warn!(
            "⚠️  {} {} shares its series file with another {}, not recording it",
            category.as_str(),
            key,
            category.as_str()
        );
    }
    map.iter().filter(move |(key, _)| !shadowed.contains(key.as_str()))
}

fn aggregate_updates(
    category: Category,
    key: &str,
    query: &Query,
    timestamp: DateTime<Utc>,
) -> [SeriesUpdate; 3] {
    let update = |metric, value| SeriesUpdate {
        category,
        metric,
        key: key.to_string(),
        value,
        timestamp,
    };

    [
        update(Metric::Count, query.len() as u64),
        update(Metric::Xp, query.total_xp),
        update(Metric::Rp, query.total_rp),
    ]
}

fn character_updates(
    characters: &HashMap<String, Character>,
    fallback: DateTime<Utc>,
) -> Vec<SeriesUpdate> {
    let mut updates = Vec::with_capacity(characters.len() * 2);
    for (key, c) in series_holders(Category::Character, characters) {
        let timestamp = c.updated_at().unwrap_or(fallback);
        for (metric, value) in [(Metric::Xp, c.xp), (Metric::Rp, c.rp)] {
            updates.push(SeriesUpdate {
                category: Category::Character,
                metric,
                key: key.clone(),
                value,
                timestamp,
            });
        }
    }
    updates
}

/// Outcome of one write pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteReport {
    /// Files rewritten
    pub written: usize,
    /// Appends that only touched an existing timestamp
    pub unchanged: usize,
    /// Writes that hit an I/O error, plus every write of a group whose task died
    pub failed: usize,
}

impl WriteReport {
    fn merge(&mut self, other: WriteReport) {
        self.written += other.written;
        self.unchanged += other.unchanged;
        self.failed += other.failed;
    }
}

/// Write every group of `plan` and wait for all of them
///
/// Failures are logged and counted; they never stop the other writes.
pub async fn write_timeseries(store: &SeriesStore, plan: UpdatePlan) -> WriteReport {
    let groups = [
        ("guild", plan.guilds),
        ("realm", plan.realms),
        ("class", plan.classes),
        ("character", plan.characters),
    ];

    let mut tasks = JoinSet::new();
    let mut sizes = HashMap::new();
    for (name, updates) in groups {
        sizes.insert(name, updates.len());
        let store = store.clone();
        tasks.spawn_blocking(move || (name, write_group(&store, name, &updates)));
    }

    let mut report = WriteReport::default();
    let mut finished = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((name, group)) => {
                log::debug!(
                    "   ├─ {} series: {} written, {} unchanged, {} failed",
                    name,
                    group.written,
                    group.unchanged,
                    group.failed
                );
                sizes.remove(name);
                finished += 1;
                report.merge(group);
            }
            Err(e) => log::error!("❌ Series writer task failed: {}", e),
        }
    }

    // whatever is left in `sizes` belongs to a task that never reported back
    let lost: usize = sizes.values().sum();
    if lost > 0 {
        log::warn!("⚠️  {} series writes lost with their task", lost);
        report.failed += lost;
    }

    log::debug!("   └─ {} of 4 writer groups finished", finished);
    report
}

fn write_group(store: &SeriesStore, name: &str, updates: &[SeriesUpdate]) -> WriteReport {
    let mut report = WriteReport::default();
    for u in updates {
        match store.update(u.category, u.metric, &u.key, u.value, u.timestamp) {
            Ok(true) => report.written += 1,
            Ok(false) => report.unchanged += 1,
            Err(e) => {
                log::warn!(
                    "⚠️  Failed to save {} {} series for {}: {}",
                    name,
                    u.metric.as_str(),
                    u.key,
                    e
                );
                report.failed += 1;
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CharacterSnapshot;
    use tempfile::tempdir;

    fn character(name: &str, guild: &str, rp: u64, xp: u64, last_updated: i64) -> Character {
        Character {
            name: name.to_string(),
            guild: guild.to_string(),
            realm: "Albion".to_string(),
            class: "Cleric".to_string(),
            rp,
            xp,
            last_updated,
            ..Default::default()
        }
    }

    fn stats() -> Statistics {
        let snap: CharacterSnapshot = [
            character("Aeric", "Lords", 100, 1_000, 1_700_000_000),
            character("Brin", "Lords", 50, 2_000, 0),
            character("Dax", "", 25, 4_000, 1_700_000_500),
        ]
        .into_iter()
        .map(|c| (c.name.to_lowercase(), c))
        .collect();
        Statistics::from_snapshot(snap, DateTime::from_timestamp(1_700_000_500, 0).unwrap())
    }

    #[test]
    fn test_plan_groups() {
        let stats = stats();
        let ts = stats.timestamp;
        let plan = UpdatePlan::from_statistics(&stats, ts);

        // the unguilded bucket gets no series
        assert_eq!(plan.guilds.len(), 3);
        assert!(plan.guilds.iter().all(|u| u.key == "Lords"));
        assert_eq!(plan.realms.len(), 3);
        assert_eq!(plan.classes.len(), 3);
        assert_eq!(plan.characters.len(), 6);
        assert_eq!(plan.len(), 15);
    }

    #[test]
    fn test_realm_xp_records_total_xp() {
        let stats = stats();
        let plan = UpdatePlan::from_statistics(&stats, stats.timestamp);

        let xp = plan.realms.iter().find(|u| u.metric == Metric::Xp).unwrap();
        assert_eq!(xp.value, 7_000);
        let count = plan.realms.iter().find(|u| u.metric == Metric::Count).unwrap();
        assert_eq!(count.value, 3);
    }

    #[test]
    fn test_character_timestamps() {
        let stats = stats();
        let cycle = DateTime::from_timestamp(1_800_000_000, 0).unwrap();
        let plan = UpdatePlan::from_statistics(&stats, cycle);

        let aeric = plan.characters.iter().find(|u| u.key == "aeric").unwrap();
        assert_eq!(aeric.timestamp.timestamp(), 1_700_000_000);
        // no update time in the dump: cycle timestamp
        let brin = plan.characters.iter().find(|u| u.key == "brin").unwrap();
        assert_eq!(brin.timestamp, cycle);
    }

    #[test]
    fn test_case_clashing_keys_are_not_planned() {
        let snap: CharacterSnapshot = [
            ("aeric", character("Aeric", "Lords", 100, 0, 1_700_000_000)),
            ("Aeric", character("Aeric", "lords", 5_000, 0, 1_700_000_000)),
        ]
        .into_iter()
        .map(|(key, c)| (key.to_string(), c))
        .collect();
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let stats = Statistics::from_snapshot(snap, at);
        let plan = UpdatePlan::from_statistics(&stats, stats.timestamp);

        // one writer per file: the smaller spelling keeps it
        assert_eq!(plan.guilds.len(), 3);
        assert!(plan.guilds.iter().all(|u| u.key == "Lords"));
        assert_eq!(plan.characters.len(), 2);
        assert!(plan.characters.iter().all(|u| u.key == "Aeric"));
    }

    #[tokio::test]
    async fn test_write_then_rewrite_is_unchanged() {
        let dir = tempdir().unwrap();
        let store = SeriesStore::new(dir.path());
        let stats = stats();

        let plan = UpdatePlan::from_statistics(&stats, stats.timestamp);
        let report = write_timeseries(&store, plan.clone()).await;
        assert_eq!(report, WriteReport { written: 15, unchanged: 0, failed: 0 });

        let report = write_timeseries(&store, plan).await;
        assert_eq!(report, WriteReport { written: 0, unchanged: 15, failed: 0 });

        let lords = store.open(Category::Guild, Metric::Rp, "Lords").unwrap().unwrap();
        assert_eq!(lords.last().unwrap().value, 150);
    }

    #[tokio::test]
    async fn test_write_failure_is_counted() {
        let dir = tempdir().unwrap();
        // a plain file where the realm directory should be
        std::fs::write(dir.path().join("realm"), b"").unwrap();
        let store = SeriesStore::new(dir.path());
        let stats = stats();

        let plan = UpdatePlan::from_statistics(&stats, stats.timestamp);
        let report = write_timeseries(&store, plan).await;
        assert_eq!(report.failed, 3);
        assert_eq!(report.written, 12);
    }
}
