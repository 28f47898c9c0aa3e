//! Last-week gains read back from the series store

use {
    crate::{
        models::Character,
        pipeline::{query::rank_characters, statistics::rank_guilds, Query, Statistics},
        timeseries::{shadowed_keys, Category, Metric, SeriesStore},
    },
    chrono::{DateTime, Utc},
    std::collections::{HashMap, HashSet},
};

/// Attach last-week values to characters, guilds and queries, then rank movers
///
/// Must run after this cycle's writes are on disk. Entities without history
/// count as zero, and so do keys whose file belongs to another key.
pub fn apply_last_week(stats: &mut Statistics, store: &SeriesStore, since: DateTime<Utc>) {
    let gains = Gains { store, since };

    log::info!("📈 Calculating character last-week gains");
    let shadowed = shadowed_keys(stats.characters.keys().map(String::as_str));
    for (key, c) in stats.characters.iter_mut() {
        c.last_week_rp = gains.of(Category::Character, Metric::Rp, key, &shadowed);
        c.last_week_xp = gains.of(Category::Character, Metric::Xp, key, &shadowed);
    }

    let members: Vec<(&String, &Character)> = stats.characters.iter().collect();
    stats.lw_rp_characters = rank_characters(&members, |c| c.last_week_rp);
    stats.lw_xp_characters = rank_characters(&members, |c| c.last_week_xp);

    log::info!("📈 Calculating guild last-week gains");
    let shadowed = shadowed_keys(stats.guilds.keys().map(String::as_str));
    for (name, guild) in stats.guilds.iter_mut() {
        if name.is_empty() {
            continue;
        }
        guild.lw_rp = gains.of(Category::Guild, Metric::Rp, name, &shadowed);
        guild.lw_xp = gains.of(Category::Guild, Metric::Xp, name, &shadowed);

        if let Some(query) = stats.by_guild.get_mut(name) {
            query.lw_rp = guild.lw_rp;
            query.lw_xp = guild.lw_xp;
        }
    }
    stats.lw_rp_guilds = rank_guilds(&stats.guilds, |g| g.lw_rp);
    stats.lw_xp_guilds = rank_guilds(&stats.guilds, |g| g.lw_xp);

    log::info!("📈 Calculating class and realm last-week gains");
    gains.apply_to_queries(&mut stats.by_class, Category::Class);
    gains.apply_to_queries(&mut stats.by_realm, Category::Realm);
}

struct Gains<'a> {
    store: &'a SeriesStore,
    since: DateTime<Utc>,
}

impl Gains<'_> {
    fn of(
        &self,
        category: Category,
        metric: Metric,
        key: &str,
        shadowed: &HashSet<String>,
    ) -> i64 {
        if shadowed.contains(key) {
            return 0;
        }
        match self.store.open(category, metric, key) {
            Ok(Some(ts)) => ts.value_since(self.since),
            Ok(None) => 0,
            Err(e) => {
                log::warn!(
                    "⚠️  Failed to read {} {} series for {}: {}",
                    category.as_str(),
                    metric.as_str(),
                    key,
                    e
                );
                0
            }
        }
    }

    fn apply_to_queries(&self, queries: &mut HashMap<String, Query>, category: Category) {
        let shadowed = shadowed_keys(queries.keys().map(String::as_str));
        for (name, query) in queries.iter_mut() {
            query.lw_rp = self.of(category, Metric::Rp, name, &shadowed);
            query.lw_xp = self.of(category, Metric::Xp, name, &shadowed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::CharacterSnapshot,
        refresh::writer::{write_timeseries, UpdatePlan},
    };
    use chrono::TimeDelta;
    use tempfile::tempdir;

    fn day(n: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap() + TimeDelta::days(n)
    }

    fn snapshot(at: DateTime<Utc>, rp: [u64; 3]) -> CharacterSnapshot {
        [("Aeric", "Lords", rp[0]), ("Brin", "Wolves", rp[1]), ("Dax", "", rp[2])]
            .into_iter()
            .map(|(name, guild, rp)| {
                let c = Character {
                    name: name.to_string(),
                    guild: guild.to_string(),
                    realm: "Albion".to_string(),
                    class: "Cleric".to_string(),
                    rp,
                    xp: rp * 10,
                    last_updated: at.timestamp(),
                    ..Default::default()
                };
                (name.to_lowercase(), c)
            })
            .collect()
    }

    async fn cycle(store: &SeriesStore, at: DateTime<Utc>, rp: [u64; 3]) -> Statistics {
        let stats = Statistics::from_snapshot(snapshot(at, rp), at);
        write_timeseries(store, UpdatePlan::from_statistics(&stats, at)).await;
        stats
    }

    #[tokio::test]
    async fn test_last_week_gains_and_rankings() {
        let dir = tempdir().unwrap();
        let store = SeriesStore::new(dir.path());

        cycle(&store, day(0), [100, 100, 100]).await;
        let mut stats = cycle(&store, day(3), [150, 400, 110]).await;
        apply_last_week(&mut stats, &store, day(3) - TimeDelta::days(8));

        assert_eq!(stats.characters["aeric"].last_week_rp, 50);
        assert_eq!(stats.characters["brin"].last_week_rp, 300);
        assert_eq!(stats.characters["brin"].last_week_xp, 3_000);
        assert_eq!(stats.lw_rp_characters, vec!["brin", "aeric", "dax"]);

        assert_eq!(stats.guilds["Wolves"].lw_rp, 300);
        assert_eq!(stats.by_guild["Lords"].lw_rp, 50);
        assert_eq!(stats.lw_rp_guilds, vec!["Wolves", "Lords"]);
        // unguilded bucket has no history and no ranking slot
        assert_eq!(stats.guilds[""].lw_rp, 0);

        assert_eq!(stats.by_realm["Albion"].lw_rp, 360);
        assert_eq!(stats.by_class["Cleric"].lw_xp, 3_600);
    }

    #[tokio::test]
    async fn test_no_history_is_zero() {
        let dir = tempdir().unwrap();
        let store = SeriesStore::new(dir.path());
        let mut stats = Statistics::from_snapshot(snapshot(day(0), [1, 2, 3]), day(0));

        apply_last_week(&mut stats, &store, day(-8));

        assert!(stats.characters.values().all(|c| c.last_week_rp == 0));
        // ties fall back to name order
        assert_eq!(stats.lw_rp_characters, vec!["aeric", "brin", "dax"]);
        assert_eq!(stats.lw_xp_guilds, vec!["Lords", "Wolves"]);
    }

    #[tokio::test]
    async fn test_guilds_differing_in_case_do_not_share_history() {
        let dir = tempdir().unwrap();
        let store = SeriesStore::new(dir.path());

        let member = |key: &str, guild: &str, rp: u64, at: DateTime<Utc>| {
            let c = Character {
                name: key.to_string(),
                guild: guild.to_string(),
                realm: "Albion".to_string(),
                class: "Cleric".to_string(),
                rp,
                last_updated: at.timestamp(),
                ..Default::default()
            };
            (key.to_string(), c)
        };

        let mut last = None;
        for (at, upper, lower) in [(day(0), 100, 5_000), (day(3), 150, 9_000)] {
            let snap: CharacterSnapshot =
                [member("aeric", "Lords", upper, at), member("brin", "lords", lower, at)]
                    .into_iter()
                    .collect();
            let stats = Statistics::from_snapshot(snap, at);
            write_timeseries(&store, UpdatePlan::from_statistics(&stats, at)).await;
            last = Some(stats);
        }
        let mut stats = last.unwrap();
        apply_last_week(&mut stats, &store, day(3) - TimeDelta::days(8));

        assert_eq!(stats.guilds["Lords"].lw_rp, 50);
        // "lords" has no file of its own and does not borrow the other one
        assert_eq!(stats.guilds["lords"].lw_rp, 0);

        let history = store.history(Category::Guild, Metric::Rp, "Lords").unwrap();
        let values: Vec<u64> = history.entries().iter().map(|e| e.value).collect();
        assert_eq!(values, vec![100, 150]);
    }
}
