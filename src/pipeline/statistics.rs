//! Root aggregate of one refresh cycle

use {
    super::query::Query,
    crate::{
        error::{HeraldError, Result},
        models::{Character, CharacterSnapshot, Guild},
    },
    chrono::{DateTime, Utc},
    std::{cmp::Reverse, collections::HashMap},
};

/// Upper bound for every ranked list handed to readers
pub const MAX_RESULTS: usize = 1000;

/// Everything computed from one snapshot
///
/// Built by `from_snapshot`, completed by the refresh cycle (last-week values
/// and movers), then published and never touched again.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    /// Logical time of the snapshot
    pub timestamp: DateTime<Utc>,

    /// Every character of the snapshot, by key
    pub characters: HashMap<String, Character>,

    /// All characters
    pub global: Query,
    pub by_realm: HashMap<String, Query>,
    pub by_class: HashMap<String, Query>,
    /// Includes the unguilded bucket `""`
    pub by_guild: HashMap<String, Query>,

    /// One entry per by-guild key, unguilded bucket included
    pub guilds: HashMap<String, Guild>,
    /// Guild names, unguilded bucket excluded
    pub top_rp_guilds: Vec<String>,
    pub top_xp_guilds: Vec<String>,
    pub lw_rp_guilds: Vec<String>,
    pub lw_xp_guilds: Vec<String>,

    /// Character keys ranked by last-week gain
    pub lw_rp_characters: Vec<String>,
    pub lw_xp_characters: Vec<String>,
}

impl Statistics {
    /// Aggregate a snapshot into the global view and the three partitions
    pub fn from_snapshot(characters: CharacterSnapshot, timestamp: DateTime<Utc>) -> Self {
        let global = Query::from_characters(&characters);

        let mut by_realm: Partition = HashMap::new();
        let mut by_class: Partition = HashMap::new();
        let mut by_guild: Partition = HashMap::new();

        for (key, c) in &characters {
            by_realm.entry(c.realm.as_str()).or_default().push((key, c));
            by_class.entry(c.class.as_str()).or_default().push((key, c));
            by_guild.entry(c.guild.as_str()).or_default().push((key, c));
        }

        let by_realm = build_partition(by_realm);
        let by_class = build_partition(by_class);
        let by_guild = build_partition(by_guild);

        let guilds: HashMap<String, Guild> = by_guild
            .iter()
            .map(|(name, query)| {
                let guild = Guild {
                    name: name.clone(),
                    rp: query.total_rp,
                    xp: query.total_xp,
                    lw_rp: 0,
                    lw_xp: 0,
                };
                (name.clone(), guild)
            })
            .collect();

        let top_rp_guilds = rank_guilds(&guilds, |g| g.rp);
        let top_xp_guilds = rank_guilds(&guilds, |g| g.xp);

        Self {
            timestamp,
            characters,
            global,
            by_realm,
            by_class,
            by_guild,
            guilds,
            top_rp_guilds,
            top_xp_guilds,
            ..Default::default()
        }
    }

    /// Lookup by key; falls back to the lower-cased name
    pub fn character(&self, name: &str) -> Result<&Character> {
        self.characters
            .get(name)
            .or_else(|| self.characters.get(&name.to_lowercase()))
            .ok_or_else(|| HeraldError::not_found(format!("character {}", name)))
    }

    pub fn guild(&self, name: &str) -> Result<&Guild> {
        self.guilds
            .get(name)
            .ok_or_else(|| HeraldError::not_found(format!("guild {}", name)))
    }

    pub fn guild_query(&self, name: &str) -> Result<&Query> {
        self.by_guild
            .get(name)
            .ok_or_else(|| HeraldError::not_found(format!("guild {}", name)))
    }

    pub fn realm_query(&self, name: &str) -> Result<&Query> {
        self.by_realm
            .get(name)
            .ok_or_else(|| HeraldError::not_found(format!("realm {}", name)))
    }

    pub fn class_query(&self, name: &str) -> Result<&Query> {
        self.by_class
            .get(name)
            .ok_or_else(|| HeraldError::not_found(format!("class {}", name)))
    }

    /// Resolve up to `limit` character keys, in order
    pub fn resolve_characters<'a>(
        &'a self,
        keys: &'a [String],
        limit: usize,
    ) -> impl Iterator<Item = &'a Character> + 'a {
        keys.iter()
            .filter_map(move |key| self.characters.get(key))
            .take(limit.min(MAX_RESULTS))
    }

    /// Resolve up to `limit` guild names, in order
    pub fn resolve_guilds<'a>(
        &'a self,
        names: &'a [String],
        limit: usize,
    ) -> impl Iterator<Item = &'a Guild> + 'a {
        names
            .iter()
            .filter_map(move |name| self.guilds.get(name))
            .take(limit.min(MAX_RESULTS))
    }

    pub fn top_rp<'a>(
        &'a self,
        query: &'a Query,
        limit: usize,
    ) -> impl Iterator<Item = &'a Character> + 'a {
        self.resolve_characters(&query.sorted_by_rp, limit)
    }

    pub fn top_xp<'a>(
        &'a self,
        query: &'a Query,
        limit: usize,
    ) -> impl Iterator<Item = &'a Character> + 'a {
        self.resolve_characters(&query.sorted_by_xp, limit)
    }
}

type Partition<'a> = HashMap<&'a str, Vec<(&'a String, &'a Character)>>;

fn build_partition(partition: Partition<'_>) -> HashMap<String, Query> {
    partition
        .into_iter()
        .map(|(name, members)| (name.to_string(), Query::from_characters(members)))
        .collect()
}

/// Guild names by `metric` descending, then name; the unguilded bucket is left out
pub(crate) fn rank_guilds<K, F>(guilds: &HashMap<String, Guild>, metric: F) -> Vec<String>
where
    K: Ord,
    F: Fn(&Guild) -> K,
{
    let mut ranked: Vec<&Guild> = guilds.values().filter(|g| !g.name.is_empty()).collect();
    ranked.sort_by(|a, b| {
        Reverse(metric(a))
            .cmp(&Reverse(metric(b)))
            .then_with(|| a.name.cmp(&b.name))
    });
    ranked.into_iter().map(|g| g.name.clone()).collect()
}
