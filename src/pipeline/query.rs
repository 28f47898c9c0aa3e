//! Ranked aggregate over one set of characters

use {
    crate::models::Character,
    serde::Serialize,
    std::{cmp::Reverse, collections::BTreeSet},
};

/// Aggregate view over a set of characters
///
/// Member and ranking lists hold character keys; resolve them through
/// `Statistics::characters`. Rankings are descending by counter, ties broken by
/// character name and then key, so equal snapshots always rank identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Query {
    pub characters: BTreeSet<String>,
    #[serde(rename = "SortedByRP")]
    pub sorted_by_rp: Vec<String>,
    #[serde(rename = "SortedByXP")]
    pub sorted_by_xp: Vec<String>,
    #[serde(rename = "TotalRP")]
    pub total_rp: u64,
    #[serde(rename = "TotalXP")]
    pub total_xp: u64,
    #[serde(rename = "LWRP")]
    pub lw_rp: i64,
    #[serde(rename = "LWXP")]
    pub lw_xp: i64,
}

impl Query {
    /// Build a query from `(key, character)` pairs
    ///
    /// Used for the global view and for every partition alike.
    pub fn from_characters<'a, I>(characters: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a Character)>,
    {
        let members: Vec<(&String, &Character)> = characters.into_iter().collect();

        let mut total_rp = 0u64;
        let mut total_xp = 0u64;
        for (_, c) in &members {
            total_rp = total_rp.saturating_add(c.rp);
            total_xp = total_xp.saturating_add(c.xp);
        }

        Self {
            characters: members.iter().map(|(key, _)| (*key).clone()).collect(),
            sorted_by_rp: rank_characters(&members, |c| c.rp),
            sorted_by_xp: rank_characters(&members, |c| c.xp),
            total_rp,
            total_xp,
            lw_rp: 0,
            lw_xp: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.characters.contains(key)
    }
}

/// Keys ordered by `metric` descending, then name, then key
pub(crate) fn rank_characters<K, F>(members: &[(&String, &Character)], metric: F) -> Vec<String>
where
    K: Ord,
    F: Fn(&Character) -> K,
{
    let mut ranked: Vec<&(&String, &Character)> = members.iter().collect();
    ranked.sort_by(|(ka, a), (kb, b)| {
        Reverse(metric(a))
            .cmp(&Reverse(metric(b)))
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| ka.cmp(kb))
    });
    ranked.into_iter().map(|(key, _)| (*key).clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn character(name: &str, rp: u64, xp: u64) -> Character {
        Character {
            name: name.to_string(),
            rp,
            xp,
            ..Default::default()
        }
    }

    #[test]
    fn test_sorted_by_rp_and_total() {
        let chars: HashMap<String, Character> = [
            ("a".to_string(), character("A", 10, 0)),
            ("b".to_string(), character("B", 30, 0)),
            ("c".to_string(), character("C", 20, 0)),
        ]
        .into_iter()
        .collect();

        let query = Query::from_characters(&chars);
        let rp: Vec<u64> = query.sorted_by_rp.iter().map(|k| chars[k].rp).collect();
        assert_eq!(rp, vec![30, 20, 10]);
        assert_eq!(query.total_rp, 60);
        assert_eq!(query.len(), 3);
    }

    #[test]
    fn test_ties_break_by_name() {
        let chars: HashMap<String, Character> = [
            ("k1".to_string(), character("Zed", 5, 9)),
            ("k2".to_string(), character("Amy", 5, 9)),
            ("k3".to_string(), character("Mo", 7, 1)),
        ]
        .into_iter()
        .collect();

        let query = Query::from_characters(&chars);
        assert_eq!(query.sorted_by_rp, vec!["k3", "k2", "k1"]);
        assert_eq!(query.sorted_by_xp, vec!["k2", "k1", "k3"]);
        assert_eq!(query.total_xp, 19);
    }

    #[test]
    fn test_empty_query() {
        let chars: HashMap<String, Character> = HashMap::new();
        let query = Query::from_characters(&chars);
        assert!(query.is_empty());
        assert_eq!(query.total_rp, 0);
        assert!(query.sorted_by_xp.is_empty());
    }
}
