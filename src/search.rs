//! Lower-cased prefix lookup over character keys and guild names

use std::collections::BTreeMap;

/// Ordered map from lower-cased search key to value
///
/// Backed by a `BTreeMap` so a prefix query is a range scan that stops at the
/// first key no longer sharing the prefix.
#[derive(Debug, Clone)]
pub struct PrefixIndex<V> {
    entries: BTreeMap<String, V>,
}

impl<V> Default for PrefixIndex<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<V> PrefixIndex<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert under the lower-cased `key`, replacing any previous value
    pub fn insert(&mut self, key: &str, value: V) {
        self.entries.insert(key.to_lowercase(), value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Up to `limit` values whose key starts with `prefix`, in key order
    pub fn walk_prefix<'a>(
        &'a self,
        prefix: &str,
        limit: usize,
    ) -> impl Iterator<Item = &'a V> + 'a {
        let prefix = prefix.to_lowercase();
        self.entries
            .range(prefix.clone()..)
            .take_while(move |(key, _)| key.starts_with(&prefix))
            .map(|(_, value)| value)
            .take(limit)
    }
}

impl<'a, V> FromIterator<(&'a str, V)> for PrefixIndex<V> {
    fn from_iter<I: IntoIterator<Item = (&'a str, V)>>(iter: I) -> Self {
        let mut index = Self::new();
        for (key, value) in iter {
            index.insert(key, value);
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> PrefixIndex<u32> {
        [("Aeric", 1), ("aerith", 2), ("Brin", 3), ("Ae", 4), ("Baeric", 5)]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_prefix_is_case_insensitive() {
        let idx = index();
        let hits: Vec<u32> = idx.walk_prefix("AER", 10).copied().collect();
        assert_eq!(hits, vec![1, 2]);
    }

    #[test]
    fn test_prefix_respects_limit_and_order() {
        let idx = index();
        let hits: Vec<u32> = idx.walk_prefix("ae", 2).copied().collect();
        assert_eq!(hits, vec![4, 1]);
    }

    #[test]
    fn test_no_match_and_empty_prefix() {
        let idx = index();
        assert_eq!(idx.walk_prefix("zz", 10).count(), 0);
        assert_eq!(idx.walk_prefix("", 10).count(), 5);
        assert_eq!(idx.len(), 5);
    }
}
