//! Snapshot records as delivered by the herald dump

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::collections::HashMap,
};

/// One full pull of the herald, keyed by character key
pub type CharacterSnapshot = HashMap<String, Character>;

/// A character as found in the dump
///
/// The dump is produced by a case-insensitive encoder, so every field also
/// accepts its camelCase spelling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Character {
    #[serde(alias = "name")]
    pub name: String,
    #[serde(alias = "guild")]
    pub guild: String,
    #[serde(alias = "race")]
    pub race: String,
    #[serde(alias = "class")]
    pub class: String,
    #[serde(alias = "realm")]
    pub realm: String,
    #[serde(alias = "xp")]
    pub xp: u64,
    #[serde(alias = "rp")]
    pub rp: u64,
    #[serde(alias = "level")]
    pub level: i32,
    #[serde(alias = "realmRank")]
    pub realm_rank: i32,
    #[serde(alias = "xpPercentOfLevel")]
    pub xp_percent_of_level: f32,
    #[serde(alias = "rpPercentOfLevel")]
    pub rp_percent_of_level: f32,
    #[serde(alias = "lastWeekRp")]
    pub last_week_rp: i64,
    #[serde(alias = "lastWeekXp")]
    pub last_week_xp: i64,
    /// Unix seconds of the last herald update for this character
    #[serde(alias = "lastUpdated")]
    pub last_updated: i64,
}

impl Character {
    /// Last update as a timestamp, `None` when the dump carries no update time
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        if self.last_updated <= 0 {
            return None;
        }
        DateTime::from_timestamp(self.last_updated, 0)
    }
}

/// Guild aggregate derived from the by-guild partition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Guild {
    pub name: String,
    #[serde(rename = "RP")]
    pub rp: u64,
    #[serde(rename = "XP")]
    pub xp: u64,
    #[serde(rename = "LWRP")]
    pub lw_rp: i64,
    #[serde(rename = "LWXP")]
    pub lw_xp: i64,
}

/// Latest `last_updated` across the snapshot, falling back to `now`
pub fn snapshot_timestamp<'a>(
    characters: impl IntoIterator<Item = &'a Character>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    characters
        .into_iter()
        .filter_map(Character::updated_at)
        .max()
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_pascal_and_camel_case() {
        let json = r#"{
            "aeric": {"Name": "Aeric", "Guild": "Lords", "Class": "Cleric", "Realm": "Albion",
                      "Xp": 1200, "Rp": 55, "RealmRank": 12, "LastUpdated": 1700000000},
            "brin":  {"name": "Brin", "realm": "Midgard", "rp": 7, "lastUpdated": 1700000100}
        }"#;
        let snapshot: CharacterSnapshot = serde_json::from_str(json).unwrap();

        let aeric = &snapshot["aeric"];
        assert_eq!(aeric.name, "Aeric");
        assert_eq!(aeric.guild, "Lords");
        assert_eq!(aeric.xp, 1200);
        assert_eq!(aeric.realm_rank, 12);

        let brin = &snapshot["brin"];
        assert_eq!(brin.realm, "Midgard");
        assert_eq!(brin.rp, 7);
        assert_eq!(brin.guild, "");
    }

    #[test]
    fn test_snapshot_timestamp() {
        let now = DateTime::from_timestamp(1_800_000_000, 0).unwrap();
        let chars = vec![
            Character { last_updated: 1_700_000_000, ..Default::default() },
            Character { last_updated: 1_700_000_500, ..Default::default() },
            Character::default(),
        ];
        assert_eq!(snapshot_timestamp(&chars, now).timestamp(), 1_700_000_500);

        let idle = vec![Character::default()];
        assert_eq!(snapshot_timestamp(&idle, now), now);
    }
}
