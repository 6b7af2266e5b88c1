use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::LevelKey;

pub const DEFAULT_AVATAR: &str = "person.circle.fill";

/// Highest unlocked level per track. Values only ever go up.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnlockedLevels(#[serde_as(as = "BTreeMap<DisplayFromStr, _>")] BTreeMap<LevelKey, u32>);

impl Default for UnlockedLevels {
    fn default() -> Self {
        Self(LevelKey::all().into_iter().map(|key| (key, 1)).collect())
    }
}

impl UnlockedLevels {
    pub fn get(&self, key: LevelKey) -> u32 {
        self.0.get(&key).copied().unwrap_or(1)
    }

    /// Returns true when the stored level moved.
    fn raise(&mut self, key: LevelKey, level: u32) -> bool {
        let current = self.get(key);
        if level > current {
            self.0.insert(key, level);
            true
        } else {
            false
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LevelKey, &u32)> {
        self.0.iter()
    }
}

#[readonly::make]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub avatar: String,
    pub created_at: DateTime<Utc>,
    pub last_played: DateTime<Utc>,
    pub total_games_played: u32,
    pub total_score: u64,
    pub unlocked_levels: UnlockedLevels,
    pub privacy_accepted: bool,
    pub remote_user_id: Option<String>,
}

impl Profile {
    pub fn new(name: &str, avatar: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            avatar: avatar.to_string(),
            created_at: now,
            last_played: now,
            total_games_played: 0,
            total_score: 0,
            unlocked_levels: UnlockedLevels::default(),
            privacy_accepted: false,
            remote_user_id: None,
        }
    }

    pub fn level(&self, key: LevelKey) -> u32 {
        self.unlocked_levels.get(key)
    }

    pub(crate) fn record_game(&mut self, score: u32, now: DateTime<Utc>) {
        self.total_score += u64::from(score);
        self.total_games_played += 1;
        self.last_played = now;
    }

    pub(crate) fn unlock(&mut self, key: LevelKey, level: u32) -> bool {
        self.unlocked_levels.raise(key, level)
    }

    pub(crate) fn set_privacy_accepted(&mut self, accepted: bool) {
        self.privacy_accepted = accepted;
    }

    pub(crate) fn set_remote_user_id(&mut self, remote_user_id: Option<String>) {
        self.remote_user_id = remote_user_id;
    }

    pub(crate) fn rename(&mut self, name: &str, avatar: &str) {
        self.name = name.to_string();
        self.avatar = avatar.to_string();
    }
}
