use chrono::Utc;
use log::{error, info, trace, warn};
use std::rc::Rc;
use uuid::Uuid;

use crate::gateway::{load_json, save_json, KeyValueStore, LeaderboardGateway};
use crate::model::{LevelKey, Profile, ScoreSubmission, DEFAULT_AVATAR};

const PROFILES_KEY: &str = "profiles";
const CURRENT_PROFILE_KEY: &str = "current_profile";
const DEFAULT_PROFILE_NAME: &str = "Player";

/// Player profiles and the current-profile pointer. Every mutation is
/// written through to the store; a failed write is logged and the in-memory
/// copy stays authoritative.
pub struct ProfileStore {
    store: Rc<dyn KeyValueStore>,
    leaderboard: Rc<dyn LeaderboardGateway>,
    profiles: Vec<Profile>,
    current: Option<Uuid>,
    leaderboard_enabled: bool,
}

impl ProfileStore {
    pub fn new(store: Rc<dyn KeyValueStore>, leaderboard: Rc<dyn LeaderboardGateway>) -> Self {
        let profiles: Vec<Profile> = load_json(store.as_ref(), PROFILES_KEY).unwrap_or_default();
        let stored_current: Option<Uuid> = load_json(store.as_ref(), CURRENT_PROFILE_KEY);
        let current = stored_current
            .filter(|id| profiles.iter().any(|p| p.id == *id))
            .or_else(|| profiles.first().map(|p| p.id));
        trace!(target: "profiles", "Loaded {} profiles", profiles.len());

        let mut manager = Self {
            store,
            leaderboard,
            profiles,
            current,
            leaderboard_enabled: true,
        };
        if manager.profiles.is_empty() {
            manager.create_profile(DEFAULT_PROFILE_NAME, DEFAULT_AVATAR);
        }
        manager
    }

    fn save(&self) {
        if let Err(e) = save_json(self.store.as_ref(), PROFILES_KEY, &self.profiles) {
            error!(target: "profiles", "Error saving profiles: {}", e);
        }
        if let Err(e) = save_json(self.store.as_ref(), CURRENT_PROFILE_KEY, &self.current) {
            error!(target: "profiles", "Error saving current profile: {}", e);
        }
    }

    /// Follows `Settings::leaderboard_enabled`; off means scores stay local
    /// even with the player's consent.
    pub fn set_leaderboard_enabled(&mut self, enabled: bool) {
        self.leaderboard_enabled = enabled;
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn current_profile(&self) -> Option<&Profile> {
        let id = self.current?;
        self.profiles.iter().find(|p| p.id == id)
    }

    fn current_profile_mut(&mut self) -> Option<&mut Profile> {
        let id = self.current?;
        self.profiles.iter_mut().find(|p| p.id == id)
    }

    pub fn create_profile(&mut self, name: &str, avatar: &str) -> Uuid {
        let profile = Profile::new(name, avatar, Utc::now());
        let id = profile.id;
        info!(target: "profiles", "Created profile {} ({})", name, id);
        self.profiles.push(profile);
        self.current = Some(id);
        self.save();
        id
    }

    pub fn select_profile(&mut self, id: Uuid) -> bool {
        if !self.profiles.iter().any(|p| p.id == id) {
            warn!(target: "profiles", "No profile {}", id);
            return false;
        }
        self.current = Some(id);
        self.save();
        true
    }

    pub fn update_profile(&mut self, id: Uuid, name: &str, avatar: &str) -> bool {
        let Some(profile) = self.profiles.iter_mut().find(|p| p.id == id) else {
            return false;
        };
        profile.rename(name, avatar);
        self.save();
        true
    }

    /// Removing the current profile moves the pointer to the first one left.
    pub fn delete_profile(&mut self, id: Uuid) -> bool {
        let before = self.profiles.len();
        self.profiles.retain(|p| p.id != id);
        if self.profiles.len() == before {
            return false;
        }
        if self.current == Some(id) {
            self.current = self.profiles.first().map(|p| p.id);
        }
        info!(target: "profiles", "Deleted profile {}", id);
        self.save();
        true
    }

    /// Adds a finished game to the current profile's totals, then offers the
    /// score to the leaderboard if the player agreed to share and the
    /// leaderboard is reachable. Leaderboard failures are only logged.
    pub fn update_profile_score(&mut self, score: u32, key: LevelKey, level: u32) {
        let Some(profile) = self.current_profile_mut() else {
            warn!(target: "profiles", "No current profile; score {} not recorded", score);
            return;
        };
        profile.record_game(score, Utc::now());
        let submission = ScoreSubmission {
            profile_id: profile.id,
            profile_name: profile.name.clone(),
            avatar: profile.avatar.clone(),
            score,
            game_type: key.game_type,
            difficulty: key.difficulty,
            level,
        };
        let share = profile.privacy_accepted;
        self.save();

        if share && self.leaderboard_enabled && self.leaderboard.is_connected() {
            if let Err(e) = self.leaderboard.submit_score(submission) {
                warn!(target: "profiles", "Leaderboard submission failed: {}", e);
            }
        } else {
            trace!(target: "profiles", "Leaderboard submission skipped");
        }
    }

    pub fn unlock_level(&mut self, key: LevelKey, level: u32) {
        let Some(profile) = self.current_profile_mut() else {
            return;
        };
        if profile.unlock(key, level) {
            info!(target: "profiles", "Unlocked {} level {}", key, level);
            self.save();
        }
    }

    /// Highest unlocked level for the current profile; 1 without one.
    pub fn get_level(&self, key: LevelKey) -> u32 {
        self.current_profile().map(|p| p.level(key)).unwrap_or(1)
    }

    pub fn accept_privacy(&mut self, accepted: bool) {
        if let Some(profile) = self.current_profile_mut() {
            profile.set_privacy_accepted(accepted);
            self.save();
        }
    }

    /// Copies the leaderboard's anonymous identity onto the current profile.
    pub fn link_remote_identity(&mut self) -> Option<String> {
        let remote_id = self.leaderboard.remote_user_id()?;
        let profile = self.current_profile_mut()?;
        profile.set_remote_user_id(Some(remote_id.clone()));
        self.save();
        Some(remote_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{InMemoryLeaderboard, MemoryStore, OfflineLeaderboard, ReadOnlyStore};
    use crate::model::{Difficulty, GameType};

    fn store_with(leaderboard: Rc<dyn LeaderboardGateway>) -> (Rc<MemoryStore>, ProfileStore) {
        let store = Rc::new(MemoryStore::new());
        let profiles = ProfileStore::new(store.clone(), leaderboard);
        (store, profiles)
    }

    fn offline() -> Rc<dyn LeaderboardGateway> {
        Rc::new(OfflineLeaderboard::default())
    }

    #[test]
    fn test_default_profile_created() {
        let (_, profiles) = store_with(offline());
        assert_eq!(profiles.profiles().len(), 1);
        let current = profiles.current_profile().unwrap();
        assert_eq!(current.name, "Player");
        assert_eq!(profiles.get_level(LevelKey::color()), 1);
    }

    #[test]
    fn test_create_and_select() {
        let (_, mut profiles) = store_with(offline());
        let first = profiles.current_profile().unwrap().id;
        let ada = profiles.create_profile("Ada", "star.fill");
        assert_eq!(profiles.current_profile().unwrap().id, ada);

        assert!(profiles.select_profile(first));
        assert_eq!(profiles.current_profile().unwrap().id, first);
        assert!(!profiles.select_profile(Uuid::new_v4()));
        assert_eq!(profiles.current_profile().unwrap().id, first);
    }

    #[test]
    fn test_delete_current_falls_back_to_first() {
        let (_, mut profiles) = store_with(offline());
        let first = profiles.current_profile().unwrap().id;
        let ada = profiles.create_profile("Ada", "star.fill");

        assert!(profiles.delete_profile(ada));
        assert_eq!(profiles.current_profile().unwrap().id, first);

        assert!(profiles.delete_profile(first));
        assert!(profiles.current_profile().is_none());
        assert!(!profiles.delete_profile(first));
    }

    #[test]
    fn test_update_profile_score_accumulates() {
        let (_, mut profiles) = store_with(offline());
        let key = LevelKey::memory(Difficulty::Easy);
        profiles.update_profile_score(30, key, 1);
        profiles.update_profile_score(0, key, 1);

        let current = profiles.current_profile().unwrap();
        assert_eq!(current.total_score, 30);
        assert_eq!(current.total_games_played, 2);
    }

    #[test]
    fn test_unlock_level_never_decreases() {
        let (_, mut profiles) = store_with(offline());
        let key = LevelKey::memory(Difficulty::Medium);
        profiles.unlock_level(key, 3);
        profiles.unlock_level(key, 2);
        profiles.unlock_level(key, 3);
        assert_eq!(profiles.get_level(key), 3);
        assert_eq!(profiles.get_level(LevelKey::memory(Difficulty::Hard)), 1);
    }

    #[test]
    fn test_failed_writes_keep_profiles_in_memory() {
        let store = Rc::new(ReadOnlyStore::default());
        let mut profiles = ProfileStore::new(store.clone(), offline());
        let key = LevelKey::memory(Difficulty::Hard);
        profiles.update_profile_score(60, key, 2);
        profiles.unlock_level(key, 3);

        assert!(store.failed_writes.get() > 0);
        let current = profiles.current_profile().unwrap();
        assert_eq!(current.name, "Player");
        assert_eq!(current.total_score, 60);
        assert_eq!(current.total_games_played, 1);
        assert_eq!(profiles.get_level(key), 3);
    }

    #[test]
    fn test_state_survives_reload() {
        let store = Rc::new(MemoryStore::new());
        let ada = {
            let mut profiles = ProfileStore::new(store.clone(), offline());
            let ada = profiles.create_profile("Ada", "star.fill");
            profiles.unlock_level(LevelKey::color(), 4);
            profiles.update_profile_score(120, LevelKey::color(), 4);
            ada
        };

        let profiles = ProfileStore::new(store, offline());
        assert_eq!(profiles.profiles().len(), 2);
        let current = profiles.current_profile().unwrap();
        assert_eq!(current.id, ada);
        assert_eq!(current.total_score, 120);
        assert_eq!(profiles.get_level(LevelKey::color()), 4);
    }

    #[test]
    fn test_corrupt_profiles_fall_back_to_default() {
        let store = Rc::new(MemoryStore::new());
        store.save(PROFILES_KEY, "[{\"id\": 12}]").unwrap();
        let profiles = ProfileStore::new(store, offline());
        assert_eq!(profiles.profiles().len(), 1);
        assert_eq!(profiles.current_profile().unwrap().name, "Player");
    }

    #[test]
    fn test_submits_only_with_consent_and_connection() {
        let leaderboard = Rc::new(InMemoryLeaderboard::new());
        let (_, mut profiles) = store_with(leaderboard.clone());
        let key = LevelKey::memory(Difficulty::Hard);

        profiles.update_profile_score(40, key, 1);
        assert!(leaderboard.submitted().is_empty());

        profiles.accept_privacy(true);
        profiles.update_profile_score(50, key, 2);
        let submitted = leaderboard.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].score, 50);
        assert_eq!(submitted[0].game_type, GameType::MemoryMatch);
        assert_eq!(submitted[0].difficulty, Some(Difficulty::Hard));
        assert_eq!(submitted[0].level, 2);

        leaderboard.set_connected(false);
        profiles.update_profile_score(60, key, 2);
        assert_eq!(leaderboard.submitted().len(), 1);
        // local totals are unaffected by the leaderboard
        assert_eq!(profiles.current_profile().unwrap().total_score, 150);
    }

    #[test]
    fn test_disabled_leaderboard_keeps_scores_local() {
        let leaderboard = Rc::new(InMemoryLeaderboard::new());
        let (_, mut profiles) = store_with(leaderboard.clone());
        profiles.accept_privacy(true);
        profiles.set_leaderboard_enabled(false);
        profiles.update_profile_score(70, LevelKey::color(), 3);
        assert!(leaderboard.submitted().is_empty());
        assert_eq!(profiles.current_profile().unwrap().total_score, 70);
    }

    #[test]
    fn test_submission_failure_keeps_local_state() {
        let leaderboard = Rc::new(InMemoryLeaderboard::new());
        leaderboard.sign_out();
        let (_, mut profiles) = store_with(leaderboard.clone());
        profiles.accept_privacy(true);
        profiles.update_profile_score(10, LevelKey::color(), 1);
        assert_eq!(profiles.current_profile().unwrap().total_games_played, 1);
        assert!(leaderboard.submitted().is_empty());
    }

    #[test]
    fn test_link_remote_identity() {
        let leaderboard = Rc::new(InMemoryLeaderboard::new());
        let (_, mut profiles) = store_with(leaderboard.clone());
        let remote = profiles.link_remote_identity();
        assert!(remote.is_some());
        assert_eq!(profiles.current_profile().unwrap().remote_user_id, remote);

        let (_, mut offline_profiles) = store_with(offline());
        assert_eq!(offline_profiles.link_remote_identity(), None);
    }
}
