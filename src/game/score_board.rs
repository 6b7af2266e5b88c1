use log::{error, info, trace};
use std::collections::HashMap;
use std::rc::Rc;
use uuid::Uuid;

use super::ranking::{rank_of, sort_by_score};
use crate::gateway::{load_json, save_json, KeyValueStore};
use crate::model::{Difficulty, GameScore, GameType, GlobalStats, LevelKey};

/// Scores kept per track.
pub const MAX_SCORES_PER_TRACK: usize = 10;

/// Local high-score tables, one bounded list per `LevelKey`, plus running
/// totals that are never truncated.
pub struct ScoreBoard {
    store: Rc<dyn KeyValueStore>,
    scores: HashMap<LevelKey, Vec<GameScore>>,
    global_stats: HashMap<LevelKey, GlobalStats>,
}

impl std::fmt::Debug for ScoreBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoreBoard")
            .field("scores", &self.scores)
            .field("global_stats", &self.global_stats)
            .finish()
    }
}

fn scores_key(key: LevelKey) -> String {
    format!("scores_{}", key)
}

fn global_stats_key(key: LevelKey) -> String {
    format!("global_stats_{}", key)
}

impl ScoreBoard {
    pub fn new(store: Rc<dyn KeyValueStore>) -> Self {
        let mut board = Self {
            store,
            scores: HashMap::new(),
            global_stats: HashMap::new(),
        };
        board.load_all();
        board
    }

    fn load_all(&mut self) {
        for key in LevelKey::all() {
            let mut scores: Vec<GameScore> =
                load_json(self.store.as_ref(), &scores_key(key)).unwrap_or_default();
            // tolerate hand-edited or older files
            sort_by_score(&mut scores);
            scores.truncate(MAX_SCORES_PER_TRACK);
            trace!(target: "score_board", "Loaded {} scores for {}", scores.len(), key);
            self.scores.insert(key, scores);

            let stats = load_json(self.store.as_ref(), &global_stats_key(key)).unwrap_or_default();
            self.global_stats.insert(key, stats);
        }
    }

    fn save_track(&self, key: LevelKey) {
        if let Some(scores) = self.scores.get(&key) {
            if let Err(e) = save_json(self.store.as_ref(), &scores_key(key), scores) {
                error!(target: "score_board", "Error saving scores for {}: {}", key, e);
            }
        }
        if let Some(stats) = self.global_stats.get(&key) {
            if let Err(e) = save_json(self.store.as_ref(), &global_stats_key(key), stats) {
                error!(target: "score_board", "Error saving stats for {}: {}", key, e);
            }
        }
    }

    /// Records a finished game. Returns the record's 1-based position in its
    /// table, or `None` when it did not make the cut.
    pub fn add_score(&mut self, record: GameScore) -> Option<usize> {
        let key = record.key();
        let id = record.id;
        info!(
            target: "score_board",
            "Score added: {} - {} - {}",
            record.player_name,
            record.score,
            key
        );

        self.global_stats.entry(key).or_default().record(&record);

        let scores = self.scores.entry(key).or_default();
        scores.push(record);
        sort_by_score(scores);
        scores.truncate(MAX_SCORES_PER_TRACK);
        let position = scores.iter().position(|s| s.id == id).map(|i| i + 1);

        self.save_track(key);
        position
    }

    pub fn high_score(&self, key: LevelKey) -> u32 {
        self.scores
            .get(&key)
            .and_then(|scores| scores.first())
            .map(|s| s.score)
            .unwrap_or(0)
    }

    pub fn scores(&self, key: LevelKey) -> Vec<GameScore> {
        self.scores.get(&key).cloned().unwrap_or_default()
    }

    /// Ranked view over one track, or over every track of a game when no
    /// difficulty is given. Ties across tracks go to the earlier record.
    pub fn top_scores(
        &self,
        game_type: GameType,
        difficulty: Option<Difficulty>,
        limit: usize,
    ) -> Vec<GameScore> {
        let mut matching = self.matching(game_type, difficulty);
        matching.truncate(limit);
        matching
    }

    /// 1-based rank of the profile's best score, `None` when unranked.
    pub fn user_rank(
        &self,
        profile_id: Uuid,
        game_type: GameType,
        difficulty: Option<Difficulty>,
    ) -> Option<usize> {
        rank_of(&self.matching(game_type, difficulty), profile_id)
    }

    fn matching(&self, game_type: GameType, difficulty: Option<Difficulty>) -> Vec<GameScore> {
        let mut keys: Vec<&LevelKey> = self
            .scores
            .keys()
            .filter(|key| key.matches(game_type, difficulty))
            .collect();
        keys.sort();
        let mut matching: Vec<GameScore> = keys
            .into_iter()
            .flat_map(|key| self.scores[key].iter().cloned())
            .collect();
        if difficulty.is_none() {
            matching.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        }
        sort_by_score(&mut matching);
        matching
    }

    pub fn global_stats(&self, key: LevelKey) -> GlobalStats {
        self.global_stats.get(&key).cloned().unwrap_or_default()
    }

    pub fn clear_scores(&mut self, key: LevelKey) {
        self.scores.insert(key, Vec::new());
        self.save_track(key);
    }

    pub fn clear_all(&mut self) {
        for key in LevelKey::all() {
            self.clear_scores(key);
        }
    }
}
