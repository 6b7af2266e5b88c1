use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Difficulty, GameType, LevelKey};

/// A finished session as kept in the local high-score table.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct GameScore {
    pub id: Uuid,
    #[serde(default)]
    pub profile_id: Option<Uuid>,
    pub player_name: String,
    pub game_type: GameType,
    pub difficulty: Option<Difficulty>,
    pub level: u32,
    pub score: u32,
    pub timestamp: DateTime<Utc>,
    /// Seconds of countdown consumed.
    pub time_taken: u32,
    pub hints_used: u32,
    pub moves: u32,
}

impl GameScore {
    pub fn key(&self) -> LevelKey {
        LevelKey {
            game_type: self.game_type,
            difficulty: match self.game_type {
                GameType::MemoryMatch => self.difficulty,
                GameType::ColorMatch => None,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct GlobalStats {
    pub total_games_played: u32,
    /// Seconds.
    pub total_time_played: u64,
    pub total_hints_used: u32,
    pub total_score: u64,
}

impl GlobalStats {
    pub fn record(&mut self, score: &GameScore) {
        self.total_games_played += 1;
        self.total_time_played += u64::from(score.time_taken);
        self.total_hints_used += score.hints_used;
        self.total_score += u64::from(score.score);
    }
}
