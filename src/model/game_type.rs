use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

use super::Difficulty;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GameType {
    MemoryMatch,
    ColorMatch,
}

impl GameType {
    pub fn all() -> Vec<GameType> {
        vec![GameType::MemoryMatch, GameType::ColorMatch]
    }

    pub fn label(&self) -> &'static str {
        match self {
            GameType::MemoryMatch => "Memory Match",
            GameType::ColorMatch => "Color Match",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            GameType::MemoryMatch => "Match pairs of colors in increasing difficulty",
            GameType::ColorMatch => "Identify correct colors with time pressure",
        }
    }

    fn slug(&self) -> &'static str {
        match self {
            GameType::MemoryMatch => "memory_match",
            GameType::ColorMatch => "color_match",
        }
    }
}

impl Display for GameType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Identifies one progression track: a game, plus the difficulty for games
/// that have one. Used for unlocked levels and for score tables.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LevelKey {
    pub game_type: GameType,
    pub difficulty: Option<Difficulty>,
}

impl LevelKey {
    pub fn memory(difficulty: Difficulty) -> Self {
        Self {
            game_type: GameType::MemoryMatch,
            difficulty: Some(difficulty),
        }
    }

    pub fn color() -> Self {
        Self {
            game_type: GameType::ColorMatch,
            difficulty: None,
        }
    }

    /// Normalizes a (game, difficulty) request. Memory Match without a
    /// difficulty does not name a track.
    pub fn for_game(game_type: GameType, difficulty: Option<Difficulty>) -> Option<Self> {
        match (game_type, difficulty) {
            (GameType::MemoryMatch, Some(difficulty)) => Some(Self::memory(difficulty)),
            (GameType::MemoryMatch, None) => None,
            (GameType::ColorMatch, _) => Some(Self::color()),
        }
    }

    pub fn all() -> Vec<LevelKey> {
        let mut keys: Vec<LevelKey> = Difficulty::all().into_iter().map(Self::memory).collect();
        keys.push(Self::color());
        keys
    }

    /// True when this key falls under the (game, difficulty?) filter; a
    /// missing difficulty matches every difficulty of the game.
    pub fn matches(&self, game_type: GameType, difficulty: Option<Difficulty>) -> bool {
        self.game_type == game_type && (difficulty.is_none() || self.difficulty == difficulty)
    }
}

impl Display for LevelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.difficulty {
            Some(difficulty) => write!(f, "{}_{}", self.game_type.slug(), difficulty.slug()),
            None => write!(f, "{}_level", self.game_type.slug()),
        }
    }
}

impl FromStr for LevelKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LevelKey::all()
            .into_iter()
            .find(|key| key.to_string() == s)
            .ok_or_else(|| format!("unknown level key: {}", s))
    }
}
