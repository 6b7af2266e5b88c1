use serde::{Deserialize, Serialize};

use super::{
    CardId, ColorOption, Difficulty, Feedback, GameCard, OptionId, PaletteColor, SessionPhase,
};

/// Everything a Memory Match view needs to draw itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub phase: SessionPhase,
    pub difficulty: Option<Difficulty>,
    pub round: u32,
    pub rounds_per_session: u32,
    pub cards: Vec<GameCard>,
    pub selection: Vec<CardId>,
    pub score: u32,
    pub moves: u32,
    pub time_remaining: u32,
    pub hints_remaining: u32,
    pub is_showing_hint: bool,
    pub is_previewing: bool,
    pub matched_pairs: usize,
    pub total_pairs: usize,
    pub feedback: Option<Feedback>,
    pub high_score: u32,
}

/// Everything a Color Match view needs to draw itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorSnapshot {
    pub phase: SessionPhase,
    pub level: u32,
    pub level_description: String,
    pub required_score: u32,
    pub grid_size: usize,
    pub target: Option<PaletteColor>,
    pub options: Vec<ColorOption>,
    pub selected: Option<OptionId>,
    pub score: u32,
    pub time_remaining: u32,
    pub feedback: Option<Feedback>,
    pub high_score: u32,
}
