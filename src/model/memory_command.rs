use std::time::Duration;

use super::{CardId, Difficulty};

#[derive(Debug, Clone)]
pub enum MemoryCommand {
    SelectDifficulty(Difficulty),
    SelectCard(CardId),
    UseHint,
    /// New board at the current difficulty.
    Reset,
    ReturnToMenu,
    AdvanceClock(Duration),
}
