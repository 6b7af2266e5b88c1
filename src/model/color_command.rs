use std::time::Duration;

use super::OptionId;

#[derive(Debug, Clone)]
pub enum ColorCommand {
    SelectLevel(u32),
    SelectOption(OptionId),
    CheckAnswer,
    /// Select and check in one tap.
    ChooseOption(OptionId),
    RestartLevel,
    RestartGame,
    ReturnToMenu,
    AdvanceClock(Duration),
}
