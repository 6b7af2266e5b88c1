mod color_command;
mod color_level;
mod color_option;
mod countdown;
mod difficulty;
mod game_card;
mod game_stats;
mod game_type;
mod global_score;
mod memory_command;
pub mod palette;
mod profile;
mod session_event;
mod session_phase;
mod session_snapshot;

pub use color_command::ColorCommand;
pub use color_level::{ColorMatchLevel, COLOR_MATCH_LEVELS};
pub use color_option::{ColorOption, ColorRound, OptionId};
pub use countdown::Countdown;
pub use difficulty::Difficulty;
pub use game_card::{CardId, CardState, GameCard};
pub use game_stats::{GameScore, GlobalStats};
pub use game_type::{GameType, LevelKey};
pub use global_score::{GlobalScore, LeaderboardQuery, ScoreSubmission, TimeFilter};
pub use memory_command::MemoryCommand;
pub use palette::PaletteColor;
pub use profile::{Profile, UnlockedLevels, DEFAULT_AVATAR};
pub use session_event::{GameOutcome, SessionEvent};
pub use session_phase::{EndReason, Feedback, FeedbackKind, SessionPhase};
pub use session_snapshot::{ColorSnapshot, MemorySnapshot};
