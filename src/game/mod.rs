pub mod color_session;
pub mod leaderboard;
pub mod memory_session;
pub mod profile_store;
pub mod ranking;
pub mod round_generator;
pub mod scheduler;
pub mod score_board;
pub mod settings;

pub use color_session::ColorMatchSession;
pub use leaderboard::{filter_scores, Leaderboard};
pub use memory_session::MemoryMatchSession;
pub use profile_store::ProfileStore;
pub use round_generator::{deal_cards, deal_color_round};
pub use scheduler::{Scheduler, TaskHandle};
pub use score_board::{ScoreBoard, MAX_SCORES_PER_TRACK};
pub use settings::{Settings, Timings};
