mod key_value_store;
mod leaderboard_gateway;

pub use key_value_store::{load_json, save_json, JsonFileStore, KeyValueStore, MemoryStore};
#[cfg(test)]
pub use key_value_store::ReadOnlyStore;
pub use leaderboard_gateway::{InMemoryLeaderboard, LeaderboardGateway, OfflineLeaderboard};
