use crate::gateway::{load_json, save_json, KeyValueStore};
use crate::error::StoreError;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::time::Duration;

const SETTINGS_KEY: &str = "settings";
const CURRENT_VERSION: u32 = 2;

/// Display delays for the transient parts of a session.
#[serde_as]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Timings {
    /// All cards face-up at the start of a Memory Match round.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(default = "default_preview")]
    pub preview: Duration,

    /// How long a mismatched pair stays face-up.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(default = "default_mismatch")]
    pub mismatch: Duration,

    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(default = "default_hint")]
    pub hint: Duration,

    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(default = "default_feedback")]
    pub feedback: Duration,

    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(default = "default_level_transition")]
    pub level_transition: Duration,
}

fn default_preview() -> Duration {
    Duration::from_secs(2)
}
fn default_mismatch() -> Duration {
    Duration::from_millis(500)
}
fn default_hint() -> Duration {
    Duration::from_secs(2)
}
fn default_feedback() -> Duration {
    Duration::from_secs(1)
}
fn default_level_transition() -> Duration {
    Duration::from_secs(2)
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            preview: default_preview(),
            mismatch: default_mismatch(),
            hint: default_hint(),
            feedback: default_feedback(),
            level_transition: default_level_transition(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Settings {
    #[serde(default = "default_version")]
    version: u32,

    /// Boards per Memory Match session.
    #[serde(default = "default_memory_rounds")]
    pub memory_rounds: u32,

    #[serde(default = "default_true")]
    pub leaderboard_enabled: bool,

    #[serde(default)]
    pub timings: Timings,
}

// Helper functions for default values
fn default_version() -> u32 {
    CURRENT_VERSION
}
fn default_memory_rounds() -> u32 {
    3
}
fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            version: CURRENT_VERSION,
            memory_rounds: default_memory_rounds(),
            leaderboard_enabled: true,
            timings: Timings::default(),
        }
    }
}

impl Settings {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        if let Some(mut settings) = load_json::<Settings>(store, SETTINGS_KEY) {
            settings.migrate();
            return settings;
        }
        let default = Settings::default();
        if let Err(e) = default.save(store) {
            warn!(target: "settings", "Could not write default settings: {}", e);
        }
        default
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> Result<(), StoreError> {
        save_json(store, SETTINGS_KEY, self)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    fn migrate(&mut self) {
        match self.version {
            // version 1 allowed a zero round count
            0 | 1 => {
                self.memory_rounds = self.memory_rounds.max(1);
                self.version = CURRENT_VERSION;
            }
            _ => (),
        }
    }

    pub fn is_debug_mode() -> bool {
        std::env::var("DEBUG").map(|v| v == "1").unwrap_or(false)
    }

    /// `SEED` pins the shuffles for reproducible sessions; unparsable values
    /// are ignored.
    pub fn seed_from_env() -> Option<u64> {
        std::env::var("SEED").ok().and_then(|v| v.parse::<u64>().ok())
    }
}
