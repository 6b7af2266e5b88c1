use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Difficulty, GameType};

/// A score as stored by the remote leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GlobalScore {
    pub id: String,
    pub profile_id: Uuid,
    pub profile_name: String,
    pub avatar: String,
    pub score: u32,
    pub game_type: GameType,
    pub difficulty: Option<Difficulty>,
    pub level: u32,
    pub timestamp: DateTime<Utc>,
    pub country_code: String,
    pub device_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreSubmission {
    pub profile_id: Uuid,
    pub profile_name: String,
    pub avatar: String,
    pub score: u32,
    pub game_type: GameType,
    pub difficulty: Option<Difficulty>,
    pub level: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderboardQuery {
    pub game_type: GameType,
    pub difficulty: Option<Difficulty>,
    pub limit: usize,
}

impl LeaderboardQuery {
    pub const DEFAULT_LIMIT: usize = 100;

    pub fn new(game_type: GameType, difficulty: Option<Difficulty>) -> Self {
        Self {
            game_type,
            difficulty,
            limit: Self::DEFAULT_LIMIT,
        }
    }

    pub fn matches(&self, score: &GlobalScore) -> bool {
        score.game_type == self.game_type
            && (self.difficulty.is_none() || score.difficulty == self.difficulty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TimeFilter {
    #[default]
    AllTime,
    Today,
    ThisWeek,
    ThisMonth,
}

impl TimeFilter {
    pub fn label(&self) -> &'static str {
        match self {
            TimeFilter::AllTime => "All Time",
            TimeFilter::Today => "Today",
            TimeFilter::ThisWeek => "This Week",
            TimeFilter::ThisMonth => "This Month",
        }
    }

    /// Start of the window containing `now`, in `now`'s time zone. Weeks
    /// start on Monday. `None` means unbounded.
    pub fn window_start<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let today = now.date_naive();
        let first_day = match self {
            TimeFilter::AllTime => return None,
            TimeFilter::Today => today,
            TimeFilter::ThisWeek => {
                today - Duration::days(i64::from(today.weekday().num_days_from_monday()))
            }
            TimeFilter::ThisMonth => today.with_day(1)?,
        };
        now.timezone()
            .from_local_datetime(&first_day.and_time(NaiveTime::MIN))
            .earliest()
    }

    /// True when `timestamp` lies in `[window_start, now]`.
    pub fn contains<Tz: TimeZone>(&self, timestamp: &DateTime<Utc>, now: &DateTime<Tz>) -> bool {
        let now_utc = now.with_timezone(&Utc);
        match self.window_start(now) {
            None => true,
            Some(start) => {
                let start_utc = start.with_timezone(&Utc);
                *timestamp >= start_utc && *timestamp <= now_utc
            }
        }
    }
}
