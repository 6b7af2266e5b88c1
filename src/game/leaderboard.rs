use chrono::{DateTime, TimeZone};
use log::warn;
use std::cell::RefCell;
use std::rc::Rc;
use uuid::Uuid;

use super::ranking::{rank_of, sort_by_score};
use crate::destroyable::Destroyable;
use crate::events::{wire_projection, EventHandler, Unsubscriber};
use crate::gateway::LeaderboardGateway;
use crate::model::{Difficulty, GameType, GlobalScore, LeaderboardQuery, TimeFilter};

/// Scores matching the game, difficulty and time window, best first.
pub fn filter_scores<Tz: TimeZone>(
    scores: &[GlobalScore],
    game_type: GameType,
    difficulty: Option<Difficulty>,
    window: TimeFilter,
    now: &DateTime<Tz>,
) -> Vec<GlobalScore> {
    let mut matching: Vec<GlobalScore> = scores
        .iter()
        .filter(|s| s.game_type == game_type)
        .filter(|s| difficulty.is_none() || s.difficulty == difficulty)
        .filter(|s| window.contains(&s.timestamp, now))
        .cloned()
        .collect();
    sort_by_score(&mut matching);
    matching
}

/// Local view of the remote leaderboard: the latest scores the gateway
/// published, with ranking helpers on top.
pub struct Leaderboard {
    gateway: Rc<dyn LeaderboardGateway>,
    global_scores: Vec<GlobalScore>,
    subscription: Option<Unsubscriber<Vec<GlobalScore>>>,
}

impl Destroyable for Leaderboard {
    fn destroy(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

impl EventHandler<Vec<GlobalScore>> for Leaderboard {
    fn handle_event(&mut self, event: &Vec<GlobalScore>) {
        self.global_scores = event.clone();
    }
}

impl Leaderboard {
    pub fn new(gateway: Rc<dyn LeaderboardGateway>) -> Rc<RefCell<Self>> {
        let observer = gateway.observe_scores();
        let leaderboard = Rc::new(RefCell::new(Self {
            gateway,
            global_scores: Vec::new(),
            subscription: None,
        }));
        let subscription = wire_projection(&leaderboard, &observer);
        leaderboard.borrow_mut().subscription = Some(subscription);
        leaderboard
    }

    /// Asks the gateway for fresh scores; they land in the cache when the
    /// gateway publishes them. Takes the shared handle because the gateway
    /// may publish before `fetch_scores` returns.
    pub fn refresh(
        leaderboard: &Rc<RefCell<Self>>,
        game_type: GameType,
        difficulty: Option<Difficulty>,
    ) {
        let difficulty = match game_type {
            GameType::MemoryMatch => difficulty,
            GameType::ColorMatch => None,
        };
        let gateway = Rc::clone(&leaderboard.borrow().gateway);
        if let Err(e) = gateway.fetch_scores(&LeaderboardQuery::new(game_type, difficulty)) {
            warn!(target: "leaderboard", "Failed to fetch scores: {}", e);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.gateway.is_connected()
    }

    pub fn global_scores(&self) -> &[GlobalScore] {
        &self.global_scores
    }

    pub fn top_scores(
        &self,
        game_type: GameType,
        difficulty: Option<Difficulty>,
        limit: usize,
    ) -> Vec<GlobalScore> {
        let mut top = self.ranked(game_type, difficulty);
        top.truncate(limit);
        top
    }

    pub fn user_rank(
        &self,
        profile_id: Uuid,
        game_type: GameType,
        difficulty: Option<Difficulty>,
    ) -> Option<usize> {
        rank_of(&self.ranked(game_type, difficulty), profile_id)
    }

    /// Cached scores restricted to a time window ending at `now`.
    pub fn filtered<Tz: TimeZone>(
        &self,
        game_type: GameType,
        difficulty: Option<Difficulty>,
        window: TimeFilter,
        now: &DateTime<Tz>,
    ) -> Vec<GlobalScore> {
        filter_scores(&self.global_scores, game_type, difficulty, window, now)
    }

    fn ranked(&self, game_type: GameType, difficulty: Option<Difficulty>) -> Vec<GlobalScore> {
        let mut matching: Vec<GlobalScore> = self
            .global_scores
            .iter()
            .filter(|s| s.game_type == game_type)
            .filter(|s| difficulty.is_none() || s.difficulty == difficulty)
            .cloned()
            .collect();
        sort_by_score(&mut matching);
        matching
    }

    pub fn clear_cache(&mut self) {
        self.global_scores.clear();
    }
}
