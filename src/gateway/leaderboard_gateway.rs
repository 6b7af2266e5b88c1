use chrono::Utc;
use log::{info, trace};
use std::cell::{Cell, RefCell};

use crate::error::GatewayError;
use crate::events::{Channel, EventEmitter, EventObserver};
use crate::game::ranking::sort_by_score;
use crate::model::{GlobalScore, LeaderboardQuery, ScoreSubmission};

/// Remote ranked score store. Calls return immediately; fetched scores are
/// published on `observe_scores()` whenever the remote side has new data for
/// the last fetched query.
pub trait LeaderboardGateway {
    fn submit_score(&self, submission: ScoreSubmission) -> Result<(), GatewayError>;
    fn fetch_scores(&self, query: &LeaderboardQuery) -> Result<(), GatewayError>;
    fn observe_scores(&self) -> EventObserver<Vec<GlobalScore>>;
    fn is_connected(&self) -> bool;
    /// Anonymous identity assigned by the remote side, once established.
    fn remote_user_id(&self) -> Option<String>;
}

/// A leaderboard that lives in process memory and behaves like a live
/// remote query: every submission re-publishes the active query.
pub struct InMemoryLeaderboard {
    scores: RefCell<Vec<GlobalScore>>,
    active_query: Cell<Option<LeaderboardQuery>>,
    connected: Cell<bool>,
    user_id: RefCell<Option<String>>,
    next_id: Cell<u64>,
    device_id: String,
    country_code: String,
    emitter: EventEmitter<Vec<GlobalScore>>,
    observer: EventObserver<Vec<GlobalScore>>,
}

impl Default for InMemoryLeaderboard {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLeaderboard {
    pub fn new() -> Self {
        let (emitter, observer) = Channel::new();
        Self {
            scores: RefCell::new(Vec::new()),
            active_query: Cell::new(None),
            connected: Cell::new(true),
            user_id: RefCell::new(Some(format!("anon-{}", uuid::Uuid::new_v4().simple()))),
            next_id: Cell::new(0),
            device_id: "local".to_string(),
            country_code: "unknown".to_string(),
            emitter,
            observer,
        }
    }

    pub fn set_connected(&self, connected: bool) {
        info!(
            target: "leaderboard",
            "Connection status: {}",
            if connected { "Connected" } else { "Disconnected" }
        );
        self.connected.set(connected);
    }

    pub fn sign_out(&self) {
        self.user_id.replace(None);
    }

    /// Adds a score as if another device had submitted it.
    pub fn insert(&self, score: GlobalScore) {
        self.scores.borrow_mut().push(score);
        self.publish();
    }

    pub fn submitted(&self) -> Vec<GlobalScore> {
        self.scores.borrow().clone()
    }

    fn publish(&self) {
        let Some(query) = self.active_query.get() else {
            return;
        };
        let mut matching: Vec<GlobalScore> = self
            .scores
            .borrow()
            .iter()
            .filter(|score| query.matches(score))
            .cloned()
            .collect();
        sort_by_score(&mut matching);
        matching.truncate(query.limit);
        trace!(target: "leaderboard", "Publishing {} scores for {:?}", matching.len(), query);
        self.emitter.emit(matching);
    }
}

impl LeaderboardGateway for InMemoryLeaderboard {
    fn submit_score(&self, submission: ScoreSubmission) -> Result<(), GatewayError> {
        if !self.connected.get() {
            return Err(GatewayError::Offline);
        }
        if self.user_id.borrow().is_none() {
            return Err(GatewayError::NotSignedIn);
        }
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let score = GlobalScore {
            id: format!("score-{}", id),
            profile_id: submission.profile_id,
            profile_name: submission.profile_name,
            avatar: submission.avatar,
            score: submission.score,
            game_type: submission.game_type,
            difficulty: submission.difficulty,
            level: submission.level,
            timestamp: Utc::now(),
            country_code: self.country_code.clone(),
            device_id: self.device_id.clone(),
        };
        info!(target: "leaderboard", "Score submitted: {} - {}", score.profile_name, score.score);
        self.insert(score);
        Ok(())
    }

    fn fetch_scores(&self, query: &LeaderboardQuery) -> Result<(), GatewayError> {
        if !self.connected.get() {
            return Err(GatewayError::Offline);
        }
        self.active_query.set(Some(*query));
        self.publish();
        Ok(())
    }

    fn observe_scores(&self) -> EventObserver<Vec<GlobalScore>> {
        self.observer.clone()
    }

    fn is_connected(&self) -> bool {
        self.connected.get()
    }

    fn remote_user_id(&self) -> Option<String> {
        self.user_id.borrow().clone()
    }
}

/// Stand-in when no remote backend is configured.
pub struct OfflineLeaderboard {
    // kept so the observer's channel stays alive
    _emitter: EventEmitter<Vec<GlobalScore>>,
    observer: EventObserver<Vec<GlobalScore>>,
}

impl Default for OfflineLeaderboard {
    fn default() -> Self {
        let (emitter, observer) = Channel::new();
        Self {
            _emitter: emitter,
            observer,
        }
    }
}

impl LeaderboardGateway for OfflineLeaderboard {
    fn submit_score(&self, _submission: ScoreSubmission) -> Result<(), GatewayError> {
        Err(GatewayError::Offline)
    }

    fn fetch_scores(&self, _query: &LeaderboardQuery) -> Result<(), GatewayError> {
        Err(GatewayError::Offline)
    }

    fn observe_scores(&self) -> EventObserver<Vec<GlobalScore>> {
        self.observer.clone()
    }

    fn is_connected(&self) -> bool {
        false
    }

    fn remote_user_id(&self) -> Option<String> {
        None
    }
}
