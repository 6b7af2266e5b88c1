use chrono::Utc;
use itertools::Itertools;
use log::{debug, info, trace};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use uuid::Uuid;

use super::profile_store::ProfileStore;
use super::round_generator::deal_cards;
use super::scheduler::{Scheduler, TaskHandle};
use super::score_board::ScoreBoard;
use super::settings::Settings;
use crate::destroyable::Destroyable;
use crate::events::{
    wire_handler, EventEmitter, EventHandler, EventObserver, PendingQueue, Unsubscriber,
};
use crate::model::{
    CardId, Countdown, Difficulty, EndReason, Feedback, GameCard, GameOutcome, GameScore,
    GameType, LevelKey, MemoryCommand, MemorySnapshot, SessionEvent, SessionPhase,
};

const MATCH_POINTS: u32 = 10;
const MISMATCH_PENALTY: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemoryTask {
    Tick,
    EndPreview,
    ResolveMismatch,
    HideHint,
    ClearFeedback,
    NextRound,
}

/// One Memory Match session: pick a difficulty, clear `memory_rounds`
/// boards before each round's countdown runs out.
pub struct MemoryMatchSession {
    phase: SessionPhase,
    difficulty: Option<Difficulty>,
    round: u32,
    cards: Vec<GameCard>,
    selection: Vec<CardId>,
    hinted: Vec<CardId>,
    score: u32,
    moves: u32,
    countdown: Countdown,
    time_played: u32,
    hints_remaining: u32,
    hints_used: u32,
    is_previewing: bool,
    feedback: Option<Feedback>,
    feedback_task: Option<TaskHandle>,
    hint_task: Option<TaskHandle>,
    next_card_id: u32,
    scheduler: Scheduler<MemoryTask>,
    rng: StdRng,
    debug_mode: bool,
    settings: Settings,
    score_board: Rc<RefCell<ScoreBoard>>,
    profiles: Rc<RefCell<ProfileStore>>,
    event_emitter: EventEmitter<SessionEvent>,
    pending: PendingQueue<MemoryCommand>,
    subscription: Option<Unsubscriber<MemoryCommand>>,
}

impl Destroyable for MemoryMatchSession {
    fn destroy(&mut self) {
        self.scheduler.cancel_all();
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

impl EventHandler<MemoryCommand> for MemoryMatchSession {
    fn handle_event(&mut self, command: &MemoryCommand) {
        self.dispatch(command.clone());
    }
}

impl MemoryMatchSession {
    /// `seed` pins the deals; without one `SEED` from the environment is
    /// tried, then a random seed.
    pub fn new(
        command_observer: EventObserver<MemoryCommand>,
        event_emitter: EventEmitter<SessionEvent>,
        settings: Settings,
        score_board: Rc<RefCell<ScoreBoard>>,
        profiles: Rc<RefCell<ProfileStore>>,
        seed: Option<u64>,
    ) -> Rc<RefCell<Self>> {
        let seed = seed
            .or_else(Settings::seed_from_env)
            .unwrap_or_else(rand::random);
        let debug_mode = Settings::is_debug_mode();
        profiles
            .borrow_mut()
            .set_leaderboard_enabled(settings.leaderboard_enabled);
        if debug_mode {
            debug!(target: "memory_session", "Memory Match seed: {}", seed);
        }
        let pending = PendingQueue::new();
        let session = Rc::new(RefCell::new(Self {
            phase: SessionPhase::AwaitingSelection,
            difficulty: None,
            round: 0,
            cards: Vec::new(),
            selection: Vec::new(),
            hinted: Vec::new(),
            score: 0,
            moves: 0,
            countdown: Countdown::default(),
            time_played: 0,
            hints_remaining: 0,
            hints_used: 0,
            is_previewing: false,
            feedback: None,
            feedback_task: None,
            hint_task: None,
            next_card_id: 0,
            scheduler: Scheduler::new(),
            rng: StdRng::seed_from_u64(seed),
            debug_mode,
            settings,
            score_board,
            profiles,
            event_emitter,
            pending: pending.clone(),
            subscription: None,
        }));
        let subscription = wire_handler(&session, &command_observer, &pending);
        session.borrow_mut().subscription = Some(subscription);
        session
    }

    /// Applies `command`, then any commands listeners sent while it ran.
    fn dispatch(&mut self, command: MemoryCommand) {
        self.apply(command);
        while let Some(command) = self.pending.pop() {
            self.apply(command);
        }
    }

    fn apply(&mut self, command: MemoryCommand) {
        trace!(target: "memory_session", "Command: {:?}", command);
        match command {
            MemoryCommand::SelectDifficulty(difficulty) => self.on_select_difficulty(difficulty),
            MemoryCommand::SelectCard(id) => self.on_select_card(id),
            MemoryCommand::UseHint => self.on_use_hint(),
            MemoryCommand::Reset => self.on_reset(),
            MemoryCommand::ReturnToMenu => self.on_return_to_menu(),
            MemoryCommand::AdvanceClock(duration) => self.on_advance_clock(duration),
        }
    }

    pub fn select_difficulty(&mut self, difficulty: Difficulty) {
        self.dispatch(MemoryCommand::SelectDifficulty(difficulty));
    }

    pub fn select_card(&mut self, id: CardId) {
        self.dispatch(MemoryCommand::SelectCard(id));
    }

    pub fn use_hint(&mut self) {
        self.dispatch(MemoryCommand::UseHint);
    }

    /// Fresh session at the same difficulty. The abandoned game is not
    /// recorded.
    pub fn reset(&mut self) {
        self.dispatch(MemoryCommand::Reset);
    }

    pub fn return_to_menu(&mut self) {
        self.dispatch(MemoryCommand::ReturnToMenu);
    }

    /// Moves virtual time forward, running every task that comes due on the
    /// way in deadline order.
    pub fn advance_clock(&mut self, duration: Duration) {
        self.dispatch(MemoryCommand::AdvanceClock(duration));
    }

    fn emit(&self, event: SessionEvent) {
        self.event_emitter.emit(event);
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        if self.phase != phase {
            info!(target: "memory_session", "Phase {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
            self.emit(SessionEvent::PhaseChanged(phase));
        }
    }

    fn set_score(&mut self, score: u32) {
        self.score = score;
        self.emit(SessionEvent::ScoreChanged(score));
    }

    fn sync_cards(&self) {
        self.emit(SessionEvent::CardsUpdated(self.cards.clone()));
    }

    fn sync_selection(&self) {
        self.emit(SessionEvent::SelectionChanged(self.selection.clone()));
    }

    fn sync_hints(&self) {
        self.emit(SessionEvent::HintsChanged {
            remaining: self.hints_remaining,
            showing: !self.hinted.is_empty(),
        });
    }

    fn set_feedback(&mut self, feedback: Feedback) {
        if let Some(task) = self.feedback_task.take() {
            self.scheduler.cancel(task);
        }
        self.feedback = Some(feedback.clone());
        self.emit(SessionEvent::FeedbackChanged(Some(feedback)));
        self.feedback_task = Some(
            self.scheduler
                .schedule_after(self.settings.timings.feedback, MemoryTask::ClearFeedback),
        );
    }

    fn clear_feedback(&mut self) {
        self.feedback_task = None;
        if self.feedback.take().is_some() {
            self.emit(SessionEvent::FeedbackChanged(None));
        }
    }

    fn card_mut(&mut self, id: CardId) -> Option<&mut GameCard> {
        self.cards.iter_mut().find(|card| card.id == id)
    }

    fn card(&self, id: CardId) -> Option<&GameCard> {
        self.cards.iter().find(|card| card.id == id)
    }

    fn key(&self) -> Option<LevelKey> {
        self.difficulty.map(LevelKey::memory)
    }

    fn matched_pairs(&self) -> usize {
        self.cards.iter().filter(|card| card.is_matched).count() / 2
    }

    fn total_pairs(&self) -> usize {
        self.difficulty.map(|d| d.total_pairs()).unwrap_or(0)
    }

    fn rounds_per_session(&self) -> u32 {
        self.settings.memory_rounds.max(1)
    }

    fn on_select_difficulty(&mut self, difficulty: Difficulty) {
        if self.phase != SessionPhase::AwaitingSelection {
            trace!(target: "memory_session", "Difficulty ignored in {:?}", self.phase);
            return;
        }
        info!(target: "memory_session", "Starting {} game", difficulty);
        self.difficulty = Some(difficulty);
        self.start_session();
    }

    fn start_session(&mut self) {
        let Some(difficulty) = self.difficulty else {
            return;
        };
        self.round = 1;
        self.moves = 0;
        self.time_played = 0;
        self.hints_used = 0;
        self.hints_remaining = difficulty.hint_count();
        self.set_score(0);
        self.emit(SessionEvent::LevelChanged(self.round));
        self.start_round();
    }

    /// Deals a fresh board and shows it face-up for the preview delay. Any
    /// task left over from the previous board is dropped first.
    fn start_round(&mut self) {
        let Some(difficulty) = self.difficulty else {
            return;
        };
        self.scheduler.cancel_all();
        self.feedback_task = None;
        self.hint_task = None;
        self.selection.clear();
        self.hinted.clear();
        self.clear_feedback();

        self.cards = deal_cards(difficulty.grid_size(), self.next_card_id, &mut self.rng);
        self.next_card_id += self.cards.len() as u32;
        if self.debug_mode {
            debug!(
                target: "memory_session",
                "Board: {:?}",
                self.cards.iter().map(|c| c.color).collect_vec()
            );
        }
        for card in self.cards.iter_mut() {
            card.flip_up();
        }
        self.is_previewing = true;
        self.countdown.reset(difficulty.time_limit());

        self.set_phase(SessionPhase::Active);
        self.sync_cards();
        self.sync_selection();
        self.sync_hints();
        self.emit(SessionEvent::PreviewChanged(true));
        self.emit(SessionEvent::TimeRemainingChanged(self.countdown.remaining()));

        self.scheduler
            .schedule_after(self.settings.timings.preview, MemoryTask::EndPreview);
        self.scheduler
            .schedule_after(Duration::from_secs(1), MemoryTask::Tick);
    }

    fn end_preview(&mut self) {
        if !self.is_previewing {
            return;
        }
        self.is_previewing = false;
        for card in self.cards.iter_mut() {
            card.flip_down();
        }
        self.sync_cards();
        self.emit(SessionEvent::PreviewChanged(false));
    }

    fn on_select_card(&mut self, id: CardId) {
        if !self.phase.is_active() || self.is_previewing || self.selection.len() >= 2 {
            trace!(target: "memory_session", "Card {:?} ignored", id);
            return;
        }
        if !self.hinted.is_empty() {
            self.hide_hint();
        }
        let Some(card) = self.card_mut(id) else {
            trace!(target: "memory_session", "No card {:?}", id);
            return;
        };
        if !card.is_selectable() {
            return;
        }
        card.flip_up();
        self.selection.push(id);

        if self.selection.len() == 2 {
            self.moves += 1;
            self.resolve_selection();
        } else {
            self.sync_cards();
            self.sync_selection();
        }
    }

    fn resolve_selection(&mut self) {
        let (first, second) = (self.selection[0], self.selection[1]);
        let is_match = match (self.card(first), self.card(second)) {
            (Some(a), Some(b)) => a.same_color(b),
            _ => false,
        };

        if is_match {
            for id in [first, second] {
                if let Some(card) = self.card_mut(id) {
                    card.mark_matched();
                }
            }
            self.selection.clear();
            self.set_score(self.score + MATCH_POINTS);
            self.set_feedback(Feedback::positive("Match! +10 points"));
            self.sync_cards();
            self.sync_selection();
            self.check_completion();
        } else {
            self.set_score(self.score.saturating_sub(MISMATCH_PENALTY));
            self.set_feedback(Feedback::negative("No Match! -5 points"));
            self.sync_cards();
            self.sync_selection();
            self.scheduler
                .schedule_after(self.settings.timings.mismatch, MemoryTask::ResolveMismatch);
        }
    }

    fn resolve_mismatch(&mut self) {
        for id in std::mem::take(&mut self.selection) {
            if let Some(card) = self.card_mut(id) {
                card.flip_down();
            }
        }
        self.sync_cards();
        self.sync_selection();
    }

    fn check_completion(&mut self) {
        if !self.phase.is_active() || self.matched_pairs() < self.total_pairs() {
            return;
        }
        self.time_played += self.countdown.elapsed();
        if self.round < self.rounds_per_session() {
            info!(target: "memory_session", "Round {} cleared", self.round);
            self.scheduler.cancel_all();
            self.feedback_task = None;
            self.hint_task = None;
            self.hinted.clear();
            if let Some(key) = self.key() {
                self.profiles.borrow_mut().unlock_level(key, self.round + 1);
            }
            self.set_phase(SessionPhase::LevelComplete);
            self.scheduler
                .schedule_after(self.settings.timings.level_transition, MemoryTask::NextRound);
        } else {
            self.finish(EndReason::Completed);
        }
    }

    fn next_round(&mut self) {
        if self.phase != SessionPhase::LevelComplete {
            return;
        }
        self.round += 1;
        self.emit(SessionEvent::LevelChanged(self.round));
        self.start_round();
    }

    fn on_use_hint(&mut self) {
        if !self.phase.is_active()
            || self.is_previewing
            || self.hints_remaining == 0
            || !self.hinted.is_empty()
            || self.selection.len() >= 2
        {
            trace!(target: "memory_session", "Hint ignored");
            return;
        }
        let candidates: Vec<&GameCard> =
            self.cards.iter().filter(|card| card.is_selectable()).collect();
        let pair = candidates
            .iter()
            .tuple_combinations()
            .find(|(a, b)| a.same_color(b))
            .or_else(|| candidates.iter().tuple_combinations().next())
            .map(|(a, b)| [a.id, b.id]);
        let Some(pair) = pair else {
            trace!(target: "memory_session", "No cards left to hint");
            return;
        };

        self.hints_remaining -= 1;
        self.hints_used += 1;
        for id in pair {
            if let Some(card) = self.card_mut(id) {
                card.flip_up();
            }
        }
        self.hinted = pair.to_vec();
        self.hint_task = Some(
            self.scheduler
                .schedule_after(self.settings.timings.hint, MemoryTask::HideHint),
        );
        self.sync_cards();
        self.sync_hints();
    }

    fn hide_hint(&mut self) {
        if let Some(task) = self.hint_task.take() {
            self.scheduler.cancel(task);
        }
        for id in std::mem::take(&mut self.hinted) {
            if let Some(card) = self.card_mut(id) {
                card.flip_down();
            }
        }
        self.sync_cards();
        self.sync_hints();
    }

    fn tick(&mut self) {
        if !self.phase.is_active() {
            return;
        }
        let remaining = self.countdown.tick();
        self.emit(SessionEvent::TimeRemainingChanged(remaining));
        if remaining == 0 {
            self.time_played += self.countdown.elapsed();
            self.finish(EndReason::TimedOut);
        } else {
            self.scheduler
                .schedule_after(Duration::from_secs(1), MemoryTask::Tick);
        }
    }

    /// Records the result. Runs at most once per session.
    fn finish(&mut self, reason: EndReason) {
        if self.phase.is_finished() {
            return;
        }
        let (Some(difficulty), Some(key)) = (self.difficulty, self.key()) else {
            return;
        };
        self.scheduler.cancel_all();
        self.feedback_task = None;
        self.hint_task = None;
        self.hinted.clear();
        self.is_previewing = false;
        self.selection.clear();
        for card in self.cards.iter_mut().filter(|card| !card.is_matched) {
            card.flip_down();
        }
        self.sync_cards();
        self.sync_selection();
        self.set_phase(SessionPhase::Finished(reason));

        let (profile_id, player_name) = match self.profiles.borrow().current_profile() {
            Some(profile) => (Some(profile.id), profile.name.clone()),
            None => (None, "Anonymous".to_string()),
        };
        let record = GameScore {
            id: Uuid::new_v4(),
            profile_id,
            player_name,
            game_type: GameType::MemoryMatch,
            difficulty: Some(difficulty),
            level: self.round,
            score: self.score,
            timestamp: Utc::now(),
            time_taken: self.time_played,
            hints_used: self.hints_used,
            moves: self.moves,
        };

        let previous_best = self.score_board.borrow().high_score(key);
        let table_position = self.score_board.borrow_mut().add_score(record.clone());
        self.profiles
            .borrow_mut()
            .update_profile_score(self.score, key, self.round);

        info!(
            target: "memory_session",
            "Game over ({:?}): {} points in {} moves",
            reason,
            self.score,
            self.moves
        );
        self.emit(SessionEvent::GameFinished(GameOutcome {
            reason,
            is_new_high_score: self.score > previous_best || previous_best == 0,
            record,
            table_position,
        }));
    }

    fn on_reset(&mut self) {
        if self.difficulty.is_none() || self.phase == SessionPhase::AwaitingSelection {
            return;
        }
        self.start_session();
    }

    fn on_return_to_menu(&mut self) {
        self.scheduler.cancel_all();
        self.feedback_task = None;
        self.hint_task = None;
        self.difficulty = None;
        self.round = 0;
        self.cards.clear();
        self.selection.clear();
        self.hinted.clear();
        self.is_previewing = false;
        self.countdown = Countdown::default();
        self.clear_feedback();
        self.set_phase(SessionPhase::AwaitingSelection);
        self.sync_cards();
        self.sync_selection();
    }

    fn on_advance_clock(&mut self, duration: Duration) {
        let until = self.scheduler.now() + duration;
        while let Some(task) = self.scheduler.pop_due(until) {
            trace!(target: "memory_session", "Running {:?}", task);
            match task {
                MemoryTask::Tick => self.tick(),
                MemoryTask::EndPreview => self.end_preview(),
                MemoryTask::ResolveMismatch => self.resolve_mismatch(),
                MemoryTask::HideHint => {
                    self.hint_task = None;
                    self.hide_hint();
                }
                MemoryTask::ClearFeedback => self.clear_feedback(),
                MemoryTask::NextRound => self.next_round(),
            }
        }
        self.scheduler.advance_to(until);
    }

    pub fn snapshot(&self) -> MemorySnapshot {
        MemorySnapshot {
            phase: self.phase,
            difficulty: self.difficulty,
            round: self.round,
            rounds_per_session: self.rounds_per_session(),
            cards: self.cards.clone(),
            selection: self.selection.clone(),
            score: self.score,
            moves: self.moves,
            time_remaining: self.countdown.remaining(),
            hints_remaining: self.hints_remaining,
            is_showing_hint: !self.hinted.is_empty(),
            is_previewing: self.is_previewing,
            matched_pairs: self.matched_pairs(),
            total_pairs: self.total_pairs(),
            feedback: self.feedback.clone(),
            high_score: self
                .key()
                .map(|key| self.score_board.borrow().high_score(key))
                .unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Channel;
    use crate::gateway::{MemoryStore, OfflineLeaderboard};
    use crate::model::PaletteColor;
    use std::collections::HashMap;
    use test_context::test_context;

    use crate::tests::UsingLogger;

    struct Fixture {
        session: Rc<RefCell<MemoryMatchSession>>,
        commands: EventEmitter<MemoryCommand>,
        events: Rc<RefCell<Vec<SessionEvent>>>,
        event_observer: EventObserver<SessionEvent>,
        score_board: Rc<RefCell<ScoreBoard>>,
        profiles: Rc<RefCell<ProfileStore>>,
    }

    fn fixture_with(settings: Settings) -> Fixture {
        let store = Rc::new(MemoryStore::new());
        let score_board = Rc::new(RefCell::new(ScoreBoard::new(store.clone())));
        let profiles = Rc::new(RefCell::new(ProfileStore::new(
            store,
            Rc::new(OfflineLeaderboard::default()),
        )));
        let (commands, command_observer) = Channel::<MemoryCommand>::new();
        let (event_emitter, event_observer) = Channel::<SessionEvent>::new();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        event_observer.subscribe(move |event: &SessionEvent| sink.borrow_mut().push(event.clone()));

        let session = MemoryMatchSession::new(
            command_observer,
            event_emitter,
            settings,
            score_board.clone(),
            profiles.clone(),
            Some(1234),
        );
        Fixture {
            session,
            commands,
            events,
            event_observer,
            score_board,
            profiles,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Settings::default())
    }

    impl Fixture {
        fn snapshot(&self) -> MemorySnapshot {
            self.session.borrow().snapshot()
        }

        fn advance(&self, duration: Duration) {
            self.session.borrow_mut().advance_clock(duration);
        }

        fn select(&self, id: CardId) {
            self.session.borrow_mut().select_card(id);
        }

        /// Starts a game and waits out the preview.
        fn start(&self, difficulty: Difficulty) {
            self.session.borrow_mut().select_difficulty(difficulty);
            self.advance(Duration::from_secs(2));
        }

        fn pairs(&self) -> Vec<(CardId, CardId)> {
            let mut by_color: HashMap<PaletteColor, Vec<CardId>> = HashMap::new();
            for card in self.snapshot().cards.iter().filter(|c| !c.is_matched) {
                by_color.entry(card.color).or_default().push(card.id);
            }
            by_color
                .values()
                .filter(|ids| ids.len() == 2)
                .map(|ids| (ids[0], ids[1]))
                .sorted()
                .collect()
        }

        fn mismatched(&self) -> (CardId, CardId) {
            let cards = self.snapshot().cards;
            let first = cards.iter().find(|c| !c.is_matched).map(|c| c.id).unwrap();
            let color = self.snapshot().cards.iter().find(|c| c.id == first).unwrap().color;
            let second = cards
                .iter()
                .find(|c| !c.is_matched && c.color != color)
                .map(|c| c.id)
                .unwrap();
            (first, second)
        }

        fn clear_board(&self) {
            for (a, b) in self.pairs() {
                self.select(a);
                self.select(b);
            }
        }

        fn outcomes(&self) -> Vec<GameOutcome> {
            self.events
                .borrow()
                .iter()
                .filter_map(|event| match event {
                    SessionEvent::GameFinished(outcome) => Some(outcome.clone()),
                    _ => None,
                })
                .collect()
        }
    }

    #[test]
    fn test_select_difficulty_starts_with_preview() {
        let f = fixture();
        f.session.borrow_mut().select_difficulty(Difficulty::Medium);

        let snapshot = f.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::Active);
        assert_eq!(snapshot.cards.len(), 16);
        assert_eq!(snapshot.time_remaining, 45);
        assert_eq!(snapshot.hints_remaining, 2);
        assert!(snapshot.is_previewing);
        assert!(snapshot.cards.iter().all(|c| c.is_face_up));

        // selections are ignored while the board is on show
        f.select(snapshot.cards[0].id);
        assert!(f.snapshot().selection.is_empty());

        f.advance(Duration::from_secs(2));
        let snapshot = f.snapshot();
        assert!(!snapshot.is_previewing);
        assert!(snapshot.cards.iter().all(|c| !c.is_face_up));
        assert_eq!(snapshot.time_remaining, 43);
    }

    #[test]
    fn test_difficulty_ignored_while_playing() {
        let f = fixture();
        f.start(Difficulty::Easy);
        f.session.borrow_mut().select_difficulty(Difficulty::Hard);
        assert_eq!(f.snapshot().difficulty, Some(Difficulty::Easy));
        assert_eq!(f.snapshot().cards.len(), 9);
    }

    #[test_context(UsingLogger)]
    #[test]
    fn test_matching_pair_scores(_: &mut UsingLogger) {
        let f = fixture();
        f.start(Difficulty::Easy);
        let (a, b) = f.pairs()[0];
        f.select(a);
        f.select(b);

        let snapshot = f.snapshot();
        assert_eq!(snapshot.score, 10);
        assert_eq!(snapshot.cards.iter().filter(|c| c.is_matched).count(), 2);
        assert!(snapshot
            .cards
            .iter()
            .filter(|c| c.id == a || c.id == b)
            .all(|c| c.is_matched && c.is_face_up));
        assert_eq!(snapshot.matched_pairs, 1);
        assert_eq!(snapshot.total_pairs, 4);
        assert_eq!(snapshot.moves, 1);
        assert!(snapshot.selection.is_empty());
        assert_eq!(snapshot.feedback, Some(Feedback::positive("Match! +10 points")));

        f.advance(Duration::from_secs(1));
        assert_eq!(f.snapshot().feedback, None);
    }

    #[test]
    fn test_mismatch_penalizes_and_flips_back() {
        let f = fixture();
        f.start(Difficulty::Easy);

        // score is floored at zero
        let (a, b) = f.mismatched();
        f.select(a);
        f.select(b);
        assert_eq!(f.snapshot().score, 0);
        f.advance(Duration::from_millis(500));

        let (c, d) = f.pairs()[0];
        f.select(c);
        f.select(d);
        assert_eq!(f.snapshot().score, 10);

        let (a, b) = f.mismatched();
        f.select(a);
        f.select(b);
        let snapshot = f.snapshot();
        assert_eq!(snapshot.score, 5);
        assert_eq!(snapshot.selection, vec![a, b]);
        assert!(snapshot.cards.iter().filter(|c| c.id == a || c.id == b).all(|c| c.is_face_up));

        // a third card waits for the pair to flip back
        let (e, _) = f.pairs()[0];
        f.select(e);
        assert_eq!(f.snapshot().selection.len(), 2);

        f.advance(Duration::from_millis(500));
        let snapshot = f.snapshot();
        assert!(snapshot.selection.is_empty());
        assert!(snapshot
            .cards
            .iter()
            .filter(|c| c.id == a || c.id == b)
            .all(|c| !c.is_face_up));
        assert_eq!(snapshot.moves, 3);
    }

    #[test]
    fn test_matched_cards_cannot_be_selected_again() {
        let f = fixture();
        f.start(Difficulty::Easy);
        let (a, b) = f.pairs()[0];
        f.select(a);
        f.select(b);
        f.select(a);
        assert!(f.snapshot().selection.is_empty());
        assert_eq!(f.snapshot().moves, 1);
    }

    #[test_context(UsingLogger)]
    #[test]
    fn test_timeout_finishes_regardless_of_progress(_: &mut UsingLogger) {
        let f = fixture();
        f.start(Difficulty::Easy);
        let (a, b) = f.pairs()[0];
        f.select(a);
        f.select(b);

        f.advance(Duration::from_secs(57));
        assert_eq!(f.snapshot().phase, SessionPhase::Active);
        assert_eq!(f.snapshot().time_remaining, 1);
        f.advance(Duration::from_secs(1));

        let snapshot = f.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::Finished(EndReason::TimedOut));
        assert_eq!(snapshot.time_remaining, 0);

        let outcomes = f.outcomes();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].reason, EndReason::TimedOut);
        assert_eq!(outcomes[0].record.score, 10);
        assert_eq!(outcomes[0].record.time_taken, 60);
        assert_eq!(outcomes[0].record.player_name, "Player");

        // nothing else fires after the end
        f.advance(Duration::from_secs(120));
        f.select(f.snapshot().cards[0].id);
        assert_eq!(f.outcomes().len(), 1);
        let key = LevelKey::memory(Difficulty::Easy);
        assert_eq!(f.score_board.borrow().scores(key).len(), 1);
        assert_eq!(f.profiles.borrow().current_profile().unwrap().total_games_played, 1);
    }

    #[test]
    fn test_hint_reveals_a_pair_then_hides() {
        let f = fixture();
        f.start(Difficulty::Easy);
        f.session.borrow_mut().use_hint();

        let snapshot = f.snapshot();
        assert_eq!(snapshot.hints_remaining, 0);
        assert!(snapshot.is_showing_hint);
        assert!(snapshot.selection.is_empty());
        let shown: Vec<&GameCard> = snapshot.cards.iter().filter(|c| c.is_face_up).collect();
        assert_eq!(shown.len(), 2);
        assert_eq!(shown[0].color, shown[1].color);

        f.advance(Duration::from_secs(2));
        let snapshot = f.snapshot();
        assert!(!snapshot.is_showing_hint);
        assert!(snapshot.cards.iter().all(|c| !c.is_face_up));
    }

    #[test]
    fn test_hint_with_empty_budget_changes_nothing() {
        let f = fixture();
        f.start(Difficulty::Easy);
        f.session.borrow_mut().use_hint();
        f.advance(Duration::from_secs(2));
        let before = f.snapshot();

        f.session.borrow_mut().use_hint();
        let after = f.snapshot();
        assert_eq!(after.hints_remaining, 0);
        assert!(!after.is_showing_hint);
        assert!(after.cards.iter().all(|c| !c.is_face_up));
        assert_eq!(before, after);
    }

    #[test]
    fn test_selecting_while_hint_shows_hides_it_first() {
        let f = fixture();
        f.start(Difficulty::Medium);
        f.session.borrow_mut().use_hint();
        let hinted: Vec<CardId> = f
            .snapshot()
            .cards
            .iter()
            .filter(|c| c.is_face_up)
            .map(|c| c.id)
            .collect();

        // a hinted card counts as a normal pick once the hint is gone
        f.select(hinted[0]);
        let snapshot = f.snapshot();
        assert!(!snapshot.is_showing_hint);
        assert_eq!(snapshot.selection, vec![hinted[0]]);
        assert_eq!(snapshot.cards.iter().filter(|c| c.is_face_up).count(), 1);
        assert_eq!(snapshot.hints_remaining, 1);

        // the cancelled hide never fires into the selection
        f.advance(Duration::from_secs(3));
        assert_eq!(f.snapshot().selection, vec![hinted[0]]);
    }

    #[test]
    fn test_hint_blocked_during_preview() {
        let f = fixture();
        f.session.borrow_mut().select_difficulty(Difficulty::Hard);
        f.session.borrow_mut().use_hint();
        assert_eq!(f.snapshot().hints_remaining, 3);
    }

    #[test_context(UsingLogger)]
    #[test]
    fn test_clearing_every_round_completes(_: &mut UsingLogger) {
        let mut settings = Settings::default();
        settings.memory_rounds = 2;
        let f = fixture_with(settings);
        let key = LevelKey::memory(Difficulty::Easy);
        f.start(Difficulty::Easy);
        let first_ids: Vec<CardId> = f.snapshot().cards.iter().map(|c| c.id).collect();

        f.clear_board();
        let snapshot = f.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::LevelComplete);
        assert_eq!(snapshot.score, 40);
        assert_eq!(f.profiles.borrow().get_level(key), 2);

        // the clock is stopped between rounds
        f.advance(Duration::from_secs(1));
        assert_eq!(f.snapshot().time_remaining, 58);
        f.advance(Duration::from_secs(1));

        let snapshot = f.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::Active);
        assert_eq!(snapshot.round, 2);
        assert_eq!(snapshot.time_remaining, 60);
        assert_eq!(snapshot.matched_pairs, 0);
        assert!(snapshot.cards.iter().all(|c| !first_ids.contains(&c.id)));

        f.advance(Duration::from_secs(2));
        f.clear_board();
        let snapshot = f.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::Finished(EndReason::Completed));
        assert_eq!(snapshot.score, 80);

        let outcomes = f.outcomes();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].record.level, 2);
        assert_eq!(outcomes[0].record.moves, 8);
        assert_eq!(f.profiles.borrow().get_level(key), 2);
    }

    #[test]
    fn test_first_score_is_high_score_and_ranks_first() {
        let mut settings = Settings::default();
        settings.memory_rounds = 1;
        let f = fixture_with(settings);
        f.start(Difficulty::Hard);
        f.clear_board();

        let outcome = f.outcomes().pop().unwrap();
        assert!(outcome.is_new_high_score);
        assert_eq!(outcome.table_position, Some(1));
        assert_eq!(outcome.record.score, 120);

        let me = f.profiles.borrow().current_profile().unwrap().id;
        let board = f.score_board.borrow();
        assert_eq!(board.high_score(LevelKey::memory(Difficulty::Hard)), 120);
        assert_eq!(
            board.user_rank(me, GameType::MemoryMatch, Some(Difficulty::Hard)),
            Some(1)
        );
        drop(board);
        assert_eq!(f.snapshot().high_score, 120);
    }

    #[test]
    fn test_reset_drops_pending_tasks() {
        let f = fixture();
        f.start(Difficulty::Easy);
        let (c, d) = f.pairs()[0];
        f.select(c);
        f.select(d);
        let (a, b) = f.mismatched();
        f.select(a);
        f.select(b);

        f.session.borrow_mut().reset();
        let snapshot = f.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::Active);
        assert_eq!(snapshot.score, 0);
        assert_eq!(snapshot.moves, 0);
        assert_eq!(snapshot.time_remaining, 60);
        assert!(snapshot.selection.is_empty());
        assert_eq!(snapshot.feedback, None);

        f.advance(Duration::from_secs(2));
        let snapshot = f.snapshot();
        assert!(snapshot.cards.iter().all(|c| !c.is_face_up));
        assert_eq!(snapshot.time_remaining, 58);
        // abandoned games are not recorded
        assert!(f.outcomes().is_empty());
    }

    #[test]
    fn test_return_to_menu_clears_everything() {
        let f = fixture();
        f.start(Difficulty::Medium);
        f.session.borrow_mut().use_hint();
        f.session.borrow_mut().return_to_menu();

        let snapshot = f.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::AwaitingSelection);
        assert!(snapshot.cards.is_empty());
        assert_eq!(snapshot.difficulty, None);
        assert!(!snapshot.is_showing_hint);

        f.advance(Duration::from_secs(100));
        assert_eq!(f.snapshot().phase, SessionPhase::AwaitingSelection);
        assert!(f.outcomes().is_empty());

        f.session.borrow_mut().select_difficulty(Difficulty::Hard);
        assert_eq!(f.snapshot().cards.len(), 25);
    }

    #[test]
    fn test_commands_arrive_through_channel() {
        let f = fixture();
        f.commands.emit(MemoryCommand::SelectDifficulty(Difficulty::Easy));
        f.commands.emit(MemoryCommand::AdvanceClock(Duration::from_secs(2)));
        let (a, b) = f.pairs()[0];
        f.commands.emit(MemoryCommand::SelectCard(a));
        f.commands.emit(MemoryCommand::SelectCard(b));
        assert_eq!(f.snapshot().score, 10);

        assert!(f
            .events
            .borrow()
            .iter()
            .any(|e| matches!(e, SessionEvent::PhaseChanged(SessionPhase::Active))));
        assert!(f
            .events
            .borrow()
            .iter()
            .any(|e| matches!(e, SessionEvent::ScoreChanged(10))));

        f.session.borrow_mut().destroy();
        f.commands.emit(MemoryCommand::ReturnToMenu);
        assert_eq!(f.snapshot().phase, SessionPhase::Active);
    }

    #[test]
    fn test_listener_commands_run_after_direct_calls() {
        let f = fixture();
        let commands = f.commands.clone();
        f.event_observer.subscribe(move |event: &SessionEvent| {
            if matches!(event, SessionEvent::GameFinished(_)) {
                commands.emit(MemoryCommand::ReturnToMenu);
            }
        });
        f.start(Difficulty::Easy);
        f.advance(Duration::from_secs(61));

        assert_eq!(f.outcomes().len(), 1);
        let snapshot = f.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::AwaitingSelection);
        assert!(snapshot.cards.is_empty());
    }

    #[test]
    fn test_timeout_during_mismatch_turns_cards_down() {
        let f = fixture();
        f.start(Difficulty::Easy);
        let (c, d) = f.pairs()[0];
        f.select(c);
        f.select(d);
        f.advance(Duration::from_millis(57_700));
        assert_eq!(f.snapshot().time_remaining, 1);

        // the flip-back is due after the last tick
        let (a, b) = f.mismatched();
        f.select(a);
        f.select(b);
        assert_eq!(f.snapshot().selection, vec![a, b]);
        f.advance(Duration::from_secs(1));

        let snapshot = f.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::Finished(EndReason::TimedOut));
        assert!(snapshot.selection.is_empty());
        assert!(snapshot.cards.iter().all(|c| c.is_face_up == c.is_matched));
        assert_eq!(snapshot.matched_pairs, 1);
    }

    #[test]
    fn test_same_seed_deals_same_board() {
        let a = fixture();
        let b = fixture();
        a.start(Difficulty::Hard);
        b.start(Difficulty::Hard);
        assert_eq!(a.snapshot().cards, b.snapshot().cards);
    }
}
