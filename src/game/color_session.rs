use chrono::Utc;
use log::{debug, info, trace, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use uuid::Uuid;

use super::profile_store::ProfileStore;
use super::round_generator::deal_color_round;
use super::scheduler::{Scheduler, TaskHandle};
use super::score_board::ScoreBoard;
use super::settings::Settings;
use crate::destroyable::Destroyable;
use crate::events::{
    wire_handler, EventEmitter, EventHandler, EventObserver, PendingQueue, Unsubscriber,
};
use crate::model::{
    ColorCommand, ColorMatchLevel, ColorRound, ColorSnapshot, Countdown, EndReason, Feedback,
    GameOutcome, GameScore, GameType, LevelKey, OptionId, SessionEvent, SessionPhase,
};

const CORRECT_POINTS: u32 = 10;
const WRONG_PENALTY: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColorTask {
    Tick,
    ClearFeedback,
    NextLevel,
}

/// One Color Match session: find the target swatch, round after round,
/// until the running score reaches the level's threshold.
pub struct ColorMatchSession {
    phase: SessionPhase,
    starting_level: u32,
    level: u32,
    round: Option<ColorRound>,
    selected: Option<OptionId>,
    score: u32,
    answers: u32,
    countdown: Countdown,
    time_played: u32,
    feedback: Option<Feedback>,
    feedback_task: Option<TaskHandle>,
    next_option_id: u32,
    scheduler: Scheduler<ColorTask>,
    rng: StdRng,
    debug_mode: bool,
    settings: Settings,
    score_board: Rc<RefCell<ScoreBoard>>,
    profiles: Rc<RefCell<ProfileStore>>,
    event_emitter: EventEmitter<SessionEvent>,
    pending: PendingQueue<ColorCommand>,
    subscription: Option<Unsubscriber<ColorCommand>>,
}

impl Destroyable for ColorMatchSession {
    fn destroy(&mut self) {
        self.scheduler.cancel_all();
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

impl EventHandler<ColorCommand> for ColorMatchSession {
    fn handle_event(&mut self, command: &ColorCommand) {
        self.dispatch(command.clone());
    }
}

impl ColorMatchSession {
    pub fn new(
        command_observer: EventObserver<ColorCommand>,
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
            debug!(target: "color_session", "Color Match seed: {}", seed);
        }
        let pending = PendingQueue::new();
        let session = Rc::new(RefCell::new(Self {
            phase: SessionPhase::AwaitingSelection,
            starting_level: 1,
            level: 1,
            round: None,
            selected: None,
            score: 0,
            answers: 0,
            countdown: Countdown::default(),
            time_played: 0,
            feedback: None,
            feedback_task: None,
            next_option_id: 0,
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
    fn dispatch(&mut self, command: ColorCommand) {
        self.apply(command);
        while let Some(command) = self.pending.pop() {
            self.apply(command);
        }
    }

    fn apply(&mut self, command: ColorCommand) {
        trace!(target: "color_session", "Command: {:?}", command);
        match command {
            ColorCommand::SelectLevel(level) => self.on_select_level(level),
            ColorCommand::SelectOption(id) => self.on_select_option(id),
            ColorCommand::CheckAnswer => self.on_check_answer(),
            ColorCommand::ChooseOption(id) => {
                self.on_select_option(id);
                if self.selected == Some(id) {
                    self.on_check_answer();
                }
            }
            ColorCommand::RestartLevel => self.on_restart_level(),
            ColorCommand::RestartGame => self.on_restart_game(),
            ColorCommand::ReturnToMenu => self.on_return_to_menu(),
            ColorCommand::AdvanceClock(duration) => self.on_advance_clock(duration),
        }
    }

    /// Starts at `level` if the current profile has unlocked it.
    pub fn select_level(&mut self, level: u32) {
        self.dispatch(ColorCommand::SelectLevel(level));
    }

    pub fn select_option(&mut self, id: OptionId) {
        self.dispatch(ColorCommand::SelectOption(id));
    }

    pub fn check_answer(&mut self) {
        self.dispatch(ColorCommand::CheckAnswer);
    }

    pub fn choose_option(&mut self, id: OptionId) {
        self.dispatch(ColorCommand::ChooseOption(id));
    }

    /// Replays the current level from a zero score.
    pub fn restart_level(&mut self) {
        self.dispatch(ColorCommand::RestartLevel);
    }

    /// Back to the level the session was started at.
    pub fn restart_game(&mut self) {
        self.dispatch(ColorCommand::RestartGame);
    }

    pub fn return_to_menu(&mut self) {
        self.dispatch(ColorCommand::ReturnToMenu);
    }

    pub fn advance_clock(&mut self, duration: Duration) {
        self.dispatch(ColorCommand::AdvanceClock(duration));
    }

    fn emit(&self, event: SessionEvent) {
        self.event_emitter.emit(event);
    }

    fn level_data(&self) -> &'static ColorMatchLevel {
        ColorMatchLevel::get(self.level)
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        if self.phase != phase {
            info!(target: "color_session", "Phase {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
            self.emit(SessionEvent::PhaseChanged(phase));
        }
    }

    fn set_score(&mut self, score: u32) {
        self.score = score;
        self.emit(SessionEvent::ScoreChanged(score));
    }

    fn set_selected(&mut self, selected: Option<OptionId>) {
        self.selected = selected;
        self.emit(SessionEvent::OptionSelected(selected));
    }

    fn set_feedback(&mut self, feedback: Feedback) {
        if let Some(task) = self.feedback_task.take() {
            self.scheduler.cancel(task);
        }
        self.feedback = Some(feedback.clone());
        self.emit(SessionEvent::FeedbackChanged(Some(feedback)));
        self.feedback_task = Some(
            self.scheduler
                .schedule_after(self.settings.timings.feedback, ColorTask::ClearFeedback),
        );
    }

    fn clear_feedback(&mut self) {
        self.feedback_task = None;
        if self.feedback.take().is_some() {
            self.emit(SessionEvent::FeedbackChanged(None));
        }
    }

    fn on_select_level(&mut self, level: u32) {
        if self.phase != SessionPhase::AwaitingSelection {
            trace!(target: "color_session", "Level ignored in {:?}", self.phase);
            return;
        }
        let unlocked = self.profiles.borrow().get_level(LevelKey::color());
        if level == 0 || level > ColorMatchLevel::count() || level > unlocked {
            warn!(
                target: "color_session",
                "Level {} not available (unlocked up to {})",
                level,
                unlocked
            );
            return;
        }
        info!(target: "color_session", "Starting at level {}", level);
        self.starting_level = level;
        self.start_game();
    }

    fn start_game(&mut self) {
        self.level = self.starting_level;
        self.answers = 0;
        self.time_played = 0;
        self.set_score(0);
        self.setup_level();
    }

    /// Fresh clock and round for the current level; tasks from before are
    /// dropped.
    fn setup_level(&mut self) {
        self.scheduler.cancel_all();
        self.feedback_task = None;
        self.clear_feedback();
        self.countdown.reset(self.level_data().time_limit);

        self.set_phase(SessionPhase::Active);
        self.emit(SessionEvent::LevelChanged(self.level));
        self.emit(SessionEvent::TimeRemainingChanged(self.countdown.remaining()));
        self.new_round();
        self.scheduler
            .schedule_after(Duration::from_secs(1), ColorTask::Tick);
    }

    /// Every new target gets the level's full time limit.
    fn refill_clock(&mut self) {
        self.time_played += self.countdown.elapsed();
        self.countdown.reset(self.level_data().time_limit);
        self.emit(SessionEvent::TimeRemainingChanged(self.countdown.remaining()));
    }

    fn new_round(&mut self) {
        let round = deal_color_round(self.level_data(), self.next_option_id, &mut self.rng);
        self.next_option_id += round.options.len() as u32;
        if self.debug_mode {
            debug!(target: "color_session", "Target: {:?}", round.target);
        }
        self.emit(SessionEvent::OptionsUpdated {
            target: round.target,
            options: round.options.clone(),
        });
        self.round = Some(round);
        self.set_selected(None);
    }

    fn on_select_option(&mut self, id: OptionId) {
        if !self.phase.is_active() {
            trace!(target: "color_session", "Option {:?} ignored in {:?}", id, self.phase);
            return;
        }
        let exists = self
            .round
            .as_ref()
            .is_some_and(|round| round.option(id).is_some());
        if !exists {
            trace!(target: "color_session", "No option {:?}", id);
            return;
        }
        self.set_selected(Some(id));
    }

    fn on_check_answer(&mut self) {
        if !self.phase.is_active() {
            return;
        }
        let Some(selected) = self.selected else {
            trace!(target: "color_session", "Nothing selected");
            return;
        };
        let is_correct = self
            .round
            .as_ref()
            .and_then(|round| round.option(selected))
            .is_some_and(|option| option.is_correct);
        self.answers += 1;

        if is_correct {
            self.set_score(self.score + CORRECT_POINTS);
            self.set_feedback(Feedback::positive("Correct! +10 points"));
            if self.score >= self.level_data().required_score {
                self.complete_level();
            } else {
                self.refill_clock();
                self.new_round();
            }
        } else {
            self.set_score(self.score.saturating_sub(WRONG_PENALTY));
            self.set_feedback(Feedback::negative("Wrong! -5 points"));
            self.set_selected(None);
        }
    }

    fn complete_level(&mut self) {
        self.time_played += self.countdown.elapsed();
        if self.level_data().is_last() {
            self.finish(EndReason::Completed);
            return;
        }
        info!(target: "color_session", "Level {} cleared", self.level);
        self.scheduler.cancel_all();
        self.feedback_task = None;
        self.profiles
            .borrow_mut()
            .unlock_level(LevelKey::color(), self.level + 1);
        self.set_phase(SessionPhase::LevelComplete);
        self.scheduler
            .schedule_after(self.settings.timings.level_transition, ColorTask::NextLevel);
    }

    fn next_level(&mut self) {
        if self.phase != SessionPhase::LevelComplete {
            return;
        }
        self.level += 1;
        self.setup_level();
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
                .schedule_after(Duration::from_secs(1), ColorTask::Tick);
        }
    }

    /// Records the result. Runs at most once per session.
    fn finish(&mut self, reason: EndReason) {
        if self.phase.is_finished() {
            return;
        }
        self.scheduler.cancel_all();
        self.feedback_task = None;
        self.set_phase(SessionPhase::Finished(reason));

        let key = LevelKey::color();
        let (profile_id, player_name) = match self.profiles.borrow().current_profile() {
            Some(profile) => (Some(profile.id), profile.name.clone()),
            None => (None, "Anonymous".to_string()),
        };
        let record = GameScore {
            id: Uuid::new_v4(),
            profile_id,
            player_name,
            game_type: GameType::ColorMatch,
            difficulty: None,
            level: self.level,
            score: self.score,
            timestamp: Utc::now(),
            time_taken: self.time_played,
            hints_used: 0,
            moves: self.answers,
        };

        let previous_best = self.score_board.borrow().high_score(key);
        let table_position = self.score_board.borrow_mut().add_score(record.clone());
        self.profiles
            .borrow_mut()
            .update_profile_score(self.score, key, self.level);

        info!(
            target: "color_session",
            "Game over ({:?}) on level {}: {} points",
            reason,
            self.level,
            self.score
        );
        self.emit(SessionEvent::GameFinished(GameOutcome {
            reason,
            is_new_high_score: self.score > previous_best || previous_best == 0,
            record,
            table_position,
        }));
    }

    fn on_restart_level(&mut self) {
        if self.phase == SessionPhase::AwaitingSelection {
            return;
        }
        self.set_score(0);
        self.setup_level();
    }

    fn on_restart_game(&mut self) {
        if self.phase == SessionPhase::AwaitingSelection {
            return;
        }
        self.start_game();
    }

    fn on_return_to_menu(&mut self) {
        self.scheduler.cancel_all();
        self.feedback_task = None;
        self.round = None;
        self.countdown = Countdown::default();
        self.clear_feedback();
        self.set_selected(None);
        self.set_phase(SessionPhase::AwaitingSelection);
    }

    fn on_advance_clock(&mut self, duration: Duration) {
        let until = self.scheduler.now() + duration;
        while let Some(task) = self.scheduler.pop_due(until) {
            trace!(target: "color_session", "Running {:?}", task);
            match task {
                ColorTask::Tick => self.tick(),
                ColorTask::ClearFeedback => self.clear_feedback(),
                ColorTask::NextLevel => self.next_level(),
            }
        }
        self.scheduler.advance_to(until);
    }

    pub fn snapshot(&self) -> ColorSnapshot {
        let level = self.level_data();
        ColorSnapshot {
            phase: self.phase,
            level: self.level,
            level_description: level.description.to_string(),
            required_score: level.required_score,
            grid_size: level.grid_size,
            target: self.round.as_ref().map(|round| round.target),
            options: self
                .round
                .as_ref()
                .map(|round| round.options.clone())
                .unwrap_or_default(),
            selected: self.selected,
            score: self.score,
            time_remaining: self.countdown.remaining(),
            feedback: self.feedback.clone(),
            high_score: self.score_board.borrow().high_score(LevelKey::color()),
        }
    }
}
