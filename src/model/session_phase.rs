use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    /// Every round or level was cleared.
    Completed,
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SessionPhase {
    /// Waiting for a difficulty (Memory Match) or starting level (Color Match).
    #[default]
    AwaitingSelection,
    Active,
    /// Round or level cleared; the next one starts after the transition delay.
    LevelComplete,
    Finished(EndReason),
}

impl SessionPhase {
    pub fn is_active(&self) -> bool {
        *self == SessionPhase::Active
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, SessionPhase::Finished(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedbackKind {
    Positive,
    Negative,
}

/// Short-lived message shown after a move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub kind: FeedbackKind,
    pub message: String,
}

impl Feedback {
    pub fn positive(message: &str) -> Self {
        Self {
            kind: FeedbackKind::Positive,
            message: message.to_string(),
        }
    }

    pub fn negative(message: &str) -> Self {
        Self {
            kind: FeedbackKind::Negative,
            message: message.to_string(),
        }
    }
}
