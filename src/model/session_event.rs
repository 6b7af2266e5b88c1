use super::{
    CardId, ColorOption, EndReason, Feedback, GameCard, GameScore, OptionId, PaletteColor,
    SessionPhase,
};

/// What a finished session produced. Published once per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameOutcome {
    pub reason: EndReason,
    pub record: GameScore,
    /// Beat the previous best for this track (or the track was empty).
    pub is_new_high_score: bool,
    /// Position in the local top-10 table, if the record made it in.
    pub table_position: Option<usize>,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    PhaseChanged(SessionPhase),
    ScoreChanged(u32),
    TimeRemainingChanged(u32),
    LevelChanged(u32),
    CardsUpdated(Vec<GameCard>),
    OptionsUpdated {
        target: PaletteColor,
        options: Vec<ColorOption>,
    },
    SelectionChanged(Vec<CardId>),
    OptionSelected(Option<OptionId>),
    HintsChanged {
        remaining: u32,
        showing: bool,
    },
    PreviewChanged(bool),
    FeedbackChanged(Option<Feedback>),
    GameFinished(GameOutcome),
}
