use serde::{Deserialize, Serialize};

use super::PaletteColor;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CardId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardState {
    Hidden,
    Revealed,
    Matched,
}

/// One card of a Memory Match board. State changes go through the methods
/// below so a card can never be matched while face-down.
#[readonly::make]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameCard {
    pub id: CardId,
    pub color: PaletteColor,
    pub is_face_up: bool,
    pub is_matched: bool,
}

impl GameCard {
    pub fn new(id: CardId, color: PaletteColor) -> Self {
        Self {
            id,
            color,
            is_face_up: false,
            is_matched: false,
        }
    }

    pub fn state(&self) -> CardState {
        match (self.is_matched, self.is_face_up) {
            (true, _) => CardState::Matched,
            (false, true) => CardState::Revealed,
            (false, false) => CardState::Hidden,
        }
    }

    pub fn is_selectable(&self) -> bool {
        self.state() == CardState::Hidden
    }

    pub fn same_color(&self, other: &GameCard) -> bool {
        self.color == other.color
    }

    pub(crate) fn flip_up(&mut self) {
        self.is_face_up = true;
    }

    /// No-op on matched cards.
    pub(crate) fn flip_down(&mut self) {
        if !self.is_matched {
            self.is_face_up = false;
        }
    }

    pub(crate) fn mark_matched(&mut self) {
        self.is_matched = true;
        self.is_face_up = true;
    }
}
