use serde::{Deserialize, Serialize};

use super::PaletteColor;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OptionId(pub u32);

/// One swatch in a Color Match round. `name` is what the player reads and may
/// be a decoy; `correct_name` always names `color`.
#[readonly::make]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColorOption {
    pub id: OptionId,
    pub color: PaletteColor,
    pub name: String,
    pub correct_name: String,
    pub is_correct: bool,
}

impl ColorOption {
    pub fn new(id: OptionId, color: PaletteColor, is_correct: bool) -> Self {
        Self {
            id,
            color,
            name: color.name().to_string(),
            correct_name: color.name().to_string(),
            is_correct,
        }
    }

    pub fn is_mislabeled(&self) -> bool {
        self.name != self.correct_name
    }

    pub(crate) fn relabel(&mut self, name: &str) {
        self.name = name.to_string();
    }
}

/// Target plus shuffled options for one Color Match round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColorRound {
    pub target: PaletteColor,
    pub options: Vec<ColorOption>,
}

impl ColorRound {
    pub fn correct_option(&self) -> Option<&ColorOption> {
        self.options.iter().find(|option| option.is_correct)
    }

    pub fn option(&self, id: OptionId) -> Option<&ColorOption> {
        self.options.iter().find(|option| option.id == id)
    }
}
