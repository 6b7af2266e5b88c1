use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Memory Match difficulty. Each one fixes the grid, the countdown and the
/// hint budget.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn all() -> Vec<Difficulty> {
        vec![Difficulty::Easy, Difficulty::Medium, Difficulty::Hard]
    }

    /// Cards per side of the square grid.
    pub fn grid_size(&self) -> usize {
        match self {
            Difficulty::Easy => 3,
            Difficulty::Medium => 4,
            Difficulty::Hard => 5,
        }
    }

    /// Countdown in seconds.
    pub fn time_limit(&self) -> u32 {
        match self {
            Difficulty::Easy => 60,
            Difficulty::Medium => 45,
            Difficulty::Hard => 30,
        }
    }

    pub fn hint_count(&self) -> u32 {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Medium => 2,
            Difficulty::Hard => 3,
        }
    }

    pub fn card_count(&self) -> usize {
        self.grid_size() * self.grid_size()
    }

    pub fn total_pairs(&self) -> usize {
        self.card_count() / 2
    }

    /// Odd grids get one unpaired card.
    pub fn has_bonus_card(&self) -> bool {
        self.card_count() % 2 == 1
    }

    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    pub(crate) fn slug(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::all()
            .into_iter()
            .find(|d| d.slug() == s.to_ascii_lowercase())
            .ok_or_else(|| format!("unknown difficulty: {}", s))
    }
}
