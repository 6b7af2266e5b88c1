use super::palette::PALETTE;
use super::PaletteColor;

/// One rung of the Color Match ladder. `required_score` is cumulative over
/// the whole session, not per level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorMatchLevel {
    pub level: u32,
    pub palette_size: usize,
    pub time_limit: u32,
    pub required_score: u32,
    pub grid_size: usize,
    pub description: &'static str,
    pub misleading_labels: bool,
}

const fn level(
    level: u32,
    palette_size: usize,
    time_limit: u32,
    required_score: u32,
    grid_size: usize,
    description: &'static str,
    misleading_labels: bool,
) -> ColorMatchLevel {
    ColorMatchLevel {
        level,
        palette_size,
        time_limit,
        required_score,
        grid_size,
        description,
        misleading_labels,
    }
}

pub const COLOR_MATCH_LEVELS: [ColorMatchLevel; 10] = [
    level(1, 5, 60, 100, 2, "Basic Colors", false),
    level(2, 8, 50, 150, 2, "More Colors", false),
    level(3, 12, 45, 200, 3, "Advanced Colors", false),
    level(4, 15, 40, 250, 3, "Expert Colors", false),
    level(5, 19, 35, 300, 4, "Master Colors", false),
    level(6, 19, 30, 350, 4, "Speed Challenge", false),
    level(7, 19, 25, 400, 4, "Color Expert", false),
    level(8, 19, 20, 450, 5, "Ultimate Challenge", false),
    level(9, 19, 15, 500, 5, "Impossible Mode", true),
    level(10, 19, 10, 600, 5, "Color Master", true),
];

impl ColorMatchLevel {
    pub fn count() -> u32 {
        COLOR_MATCH_LEVELS.len() as u32
    }

    /// Level data for a 1-based level, clamped to the table.
    pub fn get(level: u32) -> &'static ColorMatchLevel {
        let index = (level.max(1) as usize - 1).min(COLOR_MATCH_LEVELS.len() - 1);
        &COLOR_MATCH_LEVELS[index]
    }

    pub fn is_last(&self) -> bool {
        self.level >= Self::count()
    }

    pub fn palette(&self) -> &'static [PaletteColor] {
        &PALETTE[..self.palette_size.min(PALETTE.len())]
    }

    /// Options shown per round: the grid, capped by how many distinct colors
    /// the level can draw from.
    pub fn option_count(&self) -> usize {
        (self.grid_size * self.grid_size).min(self.palette().len())
    }
}
