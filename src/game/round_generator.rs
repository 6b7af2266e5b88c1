use log::trace;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::model::{CardId, ColorMatchLevel, ColorOption, ColorRound, GameCard, OptionId, PaletteColor};

/// Deals a square board of `grid_size`² cards in color pairs. An odd cell
/// count gets one bonus card in a color no pair uses. Ids run from
/// `first_id` in board order, so they never repeat across rounds when the
/// caller keeps counting.
pub fn deal_cards<R: Rng + ?Sized>(grid_size: usize, first_id: u32, rng: &mut R) -> Vec<GameCard> {
    let cells = grid_size * grid_size;
    let pairs = cells / 2;

    let mut colors = PaletteColor::memory_palette().to_vec();
    colors.shuffle(rng);

    let mut faces: Vec<PaletteColor> = colors
        .iter()
        .take(pairs)
        .flat_map(|color| [*color, *color])
        .collect();
    if cells % 2 == 1 {
        if let Some(bonus) = colors.get(pairs) {
            faces.push(*bonus);
        }
    }
    faces.shuffle(rng);

    trace!(target: "round_generator", "Dealt {} cards ({} pairs)", faces.len(), pairs);
    faces
        .into_iter()
        .enumerate()
        .map(|(index, color)| GameCard::new(CardId(first_id + index as u32), color))
        .collect()
}

/// Picks a target from the level's palette plus distinct distractors, in
/// random order. On misleading levels every displayed name is shifted one
/// option along, so no swatch carries its own name.
pub fn deal_color_round<R: Rng + ?Sized>(
    level: &ColorMatchLevel,
    first_id: u32,
    rng: &mut R,
) -> ColorRound {
    let mut colors = level.palette().to_vec();
    colors.shuffle(rng);
    colors.truncate(level.option_count().max(1));

    let target = colors[rng.random_range(0..colors.len())];
    let mut options: Vec<ColorOption> = colors
        .iter()
        .enumerate()
        .map(|(index, color)| {
            ColorOption::new(OptionId(first_id + index as u32), *color, *color == target)
        })
        .collect();

    if level.misleading_labels && options.len() > 1 {
        let names: Vec<String> = options.iter().map(|o| o.correct_name.clone()).collect();
        for (index, option) in options.iter_mut().enumerate() {
            option.relabel(&names[(index + 1) % names.len()]);
        }
    }

    trace!(
        target: "round_generator",
        "Level {} round: target {:?} among {} options",
        level.level,
        target,
        options.len()
    );
    ColorRound { target, options }
}
