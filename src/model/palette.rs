use serde::{Deserialize, Serialize};
use std::fmt::Display;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PaletteColor {
    Red,
    Blue,
    Green,
    Yellow,
    Orange,
    Purple,
    Pink,
    Brown,
    Cyan,
    Mint,
    Teal,
    Indigo,
    Gray,
    Black,
    White,
    LightRed,
    LightBlue,
    LightGreen,
    LightYellow,
}

/// Every color in presentation order. Color Match levels use a prefix of
/// this list.
pub const PALETTE: [PaletteColor; 19] = [
    PaletteColor::Red,
    PaletteColor::Blue,
    PaletteColor::Green,
    PaletteColor::Yellow,
    PaletteColor::Orange,
    PaletteColor::Purple,
    PaletteColor::Pink,
    PaletteColor::Brown,
    PaletteColor::Cyan,
    PaletteColor::Mint,
    PaletteColor::Teal,
    PaletteColor::Indigo,
    PaletteColor::Gray,
    PaletteColor::Black,
    PaletteColor::White,
    PaletteColor::LightRed,
    PaletteColor::LightBlue,
    PaletteColor::LightGreen,
    PaletteColor::LightYellow,
];

/// Memory Match only uses colors that stay distinct on a face-down grid.
pub const MEMORY_PALETTE_SIZE: usize = 15;

impl PaletteColor {
    pub fn memory_palette() -> &'static [PaletteColor] {
        &PALETTE[..MEMORY_PALETTE_SIZE]
    }

    pub fn name(&self) -> &'static str {
        match self {
            PaletteColor::Red => "Red",
            PaletteColor::Blue => "Blue",
            PaletteColor::Green => "Green",
            PaletteColor::Yellow => "Yellow",
            PaletteColor::Orange => "Orange",
            PaletteColor::Purple => "Purple",
            PaletteColor::Pink => "Pink",
            PaletteColor::Brown => "Brown",
            PaletteColor::Cyan => "Cyan",
            PaletteColor::Mint => "Mint",
            PaletteColor::Teal => "Teal",
            PaletteColor::Indigo => "Indigo",
            PaletteColor::Gray => "Gray",
            PaletteColor::Black => "Black",
            PaletteColor::White => "White",
            PaletteColor::LightRed => "Light Red",
            PaletteColor::LightBlue => "Light Blue",
            PaletteColor::LightGreen => "Light Green",
            PaletteColor::LightYellow => "Light Yellow",
        }
    }

    /// sRGB value for renderers, `0xRRGGBB`.
    pub fn rgb(&self) -> u32 {
        match self {
            PaletteColor::Red => 0xFF3B30,
            PaletteColor::Blue => 0x007AFF,
            PaletteColor::Green => 0x34C759,
            PaletteColor::Yellow => 0xFFCC00,
            PaletteColor::Orange => 0xFF9500,
            PaletteColor::Purple => 0xAF52DE,
            PaletteColor::Pink => 0xFF2D55,
            PaletteColor::Brown => 0xA2845E,
            PaletteColor::Cyan => 0x32ADE6,
            PaletteColor::Mint => 0x00C7BE,
            PaletteColor::Teal => 0x30B0C7,
            PaletteColor::Indigo => 0x5856D6,
            PaletteColor::Gray => 0x8E8E93,
            PaletteColor::Black => 0x000000,
            PaletteColor::White => 0xF2F2F2,
            PaletteColor::LightRed => 0xFF7C75,
            PaletteColor::LightBlue => 0x4DA2FF,
            PaletteColor::LightGreen => 0x71D88B,
            PaletteColor::LightYellow => 0xFFDB4D,
        }
    }
}

impl Display for PaletteColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
