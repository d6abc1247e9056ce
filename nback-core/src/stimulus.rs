use serde::{Deserialize, Serialize};
use std::fmt;

/// A cell on the square stimulus grid
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: u8,
    pub col: u8,
}

impl Position {
    pub fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// Row-major cell index on a grid of the given size.
    pub fn cell_index(&self, grid_size: usize) -> usize {
        self.row as usize * grid_size + self.col as usize
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// The letter alphabet used for the verbal channel
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    C,
    H,
    K,
    L,
    Q,
    R,
    S,
    T,
}

impl Symbol {
    pub const ALL: [Symbol; 8] = [
        Symbol::C,
        Symbol::H,
        Symbol::K,
        Symbol::L,
        Symbol::Q,
        Symbol::R,
        Symbol::S,
        Symbol::T,
    ];

    pub fn as_char(&self) -> char {
        match self {
            Symbol::C => 'C',
            Symbol::H => 'H',
            Symbol::K => 'K',
            Symbol::L => 'L',
            Symbol::Q => 'Q',
            Symbol::R => 'R',
            Symbol::S => 'S',
            Symbol::T => 'T',
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// One of the two independent comparison channels
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modality {
    /// Grid position.
    Visual,
    /// Letter identity.
    Audio,
}

impl Modality {
    pub const ALL: [Modality; 2] = [Modality::Visual, Modality::Audio];
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modality::Visual => f.write_str("visual"),
            Modality::Audio => f.write_str("audio"),
        }
    }
}
