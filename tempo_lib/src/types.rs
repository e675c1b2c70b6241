use std::ops::{Index, IndexMut, Not};

use tempo_bitboards::BitBoard;
use tempo_pregen::{FIRST_RANK, SECOND_RANK, SEVENTH_RANK, EIGHTH_RANK};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Color {
    White = 0,
    Black = 1,
}

impl Not for Color {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

impl<T, const N: usize> Index<Color> for [T; N] {
    type Output = T;

    fn index(&self, index: Color) -> &Self::Output {
        &self[index as usize]
    }
}

impl<T, const N: usize> IndexMut<Color> for [T; N] {
    fn index_mut(&mut self, index: Color) -> &mut Self::Output {
        &mut self[index as usize]
    }
}

pub struct White;
pub struct Black;

/// Compile-time side selection for the hot paths.
pub trait TypeColor {
    const WHITE: bool;
    const INDEX: usize;
    const COLOR: Color;
    /// Square offset of a single pawn push.
    const PAWN_PUSH: i8;
    /// Rank pawns may double push from.
    const PAWN_START: BitBoard;
    /// Rank pawns promote on.
    const PROMOTION_RANK: BitBoard;
    /// Shift from first-rank masks to this side's back rank.
    const BACK_RANK: u32;
    type Other: TypeColor;
}

impl TypeColor for White {
    const WHITE: bool = true;
    const INDEX: usize = 0;
    const COLOR: Color = Color::White;
    const PAWN_PUSH: i8 = 8;
    const PAWN_START: BitBoard = SECOND_RANK;
    const PROMOTION_RANK: BitBoard = EIGHTH_RANK;
    const BACK_RANK: u32 = 0;
    type Other = Black;
}

impl TypeColor for Black {
    const WHITE: bool = false;
    const INDEX: usize = 1;
    const COLOR: Color = Color::Black;
    const PAWN_PUSH: i8 = -8;
    const PAWN_START: BitBoard = SEVENTH_RANK;
    const PROMOTION_RANK: BitBoard = FIRST_RANK;
    const BACK_RANK: u32 = 56;
    type Other = White;
}

pub struct Captures;
pub struct All;
pub trait TypeMoveGen {
    const CAPTURES: bool;
}

impl TypeMoveGen for Captures {
    const CAPTURES: bool = true;
}
impl TypeMoveGen for All {
    const CAPTURES: bool = false;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Piece {
    Pawn = 0,
    Knight = 1,
    Bishop = 2,
    Rook = 3,
    Queen = 4,
    King = 5,
}

use Piece::*;

impl Piece {
    pub fn from_char(c: char) -> Option<(Piece, Color)> {
        let piece = match c.to_ascii_lowercase() {
            'p' => Pawn,
            'n' => Knight,
            'b' => Bishop,
            'r' => Rook,
            'q' => Queen,
            'k' => King,
            _ => return None,
        };
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        Some((piece, color))
    }

    pub fn to_char(self, color: Color) -> char {
        let c = match self {
            Pawn => 'p',
            Knight => 'n',
            Bishop => 'b',
            Rook => 'r',
            Queen => 'q',
            King => 'k',
        };
        match color {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }
}

impl<T, const N: usize> Index<Piece> for [T; N] {
    type Output = T;

    fn index(&self, index: Piece) -> &Self::Output {
        &self[index as usize]
    }
}

impl<T, const N: usize> IndexMut<Piece> for [T; N] {
    fn index_mut(&mut self, index: Piece) -> &mut Self::Output {
        &mut self[index as usize]
    }
}

pub const PIECES: [Piece; 6] = [Pawn, Knight, Bishop, Rook, Queen, King];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CastlingIndex {
    Queenside = 0,
    Kingside = 1,
}

impl<T, const N: usize> Index<CastlingIndex> for [T; N] {
    type Output = T;

    fn index(&self, index: CastlingIndex) -> &Self::Output {
        &self[index as usize]
    }
}

impl<T, const N: usize> IndexMut<CastlingIndex> for [T; N] {
    fn index_mut(&mut self, index: CastlingIndex) -> &mut Self::Output {
        &mut self[index as usize]
    }
}
