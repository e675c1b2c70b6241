use std::{
    fmt::{Debug, Display},
    ops::{self, Index, IndexMut},
};

use bytemuck::{Pod, Zeroable};
use overload::overload;

/// A set of squares, bit `n` standing for square `n` (a1 = 0, h8 = 63).
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Hash, Pod, Zeroable)]
pub struct BitBoard(pub u64);

impl BitBoard {
    pub const EMPTY: Self = Self(0);
    pub const FULL: Self = Self(!0);

    #[inline]
    pub fn empty() -> Self {
        Self::EMPTY
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
    #[inline]
    pub fn is_not_empty(&self) -> bool {
        self.0 != 0
    }
    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
    #[inline]
    pub fn inverse(&self) -> Self {
        Self(!self.0)
    }
    #[inline]
    pub fn contains(&self, square: Square) -> bool {
        self.0 & (1 << square.0) != 0
    }
    /// Lowest set square. Only meaningful on a non-empty board.
    #[inline]
    pub fn first_square(&self) -> Square {
        debug_assert!(self.is_not_empty());
        Square(self.0.trailing_zeros() as u8)
    }
    #[inline]
    pub fn clear_first_square(&mut self) {
        self.0 &= self.0.wrapping_sub(1);
    }
    #[inline]
    pub fn count_ones(&self) -> u32 {
        self.0.count_ones()
    }
    #[inline]
    pub fn more_than_one(&self) -> bool {
        self.0 & self.0.wrapping_sub(1) != 0
    }
    /// Shift towards higher squares for positive `n`, lower squares otherwise.
    #[inline]
    pub fn ishift(&self, n: i32) -> Self {
        if n > 0 {
            Self(self.0 << n)
        } else {
            Self(self.0 >> (-n))
        }
    }
}

impl Iterator for BitBoard {
    type Item = Square;

    fn next(&mut self) -> Option<Self::Item> {
        if self.0 == 0 {
            None
        } else {
            let square = self.first_square();
            self.clear_first_square();
            Some(square)
        }
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.count_ones() as usize, Some(self.count_ones() as usize))
    }
}
impl ExactSizeIterator for BitBoard {}

impl FromIterator<Square> for BitBoard {
    fn from_iter<I: IntoIterator<Item = Square>>(iter: I) -> Self {
        iter.into_iter()
            .fold(BitBoard::EMPTY, |acc, sq| acc | sq.bitboard())
    }
}

impl Display for BitBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        for rank in (0..8u8).rev() {
            write!(f, "{}  ", rank + 1)?;
            for file in 0..8u8 {
                let c = if self.contains(Square::from_rank_file(rank, file)) {
                    '1'
                } else {
                    '.'
                };
                if file == 7 {
                    writeln!(f, "{c}")?;
                } else {
                    write!(f, "{c} ")?;
                }
            }
        }
        writeln!(f, "\n   a b c d e f g h")
    }
}

overload!((a: ?BitBoard) & (b: ?BitBoard) -> BitBoard {BitBoard(a.0 & b.0)});
overload!((a: &mut BitBoard) &= (b: ?BitBoard) {a.0 &= b.0});

overload!((a: ?BitBoard) | (b: ?BitBoard) -> BitBoard {BitBoard(a.0 | b.0)});
overload!((a: &mut BitBoard) |= (b: ?BitBoard) {a.0 |= b.0});

overload!((a: ?BitBoard) ^ (b: ?BitBoard) -> BitBoard {BitBoard(a.0 ^ b.0)});
overload!((a: &mut BitBoard) ^= (b: ?BitBoard) {a.0 ^= b.0});

overload!(!(a: ?BitBoard) -> BitBoard {BitBoard(!a.0)});

overload!((a: ?BitBoard) << (b: ?u64) -> BitBoard {BitBoard(a.0 << b)});
overload!((a: ?BitBoard) >> (b: ?u64) -> BitBoard {BitBoard(a.0 >> b)});

/// A board square, a1 = 0 through h8 = 63.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Square(u8);

#[rustfmt::skip]
impl Square {
    pub const A1: Self = Self(0);  pub const B1: Self = Self(1);  pub const C1: Self = Self(2);  pub const D1: Self = Self(3);
    pub const E1: Self = Self(4);  pub const F1: Self = Self(5);  pub const G1: Self = Self(6);  pub const H1: Self = Self(7);
    pub const A8: Self = Self(56); pub const B8: Self = Self(57); pub const C8: Self = Self(58); pub const D8: Self = Self(59);
    pub const E8: Self = Self(60); pub const F8: Self = Self(61); pub const G8: Self = Self(62); pub const H8: Self = Self(63);
}

impl Square {
    /// Checked constructor from a 0..64 index.
    #[inline]
    pub fn new(index: u8) -> Option<Self> {
        (index < 64).then_some(Self(index))
    }

    /// Builds a square from the low six bits of `bits`, for packed encodings.
    #[inline]
    pub const fn from_bits(bits: u16) -> Self {
        Self((bits & 0x3F) as u8)
    }

    #[inline]
    pub const fn from_rank_file(rank: u8, file: u8) -> Self {
        Self((rank << 3) | file)
    }

    #[inline]
    pub fn all() -> impl Iterator<Item = Square> {
        (0..64).map(Square)
    }

    #[inline]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn bitboard(&self) -> BitBoard {
        BitBoard(1 << self.0)
    }

    #[inline]
    pub const fn rank(&self) -> u8 {
        self.0 >> 3
    }

    #[inline]
    pub const fn file(&self) -> u8 {
        self.0 & 7
    }

    /// Square `delta` steps away along the index. The caller guarantees the result is on the board.
    #[inline]
    pub fn offset(&self, delta: i8) -> Self {
        let index = self.0 as i8 + delta;
        debug_assert!((0..64).contains(&index), "square offset off the board");
        Self(index as u8)
    }

    /// Same file, mirrored rank.
    #[inline]
    pub const fn flip(&self) -> Self {
        Self(self.0 ^ 56)
    }

    pub fn file_letter(&self) -> char {
        (b'a' + self.file()) as char
    }

    pub fn coord(&self) -> String {
        format!("{}{}", self.file_letter(), self.rank() + 1)
    }

    pub fn from_coord(coord: &str) -> Option<Self> {
        match coord.as_bytes() {
            &[file @ b'a'..=b'h', rank @ b'1'..=b'8'] => {
                Some(Self::from_rank_file(rank - b'1', file - b'a'))
            }
            _ => None,
        }
    }
}

impl From<Square> for usize {
    fn from(square: Square) -> Self {
        square.0 as usize
    }
}

impl Display for Square {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.coord())
    }
}

impl Debug for Square {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.coord())
    }
}

impl<T, const N: usize> Index<Square> for [T; N] {
    type Output = T;

    fn index(&self, index: Square) -> &Self::Output {
        &self[index.0 as usize]
    }
}

impl<T, const N: usize> IndexMut<Square> for [T; N] {
    fn index_mut(&mut self, index: Square) -> &mut Self::Output {
        &mut self[index.0 as usize]
    }
}
