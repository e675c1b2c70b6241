use std::{fmt::Display, ops::Index};

use tempo_bitboards::Square;

use crate::types::Piece::{self, *};

/// What a move does, stored in the top four bits of a [`Move`].
#[repr(u16)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveFlag {
    Null = 0,
    CastleKingside = 1,
    CastleQueenside = 2,
    EnPassant = 3,
    PromoteKnight = 4,
    PromoteBishop = 5,
    PromoteRook = 6,
    PromoteQueen = 7,
    PawnMove = 8,
    DoublePush = 9,
    KnightMove = 10,
    BishopMove = 11,
    RookMove = 12,
    QueenMove = 13,
    KingMove = 14,
}

impl MoveFlag {
    pub const PROMOTIONS: [MoveFlag; 4] = [
        MoveFlag::PromoteQueen,
        MoveFlag::PromoteKnight,
        MoveFlag::PromoteRook,
        MoveFlag::PromoteBishop,
    ];

    fn from_bits(bits: u16) -> Self {
        use MoveFlag::*;
        match bits {
            1 => CastleKingside,
            2 => CastleQueenside,
            3 => EnPassant,
            4 => PromoteKnight,
            5 => PromoteBishop,
            6 => PromoteRook,
            7 => PromoteQueen,
            8 => PawnMove,
            9 => DoublePush,
            10 => KnightMove,
            11 => BishopMove,
            12 => RookMove,
            13 => QueenMove,
            14 => KingMove,
            _ => Null,
        }
    }

    /// Flag for a plain move of `piece`.
    pub fn for_piece(piece: Piece) -> Self {
        match piece {
            Pawn => MoveFlag::PawnMove,
            Knight => MoveFlag::KnightMove,
            Bishop => MoveFlag::BishopMove,
            Rook => MoveFlag::RookMove,
            Queen => MoveFlag::QueenMove,
            King => MoveFlag::KingMove,
        }
    }
}

/// `flag << 12 | origin << 6 | destination`. Castling moves name the king's
/// origin and destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Move(u16);

impl Move {
    #[inline(always)]
    pub fn new(flag: MoveFlag, from: Square, to: Square) -> Self {
        Self(((flag as u16) << 12) | ((from.index() as u16) << 6) | to.index() as u16)
    }

    pub const fn null() -> Self {
        Self(0)
    }

    #[inline(always)]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    pub fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u16 {
        self.0
    }

    #[inline(always)]
    pub fn flag(&self) -> MoveFlag {
        MoveFlag::from_bits(self.0 >> 12)
    }

    #[inline(always)]
    pub fn from(&self) -> Square {
        Square::from_bits(self.0 >> 6)
    }

    #[inline(always)]
    pub fn to(&self) -> Square {
        Square::from_bits(self.0)
    }

    /// Promotion flags are exactly those with `01` in the top two bits.
    #[inline(always)]
    pub fn is_promotion(&self) -> bool {
        self.0 & (0b11 << 14) == 0b01 << 14
    }

    pub fn promotion(&self) -> Option<Piece> {
        match self.flag() {
            MoveFlag::PromoteKnight => Some(Knight),
            MoveFlag::PromoteBishop => Some(Bishop),
            MoveFlag::PromoteRook => Some(Rook),
            MoveFlag::PromoteQueen => Some(Queen),
            _ => None,
        }
    }

    pub fn is_castle(&self) -> bool {
        matches!(
            self.flag(),
            MoveFlag::CastleKingside | MoveFlag::CastleQueenside
        )
    }

    /// The piece standing on the origin square before the move.
    pub fn piece(&self) -> Piece {
        use MoveFlag::*;
        match self.flag() {
            Null | CastleKingside | CastleQueenside | KingMove => King,
            EnPassant | PromoteKnight | PromoteBishop | PromoteRook | PromoteQueen | PawnMove
            | DoublePush => Pawn,
            KnightMove => Knight,
            BishopMove => Bishop,
            RookMove => Rook,
            QueenMove => Queen,
        }
    }

    pub fn coords(&self) -> String {
        format!("{self}")
    }
}

impl Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_null() {
            return write!(f, "0000");
        }
        let promo = match self.promotion() {
            Some(Knight) => "n",
            Some(Bishop) => "b",
            Some(Rook) => "r",
            Some(Queen) => "q",
            _ => "",
        };
        write!(f, "{}{}{}", self.from(), self.to(), promo)
    }
}

// constants to score moves by type without overlap
pub const TT_MOVE_SCORE: i32 = 400_000;
pub const WINNING_CAPTURE_SCORE: i32 = 300_000;
pub const QUEEN_PROMOTION_SCORE: i32 = 250_000;
pub const KILLER_MOVE_SCORE: i32 = 200_000;
pub const QUIET_SCORE: i32 = 0;
pub const UNDERPROMO_SCORE: i32 = -200_000;

pub const MAX_MOVES: usize = 218;

#[derive(Copy, Clone, Debug)]
pub struct SortingMove {
    pub mv: Move,
    pub score: i32,
}

impl SortingMove {
    pub fn new(mv: Move) -> Self {
        Self { mv, score: 0 }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct MoveList {
    len: usize,
    inner: [SortingMove; MAX_MOVES],
}

impl MoveList {
    pub fn new() -> Self {
        Self {
            len: 0,
            inner: [SortingMove::new(Move::null()); MAX_MOVES],
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn inner(&self) -> &[SortingMove] {
        &self.inner[..self.len]
    }

    pub fn inner_mut(&mut self) -> &mut [SortingMove] {
        &mut self.inner[..self.len]
    }

    #[inline(always)]
    pub fn push(&mut self, mv: Move) {
        self.inner[self.len] = SortingMove::new(mv);
        self.len += 1;
    }

    pub fn reset(&mut self) {
        self.len = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, mv: Move) -> bool {
        self.inner().iter().any(|m| m.mv == mv)
    }

    pub fn iter(&self) -> impl Iterator<Item = Move> + '_ {
        self.inner().iter().map(|m| m.mv)
    }

    /// Swaps the best-scored remaining move into `current_index` and returns it.
    #[inline(always)]
    pub fn pick_move(&mut self, current_index: usize) -> (Move, i32) {
        let moves = &self.inner[(current_index + 1)..self.len];
        let mut best_index = current_index;
        let mut best_score = self.inner[current_index].score;

        for (i, mv) in moves.iter().enumerate() {
            let new = mv.score;
            let replace = new > best_score;
            best_index =
                (best_index * !replace as usize) | ((i + current_index + 1) * replace as usize);
            best_score = (best_score * !replace as i32) | (new * replace as i32);
        }

        self.inner.swap(current_index, best_index);

        (
            self.inner[current_index].mv,
            self.inner[current_index].score,
        )
    }
}

impl Index<usize> for MoveList {
    type Output = Move;

    fn index(&self, index: usize) -> &Self::Output {
        &self.inner[..self.len][index].mv
    }
}

impl Default for MoveList {
    fn default() -> Self {
        Self::new()
    }
}

pub const NUM_KILLER_MOVES: usize = 2;
#[derive(Copy, Clone, Debug)]
pub struct KillerMoves<const N: usize>([Move; N]);

impl<const N: usize> KillerMoves<N> {
    pub fn new() -> Self {
        Self([Move::null(); N])
    }
    pub fn push(&mut self, m: Move) {
        let moves = &mut self.0;
        if moves[0] != m {
            for i in (1..N).rev() {
                moves[i] = moves[i - 1];
            }
            moves[0] = m;
        }
    }
    pub fn contains(&self, mv: &Move) -> bool {
        !mv.is_null() && self.0.contains(mv)
    }
}

impl<const N: usize> Default for KillerMoves<N> {
    fn default() -> Self {
        Self::new()
    }
}

pub const PV_MAX_LEN: usize = 16;
#[derive(Copy, Clone, Default, Debug)]
pub struct PrincipalVariation {
    len: usize,
    moves: [Move; PV_MAX_LEN],
}

impl PrincipalVariation {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn push(&mut self, mv: Move) -> bool {
        if self.len == PV_MAX_LEN {
            return false;
        }
        self.moves[self.len] = mv;
        self.len += 1;
        true
    }
    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
    pub fn clear(&mut self) {
        self.len = 0;
    }
    pub fn iter(&self) -> std::slice::Iter<'_, Move> {
        self.moves[..self.len].iter()
    }
}

impl Display for PrincipalVariation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, m) in self.iter().enumerate() {
            if i == 0 {
                write!(f, "{m}")?;
            } else {
                write!(f, " {m}")?;
            }
        }
        Ok(())
    }
}

impl Index<usize> for PrincipalVariation {
    type Output = Move;

    fn index(&self, index: usize) -> &Self::Output {
        &self.moves[..self.len][index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_fields_pack_into_sixteen_bits() {
        let e2 = Square::from_coord("e2").unwrap();
        let e4 = Square::from_coord("e4").unwrap();
        let mv = Move::new(MoveFlag::DoublePush, e2, e4);
        assert_eq!(mv.bits(), (9 << 12) | (12 << 6) | 28);
        assert_eq!(mv.flag(), MoveFlag::DoublePush);
        assert_eq!(mv.from(), e2);
        assert_eq!(mv.to(), e4);
        assert_eq!(mv.piece(), Pawn);
        assert_eq!(mv.to_string(), "e2e4");
    }

    #[test]
    fn promotion_bit_trick_matches_flags() {
        let a7 = Square::from_coord("a7").unwrap();
        for bits in 0..15u16 {
            let mv = Move::from_bits((bits << 12) | (a7.index() as u16) << 6 | Square::A8.index() as u16);
            assert_eq!(mv.is_promotion(), mv.promotion().is_some(), "flag {bits}");
        }
        let mv = Move::new(MoveFlag::PromoteKnight, a7, Square::A8);
        assert_eq!(mv.to_string(), "a7a8n");
    }

    #[test]
    fn pick_move_returns_moves_best_first() {
        let mut list = MoveList::new();
        for (i, score) in [5, -3, 40, 12].into_iter().enumerate() {
            list.push(Move::new(MoveFlag::KnightMove, Square::A1, Square::new(i as u8 + 10).unwrap()));
            list.inner_mut()[i].score = score;
        }
        let order = (0..list.len())
            .map(|i| list.pick_move(i).1)
            .collect::<Vec<_>>();
        assert_eq!(order, vec![40, 12, 5, -3]);
    }

    #[test]
    fn killers_shift_and_ignore_duplicates() {
        let a = Move::new(MoveFlag::KnightMove, Square::B1, Square::from_coord("c3").unwrap());
        let b = Move::new(MoveFlag::KnightMove, Square::G1, Square::from_coord("f3").unwrap());
        let mut killers = KillerMoves::<NUM_KILLER_MOVES>::new();
        killers.push(a);
        killers.push(a);
        killers.push(b);
        assert!(killers.contains(&a));
        assert!(killers.contains(&b));
        assert!(!killers.contains(&Move::null()));
    }
}
