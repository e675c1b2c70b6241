pub mod fen;
pub mod make_move;
pub mod movegen;
pub mod perft;

use std::sync::Arc;

use tempo_bitboards::{BitBoard, Square};

use crate::moves::{Move, MoveList};
use crate::types::{CastlingIndex, Color, Piece, TypeColor, PIECES};
use crate::Tables;

pub use make_move::MoveInfo;

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// A piece that may only move along `allowed` without exposing its king.
///
/// Only trustworthy while `move_id` equals the owning side's counter; older
/// records are stale and read as "not pinned".
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Pin {
    pub diagonal: bool,
    pub pinner: Square,
    pub allowed: BitBoard,
    pub move_id: u32,
}

impl Pin {
    const STALE: Self = Self {
        diagonal: false,
        pinner: Square::A1,
        allowed: BitBoard::EMPTY,
        move_id: 0,
    };
}

#[derive(Copy, Clone, Debug)]
pub struct Side {
    pub pieces: [BitBoard; 6],
    pub occupancy: BitBoard,
    /// Every square this side attacks, computed with the enemy king removed.
    pub attacks: BitBoard,
    /// Squares a non-king move must land on to answer the current check.
    /// Full when not in check, empty under double check.
    pub check_mask: BitBoard,
    pub castling: [bool; 2],
    pub king_square: Square,
    /// Square this side may capture onto en passant this turn.
    pub ep_target: Option<Square>,
    pub counts: [u8; 6],
    pub pins: [Pin; 64],
    pub move_id: u32,
}

impl Side {
    fn empty() -> Self {
        Self {
            pieces: [BitBoard::EMPTY; 6],
            occupancy: BitBoard::EMPTY,
            attacks: BitBoard::EMPTY,
            check_mask: BitBoard::FULL,
            castling: [false; 2],
            king_square: Square::A1,
            ep_target: None,
            counts: [0; 6],
            pins: [Pin::STALE; 64],
            move_id: 1,
        }
    }

    #[inline(always)]
    pub fn pin(&self, square: Square) -> Option<&Pin> {
        let pin = &self.pins[square];
        (pin.move_id == self.move_id).then_some(pin)
    }

    /// Squares the piece on `square` may move to as far as pins are concerned.
    #[inline(always)]
    pub fn pin_mask(&self, square: Square) -> BitBoard {
        self.pin(square).map_or(BitBoard::FULL, |pin| pin.allowed)
    }

    #[inline(always)]
    pub fn diagonal_sliders(&self) -> BitBoard {
        self.pieces[Piece::Bishop] | self.pieces[Piece::Queen]
    }

    #[inline(always)]
    pub fn orthogonal_sliders(&self) -> BitBoard {
        self.pieces[Piece::Rook] | self.pieces[Piece::Queen]
    }

    pub fn piece_on(&self, square: Square) -> Option<Piece> {
        PIECES
            .into_iter()
            .find(|&piece| self.pieces[piece].contains(square))
    }

    /// True when the side has nothing but pawns and its king.
    pub fn only_pawns(&self) -> bool {
        self.occupancy == self.pieces[Piece::Pawn] | self.pieces[Piece::King]
    }
}

impl PartialEq for Side {
    fn eq(&self, other: &Self) -> bool {
        self.pieces == other.pieces
            && self.occupancy == other.occupancy
            && self.attacks == other.attacks
            && self.check_mask == other.check_mask
            && self.castling == other.castling
            && self.king_square == other.king_square
            && self.ep_target == other.ep_target
            && self.counts == other.counts
            && Square::all().all(|sq| self.pin(sq) == other.pin(sq))
    }
}

#[derive(Clone)]
pub struct Position {
    sides: [Side; 2],
    side_to_move: Color,
    halfmove_clock: u16,
    fullmove_number: u16,
    hash: u64,
    tables: Arc<Tables>,
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.sides == other.sides
            && self.side_to_move == other.side_to_move
            && self.halfmove_clock == other.halfmove_clock
            && self.fullmove_number == other.fullmove_number
            && self.hash == other.hash
    }
}

impl std::fmt::Debug for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Position({})", self.fen())
    }
}

impl Position {
    pub fn start(tables: Arc<Tables>) -> Self {
        match Self::from_fen(tables, START_FEN) {
            Ok(position) => position,
            Err(e) => unreachable!("start position rejected: {e}"),
        }
    }

    #[inline(always)]
    pub fn tables(&self) -> &Arc<Tables> {
        &self.tables
    }

    #[inline(always)]
    pub fn side(&self, color: Color) -> &Side {
        &self.sides[color]
    }

    #[inline(always)]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    #[inline(always)]
    pub fn us(&self) -> &Side {
        &self.sides[self.side_to_move]
    }

    #[inline(always)]
    pub fn them(&self) -> &Side {
        &self.sides[!self.side_to_move]
    }

    #[inline(always)]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn halfmove_clock(&self) -> u16 {
        self.halfmove_clock
    }

    pub fn fullmove_number(&self) -> u16 {
        self.fullmove_number
    }

    #[inline(always)]
    pub fn occupied(&self) -> BitBoard {
        self.sides[0].occupancy | self.sides[1].occupancy
    }

    pub fn num_pieces(&self) -> u8 {
        self.occupied().count_ones() as u8
    }

    #[inline(always)]
    pub fn in_check(&self) -> bool {
        (self.them().attacks & self.us().king_square.bitboard()).is_not_empty()
    }

    pub fn piece_on(&self, square: Square) -> Option<(Piece, Color)> {
        [Color::White, Color::Black]
            .into_iter()
            .find_map(|color| self.sides[color].piece_on(square).map(|p| (p, color)))
    }

    pub fn is_capture(&self, mv: Move) -> bool {
        mv.flag() == crate::moves::MoveFlag::EnPassant || self.them().occupancy.contains(mv.to())
    }

    pub fn legal_moves(&self) -> MoveList {
        let mut moves = MoveList::new();
        self.generate_moves::<crate::types::All>(&mut moves);
        moves
    }

    /// Hash computed from scratch. Make/unmake keep `hash()` equal to this.
    pub fn calculate_hash(&self) -> u64 {
        let keys = &self.tables.zobrist;
        let mut hash = 0;
        for color in [Color::White, Color::Black] {
            let side = &self.sides[color];
            for piece in PIECES {
                for square in side.pieces[piece] {
                    hash ^= keys.piece(color, piece, square);
                }
            }
            for castle in [CastlingIndex::Queenside, CastlingIndex::Kingside] {
                if side.castling[castle] {
                    hash ^= keys.castling(color, castle);
                }
            }
            if let Some(ep) = side.ep_target {
                hash ^= keys.en_passant(ep);
            }
        }
        if self.side_to_move == Color::Black {
            hash ^= keys.black_to_move();
        }
        hash
    }

    #[inline(always)]
    fn add_piece<T: TypeColor>(&mut self, piece: Piece, square: Square) {
        let side = &mut self.sides[T::INDEX];
        side.pieces[piece] |= square.bitboard();
        side.occupancy |= square.bitboard();
        side.counts[piece] += 1;
        self.hash ^= self.tables.zobrist.piece(T::COLOR, piece, square);
    }

    #[inline(always)]
    fn remove_piece<T: TypeColor>(&mut self, piece: Piece, square: Square) {
        let side = &mut self.sides[T::INDEX];
        side.pieces[piece] ^= square.bitboard();
        side.occupancy ^= square.bitboard();
        side.counts[piece] -= 1;
        self.hash ^= self.tables.zobrist.piece(T::COLOR, piece, square);
    }

    #[inline(always)]
    fn move_piece<T: TypeColor>(&mut self, piece: Piece, from: Square, to: Square) {
        let side = &mut self.sides[T::INDEX];
        let mask = from.bitboard() | to.bitboard();
        side.pieces[piece] ^= mask;
        side.occupancy ^= mask;
        if piece == Piece::King {
            side.king_square = to;
        }
        let keys = &self.tables.zobrist;
        self.hash ^= keys.piece(T::COLOR, piece, from) ^ keys.piece(T::COLOR, piece, to);
    }

    #[inline(always)]
    fn revoke_castling<T: TypeColor>(&mut self, castle: CastlingIndex) {
        if self.sides[T::INDEX].castling[castle] {
            self.sides[T::INDEX].castling[castle] = false;
            self.hash ^= self.tables.zobrist.castling(T::COLOR, castle);
        }
    }

    /// Advances both sides' pin counters, invalidating every pin record.
    /// On wraparound every record is reset so an old tag can never match again.
    fn bump_move_ids(&mut self) {
        let next = self.sides[0].move_id.wrapping_add(1);
        if next == 0 {
            for side in self.sides.iter_mut() {
                side.pins = [Pin::STALE; 64];
                side.move_id = 1;
            }
        } else {
            for side in self.sides.iter_mut() {
                side.move_id = next;
            }
        }
    }
}
