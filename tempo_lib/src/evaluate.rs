use std::{
    fmt::{Debug, Display},
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

use tempo_bitboards::{BitBoard, Square};

use crate::board::Position;
use crate::moves::{Move, MoveFlag};
use crate::types::{Color, Piece, PIECES};

/// Incremental position scorer driven by the search.
///
/// The search reports every board change exactly once, through
/// [`Evaluator::apply_move`] / [`Evaluator::revert_move`] or
/// [`Evaluator::flip_side_to_move`] for null moves, and only calls
/// [`Evaluator::set_position`] at the root.
pub trait Evaluator: Send {
    fn set_position(&mut self, position: &Position);
    fn add_piece(&mut self, piece: Piece, square: Square, color: Color);
    fn remove_piece(&mut self, piece: Piece, square: Square, color: Color);
    fn move_piece(&mut self, piece: Piece, from: Square, to: Square, color: Color);
    fn flip_side_to_move(&mut self);
    /// Score in centipawns from the side to move's point of view. `position`
    /// is the board the evaluator has been kept in step with.
    fn evaluate(&self, position: &Position) -> i32;

    /// Mirrors `color` playing `mv`, which captured `captured`.
    fn apply_move(&mut self, color: Color, mv: Move, captured: Option<Piece>) {
        let (from, to) = (mv.from(), mv.to());
        match mv.flag() {
            MoveFlag::CastleKingside | MoveFlag::CastleQueenside => {
                self.move_piece(Piece::King, from, to, color);
                let (rook_from, rook_to) = castle_rook_squares(mv, color);
                self.move_piece(Piece::Rook, rook_from, rook_to, color);
            }
            MoveFlag::EnPassant => {
                self.remove_piece(Piece::Pawn, en_passant_victim(to, color), !color);
                self.move_piece(Piece::Pawn, from, to, color);
            }
            _ => {
                if let Some(victim) = captured {
                    self.remove_piece(victim, to, !color);
                }
                match mv.promotion() {
                    Some(promoted) => {
                        self.remove_piece(Piece::Pawn, from, color);
                        self.add_piece(promoted, to, color);
                    }
                    None => self.move_piece(mv.piece(), from, to, color),
                }
            }
        }
        self.flip_side_to_move();
    }

    /// Undoes [`Evaluator::apply_move`] with the same arguments.
    fn revert_move(&mut self, color: Color, mv: Move, captured: Option<Piece>) {
        let (from, to) = (mv.from(), mv.to());
        self.flip_side_to_move();
        match mv.flag() {
            MoveFlag::CastleKingside | MoveFlag::CastleQueenside => {
                self.move_piece(Piece::King, to, from, color);
                let (rook_from, rook_to) = castle_rook_squares(mv, color);
                self.move_piece(Piece::Rook, rook_to, rook_from, color);
            }
            MoveFlag::EnPassant => {
                self.move_piece(Piece::Pawn, to, from, color);
                self.add_piece(Piece::Pawn, en_passant_victim(to, color), !color);
            }
            _ => {
                match mv.promotion() {
                    Some(promoted) => {
                        self.remove_piece(promoted, to, color);
                        self.add_piece(Piece::Pawn, from, color);
                    }
                    None => self.move_piece(mv.piece(), to, from, color),
                }
                if let Some(victim) = captured {
                    self.add_piece(victim, to, !color);
                }
            }
        }
    }
}

fn castle_rook_squares(mv: Move, color: Color) -> (Square, Square) {
    let back_rank = if color == Color::White { 0 } else { 56 };
    match mv.flag() {
        MoveFlag::CastleKingside => (
            Square::from_bits(back_rank + 7),
            Square::from_bits(back_rank + 5),
        ),
        _ => (Square::from_bits(back_rank), Square::from_bits(back_rank + 3)),
    }
}

fn en_passant_victim(to: Square, color: Color) -> Square {
    match color {
        Color::White => to.offset(-8),
        Color::Black => to.offset(8),
    }
}

/// Midgame and endgame scores packed into one integer so both are updated
/// with a single add.
#[derive(Copy, Clone, Eq, PartialEq, Default)]
pub struct EvalScore(i32);

impl EvalScore {
    pub const fn new(mg: i16, eg: i16) -> Self {
        Self(((eg as i32) << 16).wrapping_add(mg as i32))
    }
    pub const fn zero() -> Self {
        Self(0)
    }
    pub const fn mg(&self) -> i16 {
        self.0 as i16
    }
    pub const fn eg(&self) -> i16 {
        ((self.0 + 0x8000) >> 16) as i16
    }
    const fn plus(self, other: Self) -> Self {
        Self(self.0.wrapping_add(other.0))
    }
}

macro_rules! s {
    ($mg:expr, $eg:expr) => {
        EvalScore::new($mg, $eg)
    };
}

impl Add<Self> for EvalScore {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign<Self> for EvalScore {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub<Self> for EvalScore {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign<Self> for EvalScore {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul<i16> for EvalScore {
    type Output = Self;

    fn mul(self, rhs: i16) -> Self::Output {
        Self::new(self.mg() * rhs, self.eg() * rhs)
    }
}

impl Neg for EvalScore {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::new(-self.mg(), -self.eg())
    }
}

impl Display for EvalScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s!({}, {})", self.mg(), self.eg())
    }
}

impl Debug for EvalScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

const MATERIAL: [EvalScore; 6] = [
    s!(90, 110),
    s!(320, 300),
    s!(340, 320),
    s!(480, 540),
    s!(950, 1000),
    s!(0, 0),
];

const DOUBLED_PAWN: EvalScore = s!(-12, -24);
const ISOLATED_PAWN: EvalScore = s!(-10, -14);
/// Per reachable square, for knight, bishop, rook and queen.
const MOBILITY: [EvalScore; 4] = [s!(4, 4), s!(5, 5), s!(2, 4), s!(1, 2)];
const PAWN_SHIELD: EvalScore = s!(12, 0);
const KING_OPEN_FILE: EvalScore = s!(-20, 0);
const CASTLING_RIGHT: EvalScore = s!(8, 0);

pub const PHASE_WEIGHTS: [i32; 6] = [0, 1, 1, 2, 4, 0];
pub const MAX_PHASE: i32 = 24;
const TEMPO: i32 = 10;

/// 0 on the four centre squares, 3 in the corners.
const fn centre_distance(file: i16, rank: i16) -> i16 {
    let file = if file < 4 { 3 - file } else { file - 4 };
    let rank = if rank < 4 { 3 - rank } else { rank - 4 };
    if file > rank {
        file
    } else {
        rank
    }
}

/// Positional bonus for `piece` on `square`, seen from white's side.
const fn square_bonus(piece: usize, square: usize) -> EvalScore {
    let file = (square % 8) as i16;
    let rank = (square / 8) as i16;
    let centre = 3 - centre_distance(file, rank);
    match piece {
        // pawns: advance, and hold the centre early
        0 => {
            let central_file = if file == 3 || file == 4 { 8 } else { 0 };
            s!((rank - 1) * 4 + central_file * (rank >= 3) as i16, (rank - 1) * 12)
        }
        1 => s!(centre * 12 - 18, centre * 8 - 12),
        2 => s!(centre * 6 - 6, centre * 4 - 4),
        // rooks: the seventh rank and central files
        3 => {
            let seventh = if rank == 6 { 16 } else { 0 };
            let central_file = if file >= 2 && file <= 5 { 4 } else { 0 };
            s!(seventh + central_file, seventh / 2)
        }
        4 => s!(centre * 3 - 3, centre * 6 - 6),
        // king: tucked away in the middlegame, active in the endgame
        _ => {
            let shelter = if rank == 0 && (file <= 2 || file >= 6) { 16 } else { 0 };
            s!(shelter - rank * 14, centre * 12 - 18)
        }
    }
}

const fn build_tables() -> [[EvalScore; 64]; 6] {
    let mut tables = [[EvalScore::zero(); 64]; 6];
    let mut piece = 0;
    while piece < 6 {
        let mut square = 0;
        while square < 64 {
            tables[piece][square] = MATERIAL[piece].plus(square_bonus(piece, square));
            square += 1;
        }
        piece += 1;
    }
    tables
}

/// Material plus piece-square values, indexed by piece then square from
/// white's side of the board.
static PIECE_SQUARE_TABLES: [[EvalScore; 64]; 6] = build_tables();

#[inline(always)]
fn piece_value(piece: Piece, square: Square, color: Color) -> EvalScore {
    match color {
        Color::White => PIECE_SQUARE_TABLES[piece][square],
        Color::Black => -PIECE_SQUARE_TABLES[piece][square.flip()],
    }
}

const A_FILE: u64 = 0x0101_0101_0101_0101;

fn file_mask(file: u8) -> BitBoard {
    BitBoard(A_FILE << file)
}

fn adjacent_files(file: u8) -> BitBoard {
    let mut mask = BitBoard::EMPTY;
    if file > 0 {
        mask |= file_mask(file - 1);
    }
    if file < 7 {
        mask |= file_mask(file + 1);
    }
    mask
}

/// Penalties for every extra pawn on a file and every pawn without a
/// friendly pawn on a neighbouring file.
fn pawn_structure(position: &Position, color: Color) -> EvalScore {
    let pawns = position.side(color).pieces[Piece::Pawn];
    let mut score = EvalScore::zero();
    for file in 0..8 {
        let count = (pawns & file_mask(file)).count_ones() as i16;
        if count == 0 {
            continue;
        }
        score += DOUBLED_PAWN * (count - 1);
        if (pawns & adjacent_files(file)).is_empty() {
            score += ISOLATED_PAWN * count;
        }
    }
    score
}

fn mobility(position: &Position, color: Color) -> EvalScore {
    let tables = &position.tables().attacks;
    let side = position.side(color);
    let occupied = position.occupied();
    // squares guarded by enemy pawns are not worth counting
    let area = !(side.occupancy | position.pawn_attacks(!color));

    let mut score = EvalScore::zero();
    for square in side.pieces[Piece::Knight] {
        score += MOBILITY[0] * (tables.knight(square) & area).count_ones() as i16;
    }
    for square in side.pieces[Piece::Bishop] {
        score += MOBILITY[1] * (tables.bishop(square, occupied) & area).count_ones() as i16;
    }
    for square in side.pieces[Piece::Rook] {
        score += MOBILITY[2] * (tables.rook(square, occupied) & area).count_ones() as i16;
    }
    for square in side.pieces[Piece::Queen] {
        score += MOBILITY[3] * (tables.queen(square, occupied) & area).count_ones() as i16;
    }
    score
}

/// Pawn shield in front of the king, an open king file, and castling rights
/// still held.
fn king_safety(position: &Position, color: Color) -> EvalScore {
    let side = position.side(color);
    // seen from white's side so "ahead" always means up the board
    let (king, pawns) = match color {
        Color::White => (side.king_square, side.pieces[Piece::Pawn]),
        Color::Black => (
            side.king_square.flip(),
            BitBoard(side.pieces[Piece::Pawn].0.swap_bytes()),
        ),
    };
    let ahead = BitBoard(0xFFFF_u64.checked_shl((king.rank() as u32 + 1) * 8).unwrap_or(0));
    let files = file_mask(king.file()) | adjacent_files(king.file());
    let shield = (pawns & files & ahead).count_ones().min(3) as i16;

    let mut score = PAWN_SHIELD * shield;
    if (pawns & file_mask(king.file())).is_empty() {
        score += KING_OPEN_FILE;
    }
    let rights = side.castling.iter().filter(|&&right| right).count() as i16;
    score + CASTLING_RIGHT * rights
}

/// Board terms recomputed at every evaluation, white minus black.
fn structure(position: &Position) -> EvalScore {
    let side = |color| {
        pawn_structure(position, color) + mobility(position, color) + king_safety(position, color)
    };
    side(Color::White) - side(Color::Black)
}

/// Tapered evaluation. Material and piece-square values are updated in
/// constant time per board change; pawn structure, mobility and king safety
/// are read off the board when scoring.
#[derive(Clone, Debug)]
pub struct PieceSquareEvaluator {
    /// White minus black.
    score: EvalScore,
    phase: i32,
    side_to_move: Color,
}

impl Default for PieceSquareEvaluator {
    fn default() -> Self {
        Self {
            score: EvalScore::zero(),
            phase: 0,
            side_to_move: Color::White,
        }
    }
}

impl PieceSquareEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn score(&self) -> EvalScore {
        self.score
    }

    pub fn phase(&self) -> i32 {
        self.phase
    }
}

impl Evaluator for PieceSquareEvaluator {
    fn set_position(&mut self, position: &Position) {
        *self = Self::default();
        for color in [Color::White, Color::Black] {
            for piece in PIECES {
                for square in position.side(color).pieces[piece] {
                    self.add_piece(piece, square, color);
                }
            }
        }
        self.side_to_move = position.side_to_move();
    }

    #[inline(always)]
    fn add_piece(&mut self, piece: Piece, square: Square, color: Color) {
        self.score += piece_value(piece, square, color);
        self.phase += PHASE_WEIGHTS[piece];
    }

    #[inline(always)]
    fn remove_piece(&mut self, piece: Piece, square: Square, color: Color) {
        self.score -= piece_value(piece, square, color);
        self.phase -= PHASE_WEIGHTS[piece];
    }

    #[inline(always)]
    fn move_piece(&mut self, piece: Piece, from: Square, to: Square, color: Color) {
        self.score += piece_value(piece, to, color) - piece_value(piece, from, color);
    }

    fn flip_side_to_move(&mut self) {
        self.side_to_move = !self.side_to_move;
    }

    fn evaluate(&self, position: &Position) -> i32 {
        // promotions can push the phase past the opening value
        let phase = self.phase.min(MAX_PHASE);
        let score = self.score + structure(position);
        let mg = score.mg() as i32;
        let eg = score.eg() as i32;
        let white = (mg * phase + eg * (MAX_PHASE - phase)) / MAX_PHASE;
        let relative = match self.side_to_move {
            Color::White => white,
            Color::Black => -white,
        };
        relative + TEMPO
    }
}
