use std::path::Path;

use tempo_bitboards::{BitBoard, Square};

use crate::consts::*;
use crate::format::TableError;
use crate::generate::{bishop_attacks, rook_attacks};
use crate::magic::MagicTables;
use crate::EMBEDDED_TABLES;

/// Every precomputed attack lookup the move generator needs.
///
/// A `MagicTables` is verified when it is parsed, so there is no way to obtain
/// an `AttackTables` backed by an unchecked blob.
pub struct AttackTables {
    magics: MagicTables,
    knight: [BitBoard; 64],
    king: [BitBoard; 64],
    pawn: [[BitBoard; 64]; 2],
    diagonal_rays: Box<[[BitBoard; 64]; 64]>,
    orthogonal_rays: Box<[[BitBoard; 64]; 64]>,
}

impl AttackTables {
    pub fn new(magics: MagicTables) -> Self {
        Self {
            magics,
            knight: generate_knight_table(),
            king: generate_king_table(),
            pawn: generate_pawn_attack_tables(),
            diagonal_rays: generate_ray_table(bishop_attacks),
            orthogonal_rays: generate_ray_table(rook_attacks),
        }
    }

    /// Tables embedded at build time.
    pub fn embedded() -> Result<Self, TableError> {
        let tables = Self::new(MagicTables::from_bytes(EMBEDDED_TABLES)?);
        log::info!(
            "loaded embedded magic tables ({} attack entries)",
            tables.magics.attack_buffer().len()
        );
        Ok(tables)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let path = path.as_ref();
        let tables = Self::new(MagicTables::load(path)?);
        log::info!(
            "loaded magic tables from {} ({} attack entries)",
            path.display(),
            tables.magics.attack_buffer().len()
        );
        Ok(tables)
    }

    pub fn magics(&self) -> &MagicTables {
        &self.magics
    }

    #[inline(always)]
    pub fn rook(&self, square: Square, occupancy: BitBoard) -> BitBoard {
        self.magics.rook_attacks(square, occupancy)
    }

    #[inline(always)]
    pub fn bishop(&self, square: Square, occupancy: BitBoard) -> BitBoard {
        self.magics.bishop_attacks(square, occupancy)
    }

    #[inline(always)]
    pub fn queen(&self, square: Square, occupancy: BitBoard) -> BitBoard {
        self.rook(square, occupancy) | self.bishop(square, occupancy)
    }

    #[inline(always)]
    pub fn knight(&self, square: Square) -> BitBoard {
        self.knight[square]
    }

    #[inline(always)]
    pub fn king(&self, square: Square) -> BitBoard {
        self.king[square]
    }

    /// Squares a pawn of `color_index` (0 white, 1 black) on `square` attacks.
    #[inline(always)]
    pub fn pawn(&self, color_index: usize, square: Square) -> BitBoard {
        self.pawn[color_index][square]
    }

    /// Squares strictly between `piece` and `king` plus `piece` itself when
    /// they share a diagonal, else empty.
    #[inline(always)]
    pub fn diagonal_ray(&self, piece: Square, king: Square) -> BitBoard {
        self.diagonal_rays[piece][king]
    }

    /// As [`Self::diagonal_ray`] for a shared rank or file.
    #[inline(always)]
    pub fn orthogonal_ray(&self, piece: Square, king: Square) -> BitBoard {
        self.orthogonal_rays[piece][king]
    }

    #[inline(always)]
    pub fn ray(&self, piece: Square, king: Square) -> BitBoard {
        self.diagonal_rays[piece][king] | self.orthogonal_rays[piece][king]
    }
}

fn generate_knight_table() -> [BitBoard; 64] {
    let mut table = [BitBoard::empty(); 64];
    for square in Square::all() {
        let bb = square.bitboard();
        table[square] = ((bb << 17) & NOT_A_FILE)
            | ((bb << 15) & NOT_H_FILE)
            | ((bb << 10) & NOT_A_B_FILES)
            | ((bb << 6) & NOT_G_H_FILES)
            | ((bb >> 17) & NOT_H_FILE)
            | ((bb >> 15) & NOT_A_FILE)
            | ((bb >> 10) & NOT_G_H_FILES)
            | ((bb >> 6) & NOT_A_B_FILES);
    }
    table
}

fn generate_king_table() -> [BitBoard; 64] {
    let mut table = [BitBoard::empty(); 64];
    for square in Square::all() {
        let bb = square.bitboard();
        let sides = ((bb << 1) & NOT_A_FILE) | ((bb >> 1) & NOT_H_FILE);
        let row = bb | sides;
        table[square] = sides | (row << 8) | (row >> 8);
    }
    table
}

fn generate_pawn_attack_tables() -> [[BitBoard; 64]; 2] {
    let mut table = [[BitBoard::empty(); 64]; 2];
    for square in Square::all() {
        let bb = square.bitboard();
        table[0][square] = ((bb << 9) & NOT_A_FILE) | ((bb << 7) & NOT_H_FILE);
        table[1][square] = ((bb >> 7) & NOT_A_FILE) | ((bb >> 9) & NOT_H_FILE);
    }
    table
}

fn generate_ray_table(
    attacks: fn(Square, BitBoard) -> BitBoard,
) -> Box<[[BitBoard; 64]; 64]> {
    let mut table = Box::new([[BitBoard::empty(); 64]; 64]);
    for piece in Square::all() {
        for king in Square::all() {
            if attacks(piece, BitBoard::empty()).contains(king) {
                let between = attacks(piece, king.bitboard()) & attacks(king, piece.bitboard());
                table[piece][king] = between | piece.bitboard();
            }
        }
    }
    table
}
