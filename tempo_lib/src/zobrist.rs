use rand::{rngs::StdRng, Rng, SeedableRng};
use tempo_bitboards::Square;

use crate::types::{CastlingIndex, Color, Piece};

pub const ZOBRIST_SEED: u64 = 0x11A5_117A_B1E0;

/// Random keys XOR-ed together to fingerprint a position.
pub struct ZobristKeys {
    pieces: [[[u64; 64]; 6]; 2],
    castling: [[u64; 2]; 2],
    ep_files: [u64; 8],
    black_to_move: u64,
}

impl ZobristKeys {
    pub fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut pieces = [[[0; 64]; 6]; 2];
        for key in pieces.iter_mut().flatten().flatten() {
            *key = rng.gen();
        }
        let mut castling = [[0; 2]; 2];
        for key in castling.iter_mut().flatten() {
            *key = rng.gen();
        }
        let mut ep_files = [0; 8];
        for key in ep_files.iter_mut() {
            *key = rng.gen();
        }
        Self {
            pieces,
            castling,
            ep_files,
            black_to_move: rng.gen(),
        }
    }

    #[inline(always)]
    pub fn piece(&self, color: Color, piece: Piece, square: Square) -> u64 {
        self.pieces[color][piece][square]
    }

    #[inline(always)]
    pub fn castling(&self, color: Color, side: CastlingIndex) -> u64 {
        self.castling[color][side]
    }

    #[inline(always)]
    pub fn en_passant(&self, square: Square) -> u64 {
        self.ep_files[square.file() as usize]
    }

    #[inline(always)]
    pub fn black_to_move(&self) -> u64 {
        self.black_to_move
    }
}

impl Default for ZobristKeys {
    fn default() -> Self {
        Self::new(ZOBRIST_SEED)
    }
}
