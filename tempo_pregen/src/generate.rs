use rand::{rngs::StdRng, Rng, SeedableRng};
use tempo_bitboards::{BitBoard, Square};

use crate::format::TableError;
use crate::magic::{MagicEntry, MagicTables, SliderFamily};

pub const DEFAULT_SEED: u64 = 0x11A5_117A_B1E0;
const MAX_ATTEMPTS: usize = 100_000_000;

const ROOK_DIRECTIONS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const BISHOP_DIRECTIONS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

fn ray_cast(square: Square, blockers: BitBoard, directions: &[(i8, i8); 4]) -> BitBoard {
    let mut result = BitBoard::empty();
    for &(dr, df) in directions {
        let mut rank = square.rank() as i8 + dr;
        let mut file = square.file() as i8 + df;
        while (0..8).contains(&rank) && (0..8).contains(&file) {
            let target = Square::from_rank_file(rank as u8, file as u8);
            result |= target.bitboard();
            if blockers.contains(target) {
                break;
            }
            rank += dr;
            file += df;
        }
    }
    result
}

/// Rook attacks computed by walking each ray until the first blocker.
pub fn rook_attacks(square: Square, blockers: BitBoard) -> BitBoard {
    ray_cast(square, blockers, &ROOK_DIRECTIONS)
}

/// Bishop attacks computed by walking each ray until the first blocker.
pub fn bishop_attacks(square: Square, blockers: BitBoard) -> BitBoard {
    ray_cast(square, blockers, &BISHOP_DIRECTIONS)
}

pub fn reference_attacks(family: SliderFamily, square: Square, blockers: BitBoard) -> BitBoard {
    match family {
        SliderFamily::Rook => rook_attacks(square, blockers),
        SliderFamily::Bishop => bishop_attacks(square, blockers),
    }
}

// the last square of each ray never changes the result, so it is not a relevant blocker
fn edge_mask(square: Square) -> BitBoard {
    let rank_edges = BitBoard(0xFF000000000000FF) & !BitBoard(0xFF << (square.rank() * 8));
    let file_edges = BitBoard(0x8181818181818181) & !BitBoard(0x0101010101010101 << square.file());
    rank_edges | file_edges
}

pub fn rook_mask(square: Square) -> BitBoard {
    let mut mask = BitBoard::empty();
    let (rank, file) = (square.rank(), square.file());
    for r in 1..7 {
        if r != rank {
            mask |= Square::from_rank_file(r, file).bitboard();
        }
    }
    for f in 1..7 {
        if f != file {
            mask |= Square::from_rank_file(rank, f).bitboard();
        }
    }
    mask
}

pub fn bishop_mask(square: Square) -> BitBoard {
    bishop_attacks(square, BitBoard::empty()) & !edge_mask(square)
}

pub fn relevant_mask(family: SliderFamily, square: Square) -> BitBoard {
    match family {
        SliderFamily::Rook => rook_mask(square),
        SliderFamily::Bishop => bishop_mask(square),
    }
}

/// Every subset of `mask`, starting with the empty set.
pub fn blocker_subsets(mask: BitBoard) -> impl Iterator<Item = BitBoard> {
    let mut subset = Some(0u64);
    std::iter::from_fn(move || {
        let current = subset?;
        let next = current.wrapping_sub(mask.0) & mask.0;
        subset = (next != 0).then_some(next);
        Some(BitBoard(current))
    })
}

fn random_sparse_u64(rng: &mut StdRng) -> u64 {
    rng.gen::<u64>() & rng.gen::<u64>() & rng.gen::<u64>()
}

fn find_magic(
    rng: &mut StdRng,
    family: SliderFamily,
    square: Square,
    offset: usize,
    attacks: &mut Vec<BitBoard>,
) -> Result<MagicEntry, TableError> {
    let relevant = relevant_mask(family, square);
    let bits = relevant.count_ones();
    let mask = relevant.inverse().0;

    let occupancies = blocker_subsets(relevant).collect::<Vec<_>>();
    let references = occupancies
        .iter()
        .map(|&blockers| reference_attacks(family, square, blockers))
        .collect::<Vec<_>>();

    let size = 1usize << bits;
    let mut used = vec![BitBoard::empty(); size];
    // attempt number each slot was last written in, so slots never need clearing
    let mut epoch = vec![0usize; size];

    for attempt in 1..=MAX_ATTEMPTS {
        let magic = random_sparse_u64(rng);
        let candidate = MagicEntry {
            mask,
            magic,
            bits,
            offset: 0,
        };

        let collision_free = occupancies.iter().zip(&references).all(|(&occ, &attack)| {
            let index = candidate.index(occ);
            if epoch[index] != attempt {
                epoch[index] = attempt;
                used[index] = attack;
                true
            } else {
                used[index] == attack
            }
        });

        if collision_free {
            attacks.resize(offset + size, BitBoard::empty());
            attacks[offset..].copy_from_slice(&used);
            return Ok(MagicEntry {
                offset: offset as u32,
                ..candidate
            });
        }
    }

    Err(TableError::NoMagicFound { family, square })
}

/// Searches magics for every square of both families and packs their attack
/// sets into one buffer, rooks first.
pub fn generate_magic_tables(seed: u64) -> Result<MagicTables, TableError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut attacks = Vec::new();

    let mut rook = [MagicEntry::default(); 64];
    for square in Square::all() {
        rook[square] = find_magic(&mut rng, SliderFamily::Rook, square, attacks.len(), &mut attacks)?;
    }

    let mut bishop = [MagicEntry::default(); 64];
    for square in Square::all() {
        bishop[square] =
            find_magic(&mut rng, SliderFamily::Bishop, square, attacks.len(), &mut attacks)?;
    }

    Ok(MagicTables::from_parts_unverified(rook, bishop, attacks))
}
