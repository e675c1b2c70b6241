use bytemuck::{Pod, Zeroable};
use tempo_bitboards::{BitBoard, Square};

use crate::format::TableError;
use crate::generate::{blocker_subsets, reference_attacks, relevant_mask};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SliderFamily {
    Rook,
    Bishop,
}

/// One square's slot in the shared attack buffer.
///
/// `mask` holds every square that is *not* a relevant blocker, so OR-ing the
/// occupancy into it leaves only the relevant bits free to vary:
/// `index = ((occupancy | mask) * magic) >> (64 - bits)`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct MagicEntry {
    pub mask: u64,
    pub magic: u64,
    pub bits: u32,
    pub offset: u32,
}

impl MagicEntry {
    #[inline(always)]
    pub fn index(&self, occupancy: BitBoard) -> usize {
        let hash = (occupancy.0 | self.mask).wrapping_mul(self.magic) >> (64 - self.bits);
        hash as usize + self.offset as usize
    }

    #[inline]
    pub fn size(&self) -> usize {
        1 << self.bits
    }
}

/// Magic entries for both slider families plus the attack buffer they index.
///
/// Instances only come out of the generator or out of a verified blob, so the
/// lookups can skip bounds checks in release builds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MagicTables {
    rook: [MagicEntry; 64],
    bishop: [MagicEntry; 64],
    attacks: Vec<BitBoard>,
}

impl MagicTables {
    pub(crate) fn from_parts_unverified(
        rook: [MagicEntry; 64],
        bishop: [MagicEntry; 64],
        attacks: Vec<BitBoard>,
    ) -> Self {
        Self {
            rook,
            bishop,
            attacks,
        }
    }

    pub fn from_parts(
        rook: [MagicEntry; 64],
        bishop: [MagicEntry; 64],
        attacks: Vec<BitBoard>,
    ) -> Result<Self, TableError> {
        let tables = Self::from_parts_unverified(rook, bishop, attacks);
        tables.verify()?;
        Ok(tables)
    }

    pub fn entries(&self, family: SliderFamily) -> &[MagicEntry; 64] {
        match family {
            SliderFamily::Rook => &self.rook,
            SliderFamily::Bishop => &self.bishop,
        }
    }

    pub fn attack_buffer(&self) -> &[BitBoard] {
        &self.attacks
    }

    #[inline(always)]
    fn lookup(&self, entry: &MagicEntry, occupancy: BitBoard) -> BitBoard {
        let index = entry.index(occupancy);
        #[cfg(debug_assertions)]
        {
            self.attacks[index]
        }
        #[cfg(not(debug_assertions))]
        unsafe {
            // every entry was checked to stay inside the buffer on construction
            *self.attacks.get_unchecked(index)
        }
    }

    #[inline(always)]
    pub fn rook_attacks(&self, square: Square, occupancy: BitBoard) -> BitBoard {
        self.lookup(&self.rook[square], occupancy)
    }

    #[inline(always)]
    pub fn bishop_attacks(&self, square: Square, occupancy: BitBoard) -> BitBoard {
        self.lookup(&self.bishop[square], occupancy)
    }

    /// Checks every entry of both families against the ray-cast reference for
    /// every subset of its relevant blockers.
    pub fn verify(&self) -> Result<(), TableError> {
        for family in [SliderFamily::Rook, SliderFamily::Bishop] {
            for square in Square::all() {
                let entry = &self.entries(family)[square];
                let relevant = relevant_mask(family, square);

                if entry.mask != relevant.inverse().0 || entry.bits != relevant.count_ones() {
                    return Err(TableError::BadMask { family, square });
                }
                if entry.offset as usize + entry.size() > self.attacks.len() {
                    return Err(TableError::OffsetOutOfRange { family, square });
                }

                for blockers in blocker_subsets(relevant) {
                    let expected = reference_attacks(family, square, blockers);
                    if self.attacks[entry.index(blockers)] != expected {
                        return Err(TableError::Mismatch {
                            family,
                            square,
                            blockers: blockers.0,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
