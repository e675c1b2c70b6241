//! Fixed-layout binary form of [`MagicTables`].
//!
//! ```text
//! tag      8 bytes  "TMPMAGIC"
//! version  u32
//! length   u32      number of attack bitboards
//! entries  64 rook then 64 bishop MagicEntry records (mask, magic, bits, offset)
//! attacks  `length` u64 bitboards
//! ```
//!
//! Integers are stored in the byte order of the machine that generated the blob.
//! A blob from a foreign byte order fails the version check.

use std::{fs, path::Path};

use bytemuck::pod_read_unaligned;
use tempo_bitboards::{BitBoard, Square};

use crate::magic::{MagicEntry, MagicTables, SliderFamily};

pub const TAG: &[u8; 8] = b"TMPMAGIC";
pub const VERSION: u32 = 1;

const HEADER_LEN: usize = 16;
const ENTRY_LEN: usize = std::mem::size_of::<MagicEntry>();
const ENTRIES_LEN: usize = 128 * ENTRY_LEN;

#[derive(thiserror::Error, Debug)]
pub enum TableError {
    #[error("failed to access magic tables: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a magic table blob")]
    BadTag,
    #[error("unsupported magic table version {0}")]
    UnsupportedVersion(u32),
    #[error("magic table blob truncated: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },
    #[error("{family:?} entry for {square} has the wrong blocker mask")]
    BadMask { family: SliderFamily, square: Square },
    #[error("{family:?} entry for {square} points outside the attack buffer")]
    OffsetOutOfRange { family: SliderFamily, square: Square },
    #[error("{family:?} attacks for {square} are wrong for blockers {blockers:#018x}")]
    Mismatch {
        family: SliderFamily,
        square: Square,
        blockers: u64,
    },
    #[error("no magic found for {family:?} on {square}")]
    NoMagicFound { family: SliderFamily, square: Square },
}

impl MagicTables {
    pub fn to_bytes(&self) -> Vec<u8> {
        let attacks = self.attack_buffer();
        let mut bytes = Vec::with_capacity(HEADER_LEN + ENTRIES_LEN + attacks.len() * 8);
        bytes.extend_from_slice(TAG);
        bytes.extend_from_slice(&VERSION.to_ne_bytes());
        bytes.extend_from_slice(&(attacks.len() as u32).to_ne_bytes());
        for family in [SliderFamily::Rook, SliderFamily::Bishop] {
            for entry in self.entries(family) {
                bytes.extend_from_slice(bytemuck::bytes_of(entry));
            }
        }
        bytes.extend_from_slice(bytemuck::cast_slice(attacks));
        bytes
    }

    /// Parses and verifies a blob. Anything short of a fully correct table is an error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TableError> {
        if bytes.len() < HEADER_LEN {
            return Err(TableError::Truncated {
                expected: HEADER_LEN,
                found: bytes.len(),
            });
        }
        if &bytes[..8] != TAG {
            return Err(TableError::BadTag);
        }
        let version = pod_read_unaligned::<u32>(&bytes[8..12]);
        if version != VERSION {
            return Err(TableError::UnsupportedVersion(version));
        }
        let length = pod_read_unaligned::<u32>(&bytes[12..16]) as usize;

        let expected = HEADER_LEN + ENTRIES_LEN + length * 8;
        if bytes.len() != expected {
            return Err(TableError::Truncated {
                expected,
                found: bytes.len(),
            });
        }

        let mut records = bytes[HEADER_LEN..HEADER_LEN + ENTRIES_LEN]
            .chunks_exact(ENTRY_LEN)
            .map(pod_read_unaligned::<MagicEntry>);
        let mut rook = [MagicEntry::default(); 64];
        let mut bishop = [MagicEntry::default(); 64];
        for (slot, record) in rook.iter_mut().chain(bishop.iter_mut()).zip(&mut records) {
            *slot = record;
        }

        let attacks = bytes[HEADER_LEN + ENTRIES_LEN..]
            .chunks_exact(8)
            .map(pod_read_unaligned::<BitBoard>)
            .collect();

        MagicTables::from_parts(rook, bishop, attacks)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), TableError> {
        fs::write(path, self.to_bytes())?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        Self::from_bytes(&fs::read(path)?)
    }
}
