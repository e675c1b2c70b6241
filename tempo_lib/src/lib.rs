pub mod board;
pub mod engine;
pub mod error;
pub mod evaluate;
pub mod game_outcome;
pub mod hash_tables;
pub mod history_tables;
pub mod moves;
pub mod options;
pub mod search;
pub mod types;
pub mod zobrist;

use std::{path::Path, sync::Arc};

use tempo_pregen::{AttackTables, TableError};

use crate::zobrist::ZobristKeys;

/// Read-only lookup data shared by every position and search.
pub struct Tables {
    pub attacks: AttackTables,
    pub zobrist: ZobristKeys,
}

impl Tables {
    pub fn new(attacks: AttackTables) -> Arc<Self> {
        Arc::new(Self {
            attacks,
            zobrist: ZobristKeys::default(),
        })
    }

    /// Tables built into the binary. Fails if the embedded blob does not verify.
    pub fn embedded() -> Result<Arc<Self>, TableError> {
        Ok(Self::new(AttackTables::embedded()?))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Arc<Self>, TableError> {
        Ok(Self::new(AttackTables::load(path)?))
    }
}
