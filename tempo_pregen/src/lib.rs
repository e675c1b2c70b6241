mod consts;
mod format;
pub mod generate;
mod magic;
mod tables;

pub use consts::*;
pub use format::{TableError, TAG, VERSION};
pub use generate::{generate_magic_tables, DEFAULT_SEED};
pub use magic::{MagicEntry, MagicTables, SliderFamily};
pub use tables::AttackTables;

/// Magic tables generated by the build script for this crate.
pub(crate) static EMBEDDED_TABLES: &[u8] =
    include_bytes!(concat!(env!("OUT_DIR"), "/magic_tables.bin"));
