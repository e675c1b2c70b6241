#![allow(dead_code)]

use std::{env, error::Error, fs, path::PathBuf};

#[path = "src/format.rs"]
mod format;
#[path = "src/generate.rs"]
mod generate;
#[path = "src/magic.rs"]
mod magic;

fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src/format.rs");
    println!("cargo:rerun-if-changed=src/generate.rs");
    println!("cargo:rerun-if-changed=src/magic.rs");

    let tables = generate::generate_magic_tables(generate::DEFAULT_SEED)?;
    let out = PathBuf::from(env::var("OUT_DIR")?).join("magic_tables.bin");
    fs::write(out, tables.to_bytes())?;
    Ok(())
}
