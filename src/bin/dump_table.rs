// src/bin/dump_table.rs
// Convert a compiled table.bin to the JSON debug form.
// Usage:
//   cargo run --bin dump_table -- <dir>/table.bin             # writes <dir>/table.json
//   cargo run --bin dump_table -- <dir>/table.bin out.json

use std::{env, path::PathBuf};

use lextab::lexer::tables::{load_table_bin, save_table_json};

fn main() {
    let Some(input) = env::args().nth(1).map(PathBuf::from) else {
        eprintln!("usage: dump_table <table.bin> [out.json]");
        std::process::exit(1);
    };
    let out = env::args()
        .nth(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| input.with_extension("json"));

    let table = match load_table_bin(&input) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("error: failed to load {}: {e}", input.display());
            std::process::exit(1);
        }
    };
    if let Err(e) = save_table_json(&out, &table) {
        eprintln!("error: failed to write {}: {e}", out.display());
        std::process::exit(1);
    }
    println!(
        "[dump_table] {} states x {} patterns -> {}",
        table.state_count(),
        table.pattern_count(),
        out.display()
    );
}
