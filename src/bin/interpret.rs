// src/bin/interpret.rs
// Load a compiled table, re-check it and run its scan tests.
// Usage:
//   cargo run --bin interpret -- <dir>        # <dir>/table.bin + <dir>/tests.txt
//   cargo run --bin interpret -- <dir> -t     # trace every scanner step
// LEXTAB_TRACE=1 is the same as -t.

use std::{env, fs, path::Path};

use anyhow::{Context, Result};
use lextab::{
    config::Config,
    lexer::{selftest, tables::load_table_bin},
};

fn run(dir: &Path, trace: bool) -> Result<()> {
    let bin_path = dir.join("table.bin");
    let table =
        load_table_bin(&bin_path).with_context(|| format!("failed to load {}", bin_path.display()))?;
    table
        .check()
        .with_context(|| format!("{} failed its checks", bin_path.display()))?;
    println!(
        "[interpret] {} states x {} patterns",
        table.state_count(),
        table.pattern_count()
    );

    let tests_path = dir.join("tests.txt");
    let tests = fs::read_to_string(&tests_path)
        .with_context(|| format!("failed to read {}", tests_path.display()))?;
    let passed = selftest::run_scan_tests(&table, &tests, |s| {
        if trace {
            println!("  {}", selftest::describe_step(&table, s));
        }
    })
    .with_context(|| tests_path.display().to_string())?;
    println!("[interpret] {passed} scan tests passed");
    Ok(())
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let trace = Config::from_env().trace || args.iter().any(|a| a == "-t");
    let Some(dir) = args.iter().find(|a| *a != "-t") else {
        eprintln!("usage: interpret <dir> [-t]");
        std::process::exit(1);
    };
    if let Err(e) = run(Path::new(dir), trace) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
