// src/main.rs
// Compile `<dir>/rules.txt` into `<dir>/table.bin`.
// Usage:
//   cargo run -- <dir>
//   LEXTAB_JSON=1 cargo run -- <dir>      # also write <dir>/table.json
//   LEXTAB_VERBOSE=1 cargo run -- <dir>   # print the rule set with defaults

use std::{env, fs, path::Path, time::Instant};

use anyhow::{Context, Result};
use lextab::{
    config::Config,
    lexer::{
        selftest,
        tables::{RuleSet, build_table, check_progress, save_table_bin, save_table_json},
    },
};

fn run(dir: &Path, cfg: &Config) -> Result<()> {
    let instant = Instant::now();
    if !cfg.skip_selftest {
        let checks = selftest::run().context("built-in self-test failed")?;
        println!("[lextab] self-test: {checks} checks passed");
    }

    let rules_path = dir.join("rules.txt");
    let text = fs::read_to_string(&rules_path)
        .with_context(|| format!("failed to read {}", rules_path.display()))?;
    let mut rs = RuleSet::parse(&text).with_context(|| rules_path.display().to_string())?;
    let table = build_table(&mut rs).with_context(|| rules_path.display().to_string())?;
    if cfg.verbose {
        print!("{rs}");
    }
    check_progress(&table).with_context(|| rules_path.display().to_string())?;
    println!(
        "[lextab] {} states x {} patterns",
        table.state_count(),
        table.pattern_count()
    );

    let tests_path = dir.join("tests.txt");
    if tests_path.exists() {
        let tests = fs::read_to_string(&tests_path)
            .with_context(|| format!("failed to read {}", tests_path.display()))?;
        let passed = selftest::run_scan_tests(&table, &tests, |s| {
            if cfg.trace {
                println!("  {}", selftest::describe_step(&table, s));
            }
        })
        .with_context(|| tests_path.display().to_string())?;
        println!("[lextab] {passed} scan tests passed");
    }

    let bin_path = dir.join("table.bin");
    save_table_bin(&bin_path, &table)
        .with_context(|| format!("failed to write {}", bin_path.display()))?;
    println!("[lextab] wrote {}", bin_path.display());
    if cfg.json {
        let json_path = dir.join("table.json");
        save_table_json(&json_path, &table)
            .with_context(|| format!("failed to write {}", json_path.display()))?;
        println!("[lextab] wrote {}", json_path.display());
    }
    println!("[lextab] done in {} ms", instant.elapsed().as_millis());
    Ok(())
}

fn main() {
    let Some(dir) = env::args().nth(1) else {
        eprintln!("usage: lextab <dir>");
        std::process::exit(1);
    };
    let cfg = Config::from_env();
    if let Err(e) = run(Path::new(&dir), &cfg) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
