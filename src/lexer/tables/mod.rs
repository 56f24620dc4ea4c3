// src/lexer/tables/mod.rs
pub mod build;
pub mod classify;
pub mod error;
pub mod io;
pub mod progress;
pub mod registry;
pub mod rules;
pub mod tokens;

use std::{ops::Range, time::Instant};

pub use build::{build_table, compare_patterns};
pub use error::{CompileError, Kind, TableError};
pub use io::{
    deserialize,
    load_table_bin,
    load_table_json_bytes,
    save_table_bin,
    save_table_json,
    serialize,
};
pub use progress::{check_complete, check_progress};
pub use rules::RuleSet;
pub use tokens::{Action, Tag};

/// Compiled transition table: state names, patterns in final order, and one
/// action per (state, pattern). Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    states: Vec<String>,
    patterns: Vec<Vec<u8>>,
    actions: Vec<Action>, // states x patterns, row-major
    runs: Vec<(u32, u32)>, // first byte -> [lo, hi) pattern indices
}

impl Table {
    /// Assemble a table from parts already known to be consistent.
    pub(crate) fn from_parts(states: Vec<String>, patterns: Vec<Vec<u8>>, actions: Vec<Action>) -> Self {
        let mut runs = vec![(0u32, 0u32); 128];
        for (i, p) in patterns.iter().enumerate() {
            let Some(&b) = p.first() else { continue };
            if b >= 128 {
                continue;
            }
            let run = &mut runs[b as usize];
            if run.0 == run.1 {
                run.0 = i as u32;
            }
            run.1 = i as u32 + 1;
        }
        Table {
            states,
            patterns,
            actions,
            runs,
        }
    }

    /// Assemble a table from untrusted parts, e.g. a file.
    pub fn new(
        states: Vec<String>,
        patterns: Vec<Vec<u8>>,
        actions: Vec<Action>,
    ) -> Result<Self, TableError> {
        if states.is_empty() || states.len() > build::MAX_STATES {
            return Err(TableError::Malformed(format!("{} states", states.len())));
        }
        if actions.len() != states.len() * patterns.len() {
            return Err(TableError::Malformed(format!(
                "{} actions for {} states x {} patterns",
                actions.len(),
                states.len(),
                patterns.len()
            )));
        }
        for p in &patterns {
            if p.is_empty() || !p.iter().all(|&b| tokens::in_alphabet(b)) {
                return Err(TableError::Malformed(format!("bad pattern {p:?}")));
            }
        }
        if patterns
            .windows(2)
            .any(|w| build::compare_keys(&w[0], &w[1]) != std::cmp::Ordering::Less)
        {
            return Err(TableError::Malformed("patterns out of order".into()));
        }
        if let Some(a) = actions.iter().find(|a| a.target as usize >= states.len()) {
            return Err(TableError::Malformed(format!("target {} out of range", a.target)));
        }
        Ok(Self::from_parts(states, patterns, actions))
    }

    #[inline]
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    #[inline]
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn states(&self) -> &[String] {
        &self.states
    }

    pub fn patterns(&self) -> &[Vec<u8>] {
        &self.patterns
    }

    #[inline]
    pub fn row(&self, state: usize) -> &[Action] {
        let m = self.patterns.len();
        &self.actions[state * m..(state + 1) * m]
    }

    /// Patterns whose first byte is `b`, longest first.
    #[inline]
    pub fn run(&self, b: u8) -> Range<usize> {
        match self.runs.get(b as usize) {
            Some(&(lo, hi)) => lo as usize..hi as usize,
            None => 0..0,
        }
    }

    pub fn state_index(&self, name: &str) -> Option<usize> {
        self.states.iter().position(|s| s == name)
    }

    pub fn pattern_index(&self, pattern: &[u8]) -> Option<usize> {
        self.run(*pattern.first()?)
            .find(|&i| self.patterns[i].as_slice() == pattern)
    }

    /// Action for a named state and pattern, mostly for tests and tooling.
    pub fn lookup(&self, state: &str, pattern: &[u8]) -> Option<Action> {
        let s = self.state_index(state)?;
        let p = self.pattern_index(pattern)?;
        Some(self.row(s)[p])
    }

    /// Re-prove completeness and termination, e.g. after loading from disk.
    pub fn check(&self) -> Result<(), TableError> {
        check_complete(self)?;
        check_progress(self)?;
        Ok(())
    }
}

/// Parse, classify, synthesize, build and verify in one go.
pub fn compile(text: &str) -> Result<Table, CompileError> {
    let instant = Instant::now();
    let mut rs = RuleSet::parse(text)?;
    let table = build_table(&mut rs)?;
    check_progress(&table)?;
    log::debug!(
        "[tables] compiled {} states x {} patterns in {} us",
        table.state_count(),
        table.pattern_count(),
        instant.elapsed().as_micros()
    );
    Ok(table)
}
