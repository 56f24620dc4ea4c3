// src/config.rs
// Environment knobs shared by the binaries. Read once at startup.

pub fn env_flag_true(name: &str) -> bool {
    std::env::var(name)
        .map(|v| {
            let v = v.trim().to_ascii_lowercase();
            v == "1" || v == "true" || v == "yes" || v == "on"
        })
        .unwrap_or(false)
}

pub fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

pub fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    /// Also write `table.json` next to `table.bin`.
    pub json: bool,
    /// Print the rule set after default synthesis.
    pub verbose: bool,
    /// Trace every scanner step while running `tests.txt`.
    pub trace: bool,
    /// Skip the built-in battery (handy when iterating on a rules file).
    pub skip_selftest: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            json: env_flag_true("LEXTAB_JSON"),
            verbose: env_flag_true("LEXTAB_VERBOSE"),
            trace: env_flag_true("LEXTAB_TRACE"),
            skip_selftest: env_flag_true("LEXTAB_SKIP_SELFTEST"),
        }
    }
}
