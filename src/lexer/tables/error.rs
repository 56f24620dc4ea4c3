// src/lexer/tables/error.rs
use thiserror::Error;

use super::tokens::show_byte;

/// Which side of a token boundary a state lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Starting,
    Continuing,
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Kind::Starting => "starting",
            Kind::Continuing => "continuing",
        })
    }
}

/// Everything that can stop a rules file from compiling. None of these are
/// recoverable; the caller reports the message and gives up.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("line {row}: {message}")]
    Syntax { row: usize, message: String },

    #[error(
        "{state} is a {first} state (line {first_row}) and a {second} state (line {second_row})"
    )]
    Conflict {
        state: String,
        first: Kind,
        first_row: usize,
        second: Kind,
        second_row: usize,
    },

    #[error("line {row}: {message}")]
    Consistency { row: usize, message: String },

    #[error("too many {what} ({found}, limit {limit})")]
    Capacity {
        what: &'static str,
        found: usize,
        limit: usize,
    },

    #[error("state {state} has no action for '{}'", show_byte(.byte))]
    Incomplete { state: String, byte: u8 },

    #[error("possible infinite loop with '{}' in states {}", show_byte(.byte), join_states(.states))]
    Loop { byte: u8, states: Vec<String> },
}

impl CompileError {
    pub(crate) fn syntax(row: usize, message: impl Into<String>) -> Self {
        CompileError::Syntax {
            row,
            message: message.into(),
        }
    }

    pub(crate) fn consistency(row: usize, message: impl Into<String>) -> Self {
        CompileError::Consistency {
            row,
            message: message.into(),
        }
    }
}

fn join_states(states: &[String]) -> String {
    states.join(" -> ")
}

/// Failures reading or writing a compiled table.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("table truncated: {0}")]
    Truncated(&'static str),

    #[error("malformed table: {0}")]
    Malformed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("table failed its checks: {0}")]
    Check(#[from] CompileError),
}
