// src/lexer/cpu.rs
// Line scanner driven by a compiled table. Total by construction: once a table
// has passed its checks every byte has an action and no lookahead chain spins.

use crate::lexer::tables::{Action, Table, Tag, tokens::show_byte};

/// Index of the state every document starts in.
pub const START_STATE: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub tag: Tag,
    pub start: usize,
    pub len: usize,
}

/// One decision of the scanner, reported to tracing callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub at: usize,
    pub state: u8,
    /// Matched pattern index; `None` when no cell matched and the byte was
    /// forced through as BAD.
    pub pattern: Option<usize>,
    pub action: Action,
}

/// Bytes the table can talk about. Other control bytes read as a space; bytes
/// from 0x80 up are left alone and never match a pattern.
#[inline]
fn class(b: u8) -> u8 {
    if b < b' ' || b == 0x7F { b' ' } else { b }
}

/// A line body (no trailing newline) followed by one virtual newline.
struct Cursor<'a> {
    body: &'a [u8],
}

impl Cursor<'_> {
    #[inline]
    fn end(&self) -> usize {
        self.body.len()
    }

    #[inline]
    fn at(&self, i: usize) -> Option<u8> {
        match i.cmp(&self.body.len()) {
            std::cmp::Ordering::Less => Some(class(self.body[i])),
            std::cmp::Ordering::Equal => Some(b'\n'),
            std::cmp::Ordering::Greater => None,
        }
    }

    fn matches(&self, at: usize, pattern: &[u8]) -> bool {
        pattern
            .iter()
            .enumerate()
            .all(|(k, &p)| self.at(at + k) == Some(p))
    }
}

/// First non-SKIP pattern of the state's row that matches at `at`, longest
/// candidates first.
fn find(t: &Table, state: u8, cur: &Cursor<'_>, at: usize) -> Option<(usize, Action)> {
    let b = cur.at(at)?;
    let row = t.row(state as usize);
    t.run(b)
        .filter(|&i| !row[i].is_skip())
        .find(|&i| cur.matches(at, &t.patterns()[i]))
        .map(|i| (i, row[i]))
}

fn newline_action(t: &Table, state: u8) -> Action {
    t.pattern_index(b"\n")
        .map(|i| t.row(state as usize)[i])
        .filter(|a| !a.is_skip())
        .unwrap_or(Action {
            tag: Tag::BAD,
            lookahead: false,
            target: state,
        })
}

/// A gap marker defers to what follows the spaces: a zero-width action there
/// is taken now; anything else means the token ends as it would at the end
/// of the line.
fn resolve_gap(t: &Table, state: u8, cur: &Cursor<'_>, at: usize) -> Action {
    let mut q = at;
    while cur.at(q) == Some(b' ') {
        q += 1;
    }
    match find(t, state, cur, q) {
        Some((_, a)) if a.lookahead && !a.is_gap_marker(state) => a,
        _ => newline_action(t, state),
    }
}

#[inline]
fn emit(tags: &mut [u8], start: usize, tag: Tag) {
    if let Some(slot) = tags.get_mut(start) {
        *slot = tag.0;
    }
}

/// Tag one line starting in `state` and return the state at its end. `tags`
/// gets one byte per input byte; a missing trailing newline is assumed.
pub fn scan_line(t: &Table, state: u8, line: &[u8], tags: &mut Vec<u8>) -> u8 {
    scan_line_traced(t, state, line, tags, |_| {})
}

pub fn scan_line_traced(
    t: &Table,
    state: u8,
    line: &[u8],
    tags: &mut Vec<u8>,
    mut trace: impl FnMut(&Step),
) -> u8 {
    let body = line.strip_suffix(b"\n").unwrap_or(line);
    let cur = Cursor { body };
    tags.clear();
    tags.resize(line.len(), Tag::MORE.0);

    let mut state = if (state as usize) < t.state_count() {
        state
    } else {
        START_STATE
    };
    let (mut at, mut start) = (0usize, 0usize);
    let mut stalls = 0usize;

    while at <= cur.end() {
        if body.get(at).is_some_and(|&b| b >= 0x80) {
            at += 1;
            continue;
        }
        let (pattern, mut action, len) = match find(t, state, &cur, at) {
            Some((i, a)) => (Some(i), a, t.patterns()[i].len()),
            None => (
                None,
                Action {
                    tag: Tag::BAD,
                    lookahead: false,
                    target: state,
                },
                1,
            ),
        };
        if action.is_gap_marker(state) {
            action = resolve_gap(t, state, &cur, at);
        }
        let step = Step {
            at,
            state,
            pattern,
            action,
        };
        log::trace!(
            "[scan] {}@{} '{}' -> {}{} {}",
            state,
            at,
            cur.at(at).map(show_byte).unwrap_or_default(),
            if action.lookahead { "~" } else { "" },
            action.tag.ch(),
            action.target
        );
        trace(&step);

        if action.lookahead {
            stalls += 1;
            if stalls <= t.state_count() {
                if !action.tag.is_more() && at > start {
                    emit(tags, start, action.tag);
                    start = at;
                }
                state = action.target;
                continue;
            }
            log::warn!("[scan] no progress at byte {at} in state {state}; forcing BAD");
            action = Action {
                tag: Tag::BAD,
                lookahead: false,
                target: state,
            };
        }
        stalls = 0;
        at += len;
        if !action.tag.is_more() {
            emit(tags, start, action.tag);
            start = at;
        }
        state = action.target;
    }
    state
}

/// Split a tag array into tokens. Leading continuation bytes (a token carried
/// over from the previous line) are not reported.
pub fn tokens(tags: &[u8]) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::new();
    for (i, &b) in tags.iter().enumerate() {
        if b != Tag::MORE.0 {
            out.push(Token {
                tag: Tag(b),
                start: i,
                len: 1,
            });
        } else if let Some(last) = out.last_mut() {
            last.len += 1;
        }
    }
    out
}

/// Scan a whole text from the start state. Returns the tags for every byte and
/// the end state of each line.
pub fn scan_text(t: &Table, text: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let mut all = Vec::with_capacity(text.len());
    let mut ends = Vec::new();
    let mut tags = Vec::new();
    let mut state = START_STATE;
    for line in text.split_inclusive(|&b| b == b'\n') {
        state = scan_line(t, state, line, &mut tags);
        all.extend_from_slice(&tags);
        ends.push(state);
    }
    (all, ends)
}
