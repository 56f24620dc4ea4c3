// src/lexer/tables/rules.rs
// Rule language front end. One rule per line:
//
//     <LEADTAG>? base pattern* target <TRAILTAG>?
//
// A leading tag makes the rule a lookahead (zero-width); a trailing tag ends the
// current token. No patterns at all makes a default rule.

use std::fmt;

use hashbrown::HashMap;

use super::{
    error::{CompileError, Kind},
    registry::{Pattern, PatternId, Registry},
    tokens::{TAG_SYMBOLS, Tag, in_alphabet},
};

pub const MAX_PATTERN_LEN: usize = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub u32);

impl StateId {
    #[inline]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleId(pub u32);

impl RuleId {
    #[inline]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub struct State {
    pub name: String,
    /// Row of first mention.
    pub row: usize,
    /// Classification and the row that justified it.
    pub kind: Option<(Kind, usize)>,
    pub rules: Vec<RuleId>,
    pub synthesized: bool,
}

impl State {
    #[inline]
    pub fn is_starting(&self) -> bool {
        !matches!(self.kind, Some((Kind::Continuing, _)))
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    /// Source row, 0 for rules added by default synthesis.
    pub row: usize,
    pub base: StateId,
    pub patterns: Vec<PatternId>,
    pub target: StateId,
    pub tag: Tag,
    pub lookahead: bool,
}

impl Rule {
    #[inline]
    pub fn is_default(&self) -> bool {
        self.patterns.is_empty()
    }

    #[inline]
    pub fn zero_width(&self) -> bool {
        self.lookahead || self.patterns.is_empty()
    }

    #[inline]
    pub fn ending(&self) -> bool {
        !self.tag.is_more()
    }

    #[inline]
    pub fn is_synthesized(&self) -> bool {
        self.row == 0
    }

    /// A lookahead the user wrote, as opposed to one default synthesis added.
    #[inline]
    pub fn explicit_lookahead(&self) -> bool {
        self.lookahead && !self.is_synthesized()
    }
}

/// Arena holding everything one compilation knows about: patterns, tags,
/// states and rules, all referred to by index.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub registry: Registry,
    states: Vec<State>,
    state_ids: HashMap<String, StateId>,
    rules: Vec<Rule>,
    pub(crate) classified: bool,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a whole rules file.
    pub fn parse(text: &str) -> Result<Self, CompileError> {
        let mut rs = RuleSet::new();
        for (i, line) in text.lines().enumerate() {
            rs.add_line(i + 1, line)?;
        }
        if rs.rules.is_empty() {
            return Err(CompileError::syntax(0, "no rules found"));
        }
        if let Some(s) = rs.states.iter().find(|s| s.rules.is_empty()) {
            return Err(CompileError::syntax(
                s.row,
                format!("state {} is used but has no rules", s.name),
            ));
        }
        log::debug!(
            "[tables] parsed {} rules over {} states, {} patterns",
            rs.rules.len(),
            rs.states.len(),
            rs.registry.pattern_count()
        );
        Ok(rs)
    }

    /// Read one source line. Commentary lines are accepted and ignored.
    pub fn add_line(&mut self, row: usize, line: &str) -> Result<(), CompileError> {
        if let Some(&b) = line
            .as_bytes()
            .iter()
            .find(|&&b| b != b'\t' && !(b' '..=b'~').contains(&b))
        {
            return Err(CompileError::syntax(
                row,
                format!("illegal character 0x{b:02X}"),
            ));
        }
        let line = line.replace('\t', " ");
        let tokens: Vec<&str> = line.split(' ').filter(|t| !t.is_empty()).collect();
        if !is_rule_line(&tokens) {
            return Ok(());
        }
        self.add_rule(row, &tokens)
    }

    fn add_rule(&mut self, row: usize, tokens: &[&str]) -> Result<(), CompileError> {
        let n = tokens.len();
        let lead = !starts_lower(tokens[0]);
        let trail = n > 1 && !starts_lower(tokens[n - 1]);
        if lead && trail {
            return Err(CompileError::syntax(row, "rule has two tags"));
        }

        let mut body = tokens;
        let (tag, lookahead) = if lead {
            body = &body[1..];
            (self.registry.intern_tag(row, tokens[0])?, true)
        } else if trail {
            body = &body[..n - 1];
            (self.registry.intern_tag(row, tokens[n - 1])?, false)
        } else {
            (Tag::MORE, false)
        };
        if body.len() < 2 {
            return Err(CompileError::syntax(row, "rule too short"));
        }

        let (base, rest) = body.split_first().ok_or_else(|| CompileError::syntax(row, "rule too short"))?;
        let (target, pats) = rest.split_last().ok_or_else(|| CompileError::syntax(row, "rule too short"))?;
        for name in [base, target] {
            if !starts_lower(name) {
                return Err(CompileError::syntax(row, format!("bad state name {name}")));
            }
        }

        let mut patterns = Vec::with_capacity(pats.len());
        for tok in pats {
            let p = parse_pattern(row, tok)?;
            patterns.push(self.registry.intern(p));
        }

        let base = self.state_id(base, row);
        let target = self.state_id(target, row);
        self.push_rule(Rule {
            row,
            base,
            patterns,
            target,
            tag,
            lookahead,
        });
        Ok(())
    }

    pub(crate) fn state_id(&mut self, name: &str, row: usize) -> StateId {
        if let Some(&id) = self.state_ids.get(name) {
            return id;
        }
        let id = StateId(self.states.len() as u32);
        self.states.push(State {
            name: name.to_string(),
            row,
            kind: None,
            rules: Vec::new(),
            synthesized: false,
        });
        self.state_ids.insert(name.to_string(), id);
        id
    }

    pub(crate) fn push_rule(&mut self, rule: Rule) -> RuleId {
        let id = RuleId(self.rules.len() as u32);
        self.states[rule.base.idx()].rules.push(id);
        self.rules.push(rule);
        id
    }

    #[inline]
    pub fn states(&self) -> &[State] {
        &self.states
    }

    #[inline]
    pub(crate) fn states_mut(&mut self) -> &mut [State] {
        &mut self.states
    }

    #[inline]
    pub fn state(&self, id: StateId) -> &State {
        &self.states[id.idx()]
    }

    pub fn find_state(&self, name: &str) -> Option<StateId> {
        self.state_ids.get(name).copied()
    }

    #[inline]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    #[inline]
    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.idx()]
    }

    /// Base state of the first rule: where scanning of a document begins.
    pub fn start(&self) -> Option<StateId> {
        self.rules.first().map(|r| r.base)
    }

    fn tag_name(&self, tag: Tag) -> &str {
        self.registry.tag_name(tag).unwrap_or("?")
    }
}

fn starts_lower(tok: &str) -> bool {
    tok.as_bytes().first().is_some_and(|b| b.is_ascii_lowercase())
}

fn is_rule_line(tokens: &[&str]) -> bool {
    let Some(first) = tokens.first() else {
        return false;
    };
    let c = first.as_bytes()[0];
    if c.is_ascii_alphabetic() {
        return true;
    }
    first.len() == 1 && TAG_SYMBOLS.contains(&c) && tokens.len() >= 4 && starts_lower(tokens[1])
}

fn parse_pattern(row: usize, tok: &str) -> Result<Pattern, CompileError> {
    let bytes = unescape(row, tok)?;
    if bytes.len() == 4 && bytes[1] == b'.' && bytes[2] == b'.' {
        let (lo, hi) = (bytes[0], bytes[3]);
        if lo > hi {
            return Err(CompileError::syntax(row, format!("bad range {tok}")));
        }
        return Ok(Pattern::Range(lo, hi));
    }
    if bytes.len() > MAX_PATTERN_LEN {
        return Err(CompileError::syntax(row, format!("pattern too long: {tok}")));
    }
    if bytes.len() > 1 && bytes.contains(&b'\n') {
        return Err(CompileError::syntax(
            row,
            format!("newline must be a pattern on its own: {tok}"),
        ));
    }
    Ok(Pattern::Literal(bytes))
}

/// `\` followed by decimal digits is a character code; `\0` followed by hex
/// digits is a hex code. Any other backslash is literal.
fn unescape(row: usize, tok: &str) -> Result<Vec<u8>, CompileError> {
    let b = tok.as_bytes();
    let mut out = Vec::with_capacity(b.len());
    let mut i = 0;
    while i < b.len() {
        if b[i] != b'\\' || !b.get(i + 1).is_some_and(|d| d.is_ascii_digit()) {
            out.push(b[i]);
            i += 1;
            continue;
        }
        let j = i + 1;
        let (radix, end) = if b[j] == b'0' {
            let n = b[j..].iter().take_while(|d| d.is_ascii_hexdigit()).count();
            (16, j + n)
        } else {
            let n = b[j..].iter().take_while(|d| d.is_ascii_digit()).count();
            (10, j + n)
        };
        let digits = &tok[j..end];
        let code = u8::from_str_radix(digits, radix)
            .ok()
            .filter(|&c| in_alphabet(c))
            .ok_or_else(|| CompileError::syntax(row, format!("bad character code \\{digits}")))?;
        out.push(code);
        i = end;
    }
    Ok(out)
}

/// Prints the rules back in source form, grouped by state, with synthesized
/// rules marked `+`.
impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for s in &self.states {
            for &id in &s.rules {
                let r = &self.rules[id.idx()];
                if r.is_synthesized() {
                    write!(f, "{:<4}", "+")?;
                } else {
                    write!(f, "{:<4}", r.row)?;
                }
                if r.lookahead {
                    write!(f, "{} ", self.tag_name(r.tag))?;
                }
                f.write_str(&s.name)?;
                for &p in &r.patterns {
                    write!(f, " {}", self.registry.pattern(p))?;
                }
                write!(f, " {}", self.states[r.target.idx()].name)?;
                if !r.lookahead && r.ending() {
                    write!(f, " {}", self.tag_name(r.tag))?;
                }
                writeln!(f)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
