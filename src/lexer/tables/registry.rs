// src/lexer/tables/registry.rs
use std::fmt;

use hashbrown::HashMap;

use super::{
    error::CompileError,
    tokens::{RESERVED, TAG_SYMBOLS, Tag, alphabet},
};

/// A pattern is either a literal byte string or an inclusive character range.
/// Ranges never reach the compiled table; they fill the single-byte cells.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Pattern {
    Literal(Vec<u8>),
    Range(u8, u8),
}

impl Pattern {
    #[inline]
    pub fn is_range(&self) -> bool {
        matches!(self, Pattern::Range(..))
    }

    /// The byte string used for sorting. A range sorts by its `x..y` spelling,
    /// but ranges are ordered after all literals anyway.
    pub fn key(&self) -> Vec<u8> {
        match self {
            Pattern::Literal(s) => s.clone(),
            Pattern::Range(lo, hi) => vec![*lo, b'.', b'.', *hi],
        }
    }

    /// Single bytes this pattern stands for: its own byte for a one-byte
    /// literal, every byte in the alphabet for a range.
    pub fn singles(&self) -> Vec<u8> {
        match self {
            Pattern::Literal(s) if s.len() == 1 => vec![s[0]],
            Pattern::Literal(_) => Vec::new(),
            Pattern::Range(lo, hi) => alphabet().filter(|b| (*lo..=*hi).contains(b)).collect(),
        }
    }
}

/// Spelling in the rules language. Space and newline are escaped the way the
/// reader expects them, so printed rules parse back the same.
impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Range(lo, hi) => write!(f, "{}..{}", *lo as char, *hi as char),
            Pattern::Literal(s) if s.as_slice() == b"\n" => f.write_str("\\10"),
            Pattern::Literal(s) => {
                for &b in s {
                    match b {
                        b' ' => f.write_str("\\32")?,
                        b => write!(f, "{}", b as char)?,
                    }
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatternId(pub u32);

impl PatternId {
    #[inline]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct TagEntry {
    name: String,
    row: usize,
}

/// Interning arena for patterns and tags. One per compilation.
#[derive(Debug, Clone)]
pub struct Registry {
    patterns: Vec<Pattern>,
    ids: HashMap<Pattern, PatternId>,
    tags: HashMap<u8, TagEntry>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// A registry that already knows every single-byte pattern and the
    /// reserved tags.
    pub fn new() -> Self {
        let mut reg = Registry {
            patterns: Vec::new(),
            ids: HashMap::new(),
            tags: HashMap::new(),
        };
        for b in alphabet() {
            reg.intern(Pattern::Literal(vec![b]));
        }
        for &(name, tag) in RESERVED {
            reg.tags.insert(
                tag.0,
                TagEntry {
                    name: name.to_string(),
                    row: 0,
                },
            );
        }
        reg
    }

    pub fn intern(&mut self, p: Pattern) -> PatternId {
        if let Some(&id) = self.ids.get(&p) {
            return id;
        }
        let id = PatternId(self.patterns.len() as u32);
        self.ids.insert(p.clone(), id);
        self.patterns.push(p);
        id
    }

    /// The pre-interned pattern for one alphabet byte.
    pub fn single(&self, b: u8) -> Option<PatternId> {
        self.ids.get(&Pattern::Literal(vec![b])).copied()
    }

    #[inline]
    pub fn pattern(&self, id: PatternId) -> &Pattern {
        &self.patterns[id.idx()]
    }

    pub fn patterns(&self) -> impl Iterator<Item = (PatternId, &Pattern)> {
        self.patterns
            .iter()
            .enumerate()
            .map(|(i, p)| (PatternId(i as u32), p))
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Register a tag written on `row`. Words keep their first letter on the
    /// wire, so two words sharing one are rejected.
    pub fn intern_tag(&mut self, row: usize, name: &str) -> Result<Tag, CompileError> {
        let Some(&first) = name.as_bytes().first() else {
            return Err(CompileError::syntax(row, "empty token type"));
        };
        let word = first.is_ascii_uppercase();
        let symbol = name.len() == 1 && TAG_SYMBOLS.contains(&first);
        if !word && !symbol {
            return Err(CompileError::syntax(
                row,
                format!("bad token type {name}"),
            ));
        }
        match self.tags.get(&first) {
            Some(e) if e.name == name => Ok(Tag(first)),
            Some(e) => {
                let at = if e.row == 0 {
                    "reserved".to_string()
                } else {
                    format!("line {}", e.row)
                };
                Err(CompileError::syntax(
                    row,
                    format!("tags {} ({at}) and {name} disagree in first letter", e.name),
                ))
            }
            None => {
                self.tags.insert(
                    first,
                    TagEntry {
                        name: name.to_string(),
                        row,
                    },
                );
                Ok(Tag(first))
            }
        }
    }

    /// Full name a tag was registered under.
    pub fn tag_name(&self, tag: Tag) -> Option<&str> {
        self.tags.get(&tag.0).map(|e| e.name.as_str())
    }
}
