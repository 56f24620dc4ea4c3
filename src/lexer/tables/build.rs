// src/lexer/tables/build.rs
use std::{cmp::Ordering, time::Instant};

use super::{
    Table,
    error::CompileError,
    progress::check_complete,
    registry::{Pattern, PatternId},
    rules::RuleSet,
    tokens::Action,
};

pub const MAX_STARTING: usize = 32;
pub const MAX_STATES: usize = 128;
pub const MAX_PATTERNS: usize = u16::MAX as usize;

/// Byte order, except a proper prefix sorts after the longer string, so the
/// scanner meets longer candidates first.
pub fn compare_keys(a: &[u8], b: &[u8]) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        if x != y {
            return x.cmp(y);
        }
    }
    b.len().cmp(&a.len())
}

/// Literal order per [`compare_keys`], with every range after every literal.
pub fn compare_patterns(p: &Pattern, q: &Pattern) -> Ordering {
    match (p.is_range(), q.is_range()) {
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        _ => compare_keys(&p.key(), &q.key()),
    }
}

/// Lay out and fill the action table. Classification and default synthesis
/// run first if nobody ran them yet.
pub fn build_table(rs: &mut RuleSet) -> Result<Table, CompileError> {
    let instant = Instant::now();
    rs.synthesize_defaults()?;

    // States: starting ones first, otherwise in order of first mention.
    let mut order: Vec<usize> = (0..rs.states().len()).collect();
    order.sort_by_key(|&i| !rs.states()[i].is_starting());
    let starting = order
        .iter()
        .filter(|&&i| rs.states()[i].is_starting())
        .count();
    if starting > MAX_STARTING {
        return Err(CompileError::Capacity {
            what: "starting states",
            found: starting,
            limit: MAX_STARTING,
        });
    }
    if order.len() > MAX_STATES {
        return Err(CompileError::Capacity {
            what: "states",
            found: order.len(),
            limit: MAX_STATES,
        });
    }
    let mut state_index = vec![0u8; order.len()];
    for (new, &old) in order.iter().enumerate() {
        state_index[old] = new as u8;
    }

    // Patterns: sorted, then the trailing ranges are dropped.
    let reg = &rs.registry;
    let mut pats: Vec<PatternId> = reg.patterns().map(|(id, _)| id).collect();
    pats.sort_by(|&a, &b| compare_patterns(reg.pattern(a), reg.pattern(b)));
    let literals = pats
        .iter()
        .take_while(|&&p| !reg.pattern(p).is_range())
        .count();
    pats.truncate(literals);
    if pats.len() > MAX_PATTERNS {
        return Err(CompileError::Capacity {
            what: "patterns",
            found: pats.len(),
            limit: MAX_PATTERNS,
        });
    }
    let mut pattern_index: Vec<Option<usize>> = vec![None; reg.pattern_count()];
    for (new, &p) in pats.iter().enumerate() {
        pattern_index[p.idx()] = Some(new);
    }
    let single = |b: u8| reg.single(b).and_then(|p| pattern_index[p.idx()]);

    // Fill, first declared wins.
    let (n, m) = (order.len(), pats.len());
    let mut actions = vec![Action::SKIP; n * m];
    for r in rs.rules() {
        let s = state_index[r.base.idx()] as usize;
        let row = &mut actions[s * m..(s + 1) * m];
        let act = Action {
            tag: r.tag,
            lookahead: r.zero_width(),
            target: state_index[r.target.idx()],
        };
        let mut fill = |i: Option<usize>| {
            if let Some(i) = i {
                if row[i].is_skip() {
                    row[i] = act;
                }
            }
        };
        if r.is_default() {
            for b in b'!'..=b'~' {
                fill(single(b));
            }
            continue;
        }
        for &p in &r.patterns {
            match reg.pattern(p) {
                Pattern::Range(..) => {
                    for b in reg.pattern(p).singles() {
                        fill(single(b));
                    }
                }
                Pattern::Literal(_) => fill(pattern_index[p.idx()]),
            }
        }
    }

    let states = order.iter().map(|&i| rs.states()[i].name.clone()).collect();
    let patterns = pats.iter().map(|&p| reg.pattern(p).key()).collect();
    let table = Table::from_parts(states, patterns, actions);
    check_complete(&table)?;
    log::debug!(
        "[tables] built {n} states ({starting} starting) x {m} patterns in {} us",
        instant.elapsed().as_micros()
    );
    Ok(table)
}
