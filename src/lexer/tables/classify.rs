// src/lexer/tables/classify.rs
// Middle end: decide which states sit between tokens and which sit inside one,
// check that the rules respect that split, then add the implicit rules every
// state needs so the table has an action for every byte.

use super::{
    error::{CompileError, Kind},
    registry::Pattern,
    rules::{Rule, RuleSet, StateId},
    tokens::Tag,
};

impl RuleSet {
    /// Single forward pass over the rules. Idempotent.
    pub fn classify(&mut self) -> Result<(), CompileError> {
        if self.classified {
            return Ok(());
        }
        let Some(first) = self.rules().first() else {
            return Err(CompileError::syntax(0, "no rules found"));
        };
        let (base, row) = (first.base, first.row);
        self.mark(base, Kind::Starting, row)?;

        for i in 0..self.rules().len() {
            let r = &self.rules()[i];
            let (base, target, row) = (r.base, r.target, r.row);
            let (ending, zero_width) = (r.ending(), r.zero_width());
            if ending {
                self.mark(target, Kind::Starting, row)?;
            }
            if !zero_width && !ending {
                self.mark(target, Kind::Continuing, row)?;
            }
            if zero_width && ending {
                self.mark(base, Kind::Continuing, row)?;
            }
        }

        self.check_lookaheads()?;
        self.check_jumps()?;
        self.check_reachable()?;
        self.classified = true;
        Ok(())
    }

    fn mark(&mut self, id: StateId, kind: Kind, row: usize) -> Result<(), CompileError> {
        let s = &mut self.states_mut()[id.idx()];
        match s.kind {
            None => {
                s.kind = Some((kind, row));
                Ok(())
            }
            Some((k, _)) if k == kind => Ok(()),
            Some((k, first_row)) => Err(CompileError::Conflict {
                state: s.name.clone(),
                first: k,
                first_row,
                second: kind,
                second_row: row,
            }),
        }
    }

    /// Classification and the row it came from. Unmarked states are starting.
    fn kind_of(&self, id: StateId) -> (Kind, usize) {
        let s = self.state(id);
        s.kind.unwrap_or((Kind::Starting, s.row))
    }

    // A continuing state has to be able to end its token on a space, so an
    // explicit lookahead there must end the token.
    fn check_lookaheads(&self) -> Result<(), CompileError> {
        for r in self.rules() {
            if !r.explicit_lookahead() || r.ending() {
                continue;
            }
            let (kind, why) = self.kind_of(r.base);
            if kind == Kind::Continuing {
                return Err(CompileError::consistency(
                    r.row,
                    format!(
                        "lookahead in continuing state {} (line {why}) must end the token",
                        self.state(r.base).name
                    ),
                ));
            }
        }
        Ok(())
    }

    fn check_jumps(&self) -> Result<(), CompileError> {
        for r in self.rules() {
            if !r.zero_width() || r.ending() {
                continue;
            }
            let (from, from_row) = self.kind_of(r.base);
            let (to, to_row) = self.kind_of(r.target);
            if from != to {
                return Err(CompileError::consistency(
                    r.row,
                    format!(
                        "jump from {} ({from}, line {from_row}) to {} ({to}, line {to_row}) \
                         crosses a token boundary",
                        self.state(r.base).name,
                        self.state(r.target).name
                    ),
                ));
            }
        }
        Ok(())
    }

    fn check_reachable(&self) -> Result<(), CompileError> {
        for s in self.states() {
            let mut default_row = None;
            for &id in &s.rules {
                let r = self.rule(id);
                if let Some(d) = default_row {
                    return Err(CompileError::consistency(
                        r.row,
                        format!("rule is inaccessible after the default rule on line {d}"),
                    ));
                }
                if r.is_default() {
                    default_row = Some(r.row);
                }
            }
        }
        Ok(())
    }

    /// Add the implicit rules. Classifies first if needed; each state is only
    /// ever given its defaults once.
    pub fn synthesize_defaults(&mut self) -> Result<(), CompileError> {
        self.classify()?;
        let Some(start) = self.start() else {
            return Err(CompileError::syntax(0, "no rules found"));
        };
        let before = self.rules().len();
        for i in 0..self.states().len() {
            if self.states()[i].synthesized {
                continue;
            }
            self.states_mut()[i].synthesized = true;
            let id = StateId(i as u32);
            if self.state(id).is_starting() {
                self.add_starting_defaults(id);
            } else {
                self.add_continuing_defaults(id, start);
            }
        }
        log::debug!(
            "[tables] synthesized {} default rules",
            self.rules().len() - before
        );
        Ok(())
    }

    fn add_starting_defaults(&mut self, id: StateId) {
        let covered = self.state(id).rules.iter().any(|&r| {
            let r = self.rule(r);
            r.is_default()
                || r.patterns.iter().any(|&p| {
                    matches!(self.registry.pattern(p), Pattern::Range(lo, hi) if *lo <= b'!' && *hi >= b'~')
                })
        });
        if !covered {
            let all = self.registry.intern(Pattern::Range(b'!', b'~'));
            self.push_rule(Rule {
                row: 0,
                base: id,
                patterns: vec![all],
                target: id,
                tag: Tag::BAD,
                lookahead: false,
            });
        }
        self.push_single(id, b' ', id, Tag::GAP, false);
        self.push_single(id, b'\n', id, Tag::NL, false);
    }

    fn add_continuing_defaults(&mut self, id: StateId, start: StateId) {
        let found = self
            .state(id)
            .rules
            .iter()
            .map(|&r| self.rule(r))
            .find(|r| r.is_default())
            .map(|r| (r.tag, r.target));
        let (tag, target) = match found {
            Some(d) => d,
            None => {
                self.push_rule(Rule {
                    row: 0,
                    base: id,
                    patterns: Vec::new(),
                    target: start,
                    tag: Tag::BAD,
                    lookahead: false,
                });
                (Tag::BAD, start)
            }
        };

        let lookahead = self
            .state(id)
            .rules
            .iter()
            .any(|&r| self.rule(r).explicit_lookahead());
        // Space and newline end the token without being part of it; the target
        // state tags them. With a lookahead of its own, spaces defer the
        // decision to whatever follows them.
        if lookahead {
            self.push_single(id, b' ', id, Tag::GAP, true);
        } else {
            self.push_single(id, b' ', target, tag, true);
        }
        self.push_single(id, b'\n', target, tag, true);
    }

    fn push_single(&mut self, base: StateId, b: u8, target: StateId, tag: Tag, lookahead: bool) {
        let p = self.registry.intern(Pattern::Literal(vec![b]));
        self.push_rule(Rule {
            row: 0,
            base,
            patterns: vec![p],
            target,
            tag,
            lookahead,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(rs: &RuleSet) -> Vec<(String, bool)> {
        rs.states()
            .iter()
            .map(|s| (s.name.clone(), s.is_starting()))
            .collect()
    }

    #[test]
    fn marks_from_usage() {
        let mut rs = RuleSet::parse(
            "start a..z id\nstart for key\nkey a..z id\nkey start KEY\nid a..z id\nid start ID\n",
        )
        .unwrap();
        rs.classify().unwrap();
        assert_eq!(
            kinds(&rs),
            vec![
                ("start".into(), true),
                ("id".into(), false),
                ("key".into(), false)
            ]
        );
    }

    #[test]
    fn conflict_cites_both_rows() {
        let mut rs = RuleSet::parse("start a x\nstart b x END\nx start X\n").unwrap();
        match rs.classify() {
            Err(CompileError::Conflict {
                state,
                first,
                first_row,
                second,
                second_row,
            }) => {
                assert_eq!(state, "x");
                assert_eq!((first, first_row), (Kind::Continuing, 1));
                assert_eq!((second, second_row), (Kind::Starting, 2));
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn lookahead_in_starting_state_cannot_end() {
        let mut rs = RuleSet::parse("DOT start . start2\nstart2 start\n").unwrap();
        assert!(matches!(rs.classify(), Err(CompileError::Conflict { .. })));
    }

    #[test]
    fn lookahead_in_continuing_state_must_end() {
        let mut rs =
            RuleSet::parse("start a id\n- id ( id2\nid2 a id2\nid2 start ID\nid start ID\n")
                .unwrap();
        match rs.classify() {
            Err(CompileError::Consistency { row, message }) => {
                assert_eq!(row, 2);
                assert!(message.contains("must end the token"), "{message}");
            }
            other => panic!("expected consistency error, got {other:?}"),
        }
    }

    #[test]
    fn jump_across_boundary() {
        let mut rs = RuleSet::parse("start a id\nid b start\nid start ID\n").unwrap();
        // `id b start` consumes, so it marks start continuing: a conflict.
        assert!(rs.classify().is_err());

        let mut rs = RuleSet::parse("start a id\nid start\n").unwrap();
        match rs.classify() {
            Err(CompileError::Consistency { row, message }) => {
                assert_eq!(row, 2);
                assert!(message.contains("crosses a token boundary"), "{message}");
            }
            other => panic!("expected consistency error, got {other:?}"),
        }
    }

    #[test]
    fn nothing_after_default() {
        let mut rs = RuleSet::parse("start x start X\nstart start2\nstart y start Y\nstart2 start\n")
            .unwrap();
        match rs.classify() {
            Err(CompileError::Consistency { row, message }) => {
                assert_eq!(row, 3);
                assert!(message.contains("line 2"), "{message}");
            }
            other => panic!("expected consistency error, got {other:?}"),
        }
    }

    #[test]
    fn synthesis_is_idempotent() {
        let mut rs = RuleSet::parse("start 0..9 number\nnumber 0..9 start VALUE\n").unwrap();
        rs.synthesize_defaults().unwrap();
        let once = rs.rules().len();
        let shown = rs.to_string();
        rs.synthesize_defaults().unwrap();
        assert_eq!(rs.rules().len(), once);
        assert_eq!(rs.to_string(), shown);
        // start: BAD catch-all, space, newline. number: D, space, newline.
        assert_eq!(once, 2 + 3 + 3);
    }

    #[test]
    fn continuing_with_lookahead_gets_gap_marker() {
        let mut rs =
            RuleSet::parse("start a..z id\nid a..z id\nFUN id ( start\nid start ID\n").unwrap();
        rs.synthesize_defaults().unwrap();
        let id = rs.find_state("id").unwrap();
        let added: Vec<&Rule> = rs
            .state(id)
            .rules
            .iter()
            .map(|&r| rs.rule(r))
            .filter(|r| r.is_synthesized())
            .collect();
        assert_eq!(added.len(), 2);
        assert!(added[0].lookahead && added[0].tag == Tag::GAP && added[0].target == id);
        assert!(added[1].lookahead && added[1].tag == Tag(b'I'));
        assert_eq!(rs.state(added[1].target).name, "start");
    }

    #[test]
    fn continuing_without_lookahead_ends_before_space() {
        let mut rs = RuleSet::parse("start a..z id\nid a..z id\nid start ID\n").unwrap();
        rs.synthesize_defaults().unwrap();
        let id = rs.find_state("id").unwrap();
        let added: Vec<&Rule> = rs
            .state(id)
            .rules
            .iter()
            .map(|&r| rs.rule(r))
            .filter(|r| r.is_synthesized())
            .collect();
        assert_eq!(added.len(), 2);
        for r in added {
            assert!(r.lookahead && r.tag == Tag(b'I'));
            assert_eq!(rs.state(r.target).name, "start");
        }
    }

    #[test]
    fn full_range_covers_starting_state() {
        let mut rs = RuleSet::parse("start !..~ start X\n").unwrap();
        rs.synthesize_defaults().unwrap();
        let start = rs.find_state("start").unwrap();
        let added: Vec<Tag> = rs
            .state(start)
            .rules
            .iter()
            .map(|&r| rs.rule(r))
            .filter(|r| r.is_synthesized())
            .map(|r| r.tag)
            .collect();
        assert_eq!(added, vec![Tag::GAP, Tag::NL]);

        let t = crate::lexer::tables::build_table(&mut rs).unwrap();
        let a = t.lookup("start", b"x").unwrap();
        assert_eq!((a.tag, a.target, a.lookahead), (Tag(b'X'), 0, false));
    }

    #[test]
    fn explicit_default_covers_starting_state() {
        let mut rs = RuleSet::parse(
            "start # hash KEY\nhash include start RESERVED\nhash start\n",
        )
        .unwrap();
        rs.synthesize_defaults().unwrap();
        let hash = rs.find_state("hash").unwrap();
        // Only space and newline were added.
        let added = rs
            .state(hash)
            .rules
            .iter()
            .filter(|&&r| rs.rule(r).is_synthesized())
            .count();
        assert_eq!(added, 2);
    }
}
