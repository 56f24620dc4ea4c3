// src/lexer/tables/progress.rs
// Proofs run on a finished table: every state handles every byte, and no chain
// of zero-width actions can spin forever on any byte.

use super::{
    Table,
    error::CompileError,
    tokens::alphabet,
};

pub fn check_complete(t: &Table) -> Result<(), CompileError> {
    for s in 0..t.state_count() {
        let row = t.row(s);
        for b in alphabet() {
            let handled = t.pattern_index(&[b]).is_some_and(|i| !row[i].is_skip());
            if !handled {
                return Err(CompileError::Incomplete {
                    state: t.states()[s].clone(),
                    byte: b,
                });
            }
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Fresh,
    Visiting,
    Visited,
}

struct Search<'t> {
    t: &'t Table,
    byte: u8,
    marks: Vec<Mark>,
    path: Vec<usize>,
}

impl Search<'_> {
    fn visit(&mut self, s: usize) -> Result<(), CompileError> {
        match self.marks[s] {
            Mark::Visited => return Ok(()),
            Mark::Visiting => {
                let mut states: Vec<String> = self
                    .path
                    .iter()
                    .map(|&p| self.t.states()[p].clone())
                    .collect();
                states.push(self.t.states()[s].clone());
                return Err(CompileError::Loop {
                    byte: self.byte,
                    states,
                });
            }
            Mark::Fresh => {}
        }
        self.marks[s] = Mark::Visiting;
        self.path.push(s);

        let row = self.t.row(s);
        for i in self.t.run(self.byte) {
            let a = row[i];
            if a.is_skip() {
                continue;
            }
            if a.is_gap_marker(s as u8) {
                // Resolved at runtime by whatever follows the spaces: any other
                // zero-width action of this state, or its newline action.
                for (j, c) in row.iter().enumerate() {
                    if j != i && c.lookahead && !c.is_skip() && !c.is_gap_marker(s as u8) {
                        self.visit(c.target as usize)?;
                    }
                }
            } else if a.lookahead {
                self.visit(a.target as usize)?;
            }
            if self.t.patterns()[i].len() == 1 {
                break;
            }
        }

        self.path.pop();
        self.marks[s] = Mark::Visited;
        Ok(())
    }
}

/// Depth-first search per byte with visiting/visited marks. Depth is bounded
/// by the state count.
pub fn check_progress(t: &Table) -> Result<(), CompileError> {
    for byte in alphabet() {
        let mut search = Search {
            t,
            byte,
            marks: vec![Mark::Fresh; t.state_count()],
            path: Vec::new(),
        };
        for s in 0..t.state_count() {
            search.visit(s)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tables::{RuleSet, build_table};

    fn table(text: &str) -> Table {
        let mut rs = RuleSet::parse(text).unwrap();
        build_table(&mut rs).unwrap()
    }

    #[test]
    fn accepts_lookahead_chains() {
        let t = table("start a..z id\nid a..z id\nFUN id ( start\nid start ID\n");
        check_progress(&t).unwrap();
    }

    #[test]
    fn rejects_mutual_jumps() {
        let t = table("start start2\nstart2 start\n");
        match check_progress(&t) {
            Err(CompileError::Loop { byte, states }) => {
                assert_eq!(byte, b'!');
                assert_eq!(states, vec!["start", "start2", "start"]);
            }
            other => panic!("expected loop, got {other:?}"),
        }
    }

    #[test]
    fn loop_message_names_byte() {
        let t = table("start a start A\n- start x next\n- next x start\n");
        let err = check_progress(&t).unwrap_err().to_string();
        assert!(err.contains("'x'"), "{err}");
        assert!(err.contains("start -> next"), "{err}");
    }
}
