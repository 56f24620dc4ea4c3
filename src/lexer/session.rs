// src/lexer/session.rs
use std::ops::Range;

use crate::lexer::{
    cpu::{START_STATE, scan_line},
    tables::Table,
};

#[derive(Debug, Clone)]
struct LineScan {
    tags: Vec<u8>,
    /// End state from the last scan. An inserted line carries the state its
    /// block used to end in, so an edit that changes nothing stops early.
    end: Option<u8>,
    dirty: bool,
}

impl LineScan {
    fn dirty() -> Self {
        LineScan {
            tags: Vec::new(),
            end: None,
            dirty: true,
        }
    }

    #[inline]
    fn stale(&self) -> bool {
        self.dirty || self.end.is_none()
    }
}

/// Per-document scan cache: the tags and end state of every line. Edits only
/// rescan from the edited line until an end state comes out unchanged.
#[derive(Debug, Clone)]
pub struct Session<'t> {
    table: &'t Table,
    lines: Vec<LineScan>,
}

impl<'t> Session<'t> {
    pub fn new(table: &'t Table) -> Self {
        Self {
            table,
            lines: Vec::new(),
        }
    }

    pub fn table(&self) -> &'t Table {
        self.table
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn tags(&self, line: usize) -> Option<&[u8]> {
        let l = self.lines.get(line)?;
        (!l.stale()).then_some(l.tags.as_slice())
    }

    pub fn end_state(&self, line: usize) -> Option<u8> {
        self.lines.get(line)?.end
    }

    /// Lines `at..at + removed` were replaced by `inserted` new ones; `text` is
    /// the document after the edit. Returns the lines that were rescanned.
    pub fn edit<L: AsRef<[u8]>>(
        &mut self,
        text: &[L],
        at: usize,
        removed: usize,
        inserted: usize,
    ) -> Range<usize> {
        let at = at.min(self.lines.len());
        let removed = removed.min(self.lines.len() - at);
        // State the line after the edited block used to start in.
        let boundary = match (removed, at) {
            (0, 0) => Some(START_STATE),
            (0, at) => self.lines[at - 1].end,
            (n, at) => self.lines[at + n - 1].end,
        };
        self.lines.splice(
            at..at + removed,
            std::iter::repeat_with(LineScan::dirty).take(inserted),
        );
        if inserted > 0 {
            self.lines[at + inserted - 1].end = boundary;
        } else if let Some(next) = self.lines.get_mut(at) {
            next.dirty = true;
        }
        // Keep the cache the same length as the document even if the caller's
        // counts were off.
        self.lines.resize_with(text.len(), LineScan::dirty);
        self.refresh(text, at)
    }

    /// Rescan from `from`, cascading while end states change or lines have
    /// never been scanned.
    pub fn refresh<L: AsRef<[u8]>>(&mut self, text: &[L], from: usize) -> Range<usize> {
        self.lines.resize_with(text.len(), LineScan::dirty);
        if let Some(l) = self.lines.get_mut(from) {
            l.dirty = true;
        }
        // Never start past a line that still needs scanning.
        let from = self
            .lines
            .iter()
            .take(from)
            .position(LineScan::stale)
            .unwrap_or(from);
        let mut state = match from {
            0 => START_STATE,
            n => self.lines[n - 1].end.unwrap_or(START_STATE),
        };

        let mut i = from;
        while i < text.len() {
            let line = &mut self.lines[i];
            let old = line.end;
            state = scan_line(self.table, state, text[i].as_ref(), &mut line.tags);
            line.end = Some(state);
            line.dirty = false;
            i += 1;
            let next_fresh = self.lines.get(i).is_some_and(|l| !l.stale());
            if old == Some(state) && next_fresh {
                break;
            }
        }
        log::trace!("[session] rescanned lines {from}..{i}");
        from..i
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{cpu::scan_text, tables::compile};

    const RULES: &str = "start /* comment\n\
                         comment */ start NOTE\n\
                         comment \\10 comment\n\
                         comment !..~ \\32 comment\n\
                         start a..z id\n\
                         id a..z id\n\
                         id start ID\n";

    fn assert_matches_full_scan(s: &Session<'_>, doc: &[&str]) {
        let text: String = doc.concat();
        let (all, ends) = scan_text(s.table(), text.as_bytes());
        let mut off = 0;
        for (i, line) in doc.iter().enumerate() {
            let tags = s.tags(i).expect("line scanned");
            assert_eq!(tags, &all[off..off + line.len()], "line {i}");
            assert_eq!(s.end_state(i), Some(ends[i]), "line {i}");
            off += line.len();
        }
    }

    #[test]
    fn initial_scan_covers_everything() {
        let t = compile(RULES).unwrap();
        let doc = ["ab\n", "cd\n", "ef\n"];
        let mut s = Session::new(&t);
        assert_eq!(s.edit(&doc, 0, 0, 3), 0..3);
        assert_matches_full_scan(&s, &doc);
    }

    #[test]
    fn unchanged_end_state_stops_cascade() {
        let t = compile(RULES).unwrap();
        let mut doc = vec!["ab\n", "cd\n", "ef\n", "gh\n"];
        let mut s = Session::new(&t);
        s.edit(&doc, 0, 0, 4);
        doc[1] = "xyz\n";
        assert_eq!(s.edit(&doc, 1, 1, 1), 1..2);
        assert_matches_full_scan(&s, &doc);
    }

    #[test]
    fn opening_comment_cascades_to_the_end() {
        let t = compile(RULES).unwrap();
        let mut doc = vec!["ab\n", "cd\n", "ef\n", "gh\n"];
        let mut s = Session::new(&t);
        s.edit(&doc, 0, 0, 4);
        doc[1] = "/* cd\n";
        assert_eq!(s.edit(&doc, 1, 1, 1), 1..4);
        assert_matches_full_scan(&s, &doc);

        // Closing it again only needs the lines up to where the states agree.
        doc[2] = "*/ ef\n";
        assert_eq!(s.edit(&doc, 2, 1, 1), 2..4);
        assert_matches_full_scan(&s, &doc);
    }

    #[test]
    fn inserted_and_removed_lines() {
        let t = compile(RULES).unwrap();
        let mut doc = vec!["ab\n", "cd\n"];
        let mut s = Session::new(&t);
        s.edit(&doc, 0, 0, 2);
        doc.insert(1, "new\n");
        doc.insert(1, "lines\n");
        let range = s.edit(&doc, 1, 0, 2);
        assert_eq!(range.start, 1);
        assert!(range.end >= 3);
        assert_matches_full_scan(&s, &doc);

        doc.drain(0..2);
        s.edit(&doc, 0, 2, 0);
        assert_eq!(s.len(), doc.len());
        assert_matches_full_scan(&s, &doc);
    }
}
