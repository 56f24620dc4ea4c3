//! Seeded sweeps over random documents:
//!  - the scanner is total: one tag per byte, no SKIP, lines start with a token
//!  - random edits through a `Session` agree with a from-scratch scan
//!
//! `LEXTAB_SEED` and `LEXTAB_CASES` override the defaults. Failing documents are
//! written to `fuzz-cases/` with a small JSON note for replay.

use std::{fs, path::Path};

use lextab::{
    config::{env_u64, env_usize},
    dev::generator::{gen_document, gen_line},
    lexer::{
        cpu::{START_STATE, scan_line, scan_text},
        session::Session,
        tables::{Table, Tag, compile},
    },
};
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Every token ends on its own line.
const LINE_LOCAL: &str = "start a..z A..Z _ id\n\
                          start if else for while key\n\
                          start 0..9 number\n\
                          start == != <= >= && || start OP\n\
                          start ( ) [ ] { } ; , start (\n\
                          start \" string\n\
                          start // line\n\
                          key a..z A..Z 0..9 _ id\n\
                          key start KEY\n\
                          id a..z A..Z 0..9 _ id\n\
                          id start ID\n\
                          number 0..9 number\n\
                          number start NUMBER\n\
                          string \" start STRING\n\
                          string \\10 start ?\n\
                          string !..~ \\32 string\n\
                          line \\10 start COMMENT\n\
                          line !..~ \\32 line\n";

/// Block comments carry state from line to line.
const CARRYING: &str = "start /* comment\n\
                        comment */ start COMMENT\n\
                        comment \\10 comment\n\
                        comment !..~ \\32 comment\n\
                        start a..z A..Z _ id\n\
                        id a..z A..Z 0..9 _ id\n\
                        FUN id ( start\n\
                        id start ID\n\
                        start 0..9 number\n\
                        number 0..9 number\n\
                        number start NUMBER\n";

fn save_case(dir: &str, tag: &str, seed: u64, doc: &[Vec<u8>]) -> String {
    let _ = fs::create_dir_all(dir);
    let path = Path::new(dir).join(format!("{tag}_seed{seed}_lines{}.txt", doc.len()));
    fs::write(&path, doc.concat()).ok();
    let meta = serde_json::json!({
        "seed": seed,
        "lines": doc.len(),
        "replay": format!("LEXTAB_SEED={seed} LEXTAB_CASES=1 cargo test --test incremental_sweep"),
    });
    if let Ok(s) = serde_json::to_string_pretty(&meta) {
        fs::write(path.with_extension("json"), s).ok();
    }
    path.display().to_string()
}

fn assert_session_matches(s: &Session<'_>, t: &Table, doc: &[Vec<u8>], seed: u64, step: usize) {
    let (all, ends) = scan_text(t, &doc.concat());
    assert_eq!(s.len(), doc.len());
    let mut off = 0;
    for (i, line) in doc.iter().enumerate() {
        let want = &all[off..off + line.len()];
        let ok = s.tags(i) == Some(want) && s.end_state(i) == Some(ends[i]);
        if !ok {
            let saved = save_case("fuzz-cases", "incremental_fail", seed, doc);
            panic!(
                "seed {seed} step {step}: line {i} differs\n  line: {:?}\n  session: {:?}\n  scratch: {:?}\n  saved: {saved}",
                String::from_utf8_lossy(line),
                s.tags(i).map(String::from_utf8_lossy),
                String::from_utf8_lossy(want),
            );
        }
        off += line.len();
    }
}

#[test]
fn scanner_is_total_on_random_lines() {
    let t = compile(LINE_LOCAL).unwrap();
    let seed = env_u64("LEXTAB_SEED", 0x1e7_7ab);
    let cases = env_usize("LEXTAB_CASES", 2000);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut tags = Vec::new();
    for case in 0..cases {
        let len = rng.random_range(0..80);
        let line = gen_line(&mut rng, len);
        let end = scan_line(&t, START_STATE, &line, &mut tags);
        assert_eq!(tags.len(), line.len(), "case {case}");
        assert!(!tags.contains(&Tag::SKIP.0), "case {case}: SKIP in {tags:?}");
        assert_ne!(tags[0], Tag::MORE.0, "case {case}: {:?}", String::from_utf8_lossy(&line));
        assert_eq!(end, START_STATE, "case {case}");
    }
}

#[test]
fn random_edits_match_full_rescan() {
    let t = compile(CARRYING).unwrap();
    let seed = env_u64("LEXTAB_SEED", 0x5e55_10);
    let cases = env_usize("LEXTAB_CASES", 200);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut doc = gen_document(&mut rng, 30, 40);
    let mut s = Session::new(&t);
    assert_eq!(s.edit(&doc, 0, 0, doc.len()), 0..doc.len());
    assert_session_matches(&s, &t, &doc, seed, 0);

    for step in 1..=cases {
        let at = rng.random_range(0..=doc.len());
        let removed = rng.random_range(0..=(doc.len() - at).min(3));
        let inserted = rng.random_range(0..=3);
        let fresh = gen_document(&mut rng, inserted, 40);
        doc.splice(at..at + removed, fresh);

        let range = s.edit(&doc, at, removed, inserted);
        assert!(range.start <= at.min(doc.len()), "step {step}: {range:?}");
        assert!(range.end <= doc.len(), "step {step}: {range:?}");
        assert_session_matches(&s, &t, &doc, seed, step);
    }
}

#[test]
fn unchanged_line_stops_after_itself() {
    let t = compile(CARRYING).unwrap();
    let mut rng = StdRng::seed_from_u64(env_u64("LEXTAB_SEED", 3));
    let doc = gen_document(&mut rng, 50, 30);
    let mut s = Session::new(&t);
    s.edit(&doc, 0, 0, doc.len());
    for at in 0..doc.len() {
        let range = s.edit(&doc, at, 1, 1);
        assert_eq!(range, at..at + 1, "line {at}");
    }
}
