//! Negative compiler tests: rule sets that must be refused (compile returns Err)
//! and damaged table files that must not load.

use lextab::lexer::tables::{CompileError, TableError, compile, deserialize, serialize};

fn syntax(rules: &str) -> (usize, String) {
    match compile(rules) {
        Err(CompileError::Syntax { row, message }) => (row, message),
        other => panic!("expected a syntax error for {rules:?}, got {other:?}"),
    }
}

#[test]
fn empty_file() {
    assert_eq!(syntax("").0, 0);
    assert!(syntax("just some prose\n\n").1.contains("no rules"));
}

#[test]
fn illegal_bytes() {
    let (row, msg) = syntax("start x start X\nstart \u{1} start Y\n");
    assert_eq!(row, 2);
    assert!(msg.contains("illegal character"), "{msg}");
    assert!(syntax("start x start X\rstart y start Y\n").1.contains("illegal"));
}

#[test]
fn short_and_misshapen_rules() {
    assert!(syntax("start X\n").1.contains("too short"));
    assert!(syntax("FUN start x start X\n").1.contains("two tags"));
    assert!(syntax("start x Start X\n").1.contains("bad state name"));
}

#[test]
fn bad_tags() {
    assert!(syntax("start x start +\n").1.contains("bad token type"));
    assert!(syntax("start x id\nid y start Id\nid start ID\n")
        .1
        .contains("disagree"));
    // BAD is reserved under `?`.
    assert!(syntax("start x start ?x\n").1.contains("bad token type"));
    assert!(syntax("start x start ID\nstart y start IDENT\n")
        .1
        .contains("disagree in first letter"));
}

#[test]
fn bad_patterns() {
    assert!(syntax("start z..a start X\n").1.contains("bad range"));
    assert!(syntax("start \\7 start X\n").1.contains("bad character code"));
    assert!(syntax("start a\\10 start X\n").1.contains("newline"));
    let long = "x".repeat(128);
    assert!(syntax(&format!("start {long} start X\n")).1.contains("too long"));
}

#[test]
fn state_without_rules() {
    let (row, msg) = syntax("start x start X\nstart . dot\ndot 0..9 number\n");
    assert_eq!(row, 3);
    assert!(msg.contains("number"), "{msg}");
}

#[test]
fn consistency_errors() {
    let lookahead = compile("start a id\n- id ( id2\nid2 a id2\nid2 start ID\n");
    assert!(matches!(lookahead, Err(CompileError::Consistency { row: 2, .. })));

    let jump = compile("start a id\nid start\n");
    assert!(matches!(jump, Err(CompileError::Consistency { row: 2, .. })));

    let dead = compile("start start2\nstart x start X\nstart2 y start Y\n");
    assert!(matches!(dead, Err(CompileError::Consistency { row: 2, .. })));
}

#[test]
fn conflicts() {
    let err = compile("DOT start . start2\nstart2 start\n").unwrap_err();
    assert!(matches!(err, CompileError::Conflict { .. }), "{err:?}");
    let msg = err.to_string();
    assert!(msg.contains("start"), "{msg}");
}

#[test]
fn too_many_states() {
    let mut rules = String::from("start a s0\n");
    for i in 0..130 {
        rules.push_str(&format!("s{i} a s{}\n", i + 1));
    }
    rules.push_str("s130 start X\n");
    match compile(&rules) {
        Err(CompileError::Capacity { what, found, limit }) => {
            assert_eq!(what, "states");
            assert_eq!(limit, 128);
            assert!(found > limit);
        }
        other => panic!("expected capacity error, got {other:?}"),
    }
}

#[test]
fn mutual_jumps_loop() {
    let err = compile("start start2\nstart2 start\n").unwrap_err();
    match &err {
        CompileError::Loop { byte, states } => {
            assert_eq!(*byte, b'!');
            assert_eq!(states.first(), states.last());
        }
        other => panic!("expected loop, got {other:?}"),
    }
    assert!(err.to_string().contains("start -> start2 -> start"), "{err}");
}

#[test]
fn damaged_tables_do_not_load() {
    let t = compile("start a..z id\nid a..z id\nid start ID\n").unwrap();
    let bytes = serialize(&t);

    assert!(matches!(deserialize(&[]), Err(TableError::Truncated(_))));
    assert!(matches!(
        deserialize(&bytes[..bytes.len() / 2]),
        Err(TableError::Truncated(_))
    ));

    let mut bad_tag = bytes.clone();
    let first_cell = bytes.len() - t.state_count() * t.pattern_count() * 2;
    bad_tag[first_cell] = 0x01;
    assert!(matches!(deserialize(&bad_tag), Err(TableError::Malformed(_))));

    // No states at all.
    assert!(matches!(deserialize(b"\0\0"), Err(TableError::Malformed(_))));
}
