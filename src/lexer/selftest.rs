// src/lexer/selftest.rs
// Fixed battery of small languages with known tables and scans. The compiler
// runs it before trusting itself with a real rules file.

use anyhow::{Context, Result, bail, ensure};

use crate::lexer::{
    cpu::{START_STATE, Step, scan_line_traced},
    tables::{Action, CompileError, Table, compile, tokens::show_byte},
};

struct Example {
    name: &'static str,
    rules: &'static str,
    /// (state, pattern, expected action written as `[~]tag target`)
    actions: &'static [(&'static str, &'static str, &'static str)],
    /// (line, expected tags)
    scans: &'static [(&'static str, &'static str)],
}

const EXAMPLES: &[Example] = &[
    Example {
        name: "operators",
        rules: "start == != start OP\n",
        actions: &[
            ("start", "==", "O start"),
            ("start", "=", "? start"),
            ("start", " ", "_ start"),
            ("start", "\n", ". start"),
        ],
        scans: &[("==\n", "O-."), ("!=\n", "O-."), ("= ==\n", "?_O-.")],
    },
    Example {
        name: "numbers",
        rules: "start 0..9 number\n\
                number 0..9 start VALUE\n",
        actions: &[
            ("start", "7", "- number"),
            ("number", "7", "V start"),
            ("number", "x", "~? start"),
            ("number", " ", "~? start"),
        ],
        scans: &[("42 \n", "V-_."), ("4x\n", "??.")],
    },
    Example {
        name: "keywords",
        rules: "start a..z A..Z id\n\
                start if else for while key\n\
                key a..z A..Z 0..9 id\n\
                key start KEY\n\
                id a..z A..Z 0..9 id\n\
                id start ID\n",
        actions: &[
            ("start", "f", "- id"),
            ("start", "for", "- key"),
            ("key", "m", "- id"),
            ("key", ";", "~K start"),
            ("key", " ", "~K start"),
            ("id", "\n", "~I start"),
        ],
        scans: &[
            ("for \n", "K--_."),
            ("format\n", "I-----."),
            ("if(\n", "K-?."),
        ],
    },
    Example {
        name: "jumps",
        rules: "start a start ID\n\
                - start . start2\n\
                start2 . start2 DOT\n\
                start2 start\n",
        actions: &[
            ("start", ".", "~- start2"),
            ("start2", ".", "D start2"),
            ("start2", "x", "~- start"),
        ],
        scans: &[(".a\n", "DI.")],
    },
    Example {
        name: "includes",
        rules: "start #include inclusion KEY\n\
                inclusion < filename\n\
                inclusion start\n\
                filename > start QUOTED\n\
                filename !..~ filename\n\
                filename start ?\n",
        actions: &[
            ("start", "#include", "K inclusion"),
            ("inclusion", "<", "- filename"),
            ("inclusion", "!", "~- start"),
            ("inclusion", "\n", ". inclusion"),
            ("inclusion", " ", "_ inclusion"),
        ],
        scans: &[("#include <a.h>\n", "K-------_Q----.")],
    },
    Example {
        name: "two starts",
        rules: "start # hash KEY\n\
                hash include start RESERVED\n\
                html <% java <\n\
                java %> html >\n",
        actions: &[
            ("start", "#", "K hash"),
            ("hash", "include", "R start"),
            ("hash", "x", "? hash"),
            ("hash", "\n", ". hash"),
            ("hash", " ", "_ hash"),
            ("html", "<%", "< java"),
            ("html", "x", "? html"),
            ("java", "%>", "> html"),
            ("java", "x", "? java"),
        ],
        scans: &[("#include\n", "KR------.")],
    },
    Example {
        name: "properties",
        rules: "start . dot\n\
                dot 0..9 start NUM\n\
                SIGN dot a..z A..Z prop\n\
                prop a..z A..Z prop2\n\
                prop start\n\
                prop2 a..z A..Z 0..9 prop2\n\
                prop2 start PROPERTY\n",
        actions: &[
            ("dot", "0", "N start"),
            ("dot", "x", "~S prop"),
            ("prop", "x", "- prop2"),
            ("prop2", "x", "- prop2"),
            ("prop2", ";", "~P start"),
        ],
        scans: &[(".x1 \n", "SP-_."), (".5\n", "N-.")],
    },
    Example {
        name: "gap marker",
        rules: "start a..z id\n\
                id a..z id\n\
                FUN id ( start\n\
                id start ID\n",
        actions: &[
            ("id", " ", "~_ id"),
            ("id", "\n", "~I start"),
            ("id", "(", "~F start"),
        ],
        scans: &[("f (\n", "F_?."), ("f x\n", "I_I."), ("f\n", "I.")],
    },
];

/// Rule sets that must be refused, and how.
const FAILURES: &[(&str, &str, fn(&CompileError) -> bool)] = &[
    (
        "starting and continuing",
        "start . dot\n\
         dot 0..9 start NUM\n\
         SIGN dot a..z A..Z prop\n\
         prop a..z A..Z 0..9 prop\n\
         prop start PROPERTY\n",
        |e| matches!(e, CompileError::Conflict { .. }),
    ),
    (
        "continuing lookahead keeps token",
        "start a id\n\
         - id ( id2\n\
         id2 a id2\n\
         id2 start ID\n",
        |e| matches!(e, CompileError::Consistency { .. }),
    ),
    (
        "starting lookahead ends token",
        "DOT start . start2\n\
         start2 start\n",
        |e| matches!(e, CompileError::Conflict { .. }),
    ),
    (
        "undefined state",
        "start . dot\n\
         dot 0..9 number\n",
        |e| matches!(e, CompileError::Syntax { .. }),
    ),
    (
        "mutual jumps",
        "start start2\n\
         start2 start\n",
        |e| matches!(e, CompileError::Loop { .. }),
    ),
];

/// `[~]tag target`, the notation the battery is written in.
pub fn describe(t: &Table, a: &Action) -> String {
    let target = t
        .states()
        .get(a.target as usize)
        .map(String::as_str)
        .unwrap_or("?");
    format!(
        "{}{} {target}",
        if a.lookahead { "~" } else { "" },
        a.tag.ch()
    )
}

/// One scanner step as `state@at pattern -> [~]tag target`.
pub fn describe_step(t: &Table, s: &Step) -> String {
    let state = t.states().get(s.state as usize).map(String::as_str).unwrap_or("?");
    let pattern = match s.pattern {
        Some(i) => t.patterns()[i].iter().map(show_byte).collect::<String>(),
        None => "(none)".to_string(),
    };
    format!("{state}@{} {pattern} -> {}", s.at, describe(t, &s.action))
}

fn scan_string(t: &Table, line: &str, trace: impl FnMut(&Step)) -> String {
    let mut tags = Vec::new();
    scan_line_traced(t, START_STATE, line.as_bytes(), &mut tags, trace);
    String::from_utf8_lossy(&tags).into_owned()
}

/// Run the whole battery; returns the number of checks made.
pub fn run() -> Result<usize> {
    let mut checks = 0;
    for ex in EXAMPLES {
        let t = compile(ex.rules).with_context(|| format!("self-test {:?}", ex.name))?;
        for &(state, pattern, want) in ex.actions {
            let got = t
                .lookup(state, pattern.as_bytes())
                .map(|a| describe(&t, &a))
                .with_context(|| format!("self-test {:?}: no cell {state} {pattern:?}", ex.name))?;
            ensure!(
                got == want,
                "self-test {:?}: {state} {pattern:?} is {got:?}, expected {want:?}",
                ex.name
            );
            checks += 1;
        }
        for &(line, want) in ex.scans {
            let got = scan_string(&t, line, |_| {});
            ensure!(
                got == want,
                "self-test {:?}: {line:?} scans as {got:?}, expected {want:?}",
                ex.name
            );
            checks += 1;
        }
    }
    for &(name, rules, expected) in FAILURES {
        match compile(rules) {
            Ok(_) => bail!("self-test {name:?}: compiled but should have failed"),
            Err(e) if expected(&e) => checks += 1,
            Err(e) => bail!("self-test {name:?}: failed with the wrong error: {e}"),
        }
    }
    log::debug!("[selftest] {checks} checks passed");
    Ok(checks)
}

/// Keep a line of a tests file unless it is blank or starts with two symbols.
fn is_test_line(line: &str) -> bool {
    let b = line.as_bytes();
    !b.is_empty() && b.iter().take(2).any(u8::is_ascii_alphanumeric)
}

/// Run a tests file: pairs of lines, the input then its expected tags
/// (including the tag of the newline). Each input is scanned from the start
/// state. Returns the number of tests passed.
pub fn run_scan_tests(t: &Table, text: &str, mut trace: impl FnMut(&Step)) -> Result<usize> {
    let lines: Vec<&str> = text.lines().filter(|l| is_test_line(l)).collect();
    let mut passed = 0;
    for pair in lines.chunks(2) {
        let [input, expected] = pair else {
            bail!("test input {:?} has no expected line", pair[0]);
        };
        let line = format!("{input}\n");
        let actual = scan_string(t, &line, &mut trace);
        if actual != *expected {
            bail!("scan test failed:\n{input}\n{expected} (expected)\n{actual} (actual)");
        }
        passed += 1;
    }
    Ok(passed)
}
