// src/dev/generator.rs
// Random documents for sweeps: C-like words, numbers and operators, with
// comment openers and closers so states carry across lines, plus the odd tab,
// control byte and UTF-8 sequence the scanner has to tolerate.

use rand::Rng;

/// One line of roughly `target_len` bytes, newline included.
pub fn gen_line<R: Rng>(rng: &mut R, target_len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(target_len + 8);
    while out.len() < target_len {
        let roll = rng.random_range(0u32..100);
        match roll {
            0..=29 => push_word(rng, &mut out),          // ~30%
            30..=44 => push_number(rng, &mut out),       // ~15%
            45..=64 => push_space(rng, &mut out),        // ~20%
            65..=71 => push_comment_mark(rng, &mut out), // ~7%
            72..=95 => push_operator(rng, &mut out),     // ~24%
            96..=97 => out.extend_from_slice("é".as_bytes()),
            98..=99 => out.push(rng.random_range(1u8..8)),
            _ => unreachable!(),
        }
    }
    out.push(b'\n');
    out
}

/// `lines` lines of up to `max_len` bytes each.
pub fn gen_document<R: Rng>(rng: &mut R, lines: usize, max_len: usize) -> Vec<Vec<u8>> {
    (0..lines)
        .map(|_| {
            let len = rng.random_range(0..=max_len);
            gen_line(rng, len)
        })
        .collect()
}

fn push_word<R: Rng>(rng: &mut R, out: &mut Vec<u8>) {
    const KEYWORDS: [&str; 6] = ["for", "if", "else", "while", "include", "format"];
    if rng.random_bool(0.2) {
        let i = rng.random_range(0..KEYWORDS.len());
        out.extend_from_slice(KEYWORDS[i].as_bytes());
        return;
    }
    let len = rng.random_range(1..=10);
    out.push(random_alpha(rng));
    for _ in 1..len {
        if rng.random_bool(0.7) {
            out.push(random_alpha(rng));
        } else {
            out.push(random_digit(rng));
        }
    }
}

fn push_number<R: Rng>(rng: &mut R, out: &mut Vec<u8>) {
    let len = rng.random_range(1..=6);
    for _ in 0..len {
        out.push(random_digit(rng));
    }
    if rng.random_bool(0.1) {
        out.push(b'.');
        out.push(random_digit(rng));
    }
}

fn push_space<R: Rng>(rng: &mut R, out: &mut Vec<u8>) {
    let opts = [b' ', b' ', b' ', b'\t'];
    let len = rng.random_range(1..=3);
    for _ in 0..len {
        out.push(opts[rng.random_range(0..opts.len())]);
    }
}

fn push_comment_mark<R: Rng>(rng: &mut R, out: &mut Vec<u8>) {
    let marks = ["/*", "*/", "//", "\"", "#"];
    out.extend_from_slice(marks[rng.random_range(0..marks.len())].as_bytes());
}

fn push_operator<R: Rng>(rng: &mut R, out: &mut Vec<u8>) {
    let ops = [
        "(", ")", "+", "-", "*", "/", "=", "==", "!=", "<", "<=", ">", ">=", "<%", "%>", "[",
        "]", "{", "}", ";", ",", ".", "&&", "||", "!", "~", "\\",
    ];
    out.extend_from_slice(ops[rng.random_range(0..ops.len())].as_bytes());
    if rng.random_bool(0.25) {
        out.push(b' ');
    }
}

fn random_alpha<R: Rng>(rng: &mut R) -> u8 {
    let set = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_";
    set[rng.random_range(0..set.len())]
}

fn random_digit<R: Rng>(rng: &mut R) -> u8 {
    rng.random_range(b'0'..=b'9')
}
