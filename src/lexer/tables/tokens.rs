// src/lexer/tables/tokens.rs

/// A tag as it appears on the wire: one ASCII character. Registered token types
/// keep only the first character of their name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(pub u8);

impl Tag {
    /// Continue the current token.
    pub const MORE: Tag = Tag(b'-');
    /// Malformed input.
    pub const BAD: Tag = Tag(b'?');
    /// Cell not applicable. Never emitted.
    pub const SKIP: Tag = Tag(b'~');
    /// Space between tokens.
    pub const GAP: Tag = Tag(b'_');
    /// Newline.
    pub const NL: Tag = Tag(b'.');

    #[inline]
    pub fn ch(self) -> char {
        self.0 as char
    }

    #[inline]
    pub fn is_more(self) -> bool {
        self == Tag::MORE
    }

    #[inline]
    pub fn is_skip(self) -> bool {
        self == Tag::SKIP
    }
}

/// Symbols accepted as one-character tags.
pub const TAG_SYMBOLS: &[u8] = b"()[]{}<>#/\\^$*'\"@=:?-";

/// Names of the reserved tags, as the registry knows them.
pub const RESERVED: &[(&str, Tag)] = &[
    ("-", Tag::MORE),
    ("?", Tag::BAD),
    ("~", Tag::SKIP),
    ("_", Tag::GAP),
    (".", Tag::NL),
];

/// A compiled table cell. The lookahead flag is only packed into the tag byte
/// when the table is written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Action {
    pub tag: Tag,
    pub lookahead: bool,
    pub target: u8,
}

pub const LOOKAHEAD_BIT: u8 = 0x80;

impl Action {
    pub const SKIP: Action = Action {
        tag: Tag::SKIP,
        lookahead: false,
        target: 0,
    };

    #[inline]
    pub fn is_skip(&self) -> bool {
        self.tag.is_skip()
    }

    /// A GAP lookahead on space that loops to its own state: "decide after
    /// the spaces".
    #[inline]
    pub fn is_gap_marker(&self, state: u8) -> bool {
        self.lookahead && self.tag == Tag::GAP && self.target == state
    }

    #[inline]
    pub fn pack(&self) -> [u8; 2] {
        let flag = if self.lookahead { LOOKAHEAD_BIT } else { 0 };
        [self.tag.0 | flag, self.target]
    }

    #[inline]
    pub fn unpack(tag: u8, target: u8) -> Self {
        Action {
            tag: Tag(tag & !LOOKAHEAD_BIT),
            lookahead: tag & LOOKAHEAD_BIT != 0,
            target,
        }
    }
}

/// Bytes the compiler reasons about: newline, space and the printable range.
pub fn alphabet() -> impl Iterator<Item = u8> {
    [b'\n', b' '].into_iter().chain(b'!'..=b'~')
}

#[inline]
pub fn in_alphabet(b: u8) -> bool {
    b == b'\n' || (b' '..=b'~').contains(&b)
}

/// Printable form of a byte for diagnostics.
pub fn show_byte<B: std::borrow::Borrow<u8>>(b: B) -> String {
    match *b.borrow() {
        b'\n' => "\\n".to_string(),
        b' ' => "\\s".to_string(),
        b if b.is_ascii_graphic() => (b as char).to_string(),
        b => format!("\\x{b:02X}"),
    }
}
