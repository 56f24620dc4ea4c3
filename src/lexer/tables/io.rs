// src/lexer/tables/io.rs
use std::{
    io::{BufWriter, Write},
    path::Path,
    time::Instant,
};

use serde::{Deserialize, Serialize};

use super::{
    Table,
    error::TableError,
    tokens::{Action, LOOKAHEAD_BIT, Tag},
};

// -------------------- Binary layout --------------------
//
//   name\0 ... name\0 \0
//   pattern\0 ... pattern\0 \0
//   [tag, target] x patterns, one row per state

pub fn serialize(t: &Table) -> Vec<u8> {
    let names: usize = t.states().iter().map(|s| s.len() + 1).sum();
    let pats: usize = t.patterns().iter().map(|p| p.len() + 1).sum();
    let cells = t.state_count() * t.pattern_count() * 2;
    let mut out = Vec::with_capacity(names + pats + 2 + cells);

    for s in t.states() {
        out.extend_from_slice(s.as_bytes());
        out.push(0);
    }
    out.push(0);
    for p in t.patterns() {
        out.extend_from_slice(p);
        out.push(0);
    }
    out.push(0);
    for s in 0..t.state_count() {
        for a in t.row(s) {
            out.extend_from_slice(&a.pack());
        }
    }
    out
}

pub fn deserialize(mut data: &[u8]) -> Result<Table, TableError> {
    // NUL-terminated strings up to an empty one.
    let read_strings = |buf: &mut &[u8]| -> Result<Vec<Vec<u8>>, TableError> {
        let mut out = Vec::new();
        loop {
            let end = buf
                .iter()
                .position(|&b| b == 0)
                .ok_or(TableError::Truncated("unterminated string list"))?;
            let s = buf[..end].to_vec();
            *buf = &buf[end + 1..];
            if s.is_empty() {
                return Ok(out);
            }
            out.push(s);
        }
    };

    let names = read_strings(&mut data)?;
    let patterns = read_strings(&mut data)?;
    let states = names
        .into_iter()
        .map(|n| {
            String::from_utf8(n).map_err(|_| TableError::Malformed("state name is not text".into()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let want = states.len() * patterns.len() * 2;
    if data.len() < want {
        return Err(TableError::Truncated("action cells"));
    }
    if data.len() > want {
        return Err(TableError::Malformed(format!(
            "{} trailing bytes after action cells",
            data.len() - want
        )));
    }

    let mut actions = Vec::with_capacity(want / 2);
    for cell in data.chunks_exact(2) {
        let tag = cell[0] & !LOOKAHEAD_BIT;
        if !tag.is_ascii_graphic() {
            return Err(TableError::Malformed(format!("bad tag byte 0x{:02X}", cell[0])));
        }
        actions.push(Action::unpack(cell[0], cell[1]));
    }
    Table::new(states, patterns, actions)
}

pub fn save_table_bin(path: &Path, t: &Table) -> Result<(), TableError> {
    let instant = Instant::now();
    let bytes = serialize(t);
    let f = std::fs::File::create(path)?;
    let mut w = BufWriter::new(f);
    w.write_all(&bytes)?;
    w.flush()?;
    log::debug!(
        "[tables] saved {} bytes to {} in {} us",
        bytes.len(),
        path.display(),
        instant.elapsed().as_micros()
    );
    Ok(())
}

pub fn load_table_bin(path: &Path) -> Result<Table, TableError> {
    let data = std::fs::read(path)?;
    deserialize(&data)
}

// -------------------- JSON (debug dump) --------------------

#[derive(Serialize, Deserialize)]
struct CellDisk {
    tag: char,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    lookahead: bool,
    target: u8,
}

#[derive(Serialize, Deserialize)]
struct TableDisk {
    states: Vec<String>,
    patterns: Vec<String>,
    rows: Vec<Vec<CellDisk>>,
}

impl From<&Table> for TableDisk {
    fn from(t: &Table) -> Self {
        Self {
            states: t.states().to_vec(),
            patterns: t
                .patterns()
                .iter()
                .map(|p| String::from_utf8_lossy(p).into_owned())
                .collect(),
            rows: (0..t.state_count())
                .map(|s| {
                    t.row(s)
                        .iter()
                        .map(|a| CellDisk {
                            tag: a.tag.ch(),
                            lookahead: a.lookahead,
                            target: a.target,
                        })
                        .collect()
                })
                .collect(),
        }
    }
}

impl TableDisk {
    fn into_table(self) -> Result<Table, TableError> {
        let mut actions = Vec::new();
        for cell in self.rows.into_iter().flatten() {
            if !cell.tag.is_ascii_graphic() {
                return Err(TableError::Malformed(format!("bad tag {:?}", cell.tag)));
            }
            actions.push(Action {
                tag: Tag(cell.tag as u8),
                lookahead: cell.lookahead,
                target: cell.target,
            });
        }
        let patterns = self.patterns.into_iter().map(String::into_bytes).collect();
        Table::new(self.states, patterns, actions)
    }
}

pub fn save_table_json(path: &Path, t: &Table) -> Result<(), TableError> {
    let f = std::fs::File::create(path)?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut w, &TableDisk::from(t))?;
    w.flush()?;
    Ok(())
}

pub fn load_table_json_bytes(data: &[u8]) -> Result<Table, TableError> {
    serde_json::from_slice::<TableDisk>(data)?.into_table()
}
