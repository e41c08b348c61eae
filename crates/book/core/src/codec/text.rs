//! YaneuraOu `DB2016` text book codec.
//!
//! ```text
//! #YANEURAOU-DB2016 1.00
//! sfen lnsgkgsnl/1r5b1/ppppppppp/9/9/9/PPPPPPPPP/1B5R1/LNSGKGSNL b - 1
//! #position comment
//! 7g7f none 0 32 1 #move comment
//! 2g2f 8c8d 63 27
//! ```
//! Positions are sorted by key. Each move line holds usi, ponder, score,
//! depth and count; `none` marks an absent ponder/score/depth and an empty
//! field an absent count.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::book::{BookEntry, BookMove, EntryKind};
use crate::error::FormatError;

pub const HEADER: &str = "#YANEURAOU-DB2016 1.00";

const POSITION_PREFIX: &str = "sfen ";
const BOM: char = '\u{feff}';
const SENTINEL_PLY: &str = "1";

/// Canonical key and ply of a SFEN.
///
/// Accepts an optional `sfen ` prefix. The key keeps board, turn and hands
/// and replaces the ply with `1`; a missing or unparsable ply reads as 1.
pub fn normalize_sfen(sfen: &str) -> Option<(String, u32)> {
    let text = sfen.trim();
    let text = text.strip_prefix(POSITION_PREFIX).unwrap_or(text);
    let mut fields = text.split_whitespace();
    let board = fields.next()?;
    let turn = fields.next()?;
    let hands = fields.next()?;
    let ply = fields.next().and_then(|ply| ply.parse().ok()).unwrap_or(1);
    Some((format!("{board} {turn} {hands} {SENTINEL_PLY}"), ply))
}

#[inline]
pub fn is_position_line(line: &str) -> bool {
    line.starts_with(POSITION_PREFIX)
}

/// Key and ply of a `sfen ...` line.
pub fn parse_position_line(line: &str) -> Option<(String, u32)> {
    if !is_position_line(line) {
        return None;
    }
    normalize_sfen(line)
}

/// Matches `[1-9][a-i][1-9][a-i]\+? ` or `[RBGSNLP]\*[1-9][a-i] ` at line start.
pub fn is_move_line(line: &str) -> bool {
    let b = line.as_bytes();
    let file = |c: u8| (b'1'..=b'9').contains(&c);
    let rank = |c: u8| (b'a'..=b'i').contains(&c);
    if b.len() < 5 {
        return false;
    }
    if file(b[0]) && rank(b[1]) && file(b[2]) && rank(b[3]) {
        return match b[4] {
            b' ' => true,
            b'+' => b.get(5) == Some(&b' '),
            _ => false,
        };
    }
    b"RBGSNLP".contains(&b[0]) && b[1] == b'*' && file(b[2]) && rank(b[3]) && b[4] == b' '
}

fn parse_optional(field: Option<&str>) -> Option<i32> {
    let field = field?;
    if field.is_empty() || field == "none" {
        return None;
    }
    field
        .parse::<i32>()
        .ok()
        .or_else(|| field.parse::<f64>().ok().map(|v| v.round() as i32))
}

fn strip_comment_marker(text: &str) -> &str {
    text.strip_prefix('#')
        .or_else(|| text.strip_prefix("//"))
        .unwrap_or(text)
}

fn append_line(target: &mut String, line: &str) {
    if !target.is_empty() {
        target.push('\n');
    }
    target.push_str(line);
}

fn parse_move_line(line: &str) -> BookMove {
    let mut columns = line.splitn(6, ' ');
    let usi = columns.next().unwrap_or_default().to_string();
    let usi2 = columns
        .next()
        .filter(|ponder| !ponder.is_empty() && *ponder != "none")
        .map(str::to_string);
    let score = parse_optional(columns.next());
    let depth = parse_optional(columns.next());
    let count = columns
        .next()
        .filter(|count| !count.is_empty())
        .and_then(|count| count.parse().ok());
    let comment = columns.next().map(strip_comment_marker).unwrap_or_default();
    BookMove {
        usi,
        usi2,
        score,
        depth,
        count,
        comment: comment.to_string(),
    }
}

/// Incremental line decoder.
///
/// Feed lines with [`push_line`](Self::push_line); an entry is yielded once
/// the next position line (or [`finish`](Self::finish)) closes it.
#[derive(Debug)]
pub struct TextDecoder {
    expect_header: bool,
    line_no: usize,
    current: Option<(String, BookEntry)>,
}

impl TextDecoder {
    /// Decoder for a whole file, starting with the header line.
    pub fn new() -> Self {
        Self {
            expect_header: true,
            line_no: 0,
            current: None,
        }
    }

    /// Decoder for a fragment that starts at a position line.
    pub fn fragment() -> Self {
        Self {
            expect_header: false,
            line_no: 0,
            current: None,
        }
    }

    pub fn push_line(&mut self, line: &str) -> Result<Option<(String, BookEntry)>, FormatError> {
        self.line_no += 1;
        let line = line.strip_suffix('\r').unwrap_or(line);

        if self.expect_header {
            self.expect_header = false;
            let line = line.strip_prefix(BOM).unwrap_or(line);
            if line != HEADER {
                return Err(FormatError::BadHeader(line.to_string()));
            }
            return Ok(None);
        }

        if let Some((key, ply)) = parse_position_line(line) {
            let finished = self.current.take();
            self.current = Some((key, BookEntry::new(ply, EntryKind::Normal)));
            return Ok(finished);
        }
        if is_position_line(line) {
            return Err(FormatError::BadPositionLine(line.to_string()));
        }

        let Some((_, entry)) = self.current.as_mut() else {
            return Ok(None);
        };
        if line.is_empty() {
            return Ok(None);
        }
        if is_move_line(line) {
            let mv = parse_move_line(line);
            // A repeated usi replaces the earlier line in place.
            entry.upsert_move(mv);
            return Ok(None);
        }

        let text = strip_comment_marker(line);
        match entry.moves.last_mut() {
            Some(last) => append_line(&mut last.comment, text),
            None => append_line(&mut entry.comment, text),
        }
        Ok(None)
    }

    /// Like [`push_line`](Self::push_line) for raw bytes.
    pub fn push_bytes(&mut self, line: &[u8]) -> Result<Option<(String, BookEntry)>, FormatError> {
        let line = line.strip_suffix(b"\n").unwrap_or(line);
        let text = std::str::from_utf8(line).map_err(|_| FormatError::BadEncoding {
            line: self.line_no + 1,
        })?;
        self.push_line(text)
    }

    /// Closes the entry in progress.
    pub fn finish(self) -> Option<(String, BookEntry)> {
        self.current
    }

    /// Whether the header line has yet to be seen.
    pub fn header_pending(&self) -> bool {
        self.expect_header
    }
}

impl Default for TextDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decodes a whole text book.
pub fn decode(bytes: &[u8]) -> Result<BTreeMap<String, BookEntry>, FormatError> {
    let mut decoder = TextDecoder::new();
    let mut entries = BTreeMap::new();
    for line in bytes.split(|b| *b == b'\n') {
        if let Some((key, entry)) = decoder.push_bytes(line)? {
            entries.insert(key, entry);
        }
    }
    if decoder.header_pending() {
        return Err(FormatError::BadHeader(String::new()));
    }
    if let Some((key, entry)) = decoder.finish() {
        entries.insert(key, entry);
    }
    Ok(entries)
}

pub fn encode_header(out: &mut String) {
    out.push_str(HEADER);
    out.push('\n');
}

/// Appends one position and its moves.
pub fn encode_entry(key: &str, entry: &BookEntry, out: &mut String) {
    let sfen = key
        .strip_suffix(SENTINEL_PLY)
        .map(str::trim_end)
        .unwrap_or(key);
    let _ = writeln!(out, "{POSITION_PREFIX}{sfen} {}", entry.min_ply);

    if !entry.comment.is_empty() {
        for line in entry.comment.split('\n') {
            let _ = writeln!(out, "#{line}");
        }
    }

    for mv in &entry.moves {
        let _ = write!(out, "{} {} ", mv.usi, mv.usi2.as_deref().unwrap_or("none"));
        match mv.score {
            Some(score) => {
                let _ = write!(out, "{score} ");
            }
            None => out.push_str("none "),
        }
        match mv.depth {
            Some(depth) => {
                let _ = write!(out, "{depth} ");
            }
            None => out.push_str("none "),
        }
        if let Some(count) = mv.count {
            let _ = write!(out, "{count}");
        }
        if mv.comment.is_empty() {
            out.push('\n');
            continue;
        }
        let mut lines = mv.comment.split('\n');
        let _ = writeln!(out, " #{}", lines.next().unwrap_or_default());
        for line in lines {
            let _ = writeln!(out, "#{line}");
        }
    }
}

/// Encodes a whole text book, skipping entries without moves.
pub fn encode(entries: &BTreeMap<String, BookEntry>) -> String {
    let mut out = String::new();
    encode_header(&mut out);
    for (key, entry) in entries {
        if !entry.is_empty() {
            encode_entry(key, entry, &mut out);
        }
    }
    out
}
