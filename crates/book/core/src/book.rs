//! Book data model: moves, entries, keys and the format-tagged book map.

use std::collections::BTreeMap;
use std::path::Path;

use crate::codec::text;
use crate::error::PositionError;
use crate::hash::PositionHasher;
use crate::shogi::Position;

/// On-disk book format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BookFormat {
    /// YaneuraOu `DB2016` line-oriented text (`.db`).
    Text,
    /// Apery 16-byte records (conventionally `.bin`).
    Binary,
}

impl BookFormat {
    /// Infers the format from a file extension: `.db` is text, anything else binary.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("db") => BookFormat::Text,
            _ => BookFormat::Binary,
        }
    }

    pub fn empty_book(self) -> Book {
        match self {
            BookFormat::Text => Book::Text(BTreeMap::new()),
            BookFormat::Binary => Book::Binary(BTreeMap::new()),
        }
    }

    /// Drops the fields this format cannot store.
    pub fn normalize_move(self, mv: &mut BookMove) {
        if self == BookFormat::Binary {
            mv.usi2 = None;
            mv.depth = None;
            mv.comment.clear();
        }
    }
}

/// Whether an entry can be trusted on its own.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EntryKind {
    /// Complete record; replaces any base data outright.
    #[default]
    Normal,
    /// Partial edit that must be merged with the base record.
    Patch,
}

/// One candidate move of a position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BookMove {
    /// Move in USI notation; unique within an entry.
    pub usi: String,
    /// Expected reply (ponder move).
    pub usi2: Option<String>,
    pub score: Option<i32>,
    pub depth: Option<i32>,
    pub count: Option<u64>,
    pub comment: String,
}

impl BookMove {
    pub fn new(usi: impl Into<String>) -> Self {
        Self {
            usi: usi.into(),
            ..Self::default()
        }
    }

    pub fn with_score(mut self, score: i32) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_depth(mut self, depth: i32) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }
}

/// Everything the book knows about one position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BookEntry {
    pub comment: String,
    /// Candidate moves in priority order.
    pub moves: Vec<BookMove>,
    /// Smallest ply at which the position was recorded.
    pub min_ply: u32,
    pub kind: EntryKind,
}

impl BookEntry {
    pub fn new(min_ply: u32, kind: EntryKind) -> Self {
        Self {
            min_ply,
            kind,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn position_of(&self, usi: &str) -> Option<usize> {
        self.moves.iter().position(|mv| mv.usi == usi)
    }

    /// Replaces the move with the same usi in place, or appends it.
    pub fn upsert_move(&mut self, mv: BookMove) {
        match self.position_of(&mv.usi) {
            Some(index) => self.moves[index] = mv,
            None => self.moves.push(mv),
        }
    }

    /// Removes the move, returning whether it was present.
    pub fn remove_move(&mut self, usi: &str) -> bool {
        match self.position_of(usi) {
            Some(index) => {
                self.moves.remove(index);
                true
            }
            None => false,
        }
    }

    /// Moves `usi` to `index` (clamped to the last slot).
    ///
    /// Returns whether the move exists; the relative order of every other
    /// move is preserved.
    pub fn reorder_move(&mut self, usi: &str, index: usize) -> bool {
        let Some(from) = self.position_of(usi) else {
            return false;
        };
        let mv = self.moves.remove(from);
        let to = index.min(self.moves.len());
        self.moves.insert(to, mv);
        true
    }

    /// Stable sort by descending count, absent counts last-equal to zero.
    pub fn sort_by_count(&mut self) {
        self.moves
            .sort_by(|a, b| b.count.unwrap_or(0).cmp(&a.count.unwrap_or(0)));
    }
}

/// Format-specific position key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BookKey {
    /// Normalized SFEN with ply replaced by `1`.
    Text(String),
    /// Position hash.
    Binary(u64),
}

impl BookKey {
    pub fn format(&self) -> BookFormat {
        match self {
            BookKey::Text(_) => BookFormat::Text,
            BookKey::Binary(_) => BookFormat::Binary,
        }
    }
}

/// Derives the key of `sfen` for `format`, returning it with the SFEN ply.
pub fn position_key(
    format: BookFormat,
    sfen: &str,
    hasher: &dyn PositionHasher,
) -> Result<(BookKey, u32), PositionError> {
    match format {
        BookFormat::Text => {
            let (key, ply) = text::normalize_sfen(sfen)
                .ok_or_else(|| PositionError::InvalidSfen(sfen.to_string()))?;
            Ok((BookKey::Text(key), ply))
        }
        BookFormat::Binary => {
            let position = Position::from_sfen(sfen)?;
            Ok((BookKey::Binary(hasher.hash(&position)), position.ply()))
        }
    }
}

/// Key of an already parsed position for `format`.
pub fn key_of_position(format: BookFormat, position: &Position, hasher: &dyn PositionHasher) -> BookKey {
    match format {
        BookFormat::Text => {
            let sfen = position.to_sfen();
            let key = text::normalize_sfen(&sfen)
                .map(|(key, _)| key)
                .unwrap_or(sfen);
            BookKey::Text(key)
        }
        BookFormat::Binary => BookKey::Binary(hasher.hash(position)),
    }
}

/// A book: its format plus entries ordered by key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Book {
    Text(BTreeMap<String, BookEntry>),
    Binary(BTreeMap<u64, BookEntry>),
}

impl Book {
    pub fn format(&self) -> BookFormat {
        match self {
            Book::Text(_) => BookFormat::Text,
            Book::Binary(_) => BookFormat::Binary,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Book::Text(entries) => entries.len(),
            Book::Binary(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up an entry. A key of the other format never matches.
    pub fn get(&self, key: &BookKey) -> Option<&BookEntry> {
        match (self, key) {
            (Book::Text(entries), BookKey::Text(key)) => entries.get(key),
            (Book::Binary(entries), BookKey::Binary(key)) => entries.get(key),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: &BookKey) -> Option<&mut BookEntry> {
        match (self, key) {
            (Book::Text(entries), BookKey::Text(key)) => entries.get_mut(key),
            (Book::Binary(entries), BookKey::Binary(key)) => entries.get_mut(key),
            _ => None,
        }
    }

    /// Inserts an entry, returning the one it replaced.
    ///
    /// Keys of the other format are rejected and handed back as `Err`.
    pub fn insert(
        &mut self,
        key: BookKey,
        entry: BookEntry,
    ) -> Result<Option<BookEntry>, (BookKey, BookEntry)> {
        match (self, key) {
            (Book::Text(entries), BookKey::Text(key)) => Ok(entries.insert(key, entry)),
            (Book::Binary(entries), BookKey::Binary(key)) => Ok(entries.insert(key, entry)),
            (_, key) => Err((key, entry)),
        }
    }

    /// Entry for `key`, created by `default` when missing.
    ///
    /// Returns `None` only for a key of the other format.
    pub fn get_or_insert_with(
        &mut self,
        key: &BookKey,
        default: impl FnOnce() -> BookEntry,
    ) -> Option<&mut BookEntry> {
        match (self, key) {
            (Book::Text(entries), BookKey::Text(key)) => {
                Some(entries.entry(key.clone()).or_insert_with(default))
            }
            (Book::Binary(entries), BookKey::Binary(key)) => {
                Some(entries.entry(*key).or_insert_with(default))
            }
            _ => None,
        }
    }

    /// Entries in ascending key order.
    pub fn iter(&self) -> Box<dyn Iterator<Item = (BookKey, &BookEntry)> + Send + '_> {
        match self {
            Book::Text(entries) => Box::new(
                entries
                    .iter()
                    .map(|(key, entry)| (BookKey::Text(key.clone()), entry)),
            ),
            Book::Binary(entries) => {
                Box::new(entries.iter().map(|(key, entry)| (BookKey::Binary(*key), entry)))
            }
        }
    }

    pub fn clear(&mut self) {
        match self {
            Book::Text(entries) => entries.clear(),
            Book::Binary(entries) => entries.clear(),
        }
    }
}

impl Default for Book {
    fn default() -> Self {
        BookFormat::Text.empty_book()
    }
}
