//! Game records and the parser seam the import pipeline consumes.
use std::path::Path;

use book_core::{Color, PositionError, Position};
use thiserror::Error;

use super::{csa, usi};

/// Record format, detected from the file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum RecordFormat {
    Csa,
    /// One USI `position` line.
    Usi,
    /// Many USI `position` lines, one game each.
    Sfen,
    Kif,
    Kifu,
    Ki2,
    Ki2u,
    Jkf,
}

impl RecordFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        Some(match ext.as_str() {
            "csa" => RecordFormat::Csa,
            "usi" => RecordFormat::Usi,
            "sfen" => RecordFormat::Sfen,
            "kif" => RecordFormat::Kif,
            "kifu" => RecordFormat::Kifu,
            "ki2" => RecordFormat::Ki2,
            "ki2u" => RecordFormat::Ki2u,
            "jkf" => RecordFormat::Jkf,
            _ => return None,
        })
    }

    /// Batch files carry no player names.
    pub const fn is_batch(self) -> bool {
        matches!(self, RecordFormat::Sfen)
    }
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("no parser for {0} records")]
    Unsupported(RecordFormat),

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("record is not valid UTF-8")]
    Encoding,

    #[error(transparent)]
    Position(#[from] PositionError),
}

/// One move of a record plus every continuation played after it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordNode {
    pub usi: String,
    pub children: Vec<RecordNode>,
}

/// A parsed game: start position, players and move tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameRecord {
    pub start: Position,
    pub black_name: Option<String>,
    pub white_name: Option<String>,
    /// Alternative first moves.
    pub moves: Vec<RecordNode>,
}

impl GameRecord {
    /// Record of a single main line.
    pub fn main_line<I>(start: Position, usis: I) -> Self
    where
        I: IntoIterator<Item = String>,
        I::IntoIter: DoubleEndedIterator,
    {
        let mut line: Option<RecordNode> = None;
        for usi in usis.into_iter().rev() {
            line = Some(RecordNode {
                usi,
                children: line.into_iter().collect(),
            });
        }
        Self {
            start,
            black_name: None,
            white_name: None,
            moves: line.into_iter().collect(),
        }
    }

    pub fn player(&self, color: Color) -> Option<&str> {
        match color {
            Color::Black => self.black_name.as_deref(),
            Color::White => self.white_name.as_deref(),
        }
    }
}

/// Record decoding used by the import pipeline.
///
/// Implementations for formats the store does not parse itself (KIF, KI2,
/// JKF) are injected through [`BookStoreBuilder`](crate::BookStoreBuilder).
pub trait RecordParser: Send + Sync {
    fn detect(&self, path: &Path) -> Option<RecordFormat> {
        RecordFormat::from_path(path)
    }

    fn parse(&self, bytes: &[u8], format: RecordFormat) -> Result<GameRecord, RecordError>;
}

/// Parses CSA and USI records.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinRecordParser;

impl RecordParser for BuiltinRecordParser {
    fn parse(&self, bytes: &[u8], format: RecordFormat) -> Result<GameRecord, RecordError> {
        let text = std::str::from_utf8(bytes).map_err(|_| RecordError::Encoding)?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        match format {
            RecordFormat::Csa => csa::parse_csa(text),
            RecordFormat::Usi | RecordFormat::Sfen => {
                let line = text
                    .lines()
                    .find(|line| !line.trim().is_empty())
                    .ok_or_else(|| RecordError::Syntax {
                        line: 1,
                        message: "empty record".into(),
                    })?;
                usi::parse_usi_line(line)
            }
            other => Err(RecordError::Unsupported(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_by_extension() {
        assert_eq!(RecordFormat::from_path(Path::new("a/b.CSA")), Some(RecordFormat::Csa));
        assert_eq!(RecordFormat::from_path(Path::new("games.sfen")), Some(RecordFormat::Sfen));
        assert_eq!(RecordFormat::from_path(Path::new("x.kifu")), Some(RecordFormat::Kifu));
        assert_eq!(RecordFormat::from_path(Path::new("notes.txt")), None);
        assert_eq!(RecordFormat::from_path(Path::new("README")), None);
    }

    #[test]
    fn main_line_nests_moves() {
        let record = GameRecord::main_line(
            Position::startpos(),
            ["7g7f", "3c3d"].map(String::from),
        );
        assert_eq!(record.moves.len(), 1);
        assert_eq!(record.moves[0].usi, "7g7f");
        assert_eq!(record.moves[0].children[0].usi, "3c3d");
        assert!(record.moves[0].children[0].children.is_empty());
    }

    #[test]
    fn kif_needs_an_injected_parser() {
        let result = BuiltinRecordParser.parse(b"anything", RecordFormat::Kif);
        assert!(matches!(result, Err(RecordError::Unsupported(RecordFormat::Kif))));
    }
}
