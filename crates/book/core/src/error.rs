//! Error types raised while decoding book files and positions.

use thiserror::Error;

use crate::shogi::{PieceType, Square};

/// Errors raised by the book codecs.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FormatError {
    /// First line of a text book is not the `DB2016` header.
    #[error("unsupported book header: {0:?}")]
    BadHeader(String),

    /// Binary book byte length is not a whole number of records.
    #[error("binary book length {0} is not a multiple of 16")]
    BadLength(u64),

    #[error("invalid move code {0:#06x}")]
    BadMoveCode(u16),

    #[error("invalid USI move {0:?}")]
    BadUsi(String),

    #[error("invalid position line {0:?}")]
    BadPositionLine(String),

    #[error("line {line} is not valid UTF-8")]
    BadEncoding { line: usize },

    #[error(transparent)]
    Position(#[from] PositionError),
}

/// Errors raised by the shogi position model.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PositionError {
    #[error("invalid SFEN {0:?}")]
    InvalidSfen(String),

    #[error("invalid USI move {0:?}")]
    InvalidMove(String),

    #[error("no piece on square {0}")]
    EmptySquare(Square),

    #[error("no {0} in hand")]
    NotInHand(PieceType),
}
