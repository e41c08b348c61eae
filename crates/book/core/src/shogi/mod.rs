//! Minimal shogi position model.
//!
//! Only what the book needs: SFEN round-tripping, USI move parsing, and
//! applying moves without legality checks so the import pipeline can walk
//! game records position by position.
mod piece;
mod position;
mod square;
mod usi;

pub use piece::{Color, Piece, PieceType};
pub use position::Position;
pub use square::Square;
pub use usi::UsiMove;
