//! Opening-book data model and file codecs shared by the book store.
//!
//! `book-core` is synchronous and performs no I/O. It defines the canonical
//! book types ([`BookMove`], [`BookEntry`], [`Book`]), the base/patch merge
//! rule, the shogi position model used to derive position keys, and the two
//! on-disk codecs:
//! - [`codec::text`] for YaneuraOu `DB2016` line-oriented books
//! - [`codec::binary`] for Apery 16-byte record books
//!
//! Decoders are incremental so the async store can feed them lines or
//! records straight from a file without buffering the whole book.
pub mod book;
pub mod codec;
pub mod error;
pub mod hash;
pub mod merge;
pub mod shogi;

pub use book::{
    Book, BookEntry, BookFormat, BookKey, BookMove, EntryKind, key_of_position, position_key,
};
pub use error::{FormatError, PositionError};
pub use hash::{AperyZobrist, PositionHasher};
pub use merge::{merge_entries, resolve_entry};
pub use shogi::{Color, Piece, PieceType, Position, Square, UsiMove};
