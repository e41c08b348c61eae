//! Line/record ⇄ entry codecs for both on-disk formats.
//!
//! Each codec exposes an incremental decoder (fed one line or one record at
//! a time, yielding finished entries) plus whole-buffer helpers built on it.
pub mod binary;
pub mod move_code;
pub mod text;

pub use binary::{BinaryDecoder, BinaryRecord, RECORD_SIZE};
pub use move_code::{decode_move, encode_move};
pub use text::{HEADER, TextDecoder};
