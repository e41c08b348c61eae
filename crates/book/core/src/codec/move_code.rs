//! Apery 16-bit move codes.
//!
//! ```text
//! bits 0..=6   destination square
//! bits 7..=13  origin square, or 80 + piece code for drops
//! bit  14      promotion
//! ```
//! Squares are numbered file-major from `1a` = 0. Drop piece codes are
//! pawn 1, lance 2, knight 3, silver 4, bishop 5, rook 6, gold 7.

use crate::error::FormatError;
use crate::shogi::{PieceType, Square, UsiMove};

const SQUARE_MASK: u16 = 0x7f;
const PROMOTE_FLAG: u16 = 1 << 14;
const DROP_BASE: u16 = Square::COUNT as u16 - 1;

fn drop_code(piece: PieceType) -> Option<u16> {
    Some(match piece {
        PieceType::Pawn => 1,
        PieceType::Lance => 2,
        PieceType::Knight => 3,
        PieceType::Silver => 4,
        PieceType::Bishop => 5,
        PieceType::Rook => 6,
        PieceType::Gold => 7,
        _ => return None,
    })
}

fn drop_piece(code: u16) -> Option<PieceType> {
    Some(match code {
        1 => PieceType::Pawn,
        2 => PieceType::Lance,
        3 => PieceType::Knight,
        4 => PieceType::Silver,
        5 => PieceType::Bishop,
        6 => PieceType::Rook,
        7 => PieceType::Gold,
        _ => return None,
    })
}

pub fn encode_move(usi: &str) -> Result<u16, FormatError> {
    let bad = || FormatError::BadUsi(usi.to_string());
    let mv: UsiMove = usi.parse().map_err(|_| bad())?;
    Ok(match mv {
        UsiMove::Normal { from, to, promote } => {
            let mut code = to.index() as u16 | (from.index() as u16) << 7;
            if promote {
                code |= PROMOTE_FLAG;
            }
            code
        }
        UsiMove::Drop { piece, to } => {
            let piece = drop_code(piece).ok_or_else(bad)?;
            to.index() as u16 | (DROP_BASE + piece) << 7
        }
    })
}

pub fn decode_move(code: u16) -> Result<String, FormatError> {
    let bad = || FormatError::BadMoveCode(code);
    if code >> 15 != 0 {
        return Err(bad());
    }
    let to = Square::from_index((code & SQUARE_MASK) as u8).ok_or_else(bad)?;
    let origin = (code >> 7) & SQUARE_MASK;
    let promote = code & PROMOTE_FLAG != 0;

    let mv = match Square::from_index(origin as u8) {
        Some(from) if from != to => UsiMove::Normal { from, to, promote },
        Some(_) => return Err(bad()),
        None if promote => return Err(bad()),
        None => UsiMove::Drop {
            piece: drop_piece(origin - DROP_BASE).ok_or_else(bad)?,
            to,
        },
    };
    Ok(mv.to_string())
}
