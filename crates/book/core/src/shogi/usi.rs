use std::fmt;
use std::str::FromStr;

use super::{PieceType, Square};
use crate::error::PositionError;

/// A move in USI notation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UsiMove {
    /// Board move such as `7g7f` or `8h2b+`.
    Normal { from: Square, to: Square, promote: bool },
    /// Drop such as `P*5e`.
    Drop { piece: PieceType, to: Square },
}

impl UsiMove {
    pub const fn to(self) -> Square {
        match self {
            UsiMove::Normal { to, .. } | UsiMove::Drop { to, .. } => to,
        }
    }
}

impl FromStr for UsiMove {
    type Err = PositionError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || PositionError::InvalidMove(text.to_string());
        if let Some((piece, to)) = text.split_once('*') {
            let mut letters = piece.chars();
            let piece = match (letters.next(), letters.next()) {
                (Some(letter), None) => PieceType::from_letter(letter).ok_or_else(invalid)?,
                _ => return Err(invalid()),
            };
            if piece == PieceType::King {
                return Err(invalid());
            }
            let to = Square::from_usi(to).ok_or_else(invalid)?;
            return Ok(UsiMove::Drop { piece, to });
        }

        let (body, promote) = match text.strip_suffix('+') {
            Some(body) => (body, true),
            None => (text, false),
        };
        if body.len() != 4 || !body.is_ascii() {
            return Err(invalid());
        }
        let from = Square::from_usi(&body[..2]).ok_or_else(invalid)?;
        let to = Square::from_usi(&body[2..]).ok_or_else(invalid)?;
        if from == to {
            return Err(invalid());
        }
        Ok(UsiMove::Normal { from, to, promote })
    }
}

impl fmt::Display for UsiMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsiMove::Normal { from, to, promote } => {
                write!(f, "{from}{to}")?;
                if *promote {
                    f.write_str("+")?;
                }
                Ok(())
            }
            UsiMove::Drop { piece, to } => write!(f, "{}*{to}", piece.letter()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_board_moves_and_drops() {
        for text in ["7g7f", "8h2b+", "P*5e", "G*1a"] {
            let mv: UsiMove = text.parse().unwrap();
            assert_eq!(mv.to_string(), text);
        }
    }

    #[test]
    fn rejects_malformed_moves() {
        for text in ["", "7g", "7g7g", "K*5e", "X*5e", "7g7f++", "7g7j"] {
            assert!(text.parse::<UsiMove>().is_err(), "{text} should be rejected");
        }
    }
}
