use std::fmt::Write as _;

use super::{Color, Piece, PieceType, Square, UsiMove};
use crate::error::PositionError;

/// Board, hands, side to move and ply of a shogi position.
///
/// Moves are applied without legality checks: the book only needs to follow
/// moves that an engine or a game record already played.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Position {
    board: [Option<Piece>; Square::COUNT],
    hands: [[u8; 7]; 2],
    turn: Color,
    ply: u32,
}

impl Position {
    /// SFEN of the standard start position.
    pub const STARTPOS_SFEN: &'static str =
        "lnsgkgsnl/1r5b1/ppppppppp/9/9/9/PPPPPPPPP/1B5R1/LNSGKGSNL b - 1";

    /// Empty board, black to move, ply 1.
    pub fn empty() -> Self {
        Self {
            board: [None; Square::COUNT],
            hands: [[0; 7]; 2],
            turn: Color::Black,
            ply: 1,
        }
    }

    pub fn startpos() -> Self {
        match Self::from_sfen(Self::STARTPOS_SFEN) {
            Ok(position) => position,
            Err(_) => unreachable!("start position SFEN is well-formed"),
        }
    }

    /// Parses a SFEN, with or without a leading `sfen ` and with an optional ply.
    pub fn from_sfen(sfen: &str) -> Result<Self, PositionError> {
        let invalid = || PositionError::InvalidSfen(sfen.to_string());
        let text = sfen.trim();
        let text = text.strip_prefix("sfen ").unwrap_or(text);
        let mut fields = text.split_whitespace();
        let (Some(board), Some(turn), Some(hands)) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(invalid());
        };

        let mut position = Self::empty();

        let rows: Vec<&str> = board.split('/').collect();
        if rows.len() != 9 {
            return Err(invalid());
        }
        for (row, cells) in rows.iter().enumerate() {
            let rank = row as u8 + 1;
            let mut file = 9u8;
            let mut promoted = false;
            for c in cells.chars() {
                if let Some(skip) = c.to_digit(10) {
                    if promoted || skip == 0 || u32::from(file) < skip {
                        return Err(invalid());
                    }
                    file -= skip as u8;
                    continue;
                }
                if c == '+' {
                    promoted = true;
                    continue;
                }
                let kind = PieceType::from_letter(c.to_ascii_uppercase()).ok_or_else(invalid)?;
                let kind = if promoted {
                    kind.promote().ok_or_else(invalid)?
                } else {
                    kind
                };
                let color = if c.is_ascii_uppercase() {
                    Color::Black
                } else {
                    Color::White
                };
                let square = Square::new(file, rank).ok_or_else(invalid)?;
                position.board[square.index()] = Some(Piece::new(color, kind));
                file = file.wrapping_sub(1);
                promoted = false;
            }
            if file != 0 || promoted {
                return Err(invalid());
            }
        }

        position.turn = match turn {
            "b" => Color::Black,
            "w" => Color::White,
            _ => return Err(invalid()),
        };

        if hands != "-" {
            let mut count: u32 = 0;
            for c in hands.chars() {
                if let Some(digit) = c.to_digit(10) {
                    count = count
                        .checked_mul(10)
                        .and_then(|count| count.checked_add(digit))
                        .ok_or_else(invalid)?;
                    continue;
                }
                let kind = PieceType::from_letter(c.to_ascii_uppercase()).ok_or_else(invalid)?;
                let slot = kind.hand_index().ok_or_else(invalid)?;
                let color = if c.is_ascii_uppercase() {
                    Color::Black
                } else {
                    Color::White
                };
                let n = if count == 0 { 1 } else { count };
                position.hands[color.index()][slot] =
                    u8::try_from(n).map_err(|_| invalid())?;
                count = 0;
            }
            if count != 0 {
                return Err(invalid());
            }
        }

        if let Some(ply) = fields.next() {
            position.ply = ply.parse().map_err(|_| invalid())?;
        }

        Ok(position)
    }

    pub fn to_sfen(&self) -> String {
        let mut out = String::with_capacity(96);
        for rank in 1..=9u8 {
            if rank > 1 {
                out.push('/');
            }
            let mut empty = 0;
            for file in (1..=9u8).rev() {
                let Some(square) = Square::new(file, rank) else {
                    continue;
                };
                match self.board[square.index()] {
                    None => empty += 1,
                    Some(piece) => {
                        if empty > 0 {
                            let _ = write!(out, "{empty}");
                            empty = 0;
                        }
                        if piece.kind.is_promoted() {
                            out.push('+');
                        }
                        let letter = piece.kind.letter();
                        out.push(match piece.color {
                            Color::Black => letter,
                            Color::White => letter.to_ascii_lowercase(),
                        });
                    }
                }
            }
            if empty > 0 {
                let _ = write!(out, "{empty}");
            }
        }

        out.push(' ');
        out.push(match self.turn {
            Color::Black => 'b',
            Color::White => 'w',
        });
        out.push(' ');

        let start = out.len();
        for color in [Color::Black, Color::White] {
            for kind in PieceType::SFEN_HAND_ORDER {
                let n = self.hand_count(color, kind);
                if n == 0 {
                    continue;
                }
                if n > 1 {
                    let _ = write!(out, "{n}");
                }
                let letter = kind.letter();
                out.push(match color {
                    Color::Black => letter,
                    Color::White => letter.to_ascii_lowercase(),
                });
            }
        }
        if out.len() == start {
            out.push('-');
        }

        let _ = write!(out, " {}", self.ply);
        out
    }

    #[inline]
    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.board[square.index()]
    }

    pub fn set_piece(&mut self, square: Square, piece: Option<Piece>) {
        self.board[square.index()] = piece;
    }

    /// Occupied squares in square-index order.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        self.board.iter().enumerate().filter_map(|(index, piece)| {
            let square = Square::from_index(index as u8)?;
            piece.map(|piece| (square, piece))
        })
    }

    pub fn hand_count(&self, color: Color, kind: PieceType) -> u8 {
        kind.hand_index()
            .map_or(0, |slot| self.hands[color.index()][slot])
    }

    pub fn set_hand_count(&mut self, color: Color, kind: PieceType, count: u8) {
        if let Some(slot) = kind.hand_index() {
            self.hands[color.index()][slot] = count;
        }
    }

    #[inline]
    pub fn turn(&self) -> Color {
        self.turn
    }

    pub fn set_turn(&mut self, turn: Color) {
        self.turn = turn;
    }

    #[inline]
    pub fn ply(&self) -> u32 {
        self.ply
    }

    pub fn set_ply(&mut self, ply: u32) {
        self.ply = ply;
    }

    /// Plays a USI move for the side to move and advances the ply.
    pub fn apply(&mut self, mv: UsiMove) -> Result<(), PositionError> {
        let turn = self.turn;
        match mv {
            UsiMove::Drop { piece, to } => {
                let slot = piece.hand_index().ok_or(PositionError::NotInHand(piece))?;
                let held = &mut self.hands[turn.index()][slot];
                if *held == 0 {
                    return Err(PositionError::NotInHand(piece));
                }
                *held -= 1;
                self.board[to.index()] = Some(Piece::new(turn, piece));
            }
            UsiMove::Normal { from, to, promote } => {
                let mut moving = self.board[from.index()]
                    .take()
                    .ok_or(PositionError::EmptySquare(from))?;
                if let Some(captured) = self.board[to.index()]
                    && let Some(slot) = captured.kind.unpromote().hand_index()
                {
                    let held = &mut self.hands[turn.index()][slot];
                    *held = held.saturating_add(1);
                }
                if promote {
                    moving.kind = moving.kind.promote().unwrap_or(moving.kind);
                }
                self.board[to.index()] = Some(moving);
            }
        }
        self.turn = turn.opposite();
        self.ply = self.ply.saturating_add(1);
        Ok(())
    }

    /// Parses and plays a USI move.
    pub fn apply_usi(&mut self, usi: &str) -> Result<(), PositionError> {
        self.apply(usi.parse()?)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::startpos()
    }
}
