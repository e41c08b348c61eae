//! CSA record parser.
//!
//! Handles the subset a book import needs: player names, `PI`/`P1`-`P9`/`P±`
//! start positions, the side to move and `+`/`-` moves. Comments, time,
//! version, metadata and `%` result lines are skipped; a `/` separator ends
//! the first game.
use book_core::{Color, Piece, PieceType, Position, Square, UsiMove};

use super::record::{GameRecord, RecordError};

/// Number of each kind in a full set, for `00AL`.
const FULL_SET: [(PieceType, u8); 7] = [
    (PieceType::Pawn, 18),
    (PieceType::Lance, 4),
    (PieceType::Knight, 4),
    (PieceType::Silver, 4),
    (PieceType::Gold, 4),
    (PieceType::Bishop, 2),
    (PieceType::Rook, 2),
];

fn piece_type(code: &str) -> Option<PieceType> {
    Some(match code {
        "FU" => PieceType::Pawn,
        "KY" => PieceType::Lance,
        "KE" => PieceType::Knight,
        "GI" => PieceType::Silver,
        "KI" => PieceType::Gold,
        "KA" => PieceType::Bishop,
        "HI" => PieceType::Rook,
        "OU" => PieceType::King,
        "TO" => PieceType::ProPawn,
        "NY" => PieceType::ProLance,
        "NK" => PieceType::ProKnight,
        "NG" => PieceType::ProSilver,
        "UM" => PieceType::Horse,
        "RY" => PieceType::Dragon,
        _ => return None,
    })
}

fn color(sign: u8) -> Option<Color> {
    match sign {
        b'+' => Some(Color::Black),
        b'-' => Some(Color::White),
        _ => None,
    }
}

/// `"77"` → 7g; `"00"` → `None` (hand).
fn square(digits: &str) -> Option<Option<Square>> {
    let bytes = digits.as_bytes();
    let [file, rank] = bytes else {
        return None;
    };
    if *file == b'0' && *rank == b'0' {
        return Some(None);
    }
    Square::new(file.checked_sub(b'0')?, rank.checked_sub(b'0')?).map(Some)
}

struct Parser {
    line: usize,
    setup: Position,
    board_set: bool,
    current: Option<Position>,
    usis: Vec<String>,
    black_name: Option<String>,
    white_name: Option<String>,
}

impl Parser {
    fn error(&self, message: impl Into<String>) -> RecordError {
        RecordError::Syntax {
            line: self.line,
            message: message.into(),
        }
    }

    fn statement(&mut self, statement: &str) -> Result<(), RecordError> {
        let bytes = statement.as_bytes();
        match bytes.first() {
            None | Some(b'\'' | b'V' | b'$' | b'T' | b'%') => Ok(()),
            Some(b'N') => {
                let name = statement.get(2..).unwrap_or_default().trim().to_string();
                match color(bytes.get(1).copied().unwrap_or_default()) {
                    Some(Color::Black) => self.black_name = Some(name),
                    Some(Color::White) => self.white_name = Some(name),
                    None => return Err(self.error("bad name line")),
                }
                Ok(())
            }
            Some(b'P') => self.setup_line(statement),
            Some(b'+' | b'-') if bytes.len() == 1 => {
                if self.current.is_some() {
                    return Err(self.error("side to move after moves"));
                }
                self.setup.set_turn(color(bytes[0]).unwrap_or(Color::Black));
                Ok(())
            }
            Some(b'+' | b'-') => self.play(statement),
            Some(_) => Err(self.error(format!("unknown statement {statement:?}"))),
        }
    }

    fn setup_line(&mut self, statement: &str) -> Result<(), RecordError> {
        if self.current.is_some() {
            return Err(self.error("position after moves"));
        }
        let body = statement.get(2..).unwrap_or_default();
        match statement.as_bytes().get(1) {
            Some(b'I') => {
                let turn = self.setup.turn();
                self.setup = Position::startpos();
                self.setup.set_turn(turn);
                for removal in body.as_bytes().chunks(4) {
                    let removal = std::str::from_utf8(removal).map_err(|_| self.error("bad PI"))?;
                    let Some(Some(sq)) = removal.get(..2).and_then(square) else {
                        return Err(self.error("bad PI square"));
                    };
                    self.setup.set_piece(sq, None);
                }
                Ok(())
            }
            Some(rank @ b'1'..=b'9') => {
                if !self.board_set {
                    let turn = self.setup.turn();
                    self.setup = Position::empty();
                    self.setup.set_turn(turn);
                    self.board_set = true;
                }
                let rank = rank - b'0';
                for (column, cell) in body.as_bytes().chunks(3).take(9).enumerate() {
                    let file = 9 - column as u8;
                    let sq = Square::new(file, rank).ok_or_else(|| self.error("bad square"))?;
                    let piece = match cell {
                        [b' ', b'*', b' '] | [b' ', b'*'] => None,
                        [sign, kind @ ..] => {
                            let kind = std::str::from_utf8(kind).ok().and_then(piece_type);
                            match (color(*sign), kind) {
                                (Some(color), Some(kind)) => Some(Piece::new(color, kind)),
                                _ => return Err(self.error(format!("bad cell in P{rank}"))),
                            }
                        }
                        [] => None,
                    };
                    self.setup.set_piece(sq, piece);
                }
                Ok(())
            }
            Some(sign @ (b'+' | b'-')) => {
                let owner = color(*sign).unwrap_or(Color::Black);
                for item in body.as_bytes().chunks(4) {
                    let item = std::str::from_utf8(item).map_err(|_| self.error("bad piece list"))?;
                    let (at, code) = item.split_at(2.min(item.len()));
                    if code == "AL" {
                        self.rest_to_hand(owner);
                        continue;
                    }
                    let kind = piece_type(code).ok_or_else(|| self.error("bad piece"))?;
                    match square(at) {
                        Some(None) => {
                            let held = self.setup.hand_count(owner, kind);
                            self.setup.set_hand_count(owner, kind, held + 1);
                        }
                        Some(Some(sq)) => self.setup.set_piece(sq, Some(Piece::new(owner, kind))),
                        None => return Err(self.error("bad square")),
                    }
                }
                Ok(())
            }
            _ => Err(self.error(format!("unknown position line {statement:?}"))),
        }
    }

    fn rest_to_hand(&mut self, owner: Color) {
        for (kind, total) in FULL_SET {
            let on_board = self
                .setup
                .pieces()
                .filter(|(_, piece)| piece.kind.unpromote() == kind)
                .count() as u8;
            let held = self.setup.hand_count(Color::Black, kind)
                + self.setup.hand_count(Color::White, kind);
            let rest = total.saturating_sub(on_board + held);
            let own = self.setup.hand_count(owner, kind);
            self.setup.set_hand_count(owner, kind, own + rest);
        }
    }

    fn play(&mut self, statement: &str) -> Result<(), RecordError> {
        let (Some(mover), Some(from), Some(to), Some(code)) = (
            color(statement.as_bytes()[0]),
            statement.get(1..3).and_then(square),
            statement.get(3..5).and_then(square),
            statement.get(5..7).and_then(piece_type),
        ) else {
            return Err(self.error(format!("bad move {statement:?}")));
        };
        let Some(to) = to else {
            return Err(self.error("move to hand"));
        };

        let current = self.current.get_or_insert_with(|| self.setup.clone());
        if current.turn() != mover {
            return Err(RecordError::Syntax {
                line: self.line,
                message: format!("{statement:?} played out of turn"),
            });
        }

        let mv = match from {
            None => UsiMove::Drop { piece: code, to },
            Some(from) => {
                let moving = current.piece_at(from).ok_or_else(|| {
                    RecordError::Position(book_core::PositionError::EmptySquare(from))
                })?;
                UsiMove::Normal {
                    from,
                    to,
                    promote: code.is_promoted() && !moving.kind.is_promoted(),
                }
            }
        };
        current.apply(mv)?;
        self.usis.push(mv.to_string());
        Ok(())
    }
}

/// Parses the first game of a CSA record.
pub fn parse_csa(text: &str) -> Result<GameRecord, RecordError> {
    let mut parser = Parser {
        line: 0,
        setup: Position::startpos(),
        board_set: false,
        current: None,
        usis: Vec::new(),
        black_name: None,
        white_name: None,
    };

    'lines: for (index, line) in text.lines().enumerate() {
        parser.line = index + 1;
        let line = line.trim_end();
        if line.starts_with('\'') {
            continue;
        }
        if line == "/" {
            break;
        }
        for statement in line.split(',') {
            if statement.starts_with('%') {
                break 'lines;
            }
            parser.statement(statement)?;
        }
    }

    let mut record = GameRecord::main_line(parser.setup, parser.usis);
    record.black_name = parser.black_name;
    record.white_name = parser.white_name;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn main_line(record: &GameRecord) -> Vec<&str> {
        let mut usis = Vec::new();
        let mut nodes = &record.moves;
        while let Some(node) = nodes.first() {
            usis.push(node.usi.as_str());
            nodes = &node.children;
        }
        usis
    }

    #[test]
    fn parses_names_and_moves() {
        let record = parse_csa(concat!(
            "V2.2\n",
            "N+Alice\n",
            "N-Bob\n",
            "$EVENT:test\n",
            "PI\n",
            "+\n",
            "+7776FU\n",
            "T12\n",
            "-3334FU,T3\n",
            "+8822UM\n",
            "'comment\n",
            "-3122GI\n",
            "+0045KA\n",
            "%TORYO\n",
            "+2726FU\n",
        ))
        .unwrap();

        assert_eq!(record.black_name.as_deref(), Some("Alice"));
        assert_eq!(record.white_name.as_deref(), Some("Bob"));
        assert_eq!(record.start, Position::startpos());
        assert_eq!(main_line(&record), ["7g7f", "3c3d", "8h2b+", "3a2b", "B*4e"]);
    }

    #[test]
    fn parses_board_rows_and_hands() {
        let record = parse_csa(concat!(
            "P1 *  *  *  * -OU *  *  *  * \n",
            "P2 *  *  *  *  *  *  *  *  * \n",
            "P3 *  *  *  *  *  *  *  *  * \n",
            "P4 *  *  *  *  *  *  *  *  * \n",
            "P5 *  *  *  *  *  *  *  *  * \n",
            "P6 *  *  *  *  *  *  *  *  * \n",
            "P7 *  *  *  *  *  *  *  *  * \n",
            "P8 *  *  *  *  *  *  *  *  * \n",
            "P9 *  *  *  * +OU *  *  *  * \n",
            "P+00HI00FU\n",
            "P-00AL\n",
            "+\n",
            "+0055HI\n",
        ))
        .unwrap();

        assert_eq!(
            record.start.to_sfen(),
            "4k4/9/9/9/9/9/9/9/4K4 b RPr2b4g4s4n4l17p 1"
        );
        assert_eq!(main_line(&record), ["R*5e"]);
    }

    #[test]
    fn pi_removes_pieces() {
        let record = parse_csa("PI82HI22KA\n-\n").unwrap();
        assert_eq!(
            record.start.to_sfen(),
            "lnsgkgsnl/9/ppppppppp/9/9/9/PPPPPPPPP/1B5R1/LNSGKGSNL w - 1"
        );
    }

    #[test]
    fn rejects_out_of_turn_moves() {
        assert!(matches!(
            parse_csa("PI\n+\n-3334FU\n"),
            Err(RecordError::Syntax { line: 3, .. })
        ));
    }
}
