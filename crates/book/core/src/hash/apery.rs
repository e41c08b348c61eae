use super::{Mt64, PositionHasher};
use crate::shogi::{Color, PieceType, Position, Square};

const PIECE_SLOTS: usize = 31;
const HAND_COUNTS: usize = 19;

/// Zobrist hasher compatible with Apery book keys.
///
/// Tables are filled from a default-seeded MT19937-64 in the engine's order:
/// every piece code (including the empty code 0) by every square, then every
/// hand kind by every count `0..=18`, then the turn key. A position's key is
/// the XOR of its occupied squares, the side to move's hand counts, and the
/// turn key when white is to move.
pub struct AperyZobrist {
    pieces: Box<[[u64; Square::COUNT]; PIECE_SLOTS]>,
    hands: [[u64; HAND_COUNTS]; 7],
    turn: u64,
}

impl AperyZobrist {
    pub fn new() -> Self {
        let mut mt = Mt64::default();
        let mut pieces = Box::new([[0u64; Square::COUNT]; PIECE_SLOTS]);
        for row in pieces.iter_mut() {
            for key in row.iter_mut() {
                *key = mt.next_u64();
            }
        }
        let mut hands = [[0u64; HAND_COUNTS]; 7];
        for row in hands.iter_mut() {
            for key in row.iter_mut() {
                *key = mt.next_u64();
            }
        }
        let turn = mt.next_u64();
        Self {
            pieces,
            hands,
            turn,
        }
    }

    /// Engine piece code: black 1..=14, white 17..=30.
    fn piece_code(color: Color, kind: PieceType) -> usize {
        let base = match kind {
            PieceType::Pawn => 1,
            PieceType::Lance => 2,
            PieceType::Knight => 3,
            PieceType::Silver => 4,
            PieceType::Bishop => 5,
            PieceType::Rook => 6,
            PieceType::Gold => 7,
            PieceType::King => 8,
            PieceType::ProPawn => 9,
            PieceType::ProLance => 10,
            PieceType::ProKnight => 11,
            PieceType::ProSilver => 12,
            PieceType::Horse => 13,
            PieceType::Dragon => 14,
        };
        match color {
            Color::Black => base,
            Color::White => base + 16,
        }
    }
}

impl Default for AperyZobrist {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionHasher for AperyZobrist {
    fn hash(&self, position: &Position) -> u64 {
        let mut key = 0u64;
        for (square, piece) in position.pieces() {
            key ^= self.pieces[Self::piece_code(piece.color, piece.kind)][square.index()];
        }
        let turn = position.turn();
        for (slot, kind) in PieceType::HAND.iter().enumerate() {
            let count = usize::from(position.hand_count(turn, *kind)).min(HAND_COUNTS - 1);
            key ^= self.hands[slot][count];
        }
        if turn == Color::White {
            key ^= self.turn;
        }
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_ply() {
        let hasher = AperyZobrist::new();
        let a = Position::from_sfen("lnsgkgsnl/1r5b1/ppppppppp/9/9/9/PPPPPPPPP/1B5R1/LNSGKGSNL b - 1")
            .unwrap();
        let b = Position::from_sfen("lnsgkgsnl/1r5b1/ppppppppp/9/9/9/PPPPPPPPP/1B5R1/LNSGKGSNL b - 77")
            .unwrap();
        assert_eq!(hasher.hash(&a), hasher.hash(&b));
    }

    #[test]
    fn distinguishes_turn_and_board() {
        let hasher = AperyZobrist::new();
        let start = Position::startpos();
        let mut moved = start.clone();
        moved.apply_usi("7g7f").unwrap();
        let mut flipped = start.clone();
        flipped.set_turn(Color::White);

        let keys = [
            hasher.hash(&start),
            hasher.hash(&moved),
            hasher.hash(&flipped),
        ];
        assert_ne!(keys[0], keys[1]);
        assert_ne!(keys[0], keys[2]);
        assert_ne!(keys[1], keys[2]);
    }

    #[test]
    fn only_side_to_move_hand_counts() {
        let hasher = AperyZobrist::new();
        let a = Position::from_sfen("4k4/9/9/9/9/9/9/9/4K4 b P 1").unwrap();
        let b = Position::from_sfen("4k4/9/9/9/9/9/9/9/4K4 b Pp 1").unwrap();
        let c = Position::from_sfen("4k4/9/9/9/9/9/9/9/4K4 b 2P 1").unwrap();
        assert_eq!(hasher.hash(&a), hasher.hash(&b));
        assert_ne!(hasher.hash(&a), hasher.hash(&c));
    }
}
