//! Castling notation helpers.
//!
//! Clients send castling the standard way (king moves two squares: e1g1).
//! cozy-chess encodes it as king-takes-own-rook (e1h1). Moves are translated on
//! the way in and out so the rest of the server only sees the client form.

use cozy_chess::{Board, File, Move, Piece, Rank, Square};

use crate::converters::{format_piece, format_square};

/// Convert client castling notation to cozy_chess notation.
///
/// Only converts when the king is on e1/e8 and the converted move is legal.
/// Anything else is returned untouched.
pub fn convert_uci_castling_to_cozy(mv: Move, legal_moves: &[Move]) -> Move {
    let is_rank_1_or_8 = matches!(mv.from.rank(), Rank::First | Rank::Eighth);
    let is_e_file = matches!(mv.from.file(), File::E);
    let is_g_or_c_file = matches!(mv.to.file(), File::G | File::C);

    if is_rank_1_or_8 && is_e_file && is_g_or_c_file && mv.promotion.is_none() {
        let rook_square = match mv.to.file() {
            File::G => Square::new(File::H, mv.from.rank()),
            _ => Square::new(File::A, mv.from.rank()),
        };
        let converted = Move {
            from: mv.from,
            to: rook_square,
            promotion: None,
        };
        if legal_moves.contains(&converted) {
            return converted;
        }
    }

    mv
}

/// True if `mv` is a castling move in cozy-chess form on `board`.
pub fn is_cozy_castling(board: &Board, mv: Move) -> bool {
    board.piece_on(mv.from) == Some(Piece::King)
        && board.color_on(mv.to) == Some(board.side_to_move())
}

/// Convert a cozy castling move back to the king's destination square.
pub fn convert_cozy_castling_to_uci(board: &Board, mv: Move) -> Move {
    if !is_cozy_castling(board, mv) {
        return mv;
    }
    let king_file = if mv.to.file() as u8 > mv.from.file() as u8 {
        File::G
    } else {
        File::C
    };
    Move {
        from: mv.from,
        to: Square::new(king_file, mv.from.rank()),
        promotion: None,
    }
}

/// Format a move in UCI notation (e.g., "e2e4", "e7e8q")
pub fn format_uci_move(mv: Move) -> String {
    let mut s = format!("{}{}", format_square(mv.from), format_square(mv.to));
    if let Some(promo) = mv.promotion {
        s.push(format_piece(promo));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(file: File, rank: Rank) -> Square {
        Square::new(file, rank)
    }

    #[test]
    fn test_format_uci_move_with_promotion() {
        let mv = Move {
            from: sq(File::E, Rank::Seventh),
            to: sq(File::E, Rank::Eighth),
            promotion: Some(Piece::Queen),
        };
        assert_eq!(format_uci_move(mv), "e7e8q");
    }

    #[test]
    fn test_castling_roundtrip() {
        let board: Board = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1".parse().unwrap();
        let mut legal = Vec::new();
        board.generate_moves(|mvs| {
            legal.extend(mvs);
            false
        });

        let client = Move {
            from: sq(File::E, Rank::First),
            to: sq(File::G, Rank::First),
            promotion: None,
        };
        let cozy = convert_uci_castling_to_cozy(client, &legal);
        assert_eq!(cozy.to, sq(File::H, Rank::First));
        assert!(is_cozy_castling(&board, cozy));
        assert_eq!(convert_cozy_castling_to_uci(&board, cozy), client);
    }

    #[test]
    fn test_non_castling_untouched() {
        let board = Board::default();
        let mv = Move {
            from: sq(File::E, Rank::Second),
            to: sq(File::E, Rank::Fourth),
            promotion: None,
        };
        assert_eq!(convert_uci_castling_to_cozy(mv, &[]), mv);
        assert_eq!(convert_cozy_castling_to_uci(&board, mv), mv);
    }
}
