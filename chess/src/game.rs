use cozy_chess::{Board, File, GameStatus, Move, Piece, Square};
use std::collections::HashMap;

use crate::converters::{format_piece, parse_promotion, parse_square};
use crate::fen::{format_fen, parse_fen, FenError, STARTING_FEN};
use crate::san::format_san;
use crate::types::PlayerSide;
use crate::uci::{convert_cozy_castling_to_uci, convert_uci_castling_to_cozy, format_uci_move};

/// Main game state wrapper around cozy-chess Board
#[derive(Debug, Clone)]
pub struct Game {
    position: Board,
    start_fen: String,
    history: Vec<HistoryEntry>,
    /// Occurrence count per position hash, for repetition detection.
    seen: HashMap<u64, u8>,
}

/// One applied move, in client notation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub ply: usize,
    pub from: Square,
    /// King destination for castling, not the rook square.
    pub to: Square,
    pub piece: Piece,
    pub side: PlayerSide,
    pub captured: Option<Piece>,
    pub promotion: Option<Piece>,
    pub san: String,
    /// FEN after this move
    pub fen: String,
}

impl HistoryEntry {
    /// Castling also matches its king-takes-rook form.
    pub fn matches(&self, from: Square, to: Square, promotion: Option<Piece>) -> bool {
        self.from == from
            && self.promotion == promotion
            && (self.to == to || self.castling_rook_square() == Some(to))
    }

    fn castling_rook_square(&self) -> Option<Square> {
        if self.piece != Piece::King {
            return None;
        }
        let rook_file = match (self.from.file(), self.to.file()) {
            (File::E, File::G) => File::H,
            (File::E, File::C) => File::A,
            _ => return None,
        };
        Some(Square::new(rook_file, self.from.rank()))
    }

    pub fn uci(&self) -> String {
        format_uci_move(Move {
            from: self.from,
            to: self.to,
            promotion: self.promotion,
        })
    }

    pub fn promotion_letter(&self) -> Option<String> {
        self.promotion.map(|p| format_piece(p).to_string())
    }
}

/// Why a game is over, as far as the rules are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Checkmate { winner: PlayerSide },
    Stalemate,
    InsufficientMaterial,
    ThreefoldRepetition,
    FiftyMoveRule,
}

impl Game {
    /// Create a new game from the standard starting position
    pub fn new() -> Self {
        Self::with_board(Board::default(), STARTING_FEN.to_string())
    }

    /// Create a game from a FEN string (legend or opening offset).
    pub fn from_fen(fen: &str) -> Result<Self, GameError> {
        let position = parse_fen(fen)?;
        let start_fen = format_fen(&position);
        Ok(Self::with_board(position, start_fen))
    }

    fn with_board(position: Board, start_fen: String) -> Self {
        let mut seen = HashMap::new();
        seen.insert(position.hash(), 1);
        Self {
            position,
            start_fen,
            history: Vec::new(),
            seen,
        }
    }

    pub fn position(&self) -> &Board {
        &self.position
    }

    pub fn start_fen(&self) -> &str {
        &self.start_fen
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn move_count(&self) -> usize {
        self.history.len()
    }

    pub fn side_to_move(&self) -> PlayerSide {
        PlayerSide::from(self.position.side_to_move())
    }

    /// Export position to FEN string
    pub fn to_fen(&self) -> String {
        format_fen(&self.position)
    }

    /// Get all legal moves for the current position (cozy-chess castling form).
    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::new();
        self.position.generate_moves(|mvs| {
            moves.extend(mvs);
            false
        });
        moves
    }

    /// Parse and play a from/to/promotion triple as sent by a client.
    pub fn play(
        &mut self,
        from: &str,
        to: &str,
        promotion: Option<&str>,
    ) -> Result<&HistoryEntry, GameError> {
        let from = parse_square(from).ok_or_else(|| GameError::InvalidSquare(from.to_string()))?;
        let to = parse_square(to).ok_or_else(|| GameError::InvalidSquare(to.to_string()))?;
        let promotion = match promotion {
            Some(p) => {
                Some(parse_promotion(p).ok_or_else(|| GameError::InvalidPromotion(p.to_string()))?)
            }
            None => None,
        };
        self.make_move(Move {
            from,
            to,
            promotion,
        })
    }

    /// Make a move on the board. Accepts either castling notation.
    pub fn make_move(&mut self, requested: Move) -> Result<&HistoryEntry, GameError> {
        let legal = self.legal_moves();
        let mv = convert_uci_castling_to_cozy(requested, &legal);
        if !legal.contains(&mv) {
            return Err(GameError::IllegalMove(format_uci_move(requested)));
        }

        let piece = self.position.piece_on(mv.from).ok_or_else(|| {
            GameError::Corrupt(format!("no piece on {} for a legal move", format_uci_move(mv)))
        })?;
        let side = self.side_to_move();
        let display = convert_cozy_castling_to_uci(&self.position, mv);
        let captured = if display != mv {
            None
        } else if let Some(p) = self.position.piece_on(mv.to) {
            Some(p)
        } else if piece == Piece::Pawn && mv.from.file() != mv.to.file() {
            Some(Piece::Pawn)
        } else {
            None
        };
        let san = format_san(&self.position, mv);

        self.position.play_unchecked(mv);
        *self.seen.entry(self.position.hash()).or_insert(0) += 1;

        let entry = HistoryEntry {
            ply: self.history.len(),
            from: display.from,
            to: display.to,
            piece,
            side,
            captured,
            promotion: mv.promotion,
            san,
            fen: self.to_fen(),
        };
        self.history.push(entry);

        self.history
            .last()
            .ok_or_else(|| GameError::Corrupt("history empty after move".into()))
    }

    /// Termination status of the current position, if the game is over.
    pub fn outcome(&self) -> Option<Outcome> {
        let status = self.position.status();
        if matches!(status, GameStatus::Won) {
            return Some(Outcome::Checkmate {
                winner: self.side_to_move().opponent(),
            });
        }
        let drawn = matches!(status, GameStatus::Drawn);
        if drawn && !self.has_legal_moves() {
            return Some(Outcome::Stalemate);
        }
        if insufficient_material(&self.position) {
            return Some(Outcome::InsufficientMaterial);
        }
        if self.seen.get(&self.position.hash()).copied().unwrap_or(0) >= 3 {
            return Some(Outcome::ThreefoldRepetition);
        }
        if drawn {
            return Some(Outcome::FiftyMoveRule);
        }
        None
    }

    fn has_legal_moves(&self) -> bool {
        self.position.generate_moves(|_| true)
    }
}

/// Bare kings, or kings plus a single minor piece.
fn insufficient_material(board: &Board) -> bool {
    let heavy = board.pieces(Piece::Pawn) | board.pieces(Piece::Rook) | board.pieces(Piece::Queen);
    if !heavy.is_empty() {
        return false;
    }
    let minors = board.pieces(Piece::Knight) | board.pieces(Piece::Bishop);
    minors.len() <= 1
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("Illegal move: {0}")]
    IllegalMove(String),
    #[error("Invalid square: {0}")]
    InvalidSquare(String),
    #[error("Invalid promotion piece: {0}")]
    InvalidPromotion(String),
    #[error("FEN parse error: {0}")]
    FenError(#[from] FenError),
    /// The adapter reached a state it cannot reason about.
    #[error("Rules adapter failure: {0}")]
    Corrupt(String),
}

impl GameError {
    /// Errors caused by the request rather than by the adapter.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::IllegalMove(_) | Self::InvalidSquare(_) | Self::InvalidPromotion(_)
        )
    }
}
