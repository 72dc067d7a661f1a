//! Result types shared by sessions, tournaments and the archive.

use chess::{Outcome, PlayerSide};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameResult {
    WhiteWon,
    BlackWon,
    Draw,
}

impl GameResult {
    pub fn win_for(side: PlayerSide) -> Self {
        match side {
            PlayerSide::White => Self::WhiteWon,
            PlayerSide::Black => Self::BlackWon,
        }
    }

    pub fn winner(self) -> Option<PlayerSide> {
        match self {
            Self::WhiteWon => Some(PlayerSide::White),
            Self::BlackWon => Some(PlayerSide::Black),
            Self::Draw => None,
        }
    }

    /// Tournament score for `side` in half-points: win 2, draw 1, loss 0.
    pub fn half_points_for(self, side: PlayerSide) -> u32 {
        match self.winner() {
            Some(winner) if winner == side => 2,
            Some(_) => 0,
            None => 1,
        }
    }
}

/// How a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndMethod {
    Checkmate,
    Resignation,
    Timeout,
    Stalemate,
    DrawAgreement,
    Abandonment,
    InsufficientMaterial,
    ThreefoldRepetition,
    FiftyMoveRule,
    /// Defensive termination; never a normal game end.
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOutcome {
    pub result: GameResult,
    pub method: EndMethod,
}

impl GameOutcome {
    pub fn win(winner: PlayerSide, method: EndMethod) -> Self {
        Self {
            result: GameResult::win_for(winner),
            method,
        }
    }

    pub fn draw(method: EndMethod) -> Self {
        Self {
            result: GameResult::Draw,
            method,
        }
    }
}

impl From<Outcome> for GameOutcome {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Checkmate { winner } => Self::win(winner, EndMethod::Checkmate),
            Outcome::Stalemate => Self::draw(EndMethod::Stalemate),
            Outcome::InsufficientMaterial => Self::draw(EndMethod::InsufficientMaterial),
            Outcome::ThreefoldRepetition => Self::draw(EndMethod::ThreefoldRepetition),
            Outcome::FiftyMoveRule => Self::draw(EndMethod::FiftyMoveRule),
        }
    }
}
