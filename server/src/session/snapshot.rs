use chess::{format_square, HistoryEntry, PlayerSide};
use serde::{Deserialize, Serialize};

use crate::ids::{GameId, TournamentId, UserId};
use crate::outcome::GameOutcome;
use crate::time_control::TimeControl;

/// Complete, immutable view of one session.
/// Sent to clients on start and replay, and stored in the archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub game_id: GameId,
    pub tournament_id: Option<TournamentId>,
    pub white: UserId,
    pub black: UserId,
    pub time_control: TimeControl,
    pub start_fen: String,
    pub fen: String,
    pub turn: PlayerSide,
    pub status: SessionStatus,
    pub outcome: Option<GameOutcome>,
    pub moves: Vec<MoveRecord>,
    pub clocks: ClockSnapshot,
    pub connections: SeatsConnected,
    pub draw_offer: Option<PlayerSide>,
}

impl GameSnapshot {
    pub fn user(&self, side: PlayerSide) -> &UserId {
        match side {
            PlayerSide::White => &self.white,
            PlayerSide::Black => &self.black,
        }
    }
}

/// Forward-only lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Pending,
    Active,
    Completed,
}

/// A single move in the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRecord {
    pub ply: usize,
    pub side: PlayerSide,
    pub san: String,
    pub from: String,
    pub to: String,
    pub promotion: Option<String>,
    pub fen_after: String,
}

impl From<&HistoryEntry> for MoveRecord {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            ply: entry.ply,
            side: entry.side,
            san: entry.san.clone(),
            from: format_square(entry.from),
            to: format_square(entry.to),
            promotion: entry.promotion_letter(),
            fen_after: entry.fen.clone(),
        }
    }
}

/// Clock readings in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockSnapshot {
    pub white_time: u64,
    pub black_time: u64,
    /// Side whose clock is running, if any.
    pub running: Option<PlayerSide>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatsConnected {
    pub white: bool,
    pub black: bool,
}
