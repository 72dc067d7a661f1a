use chess::PlayerSide;

use super::snapshot::{ClockSnapshot, GameSnapshot, MoveRecord};
use crate::ids::{GameId, TournamentId, UserId};
use crate::outcome::GameOutcome;

/// Events broadcast from the session actor to every bound connection.
/// Connections filter by their own seat where an event targets one side.
#[derive(Debug, Clone)]
#[allow(clippy::large_enum_variant)]
pub enum SessionEvent {
    GameStarted(GameSnapshot),
    MoveMade {
        snapshot: GameSnapshot,
        mv: MoveRecord,
    },
    ClockUpdate(ClockSnapshot),
    GameOver(GameSnapshot),
    SeatDisconnected {
        side: PlayerSide,
        grace_ms: u64,
    },
    SeatReconnected {
        side: PlayerSide,
    },
    DrawOffered {
        by: PlayerSide,
    },
    DrawDeclined {
        by: PlayerSide,
    },
}

/// Emitted once per session when it reaches `Completed`.
#[derive(Debug, Clone)]
pub struct CompletedGame {
    pub game_id: GameId,
    pub tournament_id: Option<TournamentId>,
    pub white: UserId,
    pub black: UserId,
    pub outcome: GameOutcome,
    pub snapshot: GameSnapshot,
}
