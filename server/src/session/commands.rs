use chess::PlayerSide;
use serde::Deserialize;
use tokio::sync::{broadcast, oneshot};

use super::events::SessionEvent;
use super::snapshot::GameSnapshot;
use crate::ids::{ConnectionId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Game not found")]
    NotFound,
    #[error("You are not part of this game")]
    NotParticipant,
    #[error("Join the game before acting on it")]
    NotJoined,
    #[error("Game already over")]
    GameOver,
    #[error("Game has not started yet")]
    NotStarted,
    #[error("Not your turn")]
    WrongTurn,
    #[error("{0}")]
    IllegalMove(String),
    #[error("Move is out of sync: expected ply {expected}, got {got}")]
    OutOfSync { expected: usize, got: usize },
    #[error("No draw offer to answer")]
    NoDrawOffer,
    #[error("Invalid FEN: {0}")]
    InvalidFen(String),
    #[error("User {0} is already in a game")]
    PlayerBusy(UserId),
    #[error("A user cannot be paired with themselves")]
    SelfPairing,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SessionError {
    /// Rejections caused by the request itself; the session is unaffected.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::WrongTurn
                | Self::IllegalMove(_)
                | Self::OutOfSync { .. }
                | Self::NoDrawOffer
                | Self::InvalidFen(_)
                | Self::SelfPairing
        )
    }
}

/// A move as sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MoveRequest {
    pub from: String,
    pub to: String,
    pub promotion: Option<String>,
    /// Half-moves the client had seen before this move.
    pub ply: Option<usize>,
}

/// How a join was resolved by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Seat bound; the opponent has not connected yet.
    Waiting,
    /// This join completed the pair; `GameStarted` is on the event stream.
    Started,
    /// Rejoin of a running game; replay the snapshot to this seat only.
    Resumed,
    /// The game is over; replay the final snapshot.
    Finished,
}

#[derive(Debug)]
pub struct JoinAck {
    pub side: PlayerSide,
    pub kind: JoinKind,
    pub snapshot: GameSnapshot,
    /// Subscribed before any event produced by this join was sent.
    pub events: broadcast::Receiver<SessionEvent>,
}

#[derive(Debug, Clone)]
pub struct MoveAck {
    pub snapshot: GameSnapshot,
    /// The move had already been applied; nothing changed.
    pub duplicate: bool,
}

/// Commands sent to the session actor. Each embeds a oneshot for the reply.
pub enum SessionCommand {
    Connect {
        user: UserId,
        connection: ConnectionId,
        reply: oneshot::Sender<Result<JoinAck, SessionError>>,
    },
    Disconnect {
        user: UserId,
        connection: ConnectionId,
    },
    MakeMove {
        user: UserId,
        request: MoveRequest,
        reply: oneshot::Sender<Result<MoveAck, SessionError>>,
    },
    Resign {
        user: UserId,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    OfferDraw {
        user: UserId,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    AcceptDraw {
        user: UserId,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    DeclineDraw {
        user: UserId,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    /// Periodic sweep: clock expiry, grace and start windows, clock broadcast.
    Tick,
    GetSnapshot {
        reply: oneshot::Sender<GameSnapshot>,
    },
    Shutdown,
}
