//! Conversion functions from session events to socket messages

use chess::PlayerSide;

use super::protocol::ServerMessage;
use crate::ids::GameId;
use crate::session::{GameSnapshot, SessionEvent};

/// Full-state message for one seat: the start of a game, or a replay of it.
pub fn convert_snapshot_to_started(snap: &GameSnapshot, viewer: PlayerSide) -> ServerMessage {
    ServerMessage::GameStarted {
        game_id: snap.game_id,
        white: snap.white.clone(),
        black: snap.black.clone(),
        your_color: viewer,
        time_control: snap.time_control,
        fen: snap.fen.clone(),
        turn: snap.turn,
        clocks: snap.clocks,
        moves: snap.moves.clone(),
        draw_offer: snap.draw_offer,
    }
}

/// `None` while the snapshot has no outcome yet.
pub fn convert_snapshot_to_game_over(snap: &GameSnapshot) -> Option<ServerMessage> {
    snap.outcome.map(|outcome| ServerMessage::GameOver {
        game_id: snap.game_id,
        result: outcome.result,
        method: outcome.method,
        fen: snap.fen.clone(),
        clocks: snap.clocks,
    })
}

/// Converts a broadcast event into the message `viewer` should see.
/// A seat is not told about its own connection changes or its own draw
/// offers.
pub fn convert_session_event(
    event: &SessionEvent,
    game_id: GameId,
    viewer: PlayerSide,
) -> Option<ServerMessage> {
    match event {
        SessionEvent::GameStarted(snap) => Some(convert_snapshot_to_started(snap, viewer)),
        SessionEvent::MoveMade { snapshot, mv } => Some(ServerMessage::MoveMade {
            game_id,
            ply: mv.ply,
            san: mv.san.clone(),
            from: mv.from.clone(),
            to: mv.to.clone(),
            promotion: mv.promotion.clone(),
            fen: snapshot.fen.clone(),
            turn: snapshot.turn,
            clocks: snapshot.clocks,
        }),
        SessionEvent::ClockUpdate(clocks) => Some(ServerMessage::ClockUpdate {
            game_id,
            white_time: clocks.white_time,
            black_time: clocks.black_time,
        }),
        SessionEvent::GameOver(snap) => convert_snapshot_to_game_over(snap),
        SessionEvent::SeatDisconnected { side, grace_ms } if *side != viewer => {
            Some(ServerMessage::OpponentDisconnected {
                game_id,
                grace_ms: *grace_ms,
            })
        }
        SessionEvent::SeatReconnected { side } if *side != viewer => {
            Some(ServerMessage::OpponentReconnected { game_id })
        }
        SessionEvent::DrawOffered { by } if *by != viewer => {
            Some(ServerMessage::DrawOffered { game_id })
        }
        SessionEvent::DrawDeclined { by } if *by != viewer => {
            Some(ServerMessage::DrawDeclined { game_id })
        }
        SessionEvent::SeatDisconnected { .. }
        | SessionEvent::SeatReconnected { .. }
        | SessionEvent::DrawOffered { .. }
        | SessionEvent::DrawDeclined { .. } => None,
    }
}
