//! Wire types for the socket channel and the HTTP endpoints.
//!
//! Socket frames are JSON text tagged with a snake_case `type`; every field
//! is camelCase.

use chess::PlayerSide;
use serde::{Deserialize, Serialize};

use crate::ids::{GameId, TournamentId, UserId};
use crate::outcome::{EndMethod, GameResult};
use crate::session::{ClockSnapshot, GameSnapshot, MoveRecord};
use crate::time_control::TimeControl;
use crate::tournament::{Standing, TournamentStatus};

/// Action hint telling the client to send the user through the join flow.
pub const JOIN_FLOW: &str = "join_flow";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    JoinGame { session_id: GameId, user_id: UserId },
    #[serde(rename_all = "camelCase")]
    MakeMove {
        session_id: GameId,
        from: String,
        to: String,
        #[serde(default)]
        promotion: Option<String>,
        #[serde(default)]
        ply: Option<usize>,
    },
    #[serde(rename_all = "camelCase")]
    Resign { session_id: GameId },
    #[serde(rename_all = "camelCase")]
    OfferDraw { session_id: GameId },
    #[serde(rename_all = "camelCase")]
    AcceptDraw { session_id: GameId },
    #[serde(rename_all = "camelCase")]
    DeclineDraw { session_id: GameId },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Seat bound; the opponent has not joined yet.
    #[serde(rename_all = "camelCase")]
    WaitingForOpponent {
        game_id: GameId,
        your_color: PlayerSide,
    },
    /// Sent when both seats are connected, and replayed on reconnect.
    #[serde(rename_all = "camelCase")]
    GameStarted {
        game_id: GameId,
        white: UserId,
        black: UserId,
        your_color: PlayerSide,
        time_control: TimeControl,
        fen: String,
        turn: PlayerSide,
        clocks: ClockSnapshot,
        moves: Vec<MoveRecord>,
        draw_offer: Option<PlayerSide>,
    },
    #[serde(rename_all = "camelCase")]
    MoveMade {
        game_id: GameId,
        ply: usize,
        san: String,
        from: String,
        to: String,
        promotion: Option<String>,
        fen: String,
        turn: PlayerSide,
        clocks: ClockSnapshot,
    },
    #[serde(rename_all = "camelCase")]
    MoveError { game_id: GameId, message: String },
    #[serde(rename_all = "camelCase")]
    ClockUpdate {
        game_id: GameId,
        white_time: u64,
        black_time: u64,
    },
    #[serde(rename_all = "camelCase")]
    GameOver {
        game_id: GameId,
        result: GameResult,
        method: EndMethod,
        fen: String,
        clocks: ClockSnapshot,
    },
    #[serde(rename_all = "camelCase")]
    OpponentDisconnected { game_id: GameId, grace_ms: u64 },
    #[serde(rename_all = "camelCase")]
    OpponentReconnected { game_id: GameId },
    #[serde(rename_all = "camelCase")]
    DrawOffered { game_id: GameId },
    #[serde(rename_all = "camelCase")]
    DrawDeclined { game_id: GameId },
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        action: Option<String>,
    },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
            action: None,
        }
    }

    pub fn join_flow(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
            action: Some(JOIN_FLOW.to_string()),
        }
    }
}

// ============================================================================
// HTTP
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub sessions: usize,
    pub connections: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindMatchRequest {
    pub user_id: UserId,
    pub initial_time_seconds: u64,
    #[serde(default)]
    pub increment_seconds: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    pub user_id: UserId,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTournamentRequest {
    pub user_id: UserId,
    pub name: String,
    #[serde(default = "default_mode")]
    pub mode: String,
    pub duration_minutes: u64,
    pub initial_time_seconds: u64,
    #[serde(default)]
    pub increment_seconds: u64,
}

fn default_mode() -> String {
    "arena".to_string()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTournamentResponse {
    pub tournament_id: TournamentId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentStatusResponse {
    pub tournament_id: TournamentId,
    pub status: TournamentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leaderboard: Option<Vec<Standing>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GameSource {
    Live,
    Archive,
}

#[derive(Debug, Serialize)]
pub struct GameResponse {
    pub source: GameSource,
    pub game: GameSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_client_messages() {
        let id = GameId::new();
        let join: ClientMessage = serde_json::from_value(json!({
            "type": "join_game",
            "sessionId": id.to_string(),
            "userId": "alice",
        }))
        .unwrap();
        assert_eq!(
            join,
            ClientMessage::JoinGame {
                session_id: id,
                user_id: "alice".into()
            }
        );

        let mv: ClientMessage = serde_json::from_value(json!({
            "type": "make_move",
            "sessionId": id.to_string(),
            "from": "e7",
            "to": "e8",
            "promotion": "q",
        }))
        .unwrap();
        assert!(matches!(
            mv,
            ClientMessage::MakeMove { promotion: Some(ref p), ply: None, .. } if p == "q"
        ));

        let unknown = serde_json::from_value::<ClientMessage>(json!({"type": "teleport"}));
        assert!(unknown.is_err());
    }

    #[test]
    fn test_server_message_wire_shape() {
        let msg = ServerMessage::ClockUpdate {
            game_id: GameId::new(),
            white_time: 1000,
            black_time: 2000,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "clock_update");
        assert_eq!(value["whiteTime"], 1000);

        let value = serde_json::to_value(ServerMessage::join_flow("nope")).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["action"], "join_flow");
        let value = serde_json::to_value(ServerMessage::error("bad")).unwrap();
        assert!(value.get("action").is_none());
    }
}
