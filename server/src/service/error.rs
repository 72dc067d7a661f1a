//! HTTP error mapping: every module error folds into [`ApiError`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::protocol::ErrorBody;
use crate::matchmaking::QueueError;
use crate::session::SessionError;
use crate::time_control::TimeControlError;
use crate::tournament::TournamentError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error(transparent)]
    Tournament(#[from] TournamentError),
    #[error(transparent)]
    TimeControl(#[from] TimeControlError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

fn session_status(e: &SessionError) -> (StatusCode, &'static str) {
    match e {
        SessionError::NotFound => (StatusCode::NOT_FOUND, "GAME_NOT_FOUND"),
        SessionError::NotParticipant => (StatusCode::FORBIDDEN, "NOT_PARTICIPANT"),
        SessionError::NotJoined => (StatusCode::FORBIDDEN, "NOT_JOINED"),
        SessionError::GameOver => (StatusCode::CONFLICT, "GAME_OVER"),
        SessionError::NotStarted => (StatusCode::CONFLICT, "NOT_STARTED"),
        SessionError::PlayerBusy(_) => (StatusCode::CONFLICT, "PLAYER_BUSY"),
        SessionError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        SessionError::WrongTurn
        | SessionError::IllegalMove(_)
        | SessionError::OutOfSync { .. }
        | SessionError::NoDrawOffer
        | SessionError::InvalidFen(_)
        | SessionError::SelfPairing => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
    }
}

impl ApiError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Session(e) => session_status(e),
            ApiError::Queue(QueueError::InvalidUser) => (StatusCode::BAD_REQUEST, "INVALID_USER"),
            ApiError::Queue(QueueError::AlreadyQueued(_)) => {
                (StatusCode::CONFLICT, "ALREADY_QUEUED")
            }
            ApiError::Queue(QueueError::Session(e)) => session_status(e),
            ApiError::Tournament(e) => match e {
                TournamentError::NotFound => (StatusCode::NOT_FOUND, "TOURNAMENT_NOT_FOUND"),
                TournamentError::UnknownGame => (StatusCode::NOT_FOUND, "GAME_NOT_FOUND"),
                TournamentError::NotCreator => (StatusCode::FORBIDDEN, "NOT_CREATOR"),
                TournamentError::NotParticipant => (StatusCode::FORBIDDEN, "NOT_PARTICIPANT"),
                TournamentError::NotInLobby => (StatusCode::CONFLICT, "NOT_IN_LOBBY"),
                TournamentError::NotActive => (StatusCode::CONFLICT, "NOT_ACTIVE"),
                TournamentError::AlreadyJoined => (StatusCode::CONFLICT, "ALREADY_JOINED"),
                TournamentError::NotEnoughParticipants => {
                    (StatusCode::CONFLICT, "NOT_ENOUGH_PARTICIPANTS")
                }
                TournamentError::InvalidConfig(_) => (StatusCode::BAD_REQUEST, "INVALID_CONFIG"),
                TournamentError::Session(e) => session_status(e),
            },
            ApiError::TimeControl(_) => (StatusCode::BAD_REQUEST, "INVALID_TIME_CONTROL"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let body = ErrorBody {
            error: self.to_string(),
            code,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_control::TimeControl;

    #[test]
    fn test_error_taxonomy_maps_to_status() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (SessionError::NotFound.into(), StatusCode::NOT_FOUND),
            (SessionError::NotParticipant.into(), StatusCode::FORBIDDEN),
            (SessionError::WrongTurn.into(), StatusCode::BAD_REQUEST),
            (
                QueueError::AlreadyQueued(TimeControl::from_seconds(60, 0).unwrap()).into(),
                StatusCode::CONFLICT,
            ),
            (
                QueueError::Session(SessionError::PlayerBusy("a".into())).into(),
                StatusCode::CONFLICT,
            ),
            (TournamentError::NotCreator.into(), StatusCode::FORBIDDEN),
            (TournamentError::NotInLobby.into(), StatusCode::CONFLICT),
            (
                TournamentError::InvalidConfig("name".into()).into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                SessionError::Internal("boom".into()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(error.status_and_code().0, expected, "{error}");
        }
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = ApiError::from(TournamentError::NotFound).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["code"], "TOURNAMENT_NOT_FOUND");
        assert_eq!(json["error"], "Tournament not found");
    }
}
