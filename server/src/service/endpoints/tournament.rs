//! Tournament endpoints: lobby management, pairing polls and the view

use std::time::Duration;

use axum::extract::{Path, State};
use axum::Json;

use crate::ids::TournamentId;
use crate::pairing::MatchStatus;
use crate::service::protocol::{
    CreateTournamentRequest, CreateTournamentResponse, TournamentStatusResponse, UserRequest,
};
use crate::service::{ApiError, AppState};
use crate::time_control::TimeControl;
use crate::tournament::{TournamentConfig, TournamentStatus, TournamentView};

/// Longest accepted tournament window (one week).
const MAX_DURATION_MINUTES: u64 = 7 * 24 * 60;

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateTournamentRequest>,
) -> Result<Json<CreateTournamentResponse>, ApiError> {
    let time_control = TimeControl::from_seconds(req.initial_time_seconds, req.increment_seconds)?;
    if req.duration_minutes > MAX_DURATION_MINUTES {
        return Err(ApiError::BadRequest(format!(
            "durationMinutes must be at most {MAX_DURATION_MINUTES}"
        )));
    }
    let config = TournamentConfig {
        name: req.name,
        mode: req.mode,
        duration: Duration::from_secs(req.duration_minutes * 60),
        time_control,
    };
    let tournament_id = state.tournaments.create(req.user_id, config)?;
    Ok(Json(CreateTournamentResponse { tournament_id }))
}

pub async fn join(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
    Json(req): Json<UserRequest>,
) -> Result<Json<TournamentStatusResponse>, ApiError> {
    let status = state.tournaments.join(id, req.user_id)?;
    Ok(Json(status_response(id, status, None)))
}

pub async fn start(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
    Json(req): Json<UserRequest>,
) -> Result<Json<TournamentStatusResponse>, ApiError> {
    let status = state.tournaments.start(id, &req.user_id)?;
    Ok(Json(status_response(id, status, None)))
}

pub async fn end(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
    Json(req): Json<UserRequest>,
) -> Result<Json<TournamentStatusResponse>, ApiError> {
    let board = state.tournaments.end(id, &req.user_id).await?;
    Ok(Json(status_response(
        id,
        TournamentStatus::Completed,
        Some(board),
    )))
}

pub async fn find_match(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
    Json(req): Json<UserRequest>,
) -> Result<Json<MatchStatus>, ApiError> {
    let status = state.tournaments.find_match(id, &req.user_id).await?;
    Ok(Json(status))
}

pub async fn view(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
) -> Result<Json<TournamentView>, ApiError> {
    Ok(Json(state.tournaments.view(id).await?))
}

fn status_response(
    tournament_id: TournamentId,
    status: TournamentStatus,
    leaderboard: Option<Vec<crate::tournament::Standing>>,
) -> TournamentStatusResponse {
    TournamentStatusResponse {
        tournament_id,
        status,
        leaderboard,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::test_support::app_state;
    use crate::tournament::TournamentError;

    fn user(id: &str) -> Json<UserRequest> {
        Json(UserRequest { user_id: id.into() })
    }

    async fn created(state: &AppState) -> TournamentId {
        let Json(resp) = create(
            State(state.clone()),
            Json(CreateTournamentRequest {
                user_id: "host".into(),
                name: "Evening Arena".into(),
                mode: "arena".into(),
                duration_minutes: 30,
                initial_time_seconds: 180,
                increment_seconds: 0,
            }),
        )
        .await
        .unwrap();
        resp.tournament_id
    }

    #[tokio::test]
    async fn test_tournament_endpoints_flow() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(dir.path());
        let id = created(&state).await;

        let Json(joined) = join(State(state.clone()), Path(id), user("guest"))
            .await
            .unwrap();
        assert_eq!(joined.status, TournamentStatus::Lobby);

        let err = start(State(state.clone()), Path(id), user("guest"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Tournament(TournamentError::NotCreator)
        ));
        start(State(state.clone()), Path(id), user("host"))
            .await
            .unwrap();

        let Json(first) = find_match(State(state.clone()), Path(id), user("host"))
            .await
            .unwrap();
        assert_eq!(first, MatchStatus::Waiting);
        let Json(second) = find_match(State(state.clone()), Path(id), user("guest"))
            .await
            .unwrap();
        let MatchStatus::Matched {
            game_reference_id, ..
        } = second
        else {
            panic!("expected MATCHED, got {second:?}");
        };
        let Json(host_poll) = find_match(State(state.clone()), Path(id), user("host"))
            .await
            .unwrap();
        assert_eq!(host_poll, MatchStatus::InGame { game_reference_id });

        let Json(ended) = end(State(state.clone()), Path(id), user("host"))
            .await
            .unwrap();
        assert_eq!(ended.status, TournamentStatus::Completed);
        assert_eq!(ended.leaderboard.map(|b| b.len()), Some(2));

        let Json(summary) = view(State(state), Path(id)).await.unwrap();
        assert_eq!(summary.status, TournamentStatus::Completed);
        assert_eq!(summary.name, "Evening Arena");
    }

    #[tokio::test]
    async fn test_unknown_tournament_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(dir.path());
        let err = join(State(state), Path(TournamentId::new()), user("guest"))
            .await
            .unwrap_err();
        assert_eq!(err.status_and_code().0, axum::http::StatusCode::NOT_FOUND);
    }
}
